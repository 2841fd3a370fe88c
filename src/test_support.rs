//! Helpers shared by the headless system tests.

use bevy::prelude::*;
use std::time::Duration;

/// Every message of type `M` seen so far.
#[derive(Resource)]
pub struct Seen<M: Message>(pub Vec<M>);

impl<M: Message> Default for Seen<M> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

fn collect<M: Message + Clone>(mut reader: MessageReader<M>, mut seen: ResMut<Seen<M>>) {
    seen.0.extend(reader.read().cloned());
}

/// Register `M` and record every instance written into [`Seen<M>`].
pub fn record<M: Message + Clone>(app: &mut App) {
    app.add_message::<M>();
    app.init_resource::<Seen<M>>();
    app.add_systems(Last, collect::<M>);
}

pub fn seen<M: Message + Clone>(app: &App) -> Vec<M> {
    app.world().resource::<Seen<M>>().0.clone()
}

/// A bare app whose `Time` is advanced by hand with [`tick`].
///
/// Systems under test go in `Update` and read `Res<Time>` exactly as they
/// would inside `FixedUpdate`.
pub fn manual_time_app() -> App {
    let mut app = App::new();
    app.init_resource::<Time>();
    app
}

/// Advance `Time` by `dt` seconds and run one frame.
pub fn tick(app: &mut App, dt: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(dt));
    app.update();
}
