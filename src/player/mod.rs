//! Playback controller module for animloop
//!
//! This module drives an animation player: it picks a random asset whenever
//! a loop completes, plays only while the container is on screen, honours
//! manual pause/resume and keeps the container height stable across loads.

mod controller;
mod selection;
mod state;

pub use controller::{initialize, try_initialize, ControllerHandle, ControllerOptions};
pub use selection::Selector;
pub use state::PlaybackState;

use crate::host::{Container, Registration};
use std::rc::Rc;

/// Callback invoked when a player emits a signal
pub type SignalCallback = Box<dyn FnMut()>;

/// Lifecycle signals emitted by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSignal {
    /// The first frame of the loaded asset has been rendered
    Ready,

    /// One loop of the loaded asset finished
    Complete,
}

/// Optional player capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Play,
    Pause,
}

/// Animation player interface
///
/// A player renders one asset at a time. Play and pause are optional: the
/// controller checks [`AnimationPlayer::supports`] before calling them.
pub trait AnimationPlayer {
    /// Load an asset; the player starts it on its own
    fn load(&self, path: &str);

    /// Whether the player implements `capability`
    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Start or resume playback
    fn play(&self) {}

    /// Pause playback, keeping the position
    fn pause(&self) {}

    /// Height the player currently renders at, in pixels
    fn rendered_height(&self) -> u32;

    /// Subscribe to a lifecycle signal
    fn subscribe(&self, signal: PlayerSignal, callback: SignalCallback) -> Registration;

    /// Element wrapping the player
    fn container(&self) -> Option<Rc<dyn Container>>;
}
