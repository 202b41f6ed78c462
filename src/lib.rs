//! animloop - randomized, visibility-aware looping animations
//!
//! Two pieces work together:
//! - [`AssetLister`] turns a directory of animation files into the ordered
//!   [`AssetList`] a page hands to the player.
//! - [`initialize`] starts a playback controller that loads a random asset
//!   whenever a loop completes, never the same one twice in a row, plays only
//!   while its container is on screen and keeps the container height stable.
//!
//! The controller talks to its environment through the traits in [`host`]
//! and [`player`]. [`host::headless`] implements them on a virtual clock;
//! on `wasm32` the `web` module implements them over the DOM.

pub mod assets;
pub mod host;
pub mod player;
pub mod simulation;
pub mod utils;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use assets::{AssetList, AssetLister};
pub use player::{
    initialize, try_initialize, AnimationPlayer, Capability, ControllerHandle, ControllerOptions,
    PlaybackState, PlayerSignal,
};
pub use utils::error::{AnimloopError, Result};
