//! Host environment abstraction
//!
//! The playback controller never talks to a browser or a clock directly.
//! It reaches the element wrapping the player through [`Container`] and the
//! viewport (resize events, timers, animation frames) through [`Viewport`].
//! Everything it registers comes back as a [`Registration`] so it can be
//! released again.

mod debounce;
pub mod headless;

pub use debounce::Debouncer;

use std::fmt;
use std::time::Duration;

/// Callback invoked with the new visibility of a container
pub type VisibilityCallback = Box<dyn FnMut(bool)>;

/// Callback invoked on every viewport resize
pub type ResizeCallback = Box<dyn FnMut()>;

/// One-shot callback for timers and animation frames
pub type TaskCallback = Box<dyn FnOnce()>;

/// Handle to something registered with the host
///
/// Dropping a registration leaves it in place; only [`Registration::cancel`]
/// releases it.
#[must_use = "a registration can only be released through cancel()"]
pub struct Registration {
    cancel: Option<Box<dyn FnOnce()>>,
}

/// Handle to a pending timeout
pub type TimerHandle = Registration;

impl Registration {
    /// Create a registration released by `cancel`
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A registration with nothing to release
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Release the registration
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A resource a registration releases on cancel
///
/// [`Retained::release`] hands the value to `drop`. If the owning
/// registration is dropped without being cancelled, the value goes to
/// `leak` instead, so a host callback stays valid for as long as the host
/// may still invoke it.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) struct Retained<T> {
    value: Option<T>,
    leak: fn(T),
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl<T> Retained<T> {
    pub(crate) fn new(value: T, leak: fn(T)) -> Self {
        Self {
            value: Some(value),
            leak,
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn release(mut self) {
        drop(self.value.take());
    }
}

impl<T> Drop for Retained<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            (self.leak)(value);
        }
    }
}

/// Height applied to a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHeight {
    /// Let the content decide
    Auto,

    /// Pinned to a pixel height
    Pixels(u32),
}

impl fmt::Display for ContainerHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerHeight::Auto => f.write_str("auto"),
            ContainerHeight::Pixels(px) => write!(f, "{}px", px),
        }
    }
}

/// Element wrapping the player
pub trait Container {
    /// Apply a height to the container
    fn set_height(&self, height: ContainerHeight);

    /// Watch whether the container intersects the viewport
    ///
    /// The callback receives the new visibility on every change.
    fn observe_visibility(&self, callback: VisibilityCallback) -> Registration;
}

/// The viewport the container lives in
pub trait Viewport {
    /// Listen for viewport resizes
    fn on_resize(&self, callback: ResizeCallback) -> Registration;

    /// Run `callback` once after `delay`
    ///
    /// Cancelling the returned handle after the timer fired is a no-op.
    fn set_timeout(&self, delay: Duration, callback: TaskCallback) -> TimerHandle;

    /// Run `callback` before the next frame is rendered
    fn request_animation_frame(&self, callback: TaskCallback);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_registration_cancel_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let registration = Registration::new(move || counter.set(counter.get() + 1));

        registration.cancel();
        assert_eq!(count.get(), 1);

        Registration::noop().cancel();
    }

    #[test]
    fn test_drop_does_not_cancel() {
        let cancelled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&cancelled);
        drop(Registration::new(move || flag.set(true)));

        assert!(!cancelled.get());
    }

    struct Tracked {
        released: Rc<Cell<bool>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    fn retained_registration(released: &Rc<Cell<bool>>) -> Registration {
        let tracked = Tracked {
            released: Rc::clone(released),
        };
        let retained = Retained::new(tracked, std::mem::forget);
        Registration::new(move || retained.release())
    }

    #[test]
    fn test_cancel_releases_retained_value() {
        let released = Rc::new(Cell::new(false));
        retained_registration(&released).cancel();

        assert!(released.get());
    }

    #[test]
    fn test_dropped_registration_keeps_retained_value() {
        let released = Rc::new(Cell::new(false));
        drop(retained_registration(&released));

        assert!(!released.get());
    }

    #[test]
    fn test_container_height_css() {
        assert_eq!(ContainerHeight::Auto.to_string(), "auto");
        assert_eq!(ContainerHeight::Pixels(240).to_string(), "240px");
    }
}
