//! Playback controller implementation for animloop
//!
//! The controller owns a [`PlaybackState`] behind `Rc<RefCell<_>>` and is
//! driven entirely by host callbacks: visibility changes, viewport resizes
//! and the player's `Ready`/`Complete` signals. Borrows of the state are
//! released before calling into the player or the container.

use crate::assets::AssetList;
use crate::host::{Container, ContainerHeight, Debouncer, Registration, Viewport};
use crate::player::{AnimationPlayer, Capability, PlaybackState, PlayerSignal, Selector};
use crate::utils::config::PlaybackConfig;
use crate::utils::error::{AnimloopError, Result};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Controller tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Quiet period before a resize burst re-measures the container
    pub resize_debounce: Duration,

    /// Fixed selection seed; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            resize_debounce: Duration::from_millis(100),
            seed: None,
        }
    }
}

impl From<&PlaybackConfig> for ControllerOptions {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            resize_debounce: config.resize_debounce(),
            seed: config.seed,
        }
    }
}

struct Controller {
    assets: AssetList,
    state: PlaybackState,
    selector: Selector,
    player: Rc<dyn AnimationPlayer>,
    container: Option<Rc<dyn Container>>,
    viewport: Rc<dyn Viewport>,
    resize_debounce: Debouncer,
    registrations: Vec<Registration>,
    disposed: bool,
}

type Shared = Rc<RefCell<Controller>>;

/// Handle to a running controller
///
/// Host registrations keep the controller alive on their own, so dropping
/// the handle does not stop playback. [`ControllerHandle::dispose`] does.
pub struct ControllerHandle {
    inner: Shared,
}

/// Start a controller, logging instead of failing when `player` is absent
///
/// This is the entry point pages use: a missing player element is reported
/// through `log::error!` and yields `None`, nothing else happens.
pub fn initialize(
    viewport: Rc<dyn Viewport>,
    player: Option<Rc<dyn AnimationPlayer>>,
    assets: AssetList,
    options: ControllerOptions,
) -> Option<ControllerHandle> {
    match try_initialize(viewport, player, assets, options) {
        Ok(handle) => Some(handle),
        Err(err) => {
            error!("{}", err);
            None
        }
    }
}

/// Start a controller
///
/// Registers a resize listener on the viewport and a visibility observer on
/// the player's container. Playback begins once the container becomes
/// visible. A player without a container is treated as always visible.
pub fn try_initialize(
    viewport: Rc<dyn Viewport>,
    player: Option<Rc<dyn AnimationPlayer>>,
    assets: AssetList,
    options: ControllerOptions,
) -> Result<ControllerHandle> {
    let player = player.ok_or(AnimloopError::MissingPlayer)?;
    let container = player.container();
    let selector = options
        .seed
        .map(Selector::seeded)
        .unwrap_or_else(Selector::from_entropy);

    info!("Initializing animation controller with {} assets", assets.len());
    if assets.is_empty() {
        warn!("Animation controller has no assets to play");
    }

    let inner = Rc::new(RefCell::new(Controller {
        assets,
        state: PlaybackState::default(),
        selector,
        player,
        container: container.clone(),
        viewport: Rc::clone(&viewport),
        resize_debounce: Debouncer::new(options.resize_debounce),
        registrations: Vec::new(),
        disposed: false,
    }));

    debug!(
        "Re-measuring container height {:?} after the last resize",
        inner.borrow().resize_debounce.delay()
    );

    let controller = Rc::clone(&inner);
    let resize = viewport.on_resize(Box::new(move || on_resize(&controller)));
    inner.borrow_mut().registrations.push(resize);

    match container {
        Some(container) => {
            let controller = Rc::clone(&inner);
            let observer =
                container.observe_visibility(Box::new(move |visible| on_visibility(&controller, visible)));
            inner.borrow_mut().registrations.push(observer);
        }
        None => {
            warn!("Animation player has no container, playing without visibility gating");
            on_visibility(&inner, true);
        }
    }

    Ok(ControllerHandle { inner })
}

fn on_visibility(this: &Shared, visible: bool) {
    if visible {
        {
            let mut controller = this.borrow_mut();
            if controller.disposed {
                return;
            }
            controller.state.is_visible = true;
        }
        debug!("Container entered the viewport");
        start(this);
    } else {
        let player = {
            let mut controller = this.borrow_mut();
            // Observers report the initial state too; only leaving the
            // viewport pauses.
            if controller.disposed || !controller.state.is_visible {
                return;
            }
            controller.state.is_visible = false;
            Rc::clone(&controller.player)
        };
        debug!("Container left the viewport");
        if player.supports(Capability::Pause) {
            player.pause();
        }
    }
}

/// Register the player hooks on first use, then pick an asset
fn start(this: &Shared) {
    let player = {
        let controller = this.borrow();
        (!controller.state.is_initialized).then(|| Rc::clone(&controller.player))
    };

    if let Some(player) = player {
        let controller = Rc::clone(this);
        let ready = player.subscribe(PlayerSignal::Ready, Box::new(move || on_ready(&controller)));
        let controller = Rc::clone(this);
        let complete = player.subscribe(PlayerSignal::Complete, Box::new(move || select_next(&controller)));

        let mut controller = this.borrow_mut();
        controller.registrations.push(ready);
        controller.registrations.push(complete);
        controller.state.is_initialized = true;
        info!("Player lifecycle hooks registered");
    }

    select_next(this);
}

fn on_ready(this: &Shared) {
    let pinned = this.borrow().state.height_set;
    if !pinned {
        pin_height(this);
    }
}

/// Load a random asset other than the current one
fn select_next(this: &Shared) {
    let (player, path) = {
        let mut controller = this.borrow_mut();
        if controller.disposed || !controller.state.can_play() {
            return;
        }

        let previous = controller.state.current_index;
        let len = controller.assets.len();
        let Some(index) = controller.selector.next_index(previous, len) else {
            debug!("Nothing to select, asset list is empty");
            return;
        };

        controller.state.current_index = Some(index);
        (Rc::clone(&controller.player), controller.assets[index].to_string())
    };

    debug!("Loading animation {}", path);
    player.load(&path);
}

/// Fix the container to the player's rendered height
fn pin_height(this: &Shared) {
    let (player, container) = {
        let controller = this.borrow();
        if controller.disposed {
            return;
        }
        (Rc::clone(&controller.player), controller.container.clone())
    };
    let Some(container) = container else {
        return;
    };

    let height = player.rendered_height();
    if height > 0 {
        container.set_height(ContainerHeight::Pixels(height));
        this.borrow_mut().state.height_set = true;
        debug!("Pinned container height to {}px", height);
    }
}

fn on_resize(this: &Shared) {
    let mut controller = this.borrow_mut();
    if controller.disposed || !controller.state.height_set {
        return;
    }

    let viewport = Rc::clone(&controller.viewport);
    let target = Rc::clone(this);
    controller
        .resize_debounce
        .schedule(viewport.as_ref(), Box::new(move || refit_height(&target)));
}

/// Release the pinned height and measure again on the next frame
fn refit_height(this: &Shared) {
    let (container, viewport) = {
        let controller = this.borrow();
        if controller.disposed {
            return;
        }
        (controller.container.clone(), Rc::clone(&controller.viewport))
    };
    let Some(container) = container else {
        return;
    };

    debug!("Re-measuring container height after resize");
    container.set_height(ContainerHeight::Auto);
    let target = Rc::clone(this);
    viewport.request_animation_frame(Box::new(move || pin_height(&target)));
}

impl ControllerHandle {
    /// Pause playback; repeated calls are harmless
    pub fn pause(&self) {
        let player = {
            let mut controller = self.inner.borrow_mut();
            controller.state.is_paused = true;
            Rc::clone(&controller.player)
        };

        if player.supports(Capability::Pause) {
            player.pause();
        }
    }

    /// Resume playback
    ///
    /// Only reaches the player while the container is visible; otherwise
    /// playback continues once it scrolls back into view. If nothing was
    /// loaded yet, the first asset is selected instead.
    pub fn resume(&self) {
        let (player, loaded) = {
            let mut controller = self.inner.borrow_mut();
            controller.state.is_paused = false;
            if !controller.state.is_visible || controller.disposed {
                return;
            }
            (
                Rc::clone(&controller.player),
                controller.state.current_index.is_some(),
            )
        };

        if !loaded {
            select_next(&self.inner);
        } else if player.supports(Capability::Play) {
            player.play();
        }
    }

    /// Pause when playing, resume when paused
    pub fn toggle(&self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.borrow().state.is_paused
    }

    pub fn is_visible(&self) -> bool {
        self.inner.borrow().state.is_visible
    }

    /// Index of the asset loaded last
    pub fn current_index(&self) -> Option<usize> {
        self.inner.borrow().state.current_index
    }

    /// Path of the asset loaded last
    pub fn current_asset(&self) -> Option<String> {
        let controller = self.inner.borrow();
        controller
            .state
            .current_index
            .and_then(|index| controller.assets.get(index))
            .map(str::to_string)
    }

    /// Snapshot of the playback flags
    pub fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    /// Unregister every observer, listener, signal hook and pending timer
    ///
    /// Callbacks that still reach the controller afterwards do nothing.
    pub fn dispose(self) {
        let registrations = {
            let mut controller = self.inner.borrow_mut();
            controller.disposed = true;
            controller.state.is_visible = false;
            controller.resize_debounce.cancel();
            std::mem::take(&mut controller.registrations)
        };

        for registration in registrations {
            registration.cancel();
        }
        info!("Animation controller disposed");
    }
}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let controller = self.inner.borrow();
        f.debug_struct("ControllerHandle")
            .field("state", &controller.state)
            .field("assets", &controller.assets.len())
            .field("disposed", &controller.disposed)
            .finish()
    }
}
