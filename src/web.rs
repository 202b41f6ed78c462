//! Browser bindings
//!
//! Implements the host traits over the DOM and exports
//! `initRandomAnimationPlayer` for inline page scripts. The player element
//! is expected to behave like `<lottie-player>`: a `load(src)` method,
//! optional `play()`/`pause()` methods and `ready`/`complete` events.

use crate::assets::AssetList;
use crate::host::{
    Container, ContainerHeight, Registration, ResizeCallback, Retained, TaskCallback, TimerHandle,
    Viewport, VisibilityCallback,
};
use crate::player::{
    AnimationPlayer, Capability, ControllerHandle, ControllerOptions, PlayerSignal, SignalCallback,
};
use js_sys::{Array, Function, Reflect};
use log::{error, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, IntersectionObserver, IntersectionObserverEntry, Window};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

struct WebContainer {
    element: HtmlElement,
}

impl Container for WebContainer {
    fn set_height(&self, height: ContainerHeight) {
        if let Err(err) = self.element.style().set_property("height", &height.to_string()) {
            warn!("Failed to set container height: {:?}", err);
        }
    }

    fn observe_visibility(&self, callback: VisibilityCallback) -> Registration {
        let callback = Rc::new(RefCell::new(callback));

        let observed = Rc::clone(&callback);
        let closure = Closure::wrap(Box::new(move |entries: Array| {
            let count = entries.length();
            if count == 0 {
                return;
            }
            // Only the latest entry reflects the current state.
            if let Ok(entry) = entries.get(count - 1).dyn_into::<IntersectionObserverEntry>() {
                let mut callback = observed.borrow_mut();
                (*callback)(entry.is_intersecting());
            }
        }) as Box<dyn FnMut(Array)>);

        let observer = IntersectionObserver::new(closure.as_ref().unchecked_ref());
        match observer {
            Ok(observer) => {
                observer.observe(&self.element);
                let closure = Retained::new(closure, Closure::forget);
                Registration::new(move || {
                    observer.disconnect();
                    closure.release();
                })
            }
            Err(err) => {
                warn!("IntersectionObserver unavailable, treating container as visible: {:?}", err);
                let mut callback = callback.borrow_mut();
                (*callback)(true);
                Registration::noop()
            }
        }
    }
}

struct WebViewport {
    window: Window,
}

impl Viewport for WebViewport {
    fn on_resize(&self, mut callback: ResizeCallback) -> Registration {
        let closure = Closure::wrap(Box::new(move || callback()) as Box<dyn FnMut()>);

        if let Err(err) = self
            .window
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            warn!("Failed to listen for resize: {:?}", err);
            return Registration::noop();
        }

        let window = self.window.clone();
        let closure = Retained::new(closure, Closure::forget);
        Registration::new(move || {
            if let Some(callback) = closure.get() {
                let _ = window.remove_event_listener_with_callback("resize", callback.as_ref().unchecked_ref());
            }
            closure.release();
        })
    }

    fn set_timeout(&self, delay: Duration, callback: TaskCallback) -> TimerHandle {
        let closure = Closure::once(move || callback());
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        let scheduled = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis);
        match scheduled {
            Ok(id) => {
                let window = self.window.clone();
                let closure = Retained::new(closure, Closure::forget);
                Registration::new(move || {
                    window.clear_timeout_with_handle(id);
                    closure.release();
                })
            }
            Err(err) => {
                warn!("Failed to schedule timeout: {:?}", err);
                Registration::noop()
            }
        }
    }

    fn request_animation_frame(&self, callback: TaskCallback) {
        let closure = Closure::once_into_js(move || callback());
        if let Err(err) = self.window.request_animation_frame(closure.unchecked_ref()) {
            warn!("Failed to request animation frame: {:?}", err);
        }
    }
}

struct WebPlayer {
    element: HtmlElement,
}

impl WebPlayer {
    /// Look up a method on the element, if it has one
    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.element, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn call(&self, name: &str) {
        if let Some(method) = self.method(name) {
            if let Err(err) = method.call0(&self.element) {
                warn!("Player {}() failed: {:?}", name, err);
            }
        }
    }
}

impl AnimationPlayer for WebPlayer {
    fn load(&self, path: &str) {
        match self.method("load") {
            Some(load) => {
                if let Err(err) = load.call1(&self.element, &JsValue::from_str(path)) {
                    warn!("Player failed to load {}: {:?}", path, err);
                }
            }
            None => warn!("Player element has no load() method"),
        }
    }

    fn supports(&self, capability: Capability) -> bool {
        let name = match capability {
            Capability::Play => "play",
            Capability::Pause => "pause",
        };
        self.method(name).is_some()
    }

    fn play(&self) {
        self.call("play");
    }

    fn pause(&self) {
        self.call("pause");
    }

    fn rendered_height(&self) -> u32 {
        self.element.offset_height().max(0) as u32
    }

    fn subscribe(&self, signal: PlayerSignal, mut callback: SignalCallback) -> Registration {
        let event = match signal {
            PlayerSignal::Ready => "ready",
            PlayerSignal::Complete => "complete",
        };
        let closure = Closure::wrap(Box::new(move || callback()) as Box<dyn FnMut()>);

        if let Err(err) = self
            .element
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            warn!("Failed to listen for player {} events: {:?}", event, err);
            return Registration::noop();
        }

        let element = self.element.clone();
        let closure = Retained::new(closure, Closure::forget);
        Registration::new(move || {
            if let Some(callback) = closure.get() {
                let _ = element.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
            }
            closure.release();
        })
    }

    fn container(&self) -> Option<Rc<dyn Container>> {
        let parent = self.element.parent_element()?.dyn_into::<HtmlElement>().ok()?;
        Some(Rc::new(WebContainer { element: parent }))
    }
}

/// Controller handed back to page scripts
#[wasm_bindgen]
pub struct WebController {
    handle: Option<ControllerHandle>,
}

#[wasm_bindgen]
impl WebController {
    pub fn pause(&self) {
        if let Some(handle) = &self.handle {
            handle.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(handle) = &self.handle {
            handle.resume();
        }
    }

    pub fn toggle(&self) {
        if let Some(handle) = &self.handle {
            handle.toggle();
        }
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.handle.as_ref().is_some_and(ControllerHandle::is_paused)
    }

    #[wasm_bindgen(js_name = isVisible)]
    pub fn is_visible(&self) -> bool {
        self.handle.as_ref().is_some_and(ControllerHandle::is_visible)
    }

    /// Release every observer and listener; the controller is inert afterwards
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.dispose();
        }
    }
}

/// Start random playback on `player` with the given animation files
#[wasm_bindgen(js_name = initRandomAnimationPlayer)]
pub fn init_random_animation_player(
    player: Option<HtmlElement>,
    animation_files: Vec<String>,
) -> Option<WebController> {
    let Some(window) = web_sys::window() else {
        error!("No window available for the animation player");
        return None;
    };

    let player = player.map(|element| Rc::new(WebPlayer { element }) as Rc<dyn AnimationPlayer>);
    let viewport: Rc<dyn Viewport> = Rc::new(WebViewport { window });

    crate::player::initialize(
        viewport,
        player,
        AssetList::from(animation_files),
        ControllerOptions::default(),
    )
    .map(|handle| WebController {
        handle: Some(handle),
    })
}
