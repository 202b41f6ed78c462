//! In-process host with a virtual clock
//!
//! Nothing here touches a real display or real time. The viewport only
//! moves forward when [`HeadlessViewport::advance`] is called, frames are
//! rendered on [`HeadlessViewport::render_frame`] and visibility changes on
//! [`HeadlessContainer::set_intersecting`]. The CLI simulator and the tests
//! drive the playback controller through these types.

use crate::host::{
    Container, ContainerHeight, Registration, ResizeCallback, TaskCallback, TimerHandle, Viewport,
    VisibilityCallback,
};
use crate::player::{AnimationPlayer, Capability, PlayerSignal, SignalCallback};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

type Listener<A> = Rc<RefCell<Box<dyn FnMut(A)>>>;

struct Listeners<A> {
    next_id: u64,
    callbacks: Vec<(u64, Listener<A>)>,
}

/// Callbacks registered for one kind of event
struct ListenerSet<A> {
    entries: Rc<RefCell<Listeners<A>>>,
}

impl<A: Clone + 'static> ListenerSet<A> {
    fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    fn add(&self, callback: Box<dyn FnMut(A)>) -> Registration {
        let id = {
            let mut entries = self.entries.borrow_mut();
            let id = entries.next_id;
            entries.next_id += 1;
            entries.callbacks.push((id, Rc::new(RefCell::new(callback))));
            id
        };

        let entries = Rc::downgrade(&self.entries);
        Registration::new(move || {
            if let Some(entries) = entries.upgrade() {
                let removed = {
                    let mut entries = entries.borrow_mut();
                    let position = entries.callbacks.iter().position(|(i, _)| *i == id);
                    position.map(|position| entries.callbacks.remove(position))
                };
                drop(removed);
            }
        })
    }

    /// Call every listener; listeners removed mid-dispatch are skipped
    fn emit(&self, arg: A) {
        let snapshot: Vec<Listener<A>> = self
            .entries
            .borrow()
            .callbacks
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for callback in snapshot {
            let still_registered = self
                .entries
                .borrow()
                .callbacks
                .iter()
                .any(|(_, registered)| Rc::ptr_eq(registered, &callback));
            if still_registered {
                let mut listener = callback.borrow_mut();
                (*listener)(arg.clone());
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.borrow().callbacks.len()
    }
}

impl<A> Clone for ListenerSet<A> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

struct Clock {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, u64), TaskCallback>,
    frames: Vec<TaskCallback>,
}

/// Viewport with a virtual clock
///
/// Clones share the same clock and listeners.
#[derive(Clone)]
pub struct HeadlessViewport {
    clock: Rc<RefCell<Clock>>,
    resize: ListenerSet<()>,
}

impl Default for HeadlessViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessViewport {
    pub fn new() -> Self {
        Self {
            clock: Rc::new(RefCell::new(Clock {
                now: Duration::ZERO,
                next_id: 0,
                timers: BTreeMap::new(),
                frames: Vec::new(),
            })),
            resize: ListenerSet::new(),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Move the clock forward, firing due timers in deadline order
    ///
    /// Timers scheduled by a firing timer run too if they fall due before
    /// the end of the step.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;

        loop {
            let due = {
                let mut clock = self.clock.borrow_mut();
                let key = clock
                    .timers
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                key.and_then(|key| {
                    clock.now = key.0;
                    clock.timers.remove(&key)
                })
            };

            match due {
                Some(callback) => callback(),
                None => break,
            }
        }

        self.clock.borrow_mut().now = target;
    }

    /// Run the frame callbacks queued so far
    ///
    /// Callbacks requested while rendering wait for the next frame.
    pub fn render_frame(&self) {
        let frames = std::mem::take(&mut self.clock.borrow_mut().frames);
        for frame in frames {
            frame();
        }
    }

    /// Notify resize listeners
    pub fn resize(&self) {
        self.resize.emit(());
    }

    pub fn pending_timers(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.clock.borrow().frames.len()
    }

    pub fn resize_listeners(&self) -> usize {
        self.resize.len()
    }
}

impl Viewport for HeadlessViewport {
    fn on_resize(&self, mut callback: ResizeCallback) -> Registration {
        self.resize.add(Box::new(move |()| callback()))
    }

    fn set_timeout(&self, delay: Duration, callback: TaskCallback) -> TimerHandle {
        let key = {
            let mut clock = self.clock.borrow_mut();
            let key = (clock.now + delay, clock.next_id);
            clock.next_id += 1;
            clock.timers.insert(key, callback);
            key
        };

        let clock = Rc::downgrade(&self.clock);
        Registration::new(move || {
            if let Some(clock) = clock.upgrade() {
                let removed = clock.borrow_mut().timers.remove(&key);
                drop(removed);
            }
        })
    }

    fn request_animation_frame(&self, callback: TaskCallback) {
        self.clock.borrow_mut().frames.push(callback);
    }
}

/// Container that records the heights applied to it
pub struct HeadlessContainer {
    heights: RefCell<Vec<ContainerHeight>>,
    intersecting: Cell<bool>,
    observers: ListenerSet<bool>,
}

impl HeadlessContainer {
    /// A container that starts off screen
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            heights: RefCell::new(Vec::new()),
            intersecting: Cell::new(false),
            observers: ListenerSet::new(),
        })
    }

    /// Scroll the container in or out of view; observers hear about changes only
    pub fn set_intersecting(&self, intersecting: bool) {
        if self.intersecting.replace(intersecting) != intersecting {
            self.observers.emit(intersecting);
        }
    }

    /// Notify observers of the current state whether or not it changed
    ///
    /// Real observers report the initial state right after observing.
    pub fn report(&self, intersecting: bool) {
        self.intersecting.set(intersecting);
        self.observers.emit(intersecting);
    }

    pub fn is_intersecting(&self) -> bool {
        self.intersecting.get()
    }

    /// Height currently applied
    pub fn height(&self) -> ContainerHeight {
        self.heights
            .borrow()
            .last()
            .copied()
            .unwrap_or(ContainerHeight::Auto)
    }

    /// Every height applied so far, oldest first
    pub fn height_history(&self) -> Vec<ContainerHeight> {
        self.heights.borrow().clone()
    }

    pub fn observers(&self) -> usize {
        self.observers.len()
    }
}

impl Container for HeadlessContainer {
    fn set_height(&self, height: ContainerHeight) {
        self.heights.borrow_mut().push(height);
    }

    fn observe_visibility(&self, callback: VisibilityCallback) -> Registration {
        self.observers.add(callback)
    }
}

/// A call made on a [`HeadlessPlayer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Load(String),
    Play,
    Pause,
}

struct Autoplay {
    viewport: HeadlessViewport,
    loop_duration: Duration,
    pending: Option<TimerHandle>,
}

/// Player that records what it is asked to do
///
/// With autoplay enabled it behaves like a real player driven by the
/// viewport clock: `Ready` on the frame after a load, `Complete` one loop
/// duration after a load or play. Pausing drops the pending completion and
/// playing restarts the loop from the beginning.
pub struct HeadlessPlayer {
    this: Weak<HeadlessPlayer>,
    container: Option<Rc<HeadlessContainer>>,
    calls: RefCell<Vec<PlayerCall>>,
    natural_height: Cell<u32>,
    can_play: Cell<bool>,
    can_pause: Cell<bool>,
    ready: ListenerSet<()>,
    complete: ListenerSet<()>,
    autoplay: RefCell<Option<Autoplay>>,
}

impl HeadlessPlayer {
    /// A player supporting play and pause, rendering at `natural_height`
    pub fn new(container: Option<Rc<HeadlessContainer>>, natural_height: u32) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            container,
            calls: RefCell::new(Vec::new()),
            natural_height: Cell::new(natural_height),
            can_play: Cell::new(true),
            can_pause: Cell::new(true),
            ready: ListenerSet::new(),
            complete: ListenerSet::new(),
            autoplay: RefCell::new(None),
        })
    }

    /// Emit signals on the viewport clock from now on
    pub fn enable_autoplay(&self, viewport: &HeadlessViewport, loop_duration: Duration) {
        *self.autoplay.borrow_mut() = Some(Autoplay {
            viewport: viewport.clone(),
            loop_duration,
            pending: None,
        });
    }

    pub fn set_capability(&self, capability: Capability, supported: bool) {
        match capability {
            Capability::Play => self.can_play.set(supported),
            Capability::Pause => self.can_pause.set(supported),
        }
    }

    /// Change the height reported from now on
    pub fn set_natural_height(&self, height: u32) {
        self.natural_height.set(height);
    }

    /// Emit a signal to the subscribers
    pub fn emit(&self, signal: PlayerSignal) {
        match signal {
            PlayerSignal::Ready => self.ready.emit(()),
            PlayerSignal::Complete => self.complete.emit(()),
        }
    }

    pub fn subscribers(&self, signal: PlayerSignal) -> usize {
        match signal {
            PlayerSignal::Ready => self.ready.len(),
            PlayerSignal::Complete => self.complete.len(),
        }
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.borrow().clone()
    }

    /// Paths loaded so far, oldest first
    pub fn loads(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PlayerCall::Load(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &PlayerCall) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: PlayerCall) {
        self.calls.borrow_mut().push(call);
    }

    fn restart_loop(&self, announce_ready: bool) {
        let mut autoplay = self.autoplay.borrow_mut();
        let Some(autoplay) = autoplay.as_mut() else {
            return;
        };

        if let Some(pending) = autoplay.pending.take() {
            pending.cancel();
        }

        if announce_ready {
            let this = self.this.clone();
            autoplay.viewport.request_animation_frame(Box::new(move || {
                if let Some(player) = this.upgrade() {
                    player.ready.emit(());
                }
            }));
        }

        let this = self.this.clone();
        let pending = autoplay.viewport.set_timeout(
            autoplay.loop_duration,
            Box::new(move || {
                if let Some(player) = this.upgrade() {
                    player.finish_loop();
                }
            }),
        );
        autoplay.pending = Some(pending);
    }

    fn finish_loop(&self) {
        if let Some(autoplay) = self.autoplay.borrow_mut().as_mut() {
            autoplay.pending = None;
        }
        self.complete.emit(());
    }

    fn stop_loop(&self) {
        let pending = self
            .autoplay
            .borrow_mut()
            .as_mut()
            .and_then(|autoplay| autoplay.pending.take());
        if let Some(pending) = pending {
            pending.cancel();
        }
    }
}

impl AnimationPlayer for HeadlessPlayer {
    fn load(&self, path: &str) {
        self.record(PlayerCall::Load(path.to_string()));
        self.restart_loop(true);
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Play => self.can_play.get(),
            Capability::Pause => self.can_pause.get(),
        }
    }

    fn play(&self) {
        self.record(PlayerCall::Play);
        self.restart_loop(false);
    }

    fn pause(&self) {
        self.record(PlayerCall::Pause);
        self.stop_loop();
    }

    fn rendered_height(&self) -> u32 {
        self.natural_height.get()
    }

    fn subscribe(&self, signal: PlayerSignal, mut callback: SignalCallback) -> Registration {
        let listener: Box<dyn FnMut(())> = Box::new(move |()| callback());
        match signal {
            PlayerSignal::Ready => self.ready.add(listener),
            PlayerSignal::Complete => self.complete.add(listener),
        }
    }

    fn container(&self) -> Option<Rc<dyn Container>> {
        self.container
            .clone()
            .map(|container| container as Rc<dyn Container>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let viewport = HeadlessViewport::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, ms) in [("late", 30u64), ("early", 10), ("middle", 20)] {
            let order = Rc::clone(&order);
            let _ = viewport.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || order.borrow_mut().push(label)),
            );
        }

        viewport.advance(Duration::from_millis(25));
        assert_eq!(*order.borrow(), vec!["early", "middle"]);
        assert_eq!(viewport.now(), Duration::from_millis(25));

        viewport.advance(Duration::from_millis(5));
        assert_eq!(*order.borrow(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_cancelled_timer_does_not_fire() {
        let viewport = HeadlessViewport::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);

        let handle = viewport.set_timeout(Duration::from_millis(10), Box::new(move || flag.set(true)));
        handle.cancel();
        viewport.advance(Duration::from_millis(20));

        assert!(!fired.get());
    }

    #[test]
    fn test_frames_requested_while_rendering_wait() {
        let viewport = HeadlessViewport::new();
        let frames = Rc::new(Cell::new(0));

        let inner_viewport = viewport.clone();
        let counter = Rc::clone(&frames);
        viewport.request_animation_frame(Box::new(move || {
            counter.set(counter.get() + 1);
            let counter = Rc::clone(&counter);
            inner_viewport.request_animation_frame(Box::new(move || counter.set(counter.get() + 1)));
        }));

        viewport.render_frame();
        assert_eq!(frames.get(), 1);
        assert_eq!(viewport.pending_frames(), 1);

        viewport.render_frame();
        assert_eq!(frames.get(), 2);
    }

    #[test]
    fn test_container_notifies_on_change_only() {
        let container = HeadlessContainer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let registration = container.observe_visibility(Box::new(move |visible| log.borrow_mut().push(visible)));

        container.set_intersecting(true);
        container.set_intersecting(true);
        container.set_intersecting(false);
        assert_eq!(*seen.borrow(), vec![true, false]);

        container.report(false);
        assert_eq!(*seen.borrow(), vec![true, false, false]);
        assert!(!container.is_intersecting());

        registration.cancel();
        container.set_intersecting(true);
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(container.observers(), 0);
    }

    #[test]
    fn test_autoplay_emits_ready_then_complete() {
        let viewport = HeadlessViewport::new();
        let player = HeadlessPlayer::new(None, 120);
        player.enable_autoplay(&viewport, Duration::from_millis(500));

        let signals = Rc::new(RefCell::new(Vec::new()));
        for signal in [PlayerSignal::Ready, PlayerSignal::Complete] {
            let signals = Rc::clone(&signals);
            let _ = player.subscribe(signal, Box::new(move || signals.borrow_mut().push(signal)));
        }

        player.load("/a.json");
        viewport.render_frame();
        assert_eq!(*signals.borrow(), vec![PlayerSignal::Ready]);

        player.pause();
        viewport.advance(Duration::from_secs(1));
        assert_eq!(signals.borrow().len(), 1);

        player.play();
        viewport.advance(Duration::from_millis(500));
        assert_eq!(*signals.borrow(), vec![PlayerSignal::Ready, PlayerSignal::Complete]);
        assert_eq!(
            player.calls(),
            vec![PlayerCall::Load("/a.json".to_string()), PlayerCall::Pause, PlayerCall::Play]
        );
    }
}
