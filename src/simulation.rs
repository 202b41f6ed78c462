//! Scripted controller runs on the headless host
//!
//! A [`Simulation`] wires a playback controller to an autoplaying
//! [`HeadlessPlayer`] and advances the virtual clock one frame per
//! [`Simulation::step`], scrolling the container and resizing the viewport
//! at the planned times.

use crate::assets::AssetList;
use crate::host::headless::{HeadlessContainer, HeadlessPlayer, HeadlessViewport};
use crate::host::ContainerHeight;
use crate::player::{try_initialize, ControllerHandle, ControllerOptions};
use crate::utils::error::{AnimloopError, Result};
use crate::utils::format_elapsed;
use log::info;
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;

/// One simulated display frame
pub const FRAME: Duration = Duration::from_millis(16);

/// What to simulate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationPlan {
    /// Stop after this many loads
    pub loops: u32,

    /// Length of one animation loop
    pub loop_duration: Duration,

    /// Rendered player height in pixels
    pub height: u32,

    /// Scroll the container out of view at this time
    pub hide_at: Option<Duration>,

    /// Scroll the container back into view at this time
    pub show_at: Option<Duration>,

    /// Resize the viewport at these times
    pub resize_at: Vec<Duration>,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            loops: 10,
            loop_duration: Duration::from_millis(2000),
            height: 320,
            hide_at: None,
            show_at: None,
            resize_at: Vec::new(),
        }
    }
}

impl SimulationPlan {
    /// Virtual time after which the run gives up
    ///
    /// One loop more than requested plus the hidden stretch.
    pub fn budget(&self) -> Result<Duration> {
        let hidden = match (self.hide_at, self.show_at) {
            (Some(hide), Some(show)) if show > hide => show - hide,
            _ => Duration::ZERO,
        };

        self.loops
            .checked_add(1)
            .and_then(|loops| self.loop_length().checked_mul(loops))
            .and_then(|playing| playing.checked_add(hidden))
            .ok_or_else(|| {
                AnimloopError::InvalidInput(format!(
                    "{} loops of {}ms do not fit in a simulation",
                    self.loops,
                    self.loop_duration.as_millis()
                ))
            })
    }

    /// Loop length, at least one millisecond
    fn loop_length(&self) -> Duration {
        self.loop_duration.max(Duration::from_millis(1))
    }
}

/// What a simulation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub loads: Vec<String>,
    pub adjacent_repeats: usize,
    pub container_height: String,
    pub elapsed_ms: u128,
}

/// A controller running on the virtual clock
pub struct Simulation {
    viewport: HeadlessViewport,
    container: Rc<HeadlessContainer>,
    player: Rc<HeadlessPlayer>,
    handle: ControllerHandle,
    loops: usize,
    budget: Duration,
    hide_at: Option<Duration>,
    show_at: Option<Duration>,
    resizes: Vec<Duration>,
    reported: usize,
    last_height: ContainerHeight,
}

impl Simulation {
    /// Start the controller and scroll the container into view
    pub fn start(plan: SimulationPlan, assets: AssetList, options: ControllerOptions) -> Result<Self> {
        let budget = plan.budget()?;

        let viewport = HeadlessViewport::new();
        let container = HeadlessContainer::new();
        let player = HeadlessPlayer::new(Some(container.clone()), plan.height);
        player.enable_autoplay(&viewport, plan.loop_length());

        let handle = try_initialize(Rc::new(viewport.clone()), Some(player.clone()), assets, options)?;

        info!("Container scrolled into view");
        container.set_intersecting(true);

        // Popped from the back, earliest last.
        let mut resizes = plan.resize_at;
        resizes.sort_unstable_by(|a, b| b.cmp(a));

        Ok(Self {
            last_height: container.height(),
            viewport,
            container,
            player,
            handle,
            loops: plan.loops as usize,
            budget,
            hide_at: plan.hide_at,
            show_at: plan.show_at,
            resizes,
            reported: 0,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.player.loads().len() >= self.loops || self.viewport.now() > self.budget
    }

    /// Apply the events due now, render a frame and advance the clock by [`FRAME`]
    pub fn step(&mut self) {
        let now = self.viewport.now();

        if self.hide_at.is_some_and(|at| now >= at) {
            self.hide_at = None;
            info!("[{}] Container scrolled out of view", format_elapsed(now));
            self.container.set_intersecting(false);
        }
        if self.hide_at.is_none() && self.show_at.is_some_and(|at| now >= at) {
            self.show_at = None;
            info!("[{}] Container scrolled into view", format_elapsed(now));
            self.container.set_intersecting(true);
        }
        while self.resizes.last().is_some_and(|at| now >= *at) {
            self.resizes.pop();
            info!("[{}] Viewport resized", format_elapsed(now));
            self.viewport.resize();
        }

        self.viewport.render_frame();
        self.viewport.advance(FRAME);

        let now = format_elapsed(self.viewport.now());
        let loads = self.player.loads();
        for path in loads.iter().skip(self.reported) {
            info!("[{}] Loaded {}", now, path);
        }
        self.reported = loads.len();

        let height = self.container.height();
        if height != self.last_height {
            info!("[{}] Container height {}", now, height);
            self.last_height = height;
        }
    }

    /// Step until the plan is exhausted
    pub fn run(mut self) -> SimulationSummary {
        while !self.is_finished() {
            self.step();
        }
        self.finish()
    }

    /// Dispose the controller and summarize the run
    pub fn finish(self) -> SimulationSummary {
        let loads = self.player.loads();
        let elapsed = self.viewport.now();
        info!(
            "Simulation finished after {} with {} loads",
            format_elapsed(elapsed),
            loads.len()
        );
        self.handle.dispose();

        SimulationSummary {
            adjacent_repeats: loads.windows(2).filter(|pair| pair[0] == pair[1]).count(),
            loads,
            container_height: self.container.height().to_string(),
            elapsed_ms: elapsed.as_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(count: usize) -> AssetList {
        AssetList::with_prefix("/anims", (0..count).map(|i| format!("{}.json", i)))
    }

    fn seeded(seed: u64) -> ControllerOptions {
        ControllerOptions {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_budget() {
        let plan = SimulationPlan {
            loops: 3,
            loop_duration: Duration::from_millis(1000),
            hide_at: Some(Duration::from_millis(500)),
            show_at: Some(Duration::from_millis(2500)),
            ..Default::default()
        };
        assert_eq!(plan.budget().unwrap(), Duration::from_millis(6000));

        let plan = SimulationPlan {
            show_at: Some(Duration::from_millis(100)),
            ..plan
        };
        assert_eq!(plan.budget().unwrap(), Duration::from_millis(4000));
    }

    #[test]
    fn test_budget_overflow_is_an_error() {
        let plan = SimulationPlan {
            loops: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(plan.budget(), Err(AnimloopError::InvalidInput(_))));

        let plan = SimulationPlan {
            loops: 2,
            loop_duration: Duration::MAX,
            ..Default::default()
        };
        assert!(matches!(plan.budget(), Err(AnimloopError::InvalidInput(_))));
    }

    #[test]
    fn test_run_stops_at_requested_loads() {
        let plan = SimulationPlan {
            loops: 6,
            loop_duration: Duration::from_millis(500),
            height: 200,
            ..Default::default()
        };

        let summary = Simulation::start(plan, assets(4), seeded(1)).unwrap().run();

        assert_eq!(summary.loads.len(), 6);
        assert_eq!(summary.adjacent_repeats, 0);
        assert_eq!(summary.container_height, "200px");
        assert!(summary.loads.iter().all(|path| path.starts_with("/anims/")));
        assert!(summary.elapsed_ms >= 2500 && summary.elapsed_ms < 3000);
    }

    #[test]
    fn test_hidden_stretch_pauses_loading() {
        let plan = SimulationPlan {
            loops: 4,
            loop_duration: Duration::from_millis(1000),
            hide_at: Some(Duration::from_millis(1500)),
            show_at: Some(Duration::from_millis(5500)),
            ..Default::default()
        };

        let mut simulation = Simulation::start(plan, assets(3), seeded(2)).unwrap();
        while simulation.viewport.now() < Duration::from_millis(5000) {
            simulation.step();
        }
        // Loads at 0ms and 1000ms, nothing while hidden.
        assert_eq!(simulation.player.loads().len(), 2);

        let summary = simulation.run();
        assert_eq!(summary.loads.len(), 4);
        assert_eq!(summary.adjacent_repeats, 0);
        assert!(summary.elapsed_ms > 5500);
    }

    #[test]
    fn test_resizes_fire_at_planned_times() {
        let plan = SimulationPlan {
            loops: 3,
            loop_duration: Duration::from_millis(1000),
            height: 240,
            resize_at: vec![Duration::from_millis(600), Duration::from_millis(200)],
            ..Default::default()
        };

        let mut simulation = Simulation::start(plan, assets(3), seeded(3)).unwrap();
        while simulation.viewport.now() < Duration::from_millis(1000) {
            simulation.step();
        }

        assert!(simulation.resizes.is_empty());
        assert_eq!(
            simulation.container.height_history(),
            vec![
                ContainerHeight::Pixels(240),
                ContainerHeight::Auto,
                ContainerHeight::Pixels(240),
                ContainerHeight::Auto,
                ContainerHeight::Pixels(240),
            ]
        );
        simulation.finish();
    }

    #[test]
    fn test_empty_asset_list_runs_out_the_budget() {
        let plan = SimulationPlan {
            loops: 2,
            loop_duration: Duration::from_millis(100),
            ..Default::default()
        };

        let summary = Simulation::start(plan, AssetList::default(), seeded(4)).unwrap().run();

        assert!(summary.loads.is_empty());
        assert!(summary.elapsed_ms > 300);
        assert_eq!(summary.container_height, "auto");
    }
}
