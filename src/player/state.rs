//! Playback state for one controller

/// Flags the controller keeps between callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// Index of the asset loaded last
    pub current_index: Option<usize>,

    /// Container intersects the viewport
    pub is_visible: bool,

    /// Paused by the page
    pub is_paused: bool,

    /// Player signal hooks are registered
    pub is_initialized: bool,

    /// Container height has been pinned at least once
    pub height_set: bool,
}

impl PlaybackState {
    /// Selection and playback are allowed
    pub fn can_play(&self) -> bool {
        self.is_visible && !self.is_paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PlaybackState::default();
        assert_eq!(state.current_index, None);
        assert!(!state.is_visible);
        assert!(!state.is_paused);
        assert!(!state.is_initialized);
        assert!(!state.height_set);
        assert!(!state.can_play());
    }

    #[test]
    fn test_can_play_needs_visible_and_unpaused() {
        let mut state = PlaybackState {
            is_visible: true,
            ..Default::default()
        };
        assert!(state.can_play());

        state.is_paused = true;
        assert!(!state.can_play());

        state.is_paused = false;
        state.is_visible = false;
        assert!(!state.can_play());
    }
}
