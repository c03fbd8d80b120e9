use crate::lyrics::Cue;

/// Transport position of the external playback element, in seconds.
///
/// The core only ever reads it; the embedder advances it in real time and
/// may seek anywhere at any moment, which the next poll simply reflects.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    /// Jumps the transport. Seeking is always legal, including backwards.
    pub fn seek(&mut self, seconds: f32) {
        self.time_seconds = seconds.max(0.0);
    }
}

/// Immutable cue store queried by playback position.
///
/// Cues keep the order the parser produced; the lookup tolerates unsorted
/// and duplicate-timestamp input by scanning the whole list on every query,
/// which is cheap at lyric-sheet sizes.
#[derive(Debug, Default)]
pub struct CueTimeline {
    cues: Vec<Cue>,
}

impl CueTimeline {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    /// Index of the last cue in sequence order whose timestamp is at or
    /// before `position`, or `None` when no cue has started yet.
    ///
    /// Idempotent for repeated positions; a rewound position reverts to the
    /// earlier cue rather than sticking to a later one.
    pub fn active_index(&self, position: f32) -> Option<usize> {
        let mut active = None;
        for (index, cue) in self.cues.iter().enumerate() {
            if cue.time <= position {
                active = Some(index);
            }
        }
        active
    }

    /// Convenience lookup returning the cue itself.
    pub fn active_cue(&self, position: f32) -> Option<&Cue> {
        self.active_index(position).and_then(|index| self.get(index))
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Holder of the currently selected cue index.
///
/// State changes only when a lookup or a recognized match *supersedes* the
/// current selection; a `None` result leaves the previous line in place, so
/// seeking before the first cue keeps the last lyric on screen.
#[derive(Debug, Default, Clone)]
pub struct ActiveCueState {
    current: Option<usize>,
}

impl ActiveCueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `candidate` when it names a different cue than the current
    /// selection. Returns whether a transition happened, which callers use
    /// to suppress redundant re-renders.
    pub fn supersede(&mut self, candidate: Option<usize>) -> bool {
        match candidate {
            Some(index) if self.current != Some(index) => {
                self.current = Some(index);
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(times: &[f32]) -> CueTimeline {
        CueTimeline::new(
            times
                .iter()
                .enumerate()
                .map(|(i, &t)| Cue::new(t, format!("line {i}")))
                .collect(),
        )
    }

    #[test]
    fn returns_none_before_first_cue() {
        let timeline = timeline(&[5.0, 10.0]);
        assert_eq!(timeline.active_index(4.9), None);
        assert_eq!(timeline.active_index(5.0), Some(0));
    }

    #[test]
    fn forward_positions_never_regress() {
        let timeline = timeline(&[1.0, 2.5, 7.0, 30.0]);
        let positions = [0.0, 1.0, 2.0, 2.5, 5.0, 7.1, 29.9, 30.0, 60.0];
        let mut last = None;
        for &p in &positions {
            let index = timeline.active_index(p);
            assert!(index >= last, "index regressed at position {p}");
            last = index;
        }
    }

    #[test]
    fn seeking_backwards_reverts_to_earlier_cue() {
        let timeline = timeline(&[1.0, 5.0, 9.0]);
        let at_peak = timeline.active_index(9.5).unwrap();
        assert_eq!(at_peak, 2);
        let rewound = timeline.active_index(4.0);
        assert_eq!(rewound, Some(0));
        assert!(rewound.unwrap() <= at_peak);
        assert_eq!(timeline.active_index(0.5), None);
    }

    #[test]
    fn duplicate_timestamps_pick_the_later_cue() {
        let timeline = timeline(&[3.0, 3.0, 8.0]);
        assert_eq!(timeline.active_index(3.0), Some(1));
    }

    #[test]
    fn unsorted_input_still_finds_last_qualifying() {
        let timeline = timeline(&[10.0, 5.0]);
        assert_eq!(timeline.active_index(7.0), Some(1));
        assert_eq!(timeline.active_index(12.0), Some(1));
    }

    #[test]
    fn clock_advances_and_seeks_with_floor_at_zero() {
        let mut clock = PlaybackClock::default();
        clock.advance(1.5);
        assert_eq!(clock.time_seconds, 1.5);
        clock.advance(-5.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.seek(42.0);
        assert_eq!(clock.time_seconds, 42.0);
        clock.seek(-1.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn supersede_dedupes_and_ignores_none() {
        let mut state = ActiveCueState::new();
        assert_eq!(state.current(), None);
        assert!(state.supersede(Some(2)));
        assert!(!state.supersede(Some(2)), "repeat selection must not re-fire");
        assert!(!state.supersede(None), "no qualifying cue keeps the last line");
        assert_eq!(state.current(), Some(2));
        assert!(state.supersede(Some(0)), "rewinding to an earlier cue re-fires");
        assert_eq!(state.current(), Some(0));
    }
}
