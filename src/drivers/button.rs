//! Polled, time-debounced push-button.
//!
//! ## Hardware
//!
//! Momentary switch to ground with the internal pull-up enabled, so the
//! line reads LOW while pressed. The main loop samples the level on every
//! pass and feeds it to [`InputDebouncer::update`].
//!
//! ## Debounce rule
//!
//! | Condition                                              | Result              |
//! |--------------------------------------------------------|---------------------|
//! | raw level changed                                      | restart hold timer  |
//! | raw held >= window, differs from stable, is active     | stable := raw, press |
//! | raw held >= window, differs from stable, is inactive   | stable := raw (release) |
//!
//! Holding the button never repeats the event; bounce shorter than the
//! window restarts the timer and is swallowed.

/// A debounced press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleEvent {
    pub at_ms: u64,
}

/// Snapshot of the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    /// Last level sampled from the pin.
    pub raw: bool,
    /// Level accepted after the debounce window.
    pub stable: bool,
    pub last_change_at_ms: u64,
    /// Flips on every press.
    pub toggled: bool,
}

pub struct InputDebouncer {
    /// Level that means "pressed".
    active_level: bool,
    window_ms: u64,
    state: ButtonState,
}

impl InputDebouncer {
    /// Starts in the released state.
    pub fn new(active_low: bool, window_ms: u32) -> Self {
        let active_level = !active_low;
        Self {
            active_level,
            window_ms: u64::from(window_ms),
            state: ButtonState {
                raw: !active_level,
                stable: !active_level,
                last_change_at_ms: 0,
                toggled: false,
            },
        }
    }

    /// Feed one raw sample. Returns a press event at most once per press.
    pub fn update(&mut self, raw_level: bool, now_ms: u64) -> Option<ToggleEvent> {
        let s = &mut self.state;

        if raw_level != s.raw {
            s.raw = raw_level;
            s.last_change_at_ms = now_ms;
            return None;
        }

        if s.raw == s.stable || now_ms.saturating_sub(s.last_change_at_ms) < self.window_ms {
            return None;
        }

        s.stable = s.raw;
        if s.stable == self.active_level {
            s.toggled = !s.toggled;
            Some(ToggleEvent { at_ms: now_ms })
        } else {
            None
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.state.stable == self.active_level
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }
}
