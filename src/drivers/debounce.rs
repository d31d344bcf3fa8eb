//! Debounced digital input.
//!
//! Turns a noisy raw level, sampled once per control-loop poll, into a
//! stream of logical edges.  Polarity is applied before filtering, so
//! everything downstream only ever sees "active" / "inactive".
//!
//! ```text
//!  raw      ‾‾|_|‾|_______________|‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//!  logical  ______________|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_____
//!                  ◀─ debounce_ms ─▶
//! ```

use embedded_hal::digital::InputPin;

use crate::config::SignalConfig;

/// A stable logical transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Activated,
    Deactivated,
}

/// Pure debounce filter; owns no hardware.
#[derive(Debug, Clone)]
pub struct DebouncedInput {
    active_low: bool,
    debounce_ms: u64,
    stable: bool,
    candidate: bool,
    candidate_since_ms: u64,
}

impl DebouncedInput {
    /// Starts logically inactive.
    pub fn new(active_low: bool, debounce_ms: u32) -> Self {
        Self {
            active_low,
            debounce_ms: u64::from(debounce_ms),
            stable: false,
            candidate: false,
            candidate_since_ms: 0,
        }
    }

    pub fn from_config(cfg: &SignalConfig) -> Self {
        Self::new(cfg.active_low, cfg.debounce_ms)
    }

    /// Feed one raw electrical sample taken at `now_ms`.
    ///
    /// Returns an edge only once the logical level has held for the full
    /// window; any flip inside the window restarts it.
    pub fn sample(&mut self, raw_high: bool, now_ms: u64) -> Option<Edge> {
        let logical = raw_high != self.active_low;

        if logical != self.candidate {
            self.candidate = logical;
            self.candidate_since_ms = now_ms;
        }

        if self.candidate != self.stable
            && now_ms.saturating_sub(self.candidate_since_ms) >= self.debounce_ms
        {
            self.stable = self.candidate;
            return Some(if self.stable {
                Edge::Activated
            } else {
                Edge::Deactivated
            });
        }
        None
    }

    /// Current debounced logical level.
    pub fn is_active(&self) -> bool {
        self.stable
    }
}

/// A [`DebouncedInput`] bound to a GPIO input.
pub struct DebouncedPin<P: InputPin> {
    pin: P,
    filter: DebouncedInput,
}

impl<P: InputPin> DebouncedPin<P> {
    pub fn new(pin: P, cfg: &SignalConfig) -> Self {
        Self {
            pin,
            filter: DebouncedInput::from_config(cfg),
        }
    }

    /// Read the pin once and run it through the filter.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Edge>, P::Error> {
        let raw = self.pin.is_high()?;
        Ok(self.filter.sample(raw, now_ms))
    }

    pub fn is_active(&self) -> bool {
        self.filter.is_active()
    }
}
