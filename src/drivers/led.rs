//! Indicator LED pattern engine and driver.
//!
//! Each of the two indicator LEDs owns one engine.  The control loop
//! sets a base pattern per state and can lay a timed overlay on top
//! (denial flash); `level(now)` resolves what the pin should show.
//!
//! | Pattern     | Description                  | Half-period |
//! |-------------|------------------------------|-------------|
//! | Off         | Dark                         | -           |
//! | Solid       | Constantly lit               | -           |
//! | SlowBlink   | "Authorized, not in use"     | 500 ms      |
//! | RapidFlash  | "Denied / error"             | 120 ms      |

use embedded_hal::digital::{OutputPin, PinState};

pub const SLOW_BLINK_HALF_PERIOD_MS: u64 = 500;
pub const RAPID_FLASH_HALF_PERIOD_MS: u64 = 120;
/// How long a denial flash overrides the base pattern.
pub const DENIAL_FLASH_MS: u64 = 1_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Off,
    Solid,
    SlowBlink,
    RapidFlash,
}

impl Pattern {
    /// Level at `elapsed_ms` into the pattern; blinking patterns start lit.
    fn level_at(self, elapsed_ms: u64) -> bool {
        match self {
            Self::Off => false,
            Self::Solid => true,
            Self::SlowBlink => (elapsed_ms / SLOW_BLINK_HALF_PERIOD_MS) % 2 == 0,
            Self::RapidFlash => (elapsed_ms / RAPID_FLASH_HALF_PERIOD_MS) % 2 == 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Overlay {
    pattern: Pattern,
    since_ms: u64,
    until_ms: u64,
}

/// Single-LED pattern engine.  Stack-only, no hardware.
#[derive(Debug, Clone)]
pub struct LedPatternEngine {
    base: Pattern,
    base_since_ms: u64,
    overlay: Option<Overlay>,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            base: Pattern::Off,
            base_since_ms: 0,
            overlay: None,
        }
    }

    /// Set the base pattern.  Re-setting the same pattern keeps its phase.
    pub fn set_pattern(&mut self, pattern: Pattern, now_ms: u64) {
        if pattern != self.base {
            self.base = pattern;
            self.base_since_ms = now_ms;
        }
    }

    /// Show `pattern` for `duration_ms`, then fall back to the base.
    pub fn overlay(&mut self, pattern: Pattern, now_ms: u64, duration_ms: u64) {
        self.overlay = Some(Overlay {
            pattern,
            since_ms: now_ms,
            until_ms: now_ms.saturating_add(duration_ms),
        });
    }

    pub fn pattern(&self) -> Pattern {
        self.base
    }

    /// Resolve the LED level at `now_ms`, expiring a finished overlay.
    pub fn level(&mut self, now_ms: u64) -> bool {
        if let Some(o) = self.overlay {
            if now_ms < o.until_ms {
                return o.pattern.level_at(now_ms.saturating_sub(o.since_ms));
            }
            self.overlay = None;
        }
        self.base.level_at(now_ms.saturating_sub(self.base_since_ms))
    }
}

/// An indicator LED: engine plus an active-high output pin.
pub struct LedDriver<P: OutputPin> {
    pin: P,
    engine: LedPatternEngine,
    lit: Option<bool>,
}

impl<P: OutputPin> LedDriver<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            engine: LedPatternEngine::new(),
            lit: None,
        }
    }

    pub fn engine(&mut self) -> &mut LedPatternEngine {
        &mut self.engine
    }

    /// Write the current level to the pin if it changed.
    pub fn refresh(&mut self, now_ms: u64) -> Result<(), P::Error> {
        let level = self.engine.level(now_ms);
        if self.lit != Some(level) {
            self.pin.set_state(PinState::from(level))?;
            self.lit = Some(level);
        }
        Ok(())
    }

    pub fn is_lit(&self) -> bool {
        self.lit == Some(true)
    }
}
