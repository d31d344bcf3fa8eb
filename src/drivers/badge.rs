//! Badge reader framing.
//!
//! Serial and keyboard-wedge readers send the credential as printable
//! ASCII followed by CR and/or LF.  `BadgeFramer` turns that byte stream
//! into whole badge ids; `BadgeReader` adds the optional "card present"
//! trigger line on top.

use log::{debug, warn};

use super::debounce::{DebouncedInput, Edge};
use crate::config::BadgeReaderConfig;

pub const MAX_BADGE_LEN: usize = 32;

/// Fixed-capacity badge id.
pub type BadgeId = heapless::String<MAX_BADGE_LEN>;

pub struct BadgeFramer {
    buf: BadgeId,
    overflow: bool,
    last_byte_ms: Option<u64>,
    gap_ms: u64,
}

impl BadgeFramer {
    /// `gap_ms` is the longest silence allowed inside one id.
    pub fn new(gap_ms: u32) -> Self {
        Self {
            buf: BadgeId::new(),
            overflow: false,
            last_byte_ms: None,
            gap_ms: u64::from(gap_ms),
        }
    }

    /// Feed one byte received at `now_ms`; returns an id on terminator.
    pub fn push(&mut self, byte: u8, now_ms: u64) -> Option<BadgeId> {
        if let Some(last) = self.last_byte_ms {
            if now_ms.saturating_sub(last) > self.gap_ms && self.has_partial() {
                debug!("BADGE: read cycle timed out, discarding partial id");
                self.reset();
            }
        }
        self.last_byte_ms = Some(now_ms);

        match byte {
            b'\r' | b'\n' => self.finish(),
            b if b.is_ascii_graphic() => {
                if self.buf.push(char::from(b)).is_err() {
                    self.overflow = true;
                }
                None
            }
            _ => None,
        }
    }

    /// Drop any partial id (e.g. after an auth call blocked the loop).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflow = false;
    }

    fn has_partial(&self) -> bool {
        !self.buf.is_empty() || self.overflow
    }

    fn finish(&mut self) -> Option<BadgeId> {
        if self.overflow {
            warn!("BADGE: id longer than {MAX_BADGE_LEN} chars, discarded");
            self.reset();
            return None;
        }
        if self.buf.is_empty() {
            return None;
        }
        Some(core::mem::take(&mut self.buf))
    }
}

/// Framer plus optional presentation trigger.
pub struct BadgeReader {
    framer: BadgeFramer,
    trigger: Option<DebouncedInput>,
    presented_at_ms: Option<u64>,
    window_ms: u64,
    superseded: u32,
}

impl BadgeReader {
    pub fn new(cfg: &BadgeReaderConfig) -> Self {
        Self {
            framer: BadgeFramer::new(cfg.timeout_ms),
            trigger: cfg.trigger.as_ref().map(DebouncedInput::from_config),
            presented_at_ms: None,
            window_ms: u64::from(cfg.timeout_ms),
            superseded: 0,
        }
    }

    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }

    /// Sample the trigger line, if one is configured.
    pub fn sample_trigger(&mut self, raw_high: bool, now_ms: u64) {
        if let Some(trigger) = self.trigger.as_mut() {
            if trigger.sample(raw_high, now_ms) == Some(Edge::Activated) {
                self.presented_at_ms = Some(now_ms);
            }
        }
    }

    /// Feed received bytes; returns the last accepted id in the chunk.
    /// Earlier ids in the same chunk are dropped and logged.
    pub fn feed(&mut self, bytes: &[u8], now_ms: u64) -> Option<BadgeId> {
        let mut accepted: Option<BadgeId> = None;
        for &b in bytes {
            if let Some(id) = self.framer.push(b, now_ms) {
                if self.presentation_confirmed(now_ms) {
                    if let Some(prev) = accepted.replace(id) {
                        self.superseded = self.superseded.wrapping_add(1);
                        warn!("BADGE: id '{prev}' superseded by a later scan, ignored");
                    }
                } else {
                    warn!("BADGE: id '{id}' without card presentation, ignored");
                }
            }
        }
        accepted
    }

    /// Ids dropped because a later one arrived in the same chunk.
    pub fn superseded(&self) -> u32 {
        self.superseded
    }

    /// Forget everything in flight.
    pub fn discard_pending(&mut self) {
        self.framer.reset();
        self.presented_at_ms = None;
    }

    fn presentation_confirmed(&mut self, now_ms: u64) -> bool {
        if self.trigger.is_none() {
            return true;
        }
        match self.presented_at_ms.take() {
            Some(at) => now_ms.saturating_sub(at) <= self.window_ms,
            None => false,
        }
    }
}
