//! Button gesture classification.
//!
//! Button watchers report raw `Pressed`, `HeldLong` and `Released` signals.
//! [`InputProcessor`] turns them into taps and long-holds per input:
//!
//! | Signal     | Condition                                  | Event      |
//! |------------|--------------------------------------------|------------|
//! | `HeldLong` | input pressed, no hold reported yet        | `LongHold` |
//! | `Released` | pressed for less than the hold threshold,  | `Tap`      |
//! |            | and no hold was reported for this press    |            |
//!
//! The hold guard makes tap and long-hold mutually exclusive for one press
//! even if a driver delivers the release before the hold signal.

use embassy_time::{
    Duration,
    Instant,
};
use heapless::Vec;

use crate::config::MAX_INPUTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalKind {
    Pressed,
    Released,
    /// Fired once per continuous press after the hold threshold.
    HeldLong,
}

/// One raw signal from a button watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSignal {
    pub input: u8,
    pub kind: SignalKind,
    pub at: Instant,
}

impl RawSignal {
    pub const fn new(input: u8, kind: SignalKind, at: Instant) -> Self {
        Self { input, kind, at }
    }

    /// Signal stamped with the current time.
    pub fn now(input: u8, kind: SignalKind) -> Self {
        Self::new(input, kind, Instant::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    Tap,
    LongHold,
}

/// A classified gesture on one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputEvent {
    pub input: u8,
    pub gesture: Gesture,
}

/// Timing state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputChannel {
    id: u8,
    pressed_at: Option<Instant>,
    hold_reported: bool,
}

impl InputChannel {
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            pressed_at: None,
            hold_reported: false,
        }
    }

    pub const fn id(&self) -> u8 {
        self.id
    }

    pub const fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    fn press(&mut self, at: Instant) {
        self.pressed_at = Some(at);
        self.hold_reported = false;
    }

    fn hold(&mut self) -> Option<Gesture> {
        if self.pressed_at.is_none() || self.hold_reported {
            return None;
        }
        self.hold_reported = true;
        Some(Gesture::LongHold)
    }

    fn release(&mut self, at: Instant, threshold: Duration) -> Option<Gesture> {
        let pressed_at = self.pressed_at.take()?;
        if self.hold_reported {
            self.hold_reported = false;
            return None;
        }
        // A release stamped before its press (clock skew between watchers) is a tap.
        let held = at.checked_duration_since(pressed_at).unwrap_or_default();
        (held < threshold).then_some(Gesture::Tap)
    }
}

/// Per-input gesture classifier owned by the controller.
pub struct InputProcessor {
    channels: Vec<InputChannel, MAX_INPUTS>,
    threshold: Duration,
}

impl InputProcessor {
    /// Classifier for inputs `0..count`. `count` is capped at [`MAX_INPUTS`]; zero is
    /// the degraded, input-less mode.
    pub fn new(count: usize, threshold: Duration) -> Self {
        let channels = (0..count.min(MAX_INPUTS))
            .map(|id| InputChannel::new(id as u8))
            .collect();
        Self {
            channels,
            threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, input: u8) -> Option<&InputChannel> {
        self.channels.get(usize::from(input))
    }

    /// Feed one raw signal. Returns the gesture it completes, if any.
    pub fn process(&mut self, signal: RawSignal) -> Option<InputEvent> {
        let threshold = self.threshold;
        let channel = self.channels.get_mut(usize::from(signal.input))?;
        let gesture = match signal.kind {
            SignalKind::Pressed => {
                channel.press(signal.at);
                None
            }
            SignalKind::HeldLong => channel.hold(),
            SignalKind::Released => channel.release(signal.at, threshold),
        }?;
        Some(InputEvent {
            input: channel.id,
            gesture,
        })
    }
}
