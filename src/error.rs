//! Error taxonomy.
//!
//! Only hardware bring-up can fail. Cancelling an idle effect and inputs the
//! transition table has no entry for are no-ops, not errors.

/// Peripheral group that failed to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Display,
    Leds,
    Buttons,
}

impl core::fmt::Display for Peripheral {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Display => "display",
            Self::Leds => "LED strip",
            Self::Buttons => "buttons",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bring-up failed. The firmware keeps going without the peripheral.
    #[error("{0} failed to initialise")]
    HardwareInit(Peripheral),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
