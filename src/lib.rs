//! # reflexbox
//!
//! Firmware core for a reaction-game appliance: five labeled buttons, each
//! paired with an indicator light, plus a small text screen.
//!
//! - **State machine**: [`state`] holds the transition table, [`game`] the
//!   controller loop that drives it
//! - **Input**: raw press/release/hold signals become taps and long holds in
//!   [`input`]
//! - **Effects**: cancellable primary and secondary output tasks in [`effects`]
//! - **Score**: [`score::Score`], reset on every fresh game
//!
//! Everything above is hardware independent and tested on the host. The
//! `board` feature adds the ESP32-S3 drivers and the `reflexbox` binary.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let peripherals = reflexbox::init();
//! let resources = reflexbox::split_resources!(peripherals);
//!
//! let panel = reflexbox::Panel::bring_up(resources.display);
//! let buttons: reflexbox::Buttons = resources.buttons.into();
//! let leds = reflexbox::Leds::try_from(resources.leds)?;
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod effects;
pub mod error;
pub mod game;
pub mod input;
pub mod outputs;
pub mod rng;
pub mod score;
pub mod screen;
pub mod state;

#[cfg(feature = "board")]
mod board;
#[cfg(feature = "board")]
mod buttons;
#[cfg(feature = "board")]
mod display;
#[cfg(feature = "board")]
mod leds;

#[cfg(feature = "board")]
pub use board::*;
#[cfg(feature = "board")]
pub use buttons::Buttons;
#[cfg(feature = "board")]
pub use display::{
    Backlight,
    Display,
    Panel,
};
#[cfg(feature = "board")]
pub use leds::{
    BAR_COUNT,
    LED_COUNT,
    Leds,
};

/// StaticCell helper: allocates a value into a `static` exactly once.
#[macro_export]
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}
