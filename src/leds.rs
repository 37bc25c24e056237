//! Indicator lights on the WS2812 strip, driven by the RMT peripheral.
//!
//! The strip is two bars of five LEDs. Indicator `i` is LED `i` on both
//! bars, counted bottom to top, lit in its label's color.

extern crate alloc;

use embassy_time::{
    Duration,
    Instant,
    Timer,
};
use esp_hal::{
    Blocking,
    gpio::{
        Level,
        Output,
        OutputConfig,
    },
    rmt::{
        PulseCode,
        Rmt,
        Tx,
        TxChannelConfig,
        TxChannelCreator as _,
    },
    time::Rate,
};
use palette::Srgb;

use crate::{
    LedResources,
    config::{
        Label,
        MAX_INPUTS,
        label_of,
    },
    error::{
        Error,
        Peripheral,
    },
    outputs::{
        IndicatorMode,
        Outputs,
        Screen,
    },
};

/// LEDs on the strip: two bars of [`BAR_COUNT`].
pub const LED_COUNT: usize = 10;

/// LEDs per bar. One per indicator.
pub const BAR_COUNT: usize = MAX_INPUTS;

const DARK: Srgb<u8> = Srgb::new(0, 0, 0);

/// Dimmed label colors; full brightness is blinding on the badge.
const fn color_of(label: Label) -> Srgb<u8> {
    match label {
        Label::Green => Srgb::new(0, 24, 0),
        Label::Yellow => Srgb::new(24, 18, 0),
        Label::White => Srgb::new(18, 18, 18),
        Label::Red => Srgb::new(24, 0, 0),
        Label::Blue => Srgb::new(0, 0, 24),
    }
}

/// WS2812 strip showing the indicator model.
pub struct Leds<'a> {
    channel: Option<esp_hal::rmt::Channel<'a, Blocking, Tx>>,
    framebuffer: [Srgb<u8>; LED_COUNT],
}

impl TryFrom<LedResources<'static>> for Leds<'static> {
    type Error = Error;

    fn try_from(res: LedResources<'static>) -> Result<Self, Self::Error> {
        let _ws_power = Output::new(res.power, Level::High, OutputConfig::default());
        let rmt = Rmt::new(res.rmt, Rate::from_mhz(40))
            .map_err(|_| Error::HardwareInit(Peripheral::Leds))?;
        let tx_config = TxChannelConfig::default().with_clk_divider(1);
        let channel = rmt
            .channel0
            .configure_tx(res.io, tx_config)
            .map_err(|_| Error::HardwareInit(Peripheral::Leds))?;
        Ok(Self::new(channel))
    }
}

impl<'a> Leds<'a> {
    pub const fn new(channel: esp_hal::rmt::Channel<'a, Blocking, Tx>) -> Self {
        Self {
            channel: Some(channel),
            framebuffer: [DARK; LED_COUNT],
        }
    }

    /// Show `modes` on both bars. Blinking indicators are lit when `blink_on`.
    pub fn render(&mut self, modes: &[IndicatorMode], blink_on: bool) {
        let mut bar = [DARK; BAR_COUNT];
        for (i, (led, mode)) in bar.iter_mut().zip(modes).enumerate() {
            let lit = match mode {
                IndicatorMode::Off => false,
                IndicatorMode::On => true,
                IndicatorMode::Blink => blink_on,
            };
            if lit {
                *led = label_of(i as u8).map_or(DARK, color_of);
            }
        }
        // Right bar runs bottom to top, the left bar top to bottom.
        self.framebuffer[..BAR_COUNT].copy_from_slice(&bar);
        for i in 0..BAR_COUNT {
            self.framebuffer[BAR_COUNT + i] = bar[BAR_COUNT - 1 - i];
        }
    }

    /// Flush the framebuffer to the physical LEDs.
    pub async fn update(&mut self) {
        let Some(channel) = self.channel.take() else {
            error!("RMT channel lost during previous transmission");
            return;
        };

        let pulses = self
            .framebuffer
            .iter()
            .flat_map(|color| {
                // WS2812 expects GRB byte order
                [
                    Self::byte_to_pulses(color.green),
                    Self::byte_to_pulses(color.red),
                    Self::byte_to_pulses(color.blue),
                ]
                .into_iter()
                .flatten()
            })
            .chain(core::iter::once(PulseCode::end_marker()))
            .collect::<alloc::vec::Vec<_>>();

        let transaction = match channel.transmit(&pulses) {
            Ok(t) => t,
            Err(e) => {
                error!("RMT transmit failed: {}", e);
                return;
            }
        };

        self.channel = Some(match transaction.wait() {
            Ok(ch) => ch,
            Err((err, ch)) => {
                error!("RMT transaction failed: {}", err);
                ch
            }
        });

        // WS2812 reset time
        Timer::after(Duration::from_micros(50)).await;
    }

    /// Keep the strip in sync with the indicator model, refreshing every
    /// `frame`. Blinking indicators toggle every `blink`. Never returns.
    pub async fn follow<S: Screen>(
        &mut self,
        outputs: &Outputs<S>,
        blink: Duration,
        frame: Duration,
    ) {
        let half_period = blink.as_millis().max(1);
        let mut modes = [IndicatorMode::Off; MAX_INPUTS];
        loop {
            let count = outputs.indicators(|indicators| {
                let current = indicators.modes();
                modes[..current.len()].copy_from_slice(current);
                current.len()
            });
            let blink_on = (Instant::now().as_millis() / half_period) % 2 == 0;
            self.render(&modes[..count], blink_on);
            self.update().await;
            Timer::after(frame).await;
        }
    }

    /// WS2812 bit timing at 40 MHz RMT clock.
    const fn bit_to_pulse(bit: bool) -> PulseCode {
        if bit {
            // '1': 0.8 µs high (32 ticks), 0.45 µs low (18 ticks)
            PulseCode::new(Level::High, 32, Level::Low, 18)
        } else {
            // '0': 0.4 µs high (16 ticks), 0.85 µs low (34 ticks)
            PulseCode::new(Level::High, 16, Level::Low, 34)
        }
    }

    fn byte_to_pulses(byte: u8) -> [PulseCode; 8] {
        let mut pulses = [PulseCode::default(); 8];
        for (i, pulse) in pulses.iter_mut().enumerate() {
            *pulse = Self::bit_to_pulse((byte >> (7 - i)) & 1 != 0);
        }
        pulses
    }
}
