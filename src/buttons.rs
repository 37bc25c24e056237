//! Button watchers: debounced edges to raw input signals.
//!
//! Every labeled button is active low with a pull-up. A watcher reports
//! `Pressed` on a debounced press, `HeldLong` once if the press lasts the
//! hold threshold, and `Released` on the debounced release.

use embassy_futures::{
    join::join_array,
    select::{
        Either,
        select,
    },
};
use embassy_time::{
    Duration,
    Timer,
};
use esp_hal::gpio::{
    Input,
    InputConfig,
    Pull,
};

use crate::{
    ButtonResources,
    config::MAX_INPUTS,
    game::SignalChannel,
    input::{
        RawSignal,
        SignalKind,
    },
};

const DEBOUNCE_MS: u64 = 20;

/// The labeled buttons, in input-id order.
pub struct Buttons {
    pins: [Input<'static>; MAX_INPUTS],
}

impl From<ButtonResources<'static>> for Buttons {
    fn from(res: ButtonResources<'static>) -> Self {
        let pull_up = InputConfig::default().with_pull(Pull::Up);
        Self {
            pins: [
                Input::new(res.green, pull_up),
                Input::new(res.yellow, pull_up),
                Input::new(res.white, pull_up),
                Input::new(res.red, pull_up),
                Input::new(res.blue, pull_up),
            ],
        }
    }
}

impl Buttons {
    /// Watch every button and feed `signals`. Never returns.
    pub async fn watch(&mut self, signals: &SignalChannel, hold: Duration) {
        let [green, yellow, white, red, blue] = &mut self.pins;
        join_array([
            watch(0, green, signals, hold),
            watch(1, yellow, signals, hold),
            watch(2, white, signals, hold),
            watch(3, red, signals, hold),
            watch(4, blue, signals, hold),
        ])
        .await;
    }

    /// Wait for a debounced button press (falling edge, active low).
    pub async fn debounce_press(button: &mut Input<'_>) {
        loop {
            button.wait_for_falling_edge().await;
            Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
            if button.is_low() {
                return;
            }
        }
    }

    /// Wait for a debounced button release (rising edge).
    pub async fn debounce_release(button: &mut Input<'_>) {
        loop {
            if button.is_high() {
                Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
                if button.is_high() {
                    return;
                }
            }
            button.wait_for_rising_edge().await;
        }
    }
}

async fn watch(input: u8, pin: &mut Input<'_>, signals: &SignalChannel, hold: Duration) {
    loop {
        Buttons::debounce_press(pin).await;
        signals.send(RawSignal::now(input, SignalKind::Pressed)).await;

        match select(Buttons::debounce_release(pin), Timer::after(hold)).await {
            Either::First(()) => {}
            Either::Second(()) => {
                signals.send(RawSignal::now(input, SignalKind::HeldLong)).await;
                Buttons::debounce_release(pin).await;
            }
        }
        signals.send(RawSignal::now(input, SignalKind::Released)).await;
    }
}
