//! Reaction game firmware.
//!
//! - Idle: the lights chase while the screen invites a player
//! - Tap any button to start a countdown, then tap the lit button to score
//! - While playing, hold yellow to pause (tap yellow to resume) or hold red
//!   to quit to idle
//! - In idle, hold red for the shutdown prompt: green shuts down, red goes
//!   back

#![no_std]
#![no_main]

use defmt::{
    info,
    warn,
};
use embassy_executor::Spawner;
use embassy_sync::channel::Channel;
use embassy_time::{
    Duration,
    Timer,
};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;
#[allow(clippy::wildcard_imports)]
use reflexbox::*;
use reflexbox::{
    config::{
        MAX_INPUTS,
        Timings,
    },
    effects::{
        Context,
        Effects,
    },
    game::{
        Exit,
        Game,
        SignalChannel,
    },
};

extern crate alloc;

esp_bootloader_esp_idf::esp_app_desc!();

/// LED strip refresh period.
const LED_FRAME: Duration = Duration::from_millis(50);

static SIGNALS: SignalChannel = Channel::new();
static EFFECTS: Effects = Effects::new();

#[embassy_executor::task]
async fn effects_task(ctx: &'static Context<Panel>) {
    EFFECTS.run(ctx).await;
}

#[embassy_executor::task]
async fn led_task(leds: &'static mut Leds<'static>, ctx: &'static Context<Panel>) {
    leds.follow(&ctx.outputs, ctx.timings.blink, LED_FRAME).await;
}

#[embassy_executor::task]
async fn button_task(buttons: &'static mut Buttons, hold: Duration) {
    buttons.watch(&SIGNALS, hold).await;
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    let peripherals = reflexbox::init();
    let resources = split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut backlight: Backlight = resources.backlight.into();
    let panel = Panel::bring_up(resources.display);

    // Without indicators there is nothing to aim at, so the buttons go too.
    let leds = match Leds::try_from(resources.leds) {
        Ok(leds) => Some(mk_static!(Leds<'static>, leds)),
        Err(e) => {
            warn!("{}, running without inputs", e);
            None
        }
    };
    let inputs = if leds.is_some() { MAX_INPUTS } else { 0 };

    let ctx = mk_static!(Context<Panel>, Context::new(panel, inputs, Timings::default()));
    spawner.must_spawn(effects_task(ctx));

    if let Some(leds) = leds {
        spawner.must_spawn(led_task(leds, ctx));
        let buttons = mk_static!(Buttons, resources.buttons.into());
        spawner.must_spawn(button_task(buttons, ctx.timings.long_hold));
    }

    info!("reflexbox up with {} inputs", inputs);
    let mut game = Game::new(ctx, &EFFECTS, SIGNALS.receiver());
    match game.run().await {
        Exit::Shutdown => info!("final score {}", game.score()),
    }

    backlight.off();
    loop {
        Timer::after(Duration::from_secs(600)).await;
    }
}
