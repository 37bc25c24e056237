//! Background effects that drive the screen and indicators for a state.
//!
//! There are two slots: the *primary* slot runs the effect that defines a
//! state (idle chase, play loop), the *secondary* slot runs a scrolling
//! message next to it. Each slot is driven by its own runner future
//! ([`Effects::run`]), which waits for a command, plays the effect and drops
//! it as soon as it is cancelled or replaced.
//!
//! Cancellation is cooperative. The runner drops the effect at its next
//! await point, so a cancelled effect never paints again once the runner has
//! acknowledged. [`EffectSlot::cancel`] waits for that acknowledgement for at
//! most [`Timings::cancel_grace`], then returns either way. Cancelling an idle
//! slot is a no-op.

use core::{
    fmt::Write as _,
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
};

use embassy_futures::{
    join::join,
    select::{
        Either,
        select,
    },
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    signal::Signal,
};
use embassy_time::{
    Instant,
    Timer,
    with_timeout,
};
use embedded_graphics::prelude::Point;
use heapless::String;

use crate::{
    config::Timings,
    outputs::{
        INK,
        IndicatorMode,
        Outputs,
        Screen,
    },
    rng::Rng,
    score::Score,
};

/// Sweeps of the chase pattern before the unison flashes.
const CHASE_SWEEPS: usize = 4;
/// Unison flashes closing each chase cycle.
const CHASE_FLASHES: usize = 4;
/// Pixels a scrolling message moves per step.
const SCROLL_STRIDE: i32 = 4;

/// Everything an effect (and the controller) draws with.
pub struct Context<S> {
    pub outputs: Outputs<S>,
    pub score: Score,
    pub timings: Timings,
}

impl<S: Screen> Context<S> {
    pub fn new(screen: S, inputs: usize, timings: Timings) -> Self {
        Self {
            outputs: Outputs::new(screen, inputs),
            score: Score::new(),
            timings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Idle attract pattern: chase sweeps, then unison flashes, forever.
    Chase,
    /// Score on screen, one random indicator lit per interval, forever.
    PlayLoop,
    /// A message scrolling across the screen, repeated until cancelled.
    Scroll(&'static str),
}

impl Effect {
    async fn play<S: Screen>(self, ctx: &Context<S>, rng: &mut Rng) {
        match self {
            Self::Chase => chase(ctx).await,
            Self::PlayLoop => play_loop(ctx, rng).await,
            Self::Scroll(text) => loop {
                scroll(ctx, text).await;
                Timer::after(ctx.timings.scroll_pause).await;
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start(Effect),
    Stop,
}

/// One cancellable effect at a time.
pub struct EffectSlot {
    name: &'static str,
    command: Signal<CriticalSectionRawMutex, Command>,
    stopped: Signal<CriticalSectionRawMutex, ()>,
    finished: Signal<CriticalSectionRawMutex, ()>,
    running: AtomicBool,
}

impl EffectSlot {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            command: Signal::new(),
            stopped: Signal::new(),
            finished: Signal::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Whether an effect is started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Replace whatever runs in this slot with `effect`.
    pub async fn start(&self, effect: Effect, timings: &Timings) {
        self.cancel(timings).await;
        self.finished.reset();
        self.running.store(true, Ordering::SeqCst);
        self.command.signal(Command::Start(effect));
    }

    /// Stop the running effect. Returns once the runner let go of it or the
    /// grace period ran out. A no-op when nothing runs.
    pub async fn cancel(&self, timings: &Timings) {
        if !self.is_running() {
            return;
        }
        self.stopped.reset();
        self.command.signal(Command::Stop);
        if with_timeout(timings.cancel_grace, self.stopped.wait())
            .await
            .is_err()
        {
            warn!("{} effect did not stop within the grace period", self.name);
        }
        self.running.store(false, Ordering::SeqCst);
        self.finished.reset();
    }

    /// Resolves when the running effect ended on its own.
    pub async fn finished(&self) {
        self.finished.wait().await;
    }

    /// Drive this slot. Never returns.
    pub async fn run<S: Screen>(&self, ctx: &Context<S>, mut rng: Rng) {
        let mut pending = None;
        loop {
            let command = match pending.take() {
                Some(command) => command,
                None => self.command.wait().await,
            };
            let Command::Start(effect) = command else {
                self.idle();
                continue;
            };

            debug!("{} effect: {}", self.name, effect);
            match select(effect.play(ctx, &mut rng), self.command.wait()).await {
                Either::First(()) => {
                    self.idle();
                    self.finished.signal(());
                }
                Either::Second(next) => {
                    // The effect is dropped here and will not paint again.
                    if next == Command::Stop {
                        self.idle();
                    } else {
                        pending = Some(next);
                    }
                }
            }
        }
    }

    fn idle(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stopped.signal(());
    }
}

/// The primary and secondary effect slots.
pub struct Effects {
    pub primary: EffectSlot,
    pub secondary: EffectSlot,
}

impl Effects {
    pub const fn new() -> Self {
        Self {
            primary: EffectSlot::new("primary"),
            secondary: EffectSlot::new("secondary"),
        }
    }

    /// Start the effect that defines the current state. Indicators are cleared
    /// before its first frame.
    pub async fn start_primary<S: Screen>(&self, effect: Effect, ctx: &Context<S>) {
        self.primary.cancel(&ctx.timings).await;
        ctx.outputs.indicators(|indicators| indicators.all_off());
        self.primary.start(effect, &ctx.timings).await;
    }

    /// Start the auxiliary effect. The screen is cleared before its first frame.
    pub async fn start_secondary<S: Screen>(&self, effect: Effect, ctx: &Context<S>) {
        self.secondary.cancel(&ctx.timings).await;
        ctx.outputs.clear_screen().await;
        self.secondary.start(effect, &ctx.timings).await;
    }

    /// Cancel the secondary, then the primary effect.
    pub async fn cancel_all(&self, timings: &Timings) {
        self.secondary.cancel(timings).await;
        self.primary.cancel(timings).await;
    }

    /// Drive both slots. Never returns.
    pub async fn run<S: Screen>(&self, ctx: &Context<S>) {
        let seed = Instant::now().as_ticks() as u32;
        join(
            self.primary.run(ctx, Rng::new(seed)),
            self.secondary.run(ctx, Rng::new(!seed)),
        )
        .await;
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

async fn chase<S: Screen>(ctx: &Context<S>) {
    let outputs = &ctx.outputs;
    let count = outputs.indicator_count();
    loop {
        for sweep in 0..CHASE_SWEEPS {
            for step in 0..count {
                let index = if sweep % 2 == 0 { step } else { count - 1 - step };
                outputs.indicators(|indicators| indicators.on(index));
                Timer::after(ctx.timings.chase_step).await;
                outputs.indicators(|indicators| indicators.off(index));
            }
        }
        for _ in 0..CHASE_FLASHES {
            outputs.indicators(|indicators| indicators.fill(IndicatorMode::On));
            Timer::after(ctx.timings.flash_step).await;
            outputs.indicators(|indicators| indicators.all_off());
            Timer::after(ctx.timings.flash_step).await;
        }
    }
}

async fn play_loop<S: Screen>(ctx: &Context<S>, rng: &mut Rng) {
    let outputs = &ctx.outputs;
    let count = outputs.indicator_count() as u32;
    // The moment play starts depends on a human, which is entropy enough.
    rng.mix(Instant::now().as_ticks() as u32);
    loop {
        let mut text: String<10> = String::new();
        write!(text, "{}", ctx.score.value()).ok();
        outputs
            .paint(|screen| screen.draw_centered(&text, INK))
            .await;

        if count > 0 {
            let lit = rng.below(count) as usize;
            outputs.indicators(|indicators| indicators.light_only(lit));
        }
        Timer::after(ctx.timings.play_interval).await;
    }
}

/// Scroll `text` once from the right edge until it left the screen.
async fn scroll<S: Screen>(ctx: &Context<S>, text: &str) {
    let (width, top, text_width) = ctx.outputs.with_screen(|screen| {
        let size = screen.size();
        let text_size = screen.text_size(text);
        (
            size.width as i32,
            (size.height as i32 - text_size.height as i32) / 2,
            text_size.width as i32,
        )
    })
    .await;

    let mut x = width;
    while x > -text_width {
        ctx.outputs
            .paint(|screen| screen.draw(text, Point::new(x, top), INK))
            .await;
        x -= SCROLL_STRIDE;
        Timer::after(ctx.timings.scroll_step).await;
    }
    ctx.outputs.clear_screen().await;
}
