//! The game controller.
//!
//! [`Game`] is the only writer of the game state. Button watchers push raw
//! signals into a bounded channel; the controller classifies them, applies
//! the transition table and enters the next state:
//!
//! 1. record `previous := current`, `current := target`
//! 2. tear down: cancel both effects, all indicators off, screen cleared
//! 3. run the state's entry action
//!
//! It then waits until either the primary effect ends on its own (the state
//! is entered again) or an input requests a transition.

use embassy_futures::select::{
    Either,
    select,
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{
        Channel,
        Receiver,
    },
};
use embassy_time::Timer;

use crate::{
    config::{
        Label,
        SIGNAL_QUEUE,
        label_of,
    },
    effects::{
        Context,
        Effect,
        Effects,
    },
    input::{
        Gesture,
        InputProcessor,
        RawSignal,
    },
    outputs::{
        INK,
        IndicatorMode,
        Screen,
    },
    state::{
        GameState,
        State,
        on_hold,
        on_tap,
    },
};

pub const IDLE_MESSAGE: &str = "Ready to play?  Press any button to start.";
pub const RESET_PROMPT: &str = "Reset game? Green=Yes, Red=No";
pub const SHUTDOWN_PROMPT: &str = "Shutdown game? Green=Yes, Red=No";

/// Frames of the countdown before a fresh game, each held for one countdown interval.
pub const COUNTDOWN: [&str; 4] = ["3", "2", "1", "Go!"];

/// Channel from the button watchers to the controller.
pub type SignalChannel = Channel<CriticalSectionRawMutex, RawSignal, SIGNAL_QUEUE>;
pub type SignalReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, RawSignal, SIGNAL_QUEUE>;

/// Why [`Game::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Exit {
    Shutdown,
}

pub struct Game<'a, S> {
    ctx: &'a Context<S>,
    effects: &'a Effects,
    signals: SignalReceiver<'a>,
    inputs: InputProcessor,
    state: GameState,
}

impl<'a, S: Screen> Game<'a, S> {
    /// Controller for as many inputs as `ctx` has indicators.
    pub fn new(ctx: &'a Context<S>, effects: &'a Effects, signals: SignalReceiver<'a>) -> Self {
        let inputs = InputProcessor::new(ctx.outputs.indicator_count(), ctx.timings.long_hold);
        if inputs.is_empty() {
            warn!("no inputs configured, running degraded");
        }
        Self {
            ctx,
            effects,
            signals,
            inputs,
            state: GameState::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn score(&self) -> u32 {
        self.ctx.score.value()
    }

    /// Ask for a transition that no input triggers, such as `PromptToReset`.
    pub fn request(&mut self, target: State) {
        self.state.request(target);
    }

    /// Run until the game shuts down.
    pub async fn run(&mut self) -> Exit {
        loop {
            let Some(target) = self.state.take_next() else {
                // Nothing pending: the primary effect ended, enter the state again.
                self.state.request(self.state.current());
                continue;
            };
            if target == State::ShuttingDown {
                self.enter(target).await;
                info!("shut down");
                return Exit::Shutdown;
            }

            self.enter(target).await;
            self.await_transition(target).await;
        }
    }

    /// Block until the primary effect ends or a transition is requested.
    async fn await_transition(&mut self, entered: State) {
        loop {
            let woke = select(self.effects.primary.finished(), self.signals.receive()).await;
            match woke {
                Either::First(()) => {
                    debug!("primary effect of {} ended", entered);
                    self.state.request(entered);
                    return;
                }
                Either::Second(signal) => {
                    if self.step(signal).is_some() {
                        return;
                    }
                }
            }
        }
    }

    /// Feed one raw input signal. Returns the transition it requested, if any.
    pub fn step(&mut self, signal: RawSignal) -> Option<State> {
        let event = self.inputs.process(signal)?;
        let label = label_of(event.input)?;
        let current = self.state.current();

        let target = match event.gesture {
            Gesture::Tap if current == State::Playing => {
                self.score_tap(event.input, label);
                None
            }
            Gesture::Tap => on_tap(current, self.state.previous(), label),
            Gesture::LongHold => on_hold(current, label),
        };

        match target {
            Some(target) => {
                info!("{} {} on {}: {} -> {}", label, event.gesture, event.input, current, target);
                self.state.request(target);
            }
            None => debug!("{} {} ignored in {}", label, event.gesture, current),
        }
        target
    }

    fn score_tap(&self, input: u8, label: Label) {
        if self.ctx.outputs.is_lit(usize::from(input)) {
            let score = self.ctx.score.increment();
            info!("hit {} ({}), score {}", input, label, score);
        }
    }

    /// Enter `target`: record it, tear down the previous state, run the entry action.
    pub async fn enter(&mut self, target: State) {
        info!("entering {} from {}", target, self.state.current());
        self.state.enter(target);
        self.teardown().await;

        match target {
            State::Idle => {
                self.effects
                    .start_secondary(Effect::Scroll(IDLE_MESSAGE), self.ctx)
                    .await;
                self.effects.start_primary(Effect::Chase, self.ctx).await;
            }
            State::Playing => self.play(false).await,
            State::ResumePlaying => self.play(true).await,
            State::Paused => self.ctx.outputs.indicators(|indicators| {
                indicators.by_label(|label| match label {
                    Label::Yellow => IndicatorMode::Blink,
                    _ => IndicatorMode::Off,
                });
            }),
            State::PromptToReset => self.prompt(RESET_PROMPT).await,
            State::PromptToShutdown => self.prompt(SHUTDOWN_PROMPT).await,
            State::Init | State::ShuttingDown => {}
        }
    }

    async fn teardown(&self) {
        self.effects.cancel_all(&self.ctx.timings).await;
        self.ctx.outputs.reset().await;
    }

    async fn play(&self, resume: bool) {
        if resume {
            info!("resuming at score {}", self.ctx.score.value());
        } else {
            self.ctx.score.reset();
            self.countdown().await;
        }
        self.effects.start_primary(Effect::PlayLoop, self.ctx).await;
    }

    /// Blocks the controller until the last frame has been shown.
    async fn countdown(&self) {
        for frame in COUNTDOWN {
            self.ctx
                .outputs
                .paint(|screen| screen.draw_centered(frame, INK))
                .await;
            Timer::after(self.ctx.timings.countdown_frame).await;
        }
        self.ctx.outputs.clear_screen().await;
    }

    async fn prompt(&self, message: &'static str) {
        self.ctx.outputs.indicators(|indicators| {
            indicators.by_label(|label| match label {
                Label::Green | Label::Red => IndicatorMode::On,
                _ => IndicatorMode::Off,
            });
        });
        self.effects
            .start_secondary(Effect::Scroll(message), self.ctx)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        string::String,
        vec::Vec,
    };

    use embassy_futures::block_on;
    use embassy_time::{
        Duration,
        Instant,
    };

    use super::*;
    use crate::{
        config::input_of,
        effects::tests::fast_timings,
        input::SignalKind,
        outputs::tests::RecordingScreen,
    };

    fn context() -> Context<RecordingScreen> {
        Context::new(RecordingScreen::default(), 5, fast_timings())
    }

    fn id(label: Label) -> u8 {
        input_of(label).unwrap()
    }

    fn tap(game: &mut Game<'_, RecordingScreen>, input: u8) -> Option<State> {
        let at = Instant::from_secs(100);
        game.step(RawSignal::new(input, SignalKind::Pressed, at));
        game.step(RawSignal::new(input, SignalKind::Released, at + Duration::from_millis(150)))
    }

    fn hold(game: &mut Game<'_, RecordingScreen>, input: u8) -> Option<State> {
        let at = Instant::from_secs(200);
        game.step(RawSignal::new(input, SignalKind::Pressed, at));
        let requested = game.step(RawSignal::new(
            input,
            SignalKind::HeldLong,
            at + Duration::from_secs(2),
        ));
        assert_eq!(
            game.step(RawSignal::new(input, SignalKind::Released, at + Duration::from_secs(3))),
            None
        );
        requested
    }

    /// Enter whatever the last step requested.
    fn follow(game: &mut Game<'_, RecordingScreen>) {
        let next = game.state.take_next().expect("a transition was requested");
        block_on(game.enter(next));
    }

    fn drawn(ctx: &Context<RecordingScreen>) -> Vec<String> {
        block_on(ctx.outputs.with_screen(RecordingScreen::drawn))
    }

    #[test]
    fn starts_in_init_heading_for_idle() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let game = Game::new(&ctx, &effects, signals.receiver());
        assert_eq!(game.state().current(), State::Init);
        assert_eq!(game.state().next(), Some(State::Idle));
    }

    #[test]
    fn tap_in_idle_counts_down_into_a_fresh_game() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        ctx.score.increment();

        follow(&mut game);
        assert_eq!(game.state().current(), State::Idle);
        assert!(effects.primary.is_running());
        assert!(effects.secondary.is_running());

        assert_eq!(tap(&mut game, id(Label::Blue)), Some(State::Playing));
        let before = drawn(&ctx).len();
        follow(&mut game);

        assert_eq!(game.state().current(), State::Playing);
        assert_eq!(game.score(), 0);
        assert_eq!(drawn(&ctx)[before..], ["3", "2", "1", "Go!"]);
        assert!(effects.primary.is_running());
        assert!(!effects.secondary.is_running());
    }

    #[test]
    fn only_taps_on_the_lit_indicator_score() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Idle));
        block_on(game.enter(State::Playing));

        ctx.outputs.indicators(|indicators| indicators.light_only(2));
        assert_eq!(tap(&mut game, 2), None);
        assert_eq!(game.score(), 1);
        assert_eq!(tap(&mut game, 0), None);
        assert_eq!(game.score(), 1);
        assert_eq!(game.state().current(), State::Playing);
    }

    #[test]
    fn pause_and_resume_keep_the_score() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Playing));
        ctx.outputs.indicators(|indicators| indicators.light_only(4));
        tap(&mut game, 4);
        tap(&mut game, 4);
        assert_eq!(game.score(), 2);

        assert_eq!(hold(&mut game, id(Label::Yellow)), Some(State::Paused));
        follow(&mut game);
        assert_eq!(game.state().current(), State::Paused);
        assert!(!effects.primary.is_running());
        let yellow = usize::from(id(Label::Yellow));
        ctx.outputs.indicators(|indicators| {
            for i in 0..indicators.len() {
                let expected = if i == yellow { IndicatorMode::Blink } else { IndicatorMode::Off };
                assert_eq!(indicators.mode(i), expected);
            }
        });

        // only yellow resumes
        assert_eq!(tap(&mut game, id(Label::Green)), None);
        assert_eq!(tap(&mut game, id(Label::Yellow)), Some(State::ResumePlaying));
        let before = drawn(&ctx).len();
        follow(&mut game);
        assert_eq!(game.state().current(), State::Playing);
        assert_eq!(game.state().previous(), State::Paused);
        assert_eq!(game.score(), 2);
        assert_eq!(drawn(&ctx).len(), before, "no countdown on resume");
    }

    #[test]
    fn red_hold_in_playing_returns_to_idle() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Playing));
        assert_eq!(hold(&mut game, id(Label::Red)), Some(State::Idle));
        follow(&mut game);
        assert_eq!(game.state().current(), State::Idle);
    }

    #[test]
    fn shutdown_prompt_restores_the_previous_state() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Idle));

        assert_eq!(hold(&mut game, id(Label::Red)), Some(State::PromptToShutdown));
        follow(&mut game);
        assert_eq!(game.state().current(), State::PromptToShutdown);
        assert!(ctx.outputs.is_lit(usize::from(id(Label::Green))));
        assert!(ctx.outputs.is_lit(usize::from(id(Label::Red))));
        assert!(!ctx.outputs.is_lit(usize::from(id(Label::White))));

        // taps other than green and red do nothing
        assert_eq!(tap(&mut game, id(Label::White)), None);
        assert_eq!(tap(&mut game, id(Label::Red)), Some(State::Idle));
        follow(&mut game);
        assert_eq!(game.state().current(), State::Idle);
    }

    #[test]
    fn shutdown_prompt_green_shuts_down() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Idle));
        hold(&mut game, id(Label::Red));
        follow(&mut game);
        assert_eq!(tap(&mut game, id(Label::Green)), Some(State::ShuttingDown));
    }

    #[test]
    fn reset_prompt_answers() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Playing));
        ctx.outputs.indicators(|indicators| indicators.light_only(1));
        tap(&mut game, 1);

        game.request(State::PromptToReset);
        follow(&mut game);
        assert_eq!(game.state().current(), State::PromptToReset);
        assert_eq!(game.state().previous(), State::Playing);
        assert!(ctx.outputs.is_lit(usize::from(id(Label::Green))));
        assert!(ctx.outputs.is_lit(usize::from(id(Label::Red))));
        assert!(effects.secondary.is_running());

        assert_eq!(tap(&mut game, id(Label::Red)), Some(State::ResumePlaying));
        follow(&mut game);
        assert_eq!(game.state().current(), State::Playing);
        assert_eq!(game.score(), 1);

        game.request(State::PromptToReset);
        follow(&mut game);
        assert_eq!(tap(&mut game, id(Label::Green)), Some(State::Idle));
        follow(&mut game);
        assert_eq!(game.state().current(), State::Idle);
    }

    #[test]
    fn inputs_without_an_entry_leave_the_state_alone() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Paused));
        for label in [Label::Green, Label::White, Label::Red, Label::Blue] {
            assert_eq!(tap(&mut game, id(label)), None);
            assert_eq!(hold(&mut game, id(label)), None);
        }
        assert_eq!(hold(&mut game, id(Label::Yellow)), None);
        assert_eq!(game.state().current(), State::Paused);
        assert_eq!(game.state().next(), None);
    }

    #[test]
    fn degraded_mode_ignores_every_signal() {
        let ctx = Context::new(RecordingScreen::default(), 0, fast_timings());
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        block_on(game.enter(State::Idle));
        assert_eq!(tap(&mut game, 0), None);
        block_on(game.enter(State::Playing));
        assert_eq!(tap(&mut game, 0), None);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn run_plays_through_to_shutdown() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        let sender = signals.sender();
        let red = id(Label::Red);
        let green = id(Label::Green);

        let script = async {
            // let the game settle in idle, then hold red and answer green
            Timer::after(Duration::from_millis(20)).await;
            let t = Instant::now();
            sender.send(RawSignal::new(red, SignalKind::Pressed, t)).await;
            sender
                .send(RawSignal::new(red, SignalKind::HeldLong, t + Duration::from_secs(2)))
                .await;
            sender
                .send(RawSignal::new(red, SignalKind::Released, t + Duration::from_secs(3)))
                .await;
            Timer::after(Duration::from_millis(20)).await;
            let t = Instant::now();
            sender.send(RawSignal::new(green, SignalKind::Pressed, t)).await;
            sender
                .send(RawSignal::new(green, SignalKind::Released, t + Duration::from_millis(100)))
                .await;
            core::future::pending::<()>().await;
        };

        let exit = block_on(async {
            match select(game.run(), embassy_futures::join::join(effects.run(&ctx), script)).await {
                Either::First(exit) => exit,
                Either::Second(_) => unreachable!("runners and script never end"),
            }
        });

        assert_eq!(exit, Exit::Shutdown);
        assert_eq!(game.state().current(), State::ShuttingDown);
        assert_eq!(game.state().previous(), State::PromptToShutdown);
        assert!(!effects.primary.is_running());
        assert!(!effects.secondary.is_running());
        assert!(ctx
            .outputs
            .indicators(|indicators| indicators.modes().iter().all(|m| *m == IndicatorMode::Off)));
    }

    #[test]
    fn countdown_finishes_before_the_first_score_frame() {
        let ctx = context();
        let effects = Effects::new();
        let signals = SignalChannel::new();
        let mut game = Game::new(&ctx, &effects, signals.receiver());
        let sender = signals.sender();
        let blue = id(Label::Blue);

        let script = async {
            Timer::after(Duration::from_millis(20)).await;
            let t = Instant::now();
            sender.send(RawSignal::new(blue, SignalKind::Pressed, t)).await;
            sender
                .send(RawSignal::new(blue, SignalKind::Released, t + Duration::from_millis(100)))
                .await;
            Timer::after(Duration::from_millis(40)).await;
        };

        block_on(async {
            match select(game.run(), embassy_futures::join::join(effects.run(&ctx), script)).await {
                Either::First(_) => unreachable!("nothing asked to shut down"),
                Either::Second(_) => {}
            }
        });

        assert_eq!(game.state().current(), State::Playing);
        assert_eq!(game.state().previous(), State::Idle);
        let drawn = drawn(&ctx);
        let countdown = drawn
            .iter()
            .position(|text| text == "3")
            .expect("countdown was shown");
        assert_eq!(drawn[countdown..countdown + 4], COUNTDOWN);
        let first_score = drawn
            .iter()
            .position(|text| text == "0")
            .expect("the play loop painted the score");
        assert!(first_score > countdown + 3, "score painted at {first_score} before Go!");
        assert!(drawn[..countdown].iter().all(|text| text == IDLE_MESSAGE));
    }
}
