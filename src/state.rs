//! Game states and the transition table.
//!
//! The table is two pure functions, [`on_tap`] and [`on_hold`], matched
//! exhaustively over [`State`]. Any combination they do not name returns
//! `None` and leaves the game where it is.

use crate::config::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Power-on, before the first entry.
    Init,
    Idle,
    Playing,
    /// Redirect to `Playing` keeping the score and skipping the countdown.
    ResumePlaying,
    Paused,
    PromptToReset,
    PromptToShutdown,
    ShuttingDown,
}

impl State {
    /// The state actually recorded as current when `self` is entered.
    pub const fn resolved(self) -> Self {
        match self {
            Self::ResumePlaying => Self::Playing,
            other => other,
        }
    }
}

/// Transition requested by a tap on an input labeled `label`.
///
/// Taps while `Playing` never transition; scoring them is up to the caller.
pub const fn on_tap(current: State, previous: State, label: Label) -> Option<State> {
    match (current, label) {
        (State::Idle, _) => Some(State::Playing),
        (State::PromptToReset, Label::Green) => Some(State::Idle),
        (State::PromptToReset, Label::Red) => Some(State::ResumePlaying),
        (State::PromptToShutdown, Label::Green) => Some(State::ShuttingDown),
        (State::PromptToShutdown, Label::Red) => Some(previous),
        (State::Paused, Label::Yellow) => Some(State::ResumePlaying),
        (
            State::Init
            | State::Playing
            | State::ResumePlaying
            | State::Paused
            | State::PromptToReset
            | State::PromptToShutdown
            | State::ShuttingDown,
            _,
        ) => None,
    }
}

/// Transition requested by a long-hold on an input labeled `label`.
pub const fn on_hold(current: State, label: Label) -> Option<State> {
    match (current, label) {
        (State::Playing, Label::Red) => Some(State::Idle),
        (State::Playing, Label::Yellow) => Some(State::Paused),
        (State::Idle, Label::Red) => Some(State::PromptToShutdown),
        (
            State::Init
            | State::Idle
            | State::Playing
            | State::ResumePlaying
            | State::Paused
            | State::PromptToReset
            | State::PromptToShutdown
            | State::ShuttingDown,
            _,
        ) => None,
    }
}

/// Current, previous and pending state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    current: State,
    previous: State,
    next: Option<State>,
}

impl GameState {
    pub const fn new() -> Self {
        Self {
            current: State::Init,
            previous: State::Init,
            next: Some(State::Idle),
        }
    }

    pub const fn current(&self) -> State {
        self.current
    }

    pub const fn previous(&self) -> State {
        self.previous
    }

    pub const fn next(&self) -> Option<State> {
        self.next
    }

    /// Queue `target` as the next state to enter. A later request replaces an earlier one.
    pub fn request(&mut self, target: State) {
        self.next = Some(target);
    }

    /// Take the pending target, if any.
    pub fn take_next(&mut self) -> Option<State> {
        self.next.take()
    }

    /// Record an entry into `target`. Any request still pending is dropped.
    pub fn enter(&mut self, target: State) {
        self.next = None;
        self.previous = self.current;
        self.current = target.resolved();
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
