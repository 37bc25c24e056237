//! Appliance configuration: the button/indicator pair table and timings.

use embassy_time::Duration;

/// Number of labeled button/indicator pairs on the appliance.
pub const MAX_INPUTS: usize = 5;

/// Continuous press time after which a press counts as a long-hold.
pub const LONG_HOLD: Duration = Duration::from_millis(2000);

/// Capacity of the input signal channel between the button watchers and the controller.
pub const SIGNAL_QUEUE: usize = 8;

/// Fixed color label of a button/indicator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Label {
    Green,
    Yellow,
    White,
    Red,
    Blue,
}

/// Labels in input-id order. Input `i` is paired with indicator `i`.
pub const LABELS: [Label; MAX_INPUTS] = [
    Label::Green,
    Label::Yellow,
    Label::White,
    Label::Red,
    Label::Blue,
];

/// Label of input `id`, if it is a configured pair.
pub fn label_of(id: u8) -> Option<Label> {
    LABELS.get(usize::from(id)).copied()
}

/// First input id carrying `label`.
pub fn input_of(label: Label) -> Option<u8> {
    LABELS.iter().position(|l| *l == label).map(|i| i as u8)
}

/// Every fixed interval the controller and the effects sleep on.
///
/// `Default` holds the appliance timings. Tests shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Tap vs. long-hold threshold.
    pub long_hold: Duration,
    /// Time one indicator stays lit during the idle chase.
    pub chase_step: Duration,
    /// On and off time of each idle flash.
    pub flash_step: Duration,
    /// Hold time of each countdown frame.
    pub countdown_frame: Duration,
    /// Time one indicator stays lit while playing.
    pub play_interval: Duration,
    /// Delay between scroll positions of a message.
    pub scroll_step: Duration,
    /// Pause before a looping message starts over.
    pub scroll_pause: Duration,
    /// Half period of a blinking indicator.
    pub blink: Duration,
    /// How long a cancel waits for an effect to let go of the outputs.
    pub cancel_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            long_hold: LONG_HOLD,
            chase_step: Duration::from_millis(200),
            flash_step: Duration::from_millis(200),
            countdown_frame: Duration::from_millis(500),
            play_interval: Duration::from_millis(500),
            scroll_step: Duration::from_millis(30),
            scroll_pause: Duration::from_millis(250),
            blink: Duration::from_millis(1000),
            cancel_grace: Duration::from_millis(50),
        }
    }
}
