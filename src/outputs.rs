//! Output surfaces shared by the controller and the effects.
//!
//! Indicators are an in-memory model: the board's LED task renders it to the
//! strip, the controller reads it to decide whether a tap hit the lit one.
//! The screen is anything implementing [`Screen`].
//!
//! The indicator model is a few bytes and sits behind a blocking mutex. The
//! screen sits behind an async mutex instead: a paint talks to the display
//! bus for milliseconds and must not run with interrupts masked. Every paint
//! is one locked clear-and-draw so a frame is never seen half drawn.

use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{
        Mutex as BlockingMutex,
        raw::CriticalSectionRawMutex,
    },
    mutex::Mutex,
};
use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::{
        Point,
        RgbColor,
        Size,
    },
};
use heapless::Vec;

use crate::config::{
    Label,
    MAX_INPUTS,
    label_of,
};

/// Foreground color of every message and number.
pub const INK: Rgb565 = Rgb565::WHITE;

/// Drawing surface for short text.
pub trait Screen {
    fn clear(&mut self);

    /// Draw `text` with its top-left corner at `position`.
    fn draw(&mut self, text: &str, position: Point, color: Rgb565);

    fn size(&self) -> Size;

    /// Size `text` occupies when drawn.
    fn text_size(&self, text: &str) -> Size;

    /// Draw `text` centered on the screen.
    fn draw_centered(&mut self, text: &str, color: Rgb565) {
        let screen = self.size();
        let text_size = self.text_size(text);
        let position = Point::new(
            (screen.width as i32 - text_size.width as i32) / 2,
            (screen.height as i32 - text_size.height as i32) / 2,
        );
        self.draw(text, position, color);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    #[default]
    Off,
    On,
    Blink,
}

/// Mode of every indicator, in input-id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicators {
    modes: Vec<IndicatorMode, MAX_INPUTS>,
}

impl Indicators {
    pub fn new(count: usize) -> Self {
        let modes = (0..count.min(MAX_INPUTS))
            .map(|_| IndicatorMode::Off)
            .collect();
        Self { modes }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn mode(&self, index: usize) -> IndicatorMode {
        self.modes.get(index).copied().unwrap_or_default()
    }

    pub fn modes(&self) -> &[IndicatorMode] {
        &self.modes
    }

    /// Steadily on. Blinking does not count as lit.
    pub fn is_lit(&self, index: usize) -> bool {
        self.mode(index) == IndicatorMode::On
    }

    pub fn set(&mut self, index: usize, mode: IndicatorMode) {
        if let Some(slot) = self.modes.get_mut(index) {
            *slot = mode;
        }
    }

    pub fn on(&mut self, index: usize) {
        self.set(index, IndicatorMode::On);
    }

    pub fn off(&mut self, index: usize) {
        self.set(index, IndicatorMode::Off);
    }

    pub fn blink(&mut self, index: usize) {
        self.set(index, IndicatorMode::Blink);
    }

    pub fn fill(&mut self, mode: IndicatorMode) {
        self.modes.fill(mode);
    }

    pub fn all_off(&mut self) {
        self.fill(IndicatorMode::Off);
    }

    /// Light `index` and extinguish every other indicator.
    pub fn light_only(&mut self, index: usize) {
        for (i, mode) in self.modes.iter_mut().enumerate() {
            *mode = if i == index {
                IndicatorMode::On
            } else {
                IndicatorMode::Off
            };
        }
    }

    /// Set every indicator by its label.
    pub fn by_label(&mut self, f: impl Fn(Label) -> IndicatorMode) {
        for (i, mode) in self.modes.iter_mut().enumerate() {
            *mode = label_of(i as u8).map_or(IndicatorMode::Off, &f);
        }
    }
}

/// Screen and indicators, shareable between the controller and effect runners.
pub struct Outputs<S> {
    screen: Mutex<CriticalSectionRawMutex, S>,
    indicators: BlockingMutex<CriticalSectionRawMutex, RefCell<Indicators>>,
}

impl<S: Screen> Outputs<S> {
    pub fn new(screen: S, indicator_count: usize) -> Self {
        Self {
            screen: Mutex::new(screen),
            indicators: BlockingMutex::new(RefCell::new(Indicators::new(indicator_count))),
        }
    }

    /// Clear the screen and draw one frame with `f`, committed as a single paint.
    pub async fn paint<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut screen = self.screen.lock().await;
        screen.clear();
        f(&mut screen)
    }

    pub async fn clear_screen(&self) {
        self.paint(|_| ()).await;
    }

    /// Read or change the indicator model.
    pub fn indicators<R>(&self, f: impl FnOnce(&mut Indicators) -> R) -> R {
        self.indicators.lock(|indicators| f(&mut indicators.borrow_mut()))
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators(|indicators| indicators.len())
    }

    pub fn is_lit(&self, index: usize) -> bool {
        self.indicators(|indicators| indicators.is_lit(index))
    }

    /// All indicators off, screen cleared.
    pub async fn reset(&self) {
        self.indicators(Indicators::all_off);
        self.clear_screen().await;
    }

    /// Inspect the screen without painting.
    pub async fn with_screen<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&*self.screen.lock().await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        string::{
            String,
            ToString,
        },
        vec::Vec,
    };

    use embassy_futures::{
        block_on,
        select::{
            Either,
            select,
        },
    };
    use embassy_time::{
        Duration,
        Timer,
    };

    use super::*;

    /// Screen that records every committed frame as the text drawn into it.
    #[derive(Default)]
    pub(crate) struct RecordingScreen {
        pub frames: Vec<Vec<String>>,
    }

    impl RecordingScreen {
        /// Frames that contain any text.
        pub fn drawn(&self) -> Vec<String> {
            self.frames
                .iter()
                .filter(|frame| !frame.is_empty())
                .map(|frame| frame.join(" "))
                .collect()
        }
    }

    impl Screen for RecordingScreen {
        fn clear(&mut self) {
            self.frames.push(Vec::new());
        }

        fn draw(&mut self, text: &str, _position: Point, _color: Rgb565) {
            match self.frames.last_mut() {
                Some(frame) => frame.push(text.to_string()),
                None => self.frames.push(std::vec![text.to_string()]),
            }
        }

        fn size(&self) -> Size {
            Size::new(64, 16)
        }

        fn text_size(&self, text: &str) -> Size {
            Size::new(text.len() as u32 * 8, 8)
        }
    }

    #[test]
    fn light_only_leaves_exactly_one_lit() {
        let mut indicators = Indicators::new(5);
        indicators.fill(IndicatorMode::On);
        indicators.light_only(2);
        let lit: Vec<usize> = (0..5).filter(|i| indicators.is_lit(*i)).collect();
        assert_eq!(lit, [2]);
    }

    #[test]
    fn blinking_is_not_lit() {
        let mut indicators = Indicators::new(5);
        indicators.blink(1);
        assert_eq!(indicators.mode(1), IndicatorMode::Blink);
        assert!(!indicators.is_lit(1));
    }

    #[test]
    fn out_of_range_indicators_are_ignored() {
        let mut indicators = Indicators::new(0);
        indicators.on(3);
        assert!(indicators.is_empty());
        assert!(!indicators.is_lit(3));
    }

    #[test]
    fn by_label_sets_prompt_pattern() {
        let mut indicators = Indicators::new(5);
        indicators.by_label(|label| match label {
            Label::Green | Label::Red => IndicatorMode::On,
            _ => IndicatorMode::Off,
        });
        assert_eq!(
            indicators.modes(),
            [
                IndicatorMode::On,
                IndicatorMode::Off,
                IndicatorMode::Off,
                IndicatorMode::On,
                IndicatorMode::Off
            ]
        );
    }

    #[test]
    fn paint_clears_before_drawing() {
        let outputs = Outputs::new(RecordingScreen::default(), 5);
        block_on(async {
            outputs.paint(|screen| screen.draw("1", Point::zero(), INK)).await;
            outputs.paint(|screen| screen.draw("2", Point::zero(), INK)).await;
            outputs
                .with_screen(|screen| {
                    assert_eq!(
                        screen.frames,
                        [std::vec!["1".to_string()], std::vec!["2".to_string()]]
                    );
                })
                .await;
        });
    }

    #[test]
    fn reset_turns_everything_off() {
        let outputs = Outputs::new(RecordingScreen::default(), 5);
        outputs.indicators(|indicators| indicators.fill(IndicatorMode::Blink));
        block_on(async {
            outputs.paint(|screen| screen.draw("hi", Point::zero(), INK)).await;
            outputs.reset().await;
        });
        assert!(outputs.indicators(|i| i.modes().iter().all(|m| *m == IndicatorMode::Off)));
        let last_frame_empty =
            block_on(outputs.with_screen(|screen| screen.frames.last().unwrap().is_empty()));
        assert!(last_frame_empty);
    }

    #[test]
    fn a_busy_screen_delays_the_paint_but_not_the_indicators() {
        let outputs = Outputs::new(RecordingScreen::default(), 5);
        block_on(async {
            let busy = outputs.screen.lock().await;
            let paint = outputs.paint(|screen| screen.draw("late", Point::zero(), INK));
            match select(paint, Timer::after(Duration::from_millis(5))).await {
                Either::First(()) => panic!("painted while the screen was held"),
                Either::Second(()) => {}
            }
            outputs.indicators(|indicators| indicators.on(0));
            assert!(outputs.is_lit(0));

            drop(busy);
            outputs.paint(|screen| screen.draw("late", Point::zero(), INK)).await;
            let frames = outputs.with_screen(|screen| screen.frames.clone()).await;
            assert_eq!(frames, [std::vec!["late".to_string()]]);
        });
    }
}
