//! [`Screen`] implementations.

use embedded_graphics::{
    mono_font::{
        MonoFont,
        MonoTextStyle,
        ascii::FONT_10X20,
    },
    pixelcolor::Rgb565,
    prelude::*,
    text::{
        Baseline,
        Text,
    },
};

use crate::outputs::Screen;

/// Text screen over any `embedded-graphics` draw target.
///
/// # Panics
///
/// A failed write means the display bus is gone. There is no recovering from
/// that, so every method panics on a draw error.
pub struct TextScreen<D> {
    target: D,
    font: &'static MonoFont<'static>,
    background: Rgb565,
}

impl<D> TextScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(target: D) -> Self {
        Self {
            target,
            font: &FONT_10X20,
            background: Rgb565::BLACK,
        }
    }

    #[must_use]
    pub fn with_font(mut self, font: &'static MonoFont<'static>) -> Self {
        self.font = font;
        self
    }

    pub fn target(&self) -> &D {
        &self.target
    }
}

impl<D> Screen for TextScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn clear(&mut self) {
        if self.target.clear(self.background).is_err() {
            panic!("display bus failure");
        }
    }

    fn draw(&mut self, text: &str, position: Point, color: Rgb565) {
        let style = MonoTextStyle::new(self.font, color);
        if Text::with_baseline(text, position, style, Baseline::Top)
            .draw(&mut self.target)
            .is_err()
        {
            panic!("display bus failure");
        }
    }

    fn size(&self) -> Size {
        self.target.bounding_box().size
    }

    fn text_size(&self, text: &str) -> Size {
        let glyph = self.font.character_size;
        let spacing = self.font.character_spacing;
        let count = text.chars().count() as u32;
        Size::new(
            count * glyph.width + count.saturating_sub(1) * spacing,
            glyph.height,
        )
    }
}

/// Stand-in for a display that failed to initialise. Draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blank;

impl Screen for Blank {
    fn clear(&mut self) {}

    fn draw(&mut self, _text: &str, _position: Point, _color: Rgb565) {}

    fn size(&self) -> Size {
        Size::zero()
    }

    fn text_size(&self, _text: &str) -> Size {
        Size::zero()
    }
}
