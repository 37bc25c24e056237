//! ST7789 display, 320×170 LCD over SPI with DMA, and its backlight.

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::{
        Point,
        Size,
    },
};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Async,
    dma::{
        DmaRxBuf,
        DmaTxBuf,
    },
    dma_buffers,
    gpio::{
        Level,
        Output,
        OutputConfig,
    },
    spi::master::Spi,
    time::Rate,
};

use crate::{
    BacklightResources,
    DisplayResources,
    error::{
        Error,
        Peripheral,
    },
    mk_static,
    outputs::Screen,
    screen::{
        Blank,
        TextScreen,
    },
};

type SpiInterface<'a> = mipidsi::interface::SpiInterface<
    'a,
    ExclusiveDevice<esp_hal::spi::master::SpiDmaBus<'a, Async>, Output<'a>, esp_hal::delay::Delay>,
    Output<'a>,
>;

/// The ST7789 panel as an `embedded-graphics` draw target.
pub type Display<'a> = mipidsi::Display<SpiInterface<'a>, mipidsi::models::ST7789, Output<'a>>;

fn failed<E>(_: E) -> Error {
    Error::HardwareInit(Peripheral::Display)
}

impl TryFrom<DisplayResources<'static>> for Display<'static> {
    type Error = Error;

    fn try_from(res: DisplayResources<'static>) -> Result<Self, Self::Error> {
        let (rx_buffer, rx_descriptors, tx_buffer, tx_descriptors) = dma_buffers!(32000);
        let dma_rx_buf = DmaRxBuf::new(rx_descriptors, rx_buffer).map_err(failed)?;
        let dma_tx_buf = DmaTxBuf::new(tx_descriptors, tx_buffer).map_err(failed)?;

        let mut delay = esp_hal::delay::Delay::new();

        let dc = Output::new(res.dc, Level::Low, OutputConfig::default());
        let mut rst = Output::new(res.rst, Level::Low, OutputConfig::default());
        rst.set_high();

        let spi = Spi::new(
            res.spi,
            esp_hal::spi::master::Config::default().with_frequency(Rate::from_mhz(80)),
        )
        .map_err(failed)?
        .with_sck(res.sck)
        .with_mosi(res.mosi)
        .with_miso(res.miso)
        .with_dma(res.dma)
        .with_buffers(dma_rx_buf, dma_tx_buf)
        .into_async();

        let cs = Output::new(res.cs, Level::High, OutputConfig::default());
        let spi_device = ExclusiveDevice::new(spi, cs, delay).map_err(failed)?;

        let buffer = mk_static!([u8; 32000], [0_u8; 32000]);
        let di = mipidsi::interface::SpiInterface::new(spi_device, dc, buffer);

        mipidsi::Builder::new(mipidsi::models::ST7789, di)
            .reset_pin(rst)
            .display_size(170, 320)
            .invert_colors(mipidsi::options::ColorInversion::Inverted)
            .orientation(
                mipidsi::options::Orientation::new().rotate(mipidsi::options::Rotation::Deg90),
            )
            .display_offset(35, 0)
            .init(&mut delay)
            .map_err(failed)
    }
}

/// Display backlight LED.
pub struct Backlight {
    pin: Output<'static>,
}

impl From<BacklightResources<'static>> for Backlight {
    fn from(res: BacklightResources<'static>) -> Self {
        // Default to backlight ON
        Self {
            pin: Output::new(res.led, Level::High, OutputConfig::default()),
        }
    }
}

impl Backlight {
    pub fn on(&mut self) {
        self.pin.set_high();
    }

    pub fn off(&mut self) {
        self.pin.set_low();
    }
}

/// What the game draws on: the LCD, or nothing when it failed to come up.
pub enum Panel {
    Lcd(TextScreen<Display<'static>>),
    Blank(Blank),
}

impl Panel {
    /// Bring up the LCD, falling back to [`Panel::Blank`].
    pub fn bring_up(res: DisplayResources<'static>) -> Self {
        match Display::try_from(res) {
            Ok(display) => Self::Lcd(TextScreen::new(display)),
            Err(e) => {
                warn!("{}, running without a screen", e);
                Self::Blank(Blank)
            }
        }
    }
}

impl Screen for Panel {
    fn clear(&mut self) {
        match self {
            Self::Lcd(lcd) => lcd.clear(),
            Self::Blank(blank) => blank.clear(),
        }
    }

    fn draw(&mut self, text: &str, position: Point, color: Rgb565) {
        match self {
            Self::Lcd(lcd) => lcd.draw(text, position, color),
            Self::Blank(blank) => blank.draw(text, position, color),
        }
    }

    fn size(&self) -> Size {
        match self {
            Self::Lcd(lcd) => lcd.size(),
            Self::Blank(blank) => blank.size(),
        }
    }

    fn text_size(&self, text: &str) -> Size {
        match self {
            Self::Lcd(lcd) => lcd.text_size(text),
            Self::Blank(blank) => blank.text_size(text),
        }
    }
}
