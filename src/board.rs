//! ESP32-S3 board bring-up and pin assignment.

use esp_hal::{
    assign_resources,
    clock::{
        Clock,
        CpuClock,
    },
    rom,
};

// ── Pin / peripheral assignments ────────────────────────────────────────────

assign_resources! {
    pub Resources<'d> {
        display: DisplayResources<'d> {
            dc: GPIO15,
            rst: GPIO7,
            sck: GPIO4,
            cs: GPIO6,
            miso: GPIO16,
            mosi: GPIO5,
            spi: SPI2,
            dma: DMA_CH0,
        },
        backlight: BacklightResources<'d> {
            led: GPIO19,
        },
        // One button per labeled pair, in input-id order (see `config::LABELS`).
        buttons: ButtonResources<'d> {
            green: GPIO13,
            yellow: GPIO12,
            white: GPIO11,
            red: GPIO38,
            blue: GPIO1,
        },
        leds: LedResources<'d> {
            power: GPIO17,
            io: GPIO18,
            rmt: RMT,
        },
    }
}

/// Minimal CPU clock switcher for ESP32-S3.
///
/// Steps through an intermediate frequency before reaching the target,
/// which is required by the hardware.
fn set_cpu_clock(cpu_clock_speed: CpuClock) {
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .sysclk_conf()
        .modify(|_, w| unsafe { w.soc_clk_sel().bits(1) });
    let _ = esp_hal::peripherals::SYSTEM::regs()
        .cpu_per_conf()
        .modify(|_, w| unsafe {
            let _ = w.pll_freq_sel().set_bit();
            w.cpuperiod_sel().bits(match cpu_clock_speed {
                CpuClock::_80MHz => 0,
                CpuClock::_160MHz => 1,
                // The appliance only ever asks for the two speeds above and max.
                _ => 2,
            })
        });

    rom::ets_update_cpu_frequency_rom(cpu_clock_speed.frequency().as_mhz());
}

/// Bring the board up and return the raw peripheral set.
///
/// Call once at the top of `main`, then split with `split_resources!`.
#[must_use]
pub fn init() -> esp_hal::peripherals::Peripherals {
    set_cpu_clock(CpuClock::_160MHz);
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    esp_hal::init(config)
}
