//! YM3812 (OPL2) driver: 9 channels in a single register bank.

use crate::bus::{OplBus, WriteTiming};
use crate::chip::OplDevice;
use crate::regmap;
use crate::shadow::ShadowRegisters;

/// Driver for a single YM3812 chip.
///
/// 9 two-operator channels, no bank-select line, 3 shadowed chip-global
/// registers.
///
/// # Example
///
/// ```no_run
/// use ymopl::{Opl2, OplDevice, RecordingBus};
///
/// let mut opl = Opl2::new(RecordingBus::new());
/// opl.begin();
/// opl.set_block(0, 4);
/// opl.set_f_number(0, 0x1B0);
/// opl.set_key_on(0, true);
/// ```
pub struct Opl2<B: OplBus> {
    bus: B,
    shadow: ShadowRegisters,
}

impl<B: OplBus> Opl2<B> {
    /// Number of 2-operator channels on the YM3812.
    pub const NUM_CHANNELS: u8 = 9;

    /// Number of shadowed chip-global registers (0x01, 0x08, 0xBD).
    const CHIP_REGISTER_SLOTS: usize = 3;

    /// Create a driver owning the given bus. Call
    /// [`begin`](OplDevice::begin) before sending any register data.
    pub fn new(bus: B) -> Self {
        Opl2 {
            bus,
            shadow: ShadowRegisters::new(
                Self::CHIP_REGISTER_SLOTS,
                Self::NUM_CHANNELS as usize,
            ),
        }
    }

    /// Borrow the underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Release the underlying bus.
    pub fn into_bus(self) -> B {
        self.bus
    }
}

impl<B: OplBus> OplDevice for Opl2<B> {
    type Bus = B;

    fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn shadow(&self) -> &ShadowRegisters {
        &self.shadow
    }

    fn shadow_mut(&mut self) -> &mut ShadowRegisters {
        &mut self.shadow
    }

    fn get_num_channels(&self) -> u8 {
        Self::NUM_CHANNELS
    }

    fn bank_select_mask(&self) -> u8 {
        0x00
    }

    fn write_timing(&self) -> WriteTiming {
        WriteTiming::OPL2
    }

    fn chip_register_slot(&self, reg: u16) -> usize {
        regmap::chip_register_offset(reg)
    }
}
