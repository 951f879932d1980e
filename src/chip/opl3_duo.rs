//! OPL3 Duo driver: two YMF262 chips behind one bus, 36 channels in 4
//! banks.

use crate::bus::{ControlLine, OplBus, WriteTiming};
use crate::chip::{Opl3Device, OplDevice};
use crate::regmap;
use crate::shadow::ShadowRegisters;
use crate::tables::OPL3_DUO_CHANNEL_PAIRS;

/// Driver for an OPL3 Duo board carrying two YMF262 chips.
///
/// 36 two-operator channels in 4 banks: the A1 line selects the bank
/// within a chip, the unit line selects the chip. Chip-global registers
/// are kept as one logical register: writing one fans the write out to
/// both chips' corresponding bank so their global state never diverges,
/// and the shadow store holds the single shared value.
pub struct Opl3Duo<B: OplBus> {
    bus: B,
    shadow: ShadowRegisters,
}

impl<B: OplBus> Opl3Duo<B> {
    /// Number of 2-operator channels across both chips.
    pub const NUM_CHANNELS: u8 = 36;

    /// Number of shadowed chip-global registers, shared by both chips.
    const CHIP_REGISTER_SLOTS: usize = 5;

    /// Create a driver owning the given bus. Call
    /// [`begin`](OplDevice::begin) before sending any register data.
    pub fn new(bus: B) -> Self {
        Opl3Duo {
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

impl<B: OplBus> OplDevice for Opl3Duo<B> {
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
        0x03
    }

    fn write_timing(&self) -> WriteTiming {
        WriteTiming::OPL3
    }

    fn chip_register_slot(&self, reg: u16) -> usize {
        regmap::extended_chip_register_offset(reg)
    }

    fn control_lines(&self) -> &'static [ControlLine] {
        &[
            ControlLine::Address,
            ControlLine::Latch,
            ControlLine::Reset,
            ControlLine::Bank,
            ControlLine::Unit,
        ]
    }

    fn chip_global_registers(&self) -> &'static [u16] {
        &[
            0x00,
            regmap::REG_KEYBOARD_SPLIT,
            regmap::REG_RHYTHM,
            regmap::REG_4OP_ENABLE,
            regmap::REG_OPL3_ENABLE,
        ]
    }

    fn select_bank(&mut self, bank: u8) {
        self.bus.set_control(ControlLine::Unit, bank & 0x02 != 0);
        self.bus.set_control(ControlLine::Bank, bank & 0x01 != 0);
    }

    // Each chip has its own reset line behind the unit select.
    fn pulse_reset(&mut self) {
        for unit in 0..2 {
            self.bus.set_control(ControlLine::Unit, unit == 1);
            self.bus.set_control(ControlLine::Reset, false);
            self.bus.delay_ms(1);
            self.bus.set_control(ControlLine::Reset, true);
        }
        self.bus.set_control(ControlLine::Unit, false);
    }

    // Chip-global registers are one logical register shared by both chips:
    // fan the write out to the same bank of each unit.
    fn set_chip_register(&mut self, reg: u16, value: u8) {
        let slot = self.chip_register_slot(reg);
        self.shadow_mut().set_chip(slot, value);

        let bank = ((reg >> 8) & 0x01) as u8;
        let physical = (reg & 0xFF) as u8;
        self.write(bank, physical, value);
        self.write(bank | 0x02, physical, value);
    }

    fn get_wave_form_select(&self) -> bool {
        true
    }

    fn set_wave_form_select(&mut self, _enable: bool) {
        self.set_chip_register(regmap::REG_WAVEFORM_SELECT, 0x00);
    }
}

impl<B: OplBus> Opl3Device for Opl3Duo<B> {
    fn channel_pairs(&self) -> &'static [[u8; 2]] {
        &OPL3_DUO_CHANNEL_PAIRS
    }
}
