//! YMF262 (OPL3) driver: 18 channels across two register banks.

use crate::bus::{ControlLine, OplBus, WriteTiming};
use crate::chip::{Opl3Device, OplDevice};
use crate::regmap;
use crate::shadow::ShadowRegisters;
use crate::tables::OPL3_CHANNEL_PAIRS;

/// Driver for a single YMF262 chip.
///
/// 18 two-operator channels in two banks selected by the A1 line, 5
/// shadowed chip-global registers, 6 optional 4-operator channels, stereo
/// panning. OPL3 mode must be enabled with
/// [`set_opl3_enabled`](Opl3Device::set_opl3_enabled) before the OPL3-only
/// features take effect.
///
/// Unlike the YM3812, the YMF262 has waveform selection permanently
/// enabled: [`get_wave_form_select`](OplDevice::get_wave_form_select)
/// always reports true and the setter only clears the legacy enable
/// register, which must stay 0 on this chip.
pub struct Opl3<B: OplBus> {
    bus: B,
    shadow: ShadowRegisters,
}

impl<B: OplBus> Opl3<B> {
    /// Number of 2-operator channels on the YMF262.
    pub const NUM_CHANNELS: u8 = 18;

    /// Number of shadowed chip-global registers (0x01, 0x104, 0x105, 0x08,
    /// 0xBD).
    const CHIP_REGISTER_SLOTS: usize = 5;

    /// Create a driver owning the given bus. Call
    /// [`begin`](OplDevice::begin) before sending any register data.
    pub fn new(bus: B) -> Self {
        Opl3 {
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

impl<B: OplBus> OplDevice for Opl3<B> {
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
        0x01
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
        self.bus.set_control(ControlLine::Bank, bank & 0x01 != 0);
    }

    fn get_wave_form_select(&self) -> bool {
        true
    }

    // Waveform selection cannot be turned off on the YMF262; the legacy
    // enable bit must stay cleared.
    fn set_wave_form_select(&mut self, _enable: bool) {
        self.set_chip_register(regmap::REG_WAVEFORM_SELECT, 0x00);
    }
}

impl<B: OplBus> Opl3Device for Opl3<B> {
    fn channel_pairs(&self) -> &'static [[u8; 2]] {
        &OPL3_CHANNEL_PAIRS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::RecordingBus;
    use crate::instrument::{Instrument, Instrument4Op};
    use crate::regmap::REG_FEEDBACK;

    fn started_chip() -> Opl3<RecordingBus> {
        let mut opl = Opl3::new(RecordingBus::new());
        opl.begin();
        opl.bus_mut().clear();
        opl
    }

    #[test]
    fn test_begin_zeroes_both_banks() {
        let mut opl = Opl3::new(RecordingBus::new());
        opl.begin();

        assert!(opl.shadow().is_zeroed());
        // 5 chip + 54 channel + 180 operator registers.
        assert_eq!(opl.bus().writes().len(), 239);
        assert!(opl.bus().writes().iter().any(|w| w.bank == 1));
    }

    #[test]
    fn test_channels_9_and_up_use_bank_1() {
        let mut opl = started_chip();

        opl.set_key_on(8, true);
        assert_eq!(opl.bus().writes().last().unwrap().bank, 0);
        assert_eq!(opl.bus().writes().last().unwrap().reg, 0xB0 + 8);

        opl.set_key_on(9, true);
        assert_eq!(opl.bus().writes().last().unwrap().bank, 1);
        assert_eq!(opl.bus().writes().last().unwrap().reg, 0xB0);

        opl.set_key_on(17, true);
        assert_eq!(opl.bus().writes().last().unwrap().bank, 1);
        assert_eq!(opl.bus().writes().last().unwrap().reg, 0xB0 + 8);
    }

    #[test]
    fn test_operator_writes_follow_bank_and_offset_table() {
        let mut opl = started_chip();

        // Channel 12 operator 1 lives in bank 1 at offset 0x0B from the
        // base register.
        opl.set_attack(12, 1, 0x0F);
        let write = *opl.bus().writes().last().unwrap();
        assert_eq!(write.bank, 1);
        assert_eq!(write.reg, 0x60 + 0x0B);
        assert_eq!(write.value, 0xF0);
    }

    #[test]
    fn test_shadow_round_trip_across_banks() {
        let mut opl = started_chip();

        for channel in 0..Opl3::<RecordingBus>::NUM_CHANNELS {
            opl.set_volume(channel, 0, (channel + 1) & 0x3F);
        }
        for channel in 0..Opl3::<RecordingBus>::NUM_CHANNELS {
            assert_eq!(opl.get_volume(channel, 0), (channel + 1) & 0x3F);
        }
    }

    #[test]
    fn test_opl3_chip_registers_use_bank_1() {
        let mut opl = started_chip();

        opl.set_opl3_enabled(true);
        let new_bit = opl.bus().writes()[0];
        assert_eq!(new_bit.bank, 1);
        assert_eq!(new_bit.reg, 0x05);
        assert_eq!(new_bit.value, 0x01);
        assert!(opl.is_opl3_enabled());
    }

    #[test]
    fn test_enabling_opl3_mode_opens_both_speakers() {
        let mut opl = started_chip();
        opl.set_opl3_enabled(true);

        for channel in 0..Opl3::<RecordingBus>::NUM_CHANNELS {
            assert!(opl.is_panned_left(channel));
            assert!(opl.is_panned_right(channel));
        }
    }

    #[test]
    fn test_panning_preserves_feedback_bits() {
        let mut opl = started_chip();
        opl.set_feedback(4, 0x07);
        opl.set_synth_mode(4, true);

        opl.set_panning(4, true, false);
        assert!(opl.is_panned_left(4));
        assert!(!opl.is_panned_right(4));
        assert_eq!(opl.get_feedback(4), 0x07);
        assert!(opl.get_synth_mode(4));
        assert_eq!(opl.get_channel_register(REG_FEEDBACK, 4), 0x1F);
    }

    #[test]
    fn test_wave_form_select_is_forced_on() {
        let mut opl = started_chip();
        assert!(opl.get_wave_form_select());

        // Disabling is accepted but only clears the legacy register.
        opl.set_wave_form_select(false);
        assert!(opl.get_wave_form_select());
        let write = *opl.bus().writes().last().unwrap();
        assert_eq!((write.reg, write.value), (0x01, 0x00));
    }

    #[test]
    fn test_4op_pairing_table() {
        let opl = Opl3::new(RecordingBus::new());
        assert_eq!(opl.get_num_4op_channels(), 6);
        assert_eq!(opl.get_4op_control_channel(0, 0), 0);
        assert_eq!(opl.get_4op_control_channel(0, 1), 3);
        assert_eq!(opl.get_4op_control_channel(3, 0), 9);
        assert_eq!(opl.get_4op_control_channel(3, 1), 12);
        // 4-op channel index wraps.
        assert_eq!(opl.get_4op_control_channel(6, 0), 0);
    }

    #[test]
    fn test_4op_enable_bitmask_round_trip() {
        let mut opl = started_chip();

        opl.set_4op_channel_enabled(0, true);
        opl.set_4op_channel_enabled(4, true);
        assert!(opl.is_4op_channel_enabled(0));
        assert!(!opl.is_4op_channel_enabled(1));
        assert!(opl.is_4op_channel_enabled(4));
        assert_eq!(opl.get_chip_register(0x104), 0x11);

        opl.set_4op_channel_enabled(0, false);
        assert!(!opl.is_4op_channel_enabled(0));
        assert_eq!(opl.get_chip_register(0x104), 0x10);

        opl.set_all_4op_channels_enabled(true);
        assert_eq!(opl.get_chip_register(0x104), 0x3F);
    }

    #[test]
    fn test_4op_instrument_programs_both_sub_channels() {
        let mut opl = started_chip();
        let data = [0x00, 0x01, 0x4F, 0xF1, 0x53, 0x06, 0x11, 0x00, 0xD2, 0x74, 0x00];
        let mut instrument = Instrument4Op {
            sub_instruments: [
                Instrument::from_bytes(&data).unwrap(),
                Instrument::from_bytes(&data).unwrap(),
            ],
        };
        instrument.sub_instruments[1].feedback = 0x01;

        opl.set_instrument_4op(1, &instrument, 1.0);

        // 4-op channel 1 is the 2-op pair (1, 4).
        assert_eq!(opl.get_feedback(1), 0x03);
        assert_eq!(opl.get_feedback(4), 0x01);
        assert_eq!(opl.get_instrument(1), instrument.sub_instruments[0]);
        assert_eq!(opl.get_instrument(4), instrument.sub_instruments[1]);
    }
}
