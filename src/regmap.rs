//! Register address map.
//!
//! Pure functions translating logical (channel, operator, base register)
//! coordinates into physical register addresses and shadow storage offsets.
//! No I/O happens here; the chip variant drivers compose these with the bus
//! writer.
//!
//! All functions are total: out-of-range channel and operator indices wrap
//! around (modulo the valid count) instead of failing. This wrap-around
//! behaviour is part of the register-compatibility contract and is covered
//! by tests.

use crate::tables::{CHANNELS_PER_BANK, REGISTER_OFFSETS};

/// Waveform select enable (chip-global, 0x01).
pub const REG_WAVEFORM_SELECT: u16 = 0x01;
/// Keyboard split point (chip-global, 0x08).
pub const REG_KEYBOARD_SPLIT: u16 = 0x08;
/// AM depth / vibrato depth / rhythm control (chip-global, 0xBD).
pub const REG_RHYTHM: u16 = 0xBD;
/// 4-operator channel enable mask (chip-global, bank 1, 0x104).
pub const REG_4OP_ENABLE: u16 = 0x104;
/// OPL3 mode enable, the "NEW" bit (chip-global, bank 1, 0x105).
pub const REG_OPL3_ENABLE: u16 = 0x105;

/// Frequency number, low 8 bits (channel base, 0xA0).
pub const REG_FREQUENCY_LOW: u8 = 0xA0;
/// Key-on / block / frequency number high bits (channel base, 0xB0).
pub const REG_KEY_ON_BLOCK: u8 = 0xB0;
/// Feedback / synthesis algorithm / panning (channel base, 0xC0).
pub const REG_FEEDBACK: u8 = 0xC0;

/// Tremolo / vibrato / sustain / KSR / multiplier (operator base, 0x20).
pub const REG_OP_FLAGS_MULTIPLIER: u8 = 0x20;
/// Key scale level / output level (operator base, 0x40).
pub const REG_OP_LEVELS: u8 = 0x40;
/// Attack / decay rates (operator base, 0x60).
pub const REG_OP_ATTACK_DECAY: u8 = 0x60;
/// Sustain level / release rate (operator base, 0x80).
pub const REG_OP_SUSTAIN_RELEASE: u8 = 0x80;
/// Waveform select (operator base, 0xE0).
pub const REG_OP_WAVEFORM: u8 = 0xE0;

/// Shadow slot of a chip-global register on the base (OPL2) variant.
///
/// Unknown registers alias to slot 0, the slot of register 0x01. This
/// aliasing is inherited from the original driver and kept for bit-exact
/// compatibility.
pub fn chip_register_offset(reg: u16) -> usize {
    match reg & 0xFF {
        0x08 => 1,
        0xBD => 2,
        _ => 0,
    }
}

/// Shadow slot of a chip-global register on the OPL3-family variants, which
/// add the connection select (0x104) and NEW (0x105) registers.
///
/// Carries the same unknown-register aliasing to slot 0 as
/// [`chip_register_offset`].
pub fn extended_chip_register_offset(reg: u16) -> usize {
    match reg & 0xFF {
        0x04 => 1,
        0x05 => 2,
        0x08 => 3,
        0xBD => 4,
        _ => 0,
    }
}

/// Shadow slot of a channel register.
///
/// Channels occupy 3 consecutive slots in the order 0xA0, 0xB0, 0xC0. An
/// invalid base register aliases to the 0xA0 slot.
pub fn channel_register_offset(num_channels: u8, base_register: u8, channel: u8) -> usize {
    let channel = (channel % num_channels) as usize;
    let offset = channel * 3;

    match base_register {
        REG_KEY_ON_BLOCK => offset + 1,
        REG_FEEDBACK => offset + 2,
        _ => offset,
    }
}

/// Shadow slot of an operator register.
///
/// Each channel occupies 10 consecutive slots, 5 per operator, in the order
/// 0x20, 0x40, 0x60, 0x80, 0xE0. An invalid base register aliases to the
/// 0x20 slot.
pub fn operator_register_offset(
    num_channels: u8,
    base_register: u8,
    channel: u8,
    operator: u8,
) -> usize {
    let channel = (channel % num_channels) as usize;
    let operator = (operator & 0x01) as usize;
    let offset = channel * 10 + operator * 5;

    match base_register {
        REG_OP_LEVELS => offset + 1,
        REG_OP_ATTACK_DECAY => offset + 2,
        REG_OP_SUSTAIN_RELEASE => offset + 3,
        REG_OP_WAVEFORM => offset + 4,
        _ => offset,
    }
}

/// Physical offset from an operator base register to the register of the
/// given (channel-within-bank, operator) pair.
pub fn register_offset(channel: u8, operator: u8) -> u8 {
    REGISTER_OFFSETS[(operator % 2) as usize][(channel % CHANNELS_PER_BANK) as usize]
}

/// Bank holding the given channel, masked to the width of the variant's
/// bank-select lines (0x00 for OPL2, 0x01 for OPL3, 0x03 for the Duo).
pub fn bank_of(channel: u8, bank_mask: u8) -> u8 {
    (channel / CHANNELS_PER_BANK) & bank_mask
}
