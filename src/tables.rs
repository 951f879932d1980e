//! Fixed lookup tables shared by all chip variants.
//!
//! These tables reproduce the physical register layout of the YM3812 family
//! exactly. The operator offset table in particular encodes the chip's
//! non-contiguous layout where register blocks of 6 operators are laid out
//! with a gap after every group of 3 channels.

/// Number of channels addressable within one register bank.
pub const CHANNELS_PER_BANK: u8 = 9;

/// Number of notes in one octave.
pub const NUM_NOTES: u8 = 12;

/// Highest frequency block (octave range selector) the chip supports.
pub const NUM_OCTAVES: u8 = 7;

/// Number of drum sounds available in percussion mode.
pub const NUM_DRUM_SOUNDS: usize = 5;

/// Sentinel in [`DRUM_REGISTER_OFFSETS`] marking an operator that a drum
/// sound does not use.
pub const DRUM_OFFSET_UNUSED: u8 = 0xFF;

/// Physical register offsets per (operator, channel-within-bank).
///
/// Added to an operator base register (0x20, 0x40, 0x60, 0x80, 0xE0) to form
/// the register address of one operator of one channel. Note the gaps after
/// every third channel.
pub const REGISTER_OFFSETS: [[u8; 9]; 2] = [
    [0x00, 0x01, 0x02, 0x08, 0x09, 0x0A, 0x10, 0x11, 0x12], // operator 0
    [0x03, 0x04, 0x05, 0x0B, 0x0C, 0x0D, 0x13, 0x14, 0x15], // operator 1
];

/// Physical operator register offsets per (operator, drum sound).
///
/// Indexed by `[operator][drum]` with drums ordered bass, snare, tom,
/// cymbal, hi-hat. The bass drum occupies both operators of channel 6;
/// snare and hi-hat share the operators of channel 7, tom and cymbal those
/// of channel 8. [`DRUM_OFFSET_UNUSED`] marks the unused operator.
pub const DRUM_REGISTER_OFFSETS: [[u8; NUM_DRUM_SOUNDS]; 2] = [
    [0x10, 0xFF, 0x12, 0xFF, 0x11],
    [0x13, 0x14, 0xFF, 0x15, 0xFF],
];

/// Channel occupied by each drum sound in percussion mode.
pub const DRUM_CHANNELS: [u8; NUM_DRUM_SOUNDS] = [6, 7, 8, 8, 7];

/// F-numbers producing the 12 notes of an octave when the block equals the
/// octave number.
pub const NOTE_FNUMBERS: [u16; NUM_NOTES as usize] = [
    0x156, 0x16B, // C, C#
    0x181, 0x198, // D, D#
    0x1B0, // E
    0x1CA, 0x1E5, // F, F#
    0x202, 0x220, // G, G#
    0x241, 0x263, // A, A#
    0x287, // B
];

/// Frequency step in Hz per F-number unit, indexed by block. Doubles with
/// each block.
pub const F_INTERVALS: [f32; 8] = [0.048, 0.095, 0.190, 0.379, 0.759, 1.517, 3.034, 6.069];

/// Upper frequency bound in Hz of each block.
pub const BLOCK_FREQUENCIES: [f32; 8] = [
    48.503, 97.006, 194.013, 388.026, 776.053, 1552.107, 3104.215, 6208.431,
];

/// 4-operator channel pairs of a single YMF262: `[control, paired]` 2-op
/// channel indices per 4-op channel.
pub const OPL3_CHANNEL_PAIRS: [[u8; 2]; 6] = [
    [0, 3],
    [1, 4],
    [2, 5],
    [9, 12],
    [10, 13],
    [11, 14],
];

/// 4-operator channel pairs across both chips of an OPL3 Duo board.
pub const OPL3_DUO_CHANNEL_PAIRS: [[u8; 2]; 12] = [
    [0, 3],
    [1, 4],
    [2, 5],
    [9, 12],
    [10, 13],
    [11, 14],
    [18, 21],
    [19, 22],
    [20, 23],
    [27, 30],
    [28, 31],
    [29, 32],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_offsets_skip_gaps() {
        // Operator 1 offsets are operator 0 offsets + 3 within each group.
        for ch in 0..9 {
            assert_eq!(REGISTER_OFFSETS[1][ch], REGISTER_OFFSETS[0][ch] + 3);
        }
        // Groups of three channels with a gap of 3 registers in between.
        assert_eq!(REGISTER_OFFSETS[0][3] - REGISTER_OFFSETS[0][2], 6);
        assert_eq!(REGISTER_OFFSETS[0][6] - REGISTER_OFFSETS[0][5], 6);
    }

    #[test]
    fn test_drum_offsets_match_drum_channels() {
        // Each used drum offset addresses an operator of the drum's channel.
        for drum in 0..NUM_DRUM_SOUNDS {
            let channel = DRUM_CHANNELS[drum] as usize;
            for op in 0..2 {
                let offset = DRUM_REGISTER_OFFSETS[op][drum];
                if offset != DRUM_OFFSET_UNUSED {
                    assert_eq!(offset, REGISTER_OFFSETS[op][channel]);
                }
            }
        }
    }

    #[test]
    fn test_block_steps_double() {
        for block in 1..8 {
            let ratio = F_INTERVALS[block] / F_INTERVALS[block - 1];
            assert!((1.9..=2.1).contains(&ratio), "block {} ratio {}", block, ratio);
        }
    }

    #[test]
    fn test_note_fnumbers_ascend() {
        for note in 1..NUM_NOTES as usize {
            assert!(NOTE_FNUMBERS[note] > NOTE_FNUMBERS[note - 1]);
        }
    }
}
