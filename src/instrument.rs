//! Instrument definitions.
//!
//! An [`Instrument`] is the value object a channel's timbre is programmed
//! from: envelope, waveform and multiplier settings for both operators plus
//! the channel-level feedback and synthesis algorithm flags. Instruments can
//! be built by hand, parsed from the 11-byte Adlib bank layout, captured
//! back from a channel's shadow registers, or (de)serialized with serde for
//! patch storage.

use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{OplError, Result};

/// Byte length of a single instrument definition.
pub const INSTRUMENT_DATA_LEN: usize = 11;

/// Byte length of a 4-operator instrument definition (two sub instruments).
pub const INSTRUMENT_4OP_DATA_LEN: usize = 2 * INSTRUMENT_DATA_LEN;

/// Index of the modulating operator of a channel.
pub const MODULATOR: u8 = 0;

/// Index of the carrier operator of a channel.
pub const CARRIER: u8 = 1;

/// Drum sound of the chip's percussion mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
pub enum Drum {
    /// Bass drum, both operators of channel 6.
    Bass = 0,
    /// Snare drum, carrier of channel 7.
    Snare = 1,
    /// Tom tom, modulator of channel 8.
    Tom = 2,
    /// Cymbal, carrier of channel 8.
    Cymbal = 3,
    /// Hi-hat, modulator of channel 7.
    HiHat = 4,
}

impl Drum {
    /// Index into the drum lookup tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Trigger bit of this drum in the rhythm register.
    pub fn flag(self) -> DrumFlags {
        match self {
            Drum::Bass => DrumFlags::BASS,
            Drum::Snare => DrumFlags::SNARE,
            Drum::Tom => DrumFlags::TOM,
            Drum::Cymbal => DrumFlags::CYMBAL,
            Drum::HiHat => DrumFlags::HI_HAT,
        }
    }
}

bitflags::bitflags! {
    /// Drum trigger bits of the rhythm register (0xBD, low 5 bits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DrumFlags: u8 {
        /// Bass drum trigger.
        const BASS = 0x10;
        /// Snare drum trigger.
        const SNARE = 0x08;
        /// Tom tom trigger.
        const TOM = 0x04;
        /// Cymbal trigger.
        const CYMBAL = 0x02;
        /// Hi-hat trigger.
        const HI_HAT = 0x01;
    }
}

/// Discriminates how an instrument is applied to the chip: as a melodic
/// voice or as one of the percussion-mode drum sounds.
///
/// The numeric values match the type bytes used by instrument bank files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
pub enum InstrumentType {
    /// Regular melodic voice.
    Melodic = 0,
    /// Bass drum.
    Bass = 6,
    /// Snare drum.
    Snare = 7,
    /// Tom tom.
    Tom = 8,
    /// Cymbal.
    Cymbal = 9,
    /// Hi-hat.
    HiHat = 10,
}

impl InstrumentType {
    /// The drum this type maps to, or `None` for a melodic instrument.
    pub fn drum(self) -> Option<Drum> {
        match self {
            InstrumentType::Melodic => None,
            InstrumentType::Bass => Some(Drum::Bass),
            InstrumentType::Snare => Some(Drum::Snare),
            InstrumentType::Tom => Some(Drum::Tom),
            InstrumentType::Cymbal => Some(Drum::Cymbal),
            InstrumentType::HiHat => Some(Drum::HiHat),
        }
    }
}

/// Settings of one operator of an instrument.
///
/// Field widths match the chip registers; values wider than their field are
/// masked when the instrument is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSettings {
    /// Apply amplitude modulation (depth set chip-wide).
    pub tremolo: bool,
    /// Apply vibrato (depth set chip-wide).
    pub vibrato: bool,
    /// Hold the sustain level until key-off.
    pub maintain_sustain: bool,
    /// Shorten the envelope as the pitch rises (KSR).
    pub envelope_scaling: bool,
    /// Frequency multiplier, 4 bits. 0 multiplies by 0.5.
    pub multiplier: u8,
    /// Key scale level, 2 bits: attenuation per octave.
    pub scaling_level: u8,
    /// Output attenuation, 6 bits. 0 is loudest.
    pub output_level: u8,
    /// Attack rate, 4 bits. 0xF is fastest.
    pub attack: u8,
    /// Decay rate, 4 bits. 0xF is fastest.
    pub decay: u8,
    /// Sustain level, 4 bits. 0 is loudest.
    pub sustain: u8,
    /// Release rate, 4 bits. 0xF is fastest.
    pub release: u8,
    /// Waveform select, 3 bits.
    pub wave_form: u8,
}

/// A complete 2-operator instrument definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Modulator and carrier settings.
    pub operators: [OperatorSettings; 2],
    /// Semitones to pitch played notes up or down; for drum instruments the
    /// absolute note of the drum sound.
    pub transpose: i8,
    /// Modulator feedback factor, 3 bits.
    pub feedback: u8,
    /// When true both operators produce sound (additive synthesis); when
    /// false operator 0 modulates operator 1 (FM).
    pub additive_synth: bool,
    /// How the instrument is applied to the chip.
    pub instrument_type: InstrumentType,
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument {
            operators: [OperatorSettings::default(); 2],
            transpose: 0,
            feedback: 0,
            additive_synth: false,
            instrument_type: InstrumentType::Melodic,
        }
    }
}

impl Instrument {
    /// Parse an instrument from the 11-byte Adlib bank layout.
    ///
    /// Layout: transpose; modulator registers 0x20/0x40/0x60/0x80; channel
    /// register 0xC0; carrier registers 0x20/0x40/0x60/0x80; combined
    /// waveform byte (modulator in the high nibble, carrier in the low).
    pub fn from_bytes(data: &[u8]) -> Result<Instrument> {
        if data.len() != INSTRUMENT_DATA_LEN {
            return Err(OplError::InstrumentData {
                expected: INSTRUMENT_DATA_LEN,
                actual: data.len(),
            });
        }

        let mut instrument = Instrument {
            transpose: data[0] as i8,
            feedback: (data[5] & 0x0E) >> 1,
            additive_synth: data[5] & 0x01 != 0,
            ..Instrument::default()
        };

        for op in 0..2 {
            let regs = &data[1 + op * 5..];
            instrument.operators[op] = OperatorSettings {
                tremolo: regs[0] & 0x80 != 0,
                vibrato: regs[0] & 0x40 != 0,
                maintain_sustain: regs[0] & 0x20 != 0,
                envelope_scaling: regs[0] & 0x10 != 0,
                multiplier: regs[0] & 0x0F,
                scaling_level: (regs[1] & 0xC0) >> 6,
                output_level: regs[1] & 0x3F,
                attack: (regs[2] & 0xF0) >> 4,
                decay: regs[2] & 0x0F,
                sustain: (regs[3] & 0xF0) >> 4,
                release: regs[3] & 0x0F,
                wave_form: 0,
            };
        }
        instrument.operators[0].wave_form = (data[10] & 0x70) >> 4;
        instrument.operators[1].wave_form = data[10] & 0x07;

        Ok(instrument)
    }
}

/// A 4-operator instrument: one 2-op instrument per paired channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument4Op {
    /// Sub instruments of the control channel and its paired channel.
    pub sub_instruments: [Instrument; 2],
}

impl Instrument4Op {
    /// Parse a 4-operator instrument from 22 contiguous bytes holding two
    /// 11-byte sub instrument definitions.
    pub fn from_bytes(data: &[u8]) -> Result<Instrument4Op> {
        if data.len() != INSTRUMENT_4OP_DATA_LEN {
            return Err(OplError::InstrumentData {
                expected: INSTRUMENT_4OP_DATA_LEN,
                actual: data.len(),
            });
        }

        Ok(Instrument4Op {
            sub_instruments: [
                Instrument::from_bytes(&data[..INSTRUMENT_DATA_LEN])?,
                Instrument::from_bytes(&data[INSTRUMENT_DATA_LEN..])?,
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    // INSTRUMENT_PIANO1 from the Adlib standard bank.
    const PIANO1: [u8; 11] = [
        0x00, 0x01, 0x4F, 0xF1, 0x53, 0x06, 0x11, 0x00, 0xD2, 0x74, 0x00,
    ];

    #[test]
    fn test_from_bytes_unpacks_fields() {
        let piano = Instrument::from_bytes(&PIANO1).unwrap();

        assert_eq!(piano.transpose, 0);
        assert_eq!(piano.feedback, 3);
        assert!(!piano.additive_synth);
        assert_eq!(piano.instrument_type, InstrumentType::Melodic);

        let op0 = piano.operators[MODULATOR as usize];
        assert!(!op0.tremolo);
        assert!(!op0.vibrato);
        assert!(!op0.maintain_sustain);
        assert!(!op0.envelope_scaling);
        assert_eq!(op0.multiplier, 0x01);
        assert_eq!(op0.scaling_level, 0x01);
        assert_eq!(op0.output_level, 0x0F);
        assert_eq!(op0.attack, 0x0F);
        assert_eq!(op0.decay, 0x01);
        assert_eq!(op0.sustain, 0x05);
        assert_eq!(op0.release, 0x03);
        assert_eq!(op0.wave_form, 0x00);

        let op1 = piano.operators[CARRIER as usize];
        assert!(op1.envelope_scaling);
        assert_eq!(op1.multiplier, 0x01);
        assert_eq!(op1.output_level, 0x00);
        assert_eq!(op1.attack, 0x0D);
        assert_eq!(op1.decay, 0x02);
        assert_eq!(op1.sustain, 0x07);
        assert_eq!(op1.release, 0x04);
        assert_eq!(op1.wave_form, 0x00);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let err = Instrument::from_bytes(&PIANO1[..10]).unwrap_err();
        assert!(matches!(
            err,
            OplError::InstrumentData {
                expected: 11,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_instrument_4op_from_bytes() {
        let mut data = [0u8; INSTRUMENT_4OP_DATA_LEN];
        data[..11].copy_from_slice(&PIANO1);
        data[11..].copy_from_slice(&PIANO1);

        let inst = Instrument4Op::from_bytes(&data).unwrap();
        assert_eq!(inst.sub_instruments[0], inst.sub_instruments[1]);

        assert!(Instrument4Op::from_bytes(&data[..12]).is_err());
    }

    #[test]
    fn test_drum_flags_match_rhythm_register_bits() {
        let flags = DrumFlags::BASS | DrumFlags::TOM | DrumFlags::HI_HAT;
        assert_eq!(flags.bits(), 0x15);
        assert_eq!(Drum::Snare.flag().bits(), 0x08);
    }

    #[test]
    fn test_instrument_type_from_bank_byte() {
        assert_eq!(InstrumentType::from_u8(0), Some(InstrumentType::Melodic));
        assert_eq!(InstrumentType::from_u8(6), Some(InstrumentType::Bass));
        assert_eq!(InstrumentType::from_u8(10), Some(InstrumentType::HiHat));
        assert_eq!(InstrumentType::from_u8(3), None);
        assert_eq!(InstrumentType::Cymbal.drum(), Some(Drum::Cymbal));
        assert_eq!(InstrumentType::Melodic.drum(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let piano = Instrument::from_bytes(&PIANO1).unwrap();
        let json = serde_json::to_string(&piano).unwrap();
        let back: Instrument = serde_json::from_str(&json).unwrap();
        assert_eq!(piano, back);
    }
}
