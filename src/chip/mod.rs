//! Chip variant drivers.
//!
//! [`OplDevice`] is the capability interface every chip variant implements:
//! a handful of required low-level register access methods plus the full set
//! of musical accessors provided on top of them. The three concrete drivers
//! ([`Opl2`], [`Opl3`], [`Opl3Duo`]) differ only in bank/channel counts, the
//! bank-select lines they drive and a few overridden register behaviours.
//!
//! [`Opl3Device`] extends the interface with the OPL3-family capabilities:
//! stereo panning, OPL3 mode and 4-operator channels.
//!
//! All accessors follow the chip's register-compatibility contract: channel
//! and operator indices wrap around, field values are masked to their field
//! width, and nothing in the write path can fail.

mod opl2;
mod opl3;
mod opl3_duo;

pub use opl2::Opl2;
pub use opl3::Opl3;
pub use opl3_duo::Opl3Duo;

use crate::bus::{self, ControlLine, OplBus, WriteTiming};
use crate::instrument::{
    Drum, DrumFlags, Instrument, Instrument4Op, InstrumentType, OperatorSettings,
};
use crate::regmap;
use crate::shadow::ShadowRegisters;
use crate::tables::{
    BLOCK_FREQUENCIES, CHANNELS_PER_BANK, DRUM_CHANNELS, DRUM_OFFSET_UNUSED,
    DRUM_REGISTER_OFFSETS, F_INTERVALS, NOTE_FNUMBERS, NUM_NOTES, NUM_OCTAVES,
};

/// Smallest volume accepted by the instrument setters.
pub const VOLUME_MIN: f32 = 0.0;
/// Largest volume accepted by the instrument setters.
pub const VOLUME_MAX: f32 = 1.0;

/// Lowest block whose upper frequency bound exceeds the given frequency, or
/// 7 when the frequency is beyond the chip's range.
pub fn get_frequency_block(frequency: f32) -> u8 {
    for (block, &bound) in BLOCK_FREQUENCIES.iter().enumerate() {
        if frequency < bound {
            return block as u8;
        }
    }
    7
}

/// F-number of the given note, assuming the channel's block equals the
/// note's octave. The note index wraps modulo 12.
pub fn get_note_f_number(note: u8) -> u16 {
    NOTE_FNUMBERS[(note % NUM_NOTES) as usize]
}

/// Common driver interface of all OPL chip variants.
///
/// Implementations provide the low-level register plumbing (shadow store,
/// bank selection, bus write); everything musical is provided on top and
/// shared between the variants. Variants override individual provided
/// methods where the hardware differs (the OPL3 family, for instance, keeps
/// waveform selection permanently enabled).
pub trait OplDevice {
    /// The platform bus this driver owns.
    type Bus: OplBus;

    /// Exclusive access to the underlying bus.
    fn bus_mut(&mut self) -> &mut Self::Bus;

    /// Shadow register store of this chip.
    fn shadow(&self) -> &ShadowRegisters;

    /// Mutable shadow register store of this chip.
    fn shadow_mut(&mut self) -> &mut ShadowRegisters;

    /// Number of 2-operator channels this variant exposes.
    fn get_num_channels(&self) -> u8;

    /// Mask limiting [`regmap::bank_of`] to the bank-select lines this
    /// variant's bus actually has.
    fn bank_select_mask(&self) -> u8;

    /// Settle delays of this chip revision.
    fn write_timing(&self) -> WriteTiming;

    /// Shadow slot of a chip-global register.
    fn chip_register_slot(&self, reg: u16) -> usize;

    /// Control lines this variant drives.
    fn control_lines(&self) -> &'static [ControlLine] {
        &[ControlLine::Address, ControlLine::Latch, ControlLine::Reset]
    }

    /// Chip-global registers zeroed by [`OplDevice::reset`].
    fn chip_global_registers(&self) -> &'static [u16] {
        &[0x00, regmap::REG_KEYBOARD_SPLIT, regmap::REG_RHYTHM]
    }

    /// Drive the bank-select line(s) for the given bank. The base variant
    /// has none and ignores the request.
    fn select_bank(&mut self, bank: u8) {
        let _ = bank;
    }

    /// Pulse the hardware reset line for at least 1 ms.
    fn pulse_reset(&mut self) {
        let bus = self.bus_mut();
        bus.set_control(ControlLine::Reset, false);
        bus.delay_ms(1);
        bus.set_control(ControlLine::Reset, true);
    }

    /// Write a value to a physical register of the given bank. Does not
    /// update the shadow store.
    fn write(&mut self, bank: u8, reg: u8, value: u8) {
        self.select_bank(bank);
        let timing = self.write_timing();
        bus::write_register(self.bus_mut(), timing, reg, value);
    }

    /// Initialize the chip: configure the control lines, hard-reset the
    /// hardware and zero every shadowed register.
    fn begin(&mut self) {
        for &line in self.control_lines() {
            let bus = self.bus_mut();
            bus.init_control(line);
            // Latch and reset idle high, everything else low.
            let idle_high = matches!(line, ControlLine::Latch | ControlLine::Reset);
            bus.set_control(line, idle_high);
        }
        self.reset();
    }

    /// Hard-reset the chip and re-initialize all registers to 0x00.
    /// Idempotent; may be called at any time after [`OplDevice::begin`].
    fn reset(&mut self) {
        self.pulse_reset();

        for &reg in self.chip_global_registers() {
            self.set_chip_register(reg, 0x00);
        }

        for channel in 0..self.get_num_channels() {
            self.set_channel_register(regmap::REG_FREQUENCY_LOW, channel, 0x00);
            self.set_channel_register(regmap::REG_KEY_ON_BLOCK, channel, 0x00);
            self.set_channel_register(regmap::REG_FEEDBACK, channel, 0x00);

            for op in 0..2 {
                self.set_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, op, 0x00);
                self.set_operator_register(regmap::REG_OP_LEVELS, channel, op, 0x00);
                self.set_operator_register(regmap::REG_OP_ATTACK_DECAY, channel, op, 0x00);
                self.set_operator_register(regmap::REG_OP_SUSTAIN_RELEASE, channel, op, 0x00);
                self.set_operator_register(regmap::REG_OP_WAVEFORM, channel, op, 0x00);
            }
        }
    }

    /// Last value written to a chip-global register.
    fn get_chip_register(&self, reg: u16) -> u8 {
        self.shadow().chip(self.chip_register_slot(reg))
    }

    /// Write a chip-global register and mirror it in the shadow store.
    fn set_chip_register(&mut self, reg: u16, value: u8) {
        let slot = self.chip_register_slot(reg);
        self.shadow_mut().set_chip(slot, value);

        let bank = ((reg >> 8) & 0x01) as u8;
        self.write(bank, (reg & 0xFF) as u8, value);
    }

    /// Last value written to a channel register.
    fn get_channel_register(&self, base_register: u8, channel: u8) -> u8 {
        let offset =
            regmap::channel_register_offset(self.get_num_channels(), base_register, channel);
        self.shadow().channel(offset)
    }

    /// Write a channel register and mirror it in the shadow store.
    fn set_channel_register(&mut self, base_register: u8, channel: u8, value: u8) {
        let offset =
            regmap::channel_register_offset(self.get_num_channels(), base_register, channel);
        self.shadow_mut().set_channel(offset, value);

        let channel = channel % self.get_num_channels();
        let bank = regmap::bank_of(channel, self.bank_select_mask());
        let reg = base_register + (channel % CHANNELS_PER_BANK);
        self.write(bank, reg, value);
    }

    /// Last value written to an operator register.
    fn get_operator_register(&self, base_register: u8, channel: u8, operator: u8) -> u8 {
        let offset = regmap::operator_register_offset(
            self.get_num_channels(),
            base_register,
            channel,
            operator,
        );
        self.shadow().operator(offset)
    }

    /// Write an operator register and mirror it in the shadow store.
    fn set_operator_register(&mut self, base_register: u8, channel: u8, operator: u8, value: u8) {
        let offset = regmap::operator_register_offset(
            self.get_num_channels(),
            base_register,
            channel,
            operator,
        );
        self.shadow_mut().set_operator(offset, value);

        let channel = channel % self.get_num_channels();
        let bank = regmap::bank_of(channel, self.bank_select_mask());
        let reg = base_register + regmap::register_offset(channel, operator);
        self.write(bank, reg, value);
    }

    // Frequency helpers.

    /// F-number that produces the given frequency with the channel's
    /// current block, clamped to the 10-bit range.
    fn get_frequency_f_number(&self, channel: u8, frequency: f32) -> u16 {
        let step = self.get_frequency_step(channel);
        (frequency / step).round().clamp(0.0, 1023.0) as u16
    }

    /// Frequency step in Hz per F-number unit for the channel's current
    /// block.
    fn get_frequency_step(&self, channel: u8) -> f32 {
        F_INTERVALS[self.get_block(channel) as usize]
    }

    /// Current frequency of the channel in Hz.
    fn get_frequency(&self, channel: u8) -> f32 {
        f32::from(self.get_f_number(channel)) * self.get_frequency_step(channel)
    }

    /// Tune the channel to the given frequency, switching blocks when the
    /// current block cannot reach it.
    fn set_frequency(&mut self, channel: u8, frequency: f32) {
        let block = get_frequency_block(frequency);
        if self.get_block(channel) != block {
            self.set_block(channel, block);
        }
        let f_number = self.get_frequency_f_number(channel, frequency);
        self.set_f_number(channel, f_number);
    }

    // Note and drum playback.

    /// Play a note: key the channel off, move it to the note's octave and
    /// F-number, then key it back on. The key-off first avoids an audible
    /// pitch sweep.
    fn play_note(&mut self, channel: u8, octave: u8, note: u8) {
        self.set_key_on(channel, false);
        self.set_block(channel, octave.min(NUM_OCTAVES));
        self.set_f_number(channel, get_note_f_number(note));
        self.set_key_on(channel, true);
    }

    /// Trigger a drum sound at the given pitch. Percussion mode must be
    /// enabled and the drum's operators programmed first.
    ///
    /// Drums sharing a channel (snare + hi-hat, tom + cymbal) share octave
    /// and note; retuning one retunes the other.
    fn play_drum(&mut self, drum: Drum, octave: u8, note: u8) {
        let state = self.get_drums();
        self.set_drums(state - drum.flag());

        let channel = DRUM_CHANNELS[drum.index()];
        self.set_block(channel, octave.min(NUM_OCTAVES));
        self.set_f_number(channel, get_note_f_number(note));
        self.set_drums(state | drum.flag());
    }

    // Instruments.

    /// Program a channel's two operators and feedback/algorithm settings
    /// from an instrument definition. `volume` in [0, 1] attenuates the
    /// operators' output levels; panning bits of the channel are preserved.
    fn set_instrument(&mut self, channel: u8, instrument: &Instrument, volume: f32) {
        let volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);

        // The waveform fields only take effect with waveform select on.
        self.set_wave_form_select(true);
        for op in 0..2u8 {
            let settings = instrument.operators[op as usize];
            let level = attenuated_level(settings.output_level, volume);

            self.set_operator_register(
                regmap::REG_OP_FLAGS_MULTIPLIER,
                channel,
                op,
                pack_operator_flags(&settings),
            );
            self.set_operator_register(
                regmap::REG_OP_LEVELS,
                channel,
                op,
                ((settings.scaling_level & 0x03) << 6) | (level & 0x3F),
            );
            self.set_operator_register(
                regmap::REG_OP_ATTACK_DECAY,
                channel,
                op,
                ((settings.attack & 0x0F) << 4) | (settings.decay & 0x0F),
            );
            self.set_operator_register(
                regmap::REG_OP_SUSTAIN_RELEASE,
                channel,
                op,
                ((settings.sustain & 0x0F) << 4) | (settings.release & 0x0F),
            );
            self.set_operator_register(
                regmap::REG_OP_WAVEFORM,
                channel,
                op,
                settings.wave_form & 0x07,
            );
        }

        let value = self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0xF0;
        self.set_channel_register(
            regmap::REG_FEEDBACK,
            channel,
            value | ((instrument.feedback & 0x07) << 1) | u8::from(instrument.additive_synth),
        );
    }

    /// Program the operator(s) of the drum sound named by the instrument's
    /// type. Writes go straight to the drum operators' physical registers
    /// on bank 0; operators the drum does not use are left untouched.
    /// A melodic instrument is absorbed as a no-op.
    fn set_drum_instrument(&mut self, instrument: &Instrument, volume: f32) {
        let drum = match instrument.instrument_type.drum() {
            Some(drum) => drum,
            None => return,
        };
        let volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);

        self.set_wave_form_select(true);
        for op in 0..2usize {
            let offset = DRUM_REGISTER_OFFSETS[op][drum.index()];
            if offset == DRUM_OFFSET_UNUSED {
                continue;
            }

            let settings = instrument.operators[op];
            let level = attenuated_level(settings.output_level, volume);

            self.write(0, regmap::REG_OP_FLAGS_MULTIPLIER + offset, pack_operator_flags(&settings));
            self.write(
                0,
                regmap::REG_OP_LEVELS + offset,
                ((settings.scaling_level & 0x03) << 6) | (level & 0x3F),
            );
            self.write(
                0,
                regmap::REG_OP_ATTACK_DECAY + offset,
                ((settings.attack & 0x0F) << 4) | (settings.decay & 0x0F),
            );
            self.write(
                0,
                regmap::REG_OP_SUSTAIN_RELEASE + offset,
                ((settings.sustain & 0x0F) << 4) | (settings.release & 0x0F),
            );
            self.write(0, regmap::REG_OP_WAVEFORM + offset, settings.wave_form & 0x03);
        }

        self.write(
            0,
            regmap::REG_FEEDBACK + DRUM_CHANNELS[drum.index()],
            ((instrument.feedback & 0x07) << 1) | u8::from(instrument.additive_synth),
        );
    }

    /// Capture the channel's current settings as a melodic instrument.
    fn get_instrument(&self, channel: u8) -> Instrument {
        let mut instrument = Instrument::default();
        for op in 0..2u8 {
            instrument.operators[op as usize] = self.get_operator_settings(channel, op);
        }
        instrument.feedback = self.get_feedback(channel);
        instrument.additive_synth = self.get_synth_mode(channel);
        instrument
    }

    /// Capture the current settings of a drum sound's operator(s) as a drum
    /// instrument. Unused operators keep default settings.
    fn get_drum_instrument(&self, drum: Drum) -> Instrument {
        let channel = DRUM_CHANNELS[drum.index()];
        let mut instrument = Instrument {
            instrument_type: match drum {
                Drum::Bass => InstrumentType::Bass,
                Drum::Snare => InstrumentType::Snare,
                Drum::Tom => InstrumentType::Tom,
                Drum::Cymbal => InstrumentType::Cymbal,
                Drum::HiHat => InstrumentType::HiHat,
            },
            ..Instrument::default()
        };

        for op in 0..2u8 {
            if DRUM_REGISTER_OFFSETS[op as usize][drum.index()] != DRUM_OFFSET_UNUSED {
                instrument.operators[op as usize] = self.get_operator_settings(channel, op);
            }
        }
        instrument
    }

    /// Current settings of one operator, read back from the shadow store.
    fn get_operator_settings(&self, channel: u8, operator: u8) -> OperatorSettings {
        OperatorSettings {
            tremolo: self.get_tremolo(channel, operator),
            vibrato: self.get_vibrato(channel, operator),
            maintain_sustain: self.get_maintain_sustain(channel, operator),
            envelope_scaling: self.get_envelope_scaling(channel, operator),
            multiplier: self.get_multiplier(channel, operator),
            scaling_level: self.get_scaling_level(channel, operator),
            output_level: self.get_volume(channel, operator),
            attack: self.get_attack(channel, operator),
            decay: self.get_decay(channel, operator),
            sustain: self.get_sustain(channel, operator),
            release: self.get_release(channel, operator),
            wave_form: self.get_wave_form(channel, operator),
        }
    }

    // Chip-global accessors.

    /// Is waveform selection enabled?
    fn get_wave_form_select(&self) -> bool {
        self.get_chip_register(regmap::REG_WAVEFORM_SELECT) & 0x20 != 0
    }

    /// Enable or disable waveform selection for all operators.
    fn set_wave_form_select(&mut self, enable: bool) {
        let value = self.get_chip_register(regmap::REG_WAVEFORM_SELECT);
        let value = if enable { value | 0x20 } else { value & 0xDF };
        self.set_chip_register(regmap::REG_WAVEFORM_SELECT, value);
    }

    /// Is the deep (4.8 dB) tremolo depth enabled?
    fn get_deep_tremolo(&self) -> bool {
        self.get_chip_register(regmap::REG_RHYTHM) & 0x80 != 0
    }

    /// Select tremolo depth for all operators with tremolo on: 1.0 dB when
    /// false, 4.8 dB when true.
    fn set_deep_tremolo(&mut self, enable: bool) {
        let value = self.get_chip_register(regmap::REG_RHYTHM) & 0x7F;
        self.set_chip_register(regmap::REG_RHYTHM, value | if enable { 0x80 } else { 0x00 });
    }

    /// Is the deep (14 cent) vibrato depth enabled?
    fn get_deep_vibrato(&self) -> bool {
        self.get_chip_register(regmap::REG_RHYTHM) & 0x40 != 0
    }

    /// Select vibrato depth for all operators with vibrato on: 7 cent when
    /// false, 14 cent when true.
    fn set_deep_vibrato(&mut self, enable: bool) {
        let value = self.get_chip_register(regmap::REG_RHYTHM) & 0xBF;
        self.set_chip_register(regmap::REG_RHYTHM, value | if enable { 0x40 } else { 0x00 });
    }

    /// Is percussion mode enabled?
    fn get_percussion(&self) -> bool {
        self.get_chip_register(regmap::REG_RHYTHM) & 0x20 != 0
    }

    /// Enable or disable percussion mode. When enabled channels 6 through 8
    /// produce the five drum sounds and their key-on bits must stay off.
    fn set_percussion(&mut self, enable: bool) {
        let value = self.get_chip_register(regmap::REG_RHYTHM) & 0xDF;
        self.set_chip_register(regmap::REG_RHYTHM, value | if enable { 0x20 } else { 0x00 });
    }

    /// Currently triggered drum sounds.
    fn get_drums(&self) -> DrumFlags {
        DrumFlags::from_bits_truncate(self.get_chip_register(regmap::REG_RHYTHM))
    }

    /// Trigger drum sounds. The register is written twice, first with all
    /// trigger bits cleared, so that already-sounding drums retrigger.
    fn set_drums(&mut self, drums: DrumFlags) {
        let value = self.get_chip_register(regmap::REG_RHYTHM) & 0xE0;
        self.set_chip_register(regmap::REG_RHYTHM, value);
        self.set_chip_register(regmap::REG_RHYTHM, value | drums.bits());
    }

    /// Trigger drum sounds by name.
    fn set_drum_sounds(&mut self, bass: bool, snare: bool, tom: bool, cymbal: bool, hihat: bool) {
        let mut drums = DrumFlags::empty();
        drums.set(DrumFlags::BASS, bass);
        drums.set(DrumFlags::SNARE, snare);
        drums.set(DrumFlags::TOM, tom);
        drums.set(DrumFlags::CYMBAL, cymbal);
        drums.set(DrumFlags::HI_HAT, hihat);
        self.set_drums(drums);
    }

    // Channel accessors.

    /// Current 10-bit F-number of the channel.
    fn get_f_number(&self, channel: u8) -> u16 {
        let high = u16::from(self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0x03);
        (high << 8) | u16::from(self.get_channel_register(regmap::REG_FREQUENCY_LOW, channel))
    }

    /// Set the channel's F-number [0, 1023].
    fn set_f_number(&mut self, channel: u8, f_number: u16) {
        let value = self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0xFC;
        self.set_channel_register(
            regmap::REG_KEY_ON_BLOCK,
            channel,
            value | ((f_number & 0x0300) >> 8) as u8,
        );
        self.set_channel_register(regmap::REG_FREQUENCY_LOW, channel, (f_number & 0xFF) as u8);
    }

    /// Current frequency block of the channel.
    fn get_block(&self, channel: u8) -> u8 {
        (self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0x1C) >> 2
    }

    /// Set the channel's frequency block [0, 7]. Each block doubles the
    /// frequency step per F-number unit.
    fn set_block(&mut self, channel: u8, block: u8) {
        let value = self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0xE3;
        self.set_channel_register(regmap::REG_KEY_ON_BLOCK, channel, value | ((block & 0x07) << 2));
    }

    /// Is the channel's voice keyed on?
    fn get_key_on(&self, channel: u8) -> bool {
        self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0x20 != 0
    }

    /// Key the channel's voice on or off.
    fn set_key_on(&mut self, channel: u8, key_on: bool) {
        let value = self.get_channel_register(regmap::REG_KEY_ON_BLOCK, channel) & 0xDF;
        self.set_channel_register(
            regmap::REG_KEY_ON_BLOCK,
            channel,
            value | if key_on { 0x20 } else { 0x00 },
        );
    }

    /// Modulator feedback factor of the channel.
    fn get_feedback(&self, channel: u8) -> u8 {
        (self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0x0E) >> 1
    }

    /// Set the modulator feedback factor [0, 7].
    fn set_feedback(&mut self, channel: u8, feedback: u8) {
        let value = self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0xF1;
        self.set_channel_register(regmap::REG_FEEDBACK, channel, value | ((feedback & 0x07) << 1));
    }

    /// Synthesis algorithm of the channel: false for FM, true for additive.
    fn get_synth_mode(&self, channel: u8) -> bool {
        self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0x01 != 0
    }

    /// Select the channel's synthesis algorithm. With FM (false) only the
    /// carrier is audible; with additive synthesis both operators sound.
    fn set_synth_mode(&mut self, channel: u8, additive: bool) {
        let value = self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0xFE;
        self.set_channel_register(regmap::REG_FEEDBACK, channel, value | u8::from(additive));
    }

    // Operator accessors.

    /// Is tremolo enabled for the operator?
    fn get_tremolo(&self, channel: u8, operator: u8) -> bool {
        self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x80 != 0
    }

    /// Apply amplitude modulation to the operator. Depth is chip-global,
    /// see [`OplDevice::set_deep_tremolo`].
    fn set_tremolo(&mut self, channel: u8, operator: u8, enable: bool) {
        let value =
            self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x7F;
        self.set_operator_register(
            regmap::REG_OP_FLAGS_MULTIPLIER,
            channel,
            operator,
            value | if enable { 0x80 } else { 0x00 },
        );
    }

    /// Is vibrato enabled for the operator?
    fn get_vibrato(&self, channel: u8, operator: u8) -> bool {
        self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x40 != 0
    }

    /// Apply vibrato to the operator. Depth is chip-global, see
    /// [`OplDevice::set_deep_vibrato`].
    fn set_vibrato(&mut self, channel: u8, operator: u8, enable: bool) {
        let value =
            self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0xBF;
        self.set_operator_register(
            regmap::REG_OP_FLAGS_MULTIPLIER,
            channel,
            operator,
            value | if enable { 0x40 } else { 0x00 },
        );
    }

    /// Is the sustain level held until key-off?
    fn get_maintain_sustain(&self, channel: u8, operator: u8) -> bool {
        self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x20 != 0
    }

    /// Hold the sustain level until key-off (true) or start release
    /// immediately after the decay phase (false).
    fn set_maintain_sustain(&mut self, channel: u8, operator: u8, enable: bool) {
        let value =
            self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0xDF;
        self.set_operator_register(
            regmap::REG_OP_FLAGS_MULTIPLIER,
            channel,
            operator,
            value | if enable { 0x20 } else { 0x00 },
        );
    }

    /// Is envelope scaling (KSR) enabled for the operator?
    fn get_envelope_scaling(&self, channel: u8, operator: u8) -> bool {
        self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x10 != 0
    }

    /// Shorten the envelope as the pitch rises.
    fn set_envelope_scaling(&mut self, channel: u8, operator: u8, enable: bool) {
        let value =
            self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0xEF;
        self.set_operator_register(
            regmap::REG_OP_FLAGS_MULTIPLIER,
            channel,
            operator,
            value | if enable { 0x10 } else { 0x00 },
        );
    }

    /// Frequency multiplier of the operator.
    fn get_multiplier(&self, channel: u8, operator: u8) -> u8 {
        self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0x0F
    }

    /// Set the operator's frequency multiplier [0, 15]. 0 multiplies by 0.5.
    fn set_multiplier(&mut self, channel: u8, operator: u8, multiplier: u8) {
        let value =
            self.get_operator_register(regmap::REG_OP_FLAGS_MULTIPLIER, channel, operator) & 0xF0;
        self.set_operator_register(
            regmap::REG_OP_FLAGS_MULTIPLIER,
            channel,
            operator,
            value | (multiplier & 0x0F),
        );
    }

    /// Key scale level of the operator.
    fn get_scaling_level(&self, channel: u8, operator: u8) -> u8 {
        (self.get_operator_register(regmap::REG_OP_LEVELS, channel, operator) & 0xC0) >> 6
    }

    /// Attenuate the operator as frequency rises: 0 none, 1 = 1.5 dB/oct,
    /// 2 = 3.0 dB/oct, 3 = 6.0 dB/oct.
    fn set_scaling_level(&mut self, channel: u8, operator: u8, scaling: u8) {
        let value = self.get_operator_register(regmap::REG_OP_LEVELS, channel, operator) & 0x3F;
        self.set_operator_register(
            regmap::REG_OP_LEVELS,
            channel,
            operator,
            value | ((scaling & 0x03) << 6),
        );
    }

    /// Output attenuation of the operator. 0x00 is loudest, 0x3F softest.
    fn get_volume(&self, channel: u8, operator: u8) -> u8 {
        self.get_operator_register(regmap::REG_OP_LEVELS, channel, operator) & 0x3F
    }

    /// Set the operator's output attenuation. The scale is inverted: 0x00
    /// is loudest, 0x3F softest.
    fn set_volume(&mut self, channel: u8, operator: u8, volume: u8) {
        let value = self.get_operator_register(regmap::REG_OP_LEVELS, channel, operator) & 0xC0;
        self.set_operator_register(
            regmap::REG_OP_LEVELS,
            channel,
            operator,
            value | (volume & 0x3F),
        );
    }

    /// Attack rate of the operator.
    fn get_attack(&self, channel: u8, operator: u8) -> u8 {
        (self.get_operator_register(regmap::REG_OP_ATTACK_DECAY, channel, operator) & 0xF0) >> 4
    }

    /// Set the operator's attack rate [0, 15]. 0x00 is slowest.
    fn set_attack(&mut self, channel: u8, operator: u8, attack: u8) {
        let value =
            self.get_operator_register(regmap::REG_OP_ATTACK_DECAY, channel, operator) & 0x0F;
        self.set_operator_register(
            regmap::REG_OP_ATTACK_DECAY,
            channel,
            operator,
            value | ((attack & 0x0F) << 4),
        );
    }

    /// Decay rate of the operator.
    fn get_decay(&self, channel: u8, operator: u8) -> u8 {
        self.get_operator_register(regmap::REG_OP_ATTACK_DECAY, channel, operator) & 0x0F
    }

    /// Set the operator's decay rate [0, 15]. 0x00 is slowest.
    fn set_decay(&mut self, channel: u8, operator: u8, decay: u8) {
        let value =
            self.get_operator_register(regmap::REG_OP_ATTACK_DECAY, channel, operator) & 0xF0;
        self.set_operator_register(
            regmap::REG_OP_ATTACK_DECAY,
            channel,
            operator,
            value | (decay & 0x0F),
        );
    }

    /// Sustain level of the operator.
    fn get_sustain(&self, channel: u8, operator: u8) -> u8 {
        (self.get_operator_register(regmap::REG_OP_SUSTAIN_RELEASE, channel, operator) & 0xF0) >> 4
    }

    /// Set the operator's sustain level [0, 15]. 0x00 is loudest.
    fn set_sustain(&mut self, channel: u8, operator: u8, sustain: u8) {
        let value =
            self.get_operator_register(regmap::REG_OP_SUSTAIN_RELEASE, channel, operator) & 0x0F;
        self.set_operator_register(
            regmap::REG_OP_SUSTAIN_RELEASE,
            channel,
            operator,
            value | ((sustain & 0x0F) << 4),
        );
    }

    /// Release rate of the operator.
    fn get_release(&self, channel: u8, operator: u8) -> u8 {
        self.get_operator_register(regmap::REG_OP_SUSTAIN_RELEASE, channel, operator) & 0x0F
    }

    /// Set the operator's release rate [0, 15]. 0x00 is slowest.
    fn set_release(&mut self, channel: u8, operator: u8, release: u8) {
        let value =
            self.get_operator_register(regmap::REG_OP_SUSTAIN_RELEASE, channel, operator) & 0xF0;
        self.set_operator_register(
            regmap::REG_OP_SUSTAIN_RELEASE,
            channel,
            operator,
            value | (release & 0x0F),
        );
    }

    /// Waveform of the operator.
    fn get_wave_form(&self, channel: u8, operator: u8) -> u8 {
        self.get_operator_register(regmap::REG_OP_WAVEFORM, channel, operator) & 0x03
    }

    /// Select the operator's waveform [0, 3]. Requires waveform select to
    /// be enabled, see [`OplDevice::set_wave_form_select`]. The field is
    /// masked to the YM3812's 2-bit width on every variant; the OPL3-only
    /// waveforms are reachable through [`OplDevice::set_instrument`].
    fn set_wave_form(&mut self, channel: u8, operator: u8, wave_form: u8) {
        let value = self.get_operator_register(regmap::REG_OP_WAVEFORM, channel, operator) & 0xFC;
        self.set_operator_register(
            regmap::REG_OP_WAVEFORM,
            channel,
            operator,
            value | (wave_form & 0x03),
        );
    }
}

/// Capabilities of the OPL3 chip family: stereo panning, OPL3 mode and
/// 4-operator channels.
///
/// A 4-operator channel is two adjacent 2-operator channels combined via a
/// bit in the chip-global connection-select register; the fixed pairing
/// table decides which 2-op channels form each 4-op channel. Operator
/// registers of an enabled pair are still addressed through the normal
/// 2-operator register map.
pub trait Opl3Device: OplDevice {
    /// The variant's 4-op pairing table: `[control, paired]` 2-op channel
    /// indices per 4-op channel.
    fn channel_pairs(&self) -> &'static [[u8; 2]];

    /// Number of 4-operator channels this variant exposes.
    fn get_num_4op_channels(&self) -> u8 {
        self.channel_pairs().len() as u8
    }

    /// The 2-op channel backing the given 4-op channel: index 0 is the
    /// control channel, index 1 its paired channel.
    fn get_4op_control_channel(&self, channel_4op: u8, index: u8) -> u8 {
        let channel_4op = channel_4op % self.get_num_4op_channels();
        self.channel_pairs()[channel_4op as usize][(index % 2) as usize]
    }

    /// Is OPL3 mode (the NEW bit) enabled?
    fn is_opl3_enabled(&self) -> bool {
        self.get_chip_register(regmap::REG_OPL3_ENABLE) & 0x01 != 0
    }

    /// Enable or disable OPL3 mode. Must be enabled before any other OPL3
    /// feature is used. Enabling also opens both speakers on every channel,
    /// since with the NEW bit set a channel with cleared panning bits is
    /// silent.
    fn set_opl3_enabled(&mut self, enable: bool) {
        self.set_chip_register(regmap::REG_OPL3_ENABLE, u8::from(enable));

        for channel in 0..self.get_num_channels() {
            self.set_panning(channel, enable, enable);
        }
    }

    /// Route the channel to the left and/or right speaker.
    fn set_panning(&mut self, channel: u8, left: bool, right: bool) {
        let value = self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0xCF;
        self.set_channel_register(
            regmap::REG_FEEDBACK,
            channel,
            value | if left { 0x10 } else { 0x00 } | if right { 0x20 } else { 0x00 },
        );
    }

    /// Does the channel output to the left speaker?
    fn is_panned_left(&self, channel: u8) -> bool {
        self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0x10 != 0
    }

    /// Does the channel output to the right speaker?
    fn is_panned_right(&self, channel: u8) -> bool {
        self.get_channel_register(regmap::REG_FEEDBACK, channel) & 0x20 != 0
    }

    /// Is the given 4-op channel in 4-operator mode?
    fn is_4op_channel_enabled(&self, channel_4op: u8) -> bool {
        let channel_4op = channel_4op % self.get_num_4op_channels();
        let mask = 0x01 << (channel_4op % 6);
        self.get_chip_register(regmap::REG_4OP_ENABLE) & mask != 0
    }

    /// Enable or disable 4-operator mode for one 4-op channel.
    fn set_4op_channel_enabled(&mut self, channel_4op: u8, enable: bool) {
        let channel_4op = channel_4op % self.get_num_4op_channels();
        let mask = 0x01 << (channel_4op % 6);
        let value = self.get_chip_register(regmap::REG_4OP_ENABLE) & !mask;
        self.set_chip_register(
            regmap::REG_4OP_ENABLE,
            value | if enable { mask } else { 0x00 },
        );
    }

    /// Enable or disable 4-operator mode on all 4-op channels.
    fn set_all_4op_channels_enabled(&mut self, enable: bool) {
        for channel_4op in 0..self.get_num_4op_channels() {
            self.set_4op_channel_enabled(channel_4op, enable);
        }
    }

    /// Capture the current settings of a 4-op channel's four operators.
    fn get_instrument_4op(&self, channel_4op: u8) -> Instrument4Op {
        Instrument4Op {
            sub_instruments: [
                self.get_instrument(self.get_4op_control_channel(channel_4op, 0)),
                self.get_instrument(self.get_4op_control_channel(channel_4op, 1)),
            ],
        }
    }

    /// Program both sub channels of a 4-op channel from a 4-operator
    /// instrument definition.
    fn set_instrument_4op(&mut self, channel_4op: u8, instrument: &Instrument4Op, volume: f32) {
        let control = self.get_4op_control_channel(channel_4op, 0);
        let paired = self.get_4op_control_channel(channel_4op, 1);
        self.set_instrument(control, &instrument.sub_instruments[0], volume);
        self.set_instrument(paired, &instrument.sub_instruments[1], volume);
    }
}

/// Output level attenuated by a volume in [0, 1]. The level scale is
/// inverse-logarithmic (0 is loudest), hence the inversion around 63.
fn attenuated_level(output_level: u8, volume: f32) -> u8 {
    63 - ((63.0 - f32::from(output_level & 0x3F)) * volume).round() as u8
}

/// Pack the boolean operator flags and multiplier into the 0x20-class
/// register layout.
fn pack_operator_flags(settings: &OperatorSettings) -> u8 {
    (u8::from(settings.tremolo) << 7)
        | (u8::from(settings.vibrato) << 6)
        | (u8::from(settings.maintain_sustain) << 5)
        | (u8::from(settings.envelope_scaling) << 4)
        | (settings.multiplier & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_block_selection() {
        assert_eq!(get_frequency_block(20.0), 0);
        assert_eq!(get_frequency_block(100.0), 2);
        assert_eq!(get_frequency_block(440.0), 4);
        assert_eq!(get_frequency_block(3000.0), 6);
        assert_eq!(get_frequency_block(10_000.0), 7);
    }

    #[test]
    fn test_note_f_number_wraps() {
        assert_eq!(get_note_f_number(0), 0x156);
        assert_eq!(get_note_f_number(9), 0x241);
        assert_eq!(get_note_f_number(12), 0x156);
    }

    #[test]
    fn test_attenuated_level() {
        // Full volume leaves the level unchanged.
        assert_eq!(attenuated_level(0x00, 1.0), 0x00);
        assert_eq!(attenuated_level(0x20, 1.0), 0x20);
        // Zero volume attenuates fully.
        assert_eq!(attenuated_level(0x00, 0.0), 63);
        // Half volume halves the distance from silence.
        assert_eq!(attenuated_level(0x00, 0.5), 31);
    }

    #[test]
    fn test_pack_operator_flags() {
        let settings = OperatorSettings {
            tremolo: true,
            envelope_scaling: true,
            multiplier: 0x1F,
            ..Default::default()
        };
        assert_eq!(pack_operator_flags(&settings), 0x9F);
    }
}
