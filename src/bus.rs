//! Bus writer.
//!
//! Serializes (register, value) pairs onto the board's bit-banged SPI-like
//! bus. A register write is a two-phase transfer: the register address is
//! shifted out with the A0 line low and latched, then the data byte is
//! shifted out with A0 high and latched. Each latch pulse is surrounded by
//! settle delays whose length depends on the chip revision; the trailing
//! delay gives the chip time to commit the register internally.
//!
//! The chip cannot signal a timing violation back to the host, so none of
//! the operations here return errors.

/// One of the board's control lines.
///
/// `Bank` is the A1 address line of a dual-bank chip; `Unit` is the
/// chip-select line between the two chips of a Duo board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLine {
    /// A0, selects between address (low) and data (high) phase.
    Address,
    /// Latch (/WR), pulsed low to commit a byte.
    Latch,
    /// /IC, pulled low to hard-reset the chip.
    Reset,
    /// A1, bank select of a dual-bank chip.
    Bank,
    /// Chip select between the two units of a Duo board.
    Unit,
}

/// Platform bus collaborator: byte-serial transport, GPIO control lines and
/// blocking delays.
///
/// Implementations wrap whatever the platform provides (SPI peripheral plus
/// GPIO on a Raspberry Pi, shift register bit-banging on a bare
/// microcontroller). All operations are synchronous and blocking; the
/// driver owns the bus exclusively for the duration of each register write.
pub trait OplBus {
    /// Configure a control line as an output. Called once from `begin()`.
    fn init_control(&mut self, line: ControlLine);

    /// Drive a control line high or low.
    fn set_control(&mut self, line: ControlLine, high: bool);

    /// Shift one byte out over the serial data/clock lines.
    fn transfer(&mut self, value: u8);

    /// Block for the given number of microseconds.
    fn delay_us(&mut self, micros: u32);

    /// Block for the given number of milliseconds.
    fn delay_ms(&mut self, millis: u32);
}

/// Settle delays around the two latch pulses of a register write, in
/// microseconds. Values differ per chip revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTiming {
    /// After pulling the latch low in the address phase.
    pub address_hold_us: u32,
    /// After releasing the latch in the address phase.
    pub address_settle_us: u32,
    /// After pulling the latch low in the data phase.
    pub data_hold_us: u32,
    /// After releasing the latch in the data phase; covers the chip's
    /// internal register-commit time.
    pub data_settle_us: u32,
}

impl WriteTiming {
    /// YM3812 timing.
    pub const OPL2: WriteTiming = WriteTiming {
        address_hold_us: 16,
        address_settle_us: 16,
        data_hold_us: 4,
        data_settle_us: 92,
    };

    /// YMF262 timing.
    pub const OPL3: WriteTiming = WriteTiming {
        address_hold_us: 8,
        address_settle_us: 8,
        data_hold_us: 8,
        data_settle_us: 8,
    };
}

/// Clock a (register, value) pair out onto the bus.
///
/// The caller is responsible for having selected the destination bank and
/// unit beforehand; this routine only runs the two-phase address/data
/// transfer with the given timing.
pub fn write_register<B: OplBus>(bus: &mut B, timing: WriteTiming, reg: u8, value: u8) {
    // Address phase.
    bus.set_control(ControlLine::Address, false);
    bus.transfer(reg);
    bus.set_control(ControlLine::Latch, false);
    bus.delay_us(timing.address_hold_us);
    bus.set_control(ControlLine::Latch, true);
    bus.delay_us(timing.address_settle_us);

    // Data phase.
    bus.set_control(ControlLine::Address, true);
    bus.transfer(value);
    bus.set_control(ControlLine::Latch, false);
    bus.delay_us(timing.data_hold_us);
    bus.set_control(ControlLine::Latch, true);
    bus.delay_us(timing.data_settle_us);
}

pub use recording::{RecordedWrite, RecordingBus};

mod recording {
    use super::{ControlLine, OplBus};
    use std::collections::HashMap;

    /// One register write reconstructed from the bus event stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordedWrite {
        /// Level of the bank select line (A1) during the transfer.
        pub bank: u8,
        /// Level of the unit select line during the transfer.
        pub unit: u8,
        /// Register address byte of the address phase.
        pub reg: u8,
        /// Data byte of the data phase.
        pub value: u8,
    }

    /// Bus double that records all line and transfer activity.
    ///
    /// Useful for driver tests and for dry-running register sequences
    /// without hardware attached. Transfers made while the A0 line is low
    /// are taken as register addresses, the following transfer with A0 high
    /// as the data byte.
    #[derive(Debug, Default)]
    pub struct RecordingBus {
        levels: HashMap<ControlLine, bool>,
        pending_reg: Option<u8>,
        writes: Vec<RecordedWrite>,
        reset_pulses: u32,
        delay_us_total: u64,
    }

    impl RecordingBus {
        /// Create an idle recording bus.
        pub fn new() -> Self {
            Self::default()
        }

        /// All register writes observed so far.
        pub fn writes(&self) -> &[RecordedWrite] {
            &self.writes
        }

        /// Number of reset pulses (high→low transitions on the reset line)
        /// observed.
        pub fn reset_pulses(&self) -> u32 {
            self.reset_pulses
        }

        /// Total blocking delay requested, in microseconds.
        pub fn total_delay_us(&self) -> u64 {
            self.delay_us_total
        }

        /// Forget all recorded activity.
        pub fn clear(&mut self) {
            self.writes.clear();
            self.pending_reg = None;
            self.reset_pulses = 0;
            self.delay_us_total = 0;
        }

        fn level(&self, line: ControlLine) -> bool {
            self.levels.get(&line).copied().unwrap_or(false)
        }
    }

    impl OplBus for RecordingBus {
        fn init_control(&mut self, _line: ControlLine) {}

        fn set_control(&mut self, line: ControlLine, high: bool) {
            if line == ControlLine::Reset && self.level(ControlLine::Reset) && !high {
                self.reset_pulses += 1;
            }
            self.levels.insert(line, high);
        }

        fn transfer(&mut self, value: u8) {
            if self.level(ControlLine::Address) {
                if let Some(reg) = self.pending_reg.take() {
                    self.writes.push(RecordedWrite {
                        bank: self.level(ControlLine::Bank) as u8,
                        unit: self.level(ControlLine::Unit) as u8,
                        reg,
                        value,
                    });
                }
            } else {
                self.pending_reg = Some(value);
            }
        }

        fn delay_us(&mut self, micros: u32) {
            self.delay_us_total += u64::from(micros);
        }

        fn delay_ms(&mut self, millis: u32) {
            self.delay_us_total += u64::from(millis) * 1000;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_register_two_phases() {
        let mut bus = RecordingBus::new();
        write_register(&mut bus, WriteTiming::OPL2, 0xA0, 0x42);

        assert_eq!(
            bus.writes(),
            &[RecordedWrite {
                bank: 0,
                unit: 0,
                reg: 0xA0,
                value: 0x42
            }]
        );
        // 16 + 16 + 4 + 92 microseconds of settle time.
        assert_eq!(bus.total_delay_us(), 128);
    }

    #[test]
    fn test_write_register_observes_bank_line() {
        let mut bus = RecordingBus::new();
        bus.set_control(ControlLine::Bank, true);
        write_register(&mut bus, WriteTiming::OPL3, 0xB0, 0x20);

        assert_eq!(bus.writes()[0].bank, 1);
        assert_eq!(bus.total_delay_us(), 32);
    }

    #[test]
    fn test_reset_pulse_counted_on_falling_edge() {
        let mut bus = RecordingBus::new();
        bus.set_control(ControlLine::Reset, true);
        bus.set_control(ControlLine::Reset, false);
        bus.set_control(ControlLine::Reset, true);
        assert_eq!(bus.reset_pulses(), 1);
    }
}
