//! Hardware drivers for the Yamaha OPL2 (YM3812) and OPL3 (YMF262) FM
//! synthesis chips.
//!
//! The chips sit behind a write-only serial bus: an address byte and a
//! data byte are shifted out with a latch pulse each, while dedicated
//! control lines select address/data phase, register bank and (on dual
//! chip boards) the target chip. Because the registers cannot be read
//! back, every driver keeps a shadow copy of the full register file so
//! that read-modify-write accessors work.
//!
//! # Features
//! - [`Opl2`]: YM3812, 9 channels, single register bank
//! - [`Opl3`]: YMF262, 18 channels in two banks, 4-operator channels,
//!   stereo panning
//! - [`Opl3Duo`]: two YMF262 chips, 36 channels in four banks
//! - Instrument loading from the 11-byte Adlib bank layout, with volume
//!   scaling and drum-mode support
//! - Note and drum playback helpers with F-number/block calculation
//! - [`RecordingBus`]: an in-memory bus for tests and host-side use
//!
//! The bus itself is behind the [`OplBus`] trait; implement it over your
//! platform's GPIO and delay primitives to drive real hardware.
//!
//! # Quick start
//! ## Play a note
//! ```
//! use ymopl::{Opl2, OplDevice, RecordingBus};
//!
//! let mut opl = Opl2::new(RecordingBus::new());
//! opl.begin();
//! opl.set_block(0, 4);
//! opl.play_note(0, 4, 0); // C-4
//! ```
//!
//! ## Load an instrument
//! ```
//! use ymopl::{Instrument, Opl2, OplDevice, RecordingBus};
//!
//! let piano = [0x00, 0x01, 0x4F, 0xF1, 0x53, 0x06, 0x11, 0x00, 0xD2, 0x74, 0x00];
//! let instrument = Instrument::from_bytes(&piano).unwrap();
//!
//! let mut opl = Opl2::new(RecordingBus::new());
//! opl.begin();
//! opl.set_instrument(0, &instrument, 1.0);
//! opl.play_note(0, 4, 0);
//! ```

#![warn(missing_docs)]

pub mod bus; // Serial bus protocol & control lines
pub mod chip; // Chip drivers & the device traits
pub mod instrument; // Instrument data & drum definitions
pub mod regmap; // Register addresses & shadow offset maps
pub mod shadow; // Shadow register store
pub mod tables; // Chip constant tables

/// Error types for OPL driver operations
#[derive(thiserror::Error, Debug)]
pub enum OplError {
    /// Instrument byte buffer has the wrong length
    #[error("Invalid instrument data: expected {expected} bytes, got {actual}")]
    InstrumentData {
        /// Length the instrument layout requires
        expected: usize,
        /// Length of the buffer that was passed
        actual: usize,
    },

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for OplError {
    fn from(msg: String) -> Self {
        OplError::Other(msg)
    }
}

impl From<&str> for OplError {
    fn from(msg: &str) -> Self {
        OplError::Other(msg.to_string())
    }
}

/// Result type for OPL driver operations
pub type Result<T> = std::result::Result<T, OplError>;

// Public API exports
pub use bus::{ControlLine, OplBus, RecordedWrite, RecordingBus, WriteTiming};
pub use chip::{
    get_frequency_block, get_note_f_number, Opl2, Opl3, Opl3Device, Opl3Duo, OplDevice,
    VOLUME_MAX, VOLUME_MIN,
};
pub use instrument::{
    Drum, DrumFlags, Instrument, Instrument4Op, InstrumentType, OperatorSettings, CARRIER,
    MODULATOR,
};
pub use shadow::ShadowRegisters;
