//! Shadow register store.
//!
//! The OPL chips are write-only from the host's point of view, so the driver
//! keeps a host-side mirror of every meaningful register. The store is three
//! flat byte arenas (chip-global, channel and operator slots) indexed by the
//! pure offset functions in [`crate::regmap`]; reading never touches the bus.

/// Host-side mirror of the chip's register file.
///
/// Invariant: after any successful register write through a chip variant
/// driver, each slot holds exactly the value last handed to the bus writer
/// for that register.
#[derive(Debug, Clone)]
pub struct ShadowRegisters {
    chip: Vec<u8>,
    channel: Vec<u8>,
    operator: Vec<u8>,
}

impl ShadowRegisters {
    /// Allocate a zeroed store for a variant with the given number of
    /// chip-global slots and 2-op channels.
    ///
    /// Channels take 3 slots each, operators 10 per channel.
    pub fn new(chip_slots: usize, num_channels: usize) -> Self {
        ShadowRegisters {
            chip: vec![0; chip_slots],
            channel: vec![0; num_channels * 3],
            operator: vec![0; num_channels * 10],
        }
    }

    /// Read a chip-global slot.
    pub fn chip(&self, offset: usize) -> u8 {
        self.chip[offset]
    }

    /// Write a chip-global slot.
    pub fn set_chip(&mut self, offset: usize, value: u8) {
        self.chip[offset] = value;
    }

    /// Read a channel slot.
    pub fn channel(&self, offset: usize) -> u8 {
        self.channel[offset]
    }

    /// Write a channel slot.
    pub fn set_channel(&mut self, offset: usize, value: u8) {
        self.channel[offset] = value;
    }

    /// Read an operator slot.
    pub fn operator(&self, offset: usize) -> u8 {
        self.operator[offset]
    }

    /// Write an operator slot.
    pub fn set_operator(&mut self, offset: usize, value: u8) {
        self.operator[offset] = value;
    }

    /// True when every slot in the store reads back as zero.
    pub fn is_zeroed(&self) -> bool {
        self.chip.iter().all(|&v| v == 0)
            && self.channel.iter().all(|&v| v == 0)
            && self.operator.iter().all(|&v| v == 0)
    }
}
