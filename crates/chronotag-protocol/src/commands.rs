//! Command frames understood by the reader.
//!
//! Commands are short fixed-length byte sequences with an `0xA0` header.
//! The inventory and power frames below were captured from a working
//! Chaofan integration and are used verbatim. The antenna-config and
//! antenna-count-query layouts are reader-hardware-specific: their opcodes,
//! slot padding, and trailing checksum bytes are asserted rather than
//! derived from a documented checksum scheme, so they live as data on
//! [`CommandSet`] where a deployment can override them per firmware
//! revision.

/// Halt any ongoing inventory scan.
pub const STOP_INVENTORY: [u8; 4] = [0xA0, 0x03, 0x00, 0xA3];

/// Start continuous fast inventory across all enabled antennas.
pub const FAST_INVENTORY: [u8; 7] = [0xA0, 0x06, 0x01, 0xFF, 0x10, 0x20, 0xD6];

/// Inventory with altered sensitivity and antenna pattern, used when
/// retrying for tags the fast scan missed.
pub const ALT_INVENTORY: [u8; 7] = [0xA0, 0x06, 0x01, 0xF0, 0x10, 0x10, 0xC7];

/// Command templates for one reader firmware flavor.
///
/// The fixed frames are exposed as associated functions; the configurable
/// fields cover the parts of the dialect that vary between firmware
/// revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    /// Opcode byte of the antenna-config frame.
    pub antenna_config_opcode: u8,

    /// Antenna-config frames carry a fixed number of port slots; unused
    /// slots are zero-padded.
    pub antenna_slot_count: usize,

    /// Trailing byte of the antenna-config frame. Placeholder: accepted by
    /// the firmware this was captured from, not derived from a checksum
    /// scheme.
    pub antenna_config_checksum: u8,

    /// Complete antenna-count-query frame.
    pub antenna_query: Vec<u8>,

    /// Minimum length of a well-formed antenna-count response.
    pub antenna_response_min_len: usize,

    /// Offset of the antenna-count byte within the response.
    pub antenna_count_offset: usize,

    /// Transmit power level byte used by the missed-tag retry sequence.
    pub power_level: u8,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            antenna_config_opcode: 0x28,
            antenna_slot_count: 8,
            antenna_config_checksum: 0x00,
            antenna_query: vec![0xA0, 0x03, 0x25, 0xC8],
            antenna_response_min_len: 5,
            antenna_count_offset: 3,
            power_level: 0x30,
        }
    }
}

impl CommandSet {
    /// Stop-inventory frame.
    #[must_use]
    pub fn stop_inventory(&self) -> &'static [u8] {
        &STOP_INVENTORY
    }

    /// Fast-inventory frame.
    #[must_use]
    pub fn fast_inventory(&self) -> &'static [u8] {
        &FAST_INVENTORY
    }

    /// Alternate-sensitivity inventory frame.
    #[must_use]
    pub fn alt_inventory(&self) -> &'static [u8] {
        &ALT_INVENTORY
    }

    /// Raise transmit power to the configured retry level.
    #[must_use]
    pub fn power_set(&self) -> [u8; 7] {
        [0xA0, 0x07, 0x3B, self.power_level, 0x00, 0x00, 0x12]
    }

    /// Antenna-count-query frame.
    #[must_use]
    pub fn antenna_count_query(&self) -> &[u8] {
        &self.antenna_query
    }

    /// Build an antenna-config frame enabling ports `1..=num_antennas`.
    ///
    /// Ports beyond the slot count are ignored; unused slots are padded
    /// with zeros so the frame length is fixed for a given template.
    #[must_use]
    pub fn antenna_config(&self, num_antennas: u8) -> Vec<u8> {
        let slots = self.antenna_slot_count;
        // opcode + slots + checksum, counted after the length byte
        let len = (slots + 2) as u8;

        let mut frame = Vec::with_capacity(slots + 4);
        frame.push(0xA0);
        frame.push(len);
        frame.push(self.antenna_config_opcode);
        for slot in 0..slots {
            let port = slot as u8 + 1;
            frame.push(if port <= num_antennas { port } else { 0x00 });
        }
        frame.push(self.antenna_config_checksum);
        frame
    }

    /// Extract the antenna count from a query response.
    ///
    /// Returns `None` for responses shorter than the template's minimum
    /// length or a count byte of zero — callers treat that as a soft
    /// failure and fall back to the default antenna count.
    #[must_use]
    pub fn parse_antenna_count(&self, response: &[u8]) -> Option<u8> {
        if response.len() < self.antenna_response_min_len {
            return None;
        }
        match response[self.antenna_count_offset] {
            0 => None,
            count => Some(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronotag_core::constants::DEFAULT_NUM_ANTENNAS;
    use rstest::rstest;

    #[test]
    fn fixed_frames_match_captured_bytes() {
        let commands = CommandSet::default();
        assert_eq!(commands.stop_inventory(), [0xA0, 0x03, 0x00, 0xA3]);
        assert_eq!(
            commands.fast_inventory(),
            [0xA0, 0x06, 0x01, 0xFF, 0x10, 0x20, 0xD6]
        );
        assert_eq!(
            commands.alt_inventory(),
            [0xA0, 0x06, 0x01, 0xF0, 0x10, 0x10, 0xC7]
        );
        assert_eq!(
            commands.power_set(),
            [0xA0, 0x07, 0x3B, 0x30, 0x00, 0x00, 0x12]
        );
    }

    #[test]
    fn antenna_config_lists_ports_and_pads_remaining_slots() {
        let commands = CommandSet::default();
        let frame = commands.antenna_config(4);

        assert_eq!(frame[0], 0xA0);
        assert_eq!(frame[2], commands.antenna_config_opcode);
        assert_eq!(&frame[3..11], &[1, 2, 3, 4, 0, 0, 0, 0]);
        assert_eq!(frame.len(), 12);
    }

    #[test]
    fn antenna_config_caps_ports_at_slot_count() {
        let commands = CommandSet::default();
        let frame = commands.antenna_config(16);
        assert_eq!(&frame[3..11], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[rstest]
    #[case(&[0xA0, 0x04, 0x25, 0x08, 0xCD], Some(8))]
    #[case(&[0xA0, 0x04, 0x25, 0x00, 0xCD], None)] // zero count
    #[case(&[0xA0, 0x04, 0x25], None)] // short response
    #[case(&[], None)]
    fn antenna_count_extraction(#[case] response: &[u8], #[case] expected: Option<u8>) {
        let commands = CommandSet::default();
        assert_eq!(commands.parse_antenna_count(response), expected);
    }

    #[test]
    fn default_num_antennas_is_four() {
        // The soft-failure fallback the reader crate relies on.
        assert_eq!(DEFAULT_NUM_ANTENNAS, 4);
    }
}
