//! Raw wire-level messages and the packed frame exchanged with transports.
//!
//! A frame carries a 32-bit word: the low byte is the status (high nibble =
//! command, low nibble = channel), then data1, then data2. The high byte is
//! unused. The timestamp travels alongside but routing ignores it.

use crate::error::{Error, Result};

/// Command nibbles (status byte with the channel bits cleared).
pub mod command {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_PRESSURE: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_PRESSURE: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
    pub const SYSTEM: u8 = 0xF0;
}

/// Unclassified MIDI message split into its status nibbles and data bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawMessage {
    pub channel: u8,
    pub command: u8,
    pub data1: u8,
    pub data2: u8,
}

impl RawMessage {
    /// Build a message, masking every field into its valid range.
    #[inline]
    pub fn new(command: u8, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            channel: channel & 0x0F,
            command: command & 0xF0,
            data1: data1 & 0x7F,
            data2: data2 & 0x7F,
        }
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.command | self.channel
    }

    /// Pack into the transport word. Bytes are kept as-is so that a word read
    /// from a transport packs back to the identical value.
    #[inline]
    pub fn pack(&self) -> u32 {
        u32::from(self.status()) | u32::from(self.data1) << 8 | u32::from(self.data2) << 16
    }

    #[inline]
    pub fn unpack(word: u32) -> Self {
        let status = (word & 0xFF) as u8;
        Self {
            channel: status & 0x0F,
            command: status & 0xF0,
            data1: ((word >> 8) & 0xFF) as u8,
            data2: ((word >> 16) & 0xFF) as u8,
        }
    }

    /// Number of bytes a message with this status occupies on the wire.
    ///
    /// System exclusive is not framed here; only its status byte is counted.
    pub fn message_len(status: u8) -> usize {
        match status & 0xF0 {
            command::PROGRAM_CHANGE | command::CHANNEL_PRESSURE => 2,
            command::SYSTEM => match status {
                0xF1 | 0xF3 => 2,
                0xF2 => 3,
                _ => 1,
            },
            _ => 3,
        }
    }

    /// Parse a single message from MIDI bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let status = *bytes.first().ok_or(Error::Empty)?;
        if status < 0x80 {
            return Err(Error::NotStatus(status));
        }
        let expected = Self::message_len(status);
        if bytes.len() < expected {
            return Err(Error::Truncated {
                status,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            channel: status & 0x0F,
            command: status & 0xF0,
            data1: if expected > 1 { bytes[1] } else { 0 },
            data2: if expected > 2 { bytes[2] } else { 0 },
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let status = self.status();
        let bytes = [status, self.data1, self.data2];
        bytes[..Self::message_len(status)].to_vec()
    }
}

/// One transport frame: packed message word plus timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub message: u32,
    pub timestamp: u32,
}

impl RawFrame {
    #[inline]
    pub fn new(message: RawMessage, timestamp: u32) -> Self {
        Self {
            message: message.pack(),
            timestamp,
        }
    }

    #[inline]
    pub fn raw_message(&self) -> RawMessage {
        RawMessage::unpack(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let msg = RawMessage::new(command::NOTE_ON, 3, 60, 100);
        assert_eq!(msg.status(), 0x93);
        assert_eq!(msg.pack(), 0x0064_3C93);
    }

    #[test]
    fn test_unpack_ignores_high_byte() {
        let msg = RawMessage::unpack(0xFF40_07B1);
        assert_eq!(msg.command, command::CONTROL_CHANGE);
        assert_eq!(msg.channel, 1);
        assert_eq!(msg.data1, 7);
        assert_eq!(msg.data2, 0x40);
        assert_eq!(msg.pack(), 0x0040_07B1);
    }

    #[test]
    fn test_new_masks_fields() {
        let msg = RawMessage::new(0x9F, 200, 0xFF, 0x80);
        assert_eq!(msg.command, 0x90);
        assert_eq!(msg.channel, 200 & 0x0F);
        assert_eq!(msg.data1, 0x7F);
        assert_eq!(msg.data2, 0);
    }

    #[test]
    fn test_from_bytes() {
        let msg = RawMessage::from_bytes(&[0x85, 64, 0]).unwrap();
        assert_eq!(msg, RawMessage::new(command::NOTE_OFF, 5, 64, 0));

        let msg = RawMessage::from_bytes(&[0xC2, 42]).unwrap();
        assert_eq!(msg, RawMessage::new(command::PROGRAM_CHANGE, 2, 42, 0));

        let msg = RawMessage::from_bytes(&[0xF8]).unwrap();
        assert_eq!(msg.status(), 0xF8);
    }

    #[test]
    fn test_from_bytes_errors() {
        assert_eq!(RawMessage::from_bytes(&[]), Err(Error::Empty));
        assert_eq!(RawMessage::from_bytes(&[0x3C, 0x40]), Err(Error::NotStatus(0x3C)));
        assert_eq!(
            RawMessage::from_bytes(&[0x90, 60]),
            Err(Error::Truncated {
                status: 0x90,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_to_bytes_lengths() {
        assert_eq!(
            RawMessage::new(command::NOTE_ON, 0, 60, 100).to_bytes(),
            vec![0x90, 60, 100]
        );
        assert_eq!(
            RawMessage::new(command::CHANNEL_PRESSURE, 9, 99, 0).to_bytes(),
            vec![0xD9, 99]
        );
        assert_eq!(RawMessage::unpack(0xFA).to_bytes(), vec![0xFA]);
    }

    #[test]
    fn test_frame_carries_timestamp() {
        let msg = RawMessage::new(command::PITCH_BEND, 0, 0, 64);
        let frame = RawFrame::new(msg, 1234);
        assert_eq!(frame.timestamp, 1234);
        assert_eq!(frame.raw_message(), msg);
    }
}
