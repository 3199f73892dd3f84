//! Classified MIDI events moved through the bus.

use crate::controller::controller_name;
use crate::message::{command, RawMessage};

/// One classified control-surface message.
///
/// The variant set is closed: anything that is not a note or a controller
/// travels as [`Event::Raw`] and is re-encoded byte for byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    NoteOn {
        channel: u8,
        key: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        key: u8,
        velocity: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
        name: &'static str,
    },
    Raw(RawMessage),
}

impl Event {
    #[inline]
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::NoteOn {
            channel: channel & 0x0F,
            key: key & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    #[inline]
    pub fn note_off(channel: u8, key: u8, velocity: u8) -> Self {
        Self::NoteOff {
            channel: channel & 0x0F,
            key: key & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    #[inline]
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        let controller = controller & 0x7F;
        Self::ControlChange {
            channel: channel & 0x0F,
            controller,
            value: value & 0x7F,
            name: controller_name(controller),
        }
    }

    #[inline]
    pub fn raw(message: RawMessage) -> Self {
        Self::Raw(message)
    }

    /// Classify a raw message read from a transport.
    ///
    /// A note-on with velocity 0 becomes a note-off with velocity 0; this is
    /// the only case where [`Event::to_raw_message`] does not reproduce the
    /// input. A real note-off keeps its release velocity instead of being
    /// zeroed, so it survives classify-then-encode unchanged.
    pub fn classify(raw: RawMessage) -> Self {
        match raw.command {
            command::NOTE_ON if raw.data2 > 0 => Self::NoteOn {
                channel: raw.channel,
                key: raw.data1,
                velocity: raw.data2,
            },
            command::NOTE_ON => Self::NoteOff {
                channel: raw.channel,
                key: raw.data1,
                velocity: 0,
            },
            command::NOTE_OFF => Self::NoteOff {
                channel: raw.channel,
                key: raw.data1,
                velocity: raw.data2,
            },
            command::CONTROL_CHANGE => Self::ControlChange {
                channel: raw.channel,
                controller: raw.data1,
                value: raw.data2,
                name: controller_name(raw.data1),
            },
            _ => Self::Raw(raw),
        }
    }

    pub fn to_raw_message(&self) -> RawMessage {
        match *self {
            Self::NoteOn {
                channel,
                key,
                velocity,
            } => RawMessage {
                channel,
                command: command::NOTE_ON,
                data1: key,
                data2: velocity,
            },
            Self::NoteOff {
                channel,
                key,
                velocity,
            } => RawMessage {
                channel,
                command: command::NOTE_OFF,
                data1: key,
                data2: velocity,
            },
            Self::ControlChange {
                channel,
                controller,
                value,
                ..
            } => RawMessage {
                channel,
                command: command::CONTROL_CHANGE,
                data1: controller,
                data2: value,
            },
            Self::Raw(raw) => raw,
        }
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. } => channel,
            Self::Raw(raw) => raw.channel,
        }
    }

    #[inline]
    pub fn key(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { key, .. } | Self::NoteOff { key, .. } => Some(key),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { velocity, .. } | Self::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self, Self::NoteOn { velocity, .. } if *velocity > 0)
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self,
            Self::NoteOff { .. } | Self::NoteOn { velocity: 0, .. }
        )
    }
}

impl From<RawMessage> for Event {
    fn from(raw: RawMessage) -> Self {
        Self::classify(raw)
    }
}

impl From<Event> for RawMessage {
    fn from(event: Event) -> Self {
        event.to_raw_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNKNOWN_CONTROLLER;

    #[test]
    fn test_classify_note_on() {
        let event = Event::classify(RawMessage::new(command::NOTE_ON, 0, 60, 100));
        assert_eq!(event, Event::note_on(0, 60, 100));
        assert!(event.is_note_on());
        assert_eq!(event.key(), Some(60));
        assert_eq!(event.velocity(), Some(100));
    }

    #[test]
    fn test_note_on_zero_velocity_is_note_off() {
        let raw = RawMessage::new(command::NOTE_ON, 4, 62, 0);
        let event = Event::classify(raw);
        assert_eq!(event, Event::note_off(4, 62, 0));
        assert!(event.is_note_off());
        assert_ne!(event.to_raw_message(), raw);
        assert_eq!(event.to_raw_message().command, command::NOTE_OFF);
    }

    #[test]
    fn test_note_off_keeps_release_velocity() {
        let raw = RawMessage::new(command::NOTE_OFF, 1, 60, 45);
        let event = Event::classify(raw);
        assert_eq!(event.velocity(), Some(45));
        assert_eq!(event.to_raw_message(), raw);
    }

    #[test]
    fn test_classify_control_change_names() {
        let event = Event::classify(RawMessage::new(command::CONTROL_CHANGE, 2, 7, 90));
        match event {
            Event::ControlChange {
                channel,
                controller,
                value,
                name,
            } => {
                assert_eq!(channel, 2);
                assert_eq!(controller, 7);
                assert_eq!(value, 90);
                assert_eq!(name, "Channel Volume");
            }
            other => panic!("Expected ControlChange, got {:?}", other),
        }

        let event = Event::classify(RawMessage::new(command::CONTROL_CHANGE, 0, 3, 1));
        assert!(matches!(
            event,
            Event::ControlChange { name, .. } if name == UNKNOWN_CONTROLLER
        ));
    }

    #[test]
    fn test_classify_passthrough() {
        let bend = RawMessage::new(command::PITCH_BEND, 1, 0, 64);
        assert_eq!(Event::classify(bend), Event::Raw(bend));

        let clock = RawMessage::unpack(0xF8);
        assert_eq!(Event::classify(clock), Event::Raw(clock));
        assert_eq!(Event::classify(clock).channel(), 8);
    }

    #[test]
    fn test_round_trip_law() {
        // Every status byte with a spread of data values; note-on with zero
        // velocity is the single documented exception.
        for status in 0x80u32..=0xFF {
            for (data1, data2) in [(0u32, 0u32), (60, 100), (127, 127), (1, 0), (64, 1)] {
                let word = status | data1 << 8 | data2 << 16;
                let raw = RawMessage::unpack(word);
                let back = Event::classify(raw).to_raw_message().pack();
                if raw.command == command::NOTE_ON && data2 == 0 {
                    assert_eq!(back, (status & 0x0F | 0x80) | data1 << 8);
                } else {
                    assert_eq!(back, word, "status {:#04x}", status);
                }
            }
        }
    }

    #[test]
    fn test_constructors_mask_into_range() {
        assert_eq!(
            Event::note_on(17, 200, 255),
            Event::NoteOn {
                channel: 1,
                key: 200 & 0x7F,
                velocity: 0x7F
            }
        );
        assert_eq!(Event::control_change(0, 0x87, 0).channel(), 0);
    }

    #[test]
    fn test_conversions() {
        let raw: RawMessage = Event::note_off(3, 64, 20).into();
        assert_eq!(raw.status(), 0x83);
        let event: Event = raw.into();
        assert_eq!(event, Event::note_off(3, 64, 20));
    }
}
