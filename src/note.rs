use crate::pattern::Interval;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
pub const MAX_PITCH: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub channel: u8,
    pub pitch: u8,
    pub kind: NoteKind,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn start(channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            channel,
            pitch,
            kind: NoteKind::Start,
            velocity,
        }
    }

    pub fn end(channel: u8, pitch: u8) -> Self {
        Self {
            channel,
            pitch,
            kind: NoteKind::End,
            velocity: 0,
        }
    }

    /// Decodes a raw device message. Anything that is not a note on/off is `None`.
    pub fn decode(message: &[u8]) -> Option<Self> {
        if message.len() < 3 {
            return None;
        }
        let status = message[0] & 0xF0;
        let channel = message[0] & 0x0F;
        let pitch = message[1] & 0x7F;
        let velocity = message[2] & 0x7F;

        match status {
            // note on with zero velocity is a release
            NOTE_ON if velocity == 0 => Some(Self::end(channel, pitch)),
            NOTE_ON => Some(Self::start(channel, pitch, velocity)),
            NOTE_OFF => Some(Self {
                velocity,
                ..Self::end(channel, pitch)
            }),
            _ => None,
        }
    }
}

pub fn note_on(channel: u8, pitch: u8, velocity: u8) -> [u8; 3] {
    [
        NOTE_ON | (channel & 0x0F),
        pitch & 0x7F,
        velocity & 0x7F,
    ]
}

pub fn note_off(channel: u8, pitch: u8) -> [u8; 3] {
    [NOTE_OFF | (channel & 0x0F), pitch & 0x7F, 0]
}

/// Shifts `pitch` by `interval` semitones, pinned to the MIDI range.
pub fn transpose(pitch: u8, interval: Interval) -> u8 {
    (pitch as i16 + interval.semitones() as i16).clamp(0, MAX_PITCH as i16) as u8
}

pub fn note_name(pitch: u8) -> String {
    let names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", names[(pitch % 12) as usize], octave)
}
