//! MIDI event types: the closed set of channel, meta, and sysex events.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

/// The seven channel-voice event kinds, identified on the wire by the
/// high nibble of the status byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Note released
    NoteOff,
    /// Note struck
    NoteOn,
    /// Polyphonic key pressure
    Aftertouch,
    /// Continuous controller change
    Controller,
    /// Patch select
    ProgramChange,
    /// Channel-wide key pressure
    ChannelPressure,
    /// 14-bit pitch wheel position
    PitchBend,
}

impl ChannelKind {
    /// Every kind, in status-nibble order. Used for name lookups.
    pub const ALL: [ChannelKind; 7] = [
        ChannelKind::NoteOff,
        ChannelKind::NoteOn,
        ChannelKind::Aftertouch,
        ChannelKind::Controller,
        ChannelKind::ProgramChange,
        ChannelKind::ChannelPressure,
        ChannelKind::PitchBend,
    ];

    /// Map a status-byte high nibble (0x8..=0xE) to a kind.
    pub const fn from_status_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x8 => Some(ChannelKind::NoteOff),
            0x9 => Some(ChannelKind::NoteOn),
            0xA => Some(ChannelKind::Aftertouch),
            0xB => Some(ChannelKind::Controller),
            0xC => Some(ChannelKind::ProgramChange),
            0xD => Some(ChannelKind::ChannelPressure),
            0xE => Some(ChannelKind::PitchBend),
            _ => None,
        }
    }

    /// The status-byte high nibble for this kind.
    pub const fn status_nibble(self) -> u8 {
        match self {
            ChannelKind::NoteOff => 0x8,
            ChannelKind::NoteOn => 0x9,
            ChannelKind::Aftertouch => 0xA,
            ChannelKind::Controller => 0xB,
            ChannelKind::ProgramChange => 0xC,
            ChannelKind::ChannelPressure => 0xD,
            ChannelKind::PitchBend => 0xE,
        }
    }

    /// Fixed payload length in bytes.
    pub const fn data_len(self) -> usize {
        match self {
            ChannelKind::ProgramChange | ChannelKind::ChannelPressure => 1,
            _ => 2,
        }
    }

    /// Stable name, used as the lookup key by the textual representation.
    pub const fn name(self) -> &'static str {
        match self {
            ChannelKind::NoteOff => "Note_off_c",
            ChannelKind::NoteOn => "Note_on_c",
            ChannelKind::Aftertouch => "Poly_aftertouch_c",
            ChannelKind::Controller => "Control_c",
            ChannelKind::ProgramChange => "Program_c",
            ChannelKind::ChannelPressure => "Channel_aftertouch_c",
            ChannelKind::PitchBend => "Pitch_bend_c",
        }
    }

    /// Reverse of [`ChannelKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// A channel-voice event: kind, channel 0-15, and the kind's fixed
/// number of data bytes (1 or 2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelEvent {
    /// Event kind (status high nibble)
    pub kind: ChannelKind,
    /// Channel number (status low nibble, 0-15)
    pub channel: u8,
    /// Payload, exactly `kind.data_len()` bytes
    pub data: ArrayVec<u8, 2>,
}

impl ChannelEvent {
    /// Build a channel event. `data` must match the kind's fixed payload
    /// length and hold data-role bytes (high bit clear) only.
    pub fn new(kind: ChannelKind, channel: u8, data: &[u8]) -> Self {
        debug_assert!(channel <= 0x0F);
        debug_assert_eq!(data.len(), kind.data_len());
        let mut buf = ArrayVec::new();
        for &byte in data.iter().take(2) {
            buf.push(byte);
        }
        Self {
            kind,
            channel,
            data: buf,
        }
    }
}

/// The meta commands the converter knows by name. Anything else decodes
/// as [`MetaKind::Unknown`] and keeps its raw payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKind {
    SequenceNumber,
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ChannelPrefix,
    MidiPort,
    EndOfTrack,
    SetTempo,
    SmpteOffset,
    TimeSignature,
    KeySignature,
    SequencerSpecific,
    Unknown,
}

impl MetaKind {
    /// Map a meta command byte to a kind.
    pub const fn from_command(command: u8) -> Self {
        match command {
            0x00 => MetaKind::SequenceNumber,
            0x01 => MetaKind::Text,
            0x02 => MetaKind::Copyright,
            0x03 => MetaKind::TrackName,
            0x04 => MetaKind::InstrumentName,
            0x05 => MetaKind::Lyric,
            0x06 => MetaKind::Marker,
            0x07 => MetaKind::CuePoint,
            0x20 => MetaKind::ChannelPrefix,
            0x21 => MetaKind::MidiPort,
            0x2F => MetaKind::EndOfTrack,
            0x51 => MetaKind::SetTempo,
            0x54 => MetaKind::SmpteOffset,
            0x58 => MetaKind::TimeSignature,
            0x59 => MetaKind::KeySignature,
            0x7F => MetaKind::SequencerSpecific,
            _ => MetaKind::Unknown,
        }
    }

    /// Stable name, used as the lookup key by the textual representation.
    pub const fn name(self) -> &'static str {
        match self {
            MetaKind::SequenceNumber => "Sequence_number",
            MetaKind::Text => "Text_t",
            MetaKind::Copyright => "Copyright_t",
            MetaKind::TrackName => "Title_t",
            MetaKind::InstrumentName => "Instrument_name_t",
            MetaKind::Lyric => "Lyric_t",
            MetaKind::Marker => "Marker_t",
            MetaKind::CuePoint => "Cue_point_t",
            MetaKind::ChannelPrefix => "Channel_prefix",
            MetaKind::MidiPort => "MIDI_port",
            MetaKind::EndOfTrack => "End_track",
            MetaKind::SetTempo => "Tempo",
            MetaKind::SmpteOffset => "SMPTE_offset",
            MetaKind::TimeSignature => "Time_signature",
            MetaKind::KeySignature => "Key_signature",
            MetaKind::SequencerSpecific => "Sequencer_specific",
            MetaKind::Unknown => "Unknown_meta_event",
        }
    }
}

/// A meta event: command byte plus an explicit-length payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaEvent {
    /// Command byte following the 0xFF status
    pub command: u8,
    /// Payload of the declared length
    pub data: Vec<u8>,
}

impl MetaEvent {
    /// The kind this command byte maps to.
    pub fn kind(&self) -> MetaKind {
        MetaKind::from_command(self.command)
    }

    /// The zero-length End of Track marker every track must end with.
    pub fn end_of_track() -> Self {
        Self {
            command: 0x2F,
            data: Vec::new(),
        }
    }
}

/// A system-exclusive event: 0xF0 or 0xF7 status plus an explicit-length
/// payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysexEvent {
    /// 0xF0 (start) or 0xF7 (escape/continuation)
    pub status: u8,
    /// Payload of the declared length
    pub data: Vec<u8>,
}

impl SysexEvent {
    /// Stable name, used as the lookup key by the textual representation.
    pub fn kind_name(&self) -> &'static str {
        if self.status == 0xF0 {
            "System_exclusive"
        } else {
            "System_exclusive_packet"
        }
    }
}

/// One decoded MIDI event, tagged by family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MidiEvent {
    /// Channel-voice message
    Channel(ChannelEvent),
    /// 0xFF meta event
    Meta(MetaEvent),
    /// 0xF0/0xF7 system-exclusive event
    Sysex(SysexEvent),
}

impl MidiEvent {
    /// Stable name, used as the lookup key by the textual representation.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MidiEvent::Channel(event) => event.kind.name(),
            MidiEvent::Meta(event) => event.kind().name(),
            MidiEvent::Sysex(event) => event.kind_name(),
        }
    }

    /// True for the End of Track meta marker.
    pub fn is_end_of_track(&self) -> bool {
        matches!(self, MidiEvent::Meta(meta) if meta.kind() == MetaKind::EndOfTrack)
    }
}

/// An event positioned in time. The tick is relative to the previous
/// event on the wire; a fully decoded [`crate::Pattern`] holds absolute
/// positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackEvent {
    /// Tick position (relative or absolute, see [`crate::Pattern`])
    pub tick: u32,
    /// The event itself
    pub event: MidiEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_round_trip() {
        for kind in ChannelKind::ALL {
            assert_eq!(
                ChannelKind::from_status_nibble(kind.status_nibble()),
                Some(kind)
            );
        }
        assert_eq!(ChannelKind::from_status_nibble(0x7), None);
        assert_eq!(ChannelKind::from_status_nibble(0xF), None);
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(ChannelKind::ProgramChange.data_len(), 1);
        assert_eq!(ChannelKind::ChannelPressure.data_len(), 1);
        assert_eq!(ChannelKind::NoteOn.data_len(), 2);
        assert_eq!(ChannelKind::PitchBend.data_len(), 2);
    }

    #[test]
    fn name_round_trip() {
        for kind in ChannelKind::ALL {
            assert_eq!(ChannelKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ChannelKind::from_name("Tempo"), None);
    }

    #[test]
    fn meta_kind_lookup() {
        assert_eq!(MetaKind::from_command(0x2F), MetaKind::EndOfTrack);
        assert_eq!(MetaKind::from_command(0x51), MetaKind::SetTempo);
        assert_eq!(MetaKind::from_command(0x60), MetaKind::Unknown);
    }

    #[test]
    fn end_of_track_marker() {
        let event = MidiEvent::Meta(MetaEvent::end_of_track());
        assert!(event.is_end_of_track());
        assert_eq!(event.kind_name(), "End_track");

        let note = MidiEvent::Channel(ChannelEvent::new(ChannelKind::NoteOn, 0, &[60, 100]));
        assert!(!note.is_end_of_track());
        assert_eq!(note.kind_name(), "Note_on_c");
    }
}
