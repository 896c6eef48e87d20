//! Codecs for the miditext converter.
//!
//! [`load_midi`] and [`pattern_to_midi`] convert between raw Standard
//! MIDI File bytes and the `mt-ir` [`mt_ir::Pattern`]; [`midi_to_csv`]
//! and [`csv_to_midi`] do the same for the midicsv textual form.

mod csv_format;
mod cursor;
mod smf;
mod vlq;

pub use csv_format::{csv_to_midi, midi_to_csv};
pub use cursor::ByteCursor;
pub use smf::{load_midi, pattern_to_midi, write_midi};
pub use vlq::{read_vlq, write_vlq};

/// Error type for the codecs. Fatal conditions carry enough context
/// (track index or absolute byte offset) to locate the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// File does not start with a valid MThd header
    BadHeader,
    /// A length field promised more bytes than the stream holds
    TruncatedStream { offset: usize, wanted: usize },
    /// Track body ended in the middle of an event
    EndOfTrack { offset: usize },
    /// Status/data byte role violation, or a running-status continuation
    /// with no prior status byte
    MalformedEvent { offset: usize, byte: u8 },
    /// Track body ended without an End of Track meta event
    UnterminatedTrack { track: usize },
    /// Declared track count differs from the actual number of tracks
    TrackCountMismatch { declared: u16, actual: usize },
    /// Absolute event ticks run backwards within a track
    NegativeDelta { track: usize, tick: u32 },
    /// Unparseable CSV record
    BadRecord { line: usize, reason: String },
    /// I/O error
    Io(String),
}
