//! Track and Pattern containers.

use alloc::vec::Vec;

use crate::event::TrackEvent;

/// The standard track chunk tag.
pub const MTRK: [u8; 4] = *b"MTrk";

/// An ordered sequence of events plus the 4-byte chunk tag it was read
/// from. Non-standard tags are preserved verbatim for round-tripping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Chunk type tag, normally `MTrk`
    pub type_tag: [u8; 4],
    /// Events in time order
    pub events: Vec<TrackEvent>,
}

impl Track {
    /// Create an empty standard (`MTrk`) track.
    pub const fn new() -> Self {
        Self::with_tag(MTRK)
    }

    /// Create an empty track with an explicit chunk tag.
    pub const fn with_tag(type_tag: [u8; 4]) -> Self {
        Self {
            type_tag,
            events: Vec::new(),
        }
    }

    /// True for the standard `MTrk` tag.
    pub fn is_standard(&self) -> bool {
        self.type_tag == MTRK
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

/// The top-level container: file header fields plus the tracks.
///
/// Event ticks are stored relative to the previous event on the wire,
/// but a fully decoded pattern holds absolute positions; conversion is a
/// pattern-wide operation, not per-event state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// SMF format: 0 single-track, 1 simultaneous, 2 sequential
    pub format: u16,
    /// Declared track count; must equal `tracks.len()` on encode,
    /// advisory on decode
    pub ntracks: u16,
    /// Ticks per quarter note
    pub resolution: u16,
    /// Set when running-status compression was observed during decode;
    /// the next encode of this pattern reproduces it
    pub use_running_status: bool,
    /// The tracks, in file order
    pub tracks: Vec<Track>,
}

impl Pattern {
    /// Create an empty pattern.
    pub const fn new(format: u16, ntracks: u16, resolution: u16) -> Self {
        Self {
            format,
            ntracks,
            resolution,
            use_running_status: false,
            tracks: Vec::new(),
        }
    }

    /// Convert per-track relative delta ticks into absolute positions
    /// (cumulative sum, independent across tracks).
    pub fn make_ticks_abs(&mut self) {
        for track in &mut self.tracks {
            let mut now = 0u32;
            for event in &mut track.events {
                now += event.tick;
                event.tick = now;
            }
        }
    }

    /// Convert absolute positions back into relative deltas. Events must
    /// already be in time order within each track.
    pub fn make_ticks_rel(&mut self) {
        for track in &mut self.tracks {
            let mut prev = 0u32;
            for event in &mut track.events {
                let abs = event.tick;
                debug_assert!(abs >= prev, "events not in time order");
                event.tick = abs.saturating_sub(prev);
                prev = abs;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MetaEvent, MidiEvent};

    fn marker_at(tick: u32) -> TrackEvent {
        TrackEvent {
            tick,
            event: MidiEvent::Meta(MetaEvent {
                command: 0x06,
                data: alloc::vec![b'x'],
            }),
        }
    }

    #[test]
    fn ticks_abs_accumulates_per_track() {
        let mut pattern = Pattern::new(1, 2, 480);
        pattern.tracks.push(Track {
            type_tag: MTRK,
            events: alloc::vec![marker_at(10), marker_at(20), marker_at(0)],
        });
        pattern.tracks.push(Track {
            type_tag: MTRK,
            events: alloc::vec![marker_at(5), marker_at(5)],
        });

        pattern.make_ticks_abs();

        let ticks: Vec<u32> = pattern.tracks[0].events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, alloc::vec![10, 30, 30]);
        let ticks: Vec<u32> = pattern.tracks[1].events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, alloc::vec![5, 10]);
    }

    #[test]
    fn ticks_rel_inverts_abs() {
        let mut pattern = Pattern::new(0, 1, 96);
        pattern.tracks.push(Track {
            type_tag: MTRK,
            events: alloc::vec![marker_at(0), marker_at(7), marker_at(123)],
        });
        let original = pattern.clone();

        pattern.make_ticks_abs();
        pattern.make_ticks_rel();
        assert_eq!(pattern, original);
    }
}
