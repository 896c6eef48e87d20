//! Standard MIDI File decoding and encoding.
//!
//! Wire format (big-endian throughout): an `MThd` header chunk, then
//! track chunks whose bodies are (VLQ delta-time, event) pairs with
//! running-status compression, each terminated by an End of Track meta
//! event.

use std::io::{Cursor, Write};

use binrw::{binrw, BinRead, BinWrite};
use mt_ir::{
    ChannelEvent, ChannelKind, MetaEvent, MetaKind, MidiEvent, Pattern, SysexEvent, Track,
    TrackEvent,
};

use crate::cursor::ByteCursor;
use crate::vlq::{read_vlq, write_vlq};
use crate::FormatError;

const META_STATUS: u8 = 0xFF;
const SYSEX_START: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;
/// Payload length of a standard MThd header; longer headers carry
/// forward-compatibility padding.
const HEADER_PAYLOAD: u32 = 6;

#[binrw]
#[brw(big, magic = b"MThd")]
struct FileHeader {
    length: u32,
    format: u16,
    ntracks: u16,
    resolution: u16,
}

#[binrw]
#[brw(big)]
struct TrackHeader {
    tag: [u8; 4],
    length: u32,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a Standard MIDI File into a [`Pattern`] with absolute tick
/// positions.
pub fn load_midi(data: &[u8]) -> Result<Pattern, FormatError> {
    let header = FileHeader::read(&mut Cursor::new(data)).map_err(|_| FormatError::BadHeader)?;
    if header.length < HEADER_PAYLOAD {
        return Err(FormatError::BadHeader);
    }

    // 4-byte magic + 4-byte length + declared payload (bytes past the
    // standard six are padding).
    let mut pos = 8 + header.length as usize;
    if pos > data.len() {
        return Err(FormatError::TruncatedStream {
            offset: data.len(),
            wanted: pos - data.len(),
        });
    }

    let mut pattern = Pattern::new(header.format, header.ntracks, header.resolution);
    // Clean end-of-stream between tracks is the normal exit, not an error.
    while pos < data.len() {
        let track_header = TrackHeader::read(&mut Cursor::new(&data[pos..])).map_err(|_| {
            FormatError::TruncatedStream {
                offset: data.len(),
                wanted: pos + 8 - data.len(),
            }
        })?;
        let body_start = pos + 8;
        let body_end = body_start + track_header.length as usize;
        if body_end > data.len() {
            return Err(FormatError::TruncatedStream {
                offset: data.len(),
                wanted: body_end - data.len(),
            });
        }

        let track_index = pattern.tracks.len();
        let (events, saw_running) =
            decode_track(&data[body_start..body_end], body_start, track_index)?;
        pattern.use_running_status |= saw_running;
        pattern.tracks.push(Track {
            type_tag: track_header.tag,
            events,
        });
        pos = body_end;
    }

    pattern.make_ticks_abs();
    Ok(pattern)
}

/// Decode one track body into events with wire-relative ticks. Returns
/// the events plus whether any event used running-status compression.
fn decode_track(
    body: &[u8],
    base: usize,
    track: usize,
) -> Result<(Vec<TrackEvent>, bool), FormatError> {
    let mut cur = ByteCursor::new(body, base);
    let mut events = Vec::new();
    let mut running: Option<u8> = None;
    let mut saw_running = false;

    while cur.has_more() {
        events.push(decode_event(&mut cur, &mut running, &mut saw_running)?);
    }
    if !events
        .last()
        .is_some_and(|event| event.event.is_end_of_track())
    {
        return Err(FormatError::UnterminatedTrack { track });
    }
    Ok((events, saw_running))
}

fn decode_event(
    cur: &mut ByteCursor,
    running: &mut Option<u8>,
    saw_running: &mut bool,
) -> Result<TrackEvent, FormatError> {
    let tick = read_vlq(cur)?;
    let first = cur.next_u8()?;

    let event = match first {
        META_STATUS => {
            let at = cur.pos();
            let command = cur.data_byte()?;
            let length = read_vlq(cur)? as usize;
            let data = cur.take(length)?.to_vec();
            if MetaKind::from_command(command) == MetaKind::Unknown {
                // Length-delimited, so the payload is preserved and
                // decoding continues.
                eprintln!(
                    "[SMF] WARNING: unknown meta command 0x{:02X} at offset {}, keeping {} payload byte(s)",
                    command, at, length
                );
            }
            MidiEvent::Meta(MetaEvent { command, data })
        }
        SYSEX_START | SYSEX_ESCAPE => {
            let length = read_vlq(cur)? as usize;
            let data = cur.take(length)?.to_vec();
            MidiEvent::Sysex(SysexEvent {
                status: first,
                data,
            })
        }
        _ => decode_channel_event(cur, first, running, saw_running)?,
    };
    Ok(TrackEvent { tick, event })
}

fn decode_channel_event(
    cur: &mut ByteCursor,
    first: u8,
    running: &mut Option<u8>,
    saw_running: &mut bool,
) -> Result<MidiEvent, FormatError> {
    let mut data = [0u8; 2];
    let (status, consumed) = if first & 0x80 != 0 {
        // New status byte.
        (first, 0)
    } else {
        // High bit clear: the first data byte of a continuation event
        // reusing the running status, which must already be set.
        let Some(register) = *running else {
            return Err(FormatError::MalformedEvent {
                offset: cur.pos() - 1,
                byte: first,
            });
        };
        *saw_running = true;
        data[0] = first;
        (register, 1)
    };

    // 0xF1-0xF6 and 0xF8-0xFE carry no length, so they cannot be skipped.
    let kind =
        ChannelKind::from_status_nibble(status >> 4).ok_or(FormatError::MalformedEvent {
            offset: cur.pos() - 1,
            byte: status,
        })?;
    if consumed == 0 {
        *running = Some(status);
    }

    for slot in data.iter_mut().take(kind.data_len()).skip(consumed) {
        *slot = cur.data_byte()?;
    }
    Ok(MidiEvent::Channel(ChannelEvent::new(
        kind,
        status & 0x0F,
        &data[..kind.data_len()],
    )))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a pattern as Standard MIDI File bytes and write them to `w`.
pub fn write_midi(w: &mut impl Write, pattern: &Pattern) -> Result<(), FormatError> {
    let bytes = pattern_to_midi(pattern)?;
    w.write_all(&bytes)
        .map_err(|e| FormatError::Io(e.to_string()))
}

/// Encode a pattern as Standard MIDI File bytes. Track events carry
/// absolute ticks; deltas are computed on the fly without mutating the
/// caller's pattern.
pub fn pattern_to_midi(pattern: &Pattern) -> Result<Vec<u8>, FormatError> {
    if pattern.ntracks as usize != pattern.tracks.len() {
        return Err(FormatError::TrackCountMismatch {
            declared: pattern.ntracks,
            actual: pattern.tracks.len(),
        });
    }

    let mut out = Cursor::new(Vec::new());
    let header = FileHeader {
        length: HEADER_PAYLOAD,
        format: pattern.format,
        ntracks: pattern.ntracks,
        resolution: pattern.resolution,
    };
    header
        .write(&mut out)
        .map_err(|e| FormatError::Io(e.to_string()))?;

    for (index, track) in pattern.tracks.iter().enumerate() {
        let body = encode_track(track, index, pattern.use_running_status)?;
        let header = TrackHeader {
            tag: track.type_tag,
            length: body.len() as u32,
        };
        header
            .write(&mut out)
            .map_err(|e| FormatError::Io(e.to_string()))?;
        out.write_all(&body)
            .map_err(|e| FormatError::Io(e.to_string()))?;
    }
    Ok(out.into_inner())
}

fn encode_track(track: &Track, index: usize, use_running: bool) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    let mut running: Option<u8> = None;
    let mut prev_tick = 0u32;

    for event in &track.events {
        let delta = event
            .tick
            .checked_sub(prev_tick)
            .ok_or(FormatError::NegativeDelta {
                track: index,
                tick: event.tick,
            })?;
        prev_tick = event.tick;
        write_vlq(delta, &mut buf);

        match &event.event {
            MidiEvent::Meta(meta) => {
                // Meta and sysex events interrupt running status.
                running = None;
                buf.push(META_STATUS);
                buf.push(meta.command);
                write_vlq(meta.data.len() as u32, &mut buf);
                buf.extend_from_slice(&meta.data);
            }
            MidiEvent::Sysex(sysex) => {
                running = None;
                buf.push(sysex.status);
                write_vlq(sysex.data.len() as u32, &mut buf);
                buf.extend_from_slice(&sysex.data);
            }
            MidiEvent::Channel(channel) => {
                debug_assert!(channel.channel <= 0x0F);
                let status = (channel.kind.status_nibble() << 4) | channel.channel;
                if !(use_running && running == Some(status)) {
                    buf.push(status);
                    running = Some(status);
                }
                buf.extend_from_slice(&channel.data);
            }
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(tick: u32, channel: u8, note: u8, velocity: u8) -> TrackEvent {
        TrackEvent {
            tick,
            event: MidiEvent::Channel(ChannelEvent::new(
                ChannelKind::NoteOn,
                channel,
                &[note, velocity],
            )),
        }
    }

    fn end_of_track(tick: u32) -> TrackEvent {
        TrackEvent {
            tick,
            event: MidiEvent::Meta(MetaEvent::end_of_track()),
        }
    }

    #[test]
    fn decode_channel_meta_sysex() {
        let body = [
            0x00, 0x92, 0x3C, 0x64, // note on, channel 2
            0x10, 0xC1, 0x05, // program change, channel 1, one data byte
            0x00, 0xF0, 0x02, 0x7E, 0x7F, // sysex, two bytes
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
            0x00, 0xFF, 0x2F, 0x00, // end of track
        ];
        let (events, saw_running) = decode_track(&body, 0, 0).unwrap();
        assert!(!saw_running);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0].event,
            MidiEvent::Channel(ChannelEvent::new(ChannelKind::NoteOn, 2, &[0x3C, 0x64]))
        );
        assert_eq!(events[1].tick, 0x10);
        assert_eq!(
            events[1].event,
            MidiEvent::Channel(ChannelEvent::new(ChannelKind::ProgramChange, 1, &[0x05]))
        );
        assert_eq!(
            events[2].event,
            MidiEvent::Sysex(SysexEvent {
                status: 0xF0,
                data: vec![0x7E, 0x7F],
            })
        );
        assert_eq!(
            events[3].event,
            MidiEvent::Meta(MetaEvent {
                command: 0x51,
                data: vec![0x07, 0xA1, 0x20],
            })
        );
        assert!(events[4].event.is_end_of_track());
    }

    #[test]
    fn decode_running_status_continuation() {
        let body = [
            0x00, 0x90, 0x3C, 0x64, // new status
            0x08, 0x3E, 0x64, // continuation, same status
            0x08, 0x40, 0x00, // continuation again
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let (events, saw_running) = decode_track(&body, 0, 0).unwrap();
        assert!(saw_running);
        assert_eq!(events.len(), 4);
        for event in &events[..3] {
            match &event.event {
                MidiEvent::Channel(ch) => {
                    assert_eq!(ch.kind, ChannelKind::NoteOn);
                    assert_eq!(ch.channel, 0);
                }
                other => panic!("expected channel event, got {:?}", other),
            }
        }
    }

    #[test]
    fn continuation_without_prior_status() {
        // First status position holds a data byte.
        let body = [0x00, 0x3C, 0x64, 0x00, 0xFF, 0x2F, 0x00];
        let err = decode_track(&body, 0, 0).unwrap_err();
        assert_eq!(
            err,
            FormatError::MalformedEvent {
                offset: 1,
                byte: 0x3C
            }
        );
    }

    #[test]
    fn unknown_channel_status_is_fatal() {
        let body = [0x00, 0xF4, 0x01, 0x00, 0xFF, 0x2F, 0x00];
        let err = decode_track(&body, 0, 0).unwrap_err();
        assert_eq!(
            err,
            FormatError::MalformedEvent {
                offset: 1,
                byte: 0xF4
            }
        );
    }

    #[test]
    fn meta_length_must_match_exactly() {
        // Declared 4 payload bytes, only 2 remain before the track ends.
        let body = [0x00, 0xFF, 0x06, 0x04, b'a', b'b'];
        let err = decode_track(&body, 10, 0).unwrap_err();
        assert_eq!(
            err,
            FormatError::TruncatedStream {
                offset: 14,
                wanted: 4
            }
        );
    }

    #[test]
    fn missing_end_of_track() {
        let body = [0x00, 0x90, 0x3C, 0x64];
        assert_eq!(
            decode_track(&body, 0, 3).unwrap_err(),
            FormatError::UnterminatedTrack { track: 3 }
        );
    }

    #[test]
    fn encode_running_status_compression() {
        let track = Track {
            type_tag: mt_ir::MTRK,
            events: vec![
                note_on(0, 2, 60, 100),
                note_on(8, 2, 62, 100),
                note_on(16, 2, 64, 100),
                end_of_track(16),
            ],
        };
        let compressed = encode_track(&track, 0, true).unwrap();
        assert_eq!(
            compressed,
            vec![
                0x00, 0x92, 60, 100, // status emitted once
                0x08, 62, 100, // omitted
                0x08, 64, 100, // omitted
                0x00, 0xFF, 0x2F, 0x00,
            ]
        );

        let plain = encode_track(&track, 0, false).unwrap();
        assert_eq!(
            plain,
            vec![
                0x00, 0x92, 60, 100, 0x08, 0x92, 62, 100, 0x08, 0x92, 64, 100, 0x00, 0xFF, 0x2F,
                0x00,
            ]
        );
    }

    #[test]
    fn meta_interrupts_running_status() {
        let track = Track {
            type_tag: mt_ir::MTRK,
            events: vec![
                note_on(0, 0, 60, 100),
                TrackEvent {
                    tick: 4,
                    event: MidiEvent::Meta(MetaEvent {
                        command: 0x06,
                        data: b"m".to_vec(),
                    }),
                },
                note_on(8, 0, 62, 100),
                end_of_track(8),
            ],
        };
        let bytes = encode_track(&track, 0, true).unwrap();
        // The note after the marker must re-emit its status byte.
        assert_eq!(
            bytes,
            vec![
                0x00, 0x90, 60, 100, 0x04, 0xFF, 0x06, 0x01, b'm', 0x04, 0x90, 62, 100, 0x00,
                0xFF, 0x2F, 0x00,
            ]
        );
    }

    #[test]
    fn backwards_ticks_rejected() {
        let track = Track {
            type_tag: mt_ir::MTRK,
            events: vec![note_on(10, 0, 60, 100), note_on(5, 0, 60, 0), end_of_track(5)],
        };
        assert_eq!(
            encode_track(&track, 7, false).unwrap_err(),
            FormatError::NegativeDelta { track: 7, tick: 5 }
        );
    }

    #[test]
    fn write_midi_streams_encoded_bytes() {
        let mut pattern = Pattern::new(0, 1, 96);
        pattern.tracks.push(Track {
            type_tag: mt_ir::MTRK,
            events: vec![note_on(0, 0, 60, 100), end_of_track(4)],
        });
        let mut out = Vec::new();
        write_midi(&mut out, &pattern).unwrap();
        assert_eq!(out, pattern_to_midi(&pattern).unwrap());
    }

    #[test]
    fn track_count_must_match() {
        let mut pattern = Pattern::new(1, 2, 480);
        pattern.tracks.push(Track::new());
        assert_eq!(
            pattern_to_midi(&pattern).unwrap_err(),
            FormatError::TrackCountMismatch {
                declared: 2,
                actual: 1
            }
        );
    }
}
