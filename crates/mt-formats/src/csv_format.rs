//! The midicsv textual representation: one record per line, in the form
//! `track, time, name[, fields…]`.
//!
//! A file is a `Header` record, then per track a `Start_track` marker
//! followed by that track's events at absolute tick positions, then a
//! closing `End_of_file`. Comment lines start with `#` or `;`. Text
//! payloads are double-quoted with `""` escaping.

use std::fmt::Write as _;

use mt_ir::{
    ChannelEvent, ChannelKind, MetaEvent, MetaKind, MidiEvent, Pattern, SysexEvent, Track,
    TrackEvent,
};

use crate::FormatError;

const COMMENT_DELIMITERS: [char; 2] = ['#', ';'];

// ---------------------------------------------------------------------------
// Pattern -> CSV
// ---------------------------------------------------------------------------

/// Render a pattern (absolute ticks) as midicsv records, one per line,
/// without trailing newlines.
pub fn midi_to_csv(pattern: &Pattern) -> Vec<String> {
    let mut out = Vec::new();
    out.push(format!(
        "0, 0, Header, {}, {}, {}",
        pattern.format, pattern.ntracks, pattern.resolution
    ));
    for (index, track) in pattern.tracks.iter().enumerate() {
        let number = index + 1;
        if track.is_standard() {
            out.push(format!("{}, 0, Start_track", number));
        } else {
            out.push(format!(
                "{}, 0, Start_{}_track",
                number,
                String::from_utf8_lossy(&track.type_tag)
            ));
        }
        for event in &track.events {
            out.push(event_record(number, event));
        }
    }
    out.push("0, 0, End_of_file".to_string());
    out
}

fn event_record(track: usize, event: &TrackEvent) -> String {
    let head = format!("{}, {}, {}", track, event.tick, event.event.kind_name());
    match &event.event {
        MidiEvent::Channel(channel) => channel_fields(head, channel),
        MidiEvent::Meta(meta) => meta_fields(head, meta),
        MidiEvent::Sysex(sysex) => byte_list_fields(head, &sysex.data),
    }
}

fn channel_fields(head: String, event: &ChannelEvent) -> String {
    match event.kind {
        ChannelKind::ProgramChange | ChannelKind::ChannelPressure => {
            format!("{}, {}, {}", head, event.channel, event.data[0])
        }
        ChannelKind::PitchBend => {
            // 14-bit value, LSB first on the wire
            let value = u16::from(event.data[0]) | (u16::from(event.data[1]) << 7);
            format!("{}, {}, {}", head, event.channel, value)
        }
        _ => format!(
            "{}, {}, {}, {}",
            head, event.channel, event.data[0], event.data[1]
        ),
    }
}

fn meta_fields(head: String, meta: &MetaEvent) -> String {
    let data = &meta.data;
    match meta.kind() {
        MetaKind::SequenceNumber => {
            let value = (u16::from(byte_at(data, 0)) << 8) | u16::from(byte_at(data, 1));
            format!("{}, {}", head, value)
        }
        MetaKind::Text
        | MetaKind::Copyright
        | MetaKind::TrackName
        | MetaKind::InstrumentName
        | MetaKind::Lyric
        | MetaKind::Marker
        | MetaKind::CuePoint => format!("{}, {}", head, quote(data)),
        MetaKind::ChannelPrefix | MetaKind::MidiPort => {
            format!("{}, {}", head, byte_at(data, 0))
        }
        MetaKind::EndOfTrack => head,
        MetaKind::SetTempo => {
            let tempo = (u32::from(byte_at(data, 0)) << 16)
                | (u32::from(byte_at(data, 1)) << 8)
                | u32::from(byte_at(data, 2));
            format!("{}, {}", head, tempo)
        }
        MetaKind::SmpteOffset => format!(
            "{}, {}, {}, {}, {}, {}",
            head,
            byte_at(data, 0),
            byte_at(data, 1),
            byte_at(data, 2),
            byte_at(data, 3),
            byte_at(data, 4)
        ),
        MetaKind::TimeSignature => format!(
            "{}, {}, {}, {}, {}",
            head,
            byte_at(data, 0),
            byte_at(data, 1),
            byte_at(data, 2),
            byte_at(data, 3)
        ),
        MetaKind::KeySignature => {
            let key = byte_at(data, 0) as i8;
            let mode = if byte_at(data, 1) == 0 {
                "\"major\""
            } else {
                "\"minor\""
            };
            format!("{}, {}, {}", head, key, mode)
        }
        MetaKind::SequencerSpecific => byte_list_fields(head, data),
        MetaKind::Unknown => byte_list_fields(format!("{}, {}", head, meta.command), data),
    }
}

fn byte_at(data: &[u8], index: usize) -> u8 {
    data.get(index).copied().unwrap_or(0)
}

fn byte_list_fields(head: String, data: &[u8]) -> String {
    let mut out = format!("{}, {}", head, data.len());
    for byte in data {
        let _ = write!(out, ", {}", byte);
    }
    out
}

fn quote(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// CSV -> Pattern
// ---------------------------------------------------------------------------

/// Parse midicsv records into a pattern with absolute tick positions.
/// Event records must follow their track's `Start_track` record.
pub fn csv_to_midi(input: &str) -> Result<Pattern, FormatError> {
    let mut pattern = Pattern::new(1, 0, 0);
    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with(COMMENT_DELIMITERS) {
            continue;
        }

        let fields = split_record(text, line)?;
        if fields.len() < 3 {
            return Err(bad(line, "record needs track, time, and name fields"));
        }
        let _track_number: usize = parse_num(&fields[0], line)?;
        let time: u32 = parse_num(&fields[1], line)?;
        let name = fields[2].as_str();

        match name {
            "Header" => {
                pattern.format = parse_num(field(&fields, 3, line)?, line)?;
                pattern.ntracks = parse_num(field(&fields, 4, line)?, line)?;
                pattern.resolution = parse_num(field(&fields, 5, line)?, line)?;
            }
            "End_of_file" => {}
            "Start_track" => pattern.tracks.push(Track::new()),
            _ if name.starts_with("Start_") && name.ends_with("_track") => {
                let tag = &name["Start_".len()..name.len() - "_track".len()];
                if tag.len() != 4 {
                    return Err(bad(line, format!("track tag {:?} is not four bytes", tag)));
                }
                let mut type_tag = [0u8; 4];
                type_tag.copy_from_slice(tag.as_bytes());
                pattern.tracks.push(Track::with_tag(type_tag));
            }
            _ => {
                let event = parse_event(name, &fields[3..], line)?;
                let track = pattern
                    .tracks
                    .last_mut()
                    .ok_or_else(|| bad(line, "event record before any Start_track"))?;
                track.events.push(TrackEvent { tick: time, event });
            }
        }
    }
    Ok(pattern)
}

fn parse_event(name: &str, args: &[String], line: usize) -> Result<MidiEvent, FormatError> {
    if let Some(kind) = ChannelKind::from_name(name) {
        return parse_channel_event(kind, args, line);
    }
    let meta = |command: u8, data: Vec<u8>| Ok(MidiEvent::Meta(MetaEvent { command, data }));
    match name {
        "Sequence_number" => {
            let value: u16 = parse_num(field(args, 0, line)?, line)?;
            meta(0x00, vec![(value >> 8) as u8, (value & 0xFF) as u8])
        }
        "Text_t" => meta(0x01, text_payload(args, line)?),
        "Copyright_t" => meta(0x02, text_payload(args, line)?),
        "Title_t" => meta(0x03, text_payload(args, line)?),
        "Instrument_name_t" => meta(0x04, text_payload(args, line)?),
        "Lyric_t" => meta(0x05, text_payload(args, line)?),
        "Marker_t" => meta(0x06, text_payload(args, line)?),
        "Cue_point_t" => meta(0x07, text_payload(args, line)?),
        "Channel_prefix" => meta(0x20, vec![parse_num(field(args, 0, line)?, line)?]),
        "MIDI_port" => meta(0x21, vec![parse_num(field(args, 0, line)?, line)?]),
        "End_track" => Ok(MidiEvent::Meta(MetaEvent::end_of_track())),
        "Tempo" => {
            let tempo: u32 = parse_num(field(args, 0, line)?, line)?;
            if tempo > 0xFF_FFFF {
                return Err(bad(line, "tempo exceeds 24 bits"));
            }
            meta(
                0x51,
                vec![(tempo >> 16) as u8, (tempo >> 8) as u8, tempo as u8],
            )
        }
        "SMPTE_offset" => {
            let mut data = Vec::with_capacity(5);
            for i in 0..5 {
                data.push(parse_num(field(args, i, line)?, line)?);
            }
            meta(0x54, data)
        }
        "Time_signature" => {
            let mut data = Vec::with_capacity(4);
            for i in 0..4 {
                data.push(parse_num(field(args, i, line)?, line)?);
            }
            meta(0x58, data)
        }
        "Key_signature" => {
            let key: i8 = parse_num(field(args, 0, line)?, line)?;
            let mode = match field(args, 1, line)? {
                "major" => 0u8,
                "minor" => 1u8,
                other => return Err(bad(line, format!("bad key mode {:?}", other))),
            };
            meta(0x59, vec![key as u8, mode])
        }
        "Sequencer_specific" => meta(0x7F, byte_list(args, 0, line)?),
        "Unknown_meta_event" => {
            let command: u8 = parse_num(field(args, 0, line)?, line)?;
            if command & 0x80 != 0 {
                return Err(bad(line, "meta command must be a data byte"));
            }
            meta(command, byte_list(args, 1, line)?)
        }
        "System_exclusive" => Ok(MidiEvent::Sysex(SysexEvent {
            status: 0xF0,
            data: byte_list(args, 0, line)?,
        })),
        "System_exclusive_packet" => Ok(MidiEvent::Sysex(SysexEvent {
            status: 0xF7,
            data: byte_list(args, 0, line)?,
        })),
        _ => Err(bad(line, format!("unknown record type {:?}", name))),
    }
}

fn parse_channel_event(
    kind: ChannelKind,
    args: &[String],
    line: usize,
) -> Result<MidiEvent, FormatError> {
    let channel: u8 = parse_num(field(args, 0, line)?, line)?;
    if channel > 15 {
        return Err(bad(line, "channel out of range 0-15"));
    }
    let data = match kind {
        ChannelKind::ProgramChange | ChannelKind::ChannelPressure => {
            vec![data_byte_arg(args, 1, line)?]
        }
        ChannelKind::PitchBend => {
            let value: u16 = parse_num(field(args, 1, line)?, line)?;
            if value > 0x3FFF {
                return Err(bad(line, "pitch bend exceeds 14 bits"));
            }
            vec![(value & 0x7F) as u8, (value >> 7) as u8]
        }
        _ => vec![data_byte_arg(args, 1, line)?, data_byte_arg(args, 2, line)?],
    };
    Ok(MidiEvent::Channel(ChannelEvent::new(kind, channel, &data)))
}

fn text_payload(args: &[String], line: usize) -> Result<Vec<u8>, FormatError> {
    Ok(field(args, 0, line)?.as_bytes().to_vec())
}

/// Parse a `length, byte, byte, …` field run starting at `start`.
fn byte_list(args: &[String], start: usize, line: usize) -> Result<Vec<u8>, FormatError> {
    let length: usize = parse_num(field(args, start, line)?, line)?;
    let rest = args.get(start + 1..).unwrap_or(&[]);
    if rest.len() != length {
        return Err(bad(
            line,
            format!("declared {} bytes, found {}", length, rest.len()),
        ));
    }
    rest.iter().map(|f| parse_num(f, line)).collect()
}

fn data_byte_arg(args: &[String], index: usize, line: usize) -> Result<u8, FormatError> {
    let value: u8 = parse_num(field(args, index, line)?, line)?;
    if value > 127 {
        return Err(bad(line, "data byte out of range 0-127"));
    }
    Ok(value)
}

fn field<'a>(fields: &'a [String], index: usize, line: usize) -> Result<&'a str, FormatError> {
    fields
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| bad(line, "missing field"))
}

fn parse_num<T: std::str::FromStr>(text: &str, line: usize) -> Result<T, FormatError> {
    text.parse()
        .map_err(|_| bad(line, format!("bad number {:?}", text)))
}

fn bad(line: usize, reason: impl Into<String>) -> FormatError {
    FormatError::BadRecord {
        line,
        reason: reason.into(),
    }
}

/// Split one record into fields: comma-separated, optionally
/// double-quoted with `""` escaping, surrounding whitespace ignored.
fn split_record(text: &str, line: usize) -> Result<Vec<String>, FormatError> {
    let mut fields = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if let Some(stripped) = rest.strip_prefix('"') {
            let (field, after) = take_quoted(stripped, line)?;
            fields.push(field);
            let after = after.trim_start();
            match after.strip_prefix(',') {
                Some(more) => rest = more,
                None if after.is_empty() => break,
                None => return Err(bad(line, "unexpected text after quoted field")),
            }
        } else {
            match rest.split_once(',') {
                Some((field, more)) => {
                    fields.push(field.trim().to_string());
                    rest = more;
                }
                None => {
                    fields.push(rest.trim().to_string());
                    break;
                }
            }
        }
    }
    Ok(fields)
}

fn take_quoted(text: &str, line: usize) -> Result<(String, &str), FormatError> {
    let mut field = String::new();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '"' {
            if text[i + 1..].starts_with('"') {
                field.push('"');
                chars.next();
            } else {
                return Ok((field, &text[i + 1..]));
            }
        } else {
            field.push(c);
        }
    }
    Err(bad(line, "unterminated quoted field"))
}
