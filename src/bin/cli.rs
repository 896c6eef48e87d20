//! miditext CLI — convert MIDI files to midicsv text and back.
//!
//! Usage:
//!   mt-cli song.mid            # MIDI -> CSV on stdout
//!   mt-cli song.mid out.csv
//!   mt-cli song.csv out.mid    # CSV -> MIDI
//!
//! The direction is chosen by sniffing the input: files starting with
//! the `MThd` magic are treated as binary MIDI.

use std::io::Write;
use std::{env, fs};

use mt_formats::{csv_to_midi, load_midi, midi_to_csv, pattern_to_midi};

fn main() {
    let args: Vec<String> = env::args().collect();
    let input = args.get(1).unwrap_or_else(|| {
        eprintln!("Usage: mt-cli <input> [output]");
        std::process::exit(1);
    });
    let output = args.get(2);

    let data = fs::read(input).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", input, e);
        std::process::exit(1);
    });

    if data.starts_with(b"MThd") {
        let pattern = load_midi(&data).unwrap_or_else(|e| {
            eprintln!("Failed to parse MIDI: {:?}", e);
            std::process::exit(1);
        });
        let mut text = midi_to_csv(&pattern).join("\n");
        text.push('\n');
        write_output(output, text.as_bytes());
    } else {
        let text = String::from_utf8_lossy(&data);
        let pattern = csv_to_midi(&text).unwrap_or_else(|e| {
            eprintln!("Failed to parse CSV: {:?}", e);
            std::process::exit(1);
        });
        let bytes = pattern_to_midi(&pattern).unwrap_or_else(|e| {
            eprintln!("Failed to encode MIDI: {:?}", e);
            std::process::exit(1);
        });
        write_output(output, &bytes);
    }
}

fn write_output(path: Option<&String>, bytes: &[u8]) {
    match path {
        Some(p) => fs::write(p, bytes).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {}", p, e);
            std::process::exit(1);
        }),
        None => {
            std::io::stdout().write_all(bytes).unwrap_or_else(|e| {
                eprintln!("Failed to write output: {}", e);
                std::process::exit(1);
            });
        }
    }
}
