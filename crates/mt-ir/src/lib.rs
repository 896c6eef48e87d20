//! Event model and containers for the miditext converter.
//!
//! This crate defines the in-memory representation shared by both
//! codecs: the binary SMF codec decodes into a [`Pattern`] and encodes
//! from one, and the textual CSV codec does the same. Events carry a
//! stable `kind` name that the textual side uses as its lookup key.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod pattern;

pub use event::{
    ChannelEvent, ChannelKind, MetaEvent, MetaKind, MidiEvent, SysexEvent, TrackEvent,
};
pub use pattern::{Pattern, Track, MTRK};
