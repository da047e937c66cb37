//! Spoken answer playback
//!
//! `ResponsePlayer` turns a base64 speech payload into a transient file,
//! plays it to the end and removes it again. Cleanup happens exactly once on
//! every path that created the file.

mod player;

pub use player::ResponsePlayer;
