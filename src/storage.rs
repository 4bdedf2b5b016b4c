//! Storage subsystem
//!
//! On-disk archive layout and the enumeration/aggregation/deletion surface
//! the HTTP API is built on: `{base}/{YYYY-MM-DD}/{HH-MM-SS}.mp4`, one file
//! per kept segment.

pub mod archive;

pub use archive::ArchiveStorage;
