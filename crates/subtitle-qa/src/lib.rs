//! Subtitle quality analysis over captured provider payloads.
//!
//! [`pipeline::analyze`] merges fragmentary on-screen text detections,
//! separates subtitles from fixed text, filters spell-check suggestions and
//! measures how well the subtitles track the transcription.

pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod settings;
pub mod stage;
pub mod text;
