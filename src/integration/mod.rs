//! Integration tests
//!
//! Drive the full router against temporary storage: upload, transcode,
//! then range and segment playback.

mod e2e;
mod fixtures;
