//! Rspotdown - Download Spotify tracks and playlists as tagged mp3 files
//!
//! This library resolves a track or playlist link against the download API,
//! fetches every audio stream with its cover art and writes tagged mp3 files,
//! with a bounded number of downloads in flight.

/// Client modules for the remote API, local files and tags
pub mod clients;
/// Bounded-concurrency download orchestration
pub mod downloader;
