/// Metadata and stream-link API client
pub mod catalog;
/// Data entities for tracks, playlists and artists
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Binary downloads of audio streams and cover art
pub mod fetcher;
/// Idempotent placement of downloaded files
pub mod file_sink;
/// Parsing of user-supplied links
pub mod link;
/// Filesystem-safe names for titles
pub mod naming;
/// Tag embedding into mp3 files
pub mod tagger;
/// Paginated playlist members
pub mod tracklist;

pub use catalog::CatalogClient;
pub use fetcher::AssetFetcher;
pub use file_sink::{FileSink, Placement};
pub use link::Link;
pub use tracklist::TrackList;
