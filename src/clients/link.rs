use url::Url;

use crate::clients::errors::{Error, Result};

pub const LINK_PREFIX: &str = "https://open.spotify.com/";

/// What a user-supplied link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Track(String),
    Playlist(String),
}

impl Link {
    /// Parse an `open.spotify.com` link. The id is the last path segment.
    pub fn parse(input: &str) -> Result<Link> {
        let input = input.trim();
        if !input.to_lowercase().starts_with(LINK_PREFIX) {
            return Err(Error::InvalidLink(format!(
                "{input} does not start with {LINK_PREFIX}"
            )));
        }

        let url = Url::parse(input)?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let Some(id) = segments.last().map(|s| (*s).to_string()) else {
            return Err(Error::InvalidLink(format!("{input} has no item id")));
        };

        if segments.contains(&"playlist") {
            Ok(Link::Playlist(id))
        } else if segments.contains(&"track") {
            Ok(Link::Track(id))
        } else {
            Err(Error::InvalidLink(format!(
                "{input} is neither a track nor a playlist link"
            )))
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Link::Track(id) | Link::Playlist(id) => id,
        }
    }
}
