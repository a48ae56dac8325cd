use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One or more artist names, in the order the server lists them.
///
/// The API sends either a single string or a list of strings; both land here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artists(Vec<String>);

impl Artists {
    pub fn new(names: Vec<String>) -> Self {
        Artists(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined form used for tags and log lines.
    pub fn display(&self) -> String {
        self.0.join(", ")
    }
}

impl<'de> Deserialize<'de> for Artists {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(name) => Artists(vec![name]),
            OneOrMany::Many(names) => Artists(names),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub artists: Artists,
    /// Kept verbatim, never parsed.
    #[serde(default)]
    pub release_date: Option<String>,
    /// Empty when the server has no artwork for the track.
    #[serde(default)]
    pub cover: String,
}

/// Playlist descriptor. Members are only reachable through
/// [`TrackList`](crate::clients::tracklist::TrackList).
#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Artists,
    #[serde(default)]
    pub cover: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackPage {
    pub track_list: Vec<Track>,
    /// Opaque cursor; `null` or absent on the last page.
    pub next_offset: Option<Value>,
}

impl TrackPage {
    /// The cursor as it goes back into the `offset` query parameter.
    pub fn next_cursor(&self) -> Option<String> {
        self.next_offset.as_ref().map(|cursor| match cursor {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamLink {
    pub link: String,
}
