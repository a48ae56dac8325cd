use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::clients::{
    entities::{Playlist, StreamLink, Track, TrackPage},
    errors::{Error, Result},
    tracklist::TrackList,
};

pub const DEFAULT_API_URL: &str = "https://api.spotifydown.com";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// Build the HTTP session shared by the catalog client and the asset fetcher.
///
/// The service only answers requests that look like they come from its own web page.
pub fn build_http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static("https://spotifydown.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://spotifydown.com"));

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// Metadata and stream-link queries against the remote API.
///
/// No caching and no retries: every call is one fresh request.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        CatalogClient { http, base_url }
    }

    // Create a client against the public API with a fresh HTTP session
    pub fn try_default() -> Result<Self> {
        let base_url = Url::parse(DEFAULT_API_URL)
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;
        Ok(Self::new(build_http_client()?, base_url))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn fetch_track(&self, track_id: &str) -> Result<Track> {
        self.get_json(&["metadata", "track", track_id], None).await
    }

    /// Fetch the playlist descriptor. Members are not included; see [`Self::track_list`].
    pub async fn fetch_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let mut playlist: Playlist = self
            .get_json(&["metadata", "playlist", playlist_id], None)
            .await?;
        // the descriptor endpoint does not echo the id back
        playlist.id = playlist_id.to_string();
        Ok(playlist)
    }

    /// Resolve the short-lived binary stream URL for a track.
    pub async fn stream_url(&self, track_id: &str) -> Result<String> {
        let link: StreamLink = self.get_json(&["download", track_id], None).await?;
        Ok(link.link)
    }

    /// Lazily enumerate the members of a playlist, starting at offset 0.
    pub fn track_list(&self, playlist_id: &str) -> TrackList {
        TrackList::new(self.clone(), playlist_id.to_string())
    }

    pub(crate) async fn fetch_track_page(&self, playlist_id: &str, offset: &str) -> Result<TrackPage> {
        self.get_json(&["trackList", "playlist", playlist_id], Some(offset))
            .await
    }

    fn endpoint(&self, segments: &[&str], offset: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::ConfigurationError(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if let Some(offset) = offset {
            url.query_pairs_mut()
                .append_pair("offset", offset);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], offset: Option<&str>) -> Result<T> {
        let url = self.endpoint(segments, offset)?;
        debug!("GET {url}");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            // error pages are rarely JSON; report them as transport failures
            Err(_) if !status.is_success() => {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => return Err(Error::Protocol(format!("{url}: {e}"))),
        };

        parse_envelope(value)
    }
}

/// Check the `success` flag every response carries, then decode the payload.
pub(crate) fn parse_envelope<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(serde_json::from_value(value)?),
        Some(false) => Err(Error::RemoteRejection(value)),
        None => Err(Error::Protocol(format!(
            "response has no boolean `success` field: {value}"
        ))),
    }
}
