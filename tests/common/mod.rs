#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Tag;
use rspotdown::clients::{AssetFetcher, CatalogClient};
use rspotdown::downloader::{ConfigBuilder, Downloader};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COVER: &[u8] = b"\xFF\xD8\xFF\xE0cover-bytes";

/// Silent MPEG-1 Layer III frames, enough for lofty to accept the file.
pub fn silent_mp3() -> Vec<u8> {
    const FRAME_LEN: usize = 417;
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    frame.repeat(40)
}

pub fn track_json(server: &MockServer, id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "album": format!("{title} album"),
        "artists": ["Artist A", "Artist B"],
        "cover": format!("{}/covers/{id}.jpg", server.uri()),
        "releaseDate": "2021-05-07"
    })
}

pub fn downloader(server: &MockServer, destination: &Path, concurrency: usize) -> Downloader {
    let http = reqwest::Client::new();
    let catalog = CatalogClient::new(http.clone(), Url::parse(&server.uri()).unwrap());
    let config = ConfigBuilder::new()
        .catalog(catalog)
        .fetcher(AssetFetcher::new(http))
        .destination(destination)
        .concurrency(concurrency)
        .build()
        .unwrap();
    Downloader::new(config)
}

pub async fn mount_track_metadata(server: &MockServer, id: &str, title: &str) {
    let mut body = track_json(server, id, title);
    body["success"] = json!(true);
    Mock::given(method("GET"))
        .and(path(format!("/metadata/track/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_playlist_metadata(server: &MockServer, id: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/metadata/playlist/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "title": title,
            "artists": "Curator",
            "cover": format!("{}/covers/{id}.jpg", server.uri())
        })))
        .mount(server)
        .await;
}

/// Mount one page of a playlist. `next_offset` of `None` marks the last page.
pub async fn mount_page(
    server: &MockServer,
    playlist_id: &str,
    offset: u64,
    tracks: &[(&str, &str)],
    next_offset: Option<u64>,
) {
    let track_list: Vec<Value> = tracks
        .iter()
        .map(|(id, title)| track_json(server, id, title))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/trackList/playlist/{playlist_id}")))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "trackList": track_list,
            "nextOffset": next_offset
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount stream-link resolution, audio and cover for a track.
///
/// `expected` is the number of times each endpoint must be hit.
pub async fn mount_assets(server: &MockServer, id: &str, delay: Duration, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "link": format!("{}/audio/{id}.mp3", server.uri())
        })))
        .expect(expected)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/audio/{id}.mp3")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(silent_mp3())
                .set_delay(delay),
        )
        .expect(expected)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/covers/{id}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(COVER))
        .expect(expected)
        .mount(server)
        .await;
}

pub fn read_tag(path: &Path) -> Tag {
    let tagged_file = Probe::open(path).unwrap().read().unwrap();
    tagged_file.primary_tag().unwrap().clone()
}
