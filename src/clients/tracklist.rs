use std::collections::VecDeque;

use log::debug;

use crate::clients::{catalog::CatalogClient, entities::Track, errors::Result};

enum Cursor {
    At(String),
    Exhausted,
}

/// Forward-only walk over the members of a playlist.
///
/// Pages are requested on demand with the offset the server handed back with
/// the previous page. The walk ends when a page comes back without a next
/// offset, or at the first failed page; after either, `next_track` keeps
/// returning `None`. Start over with [`CatalogClient::track_list`].
pub struct TrackList {
    catalog: CatalogClient,
    playlist_id: String,
    buffered: VecDeque<Track>,
    cursor: Cursor,
}

impl TrackList {
    pub(crate) fn new(catalog: CatalogClient, playlist_id: String) -> Self {
        TrackList {
            catalog,
            playlist_id,
            buffered: VecDeque::new(),
            cursor: Cursor::At("0".to_string()),
        }
    }

    /// Produce the next member, `None` at the end, or the error of the page that failed.
    pub async fn next_track(&mut self) -> Option<Result<Track>> {
        loop {
            if let Some(track) = self.buffered.pop_front() {
                return Some(Ok(track));
            }

            let Cursor::At(offset) = &self.cursor else {
                return None;
            };

            debug!("Fetching page of playlist {} at offset {offset}", self.playlist_id);
            match self.catalog.fetch_track_page(&self.playlist_id, offset).await {
                Ok(page) => {
                    self.cursor = match page.next_cursor() {
                        Some(next) => Cursor::At(next),
                        None => Cursor::Exhausted,
                    };
                    self.buffered.extend(page.track_list);
                }
                Err(e) => {
                    self.cursor = Cursor::Exhausted;
                    return Some(Err(e));
                }
            }
        }
    }
}
