use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Semaphore, mpsc::UnboundedSender};
use tokio::task::JoinSet;

use crate::clients::{
    AssetFetcher, CatalogClient, FileSink, Link, Placement,
    entities::Track,
    errors::{Error, Result},
    file_sink::Claim,
    naming::{sanitize_filename, track_filename},
    tagger::{self, TrackTags},
};

pub const DEFAULT_CONCURRENCY: usize = 2;

// Configuration for the Downloader struct
pub struct Config {
    pub catalog: CatalogClient,
    pub fetcher: AssetFetcher,
    pub destination: PathBuf,
    pub concurrency: usize,
    pub sanitize: fn(&str) -> String,
}

#[derive(Default)]
pub struct ConfigBuilder {
    catalog: Option<CatalogClient>,
    fetcher: Option<AssetFetcher>,
    destination: Option<PathBuf>,
    concurrency: Option<usize>,
    sanitize: Option<fn(&str) -> String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn catalog(mut self, catalog: CatalogClient) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: AssetFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    #[must_use]
    pub fn sanitizer(mut self, sanitize: fn(&str) -> String) -> Self {
        self.sanitize = Some(sanitize);
        self
    }

    pub fn build(self) -> Result<Config> {
        let catalog = match self.catalog {
            Some(c) => c,
            None => CatalogClient::try_default()?,
        };
        // Reuse the catalog's HTTP session unless told otherwise
        let fetcher = match self.fetcher {
            Some(f) => f,
            None => AssetFetcher::new(catalog.http().clone()),
        };
        let destination = match self.destination {
            Some(d) => d,
            None => dirs::audio_dir().ok_or_else(|| {
                Error::ConfigurationError(
                    "No download path configured and no music directory found".into(),
                )
            })?,
        };
        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(Error::ConfigurationError(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(Config {
            catalog,
            fetcher,
            destination,
            concurrency,
            sanitize: self.sanitize.unwrap_or(sanitize_filename),
        })
    }
}

/// How a single track's download ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Downloaded,
    AlreadyExists,
    Failed,
}

/// Lifecycle notifications for download units.
///
/// `Started` is sent once the unit holds an admission slot and `Finished`
/// before the slot is given back, so counting them tracks the units in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitEvent {
    Started { track_id: String },
    Finished { track_id: String, status: UnitStatus },
}

#[derive(Debug)]
pub struct FailedTrack {
    pub track_id: String,
    pub title: String,
    pub error: Error,
}

/// Aggregate outcome of a run. Individual failures never abort the run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedTrack>,
    /// Set when a playlist page could not be fetched; members before it were still downloaded.
    pub enumeration_error: Option<Error>,
}

impl DownloadReport {
    fn record(&mut self, track_id: String, title: String, result: Result<Placement>) {
        match result {
            Ok(Placement::Written(path)) => self.downloaded.push(path),
            Ok(Placement::AlreadyExists(path)) => self.skipped.push(path),
            Err(error) => {
                warn!("Failed to download {title} ({track_id}): {error}");
                self.failed.push(FailedTrack {
                    track_id,
                    title,
                    error,
                });
            }
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded.len() + self.skipped.len() + self.failed.len()
    }

    /// `true` when nothing failed, enumeration included.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.enumeration_error.is_none()
    }
}

// Everything a unit needs, cheap to clone into a spawned task
#[derive(Clone)]
struct Pipeline {
    catalog: CatalogClient,
    fetcher: AssetFetcher,
    sanitize: fn(&str) -> String,
    gate: Arc<Semaphore>,
    events: Option<UnboundedSender<UnitEvent>>,
}

impl Pipeline {
    fn emit(&self, event: UnitEvent) {
        if let Some(tx) = &self.events {
            // a receiver that went away only loses notifications
            let _ = tx.send(event);
        }
    }

    async fn unit(&self, sink: &FileSink, track: &Track) -> Result<Placement> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::TaskAborted(e.to_string()))?;
        debug!("Slot acquired for {}", track.id);
        self.emit(UnitEvent::Started {
            track_id: track.id.clone(),
        });

        let result = self.fetch_and_tag(sink, track).await;

        let status = match &result {
            Ok(Placement::Written(_)) => UnitStatus::Downloaded,
            Ok(Placement::AlreadyExists(_)) => UnitStatus::AlreadyExists,
            Err(_) => UnitStatus::Failed,
        };
        self.emit(UnitEvent::Finished {
            track_id: track.id.clone(),
            status,
        });
        result
    }

    async fn fetch_and_tag(&self, sink: &FileSink, track: &Track) -> Result<Placement> {
        let filename = track_filename(self.sanitize, &track.title);
        let mut pending = match sink.claim(&filename).await? {
            Claim::Occupied(path) => {
                warn!("{} already exists, skipping", track.title);
                return Ok(Placement::AlreadyExists(path));
            }
            Claim::Vacant(pending) => pending,
        };

        info!("Downloading: {}", track.title);
        let stream_url = self.catalog.stream_url(&track.id).await?;

        let audio = async {
            let chunks = self.fetcher.fetch(&stream_url).await?;
            pending.write_all(chunks).await
        };
        let cover = async {
            if track.cover.is_empty() {
                Ok(Vec::new())
            } else {
                self.fetcher.fetch_all(&track.cover).await
            }
        };
        // on failure `pending` is dropped here and the temporary file with it
        let ((), cover) = tokio::try_join!(audio, cover)?;

        let tag_path = pending.part_path().to_path_buf();
        let (title, artists, album) = (
            track.title.clone(),
            track.artists.clone(),
            track.album.clone(),
        );
        let tagged = tokio::task::spawn_blocking(move || {
            tagger::embed(
                &tag_path,
                &TrackTags {
                    title: &title,
                    artists: &artists,
                    album: &album,
                    cover: &cover,
                },
            )
        })
        .await?;

        let path = match tagged {
            Ok(()) => pending.commit().await?,
            // a payload that is not audio is still kept, untagged, under its final name
            Err(Error::CorruptArtifact { reason, .. }) => {
                let path = pending.commit().await?;
                return Err(Error::CorruptArtifact { path, reason });
            }
            Err(e) => return Err(e),
        };

        info!("Done downloading: {}", track.title);
        Ok(Placement::Written(path))
    }
}

// The main Downloader struct that drives fetch-download-tag units
pub struct Downloader {
    pipeline: Pipeline,
    destination: PathBuf,
}

impl Downloader {
    pub fn new(config: Config) -> Self {
        Downloader {
            pipeline: Pipeline {
                catalog: config.catalog,
                fetcher: config.fetcher,
                sanitize: config.sanitize,
                gate: Arc::new(Semaphore::new(config.concurrency)),
                events: None,
            },
            destination: config.destination,
        }
    }

    /// Send [`UnitEvent`]s for every unit to `events`.
    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<UnitEvent>) -> Self {
        self.pipeline.events = Some(events);
        self
    }

    pub async fn download(&self, link: &Link) -> Result<DownloadReport> {
        match link {
            Link::Track(id) => self.download_track(id).await,
            Link::Playlist(id) => self.download_playlist(id).await,
        }
    }

    /// Download one track into the destination root.
    ///
    /// A failed metadata lookup fails the call; a failed download is reported.
    pub async fn download_track(&self, track_id: &str) -> Result<DownloadReport> {
        let track = self.pipeline.catalog.fetch_track(track_id).await?;
        let sink = FileSink::new(&self.destination);

        let mut report = DownloadReport::default();
        let result = self.pipeline.unit(&sink, &track).await;
        report.record(track.id, track.title, result);
        Ok(report)
    }

    /// Download every member of a playlist into `{destination}/{playlist title}/`.
    ///
    /// Units are submitted as members are enumerated and run with at most
    /// `concurrency` in flight. The call returns once every submitted unit
    /// has finished, whatever the individual outcomes.
    pub async fn download_playlist(&self, playlist_id: &str) -> Result<DownloadReport> {
        let playlist = self.pipeline.catalog.fetch_playlist(playlist_id).await?;
        info!(
            "Downloading playlist {} by {}",
            playlist.title,
            playlist.artists.display()
        );
        let sink = FileSink::new(
            self.destination
                .join((self.pipeline.sanitize)(&playlist.title)),
        );

        let mut report = DownloadReport::default();
        let mut units = JoinSet::new();
        let mut submitted = HashMap::new();
        let mut tracks = self.pipeline.catalog.track_list(&playlist.id);

        while let Some(next) = tracks.next_track().await {
            let track = match next {
                Ok(track) => track,
                Err(e) => {
                    warn!("Stopped listing playlist {}: {e}", playlist.title);
                    report.enumeration_error = Some(e);
                    break;
                }
            };

            let pipeline = self.pipeline.clone();
            let sink = sink.clone();
            let key = (track.id.clone(), track.title.clone());
            let handle = units.spawn(async move {
                let result = pipeline.unit(&sink, &track).await;
                (track, result)
            });
            submitted.insert(handle.id(), key);
        }
        debug!("Submitted {} units for {}", submitted.len(), playlist.title);

        while let Some(joined) = units.join_next_with_id().await {
            match joined {
                Ok((_, (track, result))) => report.record(track.id, track.title, result),
                Err(e) => {
                    let (track_id, title) = submitted.remove(&e.id()).unwrap_or_default();
                    report.record(track_id, title, Err(Error::from(e)));
                }
            }
        }

        info!(
            "Playlist {} finished: {} downloaded, {} already present, {} failed",
            playlist.title,
            report.downloaded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
