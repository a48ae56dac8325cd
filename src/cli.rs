use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use rspotdown::clients::{
    CatalogClient, Link,
    catalog::{DEFAULT_API_URL, build_http_client},
    errors::{Error, Result},
    link::LINK_PREFIX,
};
use rspotdown::downloader::{ConfigBuilder, DownloadReport, Downloader};
use serde::Deserialize;
use url::Url;

const API_URL_ENV: &str = "RSPOTDOWN_API_URL";

#[derive(Parser)]
#[command(name = "rspotdown")]
#[command(version, about = "Download Spotify tracks and playlists as tagged mp3 files", long_about = None)]
struct Cli {
    /// Track or playlist link; prompted for when omitted
    link: Option<String>,

    /// Directory the mp3 files are written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Number of tracks downloaded at the same time
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    download_path: Option<PathBuf>,
    concurrency: Option<usize>,
    api_url: Option<String>,
}

// Settings after merging flags, environment and config file
#[derive(Debug, PartialEq)]
struct Settings {
    destination: Option<PathBuf>,
    concurrency: Option<usize>,
    api_url: String,
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigurationError(format!("{}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config file at {}, using defaults", path.display());
            Ok(FileConfig::default())
        }
        Err(e) => Err(Error::ConfigurationError(format!(
            "{}: {e}",
            path.display()
        ))),
    }
}

fn resolve_settings(cli: &Cli, file: FileConfig, env_api_url: Option<String>) -> Settings {
    Settings {
        destination: cli.output.clone().or(file.download_path),
        concurrency: cli.concurrency.or(file.concurrency),
        api_url: env_api_url
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
    }
}

fn prompt_for_link() -> Result<String> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter playlist link or song link: ");
        std::io::stdout()
            .flush()
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;
        let Some(line) = lines.next() else {
            return Err(Error::InvalidLink("no link given".into()));
        };
        let line = line.map_err(|e| Error::ConfigurationError(e.to_string()))?;
        if line.trim().to_lowercase().starts_with(LINK_PREFIX) {
            return Ok(line.trim().to_string());
        }
        println!("Invalid link. Try again.");
    }
}

pub async fn run() -> Result<DownloadReport> {
    let cli = Cli::parse();

    let file = load_file_config(&cli.config)?;
    let settings = resolve_settings(&cli, file, std::env::var(API_URL_ENV).ok());

    let link = match &cli.link {
        Some(link) => link.clone(),
        None => tokio::task::spawn_blocking(prompt_for_link).await??,
    };
    let link = Link::parse(&link)?;

    info!("Building config ...");
    let api_url = Url::parse(&settings.api_url)
        .map_err(|e| Error::ConfigurationError(format!("{}: {e}", settings.api_url)))?;
    // one HTTP session for the whole run, dropped when `run` returns
    let catalog = CatalogClient::new(build_http_client()?, api_url);
    let mut builder = ConfigBuilder::new().catalog(catalog);
    if let Some(destination) = settings.destination {
        builder = builder.destination(destination);
    }
    if let Some(concurrency) = settings.concurrency {
        builder = builder.concurrency(concurrency);
    }
    let config = builder.build()?;
    info!("Saving to {}", config.destination.display());

    let downloader = Downloader::new(config);
    let report = downloader.download(&link).await?;

    for failed in &report.failed {
        warn!("{} ({}): {}", failed.title, failed.track_id, failed.error);
    }
    if let Some(e) = &report.enumeration_error {
        warn!("Playlist listing stopped early: {e}");
    }
    info!(
        "Finished: {} downloaded, {} already present, {} failed",
        report.downloaded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}
