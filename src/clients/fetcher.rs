use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use log::debug;

use crate::clients::errors::{Error, Result};

/// Upper bound on the size of a single chunk handed to callers.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Raw byte retrieval for audio streams and cover images.
#[derive(Clone)]
pub struct AssetFetcher {
    http: reqwest::Client,
}

impl AssetFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        AssetFetcher { http }
    }

    /// Start a download and return its body as a stream of chunks.
    ///
    /// Anything other than `200 OK` fails with the response body attached.
    pub async fn fetch(&self, url: &str) -> Result<BoxStream<'static, Result<Bytes>>> {
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(Error::from)
            .map_ok(|chunk| stream::iter(split_chunk(chunk).into_iter().map(Ok::<_, Error>)))
            .try_flatten()
            .boxed())
    }

    /// Download a small asset (cover art) fully into memory.
    pub async fn fetch_all(&self, url: &str) -> Result<Vec<u8>> {
        let chunks = self.fetch(url).await?;
        chunks
            .try_fold(Vec::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await
    }
}

fn split_chunk(mut chunk: Bytes) -> Vec<Bytes> {
    let mut pieces = Vec::with_capacity(chunk.len() / MAX_CHUNK_SIZE + 1);
    while chunk.len() > MAX_CHUNK_SIZE {
        pieces.push(chunk.split_to(MAX_CHUNK_SIZE));
    }
    if !chunk.is_empty() {
        pieces.push(chunk);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn split_chunk_bounds_every_piece() {
        let chunk = Bytes::from(vec![7u8; MAX_CHUNK_SIZE * 2 + 10]);
        let pieces = split_chunk(chunk);
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.len() <= MAX_CHUNK_SIZE));
        assert_eq!(pieces.iter().map(Bytes::len).sum::<usize>(), MAX_CHUNK_SIZE * 2 + 10);
    }

    #[test]
    fn split_chunk_drops_empty() {
        assert!(split_chunk(Bytes::new()).is_empty());
    }

    #[tokio::test]
    async fn fetch_all_collects_body() {
        let server = MockServer::start().await;
        let body = vec![1u8; MAX_CHUNK_SIZE + 3];
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let fetcher = AssetFetcher::new(reqwest::Client::new());
        let bytes = fetcher
            .fetch_all(&format!("{}/cover.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, body);
    }

    #[tokio::test]
    async fn non_ok_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.mp3"))
            .respond_with(ResponseTemplate::new(404).set_body_string("link expired"))
            .mount(&server)
            .await;

        let fetcher = AssetFetcher::new(reqwest::Client::new());
        let err = fetcher
            .fetch_all(&format!("{}/gone.mp3", server.uri()))
            .await
            .unwrap_err();
        match err {
            Error::HttpStatus { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "link expired");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
        assert!(fetcher.fetch_all("http://127.0.0.1:1/x").await.unwrap_err().is_transport());
    }
}
