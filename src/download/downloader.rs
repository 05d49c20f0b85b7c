//! Streaming media download under the media retry policy.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use filetime::FileTime;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, LAST_MODIFIED};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use crate::descriptor::FileDescriptor;
use crate::events::EventSink;
use crate::fetch::{FetchError, RetryPolicy, build_client, run_with_retry};
use crate::user_agent::ACCEPT_MEDIA;

/// Connect timeout for media downloads.
pub const MEDIA_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for media downloads (large videos take a while).
pub const MEDIA_READ_TIMEOUT_SECS: u64 = 300;

/// Downloads full-size media files to disk.
///
/// Each attempt starts from scratch: a partially written file is removed
/// before the next attempt. Nothing is resumed.
pub struct MediaDownloader {
    client: Client,
    policy: RetryPolicy,
    simulate: bool,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for MediaDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDownloader")
            .field("policy", &self.policy)
            .field("simulate", &self.simulate)
            .finish_non_exhaustive()
    }
}

impl MediaDownloader {
    /// Creates a downloader with the media timeouts.
    ///
    /// With `simulate` set, [`download`](Self::download) succeeds without
    /// touching the network or the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(
        policy: RetryPolicy,
        simulate: bool,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(MEDIA_CONNECT_TIMEOUT_SECS, MEDIA_READ_TIMEOUT_SECS)?,
            policy,
            simulate,
            events,
        })
    }

    /// Whether downloads are simulated.
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    /// Downloads `file` to `destination`, creating its parent directory.
    ///
    /// When the response carries a valid `Last-Modified` header the file's
    /// modification time is set to it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the directory or file cannot be
    /// written, and the last transport or status error once the media
    /// policy's attempts are exhausted.
    #[instrument(skip(self, file, destination), fields(url = %file.url(), path = %destination.display()))]
    pub async fn download(&self, file: &FileDescriptor, destination: &Path) -> Result<(), FetchError> {
        self.events.download_started(file, destination);
        if self.simulate {
            debug!("simulated download");
            self.events.download_finished(file, destination);
            return Ok(());
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        let modified = run_with_retry(&self.policy, file.url(), |attempt| async move {
            debug!(attempt, "downloading");
            self.fetch_once(file.url(), destination).await
        })
        .await?;

        if let Some(modified) = modified {
            filetime::set_file_mtime(destination, FileTime::from_system_time(modified))
                .map_err(|e| FetchError::io(destination, e))?;
        }

        self.events.download_finished(file, destination);
        Ok(())
    }

    /// One download attempt. Returns the parsed `Last-Modified` time.
    async fn fetch_once(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<Option<SystemTime>, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_MEDIA)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok());

        let mut out = File::create(destination)
            .await
            .map_err(|e| FetchError::io(destination, e))?;

        if let Err(e) = stream_to_file(&mut out, response, url, destination).await {
            drop(out);
            debug!(path = %destination.display(), "removing partial file after error");
            let _ = tokio::fs::remove_file(destination).await;
            return Err(e);
        }

        Ok(modified)
    }
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| FetchError::io(path, e))?;
    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::events::NoopEvents;
    use crate::events::recording::RecordingEvents;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    /// Serves raw HTTP on localhost. The first `truncated` connections
    /// announce 100 bytes but send `partial` and hang up; later ones send
    /// `full`. Returns the base URL and a connection counter.
    async fn serve_truncated(truncated: usize) -> Option<(String, Arc<AtomicUsize>)> {
        if crate::test_support::socket_guard::should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response: &[u8] = if hit < truncated {
                    b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial"
                } else {
                    b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nfull"
                };
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });

        Some((format!("http://{addr}"), hits))
    }

    fn downloader(simulate: bool) -> MediaDownloader {
        MediaDownloader::new(
            RetryPolicy::new(3, Duration::ZERO),
            simulate,
            Arc::new(NoopEvents),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_content() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/albums/a/img.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("img.jpg");
        let file = FileDescriptor::from_url(format!("{}/albums/a/img.jpg", server.uri()));
        downloader(false).download(&file, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_download_sets_mtime_from_last_modified() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/old.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
                    .set_body_bytes(b"x".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("old.jpg");
        let file = FileDescriptor::from_url(format!("{}/old.jpg", server.uri()));
        downloader(false).download(&file, &dest).await.unwrap();

        let modified = std::fs::metadata(&dest).unwrap().modified().unwrap();
        assert_eq!(
            modified.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            1_445_412_480
        );
    }

    #[tokio::test]
    async fn test_download_without_last_modified_keeps_fresh_mtime() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/new.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("new.jpg");
        let before = SystemTime::now() - Duration::from_secs(60);
        let file = FileDescriptor::from_url(format!("{}/new.jpg", server.uri()));
        downloader(false).download(&file, &dest).await.unwrap();

        let modified = std::fs::metadata(&dest).unwrap().modified().unwrap();
        assert!(modified > before);
    }

    #[tokio::test]
    async fn test_download_simulate_makes_no_request_and_writes_nothing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("img.jpg");
        let events = Arc::new(RecordingEvents::default());
        let sim = MediaDownloader::new(RetryPolicy::default(), true, events.clone()).unwrap();
        assert!(sim.is_simulating());
        let file = FileDescriptor::from_url(format!("{}/img.jpg", server.uri()));
        sim.download(&file, &dest).await.unwrap();

        assert!(!dest.exists());
        assert!(!dir.path().join("nested").exists());
        assert_eq!(
            events.take(),
            vec!["download_started img.jpg", "download_finished img.jpg"]
        );
    }

    #[tokio::test]
    async fn test_download_retries_after_server_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("flaky.jpg");
        let file = FileDescriptor::from_url(format!("{}/flaky.jpg", server.uri()));
        downloader(false).download(&file, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_download_exhausted_leaves_no_file() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("gone.jpg");
        let file = FileDescriptor::from_url(format!("{}/gone.jpg", server.uri()));
        let result = downloader(false).download(&file, &dest).await;

        match result {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_truncated_body_restarts_from_scratch() {
        let Some((base, hits)) = serve_truncated(1).await else {
            return;
        };

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("cut.jpg");
        let file = FileDescriptor::from_url(format!("{base}/cut.jpg"));
        downloader(false).download(&file, &dest).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::read(&dest).unwrap(), b"full");
    }

    #[tokio::test]
    async fn test_download_truncated_body_exhausted_leaves_no_file() {
        let Some((base, hits)) = serve_truncated(usize::MAX).await else {
            return;
        };

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("cut.jpg");
        let file = FileDescriptor::from_url(format!("{base}/cut.jpg"));
        let two_attempts = MediaDownloader::new(
            RetryPolicy::new(2, Duration::ZERO),
            false,
            Arc::new(NoopEvents),
        )
        .unwrap();
        let result = two_attempts.download(&file, &dest).await;

        assert!(
            matches!(result, Err(FetchError::Network { .. })),
            "Expected Network error, got: {result:?}"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_creates_nested_directories() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("Trip").join("Day 1").join("a.jpg");
        let file = FileDescriptor::from_url(format!("{}/a.jpg", server.uri()));
        downloader(false).download(&file, &dest).await.unwrap();
        assert!(dest.exists());
    }
}
