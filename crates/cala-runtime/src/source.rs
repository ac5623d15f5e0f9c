//! Where module bytes come from.
//!
//! A source yields the module as a stream of chunks so the streaming
//! strategy can start validating before the last byte arrives. The
//! buffered strategy simply collects the stream.

use crate::error::SourceError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Chunks of a module body, in order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, SourceError>>;

/// Default read size for file sources.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A place a module can be fetched from.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Start fetching. Errors that happen before the first byte (missing
    /// file, refused connection, non-2xx status) are returned here; later
    /// ones arrive through the stream.
    async fn fetch(&self) -> Result<ChunkStream, SourceError>;
}

/// Collect a whole module body into memory.
pub async fn fetch_all(source: &dyn ModuleSource) -> Result<Vec<u8>, SourceError> {
    let mut chunks = source.fetch().await?;
    let mut bytes = Vec::new();
    while let Some(chunk) = chunks.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(bytes)
}

/// A module file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    chunk_size: usize,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the read size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ModuleSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(self.name.clone())
            } else {
                SourceError::Io {
                    path: self.name.clone(),
                    source: e,
                }
            }
        })?;

        let chunk_size = self.chunk_size;
        let path = self.name.clone();
        let chunks = stream::unfold(Some(file), move |state| {
            let path = path.clone();
            async move {
                let mut file = state?;
                let mut buf = vec![0u8; chunk_size];
                match file.read(&mut buf).await {
                    Ok(0) => None,
                    Ok(n) => {
                        buf.truncate(n);
                        Some((Ok(buf), Some(file)))
                    }
                    Err(e) => Some((Err(SourceError::Io { path, source: e }), None)),
                }
            }
        });
        Ok(chunks.boxed())
    }
}

/// Module bytes already in memory, served in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    bytes: Vec<u8>,
    chunk_size: usize,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            chunk_size: bytes.len().max(1),
            bytes,
        }
    }

    /// Split the body into chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl ModuleSource for BytesSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        let chunks: Vec<Result<Vec<u8>, SourceError>> = self
            .bytes
            .chunks(self.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// A module served over HTTP(S).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: reqwest::Url,
    name: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(url: &str) -> Result<Self, SourceError> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| SourceError::InvalidLocation(format!("{}: {}", url, e)))?;
        Ok(Self::from_url(url))
    }

    /// Resolve `file` against `origin`, the way a page fetches a module
    /// sitting next to it.
    pub fn same_origin(origin: &str, file: &str) -> Result<Self, SourceError> {
        let base = reqwest::Url::parse(origin)
            .map_err(|e| SourceError::InvalidLocation(format!("{}: {}", origin, e)))?;
        let url = base
            .join(file)
            .map_err(|e| SourceError::InvalidLocation(format!("{}: {}", file, e)))?;
        Ok(Self::from_url(url))
    }

    fn from_url(url: reqwest::Url) -> Self {
        Self {
            name: url.to_string(),
            url,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl ModuleSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<ChunkStream, SourceError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let chunks = stream::unfold(Some(response), |state| async move {
            let mut response = state?;
            match response.chunk().await {
                Ok(Some(bytes)) => Some((Ok(bytes.to_vec()), Some(response))),
                Ok(None) => None,
                Err(e) => Some((Err(SourceError::Network(e.to_string())), None)),
            }
        });
        Ok(chunks.boxed())
    }
}

/// Pick a source for a location string: `http://` and `https://` URLs go
/// over the network, anything else is a file path.
pub fn source_for(location: &str) -> Result<Box<dyn ModuleSource>, SourceError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return http_source(location);
    }
    Ok(Box::new(FileSource::new(location)))
}

#[cfg(feature = "http")]
fn http_source(location: &str) -> Result<Box<dyn ModuleSource>, SourceError> {
    Ok(Box::new(HttpSource::new(location)?))
}

#[cfg(not(feature = "http"))]
fn http_source(location: &str) -> Result<Box<dyn ModuleSource>, SourceError> {
    Err(SourceError::InvalidLocation(format!(
        "{} (built without the `http` feature)",
        location
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn bytes_source_chunks_in_order() {
        let source = BytesSource::new("mem", (0u8..10).collect::<Vec<_>>()).with_chunk_size(4);
        let chunks: Vec<Vec<u8>> = source
            .fetch()
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[tokio::test]
    async fn file_source_reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        file.write_all(&body).unwrap();

        let source = FileSource::new(file.path()).with_chunk_size(128);
        assert_eq!(fetch_all(&source).await.unwrap(), body);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("cala.wasm"));
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn plain_paths_become_file_sources() {
        let source = source_for("build/cala.wasm").unwrap();
        assert_eq!(source.name(), "build/cala.wasm");
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn urls_need_the_http_feature() {
        assert!(matches!(
            source_for("https://example.com/cala.wasm"),
            Err(SourceError::InvalidLocation(_))
        ));
    }

    #[cfg(feature = "http")]
    #[test]
    fn same_origin_joins_the_file_name() {
        let source = HttpSource::same_origin("https://example.com/app/", "cala.wasm").unwrap();
        assert_eq!(source.url().as_str(), "https://example.com/app/cala.wasm");
    }

    /// Serve one HTTP response on a local port and return the base URL.
    #[cfg(feature = "http")]
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let origin = serve_once("404 Not Found", b"<h1>Not Found</h1>".to_vec()).await;
        let source = HttpSource::same_origin(&origin, "cala.wasm").unwrap();
        match source.fetch().await {
            Err(SourceError::Status { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/cala.wasm"));
            }
            Err(other) => panic!("expected a status error, got {}", other),
            Ok(_) => panic!("expected a status error, got a body"),
        }
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn success_streams_the_exact_body() {
        let body: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        let origin = serve_once("200 OK", body.clone()).await;
        let source = source_for(&format!("{}cala.wasm", origin)).unwrap();
        assert_eq!(fetch_all(source.as_ref()).await.unwrap(), body);
    }
}
