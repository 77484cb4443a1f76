//! Grid and image sources: the map server and local files.
//!
//! Fetches are single attempts. Transport failures come back as the
//! underlying `reqwest` error, untouched.

use crate::grid::{Dimensions, OccupancyGrid};
use bytes::Bytes;
use image::ImageReader;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tokio::sync::oneshot;
use url::Url;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { url: Url, status: StatusCode },
    #[error("invalid map URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid grid JSON: {0}")]
    Parse(#[from] simd_json::Error),
    #[error("failed to read grid file: {0}")]
    Io(#[from] std::io::Error),
}

/// Grid JSON is either a bare code array or an object carrying its size
#[derive(Deserialize)]
#[serde(untagged)]
enum GridDocument {
    Bare(Vec<i32>),
    Sized {
        data: Vec<i32>,
        width: Option<usize>,
        height: Option<usize>,
    },
}

/// Parse grid JSON. Dimensions given by the caller take precedence over the document's.
pub fn parse_grid_json(mut bytes: Vec<u8>, dimensions: Dimensions) -> Result<OccupancyGrid, SourceError> {
    let document: GridDocument = simd_json::serde::from_slice(&mut bytes)?;
    let grid = match (document, dimensions) {
        (GridDocument::Bare(codes), dims) => OccupancyGrid::new(codes, dims),
        (GridDocument::Sized { data, .. }, dims @ Dimensions::Explicit { .. }) => {
            OccupancyGrid::new(data, dims)
        }
        (GridDocument::Sized { data, width, height }, Dimensions::InferSquare) => {
            OccupancyGrid::new(data, Dimensions::from_optional(width, height))
        }
    };
    Ok(grid)
}

/// Load an occupancy grid from a JSON file on disk
pub fn load_grid_file(path: &Path, dimensions: Dimensions) -> Result<OccupancyGrid, SourceError> {
    let grid = parse_grid_json(fs::read(path)?, dimensions)?;
    info!("loaded {} grid cells from {}", grid.codes.len(), path.display());
    Ok(grid)
}

/// Natural pixel size of an externally loaded image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDimension {
    pub w: u32,
    pub h: u32,
}

/// Resolve an image's natural size off the async runtime.
///
/// The receiver yields exactly once. It closes without a value when the bytes
/// are not a readable image. Must be called from within a tokio runtime.
pub fn image_dimensions(bytes: Bytes) -> oneshot::Receiver<ImageDimension> {
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let dims = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::from)
            .and_then(|reader| reader.into_dimensions());
        match dims {
            Ok((w, h)) => {
                let _ = tx.send(ImageDimension { w, h });
            }
            Err(e) => warn!("could not read image dimensions: {}", e),
        }
    });
    rx
}

/// Client for the map server's grid and image endpoints
pub struct MapClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl MapClient {
    /// `token` is sent verbatim as a bearer credential
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn map_url(&self, path: &str) -> Result<Url, SourceError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, SourceError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { url, status });
        }
        Ok(response.bytes().await?)
    }

    /// Fetch the server-rendered PNG for a map
    pub async fn fetch_image(&self, map_id: &str) -> Result<Bytes, SourceError> {
        let url = self.map_url(&format!("map/{map_id}"))?;
        let bytes = self.get_bytes(url).await?;
        info!("fetched {} image bytes for map {}", bytes.len(), map_id);
        Ok(bytes)
    }

    /// Fetch the raw occupancy grid for a map
    pub async fn fetch_grid(&self, map_id: &str, dimensions: Dimensions) -> Result<OccupancyGrid, SourceError> {
        let url = self.map_url(&format!("map/{map_id}/grid"))?;
        let bytes = self.get_bytes(url).await?;
        let grid = parse_grid_json(bytes.to_vec(), dimensions)?;
        info!("fetched {} grid cells for map {}", grid.codes.len(), map_id);
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{demo_grid, rasterize};
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, returning the raw request text
    async fn serve_once(status: &'static str, body: Vec<u8>) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/api/", listener.local_addr().unwrap())).unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (url, handle)
    }

    #[test]
    fn test_parse_bare_array() {
        let grid = parse_grid_json(b"[-1, 0, 100, 0]".to_vec(), Dimensions::InferSquare).unwrap();
        assert_eq!(grid.codes, vec![-1, 0, 100, 0]);
        assert_eq!(grid.dimensions, Dimensions::InferSquare);
    }

    #[test]
    fn test_parse_sized_document() {
        let json = br#"{"data": [0, 0, 0, 100, 100, 100], "width": 3, "height": 2}"#;
        let grid = parse_grid_json(json.to_vec(), Dimensions::InferSquare).unwrap();
        assert_eq!(grid.dimensions, Dimensions::Explicit { width: 3, height: 2 });
    }

    #[test]
    fn test_caller_dimensions_override_document() {
        let json = br#"{"data": [0, 0, 0, 0], "width": 4, "height": 1}"#;
        let dims = Dimensions::Explicit { width: 2, height: 2 };
        let grid = parse_grid_json(json.to_vec(), dims).unwrap();
        assert_eq!(grid.dimensions, dims);
    }

    #[test]
    fn test_malformed_grid() {
        assert!(matches!(
            parse_grid_json(b"[0, 1,".to_vec(), Dimensions::InferSquare),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_load_grid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"data": [0, 100, -1, 0, 0, 0], "width": 3, "height": 2}"#)
            .unwrap();
        let grid = load_grid_file(file.path(), Dimensions::InferSquare).unwrap();
        assert_eq!(grid.codes, vec![0, 100, -1, 0, 0, 0]);
        assert_eq!(grid.dimensions, Dimensions::Explicit { width: 3, height: 2 });
    }

    #[test]
    fn test_load_malformed_grid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"data\": [0, 100,").unwrap();
        assert!(matches!(
            load_grid_file(file.path(), Dimensions::InferSquare),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_grid_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_grid_file(&dir.path().join("absent.json"), Dimensions::InferSquare),
            Err(SourceError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_image_dimensions_resolve_once() {
        let png = demo_grid(7, 5).rasterize().unwrap().png;
        let dims = image_dimensions(Bytes::from(png)).await.unwrap();
        assert_eq!(dims, ImageDimension { w: 7, h: 5 });
    }

    #[tokio::test]
    async fn test_image_dimensions_closed_on_garbage() {
        let rx = image_dimensions(Bytes::from_static(b"not an image"));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_image_sends_bearer_token() {
        let png = rasterize(&[0, 100, -1, 0], Dimensions::InferSquare).unwrap().png;
        let (url, server) = serve_once("200 OK", png.clone()).await;
        let client = MapClient::new(url, "opaque-token");

        let bytes = client.fetch_image("plant-1").await.unwrap();
        assert_eq!(bytes.as_ref(), png.as_slice());

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/map/plant-1 "));
        assert!(request.to_lowercase().contains("authorization: bearer opaque-token"));
    }

    #[tokio::test]
    async fn test_fetch_grid_parses_body() {
        let body = br#"{"data": [0, 100, 100, 0], "width": 2, "height": 2}"#.to_vec();
        let (url, server) = serve_once("200 OK", body).await;
        let client = MapClient::new(url, "t");

        let grid = client.fetch_grid("plant-1", Dimensions::InferSquare).await.unwrap();
        assert_eq!(grid.codes, vec![0, 100, 100, 0]);
        assert!(server.await.unwrap().starts_with("GET /api/map/plant-1/grid "));
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let (url, _server) = serve_once("404 Not Found", Vec::new()).await;
        let client = MapClient::new(url, "t");
        let err = client.fetch_image("missing").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_transport_error_propagated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = MapClient::new(Url::parse(&format!("http://{addr}/")).unwrap(), "t");
        let err = client.fetch_image("any").await.unwrap_err();
        assert!(matches!(err, SourceError::Transport(_)));
    }
}
