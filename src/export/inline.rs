//! Image inlining: replace external image references with `data:` URIs.
//!
//! Every conversion is best-effort. A source that cannot be loaded, decoded
//! or fetched in time keeps its original reference and the export carries on.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as Base64Engine;
use futures::future::{join_all, BoxFuture};
use log::{debug, warn};
use url::Url;

use crate::document::{ImageRole, RenderedDocument};
use crate::{Error, Result};

pub trait ImageLoader: Send + Sync {
    /// Fetch the raw bytes behind an image reference
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Reads images from the local filesystem, relative to a base directory
pub struct FsImageLoader {
    base: PathBuf,
}

impl FsImageLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FsImageLoader { base: base.into() }
    }

    pub async fn load_path(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.base.join(path);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::ImageLoad(format!("{}: {}", path.display(), e)))
    }
}

impl ImageLoader for FsImageLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move { self.load_path(Path::new(src)).await })
    }
}

/// Fetches images over HTTP(S)
#[cfg(feature = "http")]
pub struct HttpImageLoader {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpImageLoader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageLoader for HttpImageLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let resp = self.client.get(src).send().await?.error_for_status()?;
            Ok(resp.bytes().await?.to_vec())
        })
    }
}

#[derive(Debug, Clone)]
enum AssetBase {
    Dir(PathBuf),
    Url(Url),
}

/// Resolves image references against an asset base and dispatches on scheme:
/// `http(s)` goes to the network, `file` and bare paths to the filesystem.
pub struct AssetLoader {
    base: AssetBase,
    fs: FsImageLoader,
    #[cfg(feature = "http")]
    http: Option<HttpImageLoader>,
}

impl AssetLoader {
    /// `base` is a URL (`https://...`, `file:///...`) or a directory; `None`
    /// means the current directory.
    pub fn new(base: Option<&str>) -> Self {
        let base = match base {
            Some(b) => match Url::parse(b) {
                Ok(u) if u.scheme().len() > 1 => AssetBase::Url(u),
                _ => AssetBase::Dir(PathBuf::from(b)),
            },
            None => AssetBase::Dir(PathBuf::from(".")),
        };
        Self {
            base,
            fs: FsImageLoader::new(""),
            #[cfg(feature = "http")]
            http: HttpImageLoader::new()
                .map_err(|e| warn!("remote images disabled: {}", e))
                .ok(),
        }
    }

    async fn load_url(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::ImageLoad(format!("{} is not a local path", url)))?;
                self.fs.load_path(&path).await
            }
            #[cfg(feature = "http")]
            "http" | "https" => match &self.http {
                Some(http) => http.load(url.as_str()).await,
                None => Err(Error::ImageLoad(format!("no HTTP client for {}", url))),
            },
            other => Err(Error::ImageLoad(format!("unsupported scheme {} in {}", other, url))),
        }
    }
}

impl ImageLoader for AssetLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            if let Ok(url) = Url::parse(src) {
                if url.scheme().len() > 1 {
                    return self.load_url(&url).await;
                }
            }
            match &self.base {
                AssetBase::Dir(dir) => self.fs.load_path(&dir.join(src)).await,
                AssetBase::Url(base) => {
                    let url = base
                        .join(src)
                        .map_err(|e| Error::ImageLoad(format!("cannot resolve {} against {}: {}", src, base, e)))?;
                    self.load_url(&url).await
                }
            }
        })
    }
}

/// Decode the payload of a base64 `data:` URI
pub fn decode_data_uri(src: &str) -> Option<Vec<u8>> {
    let rest = src.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload.trim()).ok()
}

/// Decode image bytes of any supported format and re-encode as a PNG data URI
pub fn to_png_data_uri(bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(bytes)?;
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageOutputFormat::Png)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(png.into_inner());
    Ok(format!("data:image/png;base64,{}", b64))
}

/// Counts of what happened to each image during inlining
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineSummary {
    pub inlined: usize,
    pub already_inline: usize,
    pub failed: usize,
}

async fn convert(loader: &dyn ImageLoader, src: &str, timeout: Option<Duration>) -> Result<String> {
    let work = async {
        let bytes = loader.load(src).await?;
        to_png_data_uri(&bytes)
    };
    match timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| Error::Timeout(limit.as_millis() as u64))?,
        None => work.await,
    }
}

/// Inline every external image of `document` concurrently.
///
/// Returns once every conversion has settled. Failed conversions leave the
/// original reference in place.
pub async fn inline_images(
    document: &RenderedDocument,
    loader: &dyn ImageLoader,
    timeout: Option<Duration>,
) -> (RenderedDocument, InlineSummary) {
    let mut summary = InlineSummary::default();
    let pending: Vec<(ImageRole, String)> = document
        .images()
        .iter()
        .filter(|img| {
            if img.is_inline() {
                summary.already_inline += 1;
                false
            } else {
                true
            }
        })
        .map(|img| (img.role, img.src.clone()))
        .collect();

    let results = join_all(pending.iter().map(|(role, src)| async move {
        (*role, src.as_str(), convert(loader, src, timeout).await)
    }))
    .await;

    let mut out = document.clone();
    for (role, src, result) in results {
        match result {
            Ok(data_uri) => {
                debug!("inlined {} ({} bytes)", src, data_uri.len());
                out = out.with_image_source(role, data_uri);
                summary.inlined += 1;
            }
            Err(e) => {
                warn!("Could not convert image {}: {}", src, e);
                summary.failed += 1;
            }
        }
    }
    (out, summary)
}
