//! Fetching asset bytes and inlining them as data urls.

use base64::{Engine, engine::general_purpose::STANDARD};
use framecrop_core::ImageFormat;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use thiserror::Error;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Fetch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed data url")]
    MalformedDataUrl,
    #[error("Fetch error: {0}")]
    Other(String),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Bytes of a fetched asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any.
    pub content_type: Option<String>,
}

/// Byte-fetching backend provided by the host.
pub trait AssetFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, FetchResult<FetchedAsset>>;
}

/// In-memory fetcher for testing and offline export.
#[derive(Default)]
pub struct MemoryFetcher {
    assets: RwLock<HashMap<String, FetchedAsset>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        url: impl Into<String>,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> FetchResult<()> {
        let mut assets = self
            .assets
            .write()
            .map_err(|e| FetchError::Other(format!("Lock error: {}", e)))?;
        assets.insert(
            url.into(),
            FetchedAsset {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, FetchResult<FetchedAsset>> {
        let url = url.to_string();
        Box::pin(async move {
            let assets = self
                .assets
                .read()
                .map_err(|e| FetchError::Other(format!("Lock error: {}", e)))?;
            assets.get(&url).cloned().ok_or(FetchError::NotFound(url))
        })
    }
}

/// Whether `src` points at something that must be fetched (absolute or relative url).
pub fn is_remote_src(src: &str) -> bool {
    src.starts_with("http") || src.starts_with('/') || src.starts_with("./")
}

/// Encode fetched bytes as a `data:` url.
///
/// The MIME type comes from the content type, then from the bytes themselves.
pub fn to_data_url(asset: &FetchedAsset) -> String {
    let mime = asset
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or("").trim())
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .or_else(|| ImageFormat::from_magic_bytes(&asset.bytes).map(|f| f.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    format!("data:{};base64,{}", mime, STANDARD.encode(&asset.bytes))
}

/// Decode a base64 `data:` url into its bytes.
pub fn decode_data_url(url: &str) -> FetchResult<FetchedAsset> {
    let rest = url.strip_prefix("data:").ok_or(FetchError::MalformedDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(FetchError::MalformedDataUrl)?;
    let mime = meta.strip_suffix(";base64").ok_or(FetchError::MalformedDataUrl)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| FetchError::MalformedDataUrl)?;
    Ok(FetchedAsset {
        bytes,
        content_type: (!mime.is_empty()).then(|| mime.to_string()),
    })
}

/// Load the bytes behind any asset source.
pub async fn load_src(fetcher: &impl AssetFetcher, src: &str) -> FetchResult<FetchedAsset> {
    if src.starts_with("data:") {
        return decode_data_url(src);
    }
    fetcher.fetch(src).await
}

/// Make `src` self-contained: remote sources are fetched and inlined, others pass through.
pub async fn inline_src(fetcher: &impl AssetFetcher, src: &str) -> FetchResult<String> {
    if !is_remote_src(src) {
        return Ok(src.to_string());
    }
    let fetched = fetcher.fetch(src).await?;
    Ok(to_data_url(&fetched))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_remote_detection() {
        assert!(is_remote_src("https://example.com/a.png"));
        assert!(is_remote_src("/assets/a.png"));
        assert!(is_remote_src("./a.png"));
        assert!(!is_remote_src("data:image/png;base64,AAAA"));
        assert!(!is_remote_src("asset-a.png"));
    }

    #[test]
    fn test_data_url_mime_resolution() {
        let typed = FetchedAsset {
            bytes: vec![1, 2, 3],
            content_type: Some("image/gif; charset=binary".into()),
        };
        assert_eq!(to_data_url(&typed), "data:image/gif;base64,AQID");

        let sniffed = FetchedAsset {
            bytes: PNG_MAGIC.to_vec(),
            content_type: None,
        };
        assert!(to_data_url(&sniffed).starts_with("data:image/png;base64,"));

        let unknown = FetchedAsset {
            bytes: vec![0; 4],
            content_type: Some(String::new()),
        };
        assert!(to_data_url(&unknown).starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn test_data_url_decoding() {
        let decoded = decode_data_url("data:image/gif;base64,AQID").unwrap();
        assert_eq!(decoded.bytes, vec![1, 2, 3]);
        assert_eq!(decoded.content_type.as_deref(), Some("image/gif"));
        assert_eq!(
            decode_data_url("data:text/plain,hello"),
            Err(FetchError::MalformedDataUrl)
        );
        assert_eq!(decode_data_url("https://x"), Err(FetchError::MalformedDataUrl));
    }

    #[test]
    fn test_inline_src() {
        let fetcher = MemoryFetcher::new();
        fetcher
            .insert("https://example.com/a.png", PNG_MAGIC.to_vec(), Some("image/png"))
            .unwrap();

        let inlined = pollster::block_on(inline_src(&fetcher, "https://example.com/a.png")).unwrap();
        assert!(inlined.starts_with("data:image/png;base64,"));

        let local = pollster::block_on(inline_src(&fetcher, "data:image/png;base64,AAAA")).unwrap();
        assert_eq!(local, "data:image/png;base64,AAAA");

        let missing = pollster::block_on(inline_src(&fetcher, "https://example.com/b.png"));
        assert_eq!(
            missing,
            Err(FetchError::NotFound("https://example.com/b.png".into()))
        );
    }

    #[test]
    fn test_poisoned_fetcher_reports_lock_error() {
        let fetcher = MemoryFetcher::new();
        std::thread::scope(|s| {
            let poisoner = s.spawn(|| {
                let _guard = fetcher.assets.write().unwrap();
                panic!("poison the lock");
            });
            assert!(poisoner.join().is_err());
        });

        let inserted = fetcher.insert("https://example.com/a.png", PNG_MAGIC.to_vec(), None);
        assert!(matches!(inserted, Err(FetchError::Other(ref m)) if m.starts_with("Lock error")));
        let fetched = pollster::block_on(fetcher.fetch("https://example.com/a.png"));
        assert!(matches!(fetched, Err(FetchError::Other(_))));
    }
}
