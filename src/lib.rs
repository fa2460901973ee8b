//! certgen
//!
//! Certificate rendering and high-resolution export for Rust. A caller picks a
//! certificate category, fills a form, and gets back a styled HTML certificate
//! that can be mounted on a display surface, printed, or exported as a PNG.
//!
//! # Features
//!
//! - **Template Selector**: four fixed categories with canned text, merged
//!   with the user's fields into a [`RenderedDocument`]
//! - **Export Pipeline**: an explicit `Idle → Preparing → Rasterizing →
//!   Encoding → Completed | Failed` state machine with single-flight
//!   protection and best-effort image inlining
//! - **Host capabilities**: surfaces, rasterizers, savers, printers and
//!   notifiers are traits, with headless and in-memory implementations
//!
//! # Example
//!
//! ```no_run
//! use certgen::app::CertificateApp;
//! use certgen::template::FormInput;
//! use certgen::GeneratorConfig;
//!
//! # async fn run() -> certgen::Result<()> {
//! let mut app = CertificateApp::headless(GeneratorConfig::default(), "out");
//! app.select_category("achievement");
//! app.submit(FormInput {
//!     recipient_name: "Jane Doe".into(),
//!     subject_name: "Rust Fundamentals".into(),
//!     ..Default::default()
//! });
//! let receipt = app.export_png().await?;
//! println!("wrote {}", receipt.filename);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod app;
pub mod document;
pub mod export;
pub mod host;
pub mod template;

pub use document::{Branding, RenderedDocument};
pub use export::{ExportReceipt, ExportState, Exporter};
pub use template::{render, Category, CertificateRequest, FormInput};

/// Top-level configuration
///
/// Every field has a default, so a JSON config file only needs to name what it
/// overrides.
///
/// # Examples
///
/// ```
/// let cfg = certgen::GeneratorConfig::default();
/// assert_eq!(cfg.export.scale, 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Laid-out size of the certificate on the headless surface
    pub page: PageSize,
    pub export: ExportConfig,
    pub branding: Branding,
}

impl GeneratorConfig {
    /// Load a (possibly partial) JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let cfg: GeneratorConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page.width == 0 || self.page.height == 0 {
            return Err(Error::ConfigError(format!(
                "page size must be non-zero, got {}x{}",
                self.page.width, self.page.height
            )));
        }
        if self.export.scale == 0 {
            return Err(Error::ConfigError("export scale must be at least 1".into()));
        }
        Ok(())
    }
}

/// Pixel dimensions of a laid-out certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for PageSize {
    /// A4 landscape at 96 dpi
    fn default() -> Self {
        Self {
            width: 1123,
            height: 794,
        }
    }
}

/// Export pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Oversampling factor applied to the laid-out size
    pub scale: u32,
    /// RGBA background painted under the certificate
    pub background: [u8; 4],
    /// Rasterize even if some images could not be inlined
    pub allow_mixed_origin: bool,
    /// Upper bound for loading one image; `None` waits indefinitely
    pub image_timeout_ms: Option<u64>,
    /// Pause between inlining and rasterizing (0 disables)
    pub settle_delay_ms: u64,
    /// Tag placed in exported filenames
    pub quality_tag: String,
    /// Trigger label while an export is running
    pub busy_label: String,
    /// Base URL or directory that relative image sources resolve against
    pub asset_base: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 5,
            background: [255, 255, 255, 255],
            allow_mixed_origin: true,
            image_timeout_ms: Some(10_000),
            settle_delay_ms: 100,
            quality_tag: "4K".to_string(),
            busy_label: "Generating 4K PNG...".to_string(),
            asset_base: None,
        }
    }
}
