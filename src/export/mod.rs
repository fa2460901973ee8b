//! PNG export pipeline
//!
//! One export runs through an explicit state machine:
//!
//! ```text
//! Idle -> Preparing -> Rasterizing -> Encoding -> Completed
//!                   \______________\___________\-> Failed
//! ```
//!
//! `Preparing` inlines images (best-effort, concurrently). `Rasterizing`
//! captures the document at its laid-out size times the configured scale.
//! `Encoding` produces a PNG, which is then offered to the host's file saver
//! through a temporary blob URL. Only one export may run at a time; the
//! trigger control stays disabled until the running one completes or fails.

pub mod encode;
pub mod inline;
pub mod layout;
pub mod paint;
pub mod raster;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info};

use crate::host::{BlobRegistry, Clock, Download, FileSaver, LogNotifier, Notice, Notifier, RenderSurface, SystemClock};
use crate::{Error, ExportConfig, RenderedDocument, Result};

pub use encode::{encode_png, ExportArtifact};
pub use inline::{inline_images, AssetLoader, ImageLoader, InlineSummary};
pub use raster::{BlockRasterizer, RasterBuffer, RasterRequest, Rasterizer};

pub const NO_DOCUMENT_MESSAGE: &str = "Please generate a certificate first.";

type StateHandler = Arc<dyn Fn(&ExportState) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Preparing,
    Rasterizing,
    Encoding,
    Completed { filename: String },
    Failed { message: String },
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Completed { .. } | ExportState::Failed { .. })
    }
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub filename: String,
    /// Where the saver put the file
    pub location: String,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
    pub inline: InlineSummary,
}

/// The button (or equivalent) that starts an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerControl {
    pub label: String,
    pub enabled: bool,
}

impl Default for TriggerControl {
    fn default() -> Self {
        TriggerControl {
            label: "Download PNG".to_string(),
            enabled: true,
        }
    }
}

// Restores the trigger to how it looked before the export started.
struct TriggerGuard {
    control: Arc<Mutex<TriggerControl>>,
    original_label: String,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        if let Ok(mut c) = self.control.lock() {
            c.label = std::mem::take(&mut self.original_label);
            c.enabled = true;
        }
    }
}

/// Replace each whitespace run with `-` and lowercase the result.
///
/// Characters that cannot appear in a file name (path separators, `:*?"<>|`
/// and control characters) become `_`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        if is_filename_unsafe(c) {
            out.push('_');
        } else {
            out.extend(c.to_lowercase());
        }
        in_space = false;
    }
    out
}

fn is_filename_unsafe(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// `certificate-<slug>-<tag>-<millis>.png`
pub fn export_filename(recipient_name: &str, quality_tag: &str, epoch_millis: i64) -> String {
    format!("certificate-{}-{}-{}.png", slugify(recipient_name), quality_tag, epoch_millis)
}

/// Drives exports of rendered certificates through the host capabilities
pub struct Exporter {
    config: ExportConfig,
    loader: Arc<dyn ImageLoader>,
    rasterizer: Arc<dyn Rasterizer>,
    saver: Arc<dyn FileSaver>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    blobs: Arc<BlobRegistry>,
    control: Arc<Mutex<TriggerControl>>,
    state: Mutex<ExportState>,
    on_state_change: Option<StateHandler>,
}

impl Exporter {
    /// Exporter with the asset loader from `config`, the system clock and
    /// log-backed notices.
    pub fn new(config: ExportConfig, rasterizer: Arc<dyn Rasterizer>, saver: Arc<dyn FileSaver>) -> Self {
        let loader = Arc::new(AssetLoader::new(config.asset_base.as_deref()));
        Self {
            config,
            loader,
            rasterizer,
            saver,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            blobs: BlobRegistry::new(),
            control: Arc::new(Mutex::new(TriggerControl::default())),
            state: Mutex::new(ExportState::Idle),
            on_state_change: None,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_control(mut self, control: TriggerControl) -> Self {
        self.control = Arc::new(Mutex::new(control));
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn blobs(&self) -> &Arc<BlobRegistry> {
        &self.blobs
    }

    /// Snapshot of the trigger control
    pub fn control(&self) -> TriggerControl {
        self.control.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn state(&self) -> ExportState {
        self.state.lock().map(|s| s.clone()).unwrap_or(ExportState::Idle)
    }

    /// Register a callback invoked on every state transition
    pub fn on_state_change<F>(&mut self, cb: F)
    where
        F: Fn(&ExportState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(cb));
    }

    pub fn clear_on_state_change(&mut self) {
        self.on_state_change = None;
    }

    fn transition(&self, next: ExportState) {
        debug!("export state -> {:?}", next);
        if let Ok(mut s) = self.state.lock() {
            *s = next.clone();
        }
        if let Some(cb) = &self.on_state_change {
            cb(&next);
        }
    }

    fn begin(&self) -> Result<TriggerGuard> {
        let mut c = self
            .control
            .lock()
            .map_err(|_| Error::Other("export control poisoned".into()))?;
        if !c.enabled {
            debug!("export rejected: another export is running");
            return Err(Error::ExportInProgress);
        }
        c.enabled = false;
        let original_label = std::mem::replace(&mut c.label, self.config.busy_label.clone());
        Ok(TriggerGuard {
            control: Arc::clone(&self.control),
            original_label,
        })
    }

    /// Export `document` as it is laid out on `surface`.
    ///
    /// With no document this only shows a precondition notice. A second call
    /// while one is running fails with [`Error::ExportInProgress`].
    pub async fn export(
        &self,
        document: Option<&RenderedDocument>,
        surface: &dyn RenderSurface,
    ) -> Result<ExportReceipt> {
        let Some(document) = document else {
            self.notifier.notify(Notice::Precondition(NO_DOCUMENT_MESSAGE.to_string()));
            return Err(Error::NoDocument);
        };
        let _guard = self.begin()?;

        self.transition(ExportState::Preparing);
        let timeout = self.config.image_timeout_ms.map(Duration::from_millis);
        let (prepared, summary) = inline_images(document, self.loader.as_ref(), timeout).await;
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }

        match self.capture(&prepared, surface, summary).await {
            Ok(receipt) => {
                info!("exported {} ({}x{})", receipt.location, receipt.width, receipt.height);
                self.transition(ExportState::Completed {
                    filename: receipt.filename.clone(),
                });
                Ok(receipt)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Error generating PNG: {}", message);
                self.transition(ExportState::Failed {
                    message: message.clone(),
                });
                self.notifier
                    .notify(Notice::Failure(format!("Failed to generate PNG. Error: {}", message)));
                Err(e)
            }
        }
    }

    async fn capture(
        &self,
        document: &RenderedDocument,
        surface: &dyn RenderSurface,
        inline: InlineSummary,
    ) -> Result<ExportReceipt> {
        self.transition(ExportState::Rasterizing);
        let size = surface
            .measure()
            .filter(|s| s.width > 0 && s.height > 0)
            .ok_or_else(|| Error::Layout("certificate is not laid out on the surface".into()))?;
        let request = RasterRequest {
            width: size.width,
            height: size.height,
            scale: self.config.scale,
            background: self.config.background,
            allow_mixed_origin: self.config.allow_mixed_origin,
        };
        let buffer = self.rasterizer.rasterize(document, &request).await?;

        self.transition(ExportState::Encoding);
        let artifact = encode_png(&buffer)?;
        let (width, height, sha256) = (artifact.width, artifact.height, artifact.sha256_hex());

        let filename = export_filename(
            document.recipient_name(),
            &self.config.quality_tag,
            self.clock.now_millis(),
        );
        let url = self.blobs.create_object_url(artifact);
        let download = Download {
            url: url.as_str().to_string(),
            filename: filename.clone(),
        };
        let saved = self.saver.save(&download, &self.blobs).await;
        drop(url);
        let saved = saved?;

        Ok(ExportReceipt {
            filename,
            location: saved.location,
            width,
            height,
            sha256,
            inline,
        })
    }
}
