use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;

use certgen::app::CertificateApp;
use certgen::export::{
    BlockRasterizer, ExportState, Exporter, ImageLoader, RasterBuffer, RasterRequest, Rasterizer, TriggerControl,
    NO_DOCUMENT_MESSAGE,
};
use certgen::host::{
    BlobRegistry, DirectorySaver, Download, FileSaver, FixedClock, HeadlessSurface, MemoryNotifier, MemoryPrinter,
    MemorySaver, Notice, SavedFile,
};
use certgen::template::{Category, CertificateRequest};
use certgen::{Error, GeneratorConfig, PageSize, RenderedDocument, Result};

/// Every load fails immediately
struct Unreachable;

impl ImageLoader for Unreachable {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move { Err(Error::ImageLoad(format!("{}: connection refused", src))) })
    }
}

/// Counts calls and overlapping rasterizations; waits for `gate` when set
#[derive(Default)]
struct CountingRasterizer {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_with: Option<String>,
}

impl Rasterizer for CountingRasterizer {
    fn rasterize<'a>(&'a self, _doc: &'a RenderedDocument, request: &'a RasterRequest) -> BoxFuture<'a, Result<RasterBuffer>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            if let Some(msg) = &self.fail_with {
                return Err(Error::RasterizeError(msg.clone()));
            }
            let (w, h) = request.output_size()?;
            Ok(RasterBuffer::filled(w, h, request.background))
        })
    }
}

struct Harness {
    app: CertificateApp,
    notifier: Arc<MemoryNotifier>,
    saver: Arc<MemorySaver>,
    events: Arc<Mutex<Vec<ExportState>>>,
}

fn config() -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.page = PageSize { width: 120, height: 84 };
    config.export.scale = 2;
    config.export.settle_delay_ms = 0;
    config
}

fn harness(rasterizer: Arc<dyn Rasterizer>, loader: Arc<dyn ImageLoader>) -> Harness {
    let config = config();
    let notifier = Arc::new(MemoryNotifier::new());
    let saver = Arc::new(MemorySaver::new());
    let mut exporter = Exporter::new(config.export.clone(), rasterizer, saver.clone())
        .with_loader(loader)
        .with_clock(Arc::new(FixedClock(1_700_000_000_000)))
        .with_notifier(notifier.clone());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    exporter.on_state_change(move |s| sink.lock().unwrap().push(s.clone()));
    let app = CertificateApp::new(
        config.clone(),
        Box::new(HeadlessSurface::new(config.page)),
        exporter,
        Box::new(MemoryPrinter::new()),
    );
    Harness {
        app,
        notifier,
        saver,
        events,
    }
}

#[tokio::test]
async fn export_without_document_only_notifies() {
    let counting = Arc::new(CountingRasterizer::default());
    let h = harness(counting.clone(), Arc::new(Unreachable));

    let err = h.app.export_png().await.unwrap_err();
    assert!(matches!(err, Error::NoDocument));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    assert!(h.events.lock().unwrap().is_empty());
    assert_eq!(h.app.exporter().state(), ExportState::Idle);
    assert_eq!(h.notifier.notices(), vec![Notice::Precondition(NO_DOCUMENT_MESSAGE.to_string())]);
    assert!(h.app.exporter().control().enabled);
}

#[tokio::test]
async fn unreachable_images_still_complete_with_expected_filename() {
    let mut h = harness(Arc::new(BlockRasterizer), Arc::new(Unreachable));
    h.app.show(&CertificateRequest::new(Category::Achievement, "Jane   Doe"));

    let receipt = h.app.export_png().await.unwrap();
    assert_eq!(receipt.filename, "certificate-jane-doe-4K-1700000000000.png");
    assert_eq!((receipt.width, receipt.height), (240, 168));
    assert_eq!(receipt.inline.failed, 2);

    let events = h.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ExportState::Preparing,
            ExportState::Rasterizing,
            ExportState::Encoding,
            ExportState::Completed {
                filename: receipt.filename.clone()
            },
        ]
    );

    let files = h.saver.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, receipt.filename);
    assert_eq!(&files[0].1[0..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(h.app.exporter().blobs().live_count(), 0);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn second_export_while_running_is_rejected() {
    let gate = Arc::new(Notify::new());
    let counting = Arc::new(CountingRasterizer {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let mut h = harness(counting.clone(), Arc::new(Unreachable));
    h.app.show(&CertificateRequest::new(Category::Completion, "Sam"));

    let app = &h.app;
    let first = app.export_png();
    let second = async {
        assert!(!app.exporter().control().enabled);
        assert_eq!(app.exporter().control().label, "Generating 4K PNG...");
        let res = app.export_png().await;
        gate.notify_one();
        res
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::ExportInProgress)));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    assert_eq!(counting.max_active.load(Ordering::SeqCst), 1);

    let control = h.app.exporter().control();
    assert!(control.enabled);
    assert_eq!(control.label, "Download PNG");

    // Once finished, exporting works again.
    gate.notify_one();
    assert!(h.app.export_png().await.is_ok());
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rasterizer_failure_is_reported_and_control_restored() {
    let counting = Arc::new(CountingRasterizer {
        fail_with: Some("canvas exploded".into()),
        ..Default::default()
    });
    let mut h = harness(counting, Arc::new(Unreachable));
    h.app.show(&CertificateRequest::new(Category::Completion, "Sam"));

    let err = h.app.export_png().await.unwrap_err();
    assert!(matches!(err, Error::RasterizeError(_)));

    let message = "Rasterization failed: canvas exploded".to_string();
    assert_eq!(
        h.app.exporter().state(),
        ExportState::Failed {
            message: message.clone()
        }
    );
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::Failure(format!("Failed to generate PNG. Error: {}", message))]
    );
    assert!(h.app.exporter().control().enabled);
    assert!(h.saver.files().is_empty());
}

/// Records when each load settles, with a slow first image
struct Recording {
    log: Arc<Mutex<Vec<String>>>,
}

impl ImageLoader for Recording {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            if src.ends_with("karta.png") {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            self.log.lock().unwrap().push(format!("settled {}", src));
            Err(Error::ImageLoad(src.to_string()))
        })
    }
}

#[tokio::test]
async fn rasterizing_waits_for_every_image_to_settle() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(Arc::new(BlockRasterizer), Arc::new(Recording { log: log.clone() }));
    let sink = log.clone();
    h.app
        .exporter_mut()
        .on_state_change(move |s| sink.lock().unwrap().push(format!("{:?}", s)));
    h.app.show(&CertificateRequest::new(Category::Completion, "Sam"));

    h.app.export_png().await.unwrap();

    let log = log.lock().unwrap().clone();
    let raster_at = log.iter().position(|e| e == "Rasterizing").unwrap();
    let settled: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_with("settled"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(settled.len(), 2);
    assert!(settled.iter().all(|&i| i < raster_at), "{:?}", log);
}

#[tokio::test]
async fn surface_without_layout_fails_the_export() {
    struct Collapsed;
    impl certgen::host::RenderSurface for Collapsed {
        fn mount(&mut self, _markup: String) {}
        fn measure(&self) -> Option<PageSize> {
            Some(PageSize { width: 0, height: 0 })
        }
        fn mounted_markup(&self) -> Option<&str> {
            None
        }
    }

    let config = config();
    let notifier = Arc::new(MemoryNotifier::new());
    let exporter = Exporter::new(config.export.clone(), Arc::new(BlockRasterizer), Arc::new(MemorySaver::new()))
        .with_loader(Arc::new(Unreachable))
        .with_notifier(notifier.clone());
    let mut app = CertificateApp::new(config, Box::new(Collapsed), exporter, Box::new(MemoryPrinter::new()));
    app.show(&CertificateRequest::new(Category::Completion, "Sam"));

    assert!(matches!(app.export_png().await, Err(Error::Layout(_))));
    assert!(matches!(notifier.notices()[0], Notice::Failure(_)));
    assert!(app.exporter().control().enabled);
}

#[tokio::test]
async fn names_with_path_separators_save_into_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    let exporter = Exporter::new(
        config.export.clone(),
        Arc::new(BlockRasterizer),
        Arc::new(DirectorySaver::new(dir.path())),
    )
    .with_loader(Arc::new(Unreachable))
    .with_clock(Arc::new(FixedClock(1)));
    let mut app = CertificateApp::new(
        config.clone(),
        Box::new(HeadlessSurface::new(config.page)),
        exporter,
        Box::new(MemoryPrinter::new()),
    );
    app.show(&CertificateRequest::new(Category::Completion, "AC/DC Fan"));

    let receipt = app.export_png().await.unwrap();
    assert_eq!(receipt.filename, "certificate-ac_dc-fan-4K-1.png");
    assert!(dir.path().join(&receipt.filename).is_file());
    assert!(matches!(app.exporter().state(), ExportState::Completed { .. }));
}

/// Fails every save, after checking the blob is still live
struct DiskFull;

impl FileSaver for DiskFull {
    fn save<'a>(&'a self, download: &'a Download, blobs: &'a BlobRegistry) -> BoxFuture<'a, Result<SavedFile>> {
        Box::pin(async move {
            assert!(blobs.resolve(&download.url).is_some());
            Err(Error::SaveError("disk full".into()))
        })
    }
}

#[tokio::test]
async fn saver_failure_fails_the_export_and_revokes_the_blob() {
    let config = config();
    let notifier = Arc::new(MemoryNotifier::new());
    let exporter = Exporter::new(config.export.clone(), Arc::new(BlockRasterizer), Arc::new(DiskFull))
        .with_loader(Arc::new(Unreachable))
        .with_notifier(notifier.clone());
    let mut app = CertificateApp::new(
        config.clone(),
        Box::new(HeadlessSurface::new(config.page)),
        exporter,
        Box::new(MemoryPrinter::new()),
    );
    app.show(&CertificateRequest::new(Category::Completion, "Sam"));

    let err = app.export_png().await.unwrap_err();
    assert!(matches!(err, Error::SaveError(_)));

    let message = "Saving failed: disk full".to_string();
    assert_eq!(
        app.exporter().state(),
        ExportState::Failed {
            message: message.clone()
        }
    );
    assert_eq!(
        notifier.notices(),
        vec![Notice::Failure(format!("Failed to generate PNG. Error: {}", message))]
    );
    assert_eq!(app.exporter().control(), TriggerControl::default());
    assert_eq!(app.exporter().blobs().live_count(), 0);
}
