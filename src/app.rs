//! Application commands
//!
//! [`CertificateApp`] owns the form, the single current certificate and the
//! host capabilities. Every user action is a method taking typed input and
//! returning a typed result.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::export::{BlockRasterizer, ExportReceipt, Exporter};
use crate::host::{DirectorySaver, HeadlessSurface, HtmlFilePrinter, Notice, Printer, RenderSurface};
use crate::template::{capitalize_words, render, Category, CertificateRequest, FormInput};
use crate::{Error, GeneratorConfig, RenderedDocument, Result};

pub const NOTHING_TO_PRINT_MESSAGE: &str = "Please generate a certificate before printing.";

pub struct CertificateApp {
    config: GeneratorConfig,
    selected: Option<String>,
    form: FormInput,
    current: Option<RenderedDocument>,
    surface: Box<dyn RenderSurface>,
    exporter: Exporter,
    printer: Box<dyn Printer>,
}

impl CertificateApp {
    pub fn new(
        config: GeneratorConfig,
        surface: Box<dyn RenderSurface>,
        exporter: Exporter,
        printer: Box<dyn Printer>,
    ) -> Self {
        Self {
            config,
            selected: None,
            form: FormInput::default(),
            current: None,
            surface,
            exporter,
            printer,
        }
    }

    /// Headless app writing exports and the printable page into `out_dir`
    pub fn headless(config: GeneratorConfig, out_dir: impl Into<PathBuf>) -> Self {
        let out_dir = out_dir.into();
        let surface = Box::new(HeadlessSurface::new(config.page));
        let exporter = Exporter::new(
            config.export.clone(),
            Arc::new(BlockRasterizer),
            Arc::new(DirectorySaver::new(out_dir.clone())),
        );
        let printer = Box::new(HtmlFilePrinter::new(out_dir.join("certificate.html")));
        Self::new(config, surface, exporter, printer)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Remember the chosen category tag; returns the category it resolves to
    pub fn select_category(&mut self, tag: &str) -> Category {
        self.selected = Some(tag.to_string());
        Category::from_tag_or_default(tag)
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Render the form with the selected category and make it current
    pub fn submit(&mut self, form: FormInput) -> &RenderedDocument {
        let request = CertificateRequest::from_form(self.selected.as_deref().unwrap_or_default(), &form);
        self.form = form;
        self.show(&request)
    }

    /// Render an already-typed request and make it current
    pub fn show(&mut self, request: &CertificateRequest) -> &RenderedDocument {
        let document = render(request, &self.config.branding);
        self.surface.mount(document.markup());
        debug!("mounted {} certificate for {:?}", document.category(), document.recipient_name());
        self.current.insert(document)
    }

    /// Clear the form, keeping the selected category and the current certificate
    pub fn reset(&mut self) {
        self.form = FormInput::default();
    }

    /// Form values to pre-fill when going back to edit
    pub fn edit(&self) -> &FormInput {
        &self.form
    }

    /// Auto-format applied to the name field when it loses focus
    pub fn normalize_name(&self, raw: &str) -> String {
        capitalize_words(raw)
    }

    pub fn current(&self) -> Option<&RenderedDocument> {
        self.current.as_ref()
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn print(&self) -> Result<()> {
        let Some(document) = &self.current else {
            self.exporter
                .notifier()
                .notify(Notice::Precondition(NOTHING_TO_PRINT_MESSAGE.to_string()));
            return Err(Error::NoDocument);
        };
        self.printer.print(document)
    }

    pub async fn export_png(&self) -> Result<ExportReceipt> {
        self.exporter.export(self.current.as_ref(), self.surface.as_ref()).await
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn exporter_mut(&mut self) -> &mut Exporter {
        &mut self.exporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryNotifier, MemoryPrinter, MemorySaver};

    fn app() -> (CertificateApp, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let config = GeneratorConfig::default();
        let exporter = Exporter::new(config.export.clone(), Arc::new(BlockRasterizer), Arc::new(MemorySaver::new()))
            .with_notifier(notifier.clone());
        let app = CertificateApp::new(
            config,
            Box::new(HeadlessSurface::default()),
            exporter,
            Box::new(MemoryPrinter::new()),
        );
        (app, notifier)
    }

    #[test]
    fn submit_replaces_current_document_and_mounts_it() {
        let (mut app, _) = app();
        app.select_category("participation");
        app.submit(FormInput {
            recipient_name: "First".into(),
            ..Default::default()
        });
        app.submit(FormInput {
            recipient_name: "Second".into(),
            ..Default::default()
        });
        let doc = app.current().unwrap();
        assert_eq!(doc.recipient_name(), "Second");
        assert_eq!(doc.category(), Category::Participation);
        let mounted = app.surface().mounted_markup().unwrap();
        assert!(mounted.contains("Second"));
        assert!(!mounted.contains("First"));
    }

    #[test]
    fn submit_without_selection_uses_completion() {
        let (mut app, _) = app();
        let doc = app.submit(FormInput {
            recipient_name: "X".into(),
            ..Default::default()
        });
        assert_eq!(doc.category(), Category::Completion);
    }

    #[test]
    fn reset_keeps_category_and_document() {
        let (mut app, _) = app();
        app.select_category("achievement");
        app.submit(FormInput {
            recipient_name: "Kim".into(),
            grade: "B".into(),
            ..Default::default()
        });
        assert_eq!(app.edit().grade, "B");
        app.reset();
        assert_eq!(app.edit(), &FormInput::default());
        assert_eq!(app.selected_category(), Some("achievement"));
        assert!(app.current().is_some());
    }

    #[test]
    fn print_requires_a_document() {
        let (mut app, notifier) = app();
        assert!(matches!(app.print(), Err(Error::NoDocument)));
        assert_eq!(
            notifier.notices(),
            vec![Notice::Precondition(NOTHING_TO_PRINT_MESSAGE.to_string())]
        );
        app.submit(FormInput {
            recipient_name: "Kim".into(),
            ..Default::default()
        });
        assert!(app.print().is_ok());
    }

    #[test]
    fn normalize_name_capitalizes() {
        let (app, _) = app();
        assert_eq!(app.normalize_name("jane doe"), "Jane Doe");
    }
}
