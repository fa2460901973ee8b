/// Print capability

use std::path::PathBuf;

use log::info;

use crate::{RenderedDocument, Result};

pub trait Printer: Send + Sync {
    fn print(&self, document: &RenderedDocument) -> Result<()>;
}

/// "Prints" by writing the standalone printable page to a file
pub struct HtmlFilePrinter {
    path: PathBuf,
}

impl HtmlFilePrinter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HtmlFilePrinter { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Printer for HtmlFilePrinter {
    fn print(&self, document: &RenderedDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, document.printable_page())?;
        info!("wrote printable certificate to {}", self.path.display());
        Ok(())
    }
}

/// Collects printed pages in memory
#[derive(Default)]
pub struct MemoryPrinter {
    pages: std::sync::Mutex<Vec<String>>,
}

impl MemoryPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> Vec<String> {
        self.pages.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Printer for MemoryPrinter {
    fn print(&self, document: &RenderedDocument) -> Result<()> {
        let page = document.printable_page();
        self.pages
            .lock()
            .map_err(|_| crate::Error::PrintError("printer state poisoned".into()))?
            .push(page);
        Ok(())
    }
}
