//! Host capabilities: display surface, notices, printing, file saving, clock
//!
//! These are the seams between the certificate logic and whatever actually
//! shows, prints or stores things. Each trait ships with a headless or
//! in-memory implementation so the whole pipeline runs deterministically in
//! tests and from the CLI.

pub mod clock;
pub mod notice;
pub mod print;
pub mod save;
pub mod surface;

pub use clock::{Clock, FixedClock, SystemClock};
pub use notice::{LogNotifier, MemoryNotifier, Notice, Notifier};
pub use print::{HtmlFilePrinter, MemoryPrinter, Printer};
pub use save::{BlobRegistry, DirectorySaver, Download, FileSaver, MemorySaver, ObjectUrl, SavedFile};
pub use surface::{HeadlessSurface, RenderSurface};
