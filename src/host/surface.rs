/// Display surface that certificates are mounted on

use crate::PageSize;

pub trait RenderSurface: Send + Sync {
    /// Replace whatever is shown with `markup`
    fn mount(&mut self, markup: String);

    /// Laid-out pixel size of the mounted content, `None` when nothing is mounted
    fn measure(&self) -> Option<PageSize>;

    fn mounted_markup(&self) -> Option<&str>;
}

/// A surface without a screen: content always lays out at a fixed page size
pub struct HeadlessSurface {
    size: PageSize,
    markup: Option<String>,
}

impl HeadlessSurface {
    pub fn new(size: PageSize) -> Self {
        HeadlessSurface { size, markup: None }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl RenderSurface for HeadlessSurface {
    fn mount(&mut self, markup: String) {
        self.markup = Some(markup);
    }

    fn measure(&self) -> Option<PageSize> {
        self.markup.as_ref().map(|_| self.size)
    }

    fn mounted_markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }
}
