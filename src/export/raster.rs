/// Rasterization capability and the built-in block rasterizer

use std::collections::HashMap;

use futures::future::BoxFuture;
use image::RgbaImage;
use log::{debug, warn};

use crate::export::inline::decode_data_uri;
use crate::export::layout::layout_certificate;
use crate::export::paint::{paint_layout, Canvas, PaintCommand, Rgba};
use crate::{Error, PageSize, RenderedDocument, Result};

/// Largest edge, in output pixels, a raster buffer may have
pub const MAX_DIMENSION: u32 = 32_767;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterRequest {
    /// Laid-out size of the subtree being captured
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub background: Rgba,
    /// Tolerate images that were not inlined
    pub allow_mixed_origin: bool,
}

impl RasterRequest {
    /// Output dimensions after oversampling
    pub fn output_size(&self) -> Result<(u32, u32)> {
        let w = self.width.checked_mul(self.scale);
        let h = self.height.checked_mul(self.scale);
        match (w, h) {
            (Some(w), Some(h)) if w > 0 && h > 0 && w <= MAX_DIMENSION && h <= MAX_DIMENSION => Ok((w, h)),
            _ => Err(Error::RasterizeError(format!(
                "{}x{} at scale {} is outside the supported raster size",
                self.width, self.height, self.scale
            ))),
        }
    }
}

/// Pixels captured from a rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    pub fn new(image: RgbaImage) -> Self {
        RasterBuffer { image }
    }

    pub fn filled(width: u32, height: u32, rgba: Rgba) -> Self {
        RasterBuffer {
            image: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.image.get_pixel(x, y).0
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

pub trait Rasterizer: Send + Sync {
    fn rasterize<'a>(&'a self, document: &'a RenderedDocument, request: &'a RasterRequest)
        -> BoxFuture<'a, Result<RasterBuffer>>;
}

/// Lays the document's markup out as blocks and paints it without a browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockRasterizer;

impl BlockRasterizer {
    pub fn new() -> Self {
        BlockRasterizer
    }

    pub fn rasterize_now(&self, document: &RenderedDocument, request: &RasterRequest) -> Result<RasterBuffer> {
        let (width, height) = request.output_size()?;
        let page = PageSize {
            width: request.width,
            height: request.height,
        };
        let nodes = layout_certificate(&document.markup(), page)?;
        let commands = paint_layout(&nodes);

        let mut images: HashMap<String, RgbaImage> = HashMap::new();
        for cmd in &commands {
            let PaintCommand::Image { src, .. } = cmd else {
                continue;
            };
            if images.contains_key(src) {
                continue;
            }
            match decode_data_uri(src) {
                Some(bytes) => match image::load_from_memory(&bytes) {
                    Ok(img) => {
                        images.insert(src.clone(), img.to_rgba8());
                    }
                    Err(e) => warn!("skipping undecodable inline image: {}", e),
                },
                None if request.allow_mixed_origin => {
                    debug!("not painting external image {}", src);
                }
                None => {
                    return Err(Error::RasterizeError(format!(
                        "image {} is not inline and mixed-origin content is not allowed",
                        src
                    )))
                }
            }
        }

        let mut canvas = Canvas::new(width, height, request.scale, request.background);
        for cmd in &commands {
            canvas.execute(cmd, &images);
        }
        Ok(RasterBuffer::new(canvas.into_image()))
    }
}

impl Rasterizer for BlockRasterizer {
    fn rasterize<'a>(&'a self, document: &'a RenderedDocument, request: &'a RasterRequest)
        -> BoxFuture<'a, Result<RasterBuffer>> {
        Box::pin(async move { self.rasterize_now(document, request) })
    }
}
