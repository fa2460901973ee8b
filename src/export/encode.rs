/// Lossless PNG encoding of raster buffers

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use sha2::{Digest, Sha256};

use crate::export::raster::RasterBuffer;
use crate::{Error, Result};

pub const PNG_MIME: &str = "image/png";

/// An encoded image, alive for the duration of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ExportArtifact {
    pub fn mime_type(&self) -> &'static str {
        PNG_MIME
    }

    /// Hex SHA-256 of the encoded bytes
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

pub fn encode_png(buffer: &RasterBuffer) -> Result<ExportArtifact> {
    let (width, height) = buffer.dimensions();
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(buffer.as_raw(), width, height, ColorType::Rgba8)
        .map_err(|e| Error::EncodeError(e.to_string()))?;
    Ok(ExportArtifact { bytes, width, height })
}
