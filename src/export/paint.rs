/// Paint commands and a scaled RGBA canvas that executes them

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::export::layout::{advance, ElementType, LayoutNode};

pub type Rgba = [u8; 4];

const NAVY: Rgba = [30, 58, 95, 255];
const GOLD: Rgba = [201, 162, 39, 255];
const SLATE: Rgba = [71, 85, 105, 255];
const BLUE: Rgba = [37, 99, 235, 255];

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        thickness: u32,
        rgba: Rgba,
    },
    Text {
        x: i32,
        y: i32,
        font_px: u32,
        text: String,
        rgba: Rgba,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        src: String,
        opacity: u8,
    },
}

fn text_color(elem_type: ElementType) -> Rgba {
    match elem_type {
        ElementType::MainTitle | ElementType::Name | ElementType::Detail => NAVY,
        ElementType::Kind => GOLD,
        _ => SLATE,
    }
}

/// Translate laid-out boxes into paint commands, back to front
pub fn paint_layout(nodes: &[LayoutNode]) -> Vec<PaintCommand> {
    let mut cmds = Vec::with_capacity(nodes.len());
    for node in nodes {
        let r = node.rect;
        match node.elem_type {
            ElementType::Frame => cmds.push(PaintCommand::StrokeRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                thickness: (r.width.min(r.height) / 250).max(1),
                rgba: GOLD,
            }),
            ElementType::Corner | ElementType::SignatureLine => cmds.push(PaintCommand::SolidRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                rgba: NAVY,
            }),
            ElementType::Diamond { gold } => cmds.push(PaintCommand::SolidRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                rgba: if gold { GOLD } else { BLUE },
            }),
            ElementType::Seal => {
                cmds.push(PaintCommand::SolidRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    rgba: GOLD,
                });
                cmds.push(PaintCommand::StrokeRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    thickness: (r.width / 20).max(1),
                    rgba: NAVY,
                });
            }
            ElementType::Watermark | ElementType::Logo => {
                if let Some(src) = &node.src {
                    cmds.push(PaintCommand::Image {
                        x: r.x,
                        y: r.y,
                        width: r.width,
                        height: r.height,
                        src: src.clone(),
                        opacity: if node.elem_type == ElementType::Watermark { 16 } else { 255 },
                    });
                }
            }
            t if t.is_text() => cmds.push(PaintCommand::Text {
                x: r.x,
                y: r.y,
                font_px: node.font_px,
                text: node.text.clone(),
                rgba: text_color(t),
            }),
            _ => {}
        }
    }
    cmds
}

/// An RGBA pixel buffer addressed in layout coordinates times `scale`
pub struct Canvas {
    pixels: RgbaImage,
    scale: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32, scale: u32, background: Rgba) -> Self {
        Canvas {
            pixels: RgbaImage::from_pixel(width, height, image::Rgba(background)),
            scale: scale.max(1),
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    fn fill(&mut self, x: i32, y: i32, width: u32, height: u32, rgba: Rgba) {
        let s = self.scale as i64;
        let (w, h) = (self.pixels.width() as i64, self.pixels.height() as i64);
        let x0 = (x as i64 * s).clamp(0, w);
        let y0 = (y as i64 * s).clamp(0, h);
        let x1 = ((x as i64 + width as i64) * s).clamp(0, w);
        let y1 = ((y as i64 + height as i64) * s).clamp(0, h);
        for py in y0..y1 {
            for px in x0..x1 {
                blend(self.pixels.get_pixel_mut(px as u32, py as u32), rgba);
            }
        }
    }

    /// Execute one command. Images missing from `images` are skipped.
    pub fn execute(&mut self, cmd: &PaintCommand, images: &HashMap<String, RgbaImage>) {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba } => self.fill(*x, *y, *width, *height, *rgba),
            PaintCommand::StrokeRect { x, y, width, height, thickness, rgba } => {
                let t = (*thickness).min(*width).min(*height);
                self.fill(*x, *y, *width, t, *rgba);
                self.fill(*x, *y + (*height - t) as i32, *width, t, *rgba);
                self.fill(*x, *y, t, *height, *rgba);
                self.fill(*x + (*width - t) as i32, *y, t, *height, *rgba);
            }
            PaintCommand::Text { x, y, font_px, text, rgba } => {
                // Glyphs are solid cells
                let adv = advance(*font_px);
                let glyph_w = (adv * 2 / 3).max(1);
                let glyph_h = (font_px * 3 / 4).max(1);
                let top = *y + (font_px / 4) as i32;
                for (i, c) in text.chars().enumerate() {
                    if c.is_whitespace() {
                        continue;
                    }
                    self.fill(*x + (i as u32 * adv) as i32, top, glyph_w, glyph_h, *rgba);
                }
            }
            PaintCommand::Image { x, y, width, height, src, opacity } => {
                if let Some(img) = images.get(src) {
                    self.blit(*x, *y, *width, *height, img, *opacity);
                }
            }
        }
    }

    fn blit(&mut self, x: i32, y: i32, width: u32, height: u32, img: &RgbaImage, opacity: u8) {
        let (tw, th) = (width * self.scale, height * self.scale);
        if tw == 0 || th == 0 {
            return;
        }
        let scaled = imageops::resize(img, tw, th, FilterType::Triangle);
        let (ox, oy) = (x as i64 * self.scale as i64, y as i64 * self.scale as i64);
        for (sx, sy, p) in scaled.enumerate_pixels() {
            let (px, py) = (ox + sx as i64, oy + sy as i64);
            if px < 0 || py < 0 || px >= self.pixels.width() as i64 || py >= self.pixels.height() as i64 {
                continue;
            }
            let alpha = (p.0[3] as u32 * opacity as u32 / 255) as u8;
            blend(self.pixels.get_pixel_mut(px as u32, py as u32), [p.0[0], p.0[1], p.0[2], alpha]);
        }
    }
}

fn blend(dst: &mut image::Rgba<u8>, src: Rgba) {
    let a = src[3] as u32;
    if a == 255 {
        dst.0 = src;
        return;
    }
    if a == 0 {
        return;
    }
    for i in 0..3 {
        dst.0[i] = ((src[i] as u32 * a + dst.0[i] as u32 * (255 - a)) / 255) as u8;
    }
    dst.0[3] = (a + dst.0[3] as u32 * (255 - a) / 255).min(255) as u8;
}
