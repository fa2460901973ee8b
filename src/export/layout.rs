/// Block layout of certificate markup onto a fixed page
///
/// Sizes are derived from the page's shorter side (`vmin`) so the same
/// markup lays out proportionally at any page size. Text is measured with a
/// fixed advance of 3/5 of the font size and wrapped on word boundaries.

use scraper::{ElementRef, Html, Selector};

use crate::{Error, PageSize, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Frame,
    Corner,
    Watermark,
    Logo,
    MainTitle,
    Kind,
    Diamond { gold: bool },
    Subtitle,
    Name,
    Description,
    BodyText,
    Detail,
    Seal,
    SignatureLine,
    SignatureTitle,
}

impl ElementType {
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ElementType::MainTitle
                | ElementType::Kind
                | ElementType::Subtitle
                | ElementType::Name
                | ElementType::Description
                | ElementType::BodyText
                | ElementType::Detail
                | ElementType::SignatureTitle
        )
    }
}

/// A positioned box. Text nodes carry one wrapped line; image nodes carry
/// the image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub elem_type: ElementType,
    pub text: String,
    pub src: Option<String>,
    pub font_px: u32,
}

impl LayoutNode {
    fn block(elem_type: ElementType, rect: Rect) -> Self {
        LayoutNode {
            rect,
            elem_type,
            text: String::new(),
            src: None,
            font_px: 0,
        }
    }
}

/// Horizontal advance of one character
pub fn advance(font_px: u32) -> u32 {
    (font_px * 3 / 5).max(1)
}

pub fn line_height(font_px: u32) -> u32 {
    (font_px * 3 / 2).max(1)
}

// Text blocks in flow order: selector, element type, font size in per-mille of vmin.
const FLOW: &[(&str, ElementType, u32)] = &[
    (".certificate-main-title", ElementType::MainTitle, 70),
    (".certificate-type", ElementType::Kind, 30),
    (".certificate-subtitle", ElementType::Subtitle, 25),
    (".certificate-name", ElementType::Name, 60),
    (".certificate-description", ElementType::Description, 20),
    (".certificate-text", ElementType::BodyText, 20),
    (".certificate-course", ElementType::Detail, 28),
    (".certificate-grade", ElementType::Detail, 24),
    (".certificate-date", ElementType::Detail, 22),
];

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::Layout(format!("bad selector {}: {:?}", s, e)))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap into lines of at most `max_chars` characters
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn centered(page_width: u32, width: u32, y: i32, height: u32) -> Rect {
    Rect {
        x: (page_width.saturating_sub(width) / 2) as i32,
        y,
        width,
        height,
    }
}

/// Lay out certificate markup on a page of `page` pixels.
pub fn layout_certificate(markup: &str, page: PageSize) -> Result<Vec<LayoutNode>> {
    if page.width == 0 || page.height == 0 {
        return Err(Error::Layout(format!("cannot lay out on a {}x{} page", page.width, page.height)));
    }
    let document = Html::parse_fragment(markup);
    let vmin = page.width.min(page.height);
    let pm = |permille: u32| (vmin * permille / 1000).max(1);
    let mut nodes = Vec::new();

    // Frame and corner ornaments
    let inset = pm(30);
    nodes.push(LayoutNode::block(
        ElementType::Frame,
        Rect {
            x: inset as i32,
            y: inset as i32,
            width: page.width.saturating_sub(inset * 2),
            height: page.height.saturating_sub(inset * 2),
        },
    ));
    let corner = pm(80);
    for (x, y) in [
        (0, 0),
        (page.width.saturating_sub(corner), 0),
        (0, page.height.saturating_sub(corner)),
        (page.width.saturating_sub(corner), page.height.saturating_sub(corner)),
    ] {
        nodes.push(LayoutNode::block(
            ElementType::Corner,
            Rect { x: x as i32, y: y as i32, width: corner, height: corner },
        ));
    }

    if let Some(img) = document.select(&selector(".certificate-watermark img")?).next() {
        let side = page.height * 45 / 100;
        let mut node = LayoutNode::block(
            ElementType::Watermark,
            centered(page.width, side, ((page.height - side) / 2) as i32, side),
        );
        node.src = img.value().attr("src").map(str::to_string);
        nodes.push(node);
    }

    let mut y = (inset + pm(60)) as i32;
    if let Some(img) = document.select(&selector("img.certificate-logo-img")?).next() {
        let side = pm(100);
        let mut node = LayoutNode::block(ElementType::Logo, centered(page.width, side, y, side));
        node.src = img.value().attr("src").map(str::to_string);
        nodes.push(node);
        y += (side + pm(15)) as i32;
    }

    let content_width = page.width * 76 / 100;
    let footer_top = page.height.saturating_sub(inset + pm(140)) as i32;
    for &(sel, elem_type, permille) in FLOW {
        for el in document.select(&selector(sel)?) {
            let text = text_of(el);
            if text.is_empty() {
                continue;
            }
            let font_px = pm(permille);
            let max_chars = (content_width / advance(font_px)) as usize;
            for line in wrap_words(&text, max_chars) {
                if y >= footer_top {
                    break;
                }
                let width = line.chars().count() as u32 * advance(font_px);
                nodes.push(LayoutNode {
                    rect: centered(page.width, width, y, line_height(font_px)),
                    elem_type,
                    text: line,
                    src: None,
                    font_px,
                });
                y += line_height(font_px) as i32;
            }
            y += pm(8) as i32;
        }

        if elem_type == ElementType::Kind {
            let classes: Vec<bool> = document
                .select(&selector(".certificate-diamonds .diamond")?)
                .map(|d| d.value().classes().any(|c| c == "gold"))
                .collect();
            let side = pm(15);
            let gap = side;
            if !classes.is_empty() {
                let row = classes.len() as u32 * (side + gap) - gap;
                let mut x = (page.width.saturating_sub(row) / 2) as i32;
                for gold in classes {
                    nodes.push(LayoutNode::block(
                        ElementType::Diamond { gold },
                        Rect { x, y, width: side, height: side },
                    ));
                    x += (side + gap) as i32;
                }
                y += (side + pm(12)) as i32;
            }
        }
    }

    if document.select(&selector(".certificate-badge")?).next().is_some() {
        let side = pm(110);
        nodes.push(LayoutNode::block(
            ElementType::Seal,
            Rect {
                x: (page.width.saturating_sub(side) / 2) as i32,
                y: footer_top,
                width: side,
                height: side,
            },
        ));
    }

    let titles: Vec<String> = document
        .select(&selector(".certificate-signature .signature-title")?)
        .map(text_of)
        .collect();
    if !titles.is_empty() {
        let slot = page.width / titles.len() as u32;
        let line_width = page.width * 22 / 100;
        let line_y = footer_top + pm(70) as i32;
        let font_px = pm(18);
        for (i, title) in titles.into_iter().enumerate() {
            let center = slot * i as u32 + slot / 2;
            nodes.push(LayoutNode::block(
                ElementType::SignatureLine,
                Rect {
                    x: center.saturating_sub(line_width / 2) as i32,
                    y: line_y,
                    width: line_width,
                    height: pm(2),
                },
            ));
            let width = title.chars().count() as u32 * advance(font_px);
            nodes.push(LayoutNode {
                rect: Rect {
                    x: center.saturating_sub(width / 2) as i32,
                    y: line_y + pm(10) as i32,
                    width,
                    height: line_height(font_px),
                },
                elem_type: ElementType::SignatureTitle,
                text: title,
                src: None,
                font_px,
            });
        }
    }

    Ok(nodes)
}
