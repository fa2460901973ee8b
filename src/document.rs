//! The rendered certificate and its HTML serialisation

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::template::Category;

/// Organization-specific strings and image assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    /// Shown on the seal and in the logo's alt text
    pub organization: String,
    pub logo_src: String,
    pub watermark_src: String,
    pub signature_titles: Vec<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            organization: "Aarambha College".to_string(),
            logo_src: "aarambha_logo.png".to_string(),
            watermark_src: "karta.png".to_string(),
            signature_titles: vec!["Signature".to_string(), "Signature".to_string()],
        }
    }
}

impl Branding {
    pub(crate) fn images(&self) -> Vec<EmbeddedImage> {
        vec![
            EmbeddedImage {
                role: ImageRole::Watermark,
                src: self.watermark_src.clone(),
                alt: "Watermark".to_string(),
            },
            EmbeddedImage {
                role: ImageRole::Logo,
                src: self.logo_src.clone(),
                alt: format!("{} Logo", self.organization),
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Watermark,
    Logo,
}

/// An image referenced by the certificate markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub role: ImageRole,
    /// Either an external reference (path or URL) or a `data:` URI
    pub src: String,
    pub alt: String,
}

impl EmbeddedImage {
    pub fn is_inline(&self) -> bool {
        self.src.starts_with("data:")
    }
}

/// A certificate ready to be mounted on a display surface.
///
/// Produced by [`crate::template::render`]; the only way to change one is to
/// derive a copy (see [`RenderedDocument::with_image_source`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub(crate) category: Category,
    pub(crate) title: String,
    pub(crate) kind_label: String,
    pub(crate) subtitle: String,
    pub(crate) recipient_name: String,
    pub(crate) description: String,
    pub(crate) body_text: String,
    pub(crate) subject_name: Option<String>,
    pub(crate) grade: Option<String>,
    pub(crate) date: Option<String>,
    pub(crate) organization: String,
    pub(crate) signature_titles: Vec<String>,
    pub(crate) images: Vec<EmbeddedImage>,
}

impl RenderedDocument {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn grade(&self) -> Option<&str> {
        self.grade.as_deref()
    }

    /// The formatted date, if the request carried a valid one
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    /// Copy of this document with the image in `role` pointing at `src`
    pub fn with_image_source(&self, role: ImageRole, src: impl Into<String>) -> Self {
        let src = src.into();
        let mut doc = self.clone();
        for img in doc.images.iter_mut().filter(|i| i.role == role) {
            img.src = src.clone();
        }
        doc
    }

    fn image(&self, role: ImageRole) -> Option<&EmbeddedImage> {
        self.images.iter().find(|i| i.role == role)
    }

    /// Inner markup of the certificate container
    pub fn markup(&self) -> String {
        let mut html = String::with_capacity(4096);

        html.push_str(concat!(
            "<div class=\"certificate-corner-tl\"></div>\n",
            "<div class=\"certificate-corner-tr\"></div>\n",
            "<div class=\"certificate-corner-bl\"></div>\n",
            "<div class=\"certificate-corner-br\"></div>\n",
            "<div class=\"certificate-inner-border\"></div>\n",
        ));

        if let Some(img) = self.image(ImageRole::Watermark) {
            let _ = writeln!(
                html,
                "<div class=\"certificate-watermark\"><img src=\"{}\" alt=\"{}\"></div>",
                escape_html(&img.src),
                escape_html(&img.alt)
            );
        }

        html.push_str("<div class=\"certificate-content\">\n");
        if let Some(img) = self.image(ImageRole::Logo) {
            let _ = writeln!(
                html,
                "<img src=\"{}\" alt=\"{}\" class=\"certificate-logo-img\">",
                escape_html(&img.src),
                escape_html(&img.alt)
            );
        }

        let _ = write!(
            html,
            concat!(
                "<div class=\"certificate-header\">\n",
                "<div class=\"certificate-main-title\">CERTIFICATE</div>\n",
                "<div class=\"certificate-type\">OF {kind}</div>\n",
                "<div class=\"certificate-diamonds\">",
                "<div class=\"diamond gold\"></div>",
                "<div class=\"diamond blue\"></div>",
                "<div class=\"diamond gold\"></div>",
                "</div>\n",
                "<div class=\"certificate-subtitle\">{subtitle}</div>\n",
                "</div>\n",
                "<div class=\"certificate-body\">\n",
                "<div class=\"certificate-name\">{name}</div>\n",
                "<div class=\"certificate-description\">{description}</div>\n",
                "<div class=\"certificate-text\">{text}</div>\n",
            ),
            kind = escape_html(&self.kind_label),
            subtitle = escape_html(&self.subtitle),
            name = escape_html(&self.recipient_name),
            description = escape_html(&self.description),
            text = escape_html(&self.body_text),
        );

        if let Some(subject) = &self.subject_name {
            let _ = writeln!(html, "<div class=\"certificate-course\">{}</div>", escape_html(subject));
        }
        if let Some(grade) = &self.grade {
            let _ = writeln!(html, "<div class=\"certificate-grade\">Grade: {}</div>", escape_html(grade));
        }
        if let Some(date) = &self.date {
            let _ = writeln!(html, "<div class=\"certificate-date\">{}</div>", escape_html(date));
        }

        let _ = write!(
            html,
            concat!(
                "<div class=\"certificate-badge\">",
                "<div class=\"certificate-badge-circle\">",
                "<div class=\"certificate-badge-text\">{org}</div>",
                "</div>",
                "<div class=\"certificate-badge-ribbon\"></div>",
                "</div>\n",
                "</div>\n",
                "<div class=\"certificate-footer\">\n",
            ),
            org = escape_html(&self.organization),
        );
        for title in &self.signature_titles {
            let _ = writeln!(
                html,
                "<div class=\"certificate-signature\"><div class=\"signature-line\"></div><div class=\"signature-title\">{}</div></div>",
                escape_html(title)
            );
        }
        html.push_str("</div>\n</div>\n");
        html
    }

    /// Standalone HTML page suitable for printing
    pub fn printable_page(&self) -> String {
        format!(
            concat!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
                "<meta charset=\"utf-8\">\n<title>{title}: {name}</title>\n",
                "<style>\n{style}</style>\n</head>\n<body>\n",
                "<div id=\"certificate\" class=\"certificate\">\n{markup}</div>\n",
                "</body>\n</html>\n",
            ),
            title = escape_html(&self.title),
            name = escape_html(&self.recipient_name),
            style = PRINT_STYLE,
            markup = self.markup(),
        )
    }
}

const PRINT_STYLE: &str = r#"@page { size: A4 landscape; margin: 0; }
body { margin: 0; font-family: Georgia, serif; }
.certificate { position: relative; width: 297mm; height: 210mm; background: #fff; overflow: hidden; }
.certificate-inner-border { position: absolute; inset: 12mm; border: 2px solid #c9a227; }
.certificate-watermark { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; opacity: .06; }
.certificate-content { position: relative; text-align: center; padding: 20mm 30mm; }
.certificate-logo-img { height: 22mm; }
.certificate-main-title { font-size: 42pt; letter-spacing: 6pt; color: #1e3a5f; }
.certificate-type { font-size: 16pt; letter-spacing: 4pt; text-transform: uppercase; color: #c9a227; }
.certificate-name { font-size: 32pt; font-style: italic; margin: 6mm 0; color: #1e3a5f; }
.certificate-description, .certificate-text { font-size: 11pt; color: #475569; }
.certificate-course, .certificate-grade, .certificate-date { font-size: 13pt; margin-top: 2mm; }
.certificate-footer { display: flex; justify-content: space-around; margin-top: 10mm; }
.signature-line { width: 50mm; border-top: 1px solid #1e3a5f; }
"#;

/// Escape text for use in element content and quoted attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{render, CertificateRequest};

    fn doc() -> RenderedDocument {
        render(
            &CertificateRequest::new(Category::Achievement, "Ada <Lovelace>"),
            &Branding::default(),
        )
    }

    #[test]
    fn markup_escapes_user_text() {
        let html = doc().markup();
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(!html.contains("<Lovelace>"));
    }

    #[test]
    fn markup_omits_absent_optional_blocks() {
        let html = doc().markup();
        assert!(!html.contains("certificate-course"));
        assert!(!html.contains("certificate-grade"));
        assert!(!html.contains("certificate-date"));
    }

    #[test]
    fn with_image_source_replaces_only_that_role() {
        let d = doc().with_image_source(ImageRole::Logo, "data:image/png;base64,AAAA");
        let logo = d.images().iter().find(|i| i.role == ImageRole::Logo).unwrap();
        let mark = d.images().iter().find(|i| i.role == ImageRole::Watermark).unwrap();
        assert!(logo.is_inline());
        assert_eq!(mark.src, "karta.png");
        assert!(d.markup().contains("data:image/png;base64,AAAA"));
    }

    #[test]
    fn printable_page_wraps_markup() {
        let page = doc().printable_page();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<div id=\"certificate\" class=\"certificate\">"));
        assert!(page.contains("Certificate of Achievement: Ada &lt;Lovelace&gt;"));
    }

    #[test]
    fn escape_html_handles_quotes_and_ampersands() {
        assert_eq!(escape_html(r#"a & "b""#), "a &amp; &quot;b&quot;");
    }
}
