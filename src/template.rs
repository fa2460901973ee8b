//! Template selection: category tags, canned text and request merging.
//!
//! A [`CertificateRequest`] is built fresh from raw [`FormInput`] every time
//! the form is submitted and is never mutated afterwards. [`render`] merges it
//! with the category's [`CategoryTemplate`] into a [`RenderedDocument`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{Branding, RenderedDocument};
use crate::Error;

/// The four certificate kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Completion,
    Achievement,
    Participation,
    Appreciation,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Completion,
        Category::Achievement,
        Category::Participation,
        Category::Appreciation,
    ];

    /// Lowercase tag used by forms and the CLI
    pub fn tag(self) -> &'static str {
        match self {
            Category::Completion => "completion",
            Category::Achievement => "achievement",
            Category::Participation => "participation",
            Category::Appreciation => "appreciation",
        }
    }

    /// Resolve a tag, falling back to `Completion` for anything unknown.
    pub fn from_tag_or_default(tag: &str) -> Category {
        tag.parse().unwrap_or_else(|_| {
            debug!("unknown certificate category {:?}; using completion", tag);
            Category::Completion
        })
    }

    /// The fixed text fragments for this category
    pub fn template(self) -> &'static CategoryTemplate {
        match self {
            Category::Completion => &TEMPLATES[0],
            Category::Achievement => &TEMPLATES[1],
            Category::Participation => &TEMPLATES[2],
            Category::Appreciation => &TEMPLATES[3],
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.tag() == s)
            .ok_or_else(|| Error::Other(format!("unknown certificate category: {}", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Canned text for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTemplate {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub text: &'static str,
    pub description: &'static str,
}

impl CategoryTemplate {
    /// The part of the title after "Certificate of ", shown under the main heading
    pub fn kind_label(&self) -> &'static str {
        self.title
            .strip_prefix("Certificate of ")
            .unwrap_or(self.title)
    }
}

static TEMPLATES: [CategoryTemplate; 4] = [
    CategoryTemplate {
        title: "Certificate of Completion",
        subtitle: "This is to certify that",
        text: "has successfully completed the course",
        description: "This certificate is awarded in recognition of dedication, hard work, and successful completion of all course requirements. The recipient has demonstrated commitment to excellence and mastery of the subject matter.",
    },
    CategoryTemplate {
        title: "Certificate of Achievement",
        subtitle: "This is proudly presented to",
        text: "for outstanding achievement in",
        description: "This certificate recognizes exceptional performance, outstanding dedication, and exemplary achievement. The recipient has demonstrated excellence and has set a remarkable standard of success.",
    },
    CategoryTemplate {
        title: "Certificate of Participation",
        subtitle: "This is awarded to",
        text: "for active participation in",
        description: "This certificate acknowledges active involvement, enthusiastic participation, and valuable contribution. The recipient has demonstrated commitment and has made meaningful contributions throughout the program.",
    },
    CategoryTemplate {
        title: "Certificate of Appreciation",
        subtitle: "This is presented to",
        text: "in recognition of valuable contributions to",
        description: "This certificate is presented in appreciation of outstanding service, dedication, and valuable contributions. The recipient has demonstrated exceptional commitment and has made a significant positive impact.",
    },
];

/// Raw form values as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormInput {
    pub recipient_name: String,
    pub subject_name: String,
    /// `YYYY-MM-DD`, as produced by a date input
    pub date: String,
    pub grade: String,
    pub description: String,
}

/// An immutable certificate request, built once per submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub category: Category,
    pub recipient_name: String,
    pub subject_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub grade: Option<String>,
    pub description: Option<String>,
}

impl CertificateRequest {
    pub fn new(category: Category, recipient_name: impl Into<String>) -> Self {
        Self {
            category,
            recipient_name: recipient_name.into(),
            subject_name: None,
            date: None,
            grade: None,
            description: None,
        }
    }

    /// Build a request from the selected category tag and raw form values.
    ///
    /// Text fields are taken as typed. Empty optional fields become `None`;
    /// a date that does not parse as `YYYY-MM-DD` is dropped rather than
    /// reported.
    pub fn from_form(category_tag: &str, form: &FormInput) -> Self {
        Self {
            category: Category::from_tag_or_default(category_tag),
            recipient_name: form.recipient_name.clone(),
            subject_name: non_empty(&form.subject_name),
            date: parse_date(&form.date),
            grade: non_empty(&form.grade),
            description: non_empty(&form.description),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject_name = non_empty(&subject.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = non_empty(&grade.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(&description.into());
        self
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(e) => {
            debug!("ignoring unparseable date {:?}: {}", t, e);
            None
        }
    }
}

/// Long US-style date, e.g. `May 1, 2024`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Upper-case the first character of every word.
///
/// A word starts at an ASCII alphanumeric or `_` that follows any other
/// character (or the start of the string).
pub fn capitalize_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_is_word = false;
    for c in input.chars() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !prev_is_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

/// Merge a request with its category template.
///
/// Never fails: unknown categories were already resolved to completion and
/// an absent description is replaced by the canned one.
pub fn render(request: &CertificateRequest, branding: &Branding) -> RenderedDocument {
    let template = request.category.template();
    let description = request
        .description
        .clone()
        .unwrap_or_else(|| template.description.to_string());

    RenderedDocument {
        category: request.category,
        title: template.title.to_string(),
        kind_label: template.kind_label().to_string(),
        subtitle: template.subtitle.to_string(),
        recipient_name: request.recipient_name.clone(),
        description,
        body_text: template.text.to_string(),
        subject_name: request.subject_name.clone(),
        grade: request.grade.clone(),
        date: request.date.map(format_long_date),
        organization: branding.organization.clone(),
        signature_titles: branding.signature_titles.clone(),
        images: branding.images(),
    }
}
