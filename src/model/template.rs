//! Header/footer templates with placeholder tokens.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Format used for the `{date}` token.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const TOKEN_DATE: &str = "{date}";
const TOKEN_TITLE: &str = "{title}";
const TOKEN_PAGE_NUMBER: &str = "{pageNumber}";
const TOKEN_TOTAL_PAGES: &str = "{totalPages}";

/// Values substituted into a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    /// Document title
    pub title: String,

    /// Export date
    pub date: NaiveDate,

    /// Current page (1-indexed), when pagination is known
    pub page_number: Option<u32>,

    /// Total pages, when pagination is known
    pub total_pages: Option<u32>,
}

impl TemplateContext {
    /// Context for the print path, where pagination is not known.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            page_number: None,
            total_pages: None,
        }
    }

    /// Context for a specific page once the true page count is known.
    pub fn for_page(&self, page_number: u32, total_pages: u32) -> Self {
        Self {
            page_number: Some(page_number),
            total_pages: Some(total_pages),
            ..self.clone()
        }
    }
}

/// A header or footer template.
///
/// `{pageNumber}` and `{totalPages}` resolve to the empty string unless the
/// context carries a page count. The true page count is unknowable before the
/// external print engine paginates, so print-dialog output leaves them blank.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderFooterTemplate(String);

impl HeaderFooterTemplate {
    /// Create a template from a string.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Raw template string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the template has no content.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Check if the template uses page-number tokens.
    pub fn uses_page_tokens(&self) -> bool {
        self.0.contains(TOKEN_PAGE_NUMBER) || self.0.contains(TOKEN_TOTAL_PAGES)
    }

    /// Substitute all tokens in a single pass.
    ///
    /// Substituted values are never rescanned, so a title containing
    /// `{pageNumber}` stays literal.
    pub fn render(&self, ctx: &TemplateContext) -> String {
        static TOKEN: OnceLock<Regex> = OnceLock::new();

        TOKEN
            .get_or_init(|| {
                Regex::new(r"\{(?:date|title|pageNumber|totalPages)\}").expect("token pattern")
            })
            .replace_all(&self.0, |caps: &Captures| match &caps[0] {
                TOKEN_DATE => ctx.date.format(DATE_FORMAT).to_string(),
                TOKEN_TITLE => ctx.title.clone(),
                TOKEN_PAGE_NUMBER => ctx.page_number.map(|n| n.to_string()).unwrap_or_default(),
                TOKEN_TOTAL_PAGES => ctx.total_pages.map(|n| n.to_string()).unwrap_or_default(),
                other => other.to_string(),
            })
            .into_owned()
    }
}

impl From<&str> for HeaderFooterTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
