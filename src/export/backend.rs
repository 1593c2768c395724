//! Export backends and the assembled document handed to them.

use super::page::PrintGeometry;
use super::paginate::PaginatedDocument;
use super::styles::{ExportStyling, EXPORT_ROOT_CLASS};
use crate::error::{Error, Result};
use crate::model::{escape_html, BlockBox, HeaderFooterTemplate, TemplateContext};
use std::path::{Path, PathBuf};

/// File name used when no output path is given.
pub const DEFAULT_EXPORT_FILENAME: &str = "paperdown-export.html";

/// A styled, laid-out block of the export surface.
#[derive(Debug, Clone)]
pub struct AssembledBlock {
    /// Styled HTML
    pub html: String,
    /// Box from the final layout pass at print width
    pub layout: BlockBox,
    /// Whether this block is a manual page break
    pub page_break: bool,
}

/// A print-ready document.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    /// Title from the first level-1 heading, or a fallback
    pub title: String,

    /// Blocks in document order
    pub blocks: Vec<AssembledBlock>,

    /// Page size and margins
    pub geometry: PrintGeometry,

    /// How styles were applied
    pub styling: ExportStyling,

    /// Shared rules plus the scoped stylesheet when styling is `Stylesheet`
    pub css: String,

    /// Style attribute for the export root (inline styling only)
    pub root_style: Option<String>,

    /// Header text with page tokens blank
    pub header: Option<String>,

    /// Footer text with page tokens blank
    pub footer: Option<String>,

    /// Header template, for backends that know the page count
    pub header_template: Option<HeaderFooterTemplate>,

    /// Footer template, for backends that know the page count
    pub footer_template: Option<HeaderFooterTemplate>,

    /// Values substituted into templates
    pub context: TemplateContext,
}

impl AssembledDocument {
    /// Concatenated block HTML.
    pub fn body_html(&self) -> String {
        self.blocks.iter().map(|b| b.html.as_str()).collect()
    }

    /// Stylesheet without page rules.
    pub fn stylesheet(&self) -> String {
        self.css.clone()
    }

    /// Print-styled HTML document for a print dialog.
    ///
    /// Headers and footers are fixed-position bands inside the widened page
    /// margins, so the print engine repeats them on every page.
    pub fn to_html(&self) -> String {
        let g = &self.geometry;
        let mut html = String::with_capacity(self.blocks.len() * 128 + 2048);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n<style>\n", escape_html(&self.title)));
        html.push_str(&g.page_css());
        html.push_str(&self.css);
        if g.header_band {
            html.push_str(&format!(
                ".paperdown-header {{ position: fixed; top: -{t}mm; left: 0; right: 0; height: {t}mm; line-height: {t}mm; }}\n",
                t = super::page::BAND_HEIGHT_MM
            ));
        }
        if g.footer_band {
            html.push_str(&format!(
                ".paperdown-footer {{ position: fixed; bottom: -{b}mm; left: 0; right: 0; height: {b}mm; line-height: {b}mm; }}\n",
                b = super::page::BAND_HEIGHT_MM
            ));
        }
        html.push_str("</style>\n</head>\n<body>\n");

        if let Some(ref header) = self.header {
            html.push_str(&format!(
                "<div class=\"paperdown-header\">{}</div>\n",
                escape_html(header)
            ));
        }
        match self.root_style {
            Some(ref style) => html.push_str(&format!(
                "<div class=\"{}\" style=\"{}\">\n",
                EXPORT_ROOT_CLASS, style
            )),
            None => html.push_str(&format!("<div class=\"{}\">\n", EXPORT_ROOT_CLASS)),
        }
        html.push_str(&self.body_html());
        html.push_str("</div>\n");
        if let Some(ref footer) = self.footer {
            html.push_str(&format!(
                "<div class=\"paperdown-footer\">{}</div>\n",
                escape_html(footer)
            ));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// What a backend did with an assembled document.
#[derive(Debug)]
pub enum HandOff {
    /// The backend took over pagination (print dialog); page count unknown
    Delegated { output: Option<PathBuf> },
    /// The backend paginated the document and expects page numbers stamped
    /// before [`ExportBackend::finish`]
    Paginated(PaginatedDocument),
}

/// An external rendering surface.
#[allow(async_fn_in_trait)]
pub trait ExportBackend {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Resolves once fonts used by the document are available.
    ///
    /// The built-in backends measure with fixed metrics and resolve at once.
    /// Backends that load web fonts override this; the wait is bounded by
    /// the layout timeout.
    async fn fonts_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Take the assembled document.
    async fn hand_off(&self, document: &AssembledDocument) -> Result<HandOff>;

    /// Write a paginated document after page numbers were stamped.
    async fn finish(&self, document: PaginatedDocument) -> Result<Option<PathBuf>> {
        let _ = document;
        Err(Error::Backend(format!(
            "{} does not accept paginated documents",
            self.name()
        )))
    }
}

/// Writes a print-styled HTML document for the browser's print dialog.
#[derive(Debug, Clone)]
pub struct PrintDocumentBackend {
    output: PathBuf,
}

impl PrintDocumentBackend {
    /// Write to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Output path.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Default for PrintDocumentBackend {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_FILENAME)
    }
}

impl ExportBackend for PrintDocumentBackend {
    fn name(&self) -> &str {
        "print"
    }

    async fn hand_off(&self, document: &AssembledDocument) -> Result<HandOff> {
        write_output(&self.output, &document.to_html()).await?;
        log::info!("Wrote print document to {}", self.output.display());
        Ok(HandOff::Delegated {
            output: Some(self.output.clone()),
        })
    }
}

/// Paginates into fixed-size page sections and writes the result.
#[derive(Debug, Clone)]
pub struct PagedDocumentBackend {
    output: PathBuf,
}

impl PagedDocumentBackend {
    /// Write to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Output path.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Default for PagedDocumentBackend {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_FILENAME)
    }
}

impl ExportBackend for PagedDocumentBackend {
    fn name(&self) -> &str {
        "paged"
    }

    async fn hand_off(&self, document: &AssembledDocument) -> Result<HandOff> {
        let paged = PaginatedDocument::from_assembled(document);
        log::debug!("Paginated into {} page(s)", paged.page_count());
        Ok(HandOff::Paginated(paged))
    }

    async fn finish(&self, document: PaginatedDocument) -> Result<Option<PathBuf>> {
        write_output(&self.output, &document.to_html()).await?;
        log::info!(
            "Wrote {} page(s) to {}",
            document.page_count(),
            self.output.display()
        );
        Ok(Some(self.output.clone()))
    }
}

async fn write_output(path: &Path, html: &str) -> Result<()> {
    tokio::fs::write(path, html)
        .await
        .map_err(|e| Error::Backend(format!("cannot write {}: {}", path.display(), e)))
}
