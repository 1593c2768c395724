//! Discrete pagination for the paged export backend.

use super::backend::{AssembledBlock, AssembledDocument};
use super::page::PrintGeometry;
use super::styles::EXPORT_ROOT_CLASS;
use crate::model::{escape_html, HeaderFooterTemplate, TemplateContext};

/// One fixed-size page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// HTML of the blocks on this page
    pub blocks: Vec<String>,

    /// Height used by content, in pixels
    pub used_height: f32,

    /// Header text stamped after pagination
    pub header: Option<String>,

    /// Footer text stamped after pagination
    pub footer: Option<String>,
}

/// A document split into fixed-size pages.
#[derive(Debug, Clone)]
pub struct PaginatedDocument {
    pub title: String,
    pub pages: Vec<Page>,
    pub geometry: PrintGeometry,
    pub stylesheet: String,
    pub root_style: Option<String>,
}

impl PaginatedDocument {
    /// Split an assembled document into pages.
    pub fn from_assembled(doc: &AssembledDocument) -> Self {
        let pages = Paginator::new(doc.geometry.content_height_px()).paginate(&doc.blocks);
        Self {
            title: doc.title.clone(),
            pages,
            geometry: doc.geometry,
            stylesheet: doc.stylesheet(),
            root_style: doc.root_style.clone(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Render header and footer templates on every page with its page number.
    pub fn stamp(
        &mut self,
        header: Option<&HeaderFooterTemplate>,
        footer: Option<&HeaderFooterTemplate>,
        context: &TemplateContext,
    ) {
        let total = self.page_count();
        for page in &mut self.pages {
            let ctx = context.for_page(page.number, total);
            page.header = header.map(|t| t.render(&ctx));
            page.footer = footer.map(|t| t.render(&ctx));
        }
    }

    /// Full HTML document with one section per page.
    pub fn to_html(&self) -> String {
        let g = &self.geometry;
        let mut html = String::with_capacity(4096);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n<style>\n", escape_html(&self.title)));
        html.push_str(&self.stylesheet);
        html.push_str(&format!(
            ".paperdown-page {{ position: relative; box-sizing: border-box; overflow: hidden; \
             width: {w}mm; height: {h}mm; padding: {t}mm {r}mm {b}mm {l}mm; \
             break-after: page; page-break-after: always; }}\n\
             .paperdown-page:last-child {{ break-after: auto; page-break-after: auto; }}\n\
             .paperdown-page .paperdown-header {{ position: absolute; top: 0; left: {l}mm; right: {r}mm; height: {t}mm; line-height: {t}mm; }}\n\
             .paperdown-page .paperdown-footer {{ position: absolute; bottom: 0; left: {l}mm; right: {r}mm; height: {b}mm; line-height: {b}mm; }}\n",
            w = g.width_mm,
            h = g.height_mm,
            t = g.margins.top,
            r = g.margins.right,
            b = g.margins.bottom,
            l = g.margins.left,
        ));
        html.push_str(&format!("@page {{ size: {}mm {}mm; margin: 0; }}\n", g.width_mm, g.height_mm));
        html.push_str("</style>\n</head>\n<body>\n");

        for page in &self.pages {
            html.push_str(&format!(
                "<section class=\"paperdown-page\" data-page=\"{}\">\n",
                page.number
            ));
            if let Some(ref header) = page.header {
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
            for block in &page.blocks {
                html.push_str(block);
            }
            html.push_str("</div>\n");
            if let Some(ref footer) = page.footer {
                html.push_str(&format!(
                    "<div class=\"paperdown-footer\">{}</div>\n",
                    escape_html(footer)
                ));
            }
            html.push_str("</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Splits laid-out blocks into pages of a fixed content height.
///
/// Manual breaks always start a new page. A block that does not fit in the
/// remaining space moves to the next page; a block taller than a whole page
/// gets a page of its own.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_height: f32,
}

impl Paginator {
    /// Create a paginator for a page content height in pixels.
    pub fn new(page_height: f32) -> Self {
        Self { page_height }
    }

    /// Split blocks into pages.
    pub fn paginate(&self, blocks: &[AssembledBlock]) -> Vec<Page> {
        let mut pages = Vec::new();
        let mut current = Page::default();
        let mut origin = 0.0f32;

        for block in blocks {
            if block.page_break {
                if !current.blocks.is_empty() {
                    pages.push(std::mem::take(&mut current));
                }
                origin = block.layout.bottom();
                continue;
            }

            let bottom = block.layout.bottom() - origin;
            if bottom > self.page_height && !current.blocks.is_empty() {
                pages.push(std::mem::take(&mut current));
                origin = block.layout.top;
            }

            current.used_height = block.layout.bottom() - origin;
            current.blocks.push(block.html.clone());
        }

        if !current.blocks.is_empty() || pages.is_empty() {
            pages.push(current);
        }

        for (i, page) in pages.iter_mut().enumerate() {
            page.number = i as u32 + 1;
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockBox;

    fn block(top: f32, height: f32) -> AssembledBlock {
        AssembledBlock {
            html: format!("<p>{}</p>", top),
            layout: BlockBox {
                top,
                height,
                width: 100.0,
            },
            page_break: false,
        }
    }

    fn page_break(top: f32) -> AssembledBlock {
        AssembledBlock {
            html: "<div class=\"page-break\"></div>".to_string(),
            layout: BlockBox {
                top,
                height: 0.0,
                width: 100.0,
            },
            page_break: true,
        }
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let pages = Paginator::new(100.0).paginate(&[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
    }

    #[test]
    fn test_overflow_moves_block_to_next_page() {
        let blocks = vec![block(0.0, 60.0), block(70.0, 60.0), block(140.0, 20.0)];
        let pages = Paginator::new(100.0).paginate(&blocks);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].blocks.len(), 1);
        assert_eq!(pages[1].blocks.len(), 2);
        assert_eq!(pages[1].used_height, 90.0);
    }

    #[test]
    fn test_manual_break_starts_new_page() {
        let blocks = vec![block(0.0, 10.0), page_break(26.0), block(26.0, 10.0)];
        let pages = Paginator::new(1000.0).paginate(&blocks);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 2);
    }

    #[test]
    fn test_leading_and_repeated_breaks_do_not_add_blank_pages() {
        let blocks = vec![page_break(0.0), block(0.0, 10.0), page_break(10.0), page_break(10.0)];
        let pages = Paginator::new(1000.0).paginate(&blocks);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_tall_block_gets_own_page() {
        let blocks = vec![block(0.0, 10.0), block(20.0, 500.0), block(530.0, 10.0)];
        let pages = Paginator::new(100.0).paginate(&blocks);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].blocks.len(), 1);
    }
}
