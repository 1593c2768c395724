//! Print page geometry.

use crate::error::{Error, Result};
use crate::model::{mm_to_px, Margins, Orientation, PaperSize};
use crate::render::RenderSettings;
use serde::{Deserialize, Serialize};

/// Height of the band reserved for a running header or footer, in millimetres.
pub const BAND_HEIGHT_MM: f32 = 10.0;

/// Page size and margins handed to the print engine.
///
/// Top and bottom margins are widened by [`BAND_HEIGHT_MM`] when a header or
/// footer is printed, so the band never overlaps content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintGeometry {
    pub paper: PaperSize,
    pub orientation: Orientation,

    /// Page width after orientation, in millimetres
    pub width_mm: f32,

    /// Page height after orientation, in millimetres
    pub height_mm: f32,

    /// Margins including header/footer bands
    pub margins: Margins,

    /// Whether a header band is reserved
    pub header_band: bool,

    /// Whether a footer band is reserved
    pub footer_band: bool,
}

impl PrintGeometry {
    /// Compute print geometry for a settings snapshot.
    pub fn new(settings: &RenderSettings) -> Result<Self> {
        let geometry = &settings.geometry;
        geometry.validate()?;

        let (width_mm, height_mm) = geometry.page_size_mm();
        let header_band = settings.header.active_template().is_some();
        let footer_band = settings.footer.active_template().is_some();

        let mut margins = geometry.margins;
        if header_band {
            margins.top += BAND_HEIGHT_MM;
        }
        if footer_band {
            margins.bottom += BAND_HEIGHT_MM;
        }

        let print = Self {
            paper: geometry.paper,
            orientation: geometry.orientation,
            width_mm,
            height_mm,
            margins,
            header_band,
            footer_band,
        };

        if print.content_height_mm() <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "header/footer bands leave no room for content ({:.1}mm)",
                print.content_height_mm()
            )));
        }
        Ok(print)
    }

    /// Content width in millimetres.
    pub fn content_width_mm(&self) -> f32 {
        self.width_mm - self.margins.left - self.margins.right
    }

    /// Content height in millimetres.
    pub fn content_height_mm(&self) -> f32 {
        self.height_mm - self.margins.top - self.margins.bottom
    }

    /// Content width in CSS pixels.
    pub fn content_width_px(&self) -> f32 {
        mm_to_px(self.content_width_mm())
    }

    /// Content height in CSS pixels.
    pub fn content_height_px(&self) -> f32 {
        mm_to_px(self.content_height_mm())
    }

    /// `@page` rule for this geometry.
    pub fn page_css(&self) -> String {
        format!(
            "@page {{ size: {} {}; margin: {}mm {}mm {}mm {}mm; }}\n",
            self.paper.css_name(),
            self.orientation,
            fmt_mm(self.margins.top),
            fmt_mm(self.margins.right),
            fmt_mm(self.margins.bottom),
            fmt_mm(self.margins.left)
        )
    }
}

fn fmt_mm(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
