//! Paper sizes, orientation and margins resolved to a content box.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixels per millimetre at the 96 dpi CSS reference resolution (96 / 25.4).
pub const MM_TO_PX: f32 = 3.779_527_6;

/// Default margin on every side, in millimetres.
pub const DEFAULT_MARGIN_MM: f32 = 10.0;

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    /// ISO A4 (210 x 297 mm)
    #[default]
    A4,
    /// US Letter (8.5 x 11 in)
    Letter,
    /// US Legal (8.5 x 14 in)
    Legal,
    /// ISO A3 (297 x 420 mm)
    A3,
    /// ISO A5 (148 x 210 mm)
    A5,
}

impl PaperSize {
    /// Portrait (width, height) in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A5 => (148.0, 210.0),
        }
    }

    /// Name used in CSS `@page { size: ... }` rules.
    pub fn css_name(self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::Letter => "letter",
            PaperSize::Legal => "legal",
            PaperSize::A3 => "A3",
            PaperSize::A5 => "A5",
        }
    }

    /// All supported sizes.
    pub fn all() -> &'static [PaperSize] {
        &[
            PaperSize::A4,
            PaperSize::Letter,
            PaperSize::Legal,
            PaperSize::A3,
            PaperSize::A5,
        ]
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaperSize::A4 => "a4",
            PaperSize::Letter => "letter",
            PaperSize::Legal => "legal",
            PaperSize::A3 => "a3",
            PaperSize::A5 => "a5",
        };
        f.write_str(name)
    }
}

impl FromStr for PaperSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Ok(PaperSize::A4),
            "letter" => Ok(PaperSize::Letter),
            "legal" => Ok(PaperSize::Legal),
            "a3" => Ok(PaperSize::A3),
            "a5" => Ok(PaperSize::A5),
            other => Err(Error::InvalidSettings(format!(
                "unknown paper size: {}",
                other
            ))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Same margin on all four sides.
    pub fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    fn validate(&self) -> Result<()> {
        for (side, value) in [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidGeometry(format!(
                    "{} margin must be a non-negative number, got {}",
                    side, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN_MM)
    }
}

/// Paper size, orientation and margins resolved to a content box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    /// Paper size
    pub paper: PaperSize,

    /// Orientation; landscape swaps width and height
    pub orientation: Orientation,

    /// Margins in millimetres
    pub margins: Margins,
}

impl PageGeometry {
    /// Create a validated geometry.
    ///
    /// Margins that leave no room for content are rejected rather than clamped.
    pub fn new(paper: PaperSize, orientation: Orientation, margins: Margins) -> Result<Self> {
        let geometry = Self {
            paper,
            orientation,
            margins,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check the content-box invariant.
    pub fn validate(&self) -> Result<()> {
        self.margins.validate()?;
        let (width, height) = (self.content_width_mm(), self.content_height_mm());
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "margins leave a {:.1}mm x {:.1}mm content box on {} {}",
                width, height, self.paper, self.orientation
            )));
        }
        Ok(())
    }

    /// Paper (width, height) in millimetres after applying orientation.
    pub fn page_size_mm(&self) -> (f32, f32) {
        let (w, h) = self.paper.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Content box width in millimetres.
    pub fn content_width_mm(&self) -> f32 {
        self.page_size_mm().0 - self.margins.left - self.margins.right
    }

    /// Content box height in millimetres.
    pub fn content_height_mm(&self) -> f32 {
        self.page_size_mm().1 - self.margins.top - self.margins.bottom
    }

    /// Content box width in CSS pixels.
    pub fn content_width_px(&self) -> f32 {
        mm_to_px(self.content_width_mm())
    }

    /// Content box height in CSS pixels.
    pub fn content_height_px(&self) -> f32 {
        mm_to_px(self.content_height_mm())
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }
}

/// Convert millimetres to CSS pixels.
pub fn mm_to_px(mm: f32) -> f32 {
    mm * MM_TO_PX
}
