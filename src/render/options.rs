//! Render settings snapshot.

use crate::error::{Error, Result};
use crate::model::{HeaderFooterTemplate, Margins, Orientation, PageGeometry, PaperSize};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default body font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 14;

/// Smallest accepted font size in pixels.
pub const MIN_FONT_SIZE: u32 = 6;

/// Largest accepted font size in pixels.
pub const MAX_FONT_SIZE: u32 = 72;

/// Settings for one render, estimate or export cycle.
///
/// A snapshot is taken at the start of a cycle and passed by reference into
/// every component; nothing reads feature flags from shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Body font size in pixels
    pub font_size: u32,

    /// Feature toggles
    pub features: FeatureToggles,

    /// Running header
    pub header: HeaderFooter,

    /// Running footer
    pub footer: HeaderFooter,

    /// Paper size, orientation and margins
    #[serde(flatten)]
    pub geometry: PageGeometry,
}

impl RenderSettings {
    /// Create new settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check font size and page geometry.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.font_size) {
            return Err(Error::InvalidSettings(format!(
                "font size {}px is outside {}..={}px",
                self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE
            )));
        }
        self.geometry.validate()
    }

    /// Set the font size in pixels.
    pub fn with_font_size(mut self, px: u32) -> Self {
        self.font_size = px;
        self
    }

    /// Set the paper size.
    pub fn with_paper(mut self, paper: PaperSize) -> Self {
        self.geometry.paper = paper;
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.geometry.orientation = orientation;
        self
    }

    /// Set the margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.geometry.margins = margins;
        self
    }

    /// Replace the whole geometry.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Enable or disable diagram rendering.
    pub fn with_diagrams(mut self, enabled: bool) -> Self {
        self.features.diagrams = enabled;
        self
    }

    /// Enable or disable syntax highlighting.
    pub fn with_highlighting(mut self, enabled: bool) -> Self {
        self.features.highlighting = enabled;
        self
    }

    /// Enable or disable typographic replacements.
    pub fn with_typography(mut self, enabled: bool) -> Self {
        self.features.typography = enabled;
        self
    }

    /// Enable or disable background printing.
    pub fn with_print_background(mut self, enabled: bool) -> Self {
        self.features.print_background = enabled;
        self
    }

    /// Enable a running header with a template.
    pub fn with_header(mut self, template: impl Into<String>) -> Self {
        self.header = HeaderFooter::enabled(template);
        self
    }

    /// Enable a running footer with a template.
    pub fn with_footer(mut self, template: impl Into<String>) -> Self {
        self.footer = HeaderFooter::enabled(template);
        self
    }

    /// Font size as a float for layout.
    pub fn font_size_px(&self) -> f32 {
        self.font_size as f32
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            features: FeatureToggles::default(),
            header: HeaderFooter {
                enabled: false,
                template: HeaderFooterTemplate::new("{title}"),
            },
            footer: HeaderFooter {
                enabled: false,
                template: HeaderFooterTemplate::new("{date}"),
            },
            geometry: PageGeometry::default(),
        }
    }
}

/// Feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Render diagram code blocks as graphics
    pub diagrams: bool,

    /// Highlight code blocks
    pub highlighting: bool,

    /// Smart quotes, dashes and ellipses
    pub typography: bool,

    /// Keep background colours when printing
    pub print_background: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            diagrams: true,
            highlighting: true,
            typography: true,
            print_background: true,
        }
    }
}

/// Header or footer band configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderFooter {
    /// Whether the band is printed
    pub enabled: bool,

    /// Template string
    pub template: HeaderFooterTemplate,
}

impl HeaderFooter {
    /// An enabled band with the given template.
    pub fn enabled(template: impl Into<String>) -> Self {
        Self {
            enabled: true,
            template: HeaderFooterTemplate::new(template),
        }
    }

    /// Template to print, if the band is enabled and non-empty.
    pub fn active_template(&self) -> Option<&HeaderFooterTemplate> {
        (self.enabled && !self.template.is_empty()).then_some(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_settings_builder() {
        let settings = RenderSettings::new()
            .with_font_size(16)
            .with_paper(PaperSize::Letter)
            .with_orientation(Orientation::Landscape)
            .with_diagrams(false)
            .with_header("{title}");

        assert_eq!(settings.font_size, 16);
        assert_eq!(settings.geometry.paper, PaperSize::Letter);
        assert!(settings.geometry.is_landscape());
        assert!(!settings.features.diagrams);
        assert!(settings.features.highlighting);
        assert!(settings.header.active_template().is_some());
        assert!(settings.footer.active_template().is_none());
    }

    #[test]
    fn test_defaults() {
        let settings = RenderSettings::default();
        assert_eq!(settings.font_size, 14);
        assert_eq!(settings.geometry.margins, Margins::uniform(10.0));
        assert!(settings.features.diagrams);
        assert!(settings.features.typography);
        assert!(settings.features.print_background);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let settings = RenderSettings::from_json(
            r#"{ "paper": "letter", "orientation": "landscape", "font_size": 12,
                 "features": { "diagrams": false } }"#,
        )
        .unwrap();
        assert_eq!(settings.geometry.paper, PaperSize::Letter);
        assert!(settings.geometry.is_landscape());
        assert_eq!(settings.font_size, 12);
        assert!(!settings.features.diagrams);
        assert!(settings.features.highlighting);
    }

    #[test]
    fn test_json_roundtrip_preserves_templates() {
        let settings = RenderSettings::new().with_footer("{pageNumber} / {totalPages}");
        let json = settings.to_json().unwrap();
        let back = RenderSettings::from_json(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_validate_font_size() {
        let settings = RenderSettings::new().with_font_size(2);
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidSettings(_))
        ));
    }
}
