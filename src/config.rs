//! Render tunables.
//!
//! Everything the compositor treats as a fixed visual constant lives here so callers can override
//! it from a JSON file. Every field has a default, so `{}` is a valid configuration.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::{
    core::{Canvas, Rgba8},
    error::{CoverError, CoverResult},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub canvas: Canvas,
    /// Fill used when no background bitmap is loaded.
    pub fallback_color: Rgba8,
    pub shadow: ShadowProfile,
    /// Family used when the style names none.
    pub default_font_family: String,
    pub limits: StyleLimits,
    pub export: ExportConfig,
    /// Worker threads used for background decodes.
    pub loader_threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fallback_color: Rgba8::rgb(0x33, 0x33, 0x33),
            shadow: ShadowProfile::default(),
            default_font_family: "Arial".to_owned(),
            limits: StyleLimits::default(),
            export: ExportConfig::default(),
            loader_threads: 1,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(s: &str) -> CoverResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse render config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> CoverResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open render config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse render config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoverResult<()> {
        self.canvas.validate()?;
        self.shadow.validate()?;
        self.limits.validate()?;
        if self.export.file_name.trim().is_empty() {
            return Err(CoverError::validation("export file_name must be non-empty"));
        }
        if self.export.file_name.contains(['/', '\\']) {
            return Err(CoverError::validation(
                "export file_name must not contain path separators",
            ));
        }
        if self.loader_threads == 0 {
            return Err(CoverError::validation("loader_threads must be >= 1"));
        }
        Ok(())
    }
}

/// Drop shadow applied to the text passes when enabled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowProfile {
    pub color: Rgba8,
    /// Blur radius in the canvas sense: the Gaussian sigma is half of this.
    pub blur_px: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for ShadowProfile {
    fn default() -> Self {
        Self {
            // rgba(0, 0, 0, 0.7)
            color: Rgba8::rgba(0, 0, 0, 179),
            blur_px: 4.0,
            offset_x: 2,
            offset_y: 2,
        }
    }
}

impl ShadowProfile {
    fn validate(&self) -> CoverResult<()> {
        if !self.blur_px.is_finite() || self.blur_px < 0.0 {
            return Err(CoverError::validation(
                "shadow blur_px must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Gaussian parameters `(radius, sigma)` for the configured blur.
    pub(crate) fn kernel(&self) -> (u32, f32) {
        let sigma = self.blur_px / 2.0;
        if sigma <= 0.0 {
            return (0, 0.0);
        }
        ((sigma * 3.0).ceil() as u32, sigma)
    }
}

/// Bounds applied to numeric style inputs before they reach the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleLimits {
    pub font_size_min: u32,
    pub font_size_max: u32,
    pub border_width_min: u32,
    pub border_width_max: u32,
}

impl Default for StyleLimits {
    fn default() -> Self {
        Self {
            font_size_min: 10,
            font_size_max: 200,
            border_width_min: 0,
            border_width_max: 20,
        }
    }
}

impl StyleLimits {
    fn validate(&self) -> CoverResult<()> {
        if self.font_size_min == 0 {
            return Err(CoverError::validation("font_size_min must be > 0"));
        }
        if self.font_size_min > self.font_size_max {
            return Err(CoverError::validation(
                "font_size_min must be <= font_size_max",
            ));
        }
        if self.border_width_min > self.border_width_max {
            return Err(CoverError::validation(
                "border_width_min must be <= border_width_max",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "spotify-cover.png".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = RenderConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, RenderConfig::default());
        assert_eq!(cfg.canvas, Canvas { width: 800, height: 800 });
        assert_eq!(cfg.fallback_color, Rgba8::rgb(0x33, 0x33, 0x33));
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg = RenderConfig::from_json_str(
            r##"{"canvas":{"width":640,"height":360},"shadow":{"blur_px":8.0},"fallback_color":"#101010"}"##,
        )
        .unwrap();
        assert_eq!(cfg.canvas.width, 640);
        assert_eq!(cfg.shadow.blur_px, 8.0);
        assert_eq!(cfg.shadow.offset_x, 2);
        assert_eq!(cfg.fallback_color, Rgba8::rgb(0x10, 0x10, 0x10));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(RenderConfig::from_json_str(r#"{"canvas":{"width":0,"height":10}}"#).is_err());
        assert!(RenderConfig::from_json_str(r#"{"shadow":{"blur_px":-1.0}}"#).is_err());
        assert!(
            RenderConfig::from_json_str(r#"{"limits":{"font_size_min":50,"font_size_max":10}}"#)
                .is_err()
        );
        assert!(RenderConfig::from_json_str(r#"{"export":{"file_name":"a/b.png"}}"#).is_err());
        assert!(RenderConfig::from_json_str(r#"{"loader_threads":0}"#).is_err());
        assert!(RenderConfig::from_json_str(r#"{"unknown":1}"#).is_err());
    }

    #[test]
    fn shadow_kernel_follows_half_blur_sigma() {
        let (radius, sigma) = ShadowProfile::default().kernel();
        assert_eq!(sigma, 2.0);
        assert_eq!(radius, 6);

        let none = ShadowProfile {
            blur_px: 0.0,
            ..ShadowProfile::default()
        };
        assert_eq!(none.kernel().0, 0);
    }
}
