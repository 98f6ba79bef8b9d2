use serde::{Deserialize, Serialize};

use crate::{
    config::StyleLimits,
    foundation::{
        core::Rgba8,
        error::{CoverError, CoverResult},
    },
};

/// Vertical placement of the text block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    Upper,
    #[default]
    Middle,
    Lower,
}

impl VerticalAnchor {
    /// Fraction of the surface height the text is centered on.
    pub fn fraction(self) -> f64 {
        match self {
            Self::Upper => 0.25,
            Self::Middle => 0.5,
            Self::Lower => 0.75,
        }
    }
}

/// Swatches offered for the text outline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderSwatch {
    #[default]
    White,
    Black,
    Green,
    Red,
    Blue,
    Yellow,
}

impl BorderSwatch {
    pub const ALL: [Self; 6] = [
        Self::White,
        Self::Black,
        Self::Green,
        Self::Red,
        Self::Blue,
        Self::Yellow,
    ];

    pub fn color(self) -> Rgba8 {
        match self {
            Self::White => Rgba8::WHITE,
            Self::Black => Rgba8::BLACK,
            Self::Green => Rgba8::rgb(0x1D, 0xB9, 0x54),
            Self::Red => Rgba8::rgb(0xE9, 0x14, 0x29),
            Self::Blue => Rgba8::rgb(0x2D, 0x46, 0xB9),
            Self::Yellow => Rgba8::rgb(0xF5, 0x9B, 0x23),
        }
    }
}

/// Quick-pick text colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColorPreset {
    White,
    Green,
    Black,
    Pink,
    Blue,
    Yellow,
}

impl TextColorPreset {
    pub const ALL: [Self; 6] = [
        Self::White,
        Self::Green,
        Self::Black,
        Self::Pink,
        Self::Blue,
        Self::Yellow,
    ];

    pub fn color(self) -> Rgba8 {
        match self {
            Self::White => Rgba8::WHITE,
            Self::Green => Rgba8::rgb(0x1D, 0xB9, 0x54),
            Self::Black => Rgba8::rgb(0x19, 0x14, 0x14),
            Self::Pink => Rgba8::rgb(0xF0, 0x37, 0xA5),
            Self::Blue => Rgba8::rgb(0x50, 0x9B, 0xF5),
            Self::Yellow => Rgba8::rgb(0xCD, 0xF5, 0x64),
        }
    }
}

/// Everything the compositor needs to know about the text and overlay styling.
///
/// Rebuilt from UI state for every render; the compositor never mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StyleParameters {
    pub text: String,
    pub font_family: String,
    pub font_size_px: u32,
    pub text_color: Rgba8,
    pub shadow_enabled: bool,
    pub border_enabled: bool,
    pub border_color: BorderSwatch,
    pub border_width_px: u32,
    pub vertical_anchor: VerticalAnchor,
    pub gradient_enabled: bool,
    pub gradient_color: Rgba8,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: String::new(),
            font_size_px: 48,
            text_color: Rgba8::WHITE,
            shadow_enabled: true,
            border_enabled: false,
            border_color: BorderSwatch::White,
            border_width_px: 2,
            vertical_anchor: VerticalAnchor::Middle,
            gradient_enabled: false,
            gradient_color: Rgba8::BLACK,
        }
    }
}

impl StyleParameters {
    pub fn from_json_str(s: &str) -> CoverResult<Self> {
        serde_json::from_str(s).map_err(|e| CoverError::validation(format!("style JSON: {e}")))
    }

    /// Whether a text layer will be drawn at all.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Reject values that clamping cannot repair.
    pub fn validate(&self) -> CoverResult<()> {
        if self.font_size_px == 0 {
            return Err(CoverError::validation("fontSizePx must be > 0"));
        }
        if self.text.contains(['\n', '\r']) {
            return Err(CoverError::validation("text must be a single line"));
        }
        Ok(())
    }

    /// Return a copy with numeric fields forced into `limits` and an empty family replaced by
    /// `default_family`.
    pub fn clamped(&self, limits: &StyleLimits, default_family: &str) -> Self {
        let mut out = self.clone();
        out.font_size_px = out
            .font_size_px
            .clamp(limits.font_size_min, limits.font_size_max);
        out.border_width_px = out
            .border_width_px
            .clamp(limits.border_width_min, limits.border_width_max);
        if out.font_family.trim().is_empty() {
            out.font_family = default_family.to_owned();
        }
        out
    }
}

/// Style fields a form should show for a given style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleField {
    Text,
    FontFamily,
    FontSizePx,
    TextColor,
    ShadowEnabled,
    BorderEnabled,
    BorderColor,
    BorderWidthPx,
    VerticalAnchor,
    GradientEnabled,
    GradientColor,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VisibleFields {
    fields: Vec<StyleField>,
}

impl VisibleFields {
    pub fn contains(&self, field: StyleField) -> bool {
        self.fields.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = StyleField> + '_ {
        self.fields.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Border options only show while the border is on, the gradient color only while the gradient
/// is on.
pub fn visible_fields(style: &StyleParameters) -> VisibleFields {
    let mut fields = vec![
        StyleField::Text,
        StyleField::FontFamily,
        StyleField::FontSizePx,
        StyleField::TextColor,
        StyleField::ShadowEnabled,
        StyleField::BorderEnabled,
    ];
    if style.border_enabled {
        fields.push(StyleField::BorderColor);
        fields.push(StyleField::BorderWidthPx);
    }
    fields.push(StyleField::VerticalAnchor);
    fields.push(StyleField::GradientEnabled);
    if style.gradient_enabled {
        fields.push(StyleField::GradientColor);
    }
    VisibleFields { fields }
}
