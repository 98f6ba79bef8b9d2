use std::{fmt, str::FromStr};

use crate::foundation::error::{CoverError, CoverResult};

pub use kurbo::{Affine, Rect};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

impl Canvas {
    /// Create a validated canvas. Both axes must be in `1..=65535`.
    pub fn new(width: u32, height: u32) -> CoverResult<Self> {
        let c = Self { width, height };
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> CoverResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CoverError::validation("canvas dimensions must be > 0"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(CoverError::validation(
                "canvas dimensions must be <= 65535",
            ));
        }
        Ok(())
    }
}

/// Straight-alpha RGBA8 color.
///
/// Serialized as a hex string (`#RRGGBB`, or `#RRGGBBAA` when not opaque).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional, case-insensitive).
    pub fn from_hex(s: &str) -> CoverResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoverError::validation(format!(
                "invalid hex color \"{s}\""
            )));
        }

        fn hex_byte(pair: &str) -> CoverResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| CoverError::validation(format!("invalid hex byte \"{pair}\"")))
        }

        match s.len() {
            3 => {
                let mut out = [0u8; 3];
                for (i, ch) in s.chars().enumerate() {
                    let nib = hex_byte(&ch.to_string())?;
                    out[i] = nib * 17;
                }
                Ok(Self::rgb(out[0], out[1], out[2]))
            }
            6 => Ok(Self::rgb(
                hex_byte(&s[0..2])?,
                hex_byte(&s[2..4])?,
                hex_byte(&s[4..6])?,
            )),
            8 => Ok(Self::rgba(
                hex_byte(&s[0..2])?,
                hex_byte(&s[2..4])?,
                hex_byte(&s[4..6])?,
                hex_byte(&s[6..8])?,
            )),
            _ => Err(CoverError::validation(
                "hex color must be #RGB, #RRGGBB or #RRGGBBAA",
            )),
        }
    }

    pub fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl FromStr for Rgba8 {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl serde::Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: premul_channel(r, a),
            g: premul_channel(g, a),
            b: premul_channel(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

fn premul_channel(c: u8, a: u8) -> u8 {
    let c = u16::from(c);
    let a = u16::from(a);
    (((c * a) + 127) / 255) as u8
}

/// Premultiply a tightly packed RGBA8 buffer in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = premul_channel(px[0], a);
        px[1] = premul_channel(px[1], a);
        px[2] = premul_channel(px[2], a);
    }
}

/// Undo premultiplication of a tightly packed RGBA8 buffer in place.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parses_all_supported_lengths() {
        assert_eq!(Rgba8::from_hex("#FF0000").unwrap(), Rgba8::rgb(255, 0, 0));
        assert_eq!(Rgba8::from_hex("1db954").unwrap(), Rgba8::rgb(0x1d, 0xb9, 0x54));
        assert_eq!(Rgba8::from_hex("#fff").unwrap(), Rgba8::WHITE);
        assert_eq!(
            Rgba8::from_hex("#000000B3").unwrap(),
            Rgba8::rgba(0, 0, 0, 0xB3)
        );
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(Rgba8::from_hex("#12345").is_err());
        assert!(Rgba8::from_hex("#GG0000").is_err());
        assert!(Rgba8::from_hex("").is_err());
        assert!(Rgba8::from_hex("#+1+1+1").is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let c = Rgba8::rgba(1, 2, 3, 4);
        assert_eq!(c.to_string(), "#01020304");
        assert_eq!(c.to_string().parse::<Rgba8>().unwrap(), c);
        assert_eq!(Rgba8::rgb(0xAB, 0xCD, 0xEF).to_string(), "#ABCDEF");
    }

    #[test]
    fn canvas_rejects_zero_and_oversized() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 70_000).is_err());
        assert!(Canvas::new(800, 800).is_ok());
    }

    #[test]
    fn premultiply_then_unpremultiply_is_close() {
        let mut px = vec![200u8, 100, 50, 128, 9, 9, 9, 0];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(&px[4..], &[0, 0, 0, 0]);
        unpremultiply_rgba8_in_place(&mut px);
        assert!((i32::from(px[0]) - 200).abs() <= 2);
        assert!((i32::from(px[1]) - 100).abs() <= 2);
        assert!((i32::from(px[2]) - 50).abs() <= 2);
        assert_eq!(px[3], 128);
    }
}
