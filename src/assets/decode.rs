use std::sync::Arc;

use crate::foundation::{
    core::premultiply_rgba8_in_place,
    error::{CoverError, CoverResult},
};

/// Largest edge accepted for a rasterized SVG background.
const MAX_SVG_EDGE_PX: f32 = 8192.0;

/// Decoded background image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl Bitmap {
    /// Build from premultiplied RGBA8 bytes, checking the length against the dimensions.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: Vec<u8>) -> CoverResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoverError::decode("bitmap dimensions must be > 0"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(CoverError::decode("bitmap dimensions must be <= 65535"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| CoverError::decode("bitmap size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(CoverError::decode("bitmap byte length mismatch"));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> CoverResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::from_premul_rgba8(width, height, rgba8)
    }

    /// Single-color bitmap, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CoverResult<Self> {
        let px_count = (width as usize).saturating_mul(height as usize);
        Self::from_straight_rgba8(width, height, rgba.repeat(px_count))
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Decode user-supplied background bytes.
///
/// Raster formats go through `image`; SVG documents are rasterized at their intrinsic size.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_background(bytes: &[u8]) -> CoverResult<Bitmap> {
    if bytes.is_empty() {
        return Err(CoverError::decode("empty input"));
    }
    if image::guess_format(bytes).is_err() && looks_like_svg(bytes) {
        return decode_svg(bytes);
    }
    decode_raster(bytes)
}

fn decode_raster(bytes: &[u8]) -> CoverResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| CoverError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!(width, height, "decoded raster background");
    Bitmap::from_straight_rgba8(width, height, rgba.into_raw())
}

fn decode_svg(bytes: &[u8]) -> CoverResult<Bitmap> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| CoverError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let width = size.width().ceil().clamp(1.0, MAX_SVG_EDGE_PX) as u32;
    let height = size.height().ceil().clamp(1.0, MAX_SVG_EDGE_PX) as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CoverError::decode("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );
    tracing::debug!(width, height, "rasterized svg background");

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Bitmap::from_premul_rgba8(width, height, pixmap.data().to_vec())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        // The cut may have split a multi-byte sequence; fall back to a lossy view.
        return String::from_utf8_lossy(head).contains("<svg");
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with('<') && text.contains("<svg")) || text.starts_with("<svg")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode_png(img: image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_png_dimensions_and_premul() {
        let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50, 200, 128]).unwrap();
        let bmp = decode_background(&encode_png(img)).unwrap();
        assert_eq!((bmp.width, bmp.height), (1, 1));
        assert_eq!(
            bmp.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_svg_uses_intrinsic_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="2"><rect width="4" height="2" fill="#ff0000"/></svg>"##;
        let bmp = decode_background(svg).unwrap();
        assert_eq!((bmp.width, bmp.height), (4, 2));
        assert_eq!(&bmp.rgba8_premul[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn corrupt_input_is_a_decode_error() {
        let err = decode_background(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CoverError::Decode(_)));

        let mut png = encode_png(image::RgbaImage::new(2, 2));
        png.truncate(png.len() / 2);
        assert!(decode_background(&png).is_err());

        assert!(decode_background(&[]).is_err());
        assert!(decode_background(br#"<svg"#).is_err());
    }

    #[test]
    fn bitmap_rejects_length_mismatch() {
        assert!(Bitmap::from_premul_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(Bitmap::from_premul_rgba8(0, 2, vec![]).is_err());
        let solid = Bitmap::solid(3, 2, [10, 20, 30, 255]).unwrap();
        assert_eq!(solid.rgba8_premul.len(), 24);
        assert_eq!(solid.aspect_ratio(), 1.5);
    }
}
