use crate::foundation::{
    core::{Canvas, Rgba8, unpremultiply_rgba8_in_place},
    error::{CoverError, CoverResult},
};

/// Fixed-size raster target. Pixels are premultiplied RGBA8, row-major, tightly packed.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(canvas: Canvas) -> CoverResult<Self> {
        canvas.validate()?;
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| CoverError::render("surface width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| CoverError::render("surface height exceeds u16"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; usize::from(width) * usize::from(height) * 4],
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width(),
            height: self.height(),
        }
    }

    pub(crate) fn dims_u16(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite every pixel with a premultiplied color.
    pub fn fill(&mut self, premul: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&premul);
        }
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let idx = ((y as usize) * usize::from(self.width) + (x as usize)) * 4;
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Straight-alpha pixel at `(x, y)`.
    pub fn pixel_straight(&self, x: u32, y: u32) -> Option<Rgba8> {
        let mut px = self.pixel(x, y)?;
        unpremultiply_rgba8_in_place(&mut px);
        Some(Rgba8::rgba(px[0], px[1], px[2], px[3]))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy of the pixels with premultiplication undone, as expected by image encoders.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }
}

/// Rasterize one layer with `vello_cpu` into a fresh transparent buffer of the given size.
pub(crate) fn rasterize_layer(
    width: u16,
    height: u16,
    draw: impl FnOnce(&mut vello_cpu::RenderContext),
) -> Vec<u8> {
    let mut ctx = vello_cpu::RenderContext::new(width, height);
    draw(&mut ctx);
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);
    pixmap.data_as_u8_slice().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_transparent_and_sized() {
        let s = Surface::new(Canvas::new(8, 4).unwrap()).unwrap();
        assert_eq!((s.width(), s.height()), (8, 4));
        assert_eq!(s.data().len(), 8 * 4 * 4);
        assert!(s.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn fill_clear_and_pixel_access() {
        let mut s = Surface::new(Canvas::new(2, 2).unwrap()).unwrap();
        s.fill([51, 51, 51, 255]);
        assert_eq!(s.pixel(1, 1), Some([51, 51, 51, 255]));
        assert_eq!(s.pixel_straight(0, 0), Some(Rgba8::rgb(51, 51, 51)));
        assert_eq!(s.pixel(2, 0), None);
        s.clear();
        assert_eq!(s.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn straight_export_undoes_premultiplication() {
        let mut s = Surface::new(Canvas::new(1, 1).unwrap()).unwrap();
        s.fill([64, 0, 0, 128]);
        let out = s.to_straight_rgba8();
        assert_eq!(out[3], 128);
        assert!((i32::from(out[0]) - 128).abs() <= 1);
    }

    #[test]
    fn rasterized_rect_covers_expected_pixels() {
        let data = rasterize_layer(4, 4, |ctx| {
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 0, 0, 255));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, 2.0, 4.0));
        });
        assert_eq!(&data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&data[12..16], &[0, 0, 0, 0]);
    }
}
