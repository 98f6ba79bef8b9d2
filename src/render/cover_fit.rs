use crate::foundation::core::{Affine, Rect};

/// Placement of a source image scaled uniformly to cover a destination, overflow cropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub draw_width: f64,
    pub draw_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CoverFit {
    /// Wider-than-destination sources match the destination height and are centered
    /// horizontally; everything else matches the width and is centered vertically.
    ///
    /// All dimensions must be non-zero.
    pub fn compute(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        let (sw, sh) = (f64::from(src_w), f64::from(src_h));
        let (dw, dh) = (f64::from(dst_w), f64::from(dst_h));
        let img_ratio = sw / sh;
        let canvas_ratio = dw / dh;

        if img_ratio > canvas_ratio {
            let draw_height = dh;
            let draw_width = dh * img_ratio;
            Self {
                scale: dh / sh,
                draw_width,
                draw_height,
                offset_x: (dw - draw_width) / 2.0,
                offset_y: 0.0,
            }
        } else {
            let draw_width = dw;
            let draw_height = dw / img_ratio;
            Self {
                scale: dw / sw,
                draw_width,
                draw_height,
                offset_x: 0.0,
                offset_y: (dh - draw_height) / 2.0,
            }
        }
    }

    /// Destination-space rectangle the source is drawn into.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.offset_x + self.draw_width,
            self.offset_y + self.draw_height,
        )
    }

    /// Maps source pixel space into destination space.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.offset_x, self.offset_y)) * Affine::scale(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_covers(src: (u32, u32), dst: (u32, u32)) {
        let fit = CoverFit::compute(src.0, src.1, dst.0, dst.1);
        let (dw, dh) = (f64::from(dst.0), f64::from(dst.1));

        assert!(fit.draw_width + EPS >= dw, "{src:?} -> {dst:?}: {fit:?}");
        assert!(fit.draw_height + EPS >= dh, "{src:?} -> {dst:?}: {fit:?}");
        let w_eq = (fit.draw_width - dw).abs() < 1e-6;
        let h_eq = (fit.draw_height - dh).abs() < 1e-6;
        assert!(w_eq || h_eq, "{src:?} -> {dst:?}: {fit:?}");

        // centered on the overflowing axis
        let r = fit.rect();
        assert!((r.x0 + r.x1 - dw).abs() < 1e-6);
        assert!((r.y0 + r.y1 - dh).abs() < 1e-6);

        // uniform scale
        assert!((fit.draw_width / f64::from(src.0) - fit.scale).abs() < 1e-9);
        assert!((fit.draw_height / f64::from(src.1) - fit.scale).abs() < 1e-9);
    }

    #[test]
    fn wide_source_fills_height_and_centers_horizontally() {
        let fit = CoverFit::compute(1600, 800, 800, 800);
        assert_eq!(fit.draw_height, 800.0);
        assert_eq!(fit.draw_width, 1600.0);
        assert_eq!(fit.offset_x, -400.0);
        assert_eq!(fit.offset_y, 0.0);
    }

    #[test]
    fn tall_source_fills_width_and_centers_vertically() {
        let fit = CoverFit::compute(400, 1000, 800, 800);
        assert_eq!(fit.draw_width, 800.0);
        assert_eq!(fit.draw_height, 2000.0);
        assert_eq!(fit.offset_x, 0.0);
        assert_eq!(fit.offset_y, -600.0);
    }

    #[test]
    fn equal_ratio_matches_exactly() {
        let fit = CoverFit::compute(200, 200, 800, 800);
        assert_eq!(fit.rect(), Rect::new(0.0, 0.0, 800.0, 800.0));
        assert_eq!(fit.scale, 4.0);
    }

    #[test]
    fn always_covers_destination() {
        let sizes = [1u32, 3, 7, 64, 333, 800, 1920, 4000];
        for &sw in &sizes {
            for &sh in &sizes {
                for dst in [(800, 800), (1280, 720), (300, 1000), (1, 1)] {
                    assert_covers((sw, sh), dst);
                }
            }
        }
    }

    #[test]
    fn transform_maps_source_corners_onto_rect() {
        let fit = CoverFit::compute(300, 100, 800, 800);
        let t = fit.transform();
        let p0 = t * kurbo::Point::new(0.0, 0.0);
        let p1 = t * kurbo::Point::new(300.0, 100.0);
        let r = fit.rect();
        assert!((p0.x - r.x0).abs() < 1e-9 && (p0.y - r.y0).abs() < 1e-9);
        assert!((p1.x - r.x1).abs() < 1e-9 && (p1.y - r.y1).abs() < 1e-9);
    }
}
