use crate::foundation::core::Rgba8;

/// Premultiplied RGBA8 layer holding a linear gradient from `start` at the top-left corner to
/// fully transparent at the bottom-right corner.
///
/// Each pixel center is projected onto the diagonal axis; interpolation happens in premultiplied
/// space so the transparent end never darkens the color.
pub fn diagonal_fade_layer(width: u32, height: u32, start: Rgba8) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut bytes = vec![0u8; w.saturating_mul(h).saturating_mul(4)];
    let start = start.to_premul().to_array();
    if start[3] == 0 {
        return bytes;
    }

    let (fw, fh) = (f64::from(width), f64::from(height));
    let len_sq = fw * fw + fh * fh;
    for y in 0..h {
        let py = (y as f64 + 0.5) * fh;
        for x in 0..w {
            let t = (((x as f64 + 0.5) * fw + py) / len_sq).clamp(0.0, 1.0);
            let keep = 1.0 - t;
            let idx = (y * w + x) * 4;
            for c in 0..4 {
                bytes[idx + c] = (f64::from(start[c]) * keep).round() as u8;
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(bytes: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * w + x) * 4) as usize;
        [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]
    }

    #[test]
    fn corners_are_color_and_transparent() {
        let g = diagonal_fade_layer(800, 800, Rgba8::rgb(255, 0, 0));
        assert_eq!(px(&g, 800, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&g, 800, 799, 799), [0, 0, 0, 0]);
    }

    #[test]
    fn anti_diagonal_is_half_strength() {
        let g = diagonal_fade_layer(100, 100, Rgba8::rgb(0, 0, 200));
        let mid = px(&g, 100, 99, 0);
        assert!((i32::from(mid[3]) - 128).abs() <= 2, "{mid:?}");
        assert!((i32::from(mid[2]) - 100).abs() <= 2, "{mid:?}");
    }

    #[test]
    fn alpha_is_monotonic_along_the_diagonal() {
        let g = diagonal_fade_layer(64, 32, Rgba8::rgb(10, 200, 30));
        let mut prev = 256i32;
        for i in 0..32u32 {
            let a = i32::from(px(&g, 64, i * 2, i)[3]);
            assert!(a <= prev);
            prev = a;
        }
    }

    #[test]
    fn transparent_start_is_empty() {
        let g = diagonal_fade_layer(4, 4, Rgba8::TRANSPARENT);
        assert!(g.iter().all(|&b| b == 0));
    }
}
