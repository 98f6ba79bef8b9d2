//! Porter-Duff source-over on premultiplied RGBA8 buffers.

use crate::foundation::error::{CoverError, CoverResult};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = src[i].saturating_add(dc);
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> CoverResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CoverError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Source-over with `src` translated by `(dx, dy)` whole pixels. Pixels shifted outside the
/// destination are dropped.
pub fn over_offset_in_place(
    dst: &mut [u8],
    src: &[u8],
    width: u32,
    height: u32,
    dx: i32,
    dy: i32,
) -> CoverResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CoverError::render("composite buffer size overflow"))?;
    if dst.len() != expected || src.len() != expected {
        return Err(CoverError::render(
            "over_offset_in_place expects buffers matching width*height*4",
        ));
    }
    if dx == 0 && dy == 0 {
        return over_in_place(dst, src);
    }

    let (w, h) = (width as i64, height as i64);
    for sy in 0..h {
        let ty = sy + i64::from(dy);
        if !(0..h).contains(&ty) {
            continue;
        }
        for sx in 0..w {
            let tx = sx + i64::from(dx);
            if !(0..w).contains(&tx) {
                continue;
            }
            let si = ((sy * w + sx) as usize) * 4;
            if src[si + 3] == 0 {
                continue;
            }
            let di = ((ty * w + tx) as usize) * 4;
            let out = over(
                [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]],
                [src[si], src[si + 1], src[si + 2], src[si + 3]],
            );
            dst[di..di + 4].copy_from_slice(&out);
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
