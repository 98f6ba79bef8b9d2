//! Separable Gaussian blur over premultiplied RGBA8, with Q16 fixed-point weights so results are
//! bit-for-bit reproducible.

use crate::foundation::error::{CoverError, CoverResult};

const Q16_ONE: i64 = 1 << 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaussianKernel {
    weights: Vec<u32>,
}

impl GaussianKernel {
    pub fn new(radius: u32, sigma: f32) -> CoverResult<Self> {
        if radius == 0 {
            return Ok(Self {
                weights: vec![Q16_ONE as u32],
            });
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(CoverError::validation("blur sigma must be > 0"));
        }

        let r = radius as i32;
        let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
        let raw: Vec<f64> = (-r..=r)
            .map(|i| {
                let x = f64::from(i);
                (-x * x / denom).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(CoverError::render("gaussian kernel sum is zero"));
        }

        let mut acc = 0i64;
        let mut weights: Vec<u32> = raw
            .iter()
            .map(|&w| {
                let q = ((w / sum) * Q16_ONE as f64).round() as i64;
                let q = q.clamp(0, Q16_ONE);
                acc += q;
                q as u32
            })
            .collect();

        // Rounding drift goes to the center tap so the kernel sums to exactly 1.0.
        let mid = weights.len() / 2;
        let fixed = (i64::from(weights[mid]) + (Q16_ONE - acc)).clamp(0, Q16_ONE);
        weights[mid] = fixed as u32;

        Ok(Self { weights })
    }

    pub fn radius(&self) -> usize {
        self.weights.len() / 2
    }

    pub fn is_identity(&self) -> bool {
        self.weights.len() == 1
    }
}

/// Blur `src` (width*height*4 premultiplied bytes) and return the result.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    kernel: &GaussianKernel,
) -> CoverResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CoverError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(CoverError::render(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if kernel.is_identity() {
        return Ok(src.to_vec());
    }

    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    convolve(src, &mut tmp, width as usize, height as usize, kernel, Axis::X);
    convolve(&tmp, &mut out, width as usize, height as usize, kernel, Axis::Y);
    Ok(out)
}

/// Same result as [`blur_rgba8_premul`], but only convolves the bounding box of non-transparent
/// pixels padded by the kernel radius. Text layers are mostly empty.
pub fn blur_sparse_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    kernel: &GaussianKernel,
) -> CoverResult<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    if src.len() != w.saturating_mul(h).saturating_mul(4) {
        return Err(CoverError::render(
            "blur_sparse_rgba8_premul expects src matching width*height*4",
        ));
    }
    let Some((bx0, by0, bx1, by1)) = content_bounds(src, w, h) else {
        return Ok(vec![0u8; src.len()]);
    };

    let r = kernel.radius();
    let (x0, y0) = (bx0.saturating_sub(r), by0.saturating_sub(r));
    let (x1, y1) = ((bx1 + r).min(w), (by1 + r).min(h));
    let (cw, ch) = (x1 - x0, y1 - y0);

    let mut crop = Vec::with_capacity(cw * ch * 4);
    for y in y0..y1 {
        crop.extend_from_slice(&src[(y * w + x0) * 4..(y * w + x1) * 4]);
    }
    let blurred = blur_rgba8_premul(&crop, cw as u32, ch as u32, kernel)?;

    let mut out = vec![0u8; src.len()];
    for (row, y) in (y0..y1).enumerate() {
        out[(y * w + x0) * 4..(y * w + x1) * 4]
            .copy_from_slice(&blurred[row * cw * 4..(row + 1) * cw * 4]);
    }
    Ok(out)
}

/// Half-open `(x0, y0, x1, y1)` box around pixels with non-zero alpha.
fn content_bounds(src: &[u8], w: usize, h: usize) -> Option<(usize, usize, usize, usize)> {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for y in 0..h {
        for x in 0..w {
            if src[(y * w + x) * 4 + 3] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x + 1, y + 1),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
            });
        }
    }
    bounds
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn convolve(src: &[u8], dst: &mut [u8], w: usize, h: usize, k: &GaussianKernel, axis: Axis) {
    let radius = k.radius() as isize;
    let (len, stride) = match axis {
        Axis::X => (w as isize, 1usize),
        Axis::Y => (h as isize, w),
    };

    for y in 0..h {
        for x in 0..w {
            let pos = match axis {
                Axis::X => x as isize,
                Axis::Y => y as isize,
            };
            let base = y * w + x;
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.weights.iter().enumerate() {
                if kw == 0 {
                    continue;
                }
                // Edge pixels are clamped.
                let sample = (pos + ki as isize - radius).clamp(0, len - 1);
                let delta = sample - pos;
                let idx = if delta >= 0 {
                    base + (delta as usize) * stride
                } else {
                    base - (delta.unsigned_abs()) * stride
                };
                let px = &src[idx * 4..idx * 4 + 4];
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(px[c]);
                }
            }
            for c in 0..4 {
                dst[base * 4 + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}
