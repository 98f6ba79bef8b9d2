use std::sync::Arc;

use crate::{
    assets::{Bitmap, FontLibrary},
    config::{RenderConfig, ShadowProfile},
    foundation::{
        core::Rgba8,
        error::{CoverError, CoverResult},
    },
    render::{
        blur::{GaussianKernel, blur_sparse_rgba8_premul},
        composite::{over_in_place, over_offset_in_place},
        cover_fit::CoverFit,
        gradient::diagonal_fade_layer,
        surface::{Surface, rasterize_layer},
        text::{GlyphPaint, TextBlock, anchor_point},
    },
    style::StyleParameters,
};

/// What sits underneath the overlay and text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackgroundSource {
    /// Solid fallback fill.
    #[default]
    None,
    Bitmap(Arc<Bitmap>),
}

impl BackgroundSource {
    pub fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::None => None,
            Self::Bitmap(b) => Some(b),
        }
    }
}

impl From<Bitmap> for BackgroundSource {
    fn from(b: Bitmap) -> Self {
        Self::Bitmap(Arc::new(b))
    }
}

/// Deterministic cover renderer.
///
/// Holds only fixed configuration and the font library; every call to [`Compositor::render`]
/// repaints the whole surface from its arguments.
#[derive(Debug)]
pub struct Compositor {
    fallback_color: Rgba8,
    shadow: ShadowProfile,
    shadow_kernel: GaussianKernel,
    fonts: FontLibrary,
}

impl Compositor {
    pub fn new(config: &RenderConfig, fonts: FontLibrary) -> CoverResult<Self> {
        let (radius, sigma) = config.shadow.kernel();
        Ok(Self {
            fallback_color: config.fallback_color,
            shadow: config.shadow,
            shadow_kernel: GaussianKernel::new(radius, sigma)?,
            fonts,
        })
    }

    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontLibrary {
        &mut self.fonts
    }

    /// Clear `surface` and paint background, gradient overlay and text, in that order.
    ///
    /// Never fails: a layer that cannot be drawn is logged and skipped, leaving the layers below
    /// it intact.
    #[tracing::instrument(
        skip_all,
        fields(w = surface.width(), h = surface.height(), text_len = style.text.len())
    )]
    pub fn render(
        &self,
        surface: &mut Surface,
        background: &BackgroundSource,
        style: &StyleParameters,
    ) {
        surface.clear();

        if let Err(e) = self.paint_background(surface, background) {
            tracing::warn!(error = %e, "background layer failed; using fallback fill");
            surface.fill(self.fallback_color.to_premul().to_array());
        }

        if style.gradient_enabled
            && let Err(e) = self.paint_gradient(surface, style.gradient_color)
        {
            tracing::warn!(error = %e, "gradient layer skipped");
        }

        if style.has_text()
            && let Err(e) = self.paint_text(surface, style)
        {
            tracing::warn!(error = %e, "text layer skipped");
        }
    }

    fn paint_background(
        &self,
        surface: &mut Surface,
        background: &BackgroundSource,
    ) -> CoverResult<()> {
        let Some(bitmap) = background.bitmap() else {
            surface.fill(self.fallback_color.to_premul().to_array());
            return Ok(());
        };

        let fit = CoverFit::compute(
            bitmap.width,
            bitmap.height,
            surface.width(),
            surface.height(),
        );
        tracing::debug!(?fit, "cover-fit background");

        let image = bitmap_to_image(bitmap)?;
        let (w, h) = surface.dims_u16();
        let layer = rasterize_layer(w, h, |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::new(fit.transform().as_coeffs()));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(image);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(bitmap.width),
                f64::from(bitmap.height),
            ));
        });
        over_in_place(surface.data_mut(), &layer)
    }

    fn paint_gradient(&self, surface: &mut Surface, color: Rgba8) -> CoverResult<()> {
        let layer = diagonal_fade_layer(surface.width(), surface.height(), color);
        over_in_place(surface.data_mut(), &layer)
    }

    fn paint_text(&self, surface: &mut Surface, style: &StyleParameters) -> CoverResult<()> {
        let family = self
            .fonts
            .resolve(&style.font_family)
            .ok_or_else(|| CoverError::render("no fonts registered"))?;
        if !family.eq_ignore_ascii_case(style.font_family.trim()) {
            tracing::debug!(
                requested = %style.font_family,
                using = %family,
                "font family not registered; using fallback family"
            );
        }

        let center = anchor_point(surface.canvas(), style.vertical_anchor);
        let block = TextBlock::layout_centered(
            &self.fonts,
            family,
            &style.text,
            style.font_size_px as f32,
            center,
        )?;
        tracing::debug!(bounds = ?block.bounds(), "laid out text");

        let mut passes = Vec::with_capacity(2);
        if style.border_enabled && style.border_width_px > 0 {
            passes.push((
                GlyphPaint::Stroke {
                    width_px: f64::from(style.border_width_px),
                },
                style.border_color.color(),
            ));
        }
        passes.push((GlyphPaint::Fill, style.text_color));

        // The shadow only exists for these passes; nothing painted afterwards can pick it up.
        let shadow = style.shadow_enabled.then_some(&self.shadow);
        let (w, h) = surface.dims_u16();
        for (paint, color) in passes {
            if let Some(shadow) = shadow {
                self.paint_shadow(surface, &block, paint, shadow)?;
            }
            let layer = block.rasterize(w, h, color, paint);
            over_in_place(surface.data_mut(), &layer)?;
        }
        Ok(())
    }

    fn paint_shadow(
        &self,
        surface: &mut Surface,
        block: &TextBlock,
        paint: GlyphPaint,
        shadow: &ShadowProfile,
    ) -> CoverResult<()> {
        if shadow.color.a == 0 {
            return Ok(());
        }
        let (w, h) = surface.dims_u16();
        let layer = block.rasterize(w, h, shadow.color, paint);
        let blurred = blur_sparse_rgba8_premul(
            &layer,
            u32::from(w),
            u32::from(h),
            &self.shadow_kernel,
        )?;
        over_offset_in_place(
            surface.data_mut(),
            &blurred,
            u32::from(w),
            u32::from(h),
            shadow.offset_x,
            shadow.offset_y,
        )
    }
}

fn bitmap_to_image(bitmap: &Bitmap) -> CoverResult<vello_cpu::Image> {
    let w: u16 = bitmap
        .width
        .try_into()
        .map_err(|_| CoverError::render("image width exceeds u16"))?;
    let h: u16 = bitmap
        .height
        .try_into()
        .map_err(|_| CoverError::render("image height exceeds u16"))?;
    if bitmap.rgba8_premul.len() != usize::from(w) * usize::from(h) * 4 {
        return Err(CoverError::render("bitmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels = bitmap
        .rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect::<Vec<_>>();

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}
