use std::borrow::Cow;

use crate::{
    assets::FontLibrary,
    foundation::{
        core::{Canvas, Rgba8},
        error::{CoverError, CoverResult},
    },
    render::surface::rasterize_layer,
    style::VerticalAnchor,
};

/// Canvas-default miter limit, so outlines look like a browser's `strokeText`.
const STROKE_MITER_LIMIT: f64 = 10.0;

/// Point the text block is centered on: horizontal center, anchor fraction of the height.
pub fn anchor_point(canvas: Canvas, anchor: VerticalAnchor) -> kurbo::Point {
    kurbo::Point::new(
        f64::from(canvas.width) / 2.0,
        f64::from(canvas.height) * anchor.fraction(),
    )
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum GlyphPaint {
    Fill,
    Stroke { width_px: f64 },
}

/// A single shaped line, positioned so its box is centered on a point.
pub(crate) struct TextBlock {
    layout: parley::Layout<()>,
    origin: kurbo::Point,
}

impl TextBlock {
    /// Shape `text` in bold with the faces of `family` at `size_px` and center the resulting
    /// line box on `center`.
    ///
    /// Parley picks the closest registered weight when the family has no bold face.
    pub(crate) fn layout_centered(
        fonts: &FontLibrary,
        family: &str,
        text: &str,
        size_px: f32,
        center: kurbo::Point,
    ) -> CoverResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CoverError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        // Only the faces of `family` are visible to shaping.
        let mut font_ctx = parley::FontContext::default();
        let mut registered = 0usize;
        for face in fonts.faces_of(family) {
            font_ctx.collection.register_fonts(face.blob().clone(), None);
            registered += 1;
        }
        if registered == 0 {
            return Err(CoverError::render(format!(
                "font family '{family}' is not registered"
            )));
        }

        let mut layout_ctx = parley::LayoutContext::<()>::new();
        let mut builder = layout_ctx.ranged_builder(&mut font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Single(parley::style::FontFamily::Named(Cow::Borrowed(
                family,
            ))),
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let w = f64::from(layout.width());
        let h = f64::from(layout.height());
        let origin = kurbo::Point::new(center.x - w / 2.0, center.y - h / 2.0);
        Ok(Self { layout, origin })
    }

    /// Fonts chosen for each glyph run, in visual order.
    #[cfg(test)]
    pub(crate) fn run_fonts(&self) -> Vec<vello_cpu::peniko::FontData> {
        let mut out = Vec::new();
        for line in self.layout.lines() {
            for item in line.items() {
                if let parley::layout::PositionedLayoutItem::GlyphRun(run) = item {
                    out.push(run.run().font().clone());
                }
            }
        }
        out
    }

    /// Surface-space box of the laid-out line.
    pub(crate) fn bounds(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            self.origin.x,
            self.origin.y,
            self.origin.x + f64::from(self.layout.width()),
            self.origin.y + f64::from(self.layout.height()),
        )
    }

    /// Rasterize the glyphs into a transparent premultiplied layer of the given size.
    pub(crate) fn rasterize(
        &self,
        width: u16,
        height: u16,
        color: Rgba8,
        paint: GlyphPaint,
    ) -> Vec<u8> {
        rasterize_layer(width, height, |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                self.origin.x,
                self.origin.y,
            )));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, color.a,
            ));
            if let GlyphPaint::Stroke { width_px } = paint {
                ctx.set_stroke(
                    vello_cpu::kurbo::Stroke::new(width_px)
                        .with_join(vello_cpu::kurbo::Join::Miter)
                        .with_miter_limit(STROKE_MITER_LIMIT),
                );
            }

            for line in self.layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    let builder = ctx
                        .glyph_run(run.run().font())
                        .font_size(run.run().font_size());
                    match paint {
                        GlyphPaint::Fill => builder.fill_glyphs(glyphs),
                        GlyphPaint::Stroke { .. } => builder.stroke_glyphs(glyphs),
                    }
                }
            }
        })
    }
}
