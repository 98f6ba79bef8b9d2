use std::path::{Path, PathBuf};

use crate::{
    assets::{Bitmap, FontLibrary},
    config::RenderConfig,
    export::Exporter,
    foundation::{
        core::Rgba8,
        error::{CoverError, CoverResult},
    },
    loader::{ImageLoader, LoadCompletion},
    render::{BackgroundSource, Compositor, Surface},
    style::{BorderSwatch, StyleParameters, TextColorPreset, VerticalAnchor, VisibleFields},
};

/// What happened to a finished background decode.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Became the current background and the surface was re-rendered.
    Applied { sequence_id: u64 },
    /// A newer request exists; the result was dropped.
    Stale { sequence_id: u64 },
    /// Decode failed; background and surface are unchanged.
    Failed { sequence_id: u64, error: CoverError },
}

impl LoadOutcome {
    pub fn sequence_id(&self) -> u64 {
        match self {
            Self::Applied { sequence_id }
            | Self::Stale { sequence_id }
            | Self::Failed { sequence_id, .. } => *sequence_id,
        }
    }
}

/// Owns the editable state and keeps the surface in sync with it.
///
/// Every style change is validated and clamped here, then the whole surface is re-rendered.
#[derive(Debug)]
pub struct Controller {
    config: RenderConfig,
    compositor: Compositor,
    exporter: Exporter,
    loader: ImageLoader,
    surface: Surface,
    style: StyleParameters,
    background: BackgroundSource,
}

impl Controller {
    pub fn new(config: RenderConfig, fonts: FontLibrary) -> CoverResult<Self> {
        config.validate()?;
        let compositor = Compositor::new(&config, fonts)?;
        let exporter = Exporter::new(&config.export);
        let loader = ImageLoader::new(config.loader_threads)?;
        let surface = Surface::new(config.canvas)?;
        let style = StyleParameters::default().clamped(&config.limits, &config.default_font_family);

        let mut out = Self {
            config,
            compositor,
            exporter,
            loader,
            surface,
            style,
            background: BackgroundSource::None,
        };
        out.render();
        Ok(out)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn style(&self) -> &StyleParameters {
        &self.style
    }

    pub fn background(&self) -> &BackgroundSource {
        &self.background
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn fonts(&self) -> &FontLibrary {
        self.compositor.fonts()
    }

    pub fn register_font_file(&mut self, path: &Path) -> CoverResult<String> {
        let family = self.compositor.fonts_mut().register_file(path)?;
        self.render();
        Ok(family)
    }

    pub fn visible_fields(&self) -> VisibleFields {
        crate::style::visible_fields(&self.style)
    }

    /// Repaint the surface from the current state.
    pub fn render(&mut self) {
        self.compositor
            .render(&mut self.surface, &self.background, &self.style);
    }

    /// Replace the whole style. Rejects what cannot be repaired, clamps the rest.
    pub fn update_style(&mut self, style: StyleParameters) -> CoverResult<()> {
        style.validate()?;
        self.style = style.clamped(&self.config.limits, &self.config.default_font_family);
        self.render();
        Ok(())
    }

    /// Edit a copy of the current style and apply it through [`Controller::update_style`].
    pub fn modify_style(&mut self, edit: impl FnOnce(&mut StyleParameters)) -> CoverResult<()> {
        let mut next = self.style.clone();
        edit(&mut next);
        self.update_style(next)
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> CoverResult<()> {
        let text = text.into();
        self.modify_style(|s| s.text = text)
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) -> CoverResult<()> {
        let family = family.into();
        self.modify_style(|s| s.font_family = family)
    }

    pub fn set_font_size(&mut self, px: u32) -> CoverResult<()> {
        self.modify_style(|s| s.font_size_px = px)
    }

    pub fn set_text_color(&mut self, color: Rgba8) -> CoverResult<()> {
        self.modify_style(|s| s.text_color = color)
    }

    pub fn apply_text_color_preset(&mut self, preset: TextColorPreset) -> CoverResult<()> {
        self.set_text_color(preset.color())
    }

    pub fn set_shadow_enabled(&mut self, on: bool) -> CoverResult<()> {
        self.modify_style(|s| s.shadow_enabled = on)
    }

    pub fn set_border_enabled(&mut self, on: bool) -> CoverResult<()> {
        self.modify_style(|s| s.border_enabled = on)
    }

    pub fn set_border_color(&mut self, swatch: BorderSwatch) -> CoverResult<()> {
        self.modify_style(|s| s.border_color = swatch)
    }

    pub fn set_border_width(&mut self, px: u32) -> CoverResult<()> {
        self.modify_style(|s| s.border_width_px = px)
    }

    pub fn set_vertical_anchor(&mut self, anchor: VerticalAnchor) -> CoverResult<()> {
        self.modify_style(|s| s.vertical_anchor = anchor)
    }

    pub fn set_gradient_enabled(&mut self, on: bool) -> CoverResult<()> {
        self.modify_style(|s| s.gradient_enabled = on)
    }

    pub fn set_gradient_color(&mut self, color: Rgba8) -> CoverResult<()> {
        self.modify_style(|s| s.gradient_color = color)
    }

    /// Start decoding `bytes` as the new background. Returns the request's sequence id.
    pub fn request_background(&mut self, bytes: Vec<u8>) -> u64 {
        self.loader.submit_bytes(bytes)
    }

    /// Start reading and decoding `path` as the new background.
    pub fn request_background_file(&mut self, path: PathBuf) -> u64 {
        self.loader.submit_file(path)
    }

    /// Apply every completion that has already arrived.
    pub fn poll_loads(&mut self) -> Vec<LoadOutcome> {
        let mut out = Vec::new();
        while let Some(c) = self.loader.try_next() {
            out.push(self.apply_completion(c));
        }
        out
    }

    /// Block for the next completion and apply it. `None` when nothing is pending.
    pub fn wait_for_load(&mut self) -> Option<LoadOutcome> {
        let c = self.loader.wait_next()?;
        Some(self.apply_completion(c))
    }

    /// Block until every pending request has completed and return the outcomes in arrival
    /// order.
    pub fn drain_loads(&mut self) -> Vec<LoadOutcome> {
        let mut out = Vec::new();
        while let Some(o) = self.wait_for_load() {
            out.push(o);
        }
        out
    }

    /// Apply one completion. Only the most recent request may replace the background.
    pub fn apply_completion(&mut self, completion: LoadCompletion) -> LoadOutcome {
        let LoadCompletion {
            sequence_id,
            result,
        } = completion;

        if self.loader.latest_sequence() != Some(sequence_id) {
            tracing::debug!(sequence_id, "discarding stale background decode");
            return LoadOutcome::Stale { sequence_id };
        }

        match result {
            Ok(bitmap) => {
                tracing::debug!(
                    sequence_id,
                    width = bitmap.width,
                    height = bitmap.height,
                    "applying background"
                );
                self.set_background(bitmap);
                LoadOutcome::Applied { sequence_id }
            }
            Err(error) => {
                tracing::warn!(sequence_id, error = %error, "background decode failed");
                LoadOutcome::Failed { sequence_id, error }
            }
        }
    }

    /// Replace the background synchronously and re-render.
    pub fn set_background(&mut self, bitmap: Bitmap) {
        self.background = BackgroundSource::from(bitmap);
        self.render();
    }

    /// Drop the background and go back to the fallback fill.
    pub fn clear_background(&mut self) {
        self.background = BackgroundSource::None;
        self.render();
    }

    /// Write the current surface to `<dir>/<configured file name>`.
    pub fn export_png(&self, dir: &Path) -> CoverResult<PathBuf> {
        self.exporter.export(&self.surface, dir)
    }
}
