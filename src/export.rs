use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use crate::{
    config::ExportConfig,
    foundation::error::{CoverError, CoverResult},
    render::Surface,
};

/// Encode the surface as a straight-alpha RGBA8 PNG of the same dimensions.
#[tracing::instrument(skip_all, fields(w = surface.width(), h = surface.height()))]
pub fn encode_png(surface: &Surface) -> CoverResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(
        surface.width(),
        surface.height(),
        surface.to_straight_rgba8(),
    )
    .ok_or_else(|| CoverError::export("surface buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| CoverError::export(format!("encode png: {e}")))?;
    Ok(buf)
}

/// Writes the surface under a fixed file name.
#[derive(Clone, Debug)]
pub struct Exporter {
    file_name: String,
}

impl Exporter {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            file_name: config.file_name.clone(),
        }
    }

    /// Encode and write `<dir>/<file_name>`, returning the final path.
    ///
    /// The bytes land in a temporary sibling first and are renamed into place, so a failed export
    /// never leaves a truncated file under the final name.
    #[tracing::instrument(skip(self, surface), fields(file = %self.file_name))]
    pub fn export(&self, surface: &Surface, dir: &Path) -> CoverResult<PathBuf> {
        let png = encode_png(surface)?;

        std::fs::create_dir_all(dir).map_err(|e| {
            CoverError::export(format!("create output dir '{}': {e}", dir.display()))
        })?;
        let out = dir.join(&self.file_name);
        let tmp = dir.join(format!(".{}.{}.tmp", self.file_name, std::process::id()));

        let written = std::fs::write(&tmp, &png)
            .and_then(|()| std::fs::rename(&tmp, &out))
            .map_err(|e| CoverError::export(format!("write png '{}': {e}", out.display())));
        drop(png);
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        tracing::debug!(path = %out.display(), "exported cover");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "covercraft_export_{tag}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn png_round_trips_dimensions_and_pixels() {
        let mut s = Surface::new(Canvas::new(3, 2).unwrap()).unwrap();
        s.fill([0x33, 0x33, 0x33, 255]);
        let png = encode_png(&s).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [0x33, 0x33, 0x33, 255]);
    }

    #[test]
    fn export_writes_fixed_name_without_leftovers() {
        let dir = temp_dir("ok");
        let s = Surface::new(Canvas::new(4, 4).unwrap()).unwrap();
        let exporter = Exporter::new(&ExportConfig::default());

        let path = exporter.export(&s, &dir).unwrap();
        assert_eq!(path, dir.join("spotify-cover.png"));
        assert!(path.is_file());

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn export_into_a_file_path_fails_cleanly() {
        let dir = temp_dir("blocked");
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let s = Surface::new(Canvas::new(2, 2).unwrap()).unwrap();
        let err = Exporter::new(&ExportConfig::default())
            .export(&s, &blocker)
            .unwrap_err();
        assert!(matches!(err, CoverError::Export(_)));
        assert!(!blocker.join("spotify-cover.png").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
