use std::path::Path;

use anyhow::Context as _;
use parley::fontique::Blob;
use parley::style::{FontStyle, FontWeight};

use crate::foundation::error::{CoverError, CoverResult};

/// One registered font face.
///
/// The file bytes live in a shared [`Blob`]; shaping contexts and glyph runs only ever clone the
/// handle.
#[derive(Clone)]
pub struct FontFace {
    family: String,
    weight: FontWeight,
    style: FontStyle,
    data: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("weight", &self.weight.value())
            .field("len", &self.data.data.len())
            .finish()
    }
}

impl FontFace {
    /// Parse `bytes` and read family, weight and style of its first face.
    pub fn from_bytes(bytes: Vec<u8>) -> CoverResult<Self> {
        let blob = Blob::from(bytes);
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(blob.clone(), None);
        let (family_id, infos) = families.first().ok_or_else(|| {
            CoverError::validation("no font families registered from font bytes")
        })?;
        let info = infos
            .first()
            .ok_or_else(|| CoverError::validation("font file contains no faces"))?;
        let family = font_ctx
            .collection
            .family_name(*family_id)
            .ok_or_else(|| CoverError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            family,
            weight: info.weight(),
            style: info.style(),
            data: vello_cpu::peniko::FontData::new(blob, info.index()),
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// CSS weight (400 regular, 700 bold).
    pub fn weight(&self) -> f32 {
        self.weight.value()
    }

    pub(crate) fn blob(&self) -> &Blob<u8> {
        &self.data.data
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.family.eq_ignore_ascii_case(&other.family)
            && self.weight == other.weight
            && self.style == other.style
    }
}

/// Fonts available to the compositor, grouped by family name.
///
/// A family may hold several faces (regular, bold, ...); shaping picks among them by weight.
/// There is no system font discovery: callers register the files they want to offer.
#[derive(Clone, Debug, Default)]
pub struct FontLibrary {
    faces: Vec<FontFace>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face and return its family name. A later face with the same family, weight and
    /// style replaces the earlier one.
    pub fn register_bytes(&mut self, bytes: Vec<u8>) -> CoverResult<String> {
        let face = FontFace::from_bytes(bytes)?;
        let family = face.family.clone();
        tracing::debug!(family = %family, weight = face.weight(), "registered font");
        match self.faces.iter_mut().find(|f| f.same_slot(&face)) {
            Some(slot) => *slot = face,
            None => self.faces.push(face),
        }
        Ok(family)
    }

    pub fn register_file(&mut self, path: &Path) -> CoverResult<String> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.register_bytes(bytes)
    }

    /// Every face of `family` (case-insensitive), in registration order.
    pub fn faces_of<'a>(&'a self, family: &str) -> impl Iterator<Item = &'a FontFace> {
        let family = family.trim();
        self.faces
            .iter()
            .filter(move |f| f.family.eq_ignore_ascii_case(family))
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.faces_of(family).next().is_some()
    }

    /// Canonical name of the family to shape with: `family` itself when registered, otherwise
    /// the family of the first registered face.
    pub fn resolve(&self, family: &str) -> Option<&str> {
        self.faces_of(family)
            .next()
            .or_else(|| self.faces.first())
            .map(|f| f.family.as_str())
    }

    /// Distinct family names, in registration order.
    pub fn families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for f in &self.faces {
            if !out.iter().any(|n| n.eq_ignore_ascii_case(&f.family)) {
                out.push(&f.family);
            }
        }
        out
    }

    /// Number of faces (not families).
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGULAR: &str = "tests/data/fonts/DejaVuSans.ttf";
    const BOLD: &str = "tests/data/fonts/DejaVuSans-Bold.ttf";

    #[test]
    fn garbage_bytes_are_rejected() {
        let mut lib = FontLibrary::new();
        assert!(lib.register_bytes(b"not a font".to_vec()).is_err());
        assert!(lib.is_empty());
    }

    #[test]
    fn empty_library_resolves_nothing() {
        let lib = FontLibrary::new();
        assert!(lib.resolve("Arial").is_none());
        assert!(lib.families().is_empty());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let mut lib = FontLibrary::new();
        assert!(
            lib.register_file(Path::new("does/not/exist.ttf"))
                .is_err()
        );
    }

    #[test]
    fn regular_and_bold_share_a_family() {
        let mut lib = FontLibrary::new();
        let a = lib.register_file(Path::new(BOLD)).unwrap();
        let b = lib.register_file(Path::new(REGULAR)).unwrap();
        assert_eq!(a, b);
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.families(), vec![a.as_str()]);

        let mut weights: Vec<f32> = lib.faces_of(&a).map(FontFace::weight).collect();
        weights.sort_by(f32::total_cmp);
        assert_eq!(weights, vec![400.0, 700.0]);
    }

    #[test]
    fn same_face_twice_replaces() {
        let mut lib = FontLibrary::new();
        lib.register_file(Path::new(REGULAR)).unwrap();
        lib.register_file(Path::new(REGULAR)).unwrap();
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn unknown_family_resolves_to_first_registered() {
        let mut lib = FontLibrary::new();
        let family = lib.register_file(Path::new(REGULAR)).unwrap();
        assert_eq!(lib.resolve("dejavu sans"), Some(family.as_str()));
        assert_eq!(lib.resolve("Nope"), Some(family.as_str()));
        assert!(lib.contains_family(&family.to_uppercase()));
        assert!(!lib.contains_family("Nope"));
    }
}
