#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod controller;
pub mod export;
pub mod foundation;
pub mod loader;
pub mod render;
pub mod style;

pub use assets::{Bitmap, FontFace, FontLibrary, decode_background};
pub use config::{ExportConfig, RenderConfig, ShadowProfile, StyleLimits};
pub use controller::{Controller, LoadOutcome};
pub use export::{Exporter, encode_png};
pub use foundation::core::{Canvas, Rgba8, Rgba8Premul};
pub use foundation::error::{CoverError, CoverResult};
pub use loader::{ImageLoader, LoadCompletion};
pub use render::text::anchor_point;
pub use render::{BackgroundSource, Compositor, CoverFit, Surface};
pub use style::{
    BorderSwatch, StyleField, StyleParameters, TextColorPreset, VerticalAnchor, VisibleFields,
    visible_fields,
};
