pub mod blur;
pub mod composite;
pub mod compositor;
pub mod cover_fit;
pub mod gradient;
pub mod surface;
pub mod text;

pub use compositor::{BackgroundSource, Compositor};
pub use cover_fit::CoverFit;
pub use surface::Surface;
