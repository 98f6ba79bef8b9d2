pub mod decode;
pub mod fonts;

pub use decode::{Bitmap, decode_background};
pub use fonts::{FontFace, FontLibrary};
