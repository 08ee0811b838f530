pub mod primitives;
pub mod registry;

pub use registry::{sanitize_name, Palette};
