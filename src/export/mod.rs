pub mod filename;
pub mod image;
pub mod text;

pub use filename::sanitize_filename;
pub use image::{CropPlan, ImageLimits, SavedImage, export_area};
pub use text::edit_text;
