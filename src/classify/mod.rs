pub mod classifier;
pub mod heading;

pub use classifier::RoleClassifier;
pub use heading::{is_scene_heading, HeadingDetector, HeadingOverride};
