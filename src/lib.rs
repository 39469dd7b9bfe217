pub mod calibrate;
pub mod classify;
pub mod core;
pub mod error;
pub mod export;
pub mod parser;
pub mod pipeline;
pub mod transcript;

pub use calibrate::{CalibrationParams, ClusterSet};
pub use core::geometry::TextLine;
pub use core::model::{DocumentLayout, Page, Role, TranscriptRecord};
pub use error::ExtractError;
