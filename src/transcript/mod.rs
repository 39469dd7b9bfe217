pub mod builder;

pub use builder::{BuilderState, SceneCarryOver, TranscriptBuilder};
