pub mod landmark;
pub mod provider;

pub use landmark::{Landmark, LandmarkIndex, LandmarkSet};
pub use provider::{PoseProvider, ScriptedProvider};
