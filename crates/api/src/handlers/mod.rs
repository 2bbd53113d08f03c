pub mod face;
pub mod jobs;
pub mod lipsync;
pub mod settings;
pub mod upload;
pub mod video;
