// robot/src/config/mod.rs

pub mod credentials;
pub mod settings;

// Re-export main config functions
pub use credentials::load_credentials;
pub use settings::*;
