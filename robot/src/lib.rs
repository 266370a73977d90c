// robot/src/lib.rs - Голосовое управление двухмоторным роботом

pub mod error;
pub mod cancel;

// Железо
pub mod motors;

// Сеть, микрофон, распознавание, голос
pub mod connectivity;
pub mod audio;
pub mod stt;
pub mod tts;

pub mod config;
pub mod log;
pub mod app;

pub use app::{CommandLoop, LoopSettings, Robot, RobotParts};
pub use cancel::CancellationToken;
pub use error::{RobotError, RobotResult};
pub use stt::Command;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
