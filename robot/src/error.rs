// robot/src/error.rs - Типы ошибок контроллера робота

use thiserror::Error;

/// Главный тип ошибки для всего приложения
#[derive(Debug, Error)]
pub enum RobotError {
    // Ошибки конфигурации
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Ошибки моторов
    #[error("Motor error: {0}")]
    Motor(#[from] MotorError),

    // Ошибки записи аудио
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    // Ошибки движков распознавания
    #[error("Recognition backend error: {0}")]
    Backend(#[from] BackendError),

    // Системные ошибки
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger error: {0}")]
    Logger(String),
}

/// Ошибки конфигурации
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cloud credentials are missing")]
    CredentialsMissing,
}

/// Ошибка записи в PWM/GPIO
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareFault {
    #[error("PWM write on pin {pin} failed: {reason}")]
    Pwm { pin: u8, reason: String },

    #[error("Direction write on pin {pin} failed: {reason}")]
    Direction { pin: u8, reason: String },
}

/// Ошибки драйвера мотора
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotorError {
    /// Скорость вне диапазона 0..=100
    #[error("Invalid speed {0}, expected 0..=100")]
    InvalidSpeed(i32),

    #[error(transparent)]
    Hardware(#[from] HardwareFault),
}

/// Ошибки микрофона
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Никто ничего не сказал за отведённое время
    #[error("No phrase captured before the time limit")]
    Timeout,

    #[error("Audio device failure: {0}")]
    Device(String),
}

/// Ошибки движков распознавания речи
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Speech could not be understood")]
    Unrecognized,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,
}

// Тип Result для удобства
pub type RobotResult<T> = Result<T, RobotError>;
