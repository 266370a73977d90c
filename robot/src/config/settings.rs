// robot/src/config/settings.rs - Настройки робота из JSON файла

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::connectivity::{DEFAULT_PROBE_HOST, DEFAULT_PROBE_PORT};
use crate::error::{ConfigError, RobotResult};
use crate::motors::DriveTimings;
use crate::stt::{DEFAULT_KEYWORD_THRESHOLD, LANGUAGE};

pub const DEFAULT_SETTINGS_FILE: &str = "robot.json";
pub const DEFAULT_LOG_FILE: &str = "robot.log";
pub const DEFAULT_CREDENTIALS_FILE: &str = "google-cloud-speech-credentials.json";
pub const DEFAULT_VOSK_MODEL: &str = "vosk-model-small-it";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub forward_secs: f64,
    /// Две версии прототипа расходились (1.5 и 3.0), выбрано 1.5
    pub backward_secs: f64,
    pub turn_secs: f64,
    pub speed: i32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            forward_secs: 3.0,
            backward_secs: 1.5,
            turn_secs: 0.8,
            speed: 100,
        }
    }
}

impl MotionSettings {
    pub fn timings(&self) -> DriveTimings {
        DriveTimings {
            forward: secs(self.forward_secs),
            backward: secs(self.backward_secs),
            turn: secs(self.turn_secs),
            speed: self.speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenSettings {
    pub phrase_time_limit_secs: f64,
    pub cycle_pause_secs: f64,
    pub failure_threshold: u32,
    pub language: String,
    pub keyword_threshold: f32,
    pub cloud_timeout_secs: f64,
    /// -1 значит микрофон по умолчанию
    pub microphone_index: i32,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            phrase_time_limit_secs: 2.0,
            cycle_pause_secs: 0.5,
            failure_threshold: 10,
            language: LANGUAGE.to_string(),
            keyword_threshold: DEFAULT_KEYWORD_THRESHOLD,
            cloud_timeout_secs: 5.0,
            microphone_index: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivitySettings {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
    pub interval_secs: f64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROBE_HOST.to_string(),
            port: DEFAULT_PROBE_PORT,
            timeout_secs: 1.0,
            interval_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub left_pwm_pin: u8,
    pub right_pwm_pin: u8,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            left_pwm_pin: 27,
            right_pwm_pin: 22,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub log_file: PathBuf,
    pub credentials_file: PathBuf,
    pub vosk_model: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            vosk_model: PathBuf::from(DEFAULT_VOSK_MODEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub motion: MotionSettings,
    pub listen: ListenSettings,
    pub connectivity: ConnectivitySettings,
    pub hardware: HardwareSettings,
    pub paths: PathSettings,
    pub log_level: String,
    pub voice: String,
    /// false: робот молчит (SilentSpeaker)
    pub voice_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            motion: MotionSettings::default(),
            listen: ListenSettings::default(),
            connectivity: ConnectivitySettings::default(),
            hardware: HardwareSettings::default(),
            paths: PathSettings::default(),
            log_level: "debug".to_string(),
            voice: crate::tts::DEFAULT_ESPEAK_VOICE.to_string(),
            voice_enabled: true,
        }
    }
}

/// Верхняя граница для любой длительности в настройках
pub const MAX_DURATION_SECS: f64 = 3600.0;

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let motion = &self.motion;
        let listen = &self.listen;
        let net = &self.connectivity;

        for (name, value) in [
            ("motion.forward_secs", motion.forward_secs),
            ("motion.backward_secs", motion.backward_secs),
            ("motion.turn_secs", motion.turn_secs),
            ("listen.phrase_time_limit_secs", listen.phrase_time_limit_secs),
            ("listen.cycle_pause_secs", listen.cycle_pause_secs),
        ] {
            check_secs(name, value, true)?;
        }

        // Ноль здесь означает пустой цикл опроса или мгновенный таймаут
        for (name, value) in [
            ("listen.cloud_timeout_secs", listen.cloud_timeout_secs),
            ("connectivity.timeout_secs", net.timeout_secs),
            ("connectivity.interval_secs", net.interval_secs),
        ] {
            check_secs(name, value, false)?;
        }

        if !(0..=100).contains(&motion.speed) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "motion.speed must be within 0..=100, got {}",
                motion.speed
            )));
        }

        Ok(())
    }
}

fn check_secs(name: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if value.is_finite() && lower_ok && value <= MAX_DURATION_SECS {
        return Ok(());
    }

    let bound = if allow_zero { "non-negative" } else { "positive" };
    Err(ConfigError::InvalidConfiguration(format!(
        "{} must be a {} number of seconds up to {}, got {}",
        name, bound, MAX_DURATION_SECS, value
    )))
}

/// Нечисловые и отрицательные значения дают ноль, слишком большие урезаются
pub fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value.min(MAX_DURATION_SECS))
    } else {
        Duration::ZERO
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".backup");
    path.with_file_name(name)
}

/// Загрузка настроек. Нет файла: создаём по умолчанию.
/// Файл битый: сохраняем копию и берём значения по умолчанию.
pub fn load_settings(path: &Path) -> RobotResult<Settings> {
    info!("Loading settings from: {}", path.display());

    if !path.exists() {
        warn!("Settings file not found. Creating default settings.");
        let settings = Settings::default();
        save_settings(path, &settings)?;
        return Ok(settings);
    }

    let file = File::open(path).map_err(|e| ConfigError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let settings = match serde_json::from_reader::<_, Settings>(BufReader::new(file)) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to parse settings file: {}", e);

            let backup = backup_path(path);
            match fs::copy(path, &backup) {
                Ok(_) => info!("Corrupted settings backed up to: {}", backup.display()),
                Err(backup_err) => warn!("Failed to create backup of corrupted settings: {}", backup_err),
            }

            warn!("Using default settings due to parsing error");
            Settings::default()
        }
    };

    settings.validate()?;
    Ok(settings)
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Атомарная запись через временный файл
pub fn save_settings(path: &Path, settings: &Settings) -> RobotResult<()> {
    let temp_path = path.with_extension("tmp");

    {
        let temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| write_failed(path, e))?;

        let mut writer = BufWriter::new(temp_file);
        serde_json::to_writer_pretty(&mut writer, settings).map_err(|e| write_failed(path, e))?;
        writer.flush().map_err(|e| write_failed(path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| write_failed(path, e))?;
    info!("Settings saved to: {}", path.display());
    Ok(())
}
