// robot/src/stt/mod.rs - Распознавание голосовых команд

pub mod cloud;
#[cfg(feature = "vosk")]
pub mod vosk;

pub use cloud::GoogleCloudSpeech;

use log::{error, info, warn};

use crate::audio::AudioBuffer;
use crate::error::BackendError;

pub const LANGUAGE: &str = "it-IT";
pub const DEFAULT_KEYWORD_THRESHOLD: f32 = 0.5;

/// Команда, распознанная из речи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Backward,
    Left,
    Right,
    Mute,
    Unmute,
    Unknown,
    Timeout,
}

impl Command {
    pub fn is_motion(self) -> bool {
        matches!(self, Command::Forward | Command::Backward | Command::Left | Command::Right)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Command::Unknown | Command::Timeout)
    }
}

/// Словарь команд. Порядок важен: проверяется сверху вниз.
/// Укороченные формы ловят обрезанное распознавание ("anti", "dietro").
pub const PATTERNS: [(Command, &[&str]); 6] = [
    (Command::Forward, &["avanti", "anti"]),
    (Command::Backward, &["indietro", "dietro"]),
    (Command::Left, &["sinistra"]),
    (Command::Right, &["destra"]),
    (Command::Mute, &["zitto"]),
    (Command::Unmute, &["apertura"]),
];

/// Полные слова словаря, для подсказок движкам
pub fn vocabulary() -> Vec<&'static str> {
    PATTERNS.iter().map(|(_, words)| words[0]).collect()
}

/// Поиск подстроки без учёта регистра, по приоритету словаря
pub fn classify(text: &str) -> Command {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Command::Unknown;
    }

    PATTERNS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(command, _)| *command)
        .unwrap_or_else(|| {
            info!("Command not in command list: {}", text);
            Command::Unknown
        })
}

/// Ключевое слово для офлайн движка с порогом уверенности
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub word: String,
    pub threshold: f32,
}

/// Учётные данные облачного движка
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CloudCredentials {
    pub api_key: String,
}

/// Облачный движок распознавания
pub trait CloudBackend {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        hints: &[&str],
        language: &str,
        credentials: &CloudCredentials,
    ) -> Result<String, BackendError>;
}

/// Офлайн движок распознавания
pub trait OfflineBackend {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        keywords: &[Keyword],
        language: &str,
    ) -> Result<String, BackendError>;
}

/// Заглушка, когда офлайн движок не собран: всё "не понятно"
pub struct NoOfflineBackend;

impl OfflineBackend for NoOfflineBackend {
    fn transcribe(&mut self, _: &AudioBuffer, _: &[Keyword], _: &str) -> Result<String, BackendError> {
        Err(BackendError::Unrecognized)
    }
}

pub struct SpeechRecognizer {
    cloud: Option<Box<dyn CloudBackend>>,
    offline: Box<dyn OfflineBackend>,
    credentials: Option<CloudCredentials>,
    keywords: Vec<Keyword>,
    language: String,
}

impl SpeechRecognizer {
    pub fn new(offline: Box<dyn OfflineBackend>, keyword_threshold: f32) -> Self {
        let keywords = vocabulary()
            .into_iter()
            .map(|word| Keyword { word: word.to_string(), threshold: keyword_threshold })
            .collect();

        Self {
            cloud: None,
            offline,
            credentials: None,
            keywords,
            language: LANGUAGE.to_string(),
        }
    }

    /// Облачный движок используется только вместе с учётными данными
    pub fn with_cloud(mut self, cloud: Box<dyn CloudBackend>, credentials: Option<CloudCredentials>) -> Self {
        if credentials.is_none() {
            warn!("Cloud recognizer configured without credentials, using offline recognition only");
        }
        self.cloud = Some(cloud);
        self.credentials = credentials;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn recognize(&mut self, audio: &AudioBuffer, connected: bool) -> Command {
        let result = match (&mut self.cloud, &self.credentials) {
            (Some(cloud), Some(credentials)) if connected => {
                let hints = vocabulary();
                match cloud.transcribe(audio, &hints, &self.language, credentials) {
                    Ok(text) => Ok(text),
                    Err(e) => {
                        warn!("Cloud recognition failed ({}), falling back to offline", e);
                        self.offline.transcribe(audio, &self.keywords, &self.language)
                    }
                }
            }
            _ => self.offline.transcribe(audio, &self.keywords, &self.language),
        };

        match result {
            Ok(text) => {
                info!("Recognized: '{}'", text.trim());
                classify(&text)
            }
            Err(BackendError::Unrecognized) => {
                error!("Could not understand audio");
                Command::Unknown
            }
            Err(e) => {
                error!("Recog Error; {}", e);
                Command::Timeout
            }
        }
    }
}
