// robot/src/stt/vosk.rs - Офлайн распознавание через Vosk

use std::path::Path;

use log::{debug, info, warn};
use ::vosk::{DecodingState, Model, Recognizer};

use super::{Keyword, OfflineBackend};
use crate::audio::AudioBuffer;
use crate::error::{BackendError, ConfigError};

/// Vosk с грамматикой, ограниченной словарём команд
pub struct VoskBackend {
    model: Model,
}

impl VoskBackend {
    pub fn new(model_path: &Path) -> Result<Self, ConfigError> {
        let path = model_path.to_string_lossy();
        let model = Model::new(path.as_ref()).ok_or_else(|| ConfigError::ReadFailed {
            path: path.to_string(),
            reason: "Vosk model could not be loaded".to_string(),
        })?;

        info!("Vosk model loaded from {}", path);
        Ok(Self { model })
    }
}

impl OfflineBackend for VoskBackend {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        keywords: &[Keyword],
        _language: &str,
    ) -> Result<String, BackendError> {
        let mut grammar: Vec<&str> = keywords.iter().map(|k| k.word.as_str()).collect();
        grammar.push("[unk]");

        let mut recognizer = Recognizer::new_with_grammar(&self.model, audio.sample_rate as f32, &grammar)
            .ok_or(BackendError::Unrecognized)?;
        recognizer.set_words(true);

        if let DecodingState::Failed = recognizer.accept_waveform(&audio.samples) {
            warn!("Vosk failed to decode {} samples", audio.samples.len());
            return Err(BackendError::Unrecognized);
        }

        let result = recognizer.final_result();
        let single = result.single().ok_or(BackendError::Unrecognized)?;

        // Слово засчитывается, только если уверенность не ниже порога этого слова
        let accepted: Vec<&str> = single
            .result
            .iter()
            .filter(|w| {
                keywords
                    .iter()
                    .any(|k| k.word == w.word && w.conf >= k.threshold)
            })
            .map(|w| w.word)
            .collect();

        debug!("Vosk heard '{}', accepted {:?}", single.text, accepted);

        if accepted.is_empty() {
            return Err(BackendError::Unrecognized);
        }
        Ok(accepted.join(" "))
    }
}
