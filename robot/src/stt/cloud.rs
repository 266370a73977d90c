// robot/src/stt/cloud.rs - Google Cloud Speech через REST

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{CloudBackend, CloudCredentials};
use crate::audio::AudioBuffer;
use crate::error::BackendError;

pub const GOOGLE_SPEECH_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

pub struct GoogleCloudSpeech {
    client: Client,
    endpoint: String,
}

impl GoogleCloudSpeech {
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        Self::with_endpoint(GOOGLE_SPEECH_URL, timeout)
    }

    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

/// Тело запроса `speech:recognize` с подсказками словаря
fn request_body(audio: &AudioBuffer, hints: &[&str], language: &str) -> serde_json::Value {
    json!({
        "config": {
            "encoding": "LINEAR16",
            "sampleRateHertz": audio.sample_rate,
            "languageCode": language,
            "speechContexts": [{ "phrases": hints }],
        },
        "audio": {
            "content": STANDARD.encode(audio.to_le_bytes()),
        },
    })
}

/// Лучшая альтернатива первого результата. Пустой ответ значит "не понял".
fn best_transcript(response: RecognizeResponse) -> Result<String, BackendError> {
    response
        .results
        .into_iter()
        .filter_map(|r| r.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .find(|t| !t.trim().is_empty())
        .ok_or(BackendError::Unrecognized)
}

fn map_status(status: StatusCode, body: String) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::Timeout,
        _ => BackendError::Network(format!("HTTP {}: {}", status, body)),
    }
}

fn map_transport(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Network(e.to_string())
    }
}

impl CloudBackend for GoogleCloudSpeech {
    fn transcribe(
        &mut self,
        audio: &AudioBuffer,
        hints: &[&str],
        language: &str,
        credentials: &CloudCredentials,
    ) -> Result<String, BackendError> {
        if credentials.api_key.trim().is_empty() {
            return Err(BackendError::Auth("empty API key".to_string()));
        }

        debug!("Sending {:.1}s of audio to Google Cloud Speech", audio.duration().as_secs_f32());

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", credentials.api_key.as_str())])
            .json(&request_body(audio, hints, language))
            .send()
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(map_status(status, body));
        }

        let parsed: RecognizeResponse = response.json().map_err(map_transport)?;
        best_transcript(parsed)
    }
}
