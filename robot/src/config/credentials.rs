// robot/src/config/credentials.rs - Учётные данные облачного распознавания

use std::fs;
use std::path::Path;

use log::{error, info};

use crate::error::ConfigError;
use crate::stt::CloudCredentials;

fn read_credentials(path: &Path) -> Result<CloudCredentials, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let credentials: CloudCredentials = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::InvalidConfiguration(format!("{}: {}", path.display(), e)))?;

    if credentials.api_key.trim().is_empty() {
        return Err(ConfigError::CredentialsMissing);
    }
    Ok(credentials)
}

/// Отсутствие учётных данных не мешает запуску: работаем офлайн
pub fn load_credentials(path: &Path) -> Option<CloudCredentials> {
    match read_credentials(path) {
        Ok(credentials) => {
            info!("Cloud speech credentials loaded from {}", path.display());
            Some(credentials)
        }
        Err(e) => {
            error!("Google cloud speech credentials can not be found: {}", e);
            None
        }
    }
}
