// robot/src/tts.rs - Голосовые ответы робота

use std::process::{Command, Stdio};

use log::{debug, warn};

/// Синтез речи. Вызов "выстрелил и забыл": ошибки только логируются.
pub trait Speaker {
    fn speak(&self, text: &str);
}

/// Системный espeak на Linux
#[derive(Debug, Clone)]
pub struct Espeak {
    program: String,
    voice: String,
}

pub const DEFAULT_ESPEAK_PROGRAM: &str = "espeak";
pub const DEFAULT_ESPEAK_VOICE: &str = "italian";

impl Default for Espeak {
    fn default() -> Self {
        Self::new(DEFAULT_ESPEAK_PROGRAM, DEFAULT_ESPEAK_VOICE)
    }
}

impl Espeak {
    pub fn new(program: &str, voice: &str) -> Self {
        Self {
            program: program.to_string(),
            voice: voice.to_string(),
        }
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", self.voice.as_str(), text])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Speaker for Espeak {
    fn speak(&self, text: &str) {
        debug!("Saying: {}", text);

        match self.command(text).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("{} exited with {} while saying '{}'", self.program, status, text),
            Err(e) => warn!("Failed to run {}: {}", self.program, e),
        }
    }
}

/// Молчаливый синтезатор для запуска без звука
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, text: &str) {
        debug!("(silent) {}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_espeak_arguments() {
        let espeak = Espeak::default();
        let command = espeak.command("Ok, vado avanti");
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(command.get_program(), "espeak");
        assert_eq!(args, vec!["-v", "italian", "Ok, vado avanti"]);
    }

    #[test]
    fn test_missing_program_does_not_panic() {
        let espeak = Espeak::new("definitely-not-a-tts-binary", "italian");
        espeak.speak("ciao");
    }
}
