// robot/src/app.rs - Основной цикл: слушаем, распознаём, выполняем

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::audio::AudioCapture;
use crate::cancel::CancellationToken;
use crate::config::{secs, ListenSettings};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{CaptureError, RobotResult};
use crate::motors::{DriveController, Move};
use crate::stt::{Command, SpeechRecognizer};
use crate::tts::Speaker;

/// Фразы робота
pub mod phrases {
    pub const FORWARD: &str = "Ok, vado avanti";
    pub const BACKWARD: &str = "Ok, vado indietro";
    pub const LEFT: &str = "Ok, giro a sinistra";
    pub const RIGHT: &str = "Ok, giro a destra";
    pub const NOT_UNDERSTOOD: &str = "Non ho capito, ripeti";
    pub const UNMUTED: &str = "Eccomi";
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub phrase_time_limit: Duration,
    pub cycle_pause: Duration,
    /// Сколько неудач подряд терпим до внеочередной проверки сети
    pub failure_threshold: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            phrase_time_limit: Duration::from_secs(2),
            cycle_pause: Duration::from_millis(500),
            failure_threshold: 10,
        }
    }
}

impl From<&ListenSettings> for LoopSettings {
    fn from(listen: &ListenSettings) -> Self {
        Self {
            phrase_time_limit: secs(listen.phrase_time_limit_secs),
            cycle_pause: secs(listen.cycle_pause_secs),
            failure_threshold: listen.failure_threshold,
        }
    }
}

/// Машина состояний Listening -> Recognizing -> Dispatching -> Listening
pub struct CommandLoop<'a> {
    drive: &'a mut DriveController,
    recognizer: &'a mut SpeechRecognizer,
    monitor: &'a ConnectivityMonitor,
    capture: &'a mut dyn AudioCapture,
    speaker: &'a dyn Speaker,
    settings: LoopSettings,
    muted: bool,
    failures: u32,
}

impl<'a> CommandLoop<'a> {
    pub fn new(
        drive: &'a mut DriveController,
        recognizer: &'a mut SpeechRecognizer,
        monitor: &'a ConnectivityMonitor,
        capture: &'a mut dyn AudioCapture,
        speaker: &'a dyn Speaker,
        settings: LoopSettings,
    ) -> Self {
        Self {
            drive,
            recognizer,
            monitor,
            capture,
            speaker,
            settings,
            muted: false,
            failures: 0,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    /// Крутится до отмены токена, на выходе моторы всегда заглушены
    pub fn run(&mut self, cancel: &CancellationToken) {
        info!("Listening for voice commands...");

        while !cancel.is_cancelled() {
            self.step();
            if cancel.wait_timeout(self.settings.cycle_pause) {
                break;
            }
        }

        info!("Shutdown requested, exiting command loop");
        self.drive.stop();
    }

    /// Один цикл: запись, распознавание, выполнение
    pub fn step(&mut self) -> Command {
        let command = self.listen();
        debug!("Dispatching {:?}", command);
        self.dispatch(command);
        command
    }

    fn listen(&mut self) -> Command {
        match self.capture.capture_sample(self.settings.phrase_time_limit) {
            Ok(audio) => self.recognizer.recognize(&audio, self.monitor.is_connected()),
            Err(CaptureError::Timeout) => {
                debug!("Timeout");
                Command::Timeout
            }
            Err(e) => {
                error!("Failed to read from microphone: {}", e);
                Command::Timeout
            }
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Forward | Command::Backward | Command::Left | Command::Right => {
                self.execute_motion(command)
            }
            Command::Mute => {
                if !self.muted {
                    info!("Muted");
                }
                self.muted = true;
                self.failures = 0;
            }
            Command::Unmute => {
                if self.muted {
                    info!("Unmuted");
                    self.muted = false;
                    self.failures = 0;
                    self.say(phrases::UNMUTED);
                } else {
                    debug!("Unmute ignored, not muted");
                }
            }
            Command::Unknown | Command::Timeout => self.record_failure(command),
        }
    }

    fn execute_motion(&mut self, command: Command) {
        if self.muted {
            info!("Muted, ignoring {:?}", command);
            return;
        }

        let (mv, phrase) = match command {
            Command::Forward => (Move::Forward, phrases::FORWARD),
            Command::Backward => (Move::Backward, phrases::BACKWARD),
            Command::Left => (Move::TurnLeft, phrases::LEFT),
            Command::Right => (Move::TurnRight, phrases::RIGHT),
            _ => return,
        };

        self.say(phrase);
        match self.drive.perform(mv) {
            Ok(()) => self.failures = 0,
            Err(e) => error!("Command {:?} failed: {}", command, e),
        }
    }

    fn record_failure(&mut self, command: Command) {
        if command == Command::Unknown {
            self.say(phrases::NOT_UNDERSTOOD);
        }

        self.failures += 1;
        if self.failures > self.settings.failure_threshold {
            warn!("{} recognition failures in a row, re-checking connectivity", self.failures);
            let connected = self.monitor.refresh();
            info!("Connectivity re-checked: {}", if connected { "online" } else { "offline" });
            self.failures = 0;
        }
    }

    fn say(&self, text: &str) {
        if self.muted {
            debug!("Muted, not saying '{}'", text);
            return;
        }
        self.speaker.speak(text);
    }
}

/// Компоненты робота до запуска
pub struct RobotParts {
    pub drive: DriveController,
    pub monitor: ConnectivityMonitor,
    pub recognizer: SpeechRecognizer,
    pub capture: Box<dyn AudioCapture>,
    pub speaker: Box<dyn Speaker>,
}

/// Сессия робота. Остановка (в том числе при drop) сначала глушит моторы,
/// потом останавливает и дожидается монитора сети.
pub struct Robot {
    drive: DriveController,
    monitor: ConnectivityMonitor,
    recognizer: SpeechRecognizer,
    capture: Box<dyn AudioCapture>,
    speaker: Box<dyn Speaker>,
    settings: LoopSettings,
    cancel: CancellationToken,
    running: bool,
}

impl Robot {
    /// Стартовая проверка сети, запуск монитора и калибровка микрофона
    pub fn start(parts: RobotParts, settings: LoopSettings, cancel: CancellationToken) -> RobotResult<Self> {
        let mut robot = Self {
            drive: parts.drive,
            monitor: parts.monitor,
            recognizer: parts.recognizer,
            capture: parts.capture,
            speaker: parts.speaker,
            settings,
            cancel,
            running: true,
        };

        robot.drive.stop();
        robot.monitor.start()?;

        if let Err(e) = robot.capture.calibrate() {
            warn!("Microphone calibration failed: {}", e);
        }

        info!("Robot started");
        Ok(robot)
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Блокирует до отмены токена
    pub fn run(&mut self) {
        let mut command_loop = CommandLoop::new(
            &mut self.drive,
            &mut self.recognizer,
            &self.monitor,
            self.capture.as_mut(),
            self.speaker.as_ref(),
            self.settings.clone(),
        );
        command_loop.run(&self.cancel);
    }

    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        info!("Performing graceful shutdown...");
        self.drive.stop();
        self.monitor.stop();
        info!("Graceful shutdown completed");
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.shutdown();
    }
}
