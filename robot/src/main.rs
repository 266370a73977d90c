// robot/src/main.rs - Точка входа робота

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;

use voice_robot::audio::AudioCapture;
use voice_robot::config::{self, secs, Settings, DEFAULT_SETTINGS_FILE};
use voice_robot::connectivity::{ConnectivityMonitor, TcpProbe};
use voice_robot::motors::{DriveController, LoggingMotorOutput, MotorDriver};
use voice_robot::stt::{GoogleCloudSpeech, OfflineBackend, SpeechRecognizer};
use voice_robot::tts::{Espeak, SilentSpeaker, Speaker, DEFAULT_ESPEAK_PROGRAM};
use voice_robot::{CancellationToken, LoopSettings, Robot, RobotParts};

#[macro_use]
extern crate log;

fn main() {
    if let Err(e) = run() {
        error!("Robot failed: {:#}", e);
        eprintln!("Robot failed: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let settings_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let settings = config::load_settings(&settings_path)?;
    voice_robot::log::init(&settings.paths.log_file, &settings.log_level)?;
    info!("Session started, voice-robot v{}", voice_robot::VERSION);

    let cancel = CancellationToken::new();
    setup_signal_handlers(&cancel)?;

    let parts = RobotParts {
        drive: build_drive(&settings, &cancel),
        monitor: build_monitor(&settings),
        recognizer: build_recognizer(&settings)?,
        capture: build_capture(&settings)?,
        speaker: build_speaker(&settings),
    };

    let mut robot = Robot::start(parts, LoopSettings::from(&settings.listen), cancel)?;
    robot.run();
    robot.shutdown();

    info!("Session ended");
    Ok(())
}

#[cfg(unix)]
fn setup_signal_handlers(cancel: &CancellationToken) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    let cancel = cancel.clone();

    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received shutdown signal: {}", sig);
                cancel.cancel();
            }
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_cancel: &CancellationToken) -> anyhow::Result<()> {
    warn!("Signal handling is not supported on this platform");
    Ok(())
}

fn build_drive(settings: &Settings, cancel: &CancellationToken) -> DriveController {
    let hw = &settings.hardware;
    info!("No GPIO backend in this build, motor commands are only logged");

    DriveController::new(
        MotorDriver::new("left", Box::new(LoggingMotorOutput::new("left", hw.left_pwm_pin))),
        MotorDriver::new("right", Box::new(LoggingMotorOutput::new("right", hw.right_pwm_pin))),
        settings.motion.timings(),
        cancel.clone(),
    )
}

fn build_speaker(settings: &Settings) -> Box<dyn Speaker> {
    if settings.voice_enabled {
        Box::new(Espeak::new(DEFAULT_ESPEAK_PROGRAM, &settings.voice))
    } else {
        info!("Voice feedback disabled");
        Box::new(SilentSpeaker)
    }
}

fn build_monitor(settings: &Settings) -> ConnectivityMonitor {
    let net = &settings.connectivity;
    let probe = TcpProbe {
        host: net.host.clone(),
        port: net.port,
        timeout: secs(net.timeout_secs),
    };
    ConnectivityMonitor::new(Arc::new(probe), secs(net.interval_secs))
}

fn build_recognizer(settings: &Settings) -> anyhow::Result<SpeechRecognizer> {
    let listen = &settings.listen;
    let credentials = config::load_credentials(&settings.paths.credentials_file);
    let cloud = GoogleCloudSpeech::new(secs(listen.cloud_timeout_secs))?;

    Ok(SpeechRecognizer::new(build_offline(settings)?, listen.keyword_threshold)
        .with_cloud(Box::new(cloud), credentials)
        .with_language(&listen.language))
}

#[cfg(feature = "vosk")]
fn build_offline(settings: &Settings) -> anyhow::Result<Box<dyn OfflineBackend>> {
    let backend = voice_robot::stt::vosk::VoskBackend::new(&settings.paths.vosk_model)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "vosk"))]
fn build_offline(_settings: &Settings) -> anyhow::Result<Box<dyn OfflineBackend>> {
    warn!("Built without the vosk feature, offline recognition is disabled");
    Ok(Box::new(voice_robot::stt::NoOfflineBackend))
}

#[cfg(feature = "pv-recorder")]
fn build_capture(settings: &Settings) -> anyhow::Result<Box<dyn AudioCapture>> {
    let microphone = voice_robot::audio::recorder::PvMicrophone::new(settings.listen.microphone_index)?;
    Ok(Box::new(microphone))
}

#[cfg(not(feature = "pv-recorder"))]
fn build_capture(_settings: &Settings) -> anyhow::Result<Box<dyn AudioCapture>> {
    anyhow::bail!("Built without the pv-recorder feature, no microphone available")
}
