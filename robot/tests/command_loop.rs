// robot/tests/command_loop.rs - Сценарии основного цикла на подставном железе

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use voice_robot::audio::{AudioBuffer, AudioCapture, SAMPLE_RATE};
use voice_robot::connectivity::{ConnectivityMonitor, Probe};
use voice_robot::error::{BackendError, CaptureError, HardwareFault};
use voice_robot::motors::{Direction, DriveController, DriveTimings, MotorDriver, MotorOutput};
use voice_robot::stt::{Keyword, OfflineBackend, SpeechRecognizer};
use voice_robot::tts::{SilentSpeaker, Speaker};
use voice_robot::{CancellationToken, Command, CommandLoop, LoopSettings, Robot, RobotParts};

type Journal = Arc<Mutex<Vec<String>>>;

struct RecordingOutput {
    name: &'static str,
    pin: u8,
    journal: Journal,
}

impl MotorOutput for RecordingOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), HardwareFault> {
        self.journal.lock().unwrap().push(format!("{}:duty:{}", self.name, percent));
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareFault> {
        self.journal.lock().unwrap().push(format!("{}:dir:{:?}", self.name, direction));
        Ok(())
    }
}

/// `None` в сценарии означает тишину (таймаут записи)
struct ScriptedMicrophone {
    script: VecDeque<Option<String>>,
    heard: Arc<Mutex<Option<String>>>,
}

impl AudioCapture for ScriptedMicrophone {
    fn capture_sample(&mut self, _max_duration: Duration) -> Result<AudioBuffer, CaptureError> {
        match self.script.pop_front() {
            Some(Some(phrase)) => {
                *self.heard.lock().unwrap() = Some(phrase);
                Ok(AudioBuffer::new(vec![0; 160], SAMPLE_RATE))
            }
            _ => Err(CaptureError::Timeout),
        }
    }
}

struct ScriptedOffline {
    heard: Arc<Mutex<Option<String>>>,
}

impl OfflineBackend for ScriptedOffline {
    fn transcribe(&mut self, _: &AudioBuffer, _: &[Keyword], _: &str) -> Result<String, BackendError> {
        self.heard.lock().unwrap().take().ok_or(BackendError::Unrecognized)
    }
}

struct CountingProbe {
    count: Arc<AtomicUsize>,
}

impl Probe for CountingProbe {
    fn probe(&self) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        false
    }
}

#[derive(Clone, Default)]
struct RecordingSpeaker {
    said: Journal,
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) {
        self.said.lock().unwrap().push(text.to_string());
    }
}

fn quick_settings() -> LoopSettings {
    LoopSettings {
        phrase_time_limit: Duration::from_millis(10),
        cycle_pause: Duration::from_millis(5),
        failure_threshold: 10,
    }
}

struct Rig {
    drive: DriveController,
    recognizer: SpeechRecognizer,
    monitor: ConnectivityMonitor,
    microphone: ScriptedMicrophone,
    speaker: RecordingSpeaker,
    motors: Journal,
    probes: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Rig {
    fn new(script: &[Option<&str>]) -> Self {
        let motors = Journal::default();
        let probes = Arc::new(AtomicUsize::new(0));
        let heard = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();

        let timings = DriveTimings {
            forward: Duration::from_millis(20),
            backward: Duration::from_millis(20),
            turn: Duration::from_millis(10),
            speed: 100,
        };
        let drive = DriveController::new(
            MotorDriver::new("left", Box::new(RecordingOutput { name: "left", pin: 27, journal: motors.clone() })),
            MotorDriver::new("right", Box::new(RecordingOutput { name: "right", pin: 22, journal: motors.clone() })),
            timings,
            cancel.clone(),
        );

        Self {
            drive,
            recognizer: SpeechRecognizer::new(Box::new(ScriptedOffline { heard: heard.clone() }), 0.5),
            monitor: ConnectivityMonitor::new(
                Arc::new(CountingProbe { count: probes.clone() }),
                Duration::from_secs(60),
            ),
            microphone: ScriptedMicrophone {
                script: script.iter().map(|s| s.map(str::to_string)).collect(),
                heard,
            },
            speaker: RecordingSpeaker::default(),
            motors,
            probes,
            cancel,
        }
    }

    fn command_loop(&mut self) -> CommandLoop<'_> {
        CommandLoop::new(
            &mut self.drive,
            &mut self.recognizer,
            &self.monitor,
            &mut self.microphone,
            &self.speaker,
            quick_settings(),
        )
    }
}

fn last_two(journal: &Journal) -> Vec<String> {
    let writes = journal.lock().unwrap();
    writes[writes.len().saturating_sub(2)..].to_vec()
}

#[test]
fn eleven_timeouts_trigger_exactly_one_reprobe() {
    let mut rig = Rig::new(&[None; 11]);
    let probes = rig.probes.clone();
    let mut command_loop = rig.command_loop();

    for _ in 0..10 {
        assert_eq!(command_loop.step(), Command::Timeout);
    }
    assert_eq!(command_loop.failure_count(), 10);
    assert_eq!(probes.load(Ordering::SeqCst), 0);

    command_loop.step();
    assert_eq!(probes.load(Ordering::SeqCst), 1);
    assert_eq!(command_loop.failure_count(), 0);
}

#[test]
fn forward_command_drives_and_resets_failures() {
    let mut rig = Rig::new(&[None, None, Some("vai avanti")]);
    let motors = rig.motors.clone();
    let said = rig.speaker.said.clone();
    let mut command_loop = rig.command_loop();

    command_loop.step();
    command_loop.step();
    assert_eq!(command_loop.failure_count(), 2);

    assert_eq!(command_loop.step(), Command::Forward);
    assert_eq!(command_loop.failure_count(), 0);
    drop(command_loop);

    let writes = motors.lock().unwrap().clone();
    assert!(writes.contains(&"left:dir:Forward".to_string()));
    assert!(writes.contains(&"right:dir:Forward".to_string()));
    assert!(writes.contains(&"left:duty:100".to_string()));
    assert_eq!(last_two(&motors), vec!["left:duty:0", "right:duty:0"]);
    assert_eq!(*said.lock().unwrap(), vec!["Ok, vado avanti"]);
    assert_eq!(rig.drive.motor_states().0.direction, Direction::Stopped);
}

#[test]
fn turn_left_spins_wheels_in_opposite_directions() {
    let mut rig = Rig::new(&[Some("gira a sinistra")]);
    let motors = rig.motors.clone();

    assert_eq!(rig.command_loop().step(), Command::Left);

    let writes = motors.lock().unwrap().clone();
    assert!(writes.contains(&"left:dir:Backward".to_string()));
    assert!(writes.contains(&"right:dir:Forward".to_string()));
}

#[test]
fn muted_robot_ignores_motion() {
    let mut rig = Rig::new(&[Some("stai zitto"), Some("vai avanti")]);
    let motors = rig.motors.clone();
    let said = rig.speaker.said.clone();
    let mut command_loop = rig.command_loop();

    assert_eq!(command_loop.step(), Command::Mute);
    assert!(command_loop.is_muted());

    assert_eq!(command_loop.step(), Command::Forward);
    assert!(command_loop.is_muted());

    assert!(motors.lock().unwrap().is_empty());
    assert!(said.lock().unwrap().is_empty());
}

#[test]
fn apertura_without_mute_changes_nothing() {
    let mut rig = Rig::new(&[None, Some("apertura")]);
    let said = rig.speaker.said.clone();
    let mut command_loop = rig.command_loop();

    command_loop.step();
    assert_eq!(command_loop.step(), Command::Unmute);

    assert!(!command_loop.is_muted());
    assert_eq!(command_loop.failure_count(), 1);
    assert!(said.lock().unwrap().is_empty());
}

#[test]
fn apertura_unmutes_and_greets_immediately() {
    let mut rig = Rig::new(&[Some("zitto"), Some("apertura"), Some("indietro")]);
    let motors = rig.motors.clone();
    let said = rig.speaker.said.clone();
    let mut command_loop = rig.command_loop();

    command_loop.step();
    assert!(command_loop.is_muted());

    assert_eq!(command_loop.step(), Command::Unmute);
    assert!(!command_loop.is_muted());
    assert_eq!(*said.lock().unwrap(), vec!["Eccomi"]);

    assert_eq!(command_loop.step(), Command::Backward);
    assert!(motors.lock().unwrap().contains(&"left:dir:Backward".to_string()));
}

#[test]
fn unknown_phrase_asks_to_repeat() {
    let mut rig = Rig::new(&[Some("buongiorno robot")]);
    let said = rig.speaker.said.clone();
    let mut command_loop = rig.command_loop();

    assert_eq!(command_loop.step(), Command::Unknown);
    assert_eq!(command_loop.failure_count(), 1);
    assert_eq!(*said.lock().unwrap(), vec!["Non ho capito, ripeti"]);
}

#[test]
fn cancellation_ends_loop_with_motors_stopped() {
    let mut rig = Rig::new(&[]);
    let motors = rig.motors.clone();
    let cancel = rig.cancel.clone();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });

    let token = rig.cancel.clone();
    rig.command_loop().run(&token);
    canceller.join().unwrap();

    assert!(token.is_cancelled());
    assert_eq!(last_two(&motors), vec!["left:duty:0", "right:duty:0"]);
}

#[test]
fn motion_after_cancellation_does_not_energize_motors() {
    let mut rig = Rig::new(&[Some("avanti")]);
    let motors = rig.motors.clone();
    rig.cancel.cancel();

    rig.command_loop().step();

    let writes = motors.lock().unwrap().clone();
    assert!(!writes.iter().any(|w| w.contains(":dir:")));
    assert!(writes.iter().all(|w| w.ends_with(":duty:0")));
}

/// Когда взведён, ждёт внутри `probe()` остановки моторов (не дольше 2 с)
/// и отмечает в общем журнале момент, когда отпустил поток монитора.
struct GatedProbe {
    armed: AtomicBool,
    journal: Journal,
}

impl Probe for GatedProbe {
    fn probe(&self) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }

        self.journal.lock().unwrap().push("monitor:probing".to_string());
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if self.journal.lock().unwrap().iter().any(|w| w == "right:duty:0") {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        self.journal.lock().unwrap().push("monitor:released".to_string());
        false
    }
}

fn position(journal: &Journal, entry: &str) -> Option<usize> {
    journal.lock().unwrap().iter().position(|w| w == entry)
}

#[test]
fn robot_shutdown_stops_motors_then_monitor() {
    let rig = Rig::new(&[]);
    let motors = rig.motors.clone();
    let probe = Arc::new(GatedProbe {
        armed: AtomicBool::new(false),
        journal: motors.clone(),
    });

    let parts = RobotParts {
        drive: rig.drive,
        monitor: ConnectivityMonitor::new(probe.clone(), Duration::from_millis(1)),
        recognizer: rig.recognizer,
        capture: Box::new(rig.microphone),
        speaker: Box::new(SilentSpeaker),
    };
    let mut robot = Robot::start(parts, quick_settings(), rig.cancel).unwrap();
    assert!(robot.monitor().is_running());
    assert!(!robot.monitor().is_connected());

    motors.lock().unwrap().clear();
    probe.armed.store(true, Ordering::SeqCst);
    let deadline = Instant::now() + Duration::from_secs(2);
    while position(&motors, "monitor:probing").is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(position(&motors, "monitor:probing").is_some());

    robot.shutdown();
    assert!(!robot.monitor().is_running());

    let left = position(&motors, "left:duty:0").unwrap();
    let right = position(&motors, "right:duty:0").unwrap();
    let released = position(&motors, "monitor:released").unwrap();
    assert!(left < released && right < released, "{:?}", motors.lock().unwrap());

    let (left_state, right_state) = robot.drive().motor_states();
    assert_eq!(left_state.direction, Direction::Stopped);
    assert_eq!(right_state.speed, 0);

    let writes = motors.lock().unwrap().len();
    robot.shutdown();
    assert_eq!(motors.lock().unwrap().len(), writes);
}
