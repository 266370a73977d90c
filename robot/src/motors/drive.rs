// robot/src/motors/drive.rs - Управление движением на двух моторах

use std::time::{Duration, Instant};

use log::{info, warn};

use super::{Direction, MotorDriver, MotorState};
use crate::cancel::CancellationToken;
use crate::error::MotorError;

/// Манёвр робота
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl Move {
    /// Направления (левый, правый). Повороты делаются на месте.
    pub fn directions(self) -> (Direction, Direction) {
        match self {
            Move::Forward => (Direction::Forward, Direction::Forward),
            Move::Backward => (Direction::Backward, Direction::Backward),
            Move::TurnLeft => (Direction::Backward, Direction::Forward),
            Move::TurnRight => (Direction::Forward, Direction::Backward),
        }
    }
}

/// Длительности манёвров и скорость по умолчанию
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTimings {
    pub forward: Duration,
    pub backward: Duration,
    pub turn: Duration,
    pub speed: i32,
}

pub const DEFAULT_FORWARD: Duration = Duration::from_millis(3000);
pub const DEFAULT_BACKWARD: Duration = Duration::from_millis(1500);
pub const DEFAULT_TURN: Duration = Duration::from_millis(800);
pub const DEFAULT_SPEED: i32 = 100;

impl Default for DriveTimings {
    fn default() -> Self {
        Self {
            forward: DEFAULT_FORWARD,
            backward: DEFAULT_BACKWARD,
            turn: DEFAULT_TURN,
            speed: DEFAULT_SPEED,
        }
    }
}

impl DriveTimings {
    pub fn duration_for(&self, mv: Move) -> Duration {
        match mv {
            Move::Forward => self.forward,
            Move::Backward => self.backward,
            Move::TurnLeft | Move::TurnRight => self.turn,
        }
    }
}

/// Глушит оба мотора при выходе из области видимости, в том числе по `?` и панике
struct StopOnDrop<'a> {
    left: &'a mut MotorDriver,
    right: &'a mut MotorDriver,
}

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.left.stop();
        self.right.stop();
    }
}

/// Владеет левым и правым мотором
pub struct DriveController {
    left: MotorDriver,
    right: MotorDriver,
    timings: DriveTimings,
    cancel: CancellationToken,
}

impl DriveController {
    pub fn new(
        left: MotorDriver,
        right: MotorDriver,
        timings: DriveTimings,
        cancel: CancellationToken,
    ) -> Self {
        Self { left, right, timings, cancel }
    }

    pub fn timings(&self) -> &DriveTimings {
        &self.timings
    }

    pub fn motor_states(&self) -> (MotorState, MotorState) {
        (self.left.state(), self.right.state())
    }

    pub fn forward(&mut self, duration: Duration, speed: i32) -> Result<(), MotorError> {
        self.run(Move::Forward, duration, speed)
    }

    pub fn backward(&mut self, duration: Duration, speed: i32) -> Result<(), MotorError> {
        self.run(Move::Backward, duration, speed)
    }

    pub fn turn_left(&mut self, duration: Duration, speed: i32) -> Result<(), MotorError> {
        self.run(Move::TurnLeft, duration, speed)
    }

    pub fn turn_right(&mut self, duration: Duration, speed: i32) -> Result<(), MotorError> {
        self.run(Move::TurnRight, duration, speed)
    }

    /// Манёвр с настроенными длительностью и скоростью
    pub fn perform(&mut self, mv: Move) -> Result<(), MotorError> {
        let duration = self.timings.duration_for(mv);
        let speed = self.timings.speed;
        self.run(mv, duration, speed)
    }

    pub fn stop(&mut self) {
        self.left.stop();
        self.right.stop();
    }

    /// Блокирует вызывающий поток на `duration`, затем всегда глушит оба мотора.
    /// Отмена токена прерывает ожидание досрочно.
    fn run(&mut self, mv: Move, duration: Duration, speed: i32) -> Result<(), MotorError> {
        if self.cancel.is_cancelled() {
            warn!("Shutdown in progress, skipping {:?}", mv);
            self.stop();
            return Ok(());
        }

        let (left_dir, right_dir) = mv.directions();
        info!("Moving {:?} for {:.1}s at {}%", mv, duration.as_secs_f32(), speed);

        let motors = StopOnDrop {
            left: &mut self.left,
            right: &mut self.right,
        };

        motors.left.set_direction(left_dir)?;
        motors.right.set_direction(right_dir)?;
        motors.left.set_speed(speed)?;
        motors.right.set_speed(speed)?;

        let started = Instant::now();
        if self.cancel.wait_timeout(duration) {
            warn!("{:?} interrupted after {:.2}s", mv, started.elapsed().as_secs_f32());
        }

        drop(motors);
        Ok(())
    }
}
