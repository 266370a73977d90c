// robot/src/motors/mod.rs - Драйвер одного мотора

pub mod drive;
pub mod output;

pub use drive::{DriveController, DriveTimings, Move};
pub use output::{HalMotorOutput, LoggingMotorOutput};

use log::{debug, error};

use crate::error::{HardwareFault, MotorError};

/// Направление вращения мотора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Stopped,
    Forward,
    Backward,
}

/// Снимок состояния мотора. `speed` не имеет смысла при `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorState {
    pub direction: Direction,
    pub speed: u8,
}

/// Выход на железо: скважность ШИМ и пины направления.
///
/// Реализация уже привязана к своему пину, поэтому пин здесь не передаётся.
pub trait MotorOutput: Send {
    /// Номер ШИМ пина (для логов и ошибок)
    fn pin(&self) -> u8;

    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), HardwareFault>;

    fn set_direction(&mut self, _direction: Direction) -> Result<(), HardwareFault> {
        Ok(())
    }
}

pub const MAX_SPEED: i32 = 100;

/// Один физический мотор: направление, скорость и остановка
pub struct MotorDriver {
    name: &'static str,
    output: Box<dyn MotorOutput>,
    state: MotorState,
}

impl MotorDriver {
    pub fn new(name: &'static str, output: Box<dyn MotorOutput>) -> Self {
        Self {
            name,
            output,
            state: MotorState::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    /// `Stopped` равносилен `stop()`
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), MotorError> {
        if direction == Direction::Stopped {
            self.stop();
            return Ok(());
        }

        debug!("{} motor direction -> {:?}", self.name, direction);
        self.output.set_direction(direction)?;
        self.state.direction = direction;
        Ok(())
    }

    /// Скорость в процентах. ШИМ пишется, только если мотор не стоит.
    pub fn set_speed(&mut self, percent: i32) -> Result<(), MotorError> {
        if !(0..=MAX_SPEED).contains(&percent) {
            return Err(MotorError::InvalidSpeed(percent));
        }
        let percent = percent as u8;

        if self.state.direction != Direction::Stopped {
            debug!("{} motor speed -> {}%", self.name, percent);
            self.output.set_duty_cycle(percent)?;
        }
        self.state.speed = percent;
        Ok(())
    }

    /// Всегда пишет скважность 0, даже если мотор уже стоит.
    /// Ошибка записи только логируется: мотор считается остановленным.
    pub fn stop(&mut self) {
        if let Err(e) = self.output.set_duty_cycle(0) {
            error!("Failed to de-energize {} motor: {}", self.name, e);
        }
        self.state = MotorState::default();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Запись одного обращения к железу
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Write {
        Duty(u8, u8),
        Direction(u8, Direction),
    }

    /// Фейковый выход, складывающий все записи в общий журнал
    pub struct RecordingOutput {
        pub pin: u8,
        pub writes: Arc<Mutex<Vec<Write>>>,
        pub fail_duty: bool,
    }

    impl RecordingOutput {
        pub fn new(pin: u8, writes: Arc<Mutex<Vec<Write>>>) -> Self {
            Self { pin, writes, fail_duty: false }
        }
    }

    impl MotorOutput for RecordingOutput {
        fn pin(&self) -> u8 {
            self.pin
        }

        fn set_duty_cycle(&mut self, percent: u8) -> Result<(), HardwareFault> {
            if self.fail_duty {
                return Err(HardwareFault::Pwm { pin: self.pin, reason: "stuck".to_string() });
            }
            self.writes.lock().unwrap().push(Write::Duty(self.pin, percent));
            Ok(())
        }

        fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareFault> {
            self.writes.lock().unwrap().push(Write::Direction(self.pin, direction));
            Ok(())
        }
    }
}
