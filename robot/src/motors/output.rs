// robot/src/motors/output.rs - Реализации выхода на железо

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::info;

use super::{Direction, MotorOutput};
use crate::error::HardwareFault;

/// Мотор за H-мостом (TB6612 и подобные): ШИМ канал скорости и пин направления
pub struct HalMotorOutput<P, D> {
    pwm: P,
    pwm_pin: u8,
    direction: D,
    direction_pin: u8,
}

impl<P, D> HalMotorOutput<P, D>
where
    P: SetDutyCycle + Send,
    D: OutputPin + Send,
{
    pub fn new(pwm: P, pwm_pin: u8, direction: D, direction_pin: u8) -> Self {
        Self { pwm, pwm_pin, direction, direction_pin }
    }
}

impl<P, D> MotorOutput for HalMotorOutput<P, D>
where
    P: SetDutyCycle + Send,
    D: OutputPin + Send,
{
    fn pin(&self) -> u8 {
        self.pwm_pin
    }

    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), HardwareFault> {
        self.pwm
            .set_duty_cycle_percent(percent)
            .map_err(|e| HardwareFault::Pwm {
                pin: self.pwm_pin,
                reason: format!("{:?}", e),
            })
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareFault> {
        let result = match direction {
            Direction::Forward => self.direction.set_high(),
            Direction::Backward => self.direction.set_low(),
            // Остановка делается через ШИМ, пин направления не трогаем
            Direction::Stopped => Ok(()),
        };

        result.map_err(|e| HardwareFault::Direction {
            pin: self.direction_pin,
            reason: format!("{:?}", e),
        })
    }
}

/// Режим отладки: вместо железа всё пишется в лог
pub struct LoggingMotorOutput {
    name: &'static str,
    pin: u8,
}

impl LoggingMotorOutput {
    pub fn new(name: &'static str, pin: u8) -> Self {
        Self { name, pin }
    }
}

impl MotorOutput for LoggingMotorOutput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_duty_cycle(&mut self, percent: u8) -> Result<(), HardwareFault> {
        info!("[dry-run] {} motor pin {} duty {}%", self.name, self.pin, percent);
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareFault> {
        info!("[dry-run] {} motor direction {:?}", self.name, direction);
        Ok(())
    }
}
