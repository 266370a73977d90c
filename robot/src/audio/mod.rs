// robot/src/audio/mod.rs - Захват аудио с микрофона

#[cfg(feature = "pv-recorder")]
pub mod recorder;

use std::time::Duration;

use crate::error::CaptureError;

pub const SAMPLE_RATE: u32 = 16000;

/// Моно PCM 16 бит
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// LINEAR16 little-endian, как ждут облачные движки
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Микрофон
pub trait AudioCapture {
    /// Записывает фразу не длиннее `max_duration`.
    /// Тишина в течение всего окна возвращается как `CaptureError::Timeout`.
    fn capture_sample(&mut self, max_duration: Duration) -> Result<AudioBuffer, CaptureError>;

    /// Подстройка под фоновый шум. Возвращает порог энергии.
    fn calibrate(&mut self) -> Result<f32, CaptureError> {
        Ok(0.0)
    }
}

/// Среднеквадратичная энергия кадра
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0, 0, 0]), 0.0);
        assert_eq!(rms(&[100, -100, 100, -100]), 100.0);
    }

    #[test]
    fn test_buffer_duration_and_bytes() {
        let buffer = AudioBuffer::new(vec![1, -2], SAMPLE_RATE);
        assert_eq!(buffer.duration(), Duration::from_secs_f64(2.0 / 16000.0));
        assert_eq!(buffer.to_le_bytes(), vec![0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(AudioBuffer::default().duration(), Duration::ZERO);
    }
}
