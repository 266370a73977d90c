// robot/src/audio/recorder.rs - Микрофон через PvRecorder

use std::time::Duration;

use log::{debug, info, warn};
use pv_recorder::{Recorder, RecorderBuilder};

use super::{rms, AudioBuffer, AudioCapture, SAMPLE_RATE};
use crate::error::CaptureError;

const FRAME_LENGTH: usize = 512;
const CALIBRATION_TIME: Duration = Duration::from_secs(1);
const MIN_ENERGY_THRESHOLD: f32 = 300.0;
const CALIBRATION_FACTOR: f32 = 1.5;

/// Запись идёт, пока жива сессия: остановка гарантирована на любом выходе
struct RecordingSession<'a> {
    recorder: &'a Recorder,
}

impl<'a> RecordingSession<'a> {
    fn open(recorder: &'a Recorder) -> Result<Self, CaptureError> {
        recorder
            .start()
            .map_err(|e| CaptureError::Device(format!("Failed to start PvRecorder: {:?}", e)))?;
        Ok(Self { recorder })
    }

    fn read_frames(&self, total: Duration) -> Result<Vec<Vec<i16>>, CaptureError> {
        let frame_count = frames_for(total);
        let mut frames = Vec::with_capacity(frame_count);

        for _ in 0..frame_count {
            let mut frame = vec![0i16; FRAME_LENGTH];
            self.recorder
                .read(&mut frame)
                .map_err(|e| CaptureError::Device(format!("PvRecorder read error: {:?}", e)))?;
            frames.push(frame);
        }

        Ok(frames)
    }
}

impl Drop for RecordingSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.recorder.stop() {
            warn!("Failed to stop PvRecorder: {:?}", e);
        }
    }
}

fn frames_for(duration: Duration) -> usize {
    let samples = duration.as_secs_f64() * SAMPLE_RATE as f64;
    ((samples / FRAME_LENGTH as f64).ceil() as usize).max(1)
}

pub struct PvMicrophone {
    recorder: Recorder,
    energy_threshold: f32,
}

impl PvMicrophone {
    /// `device_index` -1 означает устройство по умолчанию
    pub fn new(device_index: i32) -> Result<Self, CaptureError> {
        let recorder = RecorderBuilder::new()
            .device_index(device_index)
            .frame_length(FRAME_LENGTH as i32)
            .init()
            .map_err(|e| CaptureError::Device(format!("PvRecorder init failed: {:?}", e)))?;

        info!("PvRecorder initialized with microphone index: {}", device_index);
        Ok(Self {
            recorder,
            energy_threshold: MIN_ENERGY_THRESHOLD,
        })
    }
}

impl AudioCapture for PvMicrophone {
    fn capture_sample(&mut self, max_duration: Duration) -> Result<AudioBuffer, CaptureError> {
        let frames = RecordingSession::open(&self.recorder)?.read_frames(max_duration)?;

        let loudest = frames.iter().map(|f| rms(f)).fold(0.0f32, f32::max);
        debug!("Captured {} frames, peak energy {:.0}", frames.len(), loudest);

        if loudest < self.energy_threshold {
            return Err(CaptureError::Timeout);
        }

        Ok(AudioBuffer::new(frames.concat(), SAMPLE_RATE))
    }

    fn calibrate(&mut self) -> Result<f32, CaptureError> {
        let frames = RecordingSession::open(&self.recorder)?.read_frames(CALIBRATION_TIME)?;
        let ambient = frames.iter().map(|f| rms(f)).sum::<f32>() / frames.len() as f32;

        self.energy_threshold = (ambient * CALIBRATION_FACTOR).max(MIN_ENERGY_THRESHOLD);
        info!("Calibration completed. Energy threshold set to {:.0}", self.energy_threshold);
        Ok(self.energy_threshold)
    }
}
