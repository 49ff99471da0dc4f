//! Motion Filter
//!
//! Turns raw gyroscope rates into relative pointer deltas for air-mouse control.
//! The first samples calibrate out the resting bias; every later sample is
//! bias-corrected, dead-zoned, integrated over the elapsed time and clamped.

use crate::domain::models::{AngularSample, PointerDelta};
use crate::domain::settings::MotionSettings;

/// Samples averaged into the resting offset before tracking starts
pub const CALIBRATION_SAMPLES: u32 = 100;

/// Converts integrated rotation (rad) into report counts before sensitivity
const COUNTS_PER_RADIAN: f32 = 500.0;

const MAX_COUNTS: f32 = 127.0;

pub struct MotionFilter {
    settings: MotionSettings,

    // Gyro drift compensation; sums while calibrating, mean afterwards
    offset: [f32; 3],
    calibrated: bool,
    samples_seen: u32,

    last_timestamp: Option<i64>,
}

impl MotionFilter {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            offset: [0.0; 3],
            calibrated: false,
            samples_seen: 0,
            last_timestamp: None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Resting bias, only meaningful once calibrated.
    #[cfg(test)]
    pub fn offset(&self) -> Option<[f32; 3]> {
        self.calibrated.then_some(self.offset)
    }

    /// Feed one sample; returns a delta only when the pointer should move.
    pub fn observe(&mut self, sample: &AngularSample) -> Option<PointerDelta> {
        if !self.calibrated {
            self.accumulate(sample);
            return None;
        }

        // A step too large for i64 is treated like a backwards one
        let dt = match self.last_timestamp {
            Some(last) => sample
                .timestamp_nanos
                .checked_sub(last)
                .map_or(0.0, |nanos| nanos as f32 / 1_000_000_000.0),
            None => 0.0,
        };
        self.last_timestamp = Some(sample.timestamp_nanos);
        if dt <= 0.0 {
            return None;
        }

        // Axis 0 drives vertical movement, axis 2 horizontal; axis 1 is unused
        let gyro_x = sample.values[0] - self.offset[0];
        let gyro_z = sample.values[2] - self.offset[2];

        let dx = self.integrate(gyro_z, dt);
        let dy = self.integrate(gyro_x, dt);

        tracing::trace!(
            "dx: {}, dy: {} | gyro_z: {:.4}, gyro_x: {:.4}",
            dx,
            dy,
            gyro_z,
            gyro_x
        );

        if dx == 0 && dy == 0 {
            return None;
        }
        Some(PointerDelta::new(dx, dy))
    }

    fn accumulate(&mut self, sample: &AngularSample) {
        for (sum, value) in self.offset.iter_mut().zip(sample.values) {
            *sum += value;
        }
        self.samples_seen += 1;

        if self.samples_seen >= CALIBRATION_SAMPLES {
            self.finish_calibration();
        }
    }

    fn finish_calibration(&mut self) {
        for sum in self.offset.iter_mut() {
            *sum /= CALIBRATION_SAMPLES as f32;
        }
        self.calibrated = true;

        tracing::info!(
            "Gyro calibration complete. Offsets: ({:.4}, {:.4}, {:.4})",
            self.offset[0],
            self.offset[1],
            self.offset[2]
        );
    }

    fn integrate(&self, rate: f32, dt: f32) -> i8 {
        if rate.abs() <= self.settings.dead_zone {
            return 0;
        }
        let counts = rate * dt * COUNTS_PER_RADIAN * self.settings.sensitivity;
        // Saturating float-to-int cast; NaN maps to 0
        counts.clamp(-MAX_COUNTS, MAX_COUNTS).round() as i8
    }
}
