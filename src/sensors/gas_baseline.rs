//! Gas resistance reference taken at startup.

use super::{ClimateSensor, SensorError};
use log::{info, warn};

/// Average gas resistance measured when the dashboard starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasBaseline {
    reference: f64,
}

impl GasBaseline {
    /// Number of samples averaged by default.
    pub const DEFAULT_SAMPLES: usize = 10;

    /// Average `samples` gas readings. Failed reads are skipped, but at least
    /// one read has to succeed.
    pub fn calibrate<S: ClimateSensor + ?Sized>(
        sensor: &mut S,
        samples: usize,
    ) -> Result<Self, SensorError> {
        if samples == 0 {
            return Err(SensorError::NoSamples("gas"));
        }

        let mut total = 0.0;
        let mut taken = 0usize;
        let mut last_error = None;
        for _ in 0..samples {
            match sensor.read_climate() {
                Ok(reading) if reading.gas.is_finite() => {
                    total += reading.gas;
                    taken += 1;
                }
                Ok(reading) => warn!("[Sensors] Ignoring gas sample {}", reading.gas),
                Err(e) => {
                    warn!("[Sensors] Gas calibration sample failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if taken == 0 {
            return Err(last_error
                .unwrap_or_else(|| SensorError::read_failed("gas", "no finite samples")));
        }

        let reference = total / taken as f64;
        info!(
            "[Sensors] Gas baseline {:.0} ohm from {} samples",
            reference, taken
        );
        Ok(Self { reference })
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Gas resistance as a percentage of the baseline.
    pub fn relative(&self, gas: f64) -> f64 {
        if self.reference == 0.0 {
            return 0.0;
        }
        gas / self.reference * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ClimateReading;

    struct Scripted(Vec<Result<f64, SensorError>>);

    impl ClimateSensor for Scripted {
        fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
            self.0.remove(0).map(|gas| ClimateReading {
                gas,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_average_of_samples() {
        let mut sensor = Scripted(vec![Ok(100.0), Ok(200.0), Ok(300.0)]);
        let baseline = GasBaseline::calibrate(&mut sensor, 3).unwrap();
        assert_eq!(baseline.reference(), 200.0);
        assert_eq!(baseline.relative(100.0), 50.0);
    }

    #[test]
    fn test_failed_samples_are_skipped() {
        let mut sensor = Scripted(vec![
            Ok(100.0),
            Err(SensorError::read_failed("bme680", "nack")),
            Ok(f64::NAN),
            Ok(300.0),
        ]);
        let baseline = GasBaseline::calibrate(&mut sensor, 4).unwrap();
        assert_eq!(baseline.reference(), 200.0);
    }

    #[test]
    fn test_zero_samples_is_an_error() {
        let mut sensor = Scripted(vec![]);
        assert!(matches!(
            GasBaseline::calibrate(&mut sensor, 0),
            Err(SensorError::NoSamples("gas"))
        ));
    }

    #[test]
    fn test_all_samples_failing_returns_last_error() {
        let mut sensor = Scripted(vec![Err(SensorError::read_failed("bme680", "nack"))]);
        let err = GasBaseline::calibrate(&mut sensor, 1).unwrap_err();
        assert_eq!(err.to_string(), "bme680 read failed: nack");
    }
}
