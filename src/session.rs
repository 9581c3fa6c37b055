use crate::descriptor::ensure_descriptor;
use crate::error::{HarnessError, Result};
use crate::log_sink::{self, RunRecord};
use crate::sampler::Sampler;
use chrono::Local;
use log::info;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A series of runs of one operation, logged to `folder/output_name.csv`.
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    operation_name: String,
    repetitions: NonZeroU32,
    output_name: String,
    folder: PathBuf,
    cooldown: Duration,
}

impl MeasurementSession {
    pub fn new(
        operation_name: impl Into<String>,
        repetitions: u32,
        output_name: impl Into<String>,
        folder: impl Into<PathBuf>,
    ) -> Result<Self> {
        let repetitions = NonZeroU32::new(repetitions).ok_or(HarnessError::InvalidRepetitions)?;
        Ok(Self {
            operation_name: operation_name.into(),
            repetitions,
            output_name: output_name.into(),
            folder: folder.into(),
            cooldown: Duration::ZERO,
        })
    }

    /// Time to sleep between consecutive runs, outside any sampling span.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions.get()
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn log_path(&self) -> PathBuf {
        log_sink::log_path(&self.folder, &self.output_name)
    }

    /// Runs `operation` once per repetition inside a sampling span and
    /// appends one record per run. Returns the last run's value.
    ///
    /// The first failing run, whether from the operation, the sampler or
    /// the log, aborts the session. Records of earlier runs stay on disk.
    pub fn run<S, F, T, E>(&self, mut sampler: S, mut operation: F) -> Result<T>
    where
        S: Sampler,
        F: FnMut() -> std::result::Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let log_path = self.log_path();
        ensure_descriptor(&self.folder, sampler.kind(), &log_path)?;
        info!(
            "[{}] Measuring {} runs with {} sampler into {}",
            self.operation_name,
            self.repetitions,
            sampler.kind(),
            log_path.display()
        );

        let mut last = None;
        for run in 1..=self.repetitions.get() {
            if run > 1 && !self.cooldown.is_zero() {
                std::thread::sleep(self.cooldown);
            }

            let label = format!("{}_run_{}", self.operation_name, run);
            sampler.begin(&label)?;
            let timestamp = Local::now();
            let value = match operation() {
                Ok(value) => value,
                Err(err) => {
                    sampler.abort();
                    return Err(HarnessError::Operation {
                        run,
                        source: err.into(),
                    });
                }
            };
            let sample = sampler.end()?;

            let record = RunRecord {
                timestamp,
                operation: self.operation_name.clone(),
                run,
                sample,
            };
            log_sink::append(&self.folder, &self.output_name, &record)?;
            last = Some(value);
        }

        info!("[{}] Completed {} runs", self.operation_name, self.repetitions);
        // The loop body ran at least once.
        last.ok_or(HarnessError::InvalidRepetitions)
    }
}

/// Runs `operation` `repetitions` times under `sampler`, logging to
/// `folder/output_name.csv`. The operation is named after `output_name`.
pub fn run_session<S, F, T, E>(
    operation: F,
    repetitions: u32,
    output_name: &str,
    sampler: S,
    folder: &Path,
) -> Result<T>
where
    S: Sampler,
    F: FnMut() -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    MeasurementSession::new(output_name, repetitions, output_name, folder)?.run(sampler, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::TimeSampler;
    use tempfile::TempDir;

    #[test]
    fn zero_repetitions_rejected() {
        let err = MeasurementSession::new("op", 0, "op", "out").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidRepetitions));
    }

    #[test]
    fn returns_last_value() {
        let tmp = TempDir::new().unwrap();
        let mut calls = 0;
        let value = run_session(
            || {
                calls += 1;
                Ok::<_, std::io::Error>(calls * 10)
            },
            4,
            "count",
            TimeSampler::new(),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(value, 40);
        assert_eq!(calls, 4);
    }

    #[test]
    fn cooldown_runs_between_iterations() {
        let tmp = TempDir::new().unwrap();
        let session = MeasurementSession::new("nap", 3, "nap", tmp.path())
            .unwrap()
            .with_cooldown(Duration::from_millis(15));
        let started = std::time::Instant::now();
        session
            .run(TimeSampler::new(), || Ok::<_, std::io::Error>(()))
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
