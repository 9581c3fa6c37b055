use super::{Sample, Sampler, SamplerKind};
use crate::error::SamplerError;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall time in seconds
    pub execution_time_s: f64,
}

impl Sample for TimeSample {
    const COLUMNS: &'static [&'static str] = &["execution_time (s)"];

    fn values(&self) -> Vec<String> {
        vec![self.execution_time_s.to_string()]
    }
}

/// Wall-clock sampler backed by the monotonic clock.
#[derive(Debug, Default)]
pub struct TimeSampler {
    started: Option<Instant>,
}

impl TimeSampler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sampler for TimeSampler {
    type Sample = TimeSample;

    fn kind(&self) -> SamplerKind {
        SamplerKind::Time
    }

    fn begin(&mut self, _label: &str) -> Result<(), SamplerError> {
        if self.started.is_some() {
            return Err(SamplerError::SpanState("begin called on an open span"));
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    fn end(&mut self) -> Result<TimeSample, SamplerError> {
        let started = self
            .started
            .take()
            .ok_or(SamplerError::SpanState("end called without begin"))?;
        Ok(TimeSample {
            execution_time_s: started.elapsed().as_secs_f64(),
        })
    }

    fn abort(&mut self) {
        self.started = None;
    }
}
