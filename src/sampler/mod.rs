pub mod energy;
pub mod powercap;
pub mod rapl;
pub mod time;

pub use energy::{EnergyBackend, EnergySample, EnergySampler};
pub use time::{TimeSample, TimeSampler};

use crate::error::SamplerError;
use clap::ValueEnum;
use serde::Deserialize;
use strum::{Display, EnumString};

/// Which metric a sampler records. Fixes the log columns, the descriptor
/// file name and the default output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, ValueEnum, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    Energy,
    Time,
}

impl SamplerKind {
    pub fn metric_columns(&self) -> &'static [&'static str] {
        match self {
            SamplerKind::Energy => EnergySample::COLUMNS,
            SamplerKind::Time => TimeSample::COLUMNS,
        }
    }

    pub fn descriptor_file(&self) -> &'static str {
        match self {
            SamplerKind::Energy => "system_info_pyrapl.json",
            SamplerKind::Time => "system_info.json",
        }
    }

    pub fn default_folder(&self) -> &'static str {
        match self {
            SamplerKind::Energy => "energy_benchmark",
            SamplerKind::Time => "time_benchmark",
        }
    }
}

/// Metric values produced by one closed span.
pub trait Sample {
    /// Column headers, in the order `values` yields them.
    const COLUMNS: &'static [&'static str];

    /// Plain decimal text for each column.
    fn values(&self) -> Vec<String>;
}

/// Measures a metric over a bounded span of execution.
///
/// A sampler is initialized by its constructor, which is where a missing
/// metric source must be reported. A `begin`/`end` pair can then be
/// repeated any number of times.
pub trait Sampler {
    type Sample: Sample;

    fn kind(&self) -> SamplerKind;

    fn begin(&mut self, label: &str) -> Result<(), SamplerError>;

    fn end(&mut self) -> Result<Self::Sample, SamplerError>;

    /// Drop an open span without reading it.
    fn abort(&mut self) {}
}

impl<S: Sampler + ?Sized> Sampler for &mut S {
    type Sample = S::Sample;

    fn kind(&self) -> SamplerKind {
        (**self).kind()
    }

    fn begin(&mut self, label: &str) -> Result<(), SamplerError> {
        (**self).begin(label)
    }

    fn end(&mut self) -> Result<Self::Sample, SamplerError> {
        (**self).end()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_lowercase() {
        assert_eq!("energy".parse::<SamplerKind>().unwrap(), SamplerKind::Energy);
        assert_eq!(SamplerKind::Time.to_string(), "time");
    }

    #[test]
    fn descriptor_files_differ_per_kind() {
        assert_ne!(
            SamplerKind::Energy.descriptor_file(),
            SamplerKind::Time.descriptor_file()
        );
    }

    #[test]
    fn columns_match_kind() {
        assert_eq!(
            SamplerKind::Energy.metric_columns(),
            &["package (uJ)", "dram (uJ)"]
        );
        assert_eq!(SamplerKind::Time.metric_columns(), &["execution_time (s)"]);
    }
}
