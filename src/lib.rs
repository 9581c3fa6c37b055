pub mod commands;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod log_sink;
pub mod sampler;
pub mod session;

pub use error::{HarnessError, Result, SamplerError};
pub use sampler::{EnergySampler, Sampler, SamplerKind, TimeSampler};
pub use session::{run_session, MeasurementSession};

use std::path::Path;

/// Samples energy for `n` runs of `operation`, logging to
/// `energy_benchmark/<csv_name>.csv`.
pub fn measure_energy_to_csv<F, T, E>(
    sampler: &mut EnergySampler,
    n: u32,
    csv_name: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let folder = Path::new(SamplerKind::Energy.default_folder());
    measure_energy_to_csv_in(folder, sampler, n, csv_name, operation)
}

/// [`measure_energy_to_csv`] logging to `folder/<csv_name>.csv`.
pub fn measure_energy_to_csv_in<F, T, E>(
    folder: &Path,
    sampler: &mut EnergySampler,
    n: u32,
    csv_name: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    run_session(operation, n, csv_name, sampler, folder)
}

/// Times `n` runs of `operation`, logging to `time_benchmark/<csv_name>.csv`.
pub fn measure_time_to_csv<F, T, E>(n: u32, csv_name: &str, operation: F) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let folder = Path::new(SamplerKind::Time.default_folder());
    measure_time_to_csv_in(folder, n, csv_name, operation)
}

pub fn measure_time_to_csv_in<F, T, E>(
    folder: &Path,
    n: u32,
    csv_name: &str,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    run_session(operation, n, csv_name, TimeSampler::new(), folder)
}
