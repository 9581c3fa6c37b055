use super::{exec_once, SamplerChoice};
use crate::config::Config;
use crate::error::Result;
use crate::sampler::{EnergyBackend, SamplerKind};
use crate::session::MeasurementSession;
use clap::Args;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Metric sampled around each run
    #[arg(long, value_enum, default_value_t = SamplerKind::Time)]
    pub sampler: SamplerKind,
    /// Energy counter source, used with `--sampler energy`
    #[arg(long, value_enum, default_value_t = EnergyBackend::Perf)]
    pub energy_backend: EnergyBackend,
    /// Number of measured runs
    #[arg(short = 'n', long, default_value_t = 1)]
    pub iterations: u32,
    /// Operation name recorded in each row [default: program file name]
    #[arg(long)]
    pub name: Option<String>,
    /// Base name of the CSV log [default: operation name]
    #[arg(short, long)]
    pub output_name: Option<String>,
    /// Output folder [default: energy_benchmark or time_benchmark]
    #[arg(long)]
    pub folder: Option<PathBuf>,
    /// Seconds to sleep between runs
    #[arg(short, long, default_value_t = 0)]
    pub sleep: u64,
    /// Program and arguments to measure
    #[arg(required = true, num_args = 1.., last = true)]
    pub command: Vec<String>,
}

impl MeasureArgs {
    pub fn folder(&self, config: &Config) -> PathBuf {
        self.folder
            .clone()
            .unwrap_or_else(|| config.folder_for(self.sampler).to_path_buf())
    }

    pub fn operation_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| program_name(&self.command))
    }

    fn session(&self, config: &Config) -> Result<MeasurementSession> {
        let name = self.operation_name();
        let output = self.output_name.clone().unwrap_or_else(|| name.clone());
        Ok(
            MeasurementSession::new(name, self.iterations, output, self.folder(config))?
                .with_cooldown(Duration::from_secs(self.sleep)),
        )
    }
}

pub(crate) fn program_name(command: &[String]) -> String {
    command
        .first()
        .and_then(|program| Path::new(program).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "command".to_string())
}

pub fn run(args: MeasureArgs, config: &Config) -> Result<()> {
    let session = args.session(config)?;
    let sampler = SamplerChoice::open(args.sampler, args.energy_backend, config)?;
    let operation = || exec_once(&args.command);

    match sampler {
        SamplerChoice::Energy(sampler) => session.run(sampler, operation)?,
        SamplerChoice::Time(sampler) => session.run(sampler, operation)?,
    }

    info!("Measurements saved to: {}", session.log_path().display());
    Ok(())
}
