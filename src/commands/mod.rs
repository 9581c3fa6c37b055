pub mod cli;
pub mod describe;
pub mod measure;
pub mod plan;

use crate::config::Config;
use crate::error::SamplerError;
use crate::sampler::{EnergyBackend, EnergySampler, Sampler, SamplerKind, TimeSampler};
use log::{error, warn};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} failed ({status})")]
    Exit {
        program: String,
        status: String,
        exit_code: Option<i32>,
    },
    #[error("No command given")]
    Empty,
}

/// Spawns `argv` to completion once. Stdout is discarded; stderr is
/// logged when the program fails.
pub fn exec_once(argv: &[String]) -> Result<(), CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        if !stderr.trim().is_empty() {
            warn!("[{}] Exec stderr (warnings):\n{}", program, stderr.trim());
        }
        return Ok(());
    }

    if !stderr.trim().is_empty() {
        error!("[{}] Exec stderr:\n{}", program, stderr.trim());
    }
    Err(CommandError::Exit {
        program: program.clone(),
        status: output.status.to_string(),
        exit_code: output.status.code(),
    })
}

/// A sampler chosen at runtime. Each arm is driven through the generic
/// session code with its own sample type.
pub enum SamplerChoice {
    Energy(EnergySampler),
    Time(TimeSampler),
}

impl SamplerChoice {
    pub fn open(
        kind: SamplerKind,
        backend: EnergyBackend,
        config: &Config,
    ) -> Result<Self, SamplerError> {
        Ok(match kind {
            SamplerKind::Energy => {
                Self::Energy(EnergySampler::new(backend, &config.powercap_root)?)
            }
            SamplerKind::Time => Self::Time(TimeSampler::new()),
        })
    }

    pub fn kind(&self) -> SamplerKind {
        match self {
            Self::Energy(sampler) => sampler.kind(),
            Self::Time(sampler) => sampler.kind(),
        }
    }
}
