use crate::error::Result;
use crate::sampler::SamplerKind;
use log::info;
use nix::sys::utsname::{uname, UtsName};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

/// One-time snapshot of the host a log file was recorded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    #[serde(rename = "CPU")]
    pub cpu: String,
    #[serde(rename = "RAM_GB")]
    pub ram_gb: f64,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "Architecture")]
    pub architecture: String,
    #[serde(rename = "Test_Result_File")]
    pub test_result_file: String,
}

impl EnvironmentDescriptor {
    pub fn snapshot(result_file: &Path) -> Self {
        let uts = uname().ok();
        let field = |get: fn(&UtsName) -> &OsStr| {
            uts
                .as_ref()
                .map(|u| get(u).to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let os = format!("{} {}", field(UtsName::sysname), field(UtsName::release));
        let mut architecture = field(UtsName::machine);
        if architecture.is_empty() {
            architecture = std::env::consts::ARCH.to_string();
        }

        Self {
            cpu: fs::read_to_string("/proc/cpuinfo")
                .ok()
                .and_then(|text| cpu_model(&text))
                .unwrap_or_else(|| "Unknown".to_string()),
            ram_gb: fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|text| mem_total_bytes(&text))
                .map(round_gb)
                .unwrap_or(0.0),
            os: os.trim().to_string(),
            architecture,
            test_result_file: result_file.to_string_lossy().into_owned(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

fn cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| matches!(key.trim(), "model name" | "Processor" | "cpu model"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn mem_total_bytes(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|line| line.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

fn round_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

/// Writes the descriptor for `kind` into `folder` unless one is already
/// there. Returns whether a file was written.
pub fn ensure_descriptor(folder: &Path, kind: SamplerKind, result_file: &Path) -> Result<bool> {
    fs::create_dir_all(folder)?;
    let path = folder.join(kind.descriptor_file());
    if path.exists() {
        return Ok(false);
    }

    let body = EnvironmentDescriptor::snapshot(result_file).to_json()?;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    file.write_all(&body)?;
    file.sync_data()?;
    info!("Environment descriptor written to {}", path.display());
    Ok(true)
}
