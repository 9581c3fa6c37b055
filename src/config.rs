use crate::sampler::SamplerKind;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub energy_dir: PathBuf,
    pub time_dir: PathBuf,
    pub powercap_root: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            energy_dir: PathBuf::from(SamplerKind::Energy.default_folder()),
            time_dir: PathBuf::from(SamplerKind::Time.default_folder()),
            powercap_root: PathBuf::from("/sys/class/powercap"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `GH_ENERGY_DIR`, `GH_TIME_DIR`,
    /// `GH_POWERCAP_ROOT` and `GH_LOG_LEVEL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var_os(key).filter(|value| !value.is_empty()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<std::ffi::OsString>) -> Self {
        let defaults = Self::default();
        Self {
            energy_dir: lookup("GH_ENERGY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.energy_dir),
            time_dir: lookup("GH_TIME_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.time_dir),
            powercap_root: lookup("GH_POWERCAP_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.powercap_root),
            log_level: lookup("GH_LOG_LEVEL")
                .map(|level| level.to_string_lossy().into_owned())
                .unwrap_or(defaults.log_level),
        }
    }

    pub fn global() -> &'static Config {
        static CONFIG: OnceLock<Config> = OnceLock::new();
        CONFIG.get_or_init(Config::from_env)
    }

    pub fn folder_for(&self, kind: SamplerKind) -> &Path {
        match kind {
            SamplerKind::Energy => &self.energy_dir,
            SamplerKind::Time => &self.time_dir,
        }
    }
}
