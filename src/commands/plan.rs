use super::{exec_once, SamplerChoice};
use crate::config::Config;
use crate::error::{HarnessError, Result};
use crate::sampler::{EnergyBackend, Sampler, SamplerKind};
use crate::session::MeasurementSession;
use clap::Args;
use log::{error, info};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML plan listing the benchmarks to measure
    pub plan: PathBuf,
    /// Output folder, overriding the plan's
    #[arg(long)]
    pub folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Benchmark {
    pub name: String,
    pub command: Vec<String>,
    pub repetitions: u32,
    /// Log base name, defaults to `name`
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub sampler: SamplerKind,
    #[serde(default)]
    pub energy_backend: EnergyBackend,
    pub folder: Option<PathBuf>,
    /// Seconds between runs
    #[serde(default)]
    pub cooldown: u64,
    pub benchmarks: Vec<Benchmark>,
}

impl TryFrom<&Path> for Plan {
    type Error = HarnessError;

    fn try_from(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_yml::from_reader(reader)?)
    }
}

impl Plan {
    pub fn folder(&self, config: &Config) -> PathBuf {
        self.folder
            .clone()
            .unwrap_or_else(|| config.folder_for(self.sampler).to_path_buf())
    }

    fn sessions(&self, folder: &Path) -> Vec<(&Benchmark, Result<MeasurementSession>)> {
        self.benchmarks
            .iter()
            .map(|bench| {
                let output = bench.output.clone().unwrap_or_else(|| bench.name.clone());
                let session = MeasurementSession::new(&bench.name, bench.repetitions, output, folder)
                    .map(|session| session.with_cooldown(Duration::from_secs(self.cooldown)));
                (bench, session)
            })
            .collect()
    }

    /// Runs every benchmark with one sampler. Returns how many failed.
    fn run_with<S: Sampler>(&self, mut sampler: S, folder: &Path) -> usize {
        let mut failed = 0;
        for (bench, session) in self.sessions(folder) {
            let result = session.and_then(|session| {
                session.run(&mut sampler, || exec_once(&bench.command))?;
                Ok(session)
            });
            match result {
                Ok(session) => info!(
                    "[{}] Measured {} runs into {}",
                    session.operation_name(),
                    session.repetitions(),
                    session.folder().display()
                ),
                Err(err) => {
                    error!("[{}] {}", bench.name, err);
                    failed += 1;
                }
            }
        }
        failed
    }
}

impl PlanArgs {
    /// Reads the plan file and resolves the folder it writes to.
    pub fn load(&self, config: &Config) -> Result<(Plan, PathBuf)> {
        let plan = Plan::try_from(self.plan.as_path())?;
        let folder = self.folder.clone().unwrap_or_else(|| plan.folder(config));
        Ok((plan, folder))
    }
}

/// Runs a loaded plan into `folder`. A failing benchmark does not stop the
/// ones after it; the returned count tells the caller how many failed.
pub fn run(plan: &Plan, folder: &Path, config: &Config) -> Result<usize> {
    let sampler = SamplerChoice::open(plan.sampler, plan.energy_backend, config)?;
    info!(
        "Plan with {} benchmarks ({} sampler) into {}",
        plan.benchmarks.len(),
        sampler.kind(),
        folder.display()
    );

    let failed = match sampler {
        SamplerChoice::Energy(sampler) => plan.run_with(sampler, folder),
        SamplerChoice::Time(sampler) => plan.run_with(sampler, folder),
    };
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::read_log;
    use std::fs;
    use tempfile::TempDir;

    const PLAN: &str = r#"
sampler: time
benchmarks:
  - name: ok
    command: ["true"]
    repetitions: 2
  - name: broken
    command: ["false"]
    repetitions: 2
  - name: zero
    command: ["true"]
    repetitions: 0
  - name: after
    command: ["sh", "-c", "exit 0"]
    repetitions: 1
    output: after_log
"#;

    #[test]
    fn parses_plan() {
        let plan: Plan = serde_yml::from_str(PLAN).unwrap();
        assert_eq!(plan.sampler, SamplerKind::Time);
        assert_eq!(plan.energy_backend, EnergyBackend::Perf);
        assert_eq!(plan.benchmarks.len(), 4);
        assert_eq!(plan.benchmarks[3].output.as_deref(), Some("after_log"));
    }

    #[test]
    fn folder_falls_back_to_plan_then_config() {
        let tmp = TempDir::new().unwrap();
        let plan_path = tmp.path().join("plan.yml");
        let config = Config::default();

        fs::write(&plan_path, PLAN).unwrap();
        let args = PlanArgs {
            plan: plan_path.clone(),
            folder: None,
        };
        let (_, folder) = args.load(&config).unwrap();
        assert_eq!(folder, PathBuf::from("time_benchmark"));

        fs::write(&plan_path, format!("folder: from_plan\n{}", PLAN)).unwrap();
        let (_, folder) = args.load(&config).unwrap();
        assert_eq!(folder, PathBuf::from("from_plan"));
    }

    #[test]
    fn unparsable_plan_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let plan_path = tmp.path().join("plan.yml");
        fs::write(&plan_path, "sampler: [not, a, kind]\n").unwrap();
        let args = PlanArgs {
            plan: plan_path,
            folder: None,
        };
        let err = args.load(&Config::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Plan(_)));
    }

    #[test]
    fn failures_do_not_stop_later_benchmarks() {
        let tmp = TempDir::new().unwrap();
        let plan_path = tmp.path().join("plan.yml");
        fs::write(&plan_path, PLAN).unwrap();
        let out = tmp.path().join("out");

        let args = PlanArgs {
            plan: plan_path,
            folder: Some(out.clone()),
        };
        let config = Config::default();
        let (plan, folder) = args.load(&config).unwrap();
        assert_eq!(folder, out);
        let failed = run(&plan, &folder, &config).unwrap();
        assert_eq!(failed, 2);

        let (_, ok_rows) = read_log(&out.join("ok.csv")).unwrap();
        assert_eq!(ok_rows.len(), 2);
        assert!(!out.join("broken.csv").exists());
        assert!(!out.join("zero.csv").exists());
        let (_, after_rows) = read_log(&out.join("after_log.csv")).unwrap();
        assert_eq!(&after_rows[0][1], "after");
    }
}
