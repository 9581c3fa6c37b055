use super::powercap::PowercapCounters;
use super::rapl::RaplCounters;
use super::{Sample, Sampler, SamplerKind};
use crate::error::SamplerError;
use clap::ValueEnum;
use log::info;
use serde::Deserialize;
use std::path::Path;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Package domain energy in microjoules
    pub package_uj: f64,
    /// DRAM domain energy in microjoules, 0 when the domain is absent
    pub dram_uj: f64,
}

impl Sample for EnergySample {
    const COLUMNS: &'static [&'static str] = &["package (uJ)", "dram (uJ)"];

    fn values(&self) -> Vec<String> {
        vec![self.package_uj.to_string(), self.dram_uj.to_string()]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, ValueEnum, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnergyBackend {
    /// perf `power` PMU counters
    #[default]
    Perf,
    /// sysfs powercap zones
    Powercap,
}

enum Counters {
    Perf(RaplCounters),
    Powercap(PowercapCounters),
}

pub struct EnergySampler {
    counters: Counters,
    open: bool,
}

impl EnergySampler {
    pub fn perf() -> Result<Self, SamplerError> {
        let counters = Counters::Perf(RaplCounters::open()?);
        info!("Energy sampler ready (perf power PMU)");
        Ok(Self::with(counters))
    }

    pub fn powercap(root: &Path) -> Result<Self, SamplerError> {
        let counters = Counters::Powercap(PowercapCounters::open(root)?);
        info!("Energy sampler ready (powercap at {})", root.display());
        Ok(Self::with(counters))
    }

    pub fn new(backend: EnergyBackend, powercap_root: &Path) -> Result<Self, SamplerError> {
        match backend {
            EnergyBackend::Perf => Self::perf(),
            EnergyBackend::Powercap => Self::powercap(powercap_root),
        }
    }

    fn with(counters: Counters) -> Self {
        Self {
            counters,
            open: false,
        }
    }
}

impl Sampler for EnergySampler {
    type Sample = EnergySample;

    fn kind(&self) -> SamplerKind {
        SamplerKind::Energy
    }

    fn begin(&mut self, _label: &str) -> Result<(), SamplerError> {
        if self.open {
            return Err(SamplerError::SpanState("begin called on an open span"));
        }
        match &mut self.counters {
            Counters::Perf(rapl) => rapl.start()?,
            Counters::Powercap(powercap) => powercap.start()?,
        }
        self.open = true;
        Ok(())
    }

    fn end(&mut self) -> Result<EnergySample, SamplerError> {
        if !self.open {
            return Err(SamplerError::SpanState("end called without begin"));
        }
        self.open = false;
        let (package_uj, dram_uj) = match &mut self.counters {
            Counters::Perf(rapl) => {
                rapl.stop()?;
                rapl.read_uj()?
            }
            Counters::Powercap(powercap) => powercap.read_uj()?,
        };
        Ok(EnergySample {
            package_uj,
            dram_uj,
        })
    }

    fn abort(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match &mut self.counters {
            Counters::Perf(rapl) => {
                let _ = rapl.stop();
            }
            Counters::Powercap(powercap) => powercap.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::powercap::tests::fake_tree;
    use std::fs;

    #[test]
    fn powercap_sampler_reports_microjoules() {
        let root = fake_tree(true);
        let mut sampler = EnergySampler::new(EnergyBackend::Powercap, root.path()).unwrap();
        assert_eq!(sampler.kind(), SamplerKind::Energy);

        sampler.begin("op_run_1").unwrap();
        let socket = root.path().join("intel-rapl").join("intel-rapl:0");
        fs::write(socket.join("energy_uj"), "2000").unwrap();
        let sample = sampler.end().unwrap();
        assert_eq!(sample.package_uj, 1_000.0);
        assert_eq!(sample.dram_uj, 0.0);
    }

    #[test]
    fn span_state_is_enforced() {
        let root = fake_tree(false);
        let mut sampler = EnergySampler::powercap(root.path()).unwrap();
        assert!(matches!(sampler.end(), Err(SamplerError::SpanState(_))));
        sampler.begin("a").unwrap();
        assert!(sampler.begin("a").is_err());
        sampler.abort();
        sampler.begin("b").unwrap();
        sampler.end().unwrap();
    }

    #[test]
    fn values_keep_column_order() {
        let sample = EnergySample {
            package_uj: 12.5,
            dram_uj: 3.0,
        };
        assert_eq!(sample.values(), vec!["12.5".to_string(), "3".to_string()]);
    }

    #[test]
    fn backend_parses_from_name() {
        assert_eq!("powercap".parse::<EnergyBackend>().unwrap(), EnergyBackend::Powercap);
    }
}
