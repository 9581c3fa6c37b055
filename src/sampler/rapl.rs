//! RAPL energy counters read through the kernel `power` perf PMU.

use crate::error::SamplerError;
use log::warn;
use perf_event::events::{Dynamic, Software};
use perf_event::{Builder, Counter, Group};
use perf_event_data::ReadFormat;

const PMU: &str = "power";
const PKG_EVENT: &str = "energy-pkg";
const DRAM_EVENT: &str = "energy-dram";

struct RaplCounter {
    counter: Counter,
    /// Joules per raw count
    scale: f64,
}

impl RaplCounter {
    /// Raw count and its scale.
    fn read(&mut self) -> Result<(u64, f64), SamplerError> {
        Ok((self.counter.read()?, self.scale))
    }
}

fn raw_to_uj(raw: u64, scale: f64) -> f64 {
    raw as f64 * scale * 1e6
}

/// Package and DRAM microjoules, 0 for an absent DRAM domain.
fn domains_uj(pkg: (u64, f64), dram: Option<(u64, f64)>) -> (f64, f64) {
    let dram = dram.map_or(0.0, |(raw, scale)| raw_to_uj(raw, scale));
    (raw_to_uj(pkg.0, pkg.1), dram)
}

pub struct RaplCounters {
    group: Group,
    pkg: RaplCounter,
    dram: Option<RaplCounter>,
}

impl RaplCounters {
    /// Opens the package counter (required) and the DRAM counter (optional)
    /// in one group pinned to CPU 0.
    pub fn open() -> Result<Self, SamplerError> {
        let mut group = Builder::new(Software::DUMMY)
            .read_format(ReadFormat::GROUP | ReadFormat::TOTAL_TIME_RUNNING)
            .one_cpu(0)
            .any_pid()
            .exclude_hv(false)
            .exclude_kernel(false)
            .build_group()
            .map_err(|err| SamplerError::unavailable("perf event group on CPU 0", err))?;

        let pkg = Self::open_event(&mut group, PKG_EVENT).map_err(|reason| {
            SamplerError::unavailable("RAPL package domain (power/energy-pkg)", reason)
        })?;
        let dram = match Self::open_event(&mut group, DRAM_EVENT) {
            Ok(counter) => Some(counter),
            Err(reason) => {
                warn!("RAPL DRAM domain unavailable, recording 0: {}", reason);
                None
            }
        };

        Ok(Self { group, pkg, dram })
    }

    fn open_event(group: &mut Group, event_name: &str) -> Result<RaplCounter, String> {
        let mut builder = Dynamic::builder(PMU).map_err(|err| err.to_string())?;
        builder.event(event_name).map_err(|err| err.to_string())?;
        let scale = builder
            .scale()
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("{} has no scale", event_name))?;
        let event = builder.build().map_err(|err| err.to_string())?;
        let counter = Builder::new(event)
            .one_cpu(0)
            .any_pid()
            .exclude_hv(false)
            .exclude_kernel(false)
            .build_with_group(&mut *group)
            .map_err(|err| err.to_string())?;
        Ok(RaplCounter { counter, scale })
    }

    pub fn start(&mut self) -> Result<(), SamplerError> {
        self.group.reset()?;
        self.group.enable()?;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), SamplerError> {
        self.group.disable()?;
        Ok(())
    }

    /// Package and DRAM energy in microjoules since the last `start`.
    pub fn read_uj(&mut self) -> Result<(f64, f64), SamplerError> {
        let pkg = self.pkg.read()?;
        let dram = self.dram.as_mut().map(RaplCounter::read).transpose()?;
        Ok(domains_uj(pkg, dram))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Intel reports energy-pkg in units of 2^-32 J.
    const INTEL_SCALE: f64 = 2.3283064365386962890625e-10;

    #[test]
    fn scaled_counts_become_microjoules() {
        assert_eq!(raw_to_uj(1 << 32, INTEL_SCALE), 1_000_000.0);
        assert_eq!(raw_to_uj(0, INTEL_SCALE), 0.0);
        assert_eq!(raw_to_uj(3, 0.5), 1_500_000.0);
    }

    #[test]
    fn absent_dram_reads_zero() {
        assert_eq!(domains_uj((1 << 33, INTEL_SCALE), None), (2_000_000.0, 0.0));
        assert_eq!(
            domains_uj((1 << 32, INTEL_SCALE), Some((1 << 31, INTEL_SCALE))),
            (1_000_000.0, 500_000.0)
        );
    }

    #[test]
    #[ignore = "needs RAPL perf events and perf_event_paranoid access"]
    fn package_counter_advances_under_load() {
        let mut counters = RaplCounters::open().unwrap();
        counters.start().unwrap();
        let mut acc = 0u64;
        for i in 0..50_000_000u64 {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
        counters.stop().unwrap();
        let (pkg, dram) = counters.read_uj().unwrap();
        assert!(pkg > 0.0, "package read {pkg} uJ");
        assert!(dram >= 0.0);
    }
}
