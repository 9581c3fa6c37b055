//! RAPL energy counters exposed by the sysfs powercap tree.
//!
//! Layout under the root (normally `/sys/class/powercap`):
//!
//! ```text
//! intel-rapl/intel-rapl:0/{name, energy_uj, max_energy_range_uj}
//! intel-rapl/intel-rapl:0/intel-rapl:0:N/{name, energy_uj, max_energy_range_uj}
//! ```
//!
//! Only socket 0 is read. Its DRAM sub-zone is the one whose `name` is `dram`.

use crate::error::SamplerError;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct Zone {
    dir: PathBuf,
    max_range_uj: u64,
}

impl Zone {
    fn open(dir: PathBuf) -> Result<Self, SamplerError> {
        let max_range_uj = read_counter(&dir.join("max_energy_range_uj"))?;
        // energy_uj is root-only on recent kernels.
        read_counter(&dir.join("energy_uj"))?;
        Ok(Self { dir, max_range_uj })
    }

    fn read(&self) -> Result<u64, SamplerError> {
        read_counter(&self.dir.join("energy_uj"))
    }

    /// Counter delta, correcting a single wraparound.
    fn delta(&self, start: u64, end: u64) -> u64 {
        if end >= start {
            end - start
        } else {
            self.max_range_uj - start + end
        }
    }
}

fn read_counter(path: &Path) -> Result<u64, SamplerError> {
    let text = fs::read_to_string(path)?;
    text.trim().parse().map_err(|_| SamplerError::Parse {
        path: path.to_path_buf(),
        value: text.trim().to_string(),
    })
}

#[derive(Debug)]
pub struct PowercapCounters {
    pkg: Zone,
    dram: Option<Zone>,
    snapshot: Option<(u64, Option<u64>)>,
}

impl PowercapCounters {
    pub fn open(root: &Path) -> Result<Self, SamplerError> {
        let socket = root.join("intel-rapl").join("intel-rapl:0");
        let capability = format!("RAPL package domain ({})", socket.display());
        let pkg = Zone::open(socket.clone())
            .map_err(|err| SamplerError::unavailable(capability, err))?;

        let dram = match Self::find_dram(&socket) {
            Some(dir) => match Zone::open(dir) {
                Ok(zone) => Some(zone),
                Err(err) => {
                    warn!("RAPL DRAM domain unreadable, recording 0: {}", err);
                    None
                }
            },
            None => {
                warn!("RAPL DRAM domain not present, recording 0");
                None
            }
        };
        debug!(
            "Powercap zones: pkg={} dram={:?}",
            pkg.dir.display(),
            dram.as_ref().map(|zone| zone.dir.display().to_string())
        );

        Ok(Self {
            pkg,
            dram,
            snapshot: None,
        })
    }

    fn find_dram(socket: &Path) -> Option<PathBuf> {
        let prefix = format!("{}:", socket.file_name()?.to_string_lossy());
        fs::read_dir(socket)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .find(|path| {
                fs::read_to_string(path.join("name"))
                    .map(|name| name.trim() == "dram")
                    .unwrap_or(false)
            })
    }

    pub fn start(&mut self) -> Result<(), SamplerError> {
        let pkg = self.pkg.read()?;
        let dram = self.dram.as_ref().map(Zone::read).transpose()?;
        self.snapshot = Some((pkg, dram));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    /// Package and DRAM energy in microjoules since the last `start`.
    pub fn read_uj(&mut self) -> Result<(f64, f64), SamplerError> {
        let (pkg_start, dram_start) = self
            .snapshot
            .take()
            .ok_or(SamplerError::SpanState("end called without begin"))?;
        let pkg = self.pkg.delta(pkg_start, self.pkg.read()?);
        let dram = match (self.dram.as_ref(), dram_start) {
            (Some(zone), Some(start)) => zone.delta(start, zone.read()?),
            _ => 0,
        };
        Ok((pkg as f64, dram as f64))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn fake_zone(dir: &Path, name: &str, energy: u64, max: u64) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        fs::write(dir.join("energy_uj"), format!("{}\n", energy)).unwrap();
        fs::write(dir.join("max_energy_range_uj"), format!("{}\n", max)).unwrap();
    }

    pub(crate) fn fake_tree(with_dram: bool) -> TempDir {
        let root = TempDir::new().unwrap();
        let socket = root.path().join("intel-rapl").join("intel-rapl:0");
        fake_zone(&socket, "package-0", 1_000, 262_143_328_850);
        fake_zone(&socket.join("intel-rapl:0:0"), "core", 10, 262_143_328_850);
        if with_dram {
            fake_zone(&socket.join("intel-rapl:0:1"), "dram", 500, 65_712_999_613);
        }
        root
    }

    fn set_energy(root: &Path, zone: &str, energy: u64) {
        let socket = root.join("intel-rapl").join("intel-rapl:0");
        let dir = if zone.is_empty() { socket } else { socket.join(zone) };
        fs::write(dir.join("energy_uj"), energy.to_string()).unwrap();
    }

    #[test]
    fn computes_deltas_for_both_domains() {
        let root = fake_tree(true);
        let mut counters = PowercapCounters::open(root.path()).unwrap();
        counters.start().unwrap();
        set_energy(root.path(), "", 4_500);
        set_energy(root.path(), "intel-rapl:0:1", 800);
        assert_eq!(counters.read_uj().unwrap(), (3_500.0, 300.0));
    }

    #[test]
    fn missing_dram_reads_zero() {
        let root = fake_tree(false);
        let mut counters = PowercapCounters::open(root.path()).unwrap();
        counters.start().unwrap();
        set_energy(root.path(), "", 1_250);
        assert_eq!(counters.read_uj().unwrap(), (250.0, 0.0));
    }

    #[test]
    fn corrects_wraparound() {
        let root = TempDir::new().unwrap();
        let socket = root.path().join("intel-rapl").join("intel-rapl:0");
        fake_zone(&socket, "package-0", 990, 1_000);
        let mut counters = PowercapCounters::open(root.path()).unwrap();
        counters.start().unwrap();
        set_energy(root.path(), "", 15);
        assert_eq!(counters.read_uj().unwrap().0, 25.0);
    }

    #[test]
    fn missing_package_is_unavailable() {
        let root = TempDir::new().unwrap();
        let err = PowercapCounters::open(root.path()).unwrap_err();
        match err {
            SamplerError::Unavailable { capability, .. } => {
                assert!(capability.contains("package"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_counter_is_a_parse_error() {
        let root = fake_tree(false);
        let mut counters = PowercapCounters::open(root.path()).unwrap();
        counters.start().unwrap();
        let socket = root.path().join("intel-rapl").join("intel-rapl:0");
        fs::write(socket.join("energy_uj"), "n/a").unwrap();
        assert!(matches!(
            counters.read_uj(),
            Err(SamplerError::Parse { .. })
        ));
    }
}
