// Derived health statuses shown next to each gauge

use serde::Serialize;

use crate::models::Snapshot;

pub const CPU_WARNING_PERCENT: f64 = 80.0;
pub const MEMORY_WARNING_PERCENT: f64 = 85.0;
pub const DISK_WARNING_PERCENT: f64 = 90.0;
pub const LOAD_WARNING: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Normal,
    Warning,
}

impl Status {
    fn above(value: f64, threshold: f64) -> Self {
        if value > threshold {
            Status::Warning
        } else {
            Status::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub cpu: Status,
    pub memory: Status,
    pub disk: Status,
    pub load: Status,
    pub dns: Status,
}

impl StatusReport {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let system = &snapshot.system;
        Self {
            cpu: Status::above(system.cpu.percent, CPU_WARNING_PERCENT),
            memory: Status::above(system.memory.percent, MEMORY_WARNING_PERCENT),
            disk: Status::above(system.disk.percent, DISK_WARNING_PERCENT),
            load: Status::above(system.load.one, LOAD_WARNING),
            dns: if snapshot.dns.service_status.is_healthy() {
                Status::Normal
            } else {
                Status::Warning
            },
        }
    }

    pub fn has_warning(&self) -> bool {
        [self.cpu, self.memory, self.disk, self.load, self.dns].contains(&Status::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn thresholds_are_exclusive() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.system.cpu.percent = 80.0;
        snapshot.system.memory.percent = 85.1;
        snapshot.system.disk.percent = 90.0;
        snapshot.system.load.one = 2.5;
        let report = StatusReport::from_snapshot(&snapshot);
        assert_eq!(report.cpu, Status::Normal);
        assert_eq!(report.memory, Status::Warning);
        assert_eq!(report.disk, Status::Normal);
        assert_eq!(report.load, Status::Warning);
    }

    #[test]
    fn dns_needs_all_three_flags() {
        let mut snapshot = Snapshot::empty(Utc::now());
        assert_eq!(StatusReport::from_snapshot(&snapshot).dns, Status::Warning);
        let status = &mut snapshot.dns.service_status;
        status.process_running = true;
        status.service_active = true;
        status.config_valid = true;
        let report = StatusReport::from_snapshot(&snapshot);
        assert_eq!(report.dns, Status::Normal);
        assert!(!report.has_warning());
    }
}
