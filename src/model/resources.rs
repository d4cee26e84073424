use serde::Deserialize;

/// Host and instance resource usage, refreshed independently of the
/// metrics snapshot.
///
/// The collector fills each sub-record best effort: any reading it could
/// not obtain is simply missing from the payload and stays `None` here.
/// A missing reading is "unknown", never zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemResourceSnapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub cpu: CpuStats,
    #[serde(default)]
    pub memory: MemoryStats,
    #[serde(default)]
    pub io: IoStats,
    #[serde(default)]
    pub load: LoadStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    pub utilization_pct: Option<f64>,
    pub host_cpu_utilization_pct: Option<f64>,
    pub num_cpus: Option<f64>,
    pub num_cpu_cores: Option<f64>,
    pub busy_time: Option<f64>,
    pub idle_time: Option<f64>,
    pub cpu_usage_per_sec: Option<f64>,
    pub db_cpu_time_ratio: Option<f64>,
    pub db_cpu_time_sec: Option<f64>,
    pub background_cpu_time_sec: Option<f64>,
    pub db_time_sec: Option<f64>,
}

impl CpuStats {
    /// Host utilization, preferring the 60s system metric over the
    /// busy/idle ratio.
    pub fn host_utilization(&self) -> Option<f64> {
        self.host_cpu_utilization_pct.or(self.utilization_pct)
    }

    pub fn cores(&self) -> Option<f64> {
        self.num_cpu_cores.or(self.num_cpus)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    pub physical_memory_gb: Option<f64>,
    pub total_sga_mb: Option<f64>,
    pub sga_pools: Option<Vec<SgaPool>>,
    pub pga_allocated_mb: Option<f64>,
    pub pga_inuse_mb: Option<f64>,
    pub pga_max_allocated_mb: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SgaPool {
    pub pool: String,
    #[serde(default)]
    pub size_mb: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IoStats {
    pub physical_reads_per_sec: Option<f64>,
    pub physical_writes_per_sec: Option<f64>,
    pub read_bytes_per_sec: Option<f64>,
    pub write_bytes_per_sec: Option<f64>,
    pub io_mb_per_sec: Option<f64>,
    pub io_requests_per_sec: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadStats {
    pub load_average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_readings_stay_unknown() {
        let body = r#"{
            "timestamp": "2025-03-01T10:15:30",
            "cpu": {"host_cpu_utilization_pct": 0.0, "num_cpus": 4},
            "memory": {"sga_pools": [{"pool": "shared pool", "size_mb": 120.5}]},
            "io": {},
            "load": {}
        }"#;

        let snapshot: SystemResourceSnapshot = serde_json::from_str(body).unwrap_or_default();
        assert_eq!(snapshot.cpu.host_utilization(), Some(0.0));
        assert_eq!(snapshot.cpu.cores(), Some(4.0));
        assert_eq!(snapshot.cpu.db_cpu_time_sec, None);
        assert_eq!(snapshot.memory.total_sga_mb, None);
        assert_eq!(snapshot.memory.sga_pools.map(|p| p.len()), Some(1));
        assert_eq!(snapshot.io.io_mb_per_sec, None);
        assert_eq!(snapshot.load.load_average, None);
    }

    #[test]
    fn test_empty_sub_records() {
        let snapshot: SystemResourceSnapshot =
            serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(snapshot.cpu.host_utilization(), None);
        assert!(snapshot.memory.sga_pools.is_none());
    }
}
