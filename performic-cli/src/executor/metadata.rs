//! System Metadata Collection
//!
//! Collects host information for report metadata through `sysinfo`. Values a
//! platform cannot provide degrade to "Unknown" or 0.

use performic_report::SystemInfo;
use sysinfo::System;

/// Collect OS, CPU and memory information for the report
pub fn collect_system_info() -> SystemInfo {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu_all();

    let cpu = system
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    SystemInfo {
        os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
        cpu,
        cpu_cores: num_cpus(),
        memory_gb: system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
    }
}

/// Get number of available CPU cores
fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_something() {
        let info = collect_system_info();
        assert!(!info.os.is_empty());
        assert!(!info.cpu.is_empty());
        assert!(info.cpu_cores >= 1);
        assert!(info.memory_gb >= 0.0);
    }
}
