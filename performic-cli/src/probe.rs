//! Host Temperature Probe
//!
//! Reads hardware sensors through `sysinfo`. The hottest matching component
//! wins; with no matching sensor the probe reports 0 °C.

use performic_core::TemperatureProbe;
use std::sync::Mutex;
use sysinfo::Components;
use tracing::debug;

/// Labels considered CPU sensors when no explicit filter is configured
const DEFAULT_SENSOR_LABELS: &[&str] = &["cpu", "core", "package", "soc"];

/// Temperature probe over the host's hardware sensors
pub struct SysinfoProbe {
    components: Mutex<Components>,
    filter: Option<String>,
}

impl SysinfoProbe {
    /// Probe matching `filter` (case-insensitive substring) or the default CPU labels
    pub fn new(filter: Option<String>) -> Self {
        let components = Components::new_with_refreshed_list();
        debug!(sensors = components.list().len(), "temperature sensors discovered");
        Self {
            components: Mutex::new(components),
            filter: filter.map(|f| f.to_lowercase()),
        }
    }

    fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        match &self.filter {
            Some(filter) => label.contains(filter.as_str()),
            None => DEFAULT_SENSOR_LABELS.iter().any(|l| label.contains(l)),
        }
    }
}

impl TemperatureProbe for SysinfoProbe {
    fn read_celsius(&self) -> f32 {
        let Ok(mut components) = self.components.lock() else {
            return 0.0;
        };
        components.refresh(false);

        hottest(
            components
                .list()
                .iter()
                .filter(|c| self.matches(c.label()))
                .filter_map(|c| c.temperature()),
        )
    }
}

impl std::fmt::Debug for SysinfoProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProbe")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Highest finite reading, or 0 when there is none
fn hottest(readings: impl Iterator<Item = f32>) -> f32 {
    readings.filter(|t| t.is_finite()).fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hottest_reading() {
        assert_eq!(hottest([41.0, 55.5, 48.0].into_iter()), 55.5);
        assert_eq!(hottest([f32::NAN, 40.0].into_iter()), 40.0);
        assert_eq!(hottest(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_label_matching() {
        let probe = SysinfoProbe {
            components: Mutex::new(Components::new()),
            filter: None,
        };
        assert!(probe.matches("coretemp Package id 0"));
        assert!(probe.matches("CPU"));
        assert!(!probe.matches("nvme Composite"));

        let filtered = SysinfoProbe {
            components: Mutex::new(Components::new()),
            filter: Some("nvme".to_string()),
        };
        assert!(filtered.matches("nvme Composite"));
        assert!(!filtered.matches("coretemp Package id 0"));
    }

    #[test]
    fn test_probe_always_returns_a_value() {
        let probe = SysinfoProbe::new(None);
        let reading = probe.read_celsius();
        assert!(reading.is_finite());
        assert!(reading >= 0.0);
    }
}
