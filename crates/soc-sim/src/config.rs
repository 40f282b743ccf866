//! Testbench configuration, loadable from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use soc_core::{UpstreamFault, UpstreamMemory};

use crate::SimError;

/// Default wait ticks before the upstream memory answers.
pub const DEFAULT_LATENCY: u32 = 2;

/// Default bound on ticks a `hold` may stall.
pub const DEFAULT_MAX_STALL: u32 = 1_000;

/// Knobs for one testbench run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Wait ticks before each upstream answer.
    pub latency: u32,
    /// Ticks a `hold` may stall before the run fails.
    pub max_stall: u32,
    /// Upstream addresses answered with `error`.
    pub error_addresses: Vec<u32>,
    /// Upstream addresses answered with `retry`.
    pub retry_addresses: Vec<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            max_stall: DEFAULT_MAX_STALL,
            error_addresses: Vec::new(),
            retry_addresses: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] for malformed JSON or unknown fields.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Io`] when the file cannot be read and
    /// [`SimError::Config`] when it does not parse.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Upstream memory with the configured latency and fault addresses.
    #[must_use]
    pub fn upstream(&self) -> UpstreamMemory {
        let mut memory = UpstreamMemory::new(self.latency);
        for &address in &self.error_addresses {
            memory.fail_at(address, UpstreamFault::Error);
        }
        for &address in &self.retry_addresses {
            memory.fail_at(address, UpstreamFault::Retry);
        }
        memory
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{SimConfig, DEFAULT_LATENCY};
    use crate::SimError;

    #[test]
    fn missing_fields_keep_defaults() {
        let config = SimConfig::from_json(r#"{ "max_stall": 16 }"#).expect("valid json");
        assert_eq!(config.max_stall, 16);
        assert_eq!(config.latency, DEFAULT_LATENCY);
        assert!(config.error_addresses.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = SimConfig::from_json(r#"{ "latencyy": 1 }"#).expect_err("typo");
        assert!(matches!(error, SimError::Config(_)));
    }

    #[test]
    fn map_settings_are_not_configurable() {
        let error = SimConfig::from_json(r#"{ "overlap_policy": "Reject" }"#)
            .expect_err("no such knob");
        assert!(error.to_string().contains("overlap_policy"));
    }

    #[test]
    fn fault_lists_reach_upstream_memory() {
        let config = SimConfig {
            error_addresses: vec![0x10],
            retry_addresses: vec![0x20, 0x30],
            ..SimConfig::default()
        };
        let memory = config.upstream();
        assert_eq!(
            memory.fault_addresses().into_iter().collect::<Vec<_>>(),
            vec![0x10, 0x20, 0x30]
        );
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sim.json");
        fs::write(&path, r#"{ "latency": 0, "retry_addresses": [16] }"#).expect("write");

        let config = SimConfig::load(&path).expect("loads");
        assert_eq!(config.latency, 0);
        assert_eq!(config.retry_addresses, vec![16]);
    }

    #[test]
    fn missing_file_reports_path() {
        let error = SimConfig::load(std::path::Path::new("/nonexistent/sim.json"))
            .expect_err("missing");
        assert!(error.to_string().contains("/nonexistent/sim.json"));
    }
}
