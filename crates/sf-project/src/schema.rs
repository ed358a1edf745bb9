//! On-disk project layout.

use serde::{Deserialize, Serialize};
use sf_sim::SimulationSettings;
use sf_stack::StackConfig;

/// A stack definition together with the operating points to run on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub simulation: SimulationSettings,
    pub stack: StackConfig,
}

impl Project {
    /// Reference parameter set at the latest schema version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            description: None,
            simulation: SimulationSettings::default(),
            stack: StackConfig::default(),
        }
    }
}
