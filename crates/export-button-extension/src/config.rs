//! Exporter and button configuration.

use serde::{Deserialize, Serialize};

/// Code that makes a Python kernel evaluate to its installation prefix.
pub const DEFAULT_QUERY_CODE: &str = "import sys; sys.prefix";

/// Export script, resolved by the kernel's shell at execution time.
pub const DEFAULT_SCRIPT_PATH: &str = "$EXTENSIONS_DIR/toolbar-button/button_script.sh";

/// Which `execute_result` messages the exporter reacts to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultMatching {
    /// Any result seen while the query is in flight.
    #[default]
    AnyResult,
    /// Only results whose parent id is the query's message id.
    SameRequest,
}

/// Settings for [`crate::EnvironmentExporter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Code whose value is the kernel's environment prefix.
    pub query_code: String,
    /// Script sourced with the prefix as its only argument.
    pub script_path: String,
    /// Abort the kernel's queue if the script fails.
    pub stop_on_error: bool,
    pub matching: ResultMatching,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            query_code: DEFAULT_QUERY_CODE.to_string(),
            script_path: DEFAULT_SCRIPT_PATH.to_string(),
            stop_on_error: true,
            matching: ResultMatching::default(),
        }
    }
}

impl ExporterConfig {
    /// Shell magic that sources the script with `env_prefix`.
    ///
    /// The prefix is inserted verbatim.
    #[must_use]
    pub fn action_code(&self, env_prefix: &str) -> String {
        format!("!source {} {env_prefix}", self.script_path)
    }
}

/// Appearance and placement of the toolbar button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Toolbar item name.
    pub name: String,
    pub class_name: String,
    pub label: String,
    pub tooltip: String,
    /// Insertion index, clamped to the toolbar length.
    pub position: usize,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            name: "exportButton".to_string(),
            class_name: "export-button".to_string(),
            label: "Export Environment".to_string(),
            tooltip: "Export Environment".to_string(),
            position: 10,
        }
    }
}
