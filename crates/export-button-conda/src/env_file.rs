//! Conda environment file model.

use serde::{Deserialize, Serialize};

/// One entry of an environment file's `dependencies` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    /// Conda match spec, e.g. `numpy=1.26.4`.
    Package(String),
    /// Nested pip requirements.
    Pip { pip: Vec<String> },
}

impl Dependency {
    /// The conda spec, if this is one.
    #[must_use]
    pub fn as_package(&self) -> Option<&str> {
        match self {
            Self::Package(spec) => Some(spec),
            Self::Pip { .. } => None,
        }
    }
}

/// Contents of an `environment.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl EnvironmentFile {
    /// Parse YAML as printed by `conda env export`.
    ///
    /// # Errors
    /// Returns error if the YAML does not describe an environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Render as YAML.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// The first nested pip list.
    #[must_use]
    pub fn pip_dependencies(&self) -> Option<&[String]> {
        self.dependencies.iter().find_map(|dep| match dep {
            Dependency::Pip { pip } => Some(pip.as_slice()),
            Dependency::Package(_) => None,
        })
    }
}

/// Package name of a conda match spec or pip requirement.
///
/// Drops a `channel::` prefix and everything from the first version
/// operator, space or bracket: `conda-forge::numpy>=1.2` -> `numpy`.
#[must_use]
pub fn package_name(spec: &str) -> &str {
    let spec = spec.rsplit("::").next().unwrap_or(spec).trim();
    let end = spec
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | ' ' | '[' | ';'))
        .unwrap_or(spec.len());
    &spec[..end]
}
