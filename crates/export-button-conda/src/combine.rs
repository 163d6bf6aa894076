//! Merge a full export, a history export and local pip packages.

use crate::env_file::{Dependency, EnvironmentFile, package_name};

/// Packages from `pip freeze --user`, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalPackages(Vec<(String, String)>);

impl LocalPackages {
    /// Parse `name==version` lines. Other requirement forms (editable
    /// installs, direct URLs, comments) carry no version and are skipped.
    pub fn parse<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut packages = Self::default();
        for line in lines {
            let line = line.as_ref().trim();
            match line.split_once("==") {
                Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                    packages.insert(name.trim(), version.trim());
                }
                _ if line.is_empty() => {}
                _ => tracing::debug!(line, "Skipping unpinned local requirement"),
            }
        }
        packages
    }

    /// Add a package; a repeated name keeps its position and takes the new version.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        let (name, version) = (name.into(), version.into());
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = version,
            None => self.0.push((name, version)),
        }
    }

    /// Version of a package.
    #[must_use]
    pub fn version(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// `(name, version)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Repin entries of `target` to local versions. Returns the names that
/// overlapped, changed or not.
fn override_with_local(target: &mut [String], local: &LocalPackages, eq: &str) -> Vec<String> {
    let mut overlapping = Vec::new();
    for dep in target.iter_mut() {
        let name = package_name(dep).to_string();
        let version = dep.rsplit('=').next().unwrap_or_default().to_string();
        if let Some(local_version) = local.version(&name) {
            if version != local_version {
                *dep = format!("{name}{eq}{local_version}");
            }
            overlapping.push(name);
        }
    }
    overlapping
}

/// Combine exports into one environment file.
///
/// Keeps the full export's entries for packages named in the history export,
/// so the user's explicit requests come out pinned to resolved versions. Adds
/// `python=<python_version>` when python was not requested explicitly, keeps
/// the full export's pip section and folds in `pip_local`: overlapping
/// packages are repinned, the rest are appended to the pip section.
#[must_use]
pub fn combine_env_data(
    full: &EnvironmentFile,
    history: &EnvironmentFile,
    pip_local: Option<&LocalPackages>,
    python_version: Option<&str>,
) -> EnvironmentFile {
    let requested: Vec<&str> = history
        .dependencies
        .iter()
        .filter_map(Dependency::as_package)
        .map(package_name)
        .collect();

    let mut deps: Vec<String> = full
        .dependencies
        .iter()
        .filter_map(Dependency::as_package)
        .filter(|spec| requested.contains(&package_name(*spec)))
        .map(str::to_string)
        .collect();

    if !deps.iter().any(|d| package_name(d) == "python") {
        match python_version {
            Some(version) => deps.push(format!("python={version}")),
            None => tracing::warn!("Python not requested explicitly and its version is unknown"),
        }
    }

    let mut pip_deps = full.pip_dependencies().map(<[String]>::to_vec);

    if let Some(local) = pip_local.filter(|l| !l.is_empty()) {
        let overlapping_conda = override_with_local(&mut deps, local, "=");
        let overlapping_pip = pip_deps
            .as_mut()
            .map(|pip| override_with_local(pip, local, "=="))
            .unwrap_or_default();

        let extra: Vec<String> = local
            .iter()
            .filter(|(name, _)| {
                !overlapping_pip.iter().any(|n| n == name)
                    && !overlapping_conda.iter().any(|n| n == name)
            })
            .map(|(name, version)| format!("{name}=={version}"))
            .collect();

        if !extra.is_empty() {
            pip_deps.get_or_insert_with(Vec::new).extend(extra);
        }
    }

    let mut dependencies: Vec<Dependency> = deps.into_iter().map(Dependency::Package).collect();
    if let Some(pip) = pip_deps {
        dependencies.push(Dependency::Pip { pip });
    }

    EnvironmentFile {
        channels: full.channels.clone(),
        dependencies,
        ..EnvironmentFile::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(channels: &[&str], deps: &[&str], pip: Option<&[&str]>) -> EnvironmentFile {
        let mut dependencies: Vec<Dependency> = deps
            .iter()
            .map(|d| Dependency::Package((*d).to_string()))
            .collect();
        if let Some(pip) = pip {
            dependencies.push(Dependency::Pip {
                pip: pip.iter().map(|p| (*p).to_string()).collect(),
            });
        }
        EnvironmentFile {
            name: Some("lab".into()),
            channels: channels.iter().map(|c| (*c).to_string()).collect(),
            dependencies,
            prefix: Some("/opt/conda/envs/lab".into()),
        }
    }

    fn packages(env: &EnvironmentFile) -> Vec<&str> {
        env.dependencies
            .iter()
            .filter_map(Dependency::as_package)
            .collect()
    }

    #[test]
    fn test_keeps_only_requested_packages_with_resolved_versions() {
        let full = env(
            &["conda-forge"],
            &["libzlib=1.3.1", "numpy=1.26.4", "python=3.11.8", "pandas=2.2.1"],
            None,
        );
        let history = env(&["conda-forge"], &["numpy", "pandas>=2", "python=3.11"], None);

        let combined = combine_env_data(&full, &history, None, Some("3.11.8"));

        assert_eq!(packages(&combined), ["numpy=1.26.4", "python=3.11.8", "pandas=2.2.1"]);
        assert_eq!(combined.channels, ["conda-forge"]);
        assert!(combined.name.is_none());
        assert!(combined.prefix.is_none());
        assert!(combined.pip_dependencies().is_none());
    }

    #[test]
    fn test_adds_interpreter_python_when_not_requested() {
        let full = env(&["defaults"], &["numpy=1.26.4", "python=3.10.13"], None);
        let history = env(&["defaults"], &["numpy"], None);

        let combined = combine_env_data(&full, &history, None, Some("3.10.13"));

        assert_eq!(packages(&combined), ["numpy=1.26.4", "python=3.10.13"]);
    }

    #[test]
    fn test_local_packages_repin_and_extend_pip() {
        let full = env(
            &["defaults"],
            &["numpy=1.26.4", "python=3.11.8"],
            Some(&["requests==2.31.0", "rich==13.7.0"]),
        );
        let history = env(&["defaults"], &["numpy", "python"], None);
        let local = LocalPackages::parse([
            "numpy==2.0.0",
            "requests==2.32.3",
            "rich==13.7.0",
            "black==24.4.2",
            "-e git+https://example.invalid/repo.git#egg=tool",
        ]);

        let combined = combine_env_data(&full, &history, Some(&local), None);

        assert_eq!(packages(&combined), ["numpy=2.0.0", "python=3.11.8"]);
        assert_eq!(
            combined.pip_dependencies().unwrap(),
            ["requests==2.32.3", "rich==13.7.0", "black==24.4.2"]
        );
    }

    #[test]
    fn test_pip_section_created_for_extra_local_packages() {
        let full = env(&["defaults"], &["python=3.12.2"], None);
        let history = env(&["defaults"], &["python"], None);
        let local = LocalPackages::parse(["httpx==0.27.0"]);

        let combined = combine_env_data(&full, &history, Some(&local), None);

        assert!(matches!(
            combined.dependencies.last(),
            Some(Dependency::Pip { pip }) if pip == &["httpx==0.27.0".to_string()]
        ));
    }

    #[test]
    fn test_local_package_order_and_overwrite() {
        let mut local = LocalPackages::parse(["a==1", "", "b==2"]);
        local.insert("a", "3");

        assert_eq!(local.iter().collect::<Vec<_>>(), [("a", "3"), ("b", "2")]);
    }
}
