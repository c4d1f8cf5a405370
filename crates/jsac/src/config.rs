//! Project discovery and the `jsa.toml` manifest.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// A project's `jsa.toml`, parsed with `toml`/`serde` the way the
/// teacher's driver parses its own project manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub project: ProjectSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Extra search roots for built-in modules beyond the fixed `@io`
    /// table. Parsed and carried through, but unused until a second
    /// built-in module exists to resolve against one (spec.md §4.E
    /// addendum names only `@io`).
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

fn default_entry() -> String {
    "main.jsa".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
    #[error("no `jsa.toml` found in '{0}'")]
    ManifestNotFound(PathBuf),
    #[error("could not read '{path}': {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("could not parse '{path}': {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Loads `<dir>/jsa.toml`, falling back to a manifest-less project (entry
/// `main.jsa`, project name taken from the directory) when no manifest is
/// present -- `jsa.toml` documents intent, it is never required to build.
pub fn load_project(dir: &Path) -> Result<(PathBuf, Manifest), ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }

    let manifest_path = dir.join("jsa.toml");
    if !manifest_path.exists() {
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("project").to_string();
        return Ok((dir.to_path_buf(), Manifest { project: ProjectSection { name, entry: default_entry(), search_paths: Vec::new() } }));
    }

    let text = std::fs::read_to_string(&manifest_path).map_err(|source| ConfigError::Io { path: manifest_path.clone(), source })?;
    let manifest: Manifest = toml::from_str(&text).map_err(|source| ConfigError::Parse { path: manifest_path.clone(), source })?;
    Ok((dir.to_path_buf(), manifest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_falls_back_to_the_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let (root, manifest) = load_project(dir.path()).unwrap();
        assert_eq!(root, dir.path());
        assert_eq!(manifest.project.entry, "main.jsa");
    }

    #[test]
    fn manifest_overrides_the_entry_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jsa.toml"), "[project]\nname = \"demo\"\nentry = \"src/main.jsa\"\n").unwrap();
        let (_, manifest) = load_project(dir.path()).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.project.entry, "src/main.jsa");
    }

    #[test]
    fn non_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(load_project(&file), Err(ConfigError::NotADirectory(_))));
    }
}
