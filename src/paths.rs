// GSD MCP Server - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for installation paths. Resolved once at startup
// from ServerConfig and immutable afterwards.

use crate::config::{ServerConfig, MARKER_DIR};
use crate::error::{Result, ServerError};
use std::path::{Path, PathBuf};

/// Per-application config directories probed under $HOME, in order.
const HOME_CANDIDATES: &[&str] = &[".gsd", ".claude", ".config/opencode", ".gemini"];

const TOOL_ENTRY: &str = "bin/gsd-tools.js";

/// Resolved installation layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Installation root (contains get-shit-done/ and agents/)
    pub root: PathBuf,
    /// gsd-tools.js entry point
    pub tool_entry: PathBuf,
    /// Every directory worth probing for workflow documents, best first
    pub workflow_dirs: Vec<PathBuf>,
}

impl InstallPaths {
    pub fn resolve(config: &ServerConfig) -> Result<Self> {
        let root = resolve_installation_root(config)?;
        let tool_entry = resolve_tool_entry_point(config)?;
        let workflow_dirs = workflow_search_dirs(config, &root);
        Ok(Self { root, tool_entry, workflow_dirs })
    }

    /// get-shit-done/ under the installation root
    pub fn gsd_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }
}

fn home_candidates(home: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    HOME_CANDIDATES.iter().map(move |c| home.join(c))
}

/// Find the installation root.
///
/// Resolution order:
///   1. GSD_CONFIG_DIR override, taken as-is
///   2. First home candidate containing get-shit-done/
///   3. Development root
///
/// Fails only if neither the override nor a home directory is known.
pub fn resolve_installation_root(config: &ServerConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.config_dir {
        return Ok(dir.clone());
    }
    let home = config.home_dir.as_deref().ok_or(ServerError::MissingHome)?;

    if let Some(found) = home_candidates(home).find(|c| c.join(MARKER_DIR).is_dir()) {
        return Ok(found);
    }

    log::debug!("No GSD installation under {:?}, using development root", home);
    Ok(config.dev_root.clone())
}

/// Find gsd-tools.js.
///
/// Resolution order:
///   1. <GSD_CONFIG_DIR>/get-shit-done/bin/gsd-tools.js, taken as-is
///   2. First home candidate where the script exists
///   3. Development root
pub fn resolve_tool_entry_point(config: &ServerConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.config_dir {
        return Ok(dir.join(MARKER_DIR).join(TOOL_ENTRY));
    }
    let home = config.home_dir.as_deref().ok_or(ServerError::MissingHome)?;

    let found = home_candidates(home)
        .map(|c| c.join(MARKER_DIR).join(TOOL_ENTRY))
        .find(|p| p.is_file());
    Ok(found.unwrap_or_else(|| config.dev_root.join(MARKER_DIR).join(TOOL_ENTRY)))
}

fn workflow_search_dirs(config: &ServerConfig, root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![root.join(MARKER_DIR).join("workflows")];
    if let Some(home) = &config.home_dir {
        dirs.extend(home_candidates(home).map(|c| c.join(MARKER_DIR).join("workflows")));
    }
    dirs.push(config.dev_root.join(MARKER_DIR).join("workflows"));

    let mut unique = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if !unique.contains(&dir) {
            unique.push(dir);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with_home(home: &Path, dev: &Path) -> ServerConfig {
        ServerConfig {
            home_dir: Some(home.to_path_buf()),
            dev_root: dev.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn override_wins_without_existence_check() {
        let config = ServerConfig {
            config_dir: Some(PathBuf::from("/nonexistent/gsd")),
            ..ServerConfig::default()
        };
        let paths = InstallPaths::resolve(&config).unwrap();
        assert_eq!(paths.root, PathBuf::from("/nonexistent/gsd"));
        assert_eq!(
            paths.tool_entry,
            PathBuf::from("/nonexistent/gsd/get-shit-done/bin/gsd-tools.js")
        );
    }

    #[test]
    fn missing_home_and_override_is_fatal() {
        let config = ServerConfig::default();
        assert!(matches!(
            resolve_installation_root(&config),
            Err(ServerError::MissingHome)
        ));
        assert!(matches!(
            resolve_tool_entry_point(&config),
            Err(ServerError::MissingHome)
        ));
    }

    #[test]
    fn first_candidate_with_marker_is_selected() {
        let home = tempdir().unwrap();
        let dev = tempdir().unwrap();
        // .gsd exists but lacks the marker; .claude and .gemini have it
        std::fs::create_dir_all(home.path().join(".gsd")).unwrap();
        std::fs::create_dir_all(home.path().join(".claude/get-shit-done")).unwrap();
        std::fs::create_dir_all(home.path().join(".gemini/get-shit-done")).unwrap();

        let config = config_with_home(home.path(), dev.path());
        assert_eq!(
            resolve_installation_root(&config).unwrap(),
            home.path().join(".claude")
        );
    }

    #[test]
    fn falls_back_to_dev_root() {
        let home = tempdir().unwrap();
        let dev = tempdir().unwrap();
        let config = config_with_home(home.path(), dev.path());

        assert_eq!(resolve_installation_root(&config).unwrap(), dev.path());
        assert_eq!(
            resolve_tool_entry_point(&config).unwrap(),
            dev.path().join("get-shit-done/bin/gsd-tools.js")
        );
    }

    #[test]
    fn tool_entry_probes_each_candidate() {
        let home = tempdir().unwrap();
        let dev = tempdir().unwrap();
        let script = home.path().join(".config/opencode/get-shit-done/bin/gsd-tools.js");
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "// tools").unwrap();
        // Earlier candidate has the marker dir but no script
        std::fs::create_dir_all(home.path().join(".gsd/get-shit-done")).unwrap();

        let config = config_with_home(home.path(), dev.path());
        assert_eq!(resolve_tool_entry_point(&config).unwrap(), script);
    }

    #[test]
    fn workflow_dirs_start_at_root_and_end_at_dev() {
        let home = tempdir().unwrap();
        let dev = tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".claude/get-shit-done")).unwrap();

        let paths = InstallPaths::resolve(&config_with_home(home.path(), dev.path())).unwrap();
        assert_eq!(
            paths.workflow_dirs.first().unwrap(),
            &home.path().join(".claude/get-shit-done/workflows")
        );
        assert_eq!(
            paths.workflow_dirs.last().unwrap(),
            &dev.path().join("get-shit-done/workflows")
        );
        // root's workflows dir is listed once even though it is also a home candidate
        let claude = home.path().join(".claude/get-shit-done/workflows");
        assert_eq!(paths.workflow_dirs.iter().filter(|d| **d == claude).count(), 1);
    }
}
