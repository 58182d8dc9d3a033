// GSD MCP Server - Resource Catalog
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// gsd://templates|workflows|references/<sub/path/>name  -> get-shit-done/<category>/...md
// gsd://agents/<name>                                   -> agents/<name>.md
//
// Listing is recomputed on every call. Reads are checked for containment
// in the category's base directory after normalization.

use crate::error::{Result, ServerError};
use crate::paths::InstallPaths;
use crate::protocol::{ResourceContents, ResourceInfo};
use std::path::{Component, Path, PathBuf};

pub const URI_SCHEME: &str = "gsd://";
pub const MIME_MARKDOWN: &str = "text/markdown";
const AGENT_PREFIX: &str = "gsd-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Templates,
    Workflows,
    References,
    Agents,
}

impl Category {
    /// Categories walked recursively under get-shit-done/
    const NESTED: [Category; 3] = [Category::Templates, Category::Workflows, Category::References];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "templates" => Some(Category::Templates),
            "workflows" => Some(Category::Workflows),
            "references" => Some(Category::References),
            "agents" => Some(Category::Agents),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Templates => "templates",
            Category::Workflows => "workflows",
            Category::References => "references",
            Category::Agents => "agents",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    gsd_dir: PathBuf,
    agents_dir: PathBuf,
}

impl ResourceCatalog {
    pub fn new(paths: &InstallPaths) -> Self {
        Self {
            gsd_dir: paths.gsd_dir(),
            agents_dir: paths.agents_dir(),
        }
    }

    fn base_dir(&self, category: Category) -> PathBuf {
        match category {
            Category::Agents => self.agents_dir.clone(),
            nested => self.gsd_dir.join(nested.as_str()),
        }
    }

    /// Every markdown resource currently on disk.
    pub fn list(&self) -> Vec<ResourceInfo> {
        let mut resources = Vec::new();
        for category in Category::NESTED {
            collect_markdown(&self.base_dir(category), category.as_str(), &mut resources);
        }
        resources.extend(self.list_agents());
        resources
    }

    /// `list` run on the blocking pool, for use from request handlers.
    pub async fn list_async(&self) -> Result<Vec<ResourceInfo>> {
        let catalog = self.clone();
        tokio::task::spawn_blocking(move || catalog.list())
            .await
            .map_err(|e| ServerError::Io(std::io::Error::other(e)))
    }

    fn list_agents(&self) -> Vec<ResourceInfo> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.agents_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|n| n.starts_with(AGENT_PREFIX) && n.ends_with(".md"))
                .collect(),
            Err(_) => return Vec::new(),
        };
        names.sort();
        names
            .into_iter()
            .map(|file| {
                let stem = file.trim_end_matches(".md").to_string();
                let role = stem.trim_start_matches(AGENT_PREFIX).to_string();
                ResourceInfo {
                    uri: format!("{}agents/{}", URI_SCHEME, stem),
                    name: file,
                    mime_type: MIME_MARKDOWN,
                    description: format!("Agent: {}", role),
                }
            })
            .collect()
    }

    /// Map a URI onto a file path inside its category's base directory.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServerError::InvalidUri(uri.to_string()))?;

        let mut segments: Vec<&str> = rest.split('/').collect();
        let category_name = segments.remove(0);
        let category = Category::parse(category_name)
            .ok_or_else(|| ServerError::UnknownCategory(category_name.to_string()))?;
        let file_name = match segments.pop() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ServerError::InvalidUri(uri.to_string())),
        };

        let base = absolute(&self.base_dir(category));
        let mut file = base.clone();
        for segment in segments {
            file.push(segment);
        }
        file.push(format!("{}.md", file_name));

        let file = normalize(&file);
        let base = normalize(&base);
        if !file.starts_with(&base) {
            log::warn!("Rejected resource outside {:?}: {}", base, uri);
            return Err(ServerError::AccessDenied);
        }
        Ok(file)
    }

    pub async fn read(&self, uri: &str) -> Result<ResourceContents> {
        let path = self.resolve(uri)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ServerError::ResourceNotFound(uri.to_string())),
        }
        let text = tokio::fs::read_to_string(&path).await?;
        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: MIME_MARKDOWN,
            text,
        })
    }
}

/// Recursive walk; `prefix` is the URI path of `dir` (e.g. "templates/research").
fn collect_markdown(dir: &Path, prefix: &str, out: &mut Vec<ResourceInfo>) {
    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_name) = entry.file_name().into_string() else {
            log::debug!("Skipping non-UTF-8 entry {:?}", path);
            continue;
        };
        if path.is_dir() {
            collect_markdown(&path, &format!("{}/{}", prefix, file_name), out);
        } else if let Some(stem) = file_name.strip_suffix(".md") {
            out.push(ResourceInfo {
                uri: format!("{}{}/{}", URI_SCHEME, prefix, stem),
                name: file_name.clone(),
                mime_type: MIME_MARKDOWN,
                description: format!("{}/{}", prefix, stem),
            });
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Lexically resolve `.` and `..` (no filesystem access, symlinks untouched).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, ResourceCatalog) {
        let root = tempdir().unwrap();
        let gsd = root.path().join("get-shit-done");
        for (rel, body) in [
            ("templates/project.md", "# Project"),
            ("templates/research/summary.md", "# Summary"),
            ("templates/notes.txt", "not markdown"),
            ("workflows/plan-phase.md", "# Plan"),
            ("references/checkpoints.md", "# Checkpoints"),
        ] {
            let path = gsd.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        let agents = root.path().join("agents");
        std::fs::create_dir_all(&agents).unwrap();
        std::fs::write(agents.join("gsd-planner.md"), "# Planner").unwrap();
        std::fs::write(agents.join("other-agent.md"), "# Other").unwrap();
        std::fs::write(root.path().join("secret.md"), "top secret").unwrap();

        let paths = InstallPaths {
            root: root.path().to_path_buf(),
            tool_entry: gsd.join("bin/gsd-tools.js"),
            workflow_dirs: vec![gsd.join("workflows")],
        };
        (root, ResourceCatalog::new(&paths))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/./b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize(Path::new("/a/../../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn list_walks_nested_categories_and_filters_agents() {
        let (_root, catalog) = fixture();
        let uris: Vec<String> = catalog.list().into_iter().map(|r| r.uri).collect();
        assert_eq!(
            uris,
            vec![
                "gsd://templates/project",
                "gsd://templates/research/summary",
                "gsd://workflows/plan-phase",
                "gsd://references/checkpoints",
                "gsd://agents/gsd-planner",
            ]
        );
    }

    #[test]
    fn list_metadata() {
        let (_root, catalog) = fixture();
        let resources = catalog.list();
        let nested = resources
            .iter()
            .find(|r| r.uri == "gsd://templates/research/summary")
            .unwrap();
        assert_eq!(nested.name, "summary.md");
        assert_eq!(nested.description, "templates/research/summary");
        assert_eq!(nested.mime_type, "text/markdown");

        let agent = resources.last().unwrap();
        assert_eq!(agent.name, "gsd-planner.md");
        assert_eq!(agent.description, "Agent: planner");
    }

    #[test]
    fn list_sees_new_files_without_restart() {
        let (root, catalog) = fixture();
        let before = catalog.list().len();
        std::fs::write(root.path().join("get-shit-done/workflows/quick.md"), "# Quick").unwrap();
        assert_eq!(catalog.list().len(), before + 1);
    }

    #[test]
    fn list_tolerates_missing_directories() {
        let root = tempdir().unwrap();
        let paths = InstallPaths {
            root: root.path().to_path_buf(),
            tool_entry: root.path().join("gsd-tools.js"),
            workflow_dirs: vec![],
        };
        assert!(ResourceCatalog::new(&paths).list().is_empty());
    }

    #[tokio::test]
    async fn read_nested_resource() {
        let (_root, catalog) = fixture();
        let contents = catalog.read("gsd://templates/research/summary").await.unwrap();
        assert_eq!(contents.text, "# Summary");
        assert_eq!(contents.uri, "gsd://templates/research/summary");
        assert_eq!(contents.mime_type, "text/markdown");
    }

    #[tokio::test]
    async fn listing_off_the_runtime_matches_direct_listing() {
        let (_root, catalog) = fixture();
        let listed = catalog.list_async().await.unwrap();
        assert_eq!(listed, catalog.list());
        assert_eq!(listed.len(), 5);
    }

    #[tokio::test]
    async fn read_is_idempotent() {
        let (_root, catalog) = fixture();
        let first = catalog.read("gsd://agents/gsd-planner").await.unwrap();
        let second = catalog.read("gsd://agents/gsd-planner").await.unwrap();
        assert_eq!(first.text, second.text);
    }

    #[tokio::test]
    async fn missing_file_is_not_found_not_empty() {
        let (_root, catalog) = fixture();
        let err = catalog.read("gsd://templates/foo").await.unwrap_err();
        assert!(matches!(err, ServerError::ResourceNotFound(ref u) if u == "gsd://templates/foo"));
    }

    #[tokio::test]
    async fn traversal_is_denied() {
        let (_root, catalog) = fixture();
        for uri in [
            "gsd://templates/../../secret",
            "gsd://workflows/../../../etc/passwd",
            "gsd://agents/../secret",
            "gsd://references/a/../../../secret",
        ] {
            let err = catalog.read(uri).await.unwrap_err();
            assert!(matches!(err, ServerError::AccessDenied), "{} -> {:?}", uri, err);
        }
    }

    #[tokio::test]
    async fn dot_segments_that_stay_inside_are_allowed() {
        let (_root, catalog) = fixture();
        let contents = catalog
            .read("gsd://templates/research/../project")
            .await
            .unwrap();
        assert_eq!(contents.text, "# Project");
    }

    #[test]
    fn sibling_directory_with_common_prefix_is_denied() {
        let (root, catalog) = fixture();
        let evil = root.path().join("get-shit-done/templates-evil");
        std::fs::create_dir_all(&evil).unwrap();
        std::fs::write(evil.join("x.md"), "evil").unwrap();

        let err = catalog.resolve("gsd://templates/../templates-evil/x").unwrap_err();
        assert!(matches!(err, ServerError::AccessDenied));
    }

    #[test]
    fn malformed_uris() {
        let (_root, catalog) = fixture();
        assert!(matches!(
            catalog.resolve("file:///etc/passwd"),
            Err(ServerError::InvalidUri(_))
        ));
        assert!(matches!(catalog.resolve("gsd://"), Err(ServerError::InvalidUri(_))));
        assert!(matches!(
            catalog.resolve("gsd://templates/"),
            Err(ServerError::InvalidUri(_))
        ));
        assert!(matches!(
            catalog.resolve("gsd://scripts/install"),
            Err(ServerError::UnknownCategory(ref c)) if c == "scripts"
        ));
    }
}
