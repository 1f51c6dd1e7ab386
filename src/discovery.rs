//! Project walk and pipeline driver.
//!
//! Walks the project tree once, extracts per-file facts in parallel,
//! then runs entity resolution, view/action mapping, correlation and
//! aggregation over the materialized fact lists. One file's parse
//! failure is a recorded warning, never an abort; the only terminal
//! condition is zero extractable facts, which still yields an (empty)
//! analysis carrying a warning.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::aggregate::{aggregate, Analysis, IdCounter};
use crate::component::analyze_source;
use crate::correlate::correlate;
use crate::entity::{resolve_entities, SCHEMA_PATH};
use crate::error::AnalyzeError;
use crate::facts::{ComponentFact, RouteFact};
use crate::route::{analyze_route, is_route_file};
use crate::view::map_component;

/// Directories never worth descending into.
const SKIP_DIRS: [&str; 7] = [
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    "out",
    "coverage",
];

const UI_EXTENSIONS: [&str; 2] = ["tsx", "jsx"];

/// Everything extracted from one project tree, before resolution.
#[derive(Debug, Default)]
pub struct ProjectFacts {
    pub components: Vec<ComponentFact>,
    pub routes: Vec<RouteFact>,
    pub schema_source: Option<String>,
    pub warnings: Vec<String>,
}

/// Runs the whole pipeline over a project root.
pub fn analyze_project(root: &Path) -> Result<Analysis, AnalyzeError> {
    let mut counter = IdCounter::new();
    analyze_project_with(root, &mut counter)
}

/// As [`analyze_project`], with a caller-owned id counter so consecutive
/// runs can share or reset id spaces explicitly.
pub fn analyze_project_with(root: &Path, counter: &mut IdCounter) -> Result<Analysis, AnalyzeError> {
    let facts = extract_facts(root)?;
    let mut warnings = facts.warnings.clone();

    if facts.components.is_empty() && facts.routes.is_empty() {
        warnings.push(format!(
            "no extractable facts under {}",
            root.display()
        ));
        return Ok(aggregate(
            counter,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Default::default(),
            warnings,
        ));
    }

    let resolution = resolve_entities(facts.schema_source.as_deref(), &facts.components);
    warnings.extend(resolution.errors.iter().map(|e| format!("schema: {e}")));

    let mut views = Vec::new();
    let mut actions = Vec::new();
    for component in &facts.components {
        if let Some((view, component_actions)) = map_component(component, &resolution.entities) {
            views.push(view);
            actions.extend(component_actions);
        }
    }

    let correlation = correlate(&facts.components, &facts.routes);
    debug!(
        components = facts.components.len(),
        routes = facts.routes.len(),
        entities = resolution.entities.len(),
        matches = correlation.matches.len(),
        "analysis complete"
    );

    Ok(aggregate(
        counter,
        resolution.entities,
        views,
        actions,
        facts.routes,
        correlation,
        warnings,
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FACT EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Walks the tree and extracts all per-file facts. Files are independent
/// so extraction runs in parallel; results are joined before any later
/// stage observes them.
pub fn extract_facts(root: &Path) -> Result<ProjectFacts, AnalyzeError> {
    if !root.exists() {
        return Err(AnalyzeError::Io {
            path: root.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "project root not found"),
        });
    }

    let files = collect_source_files(root);
    let mut facts = ProjectFacts::default();

    let results: Vec<FileFacts> = files
        .par_iter()
        .map(|path| extract_file(root, path))
        .collect();

    for result in results {
        match result {
            FileFacts::Component(fact) => facts.components.push(fact),
            FileFacts::Routes(routes) => facts.routes.extend(routes),
            FileFacts::NotUi => {}
            FileFacts::Warning(message) => {
                warn!("{message}");
                facts.warnings.push(message);
            }
        }
    }

    // Missing schema is a silent fallback, not a warning.
    let schema_path = root.join(SCHEMA_PATH);
    if schema_path.exists() {
        match fs::read_to_string(&schema_path) {
            Ok(source) => facts.schema_source = Some(source),
            Err(e) => facts
                .warnings
                .push(format!("failed to read {}: {e}", schema_path.display())),
        }
    }

    Ok(facts)
}

enum FileFacts {
    Component(ComponentFact),
    Routes(Vec<RouteFact>),
    NotUi,
    Warning(String),
}

fn extract_file(root: &Path, path: &Path) -> FileFacts {
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => return FileFacts::Warning(format!("failed to read {relative}: {e}")),
    };

    if is_route_file(&relative) {
        let routes = analyze_route(&relative, &source);
        if routes.is_empty() {
            return FileFacts::Warning(format!(
                "route file {relative} exports no recognized method handler"
            ));
        }
        return FileFacts::Routes(routes);
    }

    match analyze_source(&relative, &source) {
        Ok(Some(fact)) => FileFacts::Component(fact),
        Ok(None) => FileFacts::NotUi,
        Err(e) => FileFacts::Warning(format!("failed to parse {relative}: {e}")),
    }
}

fn collect_source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !SKIP_DIRS.contains(&name))
                .unwrap_or(true)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let path = entry.path();
            let is_ui = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| UI_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            is_ui || is_route_file(&path.to_string_lossy())
        })
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn walk_skips_vendored_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/page.tsx", "export default function Home() { return <div/>; }");
        write(
            dir.path(),
            "node_modules/lib/index.tsx",
            "export default function X() { return <div/>; }",
        );

        let files = collect_source_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app/page.tsx"));
    }

    #[test]
    fn empty_project_yields_empty_analysis_with_warning() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "hello");

        let analysis = analyze_project(dir.path()).unwrap();
        assert!(analysis.items.is_empty());
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("no extractable facts"));
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let err = analyze_project(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, AnalyzeError::Io { .. }));
    }

    #[test]
    fn empty_route_file_is_a_warning_not_an_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/api/misc/route.ts", "export const runtime = 'edge';");
        write(
            dir.path(),
            "app/page.tsx",
            "export default function Home() { return <div>hi</div>; }",
        );

        let analysis = analyze_project(dir.path()).unwrap();
        assert!(analysis
            .warnings
            .iter()
            .any(|w| w.contains("no recognized method handler")));
        assert!(analysis.routes.is_empty());
    }
}
