//! Best-effort module preload
//!
//! Modules that no test ever loads would otherwise be missing from the
//! coverage report altogether. Walking each package tree and loading every
//! module once marks their load-time statements as covered. Loading itself is
//! the host's job ([`ModuleLoader`]); failures never stop the pass.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Stem of the file that stands for its package directory
pub const PACKAGE_INIT_STEM: &str = "__init__";

/// Module names that are never loaded
const SKIPPED_MODULES: &[&str] = &["setup"];

/// Why a module failed to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// The file turned out not to be a module of the package; not worth reporting
    NotAModule,
    /// Loading raised an error
    Failed(String),
}

/// Host capability that loads one module by dotted name
pub trait ModuleLoader {
    fn load(&mut self, module: &str) -> Result<(), LoadFailure>;
}

/// Outcome of a preload pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

/// List the dotted module names found under each package directory
///
/// A package `a.b` lives in `root/a/b`. Files with `extension` become modules;
/// `__init__.<ext>` names its own directory. Results are sorted and unique.
pub fn discover_modules(root: &Path, packages: &[String], extension: &str) -> Vec<String> {
    let mut modules = BTreeSet::new();

    for package in packages {
        let package_dir = package.split('.').fold(root.to_path_buf(), |dir, part| dir.join(part));
        if !package_dir.is_dir() {
            debug!(%package, dir = %package_dir.display(), "Package directory not found");
            continue;
        }

        for entry in WalkDir::new(&package_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            if let Some(module) = module_name(root, path)
                && !SKIPPED_MODULES.contains(&module.as_str())
            {
                modules.insert(module);
            }
        }
    }

    modules.into_iter().collect()
}

/// Dotted module name for a source file relative to `root`
fn module_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .parent()?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let stem = path.file_stem()?.to_str()?;
    if stem != PACKAGE_INIT_STEM {
        parts.push(stem.to_string());
    }

    if parts.is_empty() { None } else { Some(parts.join(".")) }
}

/// Load every module through `loader`, tolerating failures
pub fn preload_modules<L: ModuleLoader>(modules: &[String], loader: &mut L) -> PreloadReport {
    let mut report = PreloadReport::default();

    for module in modules {
        match loader.load(module) {
            Ok(()) => report.loaded.push(module.clone()),
            Err(LoadFailure::NotAModule) => {
                debug!(%module, "Not a module of its package, skipping");
                report.skipped.push(module.clone());
            }
            Err(LoadFailure::Failed(err)) => {
                let line = format!(
                    "WARNING, loading {} failed: {}. Ignoring it; it was loaded only to count its load-time \
                     statements as covered.",
                    module, err
                );
                warn!("{}", line);
                report.warnings.push(line);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    struct FakeLoader {
        outcomes: HashMap<String, LoadFailure>,
        calls: Vec<String>,
    }

    impl ModuleLoader for FakeLoader {
        fn load(&mut self, module: &str) -> Result<(), LoadFailure> {
            self.calls.push(module.to_string());
            match self.outcomes.get(module) {
                Some(failure) => Err(failure.clone()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_discover_modules() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg/__init__.py");
        touch(temp.path(), "pkg/core.py");
        touch(temp.path(), "pkg/sub/__init__.py");
        touch(temp.path(), "pkg/sub/util.py");
        touch(temp.path(), "pkg/README.txt");

        let modules = discover_modules(temp.path(), &["pkg".to_string()], "py");
        assert_eq!(modules, vec!["pkg", "pkg.core", "pkg.sub", "pkg.sub.util"]);
    }

    #[test]
    fn test_discover_dotted_package_and_dedup() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg/__init__.py");
        touch(temp.path(), "pkg/sub/__init__.py");
        touch(temp.path(), "pkg/sub/util.py");

        let packages = vec!["pkg".to_string(), "pkg.sub".to_string()];
        let modules = discover_modules(temp.path(), &packages, "py");
        assert_eq!(modules, vec!["pkg", "pkg.sub", "pkg.sub.util"]);
    }

    #[test]
    fn test_discover_missing_package() {
        let temp = TempDir::new().unwrap();
        assert!(discover_modules(temp.path(), &["ghost".to_string()], "py").is_empty());
    }

    #[test]
    fn test_only_top_level_setup_is_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "setup.py");
        assert_eq!(module_name(temp.path(), &temp.path().join("setup.py")).as_deref(), Some("setup"));

        touch(temp.path(), "pkg/setup.py");
        let modules = discover_modules(temp.path(), &["pkg".to_string()], "py");
        assert_eq!(modules, vec!["pkg.setup"]);
    }

    #[test]
    fn test_preload_tolerates_failures() {
        let modules: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut loader = FakeLoader {
            outcomes: HashMap::from([
                ("b".to_string(), LoadFailure::NotAModule),
                ("c".to_string(), LoadFailure::Failed("boom".to_string())),
            ]),
            calls: Vec::new(),
        };

        let report = preload_modules(&modules, &mut loader);
        assert_eq!(loader.calls, vec!["a", "b", "c"]);
        assert_eq!(report.loaded, vec!["a"]);
        assert_eq!(report.skipped, vec!["b"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("WARNING, loading c failed: boom"));
    }
}
