//! Glob-based file discovery.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use path_clean::PathClean;
use tracing::debug;

use crate::error::{GraphError, Result};

/// List files under `cwd` matching `patterns`, minus `exclude` globs.
///
/// Returns absolute, cleaned paths. Patterns follow gitignore glob syntax
/// (`src/**/*.tsx`). Hidden files are included; `.gitignore` rules are not
/// applied, since migrations routinely target generated trees.
pub fn list_files(patterns: &[String], cwd: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut overrides = OverrideBuilder::new(cwd);
    for pattern in patterns {
        overrides
            .add(pattern)
            .map_err(|e| GraphError::Discovery(e.to_string()))?;
    }
    for pattern in exclude {
        // Leading `!` marks an exclusion in override syntax.
        overrides
            .add(&format!("!{pattern}"))
            .map_err(|e| GraphError::Discovery(e.to_string()))?;
    }
    let overrides = overrides
        .build()
        .map_err(|e| GraphError::Discovery(e.to_string()))?;

    let walker = WalkBuilder::new(cwd)
        .overrides(overrides)
        .standard_filters(false)
        .hidden(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| GraphError::Discovery(e.to_string()))?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.path().to_path_buf().clean());
        }
    }
    files.sort();
    debug!(count = files.len(), cwd = %cwd.display(), "discovered files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export {};\n").unwrap();
    }

    #[test]
    fn include_and_exclude_globs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/a.tsx");
        touch(dir.path(), "src/deep/b.jsx");
        touch(dir.path(), "src/deep/skip.test.tsx");
        touch(dir.path(), "dist/c.tsx");

        let files = list_files(
            &["src/**/*.tsx".into(), "src/**/*.jsx".into()],
            dir.path(),
            &["**/*.test.tsx".into()],
        )
        .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["src/a.tsx", "src/deep/b.jsx"]);
    }

    #[test]
    fn empty_pattern_list_matches_everything() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.js");
        let files = list_files(&[], dir.path(), &[]).unwrap();
        assert_eq!(files.len(), 1);
    }
}
