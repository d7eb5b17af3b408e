//! The usage graph: every import of a tracked package linked to every
//! structural usage of the imported symbol.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::binding::{ImportBinding, ImportKey};
use crate::node::NodeTable;
use crate::usage::UsageSite;

/// Per-project graph of import bindings and usage sites.
///
/// Rebuilt per migration run, never persisted. Building is idempotent:
/// identical file contents produce a set-equal graph.
#[derive(Debug, Clone, Default)]
pub struct UsageGraph {
    pub imports: Vec<ImportBinding>,
    pub usages: Vec<UsageSite>,
    /// Node span tables per file, addressed by the ids stored on bindings
    /// and usages.
    nodes: FxHashMap<PathBuf, NodeTable>,
    /// Raw text per file that contributed to the graph.
    sources: FxHashMap<PathBuf, String>,
}

impl UsageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one file's extraction results into the graph.
    ///
    /// Single-writer: the batched builder calls this on the coordinating
    /// task only, after a worker completes.
    pub fn merge_file(
        &mut self,
        path: PathBuf,
        source: String,
        nodes: NodeTable,
        imports: Vec<ImportBinding>,
        usages: Vec<UsageSite>,
    ) {
        self.imports.extend(imports);
        self.usages.extend(usages);
        self.nodes.insert(path.clone(), nodes);
        self.sources.insert(path, source);
    }

    pub fn nodes_for(&self, file: &Path) -> Option<&NodeTable> {
        self.nodes.get(file)
    }

    pub fn source_for(&self, file: &Path) -> Option<&str> {
        self.sources.get(file).map(String::as_str)
    }

    pub fn binding(&self, key: &ImportKey) -> Option<&ImportBinding> {
        // Last declaration wins, so scan from the back.
        self.imports
            .iter()
            .rev()
            .find(|b| b.file == key.file && b.local_name == key.local_name)
    }

    /// Usage sites belonging to one file, in extraction order.
    pub fn usages_in(&self, file: &Path) -> impl Iterator<Item = &UsageSite> {
        self.usages.iter().filter(move |u| u.file == file)
    }

    /// Bindings belonging to one file.
    pub fn imports_in(&self, file: &Path) -> impl Iterator<Item = &ImportBinding> {
        self.imports.iter().filter(move |b| b.file == file)
    }

    /// Files that contributed at least one binding or usage.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: FxHashSet<PathBuf> = FxHashSet::default();
        files.extend(self.imports.iter().map(|b| b.file.clone()));
        files.extend(self.usages.iter().map(|u| u.file.clone()));
        let mut files: Vec<_> = files.into_iter().collect();
        files.sort();
        files
    }

    /// Every usage's import key must resolve to a binding in this graph.
    pub fn check_integrity(&self) -> bool {
        self.usages.iter().all(|u| self.binding(&u.import).is_some())
    }

    /// Set-equality over imports and usages, ignoring extraction order.
    pub fn set_eq(&self, other: &UsageGraph) -> bool {
        let mut a = self.imports.clone();
        let mut b = other.imports.clone();
        a.sort();
        b.sort();
        if a != b {
            return false;
        }

        let mut a: Vec<_> = self.usages.iter().map(usage_sort_key).collect();
        let mut b: Vec<_> = other.usages.iter().map(usage_sort_key).collect();
        a.sort();
        b.sort();
        a == b
    }

    pub fn statistics(&self) -> GraphStatistics {
        let mut usages_per_component: FxHashMap<String, usize> = FxHashMap::default();
        for usage in &self.usages {
            *usages_per_component.entry(usage.component.clone()).or_default() += 1;
        }
        let mut imports_per_package: FxHashMap<String, usize> = FxHashMap::default();
        for binding in &self.imports {
            *imports_per_package.entry(binding.package.clone()).or_default() += 1;
        }
        GraphStatistics {
            file_count: self.sources.len(),
            import_count: self.imports.len(),
            usage_count: self.usages.len(),
            imports_per_package,
            usages_per_component,
        }
    }
}

fn usage_sort_key(u: &UsageSite) -> (PathBuf, u32, String, Vec<(String, String)>) {
    let mut props: Vec<(String, String)> = u
        .props
        .iter()
        .map(|(name, prop)| {
            let value = match &prop.value {
                crate::usage::PropValue::Literal(lit) => lit.canonical(),
                crate::usage::PropValue::OpaqueExpr(_) => {
                    format!("e:{}..{}", prop.span.start, prop.span.end)
                }
            };
            (name.clone(), value)
        })
        .collect();
    props.sort();
    (u.file.clone(), u.name_span.start, u.component.clone(), props)
}

/// Summary counts for reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStatistics {
    pub file_count: usize,
    pub import_count: usize,
    pub usage_count: usize,
    pub imports_per_package: FxHashMap<String, usize>,
    pub usages_per_component: FxHashMap<String, usize>,
}
