//! Two-pass per-file extraction.
//!
//! Pass 1 walks import declarations and produces `ImportBinding`s. Pass 2
//! walks JSX elements whose tag is a simple identifier and links them to the
//! file's bindings by local name. The import pass always completes before
//! the usage pass: usages resolve against a complete local import table.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ImportDeclarationSpecifier, JSXAttributeItem, JSXAttributeName, JSXAttributeValue,
    JSXElement, JSXElementName, JSXExpression, ModuleDeclaration, ModuleExportName, Program,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::binding::{ImportBinding, SpecifierKind};
use crate::error::{GraphError, Result};
use crate::node::{ByteSpan, NodeTable};
use crate::usage::{Lit, Prop, PropValue, UsageSite};

/// Restricts extraction to packages (and optionally components) named in a
/// rule file's `lookup` table. An empty component list tracks every symbol
/// the package exports.
#[derive(Debug, Clone, Default)]
pub struct TrackedLookup {
    packages: FxHashMap<String, Vec<String>>,
}

impl TrackedLookup {
    pub fn new(packages: FxHashMap<String, Vec<String>>) -> Self {
        Self { packages }
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Whether an imported symbol from `package` should be tracked.
    /// An empty lookup tracks everything.
    pub fn tracks(&self, package: &str, component: &str) -> bool {
        if self.packages.is_empty() {
            return true;
        }
        match self.packages.get(package) {
            Some(components) => components.is_empty() || components.iter().any(|c| c == component),
            None => false,
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Default)]
pub struct FileExtraction {
    pub imports: Vec<ImportBinding>,
    pub usages: Vec<UsageSite>,
    pub nodes: NodeTable,
}

/// Parse `text` and run both passes.
///
/// Returns `GraphError::Parse` when the file is syntactically invalid; the
/// caller decides whether that is fatal (it is not, in batched builds).
pub fn extract_file(path: &Path, text: &str, lookup: &TrackedLookup) -> Result<FileExtraction> {
    let allocator = Allocator::default();
    let source_type = source_type_for(path);
    let ret = Parser::new(&allocator, text, source_type).parse();

    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GraphError::Parse {
            path: path.to_path_buf(),
            message,
        });
    }

    let mut extraction = FileExtraction::default();

    // Pass 1: imports.
    let bindings = collect_imports(path, &ret.program, lookup, &mut extraction);
    debug!(file = %path.display(), bindings = bindings.len(), "import pass complete");

    // Pass 2: usages, resolved against the completed import table.
    let mut visitor = UsageVisitor {
        file: path,
        bindings: &bindings,
        extraction: &mut extraction,
    };
    visitor.visit_program(&ret.program);

    Ok(extraction)
}

/// Source type for a path, with JSX enabled for plain JavaScript since
/// React codebases routinely keep JSX in `.js` files.
fn source_type_for(path: &Path) -> SourceType {
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::jsx());
    if source_type.is_typescript() {
        source_type
    } else {
        source_type.with_jsx(true)
    }
}

/// Local name -> (component name, binding index) for pass 2.
type BindingTable = FxHashMap<String, (String, usize)>;

fn collect_imports(
    path: &Path,
    program: &Program<'_>,
    lookup: &TrackedLookup,
    extraction: &mut FileExtraction,
) -> BindingTable {
    let mut table: BindingTable = FxHashMap::default();

    for stmt in &program.body {
        let Some(ModuleDeclaration::ImportDeclaration(import)) = stmt.as_module_declaration()
        else {
            continue;
        };
        let Some(specifiers) = &import.specifiers else {
            // Side-effect import, nothing to bind.
            continue;
        };
        let package = import.source.value.to_string();
        let node = extraction.nodes.record(import.span);
        let source_span = ByteSpan::from(import.source.span);

        for specifier in specifiers {
            let (kind, imported_name, local_name) = match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    (SpecifierKind::Default, None, spec.local.name.to_string())
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    (SpecifierKind::Namespace, None, spec.local.name.to_string())
                }
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    let imported = match &spec.imported {
                        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
                        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
                        ModuleExportName::StringLiteral(_) => {
                            warn!(
                                file = %path.display(),
                                package,
                                "skipping string-named import specifier"
                            );
                            continue;
                        }
                    };
                    (SpecifierKind::Named, Some(imported), spec.local.name.to_string())
                }
            };

            let component = imported_name.clone().unwrap_or_else(|| local_name.clone());
            if !lookup.tracks(&package, &component) {
                continue;
            }

            let binding = ImportBinding {
                file: path.to_path_buf(),
                package: package.clone(),
                kind,
                imported_name,
                local_name: local_name.clone(),
                node,
                source_span,
            };
            // Last declaration wins, matching JavaScript shadowing.
            extraction.imports.push(binding);
            table.insert(local_name, (component, extraction.imports.len() - 1));
        }
    }

    table
}

struct UsageVisitor<'a> {
    file: &'a Path,
    bindings: &'a BindingTable,
    extraction: &'a mut FileExtraction,
}

impl<'a> UsageVisitor<'a> {
    fn extract_usage(&mut self, element: &JSXElement<'_>) {
        let opening = &element.opening_element;

        // Only simple identifier tags are rewritable; member-expression
        // tags are structurally ambiguous and skipped.
        let (tag, name_span) = match &opening.name {
            JSXElementName::Identifier(ident) => (ident.name.as_str(), ident.span),
            JSXElementName::IdentifierReference(ident) => (ident.name.as_str(), ident.span),
            _ => return,
        };

        let Some((component, binding_idx)) = self.bindings.get(tag).cloned() else {
            // Not a tracked component.
            return;
        };

        let mut props: FxHashMap<String, Prop> = FxHashMap::default();
        let mut prop_order: Vec<String> = Vec::new();
        let mut spreads: Vec<ByteSpan> = Vec::new();
        let mut attrs_end = name_span.end;

        for item in &opening.attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(ident) => ident.name.to_string(),
                        JSXAttributeName::NamespacedName(_) => {
                            attrs_end = attrs_end.max(attr.span.end);
                            continue;
                        }
                    };
                    let (value, value_span) = self.extract_value(attr.value.as_ref());
                    attrs_end = attrs_end.max(attr.span.end);
                    if !props.contains_key(&name) {
                        prop_order.push(name.clone());
                    }
                    props.insert(
                        name,
                        Prop {
                            value,
                            span: ByteSpan::from(attr.span),
                            value_span,
                        },
                    );
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    attrs_end = attrs_end.max(spread.span.end);
                    spreads.push(ByteSpan::from(spread.span));
                }
            }
        }

        let node = self.extraction.nodes.record(element.span());
        let self_closing = element.closing_element.is_none();
        let children_span = element
            .closing_element
            .as_ref()
            .map(|closing| ByteSpan::new(opening.span.end, closing.span.start));

        let import = self.extraction.imports[binding_idx].key();
        self.extraction.usages.push(UsageSite {
            file: self.file.to_path_buf(),
            import,
            component,
            props,
            prop_order,
            node,
            name_span: ByteSpan::from(name_span),
            attrs_end,
            children_span,
            self_closing,
            spreads,
        });
    }

    /// Valueless attribute -> `true`; literal values are interpreted;
    /// everything else is kept as an opaque reference for print-back.
    fn extract_value(
        &mut self,
        value: Option<&JSXAttributeValue<'_>>,
    ) -> (PropValue, Option<ByteSpan>) {
        let Some(value) = value else {
            return (PropValue::Literal(Lit::Bool(true)), None);
        };
        let span = ByteSpan::from(value.span());
        let prop_value = match value {
            JSXAttributeValue::StringLiteral(lit) => {
                PropValue::Literal(Lit::Str(lit.value.to_string()))
            }
            JSXAttributeValue::ExpressionContainer(container) => match &container.expression {
                JSXExpression::StringLiteral(lit) => {
                    PropValue::Literal(Lit::Str(lit.value.to_string()))
                }
                JSXExpression::NumericLiteral(lit) => PropValue::Literal(Lit::Num(lit.value)),
                JSXExpression::BooleanLiteral(lit) => PropValue::Literal(Lit::Bool(lit.value)),
                _ => PropValue::OpaqueExpr(self.extraction.nodes.record(container.span)),
            },
            _ => PropValue::OpaqueExpr(self.extraction.nodes.record(value.span())),
        };
        (prop_value, Some(span))
    }
}

impl<'a> Visit<'a> for UsageVisitor<'_> {
    fn visit_jsx_element(&mut self, element: &JSXElement<'a>) {
        self.extract_usage(element);
        walk::walk_jsx_element(self, element);
    }
}

/// Parse `text` without extraction, to confirm it is syntactically valid.
/// Used to vet rewritten output before it replaces the original.
pub fn reparses_cleanly(path: &Path, text: &str) -> bool {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, text, source_type_for(path)).parse();
    ret.errors.is_empty()
}
