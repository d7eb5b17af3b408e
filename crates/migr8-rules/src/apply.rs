//! Rule application: turning matched usages into span edits, rewritten
//! text, and a reviewable diff.
//!
//! Deterministic order of operations on a matched usage's attributes:
//! remove, rename, set (replace or append), import repoint (once per file
//! per rule), then whole-subtree template replacement. All mutation is
//! span-based against the original text; the rewritten output must
//! re-parse cleanly or the whole file is rejected and the original stands.

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use migr8_graph::{ByteSpan, NodeTable, UsageSite, reparses_cleanly};

use crate::diff::unified_diff;
use crate::edit::{TextEdit, apply_edits, widen_over_leading_whitespace};
use crate::error::{Result, RuleError};
use crate::matcher::match_rule;
use crate::rule::{ReplaceTemplate, TransformationRule};

/// A usage paired with its resolved import information, as the graph
/// knows it.
#[derive(Debug, Clone, Copy)]
pub struct UsageContext<'a> {
    pub usage: &'a UsageSite,
    /// Package the usage's binding imports from.
    pub package: &'a str,
    /// Span of that import's source string literal, including quotes.
    pub import_source_span: ByteSpan,
}

/// Record of one rule applied to one usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRule {
    pub component: String,
    pub rule_order: i64,
    pub span: ByteSpan,
}

/// Outcome of rewriting one file.
#[derive(Debug, Clone)]
pub struct FileRewrite {
    pub rewritten: String,
    pub diff: String,
    pub applied: Vec<AppliedRule>,
}

/// Match and apply rules across every usage in one file.
///
/// Returns `Ok(None)` when no usage matched; the file is untouched and
/// excluded from the migration plan. Usages nested inside a replaced
/// subtree are skipped: the replacement keeps their text verbatim.
pub fn plan_file(
    path: &Path,
    text: &str,
    nodes: &NodeTable,
    usages: &[UsageContext<'_>],
    rules: &[TransformationRule],
) -> Result<Option<FileRewrite>> {
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut applied: Vec<AppliedRule> = Vec::new();
    // keyed by source-span start; dedups repointing across usages.
    let mut import_edits: FxHashMap<u32, (ByteSpan, String)> = FxHashMap::default();
    let mut replaced_spans: Vec<ByteSpan> = Vec::new();

    let mut ordered: Vec<&UsageContext<'_>> = usages.iter().collect();
    ordered.sort_by_key(|ctx| ctx.usage.name_span.start);

    for ctx in ordered {
        let usage = ctx.usage;
        let element_span = nodes
            .get(usage.node)
            .ok_or(RuleError::DanglingNode { node: usage.node })?;

        if replaced_spans
            .iter()
            .any(|outer| outer.start <= element_span.start && element_span.end <= outer.end)
        {
            warn!(
                file = %path.display(),
                component = %usage.component,
                "usage nested in a replaced subtree, left verbatim"
            );
            continue;
        }

        let Some(rule) = match_rule(usage, ctx.package, rules) else {
            continue;
        };

        if let (Some(from), Some(to)) = (&rule.import_from, &rule.import_to) {
            if ctx.package == from {
                import_edits
                    .entry(ctx.import_source_span.start)
                    .or_insert_with(|| (ctx.import_source_span, to.clone()));
            }
        }

        match &rule.replace_with {
            Some(template) => {
                let replacement = render_replacement(text, usage, rule, template);
                edits.push(TextEdit::replace(element_span, replacement));
                replaced_spans.push(element_span);
            }
            None => push_attr_edits(text, usage, rule, &mut edits),
        }

        applied.push(AppliedRule {
            component: usage.component.clone(),
            rule_order: rule.order,
            span: element_span,
        });
    }

    if applied.is_empty() && import_edits.is_empty() {
        return Ok(None);
    }

    for (span, to) in import_edits.into_values() {
        let quote = text[span.start as usize..].chars().next().unwrap_or('"');
        edits.push(TextEdit::replace(span, format!("{quote}{to}{quote}")));
    }

    let rewritten = apply_edits(text, edits)?;
    if !reparses_cleanly(path, &rewritten) {
        return Err(RuleError::RewriteUnparsable {
            path: path.to_path_buf(),
        });
    }

    let diff = unified_diff(path, text, &rewritten);
    Ok(Some(FileRewrite {
        rewritten,
        diff,
        applied,
    }))
}

/// Final attribute item after remove/rename/set, ready to render.
enum AttrItem {
    /// Original text survives byte for byte.
    Kept { span: ByteSpan },
    /// Rewritten in place (renamed or value replaced).
    Rewritten { span: ByteSpan, text: String },
    /// Appended by `set`.
    Added { text: String },
}

/// Compute the post-rule attribute list in source order, additions last.
///
/// `remove` matches original names; `rename` then renames survivors; `set`
/// replaces by post-rename name or appends.
fn compute_attr_items(
    text: &str,
    usage: &UsageSite,
    rule: &TransformationRule,
) -> Vec<(String, AttrItem)> {
    let mut consumed_sets: FxHashSet<String> = FxHashSet::default();
    // (sort key, name, item)
    let mut items: Vec<(u32, String, AttrItem)> = Vec::new();

    for name in &usage.prop_order {
        let Some(prop) = usage.prop(name) else { continue };
        if rule.remove.iter().any(|r| r == name) {
            continue;
        }
        let final_name = rule.rename.get(name).cloned().unwrap_or_else(|| name.clone());
        let item = if let Some(value) = rule.set.get(final_name.as_str()) {
            consumed_sets.insert(final_name.clone());
            AttrItem::Rewritten {
                span: prop.span,
                text: value.render(&final_name),
            }
        } else if final_name != *name {
            let rendered = match prop.value_span {
                Some(value_span) => format!("{final_name}={}", value_span.text(text)),
                None => final_name.clone(),
            };
            AttrItem::Rewritten {
                span: prop.span,
                text: rendered,
            }
        } else {
            AttrItem::Kept { span: prop.span }
        };
        items.push((prop.span.start, final_name, item));
    }

    for span in &usage.spreads {
        items.push((span.start, String::new(), AttrItem::Kept { span: *span }));
    }

    items.sort_by_key(|(start, _, _)| *start);

    let mut out: Vec<(String, AttrItem)> =
        items.into_iter().map(|(_, name, item)| (name, item)).collect();

    for (name, value) in &rule.set {
        if !consumed_sets.contains(name.as_str()) {
            out.push((
                name.clone(),
                AttrItem::Added {
                    text: value.render(name),
                },
            ));
        }
    }

    out
}

/// In-place attribute edits for a rule without `replaceWith`.
fn push_attr_edits(
    text: &str,
    usage: &UsageSite,
    rule: &TransformationRule,
    edits: &mut Vec<TextEdit>,
) {
    // `remove` may legally repeat a name; one delete per attribute.
    let mut removed: FxHashSet<&str> = FxHashSet::default();
    for name in &rule.remove {
        if !removed.insert(name.as_str()) {
            continue;
        }
        if let Some(prop) = usage.prop(name) {
            edits.push(TextEdit::delete(widen_over_leading_whitespace(
                text, prop.span,
            )));
        }
    }

    let mut additions: Vec<String> = Vec::new();
    for (_, item) in compute_attr_items(text, usage, rule) {
        match item {
            AttrItem::Kept { .. } => {}
            AttrItem::Rewritten { span, text } => edits.push(TextEdit::replace(span, text)),
            AttrItem::Added { text } => additions.push(text),
        }
    }
    if !additions.is_empty() {
        edits.push(TextEdit::insert(
            usage.attrs_end,
            format!(" {}", additions.join(" ")),
        ));
    }
}

/// Render a `replaceWith` template for one usage.
fn render_replacement(
    text: &str,
    usage: &UsageSite,
    rule: &TransformationRule,
    template: &ReplaceTemplate,
) -> String {
    let mut outer: Vec<String> = Vec::new();
    let mut inner: Vec<String> = Vec::new();

    for (name, item) in compute_attr_items(text, usage, rule) {
        let rendered = match item {
            AttrItem::Kept { span } => span.text(text).to_string(),
            AttrItem::Rewritten { text, .. } | AttrItem::Added { text } => text,
        };
        // Spreads have no addressable name and always stay outer.
        if !name.is_empty() && template.inner_props.iter().any(|p| *p == name) {
            inner.push(rendered);
        } else {
            outer.push(rendered);
        }
    }

    let children = usage
        .children_span
        .map(|span| span.text(text).to_string())
        .unwrap_or_default();

    let mut out = template.template.clone();
    out = substitute(&out, "{OUTER_PROPS}", &outer.join(" "));
    out = substitute(&out, "{INNER_PROPS}", &inner.join(" "));
    out = substitute(&out, "{CHILDREN}", &children);
    out
}

/// Placeholder substitution that swallows one leading space when the value
/// is empty, so `<Tag {OUTER_PROPS}>` collapses to `<Tag>`.
fn substitute(template: &str, placeholder: &str, value: &str) -> String {
    if value.is_empty() {
        template
            .replace(&format!(" {placeholder}"), "")
            .replace(placeholder, "")
    } else {
        template.replace(placeholder, value)
    }
}
