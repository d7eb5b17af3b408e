//! Unified line-diff rendering.
//!
//! The diff is computed between the pre- and post-rewrite text,
//! independent of the rewrite mechanism, so printing idiosyncrasies can
//! never corrupt the diff's meaning.

use std::path::Path;

use similar::TextDiff;

/// Render a unified diff with `a/` and `b/` headers for one file.
pub fn unified_diff(path: &Path, original: &str, rewritten: &str) -> String {
    let display = path.display().to_string();
    TextDiff::from_lines(original, rewritten)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{display}"), &format!("b/{display}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn diff_shows_changed_lines_with_headers() {
        let diff = unified_diff(
            &PathBuf::from("src/a.jsx"),
            "line one\nline two\n",
            "line one\nline 2\n",
        );
        assert!(diff.starts_with("--- a/src/a.jsx\n+++ b/src/a.jsx\n"));
        assert!(diff.contains("-line two"));
        assert!(diff.contains("+line 2"));
    }

    #[test]
    fn identical_text_produces_empty_diff_body() {
        let diff = unified_diff(&PathBuf::from("x"), "same\n", "same\n");
        assert!(!diff.contains('@'));
    }
}
