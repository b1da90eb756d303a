//! Line diffs for verification failures, built on `similar`.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Delete,
    Insert,
}

/// One changed line. Line numbers are 1-based; a deleted line has no new
/// line number and an inserted line has no old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub text: String,
}

impl DiffLine {
    pub fn sign(&self) -> char {
        match self.kind {
            DiffKind::Delete => '-',
            DiffKind::Insert => '+',
        }
    }
}

/// Changed lines between `original` and `modified`, in document order.
pub fn line_diff(original: &str, modified: &str) -> Vec<DiffLine> {
    let diff = TextDiff::from_lines(original, modified);
    diff.iter_all_changes()
        .filter_map(|change| {
            let kind = match change.tag() {
                ChangeTag::Delete => DiffKind::Delete,
                ChangeTag::Insert => DiffKind::Insert,
                ChangeTag::Equal => return None,
            };
            Some(DiffLine {
                kind,
                old_line: change.old_index().map(|i| i + 1),
                new_line: change.new_index().map(|i| i + 1),
                text: change.value().trim_end_matches(['\n', '\r']).to_string(),
            })
        })
        .collect()
}

/// Unified-style rendering with `context` lines around each hunk.
pub fn unified(original: &str, modified: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();

    for (idx, group) in diff.grouped_ops(context).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                output.push_str(sign);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}
