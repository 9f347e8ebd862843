//! First-occurrence status recovery from raw queue text.
//!
//! Commands are occasionally written with a second `status:` line appended
//! to the same mapping. The YAML loader keeps the last value, but the first
//! write is the authoritative one. This module rescans the raw text and
//! reports the first `status:` seen inside each `- id:` block.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Start of a record block: a top-level list item opening with `id:`.
static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^- id:").expect("BLOCK_START regex should compile"));

static ID_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^- id:\s*(\S+)").expect("ID_LINE regex should compile")
});

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*status:\s*(\S+)").expect("STATUS_LINE regex should compile")
});

/// Map each record id to the first `status:` value in its raw block.
///
/// Never fails. Text before the first `- id:` line is ignored, blocks
/// without a status line are left out, and an id repeated across blocks
/// takes the value from the later block.
pub fn first_status_by_id(raw: &str) -> HashMap<String, String> {
    let starts: Vec<usize> = BLOCK_START.find_iter(raw).map(|m| m.start()).collect();

    let mut statuses = HashMap::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(raw.len());
        let block = &raw[start..end];

        let Some(id) = ID_LINE.captures(block).and_then(|c| c.get(1)) else {
            continue;
        };
        if let Some(status) = STATUS_LINE.captures(block).and_then(|c| c.get(1)) {
            statuses.insert(
                unquote(id.as_str()).to_string(),
                unquote(status.as_str()).to_string(),
            );
        }
    }
    statuses
}

/// Strip one layer of matching quotes so `"done"` compares equal to the
/// loaded value `done`.
fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_status_wins_within_block() {
        let raw = "\
- id: cmd_001
  status: in_progress
  purpose: build the thing
  status: done
";
        let map = first_status_by_id(raw);
        assert_eq!(map.get("cmd_001").map(String::as_str), Some("in_progress"));
    }

    #[test]
    fn test_status_lookup_is_scoped_to_block() {
        let raw = "\
- id: cmd_001
  purpose: no status here
- id: cmd_002
  status: pending
";
        let map = first_status_by_id(raw);
        assert!(!map.contains_key("cmd_001"));
        assert_eq!(map.get("cmd_002").map(String::as_str), Some("pending"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_preamble_before_first_block_is_ignored() {
        let raw = "\
# header comment
status: stray
- id: cmd_010
  status: done
";
        let map = first_status_by_id(raw);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("cmd_010").map(String::as_str), Some("done"));
    }

    #[test]
    fn test_repeated_id_takes_later_block() {
        let raw = "\
- id: dup
  status: pending
- id: dup
  status: cancelled
";
        let map = first_status_by_id(raw);
        assert_eq!(map.get("dup").map(String::as_str), Some("cancelled"));
    }

    #[test]
    fn test_quoted_tokens_are_unquoted() {
        let raw = "- id: 'cmd_020'\n  status: \"qc_pass\"\n";
        let map = first_status_by_id(raw);
        assert_eq!(map.get("cmd_020").map(String::as_str), Some("qc_pass"));
    }

    #[test]
    fn test_malformed_input_yields_empty_map() {
        assert!(first_status_by_id("").is_empty());
        assert!(first_status_by_id("commands:\n  - id: nested\n    status: done\n").is_empty());
        assert!(first_status_by_id("- id:\n").is_empty());
        assert!(first_status_by_id(":::\n- - -\n\u{0}").is_empty());
    }

    #[test]
    fn test_unquote_leaves_lone_quote() {
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("'done"), "'done");
        assert_eq!(unquote("done"), "done");
    }
}
