//! Removal of model reasoning blocks from replies.

use std::sync::LazyLock;

use regex::Regex;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>\s*").unwrap());

/// Strips `<think>...</think>` blocks and surrounding whitespace.
///
/// A reply that opens a block without closing it is cut at the opening tag.
pub fn strip_reasoning(reply: &str) -> String {
    let cleaned = THINK_BLOCK.replace_all(reply, "");
    let cleaned = match cleaned.find("<think>") {
        Some(open) => &cleaned[..open],
        None => &cleaned[..],
    };
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_blocks() {
        let reply = "<think>\nthe user wants a sum\n</think>\n\nADD(a, b)";
        assert_eq!(strip_reasoning(reply), "ADD(a, b)");
    }

    #[test]
    fn removes_several_blocks() {
        let reply = "<think>a</think>FORMULA <think>b</think>";
        assert_eq!(strip_reasoning(reply), "FORMULA");
    }

    #[test]
    fn unterminated_block_is_dropped() {
        assert_eq!(strip_reasoning("GENERAL <think>still going"), "GENERAL");
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(strip_reasoning("  IF(a, b, c) "), "IF(a, b, c)");
    }
}
