//! Telegram MarkdownV2 formatting
//!
//! Narration comes back as ordinary Markdown; Telegram rejects messages
//! whose reserved characters are not escaped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{1,6}\s*(.+)").expect("heading pattern"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));

static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\[\]\(\)~`>#+\-=|{}.!]").expect("reserved pattern"));

/// Convert Markdown to Telegram MarkdownV2.
///
/// Headings become `*UPPERCASE*` lines, `**bold**` becomes `*bold*`,
/// backticks are dropped and the remaining reserved characters
/// (`_ [ ] ( ) ~ > # + - = | { } . !`) are backslash-escaped.
pub fn format_for_telegram(markdown: &str) -> String {
    let text = HEADING_RE.replace_all(markdown, |caps: &Captures| format!("*{}*", caps[1].to_uppercase()));
    let text = BOLD_RE.replace_all(&text, "*${1}*");
    let text = text.replace('`', "");
    RESERVED_RE.replace_all(&text, r"\$0").into_owned()
}
