//! Parsing of the classifier's tagged output.
//!
//! The language model answers with up to two sections, a note section tagged
//! `#記事` followed by a to-do section tagged `#待辦`. The split rule here is
//! a load-bearing contract with that loose format and is kept isolated from
//! any network code so it can be tested exhaustively.

/// Tag marking the note section of a completion.
pub const NOTE_TAG: &str = "#記事";

/// Tag marking the to-do section of a completion.
pub const TODO_TAG: &str = "#待辦";

/// The model's explicit "nothing to report" answer.
///
/// Distinct from an absent section: a stored field may hold this sentinel,
/// while an absent section is never written at all. Digests filter both.
pub const NO_DATA: &str = "沒有資料";

/// A completion split into its note and to-do sections.
///
/// Sections are positional: the first maps to the note, the second to the
/// to-do. A section that is missing, or empty once cleaned, is `None`. The
/// sentinel [`NO_DATA`] is preserved verbatim, never folded into `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassifiedText {
    pub note: Option<String>,
    pub todo: Option<String>,
}

impl ClassifiedText {
    /// Split a completion at every newline immediately followed by `#`, then
    /// clean each section: trim, strip one leading tag token, drop blank
    /// lines, trim again. Empty sections become `None`.
    pub fn parse(completion: &str) -> Self {
        let sections = split_sections(completion);
        Self {
            note: sections.first().and_then(|s| clean_section(s)),
            todo: sections.get(1).and_then(|s| clean_section(s)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.note.is_none() && self.todo.is_none()
    }
}

/// Cut the text before each `#` that directly follows a newline. The newline
/// itself is consumed; a `\r` ahead of it stays with the earlier section and
/// is trimmed later.
fn split_sections(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sections = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        if bytes[i] == b'\n' && bytes.get(i + 1) == Some(&b'#') {
            sections.push(&text[start..i]);
            start = i + 1;
        }
    }
    sections.push(&text[start..]);
    sections
}

fn clean_section(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let untagged = trimmed
        .strip_prefix(NOTE_TAG)
        .or_else(|| trimmed.strip_prefix(TODO_TAG))
        .unwrap_or(trimmed);

    let kept: Vec<&str> = untagged
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    let cleaned = kept.join("\n").trim().to_string();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
