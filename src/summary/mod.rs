// Summarization — turns a selected paper's abstract into a short digest blurb.

pub mod excerpt;
pub mod traits;

/// Input caps applied before any text reaches a summarizer.
pub const MAX_TITLE_LENGTH: usize = 300;
pub const MAX_ABSTRACT_LENGTH: usize = 3000;

/// Strip control characters (keeping newlines and tabs) and cap the length
/// in characters.
pub fn sanitize_input(text: &str, max_chars: usize) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(max_chars)
        .collect()
}
