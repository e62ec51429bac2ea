//! Script splitting.

/// Fragments this short or shorter are dropped.
pub const MIN_SENTENCE_CHARS: usize = 5;

/// Split a script into ordered sentences.
///
/// Breaks after `.`, `!` or `?` when followed by whitespace, trims each piece
/// and drops fragments of [`MIN_SENTENCE_CHARS`] characters or fewer.
/// Abbreviations such as "e.g. this" are split too.
pub fn split_sentences(script: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = script.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_i, next)) = chars.peek() else {
            break;
        };
        if next.is_whitespace() {
            push_sentence(&mut sentences, &script[start..next_i]);
            start = next_i;
        }
    }
    push_sentence(&mut sentences, &script[start..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if piece.chars().count() > MIN_SENTENCE_CHARS {
        sentences.push(piece.to_string());
    }
}
