//! Text normalization and sentence segmentation for read-aloud sessions.
//!
//! This is a plain linear scan, not a language-aware sentence splitter:
//! abbreviations, decimal numbers and quoted periods are not special-cased.

/// Delimiter that separates sentences in normalized text.
pub const SENTENCE_DELIMITER: &str = ". ";

fn is_speakable(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ' ' || matches!(c, '.' | ',' | '!' | '?' | '-')
}

/// Collapse whitespace runs to a single space, then drop every character
/// outside word characters, whitespace and `. , ! ? -`.
///
/// The result is not trimmed.
pub fn normalize(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    collapsed.retain(is_speakable);
    collapsed
}

/// Normalize `text` and split it on [`SENTENCE_DELIMITER`].
///
/// Blank segments are kept so that every segment owns a cursor slot.
pub fn segment(text: &str) -> Vec<String> {
    normalize(text)
        .split(SENTENCE_DELIMITER)
        .map(str::to_owned)
        .collect()
}

/// Whether a segment has nothing to speak.
pub fn is_blank(sentence: &str) -> bool {
    sentence.trim().is_empty()
}

/// Text submitted to the speech device for one sentence.
///
/// Splitting consumes the delimiter's period, so it is restored here unless
/// the sentence already ends in terminal punctuation.
pub fn utterance_text(sentence: &str) -> String {
    let trimmed = sentence.trim();
    let mut text = trimmed.to_owned();
    if !trimmed.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_keeps_trailing_blank_slot() {
        let sentences = segment("Hello world. This is a test. ");
        assert_eq!(sentences, vec!["Hello world", "This is a test", ""]);
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("one\n\n two\t\tthree"), "one two three");
        assert_eq!(normalize("  padded  "), " padded ");
    }

    #[test]
    fn test_normalize_strips_unspeakable_characters() {
        assert_eq!(
            normalize("Price: $5 (approx.) - \"quoted\" & more!"),
            "Price 5 approx. - quoted  more!"
        );
        assert_eq!(normalize("snake_case, ok? yes."), "snake_case, ok? yes.");
    }

    #[test]
    fn test_normalize_keeps_unicode_letters() {
        assert_eq!(normalize("Olá, café. Ünïcödé"), "Olá, café. Ünïcödé");
    }

    #[test]
    fn test_segment_rejoins_to_normalized_text() {
        let inputs = [
            "First sentence. Second one! Third? Fourth.",
            "A single line without delimiter",
            "Line\none. Line\ttwo. Line   three",
            "Weird #chars@ here. And (there).",
        ];

        for input in inputs {
            let joined = segment(input)
                .into_iter()
                .filter(|s| !is_blank(s))
                .collect::<Vec<_>>()
                .join(SENTENCE_DELIMITER);
            assert_eq!(joined, normalize(input), "input: {input:?}");
        }
    }

    #[test]
    fn test_segment_blank_only_text() {
        let sentences = segment(" . ");
        assert_eq!(sentences, vec![" ", ""]);
        assert!(sentences.iter().all(|s| is_blank(s)));
    }

    #[test]
    fn test_utterance_text_restores_period() {
        assert_eq!(utterance_text("Hello world"), "Hello world.");
        assert_eq!(utterance_text(" spaced "), "spaced.");
        assert_eq!(utterance_text("Done."), "Done.");
        assert_eq!(utterance_text("Really?"), "Really?");
        assert_eq!(utterance_text("Wow!"), "Wow!");
    }
}
