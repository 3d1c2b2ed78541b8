// src/extractors/chunker.rs

/// A bounded slice of section text, sized to fit one spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Splits `text` into consecutive pieces of at most `max_length` characters.
///
/// Counts characters, not bytes, and never splits one. Joining the chunks in
/// order gives back `text` exactly. Empty input yields no chunks.
pub fn chunk(text: &str, max_length: usize) -> Vec<Chunk> {
    assert!(max_length > 0, "max_length must be positive");

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split_at = rest
            .char_indices()
            .nth(max_length)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split_at);
        chunks.push(Chunk { index: chunks.len(), text: head.to_string() });
        rest = tail;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn joined(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk("", 10).is_empty());
    }

    #[test]
    fn splits_on_exact_boundaries() {
        let chunks = chunk("abcdefghij", 4);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk("hallazgos", 32_000), vec![Chunk { index: 0, text: "hallazgos".to_string() }]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "évaluation — résultats, percepções";
        for max in [1, 2, 3, 7, 100] {
            let chunks = chunk(text, max);
            assert_eq!(joined(&chunks), text);
            assert!(chunks.iter().all(|c| c.text.chars().count() <= max));
            assert!(chunks.iter().all(|c| !c.text.is_empty()));
        }
        assert_eq!(chunk("ÉÉÉ", 2).len(), 2);
    }

    #[test]
    fn reassembles_multiline_text() {
        let text = "Finding one.\n\nFinding two.\r\nFinding three.\n";
        let chunks = chunk(text, 5);
        assert_eq!(joined(&chunks), text);
        assert_eq!(chunks.len(), (text.chars().count() + 4) / 5);
    }

    #[test]
    #[should_panic]
    fn zero_length_is_rejected() {
        chunk("abc", 0);
    }

    proptest! {
        #[test]
        fn chunks_reassemble_any_text(text in any::<String>(), max in 1usize..=64) {
            let chunks = chunk(&text, max);
            prop_assert_eq!(joined(&chunks), text.clone());
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.index, i);
                prop_assert!(!c.text.is_empty());
                prop_assert!(c.text.chars().count() <= max);
            }
            prop_assert_eq!(chunks.len(), (text.chars().count() + max - 1) / max);
        }

        #[test]
        fn empty_text_never_chunks(max in 1usize..=64) {
            prop_assert!(chunk("", max).is_empty());
        }
    }
}
