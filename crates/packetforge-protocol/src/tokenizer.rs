//! Splits a wire message into positional tokens.
//!
//! Tokens are separated by whitespace, with one exception: a run of
//! "dotted" words (a `.` with at least one character on each side), each
//! separated from the next by exactly one whitespace character, forms a
//! single token. That is what keeps a list of dot-joined sub-packets such
//! as `0.4903.5 2.340.0` in one positional slot.

/// One positional token of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Byte offset of the token in the message.
    pub start: usize,
    /// The token text, without surrounding whitespace.
    pub text: &'a str,
}

/// Tokenizes `text`.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let words = words(text);
    let mut tokens = Vec::with_capacity(words.len());

    let mut i = 0;
    while i < words.len() {
        let (start, mut end) = words[i];
        if is_dotted(&text[start..end]) {
            while let Some(&(next_start, next_end)) = words.get(i + 1) {
                let gap = &text[end..next_start];
                if gap.chars().count() != 1 || !is_dotted(&text[next_start..next_end]) {
                    break;
                }
                end = next_end;
                i += 1;
            }
        }
        tokens.push(Token {
            start,
            text: &text[start..end],
        });
        i += 1;
    }
    tokens
}

/// Byte ranges of maximal non-whitespace runs.
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut words = Vec::new();
    let mut start = None;
    for (pos, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((s, pos));
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, text.len()));
    }
    words
}

fn is_dotted(word: &str) -> bool {
    word.char_indices()
        .any(|(pos, c)| c == '.' && pos > 0 && pos + 1 < word.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<&str> {
        tokenize(text).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(texts("$Upgrade 3 1 0"), vec!["$Upgrade", "3", "1", "0"]);
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_dotted_runs_merge() {
        assert_eq!(
            texts("equip 5 0.4903.5 2.340.0 9"),
            vec!["equip", "5", "0.4903.5 2.340.0", "9"]
        );
    }

    #[test]
    fn test_dotted_runs_need_single_separator() {
        assert_eq!(texts("a 1.2  3.4"), vec!["a", "1.2", "3.4"]);
    }

    #[test]
    fn test_edge_dots_do_not_count() {
        assert_eq!(texts("say .hi there."), vec!["say", ".hi", "there."]);
        assert_eq!(texts("x 1.2 .5"), vec!["x", "1.2", ".5"]);
    }

    #[test]
    fn test_token_offsets() {
        let tokens = tokenize("say  hello world");
        assert_eq!(tokens[1].start, 5);
        assert_eq!(&"say  hello world"[tokens[2].start..], "world");
    }
}
