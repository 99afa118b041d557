//! Quote-aware tokenizer.
//!
//! Produces [`Word`]s rather than plain strings so that
//! [`crate::expander`] can tell which parts of a token were quoted (and
//! with which kind of quote) after the fact — `'$HOME'` and `$HOME` tokenize
//! to the same characters but must expand differently.

/// One contiguous run of a token contributed by a single quoting context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSegment {
    Unquoted(String),
    SingleQuoted(String),
    DoubleQuoted(String),
}

/// A token is a sequence of segments because quoting can change mid-word,
/// e.g. `foo"bar baz"qux` is one word made of an unquoted and a
/// double-quoted segment.
pub type Word = Vec<WordSegment>;

/// States for the tokenizer state machine.
enum State {
    /// Between tokens — whitespace is skipped
    Normal,
    /// Building an unquoted segment — whitespace ends the word
    InWord,
    /// Inside double quotes — whitespace is preserved
    InDoubleQuote,
    /// Inside single quotes — everything is literal
    InSingleQuote,
}

/// Tokenize a shell input line into a list of [`Word`]s.
///
/// Handles unquoted text, double/single quoting, and backslash escapes.
/// Fails if a quote is left open at end of input.
pub fn tokenize(input: &str) -> Result<Vec<Word>, String> {
    let mut words: Vec<Word> = Vec::new();
    let mut current_word: Word = Vec::new();
    let mut current_segment = String::new();
    let mut segment_is_quoted = false;
    let mut segment_quote_char = '"';
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    macro_rules! flush_segment {
        () => {
            if !current_segment.is_empty() || segment_is_quoted {
                let text = std::mem::take(&mut current_segment);
                let seg = if !segment_is_quoted {
                    WordSegment::Unquoted(text)
                } else if segment_quote_char == '"' {
                    WordSegment::DoubleQuoted(text)
                } else {
                    WordSegment::SingleQuoted(text)
                };
                current_word.push(seg);
                segment_is_quoted = false;
            }
        };
    }

    macro_rules! flush_word {
        () => {
            flush_segment!();
            if !current_word.is_empty() {
                words.push(std::mem::take(&mut current_word));
            }
        };
    }

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Normal, ' ' | '\t') => {}
            (State::Normal, '"') => {
                flush_segment!();
                segment_is_quoted = true;
                segment_quote_char = '"';
                state = State::InDoubleQuote;
            }
            (State::Normal, '\'') => {
                flush_segment!();
                segment_is_quoted = true;
                segment_quote_char = '\'';
                state = State::InSingleQuote;
            }
            (State::Normal, '\\') => {
                if let Some(next) = chars.next() {
                    current_segment.push(next);
                }
                state = State::InWord;
            }
            (State::Normal, c) => {
                current_segment.push(c);
                state = State::InWord;
            }

            (State::InWord, ' ' | '\t') => {
                flush_word!();
                state = State::Normal;
            }
            (State::InWord, '"') => {
                flush_segment!();
                segment_is_quoted = true;
                segment_quote_char = '"';
                state = State::InDoubleQuote;
            }
            (State::InWord, '\'') => {
                flush_segment!();
                segment_is_quoted = true;
                segment_quote_char = '\'';
                state = State::InSingleQuote;
            }
            (State::InWord, '\\') => {
                if let Some(next) = chars.next() {
                    current_segment.push(next);
                }
            }
            (State::InWord, c) => {
                current_segment.push(c);
            }

            (State::InDoubleQuote, '"') => {
                flush_segment!();
                state = State::InWord;
            }
            (State::InDoubleQuote, '\\') => match chars.peek() {
                Some(&'"' | &'\\' | &'$' | &'`') => {
                    current_segment.push(chars.next().unwrap());
                }
                _ => current_segment.push('\\'),
            },
            (State::InDoubleQuote, c) => current_segment.push(c),

            (State::InSingleQuote, '\'') => {
                flush_segment!();
                state = State::InWord;
            }
            (State::InSingleQuote, c) => current_segment.push(c),
        }
    }

    match state {
        State::InDoubleQuote => return Err("jsh: syntax error: unterminated \"".to_string()),
        State::InSingleQuote => return Err("jsh: syntax error: unterminated '".to_string()),
        _ => {}
    }

    flush_word!();
    Ok(words)
}

/// A word is an unquoted metacharacter token (`;`, `|`, `&`) if it is
/// exactly one unquoted segment matching that text. Quoting a
/// metacharacter (`";"`, `'|'`) makes it an ordinary argument, same as in
/// `sh`.
pub fn as_literal(word: &Word) -> Option<&str> {
    match word.as_slice() {
        [WordSegment::Unquoted(text)] => Some(text.as_str()),
        _ => None,
    }
}

pub fn is_metachar(word: &Word, text: &str) -> bool {
    as_literal(word) == Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(word: &Word) -> String {
        word.iter()
            .map(|seg| match seg {
                WordSegment::Unquoted(s) | WordSegment::SingleQuoted(s) | WordSegment::DoubleQuoted(s) => {
                    s.as_str()
                }
            })
            .collect()
    }

    fn flatten_all(words: &[Word]) -> Vec<String> {
        words.iter().map(flatten).collect()
    }

    #[test]
    fn simple_command() {
        let words = tokenize("echo hello world").unwrap();
        assert_eq!(flatten_all(&words), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn double_quotes_preserve_spaces() {
        let words = tokenize(r#"echo "hello   world""#).unwrap();
        assert_eq!(flatten_all(&words), vec!["echo", "hello   world"]);
        assert!(matches!(words[1].as_slice(), [WordSegment::DoubleQuoted(_)]));
    }

    #[test]
    fn single_quotes_preserve_spaces() {
        let words = tokenize("echo 'hello   world'").unwrap();
        assert_eq!(flatten_all(&words), vec!["echo", "hello   world"]);
        assert!(matches!(words[1].as_slice(), [WordSegment::SingleQuoted(_)]));
    }

    #[test]
    fn backslash_escapes_space() {
        let words = tokenize(r"echo hello\ world").unwrap();
        assert_eq!(flatten_all(&words), vec!["echo", "hello world"]);
    }

    #[test]
    fn mixed_quoting_in_one_word() {
        let words = tokenize(r#"he"llo wor"ld"#).unwrap();
        assert_eq!(flatten_all(&words), vec!["hello world"]);
        assert_eq!(words[0].len(), 3);
    }

    #[test]
    fn backslash_in_double_quotes() {
        let words = tokenize(r#""hello\\world""#).unwrap();
        assert_eq!(flatten_all(&words), vec![r"hello\world"]);

        let words = tokenize(r#""hello\"world""#).unwrap();
        assert_eq!(flatten_all(&words), vec![r#"hello"world"#]);
    }

    #[test]
    fn single_quotes_no_escaping() {
        let words = tokenize(r"'hello\nworld'").unwrap();
        assert_eq!(flatten_all(&words), vec![r"hello\nworld"]);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn unterminated_double_quote_is_error() {
        assert!(tokenize(r#"echo "hello"#).is_err());
    }

    #[test]
    fn unterminated_single_quote_is_error() {
        assert!(tokenize("echo 'hello").is_err());
    }

    #[test]
    fn metacharacters_are_separate_words() {
        let words = tokenize("cat file.txt | wc -l").unwrap();
        assert_eq!(flatten_all(&words), vec!["cat", "file.txt", "|", "wc", "-l"]);
        assert!(is_metachar(&words[2], "|"));
    }

    #[test]
    fn quoted_metachar_is_not_metachar() {
        let words = tokenize(r#"echo ";""#).unwrap();
        assert_eq!(flatten_all(&words), vec!["echo", ";"]);
        assert!(!is_metachar(&words[1], ";"));
    }
}
