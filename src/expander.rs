use crate::parser::{Word, WordSegment};

/// Expand a list of parsed words into final argument strings.
/// Applies tilde, variable, and glob expansion according to quote context.
pub fn expand_words(words: &[Word], last_exit_code: i32) -> Vec<String> {
    let mut result = Vec::new();
    for word in words {
        result.extend(expand_word(word, last_exit_code));
    }
    result
}

/// Expand a single word (which may have mixed quoting) into one or more strings.
fn expand_word(segments: &[WordSegment], last_exit_code: i32) -> Vec<String> {
    let mut combined = String::new();
    let mut is_globbable = false;

    for segment in segments {
        match segment {
            WordSegment::SingleQuoted(text) => {
                // No expansion — everything literal
                combined.push_str(text);
            }
            WordSegment::DoubleQuoted(text) => {
                // Variable expansion only — no tilde, no glob
                let expanded = expand_variables(text, last_exit_code);
                combined.push_str(&expanded);
            }
            WordSegment::Unquoted(text) => {
                // Full expansion pipeline: tilde → variable → (mark for glob)
                let expanded = expand_tilde(text);
                let expanded = expand_variables(&expanded, last_exit_code);
                if contains_glob_chars(&expanded) {
                    is_globbable = true;
                }
                combined.push_str(&expanded);
            }
        }
    }

    if is_globbable {
        expand_globs(&combined)
    } else {
        vec![combined]
    }
}

// ── Tilde Expansion ──

fn expand_tilde(token: &str) -> String {
    if !token.starts_with('~') {
        return token.to_string();
    }

    let home = get_home_dir();

    if token == "~" {
        return home;
    }

    if token.starts_with("~/") || token.starts_with("~\\") {
        return format!("{home}{}", &token[1..]);
    }

    // ~username not supported yet — return as-is
    token.to_string()
}

fn get_home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| "~".to_string())
}

// ── Variable Expansion ──

fn expand_variables(input: &str, last_exit_code: i32) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        // Peek at what follows the $
        match chars.peek() {
            None => {
                // Trailing $ — literal
                result.push('$');
            }
            Some(&'?') => {
                chars.next();
                result.push_str(&last_exit_code.to_string());
            }
            Some(&'$') => {
                chars.next();
                result.push_str(&std::process::id().to_string());
            }
            Some(&'0') => {
                chars.next();
                result.push_str("jsh");
            }
            Some(&'{') => {
                chars.next(); // consume '{'
                let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
                if name.is_empty() {
                    result.push_str("${}");
                } else {
                    let value = std::env::var(&name).unwrap_or_default();
                    result.push_str(&value);
                }
            }
            Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                name.push(chars.next().unwrap());
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                let value = std::env::var(&name).unwrap_or_default();
                result.push_str(&value);
            }
            Some(_) => {
                // $ followed by something that's not a valid var start — literal $
                result.push('$');
            }
        }
    }

    result
}

// ── Glob Expansion ──

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

fn expand_globs(pattern: &str) -> Vec<String> {
    if !contains_glob_chars(pattern) {
        return vec![pattern.to_string()];
    }

    match glob::glob(pattern) {
        Ok(paths) => {
            let mut matches: Vec<String> = paths
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect();

            if matches.is_empty() {
                // No matches — bash keeps the pattern literal
                vec![pattern.to_string()]
            } else {
                matches.sort();
                matches
            }
        }
        Err(_) => vec![pattern.to_string()],
    }
}
