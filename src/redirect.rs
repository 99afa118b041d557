//! Redirection token extraction, narrowed to the forms a job-control
//! pipeline actually has to reason about: `<` (stdin, first stage only),
//! `>`/`>>` (stdout, last stage only), and `2>&1` (merge stderr into
//! stdout, any stage). `pipeline_parser.rs` enforces stage placement;
//! this module only recognizes the tokens.

/// What a file descriptor should be connected to.
#[derive(Debug, Clone)]
pub enum RedirectTarget {
    /// Write to file (truncate)
    File(String),
    /// Write to file (append)
    FileAppend(String),
    /// Read from file
    FileRead(String),
    /// Duplicate another fd (only `2>&1` is produced)
    Fd(i32),
}

/// A single I/O redirection instruction.
#[derive(Debug, Clone)]
pub struct Redirection {
    pub fd: i32,
    pub target: RedirectTarget,
}

/// Separate redirect operators from regular arguments.
/// Returns (args, redirections) or an error message for syntax errors.
pub fn extract_redirections(tokens: &[String]) -> Result<(Vec<String>, Vec<Redirection>), String> {
    let mut args = Vec::new();
    let mut redirections = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if token == "2>&1" {
            redirections.push(Redirection { fd: 2, target: RedirectTarget::Fd(1) });
        } else if token == ">" {
            i += 1;
            let path = expect_filename(i, tokens, ">")?;
            redirections.push(Redirection { fd: 1, target: RedirectTarget::File(path) });
        } else if token == ">>" {
            i += 1;
            let path = expect_filename(i, tokens, ">>")?;
            redirections.push(Redirection { fd: 1, target: RedirectTarget::FileAppend(path) });
        } else if token == "<" {
            i += 1;
            let path = expect_filename(i, tokens, "<")?;
            redirections.push(Redirection { fd: 0, target: RedirectTarget::FileRead(path) });
        } else {
            args.push(token.clone());
        }

        i += 1;
    }

    Ok((args, redirections))
}

fn expect_filename(i: usize, tokens: &[String], operator: &str) -> Result<String, String> {
    if i < tokens.len() {
        Ok(tokens[i].clone())
    } else {
        Err(format!("jsh: syntax error: expected filename after '{operator}'"))
    }
}
