mod ast;
mod builtins;
mod editor;
mod error;
mod expander;
mod global;
mod jobs;
mod launcher;
mod parser;
mod pipeline_parser;
mod reaper;
mod redirect;
mod repl;
mod siggate;
mod state;
mod termstate;

use std::io::{self, Write};
use std::sync::atomic::Ordering;

const USAGE: &str = "usage: jsh [-h]\n\njsh is an interactive job-control shell.\n";

fn main() {
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        if arg == "-h" || arg == "--help" {
            print!("{USAGE}");
            std::process::exit(0);
        }
    }

    // Outside raw mode (e.g. while a foreground job holds the terminal, or
    // on platforms where SIGINT still reaches the process during raw
    // mode), print the newline a terminal would otherwise swallow.
    ctrlc::set_handler(|| {
        if !editor::EDITOR_ACTIVE.load(Ordering::Relaxed) {
            println!();
            let _ = io::stdout().flush();
        }
    })
    .expect("failed to install Ctrl-C handler");

    let term = match termstate::TermState::init() {
        Ok(term) => term,
        Err(e) => {
            eprintln!("jsh: failed to initialize terminal/job control: {e}");
            std::process::exit(1);
        }
    };
    state::init(term);

    if let Err(e) = siggate::set_handler(libc::SIGCHLD, reaper::handle_sigchld) {
        eprintln!("jsh: failed to install SIGCHLD handler: {e}");
        std::process::exit(1);
    }

    let exit_code = repl::run();
    std::process::exit(exit_code);
}
