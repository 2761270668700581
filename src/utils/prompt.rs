//! Terminal stand-ins for the dialogs a media-center add-on would show:
//! yes/no confirmations, a text prompt, and a progress line.

use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Asks yes/no questions on the terminal.
pub struct Prompter {
    /// Answer "yes" to every confirmation without asking (`--yes`).
    pub assume_yes: bool,
}

impl Prompter {
    pub fn new(assume_yes: bool) -> Self {
        Prompter { assume_yes }
    }

    /// Shows `title` and `message` and waits for a yes/no answer.
    ///
    /// Anything other than `y`/`yes` (case-insensitive) counts as no, including
    /// end of input.
    pub fn confirm(&self, title: &str, message: &str) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        eprintln!("\n{}", title.bold().underline());
        eprintln!("{}", message);
        eprint!("{} ", "Proceed? [y/N]".bright_yellow());
        io::stderr().flush()?;

        let answer = read_line()?;
        Ok(is_yes(&answer))
    }

    /// Asks for a line of text; an empty answer returns `None`.
    pub fn ask(&self, question: &str) -> io::Result<Option<String>> {
        eprint!("{} ", question.bold());
        io::stderr().flush()?;
        let answer = read_line()?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}

fn read_line() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Receives progress updates from long-running operations.
pub trait Progress {
    /// Reports `percent` (0-100) complete with a short status message.
    fn update(&mut self, percent: u8, message: &str);

    /// Called once the operation is over, successful or not.
    fn finish(&mut self) {}
}

/// Ignores all progress updates.
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _percent: u8, _message: &str) {}
}

/// Redraws a single progress line on stderr.
pub struct TerminalProgress {
    title: String,
    drawn: bool,
}

impl TerminalProgress {
    pub fn new(title: &str) -> Self {
        TerminalProgress {
            title: title.to_string(),
            drawn: false,
        }
    }
}

impl Progress for TerminalProgress {
    fn update(&mut self, percent: u8, message: &str) {
        let percent = percent.min(100);
        // Long file names would wrap and break the `\r` redraw.
        let message: String = message.chars().take(60).collect();
        eprint!(
            "\r\x1b[2K{} [{:>3}%] {}",
            self.title.bright_cyan(),
            percent,
            message
        );
        let _ = io::stderr().flush();
        self.drawn = true;
    }

    fn finish(&mut self) {
        if self.drawn {
            eprintln!();
            self.drawn = false;
        }
    }
}

/// Percentage of `done` out of `total`, clamped to 0-100. A zero total counts as done.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
