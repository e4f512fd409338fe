//! Terminal selection of the main system

use std::io::{self, BufRead, Write};

use c4izr::c4::{Candidate, SelectionProvider};
use c4izr::Result;
use crossterm::tty::IsTty;
use tracing::debug;

/// Returns true when stdin is attached to a terminal
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_tty()
}

/// Asks the user to pick a candidate by number
///
/// Enter or end of input selects the first candidate; anything that is not a
/// listed number asks again.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read answers from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn list(&mut self, candidates: &[Candidate]) -> io::Result<()> {
        writeln!(self.output, "Several elements could be the main system:")?;
        for (index, candidate) in candidates.iter().enumerate() {
            let name = candidate.label.lines().next().unwrap_or("");
            writeln!(
                self.output,
                "  {}. {} [{}] area {:.0}, {} connection(s)",
                index + 1,
                if name.is_empty() { candidate.id.as_str() } else { name },
                candidate.id,
                candidate.area,
                candidate.degree
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> SelectionProvider for TerminalPrompt<R, W> {
    fn select(&mut self, candidates: &[Candidate]) -> Result<usize> {
        self.list(candidates)?;

        loop {
            write!(
                self.output,
                "Select the main system [1-{}] (Enter for 1): ",
                candidates.len()
            )?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                writeln!(self.output)?;
                debug!("End of input, taking the first candidate");
                return Ok(0);
            }

            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(0);
            }
            match answer.parse::<usize>() {
                Ok(choice) if (1..=candidates.len()).contains(&choice) => return Ok(choice - 1),
                _ => writeln!(
                    self.output,
                    "Please enter a number between 1 and {}.",
                    candidates.len()
                )?,
            }
        }
    }
}
