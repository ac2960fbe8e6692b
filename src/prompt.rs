//! Interactive collaborators: yes/no confirmation and the completion signal.

use std::io::{self, BufRead, Write};

/// Answers accepted as "yes", compared case-insensitively.
pub const AFFIRMATIVE_ANSWERS: [&str; 3] = ["yes", "y", "yeah"];

/// Whether a typed answer counts as affirmative.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE_ANSWERS.contains(&answer.as_str())
}

/// Asks the user a yes/no question. Blocks until answered.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Reads answers from a line-based reader, printing questions to a writer.
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if writeln!(self.output, "\n{}", question).and_then(|_| self.output.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "could not read confirmation; treating as no");
                false
            }
        }
    }
}

/// Confirmation backed by the terminal.
pub type StdinConfirm = LineConfirm<io::StdinLock<'static>, io::Stdout>;

impl StdinConfirm {
    pub fn stdin() -> Self {
        LineConfirm::new(io::stdin().lock(), io::stdout())
    }
}

/// Answers every question with the same response.
#[derive(Debug, Clone, Copy)]
pub struct AssumeAnswer(pub bool);

impl AssumeAnswer {
    pub const YES: Self = AssumeAnswer(true);
    pub const NO: Self = AssumeAnswer(false);
}

impl Confirm for AssumeAnswer {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "confirmation answered automatically");
        self.0
    }
}

/// Signals that a run has finished.
pub trait CompletionNotifier {
    fn notify(&self);
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl CompletionNotifier for TerminalBell {
    fn notify(&self) {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x07").and_then(|_| stdout.flush());
    }
}

pub struct SilentNotifier;

impl CompletionNotifier for SilentNotifier {
    fn notify(&self) {}
}
