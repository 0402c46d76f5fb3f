//! Tempo dial on stdin.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use crate::pattern;
use crate::tempo::Tempo;

const HELP: &str = "commands: + / - (step), +N / -N, t (show tempo), l (list patterns), h (help)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Faster(u32),
    Slower(u32),
    Show,
    List,
    Help,
}

impl Command {
    pub fn parse(line: &str, step: u32) -> Option<Command> {
        match line.trim() {
            "+" => Some(Command::Faster(step)),
            "-" => Some(Command::Slower(step)),
            "t" => Some(Command::Show),
            "l" => Some(Command::List),
            "h" | "?" => Some(Command::Help),
            other => {
                if let Some(digits) = other.strip_prefix('+') {
                    digits.parse().ok().map(Command::Faster)
                } else {
                    other.strip_prefix('-')?.parse().ok().map(Command::Slower)
                }
            }
        }
    }
}

/// Handles commands until `input` runs out.
pub fn run<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    tempo: &Tempo,
    step: u32,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line, step) {
            Some(Command::Faster(step)) => {
                writeln!(output, "tempo: {} bpm", tempo.increase(step))?;
            }
            Some(Command::Slower(step)) => {
                writeln!(output, "tempo: {} bpm", tempo.decrease(step))?;
            }
            Some(Command::Show) => writeln!(output, "tempo: {tempo} bpm")?,
            Some(Command::List) => {
                for name in pattern::names() {
                    writeln!(output, "  {name}")?;
                }
            }
            Some(Command::Help) | None => writeln!(output, "{HELP}")?,
        }
    }
    Ok(())
}

/// Runs the console on its own thread so a pending stdin read never holds up
/// shutdown.
pub fn spawn(tempo: Arc<Tempo>, step: u32) {
    thread::spawn(move || {
        let stdin = io::stdin();
        if let Err(e) = run(stdin.lock(), io::stdout(), &tempo, step) {
            log::warn!("tempo console stopped: {e}");
        }
    });
}
