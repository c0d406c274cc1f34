//! Interactive shell: a status line plus a confirm/exit input loop.
//!
//! All display and input state lives in the [`Console`] passed in; the table
//! code never sees it.  Every failed cycle is rendered as a message and the
//! user may confirm again to retry or exit.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::aspect::AspectRatio;
use crate::storage::Storage;
use crate::toggle::Toggler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Confirm,
    Exit,
}

/// Clear the screen and park the cursor on row 2, column 0.
pub const CLEAR_SEQUENCE: &str = "\x1b[2J\x1b[2;0H";

pub trait Console {
    /// Blank the display and return the cursor to the status line origin.
    fn clear(&mut self) -> io::Result<()>;
    fn status(&mut self, line: &str) -> io::Result<()>;
    /// Block until the next discrete input.  `None` means input is closed.
    fn next_event(&mut self) -> io::Result<Option<InputEvent>>;
}

// ── LineConsole ───────────────────────────────────────────────────────────────

/// Terminal stand-in for the pad: `a` confirms, `home` or `q` exits.
pub struct LineConsole<R, W> {
    input:  R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W { self.output }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn clear(&mut self) -> io::Result<()> {
        self.output.write_all(CLEAR_SEQUENCE.as_bytes())
    }

    fn status(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()
    }

    fn next_event(&mut self) -> io::Result<Option<InputEvent>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "a"                            => return Ok(Some(InputEvent::Confirm)),
                "home" | "q" | "quit" | "exit" => return Ok(Some(InputEvent::Exit)),
                other => debug!(input = other, "ignored"),
            }
        }
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

fn prompt<C: Console>(console: &mut C, known: Option<AspectRatio>) -> io::Result<()> {
    let label = known.map(AspectRatio::label).unwrap_or("unknown");
    console.status(&format!("Press A to toggle aspect ratio. Current value: {label}"))?;
    console.status("Press HOME to exit.")
}

fn failure<C: Console>(console: &mut C, err: &dyn std::fmt::Display) -> io::Result<()> {
    console.status(&format!("{err}\n Perhaps try again?"))
}

/// Run until the user exits or input closes.  Only console I/O errors
/// escape; every table failure is shown and the loop continues.
pub fn run<S: Storage, C: Console>(toggler: &Toggler<S>, console: &mut C) -> io::Result<()> {
    let mut known = match toggler.current() {
        Ok(snapshot) => Some(snapshot.ratio()),
        Err(e) => {
            failure(console, &e)?;
            None
        }
    };
    prompt(console, known)?;

    while let Some(event) = console.next_event()? {
        match event {
            InputEvent::Confirm => {
                console.clear()?;
                match toggler.toggle() {
                    Ok(outcome) => known = Some(outcome.ratio()),
                    Err(e) => failure(console, &e)?,
                }
                prompt(console, known)?;
            }
            InputEvent::Exit => break,
        }
    }
    Ok(())
}
