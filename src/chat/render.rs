//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the session
//! can stream a reply without knowing where it is displayed.  The default
//! implementation writes to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};

use crate::transcript::{Role, Turn};

/// ANSI escape code for bold text (used for titles).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for captions).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print the page title and caption.
    fn print_title(&mut self, title: &str, caption: &str);

    /// Print a complete turn from the transcript.
    fn print_turn(&mut self, turn: &Turn);

    /// Called before the first fragment of a streamed reply.
    fn start_response(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.
    fn print_text(&mut self, text: &str);

    /// Called when a reply has been fully streamed.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Writing to stdout, errors go to stderr; with a caller-supplied writer,
/// errors go to that writer too.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    in_response: bool,
    errors_to_stderr: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            errors_to_stderr: true,
            ..Self::with_writer(io::stdout(), use_color)
        }
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            in_response: false,
            errors_to_stderr: false,
        }
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn label(&mut self, role: Role) {
        let (name, color) = match role {
            Role::User => ("You", ANSI_GREEN),
            Role::Assistant => ("Llama", ANSI_CYAN),
        };
        if self.use_color {
            let _ = write!(self.out, "{color}{name}:{ANSI_RESET} ");
        } else {
            let _ = write!(self.out, "{name}: ");
        }
    }

    fn end_response(&mut self) {
        if self.in_response {
            let _ = writeln!(self.out);
            self.in_response = false;
        }
    }

    /// Flushes to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_title(&mut self, title: &str, caption: &str) {
        if self.use_color {
            let _ = writeln!(self.out, "{ANSI_BOLD}{title}{ANSI_RESET}");
            let _ = writeln!(self.out, "{ANSI_DIM}{caption}{ANSI_RESET}\n");
        } else {
            let _ = writeln!(self.out, "{title}");
            let _ = writeln!(self.out, "{caption}\n");
        }
        self.flush();
    }

    fn print_turn(&mut self, turn: &Turn) {
        self.end_response();
        self.label(turn.role());
        let _ = writeln!(self.out, "{}", turn.content());
        self.flush();
    }

    fn start_response(&mut self) {
        self.end_response();
        self.label(Role::Assistant);
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_response();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_response();
        self.flush();
        let line = if self.use_color {
            format!("{ANSI_RED}Error:{ANSI_RESET} {error}")
        } else {
            format!("Error: {error}")
        };
        if self.errors_to_stderr {
            eprintln!("{line}");
        } else {
            let _ = writeln!(self.out, "{line}");
            self.flush();
        }
    }

    fn print_info(&mut self, info: &str) {
        self.end_response();
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }
}
