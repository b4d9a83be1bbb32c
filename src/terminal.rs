//! Console output with color support detection.

use std::io::{self, Write};

use console::Term;

pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";
const BELL: &str = "\x07";

/// Remove ANSI escape sequences while keeping line structure.
///
/// `strip-ansi-escapes` also drops control characters such as `\r`, so the
/// text is stripped one line segment at a time.
///
/// ```rust
/// use ffline::terminal::strip_escapes;
/// assert_eq!(strip_escapes("\x1b[33;1m 5%\x1b[0m eta=N/A\r"), " 5% eta=N/A\r");
/// assert_eq!(strip_escapes("a\r\n\x1b[31mb\x1b[0m\n"), "a\r\nb\n");
/// ```
pub fn strip_escapes(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for segment in text.split_inclusive(|c: char| c == '\r' || c == '\n') {
    let (body, end) = match segment.char_indices().last() {
      Some((i, c)) if c == '\r' || c == '\n' => segment.split_at(i),
      _ => (segment, ""),
    };
    out.push_str(&strip_ansi_escapes::strip_str(body));
    out.push_str(end);
  }
  out
}

/// Where rendered text goes. Escape sequences only reach interactive terminals.
pub struct Console<W: Write> {
  writer: W,
  is_term: bool,
}

impl Console<Term> {
  /// The display is written to stderr so the encoder's stdout can be piped.
  pub fn stderr() -> Self {
    let term = Term::stderr();
    let is_term = term.is_term();
    Self {
      writer: term,
      is_term,
    }
  }
}

impl<W: Write> Console<W> {
  pub fn new(writer: W, is_term: bool) -> Self {
    Self { writer, is_term }
  }

  pub fn is_term(&self) -> bool {
    self.is_term
  }

  pub fn print(&mut self, text: &str) -> io::Result<()> {
    if text.is_empty() {
      return Ok(());
    }
    match self.is_term {
      true => self.writer.write_all(text.as_bytes())?,
      false => self.writer.write_all(strip_escapes(text).as_bytes())?,
    }
    self.writer.flush()
  }

  pub fn hide_cursor(&mut self) -> io::Result<()> {
    self.print(HIDE_CURSOR)
  }

  pub fn show_cursor(&mut self) -> io::Result<()> {
    self.print(SHOW_CURSOR)
  }

  /// Audible notification, only on a terminal.
  pub fn bell(&mut self, mute: bool) -> io::Result<()> {
    if mute || !self.is_term {
      return Ok(());
    }
    self.print(BELL)
  }

  pub fn into_inner(self) -> W {
    self.writer
  }
}
