//! Splits FFmpeg's stderr into logical lines.
//!
//! Line endings can be marked by several delimiters:
//! - `\r` not followed by `\n` (progress updates which overwrite the previous line)
//! - `\n` and `\r\n`
//! - the confirmation prompt `[y/N] `, which FFmpeg prints without a line
//!   break before blocking on stdin

use std::io::{BufRead, ErrorKind, Result};

/// Prompt FFmpeg prints when asking whether to overwrite an output.
pub const PROMPT_MARKER: &[u8] = b"[y/N] ";

/// A lazy iterator over the logical lines of a byte stream.
///
/// Lines never include their terminator. A `\r` that arrives at the very end
/// of a read is emitted immediately, so in-place progress updates are not
/// held back waiting for the next chunk; a `\n` arriving right after it is
/// then swallowed as part of the same `\r\n`.
///
/// ```rust
/// use ffline::line_splitter::LineSplitter;
/// use std::io::Cursor;
///
/// let stderr = Cursor::new("Input #0\nframe=1\rframe=2\r\nOverwrite? [y/N] ");
/// let lines: Vec<String> = LineSplitter::new(stderr).map(|l| l.unwrap()).collect();
/// assert_eq!(lines, ["Input #0", "frame=1", "frame=2", "Overwrite? [y/N] "]);
/// ```
pub struct LineSplitter<R: BufRead> {
  reader: R,
  buf: Vec<u8>,
  skip_lf: bool,
  eof: bool,
}

impl<R: BufRead> LineSplitter<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader,
      buf: Vec::new(),
      skip_lf: false,
      eof: false,
    }
  }

  /// Cut the next complete line out of the internal buffer, if there is one.
  fn take_line(&mut self) -> Option<String> {
    if self.skip_lf && !self.buf.is_empty() {
      if self.buf[0] == b'\n' {
        self.buf.remove(0);
      }
      self.skip_lf = false;
    }

    if let Some(i) = self.buf.iter().position(|&b| b == b'\r' || b == b'\n') {
      let mut advance = i + 1;
      if self.buf[i] == b'\r' {
        match self.buf.get(i + 1) {
          Some(b'\n') => advance = i + 2,
          Some(_) => {}
          None if !self.eof => self.skip_lf = true,
          None => {}
        }
      }
      let line = decode(&self.buf[..i]);
      self.buf.drain(..advance);
      return Some(line);
    }

    if let Some(i) = self
      .buf
      .windows(PROMPT_MARKER.len())
      .position(|w| w == PROMPT_MARKER)
    {
      let end = i + PROMPT_MARKER.len();
      let line = decode(&self.buf[..end]);
      self.buf.drain(..end);
      return Some(line);
    }

    None
  }

  /// Append the next chunk from the reader to the buffer.
  /// Also skips over interrupted reads.
  fn fill(&mut self) -> Result<()> {
    loop {
      let available = match self.reader.fill_buf() {
        Ok(n) => n,
        Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => return Err(e),
      };
      if available.is_empty() {
        self.eof = true;
        return Ok(());
      }
      self.buf.extend_from_slice(available);
      let used = available.len();
      self.reader.consume(used);
      return Ok(());
    }
  }
}

impl<R: BufRead> Iterator for LineSplitter<R> {
  type Item = Result<String>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(line) = self.take_line() {
        return Some(Ok(line));
      }
      if self.eof {
        if self.buf.is_empty() {
          return None;
        }
        let rest = std::mem::take(&mut self.buf);
        return Some(Ok(decode(drop_cr(&rest))));
      }
      if let Err(e) = self.fill() {
        self.eof = true;
        self.buf.clear();
        return Some(Err(e));
      }
    }
  }
}

fn drop_cr(data: &[u8]) -> &[u8] {
  data.strip_suffix(b"\r").unwrap_or(data)
}

fn decode(data: &[u8]) -> String {
  String::from_utf8_lossy(data).into_owned()
}
