//! Splits a `list:` batch argument into words.
//!
//! Words are separated by spaces. Double quotes group words containing
//! spaces, and `""` inside quotes is a literal quote.

use std::{iter::Peekable, str::Chars};

/// ```rust
/// use ffline::word_iter::WordIter;
/// let words: Vec<String> = WordIter::new(r#"a.mkv  "b c.mkv" d.mkv"#).collect();
/// assert_eq!(words, ["a.mkv", "b c.mkv", "d.mkv"]);
/// ```
pub struct WordIter<'a> {
  chars: Peekable<Chars<'a>>,
}

impl<'a> WordIter<'a> {
  pub fn new(string: &'a str) -> Self {
    Self {
      chars: string.chars().peekable(),
    }
  }
}

impl<'a> Iterator for WordIter<'a> {
  type Item = String;

  fn next(&mut self) -> Option<Self::Item> {
    while self.chars.next_if_eq(&' ').is_some() {}
    self.chars.peek()?;

    let mut word = String::new();
    let mut quoted = false;
    while let Some(char) = self.chars.next() {
      match char {
        '"' if quoted => match self.chars.next_if_eq(&'"') {
          Some(_) => word.push('"'),
          None => quoted = false,
        },
        '"' => quoted = true,
        ' ' if !quoted => break,
        _ => word.push(char),
      }
    }
    Some(word)
  }
}
