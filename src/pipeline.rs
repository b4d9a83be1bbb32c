//! Glue between the classifier, the session and the renderer.

use std::time::Instant;

use log::debug;

use crate::{
  classifier::Classifier,
  render::{render, RenderOptions},
  session::Session,
};

/// Processes the stderr lines of one encoder invocation.
///
/// ```rust
/// use ffline::{classifier::Classifier, patterns::Patterns, pipeline::Pipeline};
/// use std::time::Instant;
///
/// let classifier = Classifier::new(Patterns::new().unwrap());
/// let now = Instant::now();
/// let mut pipeline = Pipeline::new(&classifier, now, false, false);
/// let out = pipeline.feed("Output #0, mp4, to 'out.mp4':", now, false);
/// assert!(out.contains("OUTPUT 0:"));
/// ```
pub struct Pipeline<'a> {
  classifier: &'a Classifier,
  session: Session,
  options: RenderOptions,
  passthrough: bool,
}

impl<'a> Pipeline<'a> {
  pub fn new(
    classifier: &'a Classifier,
    started_at: Instant,
    passthrough: bool,
    batch_mode: bool,
  ) -> Self {
    Self {
      classifier,
      session: Session::new(started_at),
      options: RenderOptions { batch_mode },
      passthrough,
    }
  }

  /// Classify, transition and render a single logical line.
  /// Returns the text to write, possibly empty.
  pub fn feed(&mut self, line: &str, now: Instant, cancelled: bool) -> String {
    if self.passthrough {
      return format!("{}\n", line);
    }
    if line.is_empty() {
      return String::new();
    }

    let classified = self.classifier.classify(line, self.session.phase());
    let transition = self.session.transition(&classified, now, cancelled);
    if transition.changed() {
      debug!(
        "Phase {:?} -> {:?} on {:?}",
        transition.from,
        transition.to,
        classified.raw_log_message()
      );
    }
    render(&mut self.session, &classified, &transition, now, &self.options)
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn into_session(self) -> Session {
    self.session
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{event::Phase, patterns::Patterns};

  #[test]
  fn test_passthrough_is_verbatim() {
    let classifier = Classifier::new(Patterns::new().unwrap());
    let now = Instant::now();
    let mut pipeline = Pipeline::new(&classifier, now, true, false);
    for line in [
      "Error opening input",
      "frame=1 time=00:00:01.00 bitrate=1kbits/s speed=1x",
      "",
    ] {
      assert_eq!(pipeline.feed(line, now, false), format!("{}\n", line));
    }
    assert_eq!(pipeline.session().phase(), Phase::Idle);
  }

  #[test]
  fn test_empty_lines_are_skipped() {
    let classifier = Classifier::new(Patterns::new().unwrap());
    let now = Instant::now();
    let mut pipeline = Pipeline::new(&classifier, now, false, false);
    assert_eq!(pipeline.feed("", now, false), "");
  }
}
