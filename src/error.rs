use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::io;
use std::result::Result as StdResult;

/// Shorthand alias for `Result<T, Error>` using the `ffline` error type.
pub type Result<T> = StdResult<T, Error>;

/// A generic error type for the `ffline` crate.
///
/// Only failures that abort a whole invocation end up here: spawning the
/// encoder, reading a batch list, writing a log file. Lines that fail to parse
/// fall back to sentinel values instead.
#[derive(Debug)]
pub struct Error {
  pub message: String,
  pub source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl StdError for Error {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    self
      .source
      .as_deref()
      .map(|e| e as &(dyn StdError + 'static))
  }
}

impl Error {
  /// Wrap any standard Error into a library Error.
  pub fn from_std<E>(e: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    Error {
      message: e.to_string(),
      source: Some(Box::new(e)),
    }
  }

  /// Wrap any Display into a library Error.
  pub fn from_display<E>(e: E) -> Self
  where
    E: Display,
  {
    Error {
      message: e.to_string(),
      source: None,
    }
  }

  /// Create an error message from a string.
  pub fn msg<S: AsRef<str>>(message: S) -> Self {
    Error {
      message: message.as_ref().to_string(),
      source: None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(e: io::Error) -> Self {
    Error::from_std(e)
  }
}

impl From<regex::Error> for Error {
  fn from(e: regex::Error) -> Self {
    Error::from_std(e)
  }
}

impl From<glob::PatternError> for Error {
  fn from(e: glob::PatternError) -> Self {
    Error::from_std(e)
  }
}

impl From<glob::GlobError> for Error {
  fn from(e: glob::GlobError) -> Self {
    Error::from_std(e)
  }
}

#[cfg(feature = "check_update")]
impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Error::from_std(e)
  }
}

impl From<&str> for Error {
  fn from(e: &str) -> Self {
    Error::from_display(e)
  }
}

impl From<String> for Error {
  fn from(e: String) -> Self {
    Error::from_display(e)
  }
}
