use std::{
  io,
  process::{Child, ChildStderr, ExitStatus},
};

/// A wrapper around [`std::process::Child`] for a running encoder.
pub struct EncodeChild {
  inner: Child,
}

impl EncodeChild {
  /// Takes ownership of the stderr pipe. Only the first call returns it.
  pub fn take_stderr(&mut self) -> Option<ChildStderr> {
    self.inner.stderr.take()
  }

  /// Waits for the child to exit completely, returning its exit status.
  pub fn wait(&mut self) -> io::Result<ExitStatus> {
    self.inner.wait()
  }

  /// Forcibly stops the child. An already exited child is not an error.
  pub fn kill(&mut self) -> io::Result<()> {
    match self.inner.try_wait()? {
      Some(_) => Ok(()),
      None => self.inner.kill(),
    }
  }

  /// Wrap a `std::process::Child`. The caller is responsible for having
  /// configured a piped stderr.
  pub(crate) fn from_inner(inner: Child) -> Self {
    Self { inner }
  }
}
