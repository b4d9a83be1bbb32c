use std::{
  ffi::OsStr,
  fmt, io,
  process::{Command, CommandArgs, Stdio},
};

use crate::{args::quote, child::EncodeChild};

/// A wrapper around [`std::process::Command`] for running the encoder with
/// its stderr captured for the progress display.
///
/// Stdin and stdout are inherited: FFmpeg's overwrite prompts can be answered
/// at the terminal, and piped output (`-f ... -`) reaches our own stdout.
pub struct EncodeCommand {
  inner: Command,
}

impl EncodeCommand {
  //// Generic option aliases
  //// https://ffmpeg.org/ffmpeg.html#Generic-options

  /// Suppress printing banner.
  ///
  /// All FFmpeg tools will normally show a copyright notice, build options and
  /// library versions. This option can be used to suppress printing this
  /// information.
  pub fn hide_banner(&mut self) -> &mut Self {
    self.arg("-hide_banner");
    self
  }

  //// Main option aliases
  //// https://ffmpeg.org/ffmpeg.html#Main-options

  /// Alias for `-i` argument, the input file path or URL.
  pub fn input<S: AsRef<str>>(&mut self, path_or_url: S) -> &mut Self {
    self.arg("-i");
    self.arg(path_or_url.as_ref());
    self
  }

  /// Alias for `-ss` argument.
  ///
  /// When used as an input option, seeks in this input file to position.
  pub fn seek<S: AsRef<str>>(&mut self, position: S) -> &mut Self {
    self.arg("-ss");
    self.arg(position.as_ref());
    self
  }

  /// Alias for `-t` argument.
  pub fn duration<S: AsRef<str>>(&mut self, duration: S) -> &mut Self {
    self.arg("-t");
    self.arg(duration.as_ref());
    self
  }

  //// `std::process::Command` passthrough methods

  /// Adds an argument to pass to the program.
  pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
    self.inner.arg(arg.as_ref());
    self
  }

  /// Adds multiple arguments to pass to the program.
  pub fn args<I, S>(&mut self, args: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    for arg in args {
      self.arg(arg.as_ref());
    }
    self
  }

  /// Returns the path to the program that will be run.
  pub fn get_program(&self) -> &OsStr {
    self.inner.get_program()
  }

  /// Returns an iterator of the arguments that will be passed to the program.
  pub fn get_args(&self) -> CommandArgs<'_> {
    self.inner.get_args()
  }

  /// Executes the command as a child process, returning a handle to it.
  pub fn spawn(&mut self) -> io::Result<EncodeChild> {
    self.inner.spawn().map(EncodeChild::from_inner)
  }

  /// The command line as shown before an encode starts, with arguments that
  /// contain spaces quoted.
  ///
  /// ```rust
  /// use ffline::command::EncodeCommand;
  /// let mut cmd = EncodeCommand::new_with_exe("ffmpeg");
  /// cmd.args(["-i", "my film.mkv", "out.mp4"]);
  /// assert_eq!(
  ///   cmd.display(),
  ///   "\x1b[36;1m> \x1b[30;1mffmpeg -i \"my film.mkv\" out.mp4\x1b[0m\n"
  /// );
  /// ```
  pub fn display(&self) -> String {
    let args: Vec<String> = self
      .get_args()
      .map(|arg| quote(&arg.to_string_lossy()))
      .collect();
    let program = quote(&self.get_program().to_string_lossy());
    let mut line = format!("\x1b[36;1m> \x1b[30;1m{}", program);
    for arg in args {
      line.push(' ');
      line.push_str(&arg);
    }
    line.push_str("\x1b[0m\n");
    line
  }

  //// Constructors

  /// A bare command for a specific executable; no arguments are added.
  pub fn new_with_exe<S: AsRef<OsStr>>(exe: S) -> Self {
    // Configure `Command`
    let mut inner = Command::new(&exe);
    inner.stdin(Stdio::inherit());
    inner.stderr(Stdio::piped());
    inner.stdout(Stdio::inherit());
    Self { inner }
  }

  /// Discard the encoder's stdout. Used by the probing workflows, which only
  /// care about stderr.
  pub fn null_stdout(&mut self) -> &mut Self {
    self.inner.stdout(Stdio::null());
    self
  }
}

impl fmt::Debug for EncodeCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.inner.fmt(f)
  }
}
