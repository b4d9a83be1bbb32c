/// Coarse position of a session in the encoder's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  MappingStreams,
  Encoding,
  Finished,
  Interrupted,
}

impl Phase {
  /// Finished and Interrupted accept no further transitions.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Phase::Finished | Phase::Interrupted)
  }
}

/// One logical stderr line, tagged with the category it was matched to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedLine {
  StreamMappingHeader(String),
  StreamMappingEntry(String),
  InputHeader(FfmpegInput),
  OutputHeader(FfmpegOutput),
  DurationHeader(FfmpegDuration),
  StreamHeader(Stream),
  Error(String),
  Warning(FfmpegWarning),
  ProgressWithSpeed(FfmpegProgress),
  ProgressNoSpeed(FfmpegProgress),
  Suppressible(String),
  FinishMarker(String),
  Unclassified(String),
}

impl ClassifiedLine {
  /// The line this classification was made from.
  pub fn raw_log_message(&self) -> &str {
    match self {
      ClassifiedLine::StreamMappingHeader(raw)
      | ClassifiedLine::StreamMappingEntry(raw)
      | ClassifiedLine::Error(raw)
      | ClassifiedLine::Suppressible(raw)
      | ClassifiedLine::FinishMarker(raw)
      | ClassifiedLine::Unclassified(raw) => raw,
      ClassifiedLine::InputHeader(x) => &x.raw_log_message,
      ClassifiedLine::OutputHeader(x) => &x.raw_log_message,
      ClassifiedLine::DurationHeader(x) => &x.raw_log_message,
      ClassifiedLine::StreamHeader(x) => &x.raw_log_message,
      ClassifiedLine::Warning(x) => &x.raw_log_message,
      ClassifiedLine::ProgressWithSpeed(x) | ClassifiedLine::ProgressNoSpeed(x) => {
        &x.raw_log_message
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegInput {
  pub index: u32,
  pub from: String,
  pub raw_log_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegOutput {
  pub index: u32,
  pub to: String,
  pub raw_log_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegDuration {
  /// `None` when FFmpeg reports `Duration: N/A`
  pub seconds: Option<f64>,
  /// Everything from `Duration:` to the end of the line
  pub text: String,
  pub raw_log_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
  /// `input:stream`, e.g. `0:1`
  pub id: String,
  /// Language tag such as `eng`, empty if absent
  pub language: String,
  /// The rest of the line, e.g. `Audio: aac (LC), 48000 Hz, stereo`
  pub description: String,
  pub raw_log_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegWarning {
  /// Warning text with per-run noise (context addresses, padding) removed.
  /// Used as the de-duplication key.
  pub text: String,
  pub raw_log_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegProgress {
  /// The raw time string in a format like `00:03:29.04`
  pub time: String,

  /// `time` in seconds, `0.0` when it could not be parsed
  pub elapsed: f64,

  /// Bitrate as printed, e.g. `838.9kbits/s` or `N/A`
  pub bitrate: String,

  pub drop: Option<u64>,
  pub dup: Option<u64>,

  /// Processing speed as a ratio of the input duration, when FFmpeg reports one
  ///
  /// - 1x is realtime
  /// - 2x means 2 seconds of input are processed in 1 second of wall clock time
  pub speed: Option<f64>,

  /// The line that this progress was parsed from
  pub raw_log_message: String,
}
