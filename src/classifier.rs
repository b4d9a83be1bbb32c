//! Classification of FFmpeg stderr lines.
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! 1. while streams are being mapped, `->` entries belong to the mapping block
//! 2. the `Stream mapping:` header (only before encoding starts)
//! 3. `Input #N, ... from '<path>':`
//! 4. `Output #N, ... to '<path>':`
//! 5. `Duration: HH:MM:SS.ms`
//! 6. `Stream #N:M(lang): description`
//! 7. the error catalogue
//! 8. the warning catalogue
//! 9. progress with a reported `speed=<n>x`
//! 10. progress without one
//! 11. the `video:... global headers:` summary that ends an encode
//! 12. suppressible noise
//!
//! Anything else is [`ClassifiedLine::Unclassified`]; what that means depends on
//! the session phase and is decided by the renderer. The error catalogue
//! includes bare `Error`/`error`, which is why every structured header is
//! tried before it.

use crate::{
  event::{
    ClassifiedLine, FfmpegDuration, FfmpegInput, FfmpegOutput, FfmpegProgress, FfmpegWarning,
    Phase, Stream,
  },
  patterns::Patterns,
  timecode::{parse_time_str, timecode_to_seconds},
};

pub struct Classifier {
  patterns: Patterns,
}

impl Classifier {
  pub fn new(patterns: Patterns) -> Self {
    Self { patterns }
  }

  pub fn patterns(&self) -> &Patterns {
    &self.patterns
  }

  pub fn classify(&self, line: &str, phase: Phase) -> ClassifiedLine {
    let raw_log_message = line.to_string();
    let before_encoding = matches!(phase, Phase::Idle | Phase::MappingStreams);

    if phase == Phase::MappingStreams && is_mapping_entry(line) {
      return ClassifiedLine::StreamMappingEntry(raw_log_message);
    }
    if before_encoding && self.patterns.mapping_header.is_match(line) {
      return ClassifiedLine::StreamMappingHeader(raw_log_message);
    }

    if let Some(input) = try_parse_input(line) {
      ClassifiedLine::InputHeader(input)
    } else if let Some(output) = try_parse_output(line) {
      ClassifiedLine::OutputHeader(output)
    } else if let Some(duration) = try_parse_duration(line) {
      ClassifiedLine::DurationHeader(duration)
    } else if let Some(stream) = try_parse_stream(line) {
      ClassifiedLine::StreamHeader(stream)
    } else if self.patterns.errors.is_match(line) {
      ClassifiedLine::Error(raw_log_message)
    } else if self.patterns.warnings.is_match(line) {
      ClassifiedLine::Warning(FfmpegWarning {
        text: self.normalize_warning(line),
        raw_log_message,
      })
    } else if let Some(progress) = try_parse_progress(line) {
      match progress.speed {
        Some(_) => ClassifiedLine::ProgressWithSpeed(progress),
        None => ClassifiedLine::ProgressNoSpeed(progress),
      }
    } else if self.patterns.finished.is_match(line) {
      ClassifiedLine::FinishMarker(raw_log_message)
    } else if self.patterns.suppressible.is_match(line) {
      ClassifiedLine::Suppressible(raw_log_message)
    } else {
      ClassifiedLine::Unclassified(raw_log_message)
    }
  }

  /// Strip the per-run `@ 0x...` address from a `[context @ address]` prefix
  /// and collapse whitespace, so repeats of the same warning compare equal.
  fn normalize_warning(&self, line: &str) -> String {
    self
      .patterns
      .context_address
      .replace_all(line, "")
      .split_whitespace()
      .collect::<Vec<&str>>()
      .join(" ")
  }
}

/// Lines inside the `Stream mapping:` block carry a `->` arrow.
///
/// ```rust
/// use ffline::classifier::is_mapping_entry;
/// assert!(is_mapping_entry("  Stream #0:0 -> #0:0 (h264 (native) -> hevc (libx265))"));
/// assert!(!is_mapping_entry("Press [q] to stop, [?] for help"));
/// ```
pub fn is_mapping_entry(line: &str) -> bool {
  line.contains("->")
}

/// Parse an input section header, extracting its index and source.
///
/// ```rust
/// use ffline::classifier::try_parse_input;
/// let line = "Input #0, matroska,webm, from 'film.mkv':";
/// let input = try_parse_input(line).unwrap();
/// assert_eq!(input.index, 0);
/// assert_eq!(input.from, "film.mkv");
/// ```
pub fn try_parse_input(string: &str) -> Option<FfmpegInput> {
  let raw_log_message = string.to_string();
  let string = string.trim().strip_prefix("Input #")?;

  let index = leading_index(string)?;

  let from = string
    .split_once(" from '")?
    .1
    .strip_suffix("':")?
    .to_string();

  Some(FfmpegInput {
    index,
    from,
    raw_log_message,
  })
}

/// Parse an output section header like the following, extracting its index
/// and destination:
///
/// ```rust
/// use ffline::classifier::try_parse_output;
/// let line = "Output #0, mp4, to 'test.mp4':";
/// let output = try_parse_output(line).unwrap();
/// assert_eq!(output.index, 0);
/// assert_eq!(output.to, "test.mp4");
/// ```
pub fn try_parse_output(string: &str) -> Option<FfmpegOutput> {
  let raw_log_message = string.to_string();
  let string = string.trim().strip_prefix("Output #")?;

  let index = leading_index(string)?;

  let to = string
    .split_once(" to '")?
    .1
    .strip_suffix("':")?
    .to_string();

  Some(FfmpegOutput {
    index,
    to,
    raw_log_message,
  })
}

/// `0, mp4, to ...` -> `0`
fn leading_index(string: &str) -> Option<u32> {
  string
    .split_whitespace()
    .next()
    .and_then(|s| s.split(',').next())
    .and_then(|s| s.parse::<u32>().ok())
}

/// ## Example:
///
/// ```rust
/// use ffline::classifier::try_parse_duration;
/// let line = "  Duration: 00:00:05.00, start: 0.000000, bitrate: 16 kb/s";
/// let duration = try_parse_duration(line).unwrap();
/// assert!(duration.seconds == Some(5.0));
/// assert!(duration.text == "Duration: 00:00:05.00, start: 0.000000, bitrate: 16 kb/s");
/// ```
///
/// ### Unknown duration
///
/// ```rust
/// use ffline::classifier::try_parse_duration;
/// let line = "  Duration: N/A, start: 0.000000, bitrate: N/A";
/// let duration = try_parse_duration(line).unwrap();
/// assert!(duration.seconds == None);
/// ```
pub fn try_parse_duration(string: &str) -> Option<FfmpegDuration> {
  let raw_log_message = string.to_string();
  let start = string.find("Duration: ")?;
  let text = string[start..].trim_end().to_string();

  let seconds = text
    .strip_prefix("Duration:")?
    .trim()
    .split(',')
    .next()
    .and_then(parse_time_str);

  Some(FfmpegDuration {
    seconds,
    text,
    raw_log_message,
  })
}

/// Parses a line that describes a stream.
///
/// ```rust
/// use ffline::classifier::try_parse_stream;
/// let line = "  Stream #0:1(eng): Audio: opus, 48000 Hz, stereo, fltp (default)";
/// let stream = try_parse_stream(line).unwrap();
/// assert_eq!(stream.id, "0:1");
/// assert_eq!(stream.language, "eng");
/// assert_eq!(stream.description, "Audio: opus, 48000 Hz, stereo, fltp (default)");
/// ```
///
/// Stream ids such as `0:2[0x3]` drop the bracketed part:
///
/// ```rust
/// use ffline::classifier::try_parse_stream;
/// let line = "    Stream #0:2[0x3](und): Data: bin_data (text / 0x74786574)";
/// let stream = try_parse_stream(line).unwrap();
/// assert_eq!(stream.id, "0:2");
/// assert_eq!(stream.language, "und");
/// ```
pub fn try_parse_stream(string: &str) -> Option<Stream> {
  let raw_log_message = string.to_string();

  let string = string.trim().strip_prefix("Stream #")?;
  let (head, description) = string.split_once(": ")?;

  // Remove everything inside and including square brackets
  let head = head
    .split(|c| c == '[' || c == ']')
    .step_by(2)
    .collect::<String>();
  let mut parenthesis_iter = head.split('(');
  let id = parenthesis_iter.next()?.trim().to_string();
  let language = parenthesis_iter
    .next()
    .map_or(String::new(), |lang| lang.trim_end_matches(')').to_string());

  let (parent, index) = id.split_once(':')?;
  parent.parse::<u32>().ok()?;
  index.parse::<u32>().ok()?;

  Some(Stream {
    id,
    language,
    description: description.trim().to_string(),
    raw_log_message,
  })
}

/// Parse a progress update line from ffmpeg. Requires `time=` and `bitrate=`;
/// every other field is optional.
///
/// ## Example
/// ```rust
/// use ffline::classifier::try_parse_progress;
/// let line = "frame= 1996 fps=1984 q=-1.0 Lsize=     372kB time=00:01:19.72 \
///   bitrate=  38.2kbits/s speed=79.2x";
/// let progress = try_parse_progress(line).unwrap();
/// assert!(progress.time == "00:01:19.72");
/// assert!((progress.elapsed - 79.72).abs() < 1e-9);
/// assert!(progress.bitrate == "38.2kbits/s");
/// assert!(progress.speed == Some(79.2));
/// ```
pub fn try_parse_progress(string: &str) -> Option<FfmpegProgress> {
  let raw_log_message = string.to_string();

  let time = field_value(string, "time=")?.to_string();
  let bitrate = field_value(string, "bitrate=")?.to_string();
  let elapsed = timecode_to_seconds(&time);
  let drop = field_value(string, "drop=").and_then(|s| s.parse::<u64>().ok());
  let dup = field_value(string, "dup=").and_then(|s| s.parse::<u64>().ok());
  let speed = field_value(string, "speed=")
    .and_then(|s| s.strip_suffix('x'))
    .and_then(|s| s.parse::<f64>().ok())
    .filter(|s| s.is_finite());

  Some(FfmpegProgress {
    time,
    elapsed,
    bitrate,
    drop,
    dup,
    speed,
    raw_log_message,
  })
}

/// The whitespace-delimited value following `key`, skipping FFmpeg's
/// alignment padding (`bitrate=  38.2kbits/s`).
fn field_value<'a>(string: &'a str, key: &str) -> Option<&'a str> {
  string.split(key).nth(1)?.split_whitespace().next()
}

/// Re-join `key=  value` pairs and drop zero `dup=`/`drop=` counters.
///
/// ```rust
/// use ffline::classifier::compact_progress;
/// let line = "frame=  100 fps= 25 q=28.0 size=    1024KiB time=00:00:04.00 \
///   bitrate=2097.2kbits/s dup=0 drop=3 speed=1.01x";
/// assert_eq!(
///   compact_progress(line),
///   "frame=100 fps=25 q=28.0 size=1024KiB time=00:00:04.00 \
///    bitrate=2097.2kbits/s drop=3 speed=1.01x"
/// );
/// ```
pub fn compact_progress(line: &str) -> String {
  let mut fields: Vec<String> = Vec::new();
  let mut pending: Option<&str> = None;
  for token in line.split_whitespace() {
    match pending.take() {
      Some(key) => fields.push(format!("{}{}", key, token)),
      None if token.ends_with('=') => pending = Some(token),
      None => fields.push(token.to_string()),
    }
  }
  if let Some(key) = pending {
    fields.push(key.to_string());
  }
  fields.retain(|f| f != "dup=0" && f != "drop=0");
  fields.join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn classifier() -> Classifier {
    Classifier::new(Patterns::new().unwrap())
  }

  #[test]
  fn test_duration_header_any_phase() {
    let c = classifier();
    for phase in [Phase::Idle, Phase::MappingStreams, Phase::Encoding] {
      match c.classify("Duration: 00:12:34.50", phase) {
        ClassifiedLine::DurationHeader(d) => assert_eq!(d.seconds, Some(754.5)),
        other => panic!("unexpected {:?}", other),
      }
    }
  }

  #[test]
  fn test_progress_with_speed() {
    let line = "frame=100 time=00:00:10.00 bitrate=128kbits/s speed=2.0x";
    match classifier().classify(line, Phase::Encoding) {
      ClassifiedLine::ProgressWithSpeed(p) => {
        assert_eq!(p.elapsed, 10.0);
        assert_eq!(p.speed, Some(2.0));
        assert_eq!(p.bitrate, "128kbits/s");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_progress_without_speed() {
    let c = classifier();
    for line in [
      "size=     256kB time=00:00:16.00 bitrate= 131.1kbits/s",
      "frame=    1 fps=0.0 q=0.0 size=       0kB time=00:00:00.04 bitrate=N/A speed=N/A",
    ] {
      assert!(matches!(
        c.classify(line, Phase::Encoding),
        ClassifiedLine::ProgressNoSpeed(_)
      ));
    }
  }

  #[test]
  fn test_progress_counters() {
    let p = try_parse_progress("frame=5 time=00:00:01.00 bitrate=1kbits/s dup=2 drop=0 speed=1x")
      .unwrap();
    assert_eq!(p.dup, Some(2));
    assert_eq!(p.drop, Some(0));
  }

  #[test]
  fn test_malformed_time_falls_back_to_zero() {
    let p = try_parse_progress("size=0kB time=N/A bitrate=N/A speed=N/A").unwrap();
    assert_eq!(p.elapsed, 0.0);
    assert_eq!(p.speed, None);
  }

  #[test]
  fn test_input_output_headers() {
    let c = classifier();
    match c.classify("Input #1, wav, from 'my error.wav':", Phase::Idle) {
      ClassifiedLine::InputHeader(i) => {
        assert_eq!(i.index, 1);
        assert_eq!(i.from, "my error.wav");
      }
      other => panic!("unexpected {:?}", other),
    }
    match c.classify("Output #0, matroska, to 'out.mkv':", Phase::Idle) {
      ClassifiedLine::OutputHeader(o) => assert_eq!(o.to, "out.mkv"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_stream_header_without_language() {
    let stream =
      try_parse_stream("  Stream #0:0: Video: h264 (High), yuv420p(progressive), 1920x1080")
        .unwrap();
    assert_eq!(stream.id, "0:0");
    assert_eq!(stream.language, "");
    assert!(stream.description.starts_with("Video: h264"));
  }

  #[test]
  fn test_mapping_entries_only_in_mapping_phase() {
    let c = classifier();
    let line = "  Stream #0:0 -> #0:0 (h264 (native) -> h264 (libx264))";
    assert!(matches!(
      c.classify(line, Phase::MappingStreams),
      ClassifiedLine::StreamMappingEntry(_)
    ));
    assert!(matches!(
      c.classify("Stream mapping:", Phase::Idle),
      ClassifiedLine::StreamMappingHeader(_)
    ));
    assert!(matches!(
      c.classify("Stream mapping:", Phase::Encoding),
      ClassifiedLine::Unclassified(_)
    ));
  }

  #[test]
  fn test_errors_precede_warnings() {
    let c = classifier();
    assert!(matches!(
      c.classify("[mp4 @ 0x1] Warning: codec not supported", Phase::Idle),
      ClassifiedLine::Error(_)
    ));
    assert!(matches!(
      c.classify("in.mkv: No such file or directory", Phase::Idle),
      ClassifiedLine::Error(_)
    ));
    assert!(matches!(
      c.classify("File 'out.mp4' already exists. Overwrite? [y/N] ", Phase::Idle),
      ClassifiedLine::Error(_)
    ));
  }

  #[test]
  fn test_warning_text_is_normalized() {
    let c = classifier();
    let a = c.classify(
      "[mp4 @ 0x55d5c0a1] Non-monotonous DTS in output stream 0:1",
      Phase::Encoding,
    );
    let b = c.classify(
      "[mp4 @ 0x7f00beef]  Non-monotonous DTS in output stream 0:1",
      Phase::Encoding,
    );
    match (a, b) {
      (ClassifiedLine::Warning(a), ClassifiedLine::Warning(b)) => {
        assert_eq!(a.text, b.text);
        assert_eq!(a.text, "[mp4] Non-monotonous DTS in output stream 0:1");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_finish_and_suppressible() {
    let c = classifier();
    assert!(matches!(
      c.classify(
        "video:2048kB audio:512kB subtitle:0kB other streams:0kB \
         global headers:0kB muxing overhead: 0.9%",
        Phase::Encoding
      ),
      ClassifiedLine::FinishMarker(_)
    ));
    assert!(matches!(
      c.classify("Press [q] to stop, [?] for help", Phase::Idle),
      ClassifiedLine::Suppressible(_)
    ));
    assert!(matches!(
      c.classify("    Last message repeated 3 times", Phase::Encoding),
      ClassifiedLine::Suppressible(_)
    ));
  }

  #[test]
  fn test_unclassified() {
    let c = classifier();
    assert!(matches!(
      c.classify("  Metadata:", Phase::Idle),
      ClassifiedLine::Unclassified(_)
    ));
    assert!(matches!(
      c.classify("[h264 @ 0x1] concealing 12 DC, 12 AC, 12 MV", Phase::Encoding),
      ClassifiedLine::Unclassified(_)
    ));
  }

  #[test]
  fn test_injected_catalogue() {
    let patterns = Patterns::with_catalogues(&["boom"], &[]).unwrap();
    let c = Classifier::new(patterns);
    assert!(matches!(c.classify("it went boom", Phase::Idle), ClassifiedLine::Error(_)));
    assert!(matches!(
      c.classify("Error opening file", Phase::Idle),
      ClassifiedLine::Unclassified(_)
    ));
  }
}
