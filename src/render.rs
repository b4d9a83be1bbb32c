//! Turns classified lines into the text written to the console.
//!
//! Everything returned here may contain ANSI color codes; the console writer
//! strips them when the output is not a terminal. A returned string ending in
//! `\r` is an in-place progress line that the next line overwrites.

use std::time::Instant;

use console::measure_text_width;

use crate::{
  classifier::compact_progress,
  event::{ClassifiedLine, FfmpegProgress, Phase, Stream},
  session::{ProgressReport, ProgressSnapshot, Session, Transition, WarningVerdict},
  timecode::{seconds_to_timecode, trunc_pad, Align},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
  /// Classified errors are also kept in the transcript
  pub batch_mode: bool,
}

/// Render one classified line, updating the session's display state and
/// transcript on the way.
pub fn render(
  session: &mut Session,
  line: &ClassifiedLine,
  transition: &Transition,
  now: Instant,
  options: &RenderOptions,
) -> String {
  let rendered = match line {
    ClassifiedLine::StreamMappingHeader(raw) | ClassifiedLine::StreamMappingEntry(raw) => {
      format!("\x1b[30;1m  {}\x1b[0m\n", raw.trim())
    }
    ClassifiedLine::InputHeader(input) => format!(
      "\x1b[32m  INPUT {}:\x1b[0m \x1b[32;1m{}\x1b[0m\n",
      input.index, input.from
    ),
    ClassifiedLine::OutputHeader(output) => format!(
      "\x1b[33m  OUTPUT {}:\x1b[0m \x1b[33;1m{}\x1b[0m\n",
      output.index, output.to
    ),
    ClassifiedLine::DurationHeader(duration) => format!("  {}\n", duration.text),
    ClassifiedLine::StreamHeader(stream) => render_stream(stream),
    ClassifiedLine::Error(raw) => {
      let entry = error_line(raw);
      if options.batch_mode {
        session.record(entry.clone());
      }
      format!("{}{}", flush(session), entry)
    }
    ClassifiedLine::Warning(warning) => match transition.warning {
      Some(WarningVerdict::Show) => {
        format!("{}     \x1b[33;1m{}\x1b[0m\n", flush(session), warning.text)
      }
      Some(WarningVerdict::ShowAndSuppress) => format!(
        "{}     \x1b[33;1m{}\x1b[0m\n     \x1b[33;1mOmitting further warnings: \x1b[33m{}\x1b[0m\n",
        flush(session),
        warning.text,
        warning.text
      ),
      Some(WarningVerdict::Suppressed) | None => String::new(),
    },
    ClassifiedLine::ProgressWithSpeed(progress) | ClassifiedLine::ProgressNoSpeed(progress) => {
      match transition.progress {
        Some(report) => render_progress(session, progress, &report),
        None => String::new(),
      }
    }
    ClassifiedLine::Suppressible(_) => String::new(),
    ClassifiedLine::FinishMarker(_) => render_finish(session, transition, now),
    ClassifiedLine::Unclassified(raw) => match transition.to {
      Phase::Encoding => {
        session.record_context(context_header);
        let entry = error_line(raw);
        session.record(entry.clone());
        format!("{}{}", flush(session), entry)
      }
      Phase::Finished | Phase::Interrupted => format!("\x1b[30;1m{}\x1b[0m\n", raw.trim_end()),
      Phase::Idle | Phase::MappingStreams => String::new(),
    },
  };

  session.set_last_rendered(&rendered);
  rendered
}

fn render_stream(stream: &Stream) -> String {
  match stream.language.as_str() {
    "" => format!("    \x1b[36;1m{}\x1b[0m {}\n", stream.id, stream.description),
    language => format!(
      "    \x1b[36;1m{}\x1b[0m \x1b[30;1m{}\x1b[0m {}\n",
      stream.id, language, stream.description
    ),
  }
}

fn error_line(raw: &str) -> String {
  format!("     \x1b[31;1m{}\x1b[0m\n", raw.trim())
}

/// Moves off an in-place progress line so the next message gets its own line.
fn flush(session: &Session) -> &'static str {
  match session.in_place() {
    true => "\n",
    false => "",
  }
}

/// `" 42%"`, or `N/A` when the duration is unknown.
pub fn percent_label(percent: Option<u64>) -> String {
  match percent {
    Some(p) => format!("{}%", trunc_pad(&p.to_string(), 3, Align::Right)),
    None => "N/A".to_string(),
  }
}

fn context_header(progress: &ProgressSnapshot) -> String {
  format!(
    "\x1b[33;1m{}\x1b[0m time={}\n",
    percent_label(progress.percent),
    progress.time
  )
}

fn render_progress(
  session: &mut Session,
  progress: &FfmpegProgress,
  report: &ProgressReport,
) -> String {
  let mut text = compact_progress(&progress.raw_log_message);
  if report.derived {
    let speed = format!("speed={:.2}x", report.speed);
    text = match text.contains("speed=N/A") {
      true => text.replace("speed=N/A", &speed),
      false => format!("{} {}", text, speed),
    };
  }

  let eta = report
    .eta
    .map_or("N/A".to_string(), |eta| seconds_to_timecode(eta as f64));
  let mut line = format!(
    "\x1b[33;1m{}\x1b[0m eta={} {}",
    percent_label(report.percent),
    eta,
    text
  );

  if session.in_place() {
    let previous = measure_text_width(session.last_rendered().trim());
    let current = measure_text_width(&line);
    if current < previous {
      line.push_str(&" ".repeat(previous - current));
    }
  }
  line.push('\r');

  session.set_last_progress(ProgressSnapshot {
    percent: report.percent,
    time: progress.time.clone(),
    text,
  });
  line
}

fn render_finish(session: &Session, transition: &Transition, now: Instant) -> String {
  if !transition.changed() {
    return String::new();
  }

  let mut out = String::new();
  if session.in_place() {
    let width = measure_text_width(session.last_rendered().trim_end());
    out.push_str(&" ".repeat(width));
    out.push('\r');
  }

  let last = session.last_progress();
  let text = last.map_or("", |p| p.text.as_str());
  match transition.to {
    Phase::Interrupted => {
      let label = percent_label(last.and_then(|p| p.percent));
      out.push_str(&format!("\x1b[31;1m{}\x1b[0m {}\n", label, text));
      out.push_str("\x1b[31;1mInterrupted\x1b[0m\n");
    }
    _ => {
      let et = seconds_to_timecode(session.encoding_elapsed(now));
      out.push_str(&format!("\x1b[32;1m100%\x1b[0m et={} {}\n", et, text));
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{classifier::Classifier, patterns::Patterns};
  use std::time::Duration;

  struct Harness {
    classifier: Classifier,
    session: Session,
    options: RenderOptions,
    t0: Instant,
  }

  impl Harness {
    fn new(batch_mode: bool) -> Self {
      let t0 = Instant::now();
      Self {
        classifier: Classifier::new(Patterns::new().unwrap()),
        session: Session::new(t0),
        options: RenderOptions { batch_mode },
        t0,
      }
    }

    fn feed_at(&mut self, line: &str, secs: u64, cancelled: bool) -> String {
      let now = self.t0 + Duration::from_secs(secs);
      let classified = self.classifier.classify(line, self.session.phase());
      let transition = self.session.transition(&classified, now, cancelled);
      render(&mut self.session, &classified, &transition, now, &self.options)
    }

    fn feed(&mut self, line: &str) -> String {
      self.feed_at(line, 0, false)
    }
  }

  #[test]
  fn test_headers() {
    let mut h = Harness::new(false);
    assert_eq!(
      h.feed("Input #0, matroska,webm, from 'in.mkv':"),
      "\x1b[32m  INPUT 0:\x1b[0m \x1b[32;1min.mkv\x1b[0m\n"
    );
    assert_eq!(
      h.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s"),
      "  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s\n"
    );
    assert_eq!(
      h.feed("  Stream #0:0(eng): Video: h264"),
      "    \x1b[36;1m0:0\x1b[0m \x1b[30;1meng\x1b[0m Video: h264\n"
    );
    assert_eq!(h.feed("  Metadata:"), "");
  }

  #[test]
  fn test_progress_line() {
    let mut h = Harness::new(false);
    h.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s");
    let out =
      h.feed("frame=  100 fps= 25 time=00:00:40.00 bitrate=128.0kbits/s dup=0 drop=0 speed=2.0x");
    assert_eq!(
      out,
      "\x1b[33;1m 40%\x1b[0m eta=00:00:30 frame=100 fps=25 time=00:00:40.00 \
       bitrate=128.0kbits/s speed=2.0x\r"
    );
  }

  #[test]
  fn test_progress_unknown_duration() {
    let mut h = Harness::new(false);
    let out = h.feed("frame=1 time=00:00:01.00 bitrate=1kbits/s speed=1.0x");
    assert!(out.starts_with("\x1b[33;1mN/A\x1b[0m eta=N/A "));
  }

  #[test]
  fn test_shorter_progress_is_padded() {
    let mut h = Harness::new(false);
    let long = h.feed("frame=100000 fps=25 time=00:00:04.00 bitrate=99999.9kbits/s speed=1.0x");
    let short = h.feed("frame=1 time=00:00:05.00 bitrate=1kbits/s speed=1.0x");
    assert_eq!(
      measure_text_width(short.trim_end_matches('\r')),
      measure_text_width(long.trim())
    );
  }

  #[test]
  fn test_derived_speed_replaces_na() {
    let mut h = Harness::new(false);
    h.feed_at("size=0kB time=00:00:01.00 bitrate=N/A speed=N/A", 0, false);
    let out = h.feed_at("size=0kB time=00:00:05.00 bitrate=N/A speed=N/A", 2, false);
    assert!(out.contains("speed=2.00x"), "{:?}", out);
    assert!(!out.contains("speed=N/A"));
  }

  #[test]
  fn test_error_after_progress_starts_new_line() {
    let mut h = Harness::new(false);
    h.feed("frame=1 time=00:00:01.00 bitrate=1kbits/s speed=1.0x");
    let out = h.feed("Error while decoding stream #0:0");
    assert_eq!(out, "\n     \x1b[31;1mError while decoding stream #0:0\x1b[0m\n");
    // classified errors only enter the transcript in batch mode
    assert!(h.session.transcript().is_empty());
  }

  #[test]
  fn test_encoder_error_context_recorded_once() {
    let mut h = Harness::new(false);
    h.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s");
    h.feed("frame=1 time=00:00:10.00 bitrate=1kbits/s speed=1.0x");
    h.feed("[h264 @ 0x1] concealing 10 DC");
    h.feed("[h264 @ 0x1] concealing 11 DC");
    assert_eq!(
      h.session.transcript(),
      [
        "\x1b[33;1m 10%\x1b[0m time=00:00:10.00\n",
        "     \x1b[31;1m[h264 @ 0x1] concealing 10 DC\x1b[0m\n",
        "     \x1b[31;1m[h264 @ 0x1] concealing 11 DC\x1b[0m\n",
      ]
    );
  }

  #[test]
  fn test_warning_suppression_notice() {
    let mut h = Harness::new(false);
    let outputs: Vec<String> = (0..12)
      .map(|_| h.feed("[mp4 @ 0x1] Warning: something odd"))
      .collect();
    assert!(outputs[..9].iter().all(|o| !o.contains("Omitting")));
    assert!(outputs[9].contains("Omitting further warnings"));
    assert!(outputs[10].is_empty() && outputs[11].is_empty());
  }

  #[test]
  fn test_finish_summary() {
    let mut h = Harness::new(false);
    h.feed_at("frame=1 time=00:00:01.00 bitrate=1kbits/s speed=1.0x", 10, false);
    let out = h.feed_at(
      "video:1kB audio:0kB subtitle:0kB other streams:0kB global headers:0kB",
      75,
      false,
    );
    assert!(out.contains("\x1b[32;1m100%\x1b[0m et=00:01:05 frame=1"));
    assert!(out.starts_with(' '));
  }

  #[test]
  fn test_interrupted_summary() {
    let mut h = Harness::new(false);
    h.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s");
    h.feed_at("frame=1 time=00:00:25.00 bitrate=1kbits/s speed=1.0x", 1, true);
    let out = h.feed_at(
      "video:1kB audio:0kB subtitle:0kB other streams:0kB global headers:0kB",
      2,
      true,
    );
    assert!(!out.contains("100%"));
    assert!(out.contains("\x1b[31;1m 25%\x1b[0m frame=1"));
    assert!(out.ends_with("\x1b[31;1mInterrupted\x1b[0m\n"));
  }
}
