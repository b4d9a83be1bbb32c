//! State carried across the lines of one encoder invocation.

use std::{
  collections::{HashMap, HashSet, VecDeque},
  time::Instant,
};

use crate::{
  event::{ClassifiedLine, FfmpegProgress, Phase},
  timecode::round,
};

/// Number of recent speed samples averaged for the ETA.
pub const SPEED_WINDOW: usize = 30;

/// How many times one warning text is shown before it is silenced.
pub const WARNING_LIMIT: u32 = 10;

/// Rolling window of the most recent speed multipliers.
///
/// ```rust
/// use ffline::session::SpeedWindow;
/// let mut window = SpeedWindow::new();
/// assert_eq!(window.mean(), None);
/// window.push(1.0);
/// window.push(3.0);
/// assert_eq!(window.mean(), Some(2.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpeedWindow {
  samples: VecDeque<f64>,
}

impl SpeedWindow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, speed: f64) {
    if self.samples.len() == SPEED_WINDOW {
      self.samples.pop_front();
    }
    self.samples.push_back(speed);
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn mean(&self) -> Option<f64> {
    if self.samples.is_empty() {
      return None;
    }
    Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningVerdict {
  Show,
  /// Show this occurrence, then announce that further ones are omitted.
  ShowAndSuppress,
  Suppressed,
}

/// Counts warning texts and silences each one after [`WARNING_LIMIT`] showings.
#[derive(Debug, Default)]
pub struct WarningFilter {
  counts: HashMap<String, u32>,
  suppressed: HashSet<String>,
}

impl WarningFilter {
  pub fn check(&mut self, text: &str) -> WarningVerdict {
    if self.suppressed.contains(text) {
      return WarningVerdict::Suppressed;
    }
    let count = self.counts.entry(text.to_string()).or_insert(0);
    *count += 1;
    if *count >= WARNING_LIMIT {
      self.suppressed.insert(text.to_string());
      WarningVerdict::ShowAndSuppress
    } else {
      WarningVerdict::Show
    }
  }

  pub fn should_suppress(&self, text: &str) -> bool {
    self.suppressed.contains(text)
  }
}

/// Whole percent of `elapsed` in `duration`. `None` when the duration is
/// unknown or zero.
///
/// ```rust
/// use ffline::session::percent;
/// assert_eq!(percent(Some(200.0), 50.0), Some(25));
/// assert_eq!(percent(Some(0.0), 50.0), None);
/// ```
pub fn percent(duration: Option<f64>, elapsed: f64) -> Option<u64> {
  let duration = duration.filter(|d| *d > 0.0)?;
  Some((elapsed / (duration / 100.0)).max(0.0).floor() as u64)
}

/// Remaining wall-clock seconds at the given mean speed.
/// `None` when either the duration or the speed is unknown or zero.
pub fn eta(duration: Option<f64>, elapsed: f64, mean_speed: Option<f64>) -> Option<u64> {
  let duration = duration.filter(|d| *d > 0.0)?;
  let mean = mean_speed.filter(|m| m.is_finite() && *m > 0.0)?;
  Some(round((duration - elapsed) / mean).max(0) as u64)
}

/// The most recent progress line, as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
  pub percent: Option<u64>,
  pub time: String,
  /// Compacted progress fields, including a derived `speed=` when FFmpeg
  /// did not report one
  pub text: String,
}

/// Numbers derived while recording one progress line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
  pub speed: f64,
  /// The speed was computed from consecutive samples, not reported by FFmpeg
  pub derived: bool,
  pub percent: Option<u64>,
  pub eta: Option<u64>,
}

/// What changed while observing one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
  pub from: Phase,
  pub to: Phase,
  pub progress: Option<ProgressReport>,
  pub warning: Option<WarningVerdict>,
}

impl Transition {
  pub fn changed(&self) -> bool {
    self.from != self.to
  }
}

#[derive(Debug)]
pub struct Session {
  phase: Phase,
  started_at: Instant,
  encoding_started_at: Option<Instant>,
  duration: Option<f64>,
  speeds: SpeedWindow,
  last_sample: Option<(f64, Instant)>,
  warnings: WarningFilter,
  last_rendered: String,
  last_progress: Option<ProgressSnapshot>,
  last_context: Option<String>,
  transcript: Vec<String>,
}

impl Session {
  pub fn new(started_at: Instant) -> Self {
    Self {
      phase: Phase::Idle,
      started_at,
      encoding_started_at: None,
      duration: None,
      speeds: SpeedWindow::new(),
      last_sample: None,
      warnings: WarningFilter::default(),
      last_rendered: String::new(),
      last_progress: None,
      last_context: None,
      transcript: Vec::new(),
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn duration(&self) -> Option<f64> {
    self.duration
  }

  pub fn speeds(&self) -> &SpeedWindow {
    &self.speeds
  }

  pub fn warnings(&self) -> &WarningFilter {
    &self.warnings
  }

  /// Wall-clock seconds since encoding started, or since the session was
  /// created when it never did.
  pub fn encoding_elapsed(&self, now: Instant) -> f64 {
    now
      .saturating_duration_since(self.encoding_started_at.unwrap_or(self.started_at))
      .as_secs_f64()
  }

  /// Advance the state machine by one classified line.
  ///
  /// The cancellation flag is only consulted when a finish marker arrives,
  /// to choose between `Finished` and `Interrupted`.
  pub fn transition(&mut self, line: &ClassifiedLine, now: Instant, cancelled: bool) -> Transition {
    let from = self.phase;
    let mut transition = Transition {
      from,
      to: from,
      progress: None,
      warning: None,
    };
    if from.is_terminal() {
      return transition;
    }

    match line {
      ClassifiedLine::StreamMappingHeader(_) => {
        if from == Phase::Idle {
          self.phase = Phase::MappingStreams;
        }
      }
      ClassifiedLine::StreamMappingEntry(_) => {}
      ClassifiedLine::DurationHeader(duration) => {
        if self.duration.is_none() {
          self.duration = duration.seconds;
        }
      }
      ClassifiedLine::Warning(warning) => {
        transition.warning = Some(self.warnings.check(&warning.text));
      }
      ClassifiedLine::ProgressWithSpeed(progress) | ClassifiedLine::ProgressNoSpeed(progress) => {
        // A progress line at time zero is a false start.
        if from != Phase::Encoding && progress.elapsed > 0.0 {
          self.phase = Phase::Encoding;
          self.encoding_started_at = Some(now);
          self.last_sample = Some((0.0, now));
        }
        if self.phase == Phase::Encoding {
          transition.progress = Some(self.record_progress(progress, now));
        }
      }
      ClassifiedLine::FinishMarker(_) => {
        if from == Phase::Encoding {
          self.phase = match cancelled {
            true => Phase::Interrupted,
            false => Phase::Finished,
          };
        }
      }
      _ => {}
    }

    let still_mapping = matches!(
      line,
      ClassifiedLine::StreamMappingHeader(_) | ClassifiedLine::StreamMappingEntry(_)
    );
    if self.phase == Phase::MappingStreams && from == Phase::MappingStreams && !still_mapping {
      self.phase = Phase::Idle;
    }

    transition.to = self.phase;
    transition
  }

  fn record_progress(&mut self, progress: &FfmpegProgress, now: Instant) -> ProgressReport {
    let (speed, derived) = match progress.speed {
      Some(speed) => (speed, false),
      None => (self.derive_speed(progress.elapsed, now), true),
    };
    self.last_sample = Some((progress.elapsed, now));
    self.speeds.push(speed);

    ProgressReport {
      speed,
      derived,
      percent: percent(self.duration, progress.elapsed),
      eta: eta(self.duration, progress.elapsed, self.speeds.mean()),
    }
  }

  /// Media seconds gained per wall-clock second since the previous sample.
  fn derive_speed(&self, elapsed: f64, now: Instant) -> f64 {
    let Some((prev_elapsed, prev_at)) = self.last_sample else {
      return 0.0;
    };
    let dt = now.saturating_duration_since(prev_at).as_secs_f64();
    if dt <= 0.0 {
      return 0.0;
    }
    (elapsed - prev_elapsed) / dt
  }

  pub fn last_rendered(&self) -> &str {
    &self.last_rendered
  }

  /// Whether the last thing written was an in-place progress line.
  pub fn in_place(&self) -> bool {
    self.last_rendered.ends_with('\r')
  }

  pub(crate) fn set_last_rendered(&mut self, rendered: &str) {
    if !rendered.is_empty() {
      self.last_rendered = rendered.to_string();
    }
  }

  pub fn last_progress(&self) -> Option<&ProgressSnapshot> {
    self.last_progress.as_ref()
  }

  pub(crate) fn set_last_progress(&mut self, snapshot: ProgressSnapshot) {
    self.last_progress = Some(snapshot);
  }

  /// Record the current progress as context for encoder errors, once per
  /// distinct progress line.
  pub(crate) fn record_context(&mut self, header: impl FnOnce(&ProgressSnapshot) -> String) {
    let Some(progress) = &self.last_progress else {
      return;
    };
    if self.last_context.as_deref() == Some(progress.text.as_str()) {
      return;
    }
    let entry = header(progress);
    self.last_context = Some(progress.text.clone());
    self.transcript.push(entry);
  }

  pub(crate) fn record(&mut self, entry: String) {
    self.transcript.push(entry);
  }

  pub fn transcript(&self) -> &[String] {
    &self.transcript
  }

  pub fn into_transcript(self) -> Vec<String> {
    self.transcript
  }
}
