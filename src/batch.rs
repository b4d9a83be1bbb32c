//! Batch mode: one encode per input, strictly in sequence.

use std::{
  fs,
  path::Path,
  sync::atomic::{AtomicBool, Ordering},
  time::Duration,
};

use log::{info, warn};

use crate::{
  args::{replace_first_input, substitute_filenames},
  encode::EncodeOutcome,
  error::{Error, Result},
  timecode::seconds_to_timecode,
  word_iter::WordIter,
};

const LIST_PREFIX: &str = "list:";

/// Resolve the first input to a list of inputs when it names a batch.
///
/// - `list:a.mkv "b c.mkv"` is a word list
/// - `*.mkv` and friends are glob patterns
/// - a `.txt` file holds one input per line, unless it feeds `-f concat`
///
/// Returns `None` for an ordinary single input.
pub fn expand_inputs(first_input: &str, args: &[String]) -> Result<Option<Vec<String>>> {
  if let Some(list) = first_input.strip_prefix(LIST_PREFIX) {
    return Ok(Some(WordIter::new(list.trim()).collect()));
  }

  let path = Path::new(first_input);
  let is_txt = path
    .extension()
    .map_or(false, |ext| ext.eq_ignore_ascii_case("txt"));
  if is_txt && !feeds_concat(args) {
    let contents = fs::read_to_string(path)
      .map_err(|e| Error::msg(format!("Failed to read batch list {}: {}", first_input, e)))?;
    let inputs = contents
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    return Ok(Some(inputs));
  }

  if path.exists() || !is_glob(first_input) {
    return Ok(None);
  }

  let mut inputs = Vec::new();
  for entry in glob::glob(first_input)? {
    inputs.push(entry?.to_string_lossy().into_owned());
  }
  Ok(Some(inputs))
}

fn is_glob(string: &str) -> bool {
  string.contains(|c: char| matches!(c, '*' | '?' | '['))
}

/// `-f concat -i list.txt` is FFmpeg's own concat demuxer, not a batch.
fn feeds_concat(args: &[String]) -> bool {
  args
    .iter()
    .position(|arg| arg == "-i")
    .map_or(false, |i| i >= 2 && args[i - 2] == "-f" && args[i - 1] == "concat")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Succeeded,
  Failed,
  Interrupted,
  /// Never started because cancellation was requested
  Skipped,
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
  pub input: String,
  pub status: EntryStatus,
  /// The encoder ran and exited with status zero
  pub success: bool,
  /// Run time, `None` when the encoder never ran
  pub elapsed: Option<Duration>,
  pub transcript: Vec<String>,
}

impl BatchEntry {
  fn not_run(input: &str, status: EntryStatus, transcript: Vec<String>) -> Self {
    Self {
      input: input.to_string(),
      status,
      success: false,
      elapsed: None,
      transcript,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
  pub entries: Vec<BatchEntry>,
}

impl BatchReport {
  /// One `(input, transcript)` section per input that recorded errors, in
  /// input order.
  pub fn error_sections(&self) -> Vec<(&str, &[String])> {
    self
      .entries
      .iter()
      .filter(|entry| !entry.transcript.is_empty())
      .map(|entry| (entry.input.as_str(), entry.transcript.as_slice()))
      .collect()
  }

  /// True when any input that was attempted did not exit successfully,
  /// including an interrupted encode.
  pub fn failed(&self) -> bool {
    self
      .entries
      .iter()
      .any(|entry| entry.status != EntryStatus::Skipped && !entry.success)
  }

  /// The end-of-run listing of every input and its errors.
  pub fn summary(&self) -> String {
    let mut out = String::from("\n\x1b[33;1mBatch summary:\x1b[0m\n");
    for entry in &self.entries {
      let label = match entry.status {
        EntryStatus::Succeeded => "\x1b[32;1m  OK  \x1b[0m",
        EntryStatus::Failed => "\x1b[31;1m  FAIL\x1b[0m",
        EntryStatus::Interrupted => "\x1b[31;1m  INT \x1b[0m",
        EntryStatus::Skipped => "\x1b[30;1m  SKIP\x1b[0m",
      };
      match entry.elapsed {
        Some(elapsed) => out.push_str(&format!(
          "{} {} \x1b[30;1met={}\x1b[0m\n",
          label,
          entry.input,
          seconds_to_timecode(elapsed.as_secs_f64())
        )),
        None => out.push_str(&format!("{} {}\n", label, entry.input)),
      }
      for line in &entry.transcript {
        out.push_str(line);
      }
    }
    out
  }
}

/// Run `encode_one` for each input with its own copy of `template`.
///
/// The cancellation flag is checked before each input; once it is set the
/// remaining inputs are reported as skipped. A failure to run one input does
/// not stop the batch.
pub fn run_batch<F>(
  inputs: &[String],
  template: &[String],
  cancel: &AtomicBool,
  mut encode_one: F,
) -> BatchReport
where
  F: FnMut(&str, &[String]) -> anyhow::Result<EncodeOutcome>,
{
  let mut report = BatchReport::default();
  for (i, input) in inputs.iter().enumerate() {
    if cancel.load(Ordering::SeqCst) {
      info!("Cancelled, skipping {} remaining input(s)", inputs.len() - i);
      report.entries.extend(
        inputs[i..]
          .iter()
          .map(|input| BatchEntry::not_run(input, EntryStatus::Skipped, Vec::new())),
      );
      break;
    }

    let args = substitute_filenames(&replace_first_input(template, input));
    let entry = match encode_one(input, &args) {
      Ok(outcome) => BatchEntry {
        input: input.clone(),
        status: match (outcome.interrupted, outcome.success) {
          (true, _) => EntryStatus::Interrupted,
          (false, true) => EntryStatus::Succeeded,
          (false, false) => EntryStatus::Failed,
        },
        success: outcome.success,
        elapsed: Some(outcome.elapsed),
        transcript: outcome.transcript,
      },
      Err(e) => {
        warn!("{}: {:#}", input, e);
        let transcript = vec![format!("     \x1b[31;1m{:#}\x1b[0m\n", e)];
        BatchEntry::not_run(input, EntryStatus::Failed, transcript)
      }
    };
    report.entries.push(entry);
  }
  report
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
  }

  fn outcome(success: bool, transcript: &[&str]) -> EncodeOutcome {
    EncodeOutcome {
      success,
      interrupted: false,
      transcript: strings(transcript),
      elapsed: Duration::from_secs(65),
    }
  }

  #[test]
  fn test_error_sections_only_for_failed_inputs() {
    let inputs = strings(&["a.mkv", "b.mkv", "c.mkv", "d.mkv"]);
    let template = strings(&["-i", "list:", ".mkv::.mp4"]);
    let cancel = AtomicBool::new(false);
    let mut seen = Vec::new();

    let report = run_batch(&inputs, &template, &cancel, |input, args| {
      seen.push(args.to_vec());
      match input {
        "b.mkv" => Ok(outcome(false, &["b error\n"])),
        "d.mkv" => Err(anyhow::anyhow!("Failed to start ffmpeg")),
        _ => Ok(outcome(true, &[])),
      }
    });

    let sections = report.error_sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].0, "b.mkv");
    assert_eq!(sections[0].1, ["b error\n"]);
    assert_eq!(sections[1].0, "d.mkv");
    assert!(sections[1].1[0].contains("Failed to start ffmpeg"));
    assert!(report.failed());

    assert_eq!(seen[0], strings(&["-i", "a.mkv", "a.mp4"]));
    assert_eq!(seen[2], strings(&["-i", "c.mkv", "c.mp4"]));
  }

  #[test]
  fn test_cancel_stops_scheduling() {
    let inputs = strings(&["a", "b", "c"]);
    let cancel = AtomicBool::new(false);
    let mut runs = 0;
    let report = run_batch(&inputs, &strings(&["-i", "x"]), &cancel, |_, _| {
      runs += 1;
      cancel.store(true, Ordering::SeqCst);
      Ok(outcome(true, &[]))
    });
    assert_eq!(runs, 1);
    let statuses: Vec<EntryStatus> = report.entries.iter().map(|e| e.status).collect();
    assert_eq!(
      statuses,
      [EntryStatus::Succeeded, EntryStatus::Skipped, EntryStatus::Skipped]
    );
    assert!(!report.failed());
  }

  #[test]
  fn test_interrupted_entry_fails_the_batch() {
    let inputs = strings(&["a", "b"]);
    let cancel = AtomicBool::new(false);
    let report = run_batch(&inputs, &strings(&["-i", "x"]), &cancel, |_, _| {
      // Ctrl+C reaches the encoder too, which exits with 255
      cancel.store(true, Ordering::SeqCst);
      Ok(EncodeOutcome {
        interrupted: true,
        ..outcome(false, &[])
      })
    });
    let statuses: Vec<EntryStatus> = report.entries.iter().map(|e| e.status).collect();
    assert_eq!(statuses, [EntryStatus::Interrupted, EntryStatus::Skipped]);
    assert!(report.failed());
  }

  #[test]
  fn test_interrupted_but_successful_entry() {
    let inputs = strings(&["a"]);
    let cancel = AtomicBool::new(false);
    let report = run_batch(&inputs, &strings(&["-i", "x"]), &cancel, |_, _| {
      Ok(EncodeOutcome {
        interrupted: true,
        ..outcome(true, &[])
      })
    });
    assert_eq!(report.entries[0].status, EntryStatus::Interrupted);
    assert!(!report.failed());
  }

  #[test]
  fn test_summary_lists_every_input() {
    let report = BatchReport {
      entries: vec![
        BatchEntry {
          input: "a.mkv".into(),
          status: EntryStatus::Succeeded,
          success: true,
          elapsed: Some(Duration::from_secs(65)),
          transcript: Vec::new(),
        },
        BatchEntry {
          input: "b.mkv".into(),
          status: EntryStatus::Failed,
          success: false,
          elapsed: None,
          transcript: strings(&["     boom\n"]),
        },
      ],
    };
    let summary = crate::terminal::strip_escapes(&report.summary());
    assert!(summary.contains("  OK   a.mkv et=00:01:05\n"));
    assert!(summary.contains("  FAIL b.mkv\n     boom\n"));
  }

  #[test]
  fn test_list_prefix() {
    let inputs = expand_inputs(r#"list:a.mkv "b c.mkv""#, &[]).unwrap();
    assert_eq!(inputs, Some(strings(&["a.mkv", "b c.mkv"])));
  }

  #[test]
  fn test_txt_list() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("inputs.txt");
    fs::write(&list, "a.mkv\n\n  b.mkv  \r\n").unwrap();
    let list = list.to_string_lossy().into_owned();

    let inputs = expand_inputs(&list, &[]).unwrap();
    assert_eq!(inputs, Some(strings(&["a.mkv", "b.mkv"])));

    let concat = strings(&["-f", "concat", "-i", &list]);
    assert_eq!(expand_inputs(&list, &concat).unwrap(), None);
  }

  #[test]
  fn test_glob() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.mkv", "a.mkv", "c.wav"] {
      fs::write(dir.path().join(name), "").unwrap();
    }
    let pattern = dir.path().join("*.mkv").to_string_lossy().into_owned();
    let inputs = expand_inputs(&pattern, &[]).unwrap().unwrap();
    let names: Vec<String> = inputs
      .iter()
      .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, ["a.mkv", "b.mkv"]);
  }

  #[test]
  fn test_single_input() {
    assert_eq!(expand_inputs("movie.mkv", &[]).unwrap(), None);
  }

  #[test]
  fn test_missing_txt_list() {
    assert!(expand_inputs("/nonexistent/list.txt", &[]).is_err());
  }
}
