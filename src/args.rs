//! Rewrites applied to the encoder argument list before it is run.

use regex::{Captures, Regex};

/// Options whose value is a filter graph eligible for range expansion.
const FILTER_GRAPH_OPTIONS: &[&str] = &["-filter_complex", "-lavfi"];

/// The value following the first `-i`.
///
/// ```rust
/// use ffline::args::first_input;
/// let args: Vec<String> = ["-y", "-i", "a.mkv", "-i", "b.wav", "out.mkv"]
///   .iter()
///   .map(|s| s.to_string())
///   .collect();
/// assert_eq!(first_input(&args), Some("a.mkv"));
/// ```
pub fn first_input(args: &[String]) -> Option<&str> {
  inputs(args).next()
}

/// Values of every `-i`, in order.
pub fn inputs(args: &[String]) -> impl Iterator<Item = &str> {
  args
    .windows(2)
    .filter(|pair| pair[0] == "-i")
    .map(|pair| pair[1].as_str())
}

/// A copy of `args` with the first input replaced by `input`.
pub fn replace_first_input(args: &[String], input: &str) -> Vec<String> {
  let mut out = args.to_vec();
  if let Some(i) = out.iter().position(|arg| arg == "-i") {
    if let Some(value) = out.get_mut(i + 1) {
      *value = input.to_string();
    }
  }
  out
}

/// Expand a `[prefix?]old::new` argument against the first input's name:
/// the result is `prefix` followed by the first input with `old` replaced by
/// `new`.
///
/// ```rust
/// use ffline::args::substitute_filename;
/// assert_eq!(
///   substitute_filename("video.mp4::audio.ac3", "film_video.mp4").as_deref(),
///   Some("film_audio.ac3")
/// );
/// assert_eq!(
///   substitute_filename("out/?.mkv::.mp4", "film.mkv").as_deref(),
///   Some("out/film.mp4")
/// );
/// assert_eq!(substitute_filename("plain.mp4", "film.mkv"), None);
/// ```
pub fn substitute_filename(arg: &str, first_input: &str) -> Option<String> {
  let (head, new) = arg.split_once("::")?;
  let (prefix, old) = head.split_once('?').unwrap_or(("", head));
  if old.is_empty() {
    return None;
  }
  Some(format!("{}{}", prefix, first_input.replace(old, new)))
}

/// Apply [`substitute_filename`] to every argument after the first input.
pub fn substitute_filenames(args: &[String]) -> Vec<String> {
  let Some(position) = args.iter().position(|arg| arg == "-i") else {
    return args.to_vec();
  };
  let Some(first) = args.get(position + 1) else {
    return args.to_vec();
  };

  args
    .iter()
    .enumerate()
    .map(|(i, arg)| match i > position + 1 {
      true => substitute_filename(arg, first).unwrap_or_else(|| arg.clone()),
      false => arg.clone(),
    })
    .collect()
}

/// Expand input ranges in filter graph labels.
///
/// `[0-2:1]` becomes `[0:1][1:1][2:1]`, `[0:3-1]` becomes `[0:3][0:2][0:1]`,
/// and `[0-1:2-3]` enumerates every input for every track. Labels without a
/// range are left alone.
///
/// ```rust
/// use ffline::{args::expand_filter_ranges, patterns::Patterns};
/// let patterns = Patterns::new().unwrap();
/// assert_eq!(
///   expand_filter_ranges("[0:1-3]amerge=inputs=3[a]", &patterns.filter_range),
///   "[0:1][0:2][0:3]amerge=inputs=3[a]"
/// );
/// ```
pub fn expand_filter_ranges(graph: &str, pattern: &Regex) -> String {
  pattern
    .replace_all(graph, |caps: &Captures| {
      expand_label(caps).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn expand_label(caps: &Captures) -> Option<String> {
  let number = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());
  let input_from = number(1)?.ok()?;
  let input_to = number(2).transpose().ok()?.unwrap_or(input_from);
  let track_from = number(3)?.ok()?;
  let track_to = number(4).transpose().ok()?.unwrap_or(track_from);

  if input_from == input_to && track_from == track_to {
    return None;
  }

  let mut out = String::new();
  for input in span(input_from, input_to) {
    for track in span(track_from, track_to) {
      out.push_str(&format!("[{}:{}]", input, track));
    }
  }
  Some(out)
}

/// Inclusive range in either direction.
fn span(from: u32, to: u32) -> Box<dyn Iterator<Item = u32>> {
  match from <= to {
    true => Box::new(from..=to),
    false => Box::new((to..=from).rev()),
  }
}

/// Apply [`expand_filter_ranges`] to the values of `-filter_complex` and `-lavfi`.
pub fn expand_filter_args(args: &[String], pattern: &Regex) -> Vec<String> {
  let mut out = Vec::with_capacity(args.len());
  let mut graph_next = false;
  for arg in args {
    match graph_next {
      true => out.push(expand_filter_ranges(arg, pattern)),
      false => out.push(arg.clone()),
    }
    graph_next = FILTER_GRAPH_OPTIONS.contains(&arg.as_str());
  }
  out
}

/// Quote an argument for display if it contains spaces.
///
/// ```rust
/// use ffline::args::quote;
/// assert_eq!(quote("a b.mkv"), "\"a b.mkv\"");
/// assert_eq!(quote("ab.mkv"), "ab.mkv");
/// ```
pub fn quote(arg: &str) -> String {
  match arg.contains(' ') {
    true => format!("\"{}\"", arg),
    false => arg.to_string(),
  }
}
