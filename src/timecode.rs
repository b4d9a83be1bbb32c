//! Conversions between FFmpeg timecodes (`HH:MM:SS.ms`) and seconds, plus
//! fixed-width padding for the progress display.

use console::measure_text_width;

/// Marker appended by [`trunc_pad`] when a string had to be shortened.
const ELLIPSIS: &str = "\x1b[30;1m...\x1b[0m";

/// Parse a time string in the format `HOURS:MM:SS.MILLISECONDS` into a number of seconds.
///
/// <https://trac.ffmpeg.org/wiki/Seeking#Timeunitsyntax>
///
/// ## Examples
///
/// ```rust
/// use ffline::timecode::parse_time_str;
/// assert!(parse_time_str("00:00:00.00") == Some(0.0));
/// assert!(parse_time_str("5") == Some(5.0));
/// assert!(parse_time_str("1:01.0") == Some(61.0));
/// assert!(parse_time_str("00:12:34.50") == Some(754.5));
/// assert!(parse_time_str("N/A") == None);
/// ```
pub fn parse_time_str(str: &str) -> Option<f64> {
  let mut seconds = 0.0;

  let mut smh = str.trim().split(':').rev();
  if let Some(sec) = smh.next() {
    seconds += sec.parse::<f64>().ok()?;
  }

  if let Some(min) = smh.next() {
    seconds += min.parse::<f64>().ok()? * 60.0;
  }

  if let Some(hrs) = smh.next() {
    seconds += hrs.parse::<f64>().ok()? * 60.0 * 60.0;
  }

  // More than three fields is not a timecode.
  if smh.next().is_some() {
    return None;
  }

  Some(seconds)
}

/// Lenient variant of [`parse_time_str`]: malformed text becomes `0.0`.
pub fn timecode_to_seconds(str: &str) -> f64 {
  parse_time_str(str).unwrap_or(0.0)
}

/// Round half away from zero.
pub fn round(value: f64) -> i64 {
  if value < 0.0 {
    (value - 0.5).ceil() as i64
  } else {
    (value + 0.5).floor() as i64
  }
}

/// Format seconds as `HH:MM:SS`, rounded to the nearest second.
///
/// Fields are derived by integer division with carry, so `59.6` becomes
/// `00:01:00`. Negative and non-finite input is treated as zero. Hours are not
/// wrapped at 24.
///
/// ```rust
/// use ffline::timecode::seconds_to_timecode;
/// assert_eq!(seconds_to_timecode(30.0), "00:00:30");
/// assert_eq!(seconds_to_timecode(3599.5), "01:00:00");
/// assert_eq!(seconds_to_timecode(90061.0), "25:01:01");
/// ```
pub fn seconds_to_timecode(seconds: f64) -> String {
  let total = if seconds.is_finite() && seconds > 0.0 {
    round(seconds) as u64
  } else {
    0
  };
  let hh = total / 3600;
  let mm = (total % 3600) / 60;
  let ss = total % 60;
  format!("{:02}:{:02}:{:02}", hh, mm, ss)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
  Left,
  Right,
}

/// Pad `s` with spaces to `width` display columns, or truncate it and append
/// a dimmed `...` when it is wider.
///
/// ```rust
/// use ffline::timecode::{trunc_pad, Align};
/// assert_eq!(trunc_pad("7", 3, Align::Right), "  7");
/// assert_eq!(trunc_pad("42", 3, Align::Left), "42 ");
/// assert_eq!(trunc_pad("100", 3, Align::Right), "100");
/// ```
pub fn trunc_pad(s: &str, width: usize, align: Align) -> String {
  let len = measure_text_width(s);
  if len > width {
    let keep = width.saturating_sub(3);
    let head: String = s.chars().take(keep).collect();
    return format!("{}{}", head, ELLIPSIS);
  }
  let padding = " ".repeat(width - len);
  match align {
    Align::Right => format!("{}{}", padding, s),
    Align::Left => format!("{}{}", s, padding),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_time_str() {
    assert_eq!(parse_time_str("00:00:10.00"), Some(10.0));
    assert_eq!(parse_time_str("01:00:00.00"), Some(3600.0));
    assert_eq!(parse_time_str("0.123"), Some(0.123));
    assert_eq!(parse_time_str("1:2:3:4"), None);
    assert_eq!(parse_time_str(""), None);
  }

  #[test]
  fn test_timecode_to_seconds_fallback() {
    assert_eq!(timecode_to_seconds("garbage"), 0.0);
    assert_eq!(timecode_to_seconds("00:01:00.50"), 60.5);
  }

  #[test]
  fn test_round() {
    assert_eq!(round(2.5), 3);
    assert_eq!(round(2.49), 2);
    assert_eq!(round(-2.5), -3);
    assert_eq!(round(0.0), 0);
  }

  #[test]
  fn test_timecode_round_trip() {
    for tc in ["00:00:00", "00:00:59", "00:59:59", "12:34:56", "99:00:01"] {
      let with_ms = format!("{}.00", tc);
      assert_eq!(seconds_to_timecode(timecode_to_seconds(&with_ms)), tc);
    }
    // Fractions round to the nearest second.
    assert_eq!(seconds_to_timecode(timecode_to_seconds("00:00:09.50")), "00:00:10");
    assert_eq!(seconds_to_timecode(timecode_to_seconds("00:00:09.49")), "00:00:09");
  }

  #[test]
  fn test_seconds_to_timecode_carry() {
    assert_eq!(seconds_to_timecode(59.6), "00:01:00");
    assert_eq!(seconds_to_timecode(3599.9), "01:00:00");
  }

  #[test]
  fn test_seconds_to_timecode_degenerate() {
    assert_eq!(seconds_to_timecode(-5.0), "00:00:00");
    assert_eq!(seconds_to_timecode(f64::NAN), "00:00:00");
    assert_eq!(seconds_to_timecode(f64::INFINITY), "00:00:00");
  }

  #[test]
  fn test_trunc_pad_truncates() {
    let out = trunc_pad("12345", 4, Align::Right);
    assert!(out.starts_with('1'));
    assert!(out.ends_with(ELLIPSIS));
  }
}
