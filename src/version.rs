use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

/// This build's version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the URL of the upstream `Cargo.toml` that the
/// `version` keyword compares against.
pub const UPDATE_URL_VAR: &str = "FFLINE_UPDATE_URL";

/// Pull the `version = "..."` value out of a `[package]` table.
///
/// ```rust
/// use ffline::version::parse_manifest_version;
/// let manifest = "[package]\nname = \"ffline\"\nversion = \"0.4.1\"\n\n\
///   [dependencies]\nlog = { version = \"0.4\" }\n";
/// assert_eq!(parse_manifest_version(manifest).as_deref(), Some("0.4.1"));
/// assert_eq!(parse_manifest_version("[dependencies]\n"), None);
/// ```
pub fn parse_manifest_version(manifest: &str) -> Option<String> {
  let mut in_package = false;
  for line in manifest.lines().map(str::trim) {
    if line.starts_with('[') {
      in_package = line == "[package]";
      continue;
    }
    if !in_package {
      continue;
    }
    let Some((key, value)) = line.split_once('=') else {
      continue;
    };
    if key.trim() == "version" {
      return Some(value.trim().trim_matches('"').to_string());
    }
  }
  None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
  UpToDate,
  Outdated { latest: String },
}

/// Compare dotted numeric versions. Missing or non-numeric parts count as 0.
pub fn compare_versions(local: &str, latest: &str) -> UpdateStatus {
  let parts = |v: &str| -> Vec<u64> {
    v.split('.')
      .map(|part| part.trim().parse::<u64>().unwrap_or(0))
      .collect()
  };
  let (mut local_parts, mut latest_parts) = (parts(local), parts(latest));
  let len = local_parts.len().max(latest_parts.len());
  local_parts.resize(len, 0);
  latest_parts.resize(len, 0);
  match latest_parts > local_parts {
    true => UpdateStatus::Outdated {
      latest: latest.to_string(),
    },
    false => UpdateStatus::UpToDate,
  }
}

/// Fetch the upstream manifest and compare it with this build.
#[cfg(feature = "check_update")]
pub fn check_for_update(url: &str) -> Result<UpdateStatus> {
  let manifest = reqwest::blocking::get(url)?.error_for_status()?.text()?;
  let latest = parse_manifest_version(&manifest)
    .ok_or_else(|| Error::msg(format!("No package version found at {}", url)))?;
  Ok(compare_versions(VERSION, &latest))
}

/// The `version` keyword's report: this build, the encoder's own version and,
/// when an update URL is configured, whether a newer release exists.
pub fn version_report<S: AsRef<OsStr>>(exe: S) -> String {
  let mut report = format!("\x1b[32;1mffline\x1b[0m {}\n", VERSION);
  match encoder_version(exe) {
    Ok(version) => report.push_str(&format!("\x1b[32;1mffmpeg\x1b[0m {}\n", version)),
    Err(e) => log::warn!("Failed to read the encoder version: {}", e),
  }

  #[cfg(feature = "check_update")]
  if let Ok(url) = std::env::var(UPDATE_URL_VAR) {
    match check_for_update(&url) {
      Ok(UpdateStatus::UpToDate) => report.push_str("Up to date.\n"),
      Ok(UpdateStatus::Outdated { latest }) => report.push_str(&format!(
        "\x1b[33;1mA newer version is available:\x1b[0m {}\n",
        latest
      )),
      Err(e) => report.push_str(&format!("\x1b[31;1mUpdate check failed:\x1b[0m {}\n", e)),
    }
  }
  report
}

/// `ffmpeg -version`, returning the version word of the first line.
pub fn encoder_version<S: AsRef<OsStr>>(exe: S) -> Result<String> {
  let mut cmd = Command::new(&exe)
    .arg("-version")
    .stdout(Stdio::piped()) // not stderr when calling `-version`
    .stderr(Stdio::null())
    .spawn()?;
  let stdout = cmd.stdout.take().ok_or("No standard output channel")?;

  let mut first_line = String::new();
  BufReader::new(stdout).read_line(&mut first_line)?;
  let exit_status = cmd.wait()?;
  if !exit_status.success() {
    return Err(Error::msg("ffmpeg -version exited with non-zero status"));
  }
  parse_version_line(&first_line).ok_or_else(|| Error::msg("Failed to parse ffmpeg version"))
}

/// ```rust
/// use ffline::version::parse_version_line;
/// let line = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers";
/// assert_eq!(parse_version_line(line).as_deref(), Some("6.1.1-3ubuntu5"));
/// assert_eq!(parse_version_line("usage: ffmpeg"), None);
/// ```
pub fn parse_version_line(line: &str) -> Option<String> {
  line
    .trim()
    .strip_prefix("ffmpeg version ")?
    .split_whitespace()
    .next()
    .map(str::to_string)
}
