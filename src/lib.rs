//! Run FFmpeg with its stderr condensed into one in-place progress line.
//!
//! The encoder's diagnostics are split into lines, classified, folded into a
//! per-encode [`session::Session`] and rendered back as a short colored
//! display. Errors are always shown and collected into a transcript that can
//! be written to a log next to the input.
//!
//! ## Example
//!
//! ```rust
//! use ffline::{classifier::Classifier, patterns::Patterns, pipeline::Pipeline};
//! use std::time::Instant;
//!
//! let classifier = Classifier::new(Patterns::new().unwrap());
//! let mut pipeline = Pipeline::new(&classifier, Instant::now(), false, false);
//! let now = Instant::now();
//! let duration = "  Duration: 00:01:40.00, start: 0.000000, bitrate: 1000 kb/s";
//! let out = pipeline.feed(duration, now, false);
//! assert!(out.contains("Duration"));
//! pipeline.feed("Stream mapping:", now, false);
//! pipeline.feed("Press [q] to stop, [?] for help", now, false);
//! let progress = "frame=  10 fps=0.0 q=28.0 size=256kB time=00:00:50.00 bitrate=41.9kbits/s";
//! let out = pipeline.feed(progress, now, false);
//! assert!(out.contains("50%"));
//! ```


pub mod args;
pub mod audio_sync;
pub mod batch;
pub mod child;
pub mod classifier;
pub mod cli;
pub mod command;
pub mod crop;
pub mod encode;
pub mod error;
pub mod event;
pub mod line_splitter;
pub mod logfile;
pub mod options;
pub mod paths;
pub mod patterns;
pub mod pipeline;
pub mod presets;
pub mod render;
pub mod session;
pub mod terminal;
pub mod timecode;
pub mod version;
pub mod word_iter;
