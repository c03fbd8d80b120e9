//! Timed-lyric parsing and recognized-speech matching.
//!
//! Cue format, one candidate per line:
//!
//! ```text
//! [MM:SS]text
//! [MM:SS.ff]text
//! [MM:SS.fff]text
//! ```
//!
//! Minutes and seconds are exactly two digits, the optional fraction is two
//! or three digits. Two-digit fractions are centiseconds: the digit string
//! is right-padded to three digits before dividing by 1000, so `.50` and
//! `.500` both mean half a second. Lines that do not start with a
//! conforming tag are skipped silently; the parser never fails.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A single timed lyric line: when it becomes active and what it displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Playback position in seconds at which the line becomes active.
    pub time: f32,
    /// Display text, trimmed of surrounding whitespace.
    pub text: String,
}

impl Cue {
    pub fn new(time: f32, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = (self.time.max(0.0) * 1000.0).round() as u64;
        let minutes = total_ms / 60_000;
        let seconds = (total_ms / 1000) % 60;
        let millis = total_ms % 1000;
        write!(f, "[{minutes:02}:{seconds:02}.{millis:03}]{}", self.text)
    }
}

/// Parses timed-lyric text into cues, preserving input line order.
///
/// Malformed lines are dropped without shifting the cues that follow them.
/// Parsing the same text twice yields identical sequences.
pub fn parse_lrc(text: &str) -> Vec<Cue> {
    text.lines().filter_map(parse_line).collect()
}

/// Reads and parses a timed-lyric file.
///
/// I/O failures propagate; callers that want the fail-soft empty-list
/// behaviour catch them at their boundary (see `session`).
pub fn load_lrc(path: impl AsRef<Path>) -> Result<Vec<Cue>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_lrc(&text))
}

fn parse_line(line: &str) -> Option<Cue> {
    // Tag anchored at the first byte of the line.
    let rest = line.strip_prefix('[')?;
    let close = rest.find(']')?;
    let tag = &rest[..close];
    let text = &rest[close + 1..];

    let (clock, fraction) = match tag.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (tag, None),
    };
    let (minutes, seconds) = clock.split_once(':')?;
    let minutes = fixed_digits(minutes, 2)?;
    let seconds = fixed_digits(seconds, 2)?;
    let millis = match fraction {
        None => 0,
        // Right-padding a two-digit fraction to three digits is a plain
        // factor of ten: centiseconds, not milliseconds.
        Some(f) if f.len() == 2 => fixed_digits(f, 2)? * 10,
        Some(f) => fixed_digits(f, 3)?,
    };

    let time = minutes as f32 * 60.0 + seconds as f32 + millis as f32 / 1000.0;
    Some(Cue::new(time, text.trim()))
}

fn fixed_digits(s: &str, len: usize) -> Option<u32> {
    if s.len() != len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Fixed reference set of candidate lyric lines for recognized-speech
/// matching. Lines may contain embedded newlines; matching is literal
/// substring containment on the full line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    lines: Vec<String>,
}

impl Corpus {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a corpus from the display texts of a cue list, in cue order.
    pub fn from_cues(cues: &[Cue]) -> Self {
        Self::from_lines(cues.iter().map(|cue| cue.text.clone()))
    }

    /// Returns the index of the first line containing `utterance` as a
    /// literal substring, or `None` when nothing matches. Ties break by
    /// corpus order; there is no fuzzy tolerance and no case folding.
    pub fn best_match(&self, utterance: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.contains(utterance))
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
