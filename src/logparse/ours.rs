use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::logparse::{LogGrammar, ScanEnd, lossy_lines};

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time elapsed: Duration \{ secs: (\d+), nanos: (\d+) \}").unwrap()
});
static SUCCESS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Exploit found").unwrap());
static FAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Could not find profitable testcase").unwrap());

/// Logs of `forge cage test`. The whole file is read: the last marker wins
/// and the last `time elapsed` line gives the elapsed time. A marker without
/// any `time elapsed` line is not evidence of a finished run.
#[derive(Debug, Clone, Copy, Default)]
pub struct OursGrammar;

fn elapsed_secs(line: &str) -> Option<f64> {
    let caps = TIME_PATTERN.captures(line)?;
    let secs = caps[1].parse::<u64>().ok()?;
    let nanos = caps[2].parse::<u64>().ok()?;
    Some(secs as f64 + nanos as f64 / 1_000_000_000.0)
}

impl LogGrammar for OursGrammar {
    fn file_suffix(&self) -> &'static str {
        ".result"
    }

    fn batch_pattern(&self) -> &'static str {
        "*.result"
    }

    fn scan(&self, reader: &mut dyn BufRead) -> std::io::Result<ScanEnd> {
        let mut elapsed = None;
        let mut detected = None;

        for line in lossy_lines(reader) {
            let line = line?;
            if let Some(secs) = elapsed_secs(&line) {
                elapsed = Some(secs);
            }
            if SUCCESS_PATTERN.is_match(&line) {
                detected = Some(true);
            }
            if FAIL_PATTERN.is_match(&line) {
                detected = Some(false);
            }
        }

        Ok(match (detected, elapsed) {
            (Some(detected), Some(elapsed_secs)) => ScanEnd::Concluded {
                detected,
                elapsed_secs: Some(elapsed_secs),
            },
            (None, Some(elapsed_secs)) => ScanEnd::Concluded {
                detected: false,
                elapsed_secs: Some(elapsed_secs),
            },
            (_, None) => ScanEnd::Eof { elapsed_secs: None },
        })
    }
}
