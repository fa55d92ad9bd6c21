use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::logparse::{LogGrammar, ScanEnd, lossy_lines, past_horizon};

/// `run time: 0h-12m-5s` as printed by ityfuzz-style status lines.
static RUN_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"run time: (\d+)h-(\d+)m-(\d+)s").unwrap());

/// Grammar shared by ityfuzz and midas: periodic run time lines, then a
/// single "found" banner. Only the banner differs between the two.
#[derive(Debug, Clone, Copy)]
pub struct RunTimeGrammar {
    found_marker: &'static str,
}

impl RunTimeGrammar {
    pub fn ityfuzz() -> Self {
        Self {
            found_marker: "Found vulnerabilities!",
        }
    }

    pub fn midas() -> Self {
        Self {
            found_marker: "Found violations!",
        }
    }
}

fn run_time_secs(line: &str) -> Option<f64> {
    let caps = RUN_TIME_PATTERN.captures(line)?;
    let field = |i: usize| caps[i].parse::<u64>().ok();
    let (h, m, s) = (field(1)?, field(2)?, field(3)?);
    let secs = h
        .checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)?;
    Some(secs as f64)
}

impl LogGrammar for RunTimeGrammar {
    fn file_suffix(&self) -> &'static str {
        ".result"
    }

    fn batch_pattern(&self) -> &'static str {
        "*.result"
    }

    fn scan(&self, reader: &mut dyn BufRead) -> std::io::Result<ScanEnd> {
        let mut elapsed_secs = None;

        for line in lossy_lines(reader) {
            let line = line?;

            if let Some(secs) = run_time_secs(&line) {
                elapsed_secs = Some(secs);
                if past_horizon(secs) {
                    return Ok(ScanEnd::Exhausted { elapsed_secs: secs });
                }
            }

            if line.contains(self.found_marker) {
                return Ok(ScanEnd::Concluded {
                    detected: true,
                    elapsed_secs,
                });
            }
        }

        Ok(ScanEnd::Eof { elapsed_secs })
    }
}
