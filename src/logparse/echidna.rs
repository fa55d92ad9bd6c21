use std::io::BufRead;

use chrono::NaiveDateTime;

use crate::logparse::{LogGrammar, ScanEnd, lossy_lines, past_horizon};

const PROFIT_MARKER: &str = "echidna_profit_generated_eth: ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Echidna campaigns print `[YYYY-MM-DD HH:MM:SS.ffff]` prefixed status lines
/// and finish with the profit property's verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchidnaGrammar;

fn line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let rest = line.strip_prefix('[')?;
    let (stamp, _) = rest.split_once(']')?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

impl LogGrammar for EchidnaGrammar {
    fn file_suffix(&self) -> &'static str {
        "result.txt"
    }

    fn batch_pattern(&self) -> &'static str {
        "**/result.txt"
    }

    fn scan(&self, reader: &mut dyn BufRead) -> std::io::Result<ScanEnd> {
        let mut start: Option<NaiveDateTime> = None;
        let mut elapsed_secs: Option<f64> = None;

        for line in lossy_lines(reader) {
            let line = line?;

            if let Some(stamp) = line_timestamp(&line) {
                let start = *start.get_or_insert(stamp);
                let secs = (stamp - start).num_milliseconds() as f64 / 1000.0;
                elapsed_secs = Some(secs);
                if past_horizon(secs) {
                    return Ok(ScanEnd::Exhausted { elapsed_secs: secs });
                }
            }

            if let Some(idx) = line.find(PROFIT_MARKER) {
                let verdict = line[idx + PROFIT_MARKER.len()..].trim();
                return Ok(ScanEnd::Concluded {
                    detected: verdict != "passing",
                    elapsed_secs,
                });
            }
        }

        Ok(ScanEnd::Eof { elapsed_secs })
    }
}
