//! Feature encoding -- event records to a fixed-width numeric matrix.

use chrono::{DateTime, NaiveDateTime, Timelike};

use super::event::EventRecord;
use super::AnalyzeError;

/// Hour value for rows whose own timestamp failed to parse when the batch
/// as a whole has an hour column. -1 keeps them distinguishable from
/// midnight without poisoning the split-range computation the way NaN
/// would.
pub const HOUR_MISSING: f64 = -1.0;

/// Distinct categorical values observed in one batch, in order of first
/// appearance. Built once per invocation and threaded through as an
/// immutable value, so the feature space is batch-local by construction:
/// there is no column stability guarantee across calls.
#[derive(Debug, Default)]
pub struct Vocabulary {
    pub users: Vec<String>,
    pub source_ips: Vec<String>,
    pub auth_packages: Vec<String>,
}

impl Vocabulary {
    pub fn from_events(events: &[EventRecord]) -> Self {
        let mut vocab = Self::default();
        for e in events {
            push_unique(&mut vocab.users, &e.user);
            push_unique(&mut vocab.source_ips, &e.source_ip);
            push_unique(&mut vocab.auth_packages, &e.auth_package);
        }
        vocab
    }

    /// Number of one-hot columns this vocabulary contributes.
    pub fn width(&self) -> usize {
        self.users.len() + self.source_ips.len() + self.auth_packages.len()
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Row-major feature matrix; row order matches the input event order.
#[derive(Debug)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub columns: usize,
}

/// Encode events into the numeric feature space.
///
/// Columns, in order: one-hot per vocabulary value of user, source IP and
/// auth package, then event id, logon type, failure code (hex decoded),
/// admin flag, and -- only if at least one timestamp in the batch parses
/// -- the hour of day.
pub fn encode(events: &[EventRecord], vocab: &Vocabulary) -> Result<FeatureMatrix, AnalyzeError> {
    let hours: Vec<Option<f64>> = events.iter().map(|e| parse_hour(&e.timestamp)).collect();
    let with_hour = hours.iter().any(Option::is_some);
    let columns = vocab.width() + 4 + usize::from(with_hour);

    let mut rows = Vec::with_capacity(events.len());
    for (event, hour) in events.iter().zip(&hours) {
        let mut row = Vec::with_capacity(columns);
        one_hot(&mut row, &vocab.users, &event.user);
        one_hot(&mut row, &vocab.source_ips, &event.source_ip);
        one_hot(&mut row, &vocab.auth_packages, &event.auth_package);
        row.push(event.event_id as f64);
        row.push(event.logon_type as f64);
        row.push(decode_hex(&event.failure_code)? as f64);
        row.push(if event.is_admin { 1.0 } else { 0.0 });
        if with_hour {
            row.push(hour.unwrap_or(HOUR_MISSING));
        }
        rows.push(row);
    }

    Ok(FeatureMatrix { rows, columns })
}

fn one_hot(row: &mut Vec<f64>, vocabulary: &[String], value: &str) {
    for known in vocabulary {
        row.push(if known == value { 1.0 } else { 0.0 });
    }
}

/// Decode a Windows status code ("0xC000006D") to its numeric value. The
/// parser has already defaulted missing codes to "0x0", so a failure here
/// means genuinely malformed input.
fn decode_hex(code: &str) -> Result<u64, AnalyzeError> {
    let code = code.trim();
    let digits = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);
    u64::from_str_radix(digits, 16)
        .map_err(|_| AnalyzeError::Encoding(format!("unparsable failure code {code:?}")))
}

fn parse_hour(timestamp: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(f64::from(dt.hour()));
    }
    // Windows exports sometimes drop the offset.
    timestamp
        .parse::<NaiveDateTime>()
        .ok()
        .map(|dt| f64::from(dt.hour()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, ip: &str, timestamp: &str) -> EventRecord {
        EventRecord {
            event_id: 4625,
            user: user.to_string(),
            source_ip: ip.to_string(),
            logon_type: 3,
            failure_code: "0x12".to_string(),
            auth_package: "NTLM".to_string(),
            is_admin: false,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_hex_decoding() {
        assert_eq!(decode_hex("0x1F").unwrap(), 31);
        assert_eq!(decode_hex("0x0").unwrap(), 0);
        assert_eq!(decode_hex("0xC000006D").unwrap(), 0xC000_006D);
        assert!(decode_hex("0xZZ").is_err());
        assert!(decode_hex("").is_err());
    }

    #[test]
    fn test_vocabulary_first_appearance_order() {
        let events = vec![
            record("bob", "10.0.0.2", ""),
            record("alice", "10.0.0.1", ""),
            record("bob", "10.0.0.1", ""),
        ];
        let vocab = Vocabulary::from_events(&events);
        assert_eq!(vocab.users, vec!["bob", "alice"]);
        assert_eq!(vocab.source_ips, vec!["10.0.0.2", "10.0.0.1"]);
        assert_eq!(vocab.auth_packages, vec!["NTLM"]);
        assert_eq!(vocab.width(), 5);
    }

    #[test]
    fn test_one_hot_and_numeric_columns() {
        let events = vec![record("bob", "10.0.0.2", ""), record("alice", "10.0.0.1", "")];
        let vocab = Vocabulary::from_events(&events);
        let matrix = encode(&events, &vocab).unwrap();

        // 2 users + 2 ips + 1 package + 4 numeric, no hour column
        assert_eq!(matrix.columns, 9);
        for row in &matrix.rows {
            assert_eq!(row.len(), 9);
        }
        // bob's row: user one-hot [1,0], ip one-hot [1,0], package [1]
        assert_eq!(&matrix.rows[0][..5], &[1.0, 0.0, 1.0, 0.0, 1.0]);
        // then event_id, logon_type, 0x12 = 18, is_admin
        assert_eq!(&matrix.rows[0][5..], &[4625.0, 3.0, 18.0, 0.0]);
        assert_eq!(&matrix.rows[1][..5], &[0.0, 1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_hour_column_added_when_any_timestamp_parses() {
        let events = vec![
            record("bob", "10.0.0.2", "2024-03-01T09:15:00Z"),
            record("alice", "10.0.0.1", "garbage"),
        ];
        let vocab = Vocabulary::from_events(&events);
        let matrix = encode(&events, &vocab).unwrap();

        assert_eq!(matrix.columns, 10);
        assert_eq!(matrix.rows[0][9], 9.0);
        assert_eq!(matrix.rows[1][9], HOUR_MISSING);
    }

    #[test]
    fn test_hour_column_omitted_when_no_timestamp_parses() {
        let events = vec![record("bob", "10.0.0.2", ""), record("alice", "10.0.0.1", "")];
        let vocab = Vocabulary::from_events(&events);
        let matrix = encode(&events, &vocab).unwrap();
        assert_eq!(matrix.columns, 9);
    }

    #[test]
    fn test_hour_parses_without_offset() {
        assert_eq!(parse_hour("2024-03-01T23:59:07"), Some(23.0));
        assert_eq!(parse_hour(""), None);
    }
}
