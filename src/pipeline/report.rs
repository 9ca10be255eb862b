//! Report assembly -- join model verdicts back onto the original events.

use serde::Serialize;

use super::event::EventRecord;
use super::forest::Verdict;

#[derive(Debug, Serialize)]
pub struct Report {
    pub stats: ReportStats,
    pub anomalies: Vec<ScoredEvent>,
}

#[derive(Debug, Serialize)]
pub struct ReportStats {
    #[serde(rename = "totalEvents")]
    pub total_events: usize,
    #[serde(rename = "anomalyCount")]
    pub anomaly_count: usize,
    /// Top five event ids by frequency, highest first, ties broken by
    /// first appearance. Serialized as an object whose key order is the
    /// rank order.
    #[serde(rename = "commonEventTypes", serialize_with = "ser_counts")]
    pub common_event_types: Vec<(i64, usize)>,
}

/// An anomalous event with its model verdict attached.
#[derive(Debug, Serialize)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub event: EventRecord,
    #[serde(rename = "IsAnomaly")]
    pub is_anomaly: u8,
    #[serde(rename = "AnomalyScore")]
    pub anomaly_score: f64,
}

fn ser_counts<S: serde::Serializer>(
    counts: &[(i64, usize)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for (event_id, count) in counts {
        map.serialize_entry(&event_id.to_string(), count)?;
    }
    map.end()
}

/// Join events to verdicts by position (no pipeline stage reorders rows)
/// and keep flagged events in their original order, not score order.
pub fn build(events: Vec<EventRecord>, verdicts: &[Verdict]) -> Report {
    debug_assert_eq!(events.len(), verdicts.len());

    let common_event_types = top_event_ids(&events, 5);
    let total_events = events.len();
    let anomalies: Vec<ScoredEvent> = events
        .into_iter()
        .zip(verdicts)
        .filter(|(_, v)| v.is_anomaly)
        .map(|(event, v)| ScoredEvent {
            event,
            is_anomaly: 1,
            anomaly_score: v.score,
        })
        .collect();

    Report {
        stats: ReportStats {
            total_events,
            anomaly_count: anomalies.len(),
            common_event_types,
        },
        anomalies,
    }
}

fn top_event_ids(events: &[EventRecord], limit: usize) -> Vec<(i64, usize)> {
    // Counted in first-appearance order; the stable sort then preserves
    // that order among equal counts.
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for e in events {
        match counts.iter_mut().find(|(id, _)| *id == e.event_id) {
            Some((_, c)) => *c += 1,
            None => counts.push((e.event_id, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}
