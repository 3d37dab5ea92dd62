use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use anyhow::Context as _;
use chrono::{Datelike, Days, NaiveDate};

use crate::{
    error::{RaceError, RaceResult},
    model::{Entry, Snapshot},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Daily,
    /// Last available snapshot of each calendar week, keyed by the week's Sunday.
    Weekly,
}

#[derive(serde::Deserialize)]
struct RawEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    value: f64,
}

#[derive(serde::Deserialize)]
struct RawSnapshot {
    date: String,
    #[serde(alias = "entries")]
    values: Vec<RawEntry>,
}

/// Either `{ "2024-01-01": [entries...] }` or `[{ "date": ..., "values": [entries...] }]`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SourceDoc {
    Keyed(BTreeMap<String, Vec<RawEntry>>),
    Listed(Vec<RawSnapshot>),
}

/// Reads and validates a snapshot file.
#[tracing::instrument]
pub fn load_snapshots(path: &Path) -> RaceResult<Vec<Snapshot>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read snapshots '{}'", path.display()))?;
    parse_snapshots(&s)
}

/// Parses snapshot JSON, sorts it by date and validates it.
pub fn parse_snapshots(json: &str) -> RaceResult<Vec<Snapshot>> {
    let doc: SourceDoc = serde_json::from_str(json)
        .map_err(|e| RaceError::malformed(format!("snapshot JSON: {e}")))?;

    let raw: Vec<(String, Vec<RawEntry>)> = match doc {
        SourceDoc::Keyed(map) => map.into_iter().collect(),
        SourceDoc::Listed(list) => list.into_iter().map(|s| (s.date, s.values)).collect(),
    };

    let mut snapshots = raw
        .into_iter()
        .map(|(date, entries)| -> RaceResult<Snapshot> {
            let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
                .map_err(|e| RaceError::malformed(format!("bad date '{date}': {e}")))?;
            let entries = entries
                .into_iter()
                .map(|e| Entry {
                    name: e.name.unwrap_or_else(|| e.id.clone()),
                    id: e.id.into(),
                    value: e.value,
                })
                .collect();
            Ok(Snapshot { date, entries })
        })
        .collect::<RaceResult<Vec<_>>>()?;

    snapshots.sort_by_key(|s| s.date);
    validate_snapshots(&snapshots)?;
    tracing::debug!(snapshots = snapshots.len(), "parsed snapshots");
    Ok(snapshots)
}

/// Load-boundary checks; the engine assumes they hold.
pub fn validate_snapshots(snapshots: &[Snapshot]) -> RaceResult<()> {
    if snapshots.is_empty() {
        return Err(RaceError::malformed("at least one snapshot is required"));
    }
    if let Some(w) = snapshots.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(RaceError::malformed(format!(
            "snapshot dates must be strictly increasing ({} then {})",
            w[0].date, w[1].date
        )));
    }
    for s in snapshots {
        let mut seen = HashSet::with_capacity(s.entries.len());
        for e in &s.entries {
            if e.id.as_str().is_empty() {
                return Err(RaceError::malformed(format!("{}: empty entity id", s.date)));
            }
            if !seen.insert(e.id.as_str()) {
                return Err(RaceError::malformed(format!(
                    "{}: duplicate entity id '{}'",
                    s.date, e.id
                )));
            }
            if !e.value.is_finite() || e.value < 0.0 {
                return Err(RaceError::malformed(format!(
                    "{}: '{}' has invalid value {}",
                    s.date, e.id, e.value
                )));
            }
        }
    }
    Ok(())
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Applies the aggregation mode to date-sorted snapshots.
pub fn aggregate(snapshots: Vec<Snapshot>, mode: Aggregation) -> Vec<Snapshot> {
    match mode {
        Aggregation::Daily => snapshots,
        Aggregation::Weekly => {
            let mut weeks: BTreeMap<NaiveDate, Snapshot> = BTreeMap::new();
            for s in snapshots {
                let key = week_start(s.date);
                match weeks.get(&key) {
                    Some(prev) if prev.date > s.date => {}
                    _ => {
                        weeks.insert(key, s);
                    }
                }
            }
            weeks
                .into_iter()
                .map(|(key, s)| Snapshot {
                    date: key,
                    entries: s.entries,
                })
                .collect()
        }
    }
}
