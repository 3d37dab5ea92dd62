use chrono::NaiveDate;

use crate::core::{EntityId, FrameIndex};

/// One real, dated observation of every entity's value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub entries: Vec<Entry>, // order irrelevant, ids unique
}

impl Snapshot {
    pub fn new(date: NaiveDate, entries: Vec<Entry>) -> Self {
        Self { date, entries }
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    pub id: EntityId,
    pub name: String,
    pub value: f64,
}

impl Entry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            value,
        }
    }
}

/// One unit of the dense, animation-ready sequence.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Frame {
    pub date: NaiveDate, // synthetic frames carry the date they start from
    pub entries: Vec<Entry>,
    pub is_synthetic: bool,
}

impl Frame {
    pub fn from_snapshot(s: &Snapshot) -> Self {
        Self {
            date: s.date,
            entries: s.entries.clone(),
            is_synthetic: false,
        }
    }

    pub fn date_label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Dense frames plus the indices of the frames that map back to real snapshots.
#[derive(Clone, Debug, Default)]
pub struct FrameSeq {
    pub frames: Vec<Frame>,
    pub anchors: Vec<FrameIndex>, // strictly increasing
}

impl FrameSeq {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, f: FrameIndex) -> Option<&Frame> {
        self.frames.get(f.0)
    }

    pub fn last_index(&self) -> Option<FrameIndex> {
        self.frames.len().checked_sub(1).map(FrameIndex)
    }
}
