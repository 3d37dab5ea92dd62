use crate::{
    core::{EntityId, FrameIndex},
    track::{EntityTrack, TrackStore},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RankedEntity {
    pub id: EntityId,
    pub name: String,
    pub value: f64,
    pub rank: usize, // 0-based
}

/// Top `n` entities by value at `frame`, descending.
///
/// Ties keep first-seen order (the store iterates in that order and the sort is stable).
/// Out-of-range frames yield an empty list.
pub fn top_n(tracks: &TrackStore, frame: FrameIndex, n: usize) -> Vec<RankedEntity> {
    let mut scored: Vec<(&EntityTrack, f64)> = tracks
        .iter()
        .filter_map(|t| t.value_at(frame).map(|v| (t, v)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(rank, (t, value))| RankedEntity {
            id: t.id.clone(),
            name: t.name.clone(),
            value,
            rank,
        })
        .collect()
}
