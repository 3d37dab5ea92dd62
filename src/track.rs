use std::collections::HashMap;

use crate::{
    core::{EntityId, FrameIndex},
    foundation::math::lerp,
    model::FrameSeq,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EntityTrack {
    pub id: EntityId,
    pub name: String,
    pub color_key: usize,          // first-seen ordinal
    pub values: Vec<Option<f64>>, // one slot per dense frame
}

impl EntityTrack {
    pub fn value_at(&self, f: FrameIndex) -> Option<f64> {
        self.values.get(f.0).copied().flatten()
    }

    fn fill_gaps(&mut self) {
        let known: Vec<usize> = self
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect();
        if known.is_empty() || known.len() == self.values.len() {
            return;
        }

        for i in 0..self.values.len() {
            if self.values[i].is_some() {
                continue;
            }
            let next_pos = known.partition_point(|&k| k < i);
            let prev = next_pos.checked_sub(1).map(|p| known[p]);
            let next = known.get(next_pos).copied();

            self.values[i] = match (prev, next) {
                (Some(p), Some(n)) => {
                    let (vp, vn) = (self.values[p], self.values[n]);
                    let t = ((i - p) as f64) / ((n - p) as f64);
                    vp.zip(vn).map(|(a, b)| lerp(a, b, t))
                }
                (Some(p), None) => self.values[p],
                (None, Some(n)) => self.values[n],
                (None, None) => None,
            };
        }
    }
}

/// Dense per-entity value arrays over the frame sequence.
#[derive(Clone, Debug, Default)]
pub struct TrackStore {
    tracks: Vec<EntityTrack>, // first-seen order
    by_id: HashMap<EntityId, usize>,
    frame_count: usize,
}

impl TrackStore {
    /// Builds one track per entity seen in any frame and fills the gaps.
    ///
    /// Only slots that were filled by the frames themselves are read when filling, so a
    /// gap is always bridged between two observed values (or held flat at the edges).
    #[tracing::instrument(skip(seq), fields(frames = seq.len()))]
    pub fn build(seq: &FrameSeq) -> Self {
        let frame_count = seq.len();
        let mut tracks: Vec<EntityTrack> = Vec::new();
        let mut by_id: HashMap<EntityId, usize> = HashMap::new();

        for (fi, frame) in seq.frames.iter().enumerate() {
            for e in &frame.entries {
                let idx = *by_id.entry(e.id.clone()).or_insert_with(|| {
                    tracks.push(EntityTrack {
                        id: e.id.clone(),
                        name: e.name.clone(),
                        color_key: tracks.len(),
                        values: vec![None; frame_count],
                    });
                    tracks.len() - 1
                });
                tracks[idx].values[fi] = Some(e.value);
            }
        }

        for t in &mut tracks {
            t.fill_gaps();
        }

        tracing::debug!(entities = tracks.len(), "built entity tracks");
        Self {
            tracks,
            by_id,
            frame_count,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EntityTrack> {
        self.by_id.get(id).map(|&i| &self.tracks[i])
    }

    /// `None` for unknown entities and out-of-range frames.
    pub fn value_at(&self, id: &str, f: FrameIndex) -> Option<f64> {
        self.get(id).and_then(|t| t.value_at(f))
    }

    /// Tracks in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityTrack> {
        self.tracks.iter()
    }

    /// Smallest and largest value over every slot of every track.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        self.tracks
            .iter()
            .flat_map(|t| t.values.iter().flatten().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, Frame};
    use chrono::NaiveDate;

    fn seq_from(rows: &[&[(&str, f64)]]) -> FrameSeq {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let frames = rows
            .iter()
            .map(|row| Frame {
                date,
                entries: row.iter().map(|(id, v)| Entry::new(*id, *id, *v)).collect(),
                is_synthetic: false,
            })
            .collect::<Vec<_>>();
        let anchors = (0..frames.len()).map(FrameIndex).collect();
        FrameSeq { frames, anchors }
    }

    #[test]
    fn interior_gap_is_linear() {
        let seq = seq_from(&[&[("x", 0.0)], &[], &[], &[], &[], &[("x", 50.0)]]);
        let store = TrackStore::build(&seq);
        for i in 0..6 {
            let v = store.value_at("x", FrameIndex(i)).unwrap();
            assert!((v - 10.0 * i as f64).abs() < 1e-9, "frame {i}: {v}");
        }
    }

    #[test]
    fn edges_hold_flat() {
        let seq = seq_from(&[&[], &[("x", 7.0)], &[("x", 9.0)], &[]]);
        let store = TrackStore::build(&seq);
        assert_eq!(store.value_at("x", FrameIndex(0)), Some(7.0));
        assert_eq!(store.value_at("x", FrameIndex(3)), Some(9.0));
    }

    #[test]
    fn no_missing_slots_after_fill() {
        let seq = seq_from(&[
            &[("a", 1.0)],
            &[("b", 2.0)],
            &[("a", 3.0), ("c", 4.0)],
            &[],
            &[("b", 6.0)],
        ]);
        let store = TrackStore::build(&seq);
        for t in store.iter() {
            assert!(t.values.iter().all(Option::is_some), "{} has gaps", t.id);
        }
    }

    #[test]
    fn first_seen_order_drives_color_keys() {
        let seq = seq_from(&[&[("b", 1.0), ("a", 1.0)], &[("c", 1.0)]]);
        let store = TrackStore::build(&seq);
        let ids: Vec<_> = store.iter().map(|t| (t.id.as_str(), t.color_key)).collect();
        assert_eq!(ids, vec![("b", 0), ("a", 1), ("c", 2)]);
    }

    #[test]
    fn unknown_entity_and_out_of_range_are_none() {
        let store = TrackStore::build(&seq_from(&[&[("a", 1.0)]]));
        assert_eq!(store.value_at("nope", FrameIndex(0)), None);
        assert_eq!(store.value_at("a", FrameIndex(9)), None);
        assert_eq!(store.value_bounds(), Some((1.0, 1.0)));
    }
}
