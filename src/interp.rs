use std::collections::{HashMap, HashSet};

use crate::{
    core::FrameIndex,
    error::{RaceError, RaceResult},
    foundation::math::lerp,
    model::{Entry, Frame, FrameSeq, Snapshot},
};

/// Expands sparse snapshots into a dense frame sequence.
///
/// Every consecutive pair `(S_i, S_{i+1})` contributes `S_i` followed by
/// `frames_per_transition - 1` synthetic frames at `t = j / frames_per_transition`.
/// The last snapshot is appended unmodified, so `N >= 2` snapshots yield
/// `(N - 1) * frames_per_transition + 1` frames.
///
/// Blend rules for a synthetic frame:
/// - present in both neighbours: linear blend
/// - only in `S_i`: value held
/// - only in `S_{i+1}`: `v * t`, i.e. new entrants rise from zero
#[tracing::instrument(skip(snapshots), fields(snapshots = snapshots.len()))]
pub fn interpolate_frames(
    snapshots: &[Snapshot],
    frames_per_transition: usize,
) -> RaceResult<FrameSeq> {
    if frames_per_transition == 0 {
        return Err(RaceError::validation("frames_per_transition must be >= 1"));
    }

    if snapshots.len() < 2 {
        return Ok(FrameSeq {
            frames: snapshots.iter().map(Frame::from_snapshot).collect(),
            anchors: (0..snapshots.len()).map(FrameIndex).collect(),
        });
    }

    let total = (snapshots.len() - 1) * frames_per_transition + 1;
    let mut frames = Vec::with_capacity(total);
    let mut anchors = Vec::with_capacity(snapshots.len());

    for pair in snapshots.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        anchors.push(FrameIndex(frames.len()));
        frames.push(Frame::from_snapshot(from));

        let from_ids: HashSet<&str> = from.entries.iter().map(|e| e.id.as_str()).collect();
        let to_by_id: HashMap<&str, &Entry> =
            to.entries.iter().map(|e| (e.id.as_str(), e)).collect();
        for j in 1..frames_per_transition {
            let t = (j as f64) / (frames_per_transition as f64);
            frames.push(blend(from, to, &from_ids, &to_by_id, t));
        }
    }

    let last = &snapshots[snapshots.len() - 1];
    anchors.push(FrameIndex(frames.len()));
    frames.push(Frame::from_snapshot(last));

    debug_assert_eq!(frames.len(), total);
    tracing::debug!(frames = frames.len(), anchors = anchors.len(), "interpolated");
    Ok(FrameSeq { frames, anchors })
}

fn blend(
    from: &Snapshot,
    to: &Snapshot,
    from_ids: &HashSet<&str>,
    to_by_id: &HashMap<&str, &Entry>,
    t: f64,
) -> Frame {
    let mut entries = Vec::with_capacity(from.entries.len().max(to.entries.len()));

    for e in &from.entries {
        let value = match to_by_id.get(e.id.as_str()) {
            Some(next) => lerp(e.value, next.value, t),
            None => e.value,
        };
        entries.push(Entry {
            id: e.id.clone(),
            name: e.name.clone(),
            value,
        });
    }

    for e in &to.entries {
        if from_ids.contains(e.id.as_str()) {
            continue;
        }
        entries.push(Entry {
            id: e.id.clone(),
            name: e.name.clone(),
            value: e.value * t,
        });
    }

    Frame {
        date: from.date,
        entries,
        is_synthetic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn value_of(frame: &Frame, id: &str) -> Option<f64> {
        frame
            .entries
            .iter()
            .find(|e| e.id.as_str() == id)
            .map(|e| e.value)
    }

    fn two_snapshots() -> Vec<Snapshot> {
        vec![
            Snapshot::new(
                day(1),
                vec![Entry::new("A", "A", 10.0), Entry::new("B", "B", 5.0)],
            ),
            Snapshot::new(
                day(2),
                vec![
                    Entry::new("A", "A", 20.0),
                    Entry::new("B", "B", 15.0),
                    Entry::new("C", "C", 1.0),
                ],
            ),
        ]
    }

    #[test]
    fn midpoint_blends_and_ramps_new_entrants() {
        let seq = interpolate_frames(&two_snapshots(), 4).unwrap();
        assert_eq!(seq.len(), 5);
        let mid = &seq.frames[2];
        assert!(mid.is_synthetic);
        assert_eq!(value_of(mid, "A"), Some(15.0));
        assert_eq!(value_of(mid, "B"), Some(10.0));
        assert_eq!(value_of(mid, "C"), Some(0.5));
        assert_eq!(mid.date, day(1));
    }

    #[test]
    fn departing_entity_holds_its_value() {
        let snaps = vec![
            Snapshot::new(
                day(1),
                vec![Entry::new("A", "A", 8.0), Entry::new("Z", "Z", 3.0)],
            ),
            Snapshot::new(day(2), vec![Entry::new("A", "A", 4.0)]),
        ];
        let seq = interpolate_frames(&snaps, 4).unwrap();
        for f in &seq.frames[1..4] {
            assert_eq!(value_of(f, "Z"), Some(3.0));
        }
        assert_eq!(value_of(&seq.frames[4], "Z"), None);
    }

    #[test]
    fn frame_counts_and_anchors() {
        let mut snaps = two_snapshots();
        snaps.push(Snapshot::new(day(3), vec![Entry::new("A", "A", 1.0)]));
        let seq = interpolate_frames(&snaps, 3).unwrap();
        assert_eq!(seq.len(), (3 - 1) * 3 + 1);
        assert_eq!(seq.anchors, vec![FrameIndex(0), FrameIndex(3), FrameIndex(6)]);
        for (i, f) in seq.frames.iter().enumerate() {
            assert_eq!(!f.is_synthetic, seq.anchors.contains(&FrameIndex(i)));
        }
    }

    #[test]
    fn one_frame_per_transition_means_no_synthetic_frames() {
        let seq = interpolate_frames(&two_snapshots(), 1).unwrap();
        assert_eq!(seq.len(), 2);
        assert!(seq.frames.iter().all(|f| !f.is_synthetic));
    }

    #[test]
    fn short_inputs_pass_through() {
        assert!(interpolate_frames(&[], 4).unwrap().is_empty());
        let one = &two_snapshots()[..1];
        let seq = interpolate_frames(one, 4).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.anchors, vec![FrameIndex(0)]);
    }

    #[test]
    fn zero_frames_per_transition_is_rejected() {
        assert!(interpolate_frames(&two_snapshots(), 0).is_err());
    }
}
