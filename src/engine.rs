use std::{collections::HashMap, time::Duration};

use crate::{
    config::RaceConfig,
    core::{EntityId, FrameIndex, Point},
    ctx::FrameCtx,
    error::{RaceError, RaceResult},
    fade::{FadeMachine, FadeMap, FadePhase},
    interp::interpolate_frames,
    label::{LabelLayout, LabelPlacement, resolve_labels},
    load::aggregate,
    model::{FrameSeq, Snapshot},
    playback::Playback,
    rank::{RankedEntity, top_n},
    scale::{ScaleEstimator, ValueDomain},
    track::TrackStore,
    window::{
        AxisDomain, AxisTick, Timeline, TimelinePos, Trail, TrailPoint, WindowMapper, WindowPhase,
    },
};

/// Everything the renderer needs for one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RaceFrame {
    pub frame: FrameIndex,
    pub date: String,
    pub is_synthetic: bool,
    pub pos: TimelinePos,
    pub phase: WindowPhase,
    pub top: Vec<RankedEntity>,
    pub entities: Vec<VisibleEntity>, // top-N by rank, then fading stragglers
    pub y_domain: ValueDomain,
    pub x_domain: AxisDomain,
    pub x_ticks: Vec<AxisTick>,
    pub now_x: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VisibleEntity {
    pub id: EntityId,
    pub name: String,
    pub color_key: usize,
    pub rank: Option<usize>, // None while fading out below the cutoff
    pub value: f64,
    pub phase: Option<FadePhase>,
    pub opacity: f64,      // fade progress * configured base opacity
    pub line_opacity: f64, // opacity dimmed by the trail's scroll-off
    pub trail: Vec<TrailPoint>,
    pub dot: Point,
    pub label: LabelPlacement,
    pub label_text: String,
}

/// Owns the dense data and the only cross-tick state (fade map, cursor, playback).
#[derive(Clone, Debug)]
pub struct RaceEngine {
    config: RaceConfig,
    seq: FrameSeq,
    tracks: TrackStore,
    timeline: Timeline,
    mapper: WindowMapper,
    scale: ScaleEstimator,
    labels: LabelLayout,
    fades: FadeMachine,
    playback: Playback,
    cursor: Option<FrameIndex>, // last ticked frame, None after reset
}

impl RaceEngine {
    #[tracing::instrument(skip_all, fields(snapshots = snapshots.len()))]
    pub fn new(snapshots: Vec<Snapshot>, config: RaceConfig) -> RaceResult<Self> {
        config.validate()?;

        let snapshots = aggregate(snapshots, config.aggregation);
        let seq = interpolate_frames(&snapshots, config.frames_per_transition)?;
        let tracks = TrackStore::build(&seq);
        let timeline = Timeline::from_frames(&seq);
        let mapper = WindowMapper::new(config.window_size, config.plot_width)?;
        let scale = ScaleEstimator::new(config.scale_mode, config.top_n, &seq);
        let fades = FadeMachine::new(config.fade_speed)?;
        let labels = LabelLayout {
            plot_height: config.plot_height,
            min_gap: config.min_label_gap,
            padding: config.label_padding,
            leader_epsilon: config.leader_epsilon,
        };

        if seq.is_empty() {
            tracing::warn!("no snapshots, engine has no frames");
        }
        tracing::info!(
            snapshots = snapshots.len(),
            frames = seq.len(),
            entities = tracks.len(),
            "race engine ready"
        );

        Ok(Self {
            playback: Playback::new(config.speed),
            config,
            seq,
            tracks,
            timeline,
            mapper,
            scale,
            labels,
            fades,
            cursor: None,
        })
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn frames(&self) -> &FrameSeq {
        &self.seq
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.tracks
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn fade_states(&self) -> &FadeMap {
        self.fades.states()
    }

    pub fn frame_count(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn cursor(&self) -> Option<FrameIndex> {
        self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        match (self.cursor, self.seq.last_index()) {
            (Some(c), Some(last)) => c >= last,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Starts playback, rewinding first when the last frame was already shown.
    pub fn play(&mut self) {
        if self.is_at_end() {
            self.reset();
        }
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.playback.set_speed(speed);
    }

    pub fn speed(&self) -> u32 {
        self.playback.speed()
    }

    /// Delay the scheduler should wait between ticks.
    pub fn frame_delay(&self) -> Duration {
        self.playback.frame_delay()
    }

    /// Clears the fade map, rewinds the cursor and stops playback.
    pub fn reset(&mut self) {
        self.fades.reset();
        self.cursor = None;
        self.playback.pause();
        tracing::debug!("reset");
    }

    /// Ticks the frame after the cursor (frame 0 after a reset).
    ///
    /// Returns `None` and pauses once the last frame has been shown.
    pub fn advance(&mut self) -> Option<RaceFrame> {
        let next = self.cursor.map_or(FrameIndex(0), |c| FrameIndex(c.0 + 1));
        if next.0 >= self.seq.len() {
            self.playback.pause();
            return None;
        }
        match self.tick(next) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(frame = next.0, error = %e, "tick failed");
                self.playback.pause();
                None
            }
        }
    }

    /// Steps the fade states with the top-N of `frame`, then renders it.
    pub fn tick(&mut self, frame: FrameIndex) -> RaceResult<RaceFrame> {
        if frame.0 >= self.seq.len() {
            return Err(RaceError::evaluation(format!(
                "frame {} is out of bounds ({} frames)",
                frame.0,
                self.seq.len()
            )));
        }
        let top = top_n(&self.tracks, frame, self.config.top_n);
        self.fades.step(top.iter().map(|r| &r.id));
        self.cursor = Some(frame);
        self.render(frame)
    }

    /// Derives the frame from the current fade map without advancing it.
    pub fn render(&self, frame: FrameIndex) -> RaceResult<RaceFrame> {
        let Some(dense) = self.seq.get(frame) else {
            return Err(RaceError::evaluation(format!(
                "frame {} is out of bounds ({} frames)",
                frame.0,
                self.seq.len()
            )));
        };

        let ctx = FrameCtx {
            frame,
            tracks: &self.tracks,
            timeline: &self.timeline,
            fades: self.fades.states(),
        };
        let top = top_n(&self.tracks, frame, self.config.top_n);
        let window = self.mapper.window(&self.timeline, frame);

        let mut visible: Vec<EntityId> = top.iter().map(|r| r.id.clone()).collect();
        for (id, _) in ctx.fades.iter() {
            if !visible.contains(id) {
                visible.push(id.clone());
            }
        }

        let trails: Vec<Trail> = visible
            .iter()
            .map(|id| self.mapper.trail_in(&ctx, &window, id.as_str()))
            .collect();
        let y_domain = self.scale.domain(&ctx, &trails);
        let plot_height = self.config.plot_height;

        let mut dots: Vec<(EntityId, f64, Point, Trail)> = Vec::with_capacity(visible.len());
        for (id, trail) in visible.into_iter().zip(trails) {
            let Some(value) = self.tracks.value_at(id.as_str(), frame) else {
                continue;
            };
            let x = trail.last().map_or(window.now_x, |p| p.x);
            let dot = Point::new(x, y_domain.y_for(value, plot_height));
            dots.push((id, value, dot, trail));
        }

        let mut placements: HashMap<EntityId, LabelPlacement> = resolve_labels(
            dots.iter().map(|(id, _, dot, _)| (id.clone(), dot.y)),
            &self.labels,
        )
        .into_iter()
        .map(|l| (l.id.clone(), l))
        .collect();

        let ranks: HashMap<&EntityId, usize> = top.iter().map(|r| (&r.id, r.rank)).collect();
        let mut entities = Vec::with_capacity(dots.len());
        for (id, value, dot, trail) in dots {
            let Some(track) = self.tracks.get(id.as_str()) else {
                continue;
            };
            let Some(label) = placements.remove(&id) else {
                continue;
            };
            let fade = ctx.fades.get(id.as_str());
            let opacity = fade.map_or(0.0, |s| s.opacity(self.config.base_opacity));
            entities.push(VisibleEntity {
                rank: ranks.get(&id).copied(),
                name: track.name.clone(),
                color_key: track.color_key,
                value,
                phase: fade.map(|s| s.phase),
                opacity,
                line_opacity: opacity * trail.base_opacity,
                trail: trail.points,
                dot,
                label,
                label_text: label_text(&track.name, value),
                id,
            });
        }

        Ok(RaceFrame {
            frame,
            date: dense.date_label(),
            is_synthetic: dense.is_synthetic,
            pos: window.pos,
            phase: window.phase,
            top,
            entities,
            y_domain,
            x_domain: window.x_domain,
            x_ticks: self.mapper.axis_ticks(&self.timeline, &window),
            now_x: window.now_x,
        })
    }
}

/// Half values round away from zero, so a midpoint of 46.5 reads "47".
fn label_text(name: &str, value: f64) -> String {
    format!("{name}: {}", value.round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;
    use chrono::NaiveDate;

    fn snaps(rows: &[&[(&str, f64)]]) -> Vec<Snapshot> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                Snapshot::new(
                    base + chrono::Days::new(7 * i as u64),
                    row.iter().map(|(id, v)| Entry::new(*id, *id, *v)).collect(),
                )
            })
            .collect()
    }

    fn small_config() -> RaceConfig {
        RaceConfig {
            top_n: 2,
            frames_per_transition: 4,
            window_size: 2,
            fade_speed: 0.25,
            ..RaceConfig::default()
        }
    }

    #[test]
    fn empty_dataset_has_no_frames() {
        let mut e = RaceEngine::new(Vec::new(), RaceConfig::default()).unwrap();
        assert!(e.is_empty());
        assert!(e.is_at_end());
        assert!(e.advance().is_none());
        assert!(e.tick(FrameIndex(0)).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = RaceConfig {
            top_n: 0,
            ..RaceConfig::default()
        };
        assert!(RaceEngine::new(snaps(&[&[("a", 1.0)]]), cfg).is_err());
    }

    #[test]
    fn advance_walks_every_frame_then_pauses() {
        let mut e = RaceEngine::new(
            snaps(&[&[("a", 1.0)], &[("a", 2.0)], &[("a", 3.0)]]),
            small_config(),
        )
        .unwrap();
        e.play();
        let mut seen = Vec::new();
        while let Some(f) = e.advance() {
            seen.push(f.frame.0);
        }
        assert_eq!(seen, (0..9).collect::<Vec<_>>());
        assert!(!e.is_playing());
        assert!(e.is_at_end());

        e.play();
        assert!(e.is_playing());
        assert_eq!(e.cursor(), None);
        assert!(e.fade_states().is_empty());
        assert_eq!(e.advance().unwrap().frame, FrameIndex(0));
    }

    #[test]
    fn reset_clears_cross_tick_state() {
        let mut e = RaceEngine::new(
            snaps(&[&[("a", 1.0), ("b", 2.0)], &[("a", 2.0), ("b", 1.0)]]),
            small_config(),
        )
        .unwrap();
        e.play();
        for _ in 0..3 {
            e.advance();
        }
        assert!(!e.fade_states().is_empty());
        e.reset();
        assert!(e.fade_states().is_empty());
        assert_eq!(e.cursor(), None);
        assert!(!e.is_playing());
    }

    #[test]
    fn render_is_idempotent() {
        let mut e = RaceEngine::new(
            snaps(&[&[("a", 1.0), ("b", 2.0), ("c", 0.5)], &[("a", 3.0), ("c", 4.0)]]),
            small_config(),
        )
        .unwrap();
        e.tick(FrameIndex(0)).unwrap();
        e.tick(FrameIndex(1)).unwrap();
        let a = e.render(FrameIndex(2)).unwrap();
        let b = e.render(FrameIndex(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn labels_and_dots_follow_values() {
        let mut e = RaceEngine::new(
            snaps(&[&[("a", 10.0), ("b", 50.0)], &[("a", 20.0), ("b", 60.0)]]),
            small_config(),
        )
        .unwrap();
        let f = e.tick(FrameIndex(0)).unwrap();
        assert_eq!(f.date, "2024-01-01");
        assert_eq!(f.top[0].id.as_str(), "b");
        assert_eq!(f.entities.len(), 2);
        let b = &f.entities[0];
        assert_eq!(b.rank, Some(0));
        assert_eq!(b.label_text, "b: 50");
        assert_eq!(b.phase, Some(FadePhase::Entering));
        assert_eq!(b.opacity, 0.0);
        let a = &f.entities[1];
        assert!(b.dot.y < a.dot.y, "larger values sit higher");
        assert!(f.y_domain.contains(a.value) && f.y_domain.contains(b.value));
        assert_eq!(a.color_key, 0);
        assert_eq!(b.color_key, 1);
    }

    #[test]
    fn midpoint_labels_round_half_up() {
        let cfg = RaceConfig {
            frames_per_transition: 2,
            ..small_config()
        };
        let mut e = RaceEngine::new(snaps(&[&[("a", 46.0)], &[("a", 47.0)]]), cfg).unwrap();
        e.tick(FrameIndex(0)).unwrap();
        let f = e.tick(FrameIndex(1)).unwrap();
        assert_eq!(f.entities[0].value, 46.5);
        assert_eq!(f.entities[0].label_text, "a: 47");
        assert_eq!(label_text("a", 2.5), "a: 3");
        assert_eq!(label_text("a", 12.0), "a: 12");
    }

    #[test]
    fn speed_controls_delay_hint() {
        let mut e = RaceEngine::new(snaps(&[&[("a", 1.0)]]), RaceConfig::default()).unwrap();
        assert_eq!(e.frame_delay(), Duration::from_millis(500));
        e.set_speed(10);
        assert_eq!(e.speed(), 10);
        assert_eq!(e.frame_delay(), Duration::from_millis(100));
    }
}
