use chrono::NaiveDate;

use crate::{
    core::{FrameIndex, FrameRange},
    ctx::FrameCtx,
    error::{RaceError, RaceResult},
    foundation::math::{lerp, ratio_or_zero},
    model::FrameSeq,
};

/// Minimum whole-line opacity for a trail that is partly scrolled off.
pub const MIN_BASE_OPACITY: f64 = 0.1;

/// Anchor layout of the dense sequence.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    anchors: Vec<FrameIndex>,
    dates: Vec<NaiveDate>, // one per anchor
    frame_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TimelinePos {
    pub frame: FrameIndex,
    pub anchor_index: usize,
    pub anchor_frame: FrameIndex,
    pub next_anchor_frame: Option<FrameIndex>,
    pub progress: f64, // 0..1 between anchor_frame and next_anchor_frame
}

impl TimelinePos {
    /// Continuous position in snapshot units.
    pub fn ordinal(&self) -> f64 {
        self.anchor_index as f64 + self.progress
    }
}

impl Timeline {
    pub fn from_frames(seq: &FrameSeq) -> Self {
        let dates = seq
            .anchors
            .iter()
            .filter_map(|a| seq.get(*a).map(|f| f.date))
            .collect();
        Self {
            anchors: seq.anchors.clone(),
            dates,
            frame_count: seq.len(),
        }
    }

    pub fn anchors(&self) -> &[FrameIndex] {
        &self.anchors
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn position(&self, frame: FrameIndex) -> TimelinePos {
        let anchor_index = self
            .anchors
            .partition_point(|a| a.0 <= frame.0)
            .saturating_sub(1);
        let anchor_frame = self.anchors.get(anchor_index).copied().unwrap_or(FrameIndex(0));
        let next_anchor_frame = self.anchors.get(anchor_index + 1).copied();

        let progress = match next_anchor_frame {
            Some(next) if frame.0 >= anchor_frame.0 => ratio_or_zero(
                (frame.0 - anchor_frame.0) as f64,
                (next.0 - anchor_frame.0) as f64,
            )
            .clamp(0.0, 1.0),
            _ => 0.0,
        };

        TimelinePos {
            frame,
            anchor_index,
            anchor_frame,
            next_anchor_frame,
            progress,
        }
    }

    /// One snapshot step ahead of `frame`: the next anchor, or the last frame.
    pub fn lookahead_frame(&self, frame: FrameIndex) -> FrameIndex {
        let last = FrameIndex(self.frame_count.saturating_sub(1));
        self.position(frame)
            .next_anchor_frame
            .unwrap_or(last)
            .min(last)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    Fill,
    Sliding,
}

/// Horizontal domain in snapshot-ordinal units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct AxisDomain {
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AxisTick {
    pub anchor_index: usize,
    pub date: NaiveDate,
    pub x: f64,
}

/// Resolved visible window for one frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Window {
    pub phase: WindowPhase,
    pub pos: TimelinePos,
    pub start: f64,          // fractional first frame inside the window
    pub frames: FrameRange, // frames that contribute trail points
    pub now_x: f64,
    pub x_domain: AxisDomain,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TrailPoint {
    pub frame: FrameIndex,
    pub value: f64,
    pub x: f64,
    pub fade_opacity: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Trail {
    pub points: Vec<TrailPoint>,
    pub base_opacity: f64,
}

impl Trail {
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            base_opacity: 1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TrailPoint> {
        self.points.last()
    }
}

/// Maps frames to horizontal plot positions over a window of `window_size` snapshots.
#[derive(Clone, Copy, Debug)]
pub struct WindowMapper {
    window_size: usize,
    plot_width: f64,
}

impl WindowMapper {
    pub fn new(window_size: usize, plot_width: f64) -> RaceResult<Self> {
        if window_size == 0 {
            return Err(RaceError::validation("window_size must be >= 1"));
        }
        if !(plot_width.is_finite() && plot_width > 0.0) {
            return Err(RaceError::validation("plot_width must be finite and > 0"));
        }
        Ok(Self {
            window_size,
            plot_width,
        })
    }

    pub fn window(&self, timeline: &Timeline, frame: FrameIndex) -> Window {
        let pos = timeline.position(frame);
        let w = self.window_size as f64;

        if pos.anchor_index < self.window_size {
            return Window {
                phase: WindowPhase::Fill,
                pos,
                start: 0.0,
                frames: FrameRange::up_to(FrameIndex(0), frame),
                now_x: pos.ordinal() * (self.plot_width / w),
                x_domain: AxisDomain { start: 0.0, end: w },
            };
        }

        // The window start slides between two anchors at the same rate as "now" does.
        let anchors = timeline.anchors();
        let a0 = anchors[pos.anchor_index - self.window_size];
        let a1 = anchors[pos.anchor_index - self.window_size + 1];
        let start = lerp(a0.as_f64(), a1.as_f64(), pos.progress);
        let first = FrameIndex(start.floor() as usize);

        Window {
            phase: WindowPhase::Sliding,
            pos,
            start,
            frames: FrameRange::up_to(first, frame),
            now_x: self.plot_width,
            x_domain: AxisDomain {
                start: pos.ordinal() - w,
                end: pos.ordinal(),
            },
        }
    }

    /// Historical points for `id` up to the current frame.
    ///
    /// Unknown entities get an empty trail.
    pub fn trail(&self, ctx: &FrameCtx<'_>, id: &str) -> Trail {
        let window = self.window(ctx.timeline, ctx.frame);
        self.trail_in(ctx, &window, id)
    }

    pub fn trail_in(&self, ctx: &FrameCtx<'_>, window: &Window, id: &str) -> Trail {
        let Some(track) = ctx.tracks.get(id) else {
            return Trail::empty();
        };

        let values: Vec<(FrameIndex, f64)> = window
            .frames
            .iter()
            .filter_map(|f| track.value_at(f).map(|v| (f, v)))
            .collect();
        if values.is_empty() {
            return Trail::empty();
        }

        let points: Vec<TrailPoint> = match window.phase {
            WindowPhase::Fill => {
                let last = values.len() - 1;
                values
                    .iter()
                    .enumerate()
                    .map(|(j, &(frame, value))| TrailPoint {
                        frame,
                        value,
                        x: if last == 0 {
                            window.now_x
                        } else {
                            window.now_x * (j as f64) / (last as f64)
                        },
                        fade_opacity: 1.0,
                    })
                    .collect()
            }
            WindowPhase::Sliding => {
                let span = ctx.frame.as_f64() - window.start;
                values
                    .iter()
                    .map(|&(frame, value)| {
                        let f = frame.as_f64();
                        let x = if span <= 0.0 {
                            self.plot_width
                        } else {
                            ratio_or_zero(f - window.start, span) * self.plot_width
                        };
                        let fade_opacity = if f < window.start {
                            (1.0 - (window.start - f)).max(0.0)
                        } else {
                            1.0
                        };
                        TrailPoint {
                            frame,
                            value,
                            x,
                            fade_opacity,
                        }
                    })
                    .collect()
            }
        };

        let min_fade = points
            .iter()
            .map(|p| p.fade_opacity)
            .fold(1.0f64, f64::min);
        Trail {
            points,
            base_opacity: min_fade.max(MIN_BASE_OPACITY),
        }
    }

    /// Anchors that fall inside the horizontal domain, with their plot positions.
    pub fn axis_ticks(&self, timeline: &Timeline, window: &Window) -> Vec<AxisTick> {
        let w = self.window_size as f64;
        let eps = 1e-9;
        timeline
            .dates
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let i = *i as f64;
                i >= window.x_domain.start - eps && i <= window.x_domain.end + eps
            })
            .map(|(i, date)| AxisTick {
                anchor_index: i,
                date: *date,
                x: (i as f64 - window.x_domain.start) / w * self.plot_width,
            })
            .collect()
    }
}
