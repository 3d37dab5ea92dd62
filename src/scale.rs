use crate::{
    ctx::FrameCtx,
    foundation::math::ratio_or_zero,
    model::FrameSeq,
    rank::top_n,
    window::Trail,
};

const DYNAMIC_HEADROOM: f64 = 1.1;
const FIXED_FLOOR: f64 = 0.95;
const FIXED_HEADROOM: f64 = 1.05;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    Fixed,
    #[default]
    Dynamic,
}

/// Vertical value domain `[min, max]`, never negative, never empty.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ValueDomain {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueDomain {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl ValueDomain {
    fn from_bounds(lo: f64, hi: f64) -> Self {
        let min = lo.max(0.0);
        let max = if hi > min { hi } else { min + 1.0 };
        Self { min, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// Plot y for `v`: `min` maps to the bottom (`plot_height`), `max` to the top (0).
    pub fn y_for(&self, v: f64, plot_height: f64) -> f64 {
        plot_height * (1.0 - ratio_or_zero(v - self.min, self.max - self.min))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScaleEstimator {
    mode: ScaleMode,
    top_n: usize,
    fixed: ValueDomain,
}

impl ScaleEstimator {
    /// The fixed domain is computed here, once, over every frame.
    pub fn new(mode: ScaleMode, top_n: usize, seq: &FrameSeq) -> Self {
        Self {
            mode,
            top_n,
            fixed: fixed_domain(seq),
        }
    }

    /// Domain for the current frame.
    ///
    /// `visible_trails` must be the trails of every entity holding a fade state. In dynamic
    /// mode the top-N values one snapshot step ahead are added so the axis grows before a
    /// rank change would push a line outside of it.
    pub fn domain<'t>(
        &self,
        ctx: &FrameCtx<'_>,
        visible_trails: impl IntoIterator<Item = &'t Trail>,
    ) -> ValueDomain {
        if self.mode == ScaleMode::Fixed {
            return self.fixed;
        }

        let mut bounds: Option<(f64, f64)> = None;
        let mut push = |v: f64| {
            bounds = Some(match bounds {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        };

        for trail in visible_trails {
            for p in &trail.points {
                push(p.value);
            }
        }

        let ahead = ctx.timeline.lookahead_frame(ctx.frame);
        for r in top_n(ctx.tracks, ctx.frame, self.top_n) {
            if let Some(v) = ctx.tracks.value_at(r.id.as_str(), ahead) {
                push(v);
            }
        }
        for r in top_n(ctx.tracks, ahead, self.top_n) {
            push(r.value);
        }

        let domain = match bounds {
            Some((lo, hi)) => ValueDomain::from_bounds(lo, hi * DYNAMIC_HEADROOM),
            None => ValueDomain::default(),
        };
        tracing::trace!(frame = ctx.frame.0, min = domain.min, max = domain.max, "scale");
        domain
    }
}

/// `[max(0, 0.95 * min), 1.05 * max]` over every entry of every frame.
pub fn fixed_domain(seq: &FrameSeq) -> ValueDomain {
    let bounds = seq
        .frames
        .iter()
        .flat_map(|f| f.entries.iter().map(|e| e.value))
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
    match bounds {
        Some((lo, hi)) => ValueDomain::from_bounds(lo * FIXED_FLOOR, hi * FIXED_HEADROOM),
        None => ValueDomain::default(),
    }
}
