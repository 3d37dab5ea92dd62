//! chartrace turns a sparse series of dated, ranked snapshots into a smooth "line chart race".
//!
//! The crate is the data/animation engine between the snapshots and whatever draws them. It
//! never touches a canvas; every tick yields a [`RaceFrame`] with positions, opacities,
//! scales and label placements that a renderer can draw as-is.
//!
//! # Pipeline overview
//!
//! 1. **Interpolate**: `[Snapshot] -> FrameSeq` (synthetic frames between real snapshots)
//! 2. **Track**: `FrameSeq -> TrackStore` (dense, gap-filled value per entity and frame)
//! 3. **Rank**: top-N per frame, ties in first-seen order
//! 4. **Fade**: Entering / Steady / Leaving per entity, the only state kept across ticks
//! 5. **Window**: trails over a sliding window whose left edge moves with sub-frames
//! 6. **Scale**: vertical domain covering every visible point plus one snapshot of look-ahead
//! 7. **Labels**: min-gap stacking with compression and leader flags
//!
//! [`RaceEngine`] wires the stages together behind `tick` / `advance` / `reset`; the caller
//! owns the clock and asks [`RaceEngine::frame_delay`] how long to wait between ticks.
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod ctx;
pub mod engine;
pub mod fade;
pub mod interp;
pub mod label;
pub mod load;
pub mod model;
pub mod playback;
pub mod rank;
pub mod scale;
pub mod track;
pub mod window;

pub use foundation::{core, error};

pub use config::RaceConfig;
pub use crate::core::{EntityId, FrameIndex, FrameRange, Point};
pub use ctx::FrameCtx;
pub use engine::{RaceEngine, RaceFrame, VisibleEntity};
pub use error::{RaceError, RaceResult};
pub use fade::{FadeMachine, FadeMap, FadePhase, FadeState};
pub use interp::interpolate_frames;
pub use label::{LabelLayout, LabelPlacement, resolve_labels};
pub use load::{Aggregation, aggregate, load_snapshots, parse_snapshots, validate_snapshots};
pub use model::{Entry, Frame, FrameSeq, Snapshot};
pub use playback::Playback;
pub use rank::{RankedEntity, top_n};
pub use scale::{ScaleEstimator, ScaleMode, ValueDomain, fixed_domain};
pub use track::{EntityTrack, TrackStore};
pub use window::{
    AxisDomain, AxisTick, Timeline, TimelinePos, Trail, TrailPoint, Window, WindowMapper,
    WindowPhase,
};
