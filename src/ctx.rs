use crate::{core::FrameIndex, fade::FadeMap, track::TrackStore, window::Timeline};

/// Everything a per-frame computation may read.
///
/// Components take this by reference instead of reaching into the engine, so each one can be
/// exercised on hand-built inputs.
#[derive(Clone, Copy, Debug)]
pub struct FrameCtx<'a> {
    pub frame: FrameIndex,
    pub tracks: &'a TrackStore,
    pub timeline: &'a Timeline,
    pub fades: &'a FadeMap,
}
