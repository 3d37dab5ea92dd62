use std::collections::{BTreeMap, HashSet};

use crate::{
    core::EntityId,
    error::{RaceError, RaceResult},
    foundation::math::clamp01,
};

const PROGRESS_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadePhase {
    Entering,
    Steady,
    Leaving,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FadeState {
    pub phase: FadePhase,
    pub progress: f64, // 0..1
}

impl FadeState {
    pub fn opacity(&self, base: f64) -> f64 {
        clamp01(self.progress * base)
    }
}

/// Read-only view of the per-entity fade states.
#[derive(Clone, Debug, Default)]
pub struct FadeMap {
    states: BTreeMap<EntityId, FadeState>,
}

impl FadeMap {
    pub fn get(&self, id: &str) -> Option<&FadeState> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &FadeState)> {
        self.states.iter()
    }
}

/// Owns the only entity-keyed state that survives between ticks.
#[derive(Clone, Debug)]
pub struct FadeMachine {
    speed: f64,
    map: FadeMap,
}

impl FadeMachine {
    pub fn new(speed: f64) -> RaceResult<Self> {
        if !(speed > 0.0 && speed < 1.0) {
            return Err(RaceError::validation("fade_speed must be in (0, 1)"));
        }
        Ok(Self {
            speed,
            map: FadeMap::default(),
        })
    }

    pub fn states(&self) -> &FadeMap {
        &self.map
    }

    pub fn reset(&mut self) {
        self.map.states.clear();
    }

    /// Advances every state by one tick given the current top-N membership.
    pub fn step<'a>(&mut self, top: impl IntoIterator<Item = &'a EntityId>) {
        let speed = self.speed;
        let states = &mut self.map.states;
        let mut in_top: HashSet<&EntityId> = HashSet::new();

        for id in top {
            in_top.insert(id);
            match states.get_mut(id) {
                None => {
                    tracing::debug!(entity = %id, "fade: entering");
                    states.insert(
                        id.clone(),
                        FadeState {
                            phase: FadePhase::Entering,
                            progress: 0.0,
                        },
                    );
                }
                Some(s) => match s.phase {
                    FadePhase::Entering => {
                        s.progress = clamp01(s.progress + speed);
                        if s.progress >= 1.0 - PROGRESS_EPS {
                            s.progress = 1.0;
                            s.phase = FadePhase::Steady;
                            tracing::debug!(entity = %id, "fade: steady");
                        }
                    }
                    FadePhase::Leaving => {
                        s.phase = FadePhase::Entering;
                        tracing::debug!(entity = %id, progress = s.progress, "fade: re-entering");
                    }
                    FadePhase::Steady => {}
                },
            }
        }

        states.retain(|id, s| {
            if in_top.contains(id) {
                return true;
            }
            match s.phase {
                FadePhase::Steady | FadePhase::Entering => {
                    s.phase = FadePhase::Leaving;
                    tracing::debug!(entity = %id, progress = s.progress, "fade: leaving");
                    true
                }
                FadePhase::Leaving => {
                    s.progress = clamp01(s.progress - speed);
                    if s.progress <= PROGRESS_EPS {
                        tracing::debug!(entity = %id, "fade: gone");
                        false
                    } else {
                        true
                    }
                }
            }
        });
    }
}
