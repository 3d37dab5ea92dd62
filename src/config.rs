use crate::{
    error::{RaceError, RaceResult},
    load::Aggregation,
    scale::ScaleMode,
};

/// Engine settings. Every field has a default, so a partial JSON object is a valid config.
///
/// The plot size matches a 1000x600 canvas with margins of 40 (top), 150 (right), 60 (bottom)
/// and 80 (left).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub top_n: usize,
    pub frames_per_transition: usize,
    pub window_size: usize, // snapshots visible in the sliding window
    pub fade_speed: f64,    // progress per tick, (0, 1)
    pub scale_mode: ScaleMode,
    pub plot_width: f64,
    pub plot_height: f64,
    pub min_label_gap: f64,
    pub label_padding: f64,
    pub leader_epsilon: f64,
    pub base_opacity: f64,
    pub speed: u32, // 1..=10, see `Playback`
    pub aggregation: Aggregation,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            frames_per_transition: 10,
            window_size: 9,
            fade_speed: 0.1,
            scale_mode: ScaleMode::Dynamic,
            plot_width: 770.0,
            plot_height: 500.0,
            min_label_gap: 16.0,
            label_padding: 8.0,
            leader_epsilon: 2.0,
            base_opacity: 1.0,
            speed: 6,
            aggregation: Aggregation::Daily,
        }
    }
}

impl RaceConfig {
    pub fn from_json_str(s: &str) -> RaceResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> RaceResult<()> {
        if self.top_n == 0 {
            return Err(RaceError::validation("top_n must be >= 1"));
        }
        if self.frames_per_transition == 0 {
            return Err(RaceError::validation("frames_per_transition must be >= 1"));
        }
        if self.window_size == 0 {
            return Err(RaceError::validation("window_size must be >= 1"));
        }
        if !(self.fade_speed > 0.0 && self.fade_speed < 1.0) {
            return Err(RaceError::validation("fade_speed must be in (0, 1)"));
        }
        for (name, v) in [
            ("plot_width", self.plot_width),
            ("plot_height", self.plot_height),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(RaceError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        for (name, v) in [
            ("min_label_gap", self.min_label_gap),
            ("label_padding", self.label_padding),
            ("leader_epsilon", self.leader_epsilon),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(RaceError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.base_opacity) {
            return Err(RaceError::validation("base_opacity must be in [0, 1]"));
        }
        Ok(())
    }
}
