use crate::core::EntityId;

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LabelPlacement {
    pub id: EntityId,
    pub natural_y: f64,
    pub adjusted_y: f64,
    pub needs_leader: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelLayout {
    pub plot_height: f64,
    pub min_gap: f64,
    pub padding: f64,        // kept free above the bottom edge
    pub leader_epsilon: f64, // displacement that warrants a connector
}

impl LabelLayout {
    fn bottom(&self) -> f64 {
        (self.plot_height - self.padding).max(0.0)
    }
}

/// Stacks labels top to bottom with at least `min_gap` between neighbours.
///
/// Output is sorted by natural y (ties keep input order). When the stack runs past the bottom
/// bound it is compressed upward: the free space above the first label and the slack of every
/// gap wider than `min_gap` are consumed proportionally, so lower labels move further. A stack
/// that cannot fit even with every gap at `min_gap` is spread evenly over the plot instead.
pub fn resolve_labels(
    natural: impl IntoIterator<Item = (EntityId, f64)>,
    layout: &LabelLayout,
) -> Vec<LabelPlacement> {
    let mut items: Vec<(EntityId, f64)> = natural.into_iter().collect();
    items.sort_by(|a, b| a.1.total_cmp(&b.1));
    if items.is_empty() {
        return Vec::new();
    }

    let mut ys: Vec<f64> = Vec::with_capacity(items.len());
    for (i, (_, natural_y)) in items.iter().enumerate() {
        let y = if i == 0 {
            natural_y.max(0.0)
        } else {
            natural_y.max(ys[i - 1] + layout.min_gap)
        };
        ys.push(y);
    }

    let bottom = layout.bottom();
    let overflow = ys[ys.len() - 1] - bottom;
    if overflow > 0.0 {
        compress(&mut ys, overflow, bottom, layout.min_gap);
    }

    items
        .into_iter()
        .zip(ys)
        .map(|((id, natural_y), adjusted_y)| LabelPlacement {
            needs_leader: (adjusted_y - natural_y).abs() > layout.leader_epsilon,
            id,
            natural_y,
            adjusted_y,
        })
        .collect()
}

fn compress(ys: &mut [f64], overflow: f64, bottom: f64, min_gap: f64) {
    // slack[0] is the room above the first label, slack[i] the excess of gap i over min_gap.
    let slack: Vec<f64> = ys
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            if i == 0 {
                y.max(0.0)
            } else {
                (y - ys[i - 1] - min_gap).max(0.0)
            }
        })
        .collect();
    let total: f64 = slack.iter().sum();

    if total < overflow {
        let step = if ys.len() > 1 {
            bottom / (ys.len() - 1) as f64
        } else {
            0.0
        };
        for (i, y) in ys.iter_mut().enumerate() {
            *y = step * i as f64;
        }
        return;
    }

    let share = overflow / total;
    let mut shift = 0.0;
    for (y, s) in ys.iter_mut().zip(&slack) {
        shift += s * share;
        *y -= shift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LabelLayout {
        LabelLayout {
            plot_height: 100.0,
            min_gap: 10.0,
            padding: 5.0,
            leader_epsilon: 2.0,
        }
    }

    fn input(ys: &[(&str, f64)]) -> Vec<(EntityId, f64)> {
        ys.iter().map(|(id, y)| (EntityId::from(*id), *y)).collect()
    }

    fn assert_gaps(out: &[LabelPlacement], min_gap: f64) {
        for w in out.windows(2) {
            assert!(
                w[1].adjusted_y >= w[0].adjusted_y + min_gap - 1e-9,
                "{} -> {}",
                w[0].adjusted_y,
                w[1].adjusted_y
            );
        }
    }

    #[test]
    fn spread_labels_are_untouched() {
        let out = resolve_labels(input(&[("b", 50.0), ("a", 10.0)]), &layout());
        assert_eq!(out[0].id.as_str(), "a");
        assert_eq!(out[0].adjusted_y, 10.0);
        assert_eq!(out[1].adjusted_y, 50.0);
        assert!(out.iter().all(|l| !l.needs_leader));
    }

    #[test]
    fn overlapping_labels_are_pushed_down() {
        let out = resolve_labels(input(&[("a", 20.0), ("b", 21.0), ("c", 22.0)]), &layout());
        let ys: Vec<_> = out.iter().map(|l| l.adjusted_y).collect();
        assert_eq!(ys, vec![20.0, 30.0, 40.0]);
        assert!(!out[0].needs_leader);
        assert!(out[1].needs_leader);
        assert!(out[2].needs_leader);
        assert_gaps(&out, 10.0);
    }

    #[test]
    fn small_nudges_do_not_need_leaders() {
        let out = resolve_labels(input(&[("a", 20.0), ("b", 28.5)]), &layout());
        assert_eq!(out[1].adjusted_y, 30.0);
        assert!(!out[1].needs_leader);
    }

    #[test]
    fn bottom_overflow_compresses_upward() {
        let out = resolve_labels(
            input(&[("a", 40.0), ("b", 90.0), ("c", 92.0), ("d", 93.0)]),
            &layout(),
        );
        let last = out.last().unwrap().adjusted_y;
        assert!((last - 95.0).abs() < 1e-9);
        assert_gaps(&out, 10.0);
        assert!(out.iter().all(|l| (0.0..=100.0).contains(&l.adjusted_y)));
        // Forward pass gives 40, 90, 100, 110; lower labels move at least as far as upper ones.
        let forward = [40.0, 90.0, 100.0, 110.0];
        let shifts: Vec<f64> = out
            .iter()
            .zip(forward)
            .map(|(l, f)| f - l.adjusted_y)
            .collect();
        for w in shifts.windows(2) {
            assert!(w[1] >= w[0] - 1e-9);
        }
        assert!((shifts[0] - 7.5).abs() < 1e-9);
        assert!((shifts[3] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn impossible_stack_is_spread_over_plot() {
        let many: Vec<(String, f64)> = (0..20).map(|i| (format!("e{i}"), 50.0)).collect();
        let out = resolve_labels(
            many.iter().map(|(id, y)| (EntityId::new(id.clone()), *y)),
            &layout(),
        );
        assert_eq!(out.len(), 20);
        assert_eq!(out[0].adjusted_y, 0.0);
        assert!((out[19].adjusted_y - 95.0).abs() < 1e-9);
        assert!(out.iter().all(|l| (0.0..=100.0).contains(&l.adjusted_y)));
        // Ties keep input order.
        assert_eq!(out[0].id.as_str(), "e0");
        assert_eq!(out[19].id.as_str(), "e19");
    }

    #[test]
    fn empty_input() {
        assert!(resolve_labels(Vec::new(), &layout()).is_empty());
    }
}
