//! Visual rank of the competitors inside one stacking context.
//!
//! Ranks are hues on a blue (z = 0, hue 240) to orange (highest z, hue 30)
//! scale. Consecutive competitors are kept at least [`MIN_SEPARATION`]
//! degrees apart so neighbours never share a colour.

use html::dom::NodeKey;

pub const HUE_MAX: f64 = 240.0;
pub const HUE_MIN: f64 = 30.0;
const HUE_SPAN: f64 = HUE_MAX - HUE_MIN;
pub const MIN_SEPARATION: f64 = 5.0;

/// A non-context element competing for paint order inside a context.
#[derive(Clone, Debug, PartialEq)]
pub struct Competitor {
    pub node: NodeKey,
    pub z_index: i32,
    /// Visual rank in degrees, within `[HUE_MIN, HUE_MAX]`.
    pub hue: f64,
}

impl Competitor {
    /// Border colour used to highlight this competitor.
    pub fn border_color(&self) -> String {
        format!("hsl({}, 100%, 50%)", self.hue)
    }
}

/// Assign a hue to every `(node, z-index)` pair, in the given order.
///
/// The linear hue is clamped to `[HUE_MIN, HUE_MAX]` before neighbours are
/// separated. Negative z-indices therefore share the hue of z = 0 instead of
/// extrapolating past `HUE_MAX`.
///
/// A hue closer than [`MIN_SEPARATION`] to the previous one moves up by that
/// much. Only when the clamp cuts that move short does it move down from the
/// previous hue instead.
pub fn rank(competitors: &[(NodeKey, i32)]) -> Vec<Competitor> {
    let max_z = competitors
        .iter()
        .map(|(_, z_index)| *z_index)
        .max()
        .unwrap_or(0)
        .max(1);
    let mut previous: Option<f64> = None;
    competitors
        .iter()
        .map(|&(node, z_index)| {
            let mut hue = (HUE_MAX - f64::from(z_index) * HUE_SPAN / f64::from(max_z))
                .clamp(HUE_MIN, HUE_MAX);
            if let Some(last) = previous
                && (hue - last).abs() < MIN_SEPARATION
            {
                let nudged = hue + MIN_SEPARATION;
                hue = nudged.clamp(HUE_MIN, HUE_MAX);
                if hue < nudged && (hue - last).abs() < MIN_SEPARATION {
                    hue = (last - MIN_SEPARATION).clamp(HUE_MIN, HUE_MAX);
                }
            }
            previous = Some(hue);
            Competitor {
                node,
                z_index,
                hue,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hues(z_indices: &[i32]) -> Vec<f64> {
        let input: Vec<(NodeKey, i32)> = z_indices
            .iter()
            .enumerate()
            .map(|(index, z_index)| (NodeKey(index as u64 + 1), *z_index))
            .collect();
        rank(&input).into_iter().map(|competitor| competitor.hue).collect()
    }

    #[test]
    fn hue_decreases_as_z_index_grows() {
        let ranked = hues(&[0, 10, 20]);
        assert_eq!(ranked, vec![240.0, 135.0, 30.0]);
        assert!(ranked.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn equal_neighbours_are_pushed_apart() {
        let ranked = hues(&[5, 5]);
        assert!((ranked[1] - ranked[0]).abs() >= MIN_SEPARATION);
        assert_eq!(ranked, vec![30.0, 35.0]);
    }

    #[test]
    fn unclamped_nudge_moves_up() {
        assert_eq!(hues(&[140, 143, 210]), vec![100.0, 102.0, 30.0]);
    }

    #[test]
    fn clamped_nudge_goes_the_other_way() {
        let ranked = hues(&[0, 0, 0]);
        assert_eq!(ranked, vec![240.0, 235.0, 240.0]);
    }

    #[test]
    fn negative_z_indices_stay_in_range() {
        assert_eq!(hues(&[-4, 0, -1]), vec![240.0, 235.0, 240.0]);
        assert_eq!(hues(&[]), Vec::<f64>::new());
    }

    #[test]
    fn border_color_renders_hsl() {
        let ranked = rank(&[(NodeKey(3), 0)]);
        assert_eq!(ranked[0].border_color(), "hsl(240, 100%, 50%)");
    }
}
