use std::collections::BTreeMap;

use crate::graph_utils::entity::NodeId;

// Lowest opacity a node with any expression is drawn with
pub const MIN_EXPRESSION: f64 = 0.3;

// Marker for "no expression data"; surfaces draw these unfilled
pub const NO_EXPRESSION: f32 = -1.0;

/// Map raw tissue expression levels to [MIN_EXPRESSION, 1] with a cube-root curve.
/// `None` levels map to [`NO_EXPRESSION`].
pub fn expression_gradients(levels: &BTreeMap<NodeId, Option<f64>>) -> BTreeMap<NodeId, f32> {
    let max = levels.values().flatten().copied().fold(0.0_f64, f64::max);
    levels
        .iter()
        .map(|(id, level)| {
            let g = match level {
                None => NO_EXPRESSION,
                Some(_) if max <= 0.0 => MIN_EXPRESSION as f32,
                Some(l) => ((l / max).max(0.0).cbrt() * (1.0 - MIN_EXPRESSION) + MIN_EXPRESSION) as f32,
            };
            (id.clone(), g)
        })
        .collect()
}
