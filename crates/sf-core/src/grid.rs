//! Helpers for the 1-D node/element discretization along a flow path.
//!
//! A path with `n` elements has `n + 1` nodes. Element `e` lies between
//! nodes `e` and `e + 1`.

use crate::numeric::Real;

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            (0..n).map(|k| start + step * k as Real).collect()
        }
    }
}

/// Element values as the mean of the two bounding nodes.
pub fn node_to_element(nodes: &[Real]) -> Vec<Real> {
    nodes.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
}

/// Node values from element values: interior nodes average their two
/// neighbours, boundary nodes take the adjacent element value.
pub fn element_to_node(elements: &[Real]) -> Vec<Real> {
    let n = elements.len();
    if n == 0 {
        return Vec::new();
    }
    let mut nodes = Vec::with_capacity(n + 1);
    nodes.push(elements[0]);
    for w in elements.windows(2) {
        nodes.push(0.5 * (w[0] + w[1]));
    }
    nodes.push(elements[n - 1]);
    nodes
}

/// Node control-volume widths from element widths (half of each adjacent element).
pub fn node_widths(dx: &[Real]) -> Vec<Real> {
    let mut widths = vec![0.0; dx.len() + 1];
    for (e, d) in dx.iter().enumerate() {
        widths[e] += 0.5 * d;
        widths[e + 1] += 0.5 * d;
    }
    widths
}

/// Accumulate element sources onto a node array along `direction`.
///
/// With `direction == 1` the value at node 0 is kept and
/// `nodes[e + 1] = nodes[e] + source[e]`; with `direction == -1` the last
/// node is kept and `nodes[e] = nodes[e + 1] + source[e]`.
pub fn add_source(nodes: &mut [Real], source: &[Real], direction: i8) {
    debug_assert_eq!(nodes.len(), source.len() + 1);
    if direction >= 0 {
        for e in 0..source.len() {
            nodes[e + 1] = nodes[e] + source[e];
        }
    } else {
        for e in (0..source.len()).rev() {
            nodes[e] = nodes[e + 1] + source[e];
        }
    }
}

/// Index of the inlet node for a flow direction.
#[inline]
pub fn inlet_node(n_nodes: usize, direction: i8) -> usize {
    if direction >= 0 { 0 } else { n_nodes - 1 }
}

/// Index of the outlet node for a flow direction.
#[inline]
pub fn outlet_node(n_nodes: usize, direction: i8) -> usize {
    if direction >= 0 { n_nodes - 1 } else { 0 }
}
