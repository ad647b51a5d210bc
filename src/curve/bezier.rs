// Copyright (c) 2024 Mike Tsao

//! Cubic bezier segments parameterized by time.

use super::{BezierNode, HandleDir};

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 48;
const TOLERANCE: f64 = 1e-10;

fn cubic(p: &[f64; 4], u: f64) -> f64 {
    let v = 1.0 - u;
    v * v * v * p[0] + 3.0 * v * v * u * p[1] + 3.0 * v * u * u * p[2] + u * u * u * p[3]
}

fn cubic_slope(p: &[f64; 4], u: f64) -> f64 {
    let v = 1.0 - u;
    3.0 * v * v * (p[1] - p[0]) + 6.0 * v * u * (p[2] - p[1]) + 3.0 * u * u * (p[3] - p[2])
}

/// Finds the curve parameter whose time is `time`. The time polynomial is
/// monotonic because its inner control points lie between its ends.
fn solve_parameter(times: &[f64; 4], time: f64) -> f64 {
    let span = times[3] - times[0];
    let mut u = ((time - times[0]) / span).clamp(0.0, 1.0);
    for _ in 0..NEWTON_ITERATIONS {
        let error = cubic(times, u) - time;
        if error.abs() < TOLERANCE {
            return u;
        }
        let slope = cubic_slope(times, u);
        if slope.abs() < TOLERANCE {
            break;
        }
        u -= error / slope;
        if !(0.0..=1.0).contains(&u) {
            break;
        }
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    u = 0.5;
    for _ in 0..BISECTION_ITERATIONS {
        u = (lo + hi) * 0.5;
        let error = cubic(times, u) - time;
        if error.abs() < TOLERANCE {
            break;
        }
        if error < 0.0 {
            lo = u;
        } else {
            hi = u;
        }
    }
    u
}

/// Evaluates the segment from `a` to `b` at `time`, which should lie in
/// `a.time..=b.time`.
pub(crate) fn segment_value(a: &BezierNode, b: &BezierNode, time: f64) -> f64 {
    if b.time <= a.time {
        return b.value;
    }
    let out = a.handle_or_zero(HandleDir::Out);
    let inn = b.handle_or_zero(HandleDir::In);
    let times = [
        a.time,
        (a.time + out.time).clamp(a.time, b.time),
        (b.time + inn.time).clamp(a.time, b.time),
        b.time,
    ];
    let values = [a.value, a.value + out.value, b.value + inn.value, b.value];
    cubic(&values, solve_parameter(&times, time.clamp(a.time, b.time)))
}

/// Evaluates a sorted node chain at `time`, holding the end values outside
/// the chain.
pub(crate) fn nodes_value(nodes: &[BezierNode], time: f64) -> f64 {
    let Some(first) = nodes.first() else {
        return 0.0;
    };
    if time <= first.time {
        return first.value;
    }
    let next = nodes.partition_point(|n| n.time <= time);
    if next >= nodes.len() {
        return nodes[nodes.len() - 1].value;
    }
    segment_value(&nodes[next - 1], &nodes[next], time)
}

/// Fills `values` with the chain sampled every `1 / resolution`.
pub(crate) fn sample_nodes(nodes: &[BezierNode], resolution: f64, values: &mut [f64]) {
    let mut segment = 1;
    for (i, value) in values.iter_mut().enumerate() {
        let time = i as f64 / resolution;
        while segment < nodes.len() && nodes[segment].time < time {
            segment += 1;
        }
        *value = if segment < nodes.len() && segment > 0 {
            segment_value(&nodes[segment - 1], &nodes[segment], time)
        } else {
            nodes_value(nodes, time)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::BezierHandle, types::NodeUid};
    use float_cmp::approx_eq;
    use more_asserts::{assert_gt, assert_lt};

    fn flat(time: f64, value: f64) -> BezierNode {
        BezierNode {
            uid: NodeUid::default(),
            time,
            value,
            in_handle: None,
            out_handle: None,
        }
    }

    #[test]
    fn zero_handles_are_linear_in_value_ends() {
        let a = flat(0.0, 0.0);
        let b = flat(1.0, 1.0);
        assert!(approx_eq!(f64, segment_value(&a, &b, 0.0), 0.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, segment_value(&a, &b, 1.0), 1.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, segment_value(&a, &b, 0.5), 0.5, epsilon = 1e-9));
    }

    #[test]
    fn default_handles_ease_in_and_out() {
        let a = BezierNode::new_with(NodeUid(1), 0.0, 0.0);
        let b = BezierNode::new_with(NodeUid(2), 1.0, 1.0);
        let early = segment_value(&a, &b, 0.1);
        let middle = segment_value(&a, &b, 0.5);
        assert_lt!(early, 0.1, "slow start");
        assert!(approx_eq!(f64, middle, 0.5, epsilon = 1e-9), "symmetric");
        assert_gt!(segment_value(&a, &b, 0.9), 0.9, "slow finish");
    }

    #[test]
    fn overlong_handles_are_clamped_into_segment() {
        let mut a = flat(0.0, 0.0);
        a.out_handle = Some(BezierHandle {
            time: 5.0,
            value: 0.0,
        });
        let b = flat(1.0, 1.0);
        let mut last = f64::NEG_INFINITY;
        for i in 0..=100 {
            let v = segment_value(&a, &b, i as f64 / 100.0);
            assert!(v.is_finite());
            assert!(v >= last - 1e-9, "should still rise monotonically");
            last = v;
        }
    }

    #[test]
    fn sampling_matches_direct_evaluation() {
        let nodes = vec![
            BezierNode::new_with(NodeUid(1), 0.0, 0.0),
            BezierNode::new_with(NodeUid(2), 0.3, 2.0),
            BezierNode::new_with(NodeUid(3), 1.0, -1.0),
        ];
        let mut values = vec![0.0; 101];
        sample_nodes(&nodes, 100.0, &mut values);
        for (i, v) in values.iter().enumerate() {
            let t = i as f64 / 100.0;
            assert!(approx_eq!(f64, *v, nodes_value(&nodes, t), epsilon = 1e-12));
        }
        assert_eq!(values[0], 0.0);
        assert!(approx_eq!(f64, values[30], 2.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, values[100], -1.0, epsilon = 1e-9));
    }
}
