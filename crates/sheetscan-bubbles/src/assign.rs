//! Exclusive assignment of detected circles to a question's option slots.
//!
//! Circles inside a question's search box are placed left-to-right against
//! the expected option centers, minimizing the summed squared distance.
//! Every combination keeps the x-sort order on both sides, and a single
//! pair farther apart than the cap rejects the combination.

use nalgebra::Point2;

use crate::result::DetectedCircle;

fn dist_sq(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

/// Best order-preserving placement of `circles` (indices into the caller's
/// pool, already sorted by center x) against `expected` option centers.
///
/// Returns one pool index per option, `None` where no circle was claimed.
pub fn assign_circles(
    expected: &[Point2<f32>],
    circles: &[DetectedCircle],
    candidates: &[usize],
    cap_px: f32,
) -> Vec<Option<usize>> {
    let n = expected.len();
    let m = candidates.len();
    let mut out = vec![None; n];
    if n == 0 || m == 0 {
        return out;
    }

    let cap_sq = cap_px * cap_px;
    let pair_cost = |slot: usize, cand: usize| -> Option<f32> {
        let d = dist_sq(circles[candidates[cand]].center, expected[slot]);
        (d <= cap_sq).then_some(d)
    };

    if m == n {
        // Positional mapping; pairs over the cap are dropped individually.
        for slot in 0..n {
            if pair_cost(slot, slot).is_some() {
                out[slot] = Some(candidates[slot]);
            }
        }
        return out;
    }

    // Order-preserving subset choice: pick which slots receive circles
    // (m < n) or which circles fill the slots (m > n), minimizing total
    // squared distance with the per-pair cap.
    let (choose_from, picked) = if m < n { (n, m) } else { (m, n) };
    let mut chosen: Vec<usize> = Vec::with_capacity(picked);
    let mut best: Option<(f32, Vec<usize>)> = None;

    fn search(
        start: usize,
        choose_from: usize,
        picked: usize,
        chosen: &mut Vec<usize>,
        cost_so_far: f32,
        cost_of: &dyn Fn(usize, usize) -> Option<f32>,
        best: &mut Option<(f32, Vec<usize>)>,
    ) {
        if chosen.len() == picked {
            let better = best.as_ref().map(|(c, _)| cost_so_far < *c).unwrap_or(true);
            if better {
                *best = Some((cost_so_far, chosen.clone()));
            }
            return;
        }
        let remaining = picked - chosen.len();
        for i in start..=(choose_from - remaining) {
            let Some(c) = cost_of(chosen.len(), i) else {
                continue;
            };
            chosen.push(i);
            search(i + 1, choose_from, picked, chosen, cost_so_far + c, cost_of, best);
            chosen.pop();
        }
    }

    if m < n {
        // chosen[k] = slot index receiving the k-th candidate circle.
        let cost_of = |k: usize, slot: usize| pair_cost(slot, k);
        search(0, choose_from, picked, &mut chosen, 0.0, &cost_of, &mut best);
        if let Some((_, slots)) = best {
            for (k, &slot) in slots.iter().enumerate() {
                out[slot] = Some(candidates[k]);
            }
        }
    } else {
        // chosen[k] = candidate index filling the k-th slot.
        let cost_of = |k: usize, cand: usize| pair_cost(k, cand);
        search(0, choose_from, picked, &mut chosen, 0.0, &cost_of, &mut best);
        if let Some((_, cands)) = best {
            for (slot, &cand) in cands.iter().enumerate() {
                out[slot] = Some(candidates[cand]);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x: f32, y: f32) -> DetectedCircle {
        DetectedCircle {
            center: Point2::new(x, y),
            radius: 25.0,
        }
    }

    fn slots(xs: &[f32]) -> Vec<Point2<f32>> {
        xs.iter().map(|&x| Point2::new(x, 100.0)).collect()
    }

    #[test]
    fn equal_counts_map_positionally() {
        let expected = slots(&[100.0, 180.0, 260.0, 340.0]);
        let circles = vec![
            circle(102.0, 101.0),
            circle(178.0, 99.0),
            circle(261.0, 100.0),
            circle(338.0, 102.0),
        ];
        let cands: Vec<usize> = (0..4).collect();
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        assert_eq!(out, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn equal_counts_drop_far_pairs_only() {
        let expected = slots(&[100.0, 180.0]);
        let circles = vec![circle(101.0, 100.0), circle(400.0, 100.0)];
        let cands = vec![0, 1];
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        assert_eq!(out, vec![Some(0), None]);
    }

    #[test]
    fn fewer_circles_pick_the_closest_slots() {
        let expected = slots(&[100.0, 180.0, 260.0, 340.0]);
        // Two circles near slots 1 and 3.
        let circles = vec![circle(182.0, 100.0), circle(337.0, 100.0)];
        let cands = vec![0, 1];
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        assert_eq!(out, vec![None, Some(0), None, Some(1)]);
    }

    #[test]
    fn extra_circles_keep_the_best_subset() {
        let expected = slots(&[100.0, 180.0]);
        // Circle 1 is noise between the real two.
        let circles = vec![
            circle(99.0, 100.0),
            circle(140.0, 128.0),
            circle(181.0, 100.0),
        ];
        let cands = vec![0, 1, 2];
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        assert_eq!(out, vec![Some(0), Some(2)]);
    }

    #[test]
    fn no_circle_is_claimed_twice() {
        let expected = slots(&[100.0, 120.0, 140.0]);
        let circles = vec![circle(110.0, 100.0)];
        let cands = vec![0];
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        let claimed: Vec<usize> = out.iter().flatten().copied().collect();
        assert_eq!(claimed.len(), 1);
    }

    #[test]
    fn cap_rejects_unreachable_combinations() {
        let expected = slots(&[100.0]);
        let circles = vec![circle(400.0, 100.0)];
        let cands = vec![0];
        let out = assign_circles(&expected, &circles, &cands, 120.0);
        assert_eq!(out, vec![None]);
    }
}
