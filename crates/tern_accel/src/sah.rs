//! Surface area heuristic split selection.
//!
//! Candidate planes are spread uniformly over the node's extent on each
//! axis. Every item is binned once per axis: its box opens the "left" side
//! just past its max, closes the "right" side at its min, and is added to
//! every middle bucket it straddles. Left buckets are then prefix-summed and
//! right buckets suffix-summed, so each candidate sees the exact counts and
//! bounds of its three children.

use tern_math::Aabb;

use crate::config::AccelConfig;
use crate::instance::Instance;

/// Cost discount for candidates that leave the left or right side empty.
const EMPTY_SIDE_DISCOUNT: f64 = 0.8;

/// A chosen split plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Split {
    pub axis: usize,
    pub position: f64,
    pub cost: f64,
}

#[derive(Clone, Copy)]
struct Bucket {
    bbox: Aabb,
    weight: u64,
}

impl Bucket {
    const EMPTY: Bucket = Bucket {
        bbox: Aabb::EMPTY,
        weight: 0,
    };

    #[inline]
    fn add(&mut self, bbox: &Aabb, weight: u64) {
        self.bbox = Aabb::surrounding(&self.bbox, bbox);
        self.weight += weight;
    }

    #[inline]
    fn merge(&mut self, other: &Bucket) {
        self.add(&other.bbox, other.weight);
    }
}

/// Pick the cheapest split over the axes not set in `middle_mask`.
///
/// Triangles weigh 1, instances weigh the triangle count of their subtree.
/// Returns `None` when every axis is masked or flat. Equal costs resolve to
/// the lowest axis.
pub(crate) fn best_split(
    node_bbox: &Aabb,
    triangle_boxes: &[Aabb],
    instances: &[Instance],
    middle_mask: u8,
    config: &AccelConfig,
) -> Option<Split> {
    let items = triangle_boxes.len() + instances.len();
    debug_assert!(items > 0);

    let evaluate = |axis: usize| {
        if middle_mask & (1 << axis) != 0 {
            return None;
        }
        evaluate_axis(axis, node_bbox, triangle_boxes, instances, config.max_split_tries)
    };

    let candidates = if items > config.parallel_split_threshold {
        let (x, (y, z)) = rayon::join(|| evaluate(0), || rayon::join(|| evaluate(1), || evaluate(2)));
        [x, y, z]
    } else {
        [evaluate(0), evaluate(1), evaluate(2)]
    };

    candidates.into_iter().flatten().fold(None, |best, split| match best {
        Some(best) if best.cost <= split.cost => Some(best),
        _ => Some(split),
    })
}

fn evaluate_axis(
    axis: usize,
    node_bbox: &Aabb,
    triangle_boxes: &[Aabb],
    instances: &[Instance],
    max_split_tries: usize,
) -> Option<Split> {
    let interval = node_bbox.axis_interval(axis);
    let min = interval.min as f64;
    let extent = interval.max as f64 - min;
    if !(extent > 0.0) {
        return None;
    }

    let items = triangle_boxes.len() + instances.len();
    let num_tries = max_split_tries.min(2 * items);
    let coef = num_tries as f64 / extent;
    let bucket_of = |x: f32| (((x as f64 - min) * coef + 1.0) as usize).min(num_tries);

    let mut left = vec![Bucket::EMPTY; num_tries];
    let mut middle = vec![Bucket::EMPTY; num_tries];
    let mut right = vec![Bucket::EMPTY; num_tries];

    let weighted = triangle_boxes
        .iter()
        .map(|bbox| (bbox, 1))
        .chain(instances.iter().map(|instance| (&instance.world_bbox, instance.triangle_count as u64)));

    for (bbox, weight) in weighted {
        let span = bbox.axis_interval(axis);
        let lefts_begin = bucket_of(span.max);
        let rights_end = bucket_of(span.min);
        debug_assert!(rights_end <= lefts_begin);

        if rights_end > 0 {
            right[rights_end - 1].add(bbox, weight);
        }
        if lefts_begin < num_tries {
            left[lefts_begin].add(bbox, weight);
        }
        for bucket in &mut middle[rights_end..lefts_begin] {
            bucket.add(bbox, weight);
        }
    }

    for i in 1..num_tries {
        let previous = left[i - 1];
        left[i].merge(&previous);
    }
    for i in (0..num_tries - 1).rev() {
        let next = right[i + 1];
        right[i].merge(&next);
    }

    let inv_area = 1.0 / node_bbox.surface_area();
    let probability = |bucket: &Bucket| (bucket.bbox.surface_area() * inv_area).min(1.0);

    let mut best: Option<(usize, f64)> = None;
    for i in 0..num_tries {
        let (l, m, r) = (&left[i], &middle[i], &right[i]);
        let mut cost = l.weight as f64 * probability(l)
            + m.weight as f64 * probability(m)
            + r.weight as f64 * probability(r);
        if l.weight == 0 || r.weight == 0 {
            cost *= EMPTY_SIDE_DISCOUNT;
        }

        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((i, cost));
        }
    }

    best.map(|(i, cost)| Split {
        axis,
        position: min + i as f64 * extent / num_tries as f64,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Node, NodeArena, NodeKind};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tern_math::{DMat4, Interval, Vec3};

    fn unit_box_at(x: f32) -> Aabb {
        Aabb::from_points(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
    }

    fn union(boxes: &[Aabb]) -> Aabb {
        boxes.iter().fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b))
    }

    #[test]
    fn test_splits_two_clusters() {
        let mut boxes = vec![unit_box_at(0.0); 5];
        boxes.extend(vec![unit_box_at(9.0); 5]);
        let node = union(&boxes);

        let split = best_split(&node, &boxes, &[], 0, &AccelConfig::default()).unwrap();

        // Leaving the left side empty is discounted, so the first plane that
        // cuts the near cluster into the middle wins over a clean cut.
        assert_eq!(split.axis, 0);
        assert_eq!(split.position, 0.5);
        assert!((split.cost - 0.8 * 10.0 * 6.0 / 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_middle_mask_excludes_axis() {
        let mut boxes = vec![unit_box_at(0.0); 5];
        boxes.extend(vec![unit_box_at(9.0); 5]);
        let node = union(&boxes);

        let split = best_split(&node, &boxes, &[], 0b001, &AccelConfig::default()).unwrap();
        assert_ne!(split.axis, 0);

        assert!(best_split(&node, &boxes, &[], 0b111, &AccelConfig::default()).is_none());
    }

    #[test]
    fn test_flat_node_has_no_split() {
        let point = Interval::new(1.0, 1.0);
        let flat = Aabb {
            x: point,
            y: point,
            z: point,
        };
        let boxes = vec![flat; 8];

        assert!(best_split(&flat, &boxes, &[], 0, &AccelConfig::default()).is_none());
    }

    #[test]
    fn test_instances_weigh_their_triangles() {
        let mut arena = NodeArena::new();
        let local = unit_box_at(0.0);
        let root = arena.push(Node {
            bbox: local,
            kind: NodeKind::Leaf {
                triangles: 0..100,
                instances: 0..0,
            },
        });
        let instances = vec![Instance::new(root, 0, DMat4::IDENTITY, &local, 100)];
        let boxes = vec![unit_box_at(9.0); 4];
        let node = Aabb::surrounding(&union(&boxes), &instances[0].world_bbox);

        let split = best_split(&node, &boxes, &instances, 0, &AccelConfig::default()).unwrap();

        // Best plane puts the instance in the middle and the triangles on
        // the right, with the empty left side discounted.
        assert_eq!(split.axis, 0);
        assert!((split.cost - 0.8 * 104.0 * 6.0 / 42.0).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(7);
        let boxes: Vec<Aabb> = (0..500)
            .map(|_| {
                let p = Vec3::new(rng.gen_range(0.0..50.0), rng.gen_range(0.0..20.0), rng.gen_range(0.0..5.0));
                Aabb::from_points(p, p + Vec3::splat(rng.gen_range(0.1..2.0)))
            })
            .collect();
        let node = union(&boxes);

        let parallel = AccelConfig {
            parallel_split_threshold: 0,
            ..AccelConfig::default()
        };
        let sequential = AccelConfig {
            parallel_split_threshold: usize::MAX,
            ..AccelConfig::default()
        };

        assert_eq!(
            best_split(&node, &boxes, &[], 0, &parallel),
            best_split(&node, &boxes, &[], 0, &sequential)
        );
    }
}
