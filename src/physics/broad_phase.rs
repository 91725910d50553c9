use super::shape::Aabb;

/// Candidate pairs whose bounding boxes overlap, found by sweeping along the x axis.
///
/// Pairs are reported once, in the order `(earlier, later)` of the sorted sweep.
pub fn sweep_and_prune<K: Copy>(entries: &[(K, Aabb)]) -> Vec<(K, K)> {
    let mut sorted: Vec<&(K, Aabb)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.1.min.x.total_cmp(&b.1.min.x));

    let mut pairs = Vec::new();
    for (i, (key, aabb)) in sorted.iter().enumerate() {
        for (other_key, other) in sorted[i + 1..].iter() {
            if other.min.x > aabb.max.x {
                break;
            }
            if aabb.overlaps(other) {
                pairs.push((*key, *other_key));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector2;

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb {
            min: Vector2::new(x0, y0),
            max: Vector2::new(x1, y1),
        }
    }

    #[test]
    fn finds_overlapping_pairs_only() {
        let entries = [
            (0, aabb(0.0, 0.0, 1.0, 1.0)),
            (1, aabb(5.0, 0.0, 6.0, 1.0)),
            (2, aabb(0.5, 0.5, 2.0, 2.0)),
            // overlaps 0 on x but not on y
            (3, aabb(0.2, 5.0, 0.8, 6.0)),
        ];
        let mut pairs = sweep_and_prune(&entries)
            .into_iter()
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect::<Vec<_>>();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 2)]);
    }

    #[test]
    fn touching_boxes_are_candidates() {
        let entries = [(0, aabb(0.0, 0.0, 1.0, 1.0)), (1, aabb(1.0, 0.0, 2.0, 1.0))];
        assert_eq!(sweep_and_prune(&entries).len(), 1);
    }
}
