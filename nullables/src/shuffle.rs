//! Random delivery orders that still respect parent-before-child.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weft_types::{EventData, EventHash};

/// A seeded random topological order of `events`.
///
/// Parents that are not in `events` are ignored, so any slice of a graph
/// can be shuffled.
pub fn shuffle_topologically(events: &[EventData], seed: u64) -> Vec<EventData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let index: HashMap<EventHash, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.hash, i))
        .collect();

    let mut waiting = vec![0usize; events.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); events.len()];
    for (i, event) in events.iter().enumerate() {
        for parent in [event.self_parent(), event.other_parent()].into_iter().flatten() {
            if let Some(&p) = index.get(parent) {
                waiting[i] += 1;
                children[p].push(i);
            }
        }
    }

    let mut ready: Vec<usize> = (0..events.len()).filter(|&i| waiting[i] == 0).collect();
    let mut order = Vec::with_capacity(events.len());
    while !ready.is_empty() {
        let pick = ready.swap_remove(rng.gen_range(0..ready.len()));
        order.push(events[pick].clone());
        for &child in &children[pick] {
            waiting[child] -= 1;
            if waiting[child] == 0 {
                ready.push(child);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GraphGenerator;
    use std::collections::HashSet;

    #[test]
    fn shuffle_is_a_topological_permutation() {
        let events = GraphGenerator::with_equal_weights(11, 4).generate(150);
        let shuffled = shuffle_topologically(&events, 99);

        assert_eq!(shuffled.len(), events.len());
        let mut seen = HashSet::new();
        for event in &shuffled {
            for parent in [event.self_parent(), event.other_parent()].into_iter().flatten() {
                assert!(seen.contains(parent));
            }
            assert!(seen.insert(event.hash));
        }
        assert_ne!(shuffled, events);
    }

    #[test]
    fn same_seed_same_order() {
        let events = GraphGenerator::with_equal_weights(4, 3).generate(60);
        assert_eq!(
            shuffle_topologically(&events, 1),
            shuffle_topologically(&events, 1)
        );
    }

    #[test]
    fn parents_outside_the_slice_are_ignored() {
        let events = GraphGenerator::with_equal_weights(4, 3).generate(60);
        let tail = &events[30..];
        assert_eq!(shuffle_topologically(tail, 3).len(), tail.len());
    }
}
