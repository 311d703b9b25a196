//! Total order over the events received in one round.

use std::cmp::Ordering;

use weft_types::keys::SIGNATURE_LEN;
use weft_types::ConsensusTime;

use crate::graph::EventNode;

/// Compares events that reached consensus in the same round.
///
/// Priority: consensus timestamp, extended median of received times,
/// generation, then the signature XORed with the round's whitening. Event
/// signatures are unique, so two distinct events never compare equal.
pub struct ConsensusSorter {
    whitening: [u8; SIGNATURE_LEN],
}

impl ConsensusSorter {
    pub fn new(whitening: [u8; SIGNATURE_LEN]) -> Self {
        Self { whitening }
    }

    pub fn compare(&self, a: &EventNode, b: &EventNode) -> Ordering {
        a.consensus_timestamp
            .cmp(&b.consensus_timestamp)
            .then_with(|| extended_median_cmp(&a.rec_times, &b.rec_times))
            .then_with(|| a.generation().cmp(&b.generation()))
            .then_with(|| {
                whitened_cmp(
                    a.data.signature.as_bytes(),
                    b.data.signature.as_bytes(),
                    &self.whitening,
                )
            })
    }
}

/// Compare two sorted received-time lists outward from their medians.
///
/// Starts at the middle index (the later middle for even lengths) offset by
/// -1, then +1, -2, +2, and so on, stopping as soon as either list runs out.
pub fn extended_median_cmp(a: &[ConsensusTime], b: &[ConsensusTime]) -> Ordering {
    let m1 = (a.len() / 2) as i64;
    let m2 = (b.len() / 2) as i64;
    let mut d: i64 = -1;
    loop {
        let (i1, i2) = (m1 + d, m2 + d);
        if i1 < 0 || i2 < 0 || i1 >= a.len() as i64 || i2 >= b.len() as i64 {
            return Ordering::Equal;
        }
        let c = a[i1 as usize].cmp(&b[i2 as usize]);
        if c != Ordering::Equal {
            return c;
        }
        d = if d < 0 { -d } else { -d - 1 };
    }
}

/// Lexicographic unsigned comparison after XOR with `whitening`.
///
/// Bytes past the end of the whitening are compared unmodified; on a common
/// prefix the shorter input sorts first.
pub fn whitened_cmp(a: &[u8], b: &[u8], whitening: &[u8]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let w = whitening.get(i).copied().unwrap_or(0);
        let c = (x ^ w).cmp(&(y ^ w));
        if c != Ordering::Equal {
            return c;
        }
    }
    a.len().cmp(&b.len())
}
