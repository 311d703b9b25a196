use std::cmp::Ordering;

use proptest::prelude::*;

use weft_consensus::sorter::{extended_median_cmp, whitened_cmp};
use weft_consensus::{
    calc_min_timestamp_for_next_event, whitening, ConsensusConfig, CountingVote,
    SequentialRingBuffer, MIN_TRANS_TIMESTAMP_INCR_NANOS,
};
use weft_types::keys::SIGNATURE_LEN;
use weft_types::{ConsensusTime, Signature};

fn signature() -> impl Strategy<Value = Signature> {
    prop::collection::vec(any::<u8>(), SIGNATURE_LEN).prop_map(|bytes| {
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&bytes);
        Signature(out)
    })
}

fn times() -> impl Strategy<Value = Vec<ConsensusTime>> {
    prop::collection::vec(0u64..50, 0..9).prop_map(|mut v| {
        v.sort();
        v.into_iter().map(ConsensusTime::from_nanos).collect()
    })
}

proptest! {
    /// The next event's minimum timestamp is later than the last transaction
    /// and lands on a multiple of the increment.
    #[test]
    fn min_timestamp_is_later_and_aligned(nanos in 0u64..u64::MAX / 2) {
        let next = calc_min_timestamp_for_next_event(ConsensusTime::from_nanos(nanos));
        prop_assert!(next.as_nanos() > nanos);
        prop_assert_eq!(next.as_nanos() % MIN_TRANS_TIMESTAMP_INCR_NANOS, 0);
        prop_assert!(next.as_nanos() - nanos <= 2 * MIN_TRANS_TIMESTAMP_INCR_NANOS);
    }

    /// Whitening does not depend on the order of the judges.
    #[test]
    fn whitening_ignores_order(sigs in prop::collection::vec(signature(), 0..6)) {
        let mut reversed = sigs.clone();
        reversed.reverse();
        prop_assert_eq!(whitening(&sigs), whitening(&reversed));
    }

    /// Whitened comparison is a strict total order on distinct inputs.
    #[test]
    fn whitened_cmp_is_antisymmetric(a in signature(), b in signature(), w in signature()) {
        let ab = whitened_cmp(a.as_bytes(), b.as_bytes(), w.as_bytes());
        let ba = whitened_cmp(b.as_bytes(), a.as_bytes(), w.as_bytes());
        prop_assert_eq!(ab, ba.reverse());
        prop_assert_eq!(ab == Ordering::Equal, a == b);
    }

    #[test]
    fn extended_median_is_antisymmetric(a in times(), b in times()) {
        prop_assert_eq!(extended_median_cmp(&a, &b), extended_median_cmp(&b, &a).reverse());
        prop_assert_eq!(extended_median_cmp(&a, &a), Ordering::Equal);
    }

    /// Exactly one side of a tally can hold a supermajority, and a
    /// supermajority always agrees with the vote cast.
    #[test]
    fn tally_is_consistent(yes in 0u64..1000, no in 0u64..1000, extra in 0u64..1000) {
        let total = yes + no + extra;
        let tally = CountingVote::from_weights(yes, no, total);
        if tally.is_supermajority() {
            prop_assert_eq!(tally.is_famous(), 3 * yes > 2 * total);
        } else {
            prop_assert_eq!(tally.is_famous(), yes >= no);
        }
    }

    /// After any run of sequential writes the buffer holds the newest
    /// `capacity` indices.
    #[test]
    fn ring_buffer_keeps_newest(start in 0u64..100, count in 0u64..50, capacity in 1usize..10) {
        let mut buffer = SequentialRingBuffer::new(start, capacity);
        for i in start..start + count {
            prop_assert!(buffer.add(i, i * 2));
        }
        let kept = count.min(capacity as u64);
        prop_assert_eq!(buffer.len() as u64, kept);
        prop_assert_eq!(buffer.next_index(), start + count);
        for (index, value) in buffer.iter() {
            prop_assert_eq!(*value, index * 2);
            prop_assert!(index >= start + count - kept);
        }
    }

    /// Any config with sane windows survives a TOML round trip.
    #[test]
    fn config_toml_round_trip(
        rounds_non_ancient in 1u64..100,
        extra in 0u64..100,
        coin_freq in 2u64..50,
    ) {
        let config = ConsensusConfig {
            rounds_non_ancient,
            rounds_expired: rounds_non_ancient + extra,
            coin_freq,
            ..Default::default()
        };
        prop_assert!(config.validate().is_ok());
        let text = toml::to_string(&config).unwrap();
        let parsed: ConsensusConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }
}
