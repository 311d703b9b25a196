//! Tie-break helpers: the coin, signature whitening and timestamp spacing.

use weft_types::keys::SIGNATURE_LEN;
use weft_types::{ConsensusTime, Signature};

/// Consecutive transactions, and consecutive events, are spaced at least
/// this many nanoseconds apart in consensus time.
pub const MIN_TRANS_TIMESTAMP_INCR_NANOS: u64 = 1_000;

/// One pseudorandom bit from a witness signature, used in coin rounds.
///
/// The low bit of the middle byte. Not cached: it is a pure function of the
/// signature and costs one load.
pub fn coin(signature: &Signature) -> bool {
    let bytes = signature.as_bytes();
    bytes[bytes.len() / 2] & 1 == 1
}

/// XOR of the judges' signatures, order-independent.
pub fn whitening<'a>(signatures: impl IntoIterator<Item = &'a Signature>) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    for signature in signatures {
        for (o, b) in out.iter_mut().zip(signature.as_bytes()) {
            *o ^= *b;
        }
    }
    out
}

/// Earliest consensus time the next event may receive: add the increment,
/// then round up to a multiple of it. Always strictly later than the input.
pub fn calc_min_timestamp_for_next_event(last_trans_time: ConsensusTime) -> ConsensusTime {
    let incr = MIN_TRANS_TIMESTAMP_INCR_NANOS;
    let t = last_trans_time.as_nanos().saturating_add(incr);
    let rem = t % incr;
    if rem == 0 {
        ConsensusTime::from_nanos(t)
    } else {
        ConsensusTime::from_nanos(t.saturating_add(incr - rem))
    }
}

/// Consensus time of the last transaction of an event that reached
/// consensus at `timestamp` carrying `transaction_count` transactions.
pub fn last_transaction_time(timestamp: ConsensusTime, transaction_count: usize) -> ConsensusTime {
    if transaction_count > 1 {
        timestamp.plus_nanos((transaction_count as u64 - 1) * MIN_TRANS_TIMESTAMP_INCR_NANOS)
    } else {
        timestamp
    }
}
