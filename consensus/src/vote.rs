//! Outcome of tallying the votes a witness strongly sees.

/// How the strongly-seen votes on one candidate split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountingVote {
    /// More than two thirds of the total weight voted yes.
    SupermajorityYes,
    /// More than two thirds of the total weight voted no.
    SupermajorityNo,
    /// Yes weight at least equals no weight, without a supermajority.
    MajorityYes,
    /// No weight exceeds yes weight, without a supermajority.
    MajorityNo,
}

impl CountingVote {
    pub fn from_weights(yes: u64, no: u64, total: u64) -> Self {
        let super_majority = |part: u64| 3 * part as u128 > 2 * total as u128;
        if super_majority(yes) {
            CountingVote::SupermajorityYes
        } else if super_majority(no) {
            CountingVote::SupermajorityNo
        } else if yes >= no {
            CountingVote::MajorityYes
        } else {
            CountingVote::MajorityNo
        }
    }

    /// The vote a witness casts from this tally.
    pub fn is_famous(&self) -> bool {
        matches!(
            self,
            CountingVote::SupermajorityYes | CountingVote::MajorityYes
        )
    }

    pub fn is_supermajority(&self) -> bool {
        matches!(
            self,
            CountingVote::SupermajorityYes | CountingVote::SupermajorityNo
        )
    }
}
