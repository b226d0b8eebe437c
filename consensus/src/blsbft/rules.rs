//! Rules deciding which candidates are checked and voted on.

use crate::Block;
use shardbft_cryptography::Digest;
use std::time::{Duration, SystemTime};

/// Fields of a candidate block that the re-vote rule compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub produce_timeslot: u64,
    pub propose_timeslot: u64,
    pub committee: Digest,
}

impl Candidate {
    pub fn of<B: Block>(block: &B) -> Self {
        Self {
            produce_timeslot: block.produce_timeslot(),
            propose_timeslot: block.propose_timeslot(),
            committee: block.committee(),
        }
    }
}

/// Whether a validator that last voted for `last` at some height may vote for `candidate` at
/// the same height.
///
/// A vote is allowed if:
/// - nothing was voted at this height yet;
/// - the candidate was produced in an earlier timeslot;
/// - the candidate was produced in the same timeslot but re-proposed in a later one;
/// - the candidate is signed by a different committee.
pub fn should_vote(last: Option<&Candidate>, candidate: &Candidate) -> bool {
    let Some(last) = last else {
        return true;
    };
    if candidate.produce_timeslot < last.produce_timeslot {
        return true;
    }
    if candidate.produce_timeslot == last.produce_timeslot
        && candidate.propose_timeslot > last.propose_timeslot
    {
        return true;
    }
    candidate.committee != last.committee
}

/// Reason a proposal was not checked on this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skip {
    /// Only votes have been seen.
    NoBlock,
    /// Checked less than the revalidation interval ago.
    RecentlyValidated,
    /// Not proposed in the current timeslot.
    NotCurrent,
    /// Not on top of the best block.
    WrongHeight,
    /// Produced in a timeslot that has not started.
    FromFuture,
}

/// Inputs to [filter] for a single proposal.
#[derive(Clone, Copy, Debug)]
pub struct Check {
    pub now: SystemTime,
    pub timeslot: u64,
    pub best_height: u64,
    pub revalidate_interval: Duration,
}

/// Decide whether a proposal should be validated (and possibly voted) on this tick.
///
/// `block` is `(height, produce_timeslot, propose_timeslot)` of the proposal (if known).
pub fn filter(
    check: &Check,
    block: Option<(u64, u64, u64)>,
    last_validation: Option<SystemTime>,
) -> Result<(), Skip> {
    let Some((height, produce_timeslot, propose_timeslot)) = block else {
        return Err(Skip::NoBlock);
    };
    if let Some(last) = last_validation {
        let elapsed = check.now.duration_since(last).unwrap_or_default();
        if elapsed < check.revalidate_interval {
            return Err(Skip::RecentlyValidated);
        }
    }
    if propose_timeslot != check.timeslot {
        return Err(Skip::NotCurrent);
    }
    if height != check.best_height + 1 {
        return Err(Skip::WrongHeight);
    }
    if produce_timeslot > check.timeslot {
        return Err(Skip::FromFuture);
    }
    Ok(())
}
