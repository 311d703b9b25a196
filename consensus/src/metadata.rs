//! Per-event virtual-voting metadata.
//!
//! Everything here is computed once, when an event is inserted, from values
//! already memoized on its ancestors. Parents always arrive before their
//! children, so every lookup below hits a finished ancestor. A reference to
//! an event that is absent from the arena behaves like no event at all: its
//! round and generation read as zero and it sees nothing.

use crate::graph::{EventArena, EventId, ROUND_FIRST, ROUND_NEGATIVE_INFINITY};
use crate::roster::Roster;

fn live(arena: &EventArena, id: Option<EventId>) -> Option<EventId> {
    id.filter(|id| arena.get(*id).is_some())
}

fn round(arena: &EventArena, id: Option<EventId>) -> u64 {
    arena
        .resolve(id)
        .map_or(ROUND_NEGATIVE_INFINITY, |n| n.round_created)
}

fn generation(arena: &EventArena, id: Option<EventId>) -> u64 {
    arena.resolve(id).map_or(0, |n| n.generation())
}

fn parent_round(arena: &EventArena, id: Option<EventId>) -> u64 {
    arena
        .resolve(id)
        .map_or(ROUND_NEGATIVE_INFINITY, |n| n.parent_round)
}

fn last_see(arena: &EventArena, id: Option<EventId>, m: usize) -> Option<EventId> {
    let seen = arena.resolve(id)?.last_see.get(m).copied().flatten();
    live(arena, seen)
}

fn strongly_see_p(arena: &EventArena, id: Option<EventId>, m: usize) -> Option<EventId> {
    let seen = arena.resolve(id)?.strongly_see_p.get(m).copied().flatten();
    live(arena, seen)
}

fn first_self_witness(arena: &EventArena, id: Option<EventId>) -> Option<EventId> {
    live(arena, arena.resolve(id)?.first_self_witness)
}

fn first_witness(arena: &EventArena, id: Option<EventId>) -> Option<EventId> {
    live(arena, arena.resolve(id)?.first_witness)
}

/// The witness by `m` in the round of the latest event by `m` that `id` sees.
fn first_see(arena: &EventArena, id: Option<EventId>, m: usize) -> Option<EventId> {
    first_self_witness(arena, last_see(arena, id, m))
}

/// Compute and store every consensus field of a freshly inserted event.
///
/// `forced_round`, when set, overrides the computed round (used for judges
/// named by a restart snapshot). Returns the event's round.
pub fn compute(
    arena: &mut EventArena,
    roster: &Roster,
    id: EventId,
    forced_round: Option<u64>,
) -> u64 {
    let Some(node) = arena.get(id) else {
        return ROUND_NEGATIVE_INFINITY;
    };
    let creator = node.creator_index;
    let declared_parents = node.data.hashed.has_parents();
    let sp = live(arena, node.self_parent);
    let op = live(arena, node.other_parent);
    let n = roster.len();

    let last_see_row: Vec<Option<EventId>> = (0..n)
        .map(|m| {
            if creator == Some(m) {
                Some(id)
            } else if sp.is_none() && op.is_none() {
                None
            } else {
                let lsop = last_see(arena, op, m);
                let lssp = last_see(arena, sp, m);
                let later_round = round(arena, lsop) > round(arena, lssp);
                let later_same_witness = generation(arena, lsop) > generation(arena, lssp)
                    && first_see(arena, op, m) == first_see(arena, sp, m);
                if later_round || later_same_witness {
                    lsop
                } else {
                    lssp
                }
            }
        })
        .collect();
    let prx = round(arena, sp).max(round(arena, op));
    if let Some(node) = arena.get_mut(id) {
        node.last_see = last_see_row;
        node.parent_round = prx;
    }

    let view: &EventArena = arena;

    // The witness by `m` that `id` sees through the latest event by `m2`.
    let see_thru = |m: usize, m2: usize| -> Option<EventId> {
        if m == m2 && creator == Some(m2) {
            first_self_witness(view, sp)
        } else {
            first_see(view, last_see(view, Some(id), m2), m)
        }
    };

    let prsp = parent_round(view, sp);
    let prop = parent_round(view, op);
    let strongly_seen: Vec<Option<EventId>> = (0..n)
        .map(|m| {
            if let Some(w) = strongly_see_p(view, sp, m).filter(|_| prx == prsp) {
                return Some(w);
            }
            if let Some(w) = strongly_see_p(view, op, m).filter(|_| prx == prop) {
                return Some(w);
            }
            let st = see_thru(m, m)?;
            if round(view, Some(st)) != prx {
                return None;
            }
            let weight: u64 = (0..n)
                .filter(|&m3| see_thru(m, m3) == Some(st))
                .map(|m3| roster.weight_at(m3))
                .sum();
            roster.is_super_majority(weight).then_some(st)
        })
        .collect();

    let rsp = round(view, sp);
    let rop = round(view, op);
    let round_created = match forced_round {
        Some(forced) => forced,
        None if !declared_parents => ROUND_FIRST,
        None if sp.is_none() && op.is_none() => ROUND_NEGATIVE_INFINITY,
        None if rsp != rop => rsp.max(rop),
        None if rsp == ROUND_NEGATIVE_INFINITY => ROUND_NEGATIVE_INFINITY,
        None => {
            let weight: u64 = strongly_seen
                .iter()
                .enumerate()
                .filter(|(_, w)| w.is_some())
                .map(|(m, _)| roster.weight_at(m))
                .sum();
            if roster.is_super_majority(weight) {
                prx + 1
            } else {
                prx
            }
        }
    };

    let fsw = if round_created > rsp {
        Some(id)
    } else {
        first_self_witness(view, sp)
    };
    let fw = if round_created > prx {
        Some(id)
    } else if round_created == rsp {
        first_witness(view, sp)
    } else {
        first_witness(view, op)
    };
    let witness = round_created > ROUND_NEGATIVE_INFINITY && (sp.is_none() || rsp < round_created);

    if let Some(node) = arena.get_mut(id) {
        node.strongly_see_p = strongly_seen;
        node.round_created = round_created;
        node.first_self_witness = fsw;
        node.first_witness = fw;
        node.witness = witness;
    }
    round_created
}

/// The witness by member `m` in the round before `voter`'s round that the
/// voter strongly sees, if any.
pub fn strongly_see_s1(arena: &EventArena, voter: EventId, m: usize) -> Option<EventId> {
    strongly_see_p(arena, first_witness(arena, Some(voter)), m)
}

/// The witness by member `m` in the voter's previous round, as the voter
/// first sees it, stepped back one round at a time while it is too new.
pub fn first_vote_target(arena: &EventArena, voter: EventId, m: usize) -> Option<EventId> {
    let voter_round = round(arena, Some(voter));
    let mut w = first_see(arena, Some(voter), m);
    while let Some(node) = arena.resolve(w) {
        if node.round_created < voter_round || node.self_parent.is_none() {
            break;
        }
        w = first_self_witness(arena, live(arena, node.self_parent));
    }
    w
}
