//! End-to-end consensus over generated gossip graphs: output invariants,
//! delivery-order independence, forks, and restart from a snapshot.

use weft_consensus::engine::{STAT_COIN_VOTES, STAT_FAST_PATH_NOT_FAMOUS};
use weft_consensus::{Consensus, ConsensusConfig, ConsensusRound, Roster};
use weft_crypto::{hash_event, keypair_from_seed, sign_event};
use weft_nullables::{shuffle_topologically, GraphGenerator};
use weft_types::{
    ConsensusSnapshot, ConsensusTime, EventData, EventHash, HashedEventData, KeyPair, NodeId,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(consensus: &mut Consensus, events: &[EventData]) -> Vec<ConsensusRound> {
    weft_utils::init_tracing();
    let mut rounds = Vec::new();
    for event in events {
        rounds.extend(consensus.add_event(event.clone()).expect("add event"));
    }
    rounds
}

fn engine(generator: &GraphGenerator, config: ConsensusConfig) -> Consensus {
    Consensus::new(config, Roster::new(generator.members())).expect("engine")
}

/// `(round, [(hash, order, timestamp)])` for comparing two runs.
type RoundSummary = (u64, Vec<(EventHash, u64, ConsensusTime)>, Vec<EventHash>);

fn summarize(rounds: &[ConsensusRound]) -> Vec<RoundSummary> {
    rounds
        .iter()
        .map(|r| {
            (
                r.round,
                r.consensus_events
                    .iter()
                    .map(|e| (*e.hash(), e.consensus_order, e.consensus_timestamp))
                    .collect(),
                r.judge_hashes(),
            )
        })
        .collect()
}

fn signed_event(
    keys: &KeyPair,
    creator: u64,
    self_parent: Option<&EventData>,
    other_parent: Option<&EventData>,
    time_ms: u64,
) -> EventData {
    let generation = self_parent
        .iter()
        .chain(other_parent.iter())
        .map(|e| e.generation())
        .max()
        .map_or(0, |max| max + 1);
    let hashed = HashedEventData {
        creator: NodeId(creator),
        generation,
        birth_round: 1,
        self_parent: self_parent.map(|e| e.hash),
        other_parent: other_parent.map(|e| e.hash),
        time_created: ConsensusTime::from_millis(time_ms),
        transactions: vec![time_ms.to_le_bytes().to_vec()],
    };
    let hash = hash_event(&hashed);
    EventData {
        signature: sign_event(&hash, &keys.private),
        hashed,
        hash,
    }
}

/// Creators take turns, each building on the event just before it, so every
/// event sees every earlier one.
fn round_robin_chain(members: u64, count: u64) -> Vec<EventData> {
    let keys: Vec<KeyPair> = (0..members)
        .map(|i| keypair_from_seed(&[i as u8 + 1; 32]))
        .collect();
    let mut latest: Vec<Option<EventData>> = vec![None; members as usize];
    let mut events: Vec<EventData> = Vec::with_capacity(count as usize);
    for k in 0..count {
        let creator = k % members;
        let event = signed_event(
            &keys[creator as usize],
            creator,
            latest[creator as usize].as_ref(),
            events.last(),
            1_000 + k,
        );
        latest[creator as usize] = Some(event.clone());
        events.push(event);
    }
    events
}

fn assert_output_invariants(rounds: &[ConsensusRound], first_order: u64) {
    let mut next_order = first_order;
    let mut last_time: Option<ConsensusTime> = None;
    for pair in rounds.windows(2) {
        assert_eq!(pair[1].round, pair[0].round + 1, "rounds decided in sequence");
    }
    for round in rounds {
        assert!(!round.judges.is_empty());
        let creators: Vec<NodeId> = round.judges.iter().map(|j| j.creator()).collect();
        let mut sorted = creators.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(creators, sorted, "one judge per creator, in creator order");

        for event in &round.consensus_events {
            assert_eq!(event.consensus_order, next_order);
            assert_eq!(event.round_received, round.round);
            assert!(event.round_created <= round.round);
            if let Some(last) = last_time {
                assert!(event.consensus_timestamp > last, "timestamps strictly increase");
            }
            last_time = event.transaction_timestamps().last().or(Some(event.consensus_timestamp));
            next_order += 1;
        }

        assert_eq!(round.snapshot.round, round.round);
        assert_eq!(round.snapshot.next_consensus_number, next_order);
        assert_eq!(round.snapshot.judge_hashes, round.judge_hashes());
        assert_eq!(round.event_window.latest_consensus_round, round.round);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn fully_connected_chain_makes_every_witness_a_judge() {
    let events = round_robin_chain(4, 200);
    let mut consensus = Consensus::new(
        ConsensusConfig::default(),
        Roster::new((0..4).map(|i| (NodeId(i), 1))),
    )
    .unwrap();
    let rounds = run(&mut consensus, &events);

    assert!(rounds.len() >= 10, "only {} rounds decided", rounds.len());
    assert_eq!(rounds[0].round, 1);
    for round in &rounds {
        assert_eq!(round.judges.len(), 4, "round {}", round.round);
    }
    assert_output_invariants(&rounds, 0);
    assert_eq!(consensus.stats().get(STAT_COIN_VOTES), 0);
    assert_eq!(consensus.stats().get(STAT_FAST_PATH_NOT_FAMOUS), 0);
    assert_eq!(consensus.last_round_decided(), rounds.last().unwrap().round);
}

#[test]
fn generated_graph_reaches_consensus() {
    let mut generator = GraphGenerator::with_equal_weights(42, 4).with_max_transactions(3);
    let events = generator.generate(600);
    let mut consensus = engine(&generator, ConsensusConfig::default());
    let rounds = run(&mut consensus, &events);

    assert!(rounds.len() >= 5, "only {} rounds decided", rounds.len());
    assert_eq!(rounds[0].round, 1);
    assert_output_invariants(&rounds, 0);

    let ordered: usize = rounds.iter().map(|r| r.consensus_events.len()).sum();
    assert_eq!(consensus.num_consensus(), ordered as u64);
    assert!(ordered > 0);
    for judge in rounds.iter().flat_map(|r| &r.judges) {
        assert_eq!(consensus.fame(&judge.hash), Some(true));
        assert_eq!(consensus.is_witness(&judge.hash), Some(true));
    }
}

#[test]
fn unequal_weights_reach_consensus() {
    let mut generator = GraphGenerator::new(9, &[10, 20, 30, 40, 50]);
    let events = generator.generate(800);
    let mut consensus = engine(&generator, ConsensusConfig::default());
    let rounds = run(&mut consensus, &events);

    assert!(!rounds.is_empty());
    assert_output_invariants(&rounds, 0);
    for judge in rounds.iter().flat_map(|r| &r.judges) {
        assert!(consensus.roster().contains(judge.creator()));
    }
}

#[test]
fn delivery_order_does_not_change_consensus() {
    let mut generator = GraphGenerator::with_equal_weights(7, 4).with_max_transactions(2);
    let events = generator.generate(500);
    let reference = summarize(&run(&mut engine(&generator, ConsensusConfig::default()), &events));
    assert!(!reference.is_empty());

    for seed in 1..=3 {
        let shuffled = shuffle_topologically(&events, seed);
        let other = summarize(&run(&mut engine(&generator, ConsensusConfig::default()), &shuffled));
        let common = reference.len().min(other.len());
        assert!(common > 0, "shuffle {seed} decided no rounds");
        assert_eq!(reference[..common], other[..common], "shuffle {seed}");
    }
}

#[test]
fn forking_member_still_yields_one_judge_per_creator() {
    let mut generator = GraphGenerator::with_equal_weights(13, 4).with_forking_node(0, 0.3);
    let events = generator.generate(800);
    let mut consensus = engine(&generator, ConsensusConfig::default());
    let rounds = run(&mut consensus, &events);

    assert!(!rounds.is_empty());
    assert_output_invariants(&rounds, 0);
}

#[test]
fn restart_from_snapshot_continues_identically() {
    let config = ConsensusConfig {
        rounds_non_ancient: 8,
        ..Default::default()
    };
    let mut generator = GraphGenerator::with_equal_weights(21, 4).with_max_transactions(2);
    let events = generator.generate(900);
    let baseline = run(&mut engine(&generator, config.clone()), &events);
    assert!(baseline.len() >= 6, "only {} rounds decided", baseline.len());

    let checkpoint = &baseline[baseline.len() / 2];
    let stored = bincode::serialize(&checkpoint.snapshot).unwrap();
    let snapshot: ConsensusSnapshot = bincode::deserialize(&stored).unwrap();
    let mut restarted = engine(&generator, config);
    restarted.load_snapshot(&snapshot).unwrap();
    assert!(restarted.is_bootstrapping());
    assert_eq!(restarted.election_round(), checkpoint.round + 1);

    let resumed = run(&mut restarted, &events);
    assert!(!restarted.is_bootstrapping());
    assert!(!resumed.is_empty());
    assert_eq!(resumed[0].round, checkpoint.round + 1);
    assert_output_invariants(&resumed, checkpoint.snapshot.next_consensus_number);

    let expected = summarize(&baseline[baseline.len() / 2 + 1..]);
    let actual = summarize(&resumed);
    let common = expected.len().min(actual.len());
    assert!(common > 0);
    assert_eq!(expected[..common], actual[..common]);
}

#[test]
fn events_arriving_ancient_after_restart_are_reported_stale() {
    let config = ConsensusConfig {
        rounds_non_ancient: 3,
        ..Default::default()
    };
    let mut generator = GraphGenerator::with_equal_weights(5, 4);
    let events = generator.generate(700);
    let baseline = run(&mut engine(&generator, config.clone()), &events);
    assert!(baseline.len() >= 8, "only {} rounds decided", baseline.len());

    let checkpoint = &baseline[baseline.len() / 2];
    let mut restarted = engine(&generator, config);
    restarted.load_snapshot(&checkpoint.snapshot).unwrap();
    let resumed = run(&mut restarted, &events);

    let window = checkpoint.event_window;
    let ancient = events.iter().filter(|e| window.is_ancient(e)).count();
    assert!(ancient > 0);
    assert!(!resumed.is_empty());
    assert!(resumed[0].stale_events.len() >= ancient);
    assert!(resumed
        .iter()
        .flat_map(|r| &r.consensus_events)
        .all(|e| !window.is_ancient(&e.event)));
}

#[test]
fn reset_allows_replaying_the_same_graph() {
    let mut generator = GraphGenerator::with_equal_weights(3, 4);
    let events = generator.generate(300);
    let mut consensus = engine(&generator, ConsensusConfig::default());
    let first = summarize(&run(&mut consensus, &events));
    consensus.reset();
    let second = summarize(&run(&mut consensus, &events));
    assert_eq!(first, second);
}

#[test]
fn coin_rounds_still_decide_in_sequence() {
    let config = ConsensusConfig {
        coin_freq: 2,
        rounds_non_ancient: 5,
        rounds_expired: 8,
        ..Default::default()
    };
    let mut coin_votes = 0;
    for seed in 0..8 {
        let mut generator = GraphGenerator::new(seed, &[1, 2, 3, 4]).with_forking_node(0, 0.2);
        let events = generator.generate(800);
        let mut consensus = engine(&generator, config.clone());
        let rounds = run(&mut consensus, &events);
        assert!(!rounds.is_empty(), "seed {seed} decided no rounds");
        assert_eq!(rounds[0].round, 1);
        assert_output_invariants(&rounds, 0);
        coin_votes += consensus.stats().get(STAT_COIN_VOTES);

        let reference = summarize(&rounds);
        for shuffle in 1..=2 {
            let shuffled = shuffle_topologically(&events, shuffle);
            let other = summarize(&run(&mut engine(&generator, config.clone()), &shuffled));
            let common = reference.len().min(other.len());
            assert!(common > 0, "seed {seed} shuffle {shuffle} decided no rounds");
            assert_eq!(reference[..common], other[..common], "seed {seed} shuffle {shuffle}");
        }
    }
    assert!(coin_votes > 0, "no coin round was reached");
}

#[test]
fn fame_is_never_taken_back() {
    let mut not_famous_checked = 0;
    for seed in 0..20 {
        let mut generator = GraphGenerator::with_equal_weights(seed, 4);
        let events = generator.generate(600);
        let (early, late) = events.split_at(events.len() / 2);
        let mut consensus = engine(&generator, ConsensusConfig::default());
        let first = run(&mut consensus, early);
        if first.is_empty() {
            continue;
        }

        let decided: Vec<(EventHash, bool)> = early
            .iter()
            .filter(|e| consensus.is_witness(&e.hash) == Some(true))
            .filter_map(|e| consensus.fame(&e.hash).map(|famous| (e.hash, famous)))
            .collect();
        let later = run(&mut consensus, late);
        assert!(!later.is_empty(), "seed {seed} stopped deciding");

        for (hash, famous) in decided {
            assert_eq!(consensus.fame(&hash), Some(famous), "seed {seed} event {hash}");
            if !famous {
                not_famous_checked += 1;
            }
        }
    }
    assert!(not_famous_checked > 0, "no witness was decided not famous");
}
