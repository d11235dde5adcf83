//! End-to-end protocol scenarios driven through the public engine API:
//! inbound messages in, table state and outbound queue out.

mod common;

use common::*;
use manetd::{LinkStatus, ManualClock, MsgKind, NextHop, Ttl};

#[test_log::test]
fn star_topology_routes_every_leaf_in_one_hop() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);

    for (i, peer) in [0x0A00_0002u32, 0x0A00_0003, 0x0A00_0004, 0x0A00_0005]
        .into_iter()
        .enumerate()
    {
        engine.receive(sym_hello(peer, i as u16 + 1));
    }
    engine.tick();

    // No two-hop neighborhood, so no relays are needed.
    assert!(engine.mpr_set().is_empty());
    assert!(engine.two_hop().is_empty());

    assert_eq!(engine.routes().len(), 4);
    for route in engine.routes().iter() {
        assert_eq!(route.hops, 1);
        assert_eq!(route.next_hop, route.dest);
    }
}

#[test_log::test]
fn chain_topology_derives_two_hop_route_through_the_middle() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);

    engine.receive(hello(
        0x0A00_0002,
        1,
        &[
            (SELF_ID, LinkStatus::Symmetric),
            (0x0A00_0003, LinkStatus::Symmetric),
        ],
    ));
    engine.tick();

    let middle = engine.neighbors().find(node(0x0A00_0002)).unwrap();
    assert_eq!(middle.link, LinkStatus::Symmetric);
    assert!(engine.two_hop().contains(node(0x0A00_0003), node(0x0A00_0002)));
    assert_eq!(engine.mpr_set(), &[node(0x0A00_0002)]);

    let near = engine.routes().lookup(node(0x0A00_0002)).unwrap();
    assert_eq!((near.next_hop, near.hops), (node(0x0A00_0002), 1));
    let far = engine.routes().lookup(node(0x0A00_0003)).unwrap();
    assert_eq!((far.next_hop, far.hops), (node(0x0A00_0002), 2));
}

#[test_log::test]
fn relay_tie_between_equal_coverage_goes_to_higher_willingness() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);

    engine.receive(hello_full(
        0x0A00_0002,
        1,
        manetd::Willingness::Low,
        None,
        &[
            (SELF_ID, LinkStatus::Symmetric),
            (0x0A00_0004, LinkStatus::Symmetric),
        ],
        &[],
    ));
    engine.receive(hello_full(
        0x0A00_0003,
        1,
        manetd::Willingness::High,
        None,
        &[
            (SELF_ID, LinkStatus::Symmetric),
            (0x0A00_0004, LinkStatus::Symmetric),
        ],
        &[],
    ));

    assert_eq!(engine.mpr_set(), &[node(0x0A00_0003)]);
    assert!(!engine.neighbors().find(node(0x0A00_0002)).unwrap().is_mpr);
    assert!(engine.neighbors().find(node(0x0A00_0003)).unwrap().is_mpr);
}

#[test_log::test]
fn flood_is_forwarded_once_and_suppressed_on_replay() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);

    // Neighbor A selected this node as its relay.
    engine.receive(selector_hello(0x0A00_0002, 1));
    assert!(
        engine
            .neighbors()
            .find(node(0x0A00_0002))
            .unwrap()
            .is_mpr_selector
    );

    engine.receive(tc(0x0A00_0002, 0x0A00_0010, 7, 1, &[0x0A00_0011]));

    let link = engine
        .topology()
        .find(node(0x0A00_0010), node(0x0A00_0011))
        .expect("advertised link learned");
    assert_eq!(u16::from(link.ansn), 1);

    // The flood was re-queued with one hop of budget spent.
    let forwarded: Vec<_> = engine
        .control_queue()
        .iter()
        .filter(|q| q.message.kind == MsgKind::Tc)
        .collect();
    assert_eq!(forwarded.len(), 1);
    let relay = &forwarded[0].message;
    assert_eq!(relay.originator, node(0x0A00_0010));
    assert_eq!(u16::from(relay.seq), 7);
    assert_eq!(relay.ttl, Ttl::new(254));
    assert_eq!(u8::from(relay.hop_count), 1);

    // A replay of the same (originator, seq) changes nothing and is not
    // forwarded again.
    let queue_before = engine.control_queue().len();
    let topology_before = engine.topology().len();
    engine.receive(tc(0x0A00_0002, 0x0A00_0010, 7, 1, &[0x0A00_0011]));
    assert_eq!(engine.control_queue().len(), queue_before);
    assert_eq!(engine.topology().len(), topology_before);
    assert_eq!(engine.stats().duplicates_dropped, 1);
    assert_eq!(engine.stats().tcs_received, 1);
}

#[test_log::test]
fn dead_relay_reroutes_through_surviving_path() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);
    let dest = 0x0A00_0020;

    engine.receive(sym_hello(0x0A00_0002, 1));
    engine.receive(sym_hello(0x0A00_0003, 1));
    // Short path: 2 -> X -> dest. Long path: 3 -> Y -> X -> dest.
    engine.receive(tc(0x0A00_0002, 0x0A00_0002, 10, 1, &[0x0A00_0010]));
    engine.receive(tc(0x0A00_0002, 0x0A00_0010, 11, 1, &[dest]));
    engine.receive(tc(0x0A00_0003, 0x0A00_0003, 12, 1, &[0x0A00_0030]));
    engine.receive(tc(0x0A00_0003, 0x0A00_0030, 13, 1, &[0x0A00_0010]));
    engine.tick();

    let route = engine.routes().lookup(node(dest)).unwrap();
    assert_eq!((route.next_hop, route.hops), (node(0x0A00_0002), 3));

    // Neighbor 3 keeps beaconing, neighbor 2 goes silent.
    clock.advance(4);
    engine.receive(sym_hello(0x0A00_0003, 2));
    clock.advance(3);
    engine.tick();

    assert!(engine.neighbors().find(node(0x0A00_0002)).is_none());
    assert_eq!(engine.stats().neighbor_failures, 1);
    assert_eq!(engine.stats().emergency_hellos, 1);

    match engine.next_hop(node(dest)) {
        NextHop::Route { next_hop, hops, .. } => {
            assert_eq!(next_hop, node(0x0A00_0003));
            assert_eq!(hops, 4);
        }
        other => panic!("expected a rerouted path, got {other:?}"),
    }
}

#[test_log::test]
fn dead_relay_with_no_alternative_escalates_to_unreachable() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);
    let dest = 0x0A00_0020;

    engine.receive(sym_hello(0x0A00_0002, 1));
    engine.receive(tc(0x0A00_0002, 0x0A00_0002, 10, 1, &[0x0A00_0010]));
    engine.receive(tc(0x0A00_0002, 0x0A00_0010, 11, 1, &[dest]));
    engine.tick();
    assert!(engine.routes().lookup(node(dest)).is_some());

    // The only relay dies; the scan cleans it out and routing collapses.
    clock.advance(7);
    engine.tick();
    assert!(engine.routes().lookup(node(dest)).is_none());

    assert_eq!(engine.next_hop(node(dest)), NextHop::Unreachable);
    let events = engine.take_link_failures();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].dest, node(dest));
    assert!(engine.take_link_failures().is_empty());
}

#[test_log::test]
fn stale_route_entry_reports_the_failed_relay() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);
    let dest = 0x0A00_0020;

    engine.receive(sym_hello(0x0A00_0002, 1));
    engine.receive(tc(0x0A00_0002, 0x0A00_0002, 10, 1, &[dest]));
    engine.tick();

    // The relay goes silent but no scan has run yet, so the stale entry is
    // still in the table when the query arrives.
    clock.advance(7);
    assert_eq!(engine.next_hop(node(dest)), NextHop::Unreachable);
    let events = engine.take_link_failures();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].failed_next_hop, Some(node(0x0A00_0002)));
}

#[test_log::test]
fn outdated_link_version_is_ignored_per_pair() {
    let clock = ManualClock::new();
    let mut engine = common::engine(&clock);

    engine.receive(sym_hello(0x0A00_0002, 1));
    engine.receive(tc(0x0A00_0002, 0x0A00_0030, 20, 10, &[0x0A00_0031]));

    // A lower version for the same originator: the existing pair must not
    // move, but the previously unseen pair from the same message may land.
    engine.receive(tc(0x0A00_0002, 0x0A00_0030, 21, 9, &[0x0A00_0032]));

    let kept = engine
        .topology()
        .find(node(0x0A00_0030), node(0x0A00_0031))
        .unwrap();
    assert_eq!(u16::from(kept.ansn), 10);
    let added = engine
        .topology()
        .find(node(0x0A00_0030), node(0x0A00_0032))
        .unwrap();
    assert_eq!(u16::from(added.ansn), 9);

    // A direct downgrade of an existing pair is counted and dropped.
    engine.receive(tc(0x0A00_0002, 0x0A00_0030, 22, 8, &[0x0A00_0031]));
    let unchanged = engine
        .topology()
        .find(node(0x0A00_0030), node(0x0A00_0031))
        .unwrap();
    assert_eq!(u16::from(unchanged.ansn), 10);
    assert_eq!(engine.stats().stale_link_updates, 1);
}
