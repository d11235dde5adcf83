//! Route recomputation benchmark: topology message processing including
//! the full shortest-path rebuild it triggers.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use manetd::domain::{Ansn, HopCount, LinkStatus, MessageSeq, NodeId, Ttl, Willingness};
use manetd::{
    AdvertisedNeighbor, ControlPayload, HelloSnapshot, InboundMessage, ManualClock, MsgKind,
    OlsrEngine, ProtocolConfig, TcSnapshot,
};

const SELF_ID: u32 = 1;

fn meshed_engine() -> OlsrEngine {
    let clock = ManualClock::new();
    let mut engine = OlsrEngine::new(
        NodeId::new(SELF_ID),
        Willingness::Default,
        None,
        ProtocolConfig::default(),
        Arc::new(clock),
    )
    .unwrap();

    // Ten symmetric neighbors, then a ring of advertised links filling the
    // node universe close to its bound.
    for i in 0..10u32 {
        engine.receive(InboundMessage {
            kind: MsgKind::Hello,
            payload: ControlPayload::Hello(HelloSnapshot {
                hello_interval: 2,
                willingness: Willingness::Default,
                reserved_slot: None,
                neighbors: vec![AdvertisedNeighbor {
                    id: NodeId::new(SELF_ID),
                    link: LinkStatus::Symmetric,
                }],
                two_hop_neighbors: vec![],
            }),
            sender: NodeId::new(10 + i),
            originator: NodeId::new(10 + i),
            seq: MessageSeq::new(i as u16 + 1),
            ttl: Ttl::one_hop(),
            hop_count: HopCount::new(0),
        });
    }
    for i in 0..35u32 {
        let origin = if i == 0 { 10 } else { 100 + i - 1 };
        engine.receive(InboundMessage {
            kind: MsgKind::Tc,
            payload: ControlPayload::Tc(TcSnapshot {
                ansn: Ansn::new(1),
                mpr_selectors: vec![NodeId::new(100 + i)],
            }),
            sender: NodeId::new(10),
            originator: NodeId::new(origin),
            seq: MessageSeq::new(1000 + i as u16),
            ttl: Ttl::flood(),
            hop_count: HopCount::new(0),
        });
    }
    engine.tick();
    engine
}

fn bench_route_recomputation(c: &mut Criterion) {
    c.bench_function("tc_processing_with_route_rebuild", |b| {
        b.iter_batched(
            meshed_engine,
            |mut engine| {
                engine.receive(InboundMessage {
                    kind: MsgKind::Tc,
                    payload: ControlPayload::Tc(TcSnapshot {
                        ansn: Ansn::new(2),
                        mpr_selectors: vec![NodeId::new(140)],
                    }),
                    sender: NodeId::new(10),
                    originator: NodeId::new(134),
                    seq: MessageSeq::new(5000),
                    ttl: Ttl::flood(),
                    hop_count: HopCount::new(0),
                });
                black_box(engine)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_route_recomputation);
criterion_main!(benches);
