//! Auction engine and hub dispatch benchmarks.

use bids_core::{AuctionHouse, AuctionSpec, SessionId};
use bids_server::{Hub, HubEvent, ServerConfig, DEFAULT_OUTBOUND_QUEUE};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn spec(name: &str, secs: u64) -> AuctionSpec {
    AuctionSpec {
        name: name.to_string(),
        min_price: 100,
        increment: 10,
        duration_secs: secs,
    }
}

fn bench_bid_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("bid_sequence");

    for bids in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(bids));
        group.bench_with_input(BenchmarkId::from_parameter(bids), &bids, |b, &bids| {
            let now = Instant::now();
            b.iter(|| {
                let mut house = AuctionHouse::new();
                let id = house.create(spec("item", 60), SessionId(0), now).id();
                for i in 0..bids {
                    let amount = 100 + i * 10;
                    house
                        .bid(id, SessionId(i % 8 + 1), "bidder", amount, now)
                        .unwrap();
                }
                black_box(house.get(id).map(|a| a.current_bid()))
            });
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for auctions in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(auctions));
        group.bench_with_input(
            BenchmarkId::from_parameter(auctions),
            &auctions,
            |b, &auctions| {
                let start = Instant::now();
                b.iter(|| {
                    let mut house = AuctionHouse::new();
                    for i in 0..auctions {
                        // Half expire at the sweep, half stay live.
                        house.create(spec("item", 1 + (i % 2) * 60), SessionId(1), start);
                    }
                    black_box(house.sweep(start + Duration::from_secs(2)).len())
                });
            },
        );
    }

    group.finish();
}

fn bench_hub_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("hub_speak_broadcast");

    for sessions in [10u64, 100, 500] {
        let now = Instant::now();
        let mut hub = Hub::from_config(&ServerConfig::default());
        let mut receivers = Vec::new();
        for id in 1..=sessions {
            let (tx, rx) = mpsc::channel(DEFAULT_OUTBOUND_QUEUE);
            receivers.push(rx);
            hub.handle_event(
                HubEvent::Connected {
                    id: SessionId(id),
                    remote_addr: "127.0.0.1:5000".parse().unwrap(),
                    outbound: tx,
                },
                now,
            );
            hub.on_line(SessionId(id), &format!("HELLO user{} pw", id), now);
            for rx in receivers.iter_mut() {
                while rx.try_recv().is_ok() {}
            }
        }

        group.throughput(Throughput::Elements(sessions));
        group.bench_function(BenchmarkId::from_parameter(sessions), |b| {
            b.iter(|| {
                hub.on_line(SessionId(1), "SPEAK hello everyone", now);
                for rx in receivers.iter_mut() {
                    while rx.try_recv().is_ok() {}
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bid_sequence, bench_sweep, bench_hub_broadcast);
criterion_main!(benches);
