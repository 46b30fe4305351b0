//! Line framing and request parsing benchmarks.

use bids_protocol::{encode_line, AuctionSummary, LineDecoder, Reply, Request};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn pipelined_input(lines: usize) -> Vec<u8> {
    let mut input = Vec::new();
    for i in 0..lines {
        input.extend_from_slice(format!("BID {} {}\r\n", i % 7, 100 + i).as_bytes());
    }
    input
}

fn bench_decode_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_lines");

    for lines in [1, 100, 1000] {
        let input = pipelined_input(lines);

        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &input, |b, input| {
            b.iter(|| {
                let mut decoder = LineDecoder::new();
                decoder.extend(input);
                let mut count = 0;
                while let Ok(Some(line)) = decoder.decode_line() {
                    black_box(line);
                    count += 1;
                }
                count
            });
        });
    }

    group.finish();
}

fn bench_decode_fragmented(c: &mut Criterion) {
    let input = pipelined_input(100);

    c.bench_function("decode_fragmented_16b", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut count = 0;
            for chunk in input.chunks(16) {
                decoder.extend(chunk);
                while let Ok(Some(line)) = decoder.decode_line() {
                    black_box(line);
                    count += 1;
                }
            }
            count
        });
    });
}

fn bench_parse_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_request");

    for line in [
        "PING 1700000000",
        "CREAT item1 100 10 60",
        "SPEAK the quick brown fox jumps over the lazy dog",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(line), line, |b, line| {
            b.iter(|| {
                let request = Request::parse(black_box(line)).unwrap();
                black_box(request.args().len())
            });
        });
    }

    group.finish();
}

fn bench_encode_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_reply");

    for auctions in [1, 10, 100] {
        let reply = Reply::Auctions(
            (0..auctions)
                .map(|id| AuctionSummary {
                    id,
                    name: format!("item{}", id),
                    min_price: 100,
                    current_bid: 150,
                    secs_left: 30,
                    participants: 3,
                })
                .collect(),
        );

        group.throughput(Throughput::Elements(auctions));
        group.bench_with_input(BenchmarkId::from_parameter(auctions), &reply, |b, reply| {
            b.iter(|| black_box(encode_line(&reply.to_string())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_lines,
    bench_decode_fragmented,
    bench_parse_request,
    bench_encode_reply
);
criterion_main!(benches);
