//! Benchmarks for optional-argument decoding and the transmit path
//!
//! Argument blocks are decoded on every decorated streaming call, so the walk
//! has to stay well below the cost of the transport call it precedes.
//!
//! Platform: Cross-platform (mock transport, CI-safe)

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use radiostream::args::{ArgBlockWriter, ParsedArgs, RecordReader};
use radiostream::config::StreamConfig;
use radiostream::session::StreamingSession;
use radiostream::streamer::BurstTransmitter;
use radiostream::test_utils::MockTxStream;
use std::hint::black_box;

/// A block with `records` alternating time and channel records.
fn block_with(records: usize) -> Vec<u8> {
    let mut writer = ArgBlockWriter::new();
    for i in 0..records {
        writer = if i % 2 == 0 {
            writer.command_time(1_500_000_000 + i as u64)
        } else {
            writer.channel(0)
        };
    }
    writer.finish()
}

fn bench_record_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_walk");

    for records in [1usize, 2, 16, 256] {
        let block = block_with(records);
        group.throughput(Throughput::Bytes(block.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(records), &block, |b, block| {
            b.iter(|| RecordReader::new(black_box(block)).count())
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_args");

    for records in [2usize, 16] {
        let block = block_with(records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &block, |b, block| {
            b.iter(|| black_box(ParsedArgs::parse(black_box(block)).expect("valid block")))
        });
    }

    group.finish();
}

fn bench_burst_cycle(c: &mut Criterion) {
    let block = block_with(2);
    let samples = vec![0u32; 1024];

    // Fresh transmitter per batch: the mock transport records every call.
    let transmitter = || {
        let session = StreamingSession::new(vec![0], 1).expect("valid session");
        BurstTransmitter::new(MockTxStream::new(), session, StreamConfig::default())
            .expect("valid config")
    };

    c.bench_function("burst_begin_transfer_end", |b| {
        b.iter_batched(
            transmitter,
            |mut tx| {
                tx.begin_burst(black_box(&block)).expect("begin");
                tx.transfer(&[&samples[..]], samples.len()).expect("transfer");
                tx.end_burst().expect("end");
                tx
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_record_walk, bench_parse, bench_burst_cycle);
criterion_main!(benches);
