use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::NaiveDate;

use curafin_core::{Money, UserId};
use curafin_ledger::{MirrorConfig, Scope, TxnKind};
use curafin_posting::{PostRequest, PostingService};
use curafin_store::{InMemoryLedgerStore, InMemorySequencer, Sequencer};

type Service = PostingService<Arc<InMemoryLedgerStore>, Arc<InMemorySequencer>>;

fn setup(config: MirrorConfig) -> Service {
    let store = Arc::new(InMemoryLedgerStore::new());
    let sequencer = Arc::new(InMemorySequencer::new());
    PostingService::new(store, sequencer).with_config(config)
}

fn request(scope: Scope, kind: TxnKind) -> PostRequest {
    PostRequest {
        scope,
        kind,
        amount: Money::from_major(25),
        label: "Consultation".to_string(),
        description: "visit".to_string(),
        occurred_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        business_ref: None,
        created_by: UserId::new(),
    }
}

fn bench_posting_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("posting_latency");
    group.throughput(Throughput::Elements(1));

    // Department without central mirroring: one shard commit per post.
    group.bench_function("income_unmirrored", |b| {
        let service = setup(MirrorConfig::none());
        b.iter(|| {
            service
                .post(black_box(request(Scope::Medicine, TxnKind::Income)))
                .unwrap()
        });
    });

    // Hospital income with daily aggregation: after the first post, every
    // iteration merges into the same voucher row.
    group.bench_function("income_mirrored_aggregated", |b| {
        let service = setup(MirrorConfig::default());
        b.iter(|| {
            service
                .post(black_box(request(Scope::Hospital, TxnKind::Income)))
                .unwrap()
        });
    });

    group.finish();
}

fn bench_sequencer(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequencer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("next_transaction_no", |b| {
        let sequencer = InMemorySequencer::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        b.iter(|| {
            sequencer
                .next_transaction_no(Scope::Hospital, TxnKind::Income, black_box(date))
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_posting_latency, bench_sequencer);
criterion_main!(benches);
