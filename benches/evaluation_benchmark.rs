use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relcache::analysis::analyzer::Analyzer;
use relcache::cache::controller::Evaluator;
use relcache::cache::partition::Partition;
use relcache::core::config::{ExperimentConfig, JoinEdgeConfig, RelationConfig};
use relcache::core::types::{Document, TupleId, TupleRef};
use relcache::eval::adapter::JoinEvaluatorAdapter;
use relcache::eval::join::{EdgeJoinEvaluator, SchemaDescription};
use relcache::eval::query::ExperimentQuery;
use relcache::index::writer::PartitionIndex;
use relcache::relation::store::{MemoryStore, MemoryTuple, RelationStore};
use std::sync::Arc;

const WORDS: [&str; 16] = [
    "rust", "ownership", "borrow", "lifetime", "trait", "generic", "async", "future",
    "thread", "mutex", "channel", "closure", "iterator", "macro", "crate", "module",
];

fn random_text(rng: &mut StdRng, words: usize) -> String {
    (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two related relations with `size` tuples each and a 1:1 join table.
fn fixture(size: i64) -> (MemoryStore, ExperimentConfig) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = MemoryStore::new();
    let article = (0..size)
        .map(|i| MemoryTuple::new(i, (size - i) as f64).with("text", &random_text(&mut rng, 40)))
        .collect();
    let image = (0..size)
        .map(|i| MemoryTuple::new(i, (size - i) as f64).with("caption", &random_text(&mut rng, 8)))
        .collect();
    store.add_relation("article", article);
    store.add_relation("image", image);
    let pairs: Vec<(i64, i64)> = (0..size).map(|i| (i, (i * 7) % size)).collect();
    store.add_join_table("article_image", &pairs);

    let config = ExperimentConfig {
        relations: vec![
            RelationConfig::new("article", &["text"]),
            RelationConfig::new("image", &["caption"]),
        ],
        join_edges: vec![JoinEdgeConfig {
            table: "article_image".to_string(),
            left: "article".to_string(),
            left_column: "article_id".to_string(),
            right: "image".to_string(),
            right_column: "image_id".to_string(),
        }],
        ..ExperimentConfig::default()
    };
    (store, config)
}

fn queries(count: u64) -> Vec<ExperimentQuery> {
    let mut rng = StdRng::seed_from_u64(11);
    (0..count)
        .map(|id| {
            let text = random_text(&mut rng, 3);
            let target = TupleRef::new("article", TupleId(rng.gen_range(0..1000)));
            ExperimentQuery::new(id, &text, vec![target])
        })
        .collect()
}

fn grown_partitions(store: &MemoryStore, config: &ExperimentConfig) -> Vec<Partition> {
    let analyzer = Arc::new(Analyzer::standard_english());
    config
        .relations
        .iter()
        .map(|relation| {
            let descriptor = store.describe(relation, config.page_divisor).unwrap();
            let index = PartitionIndex::in_memory(&relation.name, analyzer.clone());
            let mut partition =
                Partition::create(store, descriptor, config.cache_table_name(&relation.name), index).unwrap();
            let rows = store.fetch_page(&partition.descriptor, 0, usize::MAX).unwrap();
            let documents: Vec<Document> = rows.iter().map(|r| partition.descriptor.build_document(r)).collect();
            partition.grow(store, documents).unwrap();
            partition
        })
        .collect()
}

/// Benchmark one evaluation pass over a fixed sample
fn bench_evaluation_pass(c: &mut Criterion) {
    let (store, base) = fixture(1000);
    let partitions = grown_partitions(&store, &base);
    let mut group = c.benchmark_group("evaluation_pass");

    for threads in [1usize, 2, 4] {
        let config = ExperimentConfig {
            evaluation_threads: threads,
            ..base.clone()
        };
        let schema = SchemaDescription::load(&store, &config).unwrap();
        let mut adapter = JoinEvaluatorAdapter::new(
            schema,
            Box::new(EdgeJoinEvaluator::new(config.max_join_results)),
            queries(64),
            &config,
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| black_box(adapter.evaluate(&partitions).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark growing a partition by one page
fn bench_page_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_commit");

    for page_size in [50usize, 200, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, &page_size| {
            let (store, config) = fixture(page_size as i64);
            let descriptor = store.describe(&config.relations[0], config.page_divisor).unwrap();
            let rows = store.fetch_page(&descriptor, 0, page_size).unwrap();
            let documents: Vec<Document> = rows.iter().map(|r| descriptor.build_document(r)).collect();

            b.iter(|| {
                let mut index = PartitionIndex::in_memory("article", Arc::new(Analyzer::standard_english()));
                index.append(documents.clone());
                black_box(index.commit().unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluation_pass, bench_page_commit);
criterion_main!(benches);
