mod common;

use std::fs;

use common::{analyzer, config, relation, relation_config, ConsistencyProbe, ScriptedEvaluator};
use relcache::cache::controller::CacheGrowthController;
use relcache::cache::report::Termination;
use relcache::core::error::ErrorKind;
use relcache::relation::store::{MemoryStore, RelationStore};

const PRIMARY_POPULARITY: [f64; 10] = [100.0, 100.0, 90.0, 90.0, 80.0, 80.0, 70.0, 70.0, 60.0, 60.0];

#[test]
fn test_best_offsets_snapshot_while_partitions_keep_growing() {
    // article: mass 800, pages score .125 .1125 .1 .0875 .075
    // image:   mass 110, pages score .0909 then .0455
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);
    let mut image = vec![10.0, 10.0];
    image.extend([5.0; 18]);
    relation(&mut store, "image", 101, &image);

    let config = config(vec![relation_config("article", 2), relation_config("image", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let mut evaluator = ScriptedEvaluator::new(&[0.20, 0.30, 0.50, 0.45, 0.40]);
    let report = controller.run(&mut evaluator).unwrap();

    assert_eq!(report.termination, Termination::Stopped);
    assert_eq!(report.iterations, 5);
    assert_eq!(evaluator.calls, 5);
    let grown: Vec<&str> = report.history.iter().map(|r| r.relation.as_str()).collect();
    assert_eq!(grown, vec!["article", "article", "article", "image", "article"]);

    // best configuration is the 0.50 iteration, the live cache is the last one
    assert_eq!(report.best_accuracy, 0.50);
    assert_eq!(report.best_offsets(), vec![6, 0]);
    assert_eq!(report.live_offsets(), vec![8, 2]);

    let article = report.relation("article").unwrap();
    assert_eq!(article.best_fraction, 0.6);
    assert_eq!(article.live_documents, 8);
    assert_eq!(article.live_cache_rows, 8);
    let image = report.relation("image").unwrap();
    assert_eq!(image.best_fraction, 0.0);
    assert_eq!(image.live_documents, 2);

    assert_eq!(controller.state().best_offsets, vec![6, 0]);
    assert_eq!(controller.state().offsets, vec![8, 2]);
    assert_eq!(controller.partitions()[0].committed_documents(), 8);
}

#[test]
fn test_primary_regression_beyond_epsilon_stops() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);

    let config = config(vec![relation_config("article", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller
        .run(&mut ScriptedEvaluator::new(&[0.20, 0.30, 0.50, 0.45, 0.40]))
        .unwrap();

    assert_eq!(report.termination, Termination::Stopped);
    assert_eq!(report.iterations, 4);
    assert_eq!(report.best_offsets(), vec![6]);
    assert_eq!(report.live_offsets(), vec![8]);
    assert_eq!(controller.partitions()[0].committed_documents(), 8);
}

#[test]
fn test_regression_within_epsilon_keeps_growing() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);

    let config = config(vec![relation_config("article", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller
        .run(&mut ScriptedEvaluator::new(&[0.5, 0.497, 0.496, 0.496, 0.496]))
        .unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.best_offsets(), vec![2]);
    assert_eq!(report.live_offsets(), vec![10]);
}

#[test]
fn test_secondary_regressions_never_stop() {
    // article: mass 6, pages .333 .167; image: mass 250, pages .2 .18 .12
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[2.0, 2.0, 1.0, 1.0]);
    relation(&mut store, "image", 101, &[50.0, 50.0, 45.0, 45.0, 30.0, 30.0]);

    let config = config(vec![relation_config("article", 2), relation_config("image", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller
        .run(&mut ScriptedEvaluator::new(&[0.5, 0.1, 0.05, 0.5, 0.01]))
        .unwrap();

    let grown: Vec<&str> = report.history.iter().map(|r| r.relation.as_str()).collect();
    assert_eq!(grown, vec!["article", "image", "image", "article", "image"]);
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.best_accuracy, 0.5);
    assert_eq!(report.best_offsets(), vec![2, 0]);
    assert_eq!(report.live_offsets(), vec![4, 6]);
}

#[test]
fn test_exhaustion_reports_final_offsets_when_monotonic() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[4.0, 3.0, 2.0, 1.0]);
    relation(&mut store, "image", 101, &[5.0, 5.0]);

    let config = config(vec![relation_config("article", 2), relation_config("image", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller.run(&mut ScriptedEvaluator::new(&[0.1, 0.2, 0.3])).unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.best_offsets(), vec![4, 2]);
    assert_eq!(report.best_offsets(), report.live_offsets());
    assert!(controller.partitions().iter().all(|p| p.is_exhausted()));
}

#[test]
fn test_empty_relations_exhaust_immediately() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[]);

    let config = config(vec![relation_config("article", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let mut evaluator = ScriptedEvaluator::new(&[]);
    let report = controller.run(&mut evaluator).unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 0);
    assert_eq!(evaluator.calls, 0);
    assert_eq!(report.best_offsets(), vec![0]);
}

#[test]
fn test_short_page_still_advances_a_full_page() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[3.0, 2.0, 1.0]);

    let config = config(vec![relation_config("article", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller.run(&mut ScriptedEvaluator::new(&[0.1, 0.2])).unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    let article = report.relation("article").unwrap();
    assert_eq!(article.live_offset, 4);
    assert_eq!(article.live_documents, 3);
    assert_eq!(article.best_fraction, 4.0 / 3.0);
}

#[test]
fn test_index_and_cache_table_agree_after_every_iteration() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);
    relation(&mut store, "image", 101, &[9.0, 7.0, 5.0, 3.0, 1.0]);

    let config = config(vec![relation_config("article", 3), relation_config("image", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let mut probe = ConsistencyProbe {
        store: &store,
        inner: ScriptedEvaluator::new(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]),
        checks: Vec::new(),
    };
    let report = controller.run(&mut probe).unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert!(!probe.checks.is_empty());
    assert!(probe.checks.iter().all(|&ok| ok));
    for partition in controller.partitions() {
        assert!(partition.is_consistent(&store).unwrap());
    }
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 10);
    assert_eq!(store.count_cache_rows("tmp_image").unwrap(), 5);
}

#[test]
fn test_iteration_bound() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);

    let mut config = config(vec![relation_config("article", 2)]);
    config.max_iterations = 2;
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller.run(&mut ScriptedEvaluator::new(&[0.1, 0.2, 0.3])).unwrap();

    assert_eq!(report.termination, Termination::IterationLimit);
    assert_eq!(report.iterations, 2);
    assert_eq!(report.live_offsets(), vec![4]);
}

#[test]
fn test_exhaustion_on_last_allowed_iteration_is_not_a_limit() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[4.0, 3.0, 2.0, 1.0]);

    let mut config = config(vec![relation_config("article", 2)]);
    config.max_iterations = 2;
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let report = controller.run(&mut ScriptedEvaluator::new(&[0.1, 0.2])).unwrap();

    assert!(controller.partitions()[0].is_exhausted());
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 2);
    assert_eq!(report.live_offsets(), vec![4]);
}

#[test]
fn test_failed_cache_insert_is_fatal_with_context() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);
    store.fail_inserts_into("tmp_article");

    let config = config(vec![relation_config("article", 2)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    let err = controller.run(&mut ScriptedEvaluator::new(&[0.1])).unwrap_err();

    assert_eq!(err.kind, ErrorKind::Database);
    assert!(err.is_fatal());
    assert!(err.context.contains("partition=article iteration=1 offset=0"), "{}", err);
    assert_eq!(controller.partitions()[0].committed_documents(), 0);
}

#[test]
fn test_controller_runs_once() {
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &[1.0]);

    let config = config(vec![relation_config("article", 1)]);
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    controller.run(&mut ScriptedEvaluator::new(&[0.1])).unwrap();
    let err = controller.run(&mut ScriptedEvaluator::new(&[0.1])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[test]
fn test_failed_index_commit_is_fatal_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    relation(&mut store, "article", 1, &PRIMARY_POPULARITY);

    let mut config = config(vec![relation_config("article", 2)]);
    config.index_dir = Some(dir.path().to_path_buf());
    let mut controller = CacheGrowthController::from_config(&store, &config, analyzer()).unwrap();
    fs::remove_dir_all(dir.path().join("tmp_article").join("segments")).unwrap();

    let err = controller.run(&mut ScriptedEvaluator::new(&[0.1])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexIo);
    assert!(err.is_fatal());
    assert!(err.context.contains("partition=article iteration=1 offset=0"), "{}", err);
}
