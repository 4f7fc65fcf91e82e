mod common;

use std::path::Path;
use relcache::cache::controller::CacheGrowthController;
use relcache::cache::report::Termination;
use relcache::core::config::{JoinEdgeConfig, RelationConfig};
use relcache::core::error::ErrorKind;
use relcache::core::types::TupleId;
use relcache::index::writer::PartitionIndex;
use relcache::relation::sqlite::SqliteStore;
use relcache::relation::store::RelationStore;

const FIXTURE: &str = r#"
CREATE TABLE article (id INTEGER PRIMARY KEY, title TEXT, text TEXT, popularity REAL);
INSERT INTO article VALUES (1, 'Ownership', 'rust ownership and borrowing', 10.0);
INSERT INTO article VALUES (2, 'Collection', 'java garbage collection', 8.0);
INSERT INTO article VALUES (3, NULL, 'borrow checker internals', 8.0);
INSERT INTO article VALUES (4, 'Stub', NULL, 1.0);

CREATE TABLE image (id INTEGER PRIMARY KEY, caption TEXT, popularity REAL);
INSERT INTO image VALUES (10, 'ferris crab ownership diagram', 3.0);
INSERT INTO image VALUES (20, 'coffee cup', 1.0);

CREATE TABLE article_image (article_id INTEGER, image_id INTEGER);
INSERT INTO article_image VALUES (1, 10);
INSERT INTO article_image VALUES (2, 20);
"#;

fn open_fixture(dir: &Path) -> SqliteStore {
    let store = SqliteStore::open(&dir.join("relations.db")).unwrap();
    store.execute_script(FIXTURE).unwrap();
    store
}

fn article_config() -> RelationConfig {
    RelationConfig::new("article", &["title", "text"])
}

#[test]
fn test_describe_counts_relation() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());

    let article = store.describe(&article_config(), 2).unwrap();
    assert_eq!(article.total_tuples, 4);
    assert_eq!(article.popularity_mass, 27.0);
    assert_eq!(article.page_size, 2);

    let bad = RelationConfig::new("article; DROP TABLE image", &["text"]);
    assert_eq!(store.describe(&bad, 2).unwrap_err().kind, ErrorKind::InvalidArgument);
}

#[test]
fn test_pages_follow_descending_popularity() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());
    let article = store.describe(&article_config(), 2).unwrap();

    let first = store.fetch_page(&article, 0, 2).unwrap();
    let ids: Vec<TupleId> = first.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![TupleId(1), TupleId(2)]);
    assert_eq!(first[1].popularity, 8.0);

    let second = store.fetch_page(&article, 2, 2).unwrap();
    assert_eq!(second[0].id, TupleId(3));
    assert_eq!(second[0].text_values, vec![None, Some("borrow checker internals".to_string())]);
    assert_eq!(article.build_text(&second[0]), "borrow checker internals");
    assert_eq!(article.build_text(&second[1]), "Stub");

    assert!(store.fetch_page(&article, 4, 2).unwrap().is_empty());
}

#[test]
fn test_cache_table_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());

    store.create_cache_table("tmp_article").unwrap();
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 0);
    store.insert_cache_ids("tmp_article", &[TupleId(1), TupleId(2), TupleId(3)]).unwrap();
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 3);

    // recreating always starts empty
    store.create_cache_table("tmp_article").unwrap();
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 0);

    let err = store.insert_cache_ids("tmp_missing", &[TupleId(1)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[test]
fn test_cache_insert_spans_several_batches() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());

    let ids: Vec<TupleId> = (0..1234).map(TupleId).collect();
    store.create_cache_table("tmp_article").unwrap();
    store.insert_cache_ids("tmp_article", &ids).unwrap();
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 1234);

    // an empty page inserts nothing
    store.insert_cache_ids("tmp_article", &[]).unwrap();
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 1234);
}

#[test]
fn test_load_join_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());

    let edge = JoinEdgeConfig {
        table: "article_image".to_string(),
        left: "article".to_string(),
        left_column: "article_id".to_string(),
        right: "image".to_string(),
        right_column: "image_id".to_string(),
    };
    let mut pairs = store.load_join_pairs(&edge).unwrap();
    pairs.sort();
    assert_eq!(pairs, vec![(TupleId(1), TupleId(10)), (TupleId(2), TupleId(20))]);
}

#[test]
fn test_growth_run_against_sqlite_with_persisted_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_fixture(dir.path());

    let mut image = RelationConfig::new("image", &["caption"]);
    image.page_size = Some(1);
    let mut article = article_config();
    article.page_size = Some(2);
    let mut config = common::config(vec![article, image]);
    config.index_dir = Some(dir.path().join("indexes"));

    let mut controller = CacheGrowthController::from_config(&store, &config, common::analyzer()).unwrap();
    let report = controller
        .run(&mut common::ScriptedEvaluator::new(&[0.1, 0.2, 0.3, 0.4]))
        .unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.iterations, 4);
    for relation in &report.relations {
        assert_eq!(relation.live_documents as u64, relation.live_cache_rows);
    }
    assert_eq!(store.count_cache_rows("tmp_article").unwrap(), 4);
    assert_eq!(store.count_cache_rows("tmp_image").unwrap(), 2);
    drop(controller);

    let reopened = PartitionIndex::reopen(
        "article",
        dir.path().join("indexes").join("tmp_article"),
        common::analyzer(),
    )
    .unwrap();
    assert_eq!(reopened.committed_doc_count(), 4);
}
