pub mod core;
pub mod analysis;
pub mod query;
pub mod scoring;
pub mod search;
pub mod index;
pub mod storage;
pub mod relation;
pub mod eval;
pub mod cache;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                         RELCACHE STRUCT ARCHITECTURE                         │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── CACHE LAYER ───────────────────────────────────┐
│                                                                              │
│  struct CacheGrowthController<'a>                                            │
│    store: &dyn RelationStore          // paging + mirrored cache tables      │
│    partitions: Vec<Partition>         // index 0 = primary relation          │
│    selector: PopularitySelector       // max last_popularity / mass          │
│    state: LoopState                   // offsets, best offsets, best acc     │
│    history: Vec<IterationRecord>                                             │
│                                                                              │
│  INIT ─▶ SELECT ─▶ GROW ─▶ EVALUATE ─▶ DECIDE ─┬─▶ SELECT                    │
│            │                                    └─▶ STOPPED                  │
│            └─▶ EXHAUSTED                                                     │
│                                                                              │
│  struct Partition                                                            │
│    descriptor: RelationDescriptor                                            │
│    cache_table: String                // tmp_<relation> (id)                 │
│    index: PartitionIndex              // append + commit, snapshots          │
│    offset / last_popularity / staged page                                    │
└──────────────────────────────────────────────────────────────────────────────┘
                │ GROW                                  │ EVALUATE
                ▼                                       ▼
┌────────── RELATION LAYER ──────────┐   ┌────────────── EVAL LAYER ──────────────┐
│ trait RelationStore                │   │ struct JoinEvaluatorAdapter            │
│   SqliteStore (sqlx + tokio rt)    │   │   pool: rayon::ThreadPool (barrier)    │
│   MemoryStore                      │   │   parser: QueryParser                  │
│ struct RelationDescriptor          │   │   evaluator: Box<dyn JoinEvaluator>    │
│   build_document(&TupleRow)        │   │   schema: SchemaDescription            │
└────────────────────────────────────┘   │ scorer: dedup, RR, P@k, R@k            │
                                         └────────────────────────────────────────┘
                                                        │ search
                                                        ▼
┌────────────────────────────── INDEX LAYER ───────────────────────────────────┐
│  PartitionIndex ─ commit ─▶ SnapshotController (RwLock<BTreeMap<ver, Snap>>)  │
│  IndexSnapshot { segments: Vec<Arc<Segment>> }  ── BM25Scorer, TopKCollector │
│  Segment { postings: HashMap<term, PostingList>, doc_lengths, ids }          │
│  storage: PartitionLayout, segment files (bincode + lz4 + crc32), Checkpoint │
└──────────────────────────────────────────────────────────────────────────────┘
*/
