use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docai_core::config::Settings;
use docai_core::error::Error;
use docai_core::traits::{Embedder, IndexStore};
use docai_core::types::Document;
use docai_embed::HashEmbedder;
use docai_hybrid::{FileStore, HybridSearchEngine, IndexSnapshot, MemoryStore};

const DIM: usize = 256;

fn settings() -> Settings {
    let mut s = Settings::default();
    s.embedding.dim = DIM;
    s
}

fn hash_embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(DIM, 256))
}

fn manuals() -> Vec<Document> {
    vec![
        Document::new("printer.txt", "printer.txt", "If the printer is offline, open the print queue and restart the spooler service."),
        Document::new("wifi.txt", "wifi.txt", "When wifi drops, reset the network adapter from Device Manager."),
        Document::new("backup.txt", "backup.txt", "Backups run nightly. Restore a file from the backup folder."),
    ]
}

/// Counts calls and can be told to fail or to return the wrong dimension.
struct ScriptedEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
    fail: bool,
    wrong_dim: bool,
    delay: Duration,
}

impl ScriptedEmbedder {
    fn new() -> Self {
        Self { inner: HashEmbedder::new(DIM, 256), calls: AtomicUsize::new(0), fail: false, wrong_dim: false, delay: Duration::ZERO }
    }
}

impl Embedder for ScriptedEmbedder {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { DIM }
    fn max_len(&self) -> usize { 256 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail {
            anyhow::bail!("model runner crashed");
        }
        let mut out = self.inner.embed_batch(texts)?;
        if self.wrong_dim {
            for v in &mut out { v.truncate(DIM / 2); }
        }
        Ok(out)
    }
}

#[tokio::test]
async fn single_short_document_is_reachable_by_any_query() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    let text = "Press Ctrl+Alt+Del to open the task manager now...";
    assert_eq!(text.chars().count(), 50);
    let stats = engine.build_index(&[Document::new("one", "one.txt", text)]).await.unwrap();
    assert_eq!(stats.chunks, 1);

    let snapshot = engine.snapshot().unwrap();
    let qv = hash_embedder().embed("zebra crossing").unwrap();
    assert_eq!(snapshot.search_dense(&qv, 5).unwrap().len(), 1);
    assert_eq!(snapshot.search_sparse("zebra crossing", 5).len(), 1);

    for query in ["task manager", "zebra crossing"] {
        let candidates = engine.retrieve(query, 12).await.unwrap();
        assert_eq!(candidates.len(), 1, "query {query:?}");
        assert_eq!(candidates[0].chunk_id, "one:0");
        assert_eq!(candidates[0].text, text);
    }
}

#[tokio::test]
async fn retrieve_without_an_index_is_empty() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    assert!(engine.retrieve("printer", 5).await.unwrap().is_empty());
    assert!(matches!(engine.require_snapshot(), Err(Error::IndexUnavailable(_))));

    let stats = engine.build_index(&[]).await.unwrap();
    assert_eq!(stats.chunks, 0);
    assert!(engine.retrieve("printer", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_query_and_zero_k_are_empty() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    engine.build_index(&manuals()).await.unwrap();
    assert!(engine.retrieve("   ", 5).await.unwrap().is_empty());
    assert!(engine.retrieve("printer", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_weights_are_rejected_before_searching() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    let err = engine.retrieve_weighted("printer", 5, -1.0, 0.4).await.unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[tokio::test]
async fn lexical_match_ranks_first_with_unique_sorted_candidates() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    engine.build_index(&manuals()).await.unwrap();

    let candidates = engine.retrieve("restart the spooler", 12).await.unwrap();
    assert_eq!(candidates[0].doc_id, "printer.txt");
    assert!(candidates[0].sparse_score.unwrap() > 0.0);
    assert_eq!(candidates[0].locator.page, 1);

    let ids: HashSet<&str> = candidates.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids.len(), candidates.len());
    for pair in candidates.windows(2) {
        assert!(pair[0].fused_score >= pair[1].fused_score);
    }

    let again = engine.retrieve("restart the spooler", 12).await.unwrap();
    assert_eq!(again, candidates, "identical inputs give identical output");
}

#[tokio::test]
async fn blank_documents_are_skipped() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    let mut docs = manuals();
    docs.push(Document::new("empty.txt", "empty.txt", " \n "));
    let stats = engine.build_index(&docs).await.unwrap();
    assert_eq!(stats.documents, 4);
    assert_eq!(stats.skipped_documents, 1);
    assert_eq!(stats.chunks, 3);
    assert_eq!(engine.snapshot().unwrap().document_count(), 3);
}

#[tokio::test]
async fn status_reports_the_served_index() {
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap();
    let empty = engine.status();
    assert!(!empty.loaded);
    assert_eq!((empty.dim, empty.documents, empty.chunks, empty.vocabulary), (DIM, 0, 0, 0));

    engine.build_index(&manuals()).await.unwrap();
    let status = engine.status();
    assert!(status.loaded);
    assert_eq!(status.embedder_id, format!("hash:d{DIM}"));
    assert_eq!((status.documents, status.chunks), (3, 3));
    assert!(status.vocabulary > 10);

    engine.clear().await.unwrap();
    assert!(!engine.status().loaded);
}

#[tokio::test]
async fn persisted_index_is_reloaded() {
    let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap().with_store(store.clone());
    let stats = engine.build_index(&manuals()).await.unwrap();
    assert!(stats.persisted);
    let expected = engine.retrieve("network adapter", 3).await.unwrap();

    let reopened = HybridSearchEngine::open(hash_embedder(), store, &settings()).unwrap();
    assert_eq!(reopened.snapshot().unwrap().len(), 3);
    assert_eq!(reopened.retrieve("network adapter", 3).await.unwrap(), expected);
}

#[tokio::test]
async fn corrupt_or_foreign_index_means_no_index() {
    let store = Arc::new(MemoryStore::new());
    store.save(b"{\"version\": 1, \"chunks\": [").unwrap();
    let engine = HybridSearchEngine::open(hash_embedder(), store.clone(), &settings()).unwrap();
    assert!(engine.snapshot().is_none());
    assert!(engine.retrieve("printer", 5).await.unwrap().is_empty());

    // Built by a different embedder.
    let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM / 2, 256));
    let mut other_settings = settings();
    other_settings.embedding.dim = DIM / 2;
    let builder = HybridSearchEngine::new(other, &other_settings).unwrap().with_store(store.clone());
    builder.build_index(&manuals()).await.unwrap();
    let engine = HybridSearchEngine::open(hash_embedder(), store, &settings()).unwrap();
    assert!(engine.snapshot().is_none());
}

#[tokio::test]
async fn snapshot_bytes_are_validated() {
    let chunks = docai_core::chunk(&manuals()[0], 40, 10).unwrap();
    let vectors = hash_embedder().embed_batch(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>()).unwrap();
    let snapshot = IndexSnapshot::build("hash:d256", DIM, chunks, vectors).unwrap();
    let bytes = snapshot.to_bytes().unwrap();
    assert_eq!(IndexSnapshot::from_bytes(&bytes).unwrap().len(), snapshot.len());

    let mut json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["version"] = serde_json::json!(99);
    let err = IndexSnapshot::from_bytes(&serde_json::to_vec(&json).unwrap()).unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));

    let mut json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["chunks"].as_array_mut().unwrap().pop();
    assert!(IndexSnapshot::from_bytes(&serde_json::to_vec(&json).unwrap()).is_err());
}

#[tokio::test]
async fn file_store_round_trip_and_clear() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("index/docai-index.json");
    let store = Arc::new(FileStore::new(&path));
    assert!(store.load().unwrap().is_none());

    let engine = HybridSearchEngine::new(hash_embedder(), &settings()).unwrap().with_store(store.clone());
    engine.build_index(&manuals()).await.unwrap();
    assert!(path.exists());

    let reopened = HybridSearchEngine::open(hash_embedder(), store.clone(), &settings()).unwrap();
    assert!(reopened.snapshot().is_some());

    reopened.clear().await.unwrap();
    assert!(!path.exists());
    assert!(reopened.snapshot().is_none());
    assert!(reopened.retrieve("printer", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedding_failures_propagate_and_keep_the_old_index() {
    let ok = Arc::new(ScriptedEmbedder::new());
    let engine = HybridSearchEngine::new(ok, &settings()).unwrap();
    engine.build_index(&manuals()[..1]).await.unwrap();

    let failing = Arc::new(ScriptedEmbedder { fail: true, ..ScriptedEmbedder::new() });
    let broken = HybridSearchEngine::new(failing, &settings()).unwrap();
    let err = broken.build_index(&manuals()).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingFailure(ref m) if m.contains("model runner crashed")), "{err}");
    assert!(broken.snapshot().is_none());

    let wrong = Arc::new(ScriptedEmbedder { wrong_dim: true, ..ScriptedEmbedder::new() });
    let broken = HybridSearchEngine::new(wrong, &settings()).unwrap();
    assert!(matches!(broken.build_index(&manuals()).await, Err(Error::EmbeddingFailure(_))));

    assert_eq!(engine.snapshot().unwrap().len(), 1);
}

#[tokio::test]
async fn rebuild_reuses_unchanged_embeddings() {
    let embedder = Arc::new(ScriptedEmbedder::new());
    let engine = HybridSearchEngine::new(embedder.clone(), &settings()).unwrap();
    let first = engine.build_index(&manuals()).await.unwrap();
    assert_eq!(first.embedded, 3);
    let calls_after_first = embedder.calls.load(Ordering::SeqCst);

    let mut docs = manuals();
    docs[2].text = "Backups run weekly now.".into();
    let second = engine.build_index(&docs).await.unwrap();
    assert_eq!(second.reused_embeddings, 2);
    assert_eq!(second.embedded, 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_first + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_partial_rebuild() {
    let mut s = settings();
    s.embedding.batch_size = 1;
    let embedder = Arc::new(ScriptedEmbedder { delay: Duration::from_millis(15), ..ScriptedEmbedder::new() });
    let engine = Arc::new(HybridSearchEngine::new(embedder, &s).unwrap());

    let old: Vec<Document> = (0..4).map(|i| Document::new(format!("old/{i}"), "old", format!("legacy printer notes {i}"))).collect();
    let new: Vec<Document> = (0..6).map(|i| Document::new(format!("new/{i}"), "new", format!("updated printer guide {i}"))).collect();
    engine.build_index(&old).await.unwrap();

    let writer = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.build_index(&new).await })
    };
    let mut saw_old = false;
    while !writer.is_finished() {
        let candidates = engine.retrieve("printer", 20).await.unwrap();
        let prefixes: HashSet<&str> = candidates.iter().map(|c| &c.doc_id[..3]).collect();
        assert_eq!(prefixes.len(), 1, "mixed snapshot: {prefixes:?}");
        saw_old |= prefixes.contains("old");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    writer.await.unwrap().unwrap();
    assert!(saw_old, "reads during the rebuild were served by the old index");
    let after = engine.retrieve("printer", 20).await.unwrap();
    assert!(after.iter().all(|c| c.doc_id.starts_with("new")));
    assert_eq!(after.len(), 6);
}
