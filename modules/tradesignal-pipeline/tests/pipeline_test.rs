// Integration tests for the pipeline orchestrator and stage workers, running
// entirely against in-memory mocks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tradesignal_common::{
    AnalysisMode, ItemStatus, LinkStatus, PipelineError, RiskType, RunState, Sentiment, Stage,
};
use tradesignal_pipeline::testing::{
    article, ignore_verdict, sentiment_verdict, tender_verdict, FixedEmbedder, MemoryStore,
    MockClassifier, MockSource, TEST_EMBEDDING_DIM,
};
use tradesignal_pipeline::{
    stages, Pipeline, PipelineStore, SourceRegistry, StatusTracker,
};

const NEWS: &str = "news.example.com";
const URL_TENDER: &str = "https://news.example.com/news/saudi-rail-tender/";
const URL_TESLA: &str = "https://news.example.com/news/tesla-earnings/";
const URL_FIRE: &str = "https://news.example.com/news/smelter-fire/";

fn tender_source() -> MockSource {
    MockSource::new(NEWS)
        .with_links(&[URL_TENDER, URL_TESLA])
        .on_page(
            URL_TENDER,
            article(
                "Saudi Arabia awards rail tender",
                "Saudi Arabia awarded a $2bn rail tender to Alstom. Bids closed in June.",
            ),
        )
        .on_page(
            URL_TESLA,
            article(
                "Tesla beats earnings estimates",
                "Tesla reported record quarterly earnings, lifting supplier sentiment.",
            ),
        )
}

fn classifier() -> MockClassifier {
    MockClassifier::new()
        .on_text("rail tender", tender_verdict("$2bn", "June", "Alstom"))
        .on_text(
            "Tesla",
            sentiment_verdict("Tesla", Sentiment::Positive, None),
        )
        .with_default(ignore_verdict())
}

fn build_pipeline(
    store: Arc<MemoryStore>,
    sources: Vec<MockSource>,
    embedder: FixedEmbedder,
    classifier: MockClassifier,
) -> Pipeline {
    let mut registry = SourceRegistry::new();
    for source in sources {
        registry = registry.register(Arc::new(source));
    }
    Pipeline::new(
        store,
        Arc::new(registry),
        Arc::new(embedder),
        Arc::new(classifier),
    )
}

/// Poll until the background run releases the single-flight lock.
async fn wait_idle(pipeline: &Pipeline) {
    for _ in 0..400 {
        if !pipeline.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("pipeline did not finish in time");
}

#[tokio::test]
async fn full_run_processes_articles_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert!(run.end_time.is_some());
    assert_eq!(run.new_links_found, 2);
    assert_eq!(run.articles_scraped, 2);
    assert_eq!(run.articles_embedded, 2);
    assert_eq!(run.entities_analyzed, 2);

    assert_eq!(store.link_status(URL_TENDER), Some(LinkStatus::Success));
    assert_eq!(store.link_status(URL_TESLA), Some(LinkStatus::Success));

    let tender_id = store.article_id_for_url(URL_TENDER).unwrap();
    let analysis = store.analysis_for(tender_id).unwrap();
    assert_eq!(analysis.mode, AnalysisMode::Tender);
    assert_eq!(analysis.contract_value.as_deref(), Some("$2bn"));
    assert_eq!(analysis.company_sentiments[0].company_name, "Alstom");

    assert_eq!(store.embedding_count(), 2);
    assert_eq!(
        store.embedding_model_for(tender_id).as_deref(),
        Some("test-embedding")
    );
}

#[tokio::test]
async fn run_details_record_processed_and_failed_counts() {
    let store = Arc::new(MemoryStore::new());
    // Second link has no registered page, so its fetch fails.
    let source = tender_source().with_links(&[URL_TENDER, URL_FIRE]);
    let pipeline = build_pipeline(
        store.clone(),
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    // Per-stage counts survive the run, on the run record itself.
    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    let details = run.details.unwrap();
    assert!(
        details.contains("Finding Links: processed 2, failed 0"),
        "details: {details}"
    );
    assert!(
        details.contains("Scraping Articles: processed 1, failed 1"),
        "details: {details}"
    );
    assert!(
        details.contains("Generating Embeddings: processed 1, failed 0"),
        "details: {details}"
    );
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(MemoryStore::new());
    let source = tender_source().gated_discovery(gate.clone());
    let pipeline = build_pipeline(
        store.clone(),
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let first = pipeline.start_full(None).await.unwrap();

    match pipeline.start_full(None).await {
        Err(PipelineError::Busy { .. }) => {}
        other => panic!("expected Busy, got {other:?}"),
    }
    // The rejected start must not have opened a second run record.
    assert_eq!(store.run_count(), 1);

    gate.notify_one();
    wait_idle(&pipeline).await;
    assert_eq!(store.run(first).unwrap().status, RunState::Completed);

    // Lock is free again after the run finished.
    let gate2 = gate.clone();
    gate2.notify_one();
    pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;
}

#[tokio::test]
async fn rediscovered_links_are_not_duplicated() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let first = pipeline.start_stage(Stage::LinkDiscovery, None).await.unwrap();
    wait_idle(&pipeline).await;
    let second = pipeline.start_stage(Stage::LinkDiscovery, None).await.unwrap();
    wait_idle(&pipeline).await;

    assert_eq!(store.link_count(), 2);
    assert_eq!(store.run(first).unwrap().new_links_found, 2);
    assert_eq!(store.run(second).unwrap().new_links_found, 0);
}

#[tokio::test]
async fn failing_source_does_not_abort_discovery() {
    let store = Arc::new(MemoryStore::new());
    let broken = MockSource::new("broken.example.com").failing_discovery("connection refused");
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source(), broken],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_stage(Stage::LinkDiscovery, None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.new_links_found, 2);

    let stats = run.scraper_stats.unwrap();
    assert!(stats["broken.example.com"]["error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
    assert_eq!(stats[NEWS]["new_links"], 2);
}

#[tokio::test]
async fn failed_scrape_is_isolated_to_its_link() {
    let store = Arc::new(MemoryStore::new());
    // Third link has no registered page, so its fetch fails.
    let source = tender_source().with_links(&[URL_TENDER, URL_FIRE, URL_TESLA]);
    let pipeline = build_pipeline(
        store.clone(),
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.articles_scraped, 2);

    assert_eq!(store.link_status(URL_FIRE), Some(LinkStatus::Failed));
    assert_eq!(store.link_status(URL_TENDER), Some(LinkStatus::Success));
    assert_eq!(store.link_status(URL_TESLA), Some(LinkStatus::Success));
    assert!(!store.has_article_for_link(URL_FIRE));
}

#[tokio::test]
async fn links_without_a_source_module_are_marked_failed() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_links("gone.example.com", &["https://gone.example.com/news/x/".to_string()])
        .await
        .unwrap();

    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_stage(Stage::ArticleScrape, None).await.unwrap();
    wait_idle(&pipeline).await;

    assert_eq!(store.run(run_id).unwrap().status, RunState::Completed);
    assert_eq!(
        store.link_status("https://gone.example.com/news/x/"),
        Some(LinkStatus::Failed)
    );
}

#[tokio::test]
async fn embedding_failure_marks_only_that_article() {
    let store = Arc::new(MemoryStore::new());
    let embedder = FixedEmbedder::new(TEST_EMBEDDING_DIM).failing_for("rail tender");
    let pipeline = build_pipeline(store.clone(), vec![tender_source()], embedder, classifier());

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.articles_embedded, 1);

    let (tender_embed, tender_analysis) = store.article_statuses(URL_TENDER).unwrap();
    assert_eq!(tender_embed, ItemStatus::Failed);
    // Analysis is an independent state machine; it still ran.
    assert_eq!(tender_analysis, ItemStatus::Success);

    let (tesla_embed, _) = store.article_statuses(URL_TESLA).unwrap();
    assert_eq!(tesla_embed, ItemStatus::Success);
}

#[tokio::test]
async fn classifier_failure_marks_only_that_article() {
    let store = Arc::new(MemoryStore::new());
    let classifier = classifier().failing_for("Tesla");
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier,
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.entities_analyzed, 1);

    let (_, tesla_analysis) = store.article_statuses(URL_TESLA).unwrap();
    assert_eq!(tesla_analysis, ItemStatus::Failed);
    let (_, tender_analysis) = store.article_statuses(URL_TENDER).unwrap();
    assert_eq!(tender_analysis, ItemStatus::Success);
    assert_eq!(store.analysis_count(), 1);
}

#[tokio::test]
async fn ignored_articles_complete_without_persisted_analysis() {
    let store = Arc::new(MemoryStore::new());
    let classifier = MockClassifier::new().with_default(ignore_verdict());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier,
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.entities_analyzed, 0);
    assert_eq!(store.analysis_count(), 0);

    let (_, analysis_status) = store.article_statuses(URL_TENDER).unwrap();
    assert_eq!(analysis_status, ItemStatus::Success);
}

#[tokio::test]
async fn negative_sentiment_carries_risk_type() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(NEWS).with_links(&[URL_FIRE]).on_page(
        URL_FIRE,
        article(
            "Fire halts smelter",
            "A fire at Acme Metals halted smelter output for weeks.",
        ),
    );
    let classifier = MockClassifier::new().with_default(sentiment_verdict(
        "Acme Metals",
        Sentiment::Negative,
        Some(RiskType::SupplyDisruption),
    ));
    let pipeline = build_pipeline(
        store.clone(),
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier,
    );

    pipeline.start_full(None).await.unwrap();
    wait_idle(&pipeline).await;

    let article_id = store.article_id_for_url(URL_FIRE).unwrap();
    let analysis = store.analysis_for(article_id).unwrap();
    let company = &analysis.company_sentiments[0];
    assert_eq!(company.sentiment, Sentiment::Negative);
    assert_eq!(company.risk_type, Some(RiskType::SupplyDisruption));
}

#[tokio::test]
async fn source_filter_limits_discovery_and_scraping() {
    let store = Arc::new(MemoryStore::new());
    let other = MockSource::new("other.example.com")
        .with_links(&["https://other.example.com/news/steel-quota/"]);
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source(), other],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline
        .start_full(Some(vec![NEWS.to_string()]))
        .await
        .unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.new_links_found, 2);
    assert_eq!(run.articles_scraped, 2);
    // The filtered-out source contributed nothing.
    assert_eq!(store.link_count(), 2);
    assert!(run.scraper_stats.unwrap().get("other.example.com").is_none());
}

#[tokio::test]
async fn scrape_candidates_filter_applies_before_the_batch_limit() {
    let store = MemoryStore::new();
    // Two older links from another source would fill a batch of one if the
    // filter ran after the limit.
    store
        .insert_links(
            "a.example.com",
            &[
                "https://a.example.com/news/one/".to_string(),
                "https://a.example.com/news/two/".to_string(),
            ],
        )
        .await
        .unwrap();
    store
        .insert_links("b.example.com", &["https://b.example.com/news/three/".to_string()])
        .await
        .unwrap();

    let filter = vec!["b.example.com".to_string()];
    let links = store.scrape_candidates(Some(&filter), 1).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source, "b.example.com");
}

#[tokio::test]
async fn source_filter_with_unknown_name_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    match pipeline
        .start_full(Some(vec!["nope.example.com".to_string()]))
        .await
    {
        Err(PipelineError::UnknownSource(name)) => assert_eq!(name, "nope.example.com"),
        other => panic!("expected UnknownSource, got {other:?}"),
    }
    // The rejected start opened no run and left the lock free.
    assert_eq!(store.run_count(), 0);
    assert!(!pipeline.is_running());
}

#[tokio::test]
async fn stop_request_closes_run_as_stopped() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(MemoryStore::new());
    let source = tender_source().gated_discovery(gate.clone());
    let pipeline = build_pipeline(
        store.clone(),
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_full(None).await.unwrap();
    pipeline.stop().unwrap();
    gate.notify_one();
    wait_idle(&pipeline).await;

    // The run halted somewhere in discovery; whatever the exact point, it
    // must close as STOPPED and never reach the scraping stage.
    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Stopped);
    assert!(run.end_time.is_some());
    assert_eq!(run.articles_scraped, 0);
    assert_eq!(store.article_count(), 0);
}

#[tokio::test]
async fn stop_without_running_pipeline_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(
        store,
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    match pipeline.stop() {
        Err(PipelineError::NotRunning) => {}
        other => panic!("expected NotRunning, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_mid_batch_finishes_in_flight_item() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_links(
            NEWS,
            &[
                URL_TENDER.to_string(),
                URL_TESLA.to_string(),
                URL_FIRE.to_string(),
            ],
        )
        .await
        .unwrap();

    let tracker = StatusTracker::new();
    tracker.acquire().unwrap();
    let run_id = store.create_run().await.unwrap();

    // Fetching the first link trips the cancel flag; the fetch itself still
    // completes and is persisted.
    let source = tender_source()
        .with_links(&[])
        .cancel_on_fetch(URL_TENDER, tracker.cancel_flag());
    let registry = SourceRegistry::new().register(Arc::new(source));

    let outcome = stages::scrape::run(store.as_ref(), &registry, None, &tracker, run_id).await;
    match outcome {
        Err(PipelineError::Cancelled) => {}
        other => panic!("expected Cancelled, got {other:?}"),
    }

    assert_eq!(store.link_status(URL_TENDER), Some(LinkStatus::Success));
    assert!(store.has_article_for_link(URL_TENDER));
    assert_eq!(store.link_status(URL_TESLA), Some(LinkStatus::New));
    assert_eq!(store.link_status(URL_FIRE), Some(LinkStatus::New));
}

#[tokio::test]
async fn stage_failure_closes_run_as_failed_and_releases_lock() {
    let store = Arc::new(MemoryStore::new().failing_scrape_candidates());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_stage(Stage::ArticleScrape, None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Failed);
    assert!(run.details.unwrap().contains("forced failure"));

    // The lock must be free for the next start even after a failure.
    pipeline.start_stage(Stage::LinkDiscovery, None).await.unwrap();
    wait_idle(&pipeline).await;
}

#[tokio::test]
async fn single_stage_run_touches_only_its_stage() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(
        store.clone(),
        vec![tender_source()],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    // Seed links, then run discovery only: nothing gets scraped.
    let run_id = pipeline.start_stage(Stage::LinkDiscovery, None).await.unwrap();
    wait_idle(&pipeline).await;

    let run = store.run(run_id).unwrap();
    assert_eq!(run.status, RunState::Completed);
    assert_eq!(run.new_links_found, 2);
    assert_eq!(run.articles_scraped, 0);
    assert_eq!(store.article_count(), 0);
    assert_eq!(store.link_status(URL_TENDER), Some(LinkStatus::New));
}

#[tokio::test]
async fn status_reports_stage_and_final_state() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(MemoryStore::new());
    let source = tender_source().gated_discovery(gate.clone());
    let pipeline = build_pipeline(
        store,
        vec![source],
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        classifier(),
    );

    let run_id = pipeline.start_full(None).await.unwrap();

    // Poll until the background task reaches the discovery stage.
    let mut saw_stage = false;
    for _ in 0..200 {
        let status = pipeline.status();
        if status.current_stage.as_deref() == Some("Finding Links") {
            assert!(status.is_running);
            assert_eq!(status.run_id, Some(run_id));
            saw_stage = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(saw_stage, "never observed the discovery stage");

    gate.notify_one();
    wait_idle(&pipeline).await;

    let status = pipeline.status();
    assert!(!status.is_running);
    assert_eq!(status.message.as_deref(), Some("COMPLETED"));
}
