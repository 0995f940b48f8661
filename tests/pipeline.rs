//! End-to-end pipeline tests against the fake backends.

use std::sync::Arc;

use docpipe::backends::{Block, FakeNlpBackend, FakeOcrBackend};
use docpipe::models::{JobStatus, ProcessedData, ProcessingStatus};
use docpipe::notify::{ChannelNotifier, StatusEvent, StatusNotifier};
use docpipe::processing::{
    CompletionEvaluator, NlpJobExecutor, OcrJobExecutor, Pipeline, ProcessorRegistry,
};
use docpipe::repository::{MemoryRepository, PipelineRepository};
use docpipe::storage::{MemoryStore, ObjectStore};
use docpipe::Config;

struct Harness {
    pipeline: Pipeline,
    repo: Arc<MemoryRepository>,
    events: tokio::sync::mpsc::UnboundedReceiver<StatusEvent>,
}

fn harness(config: Config, ocr: FakeOcrBackend, nlp: FakeNlpBackend) -> Harness {
    let repo = Arc::new(MemoryRepository::new());
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new(config.storage.bucket.clone()));
    let (notifier, events) = ChannelNotifier::new();
    let notifier: Arc<dyn StatusNotifier> = Arc::new(notifier);
    let completion = Arc::new(CompletionEvaluator::new(repo.clone(), notifier.clone()));

    let ocr = Arc::new(OcrJobExecutor::new(
        repo.clone(),
        Arc::new(ocr),
        completion.clone(),
        config.processing.clone(),
    ));
    let nlp = Arc::new(NlpJobExecutor::new(
        repo.clone(),
        Arc::new(nlp),
        store.clone(),
        completion,
        config.processing.clone(),
    ));
    let registry = ProcessorRegistry::with_defaults(&config.processing);
    let pipeline = Pipeline::new(
        repo.clone(),
        store,
        registry,
        ocr,
        nlp,
        notifier,
        config,
    );
    Harness {
        pipeline,
        repo,
        events,
    }
}

fn drain(events: &mut tokio::sync::mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn small_pdf_runs_analysis_and_text_jobs() {
    let ocr = FakeOcrBackend::new().with_blocks(vec![
        Block::line("Quarterly revenue increased by 12%.", 99.5),
        Block::line("Customer satisfaction remains high.", 98.7),
    ]);
    let mut h = harness(Config::default(), ocr, FakeNlpBackend::new());

    let content = vec![0u8; 2 * 1024 * 1024];
    let doc = h
        .pipeline
        .ingest("user-1", "Q3 Report", "q3.pdf", "application/pdf", &content)
        .await
        .unwrap();
    assert_eq!(doc.processing_status, ProcessingStatus::Pending);

    let done = h.pipeline.run_to_completion(&doc.id).await.unwrap();
    assert_eq!(done.processing_status, ProcessingStatus::Completed);

    let jobs = h.repo.jobs_for_document(&doc.id).await.unwrap();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));

    let results = h.repo.results_for_document(&doc.id).await.unwrap();
    assert_eq!(results.len(), 3);

    // OCR analysis adds a table and a form key to the two line blocks, so the
    // average covers four confidences: (99.5 + 98.7 + 95.0 + 93.0) / 4.
    let ocr_result = results.iter().find(|r| r.is_ocr_result()).unwrap();
    assert!((ocr_result.confidence.unwrap() - 0.9655).abs() < 1e-9);
    let ProcessedData::Ocr {
        text_blocks,
        tables,
        forms,
    } = &ocr_result.processed
    else {
        panic!("expected OCR payload");
    };
    assert_eq!(text_blocks.len(), 2);
    assert_eq!(tables.len(), 1);
    assert_eq!(forms.len(), 1);

    // NLP jobs consume the OCR text, not the stored PDF bytes.
    let nlp_lengths: Vec<_> = results
        .iter()
        .filter(|r| r.is_nlp_result())
        .map(|r| r.metadata.text_length.unwrap())
        .collect();
    let expected = "Quarterly revenue increased by 12%. Customer satisfaction remains high.".len();
    assert_eq!(nlp_lengths, vec![expected, expected]);

    // Processing first, Completed last, progress reaching 100.
    let events = drain(&mut h.events);
    assert_eq!(events.first().unwrap().status, ProcessingStatus::Processing);
    let last = events.last().unwrap();
    assert_eq!(last.status, ProcessingStatus::Completed);
    assert_eq!(last.progress, 100);
}

#[tokio::test]
async fn image_gets_single_text_detection_job() {
    let ocr = FakeOcrBackend::new().with_blocks(vec![
        Block::line("STOP", 99.5),
        Block::line("AHEAD", 98.7),
    ]);
    let mut h = harness(Config::default(), ocr, FakeNlpBackend::new());

    let doc = h
        .pipeline
        .ingest("user-1", "Sign", "sign.png", "image/png", b"\x89PNG fake")
        .await
        .unwrap();
    let done = h.pipeline.run_to_completion(&doc.id).await.unwrap();
    assert_eq!(done.processing_status, ProcessingStatus::Completed);

    let jobs = h.repo.jobs_for_document(&doc.id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind.analysis_type(), "ocr_text");

    let results = h.repo.results_for_document(&doc.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].confidence.unwrap() - 0.991).abs() < 1e-9);

    let events = drain(&mut h.events);
    assert_eq!(events.last().unwrap().progress, 100);
}

#[tokio::test]
async fn large_pdf_uses_async_analysis_with_pagination() {
    let mut config = Config::default();
    config.processing.async_threshold_bytes = 1024;
    config.processing.poll_interval_ms = 1;

    let ocr = FakeOcrBackend::new()
        .with_blocks(vec![
            Block::line("Page one heading", 99.0),
            Block::line("Page two heading", 98.0),
            Block::line("Page three heading", 97.0),
        ])
        .with_polls_until_ready(2)
        .with_page_size(1);
    let mut h = harness(config, ocr, FakeNlpBackend::new());

    let content = vec![0u8; 2048];
    let doc = h
        .pipeline
        .ingest("user-1", "Contract", "contract.pdf", "application/pdf", &content)
        .await
        .unwrap();
    let done = h.pipeline.run_to_completion(&doc.id).await.unwrap();
    assert_eq!(done.processing_status, ProcessingStatus::Completed);

    let jobs = h.repo.jobs_for_document(&doc.id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind.analysis_type(), "ocr_analysis");
    assert!(jobs[0].backend_job_id.is_some());

    // All three paginated blocks were aggregated.
    let results = h.repo.results_for_document(&doc.id).await.unwrap();
    let ProcessedData::Ocr { text_blocks, .. } = &results[0].processed else {
        panic!("expected OCR payload");
    };
    assert_eq!(text_blocks.len(), 3);
    assert!((results[0].confidence.unwrap() - 0.98).abs() < 1e-9);
}

#[tokio::test]
async fn failed_jobs_do_not_block_completion() {
    let h_config = Config::default();
    let ocr = FakeOcrBackend::new().with_failure("backend unavailable");
    let mut h = harness(h_config, ocr, FakeNlpBackend::new());

    let doc = h
        .pipeline
        .ingest("user-1", "Report", "report.pdf", "application/pdf", b"%PDF-1.7")
        .await
        .unwrap();
    let done = h.pipeline.run_to_completion(&doc.id).await.unwrap();

    // Every job failed (OCR at the backend, NLP with no text to analyze),
    // yet the document still reaches Completed once all jobs are terminal.
    assert_eq!(done.processing_status, ProcessingStatus::Completed);

    let jobs = h.repo.jobs_for_document(&doc.id).await.unwrap();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|j| j.status == JobStatus::Failed));
    assert!(jobs
        .iter()
        .filter(|j| j.kind.is_nlp())
        .all(|j| j.error_message.as_deref() == Some("No text available for analysis")));

    assert!(h
        .repo
        .results_for_document(&doc.id)
        .await
        .unwrap()
        .is_empty());

    let events = drain(&mut h.events);
    let last = events.last().unwrap();
    assert_eq!(last.status, ProcessingStatus::Completed);
    assert_eq!(last.progress, 100);
}

#[tokio::test]
async fn plain_text_document_skips_ocr_entirely() {
    let mut h = harness(
        Config::default(),
        FakeOcrBackend::new(),
        FakeNlpBackend::new(),
    );

    let doc = h
        .pipeline
        .ingest(
            "user-1",
            "Meeting notes",
            "notes.txt",
            "text/plain",
            b"Decisions from the planning meeting on budget and hiring.",
        )
        .await
        .unwrap();
    let done = h.pipeline.run_to_completion(&doc.id).await.unwrap();
    assert_eq!(done.processing_status, ProcessingStatus::Completed);

    let jobs = h.repo.jobs_for_document(&doc.id).await.unwrap();
    assert_eq!(jobs.len(), 4);
    assert!(jobs.iter().all(|j| j.kind.is_nlp()));

    let results = h.repo.results_for_document(&doc.id).await.unwrap();
    assert_eq!(results.len(), 4);
    let types: Vec<_> = results.iter().map(|r| r.analysis_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["nlp_sentiment", "nlp_entities", "nlp_key_phrases", "nlp_language"]
    );
}

#[tokio::test]
async fn unsupported_upload_is_rejected_before_any_job_exists() {
    let mut h = harness(
        Config::default(),
        FakeOcrBackend::new(),
        FakeNlpBackend::new(),
    );

    let doc = h
        .pipeline
        .ingest(
            "user-1",
            "Archive",
            "data.tar.gz",
            "application/octet-stream",
            b"\x1f\x8b",
        )
        .await
        .unwrap();

    h.pipeline.submit(&doc.id).await.unwrap_err();

    let doc = h.repo.get_document(&doc.id).await.unwrap();
    assert_eq!(doc.processing_status, ProcessingStatus::Failed);
    assert!(h.repo.jobs_for_document(&doc.id).await.unwrap().is_empty());

    let events = drain(&mut h.events);
    let last = events.last().unwrap();
    assert_eq!(last.status, ProcessingStatus::Failed);
    assert!(last.message.is_some());
}
