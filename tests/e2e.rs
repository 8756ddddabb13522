//! End-to-end tests for docbatch.
//!
//! A `wiremock` server stands in for the conversion service, so these run
//! offline and need no configuration:
//!
//!   cargo test --test e2e -- --nocapture

use docbatch::{
    BatchError, Candidate, ClientConfig, DirectorySink, FailureKind, FileSource, MemorySink,
    Status, TransferClient, Workflow, WorkflowState, DOCX_MIME,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const ARCHIVE: &[u8] = b"PK\x03\x04 fake zip body";

/// Route library logs through the test harness. `RUST_LOG=docbatch=debug`
/// shows the per-file admission decisions.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_for(endpoint: impl Into<String>) -> ClientConfig {
    ClientConfig::builder()
        .endpoint(endpoint)
        .build()
        .expect("valid config")
}

fn memory_workflow(endpoint: impl Into<String>) -> (Workflow, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let client = TransferClient::new(config_for(endpoint)).expect("client");
    (Workflow::new(client, sink.clone()), sink)
}

fn docs(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate::new(format!("doc{i:02}.docx"), format!("body of document {i}").into_bytes()))
        .collect()
}

fn names(wf: &Workflow) -> Vec<String> {
    wf.batch().iter().map(|c| c.name().to_string()).collect()
}

fn ok_archive(filename: Option<&str>) -> ResponseTemplate {
    let t = ResponseTemplate::new(200).set_body_bytes(ARCHIVE.to_vec());
    match filename {
        Some(name) => t.insert_header(
            "Content-Disposition",
            format!("attachment; filename=\"{name}\""),
        ),
        None => t,
    }
}

/// An address nothing is listening on.
fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/convert")
}

fn leftover_part_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count()
}

// ── Scenario A: happy path ───────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_saves_named_archive_and_clears_batch() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(header_exists("content-type"))
        .respond_with(ok_archive(Some("out.zip")))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let client = TransferClient::new(config_for(format!("{}/convert", server.uri()))).unwrap();
    let mut wf = Workflow::new(client, Arc::new(DirectorySink::new(out.path())));

    let report = wf.offer(docs(10)).unwrap();
    assert_eq!(report.added, 10);

    let saved = wf.submit().await.expect("submission should succeed");

    assert_eq!(saved.filename, "out.zip");
    assert_eq!(saved.path, out.path().join("out.zip"));
    assert_eq!(saved.files, 10);
    assert_eq!(std::fs::read(&saved.path).unwrap(), ARCHIVE);
    assert_eq!(leftover_part_files(out.path()), 0);

    assert!(wf.batch().is_empty());
    assert_eq!(wf.state(), WorkflowState::Success);
    assert!(matches!(wf.status(), Status::Success(m) if m.contains("out.zip")));

    server.verify().await;
}

#[tokio::test]
async fn test_multipart_body_carries_every_file_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("out.zip")))
        .mount(&server)
        .await;

    let (mut wf, _sink) = memory_workflow(server.uri());
    wf.offer(vec![
        Candidate::new("zeta.docx", b"zz".to_vec()),
        Candidate::new("alpha.docx", b"a".to_vec()),
        Candidate::new("upper", b"m".to_vec()).with_media_type(DOCX_MIME),
    ])
    .unwrap();
    wf.submit().await.unwrap();

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);

    let positions: Vec<usize> = ["zeta.docx", "alpha.docx", "\"upper\""]
        .iter()
        .map(|n| body.find(n).unwrap_or_else(|| panic!("{n} missing from body")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "order: {positions:?}");
    assert_eq!(body.matches("name=\"files\"").count(), 3);
    assert!(body.contains(DOCX_MIME));
}

#[tokio::test]
async fn test_missing_content_disposition_uses_default_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(None))
        .mount(&server)
        .await;

    let (mut wf, sink) = memory_workflow(server.uri());
    wf.offer(docs(1)).unwrap();
    let saved = wf.submit().await.unwrap();

    assert_eq!(saved.filename, "converted_documents.zip");
    assert_eq!(sink.saved()[0].0, "converted_documents.zip");
}

#[tokio::test]
async fn test_path_like_filename_is_reduced_to_base_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("../../escape.zip")))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let client = TransferClient::new(config_for(server.uri())).unwrap();
    let mut wf = Workflow::new(client, Arc::new(DirectorySink::new(out.path())));
    wf.offer(docs(1)).unwrap();
    let saved = wf.submit().await.unwrap();

    assert_eq!(saved.path, out.path().join("escape.zip"));
}

// ── Scenario B: service unreachable ──────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_service_keeps_batch() {
    init_tracing();
    let (mut wf, sink) = memory_workflow(dead_endpoint());
    wf.offer(docs(4)).unwrap();
    let before = names(&wf);

    let err = wf.submit().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::NetworkUnreachable);
    assert_eq!(names(&wf), before);
    assert_eq!(wf.state(), WorkflowState::Error);
    assert!(matches!(wf.status(), Status::Error(m) if m.contains("Could not reach")));
    assert!(sink.saved().is_empty());
}

#[tokio::test]
async fn test_save_failure_keeps_batch_and_leaves_no_temp_files() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("out.zip")))
        .expect(1)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("downloads");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();

    let client = TransferClient::new(config_for(server.uri())).unwrap();
    let mut wf = Workflow::new(client, Arc::new(DirectorySink::new(&blocker)));
    wf.offer(docs(3)).unwrap();
    let before = names(&wf);

    let err = wf.submit().await.unwrap_err();

    assert!(matches!(err, BatchError::SaveFailed { .. }));
    assert_eq!(err.kind(), FailureKind::UnexpectedError);
    assert_eq!(wf.state(), WorkflowState::Error);
    assert!(matches!(wf.status(), Status::Error(m) if m.contains("Something went wrong")));
    assert_eq!(names(&wf), before);
    assert!(wf.can_submit());
    assert_eq!(leftover_part_files(root.path()), 0);
    assert_eq!(std::fs::read(&blocker).unwrap(), b"a file, not a directory");

    server.verify().await;
}

#[tokio::test]
async fn test_timeout_is_classified_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("late.zip")).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .endpoint(server.uri())
        .request_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut wf = Workflow::new(TransferClient::new(config).unwrap(), sink);
    wf.offer(docs(1)).unwrap();

    let err = wf.submit().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkUnreachable);
    assert_eq!(wf.batch().len(), 1);
}

// ── Scenario C: server error ─────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_hides_diagnostic_from_user() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("conversion failed: corrupt zip"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut wf, sink) = memory_workflow(server.uri());
    wf.offer(docs(3)).unwrap();

    let err = wf.submit().await.unwrap_err();

    match &err {
        BatchError::ServerError { status, diagnostic } => {
            assert_eq!(*status, 500);
            assert_eq!(diagnostic, "conversion failed: corrupt zip");
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
    let shown = wf.status().message().unwrap();
    assert!(!shown.contains("corrupt"), "diagnostic leaked: {shown}");
    assert_eq!(shown, err.user_message());
    assert_eq!(wf.batch().len(), 3);
    assert!(sink.saved().is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_retry_after_failure_succeeds_without_reselecting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("second.zip")))
        .mount(&server)
        .await;

    let (mut wf, sink) = memory_workflow(server.uri());
    wf.offer(docs(2)).unwrap();

    assert!(wf.submit().await.is_err());
    assert_eq!(wf.batch().len(), 2);

    let saved = wf.submit().await.unwrap();
    assert_eq!(saved.filename, "second.zip");
    assert!(wf.batch().is_empty());
    assert_eq!(sink.saved().len(), 1);
}

// ── Scenario D: capacity ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_thirty_one_files_admits_thirty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("out.zip")))
        .expect(0)
        .mount(&server)
        .await;

    let (mut wf, _sink) = memory_workflow(server.uri());
    let report = wf.offer(docs(31)).unwrap();

    assert_eq!(report.added, 30);
    assert_eq!(report.rejected_capacity, 1);
    assert_eq!(wf.batch().len(), 30);
    assert!(matches!(wf.status(), Status::Error(m) if m.contains("30 of 31")));

    server.verify().await;
}

// ── Local-only transitions ───────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_submit_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(None))
        .expect(0)
        .mount(&server)
        .await;

    let (mut wf, _sink) = memory_workflow(server.uri());
    let err = wf.submit().await.unwrap_err();

    assert!(matches!(err, BatchError::EmptySubmission));
    assert_eq!(wf.state(), WorkflowState::Error);
    server.verify().await;
}

#[tokio::test]
async fn test_split_submit_blocks_intake_while_loading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_archive(Some("out.zip")))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let client = TransferClient::new(config_for(server.uri())).unwrap();
    let mut wf = Workflow::new(client.clone(), sink.clone());
    wf.offer(docs(2)).unwrap();

    let snapshot = wf.begin_submit().unwrap();
    assert!(matches!(wf.offer(docs(1)), Err(BatchError::Busy)));

    let handle = tokio::spawn(async move { client.submit(&snapshot, sink.as_ref()).await });
    let result = handle.await.expect("task");
    wf.finish_submit(result).unwrap();

    assert_eq!(wf.state(), WorkflowState::Success);
    assert!(wf.batch().is_empty());
}

// ── Input adapters ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dropped_folder_and_picked_files_share_admission() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        std::fs::write(dir.path().join(format!("f{i}.docx")), format!("{i}")).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

    let (mut wf, _sink) = memory_workflow("http://127.0.0.1:9/convert");

    let dropped = FileSource::Drop(dir.path().to_path_buf()).load().await;
    let report = wf.offer(dropped).unwrap();
    assert_eq!(report.added, 3);
    assert_eq!(report.rejected_type, 1);

    // Picking the same file again is a silent duplicate.
    let picked = FileSource::Picker(vec![dir.path().join("f1.docx")]).load().await;
    let report = wf.offer(picked).unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.rejected_duplicate, 1);
    assert!(!report.hit_capacity());
    assert_eq!(names(&wf), ["f0.docx", "f1.docx", "f2.docx"]);
}
