#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use digest_domain::{
    Credentials, DecodedMessage, HtmlRenderer, MailTransport, OcrEngine, Priority, RasterImage,
    RawMessage, SummaryModel, NO_CONTENT, NO_SUBJECT,
};
use digest_error::DigestError;
use digest_pipeline::{BatchOrchestrator, DigestRequest, DigestService, MessagePipeline};

struct StaticTransport {
    result: Result<Vec<RawMessage>, String>,
    calls: AtomicUsize,
}

impl StaticTransport {
    fn with(messages: Vec<RawMessage>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(messages),
            calls: AtomicUsize::new(0),
        })
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            result: Err("[AUTHENTICATIONFAILED] Invalid credentials".to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MailTransport for StaticTransport {
    async fn fetch(
        &self,
        _credentials: &Credentials,
        max_count: usize,
        _unread_only: bool,
    ) -> Result<Vec<RawMessage>, DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(msgs) => Ok(msgs.iter().take(max_count).cloned().collect()),
            Err(e) => Err(DigestError::auth(e.clone())),
        }
    }
}

struct NullRenderer;

#[async_trait]
impl HtmlRenderer for NullRenderer {
    async fn render(&self, _html: &str) -> Result<RasterImage, DigestError> {
        Err(DigestError::render("renderer disabled in tests"))
    }
}

struct ScriptedOcr {
    text: String,
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, image: &RasterImage) -> Result<String, DigestError> {
        if image.is_empty() {
            return Err(DigestError::ocr("empty image"));
        }
        Ok(self.text.clone())
    }
}

/// Keeps the first five words, sleeping longer for inputs that mention
/// an earlier position so later tasks finish first.
struct SlowFirstWordsModel {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowFirstWordsModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SummaryModel for SlowFirstWordsModel {
    async fn summarize(
        &self,
        text: &str,
        _max_len: usize,
        _min_len: usize,
    ) -> Result<String, DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let position: u64 = text
            .split_whitespace()
            .find_map(|w| w.strip_prefix('#').and_then(|n| n.parse().ok()))
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(5 + (20 - position.min(20)) * 5)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(text.split_whitespace().take(5).collect::<Vec<_>>().join(" "))
    }
}

fn plain_message(id: u32, subject: &str, from: &str, body: &str) -> RawMessage {
    let raw = format!(
        "Subject: {subject}\r\nFrom: {from}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
    );
    RawMessage::new(id, raw.into_bytes())
}

fn decoded(idx: usize) -> DecodedMessage {
    DecodedMessage {
        subject: format!("subject {idx}"),
        sender: format!("sender{idx}@example.com"),
        plain_body: format!(
            "Message #{idx} carries enough ordinary words to be worth summarizing for the digest"
        ),
        html_body: String::new(),
    }
}

fn service(
    transport: Arc<dyn MailTransport>,
    model: Arc<dyn SummaryModel>,
    workers: usize,
) -> DigestService {
    DigestService::new(
        transport,
        Arc::new(NullRenderer),
        Arc::new(ScriptedOcr {
            text: "Receipt total due today is forty two dollars payment due now".into(),
        }),
        model,
        workers,
    )
}

fn request(max_count: usize) -> DigestRequest {
    DigestRequest {
        credentials: Credentials::new("me@example.com", "app-password"),
        max_count,
        unread_only: false,
        sender_filter: None,
    }
}

#[tokio::test]
async fn batch_output_order_matches_input_under_variable_delay() {
    let model = SlowFirstWordsModel::new();
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(NullRenderer),
        Arc::new(ScriptedOcr { text: String::new() }),
        model.clone(),
    ));
    let orchestrator = BatchOrchestrator::new(pipeline, 3);

    let inputs: Vec<DecodedMessage> = (0..12).map(decoded).collect();
    let out = orchestrator.process(inputs.clone()).await;

    assert_eq!(out.len(), inputs.len());
    for (i, (summary, input)) in out.iter().zip(&inputs).enumerate() {
        assert_eq!(summary.subject, input.subject);
        assert_eq!(summary.sender, input.sender);
        assert_eq!(summary.summary, format!("Message #{i} carries enough ordinary"));
    }
    assert_eq!(model.calls.load(Ordering::SeqCst), 12);
    assert!(model.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn empty_batch_yields_empty_output() {
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(NullRenderer),
        Arc::new(ScriptedOcr { text: String::new() }),
        SlowFirstWordsModel::new(),
    ));
    let orchestrator = BatchOrchestrator::new(pipeline, 0);
    assert_eq!(orchestrator.workers(), 1);
    assert!(orchestrator.process(Vec::new()).await.is_empty());
}

#[tokio::test]
async fn empty_mailbox_gives_empty_digest() {
    let transport = StaticTransport::with(Vec::new());
    let model = SlowFirstWordsModel::new();
    let svc = service(transport.clone(), model.clone(), 4);

    let out = svc.fetch_and_summarize(&request(10)).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn login_failure_aborts_before_any_work() {
    let model = SlowFirstWordsModel::new();
    let svc = service(StaticTransport::rejecting(), model.clone(), 4);

    let err = svc.fetch_and_summarize(&request(10)).await.unwrap_err();
    assert!(matches!(err, DigestError::Auth(_)));
    assert!(err.is_terminal());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn end_to_end_digest_keeps_fetch_order_and_filters_sender() {
    let transport = StaticTransport::with(vec![
        plain_message(
            9,
            "Invoice 2231",
            "Billing <billing@shop.example>",
            "URGENT action required: your invoice is overdue and must be paid before Friday or the account closes",
        ),
        plain_message(7, "", "friend@mail.example", "ok"),
        plain_message(
            4,
            "Team sync",
            "Calendar <cal@work.example>",
            "Friendly meeting reminder: the team sync starts at ten tomorrow in the usual room upstairs",
        ),
    ]);
    let svc = service(transport, SlowFirstWordsModel::new(), 2);

    let out = svc.fetch_and_summarize(&request(10)).await.unwrap();
    assert_eq!(out.len(), 3);

    assert_eq!(out[0].subject, "Invoice 2231");
    assert_eq!(out[0].priority, Priority::High);
    assert_eq!(out[0].summary, "URGENT action required: your invoice");

    assert_eq!(out[1].subject, NO_SUBJECT);
    assert_eq!(out[1].summary, NO_CONTENT);
    assert_eq!(out[1].priority, Priority::Low);

    assert_eq!(out[2].sender, "Calendar <cal@work.example>");
    assert_eq!(out[2].priority, Priority::Medium);

    let mut req = request(10);
    req.sender_filter = Some("WORK.example".into());
    let svc = service(
        StaticTransport::with(vec![
            plain_message(2, "a", "x@home.example", "nothing to see"),
            plain_message(1, "b", "y@work.example", "short"),
        ]),
        SlowFirstWordsModel::new(),
        2,
    );
    let filtered = svc.fetch_and_summarize(&req).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].sender, "y@work.example");
}

#[tokio::test]
async fn max_count_bounds_the_batch() {
    let msgs = (0..5)
        .map(|i| plain_message(i, &format!("s{i}"), "a@b.example", "hello there"))
        .collect();
    let svc = service(StaticTransport::with(msgs), SlowFirstWordsModel::new(), 2);
    let out = svc.fetch_and_summarize(&request(2)).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].subject, "s0");
    assert_eq!(out[1].subject, "s1");
}

#[tokio::test]
async fn image_entry_point_summarizes_ocr_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receipt.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G', 1, 2, 3]).unwrap();

    let svc = service(StaticTransport::with(Vec::new()), SlowFirstWordsModel::new(), 1);
    let summary = svc.summarize_image(&path).await.unwrap();

    assert_eq!(summary.subject, "Image Summary");
    assert_eq!(summary.sender, "Image Upload");
    assert_eq!(summary.summary, "Receipt total due today is");
    assert_eq!(summary.priority, Priority::Low);
}

#[tokio::test]
async fn image_entry_point_reports_missing_file() {
    let svc = service(StaticTransport::with(Vec::new()), SlowFirstWordsModel::new(), 1);
    let err = svc
        .summarize_image(std::path::Path::new("/definitely/not/here.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::Io(_)));
}
