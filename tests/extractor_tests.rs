mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;

use common::{extractor, fast_policy, MockParser};
use flashcard_study::{ContentExtractor, PollPolicy, StudyError};

fn pdf() -> String {
    STANDARD.encode(b"%PDF-1.4 sample document")
}

#[tokio::test]
async fn test_extracts_text_after_pending_polls() {
    let parser = MockParser::start(&["PENDING", "PENDING", "COMPLETED"], "Extracted text").await;

    let text = extractor(&parser.base_url).extract_text(&pdf()).await.unwrap();

    assert_eq!(text, "Extracted text");
    assert_eq!(parser.poll_count(), 3);
}

#[tokio::test]
async fn test_failed_and_cancelled_jobs() {
    for status in ["FAILED", "ERROR", "CANCELLED"] {
        let parser = MockParser::start(&["PENDING", status], "unused").await;

        let result = extractor(&parser.base_url).extract_text(&pdf()).await;

        assert!(
            matches!(result, Err(StudyError::ExtractionFailed(_))),
            "status {} should fail extraction, got {:?}",
            status,
            result
        );
    }
}

#[tokio::test]
async fn test_polling_is_bounded_by_timeout() {
    let parser = MockParser::start(&["PENDING"], "never delivered").await;
    let policy = PollPolicy {
        timeout: Duration::from_millis(150),
        ..fast_policy()
    };
    let extractor = ContentExtractor::new(Some("key".to_string()), parser.base_url.clone(), policy);

    let result = extractor.extract_text(&pdf()).await;

    assert!(matches!(result, Err(StudyError::ExtractionFailed(_))));
    assert!(parser.poll_count() >= 2);
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let parser = MockParser::start(&["PENDING"], "never delivered").await;
    let extractor = extractor(&parser.base_url);

    let result = extractor
        .extract_text_until(&pdf(), tokio::time::sleep(Duration::from_millis(50)))
        .await;
    assert!(matches!(result, Err(StudyError::ExtractionFailed(_))));

    let polls_at_cancel = parser.poll_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(parser.poll_count(), polls_at_cancel);
}

#[tokio::test]
async fn test_invalid_payload_never_reaches_service() {
    let parser = MockParser::start(&["COMPLETED"], "text").await;

    let result = extractor(&parser.base_url).extract_text("%%% not base64 %%%").await;

    assert!(matches!(result, Err(StudyError::ValidationError(_))));
    assert_eq!(parser.poll_count(), 0);
}

#[tokio::test]
async fn test_unreachable_service_is_upstream_error() {
    let extractor = ContentExtractor::new(Some("key".to_string()), "http://127.0.0.1:9", fast_policy());

    let result = extractor.extract_text(&pdf()).await;

    assert!(matches!(result, Err(StudyError::UpstreamError(_))));
}

#[tokio::test]
async fn test_stalled_upload_is_bounded_by_timeout() {
    let parser = MockParser::stalled_upload().await;
    let policy = PollPolicy {
        timeout: Duration::from_millis(200),
        ..fast_policy()
    };
    let extractor = ContentExtractor::new(Some("key".to_string()), parser.base_url.clone(), policy);

    let result = tokio::time::timeout(Duration::from_secs(3), extractor.extract_text(&pdf()))
        .await
        .expect("extraction should give up on its own");

    assert!(matches!(result, Err(StudyError::ExtractionFailed(_))));
}

#[tokio::test]
async fn test_stalled_upload_honours_cancellation() {
    let parser = MockParser::stalled_upload().await;
    let extractor = ContentExtractor::new(Some("key".to_string()), parser.base_url.clone(), fast_policy());

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        extractor.extract_text_until(&pdf(), tokio::time::sleep(Duration::from_millis(100))),
    )
    .await
    .expect("cancellation should end the upload wait");

    assert!(matches!(result, Err(StudyError::ExtractionFailed(_))));
}

#[tokio::test]
async fn test_stalled_text_download_is_bounded_by_timeout() {
    let parser = MockParser::stalled_result().await;
    let policy = PollPolicy {
        timeout: Duration::from_millis(300),
        ..fast_policy()
    };
    let extractor = ContentExtractor::new(Some("key".to_string()), parser.base_url.clone(), policy);

    let result = tokio::time::timeout(Duration::from_secs(3), extractor.extract_text(&pdf()))
        .await
        .expect("extraction should give up on its own");

    assert!(matches!(result, Err(StudyError::ExtractionFailed(_))));
    assert_eq!(parser.poll_count(), 1);
}
