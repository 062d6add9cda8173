//! Pipeline integration tests with scripted collaborators.

mod common;

use common::{sample_pdf, CannedLlm, ScriptedOcr};
use payslip_ocr::{
    Entity, ExtractionConfig, ExtractionProgressCallback, PayslipError, PayslipExtractor,
    PayslipNumber,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn extractor(ocr: ScriptedOcr) -> (PayslipExtractor, Arc<ScriptedOcr>) {
    let ocr = Arc::new(ocr);
    let extractor = PayslipExtractor::new(ExtractionConfig::default(), ocr.clone());
    (extractor, ocr)
}

#[tokio::test]
async fn two_page_document_produces_expected_json() {
    let (extractor, _) = extractor(ScriptedOcr::new().page(
        1,
        vec![
            Entity::new("employer_name", "Acme", 0.91),
            Entity::new("net_pay", "100.00", 0.80),
        ],
    ));

    let records = extractor.extract_pages(&sample_pdf(2)).await.unwrap();

    assert_eq!(
        serde_json::to_value(&records).unwrap(),
        json!([
            {
                "payslip_number": 1,
                "page_range": "1-1",
                "extracted_data": {
                    "employer_name": {"value": "Acme", "confidence": "91.0%"},
                    "net_pay": {"value": "100.00", "confidence": "80.0%"}
                }
            },
            {
                "payslip_number": 2,
                "page_range": "2-2",
                "extracted_data": {}
            }
        ])
    );
}

#[tokio::test]
async fn one_record_per_page_in_order() {
    let (extractor, ocr) = extractor(ScriptedOcr::new());
    let records = extractor.extract_pages(&sample_pdf(5)).await.unwrap();

    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        let n = i + 1;
        assert_eq!(record.payslip_number, PayslipNumber::Index(n as u64));
        assert_eq!(record.page_range, format!("{n}-{n}"));
    }

    // Each OCR call saw exactly one page, in document order.
    assert_eq!(ocr.call_count(), 5);
    let seen = ocr.seen_pages.lock().unwrap().clone();
    assert_eq!(seen, vec![vec![1], vec![2], vec![3], vec![4], vec![5]]);
}

#[tokio::test]
async fn failing_page_is_isolated() {
    let (extractor, _) = extractor(
        ScriptedOcr::new()
            .page(1, vec![Entity::new("employee_name", "Jane Doe", 0.7)])
            .failing_page(2)
            .page(3, vec![Entity::new("net_pay", "2,712.45", 0.95)]),
    );

    let records = extractor.extract_pages(&sample_pdf(3)).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].extracted_data["employee_name"].value, "Jane Doe");
    assert!(records[1].extracted_data.is_empty());
    assert_eq!(records[2].extracted_data["net_pay"].confidence, "95.0%");
}

#[tokio::test]
async fn retry_policy_reissues_failed_calls() {
    let ocr = Arc::new(ScriptedOcr::new().failing_page(1));
    let config = ExtractionConfig::builder()
        .max_retries(2)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let extractor = PayslipExtractor::new(config, ocr.clone());

    let records = extractor.extract_pages(&sample_pdf(1)).await.unwrap();

    assert!(records[0].extracted_data.is_empty());
    assert_eq!(ocr.call_count(), 3);
}

#[tokio::test]
async fn highest_confidence_entity_wins_per_page() {
    let (extractor, _) = extractor(ScriptedOcr::new().page(
        1,
        vec![
            Entity::new("pay_date", "31/01/2024", 0.6),
            Entity::new("pay_date", "01/31/2024", 0.9),
            Entity::new("pay_date", "2024-01-31", 0.9),
            Entity::new("tax_code", "1257L", 0.99),
        ],
    ));

    let records = extractor.extract_pages(&sample_pdf(1)).await.unwrap();
    let data = &records[0].extracted_data;

    assert_eq!(data["pay_date"].value, "01/31/2024");
    assert_eq!(data["pay_date"].confidence, "90.0%");
    assert!(!data.contains_key("tax_code"));
}

#[tokio::test]
async fn empty_upload_is_no_file() {
    let (extractor, ocr) = extractor(ScriptedOcr::new());
    let err = extractor.extract_pages(&[]).await.unwrap_err();
    assert!(matches!(err, PayslipError::NoFileProvided));
    assert_eq!(ocr.call_count(), 0);
}

#[tokio::test]
async fn non_pdf_upload_is_malformed() {
    let (extractor, ocr) = extractor(ScriptedOcr::new());
    let err = extractor.extract_pages(b"GIF89a not a pdf").await.unwrap_err();
    assert!(matches!(err, PayslipError::MalformedDocument { .. }), "got: {err:?}");
    assert_eq!(ocr.call_count(), 0);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for Recorder {
    fn on_extraction_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.events.lock().unwrap().push(format!("page {page_num}"));
    }
    fn on_page_complete(&self, page_num: usize, _total_pages: usize, fields_found: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {page_num}: {fields_found}"));
    }
    fn on_extraction_complete(&self, total_pages: usize, pages_with_fields: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {pages_with_fields}/{total_pages}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_page_order() {
    let recorder = Arc::new(Recorder::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let ocr = ScriptedOcr::new().page(2, vec![Entity::new("gross_earnings", "3500", 0.8)]);
    let extractor = PayslipExtractor::new(config, Arc::new(ocr));

    extractor.extract_pages(&sample_pdf(2)).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 2",
            "page 1",
            "done 1: 0",
            "page 2",
            "done 2: 1",
            "complete 1/2",
        ]
    );
}

// ── Structured path ──────────────────────────────────────────────────────

const LLM_REPLY: &str = r#"{"payslips": [
  {"payslip_number": 1, "page_range": "1-2", "extracted_data": {
    "employer_name": "Acme", "employee_name": "Jane Doe", "net_pay": 2712.45}}
]}"#;

#[tokio::test]
async fn structured_path_sends_whole_document_once() {
    let ocr = Arc::new(ScriptedOcr::new());
    let llm = Arc::new(CannedLlm::new(LLM_REPLY));
    let extractor = PayslipExtractor::new(ExtractionConfig::default(), ocr.clone())
        .with_structurer(llm.clone());

    let result = extractor.extract_structured(&sample_pdf(2)).await.unwrap();

    assert!(result.is_ok());
    assert_eq!(result.payslips.len(), 1);
    assert_eq!(result.payslips[0].page_range, "1-2");
    assert_eq!(result.payslips[0].extracted_data["pay_date"], serde_json::Value::Null);

    assert_eq!(ocr.call_count(), 1);
    assert_eq!(*ocr.seen_pages.lock().unwrap(), vec![vec![1, 2]]);
    let prompt = llm.seen_user.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Payslip page 1"));
    assert!(prompt.contains("Payslip page 2"));
}

#[tokio::test]
async fn structured_path_reports_unparseable_reply() {
    let extractor = PayslipExtractor::new(ExtractionConfig::default(), Arc::new(ScriptedOcr::new()))
        .with_structurer(Arc::new(CannedLlm::new("I'm unable to read this document.")));

    let result = extractor.extract_structured(&sample_pdf(1)).await.unwrap();

    assert!(result.payslips.is_empty());
    assert!(!result.error.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn structured_path_reports_ocr_failure() {
    let extractor =
        PayslipExtractor::new(ExtractionConfig::default(), Arc::new(ScriptedOcr::new().failing_page(1)))
            .with_structurer(Arc::new(CannedLlm::new(LLM_REPLY)));

    let result = extractor.extract_structured(&sample_pdf(2)).await.unwrap();

    assert!(result.payslips.is_empty());
    assert!(result.error.unwrap().starts_with("OCR failed"));
}

#[test]
fn structured_path_requires_a_structurer() {
    let extractor = PayslipExtractor::new(ExtractionConfig::default(), Arc::new(ScriptedOcr::new()));
    let err = tokio_test::block_on(extractor.extract_structured(&sample_pdf(1))).unwrap_err();
    assert!(matches!(err, PayslipError::ProviderNotConfigured { .. }));
}
