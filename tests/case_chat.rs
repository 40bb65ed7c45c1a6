//! Case chat against a scripted model

mod common;

use std::time::Duration;

use serde_json::json;

use common::ScriptedLlm;
use design_code_chat::case_chat::{CaseChat, CaseChatError, CaseChatRequest};
use design_code_chat::dialogue::TranscriptMessage;

fn request(message: &str, case_data: serde_json::Value) -> CaseChatRequest {
    CaseChatRequest {
        message: message.to_string(),
        case_data,
        context: Vec::new(),
    }
}

#[tokio::test]
async fn test_answer_includes_case_data_and_history() {
    let llm = ScriptedLlm::new();
    llm.push_raw("The filing basis is 1(b), intent to use.");
    let chat = CaseChat::new(llm.clone());

    let mut req = request(
        "What is the filing basis?",
        json!("Full Case Data: {\"serialNumber\": \"97123456\", \"filingBasis\": \"1(b)\"}"),
    );
    req.context = vec![
        TranscriptMessage::user("Who owns this mark?"),
        TranscriptMessage::assistant("Acme Corp.\n\n__STATE__:{\"elements\":[]}"),
    ];

    let answer = chat.answer(&req).await.unwrap();
    assert_eq!(answer.response, "The filing basis is 1(b), intent to use.");

    let prompt = llm.last_prompt();
    assert!(prompt.contains("\"serialNumber\": \"97123456\""));
    assert!(prompt.contains("Conversation History:\nUser: Who owns this mark?\nAssistant: Acme Corp."));
    assert!(!prompt.contains("__STATE__"));
    assert!(prompt.ends_with("User: What is the filing basis?\n"));
}

#[tokio::test]
async fn test_missing_fields_skip_the_model() {
    let llm = ScriptedLlm::new();
    let chat = CaseChat::new(llm.clone());

    let err = chat
        .answer(&request("", json!({"serialNumber": "1"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseChatError::MissingFields));

    let err = chat
        .answer(&request("hello", serde_json::Value::Null))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseChatError::MissingFields));
    assert!(err.is_client_error());

    let err = chat
        .answer(&request("hello", json!("Full Case Data: [1, 2]")))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseChatError::InvalidCaseData(_)));

    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_service_failure_and_timeout() {
    let llm = ScriptedLlm::new();
    llm.push_failure("quota exceeded");
    let err = CaseChat::new(llm.clone())
        .answer(&request("hello", json!({"serialNumber": "1"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseChatError::Service(ref m) if m.contains("quota")));
    assert!(!err.is_client_error());

    let slow = ScriptedLlm::with_delay(Duration::from_secs(5));
    slow.push_raw("too late");
    let err = CaseChat::new(slow.clone())
        .with_timeout(Duration::from_millis(20))
        .answer(&request("hello", json!({"serialNumber": "1"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseChatError::Timeout { .. }));
}
