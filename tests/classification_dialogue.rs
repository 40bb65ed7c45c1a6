//! End-to-end classification dialogues against a scripted model

mod common;

use std::time::Duration;

use serde_json::json;

use common::{ask, extend, request_divisions, ScriptedLlm};
use design_code_chat::dialogue::{
    compute_disclosure, ClassifyRequest, DialoguePhase, ResponseStatus, TaxonomySlice,
    TranscriptMessage, TurnGate,
};
use design_code_chat::{CodeLimitPolicy, DialogueEngine, EngineConfig};

const DIVISIONS_01: &str = "AVAILABLE DIVISIONS FOR CATEGORY 01";
const SECTIONS_0101: &str = "AVAILABLE SECTIONS FOR DIVISION 01.01";

fn engine(llm: &std::sync::Arc<ScriptedLlm>) -> DialogueEngine {
    DialogueEngine::new(llm.clone())
}

fn request(description: &str, context: &[TranscriptMessage]) -> ClassifyRequest {
    ClassifyRequest::new(description, context.to_vec())
}

/// Three turns ending in 01.01.03
async fn classify_star(llm: &std::sync::Arc<ScriptedLlm>) -> Vec<TranscriptMessage> {
    let engine = engine(llm);

    // Turn 1: categories only, model asks for divisions of 01
    llm.push(request_divisions(
        "This looks like a celestial body. Let me retrieve the divisions for 01.XX.XX.",
        &["01"],
    ));
    let first = engine.handle(&request("a five-pointed star", &[])).await;
    assert_eq!(first.status, ResponseStatus::NeedMoreInfo);
    let prompt = llm.last_prompt();
    assert!(prompt.starts_with("AVAILABLE CATEGORIES:"));
    assert!(!prompt.contains(DIVISIONS_01));

    let message = &first.questions.as_ref().unwrap()[0];
    assert!(message.starts_with("This looks like a celestial body."));
    assert!(message.contains(DIVISIONS_01));
    assert!(message.contains("01.01: Stars, comets"));
    assert_eq!(first.disclosed, vec![TaxonomySlice::divisions("01")]);
    let state = first.state.as_ref().unwrap();
    assert_eq!(state.phase(), DialoguePhase::AwaitingDivisionData);
    let context = extend(&[], "a five-pointed star", &first);

    // Turn 2: divisions are in the conversation, model picks 01.01 and asks for sections
    llm.push(json!({
        "status": "researching",
        "currentStep": "division",
        "reasoning": "A star belongs in 01.01",
        "responseToUser": "01.01 (Stars, comets) fits. Let me retrieve its sections.",
        "confirmedFacts": { "shapes": ["five-pointed star"], "arrangement": [], "colors": [], "otherDetails": [] },
        "classification": {
            "categoryCode": "01",
            "categoryReasoning": "Celestial body",
            "divisionCodes": ["01"],
            "divisionReasoning": "Stars"
        },
        "nextStep": { "requestSectionsFor": { "category": "01", "division": "01" } }
    }));
    let second = engine.handle(&request("It is a single star", &context)).await;
    assert_eq!(second.status, ResponseStatus::NeedMoreInfo);

    let prompt = llm.last_prompt();
    assert_eq!(prompt.matches(DIVISIONS_01).count(), 1, "divisions shown only via history");
    assert!(prompt.contains("REQUESTED DATA NOW AVAILABLE"));
    assert!(!prompt.contains(SECTIONS_0101));

    let message = &second.questions.as_ref().unwrap()[0];
    assert!(message.contains(SECTIONS_0101));
    assert!(message.contains("  - 01.01.03: A single star with five points"));
    assert_eq!(second.disclosed, vec![TaxonomySlice::sections("01", "01")]);
    assert_eq!(
        second.confirmed_facts.as_ref().unwrap().shapes,
        vec!["five-pointed star"]
    );
    let element = second.state.as_ref().unwrap().current_element().unwrap().clone();
    assert_eq!(element.category_code.as_deref(), Some("01"));
    assert_eq!(element.division_codes, vec!["01"]);
    let context = extend(&context, "It is a single star", &second);

    // Turn 3: model completes with section 03
    llm.push(json!({
        "status": "complete",
        "currentStep": "section",
        "reasoning": "Single five-pointed star",
        "responseToUser": "The design code is 01.01.03 (A single star with five points).",
        "classification": {
            "categoryCode": "01",
            "divisionCodes": ["01"],
            "sectionCodes": ["03"],
            "sectionReasoning": "Five points",
            "fullCodes": ["010103"]
        },
        "nextStep": {}
    }));
    let third = engine.handle(&request("Yes, five points", &context)).await;
    assert_eq!(third.status, ResponseStatus::Complete);

    let classification = third.classification.as_ref().unwrap();
    assert_eq!(classification.full_codes, vec!["010103"]);
    assert_eq!(classification.category_code, "01");
    assert_eq!(classification.section_codes, vec!["03"]);
    assert!(!classification.code_limit_exceeded);

    let state = third.state.as_ref().unwrap();
    assert!(state.current_element_id.is_none());
    assert!(state.elements[0].completed);
    assert_eq!(state.phase(), DialoguePhase::Complete);

    extend(&context, "Yes, five points", &third)
}

#[tokio::test]
async fn test_five_pointed_star_is_classified_in_three_turns() {
    let llm = ScriptedLlm::new();
    let context = classify_star(&llm).await;

    assert_eq!(llm.calls(), 3);
    let record = compute_disclosure(&context);
    assert!(record.has_divisions("01"));
    assert!(record.has_sections("01", "01"));
}

#[tokio::test]
async fn test_second_element_does_not_redisclose_divisions() {
    let llm = ScriptedLlm::new();
    let context = classify_star(&llm).await;
    let engine = engine(&llm);

    llm.push(request_divisions(
        "A comet is also a celestial body. Let me retrieve the divisions for 01.XX.XX.",
        &["01"],
    ));
    let response = engine.handle(&request("there is also a comet", &context)).await;

    assert_eq!(response.status, ResponseStatus::NeedMoreInfo);
    assert!(response.disclosed.is_empty());
    assert!(!response.warnings.is_empty());
    let message = &response.questions.as_ref().unwrap()[0];
    assert!(!message.contains(DIVISIONS_01));

    let prompt = llm.last_prompt();
    assert!(prompt.contains("ALREADY RETRIEVED (do not request again): divisions for 01"));
    assert_eq!(prompt.matches(DIVISIONS_01).count(), 1);

    let state = response.state.as_ref().unwrap();
    assert_eq!(state.elements.len(), 2);
    assert_eq!(state.current_element().unwrap().description, "there is also a comet");
}

#[tokio::test]
async fn test_listing_in_history_survives_a_corrupt_state() {
    let llm = ScriptedLlm::new();
    let engine = engine(&llm);

    llm.push(request_divisions("Let me retrieve the divisions for 01.XX.XX.", &["01"]));
    let first = engine.handle(&request("a five-pointed star", &[])).await;
    let mut context = extend(&[], "a five-pointed star", &first);

    // Keep the visible listing but break the embedded state
    let stored = &mut context[1].content;
    let cut = stored.find("__STATE__:").unwrap() + "__STATE__:".len();
    stored.truncate(cut);
    stored.push_str("{\"elements\": [");
    assert!(compute_disclosure(&context).has_divisions("01"));

    llm.push(request_divisions("Fetching 01.XX.XX.", &["01"]));
    let second = engine.handle(&request("It is a single star", &context)).await;
    assert_eq!(second.status, ResponseStatus::NeedMoreInfo);
    assert!(second.disclosed.is_empty());
    assert!(!second.warnings.is_empty());
    assert!(!second.questions.unwrap()[0].contains(DIVISIONS_01));
}

#[tokio::test]
async fn test_narrowed_divisions_replace_earlier_ones() {
    let llm = ScriptedLlm::new();
    let engine = engine(&llm);

    llm.push(json!({
        "status": "researching",
        "currentStep": "division",
        "responseToUser": "Is it a single star or a constellation?",
        "classification": { "categoryCode": "01", "divisionCodes": ["01", "03"] },
        "nextStep": {}
    }));
    let first = engine.handle(&request("a star", &[])).await;
    let element = first.state.as_ref().unwrap().current_element().unwrap().clone();
    assert_eq!(element.division_codes, vec!["01", "03"]);
    let context = extend(&[], "a star", &first);

    llm.push(json!({
        "status": "complete",
        "responseToUser": "The design code is 01.01.03.",
        "classification": { "categoryCode": "01", "divisionCodes": ["01"], "sectionCodes": ["03"] },
        "nextStep": {}
    }));
    let second = engine.handle(&request("A single star", &context)).await;
    let classification = second.classification.unwrap();
    assert_eq!(classification.division_codes, vec!["01"]);
    assert_eq!(classification.full_codes, vec!["010103"]);
}

#[tokio::test]
async fn test_small_talk_after_completion_starts_no_element() {
    let llm = ScriptedLlm::new();
    let context = classify_star(&llm).await;

    llm.push(ask("Glad I could help. Is there another element?"));
    let response = engine(&llm).handle(&request("thanks", &context)).await;

    assert_eq!(response.status, ResponseStatus::NeedMoreInfo);
    let state = response.state.unwrap();
    assert_eq!(state.elements.len(), 1);
    assert!(state.current_element_id.is_none());
    assert_eq!(state.phase(), DialoguePhase::Complete);
}

#[tokio::test]
async fn test_question_turn_clears_last_request() {
    let llm = ScriptedLlm::new();
    let engine = engine(&llm);

    llm.push(request_divisions("Let me retrieve the divisions for 01.XX.XX.", &["01"]));
    let first = engine.handle(&request("a star", &[])).await;
    assert!(first.state.as_ref().unwrap().last_request.is_some());
    let context = extend(&[], "a star", &first);

    llm.push(ask("Does the star have five points?"));
    let second = engine.handle(&request("It is yellow", &context)).await;
    assert!(second.state.unwrap().last_request.is_none());
}

#[tokio::test]
async fn test_legacy_marker_prevents_disclosure() {
    let llm = ScriptedLlm::new();
    let engine = engine(&llm);
    let context = vec![
        TranscriptMessage::user("a house"),
        TranscriptMessage::assistant("Let me look at buildings."),
        TranscriptMessage::user("AVAILABLE DIVISIONS FOR CATEGORY 07 (Dwellings):\n07.01: Dwellings"),
    ];

    for _ in 0..3 {
        llm.push(request_divisions("Fetching 07.XX.XX again.", &["07"]));
        let response = engine.handle(&request("a small cottage", &context)).await;
        assert_eq!(response.status, ResponseStatus::NeedMoreInfo);
        assert!(response.disclosed.is_empty());
        assert!(!response.questions.unwrap()[0].contains("AVAILABLE DIVISIONS FOR CATEGORY 07"));
    }
}

#[tokio::test]
async fn test_clarifying_question_is_returned_as_is() {
    let llm = ScriptedLlm::new();
    llm.push(ask("Is the star outlined or filled?"));

    let response = engine(&llm).handle(&request("a star", &[])).await;
    assert_eq!(response.status, ResponseStatus::NeedMoreInfo);
    assert_eq!(
        response.questions.unwrap(),
        vec!["Is the star outlined or filled?"]
    );
    assert!(response.classification.is_none());
    let message = response.state_message.unwrap();
    assert!(message.starts_with("Is the star outlined or filled?\n\n__STATE__:"));
}

#[tokio::test]
async fn test_malformed_output_fails_and_retry_resumes() {
    let llm = ScriptedLlm::new();
    let engine = engine(&llm);

    llm.push_raw("I think it is 01.01.03");
    let failed = engine.handle(&request("a star", &[])).await;
    assert_eq!(failed.status, ResponseStatus::Error);
    assert_eq!(failed.error.as_deref(), Some("Failed to process request"));
    assert_eq!(failed.error_type.as_deref(), Some("malformed_model_output"));
    assert!(failed.state.is_none());

    llm.push_raw("```json\n{\"responseToUser\": \"What color?\"}\n```");
    let missing = engine.handle(&request("a star", &[])).await;
    assert_eq!(missing.error_type.as_deref(), Some("missing_next_step"));

    llm.push(ask("What color is the star?"));
    let retried = engine.handle(&request("a star", &[])).await;
    assert_eq!(retried.status, ResponseStatus::NeedMoreInfo);
    assert_eq!(retried.state.unwrap().elements.len(), 1);
}

#[tokio::test]
async fn test_service_failures() {
    let llm = ScriptedLlm::new();
    llm.push_failure("502 Bad Gateway");
    let response = engine(&llm).handle(&request("a star", &[])).await;
    assert_eq!(response.error_type.as_deref(), Some("service_unavailable"));
    assert!(response.details.unwrap().contains("502"));

    let slow = ScriptedLlm::with_delay(Duration::from_secs(5));
    slow.push(ask("too late"));
    let engine = DialogueEngine::with_config(
        slow.clone(),
        EngineConfig::default().with_timeout(Duration::from_millis(20)),
    )
    .unwrap();
    let response = engine.handle(&request("a star", &[])).await;
    assert_eq!(response.error_type.as_deref(), Some("service_timeout"));
}

#[tokio::test]
async fn test_empty_description_is_rejected_without_model_call() {
    let llm = ScriptedLlm::new();
    let response = engine(&llm).handle(&request("  ", &[])).await;
    assert_eq!(response.error_type.as_deref(), Some("invalid_request"));
    assert_eq!(llm.calls(), 0);
}

fn eight_codes() -> serde_json::Value {
    json!({
        "status": "complete",
        "responseToUser": "Here are the codes.",
        "classification": {
            "categoryCode": "01",
            "divisionCodes": ["01"],
            "fullCodes": ["010101", "010102", "010103", "010104", "010105", "010106", "010107", "010108"]
        },
        "nextStep": {}
    })
}

#[tokio::test]
async fn test_eight_codes_are_flagged_by_default() {
    let llm = ScriptedLlm::new();
    llm.push(eight_codes());

    let response = engine(&llm).handle(&request("many stars", &[])).await;
    assert_eq!(response.status, ResponseStatus::Complete);
    let classification = response.classification.unwrap();
    assert_eq!(classification.full_codes.len(), 8);
    assert!(classification.code_limit_exceeded);
    assert!(!response.warnings.is_empty());
}

#[tokio::test]
async fn test_code_limit_truncate_and_reject() {
    let llm = ScriptedLlm::new();
    llm.push(eight_codes());
    let truncating = DialogueEngine::with_config(
        llm.clone(),
        EngineConfig::default().with_limit_policy(CodeLimitPolicy::Truncate),
    )
    .unwrap();
    let response = truncating.handle(&request("many stars", &[])).await;
    let classification = response.classification.unwrap();
    assert_eq!(classification.full_codes.len(), 7);
    assert_eq!(classification.full_codes[6], "010107");

    llm.push(eight_codes());
    let rejecting = DialogueEngine::with_config(
        llm.clone(),
        EngineConfig::default().with_limit_policy(CodeLimitPolicy::Reject),
    )
    .unwrap();
    let response = rejecting.handle(&request("many stars", &[])).await;
    assert_eq!(response.error_type.as_deref(), Some("code_limit_exceeded"));
}

#[tokio::test]
async fn test_malformed_final_code_is_a_code_format_error() {
    let llm = ScriptedLlm::new();
    llm.push(json!({
        "status": "complete",
        "responseToUser": "Done.",
        "classification": { "categoryCode": "01", "fullCodes": ["01.01.XX"] },
        "nextStep": {}
    }));
    let response = engine(&llm).handle(&request("a star", &[])).await;
    assert_eq!(response.error_type.as_deref(), Some("code_format"));
}

#[tokio::test]
async fn test_cross_product_keeps_catalog_combinations() {
    let llm = ScriptedLlm::new();
    llm.push(json!({
        "status": "complete",
        "responseToUser": "Star and constellation codes.",
        "classification": {
            "categoryCode": "01",
            "divisionCodes": ["01", "03"],
            "sectionCodes": ["03", "13"]
        },
        "nextStep": {}
    }));
    let response = engine(&llm).handle(&request("stars", &[])).await;
    let codes = response.classification.unwrap().full_codes;
    assert!(codes.contains(&"010103".to_string()));
    assert!(codes.contains(&"010113".to_string()));
    for code in &codes {
        assert!(code.starts_with("0101") || code.starts_with("0103"));
    }
}

#[tokio::test]
async fn test_double_submit_calls_model_once() {
    let llm = ScriptedLlm::new();
    llm.push(ask("What color is it?"));
    let engine = engine(&llm);
    let gate = TurnGate::default();
    let mut req = request("a star", &[]);
    req.conversation_id = Some("c-1".to_string());

    let (a, b) = tokio::join!(engine.handle_gated(&gate, &req), engine.handle_gated(&gate, &req));

    assert_eq!(llm.calls(), 1);
    assert_eq!(a.state_message, b.state_message);
    assert_eq!(a.status, ResponseStatus::NeedMoreInfo);
}

#[tokio::test(start_paused = true)]
async fn test_unidentified_first_turns_run_in_parallel() {
    let llm = ScriptedLlm::with_delay(Duration::from_millis(300));
    llm.push(ask("What color is it?"));
    llm.push(ask("How many points?"));
    let engine = engine(&llm);
    let gate = TurnGate::default();
    let a = request("a star", &[]);
    let b = request("a star", &[]);

    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(engine.handle_gated(&gate, &a), engine.handle_gated(&gate, &b));

    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(llm.calls(), 2);
    assert_eq!(a.status, ResponseStatus::NeedMoreInfo);
    assert_eq!(b.status, ResponseStatus::NeedMoreInfo);
    assert!(gate.is_empty());
}
