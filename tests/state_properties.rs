//! Property tests for the transcript codec, disclosure tracking and code formatting

use proptest::prelude::*;

use design_code_chat::dialogue::codec::attach;
use design_code_chat::dialogue::{
    compute_disclosure, decode, strip_state, ConversationState, DesignElement, TaxonomySlice,
    TranscriptMessage,
};
use design_code_chat::taxonomy::{finalize_full_code, parse_full_code};

fn two_digit() -> impl Strategy<Value = String> {
    (1u8..=29).prop_map(|n| format!("{:02}", n))
}

fn slice() -> impl Strategy<Value = TaxonomySlice> {
    prop_oneof![
        two_digit().prop_map(TaxonomySlice::divisions),
        (two_digit(), two_digit()).prop_map(|(c, d)| TaxonomySlice::sections(c, d)),
    ]
}

fn element() -> impl Strategy<Value = DesignElement> {
    (
        "[a-z ]{1,30}",
        proptest::option::of(two_digit()),
        proptest::collection::vec(two_digit(), 0..4),
        any::<bool>(),
    )
        .prop_map(|(description, category, divisions, completed)| {
            let mut element = DesignElement::new(description);
            element.category_code = category;
            element.select_divisions(divisions);
            if completed {
                element.complete(vec!["010103".to_string()]);
            }
            element
        })
}

fn state() -> impl Strategy<Value = ConversationState> {
    (
        proptest::collection::vec(element(), 0..4),
        proptest::collection::vec(slice(), 0..6),
        proptest::collection::vec(slice(), 0..2),
    )
        .prop_map(|(elements, disclosed, pending)| {
            let mut state = ConversationState {
                current_element_id: elements.last().map(|e| e.id.clone()),
                elements,
                pending_disclosure: pending,
                ..ConversationState::default()
            };
            for slice in disclosed {
                state.record_disclosure(slice);
            }
            state
        })
}

proptest! {
    #[test]
    fn prop_state_survives_the_transcript(state in state(), visible in "[A-Za-z0-9?.,]([A-Za-z0-9 ?.,]{0,60}[A-Za-z0-9?.,])?") {
        let transcript = vec![
            TranscriptMessage::user("a star"),
            TranscriptMessage::assistant(attach(&visible, &state)),
        ];
        prop_assert_eq!(decode(&transcript), state.clone());

        let stored = attach(&visible, &state);
        prop_assert_eq!(strip_state(&stored), visible.as_str());
    }

    #[test]
    fn prop_only_newest_state_is_used(older in state(), newer in state()) {
        let transcript = vec![
            TranscriptMessage::assistant(attach("first", &older)),
            TranscriptMessage::user("more"),
            TranscriptMessage::assistant(attach("second", &newer)),
            TranscriptMessage::user("and more"),
        ];
        prop_assert_eq!(decode(&transcript), newer);
    }

    #[test]
    fn prop_disclosure_is_idempotent(state in state()) {
        let message = TranscriptMessage::assistant(attach("listing", &state));
        let once = compute_disclosure(&[message.clone()]);
        let twice = compute_disclosure(&[message.clone(), TranscriptMessage::user("ok"), message]);
        prop_assert_eq!(&once, &twice);

        for slice in &state.disclosed {
            prop_assert!(once.contains(slice));
        }
    }

    #[test]
    fn prop_full_codes_are_six_digits(c in 1u8..=99, d in 1u8..=99, s in 1u8..=99) {
        let code = finalize_full_code(&c.to_string(), &d.to_string(), &s.to_string()).unwrap();
        prop_assert_eq!(code.len(), 6);
        prop_assert!(code.bytes().all(|b| b.is_ascii_digit()));
        prop_assert_eq!(&code, &format!("{:02}{:02}{:02}", c, d, s));

        let dotted = format!("{}.{}.{}", &code[0..2], &code[2..4], &code[4..6]);
        prop_assert_eq!(parse_full_code(&dotted).unwrap(), code);
    }
}

#[test]
fn test_corrupt_state_falls_back_to_default() {
    let transcript = vec![TranscriptMessage::assistant(
        "Which color?\n\n__STATE__:{not json",
    )];
    assert_eq!(decode(&transcript), ConversationState::default());
    assert!(compute_disclosure(&transcript).is_empty());
}

#[test]
fn test_user_messages_never_carry_state() {
    let mut state = ConversationState::default();
    state.begin_element("a star");
    let transcript = vec![TranscriptMessage::user(attach("pasted", &state))];
    assert_eq!(decode(&transcript), ConversationState::default());
}
