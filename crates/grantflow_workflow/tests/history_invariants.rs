//! Property tests: arbitrary action sequences never break the history
//! invariants of a request.

use grantflow_workflow::{
    AccessType, ApprovalEngine, ApprovalStage, Outcome, PermissionDefinition, Request, RequestId,
    RequestStatus, StaticCatalog, SubmissionDraft, WorkflowError,
};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Action {
    stage: ApprovalStage,
    approve: bool,
    comments: String,
}

fn action() -> impl Strategy<Value = Action> {
    (
        prop::sample::select(ApprovalStage::ALL.to_vec()),
        any::<bool>(),
        prop_oneof![Just(String::new()), Just("  ".to_string()), "[a-z]{1,12}"],
    )
        .prop_map(|(stage, approve, comments)| Action {
            stage,
            approve,
            comments,
        })
}

fn engine() -> ApprovalEngine {
    let catalog = StaticCatalog::from_definitions(vec![
        PermissionDefinition::new("User.Read", "Sign in and read user profile"),
        PermissionDefinition::new("Sites.Read.All", "Read items in all site collections")
            .with_review(),
    ])
    .unwrap();
    ApprovalEngine::new(Arc::new(catalog))
}

/// A stored gated request whose evidence is missing links and sites. Its
/// first-stage approval can never succeed.
const GATED_SNAPSHOT: &str = r#"{
    "id": "REQ-GATED",
    "status": "Pending",
    "current_stage": "Business",
    "selections": {
        "Sites.Read.All": {
            "permission": "Sites.Read.All",
            "access_type": "Application",
            "justification": "HR sync"
        }
    },
    "evidence": {"Sites.Read.All": {"attachments": ["review.pdf"]}},
    "history": [],
    "created_at": "2024-12-01T09:00:00Z"
}"#;

fn admit(engine: &ApprovalEngine, gated: bool) -> RequestId {
    if gated {
        let request: Request = serde_json::from_str(GATED_SNAPSHOT).unwrap();
        let id = request.id.clone();
        engine.restore(request).unwrap();
        id
    } else {
        engine
            .submit(SubmissionDraft::new().select("User.Read", AccessType::Delegated, "Portal"))
            .unwrap()
            .id
    }
}

fn assert_invariants(request: &Request) {
    assert!(request.history.len() <= ApprovalStage::ALL.len());
    for (entry, expected) in request.history.iter().zip(ApprovalStage::ALL) {
        assert_eq!(entry.stage, expected);
        assert!(!entry.comments.trim().is_empty());
    }
    let denials = request
        .history
        .iter()
        .filter(|h| h.outcome == Outcome::Denied)
        .count();
    assert!(denials <= 1);

    match request.status {
        RequestStatus::Approved => {
            assert_eq!(request.history.len(), 3);
            assert_eq!(denials, 0);
        }
        RequestStatus::Denied => {
            assert_eq!(request.history.last().map(|h| h.outcome), Some(Outcome::Denied));
        }
        RequestStatus::Pending => {
            assert_eq!(denials, 0);
            assert_eq!(request.current_stage, ApprovalStage::ALL[request.history.len()]);
        }
    }
}

proptest! {
    #[test]
    fn history_stays_ordered_under_arbitrary_actions(
        gated in any::<bool>(),
        actions in prop::collection::vec(action(), 0..12)
    ) {
        let engine = engine();
        let id = admit(&engine, gated);

        for action in actions {
            let before = engine.get(&id).unwrap();
            let result = if action.approve {
                engine.approve(&id, action.stage, "actor", &action.comments)
            } else {
                engine.deny(&id, action.stage, "actor", &action.comments)
            };
            let after = engine.get(&id).unwrap();

            match result {
                Ok(returned) => {
                    prop_assert_eq!(&returned, &after);
                    prop_assert_eq!(after.history.len(), before.history.len() + 1);
                }
                Err(err) => {
                    prop_assert_eq!(&after, &before);
                    let reached_gate = gated
                        && action.approve
                        && action.stage == ApprovalStage::Business
                        && before.status == RequestStatus::Pending
                        && before.current_stage == ApprovalStage::Business
                        && !action.comments.trim().is_empty();
                    if reached_gate {
                        let evidence_error = matches!(err, WorkflowError::EvidenceIncomplete { .. });
                        prop_assert!(evidence_error);
                    }
                }
            }
            if gated {
                // Only a denial can ever be recorded at the gated first stage.
                let business = after.entry_for(ApprovalStage::Business);
                prop_assert!(business.map_or(true, |h| h.outcome == Outcome::Denied));
            }
            assert_invariants(&after);
        }
    }
}
