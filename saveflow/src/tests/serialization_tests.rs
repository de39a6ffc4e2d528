//! Declarative step tables and configuration survive serde.

use crate::config::EngineConfig;
use crate::flows::save::{save_flow, SAVE_FLOW};
use crate::selector::TextMatch;
use crate::workflow::{StepAction, Workflow};

#[test]
fn config_json_overrides_keep_unnamed_defaults() {
    let config = EngineConfig::from_json(
        r#"{
            "timeouts": { "step_ms": 1234 },
            "texts": { "quick_save": ["Quick save"] },
            "pages": { "save_path_prefix": "/share/" }
        }"#,
    )
    .expect("partial config parses");

    assert_eq!(config.timeouts.step_ms, 1234);
    assert_eq!(config.timeouts.settle_ms, 500, "untouched defaults remain");
    assert_eq!(config.texts.quick_save, vec!["Quick save"]);
    assert_eq!(config.texts.confirm.len(), 2);
    assert_eq!(config.pages.save_path_prefix, "/share/");
    assert_eq!(config.login.min_otp_len, 4);
    assert_eq!(config.redirect_key, "saveflow.pending_redirect");
}

#[test]
fn workflows_round_trip_through_json() {
    let workflow = save_flow(&EngineConfig::default());
    let json = serde_json::to_string_pretty(&workflow).expect("serialize");
    let parsed: Workflow = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.name, workflow.name);
    assert_eq!(parsed.steps.len(), workflow.steps.len());
    for (a, b) in parsed.steps.iter().zip(&workflow.steps) {
        assert_eq!(a.description, b.description);
        assert_eq!(a.required, b.required);
        assert_eq!(a.primary.action, b.primary.action);
        assert_eq!(a.primary.spec.texts, b.primary.spec.texts);
    }
}

#[test]
fn the_save_table_encodes_the_step_policies() {
    let workflow = save_flow(&EngineConfig::default());
    assert_eq!(workflow.name, SAVE_FLOW);
    assert_eq!(workflow.steps.len(), 5);

    let access = &workflow.steps[0];
    assert!(!access.required);
    assert!(access.primary.spec.within.is_some());

    let save = &workflow.steps[1];
    assert!(save.required);
    assert!(save.primary.reveal.is_some());
    assert!(!save.primary.spec.visible, "quick save may be unrendered");
    assert!(save.fallback.is_some());

    let destination = &workflow.steps[2];
    assert_eq!(
        destination.fallback.as_ref().unwrap().action,
        StepAction::ToggleIfUnchecked
    );

    let confirm = &workflow.steps[3];
    assert!(confirm.required);
    assert_eq!(confirm.primary.spec.mode, TextMatch::Contains);

    let notice = &workflow.steps[4];
    assert!(!notice.required);
    assert!(notice.timeout_ms.is_some());
}
