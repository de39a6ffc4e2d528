//! End-to-end runs of the save and login workflows against scripted trees.

use super::init_tracing;
use super::mock::{node, test_config, Effect, MemoryStore, MockNavigator, MockTree};
use crate::dispatcher::DispatchOutcome;
use crate::flows::LoginPhase;
use crate::state::StateStore;
use crate::workflow::Outcome;
use crate::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn session(tree: &MockTree, nav: &Arc<MockNavigator>, store: &Arc<MemoryStore>) -> Session {
    Session::new(
        Arc::new(tree.clone()),
        nav.clone(),
        store.clone(),
        test_config(),
    )
}

/// Share page: no access-code prompt, quick save only exists after
/// hovering the save entry, destination falls back to the checkbox.
fn seed_share_page(tree: &MockTree) {
    let entry = tree.insert(node("link", "转存"));
    tree.on_hover(entry, Effect::Insert(node("link", "一键转存").hidden()));
    tree.insert(node("checkbox", "保存到上次路径").checked(false));
    let dialog = tree.insert(node("dialog", "转存到我的网盘"));
    tree.insert(node("link", "立即转存").under(dialog));
    tree.insert(node("button", "知道了"));
}

#[tokio::test]
async fn save_flow_prefers_the_hover_revealed_quick_save() {
    init_tracing();
    let tree = MockTree::new();
    seed_share_page(&tree);
    let nav = MockNavigator::at("https://drive.example.com/s/abc123");
    let store = Arc::new(MemoryStore::default());

    let outcome = session(&tree, &nav, &store).dispatch().await.unwrap();
    let report = match outcome {
        DispatchOutcome::Save(report) => report,
        other => panic!("expected the save flow, got {other:?}"),
    };

    assert_eq!(report.outcome, Outcome::Completed);
    // Only the absent access-code prompt may warn.
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("access code"));

    assert_eq!(tree.hovered_texts(), vec!["转存"]);
    // The revealed control was hidden at locate time, so the click was
    // preceded by a forced reveal.
    assert_eq!(tree.forced_visible_texts(), vec!["一键转存"]);
    assert_eq!(
        tree.clicked_texts(),
        vec!["一键转存", "保存到上次路径", "立即转存", "知道了"],
        "the plain save entry must never be activated when quick save works"
    );
}

#[tokio::test]
async fn save_flow_falls_back_to_the_plain_save_control() {
    init_tracing();
    let tree = MockTree::new();
    // No hover effect: the quick-save control never appears.
    tree.insert(node("link", "转存"));
    let dialog = tree.insert(node("dialog", "转存到我的网盘"));
    tree.insert(node("link", "立即转存").under(dialog));
    let nav = MockNavigator::at("https://drive.example.com/s/xyz");
    let store = Arc::new(MemoryStore::default());

    let report = session(&tree, &nav, &store).save().await;
    assert!(report.succeeded());
    let clicked = tree.clicked_texts();
    assert!(clicked.contains(&"转存".to_string()));
    assert!(clicked.contains(&"立即转存".to_string()));
}

#[tokio::test]
async fn session_locators_default_to_the_configured_step_timeout() {
    use crate::errors::FlowError;
    use crate::selector::MatchSpec;

    let tree = MockTree::new();
    let nav = MockNavigator::at("https://drive.example.com/s/none");
    let store = Arc::new(MemoryStore::default());
    let session = session(&tree, &nav, &store);

    let started = Instant::now();
    let result = session
        .locator(MatchSpec::exact(["button"], ["提交"]))
        .wait(None)
        .await;
    assert!(matches!(result, Err(FlowError::Timeout(_))));
    // 200 ms in the test config, not the 30 s built-in default.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn save_flow_aborts_when_no_save_control_exists() {
    let tree = MockTree::new();
    let nav = MockNavigator::at("https://drive.example.com/s/empty");
    let store = Arc::new(MemoryStore::default());

    let report = session(&tree, &nav, &store).save().await;
    assert_eq!(
        report.outcome,
        Outcome::Aborted {
            reason: "save to my drive".to_string()
        }
    );
}

fn seed_login_page(tree: &MockTree, filled: bool) -> usize {
    tree.insert(node("input", "").named("account").value(if filled {
        "user@example.com"
    } else {
        ""
    }));
    tree.insert(node("input", "").named("password").value(if filled {
        "hunter2!"
    } else {
        ""
    }));
    tree.insert(node("button", "登录"))
}

const LOGIN_URL: &str =
    "https://drive.example.com/login?goto=https%3A%2F%2Fdrive.example.com%2Fs%2Fabc123";

#[tokio::test]
async fn login_flow_drives_the_sms_step_and_redirects() {
    init_tracing();
    let tree = MockTree::new();
    let submit = seed_login_page(&tree, true);
    // Submitting credentials opens the code dialog.
    tree.on_click(submit, Effect::Insert(node("input", "")));
    tree.on_click(submit, Effect::Insert(node("button", "获取验证码")));

    let nav = MockNavigator::at(LOGIN_URL);
    let store = Arc::new(MemoryStore::default());

    // The human types the code while the flow polls.
    {
        let tree = tree.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            // The code input is the only unnamed input.
            let id = 3; // inserted right after account/password/submit
            tree.set_value(id, "123456");
        });
    }

    let outcome = session(&tree, &nav, &store).dispatch().await.unwrap();
    let phase = match outcome {
        DispatchOutcome::Login(phase) => phase,
        other => panic!("expected the login flow, got {other:?}"),
    };

    assert_eq!(phase, LoginPhase::Done);
    assert!(tree
        .clicked_texts()
        .contains(&"获取验证码".to_string()));
    let navigations = nav.navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(
        navigations[0].as_str(),
        "https://drive.example.com/s/abc123"
    );
    // The redirect slot is consumed exactly once.
    assert!(store.get("saveflow.pending_redirect").unwrap().is_none());
}

#[tokio::test]
async fn login_flow_halts_when_credentials_stay_empty() {
    init_tracing();
    let tree = MockTree::new();
    seed_login_page(&tree, false);
    let nav = MockNavigator::at(LOGIN_URL);
    let store = Arc::new(MemoryStore::default());

    let phase = session(&tree, &nav, &store).login().await.unwrap();
    assert_eq!(phase, LoginPhase::AwaitingCredentials);
    assert!(phase.manual_intervention().is_some());
    assert!(tree.clicked_texts().is_empty());
    // The redirect target was still recorded for a later attempt.
    assert!(store.get("saveflow.pending_redirect").unwrap().is_some());
}

#[tokio::test]
async fn login_flow_times_out_when_the_code_is_never_entered() {
    init_tracing();
    let tree = MockTree::new();
    let submit = seed_login_page(&tree, true);
    tree.on_click(submit, Effect::Insert(node("input", "")));

    let nav = MockNavigator::at(LOGIN_URL);
    let store = Arc::new(MemoryStore::default());

    let started = Instant::now();
    let phase = session(&tree, &nav, &store).login().await.unwrap();

    assert_eq!(phase, LoginPhase::TimedOut);
    assert!(phase.manual_intervention().is_some());
    // The poll ran to its ceiling (250 ms in the test config).
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(nav.navigations().is_empty());
}

#[tokio::test]
async fn login_without_a_code_dialog_is_a_direct_sign_in() {
    init_tracing();
    let tree = MockTree::new();
    seed_login_page(&tree, true);
    let nav = MockNavigator::at(LOGIN_URL);
    let store = Arc::new(MemoryStore::default());

    let phase = session(&tree, &nav, &store).login().await.unwrap();
    assert_eq!(phase, LoginPhase::Done);
    assert_eq!(tree.clicked_texts(), vec!["登录"]);
    // Still redirected to the recorded target.
    assert_eq!(nav.navigations().len(), 1);
}

#[tokio::test]
async fn attach_waits_for_the_page_to_finish_loading() {
    let tree = MockTree::new_loading();
    let nav = MockNavigator::at("https://drive.example.com/s/late");
    let store = Arc::new(MemoryStore::default());
    let session = session(&tree, &nav, &store);

    {
        let tree = tree.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            tree.insert(node("link", "转存"));
            let dialog = tree.insert(node("dialog", "转存到我的网盘"));
            tree.insert(node("link", "立即转存").under(dialog));
            tree.mark_ready();
        });
    }

    let outcome = session.attach().await.unwrap();
    match outcome {
        DispatchOutcome::Save(report) => assert_eq!(report.outcome, Outcome::Completed),
        other => panic!("expected the save flow, got {other:?}"),
    }
}
