//! Workspace tests: sends made through a project persist per step.

use super::{init_test_env, template};
use httpmock::prelude::*;
use restcli::commands::{CommandError, Workspace};
use restcli::config::ConfigOverrides;
use restcli::environment::{EnvSelector, DEFAULT_ENV};
use restcli::flow::{CompletedStep, Flow, FlowError};
use restcli::project::{history_path, session_path};
use restcli::variables::{variable_set, VariableSet};
use tempfile::TempDir;

fn workspace_with_flow(dir: &TempDir, server: &MockServer) -> Workspace {
    let mut workspace = Workspace::init(dir.path().join("api.json")).unwrap();
    workspace
        .set_var(&EnvSelector::Default, "base", &server.base_url())
        .unwrap();
    workspace.put_template(template("login", "POST", "${BASE}/login", &[], &["token:token"]));
    workspace.put_template(template(
        "orders",
        "GET",
        "${BASE}/orders",
        &[("Authorization", "Bearer ${TOKEN}")],
        &["count:count"],
    ));
    workspace.put_template(template("logout", "POST", "${BASE}/logout", &[], &[]));
    workspace
        .put_flow(Flow::new(
            "shop",
            vec!["login".to_string(), "orders".to_string(), "logout".to_string()],
        ))
        .unwrap();
    workspace.save().unwrap();
    workspace
}

#[test]
fn test_flow_persists_captures_session_and_history() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200)
            .header("set-cookie", "sid=xyz; Path=/")
            .body(r#"{"token":"t-1"}"#);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/orders")
            .header("authorization", "Bearer t-1")
            .header("cookie", "sid=xyz");
        then.status(200).body(r#"{"count":3}"#);
    });
    server.mock(|when, then| {
        when.method(POST).path("/logout");
        then.status(204);
    });

    let mut workspace = workspace_with_flow(&dir, &server);
    let mut printed = Vec::new();
    let results = workspace
        .exec_flow("shop", VariableSet::new(), &mut |step: &CompletedStep<'_>| {
            printed.push(step.template.name.clone())
        })
        .unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(printed, vec!["login", "orders", "logout"]);

    let path = dir.path().join("api.json");
    let reopened = Workspace::open(&path, &ConfigOverrides::default()).unwrap();
    assert_eq!(reopened.project().variables.get("TOKEN"), Some("t-1"));
    assert_eq!(reopened.project().variables.get("COUNT"), Some("3"));
    assert_eq!(reopened.jar().len(), 1);
    assert!(session_path(&path).exists());

    let history = reopened.history().load().unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|entry| entry.flow.as_deref() == Some("shop")));
    assert_eq!(history[1].captured["COUNT"], "3");
    assert!(!history[1].request.headers.contains("authorization"));
}

#[test]
fn test_flow_abort_keeps_earlier_steps_on_disk() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body(r#"{"token":"t-2"}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/orders");
        then.status(503).body("maintenance");
    });
    let logout = server.mock(|when, then| {
        when.method(POST).path("/logout");
        then.status(204);
    });

    let mut workspace = workspace_with_flow(&dir, &server);
    let err = workspace
        .exec_flow("shop", VariableSet::new(), &mut |_: &CompletedStep<'_>| {})
        .unwrap_err();

    assert!(matches!(
        err,
        CommandError::Flow(FlowError::StepFailed { index: 1, .. })
    ));
    let partial = err.send_error().and_then(|e| e.response()).unwrap();
    assert_eq!(partial.response.status_code, 503);
    logout.assert_hits(0);

    let path = dir.path().join("api.json");
    let reopened = Workspace::open(&path, &ConfigOverrides::default()).unwrap();
    assert_eq!(reopened.project().variables.get("TOKEN"), Some("t-2"));

    let history = reopened.history().load().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].template.as_deref(), Some("login"));
    assert_eq!(history[1].response.status_code, 503);
}

#[test]
fn test_send_template_with_overrides() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let orders = server.mock(|when, then| {
        when.method(GET)
            .path("/orders")
            .header("authorization", "Bearer manual");
        then.status(200).body(r#"{"count":0}"#);
    });

    let mut workspace = workspace_with_flow(&dir, &server);
    let result = workspace
        .send_template(
            "orders",
            variable_set([("token", "manual")]),
            &mut |_: &CompletedStep<'_>| {},
        )
        .unwrap();

    orders.assert();
    assert_eq!(result.captured["COUNT"], "0");
    assert_eq!(workspace.project().variables.get("TOKEN"), None);
    assert_eq!(
        workspace.project().variables.get_from("COUNT", DEFAULT_ENV),
        Some("0")
    );
}

#[test]
fn test_history_and_session_can_be_disabled() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quiet.json");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ping");
        then.status(200).header("set-cookie", "a=1");
    });

    std::fs::write(
        &path,
        format!(
            r#"{{
                "config": {{"recordHistory": false, "recordSession": false}},
                "templates": [{{"name": "ping", "method": "GET", "url": "{}"}}]
            }}"#,
            server.url("/ping")
        ),
    )
    .unwrap();

    let mut workspace = Workspace::open(&path, &ConfigOverrides::default()).unwrap();
    workspace
        .send_template("ping", VariableSet::new(), &mut |_: &CompletedStep<'_>| {})
        .unwrap();

    assert!(!history_path(&path).exists());
    assert!(!session_path(&path).exists());
    assert_eq!(workspace.jar().len(), 1);
}
