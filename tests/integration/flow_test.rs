//! Flow execution integration tests.

use super::{init_test_env, template};
use httpmock::prelude::*;
use restcli::cookies::CookieJar;
use restcli::environment::{VariableStore, DEFAULT_ENV};
use restcli::executor::{ExecutionConfig, SendError};
use restcli::flow::{CompletedStep, Flow, FlowError, FlowRunner};
use restcli::models::{NamedSet, RequestTemplate};
use restcli::variables::{variable_set, VariableSet};

fn steps(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_captured_value_replaces_override_and_store_value() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body(r#"{"token":"fresh"}"#);
    });
    let profile = server.mock(|when, then| {
        when.method(GET)
            .path("/profile")
            .header("authorization", "Bearer fresh");
        then.status(200).body(r#"{"name":"alice"}"#);
    });
    let orders = server.mock(|when, then| {
        when.method(GET)
            .path("/orders")
            .header("authorization", "Bearer fresh");
        then.status(200).body("[]");
    });

    let base = server.base_url();
    let templates: NamedSet<RequestTemplate> = vec![
        template("login", "POST", "${BASE}/login", &[], &["token:token"]),
        template(
            "profile",
            "GET",
            "${BASE}/profile",
            &[("Authorization", "Bearer ${TOKEN}")],
            &[],
        ),
        template(
            "orders",
            "GET",
            "${BASE}/orders",
            &[("Authorization", "Bearer $token")],
            &[],
        ),
    ]
    .into_iter()
    .collect();
    let flow = Flow::new("checkout", steps(&["login", "profile", "orders"]));

    let mut store = VariableStore::new();
    store.set_in("base", base.as_str(), DEFAULT_ENV).unwrap();
    store.set_in("token", "stale-from-store", DEFAULT_ENV).unwrap();
    let mut overrides = variable_set([("TOKEN", "stale-override")]);

    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let mut seen = Vec::new();
    let mut observer = |step: &CompletedStep<'_>| -> Result<(), FlowError> {
        seen.push((step.index, step.template.name.clone(), step.store.get("TOKEN").map(str::to_string)));
        Ok(())
    };

    let results = FlowRunner::new(&mut store, &mut jar, &config, "$")
        .execute_flow(&flow, &templates, &mut overrides, &mut observer)
        .unwrap();

    assert_eq!(results.len(), 3);
    profile.assert();
    orders.assert();
    assert!(!overrides.contains_key("TOKEN"));
    assert_eq!(store.get("TOKEN"), Some("fresh"));
    assert_eq!(
        seen,
        vec![
            (0, "login".to_string(), Some("fresh".to_string())),
            (1, "profile".to_string(), Some("fresh".to_string())),
            (2, "orders".to_string(), Some("fresh".to_string())),
        ]
    );
}

#[test]
fn test_captures_are_written_to_current_environment() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/id");
        then.status(200).body(r#"{"id":"abc"}"#);
    });

    let templates: NamedSet<RequestTemplate> =
        vec![template("id", "GET", &server.url("/id"), &[], &["id:id"])]
            .into_iter()
            .collect();
    let flow = Flow::new("f", steps(&["id"]));

    let mut store = VariableStore::new();
    store.set_current("staging").unwrap();
    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let mut observer = |_: &CompletedStep<'_>| -> Result<(), FlowError> { Ok(()) };

    FlowRunner::new(&mut store, &mut jar, &config, "$")
        .execute_flow(&flow, &templates, &mut VariableSet::new(), &mut observer)
        .unwrap();

    assert_eq!(store.get_from("ID", "staging"), Some("abc"));
    assert_eq!(store.get_from("ID", DEFAULT_ENV), None);
}

#[test]
fn test_failing_step_aborts_flow_and_keeps_earlier_effects() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200)
            .header("set-cookie", "sid=1; Path=/")
            .body(r#"{"token":"t1"}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500).body("internal error");
    });
    let never = server.mock(|when, then| {
        when.method(GET).path("/never");
        then.status(200);
    });

    let templates: NamedSet<RequestTemplate> = vec![
        template("login", "POST", &server.url("/login"), &[], &["token:token"]),
        template("broken", "GET", &server.url("/broken"), &[], &["id:data.id"]),
        template("never", "GET", &server.url("/never"), &[], &[]),
    ]
    .into_iter()
    .collect();
    let flow = Flow::new("f", steps(&["login", "broken", "never"]));

    let mut store = VariableStore::new();
    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let mut completed = 0;
    let mut observer = |_: &CompletedStep<'_>| -> Result<(), FlowError> {
        completed += 1;
        Ok(())
    };

    let err = FlowRunner::new(&mut store, &mut jar, &config, "$")
        .execute_flow(&flow, &templates, &mut VariableSet::new(), &mut observer)
        .unwrap_err();

    match &err {
        FlowError::StepFailed {
            index,
            template,
            source: SendError::CaptureFailed { var, result, .. },
        } => {
            assert_eq!(*index, 1);
            assert_eq!(template, "broken");
            assert_eq!(var, "ID");
            assert_eq!(result.response.status_code, 500);
        }
        other => panic!("Expected StepFailed with CaptureFailed, got {:?}", other),
    }
    assert_eq!(err.to_string().split(':').next(), Some("Step 2 (broken) failed"));
    assert_eq!(completed, 1);
    never.assert_hits(0);
    assert_eq!(store.get("TOKEN"), Some("t1"));
    assert_eq!(jar.len(), 1);
}

#[test]
fn test_invalid_step_sends_nothing() {
    init_test_env();
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let templates: NamedSet<RequestTemplate> = vec![
        template("first", "GET", &server.url("/first"), &[], &[]),
        RequestTemplate::new("unfinished", "GET", ""),
    ]
    .into_iter()
    .collect();
    let flow = Flow::new("f", steps(&["first", "first", "unfinished"]));

    let mut store = VariableStore::new();
    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let mut observer = |_: &CompletedStep<'_>| -> Result<(), FlowError> { Ok(()) };

    let err = FlowRunner::new(&mut store, &mut jar, &config, "$")
        .execute_flow(&flow, &templates, &mut VariableSet::new(), &mut observer)
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::InvalidFlowStep { index: 2, ref template, .. } if template == "unfinished"
    ));
    first.assert_hits(0);
}

#[test]
fn test_auth_flow_runs_before_template() {
    init_test_env();
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body(r#"{"token":"auth-token"}"#);
    });
    let me = server.mock(|when, then| {
        when.method(GET)
            .path("/me")
            .header("authorization", "Bearer auth-token");
        then.status(200).body("me");
    });

    let mut protected = template(
        "me",
        "GET",
        &server.url("/me"),
        &[("Authorization", "Bearer ${TOKEN}")],
        &[],
    );
    protected.auth_flow = Some("auth".to_string());
    let templates: NamedSet<RequestTemplate> = vec![
        template("login", "POST", &server.url("/login"), &[], &["token:token"]),
        protected,
    ]
    .into_iter()
    .collect();
    let flows: NamedSet<Flow> = vec![Flow::new("auth", steps(&["login"]))]
        .into_iter()
        .collect();

    let mut store = VariableStore::new();
    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let mut sent = Vec::new();
    let mut observer = |step: &CompletedStep<'_>| -> Result<(), FlowError> {
        sent.push((step.flow.map(str::to_string), step.template.name.clone()));
        Ok(())
    };

    let result = FlowRunner::new(&mut store, &mut jar, &config, "$")
        .send_template("me", &templates, &flows, &mut VariableSet::new(), &mut observer)
        .unwrap();

    login.assert();
    me.assert();
    assert_eq!(result.response.body_as_text(), Some("me"));
    assert_eq!(
        sent,
        vec![
            (Some("auth".to_string()), "login".to_string()),
            (None, "me".to_string()),
        ]
    );
}
