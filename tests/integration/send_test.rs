//! Single-send integration tests against a local mock server.

use super::init_test_env;
use httpmock::prelude::*;
use restcli::cookies::CookieJar;
use restcli::executor::{send, ExecutionConfig, OneshotState, SendError, SendOptions};
use restcli::models::Headers;
use restcli::variables::{parse_var_scraper, variable_set};
use tempfile::TempDir;

#[test]
fn test_send_resolves_every_field() {
    init_test_env();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/users/42")
            .header("x-api-key", "secret")
            .body(r#"{"name":"alice"}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"{"id":42}"#);
    });

    let options = SendOptions {
        headers: [("X-Api-Key", "${api_key}")].into_iter().collect::<Headers>(),
        body: r#"{"name":"$user"}"#.into(),
        variables: variable_set([("API_KEY", "secret"), ("user", "alice"), ("id", "42")]),
        ..Default::default()
    };
    let url = format!("{}/users/${{ID}}", server.base_url());

    let mut jar = CookieJar::new();
    let result = send("post", &url, "$", &options, &mut jar, &ExecutionConfig::default()).unwrap();

    mock.assert();
    assert_eq!(result.request.method, "POST");
    assert_eq!(result.request.url, server.url("/users/42"));
    assert_eq!(result.response.status_code, 201);
    assert_eq!(result.response.body_as_text(), Some(r#"{"id":42}"#));
    assert!(result.received_at >= result.sent_at);
}

#[test]
fn test_send_applies_captures_in_order() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/items");
        then.status(200)
            .body(r#"{"items":[{"id":7,"tags":["a","b"]}],"ok":true}"#);
    });

    let options = SendOptions {
        scrapers: vec![
            parse_var_scraper("id:items[0].id").unwrap(),
            parse_var_scraper("tag:items[0].tags[1]").unwrap(),
            parse_var_scraper("ok:ok").unwrap(),
            parse_var_scraper("head::0,9").unwrap(),
        ],
        ..Default::default()
    };

    let mut jar = CookieJar::new();
    let result = send(
        "GET",
        &server.url("/items"),
        "$",
        &options,
        &mut jar,
        &ExecutionConfig::default(),
    )
    .unwrap();

    assert_eq!(result.captured["ID"], "7");
    assert_eq!(result.captured["TAG"], "b");
    assert_eq!(result.captured["OK"], "true");
    assert_eq!(result.captured["HEAD"], r#"{"items":"#);
}

#[test]
fn test_capture_failure_keeps_response_and_skips_cookies() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/login");
        then.status(200)
            .header("set-cookie", "sid=abc; Path=/")
            .body("not json");
    });

    let options = SendOptions {
        scrapers: vec![parse_var_scraper("token:token").unwrap()],
        ..Default::default()
    };

    let mut jar = CookieJar::new();
    let err = send(
        "GET",
        &server.url("/login"),
        "$",
        &options,
        &mut jar,
        &ExecutionConfig::default(),
    )
    .unwrap_err();

    match &err {
        SendError::CaptureFailed { var, result, .. } => {
            assert_eq!(var, "TOKEN");
            assert_eq!(result.response.status_code, 200);
        }
        other => panic!("Expected CaptureFailed, got {:?}", other),
    }
    assert!(err.response().is_some());
    assert!(jar.is_empty());
}

#[test]
fn test_unresolved_variable_sends_nothing() {
    init_test_env();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let options = SendOptions {
        headers: [("Authorization", "Bearer ${TOKEN}")].into_iter().collect(),
        ..Default::default()
    };

    let mut jar = CookieJar::new();
    let err = send(
        "GET",
        &server.url("/me"),
        "$",
        &options,
        &mut jar,
        &ExecutionConfig::default(),
    )
    .unwrap_err();

    match err {
        SendError::UnresolvedVariable { field, name } => {
            assert_eq!(field, "header Authorization");
            assert_eq!(name, "TOKEN");
        }
        other => panic!("Expected UnresolvedVariable, got {:?}", other),
    }
    mock.assert_hits(0);
}

#[test]
fn test_cookies_flow_between_sends() {
    init_test_env();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(204).header("set-cookie", "sid=abc123; Path=/; HttpOnly");
    });
    let profile = server.mock(|when, then| {
        when.method(GET).path("/profile").header("cookie", "sid=abc123");
        then.status(200).body("profile");
    });

    let mut jar = CookieJar::new();
    let config = ExecutionConfig::default();
    let options = SendOptions::default();

    let login = send("POST", &server.url("/login"), "$", &options, &mut jar, &config).unwrap();
    assert_eq!(login.cookies.len(), 1);
    assert_eq!(jar.len(), 1);

    let result = send("GET", &server.url("/profile"), "$", &options, &mut jar, &config).unwrap();
    profile.assert();
    assert_eq!(result.request.headers.get("cookie"), Some("sid=abc123"));
}

#[test]
fn test_default_headers_do_not_override_request_headers() {
    init_test_env();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/").header("user-agent", "custom/1.0");
        then.status(200);
    });

    let options = SendOptions {
        headers: [("User-Agent", "custom/1.0")].into_iter().collect(),
        ..Default::default()
    };
    let mut jar = CookieJar::new();
    send(
        "GET",
        &server.url("/"),
        "$",
        &options,
        &mut jar,
        &ExecutionConfig::default(),
    )
    .unwrap();
    mock.assert();
}

#[test]
fn test_oneshot_state_file_carries_cookies_and_captures() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/session");
        then.status(200)
            .header("set-cookie", "sid=s1; Path=/")
            .body(r#"{"user":{"id":"u-9"}}"#);
    });
    let follow_up = server.mock(|when, then| {
        when.method(GET).path("/users/u-9").header("cookie", "sid=s1");
        then.status(200);
    });

    let config = ExecutionConfig::default();
    let first = SendOptions {
        scrapers: vec![parse_var_scraper("user_id:user.id").unwrap()],
        state_file: Some(state_path.clone()),
        ..Default::default()
    };
    send("POST", &server.url("/session"), "$", &first, &mut CookieJar::new(), &config).unwrap();

    let state = OneshotState::load(&state_path).unwrap();
    assert_eq!(state.variables["USER_ID"], "u-9");
    assert_eq!(state.cookies.len(), 1);

    let second = SendOptions {
        state_file: Some(state_path.clone()),
        ..Default::default()
    };
    let url = format!("{}/users/${{USER_ID}}", server.base_url());
    send("GET", &url, "$", &second, &mut CookieJar::new(), &config).unwrap();
    follow_up.assert();
}

#[test]
fn test_explicit_variables_win_over_state_file() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let mut state = OneshotState::default();
    state.variables.insert("ID".to_string(), "from-state".to_string());
    state.save(&state_path).unwrap();

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/items/explicit");
        then.status(200);
    });

    let options = SendOptions {
        variables: variable_set([("id", "explicit")]),
        state_file: Some(state_path),
        ..Default::default()
    };
    let url = format!("{}/items/$ID", server.base_url());
    send("GET", &url, "$", &options, &mut CookieJar::new(), &ExecutionConfig::default()).unwrap();
    mock.assert();
}

#[test]
fn test_custom_prefix() {
    init_test_env();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/price").query_param("amount", "$5");
        then.status(200);
    });

    let options = SendOptions {
        variables: variable_set([("path", "price")]),
        ..Default::default()
    };
    let url = format!("{}/@{{PATH}}?amount=$5", server.base_url());
    send("GET", &url, "@", &options, &mut CookieJar::new(), &ExecutionConfig::default()).unwrap();
    mock.assert();
}

#[test]
fn test_connection_failure_is_request_failed() {
    init_test_env();
    let config = ExecutionConfig {
        timeout: std::time::Duration::from_secs(2),
        ..Default::default()
    };
    let err = send(
        "GET",
        "http://127.0.0.1:1/",
        "$",
        &SendOptions::default(),
        &mut CookieJar::new(),
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, SendError::RequestFailed(_)));
    assert!(err.response().is_none());
}
