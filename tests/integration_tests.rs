use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use cfapi::{ApiVersion, CfError, CloudController, Config, Session};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

/// Build an unsigned JWT expiring at `exp`
fn jwt(exp: i64) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(json!({"exp": exp, "user_name": "admin"}).to_string())
    )
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Serve the info document pointing the token endpoint back at the server
fn mock_info(server: &mut ServerGuard) -> mockito::Mock {
    let body = json!({
        "name": "test",
        "api_version": "2.150.0",
        "token_endpoint": server.url(),
        "authorization_endpoint": server.url(),
    });
    server
        .mock("GET", "/v2/info")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create()
}

fn mock_token(server: &mut ServerGuard, grant_type: &str, access_token: &str, refresh_token: Option<&str>) -> mockito::Mock {
    let mut body = json!({"access_token": access_token, "token_type": "bearer", "expires_in": 599});
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::UrlEncoded("grant_type".into(), grant_type.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create()
}

#[test]
fn test_discovery() {
    let mut server = Server::new();
    let info = mock_info(&mut server);

    let cc = CloudController::connect(&Config::new(server.url())).expect("discovery failed");

    info.assert();
    let discovered = cc.session().info().expect("info missing");
    assert_eq!(discovered.token_endpoint.as_deref(), Some(server.url().as_str()));
    assert_eq!(discovered.api_version.as_deref(), Some("2.150.0"));
}

#[test]
fn test_discovery_failure() {
    let mut server = Server::new();
    let _info = server.mock("GET", "/v2/info").with_status(503).with_body("down").create();

    match CloudController::connect(&Config::new(server.url())) {
        Err(CfError::Discovery { status, .. }) => assert_eq!(status, Some(503)),
        other => panic!("expected discovery error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_password_grant_and_bearer_header() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let access_token = jwt(now() + 3600);

    let token = server
        .mock("POST", "/oauth/token")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "password".into()),
            Matcher::UrlEncoded("username".into(), "admin".into()),
            Matcher::UrlEncoded("password".into(), "secret".into()),
            Matcher::UrlEncoded("client_id".into(), "cf".into()),
        ]))
        .with_status(200)
        .with_body(json!({"access_token": access_token, "refresh_token": "r1"}).to_string())
        .expect(1)
        .create();

    let apps = server
        .mock("GET", "/v2/apps")
        .match_header("authorization", format!("bearer {}", access_token).as_str())
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body(json!({"resources": [], "next_url": null}).to_string())
        .expect(2)
        .create();

    let config = Config::new(server.url()).with_credentials("admin", "secret");
    let mut cc = CloudController::connect(&config).unwrap();

    let response = cc.request("apps", &[]).get().unwrap();
    assert!(response.is_ok());
    // The token is still valid, so no second grant is requested
    cc.request("/v2/apps", &[]).get().unwrap();

    token.assert();
    apps.assert();
    assert_eq!(
        cc.session().token().and_then(|t| t.refresh_token.as_deref()),
        Some("r1")
    );
}

#[test]
fn test_expired_token_is_refreshed() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let stale = jwt(now() - 60);
    let fresh = jwt(now() + 3600);

    let password = mock_token(&mut server, "password", &stale, Some("r1"));
    let refresh = server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "r1".into()),
        ]))
        .with_status(200)
        .with_body(json!({"access_token": fresh, "refresh_token": "r2"}).to_string())
        .expect(1)
        .create();

    let with_stale = server
        .mock("GET", "/v3/apps")
        .match_header("authorization", format!("bearer {}", stale).as_str())
        .with_status(200)
        .with_body(json!({"resources": [], "pagination": {"next": null}}).to_string())
        .expect(1)
        .create();
    let with_fresh = server
        .mock("GET", "/v3/apps")
        .match_header("authorization", format!("bearer {}", fresh).as_str())
        .with_status(200)
        .with_body(json!({"resources": [], "pagination": {"next": null}}).to_string())
        .expect(1)
        .create();

    let config = Config::new(server.url())
        .with_version(ApiVersion::V3)
        .with_credentials("admin", "secret");
    let mut cc = CloudController::connect(&config).unwrap();

    // First call logs in with the password grant and receives an expired token
    cc.request("apps", &[]).get().unwrap();
    // Second call notices the expiry and refreshes before sending
    cc.request("apps", &[]).get().unwrap();

    password.assert();
    refresh.assert();
    with_stale.assert();
    with_fresh.assert();
    assert_eq!(cc.session().token().unwrap().access_token, fresh);
}

#[test]
fn test_client_credentials_grant() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let _space = server
        .mock("GET", "/v3/spaces/s1")
        .with_status(200)
        .with_body(json!({"guid": "s1", "name": "dev", "relationships": {"organization": {"data": {"guid": "o1"}}}}).to_string())
        .create();

    let config = Config::new(server.url())
        .with_version(ApiVersion::V3)
        .with_client("automation", "s3cret");
    let mut cc = CloudController::connect(&config).unwrap();

    let response = cc.request("https://elsewhere.example.com/v3/spaces/s1", &[]).get().unwrap();
    let space = response.resource().unwrap().expect("space missing");

    token.assert();
    assert_eq!(space.guid(), Some("s1"));
    assert_eq!(space.name(), Some("dev"));
    assert_eq!(space.organization_guid(), Some("o1"));
    assert_eq!(space.space_guid(), None);
}

#[test]
fn test_auth_failure() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"error":"unauthorized","error_description":"Bad credentials"}"#)
        .create();

    let config = Config::new(server.url()).with_credentials("admin", "wrong");
    let mut cc = CloudController::connect(&config).unwrap();

    match cc.request("apps", &[]).get() {
        Err(CfError::Auth { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Bad credentials"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
    assert!(cc.session().token().is_none());
}

#[test]
fn test_error_envelope_is_returned_as_response() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let _missing = server
        .mock("GET", "/v2/apps/nope")
        .with_status(404)
        .with_body(json!({"code": 100004, "description": "The app could not be found: nope", "error_code": "CF-AppNotFound"}).to_string())
        .create();

    let mut cc = CloudController::connect(&Config::new(server.url())).unwrap();
    let response = cc.request("apps/nope", &[]).get().expect("non-2xx must not be a transport error");

    assert_eq!(response.status(), 404);
    let err = response.resources().unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "An API error occurred: HTTP 404 CF-AppNotFound.");
}

#[test]
fn test_fetch_all_three_pages() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);

    let app = |guid: &str| json!({"metadata": {"guid": guid}, "entity": {"name": format!("app-{}", guid)}});
    let pages = [
        ("1", json!({"resources": [app("a"), app("b")], "next_url": "/v2/apps?page=2&results-per-page=2"})),
        ("2", json!({"resources": [app("c"), app("d")], "next_url": "/v2/apps?page=3&results-per-page=2"})),
        ("3", json!({"resources": [app("e")], "next_url": null})),
    ];
    let mocks: Vec<_> = pages
        .iter()
        .map(|(page, body)| {
            server
                .mock("GET", "/v2/apps")
                .match_query(Matcher::AllOf(vec![
                    Matcher::UrlEncoded("page".into(), page.to_string()),
                    Matcher::UrlEncoded("results-per-page".into(), "2".into()),
                ]))
                .with_status(200)
                .with_body(body.to_string())
                .expect(1)
                .create()
        })
        .collect();

    let mut cc = CloudController::connect(&Config::new(server.url())).unwrap();
    let names: Vec<String> = cc
        .fetch_all("apps", &[("page", "1"), ("results-per-page", "2")])
        .map(|r| r.unwrap().name().unwrap().to_string())
        .collect();

    assert_eq!(names, vec!["app-a", "app-b", "app-c", "app-d", "app-e"]);
    for mock in &mocks {
        mock.assert();
    }
}

#[test]
fn test_fetch_all_reroots_absolute_v3_locators() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);

    let _first = server
        .mock("GET", "/v3/apps")
        .match_query(Matcher::Exact("per_page=1".into()))
        .with_status(200)
        .with_body(
            json!({
                "pagination": {"next": {"href": "https://cc.internal:9022/v3/apps?page=2&per_page=1"}},
                "resources": [{"guid": "g1", "name": "one"}]
            })
            .to_string(),
        )
        .create();
    let second = server
        .mock("GET", "/v3/apps")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("per_page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(json!({"pagination": {"next": null}, "resources": [{"guid": "g2", "name": "two"}]}).to_string())
        .expect(1)
        .create();

    let config = Config::new(server.url()).with_version(ApiVersion::V3);
    let mut cc = CloudController::connect(&config).unwrap();

    let guids: Vec<String> = cc
        .fetch_all("/v3/apps", &[("per_page", "1")])
        .map(|r| r.unwrap().guid().unwrap().to_string())
        .collect();

    assert_eq!(guids, vec!["g1", "g2"]);
    second.assert();
}

#[test]
fn test_fetch_all_stops_on_error_page() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let _denied = server
        .mock("GET", "/v3/apps")
        .with_status(403)
        .with_body(json!({"errors": [{"title": "CF-NotAuthorized", "detail": "You are not authorized to perform the requested action", "code": 10003}]}).to_string())
        .expect(1)
        .create();

    let config = Config::new(server.url()).with_version(ApiVersion::V3);
    let mut cc = CloudController::connect(&config).unwrap();
    let results: Vec<_> = cc.fetch_all("apps", &[]).collect();

    assert_eq!(results.len(), 1);
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(err
        .to_string()
        .contains("HTTP 403 CF-NotAuthorized - You are not authorized"));
}

#[test]
fn test_post_with_json_body() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let create = server
        .mock("POST", "/v3/apps")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "web"})))
        .with_status(201)
        .with_body(json!({"guid": "new", "name": "web"}).to_string())
        .expect(1)
        .create();
    let delete = server
        .mock("DELETE", "/v3/apps/new")
        .with_status(202)
        .with_body("")
        .expect(1)
        .create();

    let config = Config::new(server.url()).with_version(ApiVersion::V3);
    let mut cc = CloudController::connect(&config).unwrap();

    let response = cc
        .request("apps", &[])
        .set_body(&json!({"name": "web"}))
        .unwrap()
        .post()
        .unwrap();
    assert_eq!(response.status(), 201);
    assert_eq!(response.resource().unwrap().unwrap().guid(), Some("new"));

    let deleted = cc.request("apps/new", &[]).delete().unwrap();
    assert!(deleted.is_ok());
    assert!(deleted.resources().unwrap().is_empty());

    create.assert();
    delete.assert();
}

#[test]
fn test_fetch_all_stops_without_next_url_key() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let only = server
        .mock("GET", "/v2/spaces")
        .with_status(200)
        .with_body(json!({"total_results": 1, "resources": [{"metadata": {"guid": "s1"}, "entity": {"name": "dev"}}]}).to_string())
        .expect(1)
        .create();

    let mut cc = CloudController::connect(&Config::new(server.url())).unwrap();
    let names: Vec<String> = cc
        .fetch_all("spaces", &[])
        .map(|r| r.unwrap().name().unwrap().to_string())
        .collect();

    assert_eq!(names, vec!["dev"]);
    only.assert();
}

#[test]
fn test_put_with_raw_body() {
    let mut server = Server::new();
    let _info = mock_info(&mut server);
    let _token = mock_token(&mut server, "client_credentials", &jwt(now() + 600), None);
    let update = server
        .mock("PUT", "/v2/apps/a1")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "renamed"})))
        .with_status(201)
        .with_body(json!({"metadata": {"guid": "a1"}, "entity": {"name": "renamed"}}).to_string())
        .expect(1)
        .create();

    let mut cc = CloudController::connect(&Config::new(server.url())).unwrap();
    let response = cc
        .request("/v2/apps/a1", &[])
        .set_raw_body(r#"{"name":"renamed"}"#)
        .put()
        .unwrap();

    assert!(response.is_ok());
    assert_eq!(response.resource().unwrap().unwrap().name(), Some("renamed"));
    update.assert();
}

#[test]
fn test_request_before_discovery_fails_fast() {
    let mut session = Session::new(&Config::new("http://127.0.0.1:9")).unwrap();
    let mut request = cfapi::Request::new(&mut session, "apps", &[]);

    assert!(matches!(request.get(), Err(CfError::Config(_))));
}
