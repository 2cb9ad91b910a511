//! Integration tests for registering routes and serving them.
//!
//! Routes are registered on a real [`Router`] and exercised through the
//! [`TestClient`].

use regex::Regex;
use routeweave::prelude::*;
use routeweave::{Chain, ValidationStage, validation_details};
use routeweave_testing::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counting_handler(calls: Arc<AtomicUsize>) -> Stage {
    named_handler_fn("counted", move |_ctx| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::ok().with_body("handled"))
        }
    })
}

fn client(registrar: RouteRegistrar<Router>) -> TestClient {
    TestClient::from_router(registrar.into_table())
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_malformed_descriptors_register_nothing() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());
    let handler = MockStage::handler("h").stage();

    let cases: Vec<(RouteValue, &str)> = vec![
        (
            RouteValue::object().with("path", "/").with("config", RouteValue::object().with("handler", handler.clone())),
            "'method' missing from route",
        ),
        (
            RouteValue::object().with("method", "get").with("config", RouteValue::object().with("handler", handler.clone())),
            "'path' missing from route",
        ),
        (
            RouteValue::object().with("method", "get").with("path", "/"),
            "'config' missing from route",
        ),
        (
            RouteValue::object().with("method", "get").with("path", "/").with("config", "handler"),
            "'config' must be an object for route",
        ),
        (
            RouteValue::object().with("method", "get").with("path", "/").with("config", RouteValue::object()),
            "'handler' missing from route.config",
        ),
    ];

    for (route, expected) in cases {
        let err = registrar.add_route(route).unwrap_err();
        assert!(
            matches!(err, RegistrationError::MalformedDescriptor { ref reason, .. } if reason == expected),
            "unexpected error: {}",
            err
        );
    }
    assert!(table.is_empty());
    assert_eq!(registrar.registered(), 0);
}

#[test]
fn test_non_stage_handler_is_rejected() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());
    let route = RouteValue::from(json!({
        "method": "get",
        "path": "/",
        "config": {"handler": "not a stage"}
    }));

    let err = registrar.add_route(route).unwrap_err();
    assert!(err.to_string().starts_with("'handler' must be a stage"));
    assert!(err.to_string().contains("\"path\":\"/\""));
    assert!(table.is_empty());
}

#[test]
fn test_method_names_ignore_case() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());

    registrar
        .add_route(Route::new("GET", "/upper").handler(MockStage::handler("a").stage()))
        .unwrap();
    registrar
        .add_route(Route::new("get", "/lower").handler(MockStage::handler("b").stage()))
        .unwrap();

    assert!(table.was_registered(RouteMethod::Get, "/upper"));
    assert!(table.was_registered(RouteMethod::Get, "/lower"));
}

#[test]
fn test_unsupported_method() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());

    let err = registrar
        .add_route(Route::new("patch", "/users/{id}").handler(MockStage::handler("h").stage()))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::UnsupportedMethod { ref method, .. } if method == "patch"));
    assert!(err.to_string().starts_with("patch not supported"));
    assert!(table.is_empty());
}

#[test]
fn test_add_routes_is_best_effort() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());
    let routes = RouteValue::Array(vec![
        Route::get("/a").handler(MockStage::handler("a").stage()).into(),
        Route::get("/b").into(),
        Route::get("/c").handler(MockStage::handler("c").stage()).into(),
    ]);

    assert!(registrar.add_routes(routes).is_err());
    assert_eq!(table.calls(), vec![(RouteMethod::Get, "/a".to_string())]);
}

#[test]
fn test_add_routes_atomic_registers_nothing_on_error() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());
    let routes = RouteValue::Array(vec![
        Route::get("/a").handler(MockStage::handler("a").stage()).into(),
        Route::new("connect", "/b").handler(MockStage::handler("b").stage()).into(),
    ]);

    assert!(matches!(
        registrar.add_routes_atomic(routes),
        Err(RegistrationError::UnsupportedMethod { .. })
    ));
    assert!(table.is_empty());
}

#[test]
fn test_add_routes_requires_an_array() {
    let mut registrar = RouteRegistrar::new(RecordingRouteTable::new());
    assert!(matches!(
        registrar.add_routes(Route::get("/").handler(MockStage::handler("h").stage())),
        Err(RegistrationError::TypeMismatch { subject: "routes", .. })
    ));
}

#[test]
fn test_chain_order() {
    let table = RecordingRouteTable::new();
    let mut registrar = RouteRegistrar::new(table.clone());

    registrar
        .add_route(
            Route::post("/users")
                .middleware(MockStage::passthrough("auth").stage())
                .middleware(MockStage::passthrough("audit").stage())
                .validate(Facet::Body, Schema::object())
                .handler(MockStage::handler("create").stage()),
        )
        .unwrap();

    let registration = table.find(RouteMethod::Post, "/users").unwrap();
    assert_eq!(
        registration.stage_names(),
        vec!["failure_capability", "validate", "auth", "audit", "create"]
    );
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_facet_answers_400_without_running_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(
            Route::get("/users/{id}")
                .validate(Facet::Params, Schema::object().key("id", Schema::number().integer()))
                .handler(counting_handler(calls.clone())),
        )
        .unwrap();
    let client = client(registrar);

    let ok = client.get("/users/42").await;
    assert_status(&ok, 200);
    assert_body_contains(&ok, "handled");

    let bad = client.get("/users/abc").await;
    assert_failure(&bad, 400, "\"id\" must be a number");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_body_is_checked_before_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(
            Route::post("/search")
                .validate(Facet::Query, Schema::object().key("q", Schema::string().required()))
                .validate(Facet::Body, Schema::object().key("name", Schema::string().required()))
                .handler(counting_handler(calls.clone())),
        )
        .unwrap();
    let client = client(registrar);

    let response = client.post_json("/search", &json!({})).await;
    assert_failure(&response, 400, "\"name\" is required");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_body_still_checks_required_keys() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(
            Route::post("/users")
                .validate(Facet::Body, Schema::object().key("name", Schema::string().required()))
                .handler(counting_handler(calls.clone())),
        )
        .unwrap();
    let client = client(registrar);

    let empty = client.post("/users", Vec::new()).await;
    assert_failure(&empty, 400, "\"name\" is required");

    let braces = client.post_json("/users", &json!({})).await;
    assert_failure(&braces, 400, "\"name\" is required");

    assert_status(&client.post_json("/users", &json!({"name": "ada"})).await, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_type_keys_in_literal_schemas() {
    let mut config = RouteValue::from(json!({"validate": {"body": {"type": "signup"}}}));
    config.insert("handler", MockStage::handler("events").stage());
    let events = RouteValue::object()
        .with("method", "post")
        .with("path", "/events")
        .with("config", config);

    let mut registrar = RouteRegistrar::new(Router::new());
    registrar.add_route(events).unwrap();
    registrar
        .add_route(
            Route::post("/users")
                .validate(Facet::Body, json!({"type": "user", "name": "x"}))
                .handler(MockStage::handler("users").stage()),
        )
        .unwrap();
    let client = client(registrar);

    assert_status(&client.post_json("/events", &json!({"type": "signup"})).await, 200);
    assert_failure(
        &client.post_json("/events", &json!({"type": "login"})).await,
        400,
        "\"type\" must be one of [signup]",
    );
    assert_status(&client.post_json("/users", &json!({"type": "user", "name": "x"})).await, 200);
    assert_client_error(&client.post_json("/users", &json!({"type": "user", "name": "y"})).await);
}

#[tokio::test]
async fn test_literal_schemas_and_options() {
    let options = RegistrarOptions::new()
        .with_validation(ValidationOptions::default().allow_unknown(true));
    let mut registrar = RouteRegistrar::with_options(Router::new(), options);
    registrar
        .add_route(
            Route::get("/reports")
                .validate(Facet::Query, json!({"format": ["csv", "json"]}))
                .handler(MockStage::handler("reports").stage()),
        )
        .unwrap();
    let client = client(registrar);

    let ok = TestRequestBuilder::new("GET", "/reports")
        .query("format", "csv")
        .query("page", "2")
        .send(&client)
        .await;
    assert_status(&ok, 200);

    let bad = TestRequestBuilder::new("GET", "/reports")
        .query("format", "xml")
        .send(&client)
        .await;
    assert_failure(&bad, 400, "\"format\" must be one of [csv, json]");
}

#[tokio::test]
async fn test_validation_needs_the_failure_capability() {
    let schemas = [(
        "body".to_string(),
        RouteValue::from(Schema::object().key("age", Schema::number())),
    )]
    .into_iter()
    .collect();
    let stage: Stage =
        Arc::new(ValidationStage::build(&schemas, Arc::new(ValidationOptions::default())).unwrap());

    // A chain assembled by hand, without the capability stage in front.
    let mut router = Router::new();
    router
        .post(
            "/users",
            Chain::new(vec![stage, MockStage::handler("create").stage()]),
        )
        .unwrap();

    let result = router
        .dispatch(
            HttpRequest::new("POST", "/users")
                .with_json(&json!({"age": "old"}))
                .unwrap(),
        )
        .await;
    assert!(matches!(result, Err(Error::CapabilityMissing(_))));
}

#[test]
fn test_validation_failures_carry_details() {
    let errors = Schema::object()
        .key("age", Schema::number())
        .validate(Some(&json!({"age": "old"})), &ValidationOptions::default().convert(false))
        .unwrap_err();
    let failure = Failure::wrap(errors, 400).with_data(json!({"facet": "body"}));
    assert_eq!(failure.status(), 400);
    assert_eq!(failure.message(), "\"age\" must be a number");
    assert_eq!(validation_details(&failure).unwrap()["facet"], "body");
}

// =============================================================================
// Failure capability
// =============================================================================

#[tokio::test]
async fn test_handler_failures_are_rendered() {
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(Route::get("/teapot").handler(named_handler_fn("teapot", |ctx| async move {
            ctx.respond_with_failure(
                Failure::new(418, "short and stout").with_header("X-Pot", "tea"),
            )
        })))
        .unwrap();
    registrar
        .add_route(Route::get("/taken").handler(named_handler_fn("taken", |_ctx| async {
            Err(Failure::conflict("name taken").into())
        })))
        .unwrap();
    let client = client(registrar);

    let teapot = client.get("/teapot").await;
    assert_failure(&teapot, 418, "short and stout");
    assert_header(&teapot, "X-Pot", "tea");

    let taken = client.get("/taken").await;
    assert_failure(&taken, 409, "name taken");
}

#[tokio::test]
async fn test_non_failure_objects_are_refused() {
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(Route::get("/oops").handler(named_handler_fn("oops", |ctx| async move {
            ctx.respond_with_failure("just a string")
        })))
        .unwrap();
    let router = registrar.into_table();

    let result = router.dispatch(HttpRequest::new("GET", "/oops")).await;
    assert!(matches!(result, Err(Error::InvalidFailureObject(ref m)) if m == "just a string"));
}

#[tokio::test]
async fn test_transform_rewrites_payloads() {
    let options = RegistrarOptions::new().with_transform(|mut payload| {
        payload["requestFailed"] = json!(true);
        payload
    });
    let mut registrar = RouteRegistrar::with_options(Router::new(), options);
    registrar
        .add_route(
            Route::post("/users")
                .validate(Facet::Body, Schema::object().key("name", Schema::string().required()))
                .handler(MockStage::handler("create").stage()),
        )
        .unwrap();
    let client = client(registrar);

    let response = client.post_json("/users", &json!({})).await;
    assert_json(
        &response,
        &json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "\"name\" is required",
            "requestFailed": true
        }),
    );
}

#[tokio::test]
async fn test_each_request_gets_its_own_responder() {
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(Route::get("/whoami").handler(named_handler_fn("whoami", |ctx| async move {
            let id = ctx.failure_responder()?.id();
            tokio::task::yield_now().await;
            Ok(HttpResponse::ok().with_body(id.to_string()))
        })))
        .unwrap();
    let client = Arc::new(client(registrar));

    let (a, b) = tokio::join!(client.get("/whoami"), client.get("/whoami"));
    let (a, b) = (a.body_string().unwrap(), b.body_string().unwrap());

    let uuid = Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap();
    assert!(uuid.is_match(&a), "not a v4 uuid: {}", a);
    assert!(uuid.is_match(&b), "not a v4 uuid: {}", b);
    assert_ne!(a, b);

    let spawned = {
        let client = client.clone();
        tokio::spawn(async move { client.get("/whoami").await.body_string().unwrap() })
    };
    assert_ne!(spawned.await.unwrap(), a);
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_get_routes_answer_head() {
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(Route::get("/health").handler(MockStage::handler("health").stage()))
        .unwrap();
    let client = client(registrar);

    let head = client.request("HEAD", "/health", None).await;
    assert_status(&head, 200);
    assert_eq!(head.body_string().unwrap(), "");

    let post = client.post("/health", Vec::new()).await;
    assert!(matches!(post.assert_error(), Error::MethodNotAllowed(_)));
}

#[tokio::test]
async fn test_all_matches_any_method() {
    let mut registrar = RouteRegistrar::new(Router::new());
    let stage = MockStage::handler("any");
    registrar
        .add_route(Route::all("/ping").handler(stage.stage()))
        .unwrap();
    let client = client(registrar);

    assert_status(&client.get("/ping").await, 200);
    assert_status(&client.delete("/ping").await, 200);
    assert_eq!(stage.get_calls(), vec!["GET /ping", "DELETE /ping"]);
}

#[tokio::test]
async fn test_conflicting_paths_surface_router_errors() {
    let mut registrar = RouteRegistrar::new(Router::new());
    registrar
        .add_route(Route::get("/files/{id}").handler(MockStage::handler("a").stage()))
        .unwrap();
    let err = registrar
        .add_route(Route::get("/files/{name}").handler(MockStage::handler("b").stage()))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Router { source: Error::InvalidRoute { .. }, .. }
    ));
    assert_eq!(registrar.registered(), 1);
}

// =============================================================================
// Route files
// =============================================================================

#[tokio::test]
async fn test_routes_from_file() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::new()
        .with("users.show", counting_handler(calls.clone()))
        .with("auth", MockStage::passthrough("auth").stage());

    let path = std::env::temp_dir().join(format!("routeweave-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"
        [[routes]]
        method = "get"
        path = "/users/{id}"
        config.handler = "users.show"
        config.middleware = "auth"
        config.validate.params = { id = { "$schema" = { type = "number", integer = true } } }
        "#,
    )
    .unwrap();

    let routes = RouteLoader::new(registry).load_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut registrar = RouteRegistrar::new(Router::new());
    registrar.add_routes(routes).unwrap();
    let client = client(registrar);

    assert_status(&client.get("/users/7").await, 200);
    assert_failure(&client.get("/users/x").await, 400, "\"id\" must be a number");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
