//! HTTP dispatch through the in-memory test client

use http::{Method, StatusCode};
use larkspur_conf::Settings;
use larkspur_di::{Arguments, AsyncFn, BlockingFn, Parameter, Provide, Value};
use larkspur_dispatch::{Application, Header, Query, RequestData, ValidatedData};
use larkspur_exception::Error;
use larkspur_http::{PathParams, Response, Returned, Scope, SerdeSchema};
use larkspur_test::TestClient;
use larkspur_urls::{Handler, MethodEndpoint, Route, Router};
use rstest::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Puppy {
	name: String,
}

fn handler<F, Fut>(name: &str, parameters: Vec<Parameter>, f: F) -> Handler
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: std::future::Future<Output = larkspur_exception::Result<Returned>> + Send + 'static,
{
	Arc::new(AsyncFn::new(name, parameters, f))
}

fn to_data<T: Serialize>(value: &T) -> larkspur_exception::Result<Returned> {
	serde_json::to_value(value)
		.map(Returned::Data)
		.map_err(|e| Error::Internal(e.to_string()))
}

#[rstest]
#[tokio::test]
async fn test_component_value_is_serialized_through_response_schema() {
	// Arrange
	let puppy = Arc::new(Provide::new(AsyncFn::new(
		"puppy_component",
		Vec::new(),
		|_: Arguments| async {
			Ok(Puppy {
				name: "Canna".to_string(),
			})
		},
	)));
	let get_puppy = handler(
		"get_puppy",
		vec![Parameter::of::<Puppy>("puppy")],
		|args: Arguments| async move { to_data(&*args.get::<Puppy>("puppy")?) },
	);
	let mut builder = Application::builder();
	builder.add_component(puppy).add_route(
		Route::new("/puppy/", get_puppy)
			.unwrap()
			.with_response_schema(Arc::new(SerdeSchema::<Puppy>::new("Puppy"))),
	);
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let response = client.get("/puppy/").await.unwrap();

	// Assert
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.header("content-type"), Some("application/json"));
	assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({"name": "Canna"}));
}

#[rstest]
#[tokio::test]
async fn test_shared_dependency_runs_once_per_request() {
	// Arrange
	struct Connection;
	struct Repository;
	struct Audit;

	let opened = Arc::new(AtomicUsize::new(0));
	let counter = opened.clone();
	let connection = Arc::new(Provide::new(AsyncFn::new(
		"connection",
		Vec::new(),
		move |_: Arguments| {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(Connection)
			}
		},
	)));
	let repository = Arc::new(Provide::new(AsyncFn::new(
		"repository",
		vec![Parameter::of::<Connection>("connection")],
		|_: Arguments| async { Ok(Repository) },
	)));
	let audit = Arc::new(Provide::new(AsyncFn::new(
		"audit",
		vec![Parameter::of::<Connection>("connection")],
		|_: Arguments| async { Ok(Audit) },
	)));
	let index = handler(
		"index",
		vec![
			Parameter::of::<Repository>("repository"),
			Parameter::of::<Audit>("audit"),
			Parameter::of::<Connection>("connection"),
		],
		|_: Arguments| async { Ok(Returned::Empty) },
	);
	let mut builder = Application::builder();
	builder
		.add_component(connection)
		.add_component(repository)
		.add_component(audit)
		.add_route(Route::new("/", index).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	client.get("/").await.unwrap();
	client.get("/").await.unwrap();

	// Assert
	assert_eq!(opened.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case("/nothing", Method::GET, StatusCode::NOT_FOUND)]
#[case("/puppy/", Method::DELETE, StatusCode::METHOD_NOT_ALLOWED)]
#[case("/puppy/", Method::GET, StatusCode::OK)]
#[tokio::test]
async fn test_routing_outcomes(
	#[case] path: &str,
	#[case] method: Method,
	#[case] expected: StatusCode,
) {
	let mut builder = Application::builder();
	builder.add_route(
		Route::new(
			"/puppy/",
			handler("list", Vec::new(), |_| async { Ok(Returned::Empty) }),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	let response = client.request(method, path).send().await.unwrap();

	assert_eq!(response.status(), expected);
}

#[rstest]
#[tokio::test]
async fn test_method_not_allowed_lists_allowed_methods() {
	// Arrange
	let endpoint = MethodEndpoint::new("PuppyEndpoint")
		.on(
			Method::GET,
			handler("get", Vec::new(), |_| async { Ok(Returned::Empty) }),
		)
		.on(
			Method::POST,
			handler("post", Vec::new(), |_| async { Ok(Returned::Empty) }),
		);
	let mut builder = Application::builder();
	builder.add_route(Route::from_endpoint("/puppy/", Arc::new(endpoint)).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let response = client.request(Method::PUT, "/puppy/").send().await.unwrap();

	// Assert
	assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	let allow = response.header("allow").unwrap();
	for method in ["GET", "POST", "HEAD"] {
		assert!(allow.contains(method), "{} missing from {}", method, allow);
	}
}

#[rstest]
#[tokio::test]
async fn test_head_strips_body_and_keeps_length() {
	let mut builder = Application::builder();
	builder.add_route(
		Route::new(
			"/",
			handler("index", Vec::new(), |_| async { Ok(Returned::from("hello")) }),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	let response = client.request(Method::HEAD, "/").send().await.unwrap();

	assert_eq!(response.status(), StatusCode::OK);
	assert!(response.body().is_empty());
	assert_eq!(response.header("content-length"), Some("5"));
}

#[rstest]
#[tokio::test]
async fn test_query_and_path_parameters() {
	// Arrange
	let list = handler(
		"list_puppies",
		vec![
			Parameter::of::<PathParams>("path_params"),
			Parameter::of::<Query<i64>>("limit").with_default(Value::new(Query(10_i64))),
			Parameter::of::<Query<String>>("name").optional(),
		],
		|args: Arguments| async move {
			let owner = args
				.get::<PathParams>("path_params")?
				.get("owner")
				.and_then(|v| v.as_int())
				.unwrap_or_default();
			let limit = args.get::<Query<i64>>("limit")?.0;
			let name = args.optional::<Query<String>>("name").map(|q| q.0.clone());
			Ok(Returned::Data(
				json!({"owner": owner, "limit": limit, "name": name}),
			))
		},
	);
	let mut builder = Application::builder();
	builder.add_route(Route::new("/owners/{owner:int}/puppies", list).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let defaulted = client.get("/owners/7/puppies").await.unwrap();
	let explicit = client
		.get("/owners/7/puppies?limit=2&name=Canna")
		.await
		.unwrap();
	let invalid = client.get("/owners/7/puppies?limit=lots").await.unwrap();

	// Assert
	assert_eq!(
		defaulted.json::<serde_json::Value>().unwrap(),
		json!({"owner": 7, "limit": 10, "name": null})
	);
	assert_eq!(
		explicit.json::<serde_json::Value>().unwrap(),
		json!({"owner": 7, "limit": 2, "name": "Canna"})
	);
	assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_missing_required_query_is_bad_request() {
	// Arrange
	let page = handler(
		"page",
		vec![Parameter::of::<Query<i64>>("limit")],
		|args: Arguments| async move { Ok(Returned::from(args.get::<Query<i64>>("limit")?.0.to_string())) },
	);
	let mut builder = Application::builder();
	builder.add_route(Route::new("/p", page).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let missing = client.get("/p").await.unwrap();
	let given = client.get("/p?limit=3").await.unwrap();

	// Assert
	assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
	let body: serde_json::Value = missing.json().unwrap();
	assert_eq!(body["detail"][0]["field"], "limit");
	assert_eq!(given.text(), "3");
}

#[rstest]
#[tokio::test]
async fn test_header_component() {
	let whoami = handler(
		"whoami",
		vec![Parameter::of::<Header>("x_user").optional()],
		|args: Arguments| async move {
			Ok(Returned::from(
				args.optional::<Header>("x_user")
					.map(|h| h.0.clone())
					.unwrap_or_else(|| "anonymous".to_string()),
			))
		},
	);
	let mut builder = Application::builder();
	builder.add_route(Route::new("/whoami", whoami).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	let named = client
		.request(Method::GET, "/whoami")
		.header("x-user", "canna")
		.send()
		.await
		.unwrap();
	let anonymous = client.get("/whoami").await.unwrap();

	assert_eq!(named.text(), "canna");
	assert_eq!(anonymous.text(), "anonymous");
}

#[fixture]
fn puppy_api() -> TestClient {
	let create = handler(
		"create_puppy",
		vec![Parameter::of::<ValidatedData>("data")],
		|args: Arguments| async move {
			let data = args.get::<ValidatedData>("data")?;
			Ok(Returned::Response(
				Response::json(&data.0)?.with_status(StatusCode::CREATED),
			))
		},
	);
	let echo = handler(
		"echo",
		vec![Parameter::of::<RequestData>("data")],
		|args: Arguments| async move { Ok(Returned::Data(args.get::<RequestData>("data")?.0.clone())) },
	);
	let mut builder = Application::builder();
	builder
		.add_route(
			Route::new("/puppy/", create)
				.unwrap()
				.with_methods([Method::POST])
				.with_request_schema(Arc::new(SerdeSchema::<Puppy>::new("Puppy"))),
		)
		.add_route(
			Route::new("/echo/", echo)
				.unwrap()
				.with_methods([Method::POST]),
		);
	TestClient::new(builder.build().unwrap())
}

#[rstest]
#[tokio::test]
async fn test_valid_body_passes_request_schema(puppy_api: TestClient) {
	let response = puppy_api
		.post_json("/puppy/", &json!({"name": "Canna"}))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::CREATED);
	assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({"name": "Canna"}));
}

#[rstest]
#[tokio::test]
async fn test_invalid_body_is_rejected_with_field_detail(puppy_api: TestClient) {
	// Act
	let response = puppy_api
		.post_json("/puppy/", &json!({"title": "Canna"}))
		.await
		.unwrap();

	// Assert
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body: serde_json::Value = response.json().unwrap();
	assert_eq!(body["detail"][0]["field"], "name");
}

#[rstest]
#[case("application/json", r#"{"a": 1}"#, StatusCode::OK)]
#[case("application/json", "{", StatusCode::BAD_REQUEST)]
#[case("text/csv", "a,b", StatusCode::UNSUPPORTED_MEDIA_TYPE)]
#[tokio::test]
async fn test_request_data_media_types(
	puppy_api: TestClient,
	#[case] content_type: &str,
	#[case] body: &'static str,
	#[case] expected: StatusCode,
) {
	let response = puppy_api
		.request(Method::POST, "/echo/")
		.header("content-type", content_type)
		.body(body)
		.send()
		.await
		.unwrap();

	assert_eq!(response.status(), expected);
}

#[rstest]
#[tokio::test]
async fn test_panicking_handler_is_a_server_error() {
	let mut builder = Application::builder();
	builder.add_route(
		Route::new(
			"/boom",
			handler("boom", Vec::new(), |_| async {
				let puppies: Vec<Puppy> = Vec::new();
				Ok(Returned::from(puppies[0].name.clone()))
			}),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	let response = client.get("/boom").await.unwrap();

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		response.json::<serde_json::Value>().unwrap(),
		json!({"detail": "Internal Server Error"})
	);
}

#[rstest]
#[tokio::test]
async fn test_debug_setting_exposes_error_text() {
	let settings = Settings {
		debug: true,
		..Settings::default()
	};
	let mut builder = Application::with_settings(settings);
	builder.add_route(
		Route::new(
			"/fail",
			handler("fail", Vec::new(), |_| async {
				Err::<Returned, _>(Error::Internal("disk full".to_string()))
			}),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	let response = client.get("/fail").await.unwrap();

	let body: serde_json::Value = response.json().unwrap();
	assert_eq!(body["error"], "Internal error: disk full");
}

#[rstest]
#[tokio::test]
async fn test_blocking_handler_runs_on_worker_pool() {
	let compute: Handler = Arc::new(BlockingFn::new("compute", Vec::new(), |_: Arguments| {
		std::thread::sleep(std::time::Duration::from_millis(5));
		Ok(Returned::from("done"))
	}));
	let mut builder = Application::builder();
	builder.add_route(Route::new("/compute", compute).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	let response = client.get("/compute").await.unwrap();

	assert_eq!(response.text(), "done");
}

#[rstest]
#[tokio::test]
async fn test_mounted_handler_sees_root_path() {
	// Arrange
	let whereami = handler(
		"whereami",
		vec![Parameter::of::<Scope>("scope")],
		|args: Arguments| async move {
			let scope = args.get::<Scope>("scope")?;
			Ok(Returned::Data(
				json!({"root_path": scope.root_path, "path": scope.path}),
			))
		},
	);
	let mut builder = Application::builder();
	builder
		.mount("/api", Router::new())
		.unwrap()
		.mount("/v1", Router::new())
		.unwrap()
		.add_route(Route::new("/where", whereami).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let response = client.get("/api/v1/where").await.unwrap();

	// Assert
	assert_eq!(
		response.json::<serde_json::Value>().unwrap(),
		json!({"root_path": "/api/v1", "path": "/where"})
	);
}

#[rstest]
#[tokio::test]
async fn test_mounted_components_are_visible_app_wide() {
	// Arrange
	struct Tenant(&'static str);

	let tenant = Arc::new(Provide::new(AsyncFn::new(
		"tenant",
		Vec::new(),
		|_: Arguments| async { Ok(Tenant("acme")) },
	)));
	let show = handler(
		"show_tenant",
		vec![Parameter::of::<Tenant>("tenant")],
		|args: Arguments| async move { Ok(Returned::from(args.get::<Tenant>("tenant")?.0)) },
	);
	let mut tenants = Router::new();
	tenants
		.add_component(tenant)
		.add_route(Route::new("/current", show).unwrap());
	let root = handler(
		"root_tenant",
		vec![Parameter::of::<Tenant>("tenant")],
		|args: Arguments| async move { Ok(Returned::from(args.get::<Tenant>("tenant")?.0)) },
	);
	let mut builder = Application::builder();
	builder.add_route(Route::new("/tenant", root).unwrap());
	builder.mount("/tenants", tenants).unwrap();
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let mounted = client.get("/tenants/current").await.unwrap();
	let top_level = client.get("/tenant").await.unwrap();

	// Assert
	assert_eq!(mounted.text(), "acme");
	assert_eq!(top_level.status(), StatusCode::OK);
	assert_eq!(top_level.text(), "acme");
}
