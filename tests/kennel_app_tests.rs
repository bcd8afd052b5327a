//! A small puppy kennel application exercised through the facade crate

use larkspur::di::{Arguments, AsyncFn, Parameter, Provide};
use larkspur::dispatch::ValidatedData;
use larkspur::http::{Code, Data, Encoding, Frame, Message, PathParams, SerdeSchema};
use larkspur::test::TestClient;
use larkspur::urls::{Handler, Hook};
use larkspur::{
	Application, Error, Method, Response, Returned, Route, Router, Settings, StatusCode, WebSocket,
	WebSocketEndpoint, WebSocketRoute,
};
use rstest::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Puppy {
	name: String,
}

#[derive(Clone, Default)]
struct Kennel(Arc<Mutex<Vec<Puppy>>>);

fn handler<F, Fut>(name: &str, parameters: Vec<Parameter>, f: F) -> Handler
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = larkspur::Result<Returned>> + Send + 'static,
{
	Arc::new(AsyncFn::new(name, parameters, f))
}

fn hook<F, Fut>(name: &str, parameters: Vec<Parameter>, f: F) -> Hook
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = larkspur::Result<()>> + Send + 'static,
{
	Arc::new(AsyncFn::new(name, parameters, f))
}

fn internal(e: impl std::fmt::Display) -> Error {
	Error::Internal(e.to_string())
}

fn puppy_routes() -> Router {
	let list = handler(
		"list_puppies",
		vec![Parameter::of::<Kennel>("kennel")],
		|args: Arguments| async move {
			let kennel = args.get::<Kennel>("kennel")?;
			let puppies = kennel.0.lock().unwrap().clone();
			serde_json::to_value(puppies).map(Returned::Data).map_err(internal)
		},
	);
	let create = handler(
		"create_puppy",
		vec![
			Parameter::of::<Kennel>("kennel"),
			Parameter::of::<ValidatedData>("data"),
		],
		|args: Arguments| async move {
			let data = args.get::<ValidatedData>("data")?;
			let puppy: Puppy = serde_json::from_value(data.0.clone()).map_err(internal)?;
			args.get::<Kennel>("kennel")?.0.lock().unwrap().push(puppy);
			Ok(Returned::Response(
				Response::json(&data.0)?.with_status(StatusCode::CREATED),
			))
		},
	);
	let detail = handler(
		"puppy_detail",
		vec![
			Parameter::of::<Kennel>("kennel"),
			Parameter::of::<PathParams>("path_params"),
		],
		|args: Arguments| async move {
			let index = args
				.get::<PathParams>("path_params")?
				.get("id")
				.and_then(|v| v.as_int())
				.unwrap_or_default();
			let puppy = args
				.get::<Kennel>("kennel")?
				.0
				.lock()
				.unwrap()
				.get(index as usize)
				.cloned()
				.ok_or(Error::NotFound)?;
			serde_json::to_value(puppy).map(Returned::Data).map_err(internal)
		},
	);

	let mut router = Router::new();
	router
		.add_route(Route::new("/puppy/", list).unwrap().with_name("list"))
		.add_route(
			Route::new("/puppy/", create)
				.unwrap()
				.with_methods([Method::POST])
				.with_request_schema(Arc::new(SerdeSchema::<Puppy>::new("Puppy"))),
		)
		.add_route(
			Route::new("/puppy/{id:int}/", detail)
				.unwrap()
				.with_name("detail")
				.with_response_schema(Arc::new(SerdeSchema::<Puppy>::new("Puppy"))),
		);
	router
}

fn barker() -> Arc<WebSocketEndpoint> {
	let on_receive = hook(
		"on_receive",
		vec![
			Parameter::of::<WebSocket>("websocket"),
			Parameter::of::<Data>("data"),
		],
		|args: Arguments| async move {
			let websocket = args.get::<WebSocket>("websocket")?;
			if let Data::Text(text) = args.get::<Data>("data")?.as_ref() {
				websocket.send_text(text.to_uppercase()).await?;
			}
			Ok(())
		},
	);
	let on_disconnect = hook(
		"on_disconnect",
		vec![
			Parameter::of::<WebSocket>("websocket"),
			Parameter::of::<Code>("websocket_code"),
		],
		|args: Arguments| async move {
			let code = args.get::<Code>("websocket_code")?.0;
			args.get::<WebSocket>("websocket")?.close(code).await
		},
	);
	Arc::new(
		WebSocketEndpoint::new("Barker")
			.with_encoding(Encoding::Text)
			.on_receive(on_receive)
			.on_disconnect(on_disconnect),
	)
}

#[fixture]
fn kennel_app() -> (TestClient, Kennel) {
	let kennel = Kennel::default();
	let shared = kennel.clone();
	let component = Arc::new(Provide::new(AsyncFn::new(
		"kennel",
		Vec::new(),
		move |_: Arguments| {
			let kennel = shared.clone();
			async move { Ok(kennel) }
		},
	)));
	let settings = Settings::from_toml_str("app_name = \"kennel\"\nworker_threads = 2").unwrap();

	let mut builder = Application::with_settings(settings);
	builder.add_component(component);
	builder.mount_named("/api", "api", puppy_routes()).unwrap();
	builder.add_websocket_route(
		WebSocketRoute::from_endpoint("/bark", barker())
			.unwrap()
			.with_name("bark"),
	);
	(TestClient::new(builder.build().unwrap()), kennel)
}

#[rstest]
#[tokio::test]
async fn test_created_puppies_are_listed_and_retrieved(kennel_app: (TestClient, Kennel)) {
	// Arrange
	let (client, kennel) = kennel_app;

	// Act
	let created = client
		.post_json("/api/puppy/", &json!({"name": "Canna"}))
		.await
		.unwrap();
	let listed = client.get("/api/puppy/").await.unwrap();
	let detail = client.get("/api/puppy/0/").await.unwrap();
	let missing = client.get("/api/puppy/5/").await.unwrap();

	// Assert
	assert_eq!(created.status(), StatusCode::CREATED);
	assert_eq!(
		listed.json::<serde_json::Value>().unwrap(),
		json!([{"name": "Canna"}])
	);
	assert_eq!(detail.json::<Puppy>().unwrap().name, "Canna");
	assert_eq!(missing.status(), StatusCode::NOT_FOUND);
	assert_eq!(kennel.0.lock().unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_invalid_puppy_is_not_stored(kennel_app: (TestClient, Kennel)) {
	let (client, kennel) = kennel_app;

	let response = client
		.post_json("/api/puppy/", &json!({"title": "Canna"}))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(kennel.0.lock().unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_unsupported_method_and_unknown_path(kennel_app: (TestClient, Kennel)) {
	let (client, _) = kennel_app;

	let deleted = client.request(Method::DELETE, "/api/puppy/").send().await.unwrap();
	let unknown = client.get("/api/kitten/").await.unwrap();

	assert_eq!(deleted.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[rstest]
fn test_reverse_lookup_and_schema_routes(kennel_app: (TestClient, Kennel)) {
	// Arrange
	let (client, _) = kennel_app;
	let app = client.app();
	let params = HashMap::from([("id".to_string(), "3".to_string())]);

	// Act
	let detail = app.url_path_for("api:detail", &params).unwrap();
	let bark = app.url_path_for("bark", &HashMap::new()).unwrap();
	let schema_paths: Vec<_> = app.schema_routes().into_iter().map(|r| r.path).collect();

	// Assert
	assert_eq!(detail, "/api/puppy/3/");
	assert_eq!(bark, "/bark");
	assert_eq!(
		schema_paths,
		vec!["/api/puppy/", "/api/puppy/", "/api/puppy/{id:int}/"]
	);
	assert_eq!(app.settings().app_name, "kennel");
}

#[rstest]
#[tokio::test]
async fn test_barker_echoes_uppercase_and_closes_with_peer_code(
	kennel_app: (TestClient, Kennel),
) {
	// Arrange
	let (client, _) = kennel_app;

	// Act
	let sent = client
		.websocket("/bark")
		.connect()
		.send_text("woof")
		.disconnect(1001)
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(
		sent,
		vec![
			Message::WebSocketAccept { subprotocol: None },
			Message::WebSocketSend(Frame::Text("WOOF".to_string())),
			Message::WebSocketClose {
				code: 1001,
				reason: String::new(),
			},
		]
	);
}
