//! WebSocket endpoint lifecycle

use larkspur_di::{Arguments, AsyncFn, Parameter, Provide};
use larkspur_dispatch::{Application, Data};
use larkspur_exception::{Error, Result};
use larkspur_http::{Code, Encoding, Frame, Message, WebSocket};
use larkspur_test::{TestClient, WebSocketScript};
use larkspur_urls::{Hook, WebSocketEndpoint, WebSocketRoute};
use rstest::*;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
	fn push(&self, entry: impl Into<String>) {
		self.0.lock().unwrap().push(entry.into());
	}

	fn entries(&self) -> Vec<String> {
		self.0.lock().unwrap().clone()
	}
}

fn hook<F, Fut>(name: &str, parameters: Vec<Parameter>, f: F) -> Hook
where
	F: Fn(Arguments) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<()>> + Send + 'static,
{
	Arc::new(AsyncFn::new(name, parameters, f))
}

fn accepting(journal: &Arc<Journal>) -> Hook {
	let journal = journal.clone();
	hook(
		"on_connect",
		vec![Parameter::of::<WebSocket>("websocket")],
		move |args: Arguments| {
			let journal = journal.clone();
			async move {
				args.get::<WebSocket>("websocket")?.accept(None).await?;
				journal.push("connect");
				Ok(())
			}
		},
	)
}

/// Records every message; fails on the text `fail` with `failure`.
fn recording(journal: &Arc<Journal>, failure: fn() -> Error) -> Hook {
	let journal = journal.clone();
	hook(
		"on_receive",
		vec![Parameter::of::<Data>("data")],
		move |args: Arguments| {
			let journal = journal.clone();
			async move {
				let data = args.get::<Data>("data")?;
				let text = match data.as_ref() {
					Data::Text(text) => text.clone(),
					other => format!("{:?}", other),
				};
				journal.push(format!("receive:{}", text));
				if text == "fail" {
					return Err(failure());
				}
				Ok(())
			}
		},
	)
}

fn closing(journal: &Arc<Journal>) -> Hook {
	let journal = journal.clone();
	hook(
		"on_disconnect",
		vec![Parameter::of::<Code>("websocket_code")],
		move |args: Arguments| {
			let journal = journal.clone();
			async move {
				journal.push(format!("disconnect:{}", args.get::<Code>("websocket_code")?.0));
				Ok(())
			}
		},
	)
}

fn unexpected() -> Error {
	Error::Internal("database unavailable".to_string())
}

fn client(endpoint: WebSocketEndpoint) -> TestClient {
	let mut builder = Application::builder();
	builder.add_websocket_route(
		WebSocketRoute::from_endpoint("/ws", Arc::new(endpoint.with_encoding(Encoding::Text)))
			.unwrap(),
	);
	TestClient::new(builder.build().unwrap())
}

fn journaled(journal: &Arc<Journal>) -> WebSocketEndpoint {
	WebSocketEndpoint::new("Journaled")
		.on_connect(accepting(journal))
		.on_receive(recording(journal, unexpected))
		.on_disconnect(closing(journal))
}

fn close(code: u16) -> Message {
	Message::WebSocketClose {
		code,
		reason: String::new(),
	}
}

#[rstest]
#[tokio::test]
async fn test_hooks_fire_in_order_with_peer_close_code() {
	// Arrange
	let journal = Arc::new(Journal::default());
	let client = client(journaled(&journal));

	// Act
	let sent = client
		.websocket("/ws")
		.connect()
		.send_text("first")
		.send_text("second")
		.disconnect(1001)
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(
		journal.entries(),
		vec!["connect", "receive:first", "receive:second", "disconnect:1001"]
	);
	assert_eq!(sent, vec![Message::WebSocketAccept { subprotocol: None }]);
}

#[rstest]
#[tokio::test]
async fn test_failing_receive_hook_closes_with_internal_error() {
	// Arrange
	let journal = Arc::new(Journal::default());
	let client = client(journaled(&journal));

	// Act
	let sent = client
		.websocket("/ws")
		.connect()
		.send_text("ok")
		.send_text("fail")
		.send_text("never read")
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(
		journal.entries(),
		vec!["connect", "receive:ok", "receive:fail", "disconnect:1011"]
	);
	assert_eq!(sent.last(), Some(&close(1011)));
}

#[rstest]
#[tokio::test]
async fn test_application_close_code_is_kept() {
	let journal = Arc::new(Journal::default());
	let endpoint = WebSocketEndpoint::new("Strict")
		.on_connect(accepting(&journal))
		.on_receive(recording(&journal, || Error::WebSocket {
			code: 4000,
			reason: "policy".to_string(),
		}))
		.on_disconnect(closing(&journal));
	let client = client(endpoint);

	let sent = client
		.websocket("/ws")
		.connect()
		.send_text("fail")
		.run()
		.await
		.unwrap();

	assert_eq!(journal.entries().last().unwrap(), "disconnect:4000");
	assert_eq!(sent.last(), Some(&close(4000)));
}

#[rstest]
#[tokio::test]
async fn test_failing_connect_still_runs_disconnect_once() {
	// Arrange
	let journal = Arc::new(Journal::default());
	let refusing = hook("on_connect", Vec::new(), |_: Arguments| async {
		Err::<(), _>(Error::Internal("refused".to_string()))
	});
	let endpoint = WebSocketEndpoint::new("Refusing")
		.on_connect(refusing)
		.on_receive(recording(&journal, unexpected))
		.on_disconnect(closing(&journal));
	let client = client(endpoint);

	// Act
	let sent = client
		.websocket("/ws")
		.connect()
		.send_text("ignored")
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(journal.entries(), vec!["disconnect:1011"]);
	assert_eq!(sent, vec![close(1011)]);
}

#[rstest]
#[tokio::test]
async fn test_default_hooks_accept_and_close() {
	let client = client(WebSocketEndpoint::new("Silent"));

	let sent = client
		.websocket("/ws")
		.connect()
		.send_text("hello")
		.disconnect(1000)
		.run()
		.await
		.unwrap();

	assert_eq!(
		sent,
		vec![Message::WebSocketAccept { subprotocol: None }, close(1000)]
	);
}

#[rstest]
#[tokio::test]
async fn test_undecodable_frame_closes_with_unsupported_data() {
	// Arrange
	let journal = Arc::new(Journal::default());
	let mut builder = Application::builder();
	builder.add_websocket_route(
		WebSocketRoute::from_endpoint(
			"/json",
			Arc::new(journaled(&journal).with_encoding(Encoding::Json)),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	// Act
	client
		.websocket("/json")
		.connect()
		.send_text("not json")
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(journal.entries(), vec!["connect", "disconnect:1003"]);
}

#[rstest]
#[tokio::test]
async fn test_every_message_gets_a_fresh_resolution() {
	// Arrange
	struct Shout(String);

	let resolutions = Arc::new(AtomicUsize::new(0));
	let counter = resolutions.clone();
	let shout = Arc::new(Provide::new(AsyncFn::new(
		"shout",
		vec![Parameter::of::<Data>("data")],
		move |args: Arguments| {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				match args.get::<Data>("data")?.as_ref() {
					Data::Text(text) => Ok(Shout(text.to_uppercase())),
					_ => Err(Error::validation("data", "expected text")),
				}
			}
		},
	)));
	let journal = Arc::new(Journal::default());
	let log = journal.clone();
	let on_receive = hook(
		"on_receive",
		vec![Parameter::of::<Shout>("shout")],
		move |args: Arguments| {
			let log = log.clone();
			async move {
				log.push(args.get::<Shout>("shout")?.0.clone());
				Ok(())
			}
		},
	);
	let mut builder = Application::builder();
	builder.add_component(shout).add_websocket_route(
		WebSocketRoute::from_endpoint(
			"/ws",
			Arc::new(
				WebSocketEndpoint::new("Shouting")
					.with_encoding(Encoding::Text)
					.on_receive(on_receive),
			),
		)
		.unwrap(),
	);
	let client = TestClient::new(builder.build().unwrap());

	// Act
	client
		.websocket("/ws")
		.connect()
		.send_text("woof")
		.send_text("arf")
		.disconnect(1000)
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(journal.entries(), vec!["WOOF", "ARF"]);
	assert_eq!(resolutions.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test]
async fn test_cancelled_session_still_runs_disconnect_hook() {
	// Arrange
	let journal = Arc::new(Journal::default());
	let client = client(journaled(&journal));
	let (app, scope, transport) = client.websocket("/ws").connect().hang().into_parts();

	// Act
	let outcome = tokio::time::timeout(
		Duration::from_millis(50),
		app.handle(scope, transport.clone(), transport.clone()),
	)
	.await;
	tokio::time::sleep(Duration::from_millis(50)).await;

	// Assert
	assert!(outcome.is_err());
	assert_eq!(journal.entries(), vec!["connect", "disconnect:1006"]);
	assert_eq!(transport.sent().last(), Some(&close(1006)));
}

#[rstest]
#[tokio::test]
async fn test_function_handler_owns_the_connection() {
	// Arrange
	let echo = hook(
		"echo",
		vec![Parameter::of::<WebSocket>("websocket")],
		|args: Arguments| async move {
			let websocket = args.get::<WebSocket>("websocket")?;
			websocket.accept(None).await?;
			if let Frame::Text(text) = websocket.receive_frame().await? {
				websocket.send_text(format!("echo:{}", text)).await?;
			}
			websocket.close(1000).await
		},
	);
	let mut builder = Application::builder();
	builder.add_websocket_route(WebSocketRoute::new("/echo", echo).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	// Act
	let sent = client
		.websocket("/echo")
		.connect()
		.send_text("hi")
		.run()
		.await
		.unwrap();

	// Assert
	assert_eq!(
		sent,
		vec![
			Message::WebSocketAccept { subprotocol: None },
			Message::WebSocketSend(Frame::Text("echo:hi".to_string())),
			close(1000),
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_function_handler_peer_disconnect_keeps_code() {
	let reader = hook(
		"reader",
		vec![Parameter::of::<WebSocket>("websocket")],
		|args: Arguments| async move {
			let websocket = args.get::<WebSocket>("websocket")?;
			websocket.accept(None).await?;
			websocket.receive_frame().await?;
			Ok(())
		},
	);
	let mut builder = Application::builder();
	builder.add_websocket_route(WebSocketRoute::new("/read", reader).unwrap());
	let client = TestClient::new(builder.build().unwrap());

	let sent = client
		.websocket("/read")
		.connect()
		.disconnect(1001)
		.run()
		.await
		.unwrap();

	assert_eq!(sent.last(), Some(&close(1001)));
}

#[rstest]
#[tokio::test]
async fn test_unknown_path_is_closed() {
	let client = client(WebSocketEndpoint::new("Silent"));

	let sent = WebSocketScript::new(client.app().clone(), larkspur_http::Scope::websocket("/nope"))
		.connect()
		.run()
		.await
		.unwrap();

	assert_eq!(sent, vec![close(1000)]);
}
