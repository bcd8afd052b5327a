//! WebSocket dispatch
//!
//! Function handlers own the whole connection. Endpoint handlers are driven by a
//! session state machine:
//!
//! ```text
//! Connecting → Connected → { Receiving ⇄ Handling } → Closing → Closed
//! ```
//!
//! A peer disconnect or a failing hook moves the session straight to `Closing` with
//! the close code recorded: the peer's code, an application-supplied code, or 1011
//! for an unexpected failure. The disconnect hook runs exactly once however the loop
//! ended. If the session future is dropped before that, a guard spawns the hook on
//! the current runtime (close code 1006 unless another one was recorded).

use crate::application::{Application, keys, mounted_scope};
use crate::exception::{close_code_for, panic_error};
use futures::FutureExt;
use larkspur_di::{Injector, RequestState, Value};
use larkspur_exception::{Error, Result};
use larkspur_http::{
	Code, ConnectionState, Message, Receiver, Scope, ScopeKind, Transmitter, WebSocket,
	close_code,
};
use larkspur_urls::{Hook, Resolution, Target, WebSocketEndpoint, WebSocketHandler};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Lifecycle phase of an endpoint session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Connecting,
	Connected,
	Receiving,
	Handling,
	Closing,
	Closed,
}

pub(crate) async fn handle_websocket(
	app: &Arc<Application>,
	scope: Scope,
	receive: Receiver,
	transmit: Transmitter,
) -> Result<()> {
	let resolved = match app
		.tree()
		.resolve(ScopeKind::WebSocket, &scope.method, &scope.path)
	{
		Resolution::Full(resolved) => resolved,
		_ => {
			tracing::warn!(path = %scope.path, "No WebSocket route matched");
			return transmit
				.transmit(Message::WebSocketClose {
					code: close_code::NORMAL,
					reason: String::new(),
				})
				.await;
		}
	};
	let Target::WebSocket(route) = &resolved.target else {
		return Err(Error::NotFound);
	};

	let scope = Arc::new(mounted_scope(scope, &resolved.root_path));
	let websocket = Arc::new(WebSocket::new(
		scope.clone(),
		receive.clone(),
		transmit.clone(),
	));
	let mut state = app.seed(&scope, &receive, &transmit, resolved.path_params.clone());
	state.set(keys::ROUTE, Value::from_arc(route.clone()));
	state.set(keys::WEBSOCKET, Value::from_arc(websocket.clone()));
	state.set(keys::WEBSOCKET_ENCODING, Value::new(route.encoding()));

	let injector = resolved.injector().clone();
	match route.handler() {
		WebSocketHandler::Function(function) => {
			if let Err(error) = invoke(&injector, function, &mut state).await {
				let code = close_code_for(&error);
				log_failure(&error, code);
				websocket.close(code).await?;
			}
		}
		WebSocketHandler::Endpoint(endpoint) => {
			Session::new(injector, endpoint.clone(), websocket, state)
				.run()
				.await;
		}
	}
	Ok(())
}

/// Resolves and runs one hook. Panics are reported as internal errors.
async fn invoke(injector: &Injector, hook: &Hook, state: &mut RequestState) -> Result<()> {
	AssertUnwindSafe(async {
		let bound = injector.inject(hook, state).await?;
		bound.invoke().await
	})
	.catch_unwind()
	.await
	.map_err(panic_error)?
}

fn log_failure(error: &Error, code: u16) {
	match error {
		Error::ClientDisconnected { .. } => {
			tracing::debug!(code, "WebSocket client disconnected");
		}
		_ if code == close_code::INTERNAL_ERROR => {
			tracing::error!(code, error = %error, "WebSocket handler failed");
		}
		_ => tracing::warn!(code, error = %error, "WebSocket closed by the application"),
	}
}

struct Session {
	injector: Arc<Injector>,
	endpoint: Arc<WebSocketEndpoint>,
	websocket: Arc<WebSocket>,
	state: RequestState,
	phase: SessionState,
	code: Option<u16>,
	finished: bool,
	detached: bool,
}

impl Session {
	fn new(
		injector: Arc<Injector>,
		endpoint: Arc<WebSocketEndpoint>,
		websocket: Arc<WebSocket>,
		state: RequestState,
	) -> Self {
		Self {
			injector,
			endpoint,
			websocket,
			state,
			phase: SessionState::Connecting,
			code: None,
			finished: false,
			detached: false,
		}
	}

	fn enter(&mut self, phase: SessionState) {
		tracing::trace!(endpoint = self.endpoint.name(), from = ?self.phase, to = ?phase, "WebSocket session");
		self.phase = phase;
	}

	fn fail(&mut self, error: Error) {
		let code = close_code_for(&error);
		log_failure(&error, code);
		self.code = Some(code);
	}

	async fn run(mut self) {
		let connected = match self.endpoint.connect_hook().cloned() {
			Some(hook) => invoke(&self.injector, &hook, &mut self.state).await,
			None => self.websocket.accept(None).await,
		};
		match connected {
			Ok(()) => {
				self.enter(SessionState::Connected);
				self.receive_loop().await;
			}
			Err(error) => self.fail(error),
		}
		self.disconnect().await;
	}

	async fn receive_loop(&mut self) {
		while self.websocket.is_connected() {
			self.enter(SessionState::Receiving);
			let message = match self.websocket.receive().await {
				Ok(message) => message,
				Err(error) => return self.fail(error),
			};
			if let Message::WebSocketDisconnect { code } = message {
				self.code = Some(code);
				return;
			}

			self.enter(SessionState::Handling);
			self.state.set(keys::WEBSOCKET_MESSAGE, Value::new(message));
			if let Some(hook) = self.endpoint.receive_hook().cloned() {
				if let Err(error) = invoke(&self.injector, &hook, &mut self.state).await {
					return self.fail(error);
				}
			}
		}
	}

	async fn disconnect(&mut self) {
		self.enter(SessionState::Closing);
		self.finished = true;
		let code = self.code.unwrap_or(close_code::NORMAL);
		self.state.set(keys::WEBSOCKET_CODE, Value::new(Code(code)));

		let result = match self.endpoint.disconnect_hook().cloned() {
			Some(hook) => invoke(&self.injector, &hook, &mut self.state).await,
			None => self.websocket.close(code).await,
		};
		if let Err(error) = result {
			tracing::warn!(code, error = %error, "WebSocket disconnect hook failed");
		}
		if self.websocket.client_state() != ConnectionState::Disconnected {
			if let Err(error) = self.websocket.close(code).await {
				tracing::debug!(error = %error, "Could not send close frame");
			}
		}

		self.enter(SessionState::Closed);
		tracing::debug!(endpoint = self.endpoint.name(), code, "WebSocket session closed");
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		if self.finished || self.detached {
			return;
		}
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			tracing::error!(
				endpoint = self.endpoint.name(),
				"WebSocket session dropped outside a runtime; disconnect hook skipped"
			);
			return;
		};
		tracing::debug!(
			endpoint = self.endpoint.name(),
			phase = ?self.phase,
			"WebSocket session cancelled"
		);
		let mut orphan = Session {
			injector: self.injector.clone(),
			endpoint: self.endpoint.clone(),
			websocket: self.websocket.clone(),
			state: std::mem::take(&mut self.state),
			phase: self.phase,
			code: Some(self.code.unwrap_or(close_code::ABNORMAL)),
			finished: false,
			detached: true,
		};
		runtime.spawn(async move { orphan.disconnect().await });
	}
}
