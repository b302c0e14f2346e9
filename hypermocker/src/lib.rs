//! HTTP server for tests which answers only the requests it was told to anticipate, and only when
//! the test decides so.

use http_body_util::Full;
use hyper::{Request, Response, server::conn::http1, service::Service};
use hyper_util::rt::TokioIo;
use std::{
    collections::HashMap,
    net::SocketAddr,
    pin::Pin,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub use hyper;
pub use hyper::StatusCode;
pub use hyper::body::Bytes;

type Payload = Response<Full<Bytes>>;

struct Anticipation {
    request_tx: oneshot::Sender<Request<()>>,
    response_rx: oneshot::Receiver<Payload>,
}

#[derive(Default)]
struct State {
    /// Made by [`Server::anticipate`], before the incoming HTTP request.
    anticipated: HashMap<String, Anticipation>,

    unexpected: Vec<String>,
}

fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    match state.lock() {
        Ok(state) => state,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct Server {
    port: u16,
    state: Arc<Mutex<State>>,
    accept: JoinHandle<()>,
}

impl Server {
    /// Create new [`Server`], and bind it to a random port.
    pub async fn bind() -> Server {
        let state = Arc::new(Mutex::new(State::default()));

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let state_clone = Arc::clone(&state);
        let accept = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);

                let state = Arc::clone(&state_clone);
                tokio::task::spawn(async move {
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(io, Connection { state })
                        .await
                    {
                        log::debug!("Connection ended with: {e}.");
                    }
                });
            }
        });

        Server {
            port,
            state,
            accept,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Anticipate a request for `path`. It will hang until the returned [`AnticipatedRequest`]
    /// gets responded to.
    pub async fn anticipate(&self, path: impl Into<String>) -> AnticipatedRequest {
        let path = path.into();
        log::info!("Anticipating '{path}'.");

        let (request_tx, request_rx) = oneshot::channel();
        let (response_tx, response_rx) = oneshot::channel();

        let previous = lock(&self.state).anticipated.insert(
            path.clone(),
            Anticipation {
                request_tx,
                response_rx,
            },
        );
        assert!(previous.is_none(), "'{path}' is already anticipated");

        AnticipatedRequest {
            path,
            request_rx: Some(request_rx),
            response_tx,
        }
    }

    /// Paths which were requested without being anticipated.
    pub fn unexpected(&self) -> Vec<String> {
        lock(&self.state).unexpected.clone()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.accept.abort();

        let unexpected = &lock(&self.state).unexpected;
        if !unexpected.is_empty() && !std::thread::panicking() {
            panic!("there are unexpected requests: {unexpected:?}");
        }
    }
}

pub struct AnticipatedRequest {
    path: String,
    request_rx: Option<oneshot::Receiver<Request<()>>>,
    response_tx: oneshot::Sender<Payload>,
}

impl AnticipatedRequest {
    /// Wait until the request arrives.
    pub async fn expect(&mut self) -> Request<()> {
        log::info!("Waiting for '{}'.", self.path);
        self.request_rx
            .take()
            .expect("request can be expected only once")
            .await
            .unwrap()
    }

    pub async fn respond(self, payload: impl Into<Bytes>) {
        log::info!("Responding to '{}'.", self.path);
        self.send(Response::new(Full::new(payload.into())));
    }

    pub async fn respond_with_status(self, status: StatusCode) {
        log::info!("Responding to '{}' with {status}.", self.path);
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        self.send(response);
    }

    fn send(self, response: Payload) {
        // The client might have given up already.
        let _ = self.response_tx.send(response);
    }
}

struct Connection {
    state: Arc<Mutex<State>>,
}

impl Service<Request<hyper::body::Incoming>> for Connection {
    type Response = Payload;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<hyper::body::Incoming>) -> Self::Future {
        log::info!("Incoming request '{}'.", request.uri());
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let path = request.uri().path().to_owned();
            let anticipation = lock(&state).anticipated.remove(&path);

            if let Some(anticipation) = anticipation {
                let _ = anticipation.request_tx.send(request.map(|_| ()));
                match anticipation.response_rx.await {
                    Ok(response) => Ok(response),
                    Err(_) => {
                        log::warn!("'{path}' was anticipated, but never responded to.");
                        Ok(status_only(StatusCode::SERVICE_UNAVAILABLE))
                    }
                }
            } else {
                log::warn!("Unexpected '{}'.", request.uri());
                lock(&state).unexpected.push(path);
                Ok(status_only(StatusCode::IM_A_TEAPOT))
            }
        })
    }
}

fn status_only(status: StatusCode) -> Payload {
    let mut response = Response::new(Full::new(Bytes::from_static(b"unexpected")));
    *response.status_mut() = status;
    response
}
