//! Interception through a worker context.
//!
//! The page side posts every request as a [`FetchEvent`]; the worker task
//! answers each event from the router or falls through to the network.

use crate::http::{NativeRequest, NativeResponse, ReadBody};
use crate::router::{Dispatch, Router};
use crate::transport::exchange::{Exchange, ExchangeState};
use crate::transport::{
    ensure_same_origin, failure_response, pass_through, FailurePolicy, Mode, Network, Transport,
    TransportError,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};
use url::Url;

type Reply = Result<NativeResponse, TransportError>;

/// One intercepted request with the channel its answer goes back on.
#[derive(Debug)]
pub struct FetchEvent {
    pub id: u64,
    pub request: NativeRequest,
    responder: oneshot::Sender<Reply>,
}

struct Worker {
    router: Router,
    network: Arc<dyn Network>,
    policy: FailurePolicy,
}

impl Worker {
    async fn listen(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<FetchEvent>) {
        while let Some(event) = events.recv().await {
            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                let reply = worker.handle(event.id, event.request).await;
                if event.responder.send(reply).is_err() {
                    debug!("Request {}: page stopped waiting", event.id);
                }
            }
            .in_current_span());
        }
        debug!("Fetch listener stopped");
    }

    async fn handle(&self, id: u64, request: NativeRequest) -> Reply {
        let mut exchange = Exchange::new(id);
        let fallback = match self.policy {
            FailurePolicy::PassThrough => Some(request.clone()),
            FailurePolicy::ErrorResponse => None,
        };

        match self.router.dispatch(request).await {
            Ok(Dispatch::Responded(response)) => {
                exchange.advance(ExchangeState::Matched);
                exchange.advance(ExchangeState::Responding);
                exchange.advance(ExchangeState::Completed);
                Ok(response)
            }
            Ok(Dispatch::Unhandled(request)) => {
                exchange.advance(ExchangeState::Unmatched);
                exchange.advance(ExchangeState::PassedThrough);
                let reply = pass_through(self.network.as_ref(), request).await;
                exchange.advance(ExchangeState::Completed);
                reply
            }
            Err(failure) => {
                warn!("Request {}: {}", id, failure);
                exchange.advance(ExchangeState::Failed);
                let reply = match fallback {
                    Some(request) => {
                        exchange.advance(ExchangeState::PassedThrough);
                        pass_through(self.network.as_ref(), request).await
                    }
                    None => {
                        exchange.advance(ExchangeState::Responding);
                        Ok(failure_response(&failure))
                    }
                };
                exchange.advance(ExchangeState::Completed);
                reply
            }
        }
    }
}

/// Page-side handle of an installed worker.
pub struct ModernTransport {
    events: mpsc::UnboundedSender<FetchEvent>,
    next_id: AtomicU64,
    worker: JoinHandle<()>,
}

impl ModernTransport {
    /// Install the worker script for `page` and start listening.
    ///
    /// The script must share the page's origin.
    pub fn install(
        script_url: Url,
        page: &Url,
        router: Router,
        network: Arc<dyn Network>,
        policy: FailurePolicy,
    ) -> Result<Self, TransportError> {
        ensure_same_origin(&script_url, page)?;

        let (events, receiver) = mpsc::unbounded_channel();
        let worker = Arc::new(Worker {
            router,
            network,
            policy,
        });
        let worker = tokio::spawn(worker.listen(receiver).in_current_span());
        info!("Installed interception worker {}", script_url);

        Ok(Self {
            events,
            next_id: AtomicU64::new(1),
            worker,
        })
    }
}

#[async_trait]
impl Transport for ModernTransport {
    fn mode(&self) -> Mode {
        Mode::Modern
    }

    async fn fetch(&self, request: NativeRequest) -> Result<NativeResponse, TransportError> {
        if request.body_used() {
            return Err(TransportError::BodyUsed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (responder, reply) = oneshot::channel();
        self.events
            .send(FetchEvent {
                id,
                request,
                responder,
            })
            .map_err(|_| TransportError::Disconnected)?;

        reply.await.map_err(|_| TransportError::Disconnected)?
    }
}

impl Drop for ModernTransport {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{DownNetwork, RecordingNetwork};
    use crate::types::method::HttpMethod;
    use rstest::rstest;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn page() -> Url {
        Url::parse("http://localhost:3000/index.html").expect("valid url")
    }

    fn script() -> Url {
        Url::parse("http://localhost:3000/sw.js").expect("valid url")
    }

    fn url(path: &str) -> Url {
        page().join(path).expect("valid url")
    }

    fn install(router: &Router, network: Arc<dyn Network>, policy: FailurePolicy) -> ModernTransport {
        ModernTransport::install(script(), &page(), router.clone(), network, policy)
            .expect("Should install")
    }

    #[rstest]
    #[tokio::test]
    async fn test_mocked_response() {
        let router = Router::new(page());
        router
            .get("/users/:id", |req, mut res| async move {
                let id = req.param("id").unwrap_or_default().to_string();
                res.json(&serde_json::json!({ "id": id }))?;
                anyhow::Ok(())
            })
            .expect("Should register");
        let network = RecordingNetwork::new();
        let transport = install(&router, network.clone(), FailurePolicy::default());

        let mut response = transport
            .fetch(NativeRequest::get(url("/users/7")))
            .await
            .expect("Should respond");

        assert_eq!(transport.mode(), Mode::Modern);
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().expect("Should parse");
        assert_eq!(body["id"], "7");
        assert!(network.urls().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_unmatched_goes_to_network() {
        let router = Router::new(page());
        let network = RecordingNetwork::new();
        let transport = install(&router, network.clone(), FailurePolicy::default());

        let request = NativeRequest::new(HttpMethod::Post, url("/api/save")).with_text("data");
        let mut response = transport.fetch(request).await.expect("Should respond");

        assert_eq!(response.status(), 599);
        assert_eq!(
            response.text().expect("Should read"),
            "http://localhost:3000/api/save"
        );
        assert_eq!(
            network.seen.lock().clone(),
            vec![("http://localhost:3000/api/save".to_string(), "data".to_string())]
        );
    }

    #[rstest]
    #[tokio::test]
    #[traced_test]
    async fn test_failure_becomes_error_response() {
        let router = Router::new(page());
        router
            .get("/broken", |_req, _res| async move {
                Err::<(), _>(anyhow::anyhow!("database is on fire"))
            })
            .expect("Should register");
        let network = RecordingNetwork::new();
        let transport = install(&router, network.clone(), FailurePolicy::ErrorResponse);

        let mut response = transport
            .fetch(NativeRequest::get(url("/broken")))
            .await
            .expect("Should respond");

        assert_eq!(response.status(), 500);
        assert!(response.text().expect("Should read").contains("database is on fire"));
        assert!(network.urls().is_empty());
        assert!(logs_contain("database is on fire"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_failure_passes_original_request_through() {
        let router = Router::new(page());
        router
            .post("/broken", |mut req, _res| async move {
                let _ = req.text()?;
                Err::<(), _>(anyhow::anyhow!("nope"))
            })
            .expect("Should register");
        let network = RecordingNetwork::new();
        let transport = install(&router, network.clone(), FailurePolicy::PassThrough);

        let request = NativeRequest::new(HttpMethod::Post, url("/broken")).with_text("payload");
        let response = transport.fetch(request).await.expect("Should respond");

        assert_eq!(response.status(), 599);
        assert_eq!(network.seen.lock()[0].1, "payload");
    }

    #[rstest]
    #[tokio::test]
    async fn test_network_failure_surfaces() {
        let router = Router::new(page());
        let transport = install(&router, Arc::new(DownNetwork), FailurePolicy::default());

        let result = transport.fetch(NativeRequest::get(url("/missing"))).await;
        assert!(matches!(result, Err(TransportError::Network(message)) if message.contains("refused")));
    }

    #[rstest]
    #[tokio::test]
    async fn test_used_body_is_rejected() {
        let router = Router::new(page());
        let transport = install(&router, RecordingNetwork::new(), FailurePolicy::default());

        let mut request = NativeRequest::new(HttpMethod::Post, url("/x")).with_text("once");
        request.text().expect("Should read");

        assert!(matches!(
            transport.fetch(request).await,
            Err(TransportError::BodyUsed)
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_cross_origin_script_is_rejected() {
        let result = ModernTransport::install(
            Url::parse("https://cdn.example.com/sw.js").expect("valid url"),
            &page(),
            Router::new(page()),
            RecordingNetwork::new(),
            FailurePolicy::default(),
        );
        assert!(matches!(result, Err(TransportError::CrossOrigin { .. })));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_requests_are_handled_concurrently() {
        let router = Router::new(page());
        router
            .get("/slow", |_req, mut res| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                res.send("slow")?;
                anyhow::Ok(())
            })
            .expect("Should register")
            .get("/fast", |_req, mut res| async move {
                res.send("fast")?;
                anyhow::Ok(())
            })
            .expect("Should register");
        let transport = Arc::new(install(&router, RecordingNetwork::new(), FailurePolicy::default()));

        let slow = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.fetch(NativeRequest::get(url("/slow"))).await })
        };
        let mut fast = transport
            .fetch(NativeRequest::get(url("/fast")))
            .await
            .expect("Should respond");
        assert_eq!(fast.text().expect("Should read"), "fast");
        assert!(!slow.is_finished());

        let mut slow = slow.await.expect("Should join").expect("Should respond");
        assert_eq!(slow.text().expect("Should read"), "slow");
    }
}
