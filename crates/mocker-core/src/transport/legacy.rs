//! Interception through a hidden same-origin controller frame.
//!
//! The page serializes each request into a [`RequestEnvelope`] tagged with
//! a correlation id and posts it over a [`FramePort`]. The frame routes it and
//! posts back a [`ResponseEnvelope`] with the same id. Replies may arrive in
//! any order; the correlation table hands each one to the caller that is
//! waiting for it.

use crate::http::{NativeRequest, NativeResponse, ReadBody};
use crate::router::{Dispatch, Router};
use crate::transport::exchange::{Exchange, ExchangeState};
use crate::transport::wire::{RequestEnvelope, ResponseEnvelope};
use crate::transport::{
    ensure_same_origin, failure_response, pass_through, FailurePolicy, Mode, Network, Transport,
    TransportError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};
use url::Url;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<ResponseEnvelope>>>>;

/// Page end of the message channel to a controller frame.
#[derive(Debug)]
pub struct FramePort {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
    frame: Option<JoinHandle<()>>,
}

/// Frame end of the message channel.
#[derive(Debug)]
pub struct FrameEnd {
    requests: mpsc::UnboundedReceiver<String>,
    replies: mpsc::UnboundedSender<String>,
}

impl FramePort {
    /// Connected pair of channel ends with nothing serving the frame side.
    pub fn channel() -> (FramePort, FrameEnd) {
        let (outbound, requests) = mpsc::unbounded_channel();
        let (replies, inbound) = mpsc::unbounded_channel();
        (
            FramePort {
                outbound,
                inbound,
                frame: None,
            },
            FrameEnd { requests, replies },
        )
    }
}

impl FrameEnd {
    /// Next request message, `None` once the page side is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.requests.recv().await
    }

    pub fn reply(&self, message: String) -> Result<(), TransportError> {
        self.replies
            .send(message)
            .map_err(|_| TransportError::Disconnected)
    }
}

/// Correlation id of a message that is not a valid request envelope.
fn correlation_id_of(message: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(message)
        .ok()?
        .get("correlationId")?
        .as_u64()
}

/// Frame-side message loop.
pub struct ControllerFrame {
    router: Router,
    policy: FailurePolicy,
}

impl ControllerFrame {
    /// Load the controller page at `controller_url` and start serving.
    ///
    /// The controller must share the page's origin.
    pub fn open(
        controller_url: &Url,
        page: &Url,
        router: Router,
        policy: FailurePolicy,
    ) -> Result<FramePort, TransportError> {
        ensure_same_origin(controller_url, page)?;

        let (mut port, end) = FramePort::channel();
        let frame = Arc::new(ControllerFrame { router, policy });
        port.frame = Some(tokio::spawn(frame.serve(end).in_current_span()));
        info!("Opened controller frame {}", controller_url);
        Ok(port)
    }

    async fn serve(self: Arc<Self>, mut end: FrameEnd) {
        while let Some(message) = end.recv().await {
            let envelope: RequestEnvelope = match serde_json::from_str(&message) {
                Ok(envelope) => envelope,
                Err(e) => {
                    match correlation_id_of(&message) {
                        Some(id) => {
                            warn!("Request {}: malformed request message: {}", id, e);
                            let reply = serde_json::to_string(&ResponseEnvelope::pass_through(id))
                                .map_err(TransportError::from)
                                .and_then(|message| end.reply(message));
                            if let Err(e) = reply {
                                debug!("Request {}: reply not delivered: {}", id, e);
                            }
                        }
                        None => warn!("Dropping malformed request message: {}", e),
                    }
                    continue;
                }
            };

            let frame = Arc::clone(&self);
            let replies = end.replies.clone();
            tokio::spawn(async move {
                let id = envelope.correlation_id;
                let reply = match envelope.into_request() {
                    Ok(request) => frame.handle(id, request).await,
                    Err(e) => {
                        warn!("Request {}: {}", id, e);
                        ResponseEnvelope::pass_through(id)
                    }
                };

                let sent = serde_json::to_string(&reply)
                    .map_err(TransportError::from)
                    .and_then(|message| {
                        replies
                            .send(message)
                            .map_err(|_| TransportError::Disconnected)
                    });
                if let Err(e) = sent {
                    debug!("Request {}: reply not delivered: {}", id, e);
                }
            }
            .in_current_span());
        }
        debug!("Controller frame stopped");
    }

    async fn handle(&self, id: u64, request: NativeRequest) -> ResponseEnvelope {
        let mut exchange = Exchange::new(id);

        let reply = match self.router.dispatch(request).await {
            Ok(Dispatch::Responded(response)) => {
                exchange.advance(ExchangeState::Matched);
                exchange.advance(ExchangeState::Responding);
                ResponseEnvelope::from_response(id, &response)
            }
            Ok(Dispatch::Unhandled(_)) => {
                exchange.advance(ExchangeState::Unmatched);
                exchange.advance(ExchangeState::PassedThrough);
                ResponseEnvelope::pass_through(id)
            }
            Err(failure) => {
                warn!("Request {}: {}", id, failure);
                exchange.advance(ExchangeState::Failed);
                match self.policy {
                    FailurePolicy::PassThrough => {
                        exchange.advance(ExchangeState::PassedThrough);
                        ResponseEnvelope::pass_through(id)
                    }
                    FailurePolicy::ErrorResponse => {
                        exchange.advance(ExchangeState::Responding);
                        ResponseEnvelope::from_response(id, &failure_response(&failure))
                    }
                }
            }
        };

        exchange.advance(ExchangeState::Completed);
        reply
    }
}

/// Removes a correlation entry when the waiting caller goes away.
struct PendingEntry {
    pending: Pending,
    id: u64,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// Page-side handle talking to a controller frame.
pub struct LegacyTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pending: Pending,
    next_id: AtomicU64,
    network: Arc<dyn Network>,
    reply_timeout: Option<Duration>,
    reader: JoinHandle<()>,
    frame: Option<JoinHandle<()>>,
}

impl LegacyTransport {
    /// Start reading replies from `port`.
    ///
    /// With `reply_timeout` set, a request whose reply does not arrive in
    /// time fails with [`TransportError::Timeout`].
    pub fn new(port: FramePort, network: Arc<dyn Network>, reply_timeout: Option<Duration>) -> Self {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_replies(port.inbound, Arc::clone(&pending)).in_current_span());

        Self {
            outbound: Mutex::new(Some(port.outbound)),
            pending,
            next_id: AtomicU64::new(1),
            network,
            reply_timeout,
            reader,
            frame: port.frame,
        }
    }

    /// Open a controller frame and connect to it.
    pub fn open(
        controller_url: &Url,
        page: &Url,
        router: Router,
        network: Arc<dyn Network>,
        policy: FailurePolicy,
        reply_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let port = ControllerFrame::open(controller_url, page, router, policy)?;
        Ok(Self::new(port, network, reply_timeout))
    }

    /// Requests still waiting for a reply.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Tear down the channel. Waiting and later requests fail with
    /// [`TransportError::Disconnected`].
    pub fn unload(&self) {
        self.reader.abort();
        if let Some(frame) = &self.frame {
            frame.abort();
        }
        self.outbound.lock().take();
        self.pending.lock().clear();
    }

    async fn wait(
        &self,
        id: u64,
        reply: oneshot::Receiver<ResponseEnvelope>,
    ) -> Result<ResponseEnvelope, TransportError> {
        match self.reply_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, reply).await {
                Ok(reply) => reply.map_err(|_| TransportError::Disconnected),
                Err(_) => Err(TransportError::Timeout { id, timeout }),
            },
            None => reply.await.map_err(|_| TransportError::Disconnected),
        }
    }
}

async fn read_replies(mut inbound: mpsc::UnboundedReceiver<String>, pending: Pending) {
    while let Some(message) = inbound.recv().await {
        let envelope: ResponseEnvelope = match serde_json::from_str(&message) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping malformed reply message: {}", e);
                continue;
            }
        };

        let id = envelope.correlation_id;
        let waiting = pending.lock().remove(&id);
        match waiting {
            Some(sender) => {
                if sender.send(envelope).is_err() {
                    debug!("Request {}: caller stopped waiting", id);
                }
            }
            None => warn!("{}", TransportError::CorrelationMismatch(id)),
        }
    }

    debug!("Controller frame closed its channel");
    pending.lock().clear();
}

#[async_trait]
impl Transport for LegacyTransport {
    fn mode(&self) -> Mode {
        Mode::Legacy
    }

    async fn fetch(&self, request: NativeRequest) -> Result<NativeResponse, TransportError> {
        if request.body_used() {
            return Err(TransportError::BodyUsed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = serde_json::to_string(&RequestEnvelope::from_request(id, &request))?;

        let (sender, reply) = oneshot::channel();
        self.pending.lock().insert(id, sender);
        let _entry = PendingEntry {
            pending: Arc::clone(&self.pending),
            id,
        };

        {
            let outbound = self.outbound.lock();
            let outbound = outbound.as_ref().ok_or(TransportError::Disconnected)?;
            outbound
                .send(message)
                .map_err(|_| TransportError::Disconnected)?;
        }

        let envelope = self.wait(id, reply).await?;
        if envelope.pass_through {
            debug!("Request {}: passing {} through", id, request.url());
            return pass_through(self.network.as_ref(), request).await;
        }
        envelope.into_response()
    }
}

impl Drop for LegacyTransport {
    fn drop(&mut self) {
        self.unload();
    }
}
