//! Live feed subscriptions.
//!
//! Both the image and the text API publish a public `/feed` of server-sent
//! events. [`subscribe_to_feed`] attaches to one, decodes every frame and
//! pushes the result into a callback until the stream ends, fails, or the
//! caller cancels through the returned [`FeedSubscription`].
//!
//! A frame that does not decode is reported through the error callback and
//! skipped; the subscription keeps running. Transport failures and the end of
//! the stream are terminal.

use std::cell::Cell;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::ReentrantMutex;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::http::{HttpClient, EVENT_STREAM_HEADERS};
use crate::sse;

/// Path of the feed endpoint, relative to the service's base URL.
pub const FEED_PATH: &str = "/feed";

/// Callback receiving errors from a subscription.
pub type ErrorCallback = Box<dyn FnMut(ClientError) + Send + 'static>;

/// Lifecycle of a subscription.
///
/// `Cancelled`, `Errored` and `Ended` are absorbing: once reached, every later
/// signal is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Created,
    Attaching,
    Active,
    Cancelled,
    Errored,
    Ended,
}

impl SubscriptionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubscriptionState::Cancelled | SubscriptionState::Errored | SubscriptionState::Ended
        )
    }
}

/// Serialises state changes with callback delivery.
///
/// Callbacks run while the lock is held, so once `cancel` has returned no
/// callback can still be running or start. The lock is reentrant because a
/// callback may cancel its own subscription.
struct Gate {
    state: ReentrantMutex<Cell<SubscriptionState>>,
}

impl Gate {
    fn new() -> Self {
        Self {
            state: ReentrantMutex::new(Cell::new(SubscriptionState::Created)),
        }
    }

    fn get(&self) -> SubscriptionState {
        self.state.lock().get()
    }

    /// Move to `next` unless a terminal state was already reached.
    fn transition(&self, next: SubscriptionState) -> bool {
        self.finish(next, || {})
    }

    /// Move to `next` and run `f` under the lock, unless already terminal.
    fn finish(&self, next: SubscriptionState, f: impl FnOnce()) -> bool {
        let state = self.state.lock();
        if state.get().is_terminal() {
            return false;
        }
        state.set(next);
        f();
        true
    }

    /// Run `f` under the lock if the subscription is still live.
    fn deliver(&self, f: impl FnOnce()) -> bool {
        let state = self.state.lock();
        if state.get().is_terminal() {
            return false;
        }
        f();
        // `f` may have cancelled the subscription
        !state.get().is_terminal()
    }
}

/// Handle to a running feed subscription.
///
/// Dropping the handle leaves the subscription running; call
/// [`cancel`](Self::cancel) or opt into [`cancel_on_drop`](Self::cancel_on_drop).
pub struct FeedSubscription {
    gate: Arc<Gate>,
    cancel: CancellationToken,
    done: CancellationToken,
    cancel_on_drop: bool,
}

impl FeedSubscription {
    /// Stop the subscription.
    ///
    /// Safe to call any number of times. After the first call returns, no
    /// further event or error is delivered and the connection is torn down.
    ///
    /// If a callback is running on the subscription task, this waits for it
    /// to return. Do not call it while holding a lock that `on_data` or
    /// `on_error` may try to take. Calling it from inside a callback is fine.
    pub fn cancel(&self) {
        if self.gate.transition(SubscriptionState::Cancelled) {
            debug!("feed subscription cancelled");
            self.cancel.cancel();
        }
    }

    /// Whether the subscription can still deliver events.
    pub fn is_active(&self) -> bool {
        !self.gate.get().is_terminal()
    }

    pub fn state(&self) -> SubscriptionState {
        self.gate.get()
    }

    /// Cancel the subscription when this handle is dropped.
    pub fn cancel_on_drop(mut self) -> Self {
        self.cancel_on_drop = true;
        self
    }

    /// Wait until the subscription task has exited and released the connection.
    pub async fn closed(&self) {
        self.done.cancelled().await
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("state", &self.state())
            .finish()
    }
}

/// Subscribe to the feed served by `client`.
///
/// `on_data` receives every decoded event in arrival order. `on_error`, when
/// given, receives connection failures (once, terminal), transport failures
/// (once, terminal) and undecodable frames (recoverable).
///
/// Must be called from within a Tokio runtime: the subscription runs on its
/// own task.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use pollen::feed::subscribe_to_feed;
/// use pollen::http::ReqwestHttpClient;
/// use pollen::options::TransportOptions;
///
/// # async fn run() -> Result<(), pollen::ClientError> {
/// let client = ReqwestHttpClient::new("https://text.pollinations.ai", &TransportOptions::default())?;
/// let subscription = subscribe_to_feed(
///     Arc::new(client),
///     |event: serde_json::Value| println!("{}", event),
///     Some(Box::new(|err| eprintln!("{}", err))),
/// );
/// // ...
/// subscription.cancel();
/// # Ok(())
/// # }
/// ```
pub fn subscribe_to_feed<T, F>(
    client: Arc<dyn HttpClient>,
    on_data: F,
    on_error: Option<ErrorCallback>,
) -> FeedSubscription
where
    T: DeserializeOwned + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let gate = Arc::new(Gate::new());
    let cancel = CancellationToken::new();
    let done = CancellationToken::new();

    tokio::spawn(run_subscription(
        client,
        gate.clone(),
        cancel.clone(),
        done.clone(),
        on_data,
        on_error,
    ));

    FeedSubscription {
        gate,
        cancel,
        done,
        cancel_on_drop: false,
    }
}

async fn run_subscription<T, F>(
    client: Arc<dyn HttpClient>,
    gate: Arc<Gate>,
    cancel: CancellationToken,
    done: CancellationToken,
    mut on_data: F,
    mut on_error: Option<ErrorCallback>,
) where
    T: DeserializeOwned + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let _done = done.drop_guard();
    let mut report = |err: ClientError| {
        if let Some(on_error) = on_error.as_mut() {
            on_error(err);
        }
    };

    if !gate.transition(SubscriptionState::Attaching) {
        return;
    }

    let attached = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        attached = client.get_stream(FEED_PATH, &EVENT_STREAM_HEADERS) => attached,
    };

    let source = match attached {
        Ok(source) => source,
        Err(err) => {
            warn!(error = %err, "failed to open feed");
            gate.finish(SubscriptionState::Errored, || {
                report(ClientError::Connect(Box::new(err)))
            });
            return;
        }
    };

    if !gate.transition(SubscriptionState::Active) {
        return;
    }
    debug!("feed subscription active");

    let frames = sse::frames(source);
    futures::pin_mut!(frames);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next() => next,
        };

        let live = match next {
            Some(Ok(frame)) => match frame.decode::<T>() {
                Ok(event) => gate.deliver(|| on_data(event)),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable feed frame");
                    gate.deliver(|| report(ClientError::FeedEvent(e)))
                }
            },
            Some(Err(e)) => {
                warn!(error = %e, "feed transport failed");
                gate.finish(SubscriptionState::Errored, || report(ClientError::Stream(e)));
                false
            }
            None => {
                if gate.transition(SubscriptionState::Ended) {
                    debug!("feed ended");
                }
                false
            }
        };

        if !live {
            break;
        }
    }
    // dropping `frames` here releases the connection
}
