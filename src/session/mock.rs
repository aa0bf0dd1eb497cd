//! Scriptable host and discovery for tests.
//!
//! [`MockHost`] records every call made against it so tests can check
//! registration balance, add-frame requests and readiness.

use super::{
    AddFrameError, HostCallback, HostEvent, HostEventKind, HostSession, ListenerId, ListenerTable,
    PendingAddFrame, ProviderDetail, ProviderDiscovery, ReadyOptions, SessionContext,
};
use async_trait::async_trait;
use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call recorded by [`MockHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Context,
    AddFrame,
    Ready(ReadyOptions),
    On(HostEventKind, ListenerId),
    Off(ListenerId),
}

#[derive(Default)]
pub struct MockHost {
    context: Mutex<Option<SessionContext>>,
    context_delay: Mutex<Option<Duration>>,
    add_frame_result: Mutex<Option<AddFrameError>>,
    listeners: ListenerTable,
    calls: Mutex<Vec<HostCall>>,
    registered: AtomicUsize,
    deregistered: AtomicUsize,
}

impl MockHost {
    /// A host whose context resolves to `context`.
    pub fn new(context: Option<SessionContext>) -> Self {
        let host = Self::default();
        *host.context.lock().unwrap() = context;
        host
    }

    pub fn with_added(added: bool) -> Self {
        let mut context = SessionContext::default();
        context.client.added = added;
        Self::new(Some(context))
    }

    /// Make `context()` wait this long before resolving.
    pub fn set_context_delay(&self, delay: Duration) {
        *self.context_delay.lock().unwrap() = Some(delay);
    }

    /// Make `add_frame()` fail with `error`.
    pub fn reject_add_frame(&self, error: AddFrameError) {
        *self.add_frame_result.lock().unwrap() = Some(error);
    }

    /// Fire `event` at the listeners currently registered for it.
    pub fn emit(&self, event: HostEvent) -> usize {
        self.listeners.emit(event)
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn add_frame_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, HostCall::AddFrame))
    }

    pub fn ready_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, HostCall::Ready(_)))
    }

    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn deregistered(&self) -> usize {
        self.deregistered.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostSession for MockHost {
    async fn context(&self) -> Option<SessionContext> {
        self.record(HostCall::Context);
        let delay = *self.context_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.context.lock().unwrap().clone()
    }

    fn add_frame(&self) -> PendingAddFrame {
        self.record(HostCall::AddFrame);
        let result = match self.add_frame_result.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        };
        future::ready(result).boxed()
    }

    fn ready(&self, options: ReadyOptions) {
        self.record(HostCall::Ready(options));
    }

    fn on(&self, kind: HostEventKind, callback: HostCallback) -> ListenerId {
        let id = self.listeners.insert(kind, callback);
        self.registered.fetch_add(1, Ordering::SeqCst);
        self.record(HostCall::On(kind, id));
        id
    }

    fn off(&self, id: ListenerId) {
        if self.listeners.remove(id) {
            self.deregistered.fetch_add(1, Ordering::SeqCst);
        }
        self.record(HostCall::Off(id));
    }
}

/// Discovery that replays a fixed list of announcements.
#[derive(Default)]
pub struct MockDiscovery {
    announcements: Vec<Vec<ProviderDetail>>,
    subscriptions: Arc<AtomicUsize>,
}

impl MockDiscovery {
    pub fn new(announcements: Vec<Vec<ProviderDetail>>) -> Self {
        Self {
            announcements,
            subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl ProviderDiscovery for MockDiscovery {
    fn subscribe(&self) -> BoxStream<'static, Vec<ProviderDetail>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        stream::iter(self.announcements.clone()).boxed()
    }
}
