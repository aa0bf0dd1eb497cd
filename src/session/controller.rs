//! Bridges the host session lifecycle to the feed poller and the renderer.
//!
//! Background work (context resolution, the add request, host callbacks and
//! the poller) reports back over channels. State is only ever mutated from
//! [`FrameController::pump`] on the task that owns the controller.

use super::{
    AddFrameError, EdgeInsets, HostEvent, HostEventKind, HostSession, NotificationDetails,
    ProviderDiscovery, ReadyOptions, Registration, SessionContext,
};
use crate::feeds::poller::{FeedPoller, PollHandle, DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL};
use crate::feeds::FetchOutcome;
use crate::ui::casts::RecentCasts;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    /// The host never produced a context. Shown instead of loading forever.
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct FrameSettings {
    pub poll_interval: Duration,
    pub batch_size: usize,
    /// `None` waits for the host indefinitely.
    pub context_timeout: Option<Duration>,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            context_timeout: Some(Duration::from_secs(10)),
        }
    }
}

#[derive(Debug)]
enum FrameMessage {
    ContextResolved(Result<Option<SessionContext>, Duration>),
    AddFrameFinished(Result<(), AddFrameError>),
    Host(HostEvent),
}

pub struct FrameController {
    session: Arc<dyn HostSession>,
    discovery: Arc<dyn ProviderDiscovery>,
    poller: FeedPoller,
    settings: FrameSettings,

    state: SessionState,
    context: Option<SessionContext>,
    added: bool,
    notification_details: Option<NotificationDetails>,
    add_frame_result: Option<String>,
    casts: RecentCasts,

    registrations: Vec<Registration>,
    poll_handle: Option<PollHandle>,
    tasks: Vec<JoinHandle<()>>,
    unmounted: bool,

    message_tx: UnboundedSender<FrameMessage>,
    message_rx: UnboundedReceiver<FrameMessage>,
    feed_tx: UnboundedSender<FetchOutcome>,
    feed_rx: UnboundedReceiver<FetchOutcome>,
}

impl FrameController {
    pub fn new(
        session: Arc<dyn HostSession>,
        discovery: Arc<dyn ProviderDiscovery>,
        poller: FeedPoller,
        settings: FrameSettings,
    ) -> Self {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();

        Self {
            session,
            discovery,
            poller,
            settings,
            state: SessionState::Uninitialized,
            context: None,
            added: false,
            notification_details: None,
            add_frame_result: None,
            casts: RecentCasts::new(),
            registrations: Vec::new(),
            poll_handle: None,
            tasks: Vec::new(),
            unmounted: false,
            message_tx,
            message_rx,
            feed_tx,
            feed_rx,
        }
    }

    /// Begin loading the host context. Only the first call has any effect.
    pub fn mount(&mut self) {
        if self.state != SessionState::Uninitialized || self.unmounted {
            tracing::debug!(state = ?self.state, "mount ignored, already initialized");
            return;
        }

        tracing::info!("loading frame host context");
        self.state = SessionState::Loading;

        let session = Arc::clone(&self.session);
        let tx = self.message_tx.clone();
        let context_timeout = self.settings.context_timeout;
        self.tasks.push(tokio::spawn(async move {
            let resolved = match context_timeout {
                Some(limit) => tokio::time::timeout(limit, session.context())
                    .await
                    .map_err(|_| limit),
                None => Ok(session.context().await),
            };
            let _ = tx.send(FrameMessage::ContextResolved(resolved));
        }));
    }

    /// Release every host registration, stop polling and cancel background
    /// work. Messages still in flight are dropped.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;

        let released = self.registrations.len();
        for registration in self.registrations.drain(..) {
            registration.dispose();
        }
        if let Some(handle) = self.poll_handle.take() {
            handle.stop();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }

        tracing::info!(released, "frame unmounted");
    }

    /// Wait for the next background message and apply it. Returns false
    /// without waiting once the frame has been unmounted.
    pub async fn pump(&mut self) -> bool {
        enum Next {
            Frame(FrameMessage),
            Feed(FetchOutcome),
        }

        if self.unmounted {
            return false;
        }

        // Both senders live on `self`, so neither channel closes while we wait.
        let next = tokio::select! {
            Some(message) = self.message_rx.recv() => Next::Frame(message),
            Some(outcome) = self.feed_rx.recv() => Next::Feed(outcome),
        };

        match next {
            Next::Frame(message) => self.handle_message(message),
            Next::Feed(outcome) => self.casts.update_data(outcome),
        }
        true
    }

    fn handle_message(&mut self, message: FrameMessage) {
        match message {
            FrameMessage::ContextResolved(resolved) => self.handle_context(resolved),
            FrameMessage::AddFrameFinished(Ok(())) => {
                tracing::info!("frame added");
                self.added = true;
                self.add_frame_result = Some("Frame added".to_string());
            }
            FrameMessage::AddFrameFinished(Err(error)) => {
                tracing::info!(%error, "frame add request failed");
                self.add_frame_result = Some(error.display_message());
            }
            FrameMessage::Host(event) => self.handle_host_event(event),
        }
    }

    fn handle_context(&mut self, resolved: Result<Option<SessionContext>, Duration>) {
        if self.state != SessionState::Loading {
            return;
        }

        match resolved {
            Ok(Some(context)) => self.become_ready(context),
            Ok(None) => {
                tracing::warn!("frame host returned no context");
                self.state = SessionState::Unavailable("Frame host context unavailable".to_string());
            }
            Err(limit) => {
                tracing::warn!(timeout_secs = limit.as_secs(), "timed out waiting for frame host context");
                self.state = SessionState::Unavailable(format!(
                    "Timed out waiting for frame host after {}s",
                    limit.as_secs()
                ));
            }
        }
    }

    fn become_ready(&mut self, context: SessionContext) {
        self.added = context.client.added;
        self.notification_details = context.client.notification_details.clone();

        if !self.added {
            self.request_add_frame();
        }

        for kind in HostEventKind::ALL {
            let tx = self.message_tx.clone();
            let registration = Registration::register(
                &self.session,
                kind,
                Box::new(move |event| {
                    let _ = tx.send(FrameMessage::Host(event));
                }),
            );
            self.registrations.push(registration);
        }

        tracing::info!("calling ready");
        self.session.ready(ReadyOptions::default());

        self.watch_providers();

        self.poll_handle = Some(self.poller.start(
            self.settings.poll_interval,
            self.settings.batch_size,
            self.feed_tx.clone(),
        ));

        self.context = Some(context);
        self.state = SessionState::Ready;
    }

    fn request_add_frame(&mut self) {
        tracing::info!("frame not added yet, requesting add");
        let pending = self.session.add_frame();
        let tx = self.message_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let _ = tx.send(FrameMessage::AddFrameFinished(pending.await));
        }));
    }

    fn watch_providers(&mut self) {
        let mut announcements = self.discovery.subscribe();
        self.tasks.push(tokio::spawn(async move {
            while let Some(providers) = announcements.next().await {
                tracing::info!(count = providers.len(), "provider details");
                for provider in &providers {
                    tracing::debug!(
                        name = %provider.name,
                        rdns = %provider.rdns,
                        uuid = %provider.uuid,
                        "provider announced"
                    );
                }
            }
        }));
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::FrameAdded {
                notification_details,
            } => {
                tracing::info!("frameAdded");
                self.added = true;
                if notification_details.is_some() {
                    self.notification_details = notification_details;
                }
            }
            HostEvent::FrameAddRejected { reason } => {
                tracing::info!(%reason, "frameAddRejected");
                self.add_frame_result = Some(format!("Not added: {}", reason));
            }
            HostEvent::FrameRemoved => {
                tracing::info!("frameRemoved");
                self.added = false;
                self.notification_details = None;
            }
            HostEvent::NotificationsEnabled {
                notification_details,
            } => {
                tracing::info!(url = %notification_details.url, "notificationsEnabled");
                self.notification_details = Some(notification_details);
            }
            HostEvent::NotificationsDisabled => {
                tracing::info!("notificationsDisabled");
                self.notification_details = None;
            }
            HostEvent::PrimaryButtonClicked => {
                tracing::info!("primaryButtonClicked");
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn edge_insets(&self) -> EdgeInsets {
        self.context
            .as_ref()
            .map(SessionContext::edge_insets)
            .unwrap_or_default()
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notification_details.is_some()
    }

    pub fn add_frame_result(&self) -> Option<&str> {
        self.add_frame_result.as_deref()
    }

    pub fn casts(&self) -> &RecentCasts {
        &self.casts
    }

    pub fn casts_mut(&mut self) -> &mut RecentCasts {
        &mut self.casts
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }
}

impl Drop for FrameController {
    fn drop(&mut self) {
        self.unmount();
    }
}
