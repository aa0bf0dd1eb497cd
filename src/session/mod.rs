//! Frame host session.
//!
//! The host SDK is reached only through [`HostSession`] and
//! [`ProviderDiscovery`], both injected into the [`FrameController`].
//! [`local::LocalHost`] backs the terminal binary and [`mock::MockHost`]
//! backs the tests.

pub mod controller;
pub mod local;
pub mod mock;

pub use controller::{FrameController, FrameSettings, SessionState};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub user: Option<UserContext>,
    #[serde(default)]
    pub client: ClientContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub fid: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    #[serde(default)]
    pub client_fid: u64,
    #[serde(default)]
    pub added: bool,
    #[serde(default)]
    pub notification_details: Option<NotificationDetails>,
    #[serde(default)]
    pub safe_area_insets: Option<SafeAreaInsets>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub url: String,
    pub token: String,
}

/// Host-reported padding per edge. Missing edges are treated as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    pub top: Option<u16>,
    pub bottom: Option<u16>,
    pub left: Option<u16>,
    pub right: Option<u16>,
}

/// Insets with defaults applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeInsets {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl SessionContext {
    pub fn edge_insets(&self) -> EdgeInsets {
        let insets = self.client.safe_area_insets.unwrap_or_default();
        EdgeInsets {
            top: insets.top.unwrap_or(0),
            bottom: insets.bottom.unwrap_or(0),
            left: insets.left.unwrap_or(0),
            right: insets.right.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    FrameAdded,
    FrameAddRejected,
    FrameRemoved,
    NotificationsEnabled,
    NotificationsDisabled,
    PrimaryButtonClicked,
}

impl HostEventKind {
    pub const ALL: [HostEventKind; 6] = [
        HostEventKind::FrameAdded,
        HostEventKind::FrameAddRejected,
        HostEventKind::FrameRemoved,
        HostEventKind::NotificationsEnabled,
        HostEventKind::NotificationsDisabled,
        HostEventKind::PrimaryButtonClicked,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HostEventKind::FrameAdded => "frameAdded",
            HostEventKind::FrameAddRejected => "frameAddRejected",
            HostEventKind::FrameRemoved => "frameRemoved",
            HostEventKind::NotificationsEnabled => "notificationsEnabled",
            HostEventKind::NotificationsDisabled => "notificationsDisabled",
            HostEventKind::PrimaryButtonClicked => "primaryButtonClicked",
        }
    }
}

impl fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    FrameAdded {
        notification_details: Option<NotificationDetails>,
    },
    FrameAddRejected {
        reason: String,
    },
    FrameRemoved,
    NotificationsEnabled {
        notification_details: NotificationDetails,
    },
    NotificationsDisabled,
    PrimaryButtonClicked,
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::FrameAdded { .. } => HostEventKind::FrameAdded,
            HostEvent::FrameAddRejected { .. } => HostEventKind::FrameAddRejected,
            HostEvent::FrameRemoved => HostEventKind::FrameRemoved,
            HostEvent::NotificationsEnabled { .. } => HostEventKind::NotificationsEnabled,
            HostEvent::NotificationsDisabled => HostEventKind::NotificationsDisabled,
            HostEvent::PrimaryButtonClicked => HostEventKind::PrimaryButtonClicked,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AddFrameError {
    #[error("{0}")]
    RejectedByUser(String),

    #[error("{0}")]
    InvalidDomainManifest(String),

    #[error("{0}")]
    Other(String),
}

impl AddFrameError {
    /// Status line shown after a failed add request.
    pub fn display_message(&self) -> String {
        match self {
            AddFrameError::RejectedByUser(message)
            | AddFrameError::InvalidDomainManifest(message) => format!("Not added: {}", message),
            AddFrameError::Other(_) => format!("Error: {}", self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type HostCallback = Box<dyn Fn(HostEvent) + Send + Sync>;

/// Outcome of an add request that the host has already received.
pub type PendingAddFrame = BoxFuture<'static, Result<(), AddFrameError>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyOptions {
    pub disable_native_gestures: bool,
}

#[async_trait]
pub trait HostSession: Send + Sync {
    /// Resolve the hosting context. `None` means the host has no context to offer.
    async fn context(&self) -> Option<SessionContext>;

    /// Ask the host to add this frame to the user's collection. The request
    /// is delivered before this returns; the future resolves with the answer.
    fn add_frame(&self) -> PendingAddFrame;

    /// Tell the host the frame has finished loading.
    fn ready(&self, options: ReadyOptions);

    fn on(&self, kind: HostEventKind, callback: HostCallback) -> ListenerId;

    fn off(&self, id: ListenerId);
}

/// Disposer for one host listener. Removes exactly that listener when
/// disposed or dropped.
pub struct Registration {
    session: Arc<dyn HostSession>,
    kind: HostEventKind,
    id: Option<ListenerId>,
}

impl Registration {
    pub fn register(
        session: &Arc<dyn HostSession>,
        kind: HostEventKind,
        callback: HostCallback,
    ) -> Self {
        let id = session.on(kind, callback);
        tracing::trace!(event = %kind, id = id.0, "registered host listener");
        Self {
            session: Arc::clone(session),
            kind,
            id: Some(id),
        }
    }

    pub fn kind(&self) -> HostEventKind {
        self.kind
    }

    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.session.off(id);
            tracing::trace!(event = %self.kind, id = id.0, "removed host listener");
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

type SharedCallback = Arc<dyn Fn(HostEvent) + Send + Sync>;

/// Listener bookkeeping shared by the in-process hosts.
#[derive(Default)]
pub struct ListenerTable {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<ListenerId, (HostEventKind, SharedCallback)>>,
}

impl ListenerTable {
    pub fn insert(&self, kind: HostEventKind, callback: HostCallback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock().insert(id, (kind, Arc::from(callback)));
        id
    }

    /// Returns false if the listener was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Deliver `event` to every listener of its kind. Returns how many were called.
    pub fn emit(&self, event: HostEvent) -> usize {
        let kind = event.kind();
        let callbacks: Vec<SharedCallback> = self
            .lock()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in &callbacks {
            callback(event.clone());
        }
        callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for(&self, kind: HostEventKind) -> usize {
        self.lock().values().filter(|(k, _)| *k == kind).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ListenerId, (HostEventKind, SharedCallback)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A wallet/provider announcement seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub uuid: String,
    pub name: String,
    pub rdns: String,
}

pub trait ProviderDiscovery: Send + Sync {
    /// Each item is the full set of providers known at that point.
    fn subscribe(&self) -> BoxStream<'static, Vec<ProviderDetail>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_insets_default_to_zero() {
        let mut ctx = SessionContext::default();
        assert_eq!(ctx.edge_insets(), EdgeInsets::default());

        ctx.client.safe_area_insets = Some(SafeAreaInsets {
            top: Some(2),
            bottom: None,
            left: Some(1),
            right: None,
        });
        assert_eq!(
            ctx.edge_insets(),
            EdgeInsets {
                top: 2,
                bottom: 0,
                left: 1,
                right: 0
            }
        );
    }

    #[test]
    fn test_add_frame_error_messages() {
        assert_eq!(
            AddFrameError::RejectedByUser("user declined".to_string()).display_message(),
            "Not added: user declined"
        );
        assert_eq!(
            AddFrameError::InvalidDomainManifest("bad manifest".to_string()).display_message(),
            "Not added: bad manifest"
        );
        assert_eq!(
            AddFrameError::Other("host crashed".to_string()).display_message(),
            "Error: host crashed"
        );
    }

    #[test]
    fn test_event_kinds_are_distinct() {
        let names: std::collections::HashSet<_> =
            HostEventKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(HostEvent::FrameRemoved.kind(), HostEventKind::FrameRemoved);
    }

    #[test]
    fn test_listener_table_emits_by_kind() {
        let table = ListenerTable::default();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&hits);
        let added = table.insert(
            HostEventKind::FrameAdded,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        table.insert(HostEventKind::FrameRemoved, Box::new(|_| {}));

        assert_eq!(
            table.emit(HostEvent::FrameAdded {
                notification_details: None
            }),
            1
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(table.count_for(HostEventKind::FrameRemoved), 1);

        assert!(table.remove(added));
        assert!(!table.remove(added));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_context_deserializes_with_missing_fields() {
        let ctx: SessionContext =
            serde_json::from_str(r#"{"client": {"clientFid": 1, "added": true}}"#).unwrap();
        assert!(ctx.client.added);
        assert_eq!(ctx.client.client_fid, 1);
        assert!(ctx.user.is_none());
        assert_eq!(ctx.edge_insets(), EdgeInsets::default());
    }
}
