use super::{
    AddFrameError, HostCallback, HostEvent, HostEventKind, HostSession, ListenerId, ListenerTable,
    NotificationDetails, PendingAddFrame, ProviderDetail, ProviderDiscovery, ReadyOptions,
    SessionContext, UserContext,
};
use crate::config::HostConfig;
use async_trait::async_trait;
use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process host used when the frame runs directly in a terminal.
///
/// The context comes from the `[host]` config section. Add requests are
/// answered according to `auto_accept_add`, and the keyboard can fire the
/// remaining host events through [`LocalHost::emit`].
pub struct LocalHost {
    context: SessionContext,
    auto_accept_add: bool,
    listeners: ListenerTable,
    ready: AtomicBool,
}

impl LocalHost {
    pub fn new(config: &HostConfig) -> Self {
        let mut context = SessionContext::default();
        context.client.client_fid = config.client_fid;
        context.client.added = config.added;
        context.client.safe_area_insets = Some(config.safe_area_insets);
        context.user = config.username.as_ref().map(|username| UserContext {
            fid: config.user_fid,
            username: Some(username.clone()),
            display_name: None,
        });

        Self {
            context,
            auto_accept_add: config.auto_accept_add,
            listeners: ListenerTable::default(),
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: HostEvent) -> usize {
        let kind = event.kind();
        let delivered = self.listeners.emit(event);
        tracing::debug!(event = %kind, delivered, "local host event");
        delivered
    }

    /// Notification details this host hands out when notifications are enabled.
    pub fn notification_details(&self) -> NotificationDetails {
        NotificationDetails {
            url: "local://castframe/notifications".to_string(),
            token: format!("local-{}", self.context.client.client_fid),
        }
    }
}

#[async_trait]
impl HostSession for LocalHost {
    async fn context(&self) -> Option<SessionContext> {
        Some(self.context.clone())
    }

    fn add_frame(&self) -> PendingAddFrame {
        let result = if self.auto_accept_add {
            tracing::info!("local host accepted add request");
            self.emit(HostEvent::FrameAdded {
                notification_details: None,
            });
            Ok(())
        } else {
            tracing::info!("local host declined add request");
            self.emit(HostEvent::FrameAddRejected {
                reason: "rejected_by_user".to_string(),
            });
            Err(AddFrameError::RejectedByUser(
                "Frame add declined in host config".to_string(),
            ))
        };
        future::ready(result).boxed()
    }

    fn ready(&self, options: ReadyOptions) {
        tracing::info!(
            disable_native_gestures = options.disable_native_gestures,
            "frame signalled ready"
        );
        self.ready.store(true, Ordering::SeqCst);
    }

    fn on(&self, kind: HostEventKind, callback: HostCallback) -> ListenerId {
        self.listeners.insert(kind, callback)
    }

    fn off(&self, id: ListenerId) {
        if !self.listeners.remove(id) {
            tracing::debug!(id = id.0, "listener already removed");
        }
    }
}

/// Discovery that announces the providers listed in config, once.
pub struct StaticDiscovery {
    providers: Vec<ProviderDetail>,
}

impl StaticDiscovery {
    pub fn new(providers: Vec<ProviderDetail>) -> Self {
        Self { providers }
    }
}

impl ProviderDiscovery for StaticDiscovery {
    fn subscribe(&self) -> BoxStream<'static, Vec<ProviderDetail>> {
        if self.providers.is_empty() {
            return stream::empty().boxed();
        }
        stream::iter(vec![self.providers.clone()]).boxed()
    }
}
