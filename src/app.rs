use crate::config::Config;
use crate::feeds::poller::FeedPoller;
use crate::feeds::FeedFetcher;
use crate::session::local::{LocalHost, StaticDiscovery};
use crate::session::{FrameController, HostEvent};
use crate::ui::{self, FrameLayout};
use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{backend::Backend, Terminal};
use std::sync::Arc;

pub struct App {
    controller: FrameController,
    host: Arc<LocalHost>,
    layout: FrameLayout,
    should_quit: bool,
}

enum Step {
    Key(KeyEvent),
    Idle,
    Closed,
}

impl App {
    pub fn new(config: &Config, fetcher: Arc<dyn FeedFetcher>) -> Self {
        let host = Arc::new(LocalHost::new(&config.host));
        let discovery = Arc::new(StaticDiscovery::new(config.host.providers.clone()));
        let poller = FeedPoller::new(fetcher).with_fetch_timeout(config.fetch_timeout());
        let controller =
            FrameController::new(host.clone(), discovery, poller, config.frame_settings());

        Self {
            controller,
            host,
            layout: config.layout(),
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &FrameController {
        &self.controller
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('j') | KeyCode::Down => self.controller.casts_mut().scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.controller.casts_mut().scroll_up(),
            KeyCode::Char('p') => {
                self.host.emit(HostEvent::PrimaryButtonClicked);
            }
            KeyCode::Char('n') => {
                let event = if self.controller.notifications_enabled() {
                    HostEvent::NotificationsDisabled
                } else {
                    HostEvent::NotificationsEnabled {
                        notification_details: self.host.notification_details(),
                    }
                };
                self.host.emit(event);
            }
            KeyCode::Char('r') => {
                self.host.emit(HostEvent::FrameRemoved);
            }
            _ => {}
        }
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.controller.mount();
        let mut events = EventStream::new();

        loop {
            terminal
                .draw(|f| ui::render(f, &self.controller, &self.layout))
                .context("Failed to draw frame")?;

            if self.should_quit {
                break;
            }

            let step = tokio::select! {
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => Step::Key(key),
                    Some(Ok(_)) => Step::Idle,
                    Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                    None => Step::Closed,
                },
                alive = self.controller.pump() => if alive { Step::Idle } else { Step::Closed },
            };

            match step {
                Step::Key(key) => self.handle_key(key),
                Step::Idle => {}
                Step::Closed => break,
            }
        }

        self.controller.unmount();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{FeedError, FeedItem};
    use async_trait::async_trait;

    struct EmptyFetcher;

    #[async_trait]
    impl FeedFetcher for EmptyFetcher {
        async fn fetch_recent(&self, _limit: usize) -> Result<Vec<FeedItem>, FeedError> {
            Ok(vec![])
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn ready_app() -> App {
        let mut config = Config::default();
        config.host.added = true;
        let mut app = App::new(&config, Arc::new(EmptyFetcher));
        app.controller.mount();
        while !app.controller.is_ready() {
            app.controller.pump().await;
        }
        app
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = ready_app().await;
        assert!(!app.should_quit());
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit());

        let mut app = ready_app().await;
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_notification_toggle_round_trips_through_host() {
        let mut app = ready_app().await;

        app.handle_key(key(KeyCode::Char('n')));
        while !app.controller().notifications_enabled() {
            app.controller.pump().await;
        }

        app.handle_key(key(KeyCode::Char('n')));
        while app.controller().notifications_enabled() {
            app.controller.pump().await;
        }
    }

    #[tokio::test]
    async fn test_remove_key_marks_frame_removed() {
        let mut app = ready_app().await;
        assert!(app.controller().is_added());

        app.handle_key(key(KeyCode::Char('r')));
        while app.controller().is_added() {
            app.controller.pump().await;
        }
    }

    #[tokio::test]
    async fn test_local_host_add_flow() {
        let app = App::new(&Config::default(), Arc::new(EmptyFetcher));
        let mut app = app;
        app.controller.mount();
        while app.controller().add_frame_result().is_none() {
            app.controller.pump().await;
        }
        assert!(app.controller().is_added());
    }
}
