pub mod casts;

use crate::session::{EdgeInsets, FrameController, SessionState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Padding, Paragraph, Wrap},
    Frame,
};

pub const DEFAULT_TITLE: &str = "Recent Casts";
pub const DEFAULT_CONTENT_WIDTH: u16 = 60;

#[derive(Debug, Clone)]
pub struct FrameLayout {
    pub title: String,
    pub content_width: u16,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            content_width: DEFAULT_CONTENT_WIDTH,
        }
    }
}

pub fn render(frame: &mut Frame, controller: &FrameController, layout: &FrameLayout) {
    let area = frame.area();

    match controller.state() {
        SessionState::Uninitialized | SessionState::Loading => {
            frame.render_widget(Paragraph::new("Loading..."), area);
        }
        SessionState::Unavailable(message) => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true });
            frame.render_widget(error, area);
        }
        SessionState::Ready => {
            let inner = padded_area(area, controller.edge_insets());
            let column = centered_column(inner, layout.content_width);

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(2), Constraint::Min(0)])
                .split(column);

            frame.render_widget(status_line(controller, &layout.title), chunks[0]);
            controller.casts().render(frame, chunks[1]);
        }
    }
}

/// The shell area left after applying the host's safe-area insets.
pub fn padded_area(area: Rect, insets: EdgeInsets) -> Rect {
    Block::default()
        .padding(Padding::new(
            insets.left,
            insets.right,
            insets.top,
            insets.bottom,
        ))
        .inner(area)
}

pub fn centered_column(area: Rect, width: u16) -> Rect {
    if width == 0 || area.width <= width {
        return area;
    }
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn status_line<'a>(controller: &'a FrameController, title: &'a str) -> Paragraph<'a> {
    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    let (label, color) = if controller.is_added() {
        ("added", Color::Green)
    } else {
        ("not added", Color::Yellow)
    };
    spans.push(Span::raw("  "));
    spans.push(Span::styled(label, Style::default().fg(color)));

    if controller.notifications_enabled() {
        spans.push(Span::styled(
            "  notifications on",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(result) = controller.add_frame_result() {
        spans.push(Span::styled(
            format!("  {}", result),
            Style::default().fg(Color::DarkGray),
        ));
    }

    Paragraph::new(Line::from(spans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::poller::FeedPoller;
    use crate::feeds::{FeedError, FeedFetcher, FeedItem};
    use crate::session::mock::{MockDiscovery, MockHost};
    use crate::session::{FrameSettings, SafeAreaInsets, SessionContext};
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    struct FailingFetcher;

    #[async_trait]
    impl FeedFetcher for FailingFetcher {
        async fn fetch_recent(&self, _limit: usize) -> Result<Vec<FeedItem>, FeedError> {
            Err(FeedError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn controller(host: MockHost) -> FrameController {
        FrameController::new(
            Arc::new(host),
            Arc::new(MockDiscovery::default()),
            FeedPoller::new(Arc::new(FailingFetcher)),
            FrameSettings::default(),
        )
    }

    fn screen(controller: &FrameController) -> Vec<String> {
        let backend = TestBackend::new(40, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| render(f, controller, &FrameLayout::default()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_padded_area_applies_insets() {
        let insets = EdgeInsets {
            top: 1,
            bottom: 2,
            left: 3,
            right: 4,
        };
        assert_eq!(
            padded_area(Rect::new(0, 0, 80, 24), insets),
            Rect::new(3, 1, 73, 21)
        );
        assert_eq!(
            padded_area(Rect::new(0, 0, 80, 24), EdgeInsets::default()),
            Rect::new(0, 0, 80, 24)
        );
    }

    #[test]
    fn test_centered_column() {
        let area = Rect::new(0, 0, 100, 10);
        assert_eq!(centered_column(area, 60), Rect::new(20, 0, 60, 10));
        assert_eq!(centered_column(Rect::new(0, 0, 40, 10), 60), Rect::new(0, 0, 40, 10));
    }

    #[tokio::test]
    async fn test_loading_renders_only_indicator() {
        let mut controller = controller(MockHost::with_added(true));
        let before = screen(&controller).join("\n");
        assert!(before.contains("Loading..."));

        controller.mount();
        let lines = screen(&controller);
        assert!(lines[0].starts_with("Loading..."));
        assert!(lines[1..].iter().all(|l| l.trim().is_empty()));
    }

    #[tokio::test]
    async fn test_ready_renders_shell_with_insets_and_error() {
        let mut context = SessionContext::default();
        context.client.added = true;
        context.client.safe_area_insets = Some(SafeAreaInsets {
            top: Some(2),
            bottom: None,
            left: Some(1),
            right: None,
        });
        let mut controller = controller(MockHost::new(Some(context)));
        controller.mount();
        while controller.casts().outcome().is_none() {
            controller.pump().await;
        }

        let lines = screen(&controller);
        assert!(lines[0].trim().is_empty());
        assert!(lines[1].trim().is_empty());
        assert!(lines[2].starts_with(&format!(" {}", DEFAULT_TITLE)));
        assert!(lines[2].contains("added"));
        assert!(lines
            .iter()
            .any(|l| l.contains("API Error: 503 - unavailable")));
    }

    #[tokio::test]
    async fn test_unavailable_renders_message() {
        let mut controller = controller(MockHost::new(None));
        controller.mount();
        while *controller.state() == SessionState::Loading {
            controller.pump().await;
        }

        let lines = screen(&controller);
        assert!(lines[0].contains("Frame host context unavailable"));
    }
}
