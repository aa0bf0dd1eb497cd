use crate::feeds::{FeedItem, FetchOutcome};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// The recent-casts list. Holds the latest outcome only; every update
/// replaces whatever was shown before.
#[derive(Debug, Clone)]
pub struct RecentCasts {
    outcome: Option<FetchOutcome>,
    scroll_state: ListState,
}

impl Default for RecentCasts {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentCasts {
    pub fn new() -> Self {
        let mut scroll_state = ListState::default();
        scroll_state.select(Some(0));

        Self {
            outcome: None,
            scroll_state,
        }
    }

    pub fn update_data(&mut self, outcome: FetchOutcome) {
        if let FetchOutcome::Success(snapshot) = &outcome {
            let last = snapshot.len().saturating_sub(1);
            if self.scroll_state.selected().unwrap_or(0) > last {
                self.scroll_state.select(Some(last));
            }
        }
        self.outcome = Some(outcome);
    }

    pub fn outcome(&self) -> Option<&FetchOutcome> {
        self.outcome.as_ref()
    }

    pub fn selected(&self) -> usize {
        self.scroll_state.selected().unwrap_or(0)
    }

    fn len(&self) -> usize {
        match &self.outcome {
            Some(FetchOutcome::Success(snapshot)) => snapshot.len(),
            _ => 0,
        }
    }

    pub fn scroll_up(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected > 0 {
                self.scroll_state.select(Some(selected - 1));
            }
        }
    }

    pub fn scroll_down(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected < self.len().saturating_sub(1) {
                self.scroll_state.select(Some(selected + 1));
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let snapshot = match &self.outcome {
            None => {
                let loading = Paragraph::new("Loading recent casts...")
                    .style(Style::default().fg(Color::DarkGray));
                frame.render_widget(loading, area);
                return;
            }
            Some(FetchOutcome::Failure(message)) => {
                let error = Paragraph::new(message.as_str())
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true });
                frame.render_widget(error, area);
                return;
            }
            Some(FetchOutcome::Success(snapshot)) => snapshot,
        };

        if snapshot.is_empty() {
            let empty =
                Paragraph::new("No recent casts").style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, area);
            return;
        }

        let text_width = area.width.saturating_sub(2).max(1) as usize;
        let items: Vec<ListItem> = snapshot
            .items()
            .iter()
            .map(|cast| cast_card(cast, text_width))
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▌");

        let mut state = self.scroll_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn cast_card(cast: &FeedItem, text_width: usize) -> ListItem<'static> {
    let mut lines = Vec::new();

    let mut header = vec![Span::styled(
        cast.author_display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unknown user".to_string()),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(username) = &cast.author_username {
        header.push(Span::styled(
            format!("  @{}", username),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(header));

    for line in textwrap::wrap(&cast.text, text_width) {
        lines.push(Line::from(line.into_owned()));
    }

    lines.push(Line::from(Span::styled(
        format_timestamp(&cast.timestamp),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    ListItem::new(lines)
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}
