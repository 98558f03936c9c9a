pub mod charting;
pub mod dashboard;
pub mod exercises;
pub mod screen;
pub mod typing;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs, Widget},
};

use crate::app::{App, AppState, Connection};

const HORIZONTAL_MARGIN: u16 = 2;

pub(crate) fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub(crate) fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub(crate) fn accent() -> Style {
    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
}

pub(crate) fn neon() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1), // navigation
                Constraint::Length(1), // notice
                Constraint::Min(1),    // page
                Constraint::Length(1), // key hints
            ])
            .split(area);

        render_nav(self, chunks[0], buf);

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), dim().add_modifier(Modifier::ITALIC)))
                .alignment(Alignment::Center)
                .render(chunks[1], buf);
        }

        let screen = screen::current_screen(self.state);
        screen.render(self, chunks[2], buf);

        Paragraph::new(Span::styled(screen.help(self), dim()))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}

fn render_nav(app: &App, area: Rect, buf: &mut Buffer) {
    let (status, status_style) = match &app.connection {
        Connection::Connecting => ("connecting", Style::default().fg(Color::Yellow)),
        Connection::Online => ("online", Style::default().fg(Color::Green)),
        Connection::Offline(_) => ("offline", Style::default().fg(Color::Red)),
    };
    let status_width = status.len() as u16 + 2;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(status_width)])
        .split(area);

    let titles = AppState::ALL
        .iter()
        .map(|s| Line::from(s.to_string()))
        .collect::<Vec<_>>();
    let selected = AppState::ALL
        .iter()
        .position(|s| *s == app.state)
        .unwrap_or(0);

    Tabs::new(titles)
        .select(selected)
        .style(dim())
        .highlight_style(neon().add_modifier(Modifier::UNDERLINED))
        .divider("|")
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(format!("● {}", status), status_style))
        .alignment(Alignment::Right)
        .render(chunks[1], buf);
}
