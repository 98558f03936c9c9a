use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Widget},
};

use super::{accent, bold, charting, dim, neon, screen::Screen};
use crate::app::App;
use crate::dashboard::{format_progress_label, DashboardState, RecentSessions, NO_SESSIONS};

pub struct DashboardScreen;

impl Screen for DashboardScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let state = &app.dashboard;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // status
                Constraint::Length(3), // stat cards
                Constraint::Min(6),    // progress chart
                Constraint::Length(1), // progress summary
                Constraint::Length(8), // recent sessions
            ])
            .split(area);

        let status = if state.loading {
            Span::styled("loading statistics...", Style::default().fg(Color::Yellow))
        } else if let Some(err) = &state.error {
            Span::styled(format!("failed to load statistics: {}", err), Style::default().fg(Color::Red))
        } else {
            Span::styled("", dim())
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        render_cards(state, chunks[1], buf);
        render_progress(state, chunks[2], buf);

        let summary = match &state.progress_summary {
            Some(s) => format!(
                "{} sessions  ·  mean {:.1} wpm  ·  sd {:.1}",
                s.sessions, s.mean_wpm, s.std_dev_wpm
            ),
            None => String::new(),
        };
        Paragraph::new(Span::styled(summary, dim()))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        render_sessions(state, chunks[4], buf);
    }

    fn help(&self, _app: &App) -> String {
        "(r) reload  (o) open in browser  (tab) screens  (esc) quit".to_string()
    }
}

fn render_cards(state: &DashboardState, area: Rect, buf: &mut Buffer) {
    let cards = [
        ("Best WPM", state.summary.best_wpm.as_str()),
        ("Avg WPM", state.summary.average_wpm.as_str()),
        ("Accuracy", state.summary.accuracy.as_str()),
        ("Sessions", state.summary.total_sessions.as_str()),
    ];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for ((title, value), column) in cards.iter().zip(columns.iter()) {
        Paragraph::new(Span::styled(value.to_string(), accent()))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(dim())
                    .title(Span::styled(*title, bold())),
            )
            .render(*column, buf);
    }
}

fn render_progress(state: &DashboardState, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(dim())
        .title(Span::styled(" WPM PROGRESS ", neon()));

    let points = &state.progress.wpm;
    if points.is_empty() {
        Paragraph::new(Span::styled("no progress yet", dim()))
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
        return;
    }

    let tuples = charting::as_tuples(points);
    let [x_min, x_max] = charting::x_bounds(points);
    let (_, highest_wpm) = charting::compute_chart_params(points, None);

    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    let bold_style = bold();
    Chart::new(datasets)
        .block(block)
        .x_axis(Axis::default().bounds([x_min, x_max]).labels(vec![
            Span::styled(format_progress_label(x_min), bold_style),
            Span::styled(format_progress_label(x_max), bold_style),
        ]))
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        )
        .render(area, buf);
}

fn render_sessions(state: &DashboardState, area: Rect, buf: &mut Buffer) {
    let header = Row::new(["Date", "Exercise", "WPM", "Accuracy", "Time"].map(Cell::from))
        .style(bold());

    let rows: Vec<Row> = match &state.sessions {
        RecentSessions::Empty => vec![Row::new(vec![Cell::from(Line::styled(NO_SESSIONS, dim()))])],
        RecentSessions::Rows(rows) => rows
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(r.date.clone()),
                    Cell::from(r.exercise.clone()),
                    Cell::from(r.wpm.clone()),
                    Cell::from(r.accuracy.clone()),
                    Cell::from(r.time.clone()),
                ])
            })
            .collect(),
    };

    let widths = match &state.sessions {
        RecentSessions::Empty => vec![Constraint::Percentage(100)],
        RecentSessions::Rows(_) => vec![
            Constraint::Length(17),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    };

    Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(dim())
                .title(Span::styled(" RECENT SESSIONS ", neon())),
        )
        .render(area, buf);
}
