use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::{accent, bold, charting, dim, neon, screen::Screen};
use crate::app::App;
use crate::session::{CharState, FinalResults, Phase, TimerMode, TypingSession};

pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let session = &app.session;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // title
                Constraint::Length(1), // stats bar
                Constraint::Length(1),
                Constraint::Min(1), // text, countdown or results
            ])
            .split(area);

        let title = match session.title() {
            "" => "KASONGO".to_string(),
            t => app.glitch.apply(t).into_owned(),
        };
        Paragraph::new(Span::styled(title, neon()))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(stats_line(app))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        match (session.phase, &session.results) {
            (Phase::PreCountdown(n), _) => render_countdown(n, chunks[3], buf),
            (Phase::Loading, _) => render_message("loading exercise...", chunks[3], buf),
            (Phase::Finished, Some(results)) => render_results(session, results, chunks[3], buf),
            (Phase::Idle, _) if session.exercise.is_none() => {
                render_message("press → for a new exercise", chunks[3], buf)
            }
            _ => render_text(session, chunks[3], buf),
        }
    }

    fn help(&self, app: &App) -> String {
        if app.session.is_finished() {
            "(r) try again  (n) next exercise  (d) dashboard  (o) open web dashboard  (esc) quit"
                .to_string()
        } else {
            "(←) try again  (→) new exercise  (^l) level  (^t) timer  (^a) audio  (tab) screens  (esc) quit"
                .to_string()
        }
    }
}

fn stats_line(app: &App) -> Line<'static> {
    let session = &app.session;
    let label = dim();
    let sep = Span::styled("  |  ", dim());

    Line::from(vec![
        Span::styled("WPM ", label),
        Span::styled(session.display.wpm.clone(), accent()),
        sep.clone(),
        Span::styled("ACC ", label),
        Span::styled(session.display.accuracy.clone(), accent()),
        sep.clone(),
        Span::styled("TIME ", label),
        Span::styled(session.display.time.clone(), accent()),
        sep.clone(),
        Span::styled(
            match session.settings.timer_mode {
                TimerMode::CountUp => "count-up".to_string(),
                TimerMode::Countdown => format!("countdown {}s", session.settings.time_limit_secs),
            },
            bold(),
        ),
        sep.clone(),
        Span::styled(session.settings.level.clone(), bold()),
        sep,
        Span::styled(
            if app.audio.enabled { "audio on" } else { "audio off" },
            bold(),
        ),
    ])
}

fn render_message(message: &str, area: Rect, buf: &mut Buffer) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        message.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(rows[1], buf);
}

fn render_countdown(remaining: u32, area: Rect, buf: &mut Buffer) {
    render_message(&format!("get ready... {}", remaining), area, buf);
}

fn char_style(state: CharState) -> Style {
    let bold_style = bold();
    match state {
        CharState::Correct => bold_style.fg(Color::Green),
        CharState::Error => bold_style.fg(Color::Red).add_modifier(Modifier::UNDERLINED),
        CharState::Current => bold_style
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED | Modifier::SLOW_BLINK),
        CharState::Untyped => bold_style.add_modifier(Modifier::DIM),
    }
}

fn render_text(session: &TypingSession, area: Rect, buf: &mut Buffer) {
    let text = session.text();

    let spans = text
        .chars()
        .zip(session.char_states.iter().copied())
        .map(|(c, state)| {
            let shown = match (c, state) {
                (' ', CharState::Error) => "·".to_string(),
                (c, _) => c.to_string(),
            };
            Span::styled(shown, char_style(state))
        })
        .collect::<Vec<Span>>();

    let max_chars_per_line = area.width.max(1) as usize;
    let fits_one_line = text.width() <= max_chars_per_line;
    let occupied_lines = if fits_one_line {
        1
    } else {
        (text.width() as f64 / max_chars_per_line as f64).ceil() as u16 + 1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(occupied_lines) / 3),
            Constraint::Min(occupied_lines),
        ])
        .split(area);

    Paragraph::new(Line::from(spans))
        .alignment(if fits_one_line {
            // short drills look best centered
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);
}

fn render_results(session: &TypingSession, results: &FinalResults, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // chart
            Constraint::Length(1), // numbers
        ])
        .split(area);

    let expected = match session.settings.timer_mode {
        TimerMode::Countdown => Some(session.settings.time_limit_secs as f64),
        TimerMode::CountUp => Some(results.metrics.time_elapsed),
    };
    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(&session.wpm_trace, expected);
    let tuples = charting::as_tuples(&session.wpm_trace);

    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    let bold_style = bold();
    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(dim())
                .title(Span::styled(" EXERCISE COMPLETE ", neon())),
        )
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{} wpm", results.wpm), accent()),
        Span::styled("   ", bold_style),
        Span::styled(format!("{} acc", results.accuracy), accent()),
        Span::styled("   ", bold_style),
        Span::styled(results.time.clone(), accent()),
        Span::styled("   ", bold_style),
        Span::styled(format!("{} errors", results.errors), accent()),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}
