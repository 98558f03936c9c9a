use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::{accent, bold, dim, neon, screen::Screen};
use crate::app::App;

pub struct ExercisesScreen;

impl Screen for ExercisesScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let browser = &app.exercises;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(dim())
            .title(Span::styled(" EXERCISES ", neon()));
        let inner = block.inner(area);
        block.render(area, buf);

        if browser.entries.is_empty() {
            let message = if browser.loading {
                Span::styled("loading exercises...", Style::default().fg(Color::Yellow))
            } else if let Some(err) = &browser.error {
                Span::styled(format!("failed to load exercises: {}", err), Style::default().fg(Color::Red))
            } else {
                Span::styled("no exercises available", dim())
            };
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .render(inner, buf);
            return;
        }

        // keep the selection in view
        let height = inner.height.max(1) as usize;
        let offset = browser.selected.saturating_sub(height - 1);

        let lines = browser
            .entries
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, entry)| {
                let selected = i == browser.selected;
                let marker = if selected { "▶ " } else { "  " };
                let row_style = if selected {
                    accent().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(marker, neon()),
                    Span::styled(format!("{:<14}", entry.level), dim().patch(row_style)),
                    Span::styled(format!("{:<8}", entry.exercise.id), bold().patch(row_style)),
                    Span::styled(entry.exercise.title.clone(), row_style),
                    Span::styled(format!("  ({} chars)", entry.exercise.char_count()), dim()),
                ])
            })
            .collect::<Vec<_>>();

        Paragraph::new(lines).render(inner, buf);
    }

    fn help(&self, _app: &App) -> String {
        "(↑/↓) select  (enter) practice  (r) refresh  (l) refresh level  (tab) screens  (esc) quit".to_string()
    }
}
