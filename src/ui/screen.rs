use ratatui::{buffer::Buffer, layout::Rect};

use crate::{
    app::{App, AppState},
    ui::{dashboard::DashboardScreen, exercises::ExercisesScreen, typing::TypingScreen},
};

/// A UI Screen boundary: renders one page of the app below the navigation bar
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);

    /// Key hints shown at the bottom of the page
    fn help(&self, app: &App) -> String;
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::Typing => Box::new(TypingScreen),
        AppState::Exercises => Box::new(ExercisesScreen),
        AppState::Dashboard => Box::new(DashboardScreen),
    }
}
