//! Exercise browser: every level's exercises in one list.

use crate::api::{Exercise, ExerciseCatalog};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub level: String,
    pub exercise: Exercise,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseBrowser {
    pub entries: Vec<ExerciseEntry>,
    pub selected: usize,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

impl ExerciseBrowser {
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Replace the listing. A catalog for a single level only replaces that
    /// level's entries.
    pub fn apply_catalog(&mut self, level: Option<&str>, catalog: ExerciseCatalog) {
        let keep_selected = self.selected_entry().map(|e| e.exercise.id.clone());

        match level {
            Some(level) => self.entries.retain(|e| e.level != level),
            None => self.entries.clear(),
        }
        for (level, exercises) in catalog {
            self.entries.extend(exercises.into_iter().map(|exercise| ExerciseEntry {
                level: level.clone(),
                exercise,
            }));
        }
        self.entries.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.exercise.id.cmp(&b.exercise.id)));

        self.selected = keep_selected
            .and_then(|id| self.entries.iter().position(|e| e.exercise.id == id))
            .unwrap_or(0);
        self.loading = false;
        self.loaded = true;
        self.error = None;
    }

    pub fn apply_error(&mut self, err: &ApiError) {
        tracing::error!(error = %err, "failed to load exercises");
        self.loading = false;
        self.error = Some(err.to_string());
    }

    /// Levels present in the listing, in order
    pub fn levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = self.entries.iter().map(|e| e.level.clone()).collect();
        levels.dedup();
        levels
    }

    pub fn select_next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1) % self.entries.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.entries.is_empty() {
            self.selected = self.selected.checked_sub(1).unwrap_or(self.entries.len() - 1);
        }
    }

    pub fn selected_entry(&self) -> Option<&ExerciseEntry> {
        self.entries.get(self.selected)
    }
}
