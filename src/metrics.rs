/// Characters counted as one word in every rate calculation.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Lower bound on the minutes used by the live calculation, so the first
/// keystrokes don't produce absurd rates.
pub const MIN_LIVE_MINUTES: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TypingMetrics {
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: usize,
    pub characters_typed: usize,
    pub time_elapsed: f64,
}

/// Positions where the typed character differs from the expected one.
/// Extra input beyond the end of the text is not counted.
pub fn count_errors(text: &str, input: &str) -> usize {
    text.chars()
        .zip(input.chars())
        .filter(|(expected, typed)| expected != typed)
        .count()
}

fn accuracy(typed: usize, errors: usize) -> f64 {
    if typed > 0 {
        ((typed - errors) as f64 / typed as f64) * 100.0
    } else {
        100.0
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Metrics for a finished or sampled run, rounded to one decimal place.
pub fn calculate_metrics(text: &str, input: &str, time_elapsed: f64) -> TypingMetrics {
    let minutes = time_elapsed / 60.0;
    let errors = count_errors(text, input);
    let typed = input.chars().count();
    let words = typed as f64 / CHARS_PER_WORD;

    let wpm = if minutes > 0.0 { words / minutes } else { 0.0 };

    TypingMetrics {
        wpm: round1(wpm),
        accuracy: round1(accuracy(typed, errors)),
        errors,
        characters_typed: typed,
        time_elapsed,
    }
}

/// Metrics shown while typing and in the results panel. Minutes are clamped
/// to [`MIN_LIVE_MINUTES`] and nothing is rounded; callers format.
pub fn live_metrics(text: &str, input: &str, time_elapsed: f64) -> TypingMetrics {
    let errors = count_errors(text, input);
    let typed = input.chars().count();
    let minutes = (time_elapsed / 60.0).max(MIN_LIVE_MINUTES);

    TypingMetrics {
        wpm: (typed as f64 / CHARS_PER_WORD) / minutes,
        accuracy: accuracy(typed, errors),
        errors,
        characters_typed: typed,
        time_elapsed,
    }
}

pub fn format_time(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let remaining = seconds % 60.0;
        format!("{}m {:.0}s", minutes, remaining)
    }
}
