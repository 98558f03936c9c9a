//! State of the one typing session shown on screen.
//!
//! Everything here is transient: the session id and exercise handed out by
//! the server, the typed input, the timers, and what the stats bar and the
//! results panel currently show. Network calls and audio are the app's job;
//! methods here only report what happened so the caller can react.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::api::{Exercise, ServerMetrics, SessionResults};
use crate::metrics::{format_time, live_metrics, TypingMetrics};
use crate::time_series::TimeSeriesPoint;

/// Seconds of the 3-2-1 countdown before a random exercise starts
pub const PRE_COUNTDOWN_SECS: u32 = 3;

pub const DEFAULT_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TimerMode {
    /// Time counts up from the first keystroke
    #[default]
    CountUp,
    /// The session ends when the time limit runs out
    Countdown,
}

impl TimerMode {
    pub fn toggled(self) -> Self {
        match self {
            TimerMode::CountUp => TimerMode::Countdown,
            TimerMode::Countdown => TimerMode::CountUp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub level: String,
    pub timer_mode: TimerMode,
    pub time_limit_secs: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVELS[0].to_string(),
            timer_mode: TimerMode::CountUp,
            time_limit_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing to type
    Idle,
    /// Showing 3-2-1 before asking for a random exercise
    PreCountdown(u32),
    /// Waiting on the server to hand out a session
    Loading,
    /// Exercise shown, waiting for the first keystroke
    Ready,
    Typing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharState {
    Untyped,
    Current,
    Correct,
    Error,
}

/// What the stats bar shows
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDisplay {
    pub wpm: String,
    pub accuracy: String,
    pub time: String,
}

/// What the results panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResults {
    pub metrics: TypingMetrics,
    pub wpm: String,
    pub accuracy: String,
    pub time: String,
    pub errors: String,
}

impl FinalResults {
    fn new(metrics: TypingMetrics) -> Self {
        Self {
            wpm: format!("{:.1}", metrics.wpm),
            accuracy: format!("{:.1}%", metrics.accuracy),
            time: format_time(metrics.time_elapsed),
            errors: metrics.errors.to_string(),
            metrics,
        }
    }

    pub fn to_request_metrics(&self) -> SessionResults {
        SessionResults::from(&self.metrics)
    }
}

/// Fires once per whole second since it was started
#[derive(Debug, Clone, Copy)]
struct SecondTimer {
    started: Instant,
    fired: u64,
}

impl SecondTimer {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            fired: 0,
        }
    }

    /// Number of seconds that elapsed since the last call
    fn due(&mut self, now: Instant) -> u64 {
        let total = now.saturating_duration_since(self.started).as_secs();
        let due = total.saturating_sub(self.fired);
        self.fired = total;
        due
    }
}

#[derive(Debug, Clone, Copy)]
enum SessionTimer {
    CountUp(SecondTimer),
    Countdown { timer: SecondTimer, remaining: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Nothing,
    /// Displayed values changed
    Redraw,
    /// The pre-countdown moved on and still has `remaining` seconds
    PreCountdownStep { remaining: u32 },
    /// The pre-countdown reached zero
    PreCountdownDone,
    /// The countdown timer ran out
    TimeUp,
}

#[derive(Debug)]
pub struct TypingSession {
    pub settings: SessionSettings,
    pub phase: Phase,
    pub session_id: Option<String>,
    pub exercise: Option<Exercise>,
    pub input: String,
    pub started_at: Option<Instant>,
    pub char_states: Vec<CharState>,
    pub display: LiveDisplay,
    pub results: Option<FinalResults>,
    /// Live wpm sampled once a second, for the results chart
    pub wpm_trace: Vec<TimeSeriesPoint>,
    timer: Option<SessionTimer>,
    pre_countdown: Option<SecondTimer>,
}

impl TypingSession {
    pub fn new(settings: SessionSettings) -> Self {
        let mut session = Self {
            settings,
            phase: Phase::Idle,
            session_id: None,
            exercise: None,
            input: String::new(),
            started_at: None,
            char_states: Vec::new(),
            display: LiveDisplay {
                wpm: String::new(),
                accuracy: String::new(),
                time: String::new(),
            },
            results: None,
            wpm_trace: Vec::new(),
            timer: None,
            pre_countdown: None,
        };
        session.reset_ui_state();
        session
    }

    pub fn title(&self) -> &str {
        self.exercise.as_ref().map_or("", |e| e.title.as_str())
    }

    pub fn text(&self) -> &str {
        self.exercise.as_ref().map_or("", |e| e.text.as_str())
    }

    pub fn typing_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn accepts_input(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Typing)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// True when the input is at least as long as the exercise text
    pub fn covers_text(&self) -> bool {
        self.exercise
            .as_ref()
            .is_some_and(|e| self.input.chars().count() >= e.char_count())
    }

    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        self.started_at
            .map_or(0.0, |start| now.saturating_duration_since(start).as_secs_f64())
    }

    /// Show an exercise: new title, one untyped cell per character.
    pub fn display_exercise(&mut self, exercise: Exercise) {
        self.char_states = vec![CharState::Untyped; exercise.char_count()];
        self.exercise = Some(exercise);
        self.phase = Phase::Ready;
    }

    /// Back to a fresh, untouched run of the current exercise.
    pub fn reset_ui_state(&mut self) {
        self.input.clear();
        self.started_at = None;
        self.timer = None;
        self.pre_countdown = None;
        self.results = None;
        self.wpm_trace.clear();

        self.display.wpm = "0".to_string();
        self.display.accuracy = "100%".to_string();
        self.display.time = match self.settings.timer_mode {
            TimerMode::Countdown => format_time(self.settings.time_limit_secs as f64),
            TimerMode::CountUp => "0s".to_string(),
        };

        self.char_states.fill(CharState::Untyped);
        self.phase = if self.exercise.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };
    }

    pub fn begin_pre_countdown(&mut self, now: Instant) {
        self.pre_countdown = Some(SecondTimer::new(now));
        self.phase = Phase::PreCountdown(PRE_COUNTDOWN_SECS);
    }

    pub fn mark_loading(&mut self) {
        self.pre_countdown = None;
        self.phase = Phase::Loading;
    }

    pub fn push_char(&mut self, c: char) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.input.push(c);
        true
    }

    pub fn pop_char(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.input.pop().is_some()
    }

    /// First keystroke: record the start and arm the timer for the mode.
    pub fn start_typing(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.phase = Phase::Typing;
        self.timer = Some(match self.settings.timer_mode {
            TimerMode::Countdown => {
                let remaining = self.settings.time_limit_secs as i64;
                self.display.time = format_time(remaining as f64);
                SessionTimer::Countdown {
                    timer: SecondTimer::new(now),
                    remaining,
                }
            }
            TimerMode::CountUp => SessionTimer::CountUp(SecondTimer::new(now)),
        });
    }

    pub fn update_character_styling(&mut self) {
        let typed: Vec<char> = self.input.chars().collect();
        let text = self.exercise.as_ref().map_or("", |e| e.text.as_str());

        for (i, (state, expected)) in self.char_states.iter_mut().zip(text.chars()).enumerate() {
            *state = match typed.get(i) {
                Some(&c) if c == expected => CharState::Correct,
                Some(_) => CharState::Error,
                None if i == typed.len() => CharState::Current,
                None => CharState::Untyped,
            };
        }
    }

    fn current_metrics(&self, now: Instant) -> TypingMetrics {
        live_metrics(self.text(), &self.input, self.elapsed_secs(now))
    }

    /// Refresh the stats bar from the local input. The countdown keeps
    /// showing the time left rather than the time spent.
    pub fn update_stats(&mut self, now: Instant) {
        if !self.typing_started() {
            return;
        }

        let m = self.current_metrics(now);
        if self.settings.timer_mode == TimerMode::CountUp {
            self.display.time = format_time(m.time_elapsed);
        }
        self.display.wpm = format!("{:.1}", m.wpm);
        self.display.accuracy = format!("{:.1}%", m.accuracy);

        tracing::debug!(
            "stats update - wpm: {:.1}, accuracy: {:.1}%, chars: {}, errors: {}, time: {:.1}s",
            m.wpm,
            m.accuracy,
            m.characters_typed,
            m.errors,
            m.time_elapsed
        );
    }

    /// Show what the server computed for this session.
    pub fn apply_server_metrics(&mut self, metrics: &ServerMetrics) {
        self.display.wpm = format!("{:.1}", metrics.wpm);
        self.display.accuracy = format!("{:.1}%", metrics.accuracy);
        if self.settings.timer_mode == TimerMode::CountUp {
            self.display.time = format_time(metrics.time_elapsed);
        }
    }

    fn record_trace(&mut self, now: Instant) {
        let m = self.current_metrics(now);
        self.wpm_trace
            .push(TimeSeriesPoint::new(m.time_elapsed.round(), m.wpm));
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Phase::PreCountdown(remaining) = self.phase {
            let Some(timer) = self.pre_countdown.as_mut() else {
                return TickOutcome::Nothing;
            };
            let due = timer.due(now) as u32;
            if due == 0 {
                return TickOutcome::Nothing;
            }
            let remaining = remaining.saturating_sub(due);
            if remaining == 0 {
                self.mark_loading();
                return TickOutcome::PreCountdownDone;
            }
            self.phase = Phase::PreCountdown(remaining);
            return TickOutcome::PreCountdownStep { remaining };
        }

        if self.phase != Phase::Typing {
            return TickOutcome::Nothing;
        }

        match self.timer {
            Some(SessionTimer::CountUp(mut timer)) => {
                let due = timer.due(now);
                self.timer = Some(SessionTimer::CountUp(timer));
                if due == 0 {
                    return TickOutcome::Nothing;
                }
                self.update_stats(now);
                self.record_trace(now);
                TickOutcome::Redraw
            }
            Some(SessionTimer::Countdown {
                mut timer,
                remaining,
            }) => {
                let due = timer.due(now) as i64;
                if due == 0 {
                    return TickOutcome::Nothing;
                }
                let remaining = remaining - due;
                self.timer = Some(SessionTimer::Countdown { timer, remaining });
                self.display.time = format_time(remaining.max(0) as f64);
                self.record_trace(now);
                if remaining <= 0 {
                    TickOutcome::TimeUp
                } else {
                    TickOutcome::Redraw
                }
            }
            None => TickOutcome::Nothing,
        }
    }

    /// Finish the session: stop the timers and compute the final numbers
    /// from the local input. Returns `None` if it was already finished.
    pub fn complete(&mut self, now: Instant) -> Option<&FinalResults> {
        if self.phase == Phase::Finished {
            return None;
        }

        self.timer = None;
        self.pre_countdown = None;
        self.update_character_styling();

        let metrics = self.current_metrics(now);
        self.results = Some(FinalResults::new(metrics));
        self.phase = Phase::Finished;
        self.results.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exercise(text: &str) -> Exercise {
        Exercise {
            id: "b1".into(),
            title: "Home Row".into(),
            text: text.into(),
        }
    }

    fn ready_session(text: &str, mode: TimerMode) -> TypingSession {
        let mut s = TypingSession::new(SessionSettings {
            timer_mode: mode,
            time_limit_secs: 30,
            ..Default::default()
        });
        s.session_id = Some("s1".into());
        s.display_exercise(exercise(text));
        s
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_new_session_is_idle_with_defaults() {
        let s = TypingSession::new(SessionSettings::default());
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.display.wpm, "0");
        assert_eq!(s.display.accuracy, "100%");
        assert_eq!(s.display.time, "0s");
        assert!(!s.accepts_input());
    }

    #[test]
    fn test_countdown_mode_shows_time_limit() {
        let s = TypingSession::new(SessionSettings {
            timer_mode: TimerMode::Countdown,
            time_limit_secs: 60,
            ..Default::default()
        });
        assert_eq!(s.display.time, "1m 0s");
    }

    #[test]
    fn test_display_exercise_builds_cells() {
        let s = ready_session("asdf", TimerMode::CountUp);
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(s.title(), "Home Row");
        assert_eq!(s.char_states, vec![CharState::Untyped; 4]);
        assert!(s.accepts_input());
    }

    #[test]
    fn test_character_styling() {
        let mut s = ready_session("asdf", TimerMode::CountUp);
        s.push_char('a');
        s.push_char('x');
        s.update_character_styling();
        assert_eq!(
            s.char_states,
            vec![
                CharState::Correct,
                CharState::Error,
                CharState::Current,
                CharState::Untyped
            ]
        );

        s.pop_char();
        s.update_character_styling();
        assert_eq!(s.char_states[1], CharState::Current);
    }

    #[test]
    fn test_covers_text() {
        let mut s = ready_session("ab", TimerMode::CountUp);
        assert!(!s.covers_text());
        s.push_char('a');
        assert!(!s.covers_text());
        s.push_char('z');
        assert!(s.covers_text());
    }

    #[test]
    fn test_update_stats_requires_start() {
        let mut s = ready_session("hello", TimerMode::CountUp);
        s.push_char('h');
        s.update_stats(Instant::now());
        assert_eq!(s.display.wpm, "0");
    }

    #[test]
    fn test_update_stats_count_up() {
        let start = Instant::now();
        let mut s = ready_session("hello world", TimerMode::CountUp);
        s.start_typing(start);
        for c in "hellx".chars() {
            s.push_char(c);
        }
        s.update_stats(start + secs(6));

        // 5 chars = 1 word in 0.1 minutes
        assert_eq!(s.display.wpm, "10.0");
        assert_eq!(s.display.accuracy, "80.0%");
        assert_eq!(s.display.time, "6.0s");
    }

    #[test]
    fn test_update_stats_countdown_keeps_remaining_time() {
        let start = Instant::now();
        let mut s = ready_session("hello", TimerMode::Countdown);
        s.start_typing(start);
        assert_eq!(s.display.time, "30.0s");
        s.push_char('h');
        s.update_stats(start + secs(2));
        assert_eq!(s.display.time, "30.0s");
    }

    #[test]
    fn test_count_up_tick_fires_each_second() {
        let start = Instant::now();
        let mut s = ready_session("hello", TimerMode::CountUp);
        s.start_typing(start);
        s.push_char('h');

        assert_eq!(s.tick(start + Duration::from_millis(500)), TickOutcome::Nothing);
        assert_eq!(s.tick(start + secs(1)), TickOutcome::Redraw);
        assert_eq!(s.tick(start + Duration::from_millis(1500)), TickOutcome::Nothing);
        assert_eq!(s.display.time, "1.0s");
        assert_eq!(s.wpm_trace.len(), 1);
        assert_eq!(s.wpm_trace[0].t, 1.0);
    }

    #[test]
    fn test_countdown_runs_out() {
        let start = Instant::now();
        let mut s = ready_session("hello", TimerMode::Countdown);
        s.start_typing(start);

        assert_eq!(s.tick(start + secs(1)), TickOutcome::Redraw);
        assert_eq!(s.display.time, "29.0s");
        assert_eq!(s.tick(start + secs(29)), TickOutcome::Redraw);
        assert_eq!(s.display.time, "1.0s");
        assert_eq!(s.tick(start + secs(30)), TickOutcome::TimeUp);
        assert_eq!(s.display.time, "0.0s");
    }

    #[test]
    fn test_pre_countdown_steps_then_done() {
        let start = Instant::now();
        let mut s = TypingSession::new(SessionSettings::default());
        s.begin_pre_countdown(start);
        assert_eq!(s.phase, Phase::PreCountdown(3));
        assert!(!s.accepts_input());

        assert_eq!(s.tick(start + Duration::from_millis(900)), TickOutcome::Nothing);
        assert_eq!(
            s.tick(start + secs(1)),
            TickOutcome::PreCountdownStep { remaining: 2 }
        );
        assert_eq!(
            s.tick(start + secs(2)),
            TickOutcome::PreCountdownStep { remaining: 1 }
        );
        assert_eq!(s.tick(start + secs(3)), TickOutcome::PreCountdownDone);
        assert_eq!(s.phase, Phase::Loading);
    }

    #[test]
    fn test_pre_countdown_catches_up_after_stall() {
        let start = Instant::now();
        let mut s = TypingSession::new(SessionSettings::default());
        s.begin_pre_countdown(start);
        assert_eq!(s.tick(start + secs(5)), TickOutcome::PreCountdownDone);
    }

    #[test]
    fn test_complete_computes_final_results_once() {
        let start = Instant::now();
        let mut s = ready_session("abcde", TimerMode::CountUp);
        s.start_typing(start);
        for c in "abxde".chars() {
            s.push_char(c);
        }

        let results = s.complete(start + secs(12)).cloned().unwrap();
        // 1 word in 0.2 minutes
        assert_eq!(results.wpm, "5.0");
        assert_eq!(results.accuracy, "80.0%");
        assert_eq!(results.time, "12.0s");
        assert_eq!(results.errors, "1");
        assert_eq!(s.phase, Phase::Finished);
        assert!(!s.accepts_input());
        assert!(!s.push_char('z'));

        assert!(s.complete(start + secs(20)).is_none());
        assert_eq!(s.results.as_ref().unwrap().time, "12.0s");
    }

    #[test]
    fn test_complete_stops_timers() {
        let start = Instant::now();
        let mut s = ready_session("abc", TimerMode::Countdown);
        s.start_typing(start);
        s.complete(start + secs(1));
        assert_eq!(s.tick(start + secs(40)), TickOutcome::Nothing);
    }

    #[test]
    fn test_reset_ui_state_clears_run() {
        let start = Instant::now();
        let mut s = ready_session("abc", TimerMode::CountUp);
        s.start_typing(start);
        s.push_char('a');
        s.update_character_styling();
        s.complete(start + secs(3));

        s.reset_ui_state();
        assert_eq!(s.phase, Phase::Ready);
        assert!(s.input.is_empty());
        assert!(!s.typing_started());
        assert!(s.results.is_none());
        assert_eq!(s.char_states, vec![CharState::Untyped; 3]);
        assert_eq!(s.display.wpm, "0");
        // the exercise and session survive a reset
        assert_eq!(s.session_id.as_deref(), Some("s1"));
        assert_eq!(s.text(), "abc");
    }

    #[test]
    fn test_apply_server_metrics() {
        let mut s = ready_session("abc", TimerMode::CountUp);
        s.apply_server_metrics(&ServerMetrics {
            wpm: 42.26,
            accuracy: 97.0,
            time_elapsed: 75.0,
            ..Default::default()
        });
        assert_eq!(s.display.wpm, "42.3");
        assert_eq!(s.display.accuracy, "97.0%");
        assert_eq!(s.display.time, "1m 15s");
    }

    #[test]
    fn test_timer_mode_names() {
        assert_eq!(TimerMode::CountUp.to_string(), "count-up");
        assert_eq!(TimerMode::Countdown.to_string(), "countdown");
        assert_eq!(TimerMode::CountUp.toggled(), TimerMode::Countdown);
    }
}
