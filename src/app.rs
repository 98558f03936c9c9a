//! Ties the typing session, the dashboard and the exercise browser to the
//! api worker, the audio cues and the keyboard.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, error, info, warn};
use webbrowser::Browser;

use crate::api::{
    ApiJob, ApiOutcome, CompleteSessionRequest, JobQueue, KeystrokeRequest, KeystrokeResponse,
    StartPurpose, StartSessionRequest, StartedSession,
};
use crate::audio::{AudioFeedback, Sound};
use crate::config::{Config, ConfigStore};
use crate::dashboard::DashboardState;
use crate::effects::GlitchEffect;
use crate::error::{ApiError, ApiResult};
use crate::exercises::ExerciseBrowser;
use crate::session::{Phase, TickOutcome, TypingSession, DEFAULT_LEVELS};

pub const TICK_RATE_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    Typing,
    Exercises,
    Dashboard,
}

impl AppState {
    pub const ALL: [AppState; 3] = [AppState::Typing, AppState::Exercises, AppState::Dashboard];

    pub fn next(self) -> Self {
        match self {
            AppState::Typing => AppState::Exercises,
            AppState::Exercises => AppState::Dashboard,
            AppState::Dashboard => AppState::Typing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Connection {
    Connecting,
    Online,
    Offline(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct App {
    pub state: AppState,
    pub session: TypingSession,
    pub dashboard: DashboardState,
    pub exercises: ExerciseBrowser,
    pub audio: AudioFeedback,
    pub config: Config,
    pub levels: Vec<String>,
    pub connection: Connection,
    pub glitch: GlitchEffect,
    /// One-line status message under the navigation bar
    pub notice: Option<String>,
    jobs: JobQueue,
    store: Option<Box<dyn ConfigStore>>,
    /// Ticket of the only session start whose answer is still wanted
    pending_start: Option<u64>,
    start_tickets: u64,
}

impl App {
    pub fn new(config: Config, jobs: JobQueue) -> Self {
        let mut levels: Vec<String> = DEFAULT_LEVELS.iter().map(|l| l.to_string()).collect();
        if !levels.contains(&config.level) {
            levels.push(config.level.clone());
        }

        Self {
            state: AppState::Typing,
            session: TypingSession::new(config.session_settings()),
            dashboard: DashboardState::default(),
            exercises: ExerciseBrowser::default(),
            audio: config.audio.feedback(),
            levels,
            connection: Connection::Connecting,
            glitch: GlitchEffect::new(Instant::now()),
            notice: None,
            jobs,
            store: None,
            pending_start: None,
            start_tickets: 0,
            config,
        }
    }

    pub fn with_store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_audio(mut self, audio: AudioFeedback) -> Self {
        self.audio = audio;
        self
    }

    /// First session: the requested exercise if there is one, else a random one
    pub fn boot(&mut self, exercise_id: Option<&str>, now: Instant) {
        match exercise_id {
            Some(id) => {
                let level = self.session.settings.level.clone();
                self.load_exercise(&level, id);
            }
            None => self.start_new_session(now),
        }
    }

    fn submit(&mut self, job: ApiJob) {
        if let Err(err) = self.jobs.submit(job) {
            error!(error = %err, "could not queue request");
            self.connection = Connection::Offline(err.to_string());
        }
    }

    fn observe<T>(&mut self, result: &ApiResult<T>) {
        match result {
            Ok(_) => self.connection = Connection::Online,
            Err(ApiError::Http(err)) => self.connection = Connection::Offline(err.to_string()),
            Err(_) => {}
        }
    }

    pub fn start_new_session(&mut self, now: Instant) {
        info!(level = %self.session.settings.level, "starting new session");
        self.notice = None;
        self.pending_start = None;
        self.session.reset_ui_state();
        self.session.begin_pre_countdown(now);
    }

    pub fn load_exercise(&mut self, level: &str, exercise_id: &str) {
        info!(%level, %exercise_id, "loading exercise");
        self.notice = Some(format!("loading {}...", exercise_id));
        self.submit(ApiJob::FetchExercise {
            level: level.to_string(),
            exercise_id: exercise_id.to_string(),
        });
    }

    /// Same exercise again, or a new one if nothing was loaded yet
    pub fn reset_exercise(&mut self, now: Instant) {
        let Some(exercise_id) = self.session.exercise.as_ref().map(|e| e.id.clone()) else {
            self.start_new_session(now);
            return;
        };

        self.notice = None;
        self.session.results = None;
        self.session.mark_loading();
        let request = StartSessionRequest::for_exercise(self.session.settings.level.clone(), exercise_id);
        self.request_start(request, StartPurpose::Retry);
    }

    /// Ask for a session; any earlier start still in flight is superseded
    fn request_start(&mut self, request: StartSessionRequest, purpose: StartPurpose) {
        self.start_tickets += 1;
        let ticket = self.start_tickets;
        self.pending_start = Some(ticket);
        self.submit(ApiJob::StartSession {
            request,
            purpose,
            ticket,
        });
    }

    pub fn load_user_stats(&mut self) {
        self.dashboard.begin_load();
        self.submit(ApiJob::LoadUserStats);
    }

    pub fn load_exercises(&mut self) {
        self.exercises.begin_load();
        self.submit(ApiJob::ListExercises { level: None });
    }

    /// Reload only the level of the selected exercise
    pub fn reload_selected_level(&mut self) {
        let Some(level) = self.exercises.selected_entry().map(|e| e.level.clone()) else {
            self.load_exercises();
            return;
        };
        self.exercises.begin_load();
        self.submit(ApiJob::ListExercises { level: Some(level) });
    }

    pub fn switch_to(&mut self, state: AppState) {
        self.state = state;
        match state {
            AppState::Dashboard if !self.dashboard.loaded && !self.dashboard.loading => {
                self.load_user_stats()
            }
            AppState::Exercises if !self.exercises.loaded && !self.exercises.loading => {
                self.load_exercises()
            }
            _ => {}
        }
    }

    /// Returns true when the screen needs redrawing
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let glitched = self.glitch.update(now);

        let changed = match self.session.tick(now) {
            TickOutcome::Nothing => false,
            TickOutcome::Redraw => true,
            TickOutcome::PreCountdownStep { remaining } => {
                debug!(remaining, "pre-countdown");
                self.audio.play(Sound::Keypress);
                true
            }
            TickOutcome::PreCountdownDone => {
                self.audio.play(Sound::Keypress);
                let request = StartSessionRequest::random(self.session.settings.level.clone());
                self.request_start(request, StartPurpose::New);
                true
            }
            TickOutcome::TimeUp => {
                info!("time limit reached");
                self.handle_session_complete(now);
                true
            }
        };

        glitched || changed
    }

    pub fn type_char(&mut self, c: char, now: Instant) {
        if self.session.push_char(c) {
            self.handle_typing(Some(c), now);
        }
    }

    pub fn backspace(&mut self, now: Instant) {
        if self.session.pop_char() {
            self.handle_typing(None, now);
        }
    }

    /// React to an input change; `typed` is the inserted character, if any.
    fn handle_typing(&mut self, typed: Option<char>, now: Instant) {
        self.session.update_character_styling();

        if self.session.covers_text() {
            if !self.session.typing_started() {
                self.session.start_typing(now);
            }
            self.handle_session_complete(now);
            return;
        }

        self.send_typed(typed, now);
        // live stats follow every input change once typing has begun
        self.session.update_stats(now);
    }

    fn send_typed(&mut self, typed: Option<char>, now: Instant) {
        let (Some(session_id), Some(exercise_id)) = (
            self.session.session_id.clone(),
            self.session.exercise.as_ref().map(|e| e.id.clone()),
        ) else {
            return;
        };
        if self.session.input.is_empty() {
            return;
        }

        if !self.session.typing_started() {
            self.session.start_typing(now);
            self.audio.play(Sound::Keypress);
        }

        if let Some(c) = typed {
            let job = ApiJob::SubmitKeystroke {
                session_id,
                request: KeystrokeRequest {
                    key: c.to_string(),
                    exercise_id,
                },
                input: self.session.input.clone(),
            };
            self.submit(job);
        }
    }

    pub fn handle_session_complete(&mut self, now: Instant) {
        let Some(results) = self.session.complete(now).cloned() else {
            return;
        };

        info!(
            wpm = %results.wpm,
            accuracy = %results.accuracy,
            time = %results.time,
            errors = %results.errors,
            "session complete"
        );
        self.audio.play(Sound::Complete);

        let (Some(session_id), Some(exercise)) =
            (self.session.session_id.clone(), self.session.exercise.as_ref())
        else {
            return;
        };
        let request = CompleteSessionRequest {
            exercise_id: exercise.id.clone(),
            metrics: results.to_request_metrics(),
        };
        self.submit(ApiJob::CompleteSession {
            session_id,
            request,
        });
    }

    pub fn on_api_outcome(&mut self, outcome: ApiOutcome, now: Instant) {
        match outcome {
            ApiOutcome::Connected(Ok(())) => {
                info!(server = %self.config.server_url, "connected");
                self.connection = Connection::Online;
            }
            ApiOutcome::Connected(Err(err)) => {
                self.notice = Some(format!("server unreachable: {}", err));
                self.connection = Connection::Offline(err.to_string());
            }
            ApiOutcome::Exercises { level, result } => {
                self.observe(&result);
                match result {
                    Ok(catalog) => {
                        self.exercises.apply_catalog(level.as_deref(), catalog);
                        for level in self.exercises.levels() {
                            if !self.levels.contains(&level) {
                                self.levels.push(level);
                            }
                        }
                    }
                    Err(err) => self.exercises.apply_error(&err),
                }
            }
            ApiOutcome::Exercise { level, result } => {
                self.observe(&result);
                match result {
                    Ok(exercise) => {
                        self.session.settings.level = level.clone();
                        let request = StartSessionRequest::for_exercise(level, exercise.id);
                        self.request_start(request, StartPurpose::Load);
                    }
                    Err(err) => {
                        error!(error = %err, "error loading exercise");
                        self.notice = Some(format!("could not load exercise: {}", err));
                    }
                }
            }
            ApiOutcome::SessionStarted {
                purpose,
                ticket,
                result,
            } => {
                self.observe(&result);
                self.on_session_started(purpose, ticket, result);
            }
            ApiOutcome::Keystroke {
                session_id,
                input,
                result,
            } => {
                self.observe(&result);
                self.on_keystroke(&session_id, &input, result, now);
            }
            ApiOutcome::SessionSaved { session_id, result } => {
                self.observe(&result);
                match result {
                    Ok(ack) => {
                        info!(%session_id, message = ?ack.message, "session results saved");
                        self.notice = Some(ack.message.unwrap_or_else(|| "results saved".into()));
                        // the dashboard is out of date now
                        self.dashboard.loaded = false;
                        if self.state == AppState::Dashboard {
                            self.load_user_stats();
                        }
                    }
                    Err(err) => error!(%session_id, error = %err, "error saving session results"),
                }
            }
            ApiOutcome::UserStats(result) => {
                self.observe(&result);
                match result {
                    Ok(report) => self.dashboard.apply_report(report),
                    Err(err) => self.dashboard.apply_error(&err),
                }
            }
        }
    }

    fn on_session_started(
        &mut self,
        purpose: StartPurpose,
        ticket: u64,
        result: ApiResult<StartedSession>,
    ) {
        if self.pending_start != Some(ticket) {
            debug!(?purpose, ticket, "dropping superseded session start");
            return;
        }
        self.pending_start = None;

        let started = match result {
            Ok(started) => started,
            Err(err) => {
                error!(?purpose, error = %err, "error starting session");
                self.notice = Some(format!("could not start session: {}", err));
                if self.session.phase == Phase::Loading {
                    self.session.phase = Phase::Idle;
                }
                return;
            }
        };

        info!(session_id = %started.session_id, exercise = %started.exercise.id, ?purpose, "session started");
        self.session.session_id = Some(started.session_id);
        match purpose {
            StartPurpose::New => {
                self.session.display_exercise(started.exercise);
                self.audio.play(Sound::Keypress);
            }
            StartPurpose::Load => {
                self.notice = None;
                self.session.display_exercise(started.exercise);
                self.session.reset_ui_state();
                self.audio.play(Sound::Keypress);
            }
            StartPurpose::Retry => {
                self.session.reset_ui_state();
            }
        }
    }

    fn on_keystroke(
        &mut self,
        session_id: &str,
        input: &str,
        result: ApiResult<KeystrokeResponse>,
        now: Instant,
    ) {
        if self.session.session_id.as_deref() != Some(session_id)
            || self.session.phase != Phase::Typing
        {
            debug!(%session_id, "dropping keystroke result for an inactive session");
            return;
        }

        match result {
            Ok(response) => {
                self.session.update_character_styling();
                if let Some(metrics) = &response.metrics {
                    self.session.apply_server_metrics(metrics);
                }
                if let Some(result) = response.result {
                    self.audio.play(if result.correct {
                        Sound::Keypress
                    } else {
                        Sound::Error
                    });
                    if result.complete {
                        self.handle_session_complete(now);
                    }
                }
            }
            Err(err) if err.is_rejection() => {
                warn!(error = %err, "keystroke rejected");
            }
            Err(err) => {
                error!(error = %err, typed = input.chars().count(), "error processing keystroke");
                self.session.update_character_styling();
                self.session.update_stats(now);
                if self.session.covers_text() {
                    self.handle_session_complete(now);
                }
            }
        }
    }

    pub fn cycle_level(&mut self, now: Instant) {
        if self.levels.is_empty() {
            return;
        }
        let current = self
            .levels
            .iter()
            .position(|l| *l == self.session.settings.level);
        let next = current.map_or(0, |i| (i + 1) % self.levels.len());
        let level = self.levels[next].clone();
        info!(%level, "level changed");
        self.session.settings.level = level.clone();
        self.persist_setting(move |cfg| cfg.level = level.clone());
        self.start_new_session(now);
    }

    pub fn toggle_timer_mode(&mut self) {
        if matches!(self.session.phase, Phase::Typing) {
            self.notice = Some("timer mode can't change mid-exercise".into());
            return;
        }
        let mode = self.session.settings.timer_mode.toggled();
        info!(%mode, "timer mode changed");
        self.session.settings.timer_mode = mode;
        if matches!(self.session.phase, Phase::Idle | Phase::Ready) {
            self.session.reset_ui_state();
        }
        self.persist_setting(move |cfg| cfg.timer_mode = mode);
    }

    pub fn toggle_audio(&mut self) {
        let enabled = self.audio.toggle();
        self.notice = Some(format!("audio {}", if enabled { "on" } else { "off" }));
        self.persist_setting(move |cfg| cfg.audio.enabled = enabled);
    }

    /// Apply one in-app settings change and write just that change over the
    /// file on disk. Command-line overrides in `self.config` are never saved.
    fn persist_setting(&mut self, change: impl Fn(&mut Config)) {
        change(&mut self.config);
        let Some(store) = &self.store else {
            return;
        };
        let mut on_disk = store.load();
        change(&mut on_disk);
        if let Err(err) = store.save(&on_disk) {
            warn!(error = %err, "could not save settings");
        }
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.config.server_url.trim_end_matches('/'))
    }

    fn open_web_dashboard(&mut self) {
        let url = self.dashboard_url();
        if !Browser::is_available() {
            self.notice = Some(format!("no browser available, visit {}", url));
            return;
        }
        if let Err(err) = webbrowser::open(&url) {
            warn!(%url, error = %err, "could not open browser");
            self.notice = Some(format!("could not open {}", url));
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Control {
        if key.kind == KeyEventKind::Release {
            return Control::Continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Char('c') if ctrl => return Control::Quit,
            KeyCode::Tab => {
                self.switch_to(self.state.next());
                return Control::Continue;
            }
            _ => {}
        }

        match self.state {
            AppState::Typing => self.on_typing_key(key.code, ctrl, now),
            AppState::Exercises => match key.code {
                KeyCode::Up => self.exercises.select_previous(),
                KeyCode::Down => self.exercises.select_next(),
                KeyCode::Enter => {
                    if let Some(entry) = self.exercises.selected_entry().cloned() {
                        self.load_exercise(&entry.level, &entry.exercise.id);
                        self.state = AppState::Typing;
                    }
                }
                KeyCode::Char('r') => self.load_exercises(),
                KeyCode::Char('l') => self.reload_selected_level(),
                _ => {}
            },
            AppState::Dashboard => match key.code {
                KeyCode::Char('r') => self.load_user_stats(),
                KeyCode::Char('o') => self.open_web_dashboard(),
                _ => {}
            },
        }
        Control::Continue
    }

    fn on_typing_key(&mut self, code: KeyCode, ctrl: bool, now: Instant) {
        match code {
            KeyCode::Left => self.reset_exercise(now),
            KeyCode::Right => self.start_new_session(now),
            KeyCode::Backspace => self.backspace(now),
            KeyCode::Char('l') if ctrl => self.cycle_level(now),
            KeyCode::Char('t') if ctrl => self.toggle_timer_mode(),
            KeyCode::Char('a') if ctrl => self.toggle_audio(),
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(c) if self.session.is_finished() => match c {
                'r' => self.reset_exercise(now),
                'n' => self.start_new_session(now),
                'd' => self.switch_to(AppState::Dashboard),
                'o' => self.open_web_dashboard(),
                _ => {}
            },
            KeyCode::Char(c) => self.type_char(c, now),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Exercise, KeystrokeResult, ServerMetrics, UserStats, UserStatsReport};
    use crate::audio::testing::RecordingSink;
    use crate::config::{AudioConfig, FileConfigStore};
    use crate::session::{CharState, TimerMode};
    use assert_matches::assert_matches;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Harness {
        app: App,
        jobs: Receiver<ApiJob>,
        played: Arc<Mutex<Vec<Sound>>>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel();
            let sink = RecordingSink::default();
            let played = sink.played.clone();
            let app = App::new(Config::default(), JobQueue::new(tx))
                .with_audio(AudioFeedback::new(true, 0.5, Box::new(sink)));
            Self {
                app,
                jobs: rx,
                played,
            }
        }

        fn jobs(&self) -> Vec<ApiJob> {
            self.jobs.try_iter().collect()
        }

        fn sounds(&self) -> Vec<Sound> {
            std::mem::take(&mut *self.played.lock().unwrap())
        }

        /// Bring up session "s1" on `text`, as if the pre-countdown finished
        fn started(text: &str) -> Self {
            let mut h = Self::new();
            let now = Instant::now();
            h.app.start_new_session(now);
            h.app.on_tick(now + Duration::from_secs(3));
            let ticket = h.app.start_tickets;
            h.app.on_api_outcome(
                ApiOutcome::SessionStarted {
                    purpose: StartPurpose::New,
                    ticket,
                    result: Ok(StartedSession {
                        session_id: "s1".into(),
                        exercise: exercise("b1", text),
                    }),
                },
                now,
            );
            h.jobs();
            h.sounds();
            h
        }
    }

    fn exercise(id: &str, text: &str) -> Exercise {
        Exercise {
            id: id.into(),
            title: "Home Row".into(),
            text: text.into(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn ok_keystroke(correct: bool, complete: bool) -> ApiResult<KeystrokeResponse> {
        Ok(KeystrokeResponse {
            result: Some(KeystrokeResult {
                correct,
                complete,
                ..Default::default()
            }),
            metrics: None,
        })
    }

    #[test]
    fn test_pre_countdown_then_random_session() {
        let mut h = Harness::new();
        let start = Instant::now();
        h.app.start_new_session(start);
        assert_eq!(h.app.session.phase, Phase::PreCountdown(3));

        assert!(h.app.on_tick(start + Duration::from_secs(1)));
        assert!(h.app.on_tick(start + Duration::from_secs(2)));
        assert!(h.jobs().is_empty());

        h.app.on_tick(start + Duration::from_secs(3));
        assert_eq!(
            h.jobs(),
            vec![ApiJob::StartSession {
                request: StartSessionRequest::random("beginner"),
                purpose: StartPurpose::New,
                ticket: 1,
            }]
        );
        assert_eq!(h.sounds(), vec![Sound::Keypress; 3]);
        assert_eq!(h.app.session.phase, Phase::Loading);

        h.app.on_api_outcome(
            ApiOutcome::SessionStarted {
                purpose: StartPurpose::New,
                ticket: 1,
                result: Ok(StartedSession {
                    session_id: "s9".into(),
                    exercise: exercise("b1", "asdf"),
                }),
            },
            start,
        );
        assert_eq!(h.app.session.phase, Phase::Ready);
        assert_eq!(h.app.session.session_id.as_deref(), Some("s9"));
        assert_eq!(h.sounds(), vec![Sound::Keypress]);
    }

    #[test]
    fn test_first_keystroke_starts_timer_and_submits() {
        let mut h = Harness::started("asdf");
        let now = Instant::now();
        h.app.on_key(key(KeyCode::Char('a')), now);

        assert!(h.app.session.typing_started());
        assert_eq!(h.app.session.phase, Phase::Typing);
        assert_eq!(h.sounds(), vec![Sound::Keypress]);
        assert_eq!(
            h.jobs(),
            vec![ApiJob::SubmitKeystroke {
                session_id: "s1".into(),
                request: KeystrokeRequest {
                    key: "a".into(),
                    exercise_id: "b1".into(),
                },
                input: "a".into(),
            }]
        );
        assert_eq!(h.app.session.char_states[0], CharState::Correct);
        assert_eq!(h.app.session.char_states[1], CharState::Current);
    }

    #[test]
    fn test_backspace_does_not_submit() {
        let mut h = Harness::started("asdf");
        let now = Instant::now();
        h.app.on_key(key(KeyCode::Char('x')), now);
        h.jobs();
        h.app.on_key(key(KeyCode::Backspace), now);
        assert!(h.jobs().is_empty());
        assert!(h.app.session.input.is_empty());
        assert_eq!(h.app.session.char_states[0], CharState::Current);
    }

    #[test]
    fn test_backspace_to_empty_refreshes_stats() {
        let mut h = Harness::started("asdf");
        h.app.toggle_timer_mode();
        assert_eq!(h.app.session.settings.timer_mode, TimerMode::Countdown);
        let now = Instant::now();

        h.app.on_key(key(KeyCode::Char('x')), now);
        assert_eq!(h.app.session.display.accuracy, "0.0%");

        h.app.on_key(key(KeyCode::Backspace), now + Duration::from_millis(500));
        h.app.on_tick(now + Duration::from_millis(600));
        assert_eq!(h.app.session.display.accuracy, "100.0%");
        assert_eq!(h.app.session.display.wpm, "0.0");
    }

    #[test]
    fn test_covering_text_completes_and_saves() {
        let mut h = Harness::started("ab");
        let now = Instant::now();
        h.app.type_char('a', now);
        h.jobs();
        h.sounds();

        h.app.type_char('b', now + Duration::from_secs(6));
        assert!(h.app.session.is_finished());
        assert_eq!(h.sounds(), vec![Sound::Complete]);
        assert_matches!(
            h.jobs().as_slice(),
            [ApiJob::CompleteSession { session_id, request }] => {
                assert_eq!(session_id, "s1");
                assert_eq!(request.exercise_id, "b1");
                assert_eq!(request.metrics.errors, 0);
            }
        );

        // finished sessions ignore typing
        h.app.type_char('c', now);
        assert!(h.jobs().is_empty());
    }

    #[test]
    fn test_single_char_exercise_completes_on_first_key() {
        let mut h = Harness::started("a");
        h.app.type_char('a', Instant::now());
        assert!(h.app.session.is_finished());
        assert_eq!(h.app.session.results.as_ref().unwrap().time, "0.0s");
    }

    #[test]
    fn test_keystroke_response_plays_cue_and_shows_metrics() {
        let mut h = Harness::started("asdf");
        let now = Instant::now();
        h.app.type_char('x', now);
        h.sounds();

        h.app.on_api_outcome(
            ApiOutcome::Keystroke {
                session_id: "s1".into(),
                input: "x".into(),
                result: Ok(KeystrokeResponse {
                    result: Some(KeystrokeResult::default()),
                    metrics: Some(ServerMetrics {
                        wpm: 12.0,
                        accuracy: 0.0,
                        ..Default::default()
                    }),
                }),
            },
            now,
        );
        assert_eq!(h.sounds(), vec![Sound::Error]);
        assert_eq!(h.app.session.display.wpm, "12.0");
        assert_eq!(h.app.session.display.accuracy, "0.0%");
        assert_eq!(h.app.connection, Connection::Online);
    }

    #[test]
    fn test_server_completion_finishes_session() {
        let mut h = Harness::started("asdf");
        let now = Instant::now();
        h.app.type_char('a', now);
        h.jobs();

        h.app.on_api_outcome(
            ApiOutcome::Keystroke {
                session_id: "s1".into(),
                input: "a".into(),
                result: ok_keystroke(true, true),
            },
            now,
        );
        assert!(h.app.session.is_finished());
        assert_matches!(h.jobs().as_slice(), [ApiJob::CompleteSession { .. }]);
    }

    #[test]
    fn test_stale_keystroke_results_are_dropped() {
        let mut h = Harness::started("asdf");
        let now = Instant::now();
        h.app.type_char('a', now);
        h.sounds();

        h.app.on_api_outcome(
            ApiOutcome::Keystroke {
                session_id: "old".into(),
                input: "a".into(),
                result: ok_keystroke(true, true),
            },
            now,
        );
        assert!(!h.app.session.is_finished());
        assert!(h.sounds().is_empty());
    }

    #[test]
    fn test_rejected_keystroke_only_warns() {
        let mut h = Harness::started("ab");
        let now = Instant::now();
        h.app.type_char('a', now);
        let before = h.app.session.display.clone();
        h.sounds();

        h.app.on_api_outcome(
            ApiOutcome::Keystroke {
                session_id: "s1".into(),
                input: "a".into(),
                result: Err(ApiError::Server("Invalid session".into())),
            },
            now + Duration::from_secs(30),
        );
        assert_eq!(h.app.session.display, before);
        assert!(h.sounds().is_empty());
        assert!(!h.app.session.is_finished());
    }

    #[test]
    fn test_transport_failure_falls_back_to_local_stats() {
        let mut h = Harness::started("hello");
        let start = Instant::now();
        for c in "hel".chars() {
            h.app.type_char(c, start);
        }

        h.app.on_api_outcome(
            ApiOutcome::Keystroke {
                session_id: "s1".into(),
                input: "hel".into(),
                result: Err(ApiError::Status {
                    status: 500,
                    message: "boom".into(),
                }),
            },
            start + Duration::from_secs(6),
        );
        // 3 chars in 0.1 minutes
        assert_eq!(h.app.session.display.wpm, "6.0");
        assert_eq!(h.app.session.display.time, "6.0s");
        assert!(!h.app.session.is_finished());
    }

    #[test]
    fn test_countdown_time_up_completes() {
        let mut h = Harness::started("hello world");
        h.app.session.settings.timer_mode = TimerMode::Countdown;
        h.app.session.settings.time_limit_secs = 2;
        let start = Instant::now();
        h.app.type_char('h', start);
        h.jobs();

        h.app.on_tick(start + Duration::from_secs(1));
        assert!(!h.app.session.is_finished());
        h.app.on_tick(start + Duration::from_secs(2));
        assert!(h.app.session.is_finished());
        assert_matches!(h.jobs().as_slice(), [ApiJob::CompleteSession { .. }]);
    }

    #[test]
    fn test_try_again_restarts_same_exercise() {
        let mut h = Harness::started("ab");
        let now = Instant::now();
        h.app.type_char('a', now);
        h.app.type_char('b', now);
        h.jobs();

        h.app.on_key(key(KeyCode::Char('r')), now);
        assert_eq!(h.app.session.phase, Phase::Loading);
        assert_eq!(
            h.jobs(),
            vec![ApiJob::StartSession {
                request: StartSessionRequest::for_exercise("beginner", "b1"),
                purpose: StartPurpose::Retry,
                ticket: 2,
            }]
        );

        h.app.on_api_outcome(
            ApiOutcome::SessionStarted {
                purpose: StartPurpose::Retry,
                ticket: 2,
                result: Ok(StartedSession {
                    session_id: "s2".into(),
                    exercise: exercise("b1", "ab"),
                }),
            },
            now,
        );
        assert_eq!(h.app.session.phase, Phase::Ready);
        assert_eq!(h.app.session.session_id.as_deref(), Some("s2"));
        assert!(h.app.session.input.is_empty());
        assert!(h.app.session.results.is_none());
    }

    #[test]
    fn test_try_again_without_exercise_starts_new() {
        let mut h = Harness::new();
        h.app.reset_exercise(Instant::now());
        assert_eq!(h.app.session.phase, Phase::PreCountdown(3));
    }

    #[test]
    fn test_superseded_session_start_is_dropped() {
        let mut h = Harness::started("ab");
        let now = Instant::now();
        h.app.reset_exercise(now);
        h.app.on_api_outcome(
            ApiOutcome::SessionStarted {
                purpose: StartPurpose::New,
                ticket: 1,
                result: Ok(StartedSession {
                    session_id: "late".into(),
                    exercise: exercise("b7", "zz"),
                }),
            },
            now,
        );
        assert_eq!(h.app.session.session_id.as_deref(), Some("s1"));
        assert_eq!(h.app.session.phase, Phase::Loading);
    }

    #[test]
    fn test_only_the_latest_of_two_new_starts_is_taken() {
        let mut h = Harness::started("ab");
        let start = Instant::now();

        h.app.on_key(key(KeyCode::Right), start);
        h.app.on_tick(start + Duration::from_secs(3));
        h.app.on_key(key(KeyCode::Right), start + Duration::from_secs(3));
        h.app.on_tick(start + Duration::from_secs(6));
        let tickets: Vec<u64> = h
            .jobs()
            .into_iter()
            .filter_map(|job| match job {
                ApiJob::StartSession {
                    purpose: StartPurpose::New,
                    ticket,
                    ..
                } => Some(ticket),
                _ => None,
            })
            .collect();
        assert_eq!(tickets, vec![2, 3]);

        let started = |ticket, id: &str| ApiOutcome::SessionStarted {
            purpose: StartPurpose::New,
            ticket,
            result: Ok(StartedSession {
                session_id: id.into(),
                exercise: exercise("b2", "cd"),
            }),
        };
        h.app.on_api_outcome(started(2, "slow"), start);
        assert_eq!(h.app.session.phase, Phase::Loading);
        h.app.on_api_outcome(started(3, "fresh"), start);
        assert_eq!(h.app.session.session_id.as_deref(), Some("fresh"));
        assert_eq!(h.app.session.phase, Phase::Ready);
    }

    #[test]
    fn test_failed_start_returns_to_idle() {
        let mut h = Harness::new();
        let start = Instant::now();
        h.app.start_new_session(start);
        h.app.on_tick(start + Duration::from_secs(3));
        h.app.on_api_outcome(
            ApiOutcome::SessionStarted {
                purpose: StartPurpose::New,
                ticket: 1,
                result: Err(ApiError::Server("No exercises available".into())),
            },
            start,
        );
        assert_eq!(h.app.session.phase, Phase::Idle);
        assert!(h.app.notice.as_deref().unwrap().contains("No exercises available"));
    }

    #[test]
    fn test_load_exercise_flow() {
        let mut h = Harness::new();
        let now = Instant::now();
        h.app.boot(Some("a3"), now);
        assert_eq!(
            h.jobs(),
            vec![ApiJob::FetchExercise {
                level: "beginner".into(),
                exercise_id: "a3".into(),
            }]
        );

        h.app.on_api_outcome(
            ApiOutcome::Exercise {
                level: "advanced".into(),
                result: Ok(exercise("a3", "qwerty")),
            },
            now,
        );
        assert_eq!(h.app.session.settings.level, "advanced");
        assert_eq!(
            h.jobs(),
            vec![ApiJob::StartSession {
                request: StartSessionRequest::for_exercise("advanced", "a3"),
                purpose: StartPurpose::Load,
                ticket: 1,
            }]
        );

        h.app.on_api_outcome(
            ApiOutcome::SessionStarted {
                purpose: StartPurpose::Load,
                ticket: 1,
                result: Ok(StartedSession {
                    session_id: "s5".into(),
                    exercise: exercise("a3", "qwerty"),
                }),
            },
            now,
        );
        assert_eq!(h.app.session.phase, Phase::Ready);
        assert_eq!(h.app.session.text(), "qwerty");
        assert_eq!(h.sounds(), vec![Sound::Keypress]);
    }

    #[test]
    fn test_exercise_browser_enter_loads() {
        let mut h = Harness::new();
        let now = Instant::now();
        h.app.on_key(key(KeyCode::Tab), now);
        assert_eq!(h.app.state, AppState::Exercises);
        assert_eq!(h.jobs(), vec![ApiJob::ListExercises { level: None }]);

        h.app.on_api_outcome(
            ApiOutcome::Exercises {
                level: None,
                result: Ok(crate::api::ExerciseCatalog::from([
                    ("beginner".to_string(), vec![exercise("b1", "asdf")]),
                    ("expert".to_string(), vec![exercise("e1", "zxcv")]),
                ])),
            },
            now,
        );
        assert!(h.app.levels.contains(&"expert".to_string()));

        h.app.on_key(key(KeyCode::Down), now);
        h.app.on_key(key(KeyCode::Enter), now);
        assert_eq!(h.app.state, AppState::Typing);
        assert_eq!(
            h.jobs(),
            vec![ApiJob::FetchExercise {
                level: "expert".into(),
                exercise_id: "e1".into(),
            }]
        );
    }

    #[test]
    fn test_exercise_browser_reloads_one_level() {
        let mut h = Harness::new();
        let now = Instant::now();
        h.app.switch_to(AppState::Exercises);
        h.app.on_api_outcome(
            ApiOutcome::Exercises {
                level: None,
                result: Ok(crate::api::ExerciseCatalog::from([
                    ("beginner".to_string(), vec![exercise("b1", "asdf")]),
                    ("expert".to_string(), vec![exercise("e1", "zxcv")]),
                ])),
            },
            now,
        );
        h.jobs();

        h.app.on_key(key(KeyCode::Down), now);
        h.app.on_key(key(KeyCode::Char('l')), now);
        assert_eq!(
            h.jobs(),
            vec![ApiJob::ListExercises {
                level: Some("expert".into()),
            }]
        );
        assert!(h.app.exercises.loading);

        h.app.on_api_outcome(
            ApiOutcome::Exercises {
                level: Some("expert".into()),
                result: Ok(crate::api::ExerciseCatalog::from([(
                    "expert".to_string(),
                    vec![exercise("e1", "zxcv"), exercise("e2", "qwer")],
                )])),
            },
            now,
        );
        let ids: Vec<&str> = h
            .app
            .exercises
            .entries
            .iter()
            .map(|e| e.exercise.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b1", "e1", "e2"]);
        assert_eq!(h.app.exercises.selected_entry().unwrap().exercise.id, "e1");
    }

    #[test]
    fn test_dashboard_loads_once_and_reloads_on_r() {
        let mut h = Harness::new();
        let now = Instant::now();
        h.app.switch_to(AppState::Dashboard);
        assert_eq!(h.jobs(), vec![ApiJob::LoadUserStats]);

        h.app.on_api_outcome(
            ApiOutcome::UserStats(Ok(UserStatsReport {
                stats: Some(UserStats {
                    best_wpm: Some(55.0),
                    ..Default::default()
                }),
                ..Default::default()
            })),
            now,
        );
        assert_eq!(h.app.dashboard.summary.best_wpm, "55.0");

        h.app.switch_to(AppState::Typing);
        h.app.switch_to(AppState::Dashboard);
        assert!(h.jobs().is_empty());

        h.app.on_key(key(KeyCode::Char('r')), now);
        assert_eq!(h.jobs(), vec![ApiJob::LoadUserStats]);
    }

    #[test]
    fn test_saved_session_marks_dashboard_stale() {
        let mut h = Harness::new();
        h.app.dashboard.loaded = true;
        h.app.on_api_outcome(
            ApiOutcome::SessionSaved {
                session_id: "s1".into(),
                result: Ok(crate::api::CompletionAck {
                    message: Some("Session completed and results saved".into()),
                }),
            },
            Instant::now(),
        );
        assert!(!h.app.dashboard.loaded);
        assert_eq!(
            h.app.notice.as_deref(),
            Some("Session completed and results saved")
        );
    }

    #[test]
    fn test_settings_keys_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut h = Harness::new();
        h.app.store = Some(Box::new(FileConfigStore::with_path(&path)));
        let now = Instant::now();

        h.app.on_key(ctrl('t'), now);
        assert_eq!(h.app.session.settings.timer_mode, TimerMode::Countdown);
        assert_eq!(h.app.session.display.time, "1m 0s");

        h.app.on_key(ctrl('l'), now);
        assert_eq!(h.app.session.settings.level, "intermediate");
        assert_eq!(h.app.session.phase, Phase::PreCountdown(3));

        h.app.on_key(ctrl('a'), now);
        assert!(!h.app.audio.enabled);

        let saved = FileConfigStore::with_path(&path).load();
        assert_eq!(saved.timer_mode, TimerMode::Countdown);
        assert_eq!(saved.level, "intermediate");
        assert!(!saved.audio.enabled);
    }

    #[test]
    fn test_command_line_overrides_stay_off_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let on_disk = Config {
            level: "advanced".into(),
            ..Default::default()
        };
        store.save(&on_disk).unwrap();

        // as if started with --server, --mute, --volume and --time-limit
        let overridden = Config {
            server_url: "http://one-off:9".into(),
            time_limit_secs: 15,
            audio: AudioConfig {
                enabled: false,
                volume: 0.9,
                ..Default::default()
            },
            ..on_disk.clone()
        };
        let (tx, _rx) = mpsc::channel();
        let mut app = App::new(overridden, JobQueue::new(tx))
            .with_audio(AudioFeedback::silent())
            .with_store(Box::new(store));

        app.toggle_timer_mode();
        assert_eq!(app.config.server_url, "http://one-off:9");

        let saved = FileConfigStore::with_path(&path).load();
        assert_eq!(
            saved,
            Config {
                timer_mode: TimerMode::Countdown,
                ..on_disk
            }
        );
    }

    #[test]
    fn test_timer_mode_locked_while_typing() {
        let mut h = Harness::started("asdf");
        h.app.type_char('a', Instant::now());
        h.app.toggle_timer_mode();
        assert_eq!(h.app.session.settings.timer_mode, TimerMode::CountUp);
    }

    #[test]
    fn test_quit_keys() {
        let mut h = Harness::new();
        let now = Instant::now();
        assert_eq!(h.app.on_key(key(KeyCode::Esc), now), Control::Quit);
        assert_eq!(h.app.on_key(ctrl('c'), now), Control::Quit);
        assert_eq!(h.app.on_key(key(KeyCode::Char('c')), now), Control::Continue);
    }

    #[test]
    fn test_handshake_failure_goes_offline() {
        let mut h = Harness::new();
        h.app.on_api_outcome(
            ApiOutcome::Connected(Err(ApiError::Status {
                status: 502,
                message: "bad gateway".into(),
            })),
            Instant::now(),
        );
        assert_matches!(h.app.connection, Connection::Offline(_));
        assert!(h.app.notice.is_some());
    }

    #[test]
    fn test_dashboard_url() {
        let mut h = Harness::new();
        h.app.config.server_url = "http://localhost:5000/".into();
        assert_eq!(h.app.dashboard_url(), "http://localhost:5000/dashboard");
    }

    #[test]
    fn test_tab_cycles_screens() {
        assert_eq!(AppState::Typing.next(), AppState::Exercises);
        assert_eq!(AppState::Dashboard.next(), AppState::Typing);
        assert_eq!(AppState::ALL.len(), 3);
    }
}
