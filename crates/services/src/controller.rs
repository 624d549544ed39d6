use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::MissedTickBehavior;

use pomo_core::model::{Question, SettingField, TimerSettings};
use pomo_core::{Clock, QuizRequest, QuizTicket, Session, SessionEvent, SessionSnapshot};

use crate::error::{ControllerError, GenerationError};
use crate::notes::{IngestFailure, IngestReport, NoteFile, NoteLibrary};
use crate::notifier::Notifier;
use crate::quiz_source::QuizSource;

/// Countdown refresh period of the event loop.
pub const COUNTDOWN_TICK: Duration = Duration::from_millis(100);
/// Per-question timer period. The interval restarts whenever a question
/// appears.
pub const QUESTION_TICK: Duration = Duration::from_secs(1);

/// User input understood by `SessionController::apply`.
///
/// Answer indices are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    Select(usize),
    Submit,
    Answer(usize),
    ToggleReview,
    Dismiss,
    StopAlarm,
    ToggleMute,
    Setting(SettingField, u32),
    AddNotes(Vec<PathBuf>),
    EnterTimer,
    ReturnToLanding,
    Quit,
}

/// Result of a background quiz request, tagged with its ticket.
#[derive(Debug)]
pub struct QuizDelivery {
    pub ticket: QuizTicket,
    pub result: Result<Vec<Question>, GenerationError>,
}

/// What the event loop publishes after every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerUpdate {
    pub snapshot: SessionSnapshot,
    /// Message for the most recent command: an error or an ingest summary.
    pub notice: Option<String>,
}

impl ControllerUpdate {
    #[must_use]
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot,
            notice: None,
        }
    }
}

/// Drives a `Session`: reads the clock, performs the side effects its events
/// ask for and feeds quiz results back in.
pub struct SessionController {
    session: Session,
    clock: Clock,
    library: Arc<Mutex<NoteLibrary>>,
    source: Arc<dyn QuizSource>,
    notifier: Arc<dyn Notifier>,
    deliveries_tx: mpsc::UnboundedSender<QuizDelivery>,
    deliveries_rx: mpsc::UnboundedReceiver<QuizDelivery>,
    ingests_tx: mpsc::UnboundedSender<IngestReport>,
    ingests_rx: mpsc::UnboundedReceiver<IngestReport>,
    question_shown: bool,
}

impl SessionController {
    #[must_use]
    pub fn new(
        settings: TimerSettings,
        clock: Clock,
        library: NoteLibrary,
        source: Arc<dyn QuizSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
        let (ingests_tx, ingests_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(settings),
            clock,
            library: Arc::new(Mutex::new(library)),
            source,
            notifier,
            deliveries_tx,
            deliveries_rx,
            ingests_tx,
            ingests_rx,
            question_shown: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Gives tests control over a fixed clock.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    //
    // ─── NOTES ─────────────────────────────────────────────────────────────────
    //

    /// Ingest in-memory files and append their text to the session notes.
    pub async fn add_note_files(&mut self, files: Vec<NoteFile>) -> IngestReport {
        let report = self.library.lock().await.ingest(files).await;
        self.absorb(&report);
        report
    }

    /// Load files from disk and ingest them. Unreadable paths are reported as
    /// failures alongside extraction failures.
    pub async fn add_note_paths(&mut self, paths: &[PathBuf]) -> IngestReport {
        let report = ingest_paths(&self.library, paths).await;
        self.absorb(&report);
        report
    }

    fn absorb(&mut self, report: &IngestReport) {
        if report.has_text() {
            self.session.append_notes(&report.text);
        }
    }

    /// Append an ingest result and turn it into the notice for the user.
    fn finish_ingest(&mut self, report: IngestReport) -> Result<Option<String>, ControllerError> {
        self.absorb(&report);
        if report.accepted.is_empty() {
            return Err(ControllerError::NothingIngested { report });
        }
        Ok(Some(report.to_string()))
    }

    /// Ingest in a background task; the report comes back through the loop.
    fn spawn_ingest(&self, paths: Vec<PathBuf>) {
        let library = Arc::clone(&self.library);
        let reports = self.ingests_tx.clone();
        tokio::spawn(async move {
            let report = ingest_paths(&library, &paths).await;
            if reports.send(report).is_err() {
                tracing::debug!("controller gone before notes were ingested");
            }
        });
    }

    //
    // ─── COMMANDS ──────────────────────────────────────────────────────────────
    //

    /// Apply one user command. Returns an informational notice, if any.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError` when the session refuses the transition; the
    /// session is unchanged in that case.
    pub async fn apply(&mut self, command: Command) -> Result<Option<String>, ControllerError> {
        let now = self.clock.now();
        let events = match command {
            Command::Start => {
                self.session.start(now)?;
                Vec::new()
            }
            Command::Pause => self.session.pause(now)?,
            Command::Toggle => self.session.toggle(now)?,
            Command::Reset => {
                self.session.reset()?;
                Vec::new()
            }
            Command::Select(choice) => {
                self.session.select_answer(choice)?;
                Vec::new()
            }
            Command::Submit => self.session.submit_answer(now)?,
            Command::Answer(choice) => self.session.answer(choice, now)?,
            Command::ToggleReview => {
                self.session.toggle_review()?;
                Vec::new()
            }
            Command::Dismiss => self.session.dismiss_quiz(now)?,
            Command::StopAlarm => self.session.stop_alarm(),
            Command::ToggleMute => {
                let muted = !self.session.is_muted();
                self.session.set_muted(muted)
            }
            Command::Setting(field, value) => {
                self.session.update_setting(field, value)?;
                Vec::new()
            }
            Command::AddNotes(paths) => {
                let report = ingest_paths(&self.library, &paths).await;
                return self.finish_ingest(report);
            }
            Command::EnterTimer => {
                self.session.enter_timer()?;
                Vec::new()
            }
            Command::ReturnToLanding => self.session.return_to_landing(),
            Command::Quit => Vec::new(),
        };
        self.dispatch(events);
        Ok(None)
    }

    /// Start muted (or not). Used for the initial configuration.
    pub fn set_muted(&mut self, muted: bool) {
        let events = self.session.set_muted(muted);
        self.dispatch(events);
    }

    //
    // ─── TIMERS & DELIVERIES ───────────────────────────────────────────────────
    //

    /// Countdown tick plus alarm and feedback windows.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let mut events = self.session.tick(now);
        events.extend(self.session.settle(now));
        self.dispatch(events);
    }

    pub fn tick_question(&mut self) {
        let events = self.session.tick_question(self.clock.now());
        self.dispatch(events);
    }

    /// Feed a quiz result back into the session.
    pub fn deliver(&mut self, delivery: QuizDelivery) {
        let QuizDelivery { ticket, result } = delivery;
        let events = match result {
            Ok(questions) => {
                tracing::info!(%ticket, questions = questions.len(), "quiz delivered");
                let now = self.clock.now();
                self.session.deliver_quiz(ticket, questions, now)
            }
            Err(error) => {
                tracing::warn!(%ticket, %error, "quiz generation failed");
                self.session.fail_quiz(ticket, error.to_string())
            }
        };
        self.dispatch(events);
    }

    /// Wait for the next background quiz result.
    pub async fn next_delivery(&mut self) -> Option<QuizDelivery> {
        self.deliveries_rx.recv().await
    }

    fn dispatch(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::QuizRequested(request) => self.request_quiz(request),
                SessionEvent::AlarmStarted => self.notifier.start_alarm(),
                SessionEvent::AlarmStopped => self.notifier.stop_alarm(),
                SessionEvent::AnswerRecorded {
                    index,
                    choice,
                    correct,
                } => {
                    tracing::debug!(index, ?choice, correct, "answer recorded");
                    if !self.session.is_muted() {
                        self.notifier.play_feedback(correct);
                    }
                }
                SessionEvent::QuizDiscarded { ticket } => {
                    tracing::info!(%ticket, "discarding stale quiz");
                }
                SessionEvent::CycleAdvanced { mode, cycle } => {
                    tracing::info!(%mode, cycle, "interval started");
                }
                event @ (SessionEvent::QuizReady | SessionEvent::QuestionAdvanced { .. }) => {
                    self.question_shown = true;
                    tracing::debug!(?event, "question on screen");
                }
                other => tracing::debug!(event = ?other, "session event"),
            }
        }
    }

    fn request_quiz(&self, request: QuizRequest) {
        let QuizRequest { ticket, notes } = request;
        tracing::info!(%ticket, notes_len = notes.len(), "requesting quiz");
        let source = Arc::clone(&self.source);
        let deliveries = self.deliveries_tx.clone();
        tokio::spawn(async move {
            let result = source.generate_quiz(&notes).await;
            if deliveries.send(QuizDelivery { ticket, result }).is_err() {
                tracing::debug!(%ticket, "controller gone before quiz arrived");
            }
        });
    }

    //
    // ─── EVENT LOOP ────────────────────────────────────────────────────────────
    //

    /// Run until `Command::Quit` or until the command channel closes.
    ///
    /// Publishes a `ControllerUpdate` whenever the snapshot or notice changes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        updates: watch::Sender<ControllerUpdate>,
    ) {
        let mut countdown = tokio::time::interval(COUNTDOWN_TICK);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut question = tokio::time::interval(QUESTION_TICK);
        question.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut notice = None;

        loop {
            self.publish(&updates, notice.clone());
            if updates.is_closed() {
                break;
            }

            tokio::select! {
                _ = countdown.tick() => self.tick(),
                _ = question.tick() => self.tick_question(),
                Some(delivery) = self.deliveries_rx.recv() => self.deliver(delivery),
                Some(report) = self.ingests_rx.recv() => {
                    notice = into_notice(self.finish_ingest(report));
                }
                command = commands.recv() => {
                    match command {
                        None | Some(Command::Quit) => break,
                        Some(Command::AddNotes(paths)) => {
                            self.spawn_ingest(paths);
                            notice = None;
                        }
                        Some(command) => notice = into_notice(self.apply(command).await),
                    }
                }
            }

            if std::mem::take(&mut self.question_shown) {
                question.reset();
            }
        }

        self.notifier.stop_alarm();
        tracing::debug!("session controller stopped");
    }

    fn publish(&self, updates: &watch::Sender<ControllerUpdate>, notice: Option<String>) {
        let update = ControllerUpdate {
            snapshot: self.snapshot(),
            notice,
        };
        updates.send_if_modified(|current| {
            if *current == update {
                false
            } else {
                *current = update;
                true
            }
        });
    }
}

fn into_notice(result: Result<Option<String>, ControllerError>) -> Option<String> {
    match result {
        Ok(message) => message,
        Err(error) => Some(error.to_string()),
    }
}

/// Read `paths` from disk and ingest whatever loaded.
async fn ingest_paths(library: &Mutex<NoteLibrary>, paths: &[PathBuf]) -> IngestReport {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match NoteFile::load(path).await {
            Ok(file) => files.push(file),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to read note file");
                let name = path.file_name().map_or_else(
                    || path.display().to_string(),
                    |name| name.to_string_lossy().into_owned(),
                );
                unreadable.push(IngestFailure { name, error });
            }
        }
    }
    let mut report = library.lock().await.ingest(files).await;
    report.failures.extend(unreadable);
    report
}
