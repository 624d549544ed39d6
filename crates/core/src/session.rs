use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::countdown::Countdown;
use crate::error::SessionError;
use crate::model::{
    AnswerRecord, Mode, Question, Quiz, QuizError, QuizPhase, QuizStep, Screen, SettingField,
    TimerSettings,
};
use crate::snapshot::{QuestionView, QuizView, SessionSnapshot};
use crate::time::elapsed_millis;

/// Remaining work seconds at which quiz generation starts, so the quiz is
/// usually ready by the time the interval ends.
pub const QUIZ_TRIGGER_SECS: u32 = 35;

/// The alarm stops on its own after this long.
pub const ALARM_CEILING_SECS: u64 = 10;

const NO_REQUEST_REASON: &str = "no quiz was requested for this interval";

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Identifies one quiz request. Deliveries carrying any other ticket than the
/// one currently pending are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuizTicket(u64);

impl QuizTicket {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QuizTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work order for the quiz source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub ticket: QuizTicket,
    pub notes: String,
}

/// Side effects and notable transitions produced by `Session` operations.
/// The driver performs the effects (quiz request, sounds) and logs the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QuizRequested(QuizRequest),
    /// The open modal now has questions to present.
    QuizReady,
    /// The open modal has nothing to present this interval.
    QuizUnavailable { reason: String },
    /// A delivery for a ticket that is no longer pending was dropped.
    QuizDiscarded { ticket: QuizTicket },
    AlarmStarted,
    AlarmStopped,
    /// The work countdown hit zero and the quiz modal opened.
    WorkExpired,
    BreakExpired { mode: Mode },
    CycleAdvanced { mode: Mode, cycle: u32 },
    AnswerRecorded {
        index: usize,
        choice: Option<usize>,
        correct: bool,
    },
    QuestionAdvanced { index: usize },
    QuizCompleted { correct: usize, total: usize },
    QuizDismissed,
}

impl From<AnswerRecord> for SessionEvent {
    fn from(record: AnswerRecord) -> Self {
        SessionEvent::AnswerRecorded {
            index: record.index,
            choice: record.choice,
            correct: record.correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum QuizSlot {
    Empty,
    Pending(QuizTicket),
    Ready(Quiz),
    Failed(String),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The whole study session: countdown, work/break cycle and the quiz that
/// sits between a work interval and its break.
///
/// Every mutation goes through a named transition. Time-dependent transitions
/// take `now` from the caller's clock; side effects come back as
/// `SessionEvent`s.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    screen: Screen,
    mode: Mode,
    settings: TimerSettings,
    countdown: Countdown,
    current_cycle: u32,
    quiz_request_issued: bool,
    notes: String,
    quiz: QuizSlot,
    quiz_open: bool,
    alarm_started_at: Option<DateTime<Utc>>,
    muted: bool,
    next_ticket: u64,
}

impl Session {
    #[must_use]
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            screen: Screen::Landing,
            mode: Mode::Idle,
            settings,
            countdown: Countdown::new(settings.duration_secs(Mode::Work)),
            current_cycle: 1,
            quiz_request_issued: false,
            notes: String::new(),
            quiz: QuizSlot::Empty,
            quiz_open: false,
            alarm_started_at: None,
            muted: false,
            next_ticket: 1,
        }
    }

    // Accessors

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Started at some point, currently stopped, and not waiting on the quiz.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.mode != Mode::Idle && !self.countdown.is_running() && !self.quiz_open
    }

    #[must_use]
    pub fn quiz_request_issued(&self) -> bool {
        self.quiz_request_issued
    }

    #[must_use]
    pub fn is_quiz_open(&self) -> bool {
        self.quiz_open
    }

    /// The generated quiz, once delivered.
    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.quiz {
            QuizSlot::Ready(quiz) => Some(quiz),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending_ticket(&self) -> Option<QuizTicket> {
        match self.quiz {
            QuizSlot::Pending(ticket) => Some(ticket),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_alarm_playing(&self) -> bool {
        self.alarm_started_at.is_some()
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn has_notes(&self) -> bool {
        !self.notes.trim().is_empty()
    }

    //
    // ─── LANDING ───────────────────────────────────────────────────────────────
    //

    /// Append extracted note text; it becomes part of the next quiz request.
    pub fn append_notes(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.notes.push_str(text);
        self.notes.push_str("\n\n");
    }

    /// Leave the landing screen for an idle timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotesRequired` if no note text has been added.
    pub fn enter_timer(&mut self) -> Result<(), SessionError> {
        if !self.has_notes() {
            return Err(SessionError::NotesRequired);
        }
        if self.screen == Screen::Timer {
            return Ok(());
        }
        self.screen = Screen::Timer;
        self.reset_cycle();
        Ok(())
    }

    /// Back to the landing screen: cycle, mode and quiz are cleared, settings
    /// and notes are kept. Any in-flight quiz request becomes stale.
    pub fn return_to_landing(&mut self) -> Vec<SessionEvent> {
        let events = self.stop_alarm();
        self.screen = Screen::Landing;
        self.reset_cycle();
        self.quiz = QuizSlot::Empty;
        self.quiz_open = false;
        self.quiz_request_issued = false;
        events
    }

    //
    // ─── COUNTDOWN ─────────────────────────────────────────────────────────────
    //

    /// Start or resume the countdown. Starting from `Idle` enters `Work`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotOnTimer` on the landing screen and
    /// `SessionError::QuizInProgress` while the quiz modal is open.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_timer_controls()?;
        if self.countdown.is_running() {
            return Ok(());
        }
        if self.mode == Mode::Idle {
            self.mode = Mode::Work;
        }
        self.countdown.start(now);
        Ok(())
    }

    /// Pause, keeping the remaining time to the millisecond.
    ///
    /// The countdown is settled at `now` first, so a pause that lands on the
    /// trigger point or on expiry still produces those events.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_timer_controls()?;
        let events = self.tick(now);
        self.countdown.pause(now);
        Ok(events)
    }

    /// Start when stopped, pause when running.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> Result<Vec<SessionEvent>, SessionError> {
        if self.countdown.is_running() {
            self.pause(now)
        } else {
            self.start(now).map(|()| Vec::new())
        }
    }

    /// Stop, return to `Idle` at the full work duration and cycle 1.
    ///
    /// An in-flight quiz request is not cancelled.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_timer_controls()?;
        self.reset_cycle();
        Ok(())
    }

    /// Countdown tick. Recomputes the remaining time from the epoch, fires
    /// the quiz request at the trigger point and handles expiry. Does nothing
    /// while the countdown is stopped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !self.countdown.is_running() {
            return Vec::new();
        }
        let mut events = Vec::new();
        let remaining = self.countdown.tick(now);

        if self.mode == Mode::Work && !self.quiz_request_issued && remaining <= QUIZ_TRIGGER_SECS
        {
            events.push(self.issue_quiz_request());
        }
        if remaining == 0 {
            self.expire(now, &mut events);
        }
        events
    }

    /// Close elapsed windows: the alarm ceiling and the answer feedback.
    pub fn settle(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(started) = self.alarm_started_at {
            if elapsed_millis(started, now) >= ALARM_CEILING_SECS * 1_000 {
                self.alarm_started_at = None;
                events.push(SessionEvent::AlarmStopped);
            }
        }
        if self.quiz_open {
            if let QuizSlot::Ready(quiz) = &mut self.quiz {
                match quiz.finish_feedback(now) {
                    Some(QuizStep::Advanced { index }) => {
                        events.push(SessionEvent::QuestionAdvanced { index });
                    }
                    Some(QuizStep::Completed { correct, total }) => {
                        events.push(SessionEvent::QuizCompleted { correct, total });
                    }
                    None => {}
                }
            }
        }
        events
    }

    fn issue_quiz_request(&mut self) -> SessionEvent {
        self.quiz_request_issued = true;
        let ticket = QuizTicket(self.next_ticket);
        self.next_ticket += 1;
        self.quiz = QuizSlot::Pending(ticket);
        SessionEvent::QuizRequested(QuizRequest {
            ticket,
            notes: self.notes.clone(),
        })
    }

    fn expire(&mut self, now: DateTime<Utc>, events: &mut Vec<SessionEvent>) {
        self.countdown.stop();
        self.quiz_request_issued = false;
        if !self.muted {
            self.alarm_started_at = Some(now);
            events.push(SessionEvent::AlarmStarted);
        }

        if self.mode != Mode::Work {
            events.push(SessionEvent::BreakExpired { mode: self.mode });
            self.advance_cycle(now, events);
            return;
        }

        self.quiz_open = true;
        events.push(SessionEvent::WorkExpired);
        if self.quiz == QuizSlot::Empty {
            self.quiz = QuizSlot::Failed(NO_REQUEST_REASON.to_owned());
        }
        match &mut self.quiz {
            QuizSlot::Ready(quiz) => {
                quiz.present(now);
                events.push(SessionEvent::QuizReady);
            }
            QuizSlot::Failed(reason) => events.push(SessionEvent::QuizUnavailable {
                reason: reason.clone(),
            }),
            QuizSlot::Pending(_) | QuizSlot::Empty => {}
        }
    }

    fn advance_cycle(&mut self, now: DateTime<Utc>, events: &mut Vec<SessionEvent>) {
        let cycles = self.settings.cycles_before_long_break();
        let (mode, cycle) = match self.mode {
            Mode::Work if self.current_cycle >= cycles => (Mode::LongBreak, 1),
            Mode::Work => (Mode::ShortBreak, self.current_cycle + 1),
            Mode::Idle | Mode::ShortBreak | Mode::LongBreak => (Mode::Work, self.current_cycle),
        };
        self.mode = mode;
        self.current_cycle = cycle;
        self.quiz_request_issued = false;
        self.countdown.rebase(self.settings.duration_secs(mode));
        self.countdown.start(now);
        events.push(SessionEvent::CycleAdvanced { mode, cycle });
    }

    fn reset_cycle(&mut self) {
        self.mode = Mode::Idle;
        self.current_cycle = 1;
        self.countdown.rebase(self.settings.duration_secs(Mode::Work));
    }

    fn ensure_timer_controls(&self) -> Result<(), SessionError> {
        if self.screen != Screen::Timer {
            return Err(SessionError::NotOnTimer);
        }
        if self.quiz_open {
            return Err(SessionError::QuizInProgress);
        }
        Ok(())
    }

    //
    // ─── QUIZ ──────────────────────────────────────────────────────────────────
    //

    /// Store a successful generation result.
    ///
    /// Accepted only for the pending ticket, even if the mode has moved on,
    /// so a late answer still fills a modal that has not been dismissed. When
    /// the modal is already open the first question starts at `now`.
    pub fn deliver_quiz(
        &mut self,
        ticket: QuizTicket,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Vec<SessionEvent> {
        if self.pending_ticket() != Some(ticket) {
            return vec![SessionEvent::QuizDiscarded { ticket }];
        }
        match Quiz::new(questions, self.settings.question_seconds()) {
            Ok(mut quiz) => {
                if self.quiz_open {
                    quiz.present(now);
                }
                self.quiz = QuizSlot::Ready(quiz);
                if self.quiz_open {
                    vec![SessionEvent::QuizReady]
                } else {
                    Vec::new()
                }
            }
            Err(err) => self.store_failure(err.to_string()),
        }
    }

    /// Store a failed generation result for the pending ticket.
    pub fn fail_quiz(&mut self, ticket: QuizTicket, reason: impl Into<String>) -> Vec<SessionEvent> {
        if self.pending_ticket() != Some(ticket) {
            return vec![SessionEvent::QuizDiscarded { ticket }];
        }
        self.store_failure(reason.into())
    }

    fn store_failure(&mut self, reason: String) -> Vec<SessionEvent> {
        self.quiz = QuizSlot::Failed(reason.clone());
        if self.quiz_open {
            vec![SessionEvent::QuizUnavailable { reason }]
        } else {
            Vec::new()
        }
    }

    /// Per-question timer tick; the driver calls it about once a second.
    pub fn tick_question(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !self.quiz_open {
            return Vec::new();
        }
        let QuizSlot::Ready(quiz) = &mut self.quiz else {
            return Vec::new();
        };
        quiz.tick_second(now)
            .map(SessionEvent::from)
            .into_iter()
            .collect()
    }

    /// # Errors
    ///
    /// Returns `SessionError` when no quiz is presenting or the choice is invalid.
    pub fn select_answer(&mut self, choice: usize) -> Result<(), SessionError> {
        self.active_quiz_mut()?.select(choice)?;
        Ok(())
    }

    /// Submit the highlighted option (or none).
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no quiz is presenting or input is locked.
    pub fn submit_answer(&mut self, now: DateTime<Utc>) -> Result<Vec<SessionEvent>, SessionError> {
        let record = self.active_quiz_mut()?.submit(now)?;
        Ok(vec![record.into()])
    }

    /// Select and submit in one step.
    ///
    /// # Errors
    ///
    /// Same as `select_answer` and `submit_answer`.
    pub fn answer(
        &mut self,
        choice: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.select_answer(choice)?;
        self.submit_answer(now)
    }

    /// Show or hide the review list of a completed quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` unless a completed quiz is open.
    pub fn toggle_review(&mut self) -> Result<bool, SessionError> {
        Ok(self.active_quiz_mut()?.toggle_review()?)
    }

    /// Close the modal, drop the quiz and advance the cycle.
    ///
    /// Allowed for a completed quiz and for an interval without a quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuizNotOpen`, `SessionError::QuizLoading`, or
    /// `QuizError::NotCompleted` while questions remain.
    pub fn dismiss_quiz(&mut self, now: DateTime<Utc>) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.quiz_open {
            return Err(SessionError::QuizNotOpen);
        }
        match &self.quiz {
            QuizSlot::Pending(_) => return Err(SessionError::QuizLoading),
            QuizSlot::Ready(quiz) if !quiz.is_completed() => {
                return Err(QuizError::NotCompleted.into());
            }
            _ => {}
        }

        self.quiz = QuizSlot::Empty;
        self.quiz_open = false;
        let mut events = vec![SessionEvent::QuizDismissed];
        self.advance_cycle(now, &mut events);
        Ok(events)
    }

    fn active_quiz_mut(&mut self) -> Result<&mut Quiz, SessionError> {
        if !self.quiz_open {
            return Err(SessionError::QuizNotOpen);
        }
        match &mut self.quiz {
            QuizSlot::Ready(quiz) => Ok(quiz),
            QuizSlot::Pending(_) => Err(SessionError::QuizLoading),
            QuizSlot::Failed(_) | QuizSlot::Empty => Err(SessionError::QuizUnavailable),
        }
    }

    //
    // ─── SOUND ─────────────────────────────────────────────────────────────────
    //

    pub fn stop_alarm(&mut self) -> Vec<SessionEvent> {
        if self.alarm_started_at.take().is_some() {
            vec![SessionEvent::AlarmStopped]
        } else {
            Vec::new()
        }
    }

    /// Muting also silences a ringing alarm.
    pub fn set_muted(&mut self, muted: bool) -> Vec<SessionEvent> {
        self.muted = muted;
        if muted { self.stop_alarm() } else { Vec::new() }
    }

    //
    // ─── SETTINGS ──────────────────────────────────────────────────────────────
    //

    /// Change one setting.
    ///
    /// A duration change re-bases the countdown when its mode is idle or
    /// paused and leaves a running countdown alone. Lowering the cycle count
    /// below the current cycle pulls the cycle down with it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Settings` for out-of-range values; nothing changes.
    pub fn update_setting(&mut self, field: SettingField, value: u32) -> Result<(), SessionError> {
        self.settings = self.settings.with(field, value)?;
        match field.mode() {
            Some(mode) => {
                let applies = self.mode == mode || (mode == Mode::Work && self.mode == Mode::Idle);
                if applies && !self.countdown.is_running() && !self.quiz_open {
                    self.countdown.rebase(self.settings.duration_secs(mode));
                }
            }
            None if field == SettingField::CyclesBeforeLongBreak => {
                self.current_cycle = self.current_cycle.min(value);
            }
            None => {}
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See `update_setting`.
    pub fn set_work_minutes(&mut self, minutes: u32) -> Result<(), SessionError> {
        self.update_setting(SettingField::WorkMinutes, minutes)
    }

    /// # Errors
    ///
    /// See `update_setting`.
    pub fn set_short_break_minutes(&mut self, minutes: u32) -> Result<(), SessionError> {
        self.update_setting(SettingField::ShortBreakMinutes, minutes)
    }

    /// # Errors
    ///
    /// See `update_setting`.
    pub fn set_long_break_minutes(&mut self, minutes: u32) -> Result<(), SessionError> {
        self.update_setting(SettingField::LongBreakMinutes, minutes)
    }

    /// # Errors
    ///
    /// See `update_setting`.
    pub fn set_cycles_before_long_break(&mut self, cycles: u32) -> Result<(), SessionError> {
        self.update_setting(SettingField::CyclesBeforeLongBreak, cycles)
    }

    /// Applies to quizzes delivered after the change.
    ///
    /// # Errors
    ///
    /// See `update_setting`.
    pub fn set_question_seconds(&mut self, seconds: u32) -> Result<(), SessionError> {
        self.update_setting(SettingField::QuestionSeconds, seconds)
    }

    //
    // ─── SNAPSHOT ──────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            screen: self.screen,
            mode: self.mode,
            remaining_secs: self.countdown.remaining_secs(),
            duration_secs: self.settings.duration_secs(self.mode),
            current_cycle: self.current_cycle,
            cycles_before_long_break: self.settings.cycles_before_long_break(),
            running: self.countdown.is_running(),
            paused: self.is_paused(),
            alarm_playing: self.is_alarm_playing(),
            muted: self.muted,
            has_notes: self.has_notes(),
            settings: self.settings,
            quiz: self.quiz_open.then(|| self.quiz_view()),
        }
    }

    fn quiz_view(&self) -> QuizView {
        match &self.quiz {
            QuizSlot::Pending(_) => QuizView::Loading,
            QuizSlot::Failed(reason) => QuizView::Unavailable {
                reason: reason.clone(),
            },
            QuizSlot::Empty => QuizView::Unavailable {
                reason: NO_REQUEST_REASON.to_owned(),
            },
            QuizSlot::Ready(quiz) => match (quiz.phase(), quiz.current_question()) {
                (QuizPhase::Completed, _) | (_, None) => QuizView::Completed {
                    correct: quiz.correct_count(),
                    total: quiz.total(),
                    review: quiz.review_visible().then(|| quiz.review()),
                },
                (phase, Some(question)) => QuizView::Presenting(QuestionView {
                    index: quiz.current_index(),
                    total: quiz.total(),
                    text: question.text().to_owned(),
                    options: question.options().to_vec(),
                    selected: quiz.selected(),
                    seconds_left: quiz.seconds_left(),
                    feedback: match phase {
                        QuizPhase::Feedback { correct, .. } => Some(correct),
                        _ => None,
                    },
                    correct_so_far: quiz.correct_count(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::SettingsDraft;
    use crate::time::fixed_now;

    fn at(ms: i64) -> DateTime<Utc> {
        fixed_now() + Duration::milliseconds(ms)
    }

    fn settings(work: u32, cycles: u32) -> TimerSettings {
        SettingsDraft {
            work_minutes: Some(work),
            short_break_minutes: Some(1),
            long_break_minutes: Some(2),
            cycles_before_long_break: Some(cycles),
            ..SettingsDraft::new()
        }
        .validate()
        .unwrap()
    }

    fn timer_session(work: u32, cycles: u32) -> Session {
        let mut session = Session::new(settings(work, cycles));
        session.append_notes("The mitochondria is the powerhouse of the cell.");
        session.enter_timer().unwrap();
        session
    }

    /// Tick every 100 ms over `[from, to]`, collecting events with their time.
    fn run_ticks(session: &mut Session, from: i64, to: i64) -> Vec<(i64, SessionEvent)> {
        let mut out = Vec::new();
        let mut t = from;
        while t <= to {
            out.extend(session.tick(at(t)).into_iter().map(|e| (t, e)));
            t += 100;
        }
        out
    }

    fn requested_ticket(events: &[(i64, SessionEvent)]) -> Option<(i64, QuizTicket)> {
        events.iter().find_map(|(t, e)| match e {
            SessionEvent::QuizRequested(request) => Some((*t, request.ticket)),
            _ => None,
        })
    }

    fn questions(correct: &[usize]) -> Vec<Question> {
        correct
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Question::new(
                    format!("Q{i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    c,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn starts_on_landing_and_needs_notes() {
        let mut session = Session::new(TimerSettings::default());
        assert_eq!(session.screen(), Screen::Landing);
        assert_eq!(session.start(at(0)), Err(SessionError::NotOnTimer));
        assert_eq!(session.enter_timer(), Err(SessionError::NotesRequired));

        session.append_notes("   ");
        assert_eq!(session.enter_timer(), Err(SessionError::NotesRequired));

        session.append_notes("cells");
        session.enter_timer().unwrap();
        assert_eq!(session.screen(), Screen::Timer);
        assert_eq!(session.mode(), Mode::Idle);
        assert_eq!(session.time_remaining_secs(), 30 * 60);
    }

    #[test]
    fn quiz_requested_once_at_threshold_then_modal_opens() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        assert_eq!(session.mode(), Mode::Work);

        let events = run_ticks(&mut session, 0, 60_000);
        let requests: Vec<_> = events
            .iter()
            .filter(|(_, e)| matches!(e, SessionEvent::QuizRequested(_)))
            .collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, 25_000);
        if let SessionEvent::QuizRequested(request) = &requests[0].1 {
            assert!(request.notes.contains("mitochondria"));
        }

        let at_expiry: Vec<_> = events
            .iter()
            .filter(|(t, _)| *t == 60_000)
            .map(|(_, e)| e.clone())
            .collect();
        assert_eq!(
            at_expiry,
            vec![SessionEvent::AlarmStarted, SessionEvent::WorkExpired]
        );
        assert_eq!(session.mode(), Mode::Work);
        assert!(session.is_quiz_open());
        assert!(!session.is_running());
        assert!(!session.quiz_request_issued());
        assert_eq!(session.time_remaining_secs(), 0);
        assert_eq!(session.snapshot().quiz, Some(QuizView::Loading));
    }

    #[test]
    fn sparse_ticks_still_request_exactly_once() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let mut requests = 0;
        for t in [10_000, 27_300, 27_400, 40_000, 59_999] {
            requests += session
                .tick(at(t))
                .iter()
                .filter(|e| matches!(e, SessionEvent::QuizRequested(_)))
                .count();
        }
        assert_eq!(requests, 1);
        assert!(session.quiz_request_issued());
    }

    #[test]
    fn tick_while_stopped_changes_nothing() {
        let mut session = timer_session(1, 3);
        let before = session.clone();
        assert!(session.tick(at(90_000)).is_empty());
        assert_eq!(session, before);

        session.start(at(0)).unwrap();
        session.pause(at(5_000)).unwrap();
        let before = session.clone();
        assert!(session.tick(at(120_000)).is_empty());
        assert_eq!(session, before);
    }

    #[test]
    fn cycle_sequence_reaches_long_break_and_resets_cycle() {
        let mut session = Session::new(
            SettingsDraft {
                work_minutes: Some(1),
                short_break_minutes: Some(1),
                long_break_minutes: Some(1),
                cycles_before_long_break: Some(3),
                ..SettingsDraft::new()
            }
            .validate()
            .unwrap(),
        );
        session.append_notes("notes");
        session.enter_timer().unwrap();
        session.start(at(0)).unwrap();

        let mut modes = vec![(session.mode(), session.current_cycle())];
        let mut t = 0;
        for _ in 0..3 {
            let events = run_ticks(&mut session, t, t + 60_000);
            let (_, ticket) = requested_ticket(&events).unwrap();
            t += 60_000;
            session.fail_quiz(ticket, "offline");
            for event in session.dismiss_quiz(at(t)).unwrap() {
                if let SessionEvent::CycleAdvanced { mode, cycle } = event {
                    modes.push((mode, cycle));
                }
            }
            if session.mode() == Mode::LongBreak {
                break;
            }
            for (_, event) in run_ticks(&mut session, t + 100, t + 60_000) {
                if let SessionEvent::CycleAdvanced { mode, cycle } = event {
                    modes.push((mode, cycle));
                }
            }
            t += 60_000;
        }

        assert_eq!(
            modes,
            vec![
                (Mode::Work, 1),
                (Mode::ShortBreak, 2),
                (Mode::Work, 2),
                (Mode::ShortBreak, 3),
                (Mode::Work, 3),
                (Mode::LongBreak, 1),
            ]
        );
        assert!(session.is_running());
    }

    #[test]
    fn end_to_end_work_interval_with_quiz() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();

        let events = run_ticks(&mut session, 0, 30_000);
        let (requested_at, ticket) = requested_ticket(&events).unwrap();
        assert_eq!(requested_at, 25_000);

        // Resolves while the countdown keeps running; the modal is still closed.
        assert!(session.deliver_quiz(ticket, questions(&[0, 1]), at(30_000)).is_empty());
        assert!(session.is_running());

        let events = run_ticks(&mut session, 30_100, 60_000);
        let last: Vec<_> = events.iter().map(|(_, e)| e.clone()).collect();
        assert_eq!(
            last,
            vec![
                SessionEvent::AlarmStarted,
                SessionEvent::WorkExpired,
                SessionEvent::QuizReady
            ]
        );
        assert_eq!(session.mode(), Mode::Work);
        assert_eq!(session.current_cycle(), 1);

        let answered = session.answer(0, at(61_000)).unwrap();
        assert_eq!(
            answered,
            vec![SessionEvent::AnswerRecorded {
                index: 0,
                choice: Some(0),
                correct: true
            }]
        );
        assert_eq!(
            session.settle(at(62_000)),
            vec![SessionEvent::QuestionAdvanced { index: 1 }]
        );
        session.answer(3, at(63_000)).unwrap();
        assert_eq!(
            session.settle(at(64_000)),
            vec![SessionEvent::QuizCompleted {
                correct: 1,
                total: 2
            }]
        );

        assert_eq!(session.toggle_review(), Ok(true));
        let snapshot = session.snapshot();
        let Some(QuizView::Completed {
            review: Some(review),
            ..
        }) = snapshot.quiz
        else {
            panic!("expected completed quiz with review, got {:?}", snapshot.quiz);
        };
        assert_eq!(review.len(), 2);
        assert!(review[0].is_correct);
        assert!(!review[1].is_correct);

        let events = session.dismiss_quiz(at(65_000)).unwrap();
        assert_eq!(
            events,
            vec![
                SessionEvent::QuizDismissed,
                SessionEvent::CycleAdvanced {
                    mode: Mode::ShortBreak,
                    cycle: 2
                }
            ]
        );
        assert!(session.is_running());
        assert!(session.quiz().is_none());
        assert_eq!(session.time_remaining_secs(), 60);
    }

    #[test]
    fn loading_quiz_blocks_answers_and_dismissal() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();

        assert_eq!(session.select_answer(0), Err(SessionError::QuizLoading));
        assert_eq!(session.dismiss_quiz(at(61_000)), Err(SessionError::QuizLoading));
        assert_eq!(session.start(at(61_000)), Err(SessionError::QuizInProgress));
        assert_eq!(session.reset(), Err(SessionError::QuizInProgress));

        assert_eq!(
            session.deliver_quiz(ticket, questions(&[2]), at(60_500)),
            vec![SessionEvent::QuizReady]
        );
        assert_eq!(
            session.dismiss_quiz(at(61_000)),
            Err(SessionError::Quiz(QuizError::NotCompleted))
        );
    }

    #[test]
    fn failed_generation_still_lets_the_cycle_proceed() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 59_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        assert!(session.fail_quiz(ticket, "provider returned 500").is_empty());

        let events = run_ticks(&mut session, 59_100, 60_000);
        assert!(events.iter().any(|(_, e)| matches!(
            e,
            SessionEvent::QuizUnavailable { reason } if reason == "provider returned 500"
        )));
        assert_eq!(session.select_answer(1), Err(SessionError::QuizUnavailable));

        let events = session.dismiss_quiz(at(61_000)).unwrap();
        assert!(events.contains(&SessionEvent::CycleAdvanced {
            mode: Mode::ShortBreak,
            cycle: 2
        }));
    }

    #[test]
    fn empty_question_list_counts_as_generation_failure() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        let events = session.deliver_quiz(ticket, Vec::new(), at(60_500));
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::QuizUnavailable { .. }]
        ));
    }

    #[test]
    fn late_delivery_after_pause_still_populates() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 26_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.pause(at(26_000)).unwrap();

        assert!(session.deliver_quiz(ticket, questions(&[1]), at(27_000)).is_empty());
        assert!(session.quiz().is_some());
    }

    #[test]
    fn delivery_after_return_to_landing_is_discarded() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 26_000);
        let (_, ticket) = requested_ticket(&events).unwrap();

        session.return_to_landing();
        assert_eq!(session.screen(), Screen::Landing);
        assert_eq!(session.mode(), Mode::Idle);
        assert_eq!(session.current_cycle(), 1);

        assert_eq!(
            session.deliver_quiz(ticket, questions(&[1]), at(27_000)),
            vec![SessionEvent::QuizDiscarded { ticket }]
        );
        assert!(session.quiz().is_none());
        assert!(!session.is_quiz_open());

        // Configuration and notes survive the trip.
        assert_eq!(session.settings().work_minutes(), 1);
        assert!(session.has_notes());
    }

    #[test]
    fn reset_keeps_pending_request() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 26_000);
        let (_, ticket) = requested_ticket(&events).unwrap();

        session.reset().unwrap();
        assert_eq!(session.mode(), Mode::Idle);
        assert_eq!(session.time_remaining_secs(), 60);
        assert_eq!(session.pending_ticket(), Some(ticket));
        assert!(session.deliver_quiz(ticket, questions(&[0]), at(27_000)).is_empty());
        assert!(session.quiz().is_some());
    }

    #[test]
    fn question_timeout_records_null_answer() {
        let mut session = timer_session(1, 3);
        session.set_question_seconds(5).unwrap();
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.deliver_quiz(ticket, questions(&[1, 2]), at(60_000));

        let mut recorded = Vec::new();
        for s in 1..=5 {
            recorded.extend(session.tick_question(at(60_000 + s * 1_000)));
        }
        assert_eq!(
            recorded,
            vec![SessionEvent::AnswerRecorded {
                index: 0,
                choice: None,
                correct: false
            }]
        );
        assert_eq!(session.quiz().unwrap().answers(), &[None, None]);
    }

    #[test]
    fn each_question_gets_full_seconds_when_opened_mid_second() {
        let mut session = timer_session(1, 3);
        session.set_question_seconds(5).unwrap();
        session.start(at(950)).unwrap();
        let events = run_ticks(&mut session, 950, 30_950);
        let (_, ticket) = requested_ticket(&events).unwrap();
        assert!(session.deliver_quiz(ticket, questions(&[1, 2]), at(31_000)).is_empty());

        let events = run_ticks(&mut session, 31_050, 60_950);
        assert!(events.iter().any(|(t, e)| *t == 60_950 && *e == SessionEvent::QuizReady));

        // First question tick lands 50 ms after the modal opened.
        assert!(session.tick_question(at(61_000)).is_empty());
        assert_eq!(session.quiz().unwrap().seconds_left(), 5);
        assert!(session.tick_question(at(65_949)).is_empty());
        assert_eq!(session.quiz().unwrap().seconds_left(), 1);
        assert_eq!(
            session.tick_question(at(65_950)),
            vec![SessionEvent::AnswerRecorded {
                index: 0,
                choice: None,
                correct: false
            }]
        );

        assert_eq!(
            session.settle(at(66_950)),
            vec![SessionEvent::QuestionAdvanced { index: 1 }]
        );
        assert!(session.tick_question(at(67_000)).is_empty());
        assert_eq!(session.quiz().unwrap().seconds_left(), 5);
        assert!(session.tick_question(at(71_949)).is_empty());
        assert_eq!(session.tick_question(at(71_950)).len(), 1);
    }

    #[test]
    fn break_expiry_advances_and_keeps_running() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.fail_quiz(ticket, "offline");
        session.dismiss_quiz(at(60_000)).unwrap();
        assert_eq!(session.mode(), Mode::ShortBreak);

        let events: Vec<_> = run_ticks(&mut session, 60_100, 120_000)
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::AlarmStarted,
                SessionEvent::BreakExpired {
                    mode: Mode::ShortBreak
                },
                SessionEvent::CycleAdvanced {
                    mode: Mode::Work,
                    cycle: 2
                },
            ]
        );
        assert!(session.is_running());
        assert!(!session.is_quiz_open());
        assert!(!session.quiz_request_issued());
    }

    #[test]
    fn alarm_stops_at_ceiling_and_respects_mute() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        run_ticks(&mut session, 0, 60_000);
        assert!(session.is_alarm_playing());
        assert!(session.settle(at(69_900)).is_empty());
        assert_eq!(session.settle(at(70_000)), vec![SessionEvent::AlarmStopped]);
        assert!(!session.is_alarm_playing());

        let mut muted = timer_session(1, 3);
        muted.set_muted(true);
        muted.start(at(0)).unwrap();
        let events = run_ticks(&mut muted, 0, 60_000);
        assert!(!events.iter().any(|(_, e)| *e == SessionEvent::AlarmStarted));
        assert!(!muted.is_alarm_playing());
    }

    #[test]
    fn duration_changes_rebase_only_when_not_running() {
        let mut session = timer_session(1, 3);
        session.set_work_minutes(2).unwrap();
        assert_eq!(session.time_remaining_secs(), 120);

        session.start(at(0)).unwrap();
        session.tick(at(10_000));
        session.set_work_minutes(5).unwrap();
        assert_eq!(session.tick(at(11_000)), Vec::new());
        assert_eq!(session.time_remaining_secs(), 109);

        session.pause(at(12_000)).unwrap();
        session.set_work_minutes(3).unwrap();
        assert_eq!(session.time_remaining_secs(), 180);

        // A break duration does not touch the work countdown.
        session.set_short_break_minutes(5).unwrap();
        assert_eq!(session.time_remaining_secs(), 180);

        assert!(matches!(
            session.set_work_minutes(0),
            Err(SessionError::Settings(_))
        ));
        assert_eq!(session.settings().work_minutes(), 3);
    }

    #[test]
    fn break_duration_changes_rebase_only_while_that_break_is_paused() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.fail_quiz(ticket, "offline");
        session.dismiss_quiz(at(60_000)).unwrap();
        assert_eq!(session.mode(), Mode::ShortBreak);
        assert_eq!(session.time_remaining_secs(), 60);

        session.tick(at(70_000));
        session.set_short_break_minutes(5).unwrap();
        assert_eq!(session.tick(at(70_000)), Vec::new());
        assert_eq!(session.time_remaining_secs(), 50);
        assert!(session.is_running());

        session.pause(at(71_000)).unwrap();
        session.set_short_break_minutes(3).unwrap();
        assert_eq!(session.time_remaining_secs(), 180);
        assert_eq!(session.snapshot().duration_secs, 180);

        session.set_long_break_minutes(9).unwrap();
        session.set_work_minutes(4).unwrap();
        assert_eq!(session.time_remaining_secs(), 180);
        assert_eq!(session.mode(), Mode::ShortBreak);
    }

    #[test]
    fn lowering_cycles_clamps_current_cycle() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.fail_quiz(ticket, "offline");
        session.dismiss_quiz(at(60_000)).unwrap();
        assert_eq!(session.current_cycle(), 2);

        session.set_cycles_before_long_break(1).unwrap();
        assert_eq!(session.current_cycle(), 1);
    }

    #[test]
    fn snapshot_serializes_quiz_state() {
        let mut session = timer_session(1, 3);
        session.start(at(0)).unwrap();
        let events = run_ticks(&mut session, 0, 60_000);
        let (_, ticket) = requested_ticket(&events).unwrap();
        session.deliver_quiz(ticket, questions(&[1]), at(60_500));
        session.select_answer(1).unwrap();

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["mode"], "work");
        assert_eq!(json["quiz"]["state"], "presenting");
        assert_eq!(json["quiz"]["selected"], 1);
        assert_eq!(json["quiz"]["seconds_left"], 20);
    }
}
