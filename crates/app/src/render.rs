use pomo_core::model::{Mode, Screen};
use pomo_core::{QuestionView, QuizView, SessionSnapshot};
use services::ControllerUpdate;

/// `mm:ss`, minutes unbounded.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Text frame for one controller update.
#[must_use]
pub fn render(update: &ControllerUpdate) -> String {
    let snapshot = &update.snapshot;
    let mut lines = vec![status_line(snapshot)];
    if let Some(quiz) = &snapshot.quiz {
        quiz_lines(quiz, &mut lines);
    }
    if let Some(notice) = &update.notice {
        lines.push(format!("! {notice}"));
    }
    lines.join("\n")
}

fn status_line(snapshot: &SessionSnapshot) -> String {
    if snapshot.screen == Screen::Landing {
        let notes = if snapshot.has_notes { "ready" } else { "none yet" };
        return format!("[landing] notes: {notes}. `add <file>` to upload, `timer` to continue");
    }

    let state = if snapshot.running {
        "running"
    } else if snapshot.quiz.is_some() {
        "quiz"
    } else if snapshot.paused {
        "paused"
    } else {
        "ready"
    };
    let mut line = match snapshot.mode {
        Mode::Idle => format!(
            "[ready] {}  `start` to begin",
            format_clock(snapshot.remaining_secs)
        ),
        mode => format!(
            "[{mode} {}/{}] {} {state}",
            snapshot.current_cycle,
            snapshot.cycles_before_long_break,
            format_clock(snapshot.remaining_secs)
        ),
    };
    if snapshot.alarm_playing {
        line.push_str("  (alarm: `stop-alarm`)");
    }
    if snapshot.muted {
        line.push_str("  [muted]");
    }
    line
}

fn quiz_lines(quiz: &QuizView, lines: &mut Vec<String>) {
    match quiz {
        QuizView::Loading => lines.push("Quiz: generating questions...".to_owned()),
        QuizView::Unavailable { reason } => {
            lines.push(format!("Quiz unavailable: {reason}"));
            lines.push("`dismiss` to start the break".to_owned());
        }
        QuizView::Presenting(view) => question_lines(view, lines),
        QuizView::Completed {
            correct,
            total,
            review,
        } => {
            lines.push(format!("Quiz complete: {correct}/{total} correct"));
            match review {
                Some(entries) => {
                    for entry in entries {
                        let mark = if entry.is_correct { "ok" } else { "x" };
                        let given = entry.given_answer.as_deref().unwrap_or("(no answer)");
                        lines.push(format!(
                            "  {}. [{mark}] {} | you: {given} | answer: {}",
                            entry.index + 1,
                            entry.question,
                            entry.correct_answer
                        ));
                    }
                }
                None => lines.push("`review` to see answers, `dismiss` to start the break".to_owned()),
            }
        }
    }
}

fn question_lines(view: &QuestionView, lines: &mut Vec<String>) {
    lines.push(format!(
        "Question {}/{} ({}s left, score {})",
        view.index + 1,
        view.total,
        view.seconds_left,
        view.correct_so_far
    ));
    lines.push(format!("  {}", view.text));
    for (i, option) in view.options.iter().enumerate() {
        let marker = if view.selected == Some(i) { '>' } else { ' ' };
        lines.push(format!("  {marker} {}) {option}", i + 1));
    }
    match view.feedback {
        Some(true) => lines.push("  Correct!".to_owned()),
        Some(false) => lines.push("  Incorrect.".to_owned()),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use pomo_core::Session;
    use pomo_core::model::{ReviewEntry, TimerSettings};
    use pomo_core::time::fixed_now;

    use super::*;

    fn timer_snapshot() -> SessionSnapshot {
        let mut session = Session::new(TimerSettings::default());
        session.append_notes("notes");
        session.enter_timer().unwrap();
        session.snapshot()
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(30 * 60), "30:00");
        assert_eq!(format_clock(61 * 60 + 5), "61:05");
    }

    #[test]
    fn landing_and_idle_status() {
        let landing = Session::new(TimerSettings::default()).snapshot();
        assert!(render(&ControllerUpdate::new(landing)).starts_with("[landing] notes: none yet"));

        let idle = render(&ControllerUpdate::new(timer_snapshot()));
        assert_eq!(idle, "[ready] 30:00  `start` to begin");
    }

    #[test]
    fn running_status_with_notice() {
        let mut session = Session::new(TimerSettings::default());
        session.append_notes("notes");
        session.enter_timer().unwrap();
        session.start(fixed_now()).unwrap();
        let update = ControllerUpdate {
            snapshot: session.snapshot(),
            notice: Some("finish and close the quiz first".into()),
        };
        assert_eq!(
            render(&update),
            "[work 1/3] 30:00 running\n! finish and close the quiz first"
        );
    }

    #[test]
    fn presenting_question_marks_selection_and_feedback() {
        let mut snapshot = timer_snapshot();
        snapshot.quiz = Some(QuizView::Presenting(QuestionView {
            index: 1,
            total: 5,
            text: "Largest planet?".into(),
            options: vec!["Mars".into(), "Jupiter".into()],
            selected: Some(1),
            seconds_left: 12,
            feedback: Some(true),
            correct_so_far: 2,
        }));
        let frame = render(&ControllerUpdate::new(snapshot));
        let lines: Vec<&str> = frame.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "Question 2/5 (12s left, score 2)",
                "  Largest planet?",
                "    1) Mars",
                "  > 2) Jupiter",
                "  Correct!",
            ]
        );
    }

    #[test]
    fn completed_review_lists_answers() {
        let mut snapshot = timer_snapshot();
        snapshot.quiz = Some(QuizView::Completed {
            correct: 0,
            total: 1,
            review: Some(vec![ReviewEntry {
                index: 0,
                question: "Largest planet?".into(),
                correct_answer: "Jupiter".into(),
                given_answer: None,
                is_correct: false,
            }]),
        });
        let frame = render(&ControllerUpdate::new(snapshot));
        assert!(frame.contains("Quiz complete: 0/1 correct"));
        assert!(frame.contains("  1. [x] Largest planet? | you: (no answer) | answer: Jupiter"));
    }
}
