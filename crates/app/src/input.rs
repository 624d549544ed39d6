use std::fmt;
use std::path::PathBuf;

use pomo_core::model::SettingField;
use services::Command;

pub const HELP: &str = "\
commands:
  start | pause | toggle | reset      control the countdown
  <n> | answer <n>                    answer the current question with option n
  select <n> | submit                 highlight an option, then submit it
  review | dismiss                    show answers / close the finished quiz
  stop-alarm | mute                   silence the alarm / toggle all sounds
  work <min> | short <min> | long <min> | cycles <n> | seconds <n>
  add <file>...                       add note files
  landing | timer                     switch screens
  help | quit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    UnknownCommand(String),
    MissingValue { command: &'static str },
    InvalidNumber { command: &'static str, raw: String },
    OptionOutOfRange { raw: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::UnknownCommand(word) => {
                write!(f, "unknown command: {word} (type `help`)")
            }
            InputError::MissingValue { command } => write!(f, "{command} requires a value"),
            InputError::InvalidNumber { command, raw } => {
                write!(f, "invalid {command} value: {raw}")
            }
            InputError::OptionOutOfRange { raw } => {
                write!(f, "options are numbered from 1, got {raw}")
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Parse a line typed on the terminal. Option numbers are one-based.
///
/// # Errors
///
/// Returns `InputError` for unknown words and missing or malformed values.
pub fn parse_line(line: &str) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Input::Empty);
    };
    let head = head.to_ascii_lowercase();

    let command = match head.as_str() {
        "help" | "?" => return Ok(Input::Help),
        "start" | "resume" => Command::Start,
        "pause" => Command::Pause,
        "toggle" | "p" => Command::Toggle,
        "reset" => Command::Reset,
        "submit" => Command::Submit,
        "review" => Command::ToggleReview,
        "dismiss" | "close" => Command::Dismiss,
        "stop-alarm" | "stop" => Command::StopAlarm,
        "mute" | "unmute" => Command::ToggleMute,
        "landing" => Command::ReturnToLanding,
        "timer" => Command::EnterTimer,
        "quit" | "exit" | "q" => Command::Quit,
        "answer" => Command::Answer(option(words.next(), "answer")?),
        "select" => Command::Select(option(words.next(), "select")?),
        "work" => setting(SettingField::WorkMinutes, words.next(), "work")?,
        "short" => setting(SettingField::ShortBreakMinutes, words.next(), "short")?,
        "long" => setting(SettingField::LongBreakMinutes, words.next(), "long")?,
        "cycles" => setting(SettingField::CyclesBeforeLongBreak, words.next(), "cycles")?,
        "seconds" => setting(SettingField::QuestionSeconds, words.next(), "seconds")?,
        "add" => {
            let paths: Vec<PathBuf> = words.by_ref().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(InputError::MissingValue { command: "add" });
            }
            Command::AddNotes(paths)
        }
        digits if digits.chars().all(|c| c.is_ascii_digit()) => {
            Command::Answer(option(Some(digits), "answer")?)
        }
        _ => return Err(InputError::UnknownCommand(head)),
    };
    Ok(Input::Command(command))
}

fn number(raw: Option<&str>, command: &'static str) -> Result<u32, InputError> {
    let raw = raw.ok_or(InputError::MissingValue { command })?;
    raw.parse().map_err(|_| InputError::InvalidNumber {
        command,
        raw: raw.to_owned(),
    })
}

fn option(raw: Option<&str>, command: &'static str) -> Result<usize, InputError> {
    let value = number(raw, command)?;
    let index = value.checked_sub(1).ok_or_else(|| InputError::OptionOutOfRange {
        raw: value.to_string(),
    })?;
    Ok(index as usize)
}

fn setting(
    field: SettingField,
    raw: Option<&str>,
    command: &'static str,
) -> Result<Command, InputError> {
    Ok(Command::Setting(field, number(raw, command)?))
}
