#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod time;

pub use countdown::Countdown;
pub use error::SessionError;
pub use session::{
    ALARM_CEILING_SECS, QUIZ_TRIGGER_SECS, QuizRequest, QuizTicket, Session, SessionEvent,
};
pub use snapshot::{QuestionView, QuizView, SessionSnapshot};
pub use time::Clock;
