use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const BELL_INTERVAL: Duration = Duration::from_secs(1);

/// Sound effects. Calls are fire-and-forget and must not block.
pub trait Notifier: Send + Sync {
    /// Begin the looping end-of-interval alarm.
    fn start_alarm(&self);
    fn stop_alarm(&self);
    /// Short cue after an answer is recorded.
    fn play_feedback(&self, correct: bool);
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn start_alarm(&self) {}
    fn stop_alarm(&self) {}
    fn play_feedback(&self, _correct: bool) {}
}

/// Rings the terminal bell on stderr.
///
/// The alarm loop runs on the current tokio runtime until `stop_alarm`; outside
/// a runtime only a single bell is rung.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    alarm: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn swap_alarm(&self, next: Option<JoinHandle<()>>) {
        let previous = match self.alarm.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(task) = previous {
            task.abort();
        }
    }
}

fn ring(times: usize) {
    let mut stderr = std::io::stderr().lock();
    for _ in 0..times {
        if stderr.write_all(b"\x07").is_err() {
            return;
        }
    }
    let _ = stderr.flush();
}

impl Notifier for TerminalNotifier {
    fn start_alarm(&self) {
        let Ok(handle) = Handle::try_current() else {
            ring(1);
            return;
        };
        let task = handle.spawn(async {
            let mut interval = tokio::time::interval(BELL_INTERVAL);
            loop {
                interval.tick().await;
                ring(1);
            }
        });
        self.swap_alarm(Some(task));
        tracing::debug!("alarm started");
    }

    fn stop_alarm(&self) {
        self.swap_alarm(None);
        tracing::debug!("alarm stopped");
    }

    fn play_feedback(&self, correct: bool) {
        ring(if correct { 1 } else { 2 });
    }
}

impl Drop for TerminalNotifier {
    fn drop(&mut self) {
        self.swap_alarm(None);
    }
}
