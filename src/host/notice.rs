/// User-visible notices (the blocking alerts of a UI)

use log::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An action was attempted before its precondition held
    Precondition(String),
    /// An operation failed and was abandoned
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Precondition(m) | Notice::Failure(m) => m,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices to the log
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Precondition(m) => warn!("{}", m),
            Notice::Failure(m) => error!("{}", m),
        }
    }
}

/// Keeps notices in memory for tests
#[derive(Default)]
pub struct MemoryNotifier {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_records_in_order() {
        let n = MemoryNotifier::new();
        n.notify(Notice::Precondition("first".into()));
        n.notify(Notice::Failure("second".into()));
        let all = n.notices();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message(), "first");
        assert_eq!(all[1], Notice::Failure("second".into()));
    }
}
