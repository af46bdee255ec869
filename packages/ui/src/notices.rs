use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    /// Blocking alert: the user has to acknowledge it.
    Alert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub timestamp: String,
    pub level: NoticeLevel,
    pub message: String,
}

/// User-facing messages raised by controllers. Clones share the same list;
/// front ends drain it with [`Notices::take`].
#[derive(Clone, Debug, Default)]
pub struct Notices {
    entries: Rc<RefCell<Vec<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Alert => error!("{}", message),
            NoticeLevel::Warning => warn!("{}", message),
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", message),
        }
        self.entries.borrow_mut().push(Notice {
            timestamp: current_time(),
            level,
            message,
        });
    }

    pub fn alert(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Alert, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn entries(&self) -> Vec<Notice> {
        self.entries.borrow().clone()
    }

    /// Messages of pending alerts, oldest first.
    pub fn alerts(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|n| n.level == NoticeLevel::Alert)
            .map(|n| n.message.clone())
            .collect()
    }

    /// Remove and return everything raised so far.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

fn current_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Blocking yes/no question put to the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, question: &str) -> bool {
        self(question)
    }
}
