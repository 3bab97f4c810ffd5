use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice { level: Level::Error, message: message.into() }
    }
}

/// Receives notices raised by services and handlers.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Prints notices for the command line.
pub struct StderrNotifier {
    pub quiet: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            Level::Error => eprintln!("{}", notice.message),
            Level::Success if !self.quiet => println!("{}", notice.message),
            Level::Success => {}
        }
    }
}

/// Keeps every notice in memory; the TUI shows the newest one.
#[derive(Default)]
pub struct NoticeBuffer {
    notices: RefCell<Vec<Notice>>,
}

impl NoticeBuffer {
    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    pub fn take(&self) -> Vec<Notice> {
        self.notices.borrow_mut().drain(..).collect()
    }
}

impl Notifier for NoticeBuffer {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}
