use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// What the host page knows about itself when a record is captured.
pub trait PageContext: Send + Sync {
    fn current_url(&self) -> String;

    fn is_authenticated(&self) -> bool {
        false
    }
}

/// A [`PageContext`] whose values are set by the host as navigation and
/// sign-in state change.
#[derive(Debug, Default)]
pub struct StaticPageContext {
    url: RwLock<String>,
    authenticated: AtomicBool,
}

impl StaticPageContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(url.into()),
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn set_url(&self, url: impl Into<String>) {
        let mut guard = self
            .url
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = url.into();
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Relaxed);
    }
}

impl PageContext for StaticPageContext {
    fn current_url(&self) -> String {
        self.url
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }
}
