use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    raised_at: Instant,
}

/// Holds at most one live notification. Showing a new one replaces the
/// old; each expires `ttl` after it was raised.
#[derive(Debug, Clone)]
pub struct ToastSlot {
    current: Option<Toast>,
    ttl: Duration,
}

impl ToastSlot {
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    pub fn show(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.show_at(kind, message, Instant::now());
    }

    pub fn show_at(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match kind {
            ToastKind::Error => tracing::warn!(%message, "toast"),
            _ => tracing::debug!(%message, "toast"),
        }
        self.current = Some(Toast {
            message,
            kind,
            raised_at: now,
        });
    }

    pub fn current(&mut self) -> Option<&Toast> {
        self.current_at(Instant::now())
    }

    /// The live toast at `now`; an expired one is dropped.
    pub fn current_at(&mut self, now: Instant) -> Option<&Toast> {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|t| now.saturating_duration_since(t.raised_at) >= self.ttl);
        if expired {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

impl Default for ToastSlot {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
