//! Security Events
//!
//! Structured audit events emitted by the authentication use cases.
//! Sinks are fire-and-forget: recording an event must never fail the
//! operation that produced it.

use uuid::Uuid;

use crate::domain::value_object::UserId;

/// Outcome of the audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Success,
    Failure,
}

impl EventOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Success => "success",
            EventOutcome::Failure => "failure",
        }
    }
}

/// Event severity for the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

impl EventSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "info",
            EventSeverity::Warning => "warning",
            EventSeverity::Critical => "critical",
        }
    }
}

/// Structured authentication event
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    /// Event name, e.g. `login_succeeded`
    pub name: &'static str,
    pub outcome: EventOutcome,
    pub severity: EventSeverity,
    /// Internal failure reason tag, e.g. `wrong_password`; never rendered
    /// to clients
    pub reason: Option<&'static str>,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub session_id: Option<Uuid>,
    pub client_ip: Option<String>,
}

impl SecurityEvent {
    pub fn success(name: &'static str) -> Self {
        Self {
            name,
            outcome: EventOutcome::Success,
            severity: EventSeverity::Info,
            reason: None,
            user_id: None,
            email: None,
            session_id: None,
            client_ip: None,
        }
    }

    pub fn failure(name: &'static str, reason: &'static str) -> Self {
        Self {
            name,
            outcome: EventOutcome::Failure,
            severity: EventSeverity::Warning,
            reason: Some(reason),
            user_id: None,
            email: None,
            session_id: None,
            client_ip: None,
        }
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.client_ip = ip;
        self
    }
}

/// Security event sink
///
/// Implementations must swallow their own errors; the core treats
/// `record` as infallible.
pub trait SecurityEventSink: Send + Sync {
    fn record(&self, event: SecurityEvent);
}

/// Default sink emitting structured `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl SecurityEventSink for TracingEventSink {
    fn record(&self, event: SecurityEvent) {
        let user_id = event.user_id.map(|id| id.to_string());
        let session_id = event.session_id.map(|id| id.to_string());

        macro_rules! emit {
            ($level:ident) => {
                tracing::$level!(
                    target: "security_event",
                    event = event.name,
                    outcome = event.outcome.as_str(),
                    severity = event.severity.as_str(),
                    reason = event.reason,
                    user_id = user_id.as_deref(),
                    email = event.email.as_deref(),
                    session_id = session_id.as_deref(),
                    client_ip = event.client_ip.as_deref(),
                    "security event"
                )
            };
        }
        match event.severity {
            EventSeverity::Info => emit!(info),
            EventSeverity::Warning => emit!(warn),
            EventSeverity::Critical => emit!(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let user_id = UserId::new();
        let sid = Uuid::new_v4();
        let event = SecurityEvent::failure("login_failed", "wrong_password")
            .with_user(user_id)
            .with_email("a@x.com")
            .with_session(sid)
            .with_ip(Some("10.0.0.1".into()));

        assert_eq!(event.name, "login_failed");
        assert_eq!(event.outcome, EventOutcome::Failure);
        assert_eq!(event.severity, EventSeverity::Warning);
        assert_eq!(event.reason, Some("wrong_password"));
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.session_id, Some(sid));
    }

    #[test]
    fn test_success_defaults_to_info() {
        let event = SecurityEvent::success("login_succeeded");
        assert_eq!(event.outcome, EventOutcome::Success);
        assert_eq!(event.severity, EventSeverity::Info);
        assert!(event.reason.is_none());
    }

    #[test]
    fn test_tracing_sink_never_panics() {
        let sink = TracingEventSink;
        sink.record(SecurityEvent::success("logout"));
        sink.record(
            SecurityEvent::failure("login_failed", "account_locked")
                .with_severity(EventSeverity::Critical),
        );
    }
}
