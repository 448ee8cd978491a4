/// Structured record of one coordination step.
///
/// Events are kept in emission order and mirrored to `tracing` at debug
/// level, so a session can be inspected after the fact (tests, replay tool)
/// or followed live through the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: &'static str,
    pub message: String,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:>3}] {:<16} {}", self.seq, self.kind, self.message)
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    next_seq: u64,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(kind, seq = self.next_seq, "{message}");
        self.events.push(Event {
            seq: self.next_seq,
            kind,
            message,
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Kinds in emission order; convenient for assertions.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
