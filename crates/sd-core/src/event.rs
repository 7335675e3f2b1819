use std::collections::VecDeque;

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    // Lifecycle
    /// The model was built and its evaluation order resolved.
    Built {
        /// Number of registered equations.
        equations: usize,
    },
    /// The initialization hook assigned a value.
    Seeded {
        /// The seeded equation.
        equation: String,
        /// The assigned value.
        value: f64,
    },
    /// The stop condition held after a commit.
    Ended {
        /// Simulated time at which the run ended.
        time: f64,
    },
    /// The run was aborted by a fatal error.
    Aborted {
        /// The error message.
        reason: String,
    },
    /// The run was restarted from its initial values.
    Reset,

    // Values
    /// A non-negative equation computed a negative value and was clamped to 0.
    Clamped {
        /// The clamped equation.
        equation: String,
        /// The value computed by the rule before clamping.
        raw: f64,
    },
    /// A parameter was changed by the client.
    ParameterChanged {
        /// The parameter name.
        name: String,
        /// Previous value.
        from: f64,
        /// New value.
        to: f64,
    },

    // Logging
    /// Logging was enabled for an equation.
    LoggingEnabled {
        /// The equation now logging.
        equation: String,
    },
    /// Logging was disabled and the log discarded.
    LoggingDisabled {
        /// The equation no longer logging.
        equation: String,
    },
    /// Logging was used out of sequence. Diagnostic only; the run continues.
    LoggingMisuse {
        /// The equation involved.
        equation: String,
        /// What went wrong.
        reason: String,
    },
}

impl SimEventKind {
    /// Check whether a given equation is involved in this event.
    pub fn involves(&self, name: &str) -> bool {
        match self {
            Self::Seeded { equation, .. }
            | Self::Clamped { equation, .. }
            | Self::LoggingEnabled { equation }
            | Self::LoggingDisabled { equation }
            | Self::LoggingMisuse { equation, .. } => equation == name,
            Self::ParameterChanged { name: param, .. } => param == name,
            Self::Built { .. } | Self::Ended { .. } | Self::Aborted { .. } | Self::Reset => false,
        }
    }

    /// Returns `true` for diagnostics that indicate a client sequencing bug.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::LoggingMisuse { .. } | Self::Aborted { .. })
    }
}

/// One entry in the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    /// Completed ticks when the event was recorded.
    pub tick: u64,
    /// What happened.
    pub kind: SimEventKind,
    /// Human-readable summary.
    pub description: String,
}

impl SimEvent {
    /// Record `kind` at `tick`.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Bounded history of simulation events, oldest first.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: VecDeque<SimEvent>,
    capacity: usize,
}

impl EventLog {
    /// A log holding at most `capacity` events. 0 keeps everything.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Record an event, evicting the oldest one when full.
    pub fn push(&mut self, event: SimEvent) {
        if self.capacity > 0 && self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Every retained event, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SimEvent> {
        self.entries.iter()
    }

    /// Events recorded at `tick`.
    pub fn at_tick(&self, tick: u64) -> impl Iterator<Item = &SimEvent> {
        self.iter().filter(move |e| e.tick == tick)
    }

    /// Events that name the given equation or parameter.
    pub fn involving<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SimEvent> {
        self.iter().filter(move |e| e.kind.involves(name))
    }

    /// Diagnostics worth surfacing to a user.
    pub fn warnings(&self) -> impl Iterator<Item = &SimEvent> {
        self.iter().filter(|e| e.kind.is_warning())
    }

    /// Most recent event.
    pub fn last(&self) -> Option<&SimEvent> {
        self.entries.back()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
