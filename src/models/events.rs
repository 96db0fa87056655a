//! Database lifecycle events.

/// Events published by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    /// The engine reported that the database file is corrupt.
    Corrupted,
    /// A connection was opened.
    Opened {
        /// Path of the opened database file.
        path: String,
    },
    /// The connection was closed.
    Closed,
}

impl DatabaseEvent {
    /// Returns the event type identifier.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Corrupted => "database.corrupted",
            Self::Opened { .. } => "database.opened",
            Self::Closed => "database.closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        assert_eq!(DatabaseEvent::Corrupted.event_type(), "database.corrupted");
        assert_eq!(
            DatabaseEvent::Opened {
                path: "a.db".to_string()
            }
            .event_type(),
            "database.opened"
        );
        assert_eq!(DatabaseEvent::Closed.event_type(), "database.closed");
    }
}
