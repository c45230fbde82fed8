//! Presenter-facing session surface
//!
//! The presentation layer is purely a consumer: it reads [`SessionView`]
//! snapshots (or listens for [`SessionEvent`]s) and issues only acquire,
//! cancel, and reset back into the session.

use serde::Serialize;

use super::ScanState;
use crate::matcher::MatchResult;

/// Read-only snapshot of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    /// Current state of the scan attempt
    pub state: ScanState,
    /// Identifier of the current attempt, if one is active
    pub attempt_id: Option<String>,
    /// Recognized text, once extraction has succeeded
    pub extracted_text: Option<String>,
    /// Ranked match results; non-empty only while presenting
    pub results: Vec<MatchResult>,
    /// Human-readable error cause, when the attempt failed
    pub error: Option<String>,
}

/// Notifications emitted by the session on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub from: ScanState,
    pub to: ScanState,
}
