//! Scan Session
//!
//! Orchestrates one scan-to-result attempt: image acquisition, text
//! extraction, question matching, result presentation. Exactly one attempt
//! is active per session; a new capture or an explicit reset discards
//! everything from the previous one.
//!
//! Extraction is the only unbounded suspension point. The session awaits it
//! under its cancellation token; once cancellation is observed, no further
//! state mutation happens for that attempt even if the extraction call later
//! resolves.

pub mod view;

use std::fmt;

use crossbeam_channel::Sender;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::capture::{ImageAsset, ImageSource};
use crate::error::ScanError;
use crate::extraction::{ExtractedText, ExtractionError, TextExtractor};
use crate::matcher::{MatchResult, QuestionMatcher};

pub use view::{SessionEvent, SessionView};

/// States of one scan attempt.
///
/// `Failed` means pipeline malfunction; "no match found" presents normally
/// with an empty result list and never lands here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Capturing,
    Extracting,
    Matching,
    Presenting,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Capturing => "capturing",
            ScanState::Extracting => "extracting",
            ScanState::Matching => "matching",
            ScanState::Presenting => "presenting",
            ScanState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Stateful orchestrator of one scan-to-result attempt.
pub struct ScanSession {
    state: ScanState,
    /// Identifier of the active attempt
    attempt_id: Option<Uuid>,
    /// Image under analysis
    asset: Option<ImageAsset>,
    /// Text recovered by the extraction backend
    extracted: Option<ExtractedText>,
    /// Ranked matches; non-empty only in `Presenting`
    results: Vec<MatchResult>,
    /// Terminal error; populated only in `Failed`
    error: Option<ScanError>,
    /// Cancellation scope of the active attempt
    cancel: CancellationToken,
    /// Optional state-transition notification channel
    events: Option<Sender<SessionEvent>>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            attempt_id: None,
            asset: None,
            extracted: None,
            results: Vec::new(),
            error: None,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Create a session that reports every state transition on `events`.
    pub fn with_events(events: Sender<SessionEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::new()
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    pub fn extracted_text(&self) -> Option<&ExtractedText> {
        self.extracted.as_ref()
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    /// Cancellation handle for the active attempt.
    ///
    /// The hosting application cancels this token to abandon the attempt,
    /// e.g. from a UI button or after its own deadline. The session observes
    /// it during extraction and returns to `Idle`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot for the presentation layer.
    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            attempt_id: self.attempt_id.map(|id| id.to_string()),
            extracted_text: self.extracted.as_ref().map(|t| t.text.clone()),
            results: self.results.clone(),
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Begin a new attempt from raw image bytes.
    ///
    /// Any previous attempt is discarded; validation failure lands the new
    /// attempt in `Failed` with the acquisition error.
    pub fn acquire(&mut self, source: &ImageSource, data: Vec<u8>) -> ScanState {
        self.begin_attempt();
        match source.acquire(data) {
            Ok(asset) => {
                self.asset = Some(asset);
                self.set_state(ScanState::Capturing);
            }
            Err(e) => self.fail(e),
        }
        self.state
    }

    /// Run the acquired image through extraction and matching.
    ///
    /// Extraction completes (or fails, or is cancelled) strictly before
    /// matching starts; there is no speculative overlap. On cancellation the
    /// session returns to `Idle` with all attempt data discarded.
    pub async fn submit<E>(&mut self, extractor: &E, matcher: &QuestionMatcher) -> ScanState
    where
        E: TextExtractor + ?Sized,
    {
        let Some(asset) = self.asset.clone() else {
            warn!(state = %self.state, "submit without an acquired image; ignoring");
            return self.state;
        };
        if self.state != ScanState::Capturing {
            warn!(state = %self.state, "submit outside capturing state; ignoring");
            return self.state;
        }

        self.set_state(ScanState::Extracting);
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            res = extractor.extract(&asset, &cancel) => Some(res),
        };

        let text = match outcome {
            // Cancellation won the race, or the result arrived after the
            // token tripped: either way the attempt is abandoned.
            None => return self.abandon(),
            Some(_) if cancel.is_cancelled() => return self.abandon(),
            Some(Err(ExtractionError::Cancelled)) => return self.abandon(),
            Some(Err(e)) => {
                self.fail(e.into());
                return self.state;
            }
            Some(Ok(text)) => text,
        };

        debug!(chars = text.text.len(), "extraction complete");
        self.extracted = Some(text.clone());
        self.set_state(ScanState::Matching);

        match matcher.match_text(&text) {
            Ok(results) => {
                // An empty list is a valid "no known match" outcome.
                debug!(results = results.len(), "presenting results");
                self.results = results;
                self.set_state(ScanState::Presenting);
            }
            Err(e) => self.fail(e.into()),
        }

        self.state
    }

    /// Discard all attempt data and return to `Idle`.
    pub fn reset(&mut self) -> ScanState {
        self.cancel.cancel();
        self.begin_attempt();
        self.attempt_id = None;
        self.set_state(ScanState::Idle);
        self.state
    }

    /// Start a fresh attempt scope: new token, new id, no leftover data.
    fn begin_attempt(&mut self) {
        self.asset = None;
        self.extracted = None;
        self.results.clear();
        self.error = None;
        self.cancel = CancellationToken::new();
        self.attempt_id = Some(Uuid::new_v4());
    }

    /// Cancellation acknowledged: drop everything, back to `Idle`.
    fn abandon(&mut self) -> ScanState {
        debug!("attempt cancelled, discarding session data");
        self.begin_attempt();
        self.attempt_id = None;
        self.set_state(ScanState::Idle);
        self.state
    }

    /// Record a terminal error for this attempt.
    ///
    /// Keeps the acquired image (the presenter may still show it next to a
    /// retry affordance) but drops extracted text and results, preserving
    /// the one-of-{text, error} invariant.
    fn fail(&mut self, error: ScanError) {
        warn!(%error, "scan attempt failed");
        self.extracted = None;
        self.results.clear();
        self.error = Some(error);
        self.set_state(ScanState::Failed);
    }

    fn set_state(&mut self, to: ScanState) {
        if self.state == to {
            return;
        }
        debug!(from = %self.state, to = %to, "session transition");
        if let Some(ref events) = self.events {
            let _ = events.send(SessionEvent {
                from: self.state,
                to,
            });
        }
        self.state = to;
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::tiny_png;
    use crate::matcher::MatcherConfig;
    use crate::store::{JsonFileStore, MemoryStore, QuestionRecord};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Extractor that returns fixed text immediately.
    struct FixedExtractor(String);

    #[async_trait]
    impl TextExtractor for FixedExtractor {
        async fn extract(
            &self,
            _asset: &ImageAsset,
            _cancel: &CancellationToken,
        ) -> Result<ExtractedText, ExtractionError> {
            Ok(ExtractedText::plain(self.0.clone()))
        }
    }

    /// Extractor that fails with a fixed error.
    struct FailingExtractor(ExtractionError);

    #[async_trait]
    impl TextExtractor for FailingExtractor {
        async fn extract(
            &self,
            _asset: &ImageAsset,
            _cancel: &CancellationToken,
        ) -> Result<ExtractedText, ExtractionError> {
            Err(self.0.clone())
        }
    }

    /// Extractor that ignores the token and takes its time.
    struct SlowExtractor(Duration);

    #[async_trait]
    impl TextExtractor for SlowExtractor {
        async fn extract(
            &self,
            _asset: &ImageAsset,
            _cancel: &CancellationToken,
        ) -> Result<ExtractedText, ExtractionError> {
            tokio::time::sleep(self.0).await;
            Ok(ExtractedText::plain("late result"))
        }
    }

    /// Extractor that trips the attempt token itself, then resolves anyway.
    struct SelfCancellingExtractor;

    #[async_trait]
    impl TextExtractor for SelfCancellingExtractor {
        async fn extract(
            &self,
            _asset: &ImageAsset,
            cancel: &CancellationToken,
        ) -> Result<ExtractedText, ExtractionError> {
            cancel.cancel();
            Ok(ExtractedText::plain("late result"))
        }
    }

    fn record(id: &str, question: &str) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            question: question.to_string(),
            answer: "x = 5".to_string(),
            explanation: String::new(),
            subject: "Algebra".to_string(),
        }
    }

    fn test_matcher() -> QuestionMatcher {
        QuestionMatcher::new(
            Arc::new(MemoryStore::new(vec![
                record("Q1", "Solve for x: 2x + 5 = 15"),
                record("Q2", "What is the capital of France?"),
            ])),
            MatcherConfig::default(),
        )
    }

    fn assert_cleared(session: &ScanSession) {
        assert_eq!(session.state(), ScanState::Idle);
        assert!(session.extracted_text().is_none());
        assert!(session.results().is_empty());
        assert!(session.error().is_none());
        assert!(session.view().attempt_id.is_none());
    }

    #[tokio::test]
    async fn test_happy_path_ends_presenting_with_ranked_results() {
        let mut session = ScanSession::new();
        let source = ImageSource::new();
        let extractor = FixedExtractor("2x + 5 = 15 solve for x".to_string());
        let matcher = test_matcher();

        assert_eq!(session.acquire(&source, tiny_png()), ScanState::Capturing);
        assert_eq!(
            session.submit(&extractor, &matcher).await,
            ScanState::Presenting
        );

        let results = session.results();
        assert!(!results.is_empty());
        assert_eq!(results[0].question_id, "Q1");
        assert!(results[0].confidence >= 90);
        for pair in results.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert!(session.error().is_none());
        assert!(session.extracted_text().is_some());
    }

    #[tokio::test]
    async fn test_no_match_presents_empty_results_not_failed() {
        let mut session = ScanSession::new();
        let source = ImageSource::new();
        let extractor = FixedExtractor("qwqwqw nonsense".to_string());
        let matcher = test_matcher();

        session.acquire(&source, tiny_png());
        let state = session.submit(&extractor, &matcher).await;

        assert_eq!(state, ScanState::Presenting);
        assert!(session.results().is_empty());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_zero_byte_acquire_fails_with_empty_input() {
        let mut session = ScanSession::new();
        let state = session.acquire(&ImageSource::new(), Vec::new());

        assert_eq!(state, ScanState::Failed);
        assert!(matches!(session.error(), Some(ScanError::EmptyInput)));
        assert!(session.extracted_text().is_none());

        session.reset();
        assert_cleared(&session);
    }

    #[tokio::test]
    async fn test_cancel_during_extracting_returns_to_idle() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());

        let token = session.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let extractor = SlowExtractor(Duration::from_secs(30));
        let state = session.submit(&extractor, &test_matcher()).await;

        assert_eq!(state, ScanState::Idle);
        assert_cleared(&session);
    }

    #[tokio::test]
    async fn test_late_result_after_cancellation_is_discarded() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());

        // The extractor resolves successfully, but only after the token has
        // tripped; the session must not reach matching.
        let state = session
            .submit(&SelfCancellingExtractor, &test_matcher())
            .await;

        assert_eq!(state, ScanState::Idle);
        assert_cleared(&session);
    }

    #[tokio::test]
    async fn test_extractor_cancelled_error_returns_to_idle() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());

        let extractor = FailingExtractor(ExtractionError::Cancelled);
        let state = session.submit(&extractor, &test_matcher()).await;

        assert_eq!(state, ScanState::Idle);
        assert_cleared(&session);
    }

    #[tokio::test]
    async fn test_extraction_failure_drives_failed_state() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());

        let extractor = FailingExtractor(ExtractionError::Unreadable("blurry".to_string()));
        let state = session.submit(&extractor, &test_matcher()).await;

        assert_eq!(state, ScanState::Failed);
        assert!(matches!(session.error(), Some(ScanError::Extraction(_))));
        // Invariant: never both text and error.
        assert!(session.extracted_text().is_none());
        assert!(session.results().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_drives_failed_state() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());

        let matcher = QuestionMatcher::new(
            Arc::new(JsonFileStore::new("/nonexistent/questions.json")),
            MatcherConfig::default(),
        );
        let extractor = FixedExtractor("solve for x".to_string());
        let state = session.submit(&extractor, &matcher).await;

        assert_eq!(state, ScanState::Failed);
        assert!(matches!(
            session.error(),
            Some(ScanError::MatcherUnavailable(_))
        ));
        assert!(session.extracted_text().is_none());
    }

    #[tokio::test]
    async fn test_reset_from_presenting_clears_everything() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), tiny_png());
        session
            .submit(
                &FixedExtractor("solve for x 2x + 5 = 15".to_string()),
                &test_matcher(),
            )
            .await;
        assert_eq!(session.state(), ScanState::Presenting);

        session.reset();
        assert_cleared(&session);
    }

    #[tokio::test]
    async fn test_submit_without_acquire_is_a_no_op() {
        let mut session = ScanSession::new();
        let extractor = FixedExtractor("anything".to_string());
        let state = session.submit(&extractor, &test_matcher()).await;
        assert_eq!(state, ScanState::Idle);
    }

    #[tokio::test]
    async fn test_new_acquire_replaces_failed_attempt() {
        let mut session = ScanSession::new();
        session.acquire(&ImageSource::new(), Vec::new());
        assert_eq!(session.state(), ScanState::Failed);

        // A new capture is the other sanctioned way out of a terminal state.
        let state = session.acquire(&ImageSource::new(), tiny_png());
        assert_eq!(state, ScanState::Capturing);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_events_report_full_transition_sequence() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut session = ScanSession::with_events(tx);

        session.acquire(&ImageSource::new(), tiny_png());
        session
            .submit(
                &FixedExtractor("solve for x 2x + 5 = 15".to_string()),
                &test_matcher(),
            )
            .await;

        let transitions: Vec<(ScanState, ScanState)> =
            rx.try_iter().map(|e| (e.from, e.to)).collect();
        assert_eq!(
            transitions,
            vec![
                (ScanState::Idle, ScanState::Capturing),
                (ScanState::Capturing, ScanState::Extracting),
                (ScanState::Extracting, ScanState::Matching),
                (ScanState::Matching, ScanState::Presenting),
            ]
        );
    }
}
