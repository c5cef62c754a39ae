//! WizardManager — async owner of the wizard session, shared by the HTTP
//! handlers.
//!
//! Wraps one [`WizardController`] behind a `RwLock`, persists progress to a
//! [`SettingsStore`] and fans wizard events out over a broadcast channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::{Error, WizardError};
use crate::store::SettingsStore;

use super::controller::{Navigator, Notice, Notifier, Transition, WizardController, WizardSnapshot};
use super::fields::{FieldErrors, FieldValues};
use super::form::StepForm;
use super::model::{StepInput, WizardRecord};
use super::renderer::{StepPage, StepRenderer};
use super::step::{StepId, StepRegistry};

/// Settings-table keys for persisted wizard data.
pub mod settings_keys {
    /// In-progress session: current step, record and completion time.
    pub const WIZARD_STATE: &str = "wizard_state";
    /// The completed record, written when the wizard finishes.
    pub const WIZARD_PROFILE: &str = "wizard_profile";
}

/// Broadcast channel capacity for wizard events.
const EVENT_CAPACITY: usize = 64;

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    /// Full status, sent on connect and after a lagged receiver.
    WizardSync { status: WizardStatus },
    StepChanged { from: StepId, to: StepId, progress: u8 },
    Notice { step: StepId, message: String },
    /// The wizard completed; the dashboard should navigate to `route`.
    Finished { route: String, record: WizardRecord },
    Skipped { route: String },
    Reset { status: WizardStatus },
}

/// Public view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardStatus {
    pub session_id: Uuid,
    pub current: StepId,
    pub progress: u8,
    pub record: WizardRecord,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Values validated and were handed to the controller.
    Accepted(WizardStatus),
    /// Validation failed; the wizard did not move.
    Rejected(FieldErrors),
}

/// Stored under [`settings_keys::WIZARD_STATE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    session_id: Uuid,
    snapshot: WizardSnapshot,
    completed_at: Option<DateTime<Utc>>,
}

/// Stored under [`settings_keys::WIZARD_PROFILE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompletedProfile {
    session_id: Uuid,
    record: WizardRecord,
    completed_at: DateTime<Utc>,
}

/// Navigator and notifier that turn controller callbacks into events.
struct BroadcastHooks {
    tx: broadcast::Sender<WizardEvent>,
    complete_route: String,
    skip_route: String,
}

impl BroadcastHooks {
    fn send(&self, event: WizardEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Navigator for BroadcastHooks {
    fn finish(&self, record: &WizardRecord) {
        self.send(WizardEvent::Finished {
            route: self.complete_route.clone(),
            record: record.clone(),
        });
    }

    fn skip(&self) {
        self.send(WizardEvent::Skipped {
            route: self.skip_route.clone(),
        });
    }
}

impl Notifier for BroadcastHooks {
    fn moved(&self, from: StepId, to: StepId, progress: u8) {
        self.send(WizardEvent::StepChanged { from, to, progress });
    }

    fn notify(&self, notice: &Notice) {
        self.send(WizardEvent::Notice {
            step: notice.step,
            message: notice.message.clone(),
        });
    }
}

struct Session {
    id: Uuid,
    controller: WizardController,
    completed_at: Option<DateTime<Utc>>,
}

impl Session {
    fn status(&self) -> WizardStatus {
        let snapshot = self.controller.state();
        WizardStatus {
            session_id: self.id,
            current: snapshot.current,
            progress: snapshot.progress,
            record: snapshot.record,
            completed: snapshot.exited,
            completed_at: self.completed_at,
        }
    }
}

/// Coordinates the wizard session: transitions, events and persistence.
pub struct WizardManager {
    config: WizardConfig,
    registry: StepRegistry,
    store: Arc<dyn SettingsStore>,
    session: RwLock<Session>,
    tx: broadcast::Sender<WizardEvent>,
}

impl WizardManager {
    /// A manager over the standard nine-step registry.
    pub fn new(config: WizardConfig, store: Arc<dyn SettingsStore>) -> Arc<Self> {
        Self::with_registry(config, store, StepRegistry::standard())
    }

    pub fn with_registry(
        config: WizardConfig,
        store: Arc<dyn SettingsStore>,
        registry: StepRegistry,
    ) -> Arc<Self> {
        Self::build(config, store, registry, EVENT_CAPACITY)
    }

    /// Standard registry with a custom event channel capacity.
    #[cfg(test)]
    pub(crate) fn with_capacity(
        config: WizardConfig,
        store: Arc<dyn SettingsStore>,
        capacity: usize,
    ) -> Arc<Self> {
        Self::build(config, store, StepRegistry::standard(), capacity)
    }

    fn build(
        config: WizardConfig,
        store: Arc<dyn SettingsStore>,
        registry: StepRegistry,
        capacity: usize,
    ) -> Arc<Self> {
        let (tx, _) = broadcast::channel(capacity);
        let hooks = Arc::new(BroadcastHooks {
            tx: tx.clone(),
            complete_route: config.complete_route.clone(),
            skip_route: config.skip_route.clone(),
        });
        let controller = WizardController::new(registry.clone(), hooks.clone(), hooks);
        Arc::new(Self {
            config,
            registry,
            store,
            session: RwLock::new(Session {
                id: Uuid::new_v4(),
                controller,
                completed_at: None,
            }),
            tx,
        })
    }

    /// Subscribe to wizard events.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.tx.subscribe()
    }

    pub fn steps(&self) -> &StepRegistry {
        &self.registry
    }

    pub async fn status(&self) -> WizardStatus {
        self.session.read().await.status()
    }

    /// Reload a persisted session. Returns `true` if one was restored.
    ///
    /// Unreadable or stale state is logged and ignored; only store failures
    /// are returned as errors.
    pub async fn restore(&self) -> Result<bool, Error> {
        let value = self
            .store
            .get_setting(&self.config.user_id, settings_keys::WIZARD_STATE)
            .await?;
        let Some(value) = value else {
            return Ok(false);
        };

        let persisted: PersistedSession = match serde_json::from_value(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable wizard state");
                return Ok(false);
            }
        };

        let mut session = self.session.write().await;
        if let Err(e) = session.controller.restore(persisted.snapshot) {
            warn!(error = %e, "Discarding wizard state that does not fit the registry");
            return Ok(false);
        }
        session.id = persisted.session_id;
        session.completed_at = persisted.completed_at;
        info!(
            session_id = %session.id,
            step = %session.controller.current(),
            "Wizard session restored"
        );
        Ok(true)
    }

    /// The page for the current step.
    pub async fn current_page(&self) -> Result<StepPage, WizardError> {
        let session = self.session.read().await;
        StepRenderer::new(&self.registry)
            .page(session.controller.current(), session.controller.record())
    }

    /// The page for a step named by its wire id.
    pub async fn page_for(&self, id: &str) -> Result<StepPage, WizardError> {
        let session = self.session.read().await;
        StepRenderer::new(&self.registry).page_named(id, session.controller.record())
    }

    /// Fill the current step's form with `values` and submit it.
    pub async fn submit(&self, values: FieldValues) -> Result<SubmitOutcome, WizardError> {
        let mut session = self.session.write().await;
        if session.controller.is_exited() {
            return Err(WizardError::AlreadyFinished);
        }
        let mut form = StepForm::seeded(session.controller.current(), session.controller.record());
        form.apply(values)?;

        match form.submit(&mut session.controller) {
            Ok(transition) => {
                self.after_transition(&mut session, transition).await;
                Ok(SubmitOutcome::Accepted(session.status()))
            }
            Err(errors) => Ok(SubmitOutcome::Rejected(errors)),
        }
    }

    pub async fn back(&self) -> WizardStatus {
        let mut session = self.session.write().await;
        let transition = session.controller.retreat();
        self.after_transition(&mut session, transition).await;
        session.status()
    }

    /// Fire the terminal step's continue action.
    pub async fn finish(&self) -> Result<WizardStatus, WizardError> {
        let mut session = self.session.write().await;
        if session.controller.is_exited() {
            return Err(WizardError::AlreadyFinished);
        }
        let current = session.controller.current();
        if !current.is_terminal() {
            return Err(WizardError::NotFinishable(current));
        }
        let transition = session.controller.advance(StepInput::Continue);
        self.after_transition(&mut session, transition).await;
        Ok(session.status())
    }

    /// Leave the wizard without changing its state.
    pub async fn skip(&self) -> WizardStatus {
        let session = self.session.read().await;
        session.controller.skip();
        session.status()
    }

    /// Start over with a fresh session. A previously completed profile is
    /// kept until the next finish overwrites it.
    pub async fn reset(&self) -> WizardStatus {
        let mut session = self.session.write().await;
        session.controller.reset();
        session.id = Uuid::new_v4();
        session.completed_at = None;
        info!(session_id = %session.id, "Wizard reset");
        self.persist_state(&session).await;

        let status = session.status();
        let _ = self.tx.send(WizardEvent::Reset {
            status: status.clone(),
        });
        status
    }

    async fn after_transition(&self, session: &mut Session, transition: Transition) {
        match transition {
            Transition::Moved { .. } => self.persist_state(session).await,
            Transition::Finished => {
                let completed_at = Utc::now();
                session.completed_at = Some(completed_at);
                self.persist_state(session).await;
                self.persist_profile(session, completed_at).await;
            }
            Transition::Stayed { step } => debug!(step = %step, "Wizard stayed"),
            Transition::Ignored => {}
        }
    }

    async fn persist_state(&self, session: &Session) {
        let persisted = PersistedSession {
            session_id: session.id,
            snapshot: session.controller.state(),
            completed_at: session.completed_at,
        };
        self.persist(settings_keys::WIZARD_STATE, &persisted).await;
    }

    async fn persist_profile(&self, session: &Session, completed_at: DateTime<Utc>) {
        let profile = CompletedProfile {
            session_id: session.id,
            record: session.controller.record().clone(),
            completed_at,
        };
        self.persist(settings_keys::WIZARD_PROFILE, &profile).await;
    }

    async fn persist<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize wizard data");
                return;
            }
        };
        if let Err(e) = self
            .store
            .set_setting(&self.config.user_id, key, &json)
            .await
        {
            warn!(key, error = %e, "Failed to persist wizard data");
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::DatabaseError;
    use crate::store::MemoryStore;
    use crate::wizard::step::Step;

    /// Store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl SettingsStore for BrokenStore {
        async fn get_setting(
            &self,
            _user_id: &str,
            _key: &str,
        ) -> Result<Option<serde_json::Value>, DatabaseError> {
            Err(DatabaseError::Query("disk unavailable".to_string()))
        }

        async fn set_setting(
            &self,
            _user_id: &str,
            _key: &str,
            _value: &serde_json::Value,
        ) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("disk unavailable".to_string()))
        }

        async fn delete_setting(&self, _user_id: &str, _key: &str) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Query("disk unavailable".to_string()))
        }
    }

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_values(step: StepId) -> FieldValues {
        match step {
            StepId::Citizenship => values(&[("country", "Kenya"), ("residence", "Kenya")]),
            StepId::Education => values(&[
                ("degree", "bachelor"),
                ("university", "University of Nairobi"),
                ("major", "Economics"),
                ("gpa", "3.7"),
            ]),
            StepId::Goals => values(&[
                ("target_degree", "master"),
                ("field_of_study", "Development Economics"),
                ("intake", "Fall 2026"),
                ("preferred_countries", "UK, Netherlands"),
            ]),
            StepId::Language => values(&[("test", "ielts"), ("score", "7.0")]),
            StepId::Tests => values(&[("exam", "none")]),
            StepId::Priorities => values(&[("top_priority", "cost")]),
            StepId::Financial => values(&[
                ("budget", "15000 GBP"),
                ("funding_source", "scholarship"),
                ("scholarship_interest", "yes"),
            ]),
            StepId::Programs => values(&[("program_count", "4")]),
            StepId::Complete => FieldValues::new(),
        }
    }

    fn manager() -> (Arc<WizardManager>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = WizardManager::new(WizardConfig::default(), store.clone());
        (manager, store)
    }

    async fn submit_current(manager: &WizardManager) -> SubmitOutcome {
        let current = manager.status().await.current;
        manager.submit(valid_values(current)).await.unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<WizardEvent>) -> Vec<WizardEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn accepted_submit_moves_persists_and_broadcasts() {
        let (manager, store) = manager();
        let mut rx = manager.subscribe();

        let status = match submit_current(&manager).await {
            SubmitOutcome::Accepted(status) => status,
            other => panic!("expected accepted, got {other:?}"),
        };
        assert_eq!(status.current, StepId::Education);
        assert_eq!(status.progress, 13);
        assert!(status.record.contains(StepId::Citizenship));

        assert_eq!(
            drain(&mut rx),
            vec![WizardEvent::StepChanged {
                from: StepId::Citizenship,
                to: StepId::Education,
                progress: 13
            }]
        );

        let stored = store
            .get_setting("default", settings_keys::WIZARD_STATE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["snapshot"]["current"], "education");
    }

    #[tokio::test]
    async fn rejected_submit_reports_field_errors_and_stays() {
        let (manager, _) = manager();
        submit_current(&manager).await;

        let mut education = valid_values(StepId::Education);
        education.insert("university".to_string(), "  ".to_string());
        let errors = match manager.submit(education).await.unwrap() {
            SubmitOutcome::Rejected(errors) => errors,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(errors.get("university"), Some("Please enter your university"));
        assert_eq!(errors.len(), 1);
        assert_eq!(manager.status().await.current, StepId::Education);
        assert!(!manager.status().await.record.contains(StepId::Education));
    }

    #[tokio::test]
    async fn unknown_field_is_an_error() {
        let (manager, _) = manager();
        let err = manager
            .submit(values(&[("favourite_colour", "green")]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WizardError::UnknownField {
                step: StepId::Citizenship,
                field: "favourite_colour".to_string()
            }
        );
    }

    #[tokio::test]
    async fn full_run_notifies_then_finishes() {
        let (manager, store) = manager();
        let mut rx = manager.subscribe();

        for _ in 0..8 {
            assert!(matches!(
                submit_current(&manager).await,
                SubmitOutcome::Accepted(_)
            ));
        }
        let status = manager.status().await;
        assert_eq!(status.current, StepId::Complete);
        assert_eq!(status.progress, 100);
        assert!(!status.completed);

        let events = drain(&mut rx);
        let notices: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WizardEvent::Notice { .. }))
            .collect();
        assert_eq!(notices.len(), 1);

        // The notice follows the move onto programs.
        let notice_at = events
            .iter()
            .position(|e| matches!(e, WizardEvent::Notice { .. }))
            .unwrap();
        assert_eq!(
            events[notice_at - 1],
            WizardEvent::StepChanged {
                from: StepId::Financial,
                to: StepId::Programs,
                progress: 88
            }
        );
        assert!(matches!(
            events[notice_at],
            WizardEvent::Notice {
                step: StepId::Programs,
                ..
            }
        ));

        let status = manager.finish().await.unwrap();
        assert!(status.completed);
        assert!(status.completed_at.is_some());

        match drain(&mut rx).as_slice() {
            [WizardEvent::Finished { route, record }] => {
                assert_eq!(route, "/dashboard");
                assert_eq!(record.len(), 8);
                assert_eq!(record.program_count(), Some(4));
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let profile = store
            .get_setting("default", settings_keys::WIZARD_PROFILE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile["record"]["programs"]["program_count"], 4);

        // Once finished, further finishes and submits are refused.
        assert_eq!(
            manager.finish().await.unwrap_err(),
            WizardError::AlreadyFinished
        );
        assert_eq!(
            manager.submit(FieldValues::new()).await.unwrap_err(),
            WizardError::AlreadyFinished
        );
        assert!(drain(&mut rx).is_empty());
        assert!(manager.status().await.completed);
    }

    #[tokio::test]
    async fn finish_before_terminal_is_rejected() {
        let (manager, _) = manager();
        assert_eq!(
            manager.finish().await.unwrap_err(),
            WizardError::NotFinishable(StepId::Citizenship)
        );
    }

    #[tokio::test]
    async fn skip_broadcasts_route_without_changing_state() {
        let store = Arc::new(MemoryStore::new());
        let config = WizardConfig {
            skip_route: "/home".to_string(),
            ..WizardConfig::default()
        };
        let manager = WizardManager::new(config, store);
        submit_current(&manager).await;
        let before = manager.status().await;
        let mut rx = manager.subscribe();

        let after = manager.skip().await;
        assert_eq!(after, before);
        assert_eq!(
            drain(&mut rx),
            vec![WizardEvent::Skipped {
                route: "/home".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn back_keeps_record_and_seeds_form() {
        let (manager, _) = manager();
        submit_current(&manager).await;
        submit_current(&manager).await;

        let status = manager.back().await;
        assert_eq!(status.current, StepId::Education);
        assert_eq!(status.record.len(), 2);

        let page = serde_json::to_value(manager.current_page().await.unwrap()).unwrap();
        assert_eq!(page["step"], "education");
        assert_eq!(page["fields"][1]["name"], "university");
        assert_eq!(page["fields"][1]["value"], "University of Nairobi");
    }

    #[tokio::test]
    async fn reset_starts_a_new_session() {
        let (manager, _) = manager();
        submit_current(&manager).await;
        let old = manager.status().await;
        let mut rx = manager.subscribe();

        let status = manager.reset().await;
        assert_ne!(status.session_id, old.session_id);
        assert_eq!(status.current, StepId::Citizenship);
        assert!(status.record.is_empty());
        assert_eq!(drain(&mut rx), vec![WizardEvent::Reset { status }]);
    }

    #[tokio::test]
    async fn restore_resumes_persisted_session() {
        let store = Arc::new(MemoryStore::new());
        let first = WizardManager::new(WizardConfig::default(), store.clone());
        for _ in 0..3 {
            submit_current(&first).await;
        }
        let saved = first.status().await;

        let second = WizardManager::new(WizardConfig::default(), store);
        assert!(second.restore().await.unwrap());
        assert_eq!(second.status().await, saved);
        assert_eq!(saved.current, StepId::Language);
    }

    #[tokio::test]
    async fn store_failures_do_not_block_the_wizard() {
        let manager = WizardManager::new(WizardConfig::default(), Arc::new(BrokenStore));
        let mut rx = manager.subscribe();

        assert!(manager.restore().await.is_err());

        let status = match submit_current(&manager).await {
            SubmitOutcome::Accepted(status) => status,
            other => panic!("expected accepted, got {other:?}"),
        };
        assert_eq!(status.current, StepId::Education);

        assert_eq!(manager.back().await.current, StepId::Citizenship);
        for _ in 0..8 {
            submit_current(&manager).await;
        }
        let status = manager.finish().await.unwrap();
        assert!(status.completed);
        assert!(
            drain(&mut rx)
                .iter()
                .any(|e| matches!(e, WizardEvent::Finished { .. }))
        );

        let status = manager.reset().await;
        assert_eq!(status.current, StepId::Citizenship);
        assert!(status.record.is_empty());
    }

    #[tokio::test]
    async fn restore_discards_state_outside_the_registry() {
        let store = Arc::new(MemoryStore::new());
        let first = WizardManager::new(WizardConfig::default(), store.clone());
        for _ in 0..3 {
            submit_current(&first).await;
        }

        let short = StepRegistry::new(vec![
            Step::new(StepId::Citizenship, "Citizenship", "globe"),
            Step::new(StepId::Complete, "Done", "circle-check"),
        ])
        .unwrap();
        let second = WizardManager::with_registry(WizardConfig::default(), store, short);
        let fresh_id = second.status().await.session_id;

        assert!(!second.restore().await.unwrap());
        let status = second.status().await;
        assert_eq!(status.current, StepId::Citizenship);
        assert!(status.record.is_empty());
        assert_eq!(status.session_id, fresh_id);
    }

    #[tokio::test]
    async fn restore_without_state_or_with_garbage_starts_fresh() {
        let (manager, store) = manager();
        assert!(!manager.restore().await.unwrap());

        store
            .set_setting(
                "default",
                settings_keys::WIZARD_STATE,
                &serde_json::json!({"snapshot": "not a snapshot"}),
            )
            .await
            .unwrap();
        assert!(!manager.restore().await.unwrap());
        assert_eq!(manager.status().await.current, StepId::Citizenship);
    }

    #[tokio::test]
    async fn page_for_unknown_step_fails() {
        let (manager, _) = manager();
        assert_eq!(
            manager.page_for("visa").await.unwrap_err(),
            WizardError::UnknownStep("visa".to_string())
        );
        assert!(manager.page_for("financial").await.is_ok());
    }
}
