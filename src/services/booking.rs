use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{BookingForm, BookingRequest, Field, FieldErrors};
use crate::services::api::ServiceApi;
use crate::services::credentials::CredentialStore;
use crate::services::navigation::{Navigator, Route};

pub const SUBMIT_SUCCESS_MESSAGE: &str = "Service request submitted!";
pub const SUBMIT_FAILURE_MESSAGE: &str = "Failed to book service. Please try again.";
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
pub const MISSING_CREDENTIAL_MESSAGE: &str = "Please log in to book a service.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{} field(s) need attention", .0.len())]
    Invalid(FieldErrors),

    #[error("a submission is already in progress")]
    AlreadySubmitting,

    #[error("Please log in to book a service.")]
    MissingCredential,

    #[error("{message}")]
    Network { message: String },

    #[error("{message}")]
    Unexpected { message: String },
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Fail fast, without a request, when the credential store has no token.
    pub require_token: bool,
    pub success_route: Route,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            require_token: false,
            success_route: Route::Appointments,
        }
    }
}

struct FormSlot {
    form: BookingForm,
    errors: FieldErrors,
    status: FormStatus,
}

/// Armed once a submit has claimed the `Submitting` status. If the submit future
/// is dropped before it settles, the status moves to `Failed` so the form can be
/// sent again.
struct InFlight<'a> {
    engine: &'a BookingFormEngine,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slot = self.engine.lock();
        if slot.status != FormStatus::Submitting {
            return;
        }
        tracing::warn!(session = %self.engine.session_id, "submit abandoned before completion");
        self.engine.transition(
            &mut slot,
            FormStatus::Failed {
                message: UNEXPECTED_FAILURE_MESSAGE.to_string(),
            },
        );
    }
}

/// Owns one booking form session: edits, validation and the single submit.
///
/// All methods take `&self`. The form lives behind a mutex that is never held
/// across an await, and the `Submitting` status doubles as the in-flight guard,
/// so at most one request per engine is ever outstanding.
pub struct BookingFormEngine {
    session_id: Uuid,
    api: Arc<dyn ServiceApi>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    options: EngineOptions,
    today: NaiveDate,
    slot: Mutex<FormSlot>,
    status_tx: broadcast::Sender<FormStatus>,
}

impl BookingFormEngine {
    pub fn new(
        api: Arc<dyn ServiceApi>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        options: EngineOptions,
    ) -> Self {
        let today = chrono::Local::now().date_naive();
        let (status_tx, _) = broadcast::channel(16);
        Self {
            session_id: Uuid::new_v4(),
            api,
            credentials,
            navigator,
            options,
            today,
            slot: Mutex::new(FormSlot {
                form: BookingForm::new(today),
                errors: FieldErrors::new(),
                status: FormStatus::Idle,
            }),
            status_tx,
        }
    }

    /// Pins the date used for fresh forms.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self.lock().form = BookingForm::new(today);
        self
    }

    /// Every status transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FormStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> FormStatus {
        self.lock().status.clone()
    }

    pub fn form(&self) -> BookingForm {
        self.lock().form.clone()
    }

    /// Errors from the last validation run. Edits do not clear them.
    pub fn errors(&self) -> FieldErrors {
        self.lock().errors.clone()
    }

    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        self.update(|form| form.with_field(field, value));
    }

    pub fn set_visit_date(&self, date: NaiveDate) {
        self.update(|form| form.with_visit_date(date));
    }

    pub fn set_visit_time(&self, time: NaiveTime) {
        self.update(|form| form.with_visit_time(time));
    }

    pub fn validate(&self) -> Result<BookingRequest, FieldErrors> {
        let mut slot = self.lock();
        let result = slot.form.validate();
        slot.errors = match &result {
            Ok(_) => FieldErrors::new(),
            Err(errors) => errors.clone(),
        };
        result
    }

    pub async fn submit(&self) -> Result<(), SubmitError> {
        let request = {
            let mut slot = self.lock();
            if slot.status == FormStatus::Submitting {
                tracing::debug!(session = %self.session_id, "submit ignored, request in flight");
                return Err(SubmitError::AlreadySubmitting);
            }

            match slot.form.validate() {
                Ok(request) => {
                    slot.errors.clear();
                    self.transition(&mut slot, FormStatus::Submitting);
                    request
                }
                Err(errors) => {
                    tracing::debug!(
                        session = %self.session_id,
                        count = errors.len(),
                        "booking form invalid"
                    );
                    slot.errors = errors.clone();
                    if slot.status != FormStatus::Idle {
                        self.transition(&mut slot, FormStatus::Idle);
                    }
                    return Err(SubmitError::Invalid(errors));
                }
            }
        };

        let _in_flight = InFlight { engine: self };

        let token = match self.credentials.get_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, session = %self.session_id, "failed to read stored token");
                return Err(self.fail(SubmitError::Unexpected {
                    message: UNEXPECTED_FAILURE_MESSAGE.to_string(),
                }));
            }
        };

        if token.is_none() {
            if self.options.require_token {
                tracing::warn!(session = %self.session_id, "no stored token, not submitting");
                return Err(self.fail(SubmitError::MissingCredential));
            }
            tracing::warn!(session = %self.session_id, "no stored token, submitting anyway");
        }

        let payload = request.to_payload();
        tracing::info!(
            session = %self.session_id,
            product = %payload.product,
            service_type = %payload.service_type,
            visit = %payload.visit_date_time,
            "submitting service request"
        );

        match self
            .api
            .create_service_request(&payload, token.as_deref())
            .await
        {
            Ok(()) => {
                {
                    let mut slot = self.lock();
                    slot.form = BookingForm::new(self.today);
                    slot.errors.clear();
                    self.transition(&mut slot, FormStatus::Succeeded);
                }
                tracing::info!(session = %self.session_id, "{SUBMIT_SUCCESS_MESSAGE}");
                self.navigator.navigate_to(self.options.success_route);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, session = %self.session_id, "failed to book service");
                Err(self.fail(SubmitError::Network {
                    message: SUBMIT_FAILURE_MESSAGE.to_string(),
                }))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, edit: impl FnOnce(BookingForm) -> BookingForm) {
        let mut slot = self.lock();
        let form = std::mem::take(&mut slot.form);
        slot.form = edit(form);
    }

    fn transition(&self, slot: &mut FormSlot, status: FormStatus) {
        slot.status = status.clone();
        // No subscribers is fine
        let _ = self.status_tx.send(status);
    }

    /// Moves to `Failed` with the error's user-facing text; the form is kept as is.
    fn fail(&self, err: SubmitError) -> SubmitError {
        let mut slot = self.lock();
        self.transition(
            &mut slot,
            FormStatus::Failed {
                message: err.to_string(),
            },
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::errors::ApiError;
    use crate::models::{AuthResponse, LoginRequest, RegisterRequest, ServiceRequestPayload};
    use crate::services::credentials::MemoryCredentialStore;

    // ── Mocks ──

    #[derive(Default)]
    struct MockApi {
        calls: AtomicUsize,
        fail_with: Option<u16>,
        hold: bool,
        entered: Notify,
        release: Notify,
        seen: Mutex<Vec<(ServiceRequestPayload, Option<String>)>>,
    }

    impl MockApi {
        fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                ..Self::default()
            }
        }

        fn holding() -> Self {
            Self {
                hold: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServiceApi for MockApi {
        async fn create_service_request(
            &self,
            payload: &ServiceRequestPayload,
            token: Option<&str>,
        ) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((payload.clone(), token.map(|t| t.to_string())));
            self.entered.notify_one();
            if self.hold {
                self.release.notified().await;
            }
            match self.fail_with {
                Some(status) => Err(ApiError::Status {
                    status,
                    message: "boom".to_string(),
                }),
                None => Ok(()),
            }
        }

        async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            unreachable!("booking tests never log in")
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            unreachable!("booking tests never register")
        }
    }

    #[derive(Default)]
    struct MockNavigator {
        routes: Mutex<Vec<Route>>,
    }

    impl Navigator for MockNavigator {
        fn navigate_to(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CredentialStore for BrokenStore {
        async fn get_token(&self) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }
        async fn set_token(&self, _token: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn clear_token(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    // ── Helpers ──

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
    }

    fn engine_with(
        api: Arc<MockApi>,
        credentials: Arc<dyn CredentialStore>,
        options: EngineOptions,
    ) -> (BookingFormEngine, Arc<MockNavigator>) {
        let navigator = Arc::new(MockNavigator::default());
        let engine = BookingFormEngine::new(api, credentials, navigator.clone(), options)
            .with_today(today());
        (engine, navigator)
    }

    fn new_engine(api: Arc<MockApi>) -> (BookingFormEngine, Arc<MockNavigator>) {
        engine_with(
            api,
            Arc::new(MemoryCredentialStore::with_token("tok-123")),
            EngineOptions::default(),
        )
    }

    fn fill(engine: &BookingFormEngine) {
        engine.set_field(Field::Product, "AquaPure");
        engine.set_field(Field::ServiceType, "Repair");
        engine.set_field(Field::Address, "221B Baker Street");
        engine.set_field(Field::Description, "Leaking from the base");
        engine.set_field(Field::VisitDate, "2025-06-01");
        engine.set_field(Field::VisitTime, "09:30");
    }

    fn drain(rx: &mut broadcast::Receiver<FormStatus>) -> Vec<FormStatus> {
        let mut seen = Vec::new();
        while let Ok(status) = rx.try_recv() {
            seen.push(status);
        }
        seen
    }

    // ── Tests ──

    #[test]
    fn test_fresh_engine_is_idle_with_today_prefilled() {
        let (engine, _) = new_engine(Arc::new(MockApi::default()));
        assert_eq!(engine.status(), FormStatus::Idle);
        assert_eq!(engine.form().visit_date, "2025-05-20");
        assert!(engine.errors().is_empty());
    }

    #[tokio::test]
    async fn test_successful_submit() {
        let api = Arc::new(MockApi::default());
        let (engine, navigator) = new_engine(api.clone());
        let mut rx = engine.subscribe();
        fill(&engine);

        engine.submit().await.unwrap();

        assert_eq!(api.calls(), 1);
        let (payload, token) = api.seen.lock().unwrap()[0].clone();
        assert_eq!(payload.visit_date_time, "2025-06-01T09:30");
        assert_eq!(token.as_deref(), Some("tok-123"));

        assert_eq!(drain(&mut rx), vec![FormStatus::Submitting, FormStatus::Succeeded]);
        assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Appointments]);

        // form is cleared back to a fresh session
        assert_eq!(engine.form(), BookingForm::new(today()));
        assert_eq!(engine.status(), FormStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_each_invalid_field_blocks_submit() {
        for field in Field::ALL {
            let api = Arc::new(MockApi::default());
            let (engine, navigator) = new_engine(api.clone());
            fill(&engine);
            engine.set_field(field, "");

            match engine.submit().await {
                Err(SubmitError::Invalid(errors)) => {
                    assert_eq!(errors.len(), 1, "field {field}");
                    assert!(errors.contains_key(&field));
                }
                other => panic!("expected invalid for {field}, got {other:?}"),
            }
            assert_eq!(api.calls(), 0);
            assert!(navigator.routes.lock().unwrap().is_empty());
            assert_eq!(engine.status(), FormStatus::Idle);
            assert_eq!(engine.errors().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_short_address_and_description_block_submit() {
        let api = Arc::new(MockApi::default());
        let (engine, _) = new_engine(api.clone());
        fill(&engine);
        engine.set_field(Field::Address, "1 A");

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ref e) if e.contains_key(&Field::Address)));

        engine.set_field(Field::Address, "221B Baker Street");
        engine.set_field(Field::Description, "drips");
        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ref e) if e.contains_key(&Field::Description)));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_server_error_keeps_form_and_does_not_navigate() {
        let api = Arc::new(MockApi::failing(500));
        let (engine, navigator) = new_engine(api.clone());
        let mut rx = engine.subscribe();
        fill(&engine);
        let before = engine.form();

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Network { .. }));
        assert_eq!(err.to_string(), SUBMIT_FAILURE_MESSAGE);

        assert_eq!(api.calls(), 1);
        assert_eq!(engine.form(), before);
        assert!(navigator.routes.lock().unwrap().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![
                FormStatus::Submitting,
                FormStatus::Failed {
                    message: SUBMIT_FAILURE_MESSAGE.to_string()
                }
            ]
        );
    }

    #[tokio::test]
    async fn test_resubmit_after_failure_sends_again() {
        let api = Arc::new(MockApi::failing(503));
        let (engine, _) = new_engine(api.clone());
        fill(&engine);

        assert!(engine.submit().await.is_err());
        assert!(engine.submit().await.is_err());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_ignored() {
        let api = Arc::new(MockApi::holding());
        let (engine, navigator) = new_engine(api.clone());
        let engine = Arc::new(engine);
        fill(&engine);

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.submit().await }
        });

        api.entered.notified().await;
        assert_eq!(engine.status(), FormStatus::Submitting);

        let second = engine.submit().await;
        assert!(matches!(second, Err(SubmitError::AlreadySubmitting)));
        assert_eq!(engine.status(), FormStatus::Submitting);

        api.release.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(api.calls(), 1);
        assert_eq!(navigator.routes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_submit_releases_the_form() {
        let api = Arc::new(MockApi::holding());
        let (engine, navigator) = new_engine(api.clone());
        let mut rx = engine.subscribe();
        fill(&engine);
        let before = engine.form();

        let timed_out = tokio::time::timeout(Duration::from_millis(50), engine.submit()).await;
        assert!(timed_out.is_err());

        assert_eq!(
            engine.status(),
            FormStatus::Failed {
                message: UNEXPECTED_FAILURE_MESSAGE.to_string()
            }
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                FormStatus::Submitting,
                FormStatus::Failed {
                    message: UNEXPECTED_FAILURE_MESSAGE.to_string()
                }
            ]
        );
        assert_eq!(engine.form(), before);
        assert!(navigator.routes.lock().unwrap().is_empty());

        // let the next call through instead of hanging
        api.release.notify_one();
        engine.submit().await.unwrap();
        assert_eq!(api.calls(), 2);
        assert_eq!(engine.status(), FormStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_settled_submit_keeps_its_status() {
        let api = Arc::new(MockApi::failing(500));
        let (engine, _) = new_engine(api);
        let mut rx = engine.subscribe();
        fill(&engine);

        assert!(engine.submit().await.is_err());
        // exactly one terminal transition, none added on the way out
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(
            engine.status(),
            FormStatus::Failed {
                message: SUBMIT_FAILURE_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_token_still_submits_by_default() {
        let api = Arc::new(MockApi::default());
        let (engine, _) = engine_with(
            api.clone(),
            Arc::new(MemoryCredentialStore::default()),
            EngineOptions::default(),
        );
        fill(&engine);

        engine.submit().await.unwrap();
        assert_eq!(api.calls(), 1);
        assert_eq!(api.seen.lock().unwrap()[0].1, None);
    }

    #[tokio::test]
    async fn test_missing_token_blocks_when_required() {
        let api = Arc::new(MockApi::default());
        let (engine, navigator) = engine_with(
            api.clone(),
            Arc::new(MemoryCredentialStore::default()),
            EngineOptions {
                require_token: true,
                ..EngineOptions::default()
            },
        );
        fill(&engine);
        let before = engine.form();

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::MissingCredential));
        assert_eq!(api.calls(), 0);
        assert!(navigator.routes.lock().unwrap().is_empty());
        assert_eq!(engine.form(), before);
        assert_eq!(
            engine.status(),
            FormStatus::Failed {
                message: MISSING_CREDENTIAL_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_credential_store_failure_is_surfaced_generically() {
        let api = Arc::new(MockApi::default());
        let (engine, _) = engine_with(api.clone(), Arc::new(BrokenStore), EngineOptions::default());
        fill(&engine);

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Unexpected { .. }));
        assert_eq!(err.to_string(), UNEXPECTED_FAILURE_MESSAGE);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_success_route() {
        let api = Arc::new(MockApi::default());
        let (engine, navigator) = engine_with(
            api,
            Arc::new(MemoryCredentialStore::with_token("t")),
            EngineOptions {
                success_route: Route::Services,
                ..EngineOptions::default()
            },
        );
        fill(&engine);
        engine.submit().await.unwrap();
        assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Services]);
    }

    #[test]
    fn test_set_field_never_calls_api_or_validates() {
        let api = Arc::new(MockApi::default());
        let (engine, _) = new_engine(api.clone());
        let mut rx = engine.subscribe();

        engine.set_field(Field::Address, "x");
        engine.set_visit_time(NaiveTime::from_hms_opt(14, 5, 0).unwrap());

        assert_eq!(api.calls(), 0);
        assert!(engine.errors().is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(engine.form().visit_time, "14:05");
    }

    #[test]
    fn test_errors_persist_until_revalidated() {
        let (engine, _) = new_engine(Arc::new(MockApi::default()));
        let errors = engine.validate().unwrap_err();
        assert!(errors.contains_key(&Field::Product));

        engine.set_field(Field::Product, "Livpure");
        assert!(engine.errors().contains_key(&Field::Product));

        let errors = engine.validate().unwrap_err();
        assert!(!errors.contains_key(&Field::Product));
        assert_eq!(engine.errors(), errors);

        fill(&engine);
        assert!(engine.validate().is_ok());
        assert!(engine.errors().is_empty());
    }

    #[test]
    fn test_picker_date_handler() {
        let (engine, _) = new_engine(Arc::new(MockApi::default()));
        engine.set_visit_date(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(engine.form().visit_date, "2025-12-31");
    }
}
