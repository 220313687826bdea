use std::sync::{Arc, Mutex, MutexGuard};

use apikeys::dto::{CreateTokenDto, GeneratedTokenDto, TokenConfigDto};
use apikeys::lifetime::LifetimeChoice;
use apikeys::validators::flatten_errors;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    Error, Result,
    error::{
        FormNotReadySnafu, FormUnmountedSnafu, SubmitInFlightSnafu, TokenAlreadyCreatedSnafu,
        ValidationSnafu,
    },
    services::tokens::TokenService,
};

pub const CREATE_FAILED_MESSAGE: &str = "Failed to create token.";
pub const INTERRUPTED_MESSAGE: &str = "The token request was interrupted. Try again.";

#[derive(Clone, Debug, PartialEq)]
pub enum FormState {
    /// Waiting for the token settings
    Loading,
    Idle,
    Submitting,
    Success { key: String },
    Error { message: String },
}

impl FormState {
    /// Whether a submission may start from this state
    pub fn accepts_submit(&self) -> bool {
        matches!(self, FormState::Idle | FormState::Error { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenFormValues {
    pub name: String,
    pub lifetime: LifetimeChoice,
}

impl TokenFormValues {
    /// Validates the values and builds the request sent to the token service
    pub fn to_request(&self, config: &TokenConfigDto, now: DateTime<Utc>) -> Result<CreateTokenDto> {
        let lifetime = self.lifetime.resolve(config, now);
        let nanos = match &lifetime {
            Ok(nanos) => *nanos,
            Err(_) => config.max_token_lifetime,
        };

        let dto = CreateTokenDto::new(&self.name, nanos);
        let mut errors = dto.validate().err().unwrap_or_else(ValidationErrors::new);

        if let Err(err) = lifetime {
            errors.add(
                "lifetime",
                ValidationError::new("lifetime").with_message(err.to_string().into()),
            );
        }

        if !errors.errors().is_empty() {
            return ValidationSnafu {
                msg: flatten_errors(&errors),
            }
            .fail();
        }

        Ok(dto)
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub state: FormState,
    pub config: Option<TokenConfigDto>,
    pub values: Option<TokenFormValues>,
    pub validation_message: Option<String>,
}

struct FormInner {
    state: FormState,
    mounted: bool,
    config: Option<TokenConfigDto>,
    values: Option<TokenFormValues>,
    validation_message: Option<String>,
}

impl FormInner {
    fn reject(&mut self, values: TokenFormValues, message: String) {
        self.values = Some(values);
        self.validation_message = Some(message);
    }
}

/// One mounted create-token form.
///
/// The state lock is never held across the token service call, which is the
/// only suspension point of a submission.
#[derive(Clone)]
pub struct CreateTokenForm {
    id: Arc<str>,
    inner: Arc<Mutex<FormInner>>,
}

impl CreateTokenForm {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            inner: Arc::new(Mutex::new(FormInner {
                state: FormState::Loading,
                mounted: true,
                config: None,
                values: None,
                validation_message: None,
            })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, FormInner> {
        // State stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> FormState {
        self.lock().state.clone()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let inner = self.lock();
        FormSnapshot {
            state: inner.state.clone(),
            config: inner.config.clone(),
            values: inner.values.clone(),
            validation_message: inner.validation_message.clone(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    /// Token settings arrived, the form becomes interactive
    pub fn mark_ready(&self, config: TokenConfigDto) -> FormState {
        let mut inner = self.lock();
        if !inner.mounted {
            return inner.state.clone();
        }

        match inner.state {
            FormState::Loading => {
                inner.config = Some(config);
                inner.state = FormState::Idle;
            }
            FormState::Idle | FormState::Error { .. } => {
                inner.config = Some(config);
            }
            FormState::Submitting | FormState::Success { .. } => {}
        }

        inner.state.clone()
    }

    /// Late token service results are dropped once unmounted
    pub fn unmount(&self) {
        let mut inner = self.lock();
        if inner.mounted {
            inner.mounted = false;
            info!(form_id = %self.id, "Create token form unmounted");
        }
    }

    /// Keeps values that were rejected before reaching the token service
    pub fn reject(&self, values: TokenFormValues, message: &str) {
        let mut inner = self.lock();
        if inner.mounted && inner.state.accepts_submit() {
            inner.reject(values, message.to_string());
        }
    }

    /// Submits the form, calling the token service at most once.
    pub async fn submit(
        &self,
        service: &dyn TokenService,
        session: &str,
        values: TokenFormValues,
    ) -> Result<GeneratedTokenDto> {
        let request = {
            let mut inner = self.lock();
            if !inner.mounted {
                return FormUnmountedSnafu.fail();
            }

            match inner.state {
                FormState::Loading => return FormNotReadySnafu.fail(),
                FormState::Submitting => return SubmitInFlightSnafu.fail(),
                FormState::Success { .. } => return TokenAlreadyCreatedSnafu.fail(),
                FormState::Idle | FormState::Error { .. } => {}
            }

            let Some(config) = inner.config.clone() else {
                return FormNotReadySnafu.fail();
            };

            match values.to_request(&config, Utc::now()) {
                Ok(request) => {
                    inner.values = Some(values);
                    inner.validation_message = None;
                    inner.state = FormState::Submitting;
                    request
                }
                Err(err) => {
                    inner.reject(values, err.to_string());
                    return Err(err);
                }
            }
        };

        info!(form_id = %self.id, token_name = %request.token_name, "Creating token");

        let mut guard = InFlight {
            form: self,
            settled: false,
        };
        let result = service.create_token(session, &request).await;
        guard.settled = true;

        let mut inner = self.lock();
        if !inner.mounted {
            warn!(form_id = %self.id, "Ignoring token result for unmounted form");
            return FormUnmountedSnafu.fail();
        }

        match result {
            Ok(token) => {
                inner.state = FormState::Success {
                    key: token.key.clone(),
                };
                Ok(token)
            }
            Err(err) => {
                warn!(form_id = %self.id, "Failed to create token: {}", err);
                inner.state = FormState::Error {
                    message: failure_message(&err),
                };
                Err(err)
            }
        }
    }
}

/// Human readable message shown for a failed token request
pub fn failure_message(err: &Error) -> String {
    let message = err.public_message();
    if message.trim().is_empty() {
        return CREATE_FAILED_MESSAGE.to_string();
    }
    message
}

/// Releases a submission that was dropped before the token service answered
struct InFlight<'a> {
    form: &'a CreateTokenForm,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut inner = self.form.lock();
        if inner.mounted && inner.state == FormState::Submitting {
            inner.state = FormState::Error {
                message: INTERRUPTED_MESSAGE.to_string(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tokens::ApiTokenService;
    use crate::test_utils::{SESSION, StubTokenService, config_days};
    use reqwest::Client;
    use apikeys::lifetime::NANOS_PER_DAY;
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;

    fn values(name: &str) -> TokenFormValues {
        TokenFormValues {
            name: name.to_string(),
            lifetime: LifetimeChoice::Days(30),
        }
    }

    fn ready_form() -> CreateTokenForm {
        let form = CreateTokenForm::new("ctf_test");
        form.mark_ready(config_days(90));
        form
    }

    #[test]
    fn test_starts_loading() {
        let form = CreateTokenForm::new("ctf_test");
        assert_eq!(form.id(), "ctf_test");
        assert_eq!(form.state(), FormState::Loading);
        assert!(form.is_mounted());

        assert_eq!(form.mark_ready(config_days(30)), FormState::Idle);
        assert_eq!(form.snapshot().config, Some(config_days(30)));
    }

    #[tokio::test]
    async fn test_submit_before_ready() {
        let stub = StubTokenService::resolving("abcd");
        let form = CreateTokenForm::new("ctf_test");

        let result = form.submit(&stub, SESSION, values("my-token")).await;
        assert!(matches!(result, Err(Error::FormNotReady)));
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(form.state(), FormState::Loading);
    }

    #[tokio::test]
    async fn test_submit_success() {
        let stub = StubTokenService::resolving("abcd");
        let form = ready_form();

        let token = form
            .submit(&stub, SESSION, values("my-token"))
            .await
            .unwrap();
        assert_eq!(token.key, "abcd");
        assert_eq!(
            form.state(),
            FormState::Success {
                key: "abcd".to_string()
            }
        );
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 1);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].token_name, "my-token");
        assert_eq!(requests[0].lifetime, 30 * NANOS_PER_DAY);
        assert_eq!(requests[0].scope, "all");
    }

    #[tokio::test]
    async fn test_key_is_kept_verbatim() {
        let stub = StubTokenService::resolving("  AbC-123=\n");
        let form = ready_form();

        form.submit(&stub, SESSION, values("my-token")).await.unwrap();
        assert_eq!(
            form.state(),
            FormState::Success {
                key: "  AbC-123=\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_success_is_final() {
        let stub = StubTokenService::resolving("abcd");
        let form = ready_form();

        form.submit(&stub, SESSION, values("my-token")).await.unwrap();
        let result = form.submit(&stub, SESSION, values("other")).await;
        assert!(matches!(result, Err(Error::TokenAlreadyCreated)));
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_name_makes_no_call() {
        let stub = StubTokenService::resolving("abcd");
        let form = ready_form();

        for name in ["", "   ", "\t"] {
            let result = form.submit(&stub, SESSION, values(name)).await;
            assert!(matches!(result, Err(Error::Validation { .. })));
        }

        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);

        let snapshot = form.snapshot();
        assert_eq!(snapshot.state, FormState::Idle);
        assert_eq!(
            snapshot.validation_message,
            Some("token_name: must not be blank".to_string())
        );
    }

    #[tokio::test]
    async fn test_lifetime_over_max_makes_no_call() {
        let stub = StubTokenService::resolving("abcd");
        let form = CreateTokenForm::new("ctf_test");
        form.mark_ready(config_days(30));

        let far = NaiveDate::from_ymd_opt(2999, 1, 1).unwrap();
        let result = form
            .submit(
                &stub,
                SESSION,
                TokenFormValues {
                    name: "my-token".to_string(),
                    lifetime: LifetimeChoice::Custom(far),
                },
            )
            .await;

        match result {
            Err(Error::Validation { msg }) => {
                assert_eq!(msg, "lifetime: Lifetime must not exceed 30 days")
            }
            _ => panic!("expected a validation error"),
        }
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let stub = StubTokenService::rejecting("A token with that name already exists.");
        let form = ready_form();

        let result = form.submit(&stub, SESSION, values("my-token")).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
        assert_eq!(
            form.state(),
            FormState::Error {
                message: "A token with that name already exists.".to_string()
            }
        );

        // Errors keep the form interactive
        let result = form.submit(&stub, SESSION, values("my-token-2")).await;
        assert!(result.is_err());
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_double_submit_calls_once() {
        let (stub, gate) = StubTokenService::resolving("abcd").gated();
        let stub = Arc::new(stub);
        let form = ready_form();

        let first = {
            let stub = stub.clone();
            let form = form.clone();
            tokio::spawn(async move { form.submit(&*stub, SESSION, values("my-token")).await })
        };

        gate.entered.notified().await;
        assert_eq!(form.state(), FormState::Submitting);

        let second = form.submit(&*stub, SESSION, values("my-token")).await;
        assert!(matches!(second, Err(Error::SubmitInFlight)));

        gate.release.add_permits(1);
        let token = first.await.unwrap().unwrap();
        assert_eq!(token.key, "abcd");
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_result_after_unmount_is_ignored() {
        let (stub, gate) = StubTokenService::resolving("abcd").gated();
        let stub = Arc::new(stub);
        let form = ready_form();

        let pending = {
            let stub = stub.clone();
            let form = form.clone();
            tokio::spawn(async move { form.submit(&*stub, SESSION, values("my-token")).await })
        };

        gate.entered.notified().await;
        form.unmount();
        gate.release.add_permits(1);

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(Error::FormUnmounted)));
        assert_eq!(form.state(), FormState::Submitting);
        assert!(!form.is_mounted());

        // Nothing more goes out either
        let result = form.submit(&*stub, SESSION, values("my-token")).await;
        assert!(matches!(result, Err(Error::FormUnmounted)));
        assert_eq!(stub.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_submit_can_be_retried() {
        let (stub, gate) = StubTokenService::resolving("abcd").gated();
        let stub = Arc::new(stub);
        let form = ready_form();

        let pending = {
            let stub = stub.clone();
            let form = form.clone();
            tokio::spawn(async move { form.submit(&*stub, SESSION, values("my-token")).await })
        };

        gate.entered.notified().await;
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        assert_eq!(
            form.state(),
            FormState::Error {
                message: INTERRUPTED_MESSAGE.to_string()
            }
        );
        assert!(form.state().accepts_submit());
    }

    #[test]
    fn test_unmounted_form_stays_loading() {
        let form = CreateTokenForm::new("ctf_test");
        form.unmount();
        assert_eq!(form.mark_ready(config_days(30)), FormState::Loading);
    }

    #[test]
    fn test_failure_message_fallback() {
        let err = Error::Service { msg: " ".to_string() };
        assert_eq!(failure_message(&err), CREATE_FAILED_MESSAGE);

        let err = Error::LoginRequired;
        assert_eq!(failure_message(&err), "Login to continue");
    }

    #[tokio::test]
    async fn test_transport_failure_hides_api_url() {
        let service = ApiTokenService::new(Client::new(), "http://127.0.0.1:9/internal-api");
        let form = ready_form();

        let result = form.submit(&service, SESSION, values("my-token")).await;
        assert!(matches!(result, Err(Error::HttpClient { .. })));

        match form.state() {
            FormState::Error { message } => {
                assert_eq!(message, "Unable to create token. Try again later.");
                assert!(!message.contains("internal-api"));
            }
            state => panic!("expected an error state, got {:?}", state),
        }
    }

    #[test]
    fn test_reject_keeps_values() {
        let form = ready_form();
        form.reject(values("ci-token"), "lifetime: Unknown lifetime option: forever");

        let snapshot = form.snapshot();
        assert_eq!(snapshot.state, FormState::Idle);
        assert_eq!(snapshot.values, Some(values("ci-token")));
        assert_eq!(
            snapshot.validation_message,
            Some("lifetime: Unknown lifetime option: forever".to_string())
        );

        // Ignored once the form is closed
        form.unmount();
        form.reject(values("other"), "late");
        assert_eq!(form.snapshot().values, Some(values("ci-token")));
    }
}
