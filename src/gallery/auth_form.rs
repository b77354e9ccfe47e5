//! Sign-in / sign-up form

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{AuthProvider, ProviderError};
use crate::error::GalleryError;
use crate::notify::Notifier;

/// Shortest password the form will submit
pub const MIN_PASSWORD_LEN: usize = 6;

pub const MSG_INCORRECT_CREDENTIALS: &str = "Incorrect email or password. Please try again.";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long.";
pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const MSG_WELCOME_BACK: &str = "Welcome back!";
pub const MSG_ACCOUNT_CREATED: &str = "Account created successfully! You can now sign in.";

/// Provider message for a failed password sign-in
const PROVIDER_INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Welcome Back",
            AuthMode::SignUp => "Create Account",
        }
    }
}

/// What a submit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Signed in; the session gate will see the change
    SignedIn,
    /// Account created; the form is back in sign-in mode
    Registered,
    /// A request was already in flight
    Skipped,
}

#[derive(Debug)]
struct Fields {
    mode: AuthMode,
    email: String,
    password: String,
}

pub struct AuthForm {
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    fields: Mutex<Fields>,
    busy: AtomicBool,
}

impl AuthForm {
    pub fn new(auth: Arc<dyn AuthProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            auth,
            notifier,
            fields: Mutex::new(Fields {
                mode: AuthMode::SignIn,
                email: String::new(),
                password: String::new(),
            }),
            busy: AtomicBool::new(false),
        }
    }

    fn fields(&self) -> MutexGuard<'_, Fields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> AuthMode {
        self.fields().mode
    }

    pub fn toggle_mode(&self) {
        let mut fields = self.fields();
        fields.mode = fields.mode.toggled();
    }

    pub fn email(&self) -> String {
        self.fields().email.clone()
    }

    pub fn set_email(&self, email: &str) {
        self.fields().email = email.trim().to_string();
    }

    pub fn set_password(&self, password: &str) {
        self.fields().password = password.to_string();
    }

    /// Whether the submit control is disabled
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Submit in the current mode
    pub async fn submit(&self) -> Result<SubmitOutcome, GalleryError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::debug!("Auth submit ignored: request in flight");
            return Ok(SubmitOutcome::Skipped);
        }

        let result = {
            let _busy = BusyGuard(&self.busy);
            self.submit_inner().await
        };

        if let Err(e) = &result {
            self.notifier.error(&e.to_string());
        }
        result
    }

    async fn submit_inner(&self) -> Result<SubmitOutcome, GalleryError> {
        let (mode, email, password) = {
            let fields = self.fields();
            (fields.mode, fields.email.clone(), fields.password.clone())
        };

        validate(&email, &password)?;

        match mode {
            AuthMode::SignIn => {
                self.auth
                    .sign_in(&email, &password)
                    .await
                    .map_err(|e| map_sign_in_error(&e))?;
                tracing::info!("Signed in as {}", email);
                self.fields().password.clear();
                self.notifier.success(MSG_WELCOME_BACK);
                Ok(SubmitOutcome::SignedIn)
            }
            AuthMode::SignUp => {
                self.auth
                    .sign_up(&email, &password)
                    .await
                    .map_err(|e| map_sign_up_error(&e))?;
                tracing::info!("Registered {}", email);
                {
                    let mut fields = self.fields();
                    fields.mode = AuthMode::SignIn;
                    fields.password.clear();
                }
                self.notifier.success(MSG_ACCOUNT_CREATED);
                Ok(SubmitOutcome::Registered)
            }
        }
    }
}

/// Clears the busy flag when a submit finishes or is dropped mid-request
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn validate(email: &str, password: &str) -> Result<(), GalleryError> {
    if email.is_empty() || !email.contains('@') {
        return Err(GalleryError::Auth(MSG_INVALID_EMAIL.to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(GalleryError::Auth(MSG_PASSWORD_TOO_SHORT.to_string()));
    }
    Ok(())
}

/// Friendly text for a sign-in failure
pub fn map_sign_in_error(err: &ProviderError) -> GalleryError {
    tracing::warn!("Sign-in failed: {}", err);
    if err.message == PROVIDER_INVALID_CREDENTIALS {
        GalleryError::Auth(MSG_INCORRECT_CREDENTIALS.to_string())
    } else {
        GalleryError::Auth(err.message.clone())
    }
}

/// Friendly text for a sign-up failure
pub fn map_sign_up_error(err: &ProviderError) -> GalleryError {
    tracing::warn!("Sign-up failed: {}", err);
    if err.message.to_lowercase().contains("password") {
        GalleryError::Auth(MSG_PASSWORD_TOO_SHORT.to_string())
    } else {
        GalleryError::Auth(err.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryAuth, Session};
    use crate::notify::{drain, ChannelNotifier, Toast};
    use async_trait::async_trait;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn form_with(auth: Arc<dyn AuthProvider>) -> (AuthForm, UnboundedReceiver<Toast>) {
        let (notifier, toasts) = ChannelNotifier::new();
        (AuthForm::new(auth, Arc::new(notifier)), toasts)
    }

    fn fill(form: &AuthForm, email: &str, password: &str) {
        form.set_email(email);
        form.set_password(password);
    }

    #[tokio::test]
    async fn test_wrong_credentials_show_friendly_message() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        let (form, mut toasts) = form_with(auth);
        fill(&form, "a@example.com", "wrong-password");

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect email or password. Please try again.");
        assert_eq!(
            drain(&mut toasts),
            vec![Toast::error("Incorrect email or password. Please try again.")]
        );
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        let (form, mut toasts) = form_with(auth.clone());
        fill(&form, "a@example.com", "secret1");

        assert_eq!(form.submit().await.unwrap(), SubmitOutcome::SignedIn);
        assert!(auth.get_session().await.unwrap().is_some());
        assert_eq!(drain(&mut toasts), vec![Toast::success("Welcome back!")]);
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn test_short_sign_up_password_rejected_client_side() {
        let auth = Arc::new(MemoryAuth::new());
        let (form, mut toasts) = form_with(auth);
        form.toggle_mode();
        fill(&form, "new@example.com", "12345");

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.to_string(), MSG_PASSWORD_TOO_SHORT);
        assert_eq!(drain(&mut toasts), vec![Toast::error(MSG_PASSWORD_TOO_SHORT)]);
        assert_eq!(form.mode(), AuthMode::SignUp);
    }

    #[test]
    fn test_provider_password_errors_are_mapped_on_sign_up() {
        for raw in [
            "Password should be at least 6 characters.",
            "password is too weak",
        ] {
            let mapped = map_sign_up_error(&ProviderError::new(raw));
            assert_eq!(mapped.to_string(), MSG_PASSWORD_TOO_SHORT, "{}", raw);
        }
    }

    #[test]
    fn test_other_errors_pass_through_raw() {
        let mapped = map_sign_up_error(&ProviderError::new("User already registered"));
        assert_eq!(mapped.to_string(), "User already registered");

        let mapped = map_sign_in_error(&ProviderError::new("Email not confirmed"));
        assert_eq!(mapped.to_string(), "Email not confirmed");

        // Only the exact provider string is rewritten on sign-in
        let mapped = map_sign_in_error(&ProviderError::new("invalid login credentials"));
        assert_eq!(mapped.to_string(), "invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_up_switches_back_to_sign_in_without_session() {
        let auth = Arc::new(MemoryAuth::new());
        let (form, mut toasts) = form_with(auth.clone());
        form.toggle_mode();
        fill(&form, "new@example.com", "secret1");

        assert_eq!(form.submit().await.unwrap(), SubmitOutcome::Registered);
        assert_eq!(form.mode(), AuthMode::SignIn);
        assert!(auth.get_session().await.unwrap().is_none());
        assert_eq!(drain(&mut toasts), vec![Toast::success(MSG_ACCOUNT_CREATED)]);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_shows_raw_message() {
        let auth = Arc::new(MemoryAuth::new().with_user("a@example.com", "secret1"));
        let (form, _toasts) = form_with(auth);
        form.toggle_mode();
        fill(&form, "a@example.com", "secret1");

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let auth = Arc::new(MemoryAuth::new());
        let (form, _toasts) = form_with(auth);
        fill(&form, "not-an-email", "secret1");
        assert_eq!(form.submit().await.unwrap_err().to_string(), MSG_INVALID_EMAIL);
    }

    /// Provider whose sign-in never completes
    struct Hanging;

    #[async_trait]
    impl AuthProvider for Hanging {
        async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
            Ok(None)
        }
        async fn sign_in(&self, _: &str, _: &str) -> Result<Session, ProviderError> {
            std::future::pending().await
        }
        async fn sign_up(&self, _: &str, _: &str) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn sign_out(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        fn subscribe(&self) -> crate::backend::AuthSubscription {
            let (tx, rx) = tokio::sync::broadcast::channel(1);
            drop(tx);
            crate::backend::AuthSubscription::new(rx)
        }
    }

    #[tokio::test]
    async fn test_submit_disabled_while_in_flight() {
        let (form, _toasts) = form_with(Arc::new(Hanging));
        let form = Arc::new(form);
        fill(&form, "a@example.com", "secret1");

        let in_flight = {
            let form = form.clone();
            tokio::spawn(async move { form.submit().await })
        };
        while !form.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(form.submit().await.unwrap(), SubmitOutcome::Skipped);
        in_flight.abort();
    }

    #[tokio::test]
    async fn test_cancelled_submit_releases_form() {
        let (form, _toasts) = form_with(Arc::new(Hanging));
        fill(&form, "a@example.com", "secret1");

        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), form.submit()).await;
        assert!(timed_out.is_err());
        assert!(!form.is_busy());

        // Submitting again reaches the provider instead of being skipped
        let retry = tokio::time::timeout(std::time::Duration::from_millis(20), form.submit()).await;
        assert!(retry.is_err());
        assert!(!form.is_busy());
    }
}
