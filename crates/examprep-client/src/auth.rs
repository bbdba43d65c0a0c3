//! Authenticated-user context and token persistence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{info, instrument, warn};

use examprep_core::model::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, RegisterResponse, User,
    VerifyOtpRequest,
};
use examprep_core::validation::{validate_otp, validate_password_change, validate_registration};

use crate::error::AuthError;
use crate::http::HttpGateway;

/// Stores the access token in a single file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, if any. An unreadable or empty file counts as none.
    pub fn load(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn save(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, token)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct ResendOtpBody<'a> {
    #[serde(rename = "telefono")]
    phone: &'a str,
}

/// Who is signed in, passed explicitly to everything that needs it.
pub struct AuthContext {
    gateway: Arc<HttpGateway>,
    store: TokenStore,
    user: RwLock<Option<User>>,
}

impl AuthContext {
    pub fn new(gateway: Arc<HttpGateway>, store: TokenStore) -> Self {
        Self {
            gateway,
            store,
            user: RwLock::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<HttpGateway> {
        &self.gateway
    }

    pub fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    /// Re-establish a session from an explicit token or the token file.
    ///
    /// Any failure to fetch the profile discards the token.
    #[instrument(skip_all)]
    pub async fn restore(&self, explicit_token: Option<&str>) -> Option<User> {
        let token = explicit_token
            .map(str::to_string)
            .or_else(|| self.store.load())?;
        self.gateway.set_token(token);

        match self.gateway.get::<User>("/auth/me").await {
            Ok(user) => {
                info!(email = %user.email, "session restored");
                self.set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "stored token rejected, signing out");
                self.gateway.clear_token();
                self.set_user(None);
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to remove token file");
                }
                None
            }
        }
    }

    fn accept(&self, response: AuthResponse) -> Result<User, AuthError> {
        self.store.save(&response.access_token)?;
        self.gateway.set_token(response.access_token);
        self.set_user(Some(response.user.clone()));
        Ok(response.user)
    }

    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        let response: AuthResponse = self.gateway.post("/auth/login", request, false).await?;
        let user = self.accept(response)?;
        info!("logged in");
        Ok(user)
    }

    /// Register a new account. The server answers with the phone number the
    /// OTP was sent to; no token is issued until verification.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(
        &self,
        request: &RegisterRequest,
        confirm_password: &str,
    ) -> Result<RegisterResponse, AuthError> {
        validate_registration(request, confirm_password)?;
        let response: RegisterResponse = self
            .gateway
            .post("/auth/register", request, false)
            .await?;
        info!(phone = %response.phone, "registration pending verification");
        Ok(response)
    }

    #[instrument(skip_all, fields(phone = %request.phone))]
    pub async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<User, AuthError> {
        validate_otp(request)?;
        let response: AuthResponse = self
            .gateway
            .post("/auth/verify-otp", request, false)
            .await?;
        self.accept(response)
    }

    #[instrument(skip(self))]
    pub async fn resend_otp(&self, phone: &str) -> Result<(), AuthError> {
        self.gateway
            .post_unit("/auth/resend-otp", Some(&ResendOtpBody { phone }), false)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        validate_password_change(request, confirm_password)?;
        self.gateway
            .patch_unit("/auth/change-password", request)
            .await?;
        Ok(())
    }

    /// Drop the token locally. There is no server-side logout.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.gateway.clear_token();
        self.set_user(None);
        self.store.clear()?;
        Ok(())
    }
}
