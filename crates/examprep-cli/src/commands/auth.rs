//! Account commands: login, register, verify, resend-otp, logout, whoami, password.

use std::path::PathBuf;

use anyhow::{Context, Result};

use examprep_client::AuthError;
use examprep_core::model::{ChangePasswordRequest, LoginRequest, RegisterRequest, VerifyOtpRequest};

use super::{api_error, value_or_prompt, App};

fn auth_error(e: AuthError) -> anyhow::Error {
    match e {
        AuthError::Gateway(e) => api_error(e),
        other => anyhow::anyhow!(other.user_message()),
    }
}

pub async fn login(config: Option<PathBuf>, email: String, password: Option<String>) -> Result<()> {
    let app = App::load(config)?;
    let password = value_or_prompt(password, "Contraseña: ")?;
    let user = app
        .auth
        .login(&LoginRequest { email, password })
        .await
        .map_err(auth_error)?;
    println!("¡Bienvenido, {}!", user.first_names);
    Ok(())
}

pub struct RegisterArgs {
    pub email: String,
    pub first_names: String,
    pub last_names: String,
    pub phone: String,
    pub country_code: String,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

pub async fn register(config: Option<PathBuf>, args: RegisterArgs) -> Result<()> {
    let app = App::load(config)?;
    let password = value_or_prompt(args.password, "Contraseña: ")?;
    let confirm = args.confirm_password.unwrap_or_else(|| password.clone());
    let request = RegisterRequest {
        email: args.email.trim().to_string(),
        password,
        first_names: args.first_names.trim().to_string(),
        last_names: args.last_names.trim().to_string(),
        country_code: args.country_code.trim().to_string(),
        phone: args.phone.trim().to_string(),
    };

    let response = app
        .auth
        .register(&request, &confirm)
        .await
        .map_err(auth_error)?;
    println!("Te enviamos un código de verificación al {}", response.phone);
    println!("Run: examprep verify --phone {} --code <código>", response.phone);
    Ok(())
}

pub async fn verify(config: Option<PathBuf>, phone: String, code: String) -> Result<()> {
    let app = App::load(config)?;
    let user = app
        .auth
        .verify_otp(&VerifyOtpRequest {
            phone,
            code: code.trim().to_string(),
        })
        .await
        .map_err(auth_error)?;
    println!("Cuenta verificada. ¡Bienvenido, {}!", user.first_names);
    Ok(())
}

pub async fn resend_otp(config: Option<PathBuf>, phone: String) -> Result<()> {
    let app = App::load(config)?;
    app.auth.resend_otp(&phone).await.map_err(auth_error)?;
    println!("Código reenviado al {phone}");
    Ok(())
}

pub fn logout(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    app.auth
        .logout()
        .context("failed to remove the stored token")?;
    println!("Sesión cerrada.");
    Ok(())
}

pub async fn whoami(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    let user = app.require_user().await?;
    println!("{} <{}>", user.full_name(), user.email);
    if !user.phone.is_empty() {
        println!("Teléfono: {}", user.phone);
    }
    Ok(())
}

pub async fn change_password(
    config: Option<PathBuf>,
    current: Option<String>,
    new: Option<String>,
) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let current_password = value_or_prompt(current, "Contraseña actual: ")?;
    let (new_password, confirm) = match new {
        Some(new) => (new.clone(), new),
        None => (
            value_or_prompt(None, "Nueva contraseña: ")?,
            value_or_prompt(None, "Confirmar contraseña: ")?,
        ),
    };
    app.auth
        .change_password(
            &ChangePasswordRequest {
                current_password,
                new_password,
            },
            &confirm,
        )
        .await
        .map_err(auth_error)?;
    println!("Contraseña actualizada.");
    Ok(())
}
