//! The `examprep exam` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_core::model::{Component, Session, SessionMode};
use examprep_core::shell::{load_result, Navigation};

use super::catalog::component_id;
use super::session::{print_result, run, ConsoleNotifier};
use super::{api_error, shell_error, App};

pub async fn start(config: Option<PathBuf>, component: Component, take_now: bool) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let gateway = app.gateway();

    let components = gateway.components().await.map_err(api_error)?;
    let id = component_id(&components, component)?;
    let session = gateway.start_exam(&id).await.map_err(api_error)?;
    println!("Simulacro iniciado: {}", session.id);

    if take_now {
        take_session(&app, &session.id).await
    } else {
        println!("Run: examprep exam take {}", session.id);
        Ok(())
    }
}

pub async fn take(config: Option<PathBuf>, id: String) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    take_session(&app, &id).await
}

async fn take_session(app: &App, id: &str) -> Result<()> {
    let gateway = app.gateway();
    match run(gateway.clone(), SessionMode::Exam, id).await? {
        Some(Navigation::Result(result)) => print_result(&result, false),
        Some(Navigation::ResultPage { session_id }) => {
            let result = load_result(gateway.as_ref(), &ConsoleNotifier, &session_id)
                .await
                .map_err(shell_error)?;
            print_result(&result, false);
        }
        Some(Navigation::SessionList(_)) | None => {}
    }
    Ok(())
}

pub async fn result(config: Option<PathBuf>, id: String, review: bool) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let gateway = app.gateway();
    let result = load_result(gateway.as_ref(), &ConsoleNotifier, &id)
        .await
        .map_err(shell_error)?;
    print_result(&result, review);
    Ok(())
}

pub async fn history(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let sessions = app
        .gateway()
        .history(SessionMode::Exam)
        .await
        .map_err(api_error)?;
    print_history(&sessions, "No tienes simulacros todavía.");
    Ok(())
}

/// Session list shared by exam and practice history.
pub fn print_history(sessions: &[Session], empty: &str) {
    if sessions.is_empty() {
        println!("{empty}");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Id", "Componente", "Inicio", "Estado", "Puntaje"]);
    for session in sessions {
        let component = session
            .component_kind()
            .map(|c| c.to_string())
            .unwrap_or_default();
        let state = if session.completed {
            "completado"
        } else {
            "en curso"
        };
        let score = session
            .score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&session.id),
            Cell::new(component),
            Cell::new(session.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(state),
            Cell::new(score),
        ]);
    }
    println!("{table}");
}
