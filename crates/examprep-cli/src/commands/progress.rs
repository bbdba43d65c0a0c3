//! The `examprep progress` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_core::model::{DetailedStats, ScoreKind};

use super::{api_error, App};

pub async fn execute(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    let user = app.require_user().await?;
    let stats = app.gateway().statistics().await.map_err(api_error)?;

    println!("Progreso de {}\n", user.full_name());
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &DetailedStats) {
    let general = &stats.general;
    let mut summary = Table::new();
    summary.set_header(vec![
        "Simulacros",
        "Prácticas",
        "Promedio",
        "Racha actual",
        "Mejor racha",
    ]);
    summary.add_row(vec![
        Cell::new(general.total_exams),
        Cell::new(general.total_practices),
        Cell::new(format!("{:.1}", general.overall_average)),
        Cell::new(general.current_streak),
        Cell::new(general.best_streak),
    ]);
    println!("{summary}");

    if !stats.per_component.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["", "Componente", "Intentos", "Promedio", "Mejor"]);
        for c in &stats.per_component {
            table.add_row(vec![
                Cell::new(c.component.glyph()),
                Cell::new(c.component),
                Cell::new(c.attempts),
                Cell::new(format!("{:.1}", c.average)),
                Cell::new(format!("{:.1}", c.best_score)),
            ]);
        }
        println!("\n{table}");
    }

    if !stats.history.is_empty() {
        println!("\nEvolución");
        for point in &stats.history {
            let kind = match point.kind {
                ScoreKind::Exam => "simulacro",
                ScoreKind::Practice => "práctica",
            };
            println!("  {}  {:>6.1}  {kind}", point.date, point.score);
        }
    }
}
