//! The `examprep components` and `examprep practice catalog` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_client::PracticeCatalog;
use examprep_core::model::{Component, ComponentInfo};

use super::{api_error, App};

pub async fn components(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let components = app.gateway().components().await.map_err(api_error)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Componente", "Usar como", "Descripción"]);
    for info in components.iter().filter(|c| c.active) {
        table.add_row(vec![
            Cell::new(info.name.glyph()),
            Cell::new(info.name),
            Cell::new(info.name.slug()),
            Cell::new(info.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Find the server id of `component`.
pub fn component_id(components: &[ComponentInfo], component: Component) -> Result<String> {
    components
        .iter()
        .find(|c| c.name == component)
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow::anyhow!("component not offered by the server: {component}"))
}

pub async fn practice_catalog(config: Option<PathBuf>, only: Option<Component>) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let catalog = app.gateway().practice_catalog().await.map_err(api_error)?;

    for info in catalog.components.iter().filter(|c| c.active) {
        if only.is_some_and(|c| c != info.name) {
            continue;
        }
        println!("{} {}", info.name.glyph(), info.name);
        print_scopes(&catalog, info);
        println!();
    }

    let completed = catalog.history.iter().filter(|s| s.completed).count();
    println!(
        "Prácticas realizadas: {} ({} completadas)",
        catalog.history.len(),
        completed
    );
    Ok(())
}

fn print_scopes(catalog: &PracticeCatalog, info: &ComponentInfo) {
    let mut table = Table::new();
    match info.name {
        Component::ReadingComprehension => {
            table.set_header(vec!["--article", "Artículo"]);
            for article in catalog
                .articles
                .iter()
                .filter(|a| a.active && a.component_id == info.id)
            {
                table.add_row(vec![article.id.as_str(), article.title.as_str()]);
            }
        }
        Component::LogicalReasoning => {
            table.set_header(vec!["--topic", "Tema", "--subtopic", "Subtema"]);
            for topic in catalog.reasoning_topics.iter().filter(|t| t.active) {
                if topic.subtopics.is_empty() {
                    table.add_row(vec![topic.id.as_str(), topic.name.as_str(), "", ""]);
                }
                for sub in topic.subtopics.iter().filter(|s| s.active) {
                    table.add_row(vec![
                        topic.id.as_str(),
                        topic.name.as_str(),
                        sub.id.as_str(),
                        sub.name.as_str(),
                    ]);
                }
            }
        }
        Component::GeneralKnowledge | Component::SocioEmotional => {
            let topics = if info.name == Component::GeneralKnowledge {
                &catalog.general_topics
            } else {
                &catalog.socio_emotional_topics
            };
            table.set_header(vec!["--topic", "Tema"]);
            for topic in topics.iter().filter(|t| t.active) {
                table.add_row(vec![topic.id.as_str(), topic.name.as_str()]);
            }
        }
    }
    if table.row_iter().next().is_none() {
        println!("  (sin temas; practica el componente completo)");
    } else {
        println!("{table}");
    }
}
