//! The `examprep practice` commands.

use std::path::PathBuf;

use anyhow::Result;

use examprep_core::model::{Component, PracticeScope, SessionMode, StartPracticeRequest};

use super::catalog::component_id;
use super::exam::print_history;
use super::session::run;
use super::{api_error, App};

pub struct StartArgs {
    pub component: Component,
    pub article: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub practice_only: bool,
    pub take: bool,
}

/// Pick the narrowest scope the flags name for `component`.
pub fn scope_for(
    component: Component,
    article: Option<String>,
    topic: Option<String>,
    subtopic: Option<String>,
) -> Result<PracticeScope> {
    let scope = match component {
        Component::ReadingComprehension => {
            anyhow::ensure!(
                topic.is_none() && subtopic.is_none(),
                "{component} practices by --article"
            );
            article.map(PracticeScope::Article)
        }
        Component::LogicalReasoning => {
            anyhow::ensure!(article.is_none(), "{component} practices by --topic or --subtopic");
            subtopic
                .map(PracticeScope::ReasoningSubtopic)
                .or(topic.map(PracticeScope::ReasoningTopic))
        }
        Component::GeneralKnowledge | Component::SocioEmotional => {
            anyhow::ensure!(
                article.is_none() && subtopic.is_none(),
                "{component} practices by --topic"
            );
            topic.map(|id| {
                if component == Component::GeneralKnowledge {
                    PracticeScope::GeneralTopic(id)
                } else {
                    PracticeScope::SocioEmotionalTopic(id)
                }
            })
        }
    };
    Ok(scope.unwrap_or(PracticeScope::Component))
}

pub async fn start(config: Option<PathBuf>, args: StartArgs) -> Result<()> {
    let scope = scope_for(args.component, args.article, args.topic, args.subtopic)?;
    let app = App::load(config)?;
    app.require_user().await?;
    let gateway = app.gateway();

    let components = gateway.components().await.map_err(api_error)?;
    let id = component_id(&components, args.component)?;
    let request = StartPracticeRequest::new(args.component, id, scope, args.practice_only);
    let session = gateway.start_practice(&request).await.map_err(api_error)?;
    println!("Práctica iniciada: {}", session.id);

    if args.take {
        run(gateway, SessionMode::Practice, &session.id).await?;
    } else {
        println!("Run: examprep practice take {}", session.id);
    }
    Ok(())
}

pub async fn take(config: Option<PathBuf>, id: String) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    run(app.gateway(), SessionMode::Practice, &id).await?;
    Ok(())
}

pub async fn history(config: Option<PathBuf>) -> Result<()> {
    let app = App::load(config)?;
    app.require_user().await?;
    let sessions = app
        .gateway()
        .history(SessionMode::Practice)
        .await
        .map_err(api_error)?;
    print_history(&sessions, "No tienes prácticas todavía.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtopic_wins_over_topic() {
        let scope = scope_for(
            Component::LogicalReasoning,
            None,
            Some("t1".into()),
            Some("st1".into()),
        )
        .unwrap();
        assert_eq!(scope, PracticeScope::ReasoningSubtopic("st1".into()));
    }

    #[test]
    fn no_flags_means_whole_component() {
        let scope = scope_for(Component::GeneralKnowledge, None, None, None).unwrap();
        assert_eq!(scope, PracticeScope::Component);
    }

    #[test]
    fn topic_maps_by_component() {
        assert_eq!(
            scope_for(Component::SocioEmotional, None, Some("t9".into()), None).unwrap(),
            PracticeScope::SocioEmotionalTopic("t9".into())
        );
        assert_eq!(
            scope_for(Component::ReadingComprehension, Some("a1".into()), None, None).unwrap(),
            PracticeScope::Article("a1".into())
        );
    }

    #[test]
    fn mismatched_flag_is_rejected() {
        assert!(scope_for(Component::ReadingComprehension, None, Some("t1".into()), None).is_err());
        assert!(scope_for(Component::GeneralKnowledge, Some("a1".into()), None, None).is_err());
    }
}
