//! REST implementation of the session gateway.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use examprep_core::error::GatewayError;
use examprep_core::model::{
    Article, ComponentInfo, DetailedStats, FinalizeResult, PracticeFeedback, ReasoningTopic,
    Session, SessionBundle, SessionMode, StartExamRequest, StartPracticeRequest, Topic,
};
use examprep_core::traits::SessionGateway;

use crate::config::ClientConfig;
use crate::error::{check_status, from_reqwest};

#[derive(Serialize)]
struct AnswerBody<'a> {
    #[serde(rename = "opcionId")]
    option_id: &'a str,
}

/// Everything needed to offer a practice session, fetched together.
#[derive(Debug, Clone, Default)]
pub struct PracticeCatalog {
    pub components: Vec<ComponentInfo>,
    pub articles: Vec<Article>,
    pub reasoning_topics: Vec<ReasoningTopic>,
    pub general_topics: Vec<Topic>,
    pub socio_emotional_topics: Vec<Topic>,
    pub history: Vec<Session>,
}

/// Exam API client. Session calls carry the bearer token when one is set.
pub struct HttpGateway {
    base_url: String,
    timeout_secs: u64,
    token: RwLock<Option<String>>,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            token: RwLock::new(None),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn request(&self, method: Method, path: &str, authenticated: bool) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if authenticated {
            if let Some(token) = self
                .token
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .as_deref()
            {
                req = req.bearer_auth(token);
            }
        }
        req
    }

    async fn execute(&self, req: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = req
            .send()
            .await
            .map_err(|e| from_reqwest(e, self.timeout_secs))?;
        check_status(response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(format!("failed to parse response: {e}")))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.execute(self.request(Method::GET, path, true)).await?;
        self.decode(response).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        authenticated: bool,
    ) -> Result<T, GatewayError> {
        let req = self.request(Method::POST, path, authenticated).json(body);
        let response = self.execute(req).await?;
        self.decode(response).await
    }

    /// POST whose response body is ignored.
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<(), GatewayError> {
        let mut req = self.request(Method::POST, path, authenticated);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.execute(req).await.map(|_| ())
    }

    pub(crate) async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), GatewayError> {
        let req = self.request(Method::PATCH, path, true).json(body);
        self.execute(req).await.map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Catalog, history, statistics
    // -----------------------------------------------------------------------

    pub async fn components(&self) -> Result<Vec<ComponentInfo>, GatewayError> {
        self.get("/componentes").await
    }

    pub async fn articles(&self) -> Result<Vec<Article>, GatewayError> {
        self.get("/articulos").await
    }

    pub async fn reasoning_topics(&self) -> Result<Vec<ReasoningTopic>, GatewayError> {
        self.get("/temas-razonamiento").await
    }

    pub async fn general_topics(&self) -> Result<Vec<Topic>, GatewayError> {
        self.get("/temas-generales").await
    }

    pub async fn socio_emotional_topics(&self) -> Result<Vec<Topic>, GatewayError> {
        self.get("/temas-socioemocionales").await
    }

    pub async fn history(&self, mode: SessionMode) -> Result<Vec<Session>, GatewayError> {
        self.get(&format!("/{}/historial", mode.path_segment()))
            .await
    }

    pub async fn statistics(&self) -> Result<DetailedStats, GatewayError> {
        self.get("/estadisticas/usuario").await
    }

    /// Fetch the whole practice catalog concurrently.
    pub async fn practice_catalog(&self) -> Result<PracticeCatalog, GatewayError> {
        let (components, articles, reasoning_topics, general_topics, socio_emotional_topics, history) =
            futures::try_join!(
                self.components(),
                self.articles(),
                self.reasoning_topics(),
                self.general_topics(),
                self.socio_emotional_topics(),
                self.history(SessionMode::Practice),
            )?;
        Ok(PracticeCatalog {
            components,
            articles,
            reasoning_topics,
            general_topics,
            socio_emotional_topics,
            history,
        })
    }

    #[instrument(skip(self))]
    pub async fn start_exam(&self, component_id: &str) -> Result<Session, GatewayError> {
        let body = StartExamRequest {
            component_id: component_id.to_string(),
        };
        self.post("/simulacros/iniciar", &body, true).await
    }

    #[instrument(skip(self, request), fields(component_id = %request.component_id))]
    pub async fn start_practice(
        &self,
        request: &StartPracticeRequest,
    ) -> Result<Session, GatewayError> {
        self.post("/practicas/iniciar", request, true).await
    }
}

#[async_trait]
impl SessionGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn fetch_session(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<SessionBundle, GatewayError> {
        self.get(&format!("/{}/{}", mode.path_segment(), session_id))
            .await
    }

    #[instrument(skip(self))]
    async fn submit_answer(
        &self,
        mode: SessionMode,
        session_id: &str,
        question_id: &str,
        option_id: &str,
    ) -> Result<Option<PracticeFeedback>, GatewayError> {
        let path = format!(
            "/{}/{}/responder/{}",
            mode.path_segment(),
            session_id,
            question_id
        );
        let body = AnswerBody { option_id };
        match mode {
            SessionMode::Exam => {
                self.post_unit(&path, Some(&body), true).await?;
                Ok(None)
            }
            SessionMode::Practice => self.post(&path, &body, true).await.map(Some),
        }
    }

    #[instrument(skip(self))]
    async fn finalize(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<Option<FinalizeResult>, GatewayError> {
        let path = format!("/{}/{}/finalizar", mode.path_segment(), session_id);
        match mode {
            SessionMode::Exam => self
                .post(&path, &serde_json::json!({}), true)
                .await
                .map(Some),
            SessionMode::Practice => {
                self.post_unit::<()>(&path, None, true).await?;
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn fetch_result(&self, session_id: &str) -> Result<FinalizeResult, GatewayError> {
        self.get(&format!("/simulacros/{session_id}/resultado"))
            .await
    }
}
