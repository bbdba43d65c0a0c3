//! Core data model types for examprep.
//!
//! These mirror the JSON shapes served by the exam API. Field names on the
//! wire are the server's Spanish camelCase names; the Rust names are English.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// One of the four fixed evaluation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "Comprensión Lectora")]
    ReadingComprehension,
    #[serde(rename = "Razonamiento Lógico")]
    LogicalReasoning,
    #[serde(rename = "Conocimientos Generales")]
    GeneralKnowledge,
    #[serde(rename = "Habilidades Socioemocionales")]
    SocioEmotional,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::ReadingComprehension,
        Component::LogicalReasoning,
        Component::GeneralKnowledge,
        Component::SocioEmotional,
    ];

    /// Display name as the server spells it.
    pub fn display_name(self) -> &'static str {
        match self {
            Component::ReadingComprehension => "Comprensión Lectora",
            Component::LogicalReasoning => "Razonamiento Lógico",
            Component::GeneralKnowledge => "Conocimientos Generales",
            Component::SocioEmotional => "Habilidades Socioemocionales",
        }
    }

    /// Short identifier used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            Component::ReadingComprehension => "comprension",
            Component::LogicalReasoning => "razonamiento",
            Component::GeneralKnowledge => "conocimientos",
            Component::SocioEmotional => "habilidades",
        }
    }

    /// Terminal glyph shown next to the component name.
    pub fn glyph(self) -> &'static str {
        match self {
            Component::ReadingComprehension => "[R]",
            Component::LogicalReasoning => "[L]",
            Component::GeneralKnowledge => "[G]",
            Component::SocioEmotional => "[S]",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Component::ALL
            .into_iter()
            .find(|c| c.slug() == lowered || c.display_name().to_lowercase() == lowered)
            .ok_or_else(|| {
                format!("unknown component: {s} (expected comprension, razonamiento, conocimientos or habilidades)")
            })
    }
}

/// A component as listed by `GET /componentes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: Component,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Whether a session is a scored mock exam or a practice run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Exam,
    Practice,
}

impl SessionMode {
    /// REST collection segment for this mode.
    pub fn path_segment(self) -> &'static str {
        match self {
            SessionMode::Exam => "simulacros",
            SessionMode::Practice => "practicas",
        }
    }

    /// Human label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            SessionMode::Exam => "simulacro",
            SessionMode::Practice => "práctica",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Option label, A through E.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
    E,
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
            OptionLabel::E => "E",
        };
        f.write_str(c)
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            "E" => Ok(OptionLabel::E),
            other => Err(format!("unknown option label: {other}")),
        }
    }
}

/// One answer choice. `is_correct` is server-supplied and must not be shown
/// in exam mode before the session is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    #[serde(rename = "letra")]
    pub label: OptionLabel,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "esCorrecta", default)]
    pub is_correct: bool,
}

/// A question within a session's fixed sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "enunciado")]
    pub prompt: String,
    /// Explanatory text shown after answering in practice mode.
    #[serde(rename = "sustento", default)]
    pub rationale: String,
    #[serde(rename = "componenteId", default)]
    pub component_id: String,
    #[serde(rename = "articuloId", default)]
    pub article_id: Option<String>,
    #[serde(rename = "opciones", default)]
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn option_by_label(&self, label: OptionLabel) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.label == label)
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// An answer as stored server-side in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAnswer {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "preguntaId")]
    pub question_id: String,
    #[serde(rename = "opcionSeleccionadaId", default)]
    pub selected_option_id: Option<String>,
    #[serde(rename = "esCorrecta", default)]
    pub is_correct: Option<bool>,
    #[serde(rename = "pregunta", default)]
    pub question: Option<Question>,
}

/// A simulacro or práctica. Both share this shape; the practice scope ids
/// are absent for exams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "componenteId")]
    pub component_id: String,
    #[serde(rename = "componente", default)]
    pub component: Option<ComponentInfo>,
    #[serde(rename = "fechaInicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "fechaFin", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "puntaje", default)]
    pub score: Option<f64>,
    /// Total time in seconds, exams only.
    #[serde(rename = "tiempoTotal", default)]
    pub total_time: Option<u64>,
    #[serde(rename = "completado", default)]
    pub completed: bool,
    #[serde(rename = "respuestas", default)]
    pub answers: Vec<RecordedAnswer>,
    #[serde(rename = "articuloId", default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(rename = "subtemaId", default, skip_serializing_if = "Option::is_none")]
    pub subtopic_id: Option<String>,
    #[serde(rename = "temaGeneralId", default, skip_serializing_if = "Option::is_none")]
    pub general_topic_id: Option<String>,
    #[serde(
        rename = "temaSocioemocionalId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub socio_emotional_topic_id: Option<String>,
}

impl Session {
    /// The evaluation category, when the server embedded it.
    pub fn component_kind(&self) -> Option<Component> {
        self.component.as_ref().map(|c| c.name)
    }
}

/// `GET /simulacros/{id}` and `GET /practicas/{id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBundle {
    #[serde(rename = "simulacro", alias = "practica")]
    pub session: Session,
    #[serde(rename = "preguntas", default)]
    pub questions: Vec<Question>,
}

/// Per-answer feedback returned by the practice submit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeFeedback {
    #[serde(rename = "esCorrecta")]
    pub is_correct: bool,
    #[serde(rename = "opcionCorrectaId")]
    pub correct_option_id: String,
    #[serde(rename = "sustento", default)]
    pub rationale: String,
}

/// Exam finalize / result payload. The score is server-authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResult {
    #[serde(rename = "simulacro")]
    pub session: Session,
    #[serde(rename = "puntaje")]
    pub score: f64,
    #[serde(rename = "correctas")]
    pub correct_count: u32,
    #[serde(rename = "incorrectas")]
    pub incorrect_count: u32,
    #[serde(rename = "sinResponder")]
    pub unanswered_count: u32,
}

// ---------------------------------------------------------------------------
// Practice catalog
// ---------------------------------------------------------------------------

/// A reading passage (Comprensión Lectora).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    #[serde(rename = "componenteId", default)]
    pub component_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "contenido", default)]
    pub content: String,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningSubtopic {
    pub id: String,
    #[serde(rename = "temaId", default)]
    pub topic_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTopic {
    pub id: String,
    #[serde(rename = "componenteId", default)]
    pub component_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
    #[serde(rename = "subtemas", default)]
    pub subtopics: Vec<ReasoningSubtopic>,
}

/// A flat topic (Conocimientos Generales, Habilidades Socioemocionales).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    #[serde(rename = "componenteId", default)]
    pub component_id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

/// What a practice session should draw questions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeScope {
    /// The whole component.
    Component,
    Article(String),
    ReasoningTopic(String),
    ReasoningSubtopic(String),
    GeneralTopic(String),
    SocioEmotionalTopic(String),
}

/// `POST /practicas/iniciar` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPracticeRequest {
    #[serde(rename = "componenteId")]
    pub component_id: String,
    #[serde(rename = "articuloId", skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(rename = "temaRazonamientoId", skip_serializing_if = "Option::is_none")]
    pub reasoning_topic_id: Option<String>,
    #[serde(rename = "subtemaId", skip_serializing_if = "Option::is_none")]
    pub subtopic_id: Option<String>,
    #[serde(rename = "temaGeneralId", skip_serializing_if = "Option::is_none")]
    pub general_topic_id: Option<String>,
    #[serde(rename = "temaSocioemocionalId", skip_serializing_if = "Option::is_none")]
    pub socio_emotional_topic_id: Option<String>,
    #[serde(rename = "soloPractica", skip_serializing_if = "Option::is_none")]
    pub practice_only: Option<bool>,
}

impl StartPracticeRequest {
    /// Build a start request, keeping only the scope id that belongs to the
    /// chosen component. A mismatched scope falls back to the whole component.
    pub fn new(
        component: Component,
        component_id: impl Into<String>,
        scope: PracticeScope,
        practice_only: bool,
    ) -> Self {
        let mut request = Self {
            component_id: component_id.into(),
            practice_only: Some(practice_only),
            ..Default::default()
        };
        match (component, scope) {
            (Component::ReadingComprehension, PracticeScope::Article(id)) => {
                request.article_id = Some(id)
            }
            (Component::LogicalReasoning, PracticeScope::ReasoningSubtopic(id)) => {
                request.subtopic_id = Some(id)
            }
            (Component::LogicalReasoning, PracticeScope::ReasoningTopic(id)) => {
                request.reasoning_topic_id = Some(id)
            }
            (Component::GeneralKnowledge, PracticeScope::GeneralTopic(id)) => {
                request.general_topic_id = Some(id)
            }
            (Component::SocioEmotional, PracticeScope::SocioEmotionalTopic(id)) => {
                request.socio_emotional_topic_id = Some(id)
            }
            _ => {}
        }
        request
    }
}

/// `POST /simulacros/iniciar` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartExamRequest {
    #[serde(rename = "componenteId")]
    pub component_id: String,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralStats {
    #[serde(rename = "totalSimulacros", default)]
    pub total_exams: u32,
    #[serde(rename = "totalPracticas", default)]
    pub total_practices: u32,
    #[serde(rename = "promedioGeneral", default)]
    pub overall_average: f64,
    #[serde(rename = "rachaActual", default)]
    pub current_streak: u32,
    #[serde(rename = "mejorRacha", default)]
    pub best_streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStats {
    #[serde(rename = "componenteId")]
    pub component_id: String,
    #[serde(rename = "componenteNombre")]
    pub component: Component,
    #[serde(rename = "totalIntentos", default)]
    pub attempts: u32,
    #[serde(rename = "promedio", default)]
    pub average: f64,
    #[serde(rename = "mejorPuntaje", default)]
    pub best_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePoint {
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "puntaje")]
    pub score: f64,
    #[serde(rename = "tipo")]
    pub kind: ScoreKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    #[serde(rename = "simulacro")]
    Exam,
    #[serde(rename = "practica")]
    Practice,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedStats {
    #[serde(rename = "generales", default)]
    pub general: GeneralStats,
    #[serde(rename = "porComponente", default)]
    pub per_component: Vec<ComponentStats>,
    #[serde(rename = "evolucion", default)]
    pub history: Vec<ScorePoint>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub password: String,
    #[serde(rename = "nombres")]
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres"))]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    #[validate(length(min = 2, message = "Los apellidos deben tener al menos 2 caracteres"))]
    pub last_names: String,
    #[serde(rename = "codigo_pais")]
    #[validate(custom(function = "crate::validation::not_blank", message = "Selecciona un código de país"))]
    pub country_code: String,
    #[serde(rename = "telefono")]
    #[validate(
        custom(function = "crate::validation::digits_only", message = "Solo números"),
        length(min = 7, message = "El teléfono debe tener al menos 7 dígitos")
    )]
    pub phone: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("first_names", &self.first_names)
            .field("last_names", &self.last_names)
            .field("country_code", &self.country_code)
            .field("phone", &self.phone)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "telefono")]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(rename = "telefono")]
    #[validate(custom(function = "crate::validation::not_blank", message = "Falta el teléfono a verificar"))]
    pub phone: String,
    #[serde(rename = "codigo")]
    #[validate(
        length(equal = 6, message = "Por favor ingresa el código de 6 dígitos"),
        custom(function = "crate::validation::digits_only", message = "Por favor ingresa el código de 6 dígitos")
    )]
    pub code: String,
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub new_password: String,
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePasswordRequest").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_parse_and_display() {
        assert_eq!(
            "razonamiento".parse::<Component>().unwrap(),
            Component::LogicalReasoning
        );
        assert_eq!(
            "Comprensión Lectora".parse::<Component>().unwrap(),
            Component::ReadingComprehension
        );
        assert_eq!(Component::SocioEmotional.slug(), "habilidades");
        assert!("matematicas".parse::<Component>().is_err());
    }

    #[test]
    fn unknown_component_name_fails_to_deserialize() {
        let json = r#"{"id": "c1", "nombre": "Matemáticas"}"#;
        assert!(serde_json::from_str::<ComponentInfo>(json).is_err());
    }

    #[test]
    fn bundle_accepts_exam_and_practice_keys() {
        let exam = r#"{
            "simulacro": {"id": "s1", "componenteId": "c1", "fechaInicio": "2024-05-01T10:00:00Z", "completado": false},
            "preguntas": []
        }"#;
        let practice = r#"{
            "practica": {"id": "p1", "componenteId": "c1", "fechaInicio": "2024-05-01T10:00:00Z", "completado": false, "subtemaId": "st1"},
            "preguntas": []
        }"#;
        let exam: SessionBundle = serde_json::from_str(exam).unwrap();
        let practice: SessionBundle = serde_json::from_str(practice).unwrap();
        assert_eq!(exam.session.id, "s1");
        assert_eq!(practice.session.subtopic_id.as_deref(), Some("st1"));
        assert!(practice.session.answers.is_empty());
    }

    #[test]
    fn question_option_lookup() {
        let json = r#"{
            "id": "q1", "enunciado": "2 + 2?", "sustento": "Suma básica",
            "opciones": [
                {"id": "o1", "letra": "A", "texto": "3", "esCorrecta": false},
                {"id": "o2", "letra": "B", "texto": "4", "esCorrecta": true}
            ]
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.correct_option().unwrap().id, "o2");
        assert_eq!(q.option_by_label(OptionLabel::A).unwrap().text, "3");
        assert!(q.option("o9").is_none());
    }

    #[test]
    fn start_practice_keeps_only_matching_scope() {
        let req = StartPracticeRequest::new(
            Component::LogicalReasoning,
            "c2",
            PracticeScope::ReasoningSubtopic("st1".into()),
            true,
        );
        assert_eq!(req.subtopic_id.as_deref(), Some("st1"));
        assert!(req.reasoning_topic_id.is_none());

        let mismatched = StartPracticeRequest::new(
            Component::GeneralKnowledge,
            "c3",
            PracticeScope::Article("a1".into()),
            false,
        );
        assert!(mismatched.article_id.is_none());

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["componenteId"], "c2");
        assert_eq!(json["soloPractica"], true);
        assert!(json.get("articuloId").is_none());
    }

    #[test]
    fn login_request_debug_masks_password() {
        let req = LoginRequest {
            email: "a@b.co".into(),
            password: "hunter22".into(),
        };
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("hunter22"));
    }
}
