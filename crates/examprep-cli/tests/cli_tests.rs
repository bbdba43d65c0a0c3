//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The binary, isolated from the caller's config, token, and environment.
fn examprep(home: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("examprep").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("EXAMPREP_API_URL")
        .env_remove("EXAMPREP_TOKEN")
        .env("RUST_LOG", "examprep=warn");
    cmd
}

#[test]
fn help_output() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mock exams and practice sessions"))
        .stdout(predicate::str::contains("practice"));
}

#[test]
fn version_output() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("examprep"));
}

#[test]
fn init_creates_config() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created examprep.toml"));
    assert!(home.path().join("examprep.toml").exists());

    examprep(&home)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_file_fails() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .args(["--config", "nope.toml", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unknown_component_is_rejected() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .args(["exam", "start", "matematicas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown component"));
}

#[test]
fn whoami_without_token_asks_to_log_in() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("examprep login"));
}

#[test]
fn register_validates_before_any_request() {
    let home = TempDir::new().unwrap();
    examprep(&home)
        .env("EXAMPREP_API_URL", "http://127.0.0.1:9")
        .args([
            "register",
            "--email",
            "ana-at-example",
            "--first-names",
            "Ana",
            "--last-names",
            "Quispe",
            "--phone",
            "12ab",
            "--password",
            "secreto",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Email inválido"))
        .stderr(predicate::str::contains("Solo números"));
}

fn user_json() -> serde_json::Value {
    serde_json::json!({
        "id": "u1",
        "email": "ana@example.com",
        "nombres": "Ana",
        "apellidos": "Quispe",
        "rol": "user"
    })
}

fn exam_bundle() -> serde_json::Value {
    let question = |id: &str, correct: &str| {
        serde_json::json!({
            "id": id,
            "enunciado": format!("Enunciado {id}"),
            "sustento": "",
            "componenteId": "c2",
            "opciones": (["A", "B", "C"].iter().map(|l| serde_json::json!({
                "id": format!("{id}-{l}"),
                "letra": l,
                "texto": format!("Opción {l}"),
                "esCorrecta": *l == correct
            })).collect::<Vec<_>>())
        })
    };
    serde_json::json!({
        "simulacro": {
            "id": "s1",
            "componenteId": "c2",
            "fechaInicio": "2024-05-01T10:00:00Z",
            "completado": false,
            "respuestas": []
        },
        "preguntas": [question("q1", "B"), question("q2", "C")]
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn take_exam_interactively() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simulacros/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(exam_bundle()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/simulacros/s1/responder/q1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/simulacros/s1/finalizar"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "simulacro": {
                "id": "s1",
                "componenteId": "c2",
                "fechaInicio": "2024-05-01T10:00:00Z",
                "completado": true
            },
            "puntaje": 50.0,
            "correctas": 1,
            "incorrectas": 0,
            "sinResponder": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    examprep(&home)
        .env("EXAMPREP_API_URL", server.uri())
        .env("EXAMPREP_TOKEN", "jwt")
        .args(["exam", "take", "s1"])
        .write_stdin("b\nn\nf\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pregunta 1 de 2"))
        .stdout(predicate::str::contains("Resultado del simulacro"))
        .stdout(predicate::str::contains("50%"))
        .stderr(predicate::str::contains("Las preguntas sin responder"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_session_reports_load_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/practicas/p404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "statusCode": 404,
            "message": "Práctica no encontrada"
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    examprep(&home)
        .env("EXAMPREP_API_URL", server.uri())
        .env("EXAMPREP_TOKEN", "jwt")
        .args(["practice", "take", "p404"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error al cargar práctica"))
        .stderr(predicate::str::contains("Práctica no encontrada"));
}
