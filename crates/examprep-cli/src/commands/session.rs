//! Interactive session loop shared by `exam take` and `practice take`.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use examprep_core::controller::{QuestionStatus, QuestionView, Reveal, Selection};
use examprep_core::error::ShellError;
use examprep_core::model::{FinalizeResult, OptionLabel, SessionMode};
use examprep_core::review::Outcome;
use examprep_core::shell::{FinishOutcome, Navigation, SessionShell, ShellState};
use examprep_core::traits::{
    ConfirmGate, FinalizePrompt, Notification, NotificationVariant, Notifier, SessionGateway,
};

/// Prints notifications to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.variant {
            NotificationVariant::Default => "*",
            NotificationVariant::Destructive => "!",
        };
        eprintln!(
            "{marker} {}: {}",
            notification.title, notification.description
        );
    }
}

/// Asks on stderr and reads `s`/`y` from stdin.
pub struct StdinConfirmGate;

impl ConfirmGate for StdinConfirmGate {
    fn confirm(&self, prompt: &FinalizePrompt) -> bool {
        eprintln!("{}", prompt.title());
        eprintln!("{}", prompt.description());
        match super::prompt_line("Confirmar [s/N]: ") {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

/// One line of user input in the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Select(OptionLabel),
    Next,
    Previous,
    /// One-based question number as typed.
    Jump(i64),
    Finish,
    Show,
    Help,
    Quit,
}

pub fn parse_action(line: &str) -> Option<Action> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(h, r)| (h, r.trim()));
    match head.to_lowercase().as_str() {
        "n" | "next" | "siguiente" => Some(Action::Next),
        "p" | "prev" | "anterior" => Some(Action::Previous),
        "j" | "jump" | "ir" => rest.parse().ok().map(Action::Jump),
        "f" | "finish" | "finalizar" => Some(Action::Finish),
        "" | "s" | "show" => Some(Action::Show),
        "h" | "?" | "help" => Some(Action::Help),
        "q" | "quit" | "salir" => Some(Action::Quit),
        other => other.parse().ok().map(Action::Select),
    }
}

/// Zero-based index for a typed question number. Never overflows.
fn question_index(number: i64) -> i64 {
    number.saturating_sub(1)
}

const HELP: &str = "a-e: responder  n: siguiente  p: anterior  j N: ir a la pregunta N  \
                    f: finalizar  s: mostrar  q: salir";

fn render(view: &QuestionView<'_>, navigator: &[QuestionStatus], answered: usize) -> String {
    let mut out = String::new();
    let badges: String = navigator
        .iter()
        .enumerate()
        .map(|(i, status)| match status {
            QuestionStatus::Current => format!("[{}]", i + 1),
            QuestionStatus::Answered => format!(" {}*", i + 1),
            QuestionStatus::Unanswered => format!(" {} ", i + 1),
        })
        .collect();
    out.push_str(&format!(
        "\nPregunta {} de {}  ({} respondidas)\n{badges}\n\n",
        view.index + 1,
        view.total,
        answered
    ));
    if view.shows_article_panel {
        out.push_str("(Lee el artículo asociado antes de responder)\n");
    }
    out.push_str(&view.question.prompt);
    out.push('\n');

    for option in &view.options {
        let pick = if option.selected { '>' } else { ' ' };
        let mark = match option.reveal {
            Some(Reveal::Correct) => " [correcta]",
            Some(Reveal::Incorrect) => " [incorrecta]",
            None => "",
        };
        out.push_str(&format!(
            "{pick} {}) {}{mark}\n",
            option.option.label, option.option.text
        ));
    }

    if let Some(feedback) = &view.feedback {
        let verdict = if feedback.is_correct {
            "¡Correcto!"
        } else {
            "Incorrecto"
        };
        out.push_str(&format!("\n{verdict}\n"));
        if !feedback.rationale.is_empty() {
            out.push_str(&format!("Sustento: {}\n", feedback.rationale));
        }
    }
    out
}

fn show(shell: &SessionShell) {
    let controller = shell.controller();
    print!(
        "{}",
        render(
            &shell.view(),
            &controller.navigator(),
            controller.answered_count()
        )
    );
    let _ = std::io::stdout().flush();
}

async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| super::prompt_line("> "))
        .await
        .context("stdin reader stopped")?
}

/// Open a session and run the prompt loop until it is finished or the user quits.
pub async fn run(
    gateway: Arc<dyn SessionGateway>,
    mode: SessionMode,
    session_id: &str,
) -> Result<Option<Navigation>> {
    let mut shell = SessionShell::open(gateway, Arc::new(ConsoleNotifier), mode, session_id)
        .await
        .map_err(super::shell_error)?;

    if shell.state() == ShellState::Done {
        println!("Este {} ya fue finalizado.", mode.label());
        return Ok(Some(match mode {
            SessionMode::Exam => Navigation::ResultPage {
                session_id: session_id.to_string(),
            },
            SessionMode::Practice => Navigation::SessionList(mode),
        }));
    }

    eprintln!("{HELP}");
    show(&shell);

    loop {
        let Some(line) = read_line().await? else {
            shell.settle().await;
            return Ok(None);
        };
        let Some(action) = parse_action(&line) else {
            eprintln!("Comando desconocido. {HELP}");
            continue;
        };

        match action {
            Action::Select(label) => match shell.select_label(label) {
                Ok(Selection::Recorded(_)) => {
                    if mode == SessionMode::Practice {
                        shell.settle().await;
                    }
                    show(&shell);
                }
                Ok(Selection::Unchanged) => {}
                Ok(Selection::Locked) => eprintln!("Esta pregunta ya fue respondida."),
                Err(ShellError::Session(e)) => eprintln!("{e}"),
                Err(e) => return Err(super::shell_error(e)),
            },
            Action::Next => {
                shell.next();
                show(&shell);
            }
            Action::Previous => {
                shell.previous();
                show(&shell);
            }
            Action::Jump(n) => {
                shell.jump_to(question_index(n));
                show(&shell);
            }
            Action::Show => show(&shell),
            Action::Help => eprintln!("{HELP}"),
            Action::Quit => {
                shell.settle().await;
                println!("Tu progreso quedó guardado.");
                return Ok(None);
            }
            Action::Finish => match shell.finish(&StdinConfirmGate).await {
                Ok(FinishOutcome::Cancelled) => show(&shell),
                Ok(FinishOutcome::Finished(navigation)) => {
                    if shell.submit_failures() > 0 {
                        eprintln!(
                            "! {} respuesta(s) no se pudieron guardar.",
                            shell.submit_failures()
                        );
                    }
                    return Ok(Some(navigation));
                }
                Err(ShellError::Finalize(e)) if !e.is_unauthorized() => {
                    eprintln!("Puedes intentar finalizar de nuevo con f.");
                }
                Err(e) => return Err(super::shell_error(e)),
            },
        }
    }
}

/// Print a result summary and, optionally, the question review.
pub fn print_result(result: &FinalizeResult, with_review: bool) {
    println!("\nResultado del simulacro");
    let component = result
        .session
        .component_kind()
        .map(|c| format!("{} {c}", c.glyph()))
        .unwrap_or_default();
    if !component.is_empty() {
        println!("{component}");
    }

    let mut table = Table::new();
    table.set_header(vec!["Puntaje", "Porcentaje", "Correctas", "Incorrectas", "Sin responder"]);
    table.add_row(vec![
        Cell::new(format!("{:.2}", result.score)),
        Cell::new(format!("{}%", result.percentage())),
        Cell::new(result.correct_count),
        Cell::new(result.incorrect_count),
        Cell::new(result.unanswered_count),
    ]);
    println!("{table}");

    if let Some(secs) = result.session.total_time {
        println!("Tiempo total: {}m {:02}s", secs / 60, secs % 60);
    }

    if !with_review {
        return;
    }
    for item in result.review() {
        let outcome = match item.outcome {
            Outcome::Correct => "correcta",
            Outcome::Incorrect => "incorrecta",
            Outcome::Unanswered => "sin responder",
        };
        println!("\n{}. {} ({outcome})", item.number, item.prompt);
        if let Some(selected) = item.selected {
            println!("   Tu respuesta: {selected}");
        }
        if let Some(correct) = item.correct {
            println!("   Respuesta correcta: {correct}");
        }
        if !item.rationale.is_empty() {
            println!("   Sustento: {}", item.rationale);
        }
    }
}
