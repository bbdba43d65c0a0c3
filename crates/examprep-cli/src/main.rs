//! examprep CLI — mock exams and practice sessions from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use examprep_core::model::Component;

mod commands;

#[derive(Parser)]
#[command(
    name = "examprep",
    version,
    about = "Mock exams and practice sessions for the admission test"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter examprep.toml
    Init,

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account; a verification code is sent by SMS
    Register {
        #[arg(long)]
        email: String,

        /// Given names
        #[arg(long)]
        first_names: String,

        /// Family names
        #[arg(long)]
        last_names: String,

        /// Phone number, digits only
        #[arg(long)]
        phone: String,

        /// Calling code, e.g. +591
        #[arg(long, default_value = examprep_core::validation::DEFAULT_COUNTRY_CODE)]
        country_code: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,

        /// Defaults to the password
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Confirm the phone number with the 6-digit code
    Verify {
        /// Full phone number including calling code
        #[arg(long)]
        phone: String,

        #[arg(long)]
        code: String,
    },

    /// Send a new verification code
    ResendOtp {
        #[arg(long)]
        phone: String,
    },

    /// Forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Change the account password
    Password {
        #[arg(long)]
        current: Option<String>,

        #[arg(long)]
        new: Option<String>,
    },

    /// List evaluation components
    Components,

    /// Mock exams
    #[command(subcommand)]
    Exam(ExamCommand),

    /// Practice sessions
    #[command(subcommand)]
    Practice(PracticeCommand),

    /// Statistics and score history
    Progress,
}

#[derive(Subcommand)]
enum ExamCommand {
    /// Start a new mock exam
    Start {
        /// comprension, razonamiento, conocimientos or habilidades
        component: Component,

        /// Open the exam right away
        #[arg(long)]
        take: bool,
    },

    /// Answer an exam interactively
    Take { id: String },

    /// Show the result of a finished exam
    Result {
        id: String,

        /// Include the per-question review
        #[arg(long)]
        review: bool,
    },

    /// List past exams
    History,
}

#[derive(Subcommand)]
enum PracticeCommand {
    /// List articles and topics to practice
    Catalog {
        /// Only this component
        component: Option<Component>,
    },

    /// Start a practice session
    Start {
        component: Component,

        /// Reading-comprehension article id
        #[arg(long)]
        article: Option<String>,

        /// Topic id
        #[arg(long)]
        topic: Option<String>,

        /// Reasoning subtopic id
        #[arg(long)]
        subtopic: Option<String>,

        /// Only questions marked for practice
        #[arg(long)]
        practice_only: bool,

        /// Open the session right away
        #[arg(long)]
        take: bool,
    },

    /// Answer a practice session interactively
    Take { id: String },

    /// List past practice sessions
    History,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examprep=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Login { email, password } => {
            commands::auth::login(config, email, password).await
        }
        Commands::Register {
            email,
            first_names,
            last_names,
            phone,
            country_code,
            password,
            confirm_password,
        } => {
            commands::auth::register(
                config,
                commands::auth::RegisterArgs {
                    email,
                    first_names,
                    last_names,
                    phone,
                    country_code,
                    password,
                    confirm_password,
                },
            )
            .await
        }
        Commands::Verify { phone, code } => commands::auth::verify(config, phone, code).await,
        Commands::ResendOtp { phone } => commands::auth::resend_otp(config, phone).await,
        Commands::Logout => commands::auth::logout(config),
        Commands::Whoami => commands::auth::whoami(config).await,
        Commands::Password { current, new } => {
            commands::auth::change_password(config, current, new).await
        }
        Commands::Components => commands::catalog::components(config).await,
        Commands::Exam(cmd) => match cmd {
            ExamCommand::Start { component, take } => {
                commands::exam::start(config, component, take).await
            }
            ExamCommand::Take { id } => commands::exam::take(config, id).await,
            ExamCommand::Result { id, review } => commands::exam::result(config, id, review).await,
            ExamCommand::History => commands::exam::history(config).await,
        },
        Commands::Practice(cmd) => match cmd {
            PracticeCommand::Catalog { component } => {
                commands::catalog::practice_catalog(config, component).await
            }
            PracticeCommand::Start {
                component,
                article,
                topic,
                subtopic,
                practice_only,
                take,
            } => {
                commands::practice::start(
                    config,
                    commands::practice::StartArgs {
                        component,
                        article,
                        topic,
                        subtopic,
                        practice_only,
                        take,
                    },
                )
                .await
            }
            PracticeCommand::Take { id } => commands::practice::take(config, id).await,
            PracticeCommand::History => commands::practice::history(config).await,
        },
        Commands::Progress => commands::progress::execute(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
