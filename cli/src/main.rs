mod storage;
mod transport;


use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use meal_planner::config::{ApiConfig, ConfigError};
use meal_planner::flows::{self, MealPlanEvent, SubmitOutcome};
use meal_planner::forms::{FormError, LoginForm, MealPlanForm, RegisterForm};
use meal_planner::net::ApiClient;
use meal_planner::net::types::MealPlan;
use meal_planner::routes::{self, Navigation, Route};
use meal_planner::session::{Session, TokenStorage};
use meal_planner::state::meal_plans::{EMPTY_MESSAGE, LOADING_MESSAGE};
use meal_planner::state::{DashboardView, MealPlansState};
use tracing_subscriber::EnvFilter;

use crate::storage::{FileStorage, default_token_path};
use crate::transport::ReqwestTransport;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("not logged in; run `meal-planner-cli login` first")]
    NotLoggedIn,
    #[error("no token file location; pass --token-file or set MEAL_PLANNER_TOKEN_FILE")]
    NoTokenFile,
    #[error("{0}")]
    Rejected(String),
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "meal-planner-cli", about = "Meal planner API command-line client")]
struct Cli {
    /// API base URL; falls back to `MEAL_PLANNER_API_URL`, then the default.
    #[arg(long)]
    api_url: Option<String>,

    /// Defaults to `meal-planner/session.json` under the user config dir.
    #[arg(long, env = "MEAL_PLANNER_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Status,
    Plans(PlansCommand),
}

#[derive(Args, Debug)]
struct PlansCommand {
    #[command(subcommand)]
    command: PlansSubcommand,
}

#[derive(Subcommand, Debug)]
enum PlansSubcommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Create {
        #[arg(long)]
        week_start: String,
        /// `Day=meal, meal`; repeat once per day.
        #[arg(long = "meals", value_parser = parse_day_meals)]
        meals: Vec<(String, String)>,
    },
}

type CliApi = ApiClient<ReqwestTransport>;
type CliSession = Session<FileStorage>;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = match cli.api_url.as_deref() {
        Some(raw) => ApiConfig::from_value(Some(raw))?,
        None => ApiConfig::from_env()?,
    };
    let token_file = cli.token_file.or_else(default_token_path).ok_or(CliError::NoTokenFile)?;
    let session = Session::new(FileStorage::new(token_file));
    let api = ApiClient::new(config, ReqwestTransport::new(), session.token_provider());
    tracing::debug!(api = api.config().base_url(), token_file = %session.store().storage().path().display(), "cli configured");

    match cli.command {
        Command::Register { username, email, password } => {
            let form = RegisterForm { username, email, password };
            finish(flows::submit_register(&api, &form).await)
        }
        Command::Login { username, password } => {
            let form = LoginForm { username, password };
            finish(flows::submit_login(&api, &session, &form).await)
        }
        Command::Logout => {
            flows::logout(&session);
            println!("Logged out");
            Ok(())
        }
        Command::Status => {
            println!("{}", status_line(&session));
            Ok(())
        }
        Command::Plans(plans) => run_plans(&api, &session, plans).await,
    }
}

async fn run_plans(api: &CliApi, session: &CliSession, plans: PlansCommand) -> Result<(), CliError> {
    require_login(session)?;
    match plans.command {
        PlansSubcommand::List { json } => {
            let mut state = MealPlansState::default();
            state.apply_fetch(api.list_meal_plans().await);
            if let DashboardView::Error(message) = state.view() {
                return Err(CliError::Rejected(message.to_owned()));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&state.items)?);
            } else {
                println!("{}", render_plans(&state));
            }
            Ok(())
        }
        PlansSubcommand::Create { week_start, meals } => {
            let form = build_meal_plan_form(week_start, &meals)?;
            let outcome = flows::submit_meal_plan(api, &form).await;
            let Some(MealPlanEvent::Created(plan)) = outcome.event else {
                return Err(CliError::Rejected(outcome.message));
            };
            println!("{}", outcome.message);
            if let Some(plan) = plan {
                println!("{}", render_plan(&plan));
            }
            Ok(())
        }
    }
}

/// Print the outcome message; an outcome without a redirect is a failure.
fn finish(outcome: SubmitOutcome) -> Result<(), CliError> {
    if outcome.redirect.is_none() {
        return Err(CliError::Rejected(outcome.message));
    }
    println!("{}", outcome.message);
    Ok(())
}

/// Run the dashboard guard against the stored session.
fn require_login<S: TokenStorage>(session: &Session<S>) -> Result<(), CliError> {
    match routes::guard(Route::Dashboard, session.state()) {
        Navigation::Render(_) => Ok(()),
        Navigation::Redirect(_) => Err(CliError::NotLoggedIn),
    }
}

fn status_line<S: TokenStorage>(session: &Session<S>) -> &'static str {
    if session.is_authenticated() { "logged in" } else { "not logged in" }
}

fn parse_day_meals(raw: &str) -> Result<(String, String), String> {
    let (day, meals) = raw.split_once('=').ok_or_else(|| format!("expected DAY=MEALS, got '{raw}'"))?;
    let day = day.trim();
    if day.is_empty() {
        return Err(format!("missing day name in '{raw}'"));
    }
    Ok((day.to_owned(), meals.to_owned()))
}

fn build_meal_plan_form(week_start: String, meals: &[(String, String)]) -> Result<MealPlanForm, FormError> {
    let mut form = MealPlanForm::new();
    form.week_start = week_start;
    for (day, text) in meals {
        form.set_day_text_by_name(day, text.as_str())?;
    }
    Ok(form)
}

fn render_plan(plan: &MealPlan) -> String {
    format!("Week Starting: {}\n{}", plan.week_start, plan.meals_pretty())
}

fn render_plans(state: &MealPlansState) -> String {
    match state.view() {
        DashboardView::Plans(plans) => plans.iter().map(render_plan).collect::<Vec<_>>().join("\n\n"),
        DashboardView::Empty => EMPTY_MESSAGE.to_owned(),
        DashboardView::Loading => LOADING_MESSAGE.to_owned(),
        DashboardView::Error(message) => message.to_owned(),
    }
}
