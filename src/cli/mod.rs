//! Talent Retention CLI Module
//!
//! Command-line interface for training, batch prediction, bundle inspection,
//! serving and the interactive prediction form.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::export::ArtifactBundle;
use crate::inference::{probability_chart, FieldDescriptor, JobChangeLabel, Prediction, Predictor};
use crate::preprocessing::{ColumnType, RawRecord, RawValue};
use crate::security::{CredentialStore, InMemoryCredentialStore, SessionManager};
use crate::training::{BoosterConfig, Trainer, TrainingConfig};
use crate::utils::{DataLoader, DataSaver};

/// File name of the persisted bundle
pub const BUNDLE_FILE: &str = "model_bundle.json";
/// File name of the standalone encoder export
pub const ENCODERS_FILE: &str = "encoders.json";

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width
const BAR_WIDTH: usize = 40;

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Horizontal bar of `value` (0..=1) scaled to `width` cells
fn text_bar(value: f64, width: usize) -> String {
    let filled = (value.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "retention")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Employee job-change prediction: train, predict, serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model and write the artifact bundle
    Train {
        /// Training CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Binary target column
        #[arg(short, long, default_value = "target")]
        target: String,

        /// Identifier column kept in the schema but never used as a signal
        #[arg(long, default_value = "enrollee_id")]
        identifier: String,

        /// Output directory for the bundle and encoder export
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Seed for the split and the booster
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Holdout fraction
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Number of boosted trees
        #[arg(long, default_value = "200")]
        n_estimators: usize,
    },

    /// Predict every row of a CSV file
    Predict {
        /// Artifact bundle
        #[arg(short, long, default_value = BUNDLE_FILE)]
        bundle: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV with prediction and probability columns
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the schema, encoder tables and metrics of a bundle
    Inspect {
        /// Artifact bundle
        #[arg(short, long, default_value = BUNDLE_FILE)]
        bundle: PathBuf,
    },

    /// Start the prediction server
    Serve {
        /// Artifact bundle
        #[arg(short, long, default_value = BUNDLE_FILE)]
        bundle: PathBuf,

        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// JSON file of username -> password
        #[arg(long)]
        users: Option<PathBuf>,
    },

    /// Log in and fill the prediction form in the terminal
    Interactive {
        /// Artifact bundle
        #[arg(short, long, default_value = BUNDLE_FILE)]
        bundle: PathBuf,

        /// JSON file of username -> password
        #[arg(long)]
        users: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub struct TrainArgs<'a> {
    pub data: &'a Path,
    pub target: &'a str,
    pub identifier: &'a str,
    pub output: &'a Path,
    pub seed: u64,
    pub test_size: f64,
    pub n_estimators: usize,
}

pub fn cmd_train(args: TrainArgs<'_>) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let identifier = Some(args.identifier.to_string()).filter(|s| !s.is_empty());
    let config = TrainingConfig::new(args.target)
        .with_identifier(identifier)
        .with_test_size(args.test_size)
        .with_booster(BoosterConfig::default().with_n_estimators(args.n_estimators))
        .with_random_state(args.seed);

    step_run(&format!("Boosting {} trees", args.n_estimators.to_string().cyan()));
    let start = Instant::now();
    let bundle = Trainer::new(config).fit(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    std::fs::create_dir_all(args.output)?;
    let bundle_path = args.output.join(BUNDLE_FILE);
    let encoders_path = args.output.join(ENCODERS_FILE);

    step_run(&format!("Saving → {}", bundle_path.display()));
    bundle.save(&bundle_path)?;
    bundle.export_encoders(&encoders_path)?;
    step_done(&format!("+ {}", ENCODERS_FILE));

    let m = &bundle.metadata.metrics;
    println!();
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", m.accuracy).white().bold());
    println!("  {:<16} {}", muted("Precision"), format!("{:.4}", m.precision).white());
    println!("  {:<16} {}", muted("Recall"), format!("{:.4}", m.recall).white());
    println!("  {:<16} {}", muted("F1"), format!("{:.4}", m.f1_score).white());
    println!("  {:<16} {}", muted("Log-loss"), format!("{:.4}", m.log_loss).white());
    println!("  {:<16} {}", muted("Holdout rows"), m.n_samples.to_string().white());
    println!("  {:<16} {}", muted("Schema hash"), dim(&bundle.schema_hash));
    println!();

    Ok(())
}

/// Input table with `prediction` and `probability` columns appended
fn with_predictions(mut df: DataFrame, predictions: &[Prediction]) -> anyhow::Result<DataFrame> {
    let labels: Vec<i32> = predictions.iter().map(|p| p.label.as_class() as i32).collect();
    let probabilities: Vec<f64> = predictions.iter().map(|p| p.probability).collect();
    df.with_column(Series::new("prediction".into(), labels))?;
    df.with_column(Series::new("probability".into(), probabilities))?;
    Ok(df)
}

pub fn cmd_predict(bundle_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading bundle");
    let predictor = Predictor::load(bundle_path)?;
    step_done(&format!("{} features", predictor.bundle().schema.len()));

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows", df.height()));

    step_run("Scoring");
    let start = Instant::now();
    let predictions = predictor.predict_frame(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    let changers = predictions.iter().filter(|p| p.label == JobChangeLabel::WillChange).count();
    let mean_p = predictions.iter().map(|p| p.probability).sum::<f64>() / predictions.len().max(1) as f64;

    println!();
    println!("  {:<20} {}", muted("Rows"), predictions.len().to_string().white());
    println!("  {:<20} {}", muted(&JobChangeLabel::WillChange.to_string()), changers.to_string().white().bold());
    println!("  {:<20} {}", muted(&JobChangeLabel::WillStay.to_string()), (predictions.len() - changers).to_string().white());
    println!("  {:<20} {}", muted("Mean probability"), format!("{:.2}%", mean_p * 100.0).white());

    if let Some(path) = output {
        let mut out = with_predictions(df, &predictions)?;
        DataSaver::save_csv(&mut out, path)?;
        println!("  {:<20} {}", muted("Written"), path.display().to_string().white());
    }
    println!();

    Ok(())
}

pub fn cmd_inspect(bundle_path: &Path) -> anyhow::Result<()> {
    let bundle = ArtifactBundle::load(bundle_path)?;

    section("Bundle");
    println!("  {:<16} {}", muted("Format"), bundle.format_version);
    println!("  {:<16} {}", muted("Created"), bundle.created_at.to_rfc3339());
    println!("  {:<16} {}", muted("Schema hash"), dim(&bundle.schema_hash));
    println!("  {:<16} {}", muted("Trees"), bundle.classifier.n_trees());

    section("Schema");
    for (i, column) in bundle.schema.columns().iter().enumerate() {
        let kind = if bundle.schema.is_identifier(column) {
            "identifier".to_string()
        } else {
            match ColumnType::of(column, &bundle.encoders) {
                ColumnType::Categorical => "categorical".to_string(),
                ColumnType::Numeric => "numeric".to_string(),
            }
        };
        let importance = bundle.metadata.feature_importances.get(column).copied().unwrap_or(0.0);
        println!("  {:>3}  {:<28} {:<12} {}", dim(&i.to_string()), column.white(), muted(&kind), dim(&format!("{:.3}", importance)));
    }

    section("Encoders");
    for (column, encoder) in bundle.encoders.iter() {
        let table: Vec<String> = encoder
            .classes()
            .iter()
            .enumerate()
            .map(|(code, class)| format!("{}={}", class, code))
            .collect();
        println!("  {:<28} {}", column.white(), muted(&table.join(", ")));
    }

    let m = &bundle.metadata.metrics;
    section("Holdout metrics");
    println!("  {:<16} {:.4}", muted("Accuracy"), m.accuracy);
    println!("  {:<16} {:.4}", muted("Precision"), m.precision);
    println!("  {:<16} {:.4}", muted("Recall"), m.recall);
    println!("  {:<16} {:.4}", muted("F1"), m.f1_score);
    println!("  {:<16} {:.4}", muted("Log-loss"), m.log_loss);
    println!();

    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(bundle: &Path, host: &str, port: u16, users: Option<&Path>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Talent Retention".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}:{}/api", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box(&kv("Bundle ", &bundle.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: host.to_string(),
        port,
        bundle_path: bundle.display().to_string(),
        users_file: users.map(|p| p.display().to_string()).or(defaults.users_file),
        session_ttl_secs: defaults.session_ttl_secs,
    };

    run_server(config).await
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "Employee Retention Prediction".truecolor(120, 170, 255).bold());
    println!("       {}", dim(&format!("gradient-boosted job change model  ·  v{}", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn credential_store(users: Option<&Path>) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store = match users {
        Some(path) => InMemoryCredentialStore::from_file(path)?,
        None => InMemoryCredentialStore::with_default_admin(),
    };
    Ok(Arc::new(store))
}

fn theme() -> dialoguer::theme::ColorfulTheme {
    use dialoguer::console::{style, Style};
    dialoguer::theme::ColorfulTheme {
        active_item_prefix: style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().white().bold(),
        inactive_item_prefix: style("   ".to_string()).for_stderr(),
        inactive_item_style: Style::new().for_stderr().color256(245),
        prompt_prefix: style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: Style::new().for_stderr().white().bold(),
        ..dialoguer::theme::ColorfulTheme::default()
    }
}

/// Prompt for one value per form field
fn prompt_record(theme: &dialoguer::theme::ColorfulTheme, fields: &[FieldDescriptor]) -> anyhow::Result<RawRecord> {
    use dialoguer::{Input, Select};

    let mut record = RawRecord::new();
    for field in fields {
        let value = match field.kind {
            ColumnType::Categorical => {
                let choice = Select::with_theme(theme)
                    .with_prompt(&field.name)
                    .items(&field.options)
                    .default(0)
                    .interact()?;
                RawValue::Text(field.options[choice].clone())
            }
            ColumnType::Numeric => {
                let n: f64 = Input::with_theme(theme)
                    .with_prompt(&field.name)
                    .default(0.0)
                    .interact_text()?;
                RawValue::Number(n)
            }
        };
        record.insert(field.name.clone(), value);
    }
    Ok(record)
}

fn print_prediction(prediction: &Prediction) {
    section("Result");
    match prediction.label {
        JobChangeLabel::WillChange => println!("  {} {}", "✗".red(), prediction.label.to_string().red().bold()),
        JobChangeLabel::WillStay => println!("  {} {}", ok("✓"), prediction.label.to_string().white().bold()),
    }
    println!("  {:<28} {}", muted("Probability of Job Change"), format!("{:.2}%", prediction.probability * 100.0).white().bold());
    println!();
    for bar in probability_chart(prediction) {
        println!("  {:<12} {} {}", muted(&bar.label), accent(&text_bar(bar.value, BAR_WIDTH)), dim(&format!("{:.2}", bar.value)));
    }
}

fn login_prompt(theme: &dialoguer::theme::ColorfulTheme, sessions: &SessionManager) -> anyhow::Result<Option<String>> {
    use dialoguer::{Input, Password};

    let username: String = Input::with_theme(theme).with_prompt("Username").interact_text()?;
    let password = Password::with_theme(theme).with_prompt("Password").interact()?;
    match sessions.login(&username, &password) {
        Ok(session) => {
            println!("  {} {}", ok("✓"), "Login successful");
            Ok(Some(session.token))
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            Ok(None)
        }
    }
}

fn signup_prompt(theme: &dialoguer::theme::ColorfulTheme, sessions: &SessionManager) -> anyhow::Result<()> {
    use dialoguer::{Input, Password};

    let username: String = Input::with_theme(theme).with_prompt("Create Username").interact_text()?;
    let password = Password::with_theme(theme).with_prompt("Create Password").interact()?;
    let confirm = Password::with_theme(theme).with_prompt("Confirm Password").interact()?;
    match sessions.signup(&username, &password, &confirm) {
        Ok(()) => println!("  {} {}", ok("✓"), "Account created successfully"),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    Ok(())
}

pub fn cmd_interactive(bundle: &Path, users: Option<&Path>) -> anyhow::Result<()> {
    use dialoguer::Select;

    print_banner();

    let predictor = Predictor::load(bundle)?;
    let sessions = SessionManager::new(credential_store(users)?);
    let fields = predictor.form_fields();
    let theme = theme();

    loop {
        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("Welcome")
            .items(&["Login", "Signup", "Exit"])
            .default(0)
            .interact_opt()?;

        let token = match sel {
            Some(0) => match login_prompt(&theme, &sessions)? {
                Some(token) => token,
                None => continue,
            },
            Some(1) => {
                signup_prompt(&theme, &sessions)?;
                continue;
            }
            _ => break,
        };

        let username = sessions.authenticate(&token)?;
        section(&format!("Enter Employee Details  ·  {}", username));

        loop {
            let record = prompt_record(&theme, &fields)?;
            match predictor.predict(&record) {
                Ok(prediction) => print_prediction(&prediction),
                Err(e) => println!("  {} {}", "✗".red(), e),
            }

            println!();
            let next = Select::with_theme(&theme)
                .with_prompt("Next")
                .items(&["Predict again", "Logout"])
                .default(0)
                .interact_opt()?;
            if next != Some(0) {
                sessions.logout(&token);
                break;
            }
        }
    }

    println!();
    println!("  {}", dim("goodbye"));
    println!();
    Ok(())
}
