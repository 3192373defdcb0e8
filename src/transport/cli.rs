//! CLI handlers for the ecospatial binary

use crate::agent::{DispatcherConfig, ToolDispatcher};
use crate::config::{Config, Credentials};
use crate::core::ChatRole;
use crate::layers::{ActiveLayer, LayerKind};
use crate::llm::GeminiProvider;
use crate::places;
use crate::providers::ProviderSet;
use crate::session::{SessionController, SubmitOutcome};
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

/// Wire a session from config and environment credentials
pub fn build_session(config: &Config) -> SessionController {
    let credentials = Credentials::from_env();
    tracing::debug!("Credentials: {:?}", credentials);

    let llm = GeminiProvider::new(credentials.gemini_api_key.clone())
        .with_model(&config.agent.model)
        .with_max_tokens(config.agent.max_tokens);
    let has_key = llm.has_api_key();

    let providers = ProviderSet::from_config(&config.providers, &credentials);
    let dispatcher = ToolDispatcher::new(Arc::new(llm), providers, DispatcherConfig::from(config));

    let session = SessionController::new(Arc::new(dispatcher));
    if has_key {
        session
    } else {
        session.with_warning("agent unavailable: set GEMINI_API_KEY")
    }
}

fn print_warnings(session: &SessionController) {
    for warning in session.warnings() {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Replied(reply) => println!("\n{}\n", reply.content),
        SubmitOutcome::Failed { category, message } => {
            eprintln!("\n{} {} ({})\n", "error:".red().bold(), message, category)
        }
        SubmitOutcome::Superseded | SubmitOutcome::Ignored => {}
    }
}

/// Interactive conversation over stdin
pub async fn run_chat() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let session = build_session(&config);

    println!("{}", "ecospatial chat".bold().green());
    println!("Commands: /new, /layers, /history, /quit\n");
    print_warnings(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/new" => {
                session.new_conversation();
                println!("New conversation started.\n");
                continue;
            }
            "/layers" => {
                print_layers(&session.active_layers());
                continue;
            }
            "/history" => {
                for turn in session.messages() {
                    println!("{}: {}", role_prefix(turn.role), turn.content);
                }
                println!();
                continue;
            }
            _ => {}
        }

        let outcome = session.submit(input).await;
        print_outcome(&outcome);
        if matches!(outcome, SubmitOutcome::Replied(_)) && !session.active_layers().is_empty() {
            print_layers(&session.active_layers());
        }
    }

    Ok(())
}

/// One request, printed as text or JSON
pub async fn run_ask(message: &str, format: &str) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let session = build_session(&config);
    let outcome = session.submit(message).await;

    match format {
        "json" => {
            let (status, reply) = match &outcome {
                SubmitOutcome::Replied(reply) => ("replied", Some(reply.content.clone())),
                SubmitOutcome::Failed { message, .. } => ("failed", Some(message.clone())),
                SubmitOutcome::Superseded => ("superseded", None),
                SubmitOutcome::Ignored => ("ignored", None),
            };
            let output = serde_json::json!({
                "status": status,
                "reply": reply,
                "layers": session.active_layers(),
                "context": session.context(),
                "warnings": session.warnings(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            print_warnings(&session);
            print_outcome(&outcome);
            print_layers(&session.active_layers());
        }
    }

    if let SubmitOutcome::Failed { category, .. } = outcome {
        anyhow::bail!("request failed: {}", category);
    }
    Ok(())
}

/// Resolve a place name without touching the network
pub fn run_resolve(place: &str) -> Result<()> {
    let location = places::resolve(place)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&location).context("Failed to serialize location")?
    );
    Ok(())
}

/// List the supported layer kinds
pub fn run_layers() -> Result<()> {
    #[derive(Tabled)]
    struct KindRow {
        #[tabled(rename = "Kind")]
        kind: &'static str,
        #[tabled(rename = "Name")]
        name: &'static str,
        #[tabled(rename = "Source")]
        source: &'static str,
        #[tabled(rename = "WMS Layer")]
        wms: &'static str,
    }

    let rows: Vec<KindRow> = LayerKind::ALL
        .iter()
        .map(|kind| {
            let meta = kind.meta();
            KindRow {
                kind: kind.as_str(),
                name: meta.display_name,
                source: meta.source.map(|s| s.as_str()).unwrap_or("-"),
                wms: meta.wms_layer.unwrap_or("-"),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

fn print_layers(layers: &[ActiveLayer]) {
    if layers.is_empty() {
        println!("{}", "No active layers".dimmed());
        return;
    }

    #[derive(Tabled)]
    struct LayerRow {
        #[tabled(rename = "Layer")]
        name: String,
        #[tabled(rename = "Location")]
        location: String,
        #[tabled(rename = "Data")]
        data: String,
    }

    let rows: Vec<LayerRow> = layers
        .iter()
        .map(|layer| LayerRow {
            name: format!("{} ({})", layer.kind.meta().display_name, layer.kind),
            location: layer.bound_location.clone().unwrap_or_else(|| "-".into()),
            data: match (&layer.payload, layer.kind.is_data_bearing()) {
                (Some(payload), _) => payload.summary(),
                (None, true) => "데이터 없음".to_string(),
                (None, false) => "지도 레이어".to_string(),
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn role_prefix(role: ChatRole) -> colored::ColoredString {
    match role {
        ChatRole::User => "you".cyan().bold(),
        ChatRole::Assistant => "ecospatial".green().bold(),
    }
}
