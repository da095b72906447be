use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use iqms_sync::application::actions::{restore_cached, sync_all_classes};
use iqms_sync::application::counts::{fetch_faq_list, fetch_frequency_count};
use iqms_sync::application::orchestrator::{switch_role, SwitchProgress};
use iqms_sync::domain::error::IqmsError;
use iqms_sync::domain::model::QueryClass;
use iqms_sync::domain::role::ActiveRole;
use iqms_sync::infrastructure::config::{self, load_config};
use iqms_sync::interfaces::cli::{Cli, Command};
use iqms_sync::presentation::report::{format_status, format_summary};
use iqms_sync::presentation::theme::Theme;
use iqms_sync::state::AppState;
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        config::generate_config_sample()?;
        return Ok(());
    }

    let config = load_config()?;

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    let theme_name = cli.theme.as_deref().unwrap_or(config.theme.as_str());
    let theme = Theme::from_name(theme_name);
    let role = config::load_active_role(&config);
    let state = AppState::open(config.clone()).await?;

    // Ctrl-C cancels in-flight page requests and retry waits
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for shutdown signal: {}", e);
        } else {
            eprintln!("\nInterrupted, cancelling outstanding requests...");
            shutdown.cancel();
        }
    });

    match cli.command.unwrap_or(Command::Status) {
        Command::Sync { level } => {
            let level = level.unwrap_or(role.level);
            restore_cached(&state, &role).await?;

            let outcomes = sync_all_classes(&state, &role, level, |class, result| match result {
                Ok(fetch) => println!(
                    "{} {} {}",
                    "✔".green(),
                    class,
                    format!("{} on first page", fetch.first_page_item_count).cyan()
                ),
                Err(e) => println!("{} {} {}", "✘".red(), class, e.to_string().red()),
            })
            .await;

            for (class, outcome) in &outcomes {
                if let Err(e @ IqmsError::Task(_)) = outcome {
                    eprintln!("{} {} {}", "✘".red(), class, e.to_string().red());
                }
            }
            print_role_status(&state, &role, &theme, cli.json)?;
        }
        Command::SwitchRole {
            subsection,
            module,
            level,
            cells,
        } => {
            let next = ActiveRole {
                subsection,
                module,
                level,
                cells,
            };

            let pb = ProgressBar::hidden();
            let mut summary = switch_role(&state, Some(&role), &next, |event| match event {
                SwitchProgress::Started { total } => {
                    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                    pb.set_length(*total as u64);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} switching role [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("#>-"),
                    );
                }
                SwitchProgress::Task { name, ok, .. } => {
                    pb.inc(1);
                    let mark = if *ok { "✔" } else { "✘" };
                    pb.set_message(format!("{} {}", mark, name));
                }
                SwitchProgress::Finished => pb.finish_and_clear(),
            })
            .await?;

            print!("{}", format_summary(&summary, &theme));
            summary.wait_all().await;
            config::save_active_role(&config, &next)?;
            print_role_status(&state, &next, &theme, cli.json)?;
        }
        Command::Status => {
            restore_cached(&state, &role).await?;
            print_role_status(&state, &role, &theme, cli.json)?;
        }
        Command::Show { class, level } => {
            let key = role.key(level.unwrap_or(role.level))?;
            let cached = state.store_for(class).await.load(class.namespace()).await?;
            let items = cached.get(&key).cloned().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Clear => {
            clear_all(&state).await?;
            println!("{}", "Cache cleared".green());
        }
        Command::Faq => {
            let items = fetch_faq_list(&state, &state.shutdown).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("{} {}", (theme.title)("FAQ entries:"), items.len());
            }
        }
        Command::Frequency { level } => {
            let level = level.unwrap_or(role.level);
            let count = fetch_frequency_count(&state, &role, level, &state.shutdown).await?;
            println!(
                "{} {} {}",
                (theme.key)(&role.key(level)?),
                (theme.dim)("frequent queries:"),
                (theme.count)(&count.to_string())
            );
        }
    }

    Ok(())
}

/// Initialize logging with path and level configuration
fn init_logging(logging: &config::Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let level = match logging.level.as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "warn",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = &logging.path {
        if !path.is_empty() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .init();
            return Ok(());
        }
    }

    // Log to stderr (default)
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn print_role_status(
    state: &AppState,
    role: &ActiveRole,
    theme: &Theme,
    json: bool,
) -> anyhow::Result<()> {
    let keys = role.all_keys()?;
    let statuses: BTreeMap<_, _> = state
        .board
        .snapshot()
        .into_iter()
        .filter(|(board_key, _)| {
            board_key
                .split_once(':')
                .map(|(_, key)| keys.iter().any(|k| k == key))
                .unwrap_or(false)
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("{} {}", (theme.title)("IQMS"), (theme.dim)(&role.to_string()));
    println!("{}", (theme.line)(&"━".repeat(40)));
    print!("{}", format_status(&statuses, theme));
    Ok(())
}

async fn clear_all(state: &AppState) -> anyhow::Result<()> {
    for class in QueryClass::ALL {
        for store in [&state.stores.file, &state.stores.sqlite, &state.stores.memory] {
            store.clear(class.namespace()).await?;
        }
    }
    state.board.clear();
    Ok(())
}
