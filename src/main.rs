use clap::{Parser, Subcommand};
use habit_tracker::ai::{AnthropicClient, LanguageModel};
use habit_tracker::dates::today;
use habit_tracker::seed::{clear_all_data, seed_sample_data};
use habit_tracker::storage::{clear_data, persist_namespace, Namespace};
use habit_tracker::{load_data, persist_all, router, AppState, Config};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "habit_tracker")]
#[command(about = "Habit tracking service with streaks, journal and coaching")]
struct Cli {
    /// Directory holding the JSON snapshots
    #[arg(short, long, env = "APP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Replace habits, check-ins and journal entries with sample data
    Seed,
    /// Delete every stored namespace
    Reset,
    /// Rebuild the streak cache and print it
    Recompute,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().with_data_dir(cli.data_dir);
    fs::create_dir_all(&config.data_dir).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Seed => {
            let mut data = load_data(&config.data_dir, today()).await;
            let summary = seed_sample_data(
                &mut data,
                today(),
                chrono::Utc::now(),
                &mut rand::thread_rng(),
            );
            persist_all(&config.data_dir, &data).await?;
            println!(
                "seeded {} habits, {} check-ins, {} journal entries",
                summary.habits, summary.check_ins, summary.journal_entries
            );
            Ok(())
        }
        Command::Reset => {
            let mut data = load_data(&config.data_dir, today()).await;
            clear_all_data(&mut data);
            clear_data(&config.data_dir).await?;
            println!("cleared {}", config.data_dir.display());
            Ok(())
        }
        Command::Recompute => {
            let data = load_data(&config.data_dir, today()).await;
            persist_namespace(&config.data_dir, Namespace::Habits, &data).await?;
            for habit in data.habits.habits() {
                if let Some(streak) = data.habits.streak(&habit.id) {
                    println!(
                        "{}: current {} longest {} total {}",
                        habit.name,
                        streak.current_streak,
                        streak.longest_streak,
                        streak.total_completions
                    );
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let data = load_data(&config.data_dir, today()).await;

    let mut client = AnthropicClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    )?;
    if let Some(endpoint) = &config.anthropic_endpoint {
        client = client.with_endpoint(endpoint.clone());
    }
    if !client.has_api_key() {
        warn!("ANTHROPIC_API_KEY is not set; AI features will report failures");
    }
    let model: Arc<dyn LanguageModel> = Arc::new(client);

    let state = AppState::new(config.data_dir.clone(), data, model);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
