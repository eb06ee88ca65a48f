use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bracket_engine::config::{AppConfig, TournamentConfig};
use bracket_engine::models::{Slot, Standing, TeamId};
use bracket_engine::{Summarizer, Tournament};

#[derive(Parser)]
#[command(name = "bracket-engine")]
#[command(about = "Tournament brackets, standings and end-of-event summaries")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a tournament, replay its results and report bracket state
    Check {
        /// Tournament definition (JSON, or TOML by extension)
        file: PathBuf,
    },

    /// Print the standings of one bracket
    Standings {
        file: PathBuf,

        /// Bracket index
        #[arg(long, default_value = "0")]
        bracket: usize,

        /// Count map results of sets still in progress
        #[arg(long)]
        live: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate the next swiss round and print its pairings
    NextRound {
        file: PathBuf,

        /// Bracket index
        #[arg(long)]
        bracket: usize,
    },

    /// Finalize a finished tournament and write its summary as JSON
    Summarize {
        file: PathBuf,

        /// Output path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_app_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn load_tournament(file: &Path, app: &AppConfig) -> Result<Tournament> {
    let config = TournamentConfig::from_file(file)
        .with_context(|| format!("Failed to load tournament {}", file.display()))?;
    let tournament = Tournament::from_config(&config, &app.defaults)
        .with_context(|| format!("Failed to replay results of {}", file.display()))?;
    Ok(tournament)
}

fn team_name(tournament: &Tournament, team_id: TeamId) -> String {
    tournament
        .team(team_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|_| format!("team {}", team_id))
}

fn slot_name(tournament: &Tournament, slot: Slot) -> String {
    match slot {
        Slot::Team(team_id) => team_name(tournament, team_id),
        Slot::Bye => "(bye)".to_string(),
        Slot::Pending => "(tbd)".to_string(),
    }
}

fn print_standings(tournament: &Tournament, standings: &[Standing]) {
    println!(
        "{:>4}  {:<24} {:>5} {:>7} {:>7} {:>6} {:>8}",
        "#", "Team", "Group", "Sets", "Maps", "Map %", "Buchholz"
    );
    for s in standings {
        let group = s.group_id.map(|g| g.label()).unwrap_or_default();
        let buchholz = s
            .stats
            .buchholz
            .map(|b| b.to_string())
            .unwrap_or_default();
        let name = if s.dropped_out {
            format!("{} (dropped)", team_name(tournament, s.team_id))
        } else {
            team_name(tournament, s.team_id)
        };
        println!(
            "{:>4}  {:<24} {:>5} {:>3}-{:<3} {:>3}-{:<3} {:>5.1}% {:>8}",
            s.placement,
            name,
            group,
            s.stats.set_wins,
            s.stats.set_losses,
            s.stats.map_wins,
            s.stats.map_losses,
            s.stats.map_win_rate() * 100.0,
            buchholz
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = load_app_config(Path::new(&cli.config))?;

    // Initialize tracing
    let level = cli.log_level.as_deref().unwrap_or(&app.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| fmt::layer().json()))
        .with((!cli.json_logs).then(fmt::layer))
        .init();

    tracing::info!("Starting bracket-engine v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check { file } => {
            let tournament = load_tournament(&file, &app)?;

            println!("\n=== {} ===", tournament.name);
            println!("Teams:    {}", tournament.teams().count());
            for bracket in tournament.brackets() {
                let decided = bracket.matches().iter().filter(|m| m.is_final()).count();
                let state = if bracket.is_finished() {
                    "finished"
                } else if bracket.is_started() {
                    "in progress"
                } else {
                    "not started"
                };
                println!(
                    "[{}] {:<20} {:<28} {:>3} teams  {:>3}/{:<3} matches  {}",
                    bracket.idx,
                    bracket.name,
                    bracket.format.to_string(),
                    bracket.entrants().len(),
                    decided,
                    bracket.matches().len(),
                    state
                );
            }
            if tournament.is_finished() {
                println!("\nAll brackets finished; ready to summarize.");
            }
        }

        Commands::Standings {
            file,
            bracket,
            live,
            json,
        } => {
            let tournament = load_tournament(&file, &app)?;
            let standings = tournament.current_standings(bracket, live)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&standings)?);
            } else {
                let name = &tournament.bracket_by_idx(bracket)?.name;
                println!("\n=== {} ===", name);
                print_standings(&tournament, &standings);
            }
        }

        Commands::NextRound { file, bracket } => {
            let mut tournament = load_tournament(&file, &app)?;
            let ids = tournament.next_round(bracket)?;
            let current = tournament.bracket_by_idx(bracket)?;

            println!("\n=== {} ===", current.name);
            for id in ids {
                let m = current.match_by_id(id)?;
                println!(
                    "Round {} match {}: {} vs {}",
                    m.round,
                    m.id,
                    slot_name(&tournament, m.opponents[0]),
                    slot_name(&tournament, m.opponents[1])
                );
            }
        }

        Commands::Summarize { file, output } => {
            let mut tournament = load_tournament(&file, &app)?;
            let summary = tournament.finalize(&Summarizer::default())?;
            let json = serde_json::to_string_pretty(&summary)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Summary written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
