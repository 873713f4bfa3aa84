use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monrad_arbiter::commands::{Command, Executed, Session};
use monrad_arbiter::config::AppConfig;
use monrad_arbiter::models::{Outcome, PlayerNumber, Round, BYE_NAME, BYE_NUMBER};
use monrad_arbiter::storage::CommandJournal;
use monrad_arbiter::tournament::{Match, NewPlayer, Phase, PlayerUpdate};

#[derive(Parser)]
#[command(name = "monrad-arbiter")]
#[command(about = "Swiss/Monrad competition administrator")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./arbiter.toml")]
    config: PathBuf,

    /// Match journal (defaults to `match_file` from the config)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
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
    /// Create a new match, replacing any existing journal
    New {
        /// Match name
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        organizer: String,

        /// Number of rounds (default from the config)
        #[arg(long)]
        rounds: Option<u32>,
    },

    /// Add a contestant
    AddPlayer {
        name: String,

        #[arg(long, default_value = "")]
        organization: String,

        #[arg(long, default_value = "")]
        note: String,

        /// Preferred contestant number
        #[arg(long)]
        number: Option<PlayerNumber>,
    },

    /// Change a contestant's identity
    UpdatePlayer {
        number: PlayerNumber,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        organization: Option<String>,

        #[arg(long)]
        note: Option<String>,

        /// Renumber the contestant
        #[arg(long)]
        new_number: Option<PlayerNumber>,
    },

    /// Remove a contestant
    RemovePlayer { number: PlayerNumber },

    /// Remove every contestant
    ClearPlayers,

    /// Start the match and pair round 1
    Start,

    /// Lock the current pairing and start playing
    StartRound {
        /// Round number (default: current)
        #[arg(long)]
        round: Option<u32>,
    },

    /// Record a result: + (red wins), - (black wins), = (draw), ? (unresolved)
    Result {
        table: u32,

        #[arg(allow_hyphen_values = true)]
        outcome: Outcome,

        #[arg(long)]
        round: Option<u32>,
    },

    /// Close the current round and pair the next one
    EndRound {
        #[arg(long)]
        round: Option<u32>,
    },

    /// Exchange two contestants in the current pairing
    Swap {
        table: u32,
        current: PlayerNumber,
        with: PlayerNumber,
    },

    /// Discard manual pairing changes
    ResetPairing,

    /// Show the match and the current round
    Show {
        /// Show a closed round instead
        #[arg(long)]
        round: Option<u32>,
    },

    /// Show the standings
    Standings,

    /// Verify the journal and replay it
    Verify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::debug!("Starting monrad-arbiter v{}", env!("CARGO_PKG_VERSION"));

    let path = cli.file.clone().unwrap_or_else(|| config.match_file.clone());

    match cli.command {
        Commands::New {
            name,
            organizer,
            rounds,
        } => {
            let mut session = Session::new();
            let setup = [
                Command::SetName { name },
                Command::SetOrganizer { organizer },
                Command::SetTotalRounds {
                    total_rounds: rounds.unwrap_or(config.rounds.default_total),
                },
                Command::SetScoring {
                    scoring: config.scoring.rules(),
                },
            ];
            for command in setup {
                session
                    .execute(command)
                    .context("Invalid match settings")?;
            }
            session
                .save_as(&path)
                .with_context(|| format!("Failed to write {:?}", path))?;

            println!("Created match \"{}\" in {:?}", session.current().name(), path);
        }

        Commands::AddPlayer {
            name,
            organization,
            note,
            number,
        } => {
            let player = NewPlayer {
                name,
                organization,
                note,
                number,
            };
            let m = run(&path, Command::AddPlayer { player })?;
            print_roster(&m);
        }

        Commands::UpdatePlayer {
            number,
            name,
            organization,
            note,
            new_number,
        } => {
            let (session, _) = open(&path)?;
            let existing = session
                .current()
                .player(number)
                .with_context(|| format!("No contestant {}", number))?;
            let update = PlayerUpdate {
                number: new_number.unwrap_or(number),
                name: name.unwrap_or_else(|| existing.name.clone()),
                organization: organization.unwrap_or_else(|| existing.organization.clone()),
                note: note.unwrap_or_else(|| existing.note.clone()),
            };
            let m = run(&path, Command::UpdatePlayer { number, update })?;
            print_roster(&m);
        }

        Commands::RemovePlayer { number } => {
            let m = run(&path, Command::RemovePlayer { number })?;
            print_roster(&m);
        }

        Commands::ClearPlayers => {
            run(&path, Command::RemoveAllPlayers)?;
            println!("Roster cleared");
        }

        Commands::Start => {
            let m = run(&path, Command::StartMatch)?;
            print_match(&m);
        }

        Commands::StartRound { round } => {
            let round = resolve_round(&path, round)?;
            let m = run(&path, Command::StartRound { round })?;
            print_match(&m);
        }

        Commands::Result {
            table,
            outcome,
            round,
        } => {
            let round = resolve_round(&path, round)?;
            let m = run(
                &path,
                Command::RecordResult {
                    round,
                    table,
                    outcome,
                },
            )?;
            print_match(&m);
        }

        Commands::EndRound { round } => {
            let round = resolve_round(&path, round)?;
            let (mut session, mut journal) = open(&path)?;
            match session.execute_and_persist(&mut journal, Command::EndRound { round })? {
                Executed::Recorded => print_match(session.current()),
                Executed::Pending { unresolved } => {
                    println!(
                        "Round {} cannot end yet: {} game(s) without a result",
                        round, unresolved
                    );
                }
            }
        }

        Commands::Swap {
            table,
            current,
            with,
        } => {
            let m = run(
                &path,
                Command::SwapPlayers {
                    table,
                    current,
                    with,
                },
            )?;
            print_match(&m);
        }

        Commands::ResetPairing => {
            let m = run(&path, Command::ResetPairing)?;
            print_match(&m);
        }

        Commands::Show { round } => {
            let (session, _) = open(&path)?;
            let m = session.current();
            match round {
                Some(number) => {
                    let round = m
                        .round(number)
                        .with_context(|| format!("Round {} has not been paired", number))?;
                    print_round(m, round);
                }
                None => print_match(m),
            }
        }

        Commands::Standings => {
            let (session, _) = open(&path)?;
            print_standings(session.current());
        }

        Commands::Verify => {
            let (session, journal) = open(&path)?;
            println!("\n=== Journal ===");
            println!("File:      {:?}", journal.path());
            println!("Entries:   {}", journal.len());
            println!("Head:      {}", journal.head());
            println!("Status:    {}", session.current().status());
            println!("Round:     {}", session.current().current_round());
        }
    }

    Ok(())
}

/// Open an existing journal; `new` creates one.
fn open(path: &PathBuf) -> Result<(Session, CommandJournal)> {
    Session::open_existing(path).with_context(|| {
        format!("Failed to open match journal {:?} (create one with `new`)", path)
    })
}

/// Open, execute one command, persist it, and return the new match.
fn run(path: &PathBuf, command: Command) -> Result<Match> {
    let (mut session, mut journal) = open(path)?;
    let name = command.name();
    session
        .execute_and_persist(&mut journal, command)
        .with_context(|| format!("Failed to {}", name.replace('_', " ")))?;
    Ok(session.current().clone())
}

/// The given round, or the live one.
fn resolve_round(path: &PathBuf, round: Option<u32>) -> Result<u32> {
    if let Some(round) = round {
        return Ok(round);
    }
    let (session, _) = open(path)?;
    session
        .current()
        .phase()
        .live_round()
        .map(|r| r.number)
        .context("No round is in progress")
}

fn display_name(m: &Match, number: PlayerNumber) -> String {
    match m.player(number) {
        Some(player) => format!("{} {}", player.number, player.name),
        None if number == BYE_NUMBER => BYE_NAME.to_string(),
        None => format!("{} (removed)", number),
    }
}

fn print_roster(m: &Match) {
    println!("\n=== Roster ({}) ===", m.players().len());
    for player in m.players() {
        if player.organization.is_empty() {
            println!("{:>4}  {}", player.number, player.name);
        } else {
            println!("{:>4}  {} ({})", player.number, player.name, player.organization);
        }
    }
}

fn print_match(m: &Match) {
    println!("\n=== {} ===", if m.name().is_empty() { "Match" } else { m.name() });
    if !m.organizer().is_empty() {
        println!("Organizer: {}", m.organizer());
    }
    println!("Status:    {}", m.status());
    println!("Round:     {} of {}", m.current_round().min(m.total_rounds()), m.total_rounds());

    match m.phase() {
        Phase::Pairing(round) | Phase::Fighting(round) => print_round(m, round),
        Phase::Finished => print_standings(m),
        Phase::NotStarted => print_roster(m),
    }
}

fn print_round(m: &Match, round: &Round) {
    println!("\n--- Round {} ---", round.number);
    for game in round.games() {
        println!(
            "{:>3}  {:<24} {}  {}",
            game.table,
            display_name(m, game.red),
            game.outcome,
            display_name(m, game.black)
        );
    }
    if round.manually_adjusted {
        println!("(pairing adjusted manually)");
    }
}

fn print_standings(m: &Match) {
    println!("\n=== Standings ===");
    println!("{:>4}  {:<24} {:>6} {:>6}", "Pos", "Contestant", "Score", "Opp");
    for standing in m.standings() {
        println!(
            "{:>4}  {:<24} {:>6} {:>6}",
            standing.position,
            display_name(m, standing.player.number),
            standing.player.score,
            standing.player.opponent_score
        );
    }
}
