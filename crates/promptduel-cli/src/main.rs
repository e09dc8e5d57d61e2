//! PromptDuel CLI - terminal client for duels, turns, and arena voting.

mod auth;
mod cli;
mod client;
mod error;

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser};
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};

use promptduel_core::db::{Database, LibSqlVoteStore};
use promptduel_core::vote_guard::VoteGuard;
use promptduel_core::{DuelId, Side, Turn, TurnId, VoteAction, VoteCounter, VoteTally};

use auth::{clear_session, load_session, save_session, SupabaseAuth};
use cli::{Cli, Commands, CompletionShell, DuelCommands, TurnCommands};
use client::{ApiClient, ArenaView, CreateDuelRequest, CreateTurnRequest, DuelSummary};
use error::CliError;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("promptduel=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let api_url = resolve_api_url(cli.api_url);
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Login { email, password } => run_login(&email, &password).await,
        Commands::Status => run_status(),
        Commands::Logout => run_logout(),
        Commands::Duels { command } => match command {
            DuelCommands::List { json } => run_duels_list(&api_url, json).await,
            DuelCommands::Create {
                name,
                description,
                contender_a,
                contender_b,
            } => {
                run_duels_create(&api_url, name, description, contender_a, contender_b).await
            }
            DuelCommands::Delete { id } => run_duels_delete(&api_url, &id).await,
        },
        Commands::Turns { command } => match command {
            TurnCommands::Add {
                duel_id,
                input,
                response_a,
                response_b,
            } => run_turns_add(&api_url, &duel_id, input, response_a, response_b).await,
            TurnCommands::List { duel_id, json } => {
                run_turns_list(&api_url, &duel_id, json).await
            }
            TurnCommands::Delete { id } => run_turns_delete(&api_url, &id).await,
        },
        Commands::Arena { duel_id, json } => run_arena(&api_url, &duel_id, json).await,
        Commands::Vote {
            turn_id,
            side,
            action,
        } => run_vote(&api_url, &db_path, &turn_id, side.into(), action.into()).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}

async fn run_login(email: &str, password: &str) -> Result<(), CliError> {
    let supabase = SupabaseAuth::from_env()?;
    let session = supabase.sign_in(email, password).await?;
    save_session(&session)?;

    println!(
        "Logged in as {}",
        session.email.as_deref().unwrap_or(&session.user_id)
    );
    Ok(())
}

fn run_status() -> Result<(), CliError> {
    match load_session()? {
        Some(session) if !session.is_expired() => {
            println!(
                "Logged in as {}",
                session.email.as_deref().unwrap_or(&session.user_id)
            );
        }
        Some(_) => println!("Session expired. Run `promptduel login` again."),
        None => println!("Not logged in."),
    }
    Ok(())
}

fn run_logout() -> Result<(), CliError> {
    clear_session()?;
    println!("Logged out.");
    Ok(())
}

async fn run_duels_list(api_url: &str, as_json: bool) -> Result<(), CliError> {
    let client = authed_client(api_url)?;
    let duels = client.list_duels().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&duels)?);
    } else if duels.is_empty() {
        println!("No duels yet. Create one with `promptduel duels create <name>`.");
    } else {
        for line in format_duel_lines(&duels) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_duels_create(
    api_url: &str,
    name: String,
    description: Option<String>,
    contender_a: Option<String>,
    contender_b: Option<String>,
) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::EmptyDuelName);
    }

    let client = authed_client(api_url)?;
    let duel = client
        .create_duel(&CreateDuelRequest {
            name,
            description,
            contender_a_name: contender_a,
            contender_b_name: contender_b,
        })
        .await?;

    println!("{}", duel.id);
    Ok(())
}

async fn run_duels_delete(api_url: &str, id: &str) -> Result<(), CliError> {
    let duel_id = parse_duel_id(id)?;
    let client = authed_client(api_url)?;
    client.delete_duel(&duel_id).await?;
    println!("{duel_id}");
    Ok(())
}

async fn run_turns_add(
    api_url: &str,
    duel_id: &str,
    input: String,
    response_a: String,
    response_b: String,
) -> Result<(), CliError> {
    if input.trim().is_empty() || response_a.trim().is_empty() || response_b.trim().is_empty() {
        return Err(CliError::IncompleteTurn);
    }

    let duel_id = parse_duel_id(duel_id)?;
    let client = authed_client(api_url)?;
    let turn = client
        .create_turn(
            &duel_id,
            &CreateTurnRequest {
                user_input: input,
                response_a,
                response_b,
            },
        )
        .await?;

    println!("{} (turn {})", turn.id, turn.turn_order);
    Ok(())
}

async fn run_turns_list(api_url: &str, duel_id: &str, as_json: bool) -> Result<(), CliError> {
    let duel_id = parse_duel_id(duel_id)?;
    let client = authed_client(api_url)?;
    let turns = client.list_turns(&duel_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
    } else if turns.is_empty() {
        println!("No turns yet.");
    } else {
        for line in format_turn_lines(&turns) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_turns_delete(api_url: &str, id: &str) -> Result<(), CliError> {
    let turn_id = parse_turn_id(id)?;
    let client = authed_client(api_url)?;
    client.delete_turn(&turn_id).await?;
    println!("{turn_id}");
    Ok(())
}

async fn run_arena(api_url: &str, duel_id: &str, as_json: bool) -> Result<(), CliError> {
    let duel_id = parse_duel_id(duel_id)?;
    let client = ApiClient::new(api_url, None);
    let arena = client.arena(&duel_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&arena)?);
    } else {
        for line in format_arena(&arena) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_vote(
    api_url: &str,
    db_path: &Path,
    turn_id: &str,
    side: Side,
    action: VoteAction,
) -> Result<(), CliError> {
    let turn_id = parse_turn_id(turn_id)?;

    let db = open_local_database(db_path).await?;
    let store = LibSqlVoteStore::new(db.connection());
    let guard = VoteGuard::new(store);

    // Check locally first; record only after the remote increment succeeds,
    // so a failed request leaves the side retryable.
    guard.check(&turn_id, side).await?;

    let client = ApiClient::new(api_url, None);
    client
        .vote(&turn_id, VoteCounter::compose(side, action))
        .await?;
    guard.record(&turn_id, side, action).await?;

    println!("Recorded {action} on side {}", side.label());
    Ok(())
}

fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();

    match shell {
        CompletionShell::Bash => generate_for_shell(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => generate_for_shell(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => generate_for_shell(shells::Fish, &mut command, &mut buffer),
    }

    if let Some(path) = output_path {
        std::fs::write(path, &buffer)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&buffer)?;
    }

    Ok(())
}

fn generate_for_shell<G: Generator>(
    generator: G,
    command: &mut clap::Command,
    buffer: &mut Vec<u8>,
) {
    generate(generator, command, "promptduel", buffer);
}

fn authed_client(api_url: &str) -> Result<ApiClient, CliError> {
    let session = load_session()?.ok_or(CliError::NotLoggedIn)?;
    if session.is_expired() {
        return Err(CliError::NotLoggedIn);
    }
    Ok(ApiClient::new(api_url, Some(session.access_token)))
}

fn format_duel_lines(duels: &[DuelSummary]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    duels
        .iter()
        .map(|summary| {
            let id = summary.duel.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let relative_time = format_relative_time(summary.duel.created_at, now_ms);
            format!(
                "{short_id:<13}  {:<30}  {:<9}  {:<18}  {relative_time}",
                truncate(&summary.duel.name, 30),
                summary.duel.status,
                format_tally_summary(&summary.tally),
            )
        })
        .collect()
}

fn format_turn_lines(turns: &[Turn]) -> Vec<String> {
    turns
        .iter()
        .map(|turn| {
            let id = turn.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            format!(
                "#{:<3} {short_id:<13}  {:<40}  a +{}/-{}  b +{}/-{}",
                turn.turn_order,
                truncate(&turn.user_input, 40),
                turn.likes_a,
                turn.dislikes_a,
                turn.likes_b,
                turn.dislikes_b,
            )
        })
        .collect()
}

fn format_arena(arena: &ArenaView) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("{} ({})", arena.duel.name, arena.duel.matchup()));
    if let Some(description) = &arena.duel.description {
        lines.push(description.clone());
    }
    lines.push(render_tally_bar(
        &arena.tally,
        &arena.duel.contender_a_name,
        &arena.duel.contender_b_name,
    ));
    lines.push(String::new());
    lines.extend(format_turn_lines(&arena.turns));
    lines
}

/// A fixed-width bar showing side A's share of the like votes.
fn render_tally_bar(tally: &VoteTally, a_name: &str, b_name: &str) -> String {
    const WIDTH: usize = 20;

    if tally.total_votes == 0 {
        return "No votes yet".to_string();
    }

    let share_a = match tally.winner {
        Some(Side::A) => usize::from(tally.percentage),
        Some(Side::B) => 100 - usize::from(tally.percentage),
        None => 50,
    };
    let filled = (share_a * WIDTH).div_ceil(100).min(WIDTH);
    let bar: String = "#".repeat(filled) + &"-".repeat(WIDTH - filled);

    let verdict = match tally.winner {
        Some(Side::A) => format!("{a_name} leads by {}", tally.delta),
        Some(Side::B) => format!("{b_name} leads by {}", tally.delta),
        None => "tied".to_string(),
    };

    format!(
        "{a_name} [{bar}] {b_name}  ({} votes, {verdict})",
        tally.total_votes
    )
}

fn format_tally_summary(tally: &VoteTally) -> String {
    match tally.winner {
        Some(side) => format!(
            "{} votes, {} {}%",
            tally.total_votes,
            side.label(),
            tally.percentage
        ),
        None => format!("{} votes, tied", tally.total_votes),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

fn parse_duel_id(raw: &str) -> Result<DuelId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::invalid_duel_id(raw))
}

fn parse_turn_id(raw: &str) -> Result<TurnId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::invalid_turn_id(raw))
}

fn resolve_api_url(cli_api_url: Option<String>) -> String {
    cli_api_url
        .or_else(|| env::var("PROMPTDUEL_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PROMPTDUEL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptduel")
        .join("promptduel.db")
}

async fn open_local_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Database::open(path)
        .await
        .map_err(|error| CliError::DatabaseInit(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    use promptduel_core::db::{Database, LibSqlVoteStore};
    use promptduel_core::vote_guard::VoteGuard;
    use promptduel_core::{Error as CoreError, Side, VoteAction, VoteTally};

    use super::{
        format_relative_time, format_tally_summary, open_local_database, parse_duel_id,
        parse_turn_id, render_tally_bar, resolve_api_url, run_completions, truncate, CliError,
        CompletionShell,
    };

    #[test]
    fn truncate_shortens_with_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(
            truncate("a very long duel name indeed", 15),
            "a very long..."
        );
    }

    #[test]
    fn format_relative_time_units() {
        let now = 10_000_000;
        assert_eq!(format_relative_time(now - 30_000, now), "just now");
        assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
        assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    }

    #[test]
    fn tally_bar_shows_no_votes() {
        let tally = VoteTally::from_counts(0, 0);
        assert_eq!(render_tally_bar(&tally, "A", "B"), "No votes yet");
    }

    #[test]
    fn tally_bar_reflects_leader() {
        let tally = VoteTally::from_counts(3, 1);
        let bar = render_tally_bar(&tally, "Sonnet", "Haiku");
        assert!(bar.contains("Sonnet leads by 50"));
        assert!(bar.contains("4 votes"));

        let tied = VoteTally::from_counts(2, 2);
        assert!(render_tally_bar(&tied, "Sonnet", "Haiku").contains("tied"));
    }

    #[test]
    fn tally_summary_names_winner_side() {
        assert_eq!(format_tally_summary(&VoteTally::from_counts(1, 3)), "4 votes, b 75%");
        assert_eq!(format_tally_summary(&VoteTally::from_counts(1, 1)), "2 votes, tied");
    }

    #[test]
    fn id_parsing_rejects_garbage() {
        assert!(matches!(
            parse_duel_id("not-a-uuid"),
            Err(CliError::InvalidId { .. })
        ));
        assert!(parse_turn_id(" 01890000-0000-7000-8000-000000000001 ").is_ok());
    }

    #[test]
    fn api_url_resolution_prefers_flag() {
        assert_eq!(
            resolve_api_url(Some("http://example.com".to_string())),
            "http://example.com"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_vote_state_survives_database_reopen() {
        let db_path = unique_test_db_path();
        let turn_id: promptduel_core::TurnId =
            "01890000-0000-7000-8000-00000000aaaa".parse().unwrap();

        {
            let db = open_local_database(&db_path).await.unwrap();
            let store = LibSqlVoteStore::new(db.connection());
            let guard = VoteGuard::new(store);

            guard.check(&turn_id, Side::A).await.unwrap();
            guard
                .record(&turn_id, Side::A, VoteAction::Like)
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        let store = LibSqlVoteStore::new(db.connection());
        let guard = VoteGuard::new(store);

        let err = guard.check(&turn_id, Side::A).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyVoted));
        guard.check(&turn_id, Side::B).await.unwrap();

        cleanup_db_files(&db_path);
    }

    #[test]
    fn run_completions_writes_bash_script_file() {
        let output_path = std::env::temp_dir().join(format!(
            "promptduel-completions-test-{}.bash",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |duration| duration.as_nanos())
        ));

        run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

        let script = std::fs::read_to_string(&output_path).unwrap();
        assert!(script.contains("_promptduel()"));
        assert!(script.contains("complete -F _promptduel"));

        let _ = std::fs::remove_file(output_path);
    }

    fn unique_test_db_path() -> PathBuf {
        static NEXT_TEST_DB_ID: AtomicU64 = AtomicU64::new(0);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        let sequence = NEXT_TEST_DB_ID.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("promptduel-cli-test-{timestamp}-{sequence}.db"))
    }

    fn cleanup_db_files(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
    }
}
