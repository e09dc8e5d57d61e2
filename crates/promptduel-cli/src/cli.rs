use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use promptduel_core::{Side, VoteAction};

#[derive(Parser)]
#[command(name = "promptduel")]
#[command(about = "Run side-by-side prompt duels and vote from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the PromptDuel API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Optional path to the local database holding vote state
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Login with Supabase email/password and store the session locally
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show login status
    Status,
    /// Log out and clear the stored session
    Logout,
    /// Manage duels
    Duels {
        #[command(subcommand)]
        command: DuelCommands,
    },
    /// Manage turns within a duel
    Turns {
        #[command(subcommand)]
        command: TurnCommands,
    },
    /// Show a duel's public arena view with its running tally
    Arena {
        /// Duel ID
        duel_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Vote on one side of a turn
    Vote {
        /// Turn ID
        turn_id: String,
        /// Which side to vote on
        #[arg(value_enum)]
        side: SideArg,
        /// Like or dislike
        #[arg(value_enum)]
        action: ActionArg,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum DuelCommands {
    /// List your duels with their tallies
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new duel
    Create {
        /// Duel name
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Display name for contender A
        #[arg(long, value_name = "NAME")]
        contender_a: Option<String>,
        /// Display name for contender B
        #[arg(long, value_name = "NAME")]
        contender_b: Option<String>,
    },
    /// Delete a duel and all of its turns
    Delete {
        /// Duel ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TurnCommands {
    /// Add a turn to a duel
    Add {
        /// Duel ID
        duel_id: String,
        /// The shared user prompt for this turn
        #[arg(long, value_name = "TEXT")]
        input: String,
        /// Contender A's response
        #[arg(long, value_name = "TEXT")]
        response_a: String,
        /// Contender B's response
        #[arg(long, value_name = "TEXT")]
        response_b: String,
    },
    /// List a duel's turns in order
    List {
        /// Duel ID
        duel_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a turn
    Delete {
        /// Turn ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SideArg {
    A,
    B,
}

impl From<SideArg> for Side {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::A => Self::A,
            SideArg::B => Self::B,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ActionArg {
    Like,
    Dislike,
}

impl From<ActionArg> for VoteAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Like => Self::Like,
            ActionArg::Dislike => Self::Dislike,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
