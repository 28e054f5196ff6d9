use std::io;

use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};

use longhabit::commands::*;
use longhabit::config::SettingsPatch;
use longhabit::models::Theme;
use longhabit::storage::{default_db_path, Store};
use longhabit::tui::run_tui;

#[derive(Parser)]
#[command(name = "longhabit")]
#[command(about = "Effective tracking for long-term habits", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortBy {
    Status,
    Name,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(t: Toggle) -> bool {
        matches!(t, Toggle::On)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Category used for filtering
        #[arg(short, long)]
        category: Option<String>,
        /// Repeat goal in days
        #[arg(short, long, allow_negative_numbers = true)]
        every: Option<i64>,
        /// Send email reminders when the task is late
        #[arg(long)]
        email: bool,
    },
    /// List tasks, most urgent first
    List {
        /// Only show this category ("All" shows everything)
        #[arg(short, long)]
        category: Option<String>,
        /// Only show tasks whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Column to sort by
        #[arg(short, long, value_enum, default_value_t = SortBy::Status)]
        sort: SortBy,
        /// Reverse the sort order
        #[arg(long)]
        desc: bool,
    },
    /// Record a completion
    Done {
        id: u64,
        /// When it was done (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Remove the most recent completion
    Undo {
        id: u64,
    },
    /// Show a task's completions
    History {
        id: u64,
    },
    /// Edit a task
    Edit {
        id: u64,
        /// New task name
        #[arg(short, long)]
        name: Option<String>,
        /// New category (empty to clear)
        #[arg(short, long)]
        category: Option<String>,
        /// New repeat goal in days
        #[arg(short, long, allow_negative_numbers = true)]
        every: Option<i64>,
        /// Turn the repeat goal on or off
        #[arg(long, value_enum)]
        goal: Option<Toggle>,
        /// Turn email reminders on or off for this task
        #[arg(long, value_enum)]
        email: Option<Toggle>,
    },
    /// Remove a task
    Remove {
        id: u64,
    },
    /// List categories in use
    Categories,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Reset the database (delete all tasks and settings)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Change settings
    Set {
        /// Reminder email address (empty to clear)
        #[arg(long)]
        email: Option<String>,
        /// Turn email reminders on or off
        #[arg(long, value_enum)]
        reminders: Option<Toggle>,
        /// Colour theme
        #[arg(long, value_enum)]
        theme: Option<Theme>,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = Store::open(default_db_path())?;
    let now = Utc::now();
    match cli.command {
        Some(Commands::Add { name, category, every, email }) => {
            let id = cmd_add(&store, name, category, every, email, now)?;
            println!("Task added (id = {})", id);
        }
        Some(Commands::List { category, filter, sort, desc }) => {
            let options = ListOptions {
                category,
                name_filter: filter,
                sort_by_name: matches!(sort, SortBy::Name),
                descending: desc,
            };
            println!("{}", cmd_list(&store, &options, now)?);
        }
        Some(Commands::Done { id, at }) => {
            let at = match at {
                Some(raw) => parse_completion_time(&raw)?,
                None => now,
            };
            let task = cmd_done(&store, id, at)?;
            println!("{} marked as done.", task.name);
        }
        Some(Commands::Undo { id }) => match cmd_undo(&store, id)? {
            Some(ts) => println!(
                "Removed completion at {} from task {}.",
                ts.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                id
            ),
            None => println!("Task {} has no completions.", id),
        },
        Some(Commands::History { id }) => println!("{}", cmd_history(&store, id)?),
        Some(Commands::Edit { id, name, category, every, goal, email }) => {
            let edit = TaskEdit {
                name,
                category,
                every,
                goal_enabled: goal.map(bool::from),
                remind_by_email: email.map(bool::from),
            };
            cmd_edit(&store, id, edit)?;
            println!("Task {} updated.", id);
        }
        Some(Commands::Remove { id }) => {
            cmd_remove(&store, id)?;
            println!("Task {} removed.", id);
        }
        Some(Commands::Categories) => {
            let found = cmd_categories(&store)?;
            if found.is_empty() {
                println!("No categories found.");
            }
            for c in found {
                println!("{}", c);
            }
        }
        Some(Commands::Settings { command }) => match command {
            SettingsCommands::Show => println!("{}", cmd_settings_show(&store)?),
            SettingsCommands::Set { email, reminders, theme } => {
                let patch = SettingsPatch {
                    remind_email: email,
                    remind_by_email_enabled: reminders.map(bool::from),
                    theme,
                };
                cmd_settings_set(&store, patch)?;
                println!("Settings saved.");
            }
        },
        Some(Commands::Reset { force }) => {
            let prompt = "Are you sure you want to delete all tasks and settings? This cannot be undone.";
            if force || confirm(prompt)? {
                cmd_reset(&store)?;
                println!("Database reset successfully.");
            } else {
                println!("Aborted.");
            }
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "longhabit", &mut io::stdout());
        }
        Some(Commands::Ui) | None => run_tui(&store)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let is_tui = matches!(cli.command, None | Some(Commands::Ui));
    // the TUI owns the terminal, so keep the log quiet unless asked
    let quiet = cli.quiet || (is_tui && cli.verbose == 0);
    if let Err(e) = longhabit::init_tracing(cli.verbose, quiet) {
        eprintln!("error: {e:#}");
    }
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
