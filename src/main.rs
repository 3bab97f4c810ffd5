//! # Folio
//!
//! A project dashboard for the terminal: projects and their tasks, clients,
//! ideas, time tracking, performance numbers and billing reports. Scriptable
//! subcommands for quick work, and an interactive dashboard (`folio ui`, or
//! no subcommand at all).
//!
//! ## Configuration
//!
//! Read from the environment, and from a `.env` file if one exists:
//!
//! *   `FOLIO_USER_EMAIL` / `FOLIO_USER_NAME`: who is signed in.
//! *   `FOLIO_ALLOWED_EMAILS`: comma separated allow-list. Anyone else is
//!     turned away with `Access denied: email not authorized.`
//! *   `FOLIO_DATA_DIR`: where the collections live (overridden by
//!     `--data-dir`). Defaults to `~/.local/share/folio` on Linux.
//! *   `FOLIO_HOURLY_RATE`: billing rate for reports, 150 by default.
//! *   `FOLIO_LOG`: log filter, e.g. `folio=debug`.
//!
//! ## Usage
//!
//! ```bash
//! folio projects add "Website redesign" --client "Acme Corp" --due 2025-09-30
//! folio tasks add <project-id> "Wireframes" --due 2025-07-01
//! folio tasks move <task-id> in-progress
//! folio my-tasks
//! folio clients add "Acme" --email hi@acme.com --company "Acme Corp"
//! folio time log <project-id> --hours 1.5 --description "Review"
//! folio reports
//! ```
//!
//! Ids may be shortened to any unambiguous prefix, as shown in the tables.
//!
//! ### Dashboard keys
//!
//! *   `Tab` / `1`-`6`: switch between My Tasks, Board, Clients, Ideas, Time
//!     and Performance
//! *   `j`/`k`: move, `Space`: done/reopen, `d`: delete, `r`: reload
//! *   Board: `h`/`l` pick a column, `<`/`>` move the card
//! *   Clients and Ideas: `a` add, `e` edit
//! *   Time: `s` start/stop the timer, `p` pick its project

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use folio::commands::*;
use folio::config::Config;
use folio::derive::calendar::CalendarView;
use folio::models::{ClientStatus, Priority, ProjectStatus, TaskStatus};
use folio::notify::StderrNotifier;
use folio::services::{ProjectDraft, TaskUpdate};
use folio::store::JsonFileStore;
use folio::timestamp::parse_day;
use folio::tui::run_tui;
use folio::view::{ClientForm, IdeaForm, ProjectEditForm, TaskForm};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Project dashboard for the terminal", long_about = None)]
struct Cli {
    /// Directory holding the data files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List and manage projects
    Projects {
        #[command(subcommand)]
        command: Option<ProjectCommands>,
    },
    /// List and manage tasks across projects
    Tasks {
        #[command(subcommand)]
        command: Option<TaskCommands>,
    },
    /// Tasks grouped by overdue, today, upcoming and completed
    MyTasks,
    /// Tasks in to-do / in-progress / done columns
    Board,
    /// Project and task completion statistics
    Performance,
    /// Hours, revenue, profitability and utilization
    Reports,
    /// Deadlines and open tasks on a calendar
    Calendar {
        /// Any day in the period to show (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Show a single week instead of the month
        #[arg(short, long)]
        week: bool,
    },
    /// List and manage clients
    Clients {
        #[command(subcommand)]
        command: Option<ClientCommands>,
    },
    /// List and manage ideas
    Ideas {
        #[command(subcommand)]
        command: Option<IdeaCommands>,
    },
    /// Weekly timesheet and time logging
    Time {
        #[command(subcommand)]
        command: Option<TimeCommands>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open the interactive dashboard
    Ui,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects
    List,
    /// Create a project
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        client: Option<String>,
        #[arg(short, long)]
        status: Option<ProjectStatus>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// Hard deadline (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// Soft target date, used when there is no deadline (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        target: Option<NaiveDate>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Team members besides you
        #[arg(short, long = "member")]
        members: Vec<String>,
        /// Kind of project, e.g. "Client work"
        #[arg(long = "type")]
        type_label: Option<String>,
        /// Add a kickoff meeting task
        #[arg(long)]
        kickoff: bool,
    },
    /// Edit a project
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        client: Option<String>,
        #[arg(short, long)]
        status: Option<ProjectStatus>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New end date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: Option<u8>,
    },
    /// Delete a project and its tasks
    Remove { id: String },
    /// Add sample projects
    Seed,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List every task
    List,
    /// Add a task to a project
    Add {
        project: String,
        name: String,
        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: String,
        #[arg(short, long)]
        assignee: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Move a task to another column (todo, in-progress, done)
    Move { id: String, status: TaskStatus },
    /// Edit a task
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        assignee: Option<String>,
        #[arg(short, long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Delete a task
    Remove { id: String },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// List clients
    List {
        /// Match against name, company or email
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<ClientStatus>,
    },
    /// Add a client
    Add {
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        company: String,
        #[arg(short, long)]
        phone: Option<String>,
        #[arg(short, long)]
        status: Option<ClientStatus>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Edit a client
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        company: Option<String>,
        #[arg(short, long)]
        phone: Option<String>,
        #[arg(short, long)]
        status: Option<ClientStatus>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Delete a client (projects keep their client name)
    Remove { id: String },
    /// Add sample clients
    Seed,
}

#[derive(Subcommand)]
enum IdeaCommands {
    /// List ideas
    List,
    /// Capture an idea
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Edit an idea
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete an idea
    Remove { id: String },
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Show the week's timesheet
    Week {
        /// Any day of the week to show (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Log time against a project
    Log {
        project: String,
        #[arg(short = 'H', long)]
        hours: f64,
        #[arg(short, long)]
        description: Option<String>,
        /// Day worked (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        non_billable: bool,
    },
    /// Delete a time entry
    Remove { id: String },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_day(raw)
        .map(|d| d.date_naive())
        .map_err(|_| format!("invalid date '{raw}', use YYYY-MM-DD"))
}

fn init_tracing(interactive: bool) {
    // The dashboard owns the terminal, so it stays silent unless asked.
    let fallback = if interactive { "folio=off" } else { "folio=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return ExitCode::FAILURE;
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "folio", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    dotenvy::dotenv().ok();
    init_tracing(matches!(cli.command, None | Some(Commands::Ui)));

    let config = match Config::from_env(cli.data_dir.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let session = match config.access_policy().authorize(config.identity()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let store = match JsonFileStore::open(&config.data_dir) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Cannot open data directory");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(dir = %config.data_dir.display(), user = session.email(), "Store opened");

    let notifier = StderrNotifier { quiet: cli.quiet };
    let ctx = Context::new(&store, &notifier, &session, &config);

    match cli.command {
        Some(Commands::Projects { command }) => match command.unwrap_or(ProjectCommands::List) {
            ProjectCommands::List => cmd_projects(&ctx),
            ProjectCommands::Add {
                title,
                description,
                client,
                status,
                priority,
                start,
                due,
                target,
                tags,
                members,
                type_label,
                kickoff,
            } => {
                let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
                cmd_project_add(
                    &ctx,
                    ProjectDraft {
                        title: Some(title),
                        description,
                        client,
                        status,
                        priority,
                        start_date: start.and_then(midnight),
                        target_date: target.and_then(midnight),
                        deadline_date: due.and_then(midnight),
                        tags,
                        owner_name: None,
                        contributor_names: members,
                        intent: type_label,
                        add_starter_tasks: kickoff,
                    },
                );
            }
            ProjectCommands::Edit { id, name, description, client, status, priority, due, progress } => {
                let form = ProjectEditForm {
                    name: name.unwrap_or_default(),
                    description: description.unwrap_or_default(),
                    client: client.unwrap_or_default(),
                    status,
                    priority,
                    end_date: due.unwrap_or_default(),
                    progress,
                };
                cmd_project_edit(&ctx, &id, form);
            }
            ProjectCommands::Remove { id } => cmd_project_remove(&ctx, &id),
            ProjectCommands::Seed => cmd_projects_seed(&ctx),
        },
        Some(Commands::Tasks { command }) => match command.unwrap_or(TaskCommands::List) {
            TaskCommands::List => cmd_tasks(&ctx),
            TaskCommands::Add { project, name, due, assignee, priority } => {
                let form = TaskForm {
                    name,
                    project_id: project,
                    due,
                    assignee: assignee.unwrap_or_default(),
                    priority,
                };
                cmd_task_add(&ctx, form);
            }
            TaskCommands::Move { id, status } => cmd_task_move(&ctx, &id, status),
            TaskCommands::Edit { id, name, assignee, due, priority } => {
                let update = TaskUpdate {
                    name,
                    assignee,
                    status: None,
                    due: due.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc()),
                    priority,
                };
                cmd_task_edit(&ctx, &id, update);
            }
            TaskCommands::Remove { id } => cmd_task_remove(&ctx, &id),
        },
        Some(Commands::MyTasks) => cmd_my_tasks(&ctx),
        Some(Commands::Board) => cmd_board(&ctx),
        Some(Commands::Performance) => cmd_performance(&ctx),
        Some(Commands::Reports) => cmd_reports(&ctx),
        Some(Commands::Calendar { date, week }) => {
            cmd_calendar(&ctx, date, if week { CalendarView::Week } else { CalendarView::Month })
        }
        Some(Commands::Clients { command }) => match command
            .unwrap_or(ClientCommands::List { search: None, status: None })
        {
            ClientCommands::List { search, status } => cmd_clients(&ctx, search.as_deref(), status),
            ClientCommands::Add { name, email, company, phone, status, notes } => {
                let form = ClientForm {
                    name,
                    email,
                    company,
                    phone: phone.unwrap_or_default(),
                    status: status.unwrap_or_default(),
                    notes: notes.unwrap_or_default(),
                };
                cmd_client_add(&ctx, form);
            }
            ClientCommands::Edit { id, name, email, company, phone, status, notes } => {
                cmd_client_edit(&ctx, &id, ClientChanges { name, email, company, phone, status, notes })
            }
            ClientCommands::Remove { id } => cmd_client_remove(&ctx, &id),
            ClientCommands::Seed => cmd_clients_seed(&ctx),
        },
        Some(Commands::Ideas { command }) => match command.unwrap_or(IdeaCommands::List) {
            IdeaCommands::List => cmd_ideas(&ctx),
            IdeaCommands::Add { title, description } => {
                cmd_idea_add(&ctx, IdeaForm { title, description });
            }
            IdeaCommands::Edit { id, title, description } => cmd_idea_edit(&ctx, &id, title, description),
            IdeaCommands::Remove { id } => cmd_idea_remove(&ctx, &id),
        },
        Some(Commands::Time { command }) => match command.unwrap_or(TimeCommands::Week { date: None }) {
            TimeCommands::Week { date } => cmd_time(&ctx, date),
            TimeCommands::Log { project, hours, description, date, non_billable } => {
                cmd_time_log(&ctx, LogTime { project, hours, description, date, billable: !non_billable });
            }
            TimeCommands::Remove { id } => cmd_time_remove(&ctx, &id),
        },
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(&store, &session, &config) {
                eprintln!("Error running dashboard: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
