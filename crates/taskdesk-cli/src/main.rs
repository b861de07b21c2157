use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdesk_core::task::{TaskId, TaskPriority, TaskStatus};

mod commands;

#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(about = "TaskDesk CLI - task and user administration", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in; without --code, prints the login URL
    Login {
        /// Authorization code from the login redirect
        #[arg(long)]
        code: Option<String>,
    },
    /// Print the self-registration URL
    Register,
    /// Clear the stored session and end the provider session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List tasks page by page
    List {
        /// Maximum number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show specific tasks (comma-separated ids)
    Show {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<TaskId>,
    },
    /// Create tasks from a JSON file (one object or an array)
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Update fields of a task
    Update {
        id: TaskId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a task
    Delete { id: TaskId },
}

#[derive(Subcommand)]
enum UserCommand {
    /// List users
    List,
    /// Enable a user account
    Enable { id: String },
    /// Disable a user account
    Disable { id: String },
    /// Invite users by email
    Invite {
        #[arg(required = true)]
        emails: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::utils::init_tracing(cli.verbose, cli.quiet)?;

    let context = commands::utils::build_context(cli.config.as_deref()).await?;

    let outcome = match cli.command {
        Commands::Login { code } => commands::auth::login(&context, code.as_deref()).await,
        Commands::Register => commands::auth::register(&context).await,
        Commands::Logout => commands::auth::logout(&context).await,
        Commands::Whoami => commands::auth::whoami(&context).await,
        Commands::Tasks { action } => match action {
            TaskCommand::List { pages } => commands::tasks::list(&context, pages).await,
            TaskCommand::Show { ids } => commands::tasks::show(&context, &ids).await,
            TaskCommand::Create { file } => commands::tasks::create(&context, &file).await,
            TaskCommand::Update {
                id,
                name,
                status,
                priority,
                description,
            } => {
                let patch = taskdesk_core::task::TaskPatch {
                    name,
                    status,
                    priority,
                    description,
                    ..Default::default()
                };
                commands::tasks::update(&context, id, patch).await
            }
            TaskCommand::Delete { id } => commands::tasks::delete(&context, id).await,
        },
        Commands::Users { action } => match action {
            UserCommand::List => commands::users::list(&context).await,
            UserCommand::Enable { id } => commands::users::set_enabled(&context, &id, true).await,
            UserCommand::Disable { id } => {
                commands::users::set_enabled(&context, &id, false).await
            }
            UserCommand::Invite { emails } => commands::users::invite(&context, &emails).await,
        },
    };

    context.shutdown();
    outcome
}
