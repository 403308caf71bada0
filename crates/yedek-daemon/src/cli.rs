use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "yedekd",
    version,
    about = "Scheduled database backups and cross-engine migrations"
)]
pub struct Cli {
    /// Config file path (default: ~/.yedek/config.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the scheduler daemon; runs until ctrl-c.
    Run,
    /// List known engines, their defaults, and supported migration targets.
    Engines,
    /// Manage backup jobs.
    #[command(subcommand)]
    Job(JobCommand),
    /// Inspect execution history and fetch artifacts.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Plan a cross-engine migration; add --execute to run it.
    Migrate(MigrateArgs),
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Register a new backup job (active by default).
    Add(JobSpecArgs),
    /// Show one job.
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Replace a job's definition.
    Update {
        id: String,
        #[command(flatten)]
        spec: JobSpecArgs,
    },
    /// Delete a job together with its history.
    Rm { id: String },
    /// List all jobs.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Flip a job's active flag.
    Toggle { id: String },
    /// Trigger one backup attempt right now, regardless of schedule.
    ///
    /// The backup runs in this process, and the per-job overlap guard
    /// covers this process only: it does not see a run a separately
    /// started daemon has in flight for the same job.
    Run { id: String },
}

#[derive(Args)]
pub struct JobSpecArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Engine catalog key, e.g. MySQL or PostgreSQL.
    #[arg(long)]
    pub engine: String,
    #[arg(long)]
    pub host: String,
    /// Defaults to the engine's catalog port.
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    /// Database name (file path for SQLite).
    #[arg(long)]
    pub database: String,
    /// manual, hourly, daily, weekly, or a 5-field cron expression.
    #[arg(long, default_value = "manual")]
    pub schedule: String,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List execution records for a job, newest first.
    List {
        job_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Write a successful record's artifact to a file, or stdout.
    Fetch {
        record_id: String,
        #[arg(long)]
        out: Option<String>,
    },
}

#[derive(Args)]
pub struct MigrateArgs {
    #[arg(long)]
    pub source_engine: String,
    #[arg(long)]
    pub source_host: String,
    /// Defaults to the source engine's catalog port.
    #[arg(long)]
    pub source_port: Option<u16>,
    #[arg(long)]
    pub source_username: String,
    #[arg(long)]
    pub source_password: String,
    #[arg(long)]
    pub source_database: String,

    #[arg(long)]
    pub target_engine: String,
    #[arg(long)]
    pub target_host: String,
    /// Defaults to the target engine's catalog port.
    #[arg(long)]
    pub target_port: Option<u16>,
    #[arg(long)]
    pub target_username: String,
    #[arg(long)]
    pub target_password: String,
    #[arg(long)]
    pub target_database: String,

    /// Actually run the migration instead of only printing the plan.
    #[arg(long)]
    pub execute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn job_run_help_names_the_process_boundary() {
        let cmd = Cli::command();
        let job = cmd.find_subcommand("job").unwrap();
        let run = job.find_subcommand("run").unwrap();
        let long_about = run.get_long_about().unwrap().to_string();
        assert!(long_about.contains("this process only"));
    }
}
