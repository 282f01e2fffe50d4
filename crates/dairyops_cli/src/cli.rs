use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "dairyops",
    about = "Shift scheduler for dairy operations teams",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// TOML config file; defaults plus DAIRYOPS_* variables when absent.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Plan to open instead of the configured default.
    #[arg(long, global = true)]
    pub plan: Option<String>,

    /// SQLite database holding the plan documents.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the schedule grid.
    List(FilterArgs),

    /// Append a task.
    Add(AddArgs),

    /// Change one field of a task.
    Edit(EditArgs),

    /// Insert an empty 08:00-09:00 row after a task.
    #[command(name = "insert-after")]
    InsertAfter(InsertAfterArgs),

    /// Remove a task.
    Delete(TaskArgs),

    /// Write the schedule to `<plan>_<date>.csv`.
    Export(ExportArgs),

    /// Replace the schedule with the rows of a CSV file.
    Import(ImportArgs),

    /// Draw the day as horizontal bars.
    Timeline(TimelineArgs),

    /// Print each resource with its bar color.
    Legend,

    /// List the plans stored for the current user.
    Plans,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Case-insensitive resource substring.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Row number from `list` or a task id.
#[derive(Debug, Clone, Args)]
pub struct TaskArgs {
    pub task: String,

    /// Resolve row numbers against this filtered view.
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Defaults to the --filter text when omitted.
    #[arg(long)]
    pub resource: Option<String>,

    #[arg(long = "task", default_value = "")]
    pub label: String,

    #[arg(long, default_value = "08:00")]
    pub start: String,

    #[arg(long, default_value = "09:00")]
    pub end: String,

    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: TaskArgs,

    /// resource | task | start | end
    pub field: String,

    pub value: String,
}

#[derive(Debug, Clone, Args)]
pub struct InsertAfterArgs {
    #[command(flatten)]
    pub target: TaskArgs,

    /// Defaults to the --filter text, then to no resource.
    #[arg(long)]
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Directory the file is written to.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,

    /// Date stamped into the file name (YYYY-MM-DD); today when omitted.
    #[arg(long)]
    pub date: Option<String>,

    /// Print the CSV instead of writing a file.
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    pub file: PathBuf,

    /// Replace without asking.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TimelineArgs {
    #[arg(long)]
    pub filter: Option<String>,

    /// Bar area width in characters.
    #[arg(long, default_value_t = 60)]
    pub width: usize,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["dairyops", "timeline", "--plan", "north", "--width", "40"])
            .expect("arguments should parse");
        assert_eq!(cli.global.plan.as_deref(), Some("north"));
        match cli.command {
            Commands::Timeline(args) => assert_eq!(args.width, 40),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn edit_takes_task_field_and_value() {
        let cli = Cli::try_parse_from(["dairyops", "edit", "3", "start", "07:15"])
            .expect("arguments should parse");
        match cli.command {
            Commands::Edit(args) => {
                assert_eq!(args.target.task, "3");
                assert_eq!(args.field, "start");
                assert_eq!(args.value, "07:15");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_defaults_to_the_standard_slot() {
        let cli = Cli::try_parse_from(["dairyops", "add", "--resource", "Team A"])
            .expect("arguments should parse");
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.start, "08:00");
                assert_eq!(args.end, "09:00");
                assert_eq!(args.label, "");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
