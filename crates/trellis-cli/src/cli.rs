use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trellis_core::models::TaskPriority;

/// Trellis: nested task lists with recurrence and idempotent import
#[derive(Parser, Debug)]
#[command(name = "trellis", author, version, about, long_about = None)]
pub struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage lists
    List(ListCommand),
    /// Manage sections within a list
    Section(SectionCommand),
    /// Manage tasks
    Task(TaskCommand),
    /// Import a native JSON/CSV export or an external CSV backup
    Import(ImportCommand),
    /// Export lists as nested JSON or flat CSV
    Export(ExportCommand),
    /// Create tasks from external records, skipping ones already seen
    Ingest(IngestCommand),
}

// ========== Lists ==========

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    #[command(subcommand)]
    pub command: ListSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ListSubcommand {
    /// Add a new list at the end
    Add(AddListCommand),
    /// Show all lists in order
    Ls,
    /// Rename a list or change its emoji
    Edit(EditListCommand),
    /// Move a list to a zero-based index
    Move(MoveListCommand),
    /// Delete a list with all its sections and tasks
    Delete(DeleteListCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddListCommand {
    /// The name of the list
    pub name: String,
    #[arg(long, default_value = "")]
    pub emoji: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditListCommand {
    /// List name or id
    pub list: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveListCommand {
    /// List name or id
    pub list: String,
    /// Zero-based target index
    #[arg(allow_negative_numbers = true)]
    pub index: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteListCommand {
    /// List name or id
    pub list: String,
    /// Delete without confirmation
    #[arg(short, long)]
    pub force: bool,
}

// ========== Sections ==========

#[derive(Parser, Debug, Clone)]
pub struct SectionCommand {
    #[command(subcommand)]
    pub command: SectionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SectionSubcommand {
    /// Add a section at the end of a list
    Add(AddSectionCommand),
    /// Show the sections of a list
    Ls(ListSectionsCommand),
    /// Rename a section or change its emoji
    Edit(EditSectionCommand),
    /// Move a section to a zero-based index within its list
    Move(MoveSectionCommand),
    /// Delete a section with all its tasks
    Delete(DeleteSectionCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddSectionCommand {
    /// List name or id
    pub list: String,
    /// The name of the section
    pub name: String,
    #[arg(long, default_value = "")]
    pub emoji: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ListSectionsCommand {
    /// List name or id
    pub list: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditSectionCommand {
    /// List name or id
    pub list: String,
    /// Section name or id
    pub section: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveSectionCommand {
    /// List name or id
    pub list: String,
    /// Section name or id
    pub section: String,
    /// Zero-based target index
    #[arg(allow_negative_numbers = true)]
    pub index: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteSectionCommand {
    /// List name or id
    pub list: String,
    /// Section name or id
    pub section: String,
    /// Delete without confirmation
    #[arg(short, long)]
    pub force: bool,
}

// ========== Tasks ==========

#[derive(Parser, Debug, Clone)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskSubcommand {
    /// Add a task to a section, or as a subtask with --parent
    Add(AddTaskCommand),
    /// Show the task tree of a list, or of one of its sections
    Show(ShowTasksCommand),
    /// Edit task fields
    Edit(EditTaskCommand),
    /// Move a task to another list, section, parent or position
    Move(MoveTaskCommand),
    /// Complete a task and its open subtasks
    Done(TaskIdCommand),
    /// Reopen a completed task
    Undo(TaskIdCommand),
    /// Pin a task (at most three open pinned tasks per list)
    Pin(TaskIdCommand),
    /// Unpin a task
    Unpin(TaskIdCommand),
    /// Delete a task and its subtasks
    Delete(DeleteTaskCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddTaskCommand {
    /// The title of the task
    pub title: String,
    /// List name or id
    #[arg(short, long, required_unless_present = "parent")]
    pub list: Option<String>,
    /// Section name or id within the list
    #[arg(short, long, requires = "list")]
    pub section: Option<String>,
    /// Id of the parent task
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(short, long, default_value = "")]
    pub notes: String,
    /// none, low, medium or high
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Due date (e.g. '2026-03-01', 'tomorrow', 'next friday')
    #[arg(short, long)]
    pub due: Option<String>,
    /// Due time of day (e.g. '14:30', '9:00 AM')
    #[arg(long)]
    pub at: Option<String>,
    /// Tags to add to the task
    #[arg(short, long, num_args = 1..)]
    pub tag: Vec<String>,
    #[command(flatten)]
    pub repeat: RepeatArgs,
}

/// Human-friendly recurrence flags
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RepeatArgs {
    /// Recurrence frequency
    #[arg(long, value_enum)]
    pub every: Option<RepeatShortcut>,
    /// Days of week for weekly recurrence (mon,tue,wed,thu,fri,sat,sun)
    #[arg(long)]
    pub on: Option<String>,
    /// Day of month for monthly recurrence (1-31, clamped to short months)
    #[arg(long)]
    pub day: Option<u32>,
    /// Month and day for yearly recurrence (MM-DD)
    #[arg(long)]
    pub date: Option<String>,
    /// Comma-separated MM-DD dates for --every dates
    #[arg(long)]
    pub dates: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatShortcut {
    /// Every day
    Daily,
    /// Every week on --on days (default: the due date's weekday)
    Weekly,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
    /// Every month on --day (default: the due date's day)
    Monthly,
    /// Every year on --date (default: the due date)
    Yearly,
    /// On each of --dates every year
    Dates,
}

impl std::fmt::Display for RepeatShortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatShortcut::Daily => write!(f, "daily"),
            RepeatShortcut::Weekly => write!(f, "weekly"),
            RepeatShortcut::Weekdays => write!(f, "weekdays"),
            RepeatShortcut::Weekends => write!(f, "weekends"),
            RepeatShortcut::Monthly => write!(f, "monthly"),
            RepeatShortcut::Yearly => write!(f, "yearly"),
            RepeatShortcut::Dates => write!(f, "dates"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ShowTasksCommand {
    /// List name or id
    pub list: String,
    /// Only this section
    pub section: Option<String>,
    /// Hide completed tasks
    #[arg(long)]
    pub open: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EditTaskCommand {
    /// The id of the task to edit
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// none, low, medium or high
    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, conflicts_with = "due")]
    pub due_clear: bool,

    #[arg(long)]
    pub at: Option<String>,
    #[arg(long, conflicts_with = "at")]
    pub at_clear: bool,

    #[command(flatten)]
    pub repeat: RepeatArgs,
    /// Stop the task from recurring
    #[arg(long, conflicts_with = "every")]
    pub repeat_clear: bool,

    /// Add tags to the task
    #[arg(long, num_args = 1..)]
    pub add_tag: Vec<String>,

    /// Remove tags from the task
    #[arg(long, num_args = 1..)]
    pub remove_tag: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveTaskCommand {
    /// The id of the task to move
    pub id: i64,
    /// Move to the first section of this list
    #[arg(long)]
    pub list: Option<String>,
    /// Move to this section (of --list, or of the task's current list)
    #[arg(long)]
    pub section: Option<String>,
    /// Nest under this task
    #[arg(long, conflicts_with = "top_level")]
    pub parent: Option<i64>,
    /// Detach from the parent task
    #[arg(long)]
    pub top_level: bool,
    /// Zero-based index within the resulting sibling group
    #[arg(long, allow_negative_numbers = true)]
    pub position: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct TaskIdCommand {
    /// The id of the task
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteTaskCommand {
    /// The id of the task to delete
    pub id: i64,
    /// Delete without confirmation
    #[arg(short, long)]
    pub force: bool,
}

// ========== Import / export / ingest ==========

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    /// A .json or .csv file
    pub file: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    /// Read-only markdown outline
    Md,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
    /// Only these lists (name or id); every list when omitted
    #[arg(short, long, num_args = 1..)]
    pub list: Vec<String>,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct IngestCommand {
    /// JSON array of {"title", "notes", "external_id"} records
    pub file: PathBuf,
    /// Target list (defaults to the configured inbox list)
    #[arg(long)]
    pub list: Option<String>,
    /// Target section (defaults to the configured inbox section)
    #[arg(long)]
    pub section: Option<String>,
}
