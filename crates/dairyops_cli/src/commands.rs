//! Command execution against the local plan database.
//!
//! # Responsibility
//! - Build the client handles from config and run one command per process.
//! - Drain store events after every mutation and surface sticky errors.
//!
//! # Invariants
//! - A command that mutated the schedule only reports success after its
//!   write settled without error.

use crate::cli::{
    AddArgs, Cli, Commands, EditArgs, ExportArgs, GlobalArgs, ImportArgs, InsertAfterArgs,
    TaskArgs, TimelineArgs,
};
use crate::render;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use dairyops_core::db::open_db;
use dairyops_core::logging;
use dairyops_core::model::task::{TaskDraft, TaskField, TaskId};
use dairyops_core::sync::document::DocumentPath;
use dairyops_core::sync::identity::LocalIdentityProvider;
use dairyops_core::sync::sqlite::SqliteDocumentService;
use dairyops_core::sync::store::ScheduleStore;
use dairyops_core::timeline::view::{build_rows, legend, ResourceFilter, TimelineRow};
use dairyops_core::PlannerConfig;
use log::info;
use std::io::{BufRead, Write};
use std::time::Instant;

pub fn run(cli: Cli, out: &mut dyn Write, input: &mut dyn BufRead) -> Result<()> {
    let started_at = Instant::now();
    let command = command_name(&cli.command);
    let mut session = Session::open(&cli.global)?;
    let outcome = session.execute(cli.command, out, input);
    session.store.teardown();
    info!(
        "event=cli_command module=cli status={} command={} duration_ms={}",
        if outcome.is_ok() { "ok" } else { "error" },
        command,
        started_at.elapsed().as_millis()
    );
    outcome
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::List(_) => "list",
        Commands::Add(_) => "add",
        Commands::Edit(_) => "edit",
        Commands::InsertAfter(_) => "insert-after",
        Commands::Delete(_) => "delete",
        Commands::Export(_) => "export",
        Commands::Import(_) => "import",
        Commands::Timeline(_) => "timeline",
        Commands::Legend => "legend",
        Commands::Plans => "plans",
    }
}

fn load_config(global: &GlobalArgs) -> Result<PlannerConfig> {
    let mut config = match &global.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::from_env()?,
    };
    if let Some(plan) = &global.plan {
        config.default_plan_id = plan.clone();
    }
    if let Some(db) = &global.db {
        config.database_path = Some(db.clone());
    }
    config.validate()?;
    Ok(config)
}

struct Session {
    config: PlannerConfig,
    store: ScheduleStore<SqliteDocumentService>,
}

impl Session {
    fn open(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        logging::init_from_config(&config)
            .map_err(anyhow::Error::msg)
            .context("failed to start logging")?;

        let db_path = config.resolved_database_path();
        let conn = open_db(&db_path)
            .with_context(|| format!("failed to open database `{}`", db_path.display()))?;

        let mut store = ScheduleStore::new(&config, SqliteDocumentService::new(conn));
        let provider = LocalIdentityProvider::new(config.anonymous_user_id.clone());
        store.authenticate(&provider, config.auth_token.as_deref())?;
        store.activate(config.plan_id());

        let mut session = Self { config, store };
        session.settle()?;
        Ok(session)
    }

    /// Applies every pending service callback, then reports the sticky
    /// status if one is set.
    fn settle(&mut self) -> Result<()> {
        while self.store.process_events() > 0 {}
        match self.store.status() {
            Some(err) => Err(anyhow!("{}: {err}", err.user_message())),
            None => Ok(()),
        }
    }

    fn execute(
        &mut self,
        command: Commands,
        out: &mut dyn Write,
        input: &mut dyn BufRead,
    ) -> Result<()> {
        match command {
            Commands::List(args) => {
                let rows = self.rows(args.filter.as_deref());
                write!(out, "{}", render::grid(&rows))?;
            }
            Commands::Add(args) => self.add(args, out)?,
            Commands::Edit(args) => self.edit(args, out)?,
            Commands::InsertAfter(args) => self.insert_after(args, out)?,
            Commands::Delete(args) => self.delete(args, out)?,
            Commands::Export(args) => self.export(args, out)?,
            Commands::Import(args) => self.import(args, out, input)?,
            Commands::Timeline(args) => self.timeline(args, out)?,
            Commands::Legend => write!(out, "{}", render::legend(&legend(self.store.tasks())))?,
            Commands::Plans => self.plans(out)?,
        }
        Ok(())
    }

    fn rows(&self, filter: Option<&str>) -> Vec<TimelineRow> {
        build_rows(
            self.store.tasks(),
            self.config.window,
            &ResourceFilter::new(filter.unwrap_or_default()),
        )
    }

    /// Resolves a row number from the (filtered) grid, or a task id prefix.
    fn resolve(&self, target: &TaskArgs) -> Result<TaskId> {
        let selector = target.task.trim();
        if let Ok(number) = selector.parse::<usize>() {
            return self
                .rows(target.filter.as_deref())
                .iter()
                .find(|row| row.number == number)
                .map(|row| row.task_id.clone())
                .ok_or_else(|| anyhow!("no row {number} in the current view"));
        }

        let matches: Vec<TaskId> = self
            .store
            .tasks()
            .iter()
            .map(|task| task.id.clone())
            .filter(|id| id.as_str().starts_with(selector))
            .collect();
        match matches.as_slice() {
            [id] => Ok(id.clone()),
            [] => bail!("no task with id `{selector}`"),
            _ => bail!("task id prefix `{selector}` matches {} tasks", matches.len()),
        }
    }

    fn add(&mut self, args: AddArgs, out: &mut dyn Write) -> Result<()> {
        let draft = TaskDraft {
            resource: args.resource.unwrap_or_default(),
            label: args.label,
            start: args.start,
            end: args.end,
        };
        let id = self
            .store
            .add_task(draft, args.filter.as_deref().unwrap_or_default())?;
        self.settle()?;
        writeln!(out, "added {id}")?;
        Ok(())
    }

    fn edit(&mut self, args: EditArgs, out: &mut dyn Write) -> Result<()> {
        let id = self.resolve(&args.target)?;
        let field = TaskField::parse(&args.field).ok_or_else(|| {
            anyhow!(
                "unknown field `{}`; expected resource|task|start|end",
                args.field
            )
        })?;
        self.store.edit_task(&id, field, args.value)?;
        self.settle()?;
        writeln!(out, "updated {id}")?;
        Ok(())
    }

    fn insert_after(&mut self, args: InsertAfterArgs, out: &mut dyn Write) -> Result<()> {
        let target = self.resolve(&args.target)?;
        let resource = args.resource.or(args.target.filter).unwrap_or_default();
        let id = self.store.insert_after(&target, &resource)?;
        self.settle()?;
        writeln!(out, "inserted {id}")?;
        Ok(())
    }

    fn delete(&mut self, args: TaskArgs, out: &mut dyn Write) -> Result<()> {
        let id = self.resolve(&args)?;
        self.store.delete_task(&id)?;
        self.settle()?;
        writeln!(out, "deleted {id}")?;
        Ok(())
    }

    fn export(&mut self, args: ExportArgs, out: &mut dyn Write) -> Result<()> {
        let date = match args.date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid export date `{raw}`; expected YYYY-MM-DD"))?,
            None => Local::now().date_naive(),
        };
        let payload = self.store.export_csv(date);

        if args.stdout {
            writeln!(out, "{}", payload.content)?;
            return Ok(());
        }
        let path = args.output.join(&payload.file_name);
        std::fs::write(&path, &payload.content)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
        writeln!(out, "wrote {}", path.display())?;
        Ok(())
    }

    fn import(
        &mut self,
        args: ImportArgs,
        out: &mut dyn Write,
        input: &mut dyn BufRead,
    ) -> Result<()> {
        let text = std::fs::read_to_string(&args.file)
            .with_context(|| format!("failed to read `{}`", args.file.display()))?;
        let pending = self.store.parse_import(&text)?;

        writeln!(out, "{}", pending.confirmation_prompt())?;
        if pending.dropped_lines() > 0 {
            writeln!(out, "{} line(s) were skipped", pending.dropped_lines())?;
        }
        if !args.yes {
            write!(out, "[y/N] ")?;
            out.flush()?;
            let mut answer = String::new();
            input.read_line(&mut answer)?;
            if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                writeln!(out, "import cancelled")?;
                return Ok(());
            }
        }

        let count = self.store.commit_import(pending);
        self.settle()?;
        writeln!(out, "imported {count} tasks")?;
        Ok(())
    }

    fn timeline(&mut self, args: TimelineArgs, out: &mut dyn Write) -> Result<()> {
        let rows = self.rows(args.filter.as_deref());
        write!(
            out,
            "{}",
            render::timeline(&rows, self.config.window, args.width)
        )?;
        Ok(())
    }

    fn plans(&mut self, out: &mut dyn Write) -> Result<()> {
        let user_id = self
            .store
            .identity()
            .map(|identity| identity.user_id().to_string())
            .ok_or_else(|| anyhow!("no identity established"))?;
        let prefix = DocumentPath::plan_prefix(&self.config.app_id, &user_id);
        let paths = self.store.documents().paths_with_prefix(&prefix)?;
        for path in paths {
            let plan = path.as_str().trim_start_matches(prefix.as_str());
            let marker = if plan == self.store.plan_id().as_str() {
                '*'
            } else {
                ' '
            };
            writeln!(out, "{marker} {plan}")?;
        }
        Ok(())
    }
}
