//! Post-hoc task PID resolution.
//!
//! Workloads spawn tasks whose PIDs are only known after the fact. A
//! [`ProcessTable`] is a snapshot of process rows (from `ps` output, the
//! local `/proc`, or built by hand); [`TaskResolver`] looks task names up in
//! successive snapshots and keeps the latest PID set seen for each name.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::domain::{ConfigError, Pid};

/// Column holding the task name in snapshots
pub const NAME_COLUMN: &str = "comm";

/// Column holding the PID in snapshots
pub const PID_COLUMN: &str = "pid";

/// Task name → PIDs observed in the most recent snapshot that listed it
pub type TaskTable = BTreeMap<String, BTreeSet<Pid>>;

/// Tabular process snapshot with named columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ProcessTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    /// Append a row; missing trailing cells are left empty.
    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of column `index` for every row
    fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Parse `ps` style output: a header line naming the columns, then one
    /// whitespace separated row per process. Surplus fields are folded into
    /// the last column so command lines with spaces survive.
    ///
    /// Header names are lowercased (`PID` → `pid`), and `NAME`/`COMMAND`/`CMD`
    /// headers are exposed as `comm`.
    ///
    /// # Errors
    /// Returns an error if the output has no header line
    pub fn from_ps_output(output: &str) -> Result<Self> {
        let mut lines = output.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().context("ps output has no header line")?;

        let columns: Vec<String> = header
            .split_whitespace()
            .map(|c| match c.to_lowercase().as_str() {
                "name" | "command" | "cmd" => NAME_COLUMN.to_string(),
                other => other.to_string(),
            })
            .collect();
        let width = columns.len();
        let mut table = Self { columns, rows: Vec::new() };

        for line in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < width {
                warn!("Skipping short ps row: {line}");
                continue;
            }
            let mut row: Vec<String> = fields[..width - 1].iter().map(|f| (*f).to_string()).collect();
            row.push(fields[width - 1..].join(" "));
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Snapshot of the local host's processes (`comm`, `pid` columns)
    ///
    /// # Errors
    /// Returns an error if `/proc` cannot be read
    pub fn from_proc() -> Result<Self> {
        Self::from_proc_dir(Path::new("/proc"))
    }

    /// Snapshot built from a procfs-like directory of `<pid>/stat` files
    ///
    /// # Errors
    /// Returns an error if `proc_dir` cannot be read
    pub fn from_proc_dir(proc_dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(proc_dir)
            .with_context(|| format!("Failed to read {}", proc_dir.display()))?;

        let mut table = Self::new([NAME_COLUMN, PID_COLUMN]);
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Ok(pid) = file_name.to_string_lossy().parse::<u32>() else {
                continue;
            };

            // Processes may exit between listing and reading
            let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            let Ok(comm) = extract_comm(&stat) else {
                continue;
            };

            table.rows.push(vec![comm, pid.to_string()]);
        }
        Ok(table)
    }
}

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
fn extract_comm(stat_line: &str) -> Result<String> {
    let open = stat_line.find('(').context("Invalid stat format")?;
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    if open >= close {
        bail!("Invalid stat format");
    }
    Ok(stat_line[open + 1..close].to_string())
}

/// Accumulates task name → PID set across snapshots.
#[derive(Debug, Clone, Default)]
pub struct TaskResolver {
    tasks: TaskTable,
}

impl TaskResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `name` (with no PIDs yet) so default lookups include it
    pub fn track(&mut self, name: impl Into<String>) {
        self.tasks.entry(name.into()).or_default();
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    /// Resolve `names` (default: every tracked name) against `table` using
    /// the `comm` and `pid` columns.
    ///
    /// # Errors
    /// See [`TaskResolver::resolve_with_columns`]
    pub fn resolve(
        &mut self,
        table: Option<&ProcessTable>,
        names: Option<&[&str]>,
    ) -> Result<&TaskTable, ConfigError> {
        self.resolve_with_columns(table, names, NAME_COLUMN, PID_COLUMN)
    }

    /// Resolve task PIDs from a snapshot.
    ///
    /// For each name with matching rows, the distinct PIDs of those rows
    /// replace the name's previous set. Names without a match keep their
    /// previous entry. Without a table, the current table is returned as is.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingColumn`] if `table` lacks either column
    pub fn resolve_with_columns(
        &mut self,
        table: Option<&ProcessTable>,
        names: Option<&[&str]>,
        name_column: &str,
        pid_column: &str,
    ) -> Result<&TaskTable, ConfigError> {
        let Some(table) = table else {
            return Ok(&self.tasks);
        };

        let name_idx = table
            .column_index(name_column)
            .ok_or_else(|| ConfigError::MissingColumn(name_column.to_string()))?;
        let pid_idx = table
            .column_index(pid_column)
            .ok_or_else(|| ConfigError::MissingColumn(pid_column.to_string()))?;

        let names: Vec<String> = match names {
            Some(names) => names.iter().map(|n| (*n).to_string()).collect(),
            None => self.tasks.keys().cloned().collect(),
        };

        debug!("Lookup dataset for tasks...");
        for name in names {
            let pids: BTreeSet<Pid> = table
                .column(name_idx)
                .zip(table.column(pid_idx))
                .filter(|(row_name, _)| *row_name == name)
                .filter_map(|(_, pid)| match pid.trim().parse::<u32>() {
                    Ok(pid) => Some(Pid(pid)),
                    Err(_) => {
                        warn!("Task {name}: unparsable pid '{pid}'");
                        None
                    }
                })
                .collect();

            if pids.is_empty() {
                warn!("Task {name:>16} NOT found");
                continue;
            }

            info!(
                "Task {name:>16} found, pid: {}",
                pids.iter().map(|p| p.0.to_string()).collect::<Vec<_>>().join(", ")
            );
            self.tasks.insert(name, pids);
        }

        Ok(&self.tasks)
    }
}
