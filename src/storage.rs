use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::Task;

/// Environment variable overriding the tasks database location.
pub const DB_ENV: &str = "LONGHABIT_DB";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Returns the path to the tasks database file (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `LONGHABIT_DB` environment variable.
/// 2. `~/.local/share/longhabit/tasks.json` (on Linux).
/// 3. `./longhabit/tasks.json` (fallback).
pub fn default_db_path() -> PathBuf {
    std::env::var(DB_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("longhabit");
        p.push("tasks.json");
        p
    })
}

/// JSON-backed task store. Settings live in the same directory.
#[derive(Debug, Clone)]
pub struct Store {
    tasks_path: PathBuf,
}

impl Store {
    /// Opens the store at `tasks_path`, creating its parent directory.
    #[tracing::instrument]
    pub fn open(tasks_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(dir) = tasks_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        info!(tasks = %tasks_path.display(), "opened task store");
        Ok(Self { tasks_path })
    }

    /// Opens the store in a directory, using the default file name.
    pub fn in_dir(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join("tasks.json"))
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    /// Path of `name` next to the tasks file.
    pub fn sibling(&self, name: &str) -> PathBuf {
        let mut p = self.tasks_path.clone();
        p.pop();
        p.push(name);
        p
    }

    /// Loads all tasks. A missing file is an empty list.
    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let path = &self.tasks_path;
        if !path.exists() {
            debug!(path = %path.display(), "no task file yet");
            return Ok(Vec::new());
        }
        let io_err = |source| StoreError::Io { path: path.clone(), source };
        let mut f = OpenOptions::new().read(true).open(path).map_err(io_err)?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(io_err)?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        let tasks: Vec<Task> = serde_json::from_str(&s).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    /// Loads a single task by its ID.
    pub fn load_task(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self.load_tasks()?.into_iter().find(|t| t.id == id))
    }

    /// Saves the given list of tasks, replacing the file.
    ///
    /// The data goes to a temp file in the same directory which is then
    /// renamed over `tasks.json`, so a failed write leaves the old file intact.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let path = &self.tasks_path;
        let s = serde_json::to_string_pretty(tasks)?;
        let io_err = |source| StoreError::Io { path: path.clone(), source };
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(s.as_bytes()).map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        temp.persist(path).map_err(|err| io_err(err.error))?;
        debug!(path = %path.display(), "saved tasks");
        Ok(())
    }

    /// Saves or updates a single task.
    ///
    /// If a task with the same ID exists it is replaced; otherwise it is added.
    pub fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.load_tasks()?;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(t) => *t = task.clone(),
            None => tasks.push(task.clone()),
        }
        self.save_tasks(&tasks)
    }

    /// Deletes the tasks file and any extra files named in `others`.
    #[tracing::instrument(skip(self))]
    pub fn delete_database(&self, others: &[&str]) -> Result<(), StoreError> {
        let mut paths = vec![self.tasks_path.clone()];
        paths.extend(others.iter().map(|n| self.sibling(n)));
        for path in paths {
            if path.exists() {
                fs::remove_file(&path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
                info!(path = %path.display(), "removed");
            }
        }
        Ok(())
    }
}

/// Next free id: one past the highest in use.
pub fn next_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn missing_and_blank_files_load_empty() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(&dir.path().join("nested")).unwrap();
        assert!(store.load_tasks().unwrap().is_empty());
        fs::write(store.tasks_path(), "  \n").unwrap();
        assert!(store.load_tasks().unwrap().is_empty());
    }

    #[test]
    fn save_task_inserts_then_replaces() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();

        let mut task = Task::new(1, "Meditate".into(), now);
        store.save_task(&task).unwrap();
        task.history.push(now);
        store.save_task(&task).unwrap();

        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks, vec![task]);
        assert_eq!(next_id(&tasks), 2);
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        fs::write(store.tasks_path(), "stale contents that are longer than the new file").unwrap();

        let tasks = vec![Task::new(1, "Floss".into(), now)];
        store.save_tasks(&tasks).unwrap();
        assert_eq!(store.load_tasks().unwrap(), tasks);

        store.save_tasks(&[]).unwrap();
        assert!(store.load_tasks().unwrap().is_empty());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("tasks.json")]);
    }

    #[test]
    fn failed_save_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let tasks = vec![Task::new(1, "Floss".into(), now)];
        store.save_tasks(&tasks).unwrap();

        // a directory in place of the target makes the final rename fail
        let target = dir.path().join("blocked");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();
        let blocked = Store { tasks_path: target.clone() };
        assert!(matches!(blocked.save_tasks(&tasks), Err(StoreError::Io { .. })));
        assert!(target.join("keep").exists());

        assert_eq!(store.load_tasks().unwrap(), tasks);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = Store::in_dir(dir.path()).unwrap();
        fs::write(store.tasks_path(), "{not json").unwrap();
        assert!(matches!(store.load_tasks(), Err(StoreError::Parse { .. })));
    }
}
