use crate::{
    error::{Error, Result},
    types::{
        NewSubtask, NewTask, ParsePriorityError, Priority, Subtask, SubtaskId, SubtaskUpdate,
        Task, TaskId, TaskUpdate,
    },
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Connection, Error as SQLiteError, OptionalExtension, Result as SQLiteResult, Row, ToSql,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

impl From<SQLiteError> for Error {
    fn from(value: SQLiteError) -> Self {
        Error::Database(format!("There was a database error: {value:?}"))
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> SQLiteResult<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParsePriorityError| {
                FromSqlError::Other(Box::new(Error::Bug(format!("Stored value: {e}"))))
            })
    }
}

const SCHEMA_VERSION: i64 = 1;

const INITIALIZE: &str = "
CREATE TABLE IF NOT EXISTS 'TASK' (
	'ID'	INTEGER PRIMARY KEY AUTOINCREMENT,
	'CATEGORY'	TEXT NOT NULL,
	'NAME'	TEXT NOT NULL,
	'DETAIL'	TEXT,
	'PRIORITY'	TEXT CHECK (PRIORITY IN ('low', 'medium', 'high')),
	'ASSIGNEE'	TEXT,
	'CREATED'	INTEGER NOT NULL,
	'UPDATED'	INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS 'SUBTASK' (
	'ID'	INTEGER PRIMARY KEY AUTOINCREMENT,
	'TASK_ID'	INTEGER NOT NULL,
	'NAME'	TEXT NOT NULL,
	'DETAIL'	TEXT,
	'COMPLETED'	INTEGER NOT NULL DEFAULT 0,
	'INITIATED'	INTEGER NOT NULL DEFAULT 0,
	'CREATED'	INTEGER NOT NULL,
	'UPDATED'	INTEGER NOT NULL,
	FOREIGN KEY('TASK_ID') REFERENCES 'TASK'('ID') ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS 'SUBTASK_TASK_ID' ON 'SUBTASK'('TASK_ID');
CREATE INDEX IF NOT EXISTS 'TASK_CATEGORY' ON 'TASK'('CATEGORY');
CREATE TABLE IF NOT EXISTS '_META' (
	'VERSION'	INTEGER NOT NULL,
	'CREATED'	INTEGER NOT NULL,
	PRIMARY KEY('VERSION')
);
";

const TASK_COLUMNS: &str = "ID, CATEGORY, NAME, DETAIL, PRIORITY, ASSIGNEE, CREATED, UPDATED";
const SUBTASK_COLUMNS: &str =
    "ID, TASK_ID, NAME, DETAIL, COMPLETED, INITIATED, CREATED, UPDATED";

fn now() -> i64 {
    Utc::now().timestamp_millis()
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
    DateTime::from_timestamp(millis.div_euclid(1000), nanos).unwrap_or_default()
}

/// Handle to the task store. Every operation opens its own connection and
/// closes it before returning, so a `Db` carries no session state.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    path: PathBuf,
}

impl Db {
    pub(crate) fn open(path: impl AsRef<Path>) -> Result<Db> {
        let db = Db {
            path: path.as_ref().to_path_buf(),
        };
        if let Some(parent) = db.path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Opening database at {:?}", db.path);
        let conn = db.connect()?;
        debug!("Database connection opened, initializing...");
        Self::initialize(&conn)?;
        debug!("Database initialized.");
        Ok(db)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(INITIALIZE)?;
        conn.execute(
            "INSERT OR IGNORE INTO _META(VERSION, CREATED) VALUES(?, ?)",
            (SCHEMA_VERSION, now()),
        )?;
        Ok(())
    }

    fn parse_task(row: &Row<'_>) -> SQLiteResult<Task> {
        Ok(Task {
            id: row.get(0)?,
            category: row.get(1)?,
            name: row.get(2)?,
            detail: row.get(3)?,
            priority: row.get(4)?,
            assignee: row.get(5)?,
            created: timestamp(row.get(6)?),
            updated: timestamp(row.get(7)?),
        })
    }

    fn parse_subtask(row: &Row<'_>) -> SQLiteResult<Subtask> {
        Ok(Subtask {
            id: row.get(0)?,
            task_id: row.get(1)?,
            name: row.get(2)?,
            detail: row.get(3)?,
            completed: row.get(4)?,
            initiated: row.get(5)?,
            created: timestamp(row.get(6)?),
            updated: timestamp(row.get(7)?),
        })
    }

    fn query_task(conn: &Connection, task_id: TaskId) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM TASK WHERE ID = ?"),
                (task_id,),
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }

    fn query_subtask(conn: &Connection, subtask_id: SubtaskId) -> Result<Option<Subtask>> {
        let subtask = conn
            .query_row(
                &format!("SELECT {SUBTASK_COLUMNS} FROM SUBTASK WHERE ID = ?"),
                (subtask_id,),
                Self::parse_subtask,
            )
            .optional()?;
        Ok(subtask)
    }

    pub(crate) fn list_tasks(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM TASK ORDER BY ID"))?;
        let tasks = stmt
            .query_map([], Self::parse_task)?
            .collect::<SQLiteResult<Vec<_>>>()?;
        Ok(tasks)
    }

    pub(crate) fn tasks_in_category(&self, category: &str) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM TASK WHERE CATEGORY = ? ORDER BY ID"
        ))?;
        let tasks = stmt
            .query_map((category,), Self::parse_task)?
            .collect::<SQLiteResult<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Distinct non-empty categories in use, sorted.
    pub(crate) fn categories(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT CATEGORY FROM TASK WHERE CATEGORY <> '' ORDER BY CATEGORY",
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SQLiteResult<Vec<String>>>()?;
        Ok(categories)
    }

    pub(crate) fn get_task(&self, task_id: TaskId) -> Result<Option<Task>> {
        Self::query_task(&self.connect()?, task_id)
    }

    pub(crate) fn create_task(&self, task: &NewTask) -> Result<Task> {
        let conn = self.connect()?;
        let created = now();
        conn.execute(
            "INSERT INTO TASK(CATEGORY, NAME, DETAIL, PRIORITY, ASSIGNEE, CREATED, UPDATED)
            VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                task.category,
                task.name,
                task.detail,
                task.priority,
                task.assignee,
                created,
                created
            ],
        )?;
        let task_id = conn.last_insert_rowid();
        info!("Created task {task_id} in category {:?}", task.category);
        Self::query_task(&conn, task_id)?
            .ok_or_else(|| Error::Bug(format!("Task {task_id} vanished after insert.")))
    }

    /// Applies the fields present in `update`. Returns `None` if no task has
    /// this id.
    pub(crate) fn update_task(&self, task_id: TaskId, update: &TaskUpdate) -> Result<Option<Task>> {
        let conn = self.connect()?;
        if update.is_empty() {
            return Self::query_task(&conn, task_id);
        }

        let mut sets = vec!["UPDATED = ?"];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(now())];
        if let Some(category) = &update.category {
            sets.push("CATEGORY = ?");
            values.push(Box::new(category.clone()));
        }
        if let Some(name) = &update.name {
            sets.push("NAME = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(detail) = &update.detail {
            sets.push("DETAIL = ?");
            values.push(Box::new(detail.clone()));
        }
        if let Some(priority) = update.priority {
            sets.push("PRIORITY = ?");
            values.push(Box::new(priority));
        }
        if let Some(assignee) = &update.assignee {
            sets.push("ASSIGNEE = ?");
            values.push(Box::new(assignee.clone()));
        }
        values.push(Box::new(task_id));

        let sql = format!("UPDATE TASK SET {} WHERE ID = ?", sets.join(", "));
        let params: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        if conn.execute(&sql, params.as_slice())? == 0 {
            debug!("Update of missing task {task_id} ignored.");
            return Ok(None);
        }
        info!("Updated task {task_id}");
        Self::query_task(&conn, task_id)
    }

    /// Deletes a task and, through the foreign key, all of its subtasks.
    pub(crate) fn delete_task(&self, task_id: TaskId) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM TASK WHERE ID = ?", (task_id,))? > 0;
        if deleted {
            info!("Deleted task {task_id}");
        }
        Ok(deleted)
    }

    pub(crate) fn get_subtask(&self, subtask_id: SubtaskId) -> Result<Option<Subtask>> {
        Self::query_subtask(&self.connect()?, subtask_id)
    }

    pub(crate) fn list_subtasks(&self) -> Result<Vec<Subtask>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SUBTASK_COLUMNS} FROM SUBTASK ORDER BY ID"))?;
        let subtasks = stmt
            .query_map([], Self::parse_subtask)?
            .collect::<SQLiteResult<Vec<_>>>()?;
        Ok(subtasks)
    }

    pub(crate) fn subtasks_of(&self, task_id: TaskId) -> Result<Vec<Subtask>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM SUBTASK WHERE TASK_ID = ? ORDER BY ID"
        ))?;
        let subtasks = stmt
            .query_map((task_id,), Self::parse_subtask)?
            .collect::<SQLiteResult<Vec<_>>>()?;
        Ok(subtasks)
    }

    /// Returns `None` without inserting anything when the parent task does
    /// not exist.
    pub(crate) fn create_subtask(&self, subtask: &NewSubtask) -> Result<Option<Subtask>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let parent_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM TASK WHERE ID = ?)",
            (subtask.task_id,),
            |row| row.get(0),
        )?;
        if !parent_exists {
            warn!(
                "Refusing to add subtask {:?} to missing task {}",
                subtask.name, subtask.task_id
            );
            return Ok(None);
        }
        let created = now();
        tx.execute(
            "INSERT INTO SUBTASK(TASK_ID, NAME, DETAIL, COMPLETED, INITIATED, CREATED, UPDATED)
            VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                subtask.task_id,
                subtask.name,
                subtask.detail,
                subtask.completed,
                subtask.initiated,
                created,
                created
            ],
        )?;
        let subtask_id = tx.last_insert_rowid();
        let inserted = Self::query_subtask(&tx, subtask_id)?;
        tx.commit()?;
        info!("Created subtask {subtask_id} under task {}", subtask.task_id);
        Ok(inserted)
    }

    pub(crate) fn update_subtask(
        &self,
        subtask_id: SubtaskId,
        update: &SubtaskUpdate,
    ) -> Result<Option<Subtask>> {
        let conn = self.connect()?;
        if update.is_empty() {
            return Self::query_subtask(&conn, subtask_id);
        }

        let mut sets = vec!["UPDATED = ?"];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(now())];
        if let Some(name) = &update.name {
            sets.push("NAME = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(detail) = &update.detail {
            sets.push("DETAIL = ?");
            values.push(Box::new(detail.clone()));
        }
        if let Some(completed) = update.completed {
            sets.push("COMPLETED = ?");
            values.push(Box::new(completed));
        }
        if let Some(initiated) = update.initiated {
            sets.push("INITIATED = ?");
            values.push(Box::new(initiated));
        }
        values.push(Box::new(subtask_id));

        let sql = format!("UPDATE SUBTASK SET {} WHERE ID = ?", sets.join(", "));
        let params: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        if conn.execute(&sql, params.as_slice())? == 0 {
            debug!("Update of missing subtask {subtask_id} ignored.");
            return Ok(None);
        }
        info!("Updated subtask {subtask_id}");
        Self::query_subtask(&conn, subtask_id)
    }

    pub(crate) fn delete_subtask(&self, subtask_id: SubtaskId) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM SUBTASK WHERE ID = ?", (subtask_id,))? > 0;
        if deleted {
            info!("Deleted subtask {subtask_id}");
        }
        Ok(deleted)
    }
}
