//! Task CRUD, category moves, and board ordering

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::tags::load_entity_tags;
use super::{new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::*;

const TASK_COLUMNS: &str = "id, owner_id, title, description, category, priority, status, task_order, due_date, created_at, updated_at";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let category: String = row.get(4)?;
    let priority: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;
    let due_date: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: category.parse().unwrap_or_default(),
        priority: priority.and_then(|p| p.parse().ok()),
        status: status.parse().unwrap_or_default(),
        task_order: row.get(7)?,
        due_date: due_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        tags: Vec::new(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn clean_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidData("Task title cannot be empty".to_string()));
    }
    Ok(title)
}

fn fetch_task(conn: &Connection, owner_id: &str, id: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!(
                "SELECT {} FROM tasks WHERE id = ? AND owner_id = ?",
                TASK_COLUMNS
            ),
            params![id, owner_id],
            task_from_row,
        )
        .optional()?;

    match task {
        Some(mut task) => {
            task.tags = load_entity_tags(conn, EntityKind::Task, &task.id)?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

/// Owner's task IDs in board order
fn ordered_task_ids(conn: &Connection, owner_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM tasks WHERE owner_id = ? ORDER BY task_order, created_at, id",
    )?;
    let ids = stmt
        .query_map(params![owner_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Rewrite `task_order` as `0..n` following `ids`
fn write_order(conn: &Connection, ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "UPDATE tasks SET task_order = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND task_order != ?",
    )?;
    for (index, id) in ids.iter().enumerate() {
        stmt.execute(params![index as i64, id, index as i64])?;
    }
    Ok(())
}

impl Database {
    /// Create a task at the end of the owner's board
    pub fn create_task(&self, owner_id: &str, task: &NewTask) -> Result<Task> {
        let title = clean_title(&task.title)?;
        let conn = self.conn()?;
        let id = new_id();

        conn.execute(
            r#"
            INSERT INTO tasks (id, owner_id, title, description, category, priority, status, due_date, task_order)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?,
                    (SELECT COALESCE(MAX(task_order) + 1, 0) FROM tasks WHERE owner_id = ?))
            "#,
            params![
                id,
                owner_id,
                title,
                task.description,
                task.category.as_str(),
                task.priority.map(|p| p.as_str()),
                task.status.as_str(),
                task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                owner_id,
            ],
        )?;

        debug!(task_id = %id, "Created task");
        fetch_task(&conn, owner_id, &id)?
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))
    }

    /// Get one of the owner's tasks with its tags
    pub fn get_task(&self, owner_id: &str, id: &str) -> Result<Option<Task>> {
        let conn = self.conn()?;
        fetch_task(&conn, owner_id, id)
    }

    /// List the owner's tasks in board order, optionally for one category
    pub fn list_tasks(&self, owner_id: &str, category: Option<Category>) -> Result<Vec<Task>> {
        let conn = self.conn()?;

        let mut tasks = match category {
            Some(cat) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM tasks WHERE owner_id = ? AND category = ? ORDER BY task_order, created_at, id",
                    TASK_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![owner_id, cat.as_str()], task_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM tasks WHERE owner_id = ? ORDER BY task_order, created_at, id",
                    TASK_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![owner_id], task_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        for task in &mut tasks {
            task.tags = load_entity_tags(&conn, EntityKind::Task, &task.id)?;
        }

        Ok(tasks)
    }

    /// Apply a partial update
    pub fn update_task(&self, owner_id: &str, id: &str, update: &TaskUpdate) -> Result<Task> {
        let conn = self.conn()?;
        if fetch_task(&conn, owner_id, id)?.is_none() {
            return Err(Error::NotFound(format!("Task {} not found", id)));
        }

        // Build dynamic update query
        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref title) = update.title {
            updates.push("title = ?");
            values.push(Box::new(clean_title(title)?.to_string()));
        }
        if let Some(ref description) = update.description {
            updates.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(category) = update.category {
            updates.push("category = ?");
            values.push(Box::new(category.as_str()));
        }
        if let Some(priority) = update.priority {
            updates.push("priority = ?");
            values.push(Box::new(priority.map(|p| p.as_str())));
        }
        if let Some(status) = update.status {
            updates.push("status = ?");
            values.push(Box::new(status.as_str()));
        }
        if let Some(due_date) = update.due_date {
            updates.push("due_date = ?");
            values.push(Box::new(due_date.map(|d| d.format("%Y-%m-%d").to_string())));
        }

        if !updates.is_empty() {
            updates.push("updated_at = CURRENT_TIMESTAMP");
            values.push(Box::new(id.to_string()));
            let sql = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, params_refs.as_slice())?;
        }

        fetch_task(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))
    }

    /// Move a task to another board column
    pub fn update_task_category(&self, owner_id: &str, id: &str, category: Category) -> Result<Task> {
        self.update_task(
            owner_id,
            id,
            &TaskUpdate {
                category: Some(category),
                ..Default::default()
            },
        )
    }

    /// Delete a task (its tag associations go with it, the tags stay)
    pub fn delete_task(&self, owner_id: &str, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM tasks WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Task {} not found", id)));
        }
        debug!(task_id = %id, "Deleted task");
        Ok(())
    }

    /// Reorder the owner's board
    ///
    /// `ids` come first in the given order; tasks not listed keep their
    /// relative order after them. The whole board ends up numbered `0..n`.
    pub fn reorder_tasks(&self, owner_id: &str, ids: &[String]) -> Result<Vec<Task>> {
        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(Error::InvalidData(format!("Task {} listed twice", dup)));
        }

        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let current = ordered_task_ids(&tx, owner_id)?;
            let owned: HashSet<&str> = current.iter().map(String::as_str).collect();
            if let Some(foreign) = ids.iter().find(|id| !owned.contains(id.as_str())) {
                return Err(Error::NotFound(format!("Task {} not found", foreign)));
            }

            let mut order: Vec<String> = ids.to_vec();
            order.extend(current.into_iter().filter(|id| !seen.contains(id.as_str())));
            write_order(&tx, &order)?;

            tx.commit()?;
        }

        self.list_tasks(owner_id, None)
    }

    /// Move one task to `position` on the board (clamped to the end)
    pub fn move_task(&self, owner_id: &str, id: &str, position: usize) -> Result<Task> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let mut order = ordered_task_ids(&tx, owner_id)?;
            let index = order
                .iter()
                .position(|t| t == id)
                .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;

            let task_id = order.remove(index);
            order.insert(position.min(order.len()), task_id);
            write_order(&tx, &order)?;

            tx.commit()?;
        }

        self.get_task(owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))
    }
}
