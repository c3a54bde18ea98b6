//! Task board command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use taskdeck_core::db::Database;
use taskdeck_core::models::{Category, NewTask, Priority, Task, TaskStatus, TaskUpdate, User};

use super::truncate;

/// Parse a clap string into a model enum with a readable error
pub(crate) fn parse_arg<T>(value: &str, what: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| anyhow::anyhow!("Invalid {}: {}", what, e))
}

pub(crate) fn print_task(task: &Task) {
    let priority = task.priority.map(|p| p.as_str()).unwrap_or("-");
    let due = task
        .due_date
        .map(|d| format!(" (due {})", d))
        .unwrap_or_default();
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
        format!(" [{}]", names.join(", "))
    };
    let check = if task.status == TaskStatus::Done { "✔" } else { " " };

    println!(
        "   {:>3} {} {:<6} │ {:<6} │ {}{}{}  ({})",
        task.task_order,
        check,
        task.category.as_str(),
        priority,
        truncate(&task.title, 40),
        due,
        tags,
        task.id
    );
}

pub fn cmd_tasks_list(db: &Database, owner: &User, category: Option<&str>) -> Result<()> {
    let category: Option<Category> = category.map(|c| parse_arg(c, "category")).transpose()?;
    let tasks = db.list_tasks(&owner.id, category)?;

    if tasks.is_empty() {
        println!("No tasks found. Add one with:");
        println!("  taskdeck tasks add \"Write the report\"");
        return Ok(());
    }

    println!();
    println!("📋 Tasks");
    println!("   ─────────────────────────────────────────────────────────────");
    for task in &tasks {
        print_task(task);
    }

    Ok(())
}

pub fn cmd_tasks_add(
    db: &Database,
    owner: &User,
    title: &str,
    description: Option<String>,
    category: &str,
    priority: Option<&str>,
    due: Option<&str>,
) -> Result<()> {
    let priority: Option<Priority> = priority.map(|p| parse_arg(p, "priority")).transpose()?;
    let due_date = due
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("Invalid due date '{}', expected YYYY-MM-DD", d))
        })
        .transpose()?;

    let task = db.create_task(
        &owner.id,
        &NewTask {
            title: title.to_string(),
            description,
            category: parse_arg(category, "category")?,
            priority,
            status: TaskStatus::Todo,
            due_date,
        },
    )?;

    println!("✅ Added task '{}' (id: {})", task.title, task.id);
    Ok(())
}

pub fn cmd_tasks_done(db: &Database, owner: &User, id: &str) -> Result<()> {
    let task = db.update_task(
        &owner.id,
        id,
        &TaskUpdate {
            status: Some(TaskStatus::Done),
            ..Default::default()
        },
    )?;
    println!("✅ Completed '{}'", task.title);
    Ok(())
}

pub fn cmd_tasks_move(
    db: &Database,
    owner: &User,
    id: &str,
    category: &str,
    position: Option<usize>,
) -> Result<()> {
    let category: Category = parse_arg(category, "category")?;
    let mut task = db.update_task_category(&owner.id, id, category)?;
    if let Some(position) = position {
        task = db.move_task(&owner.id, id, position)?;
    }

    println!(
        "✅ Moved '{}' to {} (position {})",
        task.title,
        task.category.as_str(),
        task.task_order
    );
    Ok(())
}

pub fn cmd_tasks_reorder(db: &Database, owner: &User, ids: &[String]) -> Result<()> {
    let tasks = db.reorder_tasks(&owner.id, ids)?;

    println!("✅ Reordered {} task(s)", tasks.len());
    for task in &tasks {
        print_task(task);
    }
    Ok(())
}

pub fn cmd_tasks_delete(db: &Database, owner: &User, id: &str) -> Result<()> {
    db.delete_task(&owner.id, id)?;
    println!("🗑️  Deleted task {}", id);
    Ok(())
}
