//! Note command implementations

use anyhow::Result;
use taskdeck_core::db::Database;
use taskdeck_core::models::{NewNote, NoteCategory, User};

use super::tasks::parse_arg;
use super::truncate;

pub fn cmd_notes_list(db: &Database, owner: &User, category: Option<&str>) -> Result<()> {
    let category: Option<NoteCategory> =
        category.map(|c| parse_arg(c, "note category")).transpose()?;
    let notes = db.list_notes(&owner.id, category)?;

    if notes.is_empty() {
        println!("No notes found. Add one with:");
        println!("  taskdeck notes add \"Meeting notes\" --content \"...\"");
        return Ok(());
    }

    println!();
    println!("🗒️  Notes");
    println!("   ─────────────────────────────────────────────────────────────");
    for note in notes {
        println!(
            "   {} │ {:<9} │ {}  ({})",
            note.updated_at.format("%Y-%m-%d"),
            note.category.as_str(),
            truncate(&note.title, 40),
            note.id
        );
        if !note.content.is_empty() {
            println!("     {}", truncate(note.content.lines().next().unwrap_or(""), 60));
        }
    }

    Ok(())
}

pub fn cmd_notes_add(
    db: &Database,
    owner: &User,
    title: &str,
    content: &str,
    category: &str,
) -> Result<()> {
    let note = db.create_note(
        &owner.id,
        &NewNote {
            title: title.to_string(),
            content: content.to_string(),
            category: parse_arg(category, "note category")?,
            priority: None,
        },
    )?;

    println!("✅ Added note '{}' (id: {})", note.title, note.id);
    Ok(())
}

pub fn cmd_notes_delete(db: &Database, owner: &User, id: &str) -> Result<()> {
    db.delete_note(&owner.id, id)?;
    println!("🗑️  Deleted note {}", id);
    Ok(())
}
