//! Tag management and tag reconciliation commands

use anyhow::{bail, Result};
use taskdeck_core::db::Database;
use taskdeck_core::models::{EntityKind, Tag, TagInput, TagUpdate, TagWithPath, User};
use taskdeck_core::{ReconcileRequest, TagColor, TagReconciler};

use super::truncate;

/// Find a tag by exact name, falling back to ID
pub(crate) fn resolve_tag_arg(db: &Database, owner: &User, name_or_id: &str) -> Result<Tag> {
    if let Some(tag) = db.get_tag_by_name(&owner.id, name_or_id)? {
        return Ok(tag);
    }
    match db.get_tag(&owner.id, name_or_id)? {
        Some(tag) => Ok(tag),
        None => bail!("Tag '{}' not found", name_or_id),
    }
}

pub fn cmd_tags_tree(db: &Database, owner: &User) -> Result<()> {
    let tree = db.get_tag_tree(&owner.id)?;

    if tree.is_empty() {
        println!("No tags found. Create one with:");
        println!("  taskdeck tags add work --color blue");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────────────────────────────────────");

    fn print_tag(tag: &TagWithPath, indent: usize) {
        let prefix = "  ".repeat(indent);
        println!("   {}• {} [{}]", prefix, tag.tag.name, tag.tag.color.color);

        for child in &tag.children {
            print_tag(child, indent + 1);
        }
    }

    for root in &tree {
        print_tag(root, 0);
    }

    Ok(())
}

pub fn cmd_tags_list(db: &Database, owner: &User) -> Result<()> {
    let tags = db.list_tags(&owner.id)?;

    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags by usage");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:<24} {:>6} {:>6}", "Name", "Tasks", "Notes");
    for entry in &tags {
        println!(
            "   {:<24} {:>6} {:>6}",
            truncate(&entry.tag.name, 24),
            entry.task_count,
            entry.note_count
        );
    }

    Ok(())
}

pub fn cmd_tags_add(
    db: &Database,
    owner: &User,
    name: &str,
    color: Option<&str>,
    parent: Option<&str>,
) -> Result<()> {
    let color = color.map(TagColor::from_legacy);
    let parent_id = parent
        .map(|p| resolve_tag_arg(db, owner, p).map(|t| t.id))
        .transpose()?;

    let tag = db.create_tag(&owner.id, name, color.as_ref(), parent_id.as_deref())?;

    println!("✅ Created tag '{}' (id: {})", tag.name, tag.id);
    if let Some(parent) = parent {
        println!("   Parent: {}", parent);
    }
    Ok(())
}

pub fn cmd_tags_rename(db: &Database, owner: &User, name: &str, new_name: &str) -> Result<()> {
    let tag = resolve_tag_arg(db, owner, name)?;
    let updated = db.update_tag(
        &owner.id,
        &tag.id,
        &TagUpdate {
            name: Some(new_name.to_string()),
            color: None,
        },
    )?;

    println!("✅ Renamed '{}' to '{}'", tag.name, updated.name);
    Ok(())
}

pub fn cmd_tags_move(db: &Database, owner: &User, name: &str, to: Option<&str>) -> Result<()> {
    let tag = resolve_tag_arg(db, owner, name)?;
    let parent_id = to
        .map(|p| resolve_tag_arg(db, owner, p).map(|t| t.id))
        .transpose()?;

    db.move_tag(&owner.id, &tag.id, parent_id.as_deref())?;

    match to {
        Some(parent) => println!("✅ Moved '{}' under '{}'", tag.name, parent),
        None => println!("✅ '{}' is now a root tag", tag.name),
    }
    Ok(())
}

pub fn cmd_tags_delete(db: &Database, owner: &User, name: &str) -> Result<()> {
    let tag = resolve_tag_arg(db, owner, name)?;
    let children_moved = db.delete_tag(&owner.id, &tag.id)?;

    println!("🗑️  Deleted tag '{}'", tag.name);
    if children_moved > 0 {
        println!("   {} child tag(s) moved up", children_moved);
    }
    Ok(())
}

pub fn cmd_tags_analytics(db: &Database, owner: &User) -> Result<()> {
    let analytics = db.tag_analytics(&owner.id)?;

    println!();
    println!("📊 Tag Analytics");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Tags:          {}", analytics.total_tags);
    println!("   Usages:        {}", analytics.total_usage);
    println!(
        "   Depth:         max {}, avg {:.1}",
        analytics.hierarchy.max_depth, analytics.hierarchy.avg_depth
    );
    println!(
        "   Shape:         {} parent(s), {} leaf tag(s)",
        analytics.hierarchy.total_parents, analytics.hierarchy.total_leaves
    );

    if !analytics.top_tags.is_empty() {
        println!();
        println!("   Most used:");
        for entry in &analytics.top_tags {
            println!("     {:<24} {:>4}", truncate(&entry.tag.name, 24), entry.total());
        }
    }

    Ok(())
}

/// Replace the tags on a task or note; unknown names are created
pub fn cmd_set_tags(
    db: &Database,
    owner: &User,
    kind: EntityKind,
    id: &str,
    tags: &[String],
) -> Result<()> {
    let inputs: Vec<TagInput> = tags.iter().map(|name| TagInput::named(name)).collect();
    let request = ReconcileRequest::new(&owner.id, kind, id, inputs);
    let resolved = TagReconciler::new(db).reconcile(&request)?;

    if resolved.is_empty() {
        println!("✅ Cleared tags on {} {}", kind.as_str(), id);
    } else {
        let names: Vec<&str> = resolved.iter().map(|t| t.name.as_str()).collect();
        println!("✅ Tagged {} {}: {}", kind.as_str(), id, names.join(", "));
    }
    Ok(())
}
