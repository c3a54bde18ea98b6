//! AI command implementation

use anyhow::{bail, Result};
use taskdeck_core::db::Database;
use taskdeck_core::models::{Category, User};
use taskdeck_core::{
    save_task_draft, AIInvocation, AIOutput, AIRequest, AiConfig, OutputKind, ProviderSelector,
};
use tracing::debug;

use super::tasks::print_task;

/// Tag names and task titles the owner already has
pub struct ContextHints {
    pub tags: Vec<String>,
    pub tasks: Vec<String>,
}

pub fn context_hints(db: &Database, owner: &User) -> Result<ContextHints> {
    let tags = db
        .list_tags(&owner.id)?
        .into_iter()
        .map(|t| t.tag.name)
        .collect();
    let tasks = db
        .list_tasks(&owner.id, None)?
        .into_iter()
        .map(|t| t.title)
        .collect();

    Ok(ContextHints { tags, tasks })
}

/// Where `ai create --save` stores the drafted task
pub struct SaveTarget<'a> {
    pub db: &'a Database,
    pub owner: &'a User,
    pub category: Category,
}

pub async fn cmd_ai(
    config: &AiConfig,
    kind: &str,
    engine: &str,
    text: &str,
    hints: Option<ContextHints>,
    save: Option<SaveTarget<'_>>,
) -> Result<()> {
    let kind: OutputKind = kind.parse()?;
    if save.is_some() && kind != OutputKind::Create {
        bail!("--save only applies to the create operation");
    }

    let mut request = AIRequest::new(text);
    if let Some(hints) = hints {
        debug!(
            tags = hints.tags.len(),
            tasks = hints.tasks.len(),
            "Using owner context hints"
        );
        request.existing_tags = hints.tags;
        request.existing_tasks = hints.tasks;
    }

    let selector = ProviderSelector::new(config.clone());
    let invocation =
        AIInvocation::new(engine, kind, request).with_api_key(config.cloud.api_key.as_deref());
    let output = selector.invoke(&invocation).await?;

    match (save, output) {
        (Some(target), AIOutput::Create { task: draft }) => {
            let task = save_task_draft(target.db, &target.owner.id, &draft, target.category)?;
            println!("✅ Created task from text");
            print_task(&task);
        }
        (_, output) => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}
