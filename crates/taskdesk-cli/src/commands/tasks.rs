use super::utils::{format_millis, require_login};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use taskdesk_application::AppContext;
use taskdesk_core::task::{Task, TaskId, TaskPatch, TaskRequest};

/// A create file holds either one request or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreateFile {
    Many(Vec<TaskRequest>),
    One(TaskRequest),
}

fn parse_requests(content: &str) -> Result<Vec<TaskRequest>> {
    let requests = match serde_json::from_str::<CreateFile>(content)
        .context("Expected a task object or an array of task objects")?
    {
        CreateFile::Many(requests) => requests,
        CreateFile::One(request) => vec![request],
    };
    if requests.is_empty() {
        bail!("No tasks to create");
    }
    Ok(requests)
}

fn print_table(tasks: &[Task]) {
    println!(
        "{:>6}  {:<12}  {:<8}  {:<10}  {:<16}  NAME",
        "ID", "STATUS", "PRIORITY", "DUE", "ASSIGNEE"
    );
    for task in tasks {
        println!(
            "{:>6}  {:<12}  {:<8}  {:<10}  {:<16}  {}",
            task.id,
            task.status,
            task.priority,
            format_millis(task.estimate_date),
            task.user_name.as_deref().unwrap_or("-"),
            task.name
        );
    }
}

pub async fn list(context: &AppContext, pages: u32) -> Result<()> {
    require_login(context).await?;
    let tasks = context.tasks();
    let page_size = context.config().page_size;

    for _ in 0..pages.max(1) {
        let state = tasks.state();
        if state.last_applied_page.is_some() && !state.has_more {
            break;
        }
        tasks.fetch_page(state.next_page(), page_size).await?;
    }

    let state = tasks.state();
    print_table(&state.items);
    println!(
        "\nShowing {} of {} tasks (page {} of {})",
        state.items.len(),
        state.pagination.total_elements,
        state.pagination.page + 1,
        state.pagination.total_pages.max(1)
    );
    if state.has_more {
        println!("Use --pages to load more.");
    }
    Ok(())
}

pub async fn show(context: &AppContext, ids: &[TaskId]) -> Result<()> {
    require_login(context).await?;
    let found = context.tasks().find_many(ids).await?;
    if found.is_empty() {
        println!("No matching tasks");
        return Ok(());
    }
    for task in &found {
        println!("#{} {}", task.id, task.name);
        println!("  Status:   {}", task.status);
        println!("  Priority: {}", task.priority);
        println!("  Due:      {}", format_millis(task.estimate_date));
        println!(
            "  Assignee: {}",
            task.user_name.as_deref().unwrap_or("-")
        );
        if !task.description.is_empty() {
            println!("  {}", task.description);
        }
    }
    Ok(())
}

pub async fn create(context: &AppContext, file: &Path) -> Result<()> {
    require_login(context).await?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let requests = parse_requests(&content)?;

    let created = context.tasks().create_many(requests).await?;
    for task in &created {
        println!("✓ Created #{} {}", task.id, task.name);
    }
    Ok(())
}

pub async fn update(context: &AppContext, id: TaskId, patch: TaskPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to update; pass at least one of --name, --status, --priority, --description");
    }
    require_login(context).await?;
    context.tasks().update_one(id, patch).await?;
    println!("✓ Updated task #{id}");
    Ok(())
}

pub async fn delete(context: &AppContext, id: TaskId) -> Result<()> {
    require_login(context).await?;
    context.tasks().delete_one(id).await?;
    println!("✓ Deleted task #{id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::task::TaskStatus;

    const ONE: &str = r#"{
        "name": "Write report",
        "status": "OPEN",
        "priority": "HIGH",
        "estimateDate": 1717200000000,
        "assignToUserId": "u-1",
        "userName": "ana"
    }"#;

    #[test]
    fn test_parse_single_request() {
        let requests = parse_requests(ONE).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "Write report");
        assert_eq!(requests[0].description, "");
    }

    #[test]
    fn test_parse_request_array() {
        let content = format!("[{ONE}, {}]", ONE.replace("OPEN", "BLOCKED"));
        let requests = parse_requests(&content).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].status, TaskStatus::Blocked);
    }

    #[test]
    fn test_parse_rejects_empty_and_malformed() {
        assert!(parse_requests("[]").is_err());
        assert!(parse_requests(r#"{"name":"missing fields"}"#).is_err());
    }
}
