use super::utils::require_login;
use anyhow::{Result, bail};
use taskdesk_application::AppContext;

pub async fn list(context: &AppContext) -> Result<()> {
    require_login(context).await?;
    let users = context.users();
    users.fetch_users().await?;

    let state = users.state();
    if state.users.is_empty() {
        println!("No users found");
        return Ok(());
    }
    println!("{:<36}  {:<8}  {:<20}  {:<28}  NAME", "ID", "ENABLED", "USERNAME", "EMAIL");
    for user in &state.users {
        println!(
            "{:<36}  {:<8}  {:<20}  {:<28}  {}",
            user.id,
            if user.enabled { "yes" } else { "no" },
            user.username,
            user.email,
            user.display_name()
        );
    }
    Ok(())
}

pub async fn set_enabled(context: &AppContext, user_id: &str, enabled: bool) -> Result<()> {
    require_login(context).await?;
    context.users().toggle_status(user_id, enabled).await?;
    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("✓ {verb} user {user_id}");
    Ok(())
}

pub async fn invite(context: &AppContext, emails: &[String]) -> Result<()> {
    let invalid: Vec<&str> = emails
        .iter()
        .map(String::as_str)
        .filter(|email| !looks_like_email(email))
        .collect();
    if !invalid.is_empty() {
        bail!("Invalid email address: {}", invalid.join(", "));
    }

    require_login(context).await?;
    context.users().invite_bulk(emails).await?;
    println!("✓ Sent {} invitation(s)", emails.len());
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("ana@example.com"));
        assert!(!looks_like_email("ana"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ana@localhost"));
        assert!(!looks_like_email("ana@example."));
    }
}
