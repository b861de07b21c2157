use super::utils::require_login;
use anyhow::{Context, Result};
use taskdesk_application::AppContext;

pub async fn login(context: &AppContext, code: Option<&str>) -> Result<()> {
    let session = context.session();
    let Some(code) = code else {
        if session.is_authenticated().await {
            println!("✓ Already logged in");
            return Ok(());
        }
        session.login().await?;
        println!("Then run `taskdesk login --code <CODE>` with the code from the redirect.");
        return Ok(());
    };

    context
        .complete_login(code)
        .await
        .context("Failed to complete login")?;

    let name = session
        .user_info()
        .await
        .and_then(|info| info.username)
        .unwrap_or_else(|| "unknown user".to_string());
    println!("✓ Logged in as {name}");
    Ok(())
}

pub async fn register(context: &AppContext) -> Result<()> {
    context.session().register().await?;
    println!("After registering, run `taskdesk login` to sign in.");
    Ok(())
}

pub async fn logout(context: &AppContext) -> Result<()> {
    context.logout().await.context("Failed to log out")?;
    println!("✓ Logged out");
    Ok(())
}

pub async fn whoami(context: &AppContext) -> Result<()> {
    require_login(context).await?;
    let Some(info) = context.session().user_info().await else {
        anyhow::bail!("The current token carries no readable claims");
    };

    let dash = || "-".to_string();
    println!("User:     {}", info.username.clone().unwrap_or_else(dash));
    println!("Id:       {}", info.id.clone().unwrap_or_else(dash));
    println!("Email:    {}", info.email.clone().unwrap_or_else(dash));
    let full_name = [info.first_name.as_deref(), info.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        println!("Name:     {full_name}");
    }
    if info.roles.is_empty() {
        println!("Roles:    (none)");
    } else {
        println!("Roles:    {}", info.roles.join(", "));
    }
    if context.session().is_token_expired().await {
        println!("⚠ Access token expired; it will be refreshed on the next request.");
    }
    Ok(())
}
