//! Readers for the small files the helpers depend on.

use crate::error::{KitError, Result};
use std::path::Path;

/// Read the User-Agent string used for outgoing fetches.
///
/// Missing or unreadable files are returned as errors; there is no fallback.
pub async fn read_user_agent(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let agent = tokio::fs::read_to_string(path).await?;
    let agent = agent.trim();
    if agent.is_empty() {
        return Err(KitError::config_error(format!(
            "User-Agent file {} is empty",
            path.display()
        )));
    }
    Ok(agent.to_string())
}
