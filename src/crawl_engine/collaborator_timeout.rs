//! Per-call timeout for collaborator operations
//!
//! Fetchers, intelligence providers and caller hooks may hang. Each call is
//! bounded so a single stuck call becomes an ordinary collaborator failure.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Run `operation`, failing with a timeout error after `timeout_secs`
///
/// # Arguments
/// * `operation` - The collaborator call
/// * `timeout_secs` - Ceiling in seconds
/// * `operation_name` - Name used in the error message
///
/// # Returns
/// * `Ok(T)` - The call completed successfully
/// * `Err` - The call failed or the ceiling was reached
pub async fn with_collaborator_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timed out after {timeout_secs} seconds"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hung_call_becomes_an_error() {
        let result: Result<()> =
            with_collaborator_timeout(std::future::pending(), 2, "extract_content").await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "extract_content timed out after 2 seconds");
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        let result: Result<()> =
            with_collaborator_timeout(async { Err(anyhow::anyhow!("boom")) }, 2, "fetch").await;
        assert_eq!(result.err().map(|e| e.to_string()).as_deref(), Some("boom"));
    }
}
