use crate::domain::error::IqmsError;
use crate::domain::model::QueryItem;
use crate::domain::role::{ActiveRole, Level};
use crate::infrastructure::network::retry::retry_with_backoff;
use crate::state::AppState;
use tokio_util::sync::CancellationToken;

/// FAQ list, retried with exponential backoff
pub async fn fetch_faq_list(
    state: &AppState,
    cancel: &CancellationToken,
) -> Result<Vec<QueryItem>, IqmsError> {
    let policy = state.retry_policy().await;
    let source = state.source.clone();

    retry_with_backoff(policy, cancel, "faq list", || {
        let source = source.clone();
        async move { source.fetch_faq().await }
    })
    .await
}

/// Number of frequently raised queries routed to a role at a level
pub async fn fetch_frequency_count(
    state: &AppState,
    role: &ActiveRole,
    level: Level,
    cancel: &CancellationToken,
) -> Result<u64, IqmsError> {
    let key = role.key(level)?;
    let policy = state.retry_policy().await;
    let source = state.source.clone();
    let label = format!("frequency count {}", key);

    retry_with_backoff(policy, cancel, &label, || {
        let source = source.clone();
        let key = key.clone();
        async move { source.fetch_frequency_count(&key).await }
    })
    .await
}
