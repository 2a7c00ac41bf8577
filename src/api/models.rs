use tracing::debug;

use crate::api::{ModelInfo, ModelsResponse, UsageStats};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    endpoint: &str,
) -> Result<T, ChatError> {
    let url = construct_api_url(base_url, endpoint);
    debug!(%url, "Fetching");
    let response = client
        .get(url)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {api_key}"))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::http(status, &body));
    }

    Ok(response.json::<T>().await?)
}

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<ModelsResponse, ChatError> {
    get_json(client, base_url, api_key, "models").await
}

pub async fn fetch_usage_stats(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<UsageStats, ChatError> {
    get_json(client, base_url, api_key, "stats").await
}

/// Newest models first; models without a creation date sort last, by id.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| match (a.created, b.created) {
        (Some(a_created), Some(b_created)) => b_created.cmp(&a_created).then(a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}
