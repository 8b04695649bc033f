//! Analysis prompt management with enforced history retention.

use serde::{Deserialize, Serialize};
use skincare_admin_core::{PromptHistoryEntry, PromptSetting};
use thiserror::Error;
use tracing::instrument;

use super::ValidationError;
use crate::data::DataAccess;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Prompt history entry not found: {0}")]
    HistoryNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Current prompt plus its history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct PromptOverview {
    pub current: PromptSetting,
    pub history: Vec<PromptHistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePrompt {
    pub prompt: String,
}

pub async fn overview(data: &DataAccess) -> PromptOverview {
    let (current, history) = data.prompt().await;
    PromptOverview { current, history }
}

/// Replace the prompt, recording the previous text in history.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] for blank text,
/// [`ValidationError::Unchanged`] when the text equals the current prompt,
/// or the store error from the write.
#[instrument(skip(data, text))]
pub async fn update(data: &DataAccess, text: &str) -> Result<(), PromptError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Required("prompt").into());
    }
    let (current, _) = data.prompt().await;
    if current.prompt == text {
        return Err(ValidationError::Unchanged.into());
    }
    data.update_prompt(text).await?;
    Ok(())
}

/// Make a history entry the current prompt. The replaced prompt is itself
/// recorded in history. Restoring text equal to the current prompt writes
/// nothing.
///
/// # Errors
///
/// Returns [`PromptError::HistoryNotFound`] for an unknown id, or any error
/// from [`update`].
#[instrument(skip(data))]
pub async fn restore(data: &DataAccess, history_id: &str) -> Result<(), PromptError> {
    let entry = data
        .prompt_history_entry(history_id)
        .await
        .ok_or_else(|| PromptError::HistoryNotFound(history_id.to_string()))?;
    match update(data, &entry.prompt).await {
        Err(PromptError::Validation(ValidationError::Unchanged)) => Ok(()),
        result => result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{ConnectionManager, MemoryConnector, MemoryStore};
    use chrono::{Duration, TimeZone, Utc};
    use skincare_admin_core::{FieldValue, Fields};
    use std::sync::Arc;

    const HISTORY: &str = "settings/skin_analysis_prompt/history";

    fn history_fields(prompt: &str, timestamp: chrono::DateTime<Utc>) -> Fields {
        Fields::from([
            ("prompt".to_string(), FieldValue::from(prompt)),
            ("timestamp".to_string(), FieldValue::Timestamp(timestamp)),
        ])
    }

    fn data_with_prompt(prompt: &str) -> (Arc<MemoryStore>, DataAccess) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                "settings/skin_analysis_prompt",
                Fields::from([("prompt".to_string(), FieldValue::from(prompt))]),
            )
            .unwrap();
        let connector = MemoryConnector::new(store.clone());
        let data = DataAccess::new(Arc::new(ConnectionManager::new(Arc::new(connector))));
        (store, data)
    }

    #[tokio::test]
    async fn test_rejects_blank_and_unchanged() {
        let (store, data) = data_with_prompt("Analyze the skin.");

        assert!(matches!(
            update(&data, "   ").await,
            Err(PromptError::Validation(ValidationError::Required(_)))
        ));
        assert!(matches!(
            update(&data, "Analyze the skin.").await,
            Err(PromptError::Validation(ValidationError::Unchanged))
        ));
        assert_eq!(store.count("settings/skin_analysis_prompt/history"), 0);
    }

    #[tokio::test]
    async fn test_restore_records_replaced_prompt() {
        let (store, data) = data_with_prompt("v1");
        update(&data, "v2").await.unwrap();

        let overview = overview(&data).await;
        assert_eq!(overview.current.prompt, "v2");
        assert_eq!(overview.history.len(), 1);
        let v1_id = overview.history[0].id.clone();

        restore(&data, &v1_id).await.unwrap();
        let overview = super::overview(&data).await;
        assert_eq!(overview.current.prompt, "v1");
        assert_eq!(store.count("settings/skin_analysis_prompt/history"), 2);

        assert!(matches!(
            restore(&data, "missing").await,
            Err(PromptError::HistoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_keeps_newest_entries_past_limit() {
        let (store, data) = data_with_prompt("current");
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        for i in 0..100 {
            store
                .insert(
                    &format!("{HISTORY}/a{i:03}"),
                    history_fields(&format!("old{i}"), base + Duration::minutes(i)),
                )
                .unwrap();
        }
        store
            .insert(&format!("{HISTORY}/zzzz"), history_fields("newest", Utc::now()))
            .unwrap();

        let overview = overview(&data).await;
        assert_eq!(overview.history.len(), 100);
        assert_eq!(overview.history[0].id, "zzzz");
        assert_eq!(overview.history[1].prompt, "old99");
        assert!(overview.history.iter().all(|entry| entry.id != "a000"));
    }

    #[tokio::test]
    async fn test_restore_of_current_text_is_noop() {
        let (store, data) = data_with_prompt("same");
        store
            .insert(&format!("{HISTORY}/h1"), history_fields("same", Utc::now()))
            .unwrap();

        restore(&data, "h1").await.unwrap();
        assert_eq!(store.count(HISTORY), 1);
        assert_eq!(overview(&data).await.current.prompt, "same");
    }
}
