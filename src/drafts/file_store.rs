use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use super::{content_hash, Draft, DraftError, DraftRequest, DraftStore, DraftSummary};

/// Stores each draft as `<id>.json` in a directory
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn draft_path(&self, id: &str) -> Option<PathBuf> {
        // Ids become file names, so only uuid-shaped ids are accepted
        let safe = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        safe.then(|| self.dir.join(format!("{id}.json")))
    }

    async fn read(&self, id: &str) -> Result<Option<Draft>, DraftError> {
        let path = self
            .draft_path(id)
            .ok_or_else(|| DraftError::NotFound(id.to_string()))?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn write(&self, request: DraftRequest, published: bool) -> Result<Draft, DraftError> {
        fs::create_dir_all(&self.dir).await?;

        let now = Utc::now();
        let existing = match &request.id {
            Some(id) => self.read(id).await?,
            None => None,
        };
        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = self
            .draft_path(&id)
            .ok_or_else(|| DraftError::NotFound(id.clone()))?;

        let form_data = request.form_data.as_ref().clone();
        let draft = Draft {
            content_hash: content_hash(&form_data),
            id,
            kind: request.kind,
            step: request.step,
            form_data,
            published: published || existing.as_ref().is_some_and(|d| d.published),
            created_at: existing.map(|d| d.created_at).unwrap_or(now),
            updated_at: now,
        };

        let contents = serde_json::to_string_pretty(&draft)?;
        fs::write(&path, contents).await?;
        tracing::debug!(id = %draft.id, published = draft.published, "draft written");
        Ok(draft)
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save_draft(&self, request: DraftRequest) -> Result<String, DraftError> {
        Ok(self.write(request, false).await?.id)
    }

    async fn complete(&self, request: DraftRequest) -> Result<(), DraftError> {
        self.write(request, true).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Draft, DraftError> {
        self.read(id)
            .await?
            .ok_or_else(|| DraftError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<DraftSummary>, DraftError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Draft>(&contents) {
                Ok(draft) => summaries.push(draft.summary()),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable draft");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormData;
    use crate::wizard::WizardKind;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn request(id: Option<String>, title: &str) -> DraftRequest {
        DraftRequest {
            id,
            kind: WizardKind::Property,
            step: 2,
            form_data: Arc::new(FormData::new().with("title", title)),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_draft() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path().join("drafts"));

        let id = store.save_draft(request(None, "Casa en Jarabacoa")).await.unwrap();
        let draft = store.load(&id).await.unwrap();

        assert_eq!(draft.form_data.text("title"), "Casa en Jarabacoa");
        assert_eq!(draft.step, 2);
        assert!(!draft.published);
        assert_eq!(draft.content_hash, content_hash(&draft.form_data));
    }

    #[tokio::test]
    async fn test_saving_with_id_updates_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path());

        let id = store.save_draft(request(None, "First title")).await.unwrap();
        let created_at = store.load(&id).await.unwrap().created_at;
        let same = store
            .save_draft(request(Some(id.clone()), "Second title"))
            .await
            .unwrap();

        assert_eq!(same, id);
        let draft = store.load(&id).await.unwrap();
        assert_eq!(draft.form_data.text("title"), "Second title");
        assert_eq!(draft.created_at, created_at);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_marks_published() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path());

        let id = store.save_draft(request(None, "Listing")).await.unwrap();
        store.complete(request(Some(id.clone()), "Listing")).await.unwrap();

        assert!(store.load(&id).await.unwrap().published);
    }

    #[tokio::test]
    async fn test_unsafe_ids_are_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path());

        let err = store.load("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, DraftError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path().join("nope"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
