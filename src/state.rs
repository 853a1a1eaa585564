use crate::ai::LanguageModel;
use crate::errors::AppError;
use crate::models::AppData;
use crate::storage::{persist_namespace, Namespace};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub model: Arc<dyn LanguageModel>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, data: AppData, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            data_dir,
            data: Arc::new(Mutex::new(data)),
            model,
        }
    }

    /// Write the given namespaces while the caller still holds the lock.
    pub async fn persist(&self, data: &AppData, namespaces: &[Namespace]) -> Result<(), AppError> {
        for namespace in namespaces {
            persist_namespace(&self.data_dir, *namespace, data).await?;
        }
        Ok(())
    }
}
