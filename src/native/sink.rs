use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use crate::core::{
    domain::{Category, Outcome},
    traits::sink::{ResultSink, SinkError},
};

/// Category files under the result directory.
///
/// Each record is a single `write_all` on an append-mode handle, taken under
/// that category's lock, so concurrent records never interleave.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    locks: HashMap<Category, Mutex<()>>,
}

impl FileSink {
    pub fn new<T: AsRef<Path>>(dir: T) -> Self {
        Self {
            dir: dir.as_ref().into(),
            locks: Category::ALL
                .into_iter()
                .map(|category| (category, Mutex::new(())))
                .collect(),
        }
    }

    pub fn path(&self, category: Category) -> PathBuf {
        self.dir.join(category.file_name())
    }

    async fn append(&self, category: Category, text: &str) -> Result<(), SinkError> {
        let path = self.path(category);
        let _guard = match self.locks.get(&category) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        msg: e.to_string(),
    }
}

#[async_trait::async_trait]
impl ResultSink for FileSink {
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn init(&self) -> Result<(), SinkError> {
        if fs::try_exists(&self.dir).await.unwrap_or(false) {
            tracing::info!("Directory already exists: {}", self.dir.display());
        } else {
            tracing::info!("Directory created: {}", self.dir.display());
        }
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        for category in Category::ALL {
            let Some(header) = category.header() else {
                continue;
            };
            let path = self.path(category);
            let empty = match fs::metadata(&path).await {
                Ok(meta) => meta.len() == 0,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
                Err(e) => return Err(io_error(&path, e)),
            };
            if empty {
                self.append(category, &format!("{header}\n")).await?;
            }
            tracing::debug!("{:?} file: {}", category, path.display());
        }

        Ok(())
    }

    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError> {
        match outcome.record() {
            Some((category, text)) => self.append(category, &text).await,
            None => Ok(()),
        }
    }
}
