use super::s3::MirrorService;
use crate::common::files::is_plain_filename;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const FILES_ROUTE: &str = "/api/v1/comics/files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Images,
    Audio,
    Output,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Images, ArtifactKind::Audio, ArtifactKind::Output];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Images => "images",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Output => "output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub kind: ArtifactKind,
    pub filename: String,
    /// Path on this server the file is served from.
    pub url: String,
    pub remote_url: Option<String>,
}

pub fn file_url(job_id: Uuid, kind: ArtifactKind, filename: &str) -> String {
    format!("{}/{}/{}/{}", FILES_ROUTE, job_id, kind.as_str(), filename)
}

/// Per-job artifact directories under a single root:
/// `{root}/{job_id}/{images,audio,output}`.
#[derive(Clone)]
pub struct StorageService {
    root: PathBuf,
    mirror: Option<MirrorService>,
}

impl StorageService {
    pub fn new(root: PathBuf, mirror: Option<MirrorService>) -> Self {
        Self { root, mirror }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    pub async fn create_project_dirs(&self, job_id: Uuid) -> Result<PathBuf> {
        let base = self.project_dir(job_id);
        for kind in ArtifactKind::ALL {
            let dir = base.join(kind.as_str());
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(base)
    }

    pub async fn write(
        &self,
        job_id: Uuid,
        kind: ArtifactKind,
        filename: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredArtifact> {
        if !is_plain_filename(filename) {
            return Err(anyhow!("Refusing to store artifact with name {:?}", filename));
        }

        let path = self.project_dir(job_id).join(kind.as_str()).join(filename);
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("💾 Stored {} ({} bytes)", path.display(), data.len());

        let remote_url = match &self.mirror {
            Some(mirror) => {
                let key = format!("{}/{}/{}", job_id, kind.as_str(), filename);
                match mirror.put_object(&key, data, content_type).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!("Mirror upload of {} failed: {}", key, e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(StoredArtifact {
            kind,
            filename: filename.to_string(),
            url: file_url(job_id, kind, filename),
            remote_url,
        })
    }

    /// Looks up a stored file; `None` for unknown kinds, unsafe names and missing files.
    pub async fn resolve(&self, job_id: Uuid, kind: &str, filename: &str) -> Option<PathBuf> {
        let kind = ArtifactKind::parse(kind)?;
        if !is_plain_filename(filename) {
            return None;
        }

        let path = self.project_dir(job_id).join(kind.as_str()).join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}
