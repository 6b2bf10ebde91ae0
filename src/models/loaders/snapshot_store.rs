use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::SnapshotError;
use crate::models::snapshot::SessionSnapshot;

/// 会话快照文件
///
/// 启动时读一次，每批任务结束后整体覆盖写一次
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照；文件不存在或内容损坏时返回 None，相当于全新的未登录会话
    pub async fn load(&self) -> Option<SessionSnapshot> {
        match self.try_load().await {
            Ok(Some(snapshot)) => {
                info!(
                    "✓ 已加载会话快照: {} ({} 个 cookie)",
                    self.path.display(),
                    snapshot.cookies.len()
                );
                Some(snapshot)
            }
            Ok(None) => {
                info!("未找到会话快照 {}，使用全新会话", self.path.display());
                None
            }
            Err(e) => {
                warn!("⚠️ {}，使用全新会话", e);
                None
            }
        }
    }

    pub async fn try_load(&self) -> Result<Option<SessionSnapshot>, SnapshotError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let snapshot = serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(snapshot))
    }

    /// 覆盖写入快照
    ///
    /// 先写临时文件再 rename，磁盘上不会出现写了一半的快照
    pub async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let write_err = |source| SnapshotError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).await.map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).await.map_err(write_err)?;

        debug!(
            "会话快照已写入 {} ({} 个 cookie)",
            self.path.display(),
            snapshot.cookies.len()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
