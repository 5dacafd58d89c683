//! 会话存储 - 基础设施层
//!
//! 上传层把文件放在：
//! - `<sessions>/<session_id>/exam/`     唯一的考试文件
//! - `<sessions>/<session_id>/context/`  零个或多个上下文文件
//!
//! 生成结果放在 `<ai_results>/<session_id>/`，`results.json` 是结果清单。
//! 新结果先写入暂存目录，三个水平全部成功后才替换旧结果。

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::models::{GenerationResult, ProficiencyLevel};

const MANIFEST_FILE: &str = "results.json";
const STAGING_PREFIX: &str = ".staging-";

/// 会话文件存储
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    results_dir: PathBuf,
}

impl SessionStore {
    pub fn new(config: &Config) -> Self {
        Self::with_dirs(config.sessions_dir(), config.results_dir())
    }

    pub fn with_dirs(sessions_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// 会话的考试文件（目录中按文件名排序的第一个）
    pub async fn exam_file(&self, session_id: &str) -> AppResult<Option<PathBuf>> {
        let dir = self.session_dir(session_id)?.join("exam");
        Ok(list_files(&dir).await?.into_iter().next())
    }

    /// 会话的上下文文件，按文件名排序
    pub async fn context_files(&self, session_id: &str) -> AppResult<Vec<PathBuf>> {
        let dir = self.session_dir(session_id)?.join("context");
        list_files(&dir).await
    }

    /// 所有已上传过文件的会话
    pub async fn list_sessions(&self) -> AppResult<Vec<String>> {
        if !self.sessions_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(&self.sessions_dir)
            .await
            .map_err(|e| AppError::file_read_failed(&self.sessions_dir, e))?;

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(&self.sessions_dir, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                if is_valid_session_id(name) {
                    sessions.push(name.to_string());
                }
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// 会话的结果目录
    pub fn results_dir(&self, session_id: &str) -> AppResult<PathBuf> {
        if !is_valid_session_id(session_id) {
            return Err(AppError::exam_not_found(session_id));
        }
        Ok(self.results_dir.join(session_id))
    }

    /// 读取当前的结果清单（没有清单时为空）
    pub async fn load_results(&self, session_id: &str) -> AppResult<Vec<GenerationResult>> {
        let path = self.results_dir(session_id)?.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::file_read_failed(&path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::File(FileError::ManifestParseFailed {
                path: path.display().to_string(),
                source: e,
            })
        })
    }

    /// 创建本次生成的暂存目录
    pub async fn create_staging(&self, session_id: &str) -> AppResult<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%f");
        let dir = self
            .results_dir(session_id)?
            .join(format!("{}{}", STAGING_PREFIX, stamp));
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::file_write_failed(&dir, e))?;
        debug!("创建暂存目录: {}", dir.display());
        Ok(dir)
    }

    /// 丢弃暂存目录（生成失败时调用，旧结果保持不变）
    pub async fn discard_staging(&self, staging_dir: &Path) {
        if let Err(e) = fs::remove_dir_all(staging_dir).await {
            warn!("⚠️ 清理暂存目录失败 {}: {}", staging_dir.display(), e);
        }
    }

    /// 提交暂存结果：删除旧结果，移动新文件，写入新清单
    ///
    /// # 返回
    /// 指向最终位置的结果记录
    pub async fn commit(
        &self,
        session_id: &str,
        staging_dir: &Path,
        staged: Vec<GenerationResult>,
    ) -> AppResult<Vec<GenerationResult>> {
        let session_dir = self.results_dir(session_id)?;
        let removed = self.clear_results(session_id).await?;
        debug!("[会话 {}] 已删除 {} 个旧结果", session_id, removed);

        let mut committed = Vec::with_capacity(staged.len());
        for mut result in staged {
            let file_name = result
                .file_path
                .file_name()
                .map(|n| n.to_os_string())
                .ok_or_else(|| {
                    AppError::file_write_failed(
                        &result.file_path,
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, "缺少文件名"),
                    )
                })?;
            let target = session_dir.join(file_name);
            fs::rename(&result.file_path, &target)
                .await
                .map_err(|e| AppError::file_write_failed(&target, e))?;
            result.file_path = target;
            committed.push(result);
        }

        self.write_manifest(&session_dir, &committed).await?;
        self.discard_staging(staging_dir).await;

        Ok(committed)
    }

    /// 删除会话的全部旧结果（清单中的文件 + 清单本身）
    ///
    /// 清单损坏时按文件名删除目录中残留的 `*_<水平>.docx`
    ///
    /// # 返回
    /// 删除的结果数量
    pub async fn clear_results(&self, session_id: &str) -> AppResult<usize> {
        let session_dir = self.results_dir(session_id)?;
        let previous: Vec<PathBuf> = match self.load_results(session_id).await {
            Ok(previous) => previous.into_iter().map(|r| r.file_path).collect(),
            Err(AppError::File(FileError::ManifestParseFailed { path, source })) => {
                warn!("⚠️ 结果清单损坏，按文件名清理旧结果 ({}): {}", path, source);
                stale_result_files(&session_dir).await?
            }
            Err(e) => return Err(e),
        };

        for old in &previous {
            match fs::remove_file(old).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::file_delete_failed(old, e)),
            }
        }

        let manifest = session_dir.join(MANIFEST_FILE);
        if manifest.exists() {
            fs::remove_file(&manifest)
                .await
                .map_err(|e| AppError::file_delete_failed(&manifest, e))?;
        }

        Ok(previous.len())
    }

    async fn write_manifest(&self, session_dir: &Path, results: &[GenerationResult]) -> AppResult<()> {
        let path = session_dir.join(MANIFEST_FILE);
        let tmp_path = session_dir.join(format!("{}.part", MANIFEST_FILE));
        let content = serde_json::to_string_pretty(results).map_err(|e| {
            AppError::File(FileError::ManifestParseFailed {
                path: path.display().to_string(),
                source: e,
            })
        })?;

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(&tmp_path, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;
        Ok(())
    }

    fn session_dir(&self, session_id: &str) -> AppResult<PathBuf> {
        if !is_valid_session_id(session_id) {
            return Err(AppError::exam_not_found(session_id));
        }
        Ok(self.sessions_dir.join(session_id))
    }
}

/// 会话 ID 只允许字母、数字、`-` 和 `_`，防止路径穿越
fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 结果目录中按命名规则属于某个水平的文档
async fn stale_result_files(session_dir: &Path) -> AppResult<Vec<PathBuf>> {
    let suffixes: Vec<String> = ProficiencyLevel::ALL
        .iter()
        .map(|level| format!("_{}.docx", level.as_str()))
        .collect();
    let files = list_files(session_dir).await?;
    Ok(files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s.as_str())))
        })
        .collect())
}

/// 列出目录中的普通文件，按文件名排序；目录不存在时为空
async fn list_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| AppError::file_read_failed(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(dir, e))?
    {
        if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
