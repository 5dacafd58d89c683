use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::level::ProficiencyLevel;

/// 单个水平的生成结果
///
/// 对外作为可下载的记录：水平 + 会话 + 文件位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub level: ProficiencyLevel,
    pub session_id: String,
    /// 生成的答案文本（已去除首尾空白）
    pub answer: String,
    /// 输出文档路径
    pub file_path: PathBuf,
}

impl GenerationResult {
    pub fn new(
        level: ProficiencyLevel,
        session_id: impl Into<String>,
        answer: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            level,
            session_id: session_id.into(),
            answer: answer.into(),
            file_path: file_path.into(),
        }
    }

    /// 输出文件名（不含目录）
    pub fn file_name(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|n| n.to_str())
    }
}
