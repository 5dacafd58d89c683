//! 水平处理上下文
//!
//! 封装"我正在为哪个会话生成哪个水平的答案"这一信息

use std::fmt::Display;

use crate::models::ProficiencyLevel;

/// 水平处理上下文
#[derive(Debug, Clone)]
pub struct LevelCtx {
    /// 会话ID
    pub session_id: String,

    /// 当前水平
    pub level: ProficiencyLevel,

    /// 水平序号（从1开始，仅用于日志显示）
    pub level_index: usize,
}

impl LevelCtx {
    /// 创建新的水平上下文
    pub fn new(session_id: impl Into<String>, level: ProficiencyLevel, level_index: usize) -> Self {
        Self {
            session_id: session_id.into(),
            level,
            level_index,
        }
    }
}

impl Display for LevelCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[会话 {} 水平 {}/{} {}]",
            self.session_id,
            self.level_index,
            ProficiencyLevel::ALL.len(),
            self.level
        )
    }
}
