//! # Exam Simulator
//!
//! 模拟三个水平（弱 / 中 /强）的学生答卷：
//! 把考试文件和参考资料拼成提示词，请 LLM 作答，再把答案写回考试文档。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 文件与文档，只暴露能力
//! - `DocxPackage` - 可编辑的 Word 文档（段落级插入，其余部件原样保留）
//! - `SessionStore` - 会话文件、结果清单、暂存与提交
//! - `SessionLocks` - 同一会话的运行串行化
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `text_extractor` - DOCX / CSV / PDF / 文本 → 纯文本
//! - `PromptAssembler` - 拼接有长度上限的提示词
//! - `LlmService` - 对话补全（`ChatBackend` 的默认实现）
//! - `DocumentSplicer` - 占位符 → LLM 推断 → 追加，三级插入
//! - `FallbackLocator` - 没有占位符时请 LLM 推断插入位置
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个水平"的完整处理流程
//! - `LevelCtx` - 上下文封装（session_id + level）
//! - `LevelFlow` - 流程编排（请求答案 → 拼接 → 写入暂存目录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量会话处理器，管理生命周期和统计
//! - `orchestrator/session_processor` - 单个会话处理器，三个水平全部成功才提交
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocxPackage, SessionLocks, SessionStore};
pub use models::{GenerationResult, ProficiencyLevel, PromptSet};
pub use orchestrator::{App, ProcessingStats, SessionProcessor};
pub use services::{ChatBackend, ChatMessage, ChatRole, LlmService};
pub use workflow::{LevelCtx, LevelFlow};
