//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量会话处理器
//! - 管理应用生命周期（初始化、运行）
//! - 选择要处理的会话（命令行参数或全部会话）
//! - 持有生成后端（LlmService）
//! - 输出全局统计信息
//!
//! ### `session_processor` - 单个会话处理器
//! - 同一会话的运行串行化
//! - 拼接提示词
//! - 依次运行三个水平的 LevelFlow
//! - 全部成功后提交结果，失败时丢弃暂存文件
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<session_id>)
//!     ↓
//! session_processor (处理三个水平)
//!     ↓
//! workflow::LevelFlow (处理单个水平)
//!     ↓
//! services (能力层：extract / prompt / llm / splice / locate)
//!     ↓
//! infrastructure (基础设施：DocxPackage / SessionStore / SessionLocks)
//! ```

pub mod batch_processor;
pub mod session_processor;

// 重新导出主要类型
pub use batch_processor::{App, ProcessingStats};
pub use session_processor::SessionProcessor;
