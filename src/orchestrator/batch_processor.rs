//! 批量会话处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量会话的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、加载提示词、创建 LLM 服务
//! 2. **会话选择**：处理命令行给出的会话，未给出时处理所有已上传的会话
//! 3. **顺序处理**：逐个会话委托 `SessionProcessor`
//! 4. **全局统计**：汇总所有会话的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个会话的细节
//! - **资源所有者**：唯一持有 `LlmService` 的模块
//! - **向下委托**：委托 session_processor 处理单个会话

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::load_prompt_set;
use crate::orchestrator::session_processor::SessionProcessor;
use crate::services::{ChatBackend, LlmService};
use crate::utils::logging;

/// 应用主结构
pub struct App<B: ChatBackend = LlmService> {
    config: Config,
    processor: SessionProcessor<B>,
}

impl App<LlmService> {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let backend = LlmService::new(&config);
        Self::with_backend(config, backend).await
    }
}

impl<B: ChatBackend> App<B> {
    /// 使用指定的生成后端初始化应用
    pub async fn with_backend(config: Config, backend: B) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config.llm_model_name, &config.prompt_language);

        // 加载提示词
        let prompts = load_prompt_set(&config).await?;
        let processor = SessionProcessor::new(&config, prompts, backend);

        Ok(Self { config, processor })
    }

    /// 运行应用主逻辑
    ///
    /// # 参数
    /// - `session_ids`: 要处理的会话；为空时处理所有已上传的会话
    ///
    /// # 返回
    /// 处理统计
    pub async fn run(&self, session_ids: Vec<String>) -> Result<ProcessingStats> {
        let sessions = if session_ids.is_empty() {
            info!("\n📁 正在扫描已上传的会话...");
            self.processor.store().list_sessions().await?
        } else {
            session_ids
        };

        let mut stats = ProcessingStats {
            total: sessions.len(),
            ..Default::default()
        };

        if sessions.is_empty() {
            warn!("⚠️ 没有找到待处理的会话，程序结束");
            return Ok(stats);
        }
        info!("✓ 找到 {} 个待处理的会话", sessions.len());

        // 会话之间顺序处理，单个会话失败不影响后续会话
        for (index, session_id) in sessions.iter().enumerate() {
            logging::log_session_start(index + 1, stats.total, session_id);

            match self.processor.generate_ai_results(session_id, None).await {
                Ok(results) => {
                    for result in &results {
                        info!(
                            "[会话 {}] 📄 {}: {}",
                            session_id,
                            result.level,
                            result.file_path.display()
                        );
                    }
                    stats.success += 1;
                }
                Err(e) => {
                    error!("[会话 {}] ❌ 处理失败: {}", session_id, e);
                    stats.failed += 1;
                }
            }
        }

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}
