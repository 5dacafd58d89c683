//! 单个会话处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一个会话的完整生成过程，是会话级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **串行化**：同一会话同时只允许一次运行（`SessionLocks`）
//! 2. **拼接提示词**：委托 `PromptAssembler`
//! 3. **遍历水平**：按 low → medium → high 依次运行 `LevelFlow`
//! 4. **整体提交**：三个水平全部成功后才替换旧结果，否则丢弃暂存文件
//! 5. **错误汇总**：生成过程中的失败统一报告为一条 `AppError::Generation`

use std::path::Path;

use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, ExtractionError};
use crate::infrastructure::{SessionLocks, SessionStore};
use crate::models::{GenerationResult, ProficiencyLevel, PromptSet};
use crate::services::{ChatBackend, DocumentFormat, PromptAssembler, SpliceOptions};
use crate::workflow::{LevelCtx, LevelFlow};

/// 会话处理器
pub struct SessionProcessor<B: ChatBackend> {
    backend: B,
    store: SessionStore,
    assembler: PromptAssembler,
    prompts: PromptSet,
    options: SpliceOptions,
    locks: SessionLocks,
    verbose_logging: bool,
}

impl<B: ChatBackend> SessionProcessor<B> {
    /// 创建会话处理器
    ///
    /// # 参数
    /// - `config`: 配置（目录、提示词上限、拼接选项）
    /// - `prompts`: 已解析的提示词
    /// - `backend`: 生成后端
    pub fn new(config: &Config, prompts: PromptSet, backend: B) -> Self {
        Self {
            backend,
            store: SessionStore::new(config),
            assembler: PromptAssembler::new(config),
            prompts,
            options: SpliceOptions::from_config(config),
            locks: SessionLocks::new(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 为会话生成三个水平的答卷
    ///
    /// # 参数
    /// - `session_id`: 会话ID
    /// - `api_key`: 显式密钥（可选），优先于配置中的默认密钥
    ///
    /// # 返回
    /// - 成功：三条生成结果，指向最终位置
    /// - `NotFound` / `PromptTooLarge` / 提取错误（含非 DOCX 考试文件）：生成前失败，不产生任何文件
    /// - `Generation`：生成过程中失败，旧结果保持不变
    pub async fn generate_ai_results(
        &self,
        session_id: &str,
        api_key: Option<&str>,
    ) -> AppResult<Vec<GenerationResult>> {
        let _guard = self.locks.acquire(session_id).await;
        info!("[会话 {}] 🚀 开始生成答卷", session_id);

        let exam_path = self
            .store
            .exam_file(session_id)
            .await?
            .ok_or_else(|| AppError::exam_not_found(session_id))?;
        if DocumentFormat::from_path(&exam_path) != DocumentFormat::Docx {
            return Err(ExtractionError::UnsupportedExam {
                path: exam_path.display().to_string(),
            }
            .into());
        }
        let prompt = self.assembler.assemble_prompt(session_id).await?;

        let staging_dir = self.store.create_staging(session_id).await?;

        let staged = match self
            .generate_levels(session_id, &prompt, &exam_path, &staging_dir, api_key)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                error!("[会话 {}] ❌ 生成失败，保留旧结果: {}", session_id, e);
                self.store.discard_staging(&staging_dir).await;
                return Err(AppError::generation_failed(session_id, &e));
            }
        };

        let committed = match self.store.commit(session_id, &staging_dir, staged).await {
            Ok(committed) => committed,
            Err(e) => {
                error!("[会话 {}] ❌ 提交结果失败: {}", session_id, e);
                self.store.discard_staging(&staging_dir).await;
                return Err(AppError::generation_failed(session_id, &e));
            }
        };

        info!(
            "[会话 {}] ✅ 答卷生成完成，共 {} 份",
            session_id,
            committed.len()
        );
        Ok(committed)
    }

    /// 依次运行三个水平，遇到第一个失败即停止
    async fn generate_levels(
        &self,
        session_id: &str,
        prompt: &str,
        exam_path: &Path,
        staging_dir: &Path,
        api_key: Option<&str>,
    ) -> AppResult<Vec<GenerationResult>> {
        let flow = LevelFlow::new(
            &self.backend,
            &self.prompts,
            &self.options,
            self.verbose_logging,
        );

        let mut staged = Vec::with_capacity(ProficiencyLevel::ALL.len());
        for (index, level) in ProficiencyLevel::ALL.into_iter().enumerate() {
            let ctx = LevelCtx::new(session_id, level, index + 1);
            let result = flow
                .run(&ctx, prompt, exam_path, staging_dir, api_key)
                .await?;
            staged.push(result);
        }
        Ok(staged)
    }
}
