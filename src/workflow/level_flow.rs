//! 水平处理流程 - 流程层
//!
//! 核心职责：定义"一个水平"的完整处理流程
//!
//! 流程顺序：
//! 1. REQUESTING_ANSWER: 向 LLM 请求该水平的答案
//! 2. SPLICING: 重新加载考试文档，拼接答案（占位符 → LLM 推断 → 追加）
//! 3. WRITTEN: 把文档写入暂存目录
//!
//! 任何一步失败都进入 FAILED，由编排层决定是否继续

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{AppResult, ExtractionError, FileError};
use crate::infrastructure::DocxPackage;
use crate::models::{GenerationResult, PromptSet};
use crate::services::document_splicer::{output_file_name, DocumentSplicer, SpliceOptions};
use crate::services::{ChatBackend, ChatMessage, FallbackLocator};
use crate::utils::logging::truncate_text;
use crate::workflow::level_ctx::LevelCtx;

/// 单个水平的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    RequestingAnswer,
    Splicing,
    Written,
    Failed,
}

impl LevelState {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelState::RequestingAnswer => "REQUESTING_ANSWER",
            LevelState::Splicing => "SPLICING",
            LevelState::Written => "WRITTEN",
            LevelState::Failed => "FAILED",
        }
    }
}

/// 水平处理流程
///
/// - 编排一个水平的请求、拼接、写出
/// - 不持有任何资源，只借用后端和配置
/// - 每个水平都从磁盘重新加载考试文档，水平之间互不影响
pub struct LevelFlow<'a, B: ChatBackend> {
    backend: &'a B,
    prompts: &'a PromptSet,
    options: &'a SpliceOptions,
    verbose_logging: bool,
}

impl<'a, B: ChatBackend> LevelFlow<'a, B> {
    /// 创建新的水平处理流程
    pub fn new(
        backend: &'a B,
        prompts: &'a PromptSet,
        options: &'a SpliceOptions,
        verbose_logging: bool,
    ) -> Self {
        Self {
            backend,
            prompts,
            options,
            verbose_logging,
        }
    }

    /// 运行一个水平的完整流程
    ///
    /// # 参数
    /// - `ctx`: 水平上下文
    /// - `prompt`: 已拼接好的提示词（三个水平共用）
    /// - `exam_path`: 考试文件
    /// - `staging_dir`: 本次生成的暂存目录
    /// - `api_key`: 显式密钥（可选）
    ///
    /// # 返回
    /// 指向暂存文件的生成结果
    pub async fn run(
        &self,
        ctx: &LevelCtx,
        prompt: &str,
        exam_path: &Path,
        staging_dir: &Path,
        api_key: Option<&str>,
    ) -> AppResult<GenerationResult> {
        let result = self
            .run_states(ctx, prompt, exam_path, staging_dir, api_key)
            .await;
        if let Err(e) = &result {
            warn!("{} ❌ {}: {}", ctx, LevelState::Failed.as_str(), e);
        }
        result
    }

    async fn run_states(
        &self,
        ctx: &LevelCtx,
        prompt: &str,
        exam_path: &Path,
        staging_dir: &Path,
        api_key: Option<&str>,
    ) -> AppResult<GenerationResult> {
        // ========== REQUESTING_ANSWER ==========
        self.log_state(ctx, LevelState::RequestingAnswer);
        let answer = self.generate_answer(ctx, prompt, api_key).await?;

        // ========== SPLICING ==========
        self.log_state(ctx, LevelState::Splicing);
        let mut doc = DocxPackage::load(exam_path).await.map_err(|e| ExtractionError::Docx {
            path: exam_path.display().to_string(),
            source: e,
        })?;

        let splicer = DocumentSplicer::new(self.options, FallbackLocator::new(self.backend, api_key));
        splicer
            .splice(&mut doc, ctx.level, &answer)
            .await
            .map_err(|e| ExtractionError::Docx {
                path: exam_path.display().to_string(),
                source: e,
            })?;

        // ========== WRITTEN ==========
        let output_path = staging_dir.join(output_file_name(exam_path, ctx.level));
        doc.write(&output_path).await.map_err(|e| FileError::DocxWriteFailed {
            path: output_path.display().to_string(),
            source: e,
        })?;
        self.log_state(ctx, LevelState::Written);
        debug!("{} 已写入暂存文件: {}", ctx, output_path.display());

        Ok(GenerationResult::new(
            ctx.level,
            ctx.session_id.as_str(),
            answer,
            output_path,
        ))
    }

    /// 请求该水平的答案
    ///
    /// 消息: `[system, user: "{prompt}\n\n{base}\n{水平指令}"]`，返回值已去除首尾空白
    pub async fn generate_answer(
        &self,
        ctx: &LevelCtx,
        prompt: &str,
        api_key: Option<&str>,
    ) -> AppResult<String> {
        let messages = build_messages(self.prompts, ctx, prompt);
        let answer = self.backend.complete(&messages, api_key).await?;
        let answer = answer.trim().to_string();

        info!("{} ✓ 收到答案 ({} 字符)", ctx, answer.chars().count());
        if self.verbose_logging {
            info!("{} 答案预览: {}", ctx, truncate_text(&answer, 80));
        }
        Ok(answer)
    }

    fn log_state(&self, ctx: &LevelCtx, state: LevelState) {
        info!("{} ▶ {}", ctx, state.as_str());
    }
}

/// 构建答案请求的消息列表
pub fn build_messages(prompts: &PromptSet, ctx: &LevelCtx, prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts.system.as_str()),
        ChatMessage::user(format!(
            "{}\n\n{}\n{}",
            prompt,
            prompts.base,
            prompts.instruction_for(ctx.level)
        )),
    ]
}
