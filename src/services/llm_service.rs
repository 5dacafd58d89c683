//! LLM 服务 - 业务能力层
//!
//! 只负责"发一次对话请求，拿回一段文本"，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务
//!
//! ## 密钥
//! 每次调用都可以显式传入密钥，优先于进程级默认值（`LLM_API_KEY` / `OPENAI_API_KEY`）。
//! 这是外部配置层把凭据交给核心流程的唯一入口。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
}

/// 一条对话消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// 生成后端
///
/// 一次请求 / 一次响应，不做流式输出，不做重试
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// 发送有序消息列表，返回去除首尾空白的回复内容
    async fn complete(&self, messages: &[ChatMessage], api_key: Option<&str>) -> AppResult<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用兼容 OpenAI 的 chat completion 接口
/// - 每次调用按需选择密钥
/// - 不关心提示词内容和流程顺序
#[derive(Debug, Clone)]
pub struct LlmService {
    api_base_url: String,
    model_name: String,
    default_api_key: Option<String>,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        Self {
            api_base_url: config.llm_api_base_url.clone(),
            model_name: config.llm_model_name.clone(),
            default_api_key: config.llm_api_key.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `api_key`: 显式密钥（可选），优先于默认密钥
    ///
    /// # 示例
    /// ```no_run
    /// # use exam_simulator::services::LlmService;
    /// # async fn example(service: &LlmService) -> exam_simulator::AppResult<()> {
    /// let response = service
    ///     .send_to_llm("Was ist Photosynthese?", Some("Du bist ein Schüler."), None)
    ///     .await?;
    /// println!("LLM 响应: {}", response);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        api_key: Option<&str>,
    ) -> AppResult<String> {
        let mut messages = Vec::new();
        if let Some(sys_msg) = system_message {
            messages.push(ChatMessage::system(sys_msg));
        }
        messages.push(ChatMessage::user(user_message));
        self.complete(&messages, api_key).await
    }

    /// 按密钥优先级创建客户端
    fn client(&self, api_key: Option<&str>) -> AppResult<Client<OpenAIConfig>> {
        let key = api_key
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref())
            .ok_or(LlmError::MissingApiKey)?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(key)
            .with_api_base(&self.api_base_url);

        Ok(Client::with_config(openai_config))
    }
}

impl ChatBackend for LlmService {
    async fn complete(&self, messages: &[ChatMessage], api_key: Option<&str>) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!(
            "消息数: {}, 总长度: {} 字符",
            messages.len(),
            messages.iter().map(|m| m.content.chars().count()).sum::<usize>()
        );

        let client = self.client(api_key)?;

        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<AppResult<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(request_messages)
            .build()
            .map_err(build_failed)?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        let content = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.to_string())
    }
}

fn to_request_message(message: &ChatMessage) -> AppResult<ChatCompletionRequestMessage> {
    let built = match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::System),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::User),
    };
    built.map_err(build_failed)
}

fn build_failed(e: async_openai::error::OpenAIError) -> AppError {
    AppError::Llm(LlmError::RequestBuildFailed {
        source: Box::new(e),
    })
}
