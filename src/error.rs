use std::path::Path;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 会话中没有考试文件
    #[error("会话 {session_id} 中没有上传考试文件")]
    NotFound { session_id: String },
    /// 拼接后的提示词超过上限
    #[error("上下文文件过多或过大: 提示词长度 {actual} 字符, 上限 {max} 字符")]
    PromptTooLarge { actual: usize, max: usize },
    /// 文本提取错误
    #[error("文本提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 一次生成过程失败（汇总后的错误，只保留原始消息）
    #[error("会话 {session_id} 的答案生成失败: {message}")]
    Generation { session_id: String, message: String },
}

/// DOCX 包解析错误
#[derive(Debug, Error)]
pub enum DocxError {
    /// ZIP 容器损坏
    #[error("ZIP 解析失败: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// XML 解析失败
    #[error("XML 解析失败: {0}")]
    Xml(#[from] quick_xml::Error),
    /// 读写失败
    #[error("IO 失败: {0}")]
    Io(#[from] std::io::Error),
    /// 缺少必要的部件
    #[error("缺少部件: {0}")]
    MissingPart(String),
    /// 结构不符合预期
    #[error("文档结构异常: {0}")]
    Malformed(String),
}

/// 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// DOCX 解析失败
    #[error("DOCX 解析失败 ({path}): {source}")]
    Docx {
        path: String,
        #[source]
        source: DocxError,
    },
    /// 考试文件不是 DOCX，无法写回答案
    #[error("考试文件必须是 DOCX: {path}")]
    UnsupportedExam { path: String },
    /// CSV 解析失败
    #[error("CSV 解析失败 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求构建失败
    #[error("LLM 请求构建失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回结果为空
    #[error("LLM返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 没有可用的 API 密钥
    #[error("未配置 API 密钥")]
    MissingApiKey,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除文件失败
    #[error("删除文件失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 结果清单解析失败
    #[error("结果清单解析失败 ({path}): {source}")]
    ManifestParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 生成的文档无法写出
    #[error("文档写出失败 ({path}): {source}")]
    DocxWriteFailed {
        path: String,
        #[source]
        source: DocxError,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 不支持的提示词语言
    #[error("不支持的提示词语言: {language}")]
    UnknownLanguage { language: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建"考试文件不存在"错误
    pub fn exam_not_found(session_id: impl Into<String>) -> Self {
        AppError::NotFound {
            session_id: session_id.into(),
        }
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建文件删除错误
    pub fn file_delete_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::File(FileError::DeleteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 把任意错误汇总成一次生成失败
    pub fn generation_failed(session_id: impl Into<String>, cause: &AppError) -> Self {
        AppError::Generation {
            session_id: session_id.into(),
            message: cause.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
