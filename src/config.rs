use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 会话与结果文件的根目录
    pub media_root: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    /// 进程级默认密钥，调用时显式传入的密钥优先
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 提示词配置 ---
    pub prompt_language: String,
    /// 自定义提示词的 TOML 文件（可选）
    pub prompt_config_file: Option<PathBuf>,
    pub max_prompt_chars: usize,
    // --- 文档拼接配置 ---
    /// 考试文件中标记答案位置的占位符
    pub answer_placeholder: String,
    /// 插入标题使用的标签，例如 "Low Antwort:"
    pub answer_label: String,
    pub heading_style: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4-1106-preview".to_string(),
            prompt_language: "en".to_string(),
            prompt_config_file: None,
            max_prompt_chars: 25_000,
            answer_placeholder: "[Antwort]".to_string(),
            answer_label: "Antwort".to_string(),
            heading_style: "Heading2".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    ///
    /// # 返回
    /// 数值或布尔项无法解析时返回 `EnvVarParseFailed`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 用给定的查找函数加载配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default = Self::default();
        let string = |name: &str, fallback: String| lookup(name).unwrap_or(fallback);

        Ok(Self {
            media_root: lookup("MEDIA_ROOT").map(PathBuf::from).unwrap_or(default.media_root),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", "bool", default.verbose_logging)?,
            output_log_file: string("OUTPUT_LOG_FILE", default.output_log_file),
            llm_api_key: lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")).or(default.llm_api_key),
            llm_api_base_url: string("LLM_API_BASE_URL", default.llm_api_base_url),
            llm_model_name: string("LLM_MODEL_NAME", default.llm_model_name),
            prompt_language: string("PROMPT_LANGUAGE", default.prompt_language),
            prompt_config_file: lookup("PROMPT_CONFIG_FILE").map(PathBuf::from).or(default.prompt_config_file),
            max_prompt_chars: parse_var(&lookup, "MAX_PROMPT_CHARS", "usize", default.max_prompt_chars)?,
            answer_placeholder: string("ANSWER_PLACEHOLDER", default.answer_placeholder),
            answer_label: string("ANSWER_LABEL", default.answer_label),
            heading_style: string("HEADING_STYLE", default.heading_style),
        })
    }

    /// 上传文件所在目录: `<media_root>/sessions`
    pub fn sessions_dir(&self) -> PathBuf {
        self.media_root.join("sessions")
    }

    /// 生成结果所在目录: `<media_root>/ai_results`
    pub fn results_dir(&self) -> PathBuf {
        self.media_root.join("ai_results")
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    expected_type: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var_name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
