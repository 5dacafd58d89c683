use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::models::prompts::{PromptOverrides, PromptSet};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载自定义提示词
///
/// 文件格式：
/// ```toml
/// [de]
/// system = "..."
/// level_low = "..."
/// ```
pub async fn load_prompt_overrides(toml_file_path: &Path) -> AppResult<PromptOverrides> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path, e))?;

    let overrides: PromptOverrides = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: toml_file_path.display().to_string(),
            source: e,
        })
    })?;

    tracing::debug!(
        "已加载自定义提示词: {} (语言数: {})",
        toml_file_path.display(),
        overrides.len()
    );

    Ok(overrides)
}

/// 按配置解析当前语言的提示词
///
/// 未配置 TOML 文件，或文件不存在时，直接使用内置默认值
pub async fn load_prompt_set(config: &Config) -> AppResult<PromptSet> {
    let overrides = match &config.prompt_config_file {
        Some(path) if path.exists() => Some(load_prompt_overrides(path).await?),
        Some(path) => {
            tracing::warn!("提示词配置文件不存在，使用默认值: {}", path.display());
            None
        }
        None => None,
    };

    PromptSet::resolve(&config.prompt_language, overrides.as_ref())
}
