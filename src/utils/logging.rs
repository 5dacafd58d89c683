/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 默认日志级别（可被 `RUST_LOG` 覆盖）
const DEFAULT_FILTER: &str = "exam_simulator=info";

/// 初始化 tracing 订阅器
///
/// # 参数
/// - `verbose`: 为 true 时默认级别提升到 debug
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "exam_simulator=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n答案生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `model_name`: 使用的模型
/// - `language`: 提示词语言
pub fn log_startup(model_name: &str, language: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 模拟学生答卷");
    info!("🤖 模型: {}", model_name);
    info!("🌐 提示词语言: {}", language);
    info!("{}", "=".repeat(60));
}

/// 记录会话开始信息
pub fn log_session_start(session_index: usize, total: usize, session_id: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 处理第 {}/{} 个会话: {}", session_index, total, session_id);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
