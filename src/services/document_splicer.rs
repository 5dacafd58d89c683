//! 答案拼接服务 - 业务能力层
//!
//! 把一个水平的答案写进考试文档，按固定顺序尝试三级策略，先成功者生效：
//! 1. 占位符：考试文件中每个占位符后面都插入答案
//! 2. LLM 推断：没有占位符时请 LLM 给出插入位置
//! 3. 追加：以上都不成功时追加到文末
//!
//! 每处插入都是一个标题段落（"<水平> <标签>:"）加一个带水平颜色的正文段落。

use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::DocxError;
use crate::infrastructure::{DocxPackage, Paragraph};
use crate::models::ProficiencyLevel;
use crate::services::fallback_locator::FallbackLocator;
use crate::services::llm_service::ChatBackend;

/// 插入策略（按尝试顺序排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionTier {
    /// 在占位符处插入
    Marker,
    /// 按 LLM 推断的位置插入
    AiAssisted,
    /// 追加到文末
    Append,
}

impl InsertionTier {
    pub const ORDER: [InsertionTier; 3] = [
        InsertionTier::Marker,
        InsertionTier::AiAssisted,
        InsertionTier::Append,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InsertionTier::Marker => "占位符",
            InsertionTier::AiAssisted => "LLM 推断",
            InsertionTier::Append => "追加到文末",
        }
    }
}

/// 拼接选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOptions {
    /// 占位符文本
    pub placeholder: String,
    /// 标题中的标签
    pub label: String,
    /// 标题样式（styleId 或样式名）
    pub heading_style: String,
}

impl Default for SpliceOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SpliceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            placeholder: config.answer_placeholder.clone(),
            label: config.answer_label.clone(),
            heading_style: config.heading_style.clone(),
        }
    }

    /// 标题文本，例如 "Low Antwort:"
    pub fn heading_text(&self, level: ProficiencyLevel) -> String {
        format!("{} {}:", level.label(), self.label)
    }
}

/// 构建一处插入的段落：标题 + 带颜色的正文
///
/// 文档中没有标题样式时，标题退化为无样式段落
pub fn answer_paragraphs(
    doc: &DocxPackage,
    level: ProficiencyLevel,
    text: &str,
    options: &SpliceOptions,
) -> Vec<Paragraph> {
    let heading_style = doc.styles().resolve(&options.heading_style);
    if heading_style.is_none() {
        debug!("文档中没有样式 {}，标题不设置样式", options.heading_style);
    }
    vec![
        Paragraph::build(&options.heading_text(level), heading_style, None),
        Paragraph::build(text, None, Some(level.color())),
    ]
}

/// 在每个包含占位符的段落后插入答案，并删除占位符
///
/// # 返回
/// 插入的处数（即包含占位符的段落数）
pub fn insert_by_marker(
    doc: &mut DocxPackage,
    level: ProficiencyLevel,
    answer: &str,
    options: &SpliceOptions,
) -> Result<usize, DocxError> {
    let placeholder = options.placeholder.as_str();
    if placeholder.is_empty() {
        return Ok(0);
    }

    let marked: Vec<usize> = doc
        .paragraphs()
        .enumerate()
        .filter(|(_, p)| p.text().contains(placeholder))
        .map(|(i, _)| i)
        .collect();

    // 从后往前插入，前面的索引不受影响
    for &index in marked.iter().rev() {
        if let Some(paragraph) = doc.paragraph_mut(index) {
            paragraph.remove_token(placeholder)?;
        }
        let block = answer_paragraphs(doc, level, answer, options);
        doc.insert_after(index, block);
    }

    Ok(marked.len())
}

/// 把答案追加到文末
pub fn append_answer(
    doc: &mut DocxPackage,
    level: ProficiencyLevel,
    answer: &str,
    options: &SpliceOptions,
) {
    let block = answer_paragraphs(doc, level, answer, options);
    doc.append(block);
}

/// 输出文件名: `<考试文件名（不含扩展名）>_<水平>.docx`
pub fn output_file_name(exam_path: &Path, level: ProficiencyLevel) -> String {
    let stem = exam_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("exam");
    format!("{}_{}.docx", stem, level.as_str())
}

/// 答案拼接服务
pub struct DocumentSplicer<'a, B: ChatBackend> {
    options: &'a SpliceOptions,
    locator: FallbackLocator<'a, B>,
}

impl<'a, B: ChatBackend> DocumentSplicer<'a, B> {
    pub fn new(options: &'a SpliceOptions, locator: FallbackLocator<'a, B>) -> Self {
        Self { options, locator }
    }

    /// 把答案拼接进文档
    ///
    /// # 返回
    /// 实际生效的插入策略；每次调用恰好有一种策略生效
    pub async fn splice(
        &self,
        doc: &mut DocxPackage,
        level: ProficiencyLevel,
        answer: &str,
    ) -> Result<InsertionTier, DocxError> {
        for tier in InsertionTier::ORDER {
            let applied = match tier {
                InsertionTier::Marker => {
                    let count = insert_by_marker(doc, level, answer, self.options)?;
                    if count > 0 {
                        debug!("[{}] 找到 {} 个占位符", level, count);
                    }
                    count > 0
                }
                InsertionTier::AiAssisted => {
                    self.locator.insert(doc, level, answer, self.options).await
                }
                InsertionTier::Append => {
                    append_answer(doc, level, answer, self.options);
                    true
                }
            };

            if applied {
                info!("[{}] ✏️ 答案插入方式: {}", level, tier.as_str());
                return Ok(tier);
            }
        }

        // ORDER 的最后一级总会生效
        Ok(InsertionTier::Append)
    }
}
