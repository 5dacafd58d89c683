//! 插入位置推断服务 - 业务能力层
//!
//! 考试文件中没有占位符时，请 LLM 给出"答案的哪一段放在哪个段落之后"。
//! LLM 的回复被当作不可信输入：先完整校验类型和范围，再修改文档。
//! 回复无法解析时不报错，交给下一级（追加到文末）处理。

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::infrastructure::DocxPackage;
use crate::models::ProficiencyLevel;
use crate::services::document_splicer::{answer_paragraphs, SpliceOptions};
use crate::services::llm_service::{ChatBackend, ChatMessage};

const LOCATOR_SYSTEM_MESSAGE: &str =
    "You place student answers into exam documents. Reply with JSON only, without any explanation.";

/// 一条插入指令（只在推断过程中短暂存在）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionInstruction {
    /// 插入到这个段落之后
    pub after: usize,
    /// 原样插入的文本片段
    pub text: String,
}

/// 插入位置推断服务
pub struct FallbackLocator<'a, B: ChatBackend> {
    backend: &'a B,
    api_key: Option<&'a str>,
}

impl<'a, B: ChatBackend> FallbackLocator<'a, B> {
    pub fn new(backend: &'a B, api_key: Option<&'a str>) -> Self {
        Self { backend, api_key }
    }

    /// 请 LLM 推断插入位置并插入答案
    ///
    /// # 返回
    /// 至少插入了一条时返回 true；请求失败、回复无法解析或没有有效条目时返回 false
    pub async fn insert(
        &self,
        doc: &mut DocxPackage,
        level: ProficiencyLevel,
        answer: &str,
        options: &SpliceOptions,
    ) -> bool {
        let paragraphs = doc.paragraph_texts();
        let messages = [
            ChatMessage::system(LOCATOR_SYSTEM_MESSAGE),
            ChatMessage::user(build_locator_prompt(&paragraphs, answer)),
        ];

        let response = match self.backend.complete(&messages, self.api_key).await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️ [{}] 插入位置推断请求失败，改为追加到文末: {}", level, e);
                return false;
            }
        };

        let instructions = parse_instructions(&response, paragraphs.len());
        if instructions.is_empty() {
            debug!("[{}] LLM 没有给出有效的插入位置", level);
            return false;
        }

        let applied = apply_instructions(doc, level, instructions, options);
        info!("[{}] 🤖 按 LLM 推断插入了 {} 处答案", level, applied);
        applied > 0
    }
}

/// 构建插入位置推断的提示词
pub fn build_locator_prompt(paragraphs: &[String], answer: &str) -> String {
    let numbered = paragraphs
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}: {}", i, text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The exam document consists of the following paragraphs, each prefixed with its index:

{}

Student answer:
{}

Split the student answer into segments and decide after which paragraph each segment belongs.
Respond only with a JSON array of objects of the form {{"after": <paragraph index>, "text": "<segment>"}}.
Copy every segment literally. Do not change its wording or its language."#,
        numbered, answer
    )
}

/// 解析并校验 LLM 的回复
///
/// 顶层不是数组或无法解析时返回空列表；单个条目无效时只跳过该条目
pub fn parse_instructions(response: &str, paragraph_count: usize) -> Vec<InsertionInstruction> {
    let json: JsonValue = match serde_json::from_str(strip_code_fence(response)) {
        Ok(json) => json,
        Err(e) => {
            warn!("⚠️ 无法解析插入位置回复: {}", e);
            return Vec::new();
        }
    };

    let Some(entries) = json.as_array() else {
        warn!("⚠️ 插入位置回复不是数组");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let instruction = validate_entry(entry, paragraph_count);
            if instruction.is_none() {
                debug!("跳过无效的插入条目: {}", entry);
            }
            instruction
        })
        .collect()
}

fn validate_entry(entry: &JsonValue, paragraph_count: usize) -> Option<InsertionInstruction> {
    let after = usize::try_from(entry.get("after")?.as_u64()?).ok()?;
    if after >= paragraph_count {
        return None;
    }
    let text = entry.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(InsertionInstruction {
        after,
        text: text.to_string(),
    })
}

/// 按段落索引从大到小插入，先插入的内容不会影响尚未处理的索引
///
/// 同一段落的多条指令保持回复中的先后顺序
fn apply_instructions(
    doc: &mut DocxPackage,
    level: ProficiencyLevel,
    instructions: Vec<InsertionInstruction>,
    options: &SpliceOptions,
) -> usize {
    let mut ordered: Vec<(usize, InsertionInstruction)> =
        instructions.into_iter().enumerate().collect();
    ordered.sort_by(|(pos_a, a), (pos_b, b)| b.after.cmp(&a.after).then(pos_b.cmp(pos_a)));

    let mut applied = 0;
    for (_, instruction) in ordered {
        let block = answer_paragraphs(doc, level, &instruction.text, options);
        if doc.insert_after(instruction.after, block) {
            applied += 1;
        }
    }
    applied
}

/// 去掉回复外层的 Markdown 代码块
fn strip_code_fence(response: &str) -> &str {
    let Ok(re) = Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$") else {
        return response.trim();
    };
    re.captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| response.trim())
}
