//! 提示词拼接服务 - 业务能力层
//!
//! 把会话的考试文件和上下文文件拼成一个有长度上限的提示词。
//! 超过上限直接报错，不做截断，避免悄悄丢掉考试内容。

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::SessionStore;
use crate::services::text_extractor::extract_text;

/// 上下文文件之间的分隔
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// 提示词拼接服务
pub struct PromptAssembler {
    store: SessionStore,
    max_prompt_chars: usize,
}

impl PromptAssembler {
    pub fn new(config: &Config) -> Self {
        Self::with_store(SessionStore::new(config), config.max_prompt_chars)
    }

    pub fn with_store(store: SessionStore, max_prompt_chars: usize) -> Self {
        Self {
            store,
            max_prompt_chars,
        }
    }

    /// 为会话拼接提示词
    ///
    /// # 返回
    /// - 没有考试文件: `AppError::NotFound`
    /// - 拼接后超过上限: `AppError::PromptTooLarge`
    pub async fn assemble_prompt(&self, session_id: &str) -> AppResult<String> {
        let exam_path = self
            .store
            .exam_file(session_id)
            .await?
            .ok_or_else(|| AppError::exam_not_found(session_id))?;
        let context_paths = self.store.context_files(session_id).await?;

        info!(
            "[会话 {}] 📄 拼接提示词: 考试文件 {}, 上下文文件 {} 个",
            session_id,
            exam_path.display(),
            context_paths.len()
        );

        let exam_text = extract_text(&exam_path).await?;
        let mut context_texts = Vec::with_capacity(context_paths.len());
        for path in &context_paths {
            context_texts.push(extract_text(path).await?);
        }

        compose_prompt(&exam_text, &context_texts, self.max_prompt_chars)
    }
}

/// 按固定模板拼接提示词，并在拼接之后检查长度
pub fn compose_prompt(
    exam_text: &str,
    context_texts: &[String],
    max_prompt_chars: usize,
) -> AppResult<String> {
    let context_text = context_texts.join(CONTEXT_SEPARATOR);
    let prompt = format!(
        "Exam:\n{}\n\nAdditional context:\n{}",
        exam_text, context_text
    );

    let actual = prompt.chars().count();
    debug!("提示词长度: {} / {} 字符", actual, max_prompt_chars);

    if actual > max_prompt_chars {
        return Err(AppError::PromptTooLarge {
            actual,
            max: max_prompt_chars,
        });
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 模板本身的字符数
    fn boilerplate_len() -> usize {
        compose_prompt("", &[], usize::MAX).unwrap().chars().count()
    }

    #[test]
    fn test_length_is_sum_of_parts() {
        let contexts = vec!["first".to_string(), "zweite Datei".to_string()];
        let prompt = compose_prompt("Frage 1", &contexts, 25_000).unwrap();

        let joined = contexts.join(CONTEXT_SEPARATOR);
        assert_eq!(
            prompt.chars().count(),
            "Frage 1".chars().count() + joined.chars().count() + boilerplate_len()
        );
        assert!(prompt.starts_with("Exam:\nFrage 1\n\nAdditional context:\n"));
        assert!(prompt.ends_with("first\n\nzweite Datei"));
    }

    #[test]
    fn test_oversized_prompt_is_rejected() {
        let exam = "x".repeat(24_000);
        let context = vec!["y".repeat(2_000)];

        let err = compose_prompt(&exam, &context, 25_000).unwrap_err();
        match err {
            AppError::PromptTooLarge { actual, max } => {
                assert_eq!(actual, 26_000 + boilerplate_len());
                assert_eq!(max, 25_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_limit_is_inclusive() {
        let exam = "x".repeat(100);
        let exact = 100 + boilerplate_len();
        assert!(compose_prompt(&exam, &[], exact).is_ok());
        assert!(compose_prompt(&exam, &[], exact - 1).is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let exam = "ä".repeat(50);
        let exact = 50 + boilerplate_len();
        assert!(compose_prompt(&exam, &[], exact).is_ok());
    }

    #[tokio::test]
    async fn test_missing_exam_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = SessionStore::with_dirs(root.path().join("sessions"), root.path().join("out"));
        let assembler = PromptAssembler::with_store(store, 25_000);

        let err = assembler.assemble_prompt("empty").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_assemble_from_session_files() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("sessions/s1");
        std::fs::create_dir_all(session.join("exam")).unwrap();
        std::fs::create_dir_all(session.join("context")).unwrap();
        crate::infrastructure::DocxPackage::from_paragraphs(&["Aufgabe 1", "[Antwort]"])
            .save(&session.join("exam/klausur.docx"))
            .unwrap();
        std::fs::write(session.join("context/01_notes.txt"), "Photosynthese").unwrap();
        std::fs::write(session.join("context/02_table.csv"), "a,b\n1,2").unwrap();

        let store = SessionStore::with_dirs(root.path().join("sessions"), root.path().join("out"));
        let prompt = PromptAssembler::with_store(store, 25_000)
            .assemble_prompt("s1")
            .await
            .unwrap();

        assert_eq!(
            prompt,
            "Exam:\nAufgabe 1\n[Antwort]\n\nAdditional context:\nPhotosynthese\n\na,b\n1,2"
        );
    }
}
