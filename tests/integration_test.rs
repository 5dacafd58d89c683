use std::path::{Path, PathBuf};
use std::sync::Mutex;

use exam_simulator::{
    App, AppError, AppResult, ChatBackend, ChatMessage, Config, DocxPackage, GenerationResult,
    ProficiencyLevel, PromptSet, SessionProcessor,
};

const LOCATOR_MARKER: &str = "You place student answers";

type Reply = Box<dyn Fn(&[ChatMessage]) -> Result<String, String> + Send + Sync>;

/// 离线后端：答案请求和插入位置请求分别按脚本回复
struct FakeBackend {
    answer: Reply,
    locator: Reply,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeBackend {
    fn new(
        answer: impl Fn(&[ChatMessage]) -> Result<String, String> + Send + Sync + 'static,
        locator: impl Fn(&[ChatMessage]) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            answer: Box::new(answer),
            locator: Box::new(locator),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 按水平指令给出不同的答案
    fn by_level() -> Self {
        Self::new(|messages| Ok(answer_for(messages)), |_| Ok("[]".to_string()))
    }

    fn locator_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| is_locator_request(m))
            .count()
    }
}

impl ChatBackend for FakeBackend {
    async fn complete(&self, messages: &[ChatMessage], _api_key: Option<&str>) -> AppResult<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let reply = if is_locator_request(messages) {
            (self.locator)(messages)
        } else {
            (self.answer)(messages)
        };
        reply.map_err(|msg| AppError::llm_api_failed("fake", std::io::Error::other(msg)))
    }
}

fn is_locator_request(messages: &[ChatMessage]) -> bool {
    messages
        .first()
        .is_some_and(|m| m.content.starts_with(LOCATOR_MARKER))
}

fn answer_for(messages: &[ChatMessage]) -> String {
    let prompts = PromptSet::defaults("en").unwrap();
    let user = &messages[1].content;
    ProficiencyLevel::ALL
        .into_iter()
        .find(|level| user.ends_with(prompts.instruction_for(*level)))
        .map(|level| format!("  answer of a {} student  ", level))
        .unwrap_or_default()
}

fn config(root: &Path) -> Config {
    Config {
        media_root: root.to_path_buf(),
        output_log_file: root.join("output.txt").display().to_string(),
        ..Config::default()
    }
}

fn write_exam(root: &Path, session_id: &str, paragraphs: &[&str]) -> PathBuf {
    let exam_dir = root.join("sessions").join(session_id).join("exam");
    std::fs::create_dir_all(&exam_dir).unwrap();
    let path = exam_dir.join("Klausur.docx");
    DocxPackage::from_paragraphs(paragraphs).save(&path).unwrap();
    path
}

fn write_context(root: &Path, session_id: &str, name: &str, content: &[u8]) {
    let dir = root.join("sessions").join(session_id).join("context");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}

fn processor(config: &Config, backend: FakeBackend) -> SessionProcessor<FakeBackend> {
    SessionProcessor::new(config, PromptSet::defaults("en").unwrap(), backend)
}

fn paragraphs_of(result: &GenerationResult) -> Vec<String> {
    DocxPackage::open(&result.file_path).unwrap().paragraph_texts()
}

fn docx_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".docx"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_marker_pipeline_produces_one_document_per_level() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Question 1", "[Antwort]", "Question 2"]);
    write_context(root.path(), "s1", "notes.txt", b"Photosynthesis needs light.");
    write_context(root.path(), "s1", "table.csv", b"term,meaning\nATP,energy");

    let processor = processor(&config, FakeBackend::by_level());
    let results = processor.generate_ai_results("s1", Some("sk-session")).await.unwrap();

    assert_eq!(results.len(), 3);
    for (result, level) in results.iter().zip(ProficiencyLevel::ALL) {
        assert_eq!(result.level, level);
        assert_eq!(result.session_id, "s1");
        assert_eq!(result.answer, format!("answer of a {} student", level));
        assert_eq!(
            result.file_name(),
            Some(format!("Klausur_{}.docx", level).as_str())
        );
        assert_eq!(
            paragraphs_of(result),
            vec![
                "Question 1".to_string(),
                String::new(),
                format!("{} Antwort:", level.label()),
                result.answer.clone(),
                "Question 2".to_string(),
            ]
        );
    }

    assert_eq!(
        docx_files(&root.path().join("ai_results/s1")),
        vec!["Klausur_high.docx", "Klausur_low.docx", "Klausur_medium.docx"]
    );
}

#[tokio::test]
async fn test_prompt_contains_exam_and_context() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Explain photosynthesis. [Antwort]"]);
    write_context(root.path(), "s1", "a_notes.txt", b"Chlorophyll absorbs light.");
    write_context(root.path(), "s1", "b_broken.pdf", b"%PDF-1.4 garbage");

    let backend = FakeBackend::by_level();
    let processor = processor(&config, backend);
    processor.generate_ai_results("s1", None).await.unwrap();

    let processor_calls = processor_calls(&processor);
    let prompts = PromptSet::defaults("en").unwrap();
    let user = &processor_calls[0][1].content;
    assert!(user.starts_with(
        "Exam:\nExplain photosynthesis. [Antwort]\n\nAdditional context:\nChlorophyll absorbs light.\n\n"
    ));
    assert!(user.ends_with(&format!("{}\n{}", prompts.base, prompts.level_low)));
    assert_eq!(processor_calls[0][0].content, prompts.system);
}

fn processor_calls(processor: &SessionProcessor<FakeBackend>) -> Vec<Vec<ChatMessage>> {
    processor.backend().calls.lock().unwrap().clone()
}

#[tokio::test]
async fn test_ai_assisted_insertion_without_marker() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Task 1", "Task 2", "Task 3"]);

    let backend = FakeBackend::new(
        |messages| Ok(answer_for(messages)),
        |_| Ok(r#"```json
[{"after": 1, "text": "segment for task 2"}, {"after": 9, "text": "dropped"}]
```"#
            .to_string()),
    );
    let processor = processor(&config, backend);
    let results = processor.generate_ai_results("s1", None).await.unwrap();

    for result in &results {
        assert_eq!(
            paragraphs_of(result),
            vec![
                "Task 1".to_string(),
                "Task 2".to_string(),
                format!("{} Antwort:", result.level.label()),
                "segment for task 2".to_string(),
                "Task 3".to_string(),
            ]
        );
    }
    assert_eq!(processor.backend().locator_calls(), 3);
}

#[tokio::test]
async fn test_append_when_locator_gives_nothing_usable() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Task 1", "Task 2"]);

    let backend = FakeBackend::new(
        |messages| Ok(answer_for(messages)),
        |_| Ok("I cannot tell where the answer belongs.".to_string()),
    );
    let results = processor(&config, backend)
        .generate_ai_results("s1", None)
        .await
        .unwrap();

    for result in &results {
        let paragraphs = paragraphs_of(result);
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[2], format!("{} Antwort:", result.level.label()));
        assert_eq!(paragraphs[3], result.answer);
    }
}

#[tokio::test]
async fn test_locator_failure_still_writes_documents() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Task 1"]);

    let backend = FakeBackend::new(
        |messages| Ok(answer_for(messages)),
        |_| Err("locator timed out".to_string()),
    );
    let results = processor(&config, backend)
        .generate_ai_results("s1", None)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| paragraphs_of(r).len() == 3));
}

#[tokio::test]
async fn test_running_twice_leaves_one_result_per_level() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Question", "[Antwort]"]);

    let processor = processor(&config, FakeBackend::by_level());
    processor.generate_ai_results("s1", None).await.unwrap();
    let second = processor.generate_ai_results("s1", None).await.unwrap();

    let stored = processor.store().load_results("s1").await.unwrap();
    assert_eq!(stored, second);
    assert_eq!(stored.len(), 3);
    assert_eq!(docx_files(&root.path().join("ai_results/s1")).len(), 3);
}

#[tokio::test]
async fn test_failure_mid_run_keeps_previous_results() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Question", "[Antwort]"]);

    let previous = processor(&config, FakeBackend::by_level())
        .generate_ai_results("s1", None)
        .await
        .unwrap();

    let prompts = PromptSet::defaults("en").unwrap();
    let high_directive = prompts.level_high.clone();
    let failing = FakeBackend::new(
        move |messages| {
            if messages[1].content.ends_with(&high_directive) {
                Err("backend unavailable".to_string())
            } else {
                Ok("new answer".to_string())
            }
        },
        |_| Ok("[]".to_string()),
    );
    let processor = processor(&config, failing);
    let err = processor.generate_ai_results("s1", None).await.unwrap_err();

    match &err {
        AppError::Generation { session_id, message } => {
            assert_eq!(session_id, "s1");
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let stored = processor.store().load_results("s1").await.unwrap();
    assert_eq!(stored, previous);
    for result in &stored {
        assert!(paragraphs_of(result).contains(&result.answer));
        assert_ne!(result.answer, "new answer");
    }
    assert_eq!(docx_files(&root.path().join("ai_results/s1")).len(), 3);
}

#[tokio::test]
async fn test_missing_exam_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_context(root.path(), "s1", "notes.txt", b"only context");

    let backend = FakeBackend::by_level();
    let processor = processor(&config, backend);
    let err = processor.generate_ai_results("s1", None).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound { .. }));
    assert!(processor_calls(&processor).is_empty());
}

#[tokio::test]
async fn test_oversized_context_is_rejected_before_generation() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "s1", &["Question", "[Antwort]"]);
    write_context(root.path(), "s1", "huge.txt", "x".repeat(25_000).as_bytes());

    let processor = processor(&config, FakeBackend::by_level());
    let err = processor.generate_ai_results("s1", None).await.unwrap_err();

    assert!(matches!(err, AppError::PromptTooLarge { max: 25_000, .. }));
    assert!(processor_calls(&processor).is_empty());
    assert!(processor.store().load_results("s1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_app_processes_all_sessions() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_exam(root.path(), "good", &["Question", "[Antwort]"]);
    write_context(root.path(), "empty", "notes.txt", b"no exam here");

    let app = App::with_backend(config, FakeBackend::by_level()).await.unwrap();
    let stats = app.run(Vec::new()).await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 1);
    assert!(root.path().join("output.txt").exists());
    assert_eq!(docx_files(&root.path().join("ai_results/good")).len(), 3);
}
