//! 文本提取服务 - 业务能力层
//!
//! 只负责"把一个文件变成纯文本"，支持四种格式：
//! - DOCX: 段落文本，换行分隔
//! - CSV: 单元格用逗号连接，行用换行连接
//! - PDF: 按页提取，换行连接；解析失败时返回空字符串
//! - 其他: 按文本读取，忽略无法解码的字节

use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppResult, ExtractionError};
use crate::infrastructure::DocxPackage;

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Csv,
    Pdf,
    Text,
}

impl DocumentFormat {
    /// 按扩展名判断格式（不区分大小写），未知扩展名按文本处理
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("docx") => DocumentFormat::Docx,
            Some("csv") => DocumentFormat::Csv,
            Some("pdf") => DocumentFormat::Pdf,
            _ => DocumentFormat::Text,
        }
    }
}

/// 提取文件文本，格式由扩展名决定
pub async fn extract_text(path: &Path) -> AppResult<String> {
    extract_text_as(path, DocumentFormat::from_path(path)).await
}

/// 按指定格式提取文件文本
///
/// # 返回
/// DOCX / CSV 解析失败会返回错误；PDF 失败只记录警告并返回空字符串
pub async fn extract_text_as(path: &Path, format: DocumentFormat) -> AppResult<String> {
    let text = match format {
        DocumentFormat::Docx => extract_docx(path, &read_bytes(path).await?)?,
        DocumentFormat::Csv => extract_csv(path, &read_bytes(path).await?)?,
        DocumentFormat::Pdf => match fs::read(path).await {
            Ok(bytes) => extract_pdf(path, &bytes),
            Err(e) => {
                warn!("⚠️ PDF 读取失败，按空文本处理 ({}): {}", path.display(), e);
                String::new()
            }
        },
        DocumentFormat::Text => decode_ignoring_invalid(&read_bytes(path).await?),
    };

    debug!(
        "提取文本: {} ({:?}, {} 字符)",
        path.display(),
        format,
        text.chars().count()
    );
    Ok(text)
}

fn extract_docx(path: &Path, bytes: &[u8]) -> AppResult<String> {
    let doc = DocxPackage::from_bytes(bytes).map_err(|e| ExtractionError::Docx {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(doc.text())
}

fn extract_csv(path: &Path, bytes: &[u8]) -> AppResult<String> {
    let content = decode_ignoring_invalid(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractionError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        rows.push(record.iter().collect::<Vec<_>>().join(","));
    }
    Ok(rows.join("\n"))
}

/// 每页文本去掉末尾换行后再用换行连接
fn extract_pdf(path: &Path, bytes: &[u8]) -> String {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("⚠️ PDF 解析失败，按空文本处理 ({}): {}", path.display(), e);
            return String::new();
        }
    };

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!(
                    "⚠️ PDF 第 {} 页提取失败，按空文本处理 ({}): {}",
                    page_number,
                    path.display(),
                    e
                );
                return String::new();
            }
        }
    }
    pages.join("\n")
}

async fn read_bytes(path: &Path) -> AppResult<Vec<u8>> {
    fs::read(path).await.map_err(|e| {
        ExtractionError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        }
        .into()
    })
}

/// UTF-8 解码，直接丢弃无法解码的字节
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
