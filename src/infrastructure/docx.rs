//! DOCX 包 - 基础设施层
//!
//! 持有一份可编辑的 Word 文档，只暴露段落级能力：
//! 读取段落文本、查找样式、在指定段落后插入、追加到文末、写回文件。
//!
//! DOCX 是一个 ZIP 包：
//! - `word/document.xml`: 正文（段落、表格、分节属性）
//! - `word/styles.xml`: 样式定义
//! - 其余部件（图片、页眉、编号……）原样写回，不做任何修改
//!
//! 正文被拆成一组顶层块：段落单独建模，其余内容（表格、空白、书签）
//! 保留原始 XML 文本，因此没有被编辑的部分字节级不变。

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::DocxError;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// 新建文档时内置的样式（styleId, 名称）
pub const DEFAULT_STYLES: &[(&str, &str)] = &[
    ("Normal", "Normal"),
    ("Heading1", "heading 1"),
    ("Heading2", "heading 2"),
];

/// 正文中的一个段落
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    xml: String,
    text: String,
    style: Option<String>,
}

impl Paragraph {
    /// 从原始 XML 解析段落
    fn parse(xml: String) -> Result<Self, DocxError> {
        let scan = scan_paragraph(&xml)?;
        Ok(Self {
            text: scan.text,
            style: scan.style,
            xml,
        })
    }

    /// 构建一个新段落
    ///
    /// # 参数
    /// - `text`: 段落文本，换行会写成 `<w:br/>`
    /// - `style_id`: 段落样式（必须是文档中已存在的 styleId）
    /// - `color`: 字体颜色（十六进制 RGB）
    pub fn build(text: &str, style_id: Option<&str>, color: Option<&str>) -> Self {
        let mut xml = String::from("<w:p>");
        if let Some(style) = style_id {
            xml.push_str(&format!(
                r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
                escape(style)
            ));
        }
        let run_props = color.map(|c| format!(r#"<w:rPr><w:color w:val="{}"/></w:rPr>"#, escape(c)));
        xml.push_str(&run_xml(run_props.as_deref(), text));
        xml.push_str("</w:p>");

        Self {
            xml,
            text: text.to_string(),
            style: style_id.map(str::to_string),
        }
    }

    /// 段落纯文本
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 段落样式 ID
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// 原始 XML
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// 段落中第一个 run 的颜色（未设置时为 None）
    pub fn color(&self) -> Option<String> {
        scan_paragraph(&self.xml).ok().and_then(|s| s.first_color)
    }

    /// 删除段落中的所有 `token`
    ///
    /// 先尝试在各个 `w:t` 内原地删除，保留 run 的格式；
    /// 如果 token 被拆分到多个 run 中，则改写为单个 run（沿用第一个 run 的格式）。
    ///
    /// # 返回
    /// 段落原本是否包含 token
    pub fn remove_token(&mut self, token: &str) -> Result<bool, DocxError> {
        if token.is_empty() || !self.text.contains(token) {
            return Ok(false);
        }

        let scan = scan_paragraph(&self.xml)?;
        let mut edited = self.xml.clone();
        for span in scan.text_spans.iter().rev() {
            if span.value.contains(token) {
                let replaced = span.value.replace(token, "");
                edited.replace_range(span.start..span.end, &escape(&replaced));
            }
        }

        let rescanned = scan_paragraph(&edited)?;
        if !rescanned.text.contains(token) {
            self.xml = edited;
            self.text = rescanned.text;
            return Ok(true);
        }

        let new_text = self.text.replace(token, "");
        let mut xml = String::from("<w:p>");
        if let Some(props) = &scan.paragraph_props {
            xml.push_str(props);
        }
        xml.push_str(&run_xml(scan.first_run_props.as_deref(), &new_text));
        xml.push_str("</w:p>");

        self.xml = xml;
        self.text = new_text;
        Ok(true)
    }
}

/// 正文的顶层块
#[derive(Debug, Clone)]
enum BodyBlock {
    Paragraph(Paragraph),
    /// 文末的分节属性，追加内容必须在它之前
    SectionProperties(String),
    /// 表格、空白等不需要理解的内容
    Other(String),
}

impl BodyBlock {
    fn xml(&self) -> &str {
        match self {
            BodyBlock::Paragraph(p) => &p.xml,
            BodyBlock::SectionProperties(xml) | BodyBlock::Other(xml) => xml,
        }
    }
}

/// 文档中的样式表：styleId -> 名称
#[derive(Debug, Clone, Default)]
pub struct StyleSet {
    styles: HashMap<String, String>,
}

impl StyleSet {
    /// 把样式 ID 或样式名解析成文档中的 styleId
    ///
    /// 名称匹配忽略大小写和空格，例如 `Heading2` 可以匹配 `heading 2`
    pub fn resolve(&self, style: &str) -> Option<&str> {
        if let Some((id, _)) = self.styles.get_key_value(style) {
            return Some(id.as_str());
        }
        let wanted = normalize_style_name(style);
        self.styles
            .iter()
            .find(|(id, name)| {
                normalize_style_name(name) == wanted || normalize_style_name(id) == wanted
            })
            .map(|(id, _)| id.as_str())
    }
}

fn normalize_style_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 可编辑的 DOCX 文档
#[derive(Debug, Clone)]
pub struct DocxPackage {
    /// ZIP 中的全部部件（按原顺序），document.xml 写回时替换
    parts: Vec<(String, Vec<u8>)>,
    head: String,
    blocks: Vec<BodyBlock>,
    tail: String,
    styles: StyleSet,
}

impl DocxPackage {
    /// 从文件读取
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// 异步读取文件，供运行时内的调用方使用
    pub async fn load(path: &Path) -> Result<Self, DocxError> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(&bytes)
    }

    /// 从内存中的 ZIP 数据读取
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push((file.name().to_string(), data));
        }

        let document_xml = parts
            .iter()
            .find(|(name, _)| name == DOCUMENT_PART)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;

        let styles = match parts.iter().find(|(name, _)| name == STYLES_PART) {
            Some((_, data)) => parse_styles(&String::from_utf8_lossy(data))?,
            None => StyleSet::default(),
        };

        let (head, blocks, tail) = split_body(&document_xml)?;

        Ok(Self {
            parts,
            head,
            blocks,
            tail,
            styles,
        })
    }

    /// 用给定段落新建一个最小文档（带默认样式）
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        Self::from_paragraphs_with_styles(paragraphs, DEFAULT_STYLES)
    }

    /// 用给定段落和样式新建一个最小文档
    pub fn from_paragraphs_with_styles<S: AsRef<str>>(
        paragraphs: &[S],
        styles: &[(&str, &str)],
    ) -> Self {
        let blocks = paragraphs
            .iter()
            .map(|p| BodyBlock::Paragraph(Paragraph::build(p.as_ref(), None, None)))
            .chain(std::iter::once(BodyBlock::SectionProperties(
                SECTION_PROPERTIES.to_string(),
            )))
            .collect();

        let parts = vec![
            ("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels".to_string(), PACKAGE_RELS.as_bytes().to_vec()),
            (DOCUMENT_PART.to_string(), Vec::new()),
            (
                "word/_rels/document.xml.rels".to_string(),
                DOCUMENT_RELS.as_bytes().to_vec(),
            ),
            (STYLES_PART.to_string(), styles_xml(styles).into_bytes()),
        ];

        Self {
            parts,
            head: DOCUMENT_HEAD.to_string(),
            blocks,
            tail: DOCUMENT_TAIL.to_string(),
            styles: StyleSet {
                styles: styles
                    .iter()
                    .map(|(id, name)| (id.to_string(), name.to_string()))
                    .collect(),
            },
        }
    }

    /// 全部段落（按文档顺序）
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            BodyBlock::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs().map(|p| p.text.clone()).collect()
    }

    /// 全文文本，段落之间用换行分隔
    pub fn text(&self) -> String {
        self.paragraph_texts().join("\n")
    }

    pub fn styles(&self) -> &StyleSet {
        &self.styles
    }

    /// 获取第 `index` 个段落的可变引用
    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.blocks
            .iter_mut()
            .filter_map(|b| match b {
                BodyBlock::Paragraph(p) => Some(p),
                _ => None,
            })
            .nth(index)
    }

    /// 在第 `index` 个段落之后插入若干段落
    ///
    /// # 返回
    /// 索引越界时返回 false，文档不变
    pub fn insert_after(&mut self, index: usize, new_paragraphs: Vec<Paragraph>) -> bool {
        let Some(position) = self.block_position(index) else {
            return false;
        };
        let at = position + 1;
        self.blocks
            .splice(at..at, new_paragraphs.into_iter().map(BodyBlock::Paragraph));
        true
    }

    /// 追加段落到文末（分节属性之前）
    pub fn append(&mut self, new_paragraphs: Vec<Paragraph>) {
        let at = self
            .blocks
            .iter()
            .rposition(|b| matches!(b, BodyBlock::SectionProperties(_)))
            .unwrap_or(self.blocks.len());
        self.blocks
            .splice(at..at, new_paragraphs.into_iter().map(BodyBlock::Paragraph));
    }

    /// 序列化为 ZIP 数据
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let document_xml = self.document_xml();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            if name == DOCUMENT_PART {
                writer.write_all(document_xml.as_bytes())?;
            } else {
                writer.write_all(data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// 写入文件
    ///
    /// 先写临时文件再重命名，读者不会看到写了一半的文档
    pub fn save(&self, path: &Path) -> Result<(), DocxError> {
        let bytes = self.to_bytes()?;
        let tmp_path = path.with_extension("docx.part");
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// 异步写入文件，同样先写临时文件再重命名
    pub async fn write(&self, path: &Path) -> Result<(), DocxError> {
        let bytes = self.to_bytes()?;
        let tmp_path = path.with_extension("docx.part");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    fn document_xml(&self) -> String {
        let body: usize = self.blocks.iter().map(|b| b.xml().len()).sum();
        let mut xml = String::with_capacity(self.head.len() + body + self.tail.len());
        xml.push_str(&self.head);
        for block in &self.blocks {
            xml.push_str(block.xml());
        }
        xml.push_str(&self.tail);
        xml
    }

    /// 第 `index` 个段落在块列表中的位置
    fn block_position(&self, index: usize) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, BodyBlock::Paragraph(_)))
            .nth(index)
            .map(|(pos, _)| pos)
    }
}

// ========== document.xml 解析 ==========

/// 把 document.xml 拆成 (body 之前, 顶层块, body 之后)
///
/// 顶层块首尾相接覆盖整个 body：元素之间的空白归入后一个块
fn split_body(xml: &str) -> Result<(String, Vec<BodyBlock>, String), DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut head_end = 0usize;
    let mut cursor = 0usize;
    let mut blocks = Vec::new();

    loop {
        let event = reader.read_event()?;
        let end = reader.buffer_position();

        match event {
            Event::Start(e) => {
                depth += 1;
                if body_depth.is_none() && e.local_name().as_ref() == b"body" {
                    body_depth = Some(depth);
                    head_end = end;
                    cursor = end;
                }
            }
            Event::End(e) => {
                if body_depth == Some(depth) && e.local_name().as_ref() == b"body" {
                    let tail_start = tag_start(xml, end);
                    if tail_start > cursor {
                        blocks.push(BodyBlock::Other(xml[cursor..tail_start].to_string()));
                    }
                    return Ok((
                        xml[..head_end].to_string(),
                        blocks,
                        xml[tail_start..].to_string(),
                    ));
                }
                if body_depth.is_some() && body_depth == Some(depth - 1) {
                    blocks.push(classify_block(e.local_name().as_ref(), &xml[cursor..end])?);
                    cursor = end;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(e) => {
                if body_depth.is_none() && e.local_name().as_ref() == b"body" {
                    // <w:body/>：展开成一对标签，方便追加内容
                    let head = format!("{}<w:body>", &xml[..tag_start(xml, end)]);
                    let tail = format!("</w:body>{}", &xml[end..]);
                    return Ok((head, Vec::new(), tail));
                }
                if body_depth == Some(depth) {
                    blocks.push(classify_block(e.local_name().as_ref(), &xml[cursor..end])?);
                    cursor = end;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(DocxError::Malformed("document.xml 中没有完整的 w:body".to_string()))
}

fn classify_block(local_name: &[u8], xml: &str) -> Result<BodyBlock, DocxError> {
    Ok(match local_name {
        b"p" => BodyBlock::Paragraph(Paragraph::parse(xml.to_string())?),
        b"sectPr" => BodyBlock::SectionProperties(xml.to_string()),
        _ => BodyBlock::Other(xml.to_string()),
    })
}

/// `w:t` 中一段文本在段落 XML 中的位置
#[derive(Debug)]
struct TextSpan {
    start: usize,
    end: usize,
    value: String,
}

#[derive(Debug, Default)]
struct ParagraphScan {
    text: String,
    style: Option<String>,
    text_spans: Vec<TextSpan>,
    paragraph_props: Option<String>,
    first_run_props: Option<String>,
    first_color: Option<String>,
}

/// 扫描段落 XML：文本、样式、`w:pPr` 和第一个 `w:rPr`
fn scan_paragraph(xml: &str) -> Result<ParagraphScan, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut scan = ParagraphScan::default();
    let mut in_text = false;
    let mut ppr_start: Option<usize> = None;
    let mut rpr_start: Option<usize> = None;

    loop {
        let start = reader.buffer_position();
        let event = reader.read_event()?;
        let end = reader.buffer_position();

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"pPr" if scan.paragraph_props.is_none() => {
                    ppr_start = Some(tag_start(xml, end))
                }
                b"rPr" if scan.first_run_props.is_none() && ppr_start.is_none() => {
                    rpr_start = Some(tag_start(xml, end))
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"pPr" => {
                    if let Some(s) = ppr_start.take() {
                        scan.paragraph_props = Some(xml[s..end].to_string());
                    }
                }
                b"rPr" => {
                    if let Some(s) = rpr_start.take() {
                        scan.first_run_props = Some(xml[s..end].to_string());
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"pStyle" if scan.style.is_none() => scan.style = get_attr(&e, b"w:val"),
                b"color" if rpr_start.is_some() && scan.first_color.is_none() => {
                    scan.first_color = get_attr(&e, b"w:val")
                }
                b"tab" if ppr_start.is_none() => scan.text.push('\t'),
                b"br" | b"cr" => scan.text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let value = t.unescape()?.into_owned();
                scan.text.push_str(&value);
                scan.text_spans.push(TextSpan {
                    start,
                    end: text_end(xml, start),
                    value,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scan)
}

/// 解析 styles.xml 中的 styleId 和名称
fn parse_styles(xml: &str) -> Result<StyleSet, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut styles = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current = get_attr(&e, b"w:styleId");
                if let Some(id) = &current {
                    styles.insert(id.clone(), id.clone());
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"style" => {
                    if let Some(id) = get_attr(&e, b"w:styleId") {
                        styles.insert(id.clone(), id);
                    }
                }
                b"name" => {
                    if let (Some(id), Some(name)) = (&current, get_attr(&e, b"w:val")) {
                        styles.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(StyleSet { styles })
}

/// 刚读完的标签在输入中的起始位置
///
/// 属性值里不会出现未转义的 `<`，所以标签结束前最后一个 `<` 就是它的开头
fn tag_start(xml: &str, tag_end: usize) -> usize {
    xml[..tag_end].rfind('<').unwrap_or(0)
}

/// 文本事件的结束位置（下一个 `<` 之前）
fn text_end(xml: &str, text_start: usize) -> usize {
    xml[text_start..]
        .find('<')
        .map(|i| text_start + i)
        .unwrap_or(xml.len())
}

/// 按键名读取属性值
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// 生成一个 run，多行文本用 `<w:br/>` 分隔
fn run_xml(run_props: Option<&str>, text: &str) -> String {
    let mut xml = String::from("<w:r>");
    if let Some(props) = run_props {
        xml.push_str(props);
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str("<w:br/>");
        }
        xml.push_str(r#"<w:t xml:space="preserve">"#);
        xml.push_str(&escape(line.trim_end_matches('\r')));
        xml.push_str("</w:t>");
    }
    xml.push_str("</w:r>");
    xml
}

fn styles_xml(styles: &[(&str, &str)]) -> String {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#
    ));
    for (id, name) in styles {
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="{}"><w:name w:val="{}"/></w:style>"#,
            escape(*id),
            escape(*name)
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

// ========== 新建文档使用的固定部件 ==========

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_HEAD: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    "<w:body>"
);

const DOCUMENT_TAIL: &str = "</w:body></w:document>";

const SECTION_PROPERTIES: &str = concat!(
    r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
    r#"<w:pgMar w:top="1417" w:right="1417" w:bottom="1134" w:left="1417" w:header="708" w:footer="708" w:gutter="0"/>"#,
    "</w:sectPr>"
);

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(doc: &DocxPackage) -> DocxPackage {
        DocxPackage::from_bytes(&doc.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_paragraph_round_trip() {
        let doc = DocxPackage::from_paragraphs(&["A", "B", "C"]);
        let reread = round_trip(&doc);
        assert_eq!(reread.paragraph_texts(), vec!["A", "B", "C"]);
        assert_eq!(reread.text(), "A\nB\nC");
    }

    #[test]
    fn test_styles_are_read_back() {
        let reread = round_trip(&DocxPackage::from_paragraphs(&["x"]));
        assert_eq!(reread.styles().resolve("Heading2"), Some("Heading2"));
        assert_eq!(reread.styles().resolve("Heading 2"), Some("Heading2"));
        assert_eq!(reread.styles().resolve("heading 1"), Some("Heading1"));
        assert_eq!(reread.styles().resolve("Title"), None);
    }

    #[test]
    fn test_insert_after_and_bounds() {
        let mut doc = DocxPackage::from_paragraphs(&["A", "B", "C"]);
        assert!(doc.insert_after(0, vec![Paragraph::build("x", None, None)]));
        assert!(!doc.insert_after(4, vec![Paragraph::build("y", None, None)]));
        assert_eq!(doc.paragraph_texts(), vec!["A", "x", "B", "C"]);
    }

    #[test]
    fn test_append_stays_before_section_properties() {
        let mut doc = DocxPackage::from_paragraphs(&["A"]);
        doc.append(vec![Paragraph::build("end", None, Some("C00000"))]);

        let xml = doc.document_xml();
        let end_pos = xml.find("end</w:t>").unwrap();
        let sect_pos = xml.find("<w:sectPr>").unwrap();
        assert!(end_pos < sect_pos);

        let reread = round_trip(&doc);
        let last = reread.paragraphs().last().unwrap();
        assert_eq!(last.text(), "end");
        assert_eq!(last.color().as_deref(), Some("C00000"));
    }

    #[test]
    fn test_multiline_text_uses_breaks() {
        let p = Paragraph::build("line 1\nline 2", Some("Heading2"), None);
        assert!(p.xml().contains("<w:br/>"));
        let reparsed = Paragraph::parse(p.xml().to_string()).unwrap();
        assert_eq!(reparsed.text(), "line 1\nline 2");
        assert_eq!(reparsed.style(), Some("Heading2"));
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let doc = DocxPackage::from_paragraphs(&["a < b & \"c\""]);
        let reread = round_trip(&doc);
        assert_eq!(reread.paragraph_texts(), vec!["a < b & \"c\""]);
    }

    #[test]
    fn test_remove_token_inside_single_run_keeps_formatting() {
        let xml = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Lösung: [Antwort]</w:t></w:r></w:p>"#;
        let mut p = Paragraph::parse(xml.to_string()).unwrap();

        assert!(p.remove_token("[Antwort]").unwrap());
        assert_eq!(p.text(), "Lösung: ");
        assert!(p.xml().contains("<w:b/>"));
        assert!(!p.xml().contains("[Antwort]"));
    }

    #[test]
    fn test_remove_token_split_across_runs() {
        let xml = r#"<w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>[Ant</w:t></w:r><w:r><w:t>wort]</w:t></w:r></w:p>"#;
        let mut p = Paragraph::parse(xml.to_string()).unwrap();

        assert!(p.remove_token("[Antwort]").unwrap());
        assert_eq!(p.text(), "");
        assert!(p.xml().contains(r#"<w:jc w:val="left"/>"#));
        assert!(p.xml().contains("<w:i/>"));
        assert!(!p.xml().contains("Ant"));
    }

    #[test]
    fn test_remove_token_absent() {
        let mut p = Paragraph::build("Question 1", None, None);
        assert!(!p.remove_token("[Antwort]").unwrap());
        assert_eq!(p.text(), "Question 1");
    }

    #[test]
    fn test_tables_and_other_blocks_survive_untouched() {
        let document = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
            r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p/>"#,
            r#"<w:sectPr/>"#,
            r#"</w:body></w:document>"#
        );
        let (head, blocks, tail) = split_body(document).unwrap();

        assert!(head.ends_with("<w:body>"));
        assert_eq!(tail, "</w:body></w:document>");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(blocks[1], BodyBlock::Other(ref xml) if xml.starts_with("<w:tbl>")));
        assert!(matches!(blocks[2], BodyBlock::Paragraph(ref p) if p.text().is_empty()));
        assert!(matches!(blocks[3], BodyBlock::SectionProperties(_)));

        let rebuilt: String = std::iter::once(head.as_str())
            .chain(blocks.iter().map(|b| b.xml()))
            .chain(std::iter::once(tail.as_str()))
            .collect();
        assert_eq!(rebuilt, document);
    }

    #[test]
    fn test_missing_document_part_is_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxPackage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DocxError::MissingPart(_)));
    }

    #[tokio::test]
    async fn test_async_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam.docx");
        DocxPackage::from_paragraphs(&["Aufgabe", "[Antwort]"])
            .write(&path)
            .await
            .unwrap();

        assert!(!path.with_extension("docx.part").exists());
        let doc = DocxPackage::load(&path).await.unwrap();
        assert_eq!(doc.paragraph_texts(), vec!["Aufgabe", "[Antwort]"]);
    }

    #[test]
    fn test_garbage_is_zip_error() {
        let err = DocxPackage::from_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, DocxError::Zip(_)));
    }
}
