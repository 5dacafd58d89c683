//! 提示词配置
//!
//! 核心流程只消费五条提示词（system / base / level_low / level_medium / level_high），
//! 按当前语言解析。自定义内容优先，缺失的键回退到内置默认值。

use std::collections::HashMap;

use phf::phf_map;
use serde::Deserialize;

use crate::error::{AppResult, ConfigError};
use crate::models::level::ProficiencyLevel;

/// 内置的一套默认提示词
pub struct PromptDefaults {
    pub system: &'static str,
    pub base: &'static str,
    pub level_low: &'static str,
    pub level_medium: &'static str,
    pub level_high: &'static str,
}

/// 各语言的默认提示词
pub static PROMPT_DEFAULTS: phf::Map<&'static str, PromptDefaults> = phf_map! {
    "de" => PromptDefaults {
        system: "Du bist ein Schüler, der eine Klausur schreibt. Alle Antworten sollen realistisch wirken und keine Einleitungen oder Kommentare enthalten.",
        base: concat!(
            "Nutze ausschließlich die folgenden Kontextinformationen als Wissensquelle. ",
            "Beantworte die Klausuraufgabe so, wie es ein Schüler auf dem angegebenen Leistungsniveau tun würde. ",
            "Gib ausschließlich den Lösungstext, ohne Einleitung, Erklärung oder Wiederholung der Aufgabe. ",
            "Wenn dir Informationen fehlen, antworte wie ein Schüler, der das Thema nicht vollständig versteht. ",
            "Der Antwortstil soll dem einer echten Schülerklausur entsprechen: schreibe klar, aber nicht überperfekt. ",
            "Keine Kommentare, keine Meta-Texte. Die Antworten sollen sich sprachlich, inhaltlich und vom Stil an echten Schülerantworten orientieren. ",
            "Niemals den Aufgabenstellungstext wiederholen oder Zusammenfassungen geben."
        ),
        level_low: "Bearbeite die Aufgabe so, als wärst du ein schwacher Schüler mit vielen Lücken und Unsicherheiten. Mache typische Fehler, schreibe knapp oder lückenhaft, beantworte nur das, was du sicher weißt. Antworte ggf. auch mit Falschantworten, die im Kontext vorkommen könnten.",
        level_medium: "Bearbeite die Aufgabe als durchschnittlicher Schüler: gib solide, aber nicht perfekte Antworten, manchmal fehlen Details oder es gibt kleinere Fehler.",
        level_high: "Bearbeite die Aufgabe als sehr guter Schüler: antworte vollständig, präzise und mit korrekter Fachsprache. Gehe auch auf Details und Hintergründe ein, sofern sie im Kontext stehen.",
    },
    "en" => PromptDefaults {
        system: "You are a student taking an exam. All answers should read like real student work with no introductions or comments.",
        base: concat!(
            "Use only the provided context information as your knowledge base. ",
            "Answer the exam question as a student at the indicated level would. ",
            "Provide only the solution text without introductions, explanations or repetitions of the task. ",
            "If information is missing, answer as a student who does not fully understand the topic. ",
            "The style should mimic that of real student exam answers: clear but not overly perfect. ",
            "No comments or meta text. Never repeat the question text or add summaries."
        ),
        level_low: "Answer as a weak student with many gaps. Make typical mistakes and keep it short and incomplete. Provide wrong answers if they might realistically occur.",
        level_medium: "Answer as an average student: solid but not perfect, some details missing or small mistakes.",
        level_high: "Answer as a very good student: complete, precise, and using correct terminology. Include details and background where relevant in the context.",
    },
};

/// 已解析的提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub system: String,
    pub base: String,
    pub level_low: String,
    pub level_medium: String,
    pub level_high: String,
}

/// 单个语言的自定义提示词，未填写的键使用默认值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptOverride {
    pub system: Option<String>,
    pub base: Option<String>,
    pub level_low: Option<String>,
    pub level_medium: Option<String>,
    pub level_high: Option<String>,
}

/// TOML 文件的整体结构：语言代码 -> 自定义提示词
pub type PromptOverrides = HashMap<String, PromptOverride>;

impl PromptSet {
    /// 获取某个语言的内置默认提示词
    pub fn defaults(language: &str) -> AppResult<Self> {
        let defaults = PROMPT_DEFAULTS
            .get(language)
            .ok_or_else(|| ConfigError::UnknownLanguage {
                language: language.to_string(),
            })?;

        Ok(Self {
            system: defaults.system.to_string(),
            base: defaults.base.to_string(),
            level_low: defaults.level_low.to_string(),
            level_medium: defaults.level_medium.to_string(),
            level_high: defaults.level_high.to_string(),
        })
    }

    /// 按语言解析提示词，自定义内容覆盖默认值
    pub fn resolve(language: &str, overrides: Option<&PromptOverrides>) -> AppResult<Self> {
        let mut set = Self::defaults(language)?;

        if let Some(custom) = overrides.and_then(|o| o.get(language)) {
            let fields = [
                (&mut set.system, &custom.system),
                (&mut set.base, &custom.base),
                (&mut set.level_low, &custom.level_low),
                (&mut set.level_medium, &custom.level_medium),
                (&mut set.level_high, &custom.level_high),
            ];
            for (target, value) in fields {
                if let Some(text) = value.as_ref().filter(|t| !t.trim().is_empty()) {
                    *target = text.clone();
                }
            }
        }

        Ok(set)
    }

    /// 获取某个水平的专属指令
    pub fn instruction_for(&self, level: ProficiencyLevel) -> &str {
        match level {
            ProficiencyLevel::Low => &self.level_low,
            ProficiencyLevel::Medium => &self.level_medium,
            ProficiencyLevel::High => &self.level_high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exist_for_both_languages() {
        assert!(PromptSet::defaults("en").is_ok());
        assert!(PromptSet::defaults("de").is_ok());
    }

    #[test]
    fn test_german_defaults_are_complete() {
        let set = PromptSet::defaults("de").unwrap();
        assert_eq!(
            set.instruction_for(ProficiencyLevel::Low),
            "Bearbeite die Aufgabe so, als wärst du ein schwacher Schüler mit vielen Lücken und Unsicherheiten. \
             Mache typische Fehler, schreibe knapp oder lückenhaft, beantworte nur das, was du sicher weißt. \
             Antworte ggf. auch mit Falschantworten, die im Kontext vorkommen könnten."
        );
        assert!(set.base.contains(
            "Die Antworten sollen sich sprachlich, inhaltlich und vom Stil an echten Schülerantworten orientieren."
        ));
        assert!(set.base.ends_with("Niemals den Aufgabenstellungstext wiederholen oder Zusammenfassungen geben."));
    }

    #[test]
    fn test_unknown_language_is_config_error() {
        let err = PromptSet::defaults("fr").unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Config(ConfigError::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn test_override_wins_per_key() {
        let mut overrides = PromptOverrides::new();
        overrides.insert(
            "en".to_string(),
            PromptOverride {
                level_low: Some("be sloppy".to_string()),
                base: Some("   ".to_string()),
                ..Default::default()
            },
        );

        let set = PromptSet::resolve("en", Some(&overrides)).unwrap();
        let defaults = PromptSet::defaults("en").unwrap();

        assert_eq!(set.instruction_for(ProficiencyLevel::Low), "be sloppy");
        assert_eq!(set.base, defaults.base);
        assert_eq!(set.level_high, defaults.level_high);
    }

    #[test]
    fn test_override_for_other_language_is_ignored() {
        let mut overrides = PromptOverrides::new();
        overrides.insert(
            "de".to_string(),
            PromptOverride {
                system: Some("Systemtext".to_string()),
                ..Default::default()
            },
        );

        let set = PromptSet::resolve("en", Some(&overrides)).unwrap();
        assert_eq!(set, PromptSet::defaults("en").unwrap());
    }
}
