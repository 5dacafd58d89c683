/// 学生水平枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    /// 弱
    Low,
    /// 中
    Medium,
    /// 强
    High,
}

impl ProficiencyLevel {
    /// 按生成顺序排列的全部水平
    pub const ALL: [ProficiencyLevel; 3] = [
        ProficiencyLevel::Low,
        ProficiencyLevel::Medium,
        ProficiencyLevel::High,
    ];

    /// 获取标识（用于文件名和结果清单）
    pub fn as_str(self) -> &'static str {
        match self {
            ProficiencyLevel::Low => "low",
            ProficiencyLevel::Medium => "medium",
            ProficiencyLevel::High => "high",
        }
    }

    /// 获取显示名称（用于插入的标题）
    pub fn label(self) -> &'static str {
        match self {
            ProficiencyLevel::Low => "Low",
            ProficiencyLevel::Medium => "Medium",
            ProficiencyLevel::High => "High",
        }
    }

    /// 答案段落的字体颜色（十六进制 RGB）
    pub fn color(self) -> &'static str {
        match self {
            ProficiencyLevel::Low => "C00000",
            ProficiencyLevel::Medium => "E36C09",
            ProficiencyLevel::High => "00B050",
        }
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
