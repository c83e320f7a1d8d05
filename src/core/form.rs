// src/core/form.rs
//! 命盘表单模型 (Birth-data form, domain catalogue, backend payloads)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MIN_BIRTH_YEAR: i32 = 1900;
pub const MAX_BIRTH_YEAR: i32 = 2100;
pub const DEFAULT_OUTPUT_FORMAT: &str = "json_to_narrative";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("birth year {0} is outside 1900-2100")]
    YearOutOfRange(i32),
    #[error("birth month {0} is outside 1-12")]
    MonthOutOfRange(u32),
    #[error("{year}-{month:02} has no day {day}")]
    InvalidDay { year: i32, month: u32, day: u32 },
    #[error("unknown analysis domain '{0}'")]
    UnknownDomain(String),
    #[error("unknown birth hour '{0}'")]
    UnknownHour(String),
    #[error("unknown gender '{0}'")]
    UnknownGender(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }

    pub fn parse(s: &str) -> Result<Self, FormError> {
        match s.trim() {
            "男" | "male" | "m" => Ok(Gender::Male),
            "女" | "female" | "f" => Ok(Gender::Female),
            other => Err(FormError::UnknownGender(other.to_string())),
        }
    }
}

/// 十二时辰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BirthHour {
    #[serde(rename = "子")]
    Zi,
    #[serde(rename = "丑")]
    Chou,
    #[serde(rename = "寅")]
    Yin,
    #[serde(rename = "卯")]
    Mao,
    #[serde(rename = "辰")]
    Chen,
    #[serde(rename = "巳")]
    Si,
    #[serde(rename = "午")]
    Wu,
    #[serde(rename = "未")]
    Wei,
    #[serde(rename = "申")]
    Shen,
    #[serde(rename = "酉")]
    You,
    #[serde(rename = "戌")]
    Xu,
    #[serde(rename = "亥")]
    Hai,
}

impl BirthHour {
    pub const ALL: [BirthHour; 12] = [
        BirthHour::Zi,
        BirthHour::Chou,
        BirthHour::Yin,
        BirthHour::Mao,
        BirthHour::Chen,
        BirthHour::Si,
        BirthHour::Wu,
        BirthHour::Wei,
        BirthHour::Shen,
        BirthHour::You,
        BirthHour::Xu,
        BirthHour::Hai,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BirthHour::Zi => "子",
            BirthHour::Chou => "丑",
            BirthHour::Yin => "寅",
            BirthHour::Mao => "卯",
            BirthHour::Chen => "辰",
            BirthHour::Si => "巳",
            BirthHour::Wu => "午",
            BirthHour::Wei => "未",
            BirthHour::Shen => "申",
            BirthHour::You => "酉",
            BirthHour::Xu => "戌",
            BirthHour::Hai => "亥",
        }
    }

    pub fn name(&self) -> String {
        format!("{}時", self.id())
    }

    /// Two-hour window, e.g. `23:00-01:00` for 子
    pub fn time_range(&self) -> String {
        let idx = Self::ALL.iter().position(|h| h == self).unwrap_or(0) as u32;
        let start = (23 + idx * 2) % 24;
        let end = (start + 2) % 24;
        format!("{:02}:00-{:02}:00", start, end)
    }

    /// Accepts `子` or `子時`
    pub fn parse(s: &str) -> Result<Self, FormError> {
        let key = s.trim().trim_end_matches('時').trim_end_matches('时');
        Self::ALL
            .iter()
            .copied()
            .find(|h| h.id() == key)
            .ok_or_else(|| FormError::UnknownHour(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BirthHourOption {
    pub id: &'static str,
    pub name: String,
    pub time: String,
}

pub fn birth_hour_options() -> Vec<BirthHourOption> {
    BirthHour::ALL
        .iter()
        .map(|h| BirthHourOption { id: h.id(), name: h.name(), time: h.time_range() })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub static DOMAINS: [Domain; 3] = [
    Domain {
        id: "love",
        name: "愛情感情",
        description: "專精於感情運勢、桃花運、婚姻分析",
        icon: "💕",
    },
    Domain {
        id: "wealth",
        name: "財富事業",
        description: "專精於財運分析、事業發展、投資理財",
        icon: "💰",
    },
    Domain {
        id: "future",
        name: "未來運勢",
        description: "專精於大限流年、人生規劃、趨勢預測",
        icon: "🔮",
    },
];

impl Domain {
    pub fn find(id: &str) -> Result<&'static Domain, FormError> {
        DOMAINS
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| FormError::UnknownDomain(id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthData {
    pub gender: Gender,
    pub birth_year: i32,
    pub birth_month: u32,
    pub birth_day: u32,
    pub birth_hour: BirthHour,
}

impl BirthData {
    pub fn validate(&self) -> Result<(), FormError> {
        if !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&self.birth_year) {
            return Err(FormError::YearOutOfRange(self.birth_year));
        }
        if !(1..=12).contains(&self.birth_month) {
            return Err(FormError::MonthOutOfRange(self.birth_month));
        }
        if NaiveDate::from_ymd_opt(self.birth_year, self.birth_month, self.birth_day).is_none() {
            return Err(FormError::InvalidDay {
                year: self.birth_year,
                month: self.birth_month,
                day: self.birth_day,
            });
        }
        Ok(())
    }

    /// `1990年5月15日午時`
    pub fn describe(&self) -> String {
        format!(
            "{}年{}月{}日{}",
            self.birth_year,
            self.birth_month,
            self.birth_day,
            self.birth_hour.name()
        )
    }
}

/// Body of `POST /analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub birth_data: BirthData,
    #[serde(default = "default_domain_type")]
    pub domain_type: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub show_agent_process: bool,
}

fn default_domain_type() -> String {
    "love".to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

impl AnalysisRequest {
    pub fn new(birth_data: BirthData, domain: &Domain) -> Self {
        Self {
            birth_data,
            domain_type: domain.id.to_string(),
            output_format: default_output_format(),
            show_agent_process: false,
        }
    }

    /// Validates the birth data and resolves the domain
    pub fn validate(&self) -> Result<&'static Domain, FormError> {
        self.birth_data.validate()?;
        Domain::find(&self.domain_type)
    }
}

/// Backend reply; `result` is usually a string but is kept as raw JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub architecture: Option<String>,
}

impl AnalysisResponse {
    pub fn processing_time(&self) -> Option<f64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("processing_time"))
            .and_then(Value::as_f64)
    }
}

/// File name offered when the report is downloaded as text
pub fn download_filename(domain: &Domain, date: NaiveDate) -> String {
    format!("紫微斗數分析_{}_{}.txt", domain.name, date.format("%Y-%m-%d"))
}
