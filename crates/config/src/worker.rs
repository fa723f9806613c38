//! Closed registry of online worker classes.
//!
//! An online catalog entry names the worker class that fronts its provider
//! through the `provider` field. Unknown names are reported by
//! `GatewayDocument::validate` and degrade to "no worker class" at
//! resolution time.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Worker classes that can front an online provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerClass {
    /// OpenAI ChatGPT API.
    #[serde(rename = "ChatGPTWorker")]
    ChatGpt,
    /// Azure OpenAI service.
    #[serde(rename = "AzureWorker")]
    Azure,
    /// Anthropic Claude API.
    #[serde(rename = "ClaudeWorker")]
    Claude,
    /// Google Gemini API.
    #[serde(rename = "GeminiWorker")]
    Gemini,
    /// Zhipu ChatGLM API.
    #[serde(rename = "ChatGLMWorker")]
    ChatGlm,
    /// MiniMax API.
    #[serde(rename = "MiniMaxWorker")]
    MiniMax,
    /// iFlytek Spark API.
    #[serde(rename = "XingHuoWorker")]
    XingHuo,
    /// Baidu Qianfan API.
    #[serde(rename = "QianFanWorker")]
    QianFan,
    /// Volcengine FangZhou API.
    #[serde(rename = "FangZhouWorker")]
    FangZhou,
    /// Alibaba Qwen (DashScope) API.
    #[serde(rename = "QwenWorker")]
    Qwen,
    /// Baichuan API.
    #[serde(rename = "BaiChuanWorker")]
    BaiChuan,
    /// Kunlun TianGong API.
    #[serde(rename = "TianGongWorker")]
    TianGong,
    /// Moonshot Kimi API.
    #[serde(rename = "KimiWorker")]
    Kimi,
    /// 01.AI Yi API.
    #[serde(rename = "YiWorker")]
    Yi,
    /// Groq API.
    #[serde(rename = "GroqWorker")]
    Groq,
}

impl WorkerClass {
    /// Every known worker class.
    pub const ALL: [Self; 15] = [
        Self::ChatGpt,
        Self::Azure,
        Self::Claude,
        Self::Gemini,
        Self::ChatGlm,
        Self::MiniMax,
        Self::XingHuo,
        Self::QianFan,
        Self::FangZhou,
        Self::Qwen,
        Self::BaiChuan,
        Self::TianGong,
        Self::Kimi,
        Self::Yi,
        Self::Groq,
    ];

    /// The configuration name of this worker class.
    pub fn name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPTWorker",
            Self::Azure => "AzureWorker",
            Self::Claude => "ClaudeWorker",
            Self::Gemini => "GeminiWorker",
            Self::ChatGlm => "ChatGLMWorker",
            Self::MiniMax => "MiniMaxWorker",
            Self::XingHuo => "XingHuoWorker",
            Self::QianFan => "QianFanWorker",
            Self::FangZhou => "FangZhouWorker",
            Self::Qwen => "QwenWorker",
            Self::BaiChuan => "BaiChuanWorker",
            Self::TianGong => "TianGongWorker",
            Self::Kimi => "KimiWorker",
            Self::Yi => "YiWorker",
            Self::Groq => "GroqWorker",
        }
    }

    /// Whether the provider behind this worker also serves embeddings.
    pub fn can_embedding(self) -> bool {
        matches!(
            self,
            Self::ChatGpt | Self::Azure | Self::ChatGlm | Self::MiniMax | Self::QianFan | Self::Qwen
        )
    }
}

impl FromStr for WorkerClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::ALL.into_iter().find(|class| class.name() == s) {
            Some(class) => Ok(class),
            None => bail!("unknown provider '{s}'"),
        }
    }
}

impl fmt::Display for WorkerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
