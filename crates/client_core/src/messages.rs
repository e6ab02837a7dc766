//! User-facing texts for notifications and the quota indicator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-cn")]
    SimplifiedChinese,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale {0:?}; expected \"en\" or \"zh-cn\"")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::English),
            "zh" | "zh-cn" | "zh-hans" => Ok(Locale::SimplifiedChinese),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::English => f.write_str("en"),
            Locale::SimplifiedChinese => f.write_str("zh-cn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCatalog {
    pub success_title: &'static str,
    pub error_title: &'static str,
    pub quota_loading: &'static str,
    pub quota_unavailable: &'static str,
    pub quota_fetch_failed: &'static str,
    pub fields_required: &'static str,
    pub email_sent: &'static str,
    pub send_failed: &'static str,
    pub send_label: &'static str,
    pub sending_label: &'static str,
}

const ENGLISH: MessageCatalog = MessageCatalog {
    success_title: "Success",
    error_title: "Error",
    quota_loading: "Loading...",
    quota_unavailable: "Unavailable",
    quota_fetch_failed: "Failed to fetch email quota",
    fields_required: "Recipient, subject and content are all required",
    email_sent: "Email sent",
    send_failed: "Failed to send email",
    send_label: "Send",
    sending_label: "Sending...",
};

const SIMPLIFIED_CHINESE: MessageCatalog = MessageCatalog {
    success_title: "成功",
    error_title: "错误",
    quota_loading: "加载中...",
    quota_unavailable: "获取失败",
    quota_fetch_failed: "获取邮件配额失败",
    fields_required: "收件人、主题和内容都是必填项",
    email_sent: "邮件已发送",
    send_failed: "发送邮件失败",
    send_label: "发送",
    sending_label: "发送中...",
};

impl MessageCatalog {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::English => ENGLISH,
            Locale::SimplifiedChinese => SIMPLIFIED_CHINESE,
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        ENGLISH
    }
}
