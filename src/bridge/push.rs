//! 推送消息解码
//!
//! 缺失或类型不对的字段回退到默认值，不会失败。

use serde_json::Value;

use crate::notification::{Branding, NotificationData, NotificationOptions};

pub const DEFAULT_PUSH_TITLE: &str = "🍎 FreshKeeper - Item expiring";
pub const DEFAULT_PUSH_BODY: &str = "You have items about to expire";
pub const DEFAULT_PUSH_TAG: &str = "freshkeeper-notification";

/// 解码后的推送内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub data: NotificationData,
}

impl PushPayload {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_PUSH_TITLE)
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or(DEFAULT_PUSH_BODY)
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_PUSH_TAG)
    }

    /// 推送通知带 view / close 两个按钮
    pub fn to_options(&self, branding: &Branding) -> NotificationOptions {
        NotificationOptions {
            icon: Some(branding.icon.clone()),
            badge: Some(branding.badge.clone()),
            data: self.data.clone(),
            ..NotificationOptions::new(self.title(), self.body())
        }
        .with_tag(self.tag())
        .with_vibrate(branding.vibrate.clone())
        .with_actions(vec![branding.view_action(), branding.close_action()])
    }
}

/// 解码推送负载；空负载返回 `None`（不展示）
pub fn decode_push(raw: &str) -> Option<PushPayload> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let data = value
        .get("data")
        .cloned()
        .and_then(|v| serde_json::from_value::<NotificationData>(v).ok())
        .unwrap_or_default();

    Some(PushPayload {
        title: text("title"),
        body: text("body"),
        tag: text("tag"),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let payload = decode_push(
            r#"{"title":"Milk","body":"Expires today","tag":"freshkeeper-7","data":{"itemId":"7","url":"/products"}}"#,
        )
        .unwrap();

        assert_eq!(payload.title(), "Milk");
        assert_eq!(payload.body(), "Expires today");
        assert_eq!(payload.tag(), "freshkeeper-7");
        assert_eq!(payload.data.item_id.as_deref(), Some("7"));
        assert_eq!(payload.data.url.as_deref(), Some("/products"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let payload = decode_push(r#"{"body": 42, "data": "nope"}"#).unwrap();
        assert_eq!(payload.title(), DEFAULT_PUSH_TITLE);
        assert_eq!(payload.body(), DEFAULT_PUSH_BODY);
        assert_eq!(payload.tag(), DEFAULT_PUSH_TAG);
        assert_eq!(payload.data, NotificationData::default());
    }

    #[test]
    fn test_malformed_json_uses_defaults() {
        let payload = decode_push("not json at all").unwrap();
        assert_eq!(payload, PushPayload::default());
        assert_eq!(payload.title(), DEFAULT_PUSH_TITLE);
    }

    #[test]
    fn test_empty_payload_is_ignored() {
        assert!(decode_push("").is_none());
        assert!(decode_push("   ").is_none());
    }

    #[test]
    fn test_options_carry_branding_and_actions() {
        let options = decode_push(r#"{"title":"Milk"}"#)
            .unwrap()
            .to_options(&Branding::default());

        assert_eq!(options.title, "Milk");
        assert_eq!(options.icon.as_deref(), Some("/favicon.svg"));
        assert_eq!(options.badge.as_deref(), Some("/favicon.svg"));
        assert_eq!(options.vibrate, vec![200, 100, 200]);
        let actions: Vec<&str> = options.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["view", "close"]);
    }
}
