//! # 中继响应解包
//!
//! 部分中继把目标响应包在一层 JSON 里（`contents` / `data`），这里把它剥出来。
//! 任何无法解析的内容都原样降级，解包本身永不失败。

use crate::proxy::types::Payload;
use crate::types::ResponseEnvelope;
use bytes::Bytes;
use serde_json::Value;

const CONTENTS_FIELD: &str = "contents";
const DATA_FIELD: &str = "data";
/// `data` 嵌套层数上限
const MAX_DATA_DEPTH: usize = 8;

/// 按包装方式解包响应体
#[must_use]
pub fn unwrap_payload(body: &Bytes, envelope: ResponseEnvelope) -> Payload {
    let payload = parse_or_passthrough(body);
    match envelope {
        ResponseEnvelope::Raw => payload,
        ResponseEnvelope::Contents => match payload {
            Payload::Json(Value::Object(mut map)) => match map.remove(CONTENTS_FIELD) {
                Some(Value::String(text)) => parse_text(text),
                Some(inner) => Payload::Json(inner),
                None => Payload::Json(Value::Object(map)),
            },
            other => other,
        },
        ResponseEnvelope::Data => match payload {
            Payload::Json(value) => unwrap_data(value, 0),
            other => other,
        },
    }
}

/// JSON 优先，其次 UTF-8 文本，最后原始字节
#[must_use]
pub fn parse_or_passthrough(body: &Bytes) -> Payload {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return Payload::Json(value);
    }
    match std::str::from_utf8(body) {
        Ok(text) => Payload::Text(text.to_string()),
        Err(_) => Payload::Binary(body.clone()),
    }
}

fn parse_text(text: String) -> Payload {
    serde_json::from_str::<Value>(&text).map_or(Payload::Text(text), Payload::Json)
}

fn unwrap_data(value: Value, depth: usize) -> Payload {
    match value {
        Value::Object(mut map) if depth < MAX_DATA_DEPTH => match map.remove(DATA_FIELD) {
            Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => unwrap_data(parsed, depth + 1),
                Err(_) => Payload::Text(text),
            },
            Some(inner) => unwrap_data(inner, depth + 1),
            None => Payload::Json(Value::Object(map)),
        },
        other => Payload::Json(other),
    }
}
