//! JSON bodies for webhook creation and execution.

use base64::Engine;
use pinrelay_pipeline::{LinkButton, PlatformError, PlatformResult, RelayIdentity, RelayPost};
use serde_json::{json, Map, Value};

/// Message flag marking an upload as a voice message.
pub const IS_VOICE_MESSAGE_FLAG: u64 = 1 << 13;

const BUTTON_STYLE_LINK: u8 = 5;
const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Webhook id, token and optional thread routing parsed from an endpoint URL.
pub struct WebhookTarget {
    pub webhook_id: u64,
    pub token: String,
    pub thread_id: Option<u64>,
}

/// Parses `https://discord.com/api/webhooks/{id}/{token}[?thread_id=..]`.
pub fn parse_webhook_url(url: &str) -> PlatformResult<WebhookTarget> {
    let invalid = || PlatformError::Transport(format!("malformed webhook url: {}", redact(url)));
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;
    let segments = parsed.path_segments().ok_or_else(invalid)?.collect::<Vec<_>>();
    let position = segments
        .iter()
        .position(|segment| *segment == "webhooks")
        .ok_or_else(invalid)?;
    let webhook_id = segments
        .get(position + 1)
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(invalid)?;
    let token = segments
        .get(position + 2)
        .filter(|token| !token.is_empty())
        .ok_or_else(invalid)?
        .to_string();
    let thread_id = parsed
        .query_pairs()
        .find(|(key, _)| key == "thread_id")
        .and_then(|(_, value)| value.parse::<u64>().ok())
        .filter(|id| *id > 0);
    Ok(WebhookTarget {
        webhook_id,
        token,
        thread_id,
    })
}

fn redact(url: &str) -> String {
    // Webhook tokens are credentials; keep only the id part in errors.
    match url.split_once("/webhooks/") {
        Some((base, rest)) => {
            let id = rest.split('/').next().unwrap_or_default();
            format!("{base}/webhooks/{id}/***")
        }
        None => url.to_string(),
    }
}

/// Builds the execute-webhook body. Uploaded files are referenced by index,
/// matching the multipart `files[n]` parts.
pub fn webhook_execute_body(post: &RelayPost, identity: &RelayIdentity) -> Value {
    let mut body = Map::new();
    if let Some(content) = &post.content {
        body.insert("content".to_string(), json!(content));
    }
    body.insert("username".to_string(), json!(identity.display_name));
    body.insert("avatar_url".to_string(), json!(identity.avatar_url));

    let mut is_voice = false;
    let attachments = post
        .files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let mut attachment = json!({ "id": index, "filename": file.filename });
            if let Some(voice) = &file.voice {
                is_voice = true;
                attachment["duration_secs"] = json!(voice.duration_secs);
                attachment["waveform"] =
                    json!(base64::engine::general_purpose::STANDARD.encode(&voice.waveform));
            }
            attachment
        })
        .collect::<Vec<_>>();
    body.insert("attachments".to_string(), Value::Array(attachments));
    if is_voice {
        body.insert("flags".to_string(), json!(IS_VOICE_MESSAGE_FLAG));
    }
    if let Some(link) = &post.original_link {
        body.insert("components".to_string(), link_components(link));
    }
    Value::Object(body)
}

pub fn link_components(link: &LinkButton) -> Value {
    json!([{
        "type": COMPONENT_ACTION_ROW,
        "components": [{
            "type": COMPONENT_BUTTON,
            "style": BUTTON_STYLE_LINK,
            "label": link.label,
            "url": link.url,
        }],
    }])
}

pub fn webhook_create_body(name: &str, avatar: Option<&[u8]>) -> Value {
    let mut body = json!({ "name": name });
    if let Some(avatar) = avatar {
        body["avatar"] = json!(avatar_data_uri(avatar));
    }
    body
}

/// Encodes image bytes as a `data:` URI, sniffing the MIME type.
pub fn avatar_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        sniff_image_mime(bytes),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}
