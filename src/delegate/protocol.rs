//! Wire frames exchanged with the delegate: one JSON document per line.

use serde::{Deserialize, Serialize};

use super::ColorScheme;
use crate::error::PreviewResult;

/// Calls made to the delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    UpdateUi {
        markup: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    UpdateCss {
        css: String,
    },
    CloseWindow,
    SetColorScheme {
        scheme: ColorScheme,
    },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::UpdateUi { .. } => "update_ui",
            Request::UpdateCss { .. } => "update_css",
            Request::CloseWindow => "close_window",
            Request::SetColorScheme { .. } => "set_color_scheme",
        }
    }
}

/// A request tagged with its call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub request: Request,
}

/// Frames read from the delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Incoming {
    /// Reply to the call with the same id; `error` set when it failed.
    Response {
        id: u64,
        #[serde(default)]
        error: Option<String>,
    },
    /// The delegate's window was opened or closed.
    WindowOpen { open: bool },
}

/// Encode a request as a single line, newline included.
pub fn encode_request(id: u64, request: &Request) -> PreviewResult<String> {
    let frame = RequestFrame {
        id,
        request: request.clone(),
    };
    let mut line = serde_json::to_string(&frame)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_incoming(line: &str) -> PreviewResult<Incoming> {
    Ok(serde_json::from_str(line.trim())?)
}
