//! AI assistant request/response models.
//!
//! The assistant is asked to answer with `{ action, content, structured }`;
//! the typed views below read the `structured` part of that reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role reported to the model until callers are authenticated.
pub const GUEST_ROLE: &str = "guest";

/// Language tag reported to the model.
pub const DEFAULT_LANG: &str = "en";

/// Page reported when the caller sends no context.
pub const UNKNOWN_PAGE: &str = "unknown";

// =============================================================================
// Chat-Completion Proxy
// =============================================================================

/// Request body for `POST /api/ai_chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Base64-encoded images, forwarded untouched.
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

impl ChatRequest {
    /// The non-empty prompt, if any.
    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }

    pub fn has_images(&self) -> bool {
        self.images.as_ref().is_some_and(|images| !images.is_empty())
    }

    /// A request needs a prompt or at least one image.
    pub fn has_input(&self) -> bool {
        self.prompt_text().is_some() || self.has_images()
    }

    pub fn page(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.page.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Where the user is on the site. Extra fields are accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatContext {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Per-call metadata block embedded in the prompt. Never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestMetadata {
    pub page: String,
    pub user_role: String,
    pub product_id: Option<String>,
    pub image_contexts: Vec<ImageContext>,
    pub session_id: String,
    pub lang: String,
}

impl RequestMetadata {
    pub fn for_request(req: &ChatRequest, now: DateTime<Utc>) -> Self {
        Self {
            page: req.page().unwrap_or(UNKNOWN_PAGE).to_string(),
            user_role: GUEST_ROLE.to_string(),
            product_id: None,
            image_contexts: ImageContext::for_upload(req.has_images()),
            session_id: format!("session_{}", now.timestamp_millis()),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// Description of an uploaded image as seen by the model.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageContext {
    pub image_id: String,
    pub caption: String,
}

impl ImageContext {
    /// Placeholder caption for any upload. Real captioning is not wired in
    /// yet, so the image content itself is never inspected here.
    pub fn for_upload(has_images: bool) -> Vec<Self> {
        if has_images {
            vec![Self {
                image_id: "uploaded_image".to_string(),
                caption: "User uploaded image".to_string(),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Response body for `POST /api/ai_chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// User-facing text; never empty.
    pub response: String,
    /// The parsed `{ action, content, structured }` object, when the model produced one.
    pub structured: Option<Value>,
    /// Unmodified upstream text, for diagnostics.
    pub raw: String,
}

/// Actions the assistant may choose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DescribeProduct,
    NavigateHelp,
    AskForMoreInfo,
    Reject,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "describe_product" => Some(Self::DescribeProduct),
            "navigate_help" => Some(Self::NavigateHelp),
            "ask_for_more_info" => Some(Self::AskForMoreInfo),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DescribeProduct => write!(f, "describe_product"),
            Self::NavigateHelp => write!(f, "navigate_help"),
            Self::AskForMoreInfo => write!(f, "ask_for_more_info"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Typed reading of a parsed assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantAction {
    DescribeProduct(ProductDescription),
    NavigateHelp(Value),
    AskForMoreInfo(InfoRequest),
    Reject(Rejection),
}

impl AssistantAction {
    /// Reads `action` and `structured` from a parsed reply object. Returns
    /// `None` for unknown actions or payloads that do not match their shape.
    pub fn from_reply(reply: &Value) -> Option<Self> {
        let kind = ActionKind::parse(reply.get("action")?.as_str()?)?;
        let structured = reply.get("structured").cloned().unwrap_or(Value::Null);

        match kind {
            ActionKind::DescribeProduct => serde_json::from_value(structured)
                .ok()
                .map(Self::DescribeProduct),
            ActionKind::NavigateHelp => Some(Self::NavigateHelp(structured)),
            ActionKind::AskForMoreInfo => serde_json::from_value(structured)
                .ok()
                .map(Self::AskForMoreInfo),
            ActionKind::Reject => serde_json::from_value(structured).ok().map(Self::Reject),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::DescribeProduct(_) => ActionKind::DescribeProduct,
            Self::NavigateHelp(_) => ActionKind::NavigateHelp,
            Self::AskForMoreInfo(_) => ActionKind::AskForMoreInfo,
            Self::Reject(_) => ActionKind::Reject,
        }
    }
}

/// `structured` payload for `describe_product`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDescription {
    pub title: String,
    pub short_description: String,
    #[serde(default)]
    pub attributes: ProductAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductAttributes {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl ProductAttributes {
    /// Model confidence clamped to [0, 1].
    pub fn confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}

/// `structured` payload for `ask_for_more_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoRequest {
    pub need: Vec<String>,
}

/// `structured` payload for `reject`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

// =============================================================================
// Smart-Reply Suggester
// =============================================================================

/// Request body for `POST /api/smart_reply`.
///
/// `messages` stays untyped until the handler has checked it is a non-empty
/// array, so a wrong shape is reported as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmartReplyRequest {
    #[serde(default)]
    pub messages: Option<Value>,
}

/// One chat message. `senderId` is `"me"` for the user asking for suggestions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub text: String,
}

impl ConversationMessage {
    pub const SELF_SENDER: &'static str = "me";

    pub fn is_from_self(&self) -> bool {
        self.sender_id == Self::SELF_SENDER
    }
}

/// Response body for `POST /api/smart_reply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmartReplyResponse {
    pub suggestions: Vec<String>,
}
