//! LINE Messaging API message objects.
//!
//! Only the subset linebridge renders is modelled: text, flex bubbles and
//! template carousels, each optionally carrying quick-reply buttons. The serde
//! attributes reproduce the wire shape LINE expects (`type` discriminators,
//! camelCase keys, absent optionals omitted).

use serde::Serialize;

/// Max columns in a template carousel.
pub const MAX_CAROUSEL_COLUMNS: usize = 10;
/// Max chars in a carousel column title.
pub const MAX_COLUMN_TITLE: usize = 40;
/// Max chars in a carousel column text when a thumbnail is set.
pub const MAX_COLUMN_TEXT: usize = 60;
/// Max chars in an action label.
pub const MAX_ACTION_LABEL: usize = 20;
/// Max items in a quick reply.
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// A single LINE message object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum LineMessage {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    Flex {
        alt_text: String,
        contents: FlexContainer,
        #[serde(skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    Template {
        alt_text: String,
        template: Template,
    },
}

// ====== Flex ======

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexContainer {
    Bubble(FlexBubble),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexBubble {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<FlexBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<FlexBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexComponent {
    Text(FlexText),
    Separator(FlexSeparator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexLayout {
    Vertical,
}

/// A flex box. Serializes with its own `"type": "box"` discriminator, which
/// LINE requires wherever a box appears, including bubble sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "box", rename_all = "camelCase")]
pub struct FlexBox {
    pub layout: FlexLayout,
    pub contents: Vec<FlexComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

impl FlexBox {
    pub fn vertical(contents: Vec<FlexComponent>) -> Self {
        Self {
            layout: FlexLayout::Vertical,
            contents,
            spacing: None,
            margin: None,
        }
    }

    pub fn spacing(mut self, spacing: &str) -> Self {
        self.spacing = Some(spacing.to_string());
        self
    }

    pub fn margin(mut self, margin: &str) -> Self {
        self.margin = Some(margin.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl FlexText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = Some(size.to_string());
        self
    }

    pub fn bold(mut self) -> Self {
        self.weight = Some("bold".to_string());
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn margin(mut self, margin: &str) -> Self {
        self.margin = Some(margin.to_string());
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap = Some(true);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexSeparator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

// ====== Template ======

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Template {
    Carousel { columns: Vec<CarouselColumn> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselColumn {
    pub thumbnail_image_url: String,
    pub title: String,
    pub text: String,
    pub actions: Vec<Action>,
}

// ====== Actions & quick reply ======

/// A tappable action. `Message` makes the client send `text` as if the user typed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Uri { label: String, uri: String },
    Message { label: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuickReplyItem {
    Action { action: Action },
}
