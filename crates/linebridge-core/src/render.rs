//! Pure builders turning routing data into LINE rich messages.
//!
//! None of these can fail: over-long text is clipped to LINE's field limits and
//! empty input produces an empty (but valid) structure.

use tracing::warn;

use crate::channel::line::{
    Action, CarouselColumn, FlexBox, FlexBubble, FlexComponent, FlexContainer, FlexSeparator,
    FlexText, LineMessage, QuickReply, QuickReplyItem, Template, MAX_ACTION_LABEL,
    MAX_CAROUSEL_COLUMNS, MAX_COLUMN_TEXT, MAX_COLUMN_TITLE, MAX_QUICK_REPLY_ITEMS,
};
use crate::config::DEFAULT_THUMBNAIL_URL;
use crate::util::truncate_chars;

const ANALYSIS_TITLE: &str = "MBTI 分析結果";
const ANALYSIS_FOOTER: &str = "彩虹城市AI助理 · 僅供參考";
const ACCENT_COLOR: &str = "#7B61FF";
const MUTED_COLOR: &str = "#888888";

/// Flex card: title, separator, the user's query, the result and a footer.
pub fn render_analysis_card(result_text: &str, original_query: &str) -> LineMessage {
    let body = FlexBox::vertical(vec![
        FlexComponent::Text(FlexText::new(ANALYSIS_TITLE).bold().size("lg").color(ACCENT_COLOR)),
        FlexComponent::Separator(FlexSeparator {
            margin: Some("md".to_string()),
        }),
        FlexComponent::Text(
            FlexText::new(format!("您的問題：{original_query}"))
                .size("sm")
                .color(MUTED_COLOR)
                .margin("md")
                .wrap(),
        ),
        FlexComponent::Text(FlexText::new(result_text).size("md").margin("lg").wrap()),
    ])
    .spacing("sm");

    let footer = FlexBox::vertical(vec![FlexComponent::Text(
        FlexText::new(ANALYSIS_FOOTER).size("xs").color(MUTED_COLOR),
    )]);

    LineMessage::Flex {
        alt_text: truncate_chars(&format!("{ANALYSIS_TITLE}：{result_text}"), 400, "…"),
        contents: FlexContainer::Bubble(FlexBubble {
            body: Some(body),
            footer: Some(footer),
        }),
        quick_reply: None,
    }
}

/// Template carousel with one column per `(title, url)` pair, in order.
pub fn render_link_carousel<T, U>(items: &[(T, U)]) -> LineMessage
where
    T: AsRef<str>,
    U: AsRef<str>,
{
    render_link_carousel_with_thumbnail(items, DEFAULT_THUMBNAIL_URL)
}

/// [`render_link_carousel`] with a caller-chosen thumbnail.
pub fn render_link_carousel_with_thumbnail<T, U>(items: &[(T, U)], thumbnail_url: &str) -> LineMessage
where
    T: AsRef<str>,
    U: AsRef<str>,
{
    if items.len() > MAX_CAROUSEL_COLUMNS {
        warn!(
            "Carousel has {} items, LINE accepts {}; extra items dropped",
            items.len(),
            MAX_CAROUSEL_COLUMNS
        );
    }

    let columns: Vec<CarouselColumn> = items
        .iter()
        .take(MAX_CAROUSEL_COLUMNS)
        .map(|(title, url)| {
            let title = title.as_ref();
            CarouselColumn {
                thumbnail_image_url: thumbnail_url.to_string(),
                title: truncate_chars(title, MAX_COLUMN_TITLE, "…"),
                text: truncate_chars(&format!("open {title}"), MAX_COLUMN_TEXT, "…"),
                actions: vec![Action::Uri {
                    label: "open".to_string(),
                    uri: url.as_ref().to_string(),
                }],
            }
        })
        .collect();

    LineMessage::Template {
        alt_text: "常用連結".to_string(),
        template: Template::Carousel { columns },
    }
}

/// Text message with one quick-reply button per `(label, trigger_text)`.
///
/// Tapping a button makes the client send `trigger_text` as a fresh utterance,
/// so the follow-up is routed like any other request.
pub fn render_quick_reply<L, T>(prompt_text: &str, options: &[(L, T)]) -> LineMessage
where
    L: AsRef<str>,
    T: AsRef<str>,
{
    if options.len() > MAX_QUICK_REPLY_ITEMS {
        warn!(
            "Quick reply has {} options, LINE accepts {}; extra options dropped",
            options.len(),
            MAX_QUICK_REPLY_ITEMS
        );
    }

    let items = options
        .iter()
        .take(MAX_QUICK_REPLY_ITEMS)
        .map(|(label, trigger)| QuickReplyItem::Action {
            action: Action::Message {
                label: truncate_chars(label.as_ref(), MAX_ACTION_LABEL, ""),
                text: trigger.as_ref().to_string(),
            },
        })
        .collect();

    LineMessage::Text {
        text: prompt_text.to_string(),
        quick_reply: Some(QuickReply { items }),
    }
}
