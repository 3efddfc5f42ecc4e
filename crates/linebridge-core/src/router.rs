//! Intent routing: `(tag, utterance)` to a [`RouteResult`].
//!
//! Precedence, highest first:
//! 1. a known tag from the orchestration platform;
//! 2. the wake-phrase gate for untagged utterances;
//! 3. the bare wake phrase, answered with the menu;
//! 4. keyword checks in order (analysis, payment, links), first match wins;
//! 5. the fallback.
//!
//! All text comparisons are case-insensitive.

use tracing::{debug, info, warn};

use crate::channel::line::LineMessage;
use crate::config::{GatePolicy, RoutingConfig};
use crate::fulfillment::failure_text;
use crate::render::{render_analysis_card, render_link_carousel_with_thumbnail, render_quick_reply};
use crate::responder::AiResponder;
use crate::types::{AiResponse, InboundRequest, RouteResult};

pub const TAG_PAYMENT: &str = "direct_payment_query";
pub const TAG_MBTI: &str = "direct_mbti_query";
pub const TAG_LINKS: &str = "direct_links_query";
pub const TAG_MENU: &str = "direct_menu";

/// Reply when a wake-phrase utterance matches nothing.
pub const FALLBACK_TEXT: &str = "抱歉，我還不太明白您的意思。輸入「彩虹城市AI助理」即可查看我能幫忙的項目。";

pub const PAYMENT_STATUS_TEXT: &str = "📋 繳費狀態查詢\n目前狀態：已繳清\n下次繳費日：2026/01/15 (下一期)";

const MENU_TEXT: &str = "您好！我是彩虹城市AI助理，請選擇想使用的服務：";

/// Analysis input used when a tagged request carries no utterance.
const DEFAULT_ANALYSIS_QUERY: &str = "請簡單介紹 MBTI 十六型人格。";

/// Tags the orchestration platform may pre-resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownTag {
    Payment,
    Mbti,
    Links,
    Menu,
}

impl KnownTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            TAG_PAYMENT => Some(KnownTag::Payment),
            TAG_MBTI => Some(KnownTag::Mbti),
            TAG_LINKS => Some(KnownTag::Links),
            TAG_MENU => Some(KnownTag::Menu),
            _ => None,
        }
    }
}

/// The branch chosen for a request, before any model call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Untagged and no wake phrase; stay silent.
    Ignore,
    /// Untagged and no wake phrase; tell the user how to address the assistant.
    GatePrompt,
    /// The instructional quick-reply menu.
    Menu,
    /// AI-backed analysis. `echo` is shown on the card, `query` goes to the model.
    Analysis { echo: String, query: String },
    Payment,
    Links,
    /// Wake phrase present but nothing matched. `remainder` is the utterance
    /// without the wake phrase.
    Fallback { remainder: String },
}

impl Dispatch {
    fn name(&self) -> &'static str {
        match self {
            Dispatch::Ignore => "ignore",
            Dispatch::GatePrompt => "gate_prompt",
            Dispatch::Menu => "menu",
            Dispatch::Analysis { .. } => "analysis",
            Dispatch::Payment => "payment",
            Dispatch::Links => "links",
            Dispatch::Fallback { .. } => "fallback",
        }
    }
}

/// Routes requests using the immutable routing config and an AI responder.
#[derive(Clone)]
pub struct IntentRouter {
    routing: RoutingConfig,
    responder: AiResponder,
}

impl IntentRouter {
    pub fn new(routing: RoutingConfig, responder: AiResponder) -> Self {
        Self { routing, responder }
    }

    /// Decide the branch for `(tag, utterance)`. Pure.
    pub fn dispatch(&self, tag: Option<&str>, utterance: &str) -> Dispatch {
        if let Some(tag) = tag {
            match KnownTag::parse(tag) {
                Some(KnownTag::Payment) => return Dispatch::Payment,
                Some(KnownTag::Links) => return Dispatch::Links,
                Some(KnownTag::Menu) => return Dispatch::Menu,
                Some(KnownTag::Mbti) => {
                    let query = if utterance.trim().is_empty() {
                        DEFAULT_ANALYSIS_QUERY.to_string()
                    } else {
                        utterance.trim().to_string()
                    };
                    return Dispatch::Analysis {
                        echo: query.clone(),
                        query,
                    };
                }
                None => warn!("Unknown tag {:?}; falling back to keyword routing", tag),
            }
        }

        let utterance = utterance.trim();
        let wake = self.routing.wake_phrase.trim();

        let Some((start, end)) = find_ci(utterance, wake) else {
            return match self.routing.gate_policy {
                GatePolicy::Ignore => Dispatch::Ignore,
                GatePolicy::Prompt => Dispatch::GatePrompt,
            };
        };

        let remainder = format!("{} {}", &utterance[..start], &utterance[end..])
            .trim()
            .to_string();
        if remainder.is_empty() {
            return Dispatch::Menu;
        }

        // Keywords are looked up after the wake phrase, which may contain one.
        if contains_any(&remainder, &self.routing.analysis_keywords) {
            return Dispatch::Analysis {
                echo: utterance.to_string(),
                query: remainder,
            };
        }
        if contains_any(&remainder, &self.routing.payment_keywords) {
            return Dispatch::Payment;
        }
        if contains_any(&remainder, &self.routing.link_keywords) {
            return Dispatch::Links;
        }

        Dispatch::Fallback { remainder }
    }

    /// Route a request, consulting the AI responder when the branch needs it.
    pub async fn route(&self, request: &InboundRequest) -> RouteResult {
        let dispatch = self.dispatch(request.tag.as_deref(), &request.utterance);
        info!(
            "Routed request: tag={:?}, branch={}, session={:?}",
            request.tag,
            dispatch.name(),
            request.session_id
        );

        match dispatch {
            Dispatch::Ignore => RouteResult::NoMatch,
            Dispatch::GatePrompt => RouteResult::text(self.gate_prompt()),
            Dispatch::Menu => RouteResult::RichPayload(self.menu()),
            Dispatch::Payment => RouteResult::text(PAYMENT_STATUS_TEXT),
            Dispatch::Links => {
                let items: Vec<(&str, &str)> = self
                    .routing
                    .links
                    .iter()
                    .map(|l| (l.title.as_str(), l.url.as_str()))
                    .collect();
                RouteResult::RichPayload(render_link_carousel_with_thumbnail(
                    &items,
                    &self.routing.thumbnail_url,
                ))
            }
            Dispatch::Analysis { echo, query } => {
                let result = match self.responder.analyze(&query).await {
                    AiResponse::Text(text) => text,
                    AiResponse::Failure(kind) => {
                        debug!("Analysis degraded to fixed text ({})", kind);
                        failure_text(kind).to_string()
                    }
                };
                RouteResult::RichPayload(render_analysis_card(&result, &echo))
            }
            Dispatch::Fallback { remainder } => {
                if !(self.routing.ai_chat_fallback && self.responder.is_enabled()) {
                    return RouteResult::text(FALLBACK_TEXT);
                }
                match self.responder.generate(&remainder).await {
                    AiResponse::Text(text) => RouteResult::PlainText(text),
                    AiResponse::Failure(kind) => RouteResult::text(failure_text(kind)),
                }
            }
        }
    }

    fn gate_prompt(&self) -> String {
        let wake = &self.routing.wake_phrase;
        format!("請以「{wake}」開頭呼叫我，例如：{wake} 查MBTI")
    }

    /// Quick-reply menu. Each trigger re-enters routing through the wake phrase
    /// and the first keyword of its branch.
    fn menu(&self) -> LineMessage {
        let wake = &self.routing.wake_phrase;
        let branches = [
            ("MBTI 分析", &self.routing.analysis_keywords),
            ("繳費狀態", &self.routing.payment_keywords),
            ("常用連結", &self.routing.link_keywords),
        ];
        let options: Vec<(&str, String)> = branches
            .iter()
            .filter_map(|(label, keywords)| {
                keywords
                    .first()
                    .map(|keyword| (*label, format!("{wake} {keyword}")))
            })
            .collect();
        render_quick_reply(MENU_TEXT, &options)
    }
}

/// Case-insensitive substring search. Returns the byte range of the first
/// match in `haystack`.
fn find_ci(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    haystack.char_indices().find_map(|(start, _)| {
        let mut hay = haystack[start..].char_indices();
        for n in needle.chars() {
            let (_, h) = hay.next()?;
            if !h.to_lowercase().eq(n.to_lowercase()) {
                return None;
            }
        }
        let end = hay.next().map_or(haystack.len(), |(i, _)| start + i);
        Some((start, end))
    })
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| find_ci(haystack, k.trim()).is_some())
}
