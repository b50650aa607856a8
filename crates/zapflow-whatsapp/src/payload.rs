// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound request bodies for the `/messages` endpoint.

use serde::Serialize;
use zapflow_core::provider::{MediaKind, TemplateMessage};

/// A message send request.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(flatten)]
    body: MessageBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Context<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBody<'a> {
    Text { text: TextBody<'a> },
    Template { template: TemplateBody<'a> },
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct Context<'a> {
    message_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateBody<'a> {
    name: &'a str,
    language: Language<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<Component>,
}

#[derive(Debug, Serialize)]
struct Language<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct Component {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<String>,
    parameters: Vec<Parameter>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Parameter {
    Text { text: String },
    Image { image: MediaLink },
    Video { video: MediaLink },
    Document { document: MediaLink },
}

#[derive(Debug, Serialize)]
struct MediaLink {
    link: String,
}

fn text_parameters(values: &[String]) -> Vec<Parameter> {
    values
        .iter()
        .map(|v| Parameter::Text { text: v.clone() })
        .collect()
}

impl<'a> OutboundMessage<'a> {
    /// A free-form text message, optionally quoting `reply_to`.
    pub fn text(to: &'a str, text: &'a str, reply_to: Option<&'a str>) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            body: MessageBody::Text {
                text: TextBody {
                    preview_url: false,
                    body: text,
                },
            },
            context: reply_to.map(|message_id| Context { message_id }),
        }
    }

    /// A template message with header, body, and button components.
    ///
    /// Sections without values are omitted.
    pub fn template(to: &'a str, message: &'a TemplateMessage) -> Self {
        let params = &message.parameters;
        let mut components = Vec::new();

        if let Some(media) = &params.header_media {
            let link = MediaLink {
                link: media.link.clone(),
            };
            let parameter = match media.kind {
                MediaKind::Image => Parameter::Image { image: link },
                MediaKind::Video => Parameter::Video { video: link },
                MediaKind::Document => Parameter::Document { document: link },
            };
            components.push(Component {
                kind: "header",
                sub_type: None,
                index: None,
                parameters: vec![parameter],
            });
        } else if !params.header.is_empty() {
            components.push(Component {
                kind: "header",
                sub_type: None,
                index: None,
                parameters: text_parameters(&params.header),
            });
        }

        if !params.body.is_empty() {
            components.push(Component {
                kind: "body",
                sub_type: None,
                index: None,
                parameters: text_parameters(&params.body),
            });
        }

        for button in params.buttons.iter().filter(|b| !b.values.is_empty()) {
            components.push(Component {
                kind: "button",
                sub_type: Some("url"),
                index: Some(button.index.to_string()),
                parameters: text_parameters(&button.values),
            });
        }

        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            body: MessageBody::Template {
                template: TemplateBody {
                    name: &message.name,
                    language: Language {
                        code: &message.language,
                    },
                    components,
                },
            },
            context: None,
        }
    }
}
