//! Figma REST client for published styles.
//!
//! Fetches the style list for a file (cursor-paginated), then resolves the
//! backing node values in one batched `/nodes` call: paint colors become
//! `#RRGGBB`, text styles carry their font size. Auth and missing-file
//! responses are fatal; 429 surfaces the provider's retry hint.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use forge_core::error::{ForgeError, ForgeResult};
use forge_core::retry::{with_retry, RetryPolicy};
use forge_core::tokens::FigmaStyleType;

/// One published style with its resolved value.
#[derive(Debug, Clone)]
pub struct ResolvedStyle {
    pub name: String,
    pub style_type: FigmaStyleType,
    /// `#RRGGBB` for fills, font size (`Npx`) for text styles.
    pub value: Option<String>,
}

pub struct FigmaClient {
    http: reqwest::Client,
    base: String,
    retry: RetryPolicy,
}

impl FigmaClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    fn map_status(status: reqwest::StatusCode, retry_after: Option<u64>) -> ForgeError {
        match status.as_u16() {
            401 | 403 => ForgeError::UpstreamAuth("figma token rejected".into()),
            404 => ForgeError::InvalidInput("figma file not found".into()),
            429 => ForgeError::UpstreamRateLimit {
                retry_after_secs: retry_after.unwrap_or(60),
            },
            _ => ForgeError::UpstreamUnavailable(format!("figma returned {status}")),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> ForgeResult<T> {
        with_retry(&self.retry, "figma.get", || async {
            let response = self
                .http
                .get(url)
                .header("X-Figma-Token", access_token)
                .send()
                .await
                .map_err(|e| ForgeError::UpstreamUnavailable(format!("figma request: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                return Err(Self::map_status(status, retry_after));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| ForgeError::InvalidInput(format!("unparsable figma response: {e}")))
        })
        .await
    }

    /// Fetch every published style, following pagination cursors.
    pub async fn fetch_styles(
        &self,
        file_key: &str,
        access_token: &str,
    ) -> ForgeResult<Vec<ResolvedStyle>> {
        let mut styles: Vec<WireStyle> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = format!("{}/v1/files/{}/styles", self.base, file_key);
            if let Some(c) = &cursor {
                url.push_str(&format!("?cursor={c}"));
            }
            let page: StylesPage = self.get_json(&url, access_token).await?;
            styles.extend(page.meta.styles);
            match page.pagination.and_then(|p| p.next_cursor) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(file_key, count = styles.len(), "Fetched figma styles");

        // Resolve backing node values in one batched request.
        let node_ids: Vec<String> = styles.iter().map(|s| s.node_id.clone()).collect();
        let values = if node_ids.is_empty() {
            HashMap::new()
        } else {
            self.resolve_node_values(file_key, access_token, &node_ids)
                .await?
        };

        Ok(styles
            .into_iter()
            .filter_map(|s| {
                let style_type = match s.style_type.as_str() {
                    "FILL" => FigmaStyleType::Fill,
                    "TEXT" => FigmaStyleType::Text,
                    "EFFECT" => FigmaStyleType::Effect,
                    "GRID" => FigmaStyleType::Grid,
                    _ => return None,
                };
                Some(ResolvedStyle {
                    value: values.get(&s.node_id).cloned(),
                    name: s.name,
                    style_type,
                })
            })
            .collect())
    }

    async fn resolve_node_values(
        &self,
        file_key: &str,
        access_token: &str,
        node_ids: &[String],
    ) -> ForgeResult<HashMap<String, String>> {
        let url = format!(
            "{}/v1/files/{}/nodes?ids={}",
            self.base,
            file_key,
            node_ids.join(",")
        );
        let response: NodesResponse = self.get_json(&url, access_token).await?;

        let mut values = HashMap::new();
        for (id, node) in response.nodes {
            let doc = node.document;
            if let Some(color) = doc.fills.first().and_then(|f| f.color.as_ref()) {
                values.insert(id, color.to_hex());
            } else if let Some(style) = doc.style {
                if let Some(size) = style.font_size {
                    values.insert(id, format!("{size}px"));
                }
            }
        }
        Ok(values)
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StylesPage {
    meta: StylesMeta,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct StylesMeta {
    #[serde(default)]
    styles: Vec<WireStyle>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStyle {
    node_id: String,
    name: String,
    style_type: String,
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    #[serde(default)]
    nodes: HashMap<String, NodeEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    document: NodeDocument,
}

#[derive(Debug, Default, Deserialize)]
struct NodeDocument {
    #[serde(default)]
    fills: Vec<Paint>,
    #[serde(default)]
    style: Option<TypeStyle>,
}

#[derive(Debug, Deserialize)]
struct TypeStyle {
    #[serde(rename = "fontSize", default)]
    font_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Paint {
    #[serde(default)]
    color: Option<PaintColor>,
}

#[derive(Debug, Deserialize)]
struct PaintColor {
    r: f64,
    g: f64,
    b: f64,
}

impl PaintColor {
    fn to_hex(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_color_to_hex() {
        let blue = PaintColor {
            r: 0.231,
            g: 0.51,
            b: 0.965,
        };
        assert_eq!(blue.to_hex(), "#3B82F6");

        let white = PaintColor {
            r: 1.0,
            g: 1.0,
            b: 1.0,
        };
        assert_eq!(white.to_hex(), "#FFFFFF");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            FigmaClient::map_status(reqwest::StatusCode::FORBIDDEN, None),
            ForgeError::UpstreamAuth(_)
        ));
        assert!(matches!(
            FigmaClient::map_status(reqwest::StatusCode::NOT_FOUND, None),
            ForgeError::InvalidInput(_)
        ));
        assert_eq!(
            FigmaClient::map_status(reqwest::StatusCode::TOO_MANY_REQUESTS, Some(15))
                .retry_after(),
            Some(15)
        );
    }

    #[test]
    fn test_styles_page_parsing() {
        let raw = r#"{
            "meta": { "styles": [
                { "node_id": "1:2", "name": "Primary/Blue", "style_type": "FILL" },
                { "node_id": "1:3", "name": "Heading/Large", "style_type": "TEXT" }
            ]},
            "pagination": { "next_cursor": null }
        }"#;
        let page: StylesPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.meta.styles.len(), 2);
        assert!(page.pagination.unwrap().next_cursor.is_none());
    }

    #[test]
    fn test_nodes_response_parsing() {
        let raw = r#"{
            "nodes": {
                "1:2": { "document": { "fills": [ { "color": { "r": 1, "g": 0, "b": 0 } } ] } },
                "1:3": { "document": { "style": { "fontSize": 30 } } }
            }
        }"#;
        let parsed: NodesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(
            parsed.nodes["1:2"].document.fills[0]
                .color
                .as_ref()
                .unwrap()
                .to_hex(),
            "#FF0000"
        );
    }
}
