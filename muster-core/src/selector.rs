//! Instance selection.
//!
//! A selector filters the provider instances returned by service
//! discovery for one consumer, e.g. routing a consumer to providers in
//! its own machine room. The kinds form a closed set dispatched by tag,
//! not an open plug-in surface: every node must agree on what an
//! expression means.
//!
//! The only data-driven kind is [`Selector::CmdbLabel`]: it keeps the
//! providers whose CMDB labels match the consumer's on every named
//! label, with label values resolved through a [`CmdbSource`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cmdb::CmdbSource;

/// Entity type under which instances are registered in the CMDB.
const IP_ENTITY_TYPE: &str = "ip";

/// Error from parsing a selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorParseError {
    /// A clause was empty or had no label name.
    #[error("empty clause in selector expression {0:?}")]
    EmptyClause(String),

    /// An equality clause compares two different labels.
    #[error("clause compares different labels: {consumer:?} vs {provider:?}")]
    MismatchedLabels {
        /// Label named on the consumer side.
        consumer: String,
        /// Label named on the provider side.
        provider: String,
    },
}

/// How providers are filtered for a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    /// No filtering: every provider is returned.
    None,
    /// Keep providers matching the consumer on every named CMDB label.
    ///
    /// An empty label list keeps everything, mirroring an empty
    /// expression.
    CmdbLabel {
        /// Label names to compare between consumer and provider.
        labels: Vec<String>,
    },
}

impl Selector {
    /// The selector's kind tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::CmdbLabel { .. } => "cmdb_label",
        }
    }

    /// Parse a CMDB label expression.
    ///
    /// Clauses are separated by `&`. Each clause is either a bare label
    /// name (`site`) or the equality form
    /// (`CONSUMER.label.site = PROVIDER.label.site`); the equality form
    /// must name the same label on both sides. A blank expression
    /// selects everything.
    pub fn parse_cmdb_label(expression: &str) -> Result<Self, SelectorParseError> {
        let mut labels = Vec::new();
        if expression.trim().is_empty() {
            return Ok(Self::CmdbLabel { labels });
        }
        for clause in expression.split('&') {
            let clause = clause.trim();
            let label = match clause.split_once('=') {
                Some((consumer, provider)) => {
                    let consumer = strip_side(consumer, "CONSUMER.label.");
                    let provider = strip_side(provider, "PROVIDER.label.");
                    if consumer != provider {
                        return Err(SelectorParseError::MismatchedLabels {
                            consumer: consumer.to_string(),
                            provider: provider.to_string(),
                        });
                    }
                    consumer
                }
                None => clause,
            };
            if label.is_empty() {
                return Err(SelectorParseError::EmptyClause(expression.to_string()));
            }
            if !labels.iter().any(|known| known == label) {
                labels.push(label.to_string());
            }
        }
        Ok(Self::CmdbLabel { labels })
    }

    /// Filter `providers` for `consumer`, both given as instance IPs.
    ///
    /// A provider survives a label filter only when consumer and
    /// provider both carry the label and the values are equal; an
    /// instance the CMDB does not know is filtered out rather than
    /// passed through.
    pub fn select(
        &self,
        consumer: &str,
        providers: &[String],
        source: &dyn CmdbSource,
    ) -> Vec<String> {
        match self {
            Self::None => providers.to_vec(),
            Self::CmdbLabel { labels } if labels.is_empty() => providers.to_vec(),
            Self::CmdbLabel { labels } => providers
                .iter()
                .filter(|provider| {
                    labels.iter().all(|label| {
                        let wanted = source.label_value(consumer, IP_ENTITY_TYPE, label);
                        wanted.is_some()
                            && source.label_value(provider, IP_ENTITY_TYPE, label) == wanted
                    })
                })
                .cloned()
                .collect(),
        }
    }
}

fn strip_side<'a>(side: &'a str, prefix: &str) -> &'a str {
    let side = side.trim();
    side.strip_prefix(prefix).unwrap_or(side)
}
