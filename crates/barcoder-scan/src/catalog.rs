//! # Catalog Client
//!
//! Turns a decoded payload into an ordered list of [`Product`]s by querying
//! the remote catalog search endpoint.
//!
//! ## Request / Response
//! ```text
//! GET {base_url}?q=7791234567890&limit=10
//!
//! 200 OK
//! {
//!   "results": [
//!     { "id": "MLA1", "title": "Yerba 1kg", "price": 1999.5,
//!       "currency_id": "ARS", "thumbnail": "http://...", "permalink": "http://..." },
//!     ...
//!   ]
//! }
//! ```
//!
//! ## Failure Mapping
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────────┐
//! │ What happened                    │ LookupError                  │
//! ├──────────────────────────────────┼──────────────────────────────┤
//! │ connect / DNS / TLS failure      │ Network                      │
//! │ non-2xx status                   │ HttpStatus                   │
//! │ client timeout elapsed           │ Timeout                      │
//! │ body not JSON, no `results` array│ MalformedResponse            │
//! │ one bad or repeated record       │ (record skipped, not fatal)  │
//! │ more than `limit` records        │ (extra records dropped)      │
//! └──────────────────────────────────┴──────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use barcoder_core::{Money, Price, Product, ValidationError, CATALOG_PAGE_SIZE};

use crate::config::ScannerConfig;
use crate::error::{LookupError, ScanResult};

// =============================================================================
// Lookup Seam
// =============================================================================

/// Anything that can search products by payload.
///
/// The controller only talks to this trait; tests swap in fakes.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Returns matching products in the order the catalog ranked them.
    async fn lookup(&self, payload: &str) -> Result<Vec<Product>, LookupError>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// reqwest-backed client for the catalog search endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    default_currency: String,
}

impl CatalogClient {
    /// Builds a client from the `[catalog]` and `[display]` sections.
    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        let base_url = Url::parse(&config.catalog.base_url)?;
        let timeout = config.lookup_timeout();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.catalog.user_agent.as_str())
            .build()?;

        info!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "Catalog client ready");

        Ok(CatalogClient {
            client,
            base_url,
            timeout,
            default_currency: config.display.currency.to_uppercase(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Runs one search. See the module docs for the failure mapping.
    pub async fn search(&self, payload: &str) -> Result<Vec<Product>, LookupError> {
        let limit = CATALOG_PAGE_SIZE.to_string();

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[("q", payload), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), payload, "Catalog returned an error status");
            return Err(LookupError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let products = parse_search_response(&body, &self.default_currency)?;

        debug!(payload, count = products.len(), "Catalog search complete");
        Ok(products)
    }

    fn classify(&self, err: reqwest::Error) -> LookupError {
        if err.is_timeout() {
            LookupError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            LookupError::MalformedResponse(err.to_string())
        } else {
            LookupError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ProductLookup for CatalogClient {
    async fn lookup(&self, payload: &str) -> Result<Vec<Product>, LookupError> {
        self.search(payload).await
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

/// Parses a search response body.
///
/// Fails only when the body is not JSON or has no `results` array. Records
/// that cannot become a [`Product`] are skipped, as are records repeating
/// an earlier id. At most [`CATALOG_PAGE_SIZE`] products are kept, even if
/// the server ignored `limit`.
pub fn parse_search_response(
    body: &str,
    default_currency: &str,
) -> Result<Vec<Product>, LookupError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LookupError::MalformedResponse(format!("body is not JSON: {}", e)))?;

    let records = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::MalformedResponse("missing `results` array".into()))?;

    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(records.len().min(CATALOG_PAGE_SIZE));

    for (index, record) in records.iter().enumerate() {
        if products.len() == CATALOG_PAGE_SIZE {
            debug!(dropped = records.len() - index, "Catalog sent more records than requested");
            break;
        }

        let product = match product_from_record(record, default_currency)
            .and_then(|product| check_unique(&mut seen, &product.id).map(|()| product))
        {
            Ok(product) => product,
            Err(reason) => {
                debug!(index, reason = %reason, "Skipping catalog record");
                continue;
            }
        };
        products.push(product);
    }

    Ok(products)
}

fn product_from_record(
    record: &Value,
    default_currency: &str,
) -> Result<Product, ValidationError> {
    let amount = match record.get("price") {
        Some(Value::Number(n)) => {
            Money::from_decimal_str(&n.to_string()).map_err(|e| invalid_format("price", e))?
        }
        Some(other) => return Err(invalid_format("price", format!("not a number: {}", other))),
        None => return Err(required("price")),
    };

    let currency = match record.get("currency_id") {
        Some(Value::String(c)) if !c.trim().is_empty() => c.as_str(),
        _ => default_currency,
    };

    Product::try_new(
        text_field(record, "id")?,
        text_field(record, "title")?,
        Price::new(amount, currency),
        text_field(record, "thumbnail")?,
        text_field(record, "permalink")?,
    )
}

fn text_field<'a>(record: &'a Value, field: &str) -> Result<&'a str, ValidationError> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(invalid_format(field, format!("not a string: {}", other))),
        None => Err(required(field)),
    }
}

/// First occurrence of an id wins.
fn check_unique(seen: &mut HashSet<String>, id: &str) -> Result<(), ValidationError> {
    if seen.insert(id.to_string()) {
        Ok(())
    } else {
        Err(ValidationError::Duplicate {
            field: "id".into(),
            value: id.into(),
        })
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.into(),
    }
}

fn invalid_format(field: &str, reason: impl ToString) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.into(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
