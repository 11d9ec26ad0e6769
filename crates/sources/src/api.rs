//! Blocking client for the deals-group buyers API: bearer login,
//! offset-paginated tracking listing, and a per-tracking price fan-out.

use std::thread;
use std::time::Duration;

use consigno_engine::{CostLedger, ReconResult, TrackingKey};
use serde_json::Value;

use crate::error::SourceError;

const USER_AGENT: &str = concat!("consigno/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: u64 = 100;
/// Per-tracking lookups are independent GETs; this bounds how many run
/// at once against the upstream.
const FANOUT_THREADS: usize = 8;

pub struct DealsApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl DealsApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Upstream(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Exchange credentials for a bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<String, SourceError> {
        let url = format!("{}/buyers/login", self.base_url);
        let body = self
            .http
            .post(&url)
            .form(&[("credentials", username), ("password", password)])
            .send()
            .map_err(|e| SourceError::Upstream(format!("login failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Upstream(format!("login rejected: {e}")))?
            .json::<Value>()
            .map_err(|e| SourceError::Upstream(format!("login response not JSON: {e}")))?;

        body.pointer("/data/token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SourceError::Format("login response missing data.token".into()))
    }

    /// Page through the received-trackings listing until `totals.items`
    /// entries have been seen.
    fn list_trackings(&self, token: &str) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/buyers/trackings", self.base_url);
        let mut entries = Vec::new();
        let mut start = 0u64;
        loop {
            let body = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&[
                    ("date_from", ""),
                    ("date_until", ""),
                    ("tracking_number", ""),
                    ("receiving_status_id", "1"),
                    ("limit", &PAGE_SIZE.to_string()),
                    ("start", &start.to_string()),
                ])
                .send()
                .map_err(|e| SourceError::Upstream(format!("trackings listing failed: {e}")))?
                .error_for_status()
                .map_err(|e| SourceError::Upstream(format!("trackings listing rejected: {e}")))?
                .json::<Value>()
                .map_err(|e| SourceError::Upstream(format!("listing response not JSON: {e}")))?;

            let total_items = body
                .pointer("/totals/items")
                .and_then(Value::as_u64)
                .ok_or_else(|| SourceError::Format("listing missing totals.items".into()))?;
            if let Some(page) = body.pointer("/data").and_then(Value::as_array) {
                entries.extend(page.iter().cloned());
            }

            start += PAGE_SIZE;
            if start >= total_items {
                return Ok(entries);
            }
        }
    }

    /// One tracking's reimbursed price, from the per-tracking endpoint.
    fn tracking_price(&self, token: &str, number: &str) -> Result<f64, SourceError> {
        let url = format!("{}/buyers/trackings/{number}", self.base_url);
        let body = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .map_err(|e| SourceError::Upstream(format!("tracking {number} lookup failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Upstream(format!("tracking {number} rejected: {e}")))?
            .json::<Value>()
            .map_err(|e| SourceError::Upstream(format!("tracking {number} not JSON: {e}")))?;

        match body.pointer("/data/box/total_price") {
            Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(0.0)),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| SourceError::Format(format!("bad total_price for {number}: {s:?}"))),
            _ => Err(SourceError::Format(format!(
                "tracking {number} missing data.box.total_price"
            ))),
        }
    }

    /// The full cost pull for one API-backed group.
    ///
    /// PO costs come straight off the listing entries; tracking prices
    /// need one GET each and fan out across threads, each writing its
    /// own local ledger. A failed lookup is logged and skipped, so one
    /// bad tracking never sinks the run.
    pub fn fetch_costs(
        &self,
        group: &str,
        username: &str,
        password: &str,
    ) -> Result<ReconResult, SourceError> {
        let token = self.login(username, password)?;
        let entries = self.list_trackings(&token)?;

        let mut result = ReconResult::new();
        let mut numbers = Vec::new();
        for entry in &entries {
            if let (Some(po), Some(amount)) = (
                entry.get("purchase_id").and_then(Value::as_str),
                entry.pointer("/purchase/amount").and_then(Value::as_f64),
            ) {
                // Entries sharing a purchase repeat its amount, so this
                // is an overwrite, not an accumulation.
                result.po_costs.insert(po.to_string(), amount);
            }
            if let Some(number) = entry.get("tracking_number").and_then(Value::as_str) {
                numbers.push(number.to_string());
            }
        }

        let chunk_size = numbers.len().div_ceil(FANOUT_THREADS).max(1);
        let ledgers: Vec<CostLedger> = thread::scope(|scope| {
            let handles: Vec<_> = numbers
                .chunks(chunk_size)
                .map(|chunk| {
                    let token = &token;
                    scope.spawn(move || {
                        let mut local = CostLedger::new();
                        for number in chunk {
                            match self.tracking_price(token, number) {
                                Ok(cost) => {
                                    local.add(TrackingKey::single(number.clone()), group, cost, "")
                                }
                                Err(e) => {
                                    eprintln!("warning: skipping tracking {number}: {e}")
                                }
                            }
                        }
                        local
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_default())
                .collect()
        });
        for local in ledgers {
            result.ledger.merge(local);
        }
        Ok(result)
    }

    /// Register new tracking numbers with the group.
    pub fn upload(
        &self,
        username: &str,
        password: &str,
        numbers: &[String],
    ) -> Result<(), SourceError> {
        let token = self.login(username, password)?;
        let url = format!("{}/buyers/trackings", self.base_url);
        self.http
            .post(&url)
            .bearer_auth(&token)
            .form(&[("trackings", numbers.join(","))])
            .send()
            .map_err(|e| SourceError::Upstream(format!("upload failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Upstream(format!("upload rejected: {e}")))?;
        Ok(())
    }
}
