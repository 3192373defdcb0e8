//! Demographic adapter backed by the SGIS (Statistics Korea) OpenAPI
//!
//! Flow: consumer key/secret → access token (cached), Gyeonggi district list
//! → district code (cached per location), population summary → 70+ figures.

use super::http::{self, lenient_f64, lenient_string};
use super::{ProviderAdapter, TokenCache, TtlCache};
use crate::core::ProviderError;
use crate::layers::{DataSource, ElderlyStats, LayerPayload};
use crate::places::CanonicalLocation;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const PROVIDER: &str = "sgis";
const CREDENTIAL_HINT: &str = "SGIS_CONSUMER_KEY and SGIS_CONSUMER_SECRET";

/// SGIS province code for Gyeonggi-do
const GYEONGGI_SIDO_CODE: &str = "31";

/// Tokens are valid for an hour; refresh a little early
const TOKEN_LIFETIME: Duration = Duration::from_secs(50 * 60);

/// District codes change rarely
const DISTRICT_CODE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// `errCd` SGIS uses for "no search result"
const ERR_NO_RESULT: i64 = -100;

/// `errCd` SGIS uses for a missing or expired access token
const ERR_AUTH: i64 = -401;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "errCd", default)]
    err_cd: Value,
    #[serde(rename = "errMsg", default)]
    err_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AuthResult {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct StageRow {
    cd: String,
    addr_name: String,
}

pub struct SgisAdapter {
    client: reqwest::Client,
    base_url: String,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    token: TokenCache,
    district_codes: TtlCache<String, String>,
}

impl SgisAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            consumer_key,
            consumer_secret,
            token: TokenCache::new(TOKEN_LIFETIME),
            district_codes: TtlCache::new(DISTRICT_CODE_TTL),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let (key, secret) = match (&self.consumer_key, &self.consumer_secret) {
            (Some(k), Some(s)) => (k.clone(), s.clone()),
            _ => {
                return Err(ProviderError::CredentialsMissing {
                    provider: PROVIDER,
                    hint: CREDENTIAL_HINT,
                })
            }
        };

        self.token
            .get_or_acquire(|| async move {
                tracing::debug!("Authenticating with SGIS");
                let request = self
                    .client
                    .get(format!("{}/OpenAPI3/auth/authentication.json", self.base_url))
                    .query(&[("consumer_key", key), ("consumer_secret", secret)]);
                let body = http::send(PROVIDER, request).await?;
                let envelope: Envelope<AuthResult> = http::parse_json(PROVIDER, &body.text)?;
                check_err_cd(&envelope, "authentication")?;
                envelope
                    .result
                    .map(|r| r.access_token)
                    .ok_or_else(|| malformed("authentication result missing"))
            })
            .await
    }

    /// Forget the cached token when SGIS refuses it, so the next fetch re-authenticates
    async fn drop_rejected_token(&self, body: &str) {
        if token_rejected(body) {
            tracing::warn!("SGIS rejected the access token, discarding it");
            self.token.invalidate().await;
        }
    }

    async fn district_code(
        &self,
        location: &CanonicalLocation,
        token: &str,
    ) -> Result<String, ProviderError> {
        let cache_key = location.normalized_name.clone();
        if let Some(code) = self.district_codes.get(&cache_key) {
            tracing::debug!("SGIS district code cache hit for {}", cache_key);
            return Ok(code);
        }

        let request = self
            .client
            .get(format!("{}/OpenAPI3/addr/stage.json", self.base_url))
            .query(&[("accessToken", token), ("cd", GYEONGGI_SIDO_CODE)]);
        let body = http::send(PROVIDER, request).await?;
        self.drop_rejected_token(&body.text).await;
        let code = parse_district_code(&body.text, &location.provider_keys.district_query)?;

        self.district_codes.insert(cache_key, code.clone());
        Ok(code)
    }
}

#[async_trait]
impl ProviderAdapter for SgisAdapter {
    fn source(&self) -> DataSource {
        DataSource::Demographic
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn has_credentials(&self) -> bool {
        self.consumer_key.is_some() && self.consumer_secret.is_some()
    }

    fn credential_hint(&self) -> &'static str {
        CREDENTIAL_HINT
    }

    async fn fetch(&self, location: &CanonicalLocation) -> Result<LayerPayload, ProviderError> {
        let token = self.access_token().await?;
        let code = self.district_code(location, &token).await?;

        let request = self
            .client
            .get(format!("{}/OpenAPI3/startupbiz/pplsummary.json", self.base_url))
            .query(&[("accessToken", token.as_str()), ("adm_cd", code.as_str())]);
        let body = http::send(PROVIDER, request).await?;
        self.drop_rejected_token(&body.text).await;
        let stats = parse_population(&body.text, &code, &location.display_name)?;

        tracing::debug!(
            "SGIS population for {} ({}): {} aged 70+",
            stats.district_name,
            stats.district_code,
            stats.elderly_count
        );
        Ok(LayerPayload::Elderly(stats))
    }
}

fn malformed(detail: impl Into<String>) -> ProviderError {
    ProviderError::MalformedResponse {
        provider: PROVIDER,
        detail: detail.into(),
    }
}

fn err_cd<T>(envelope: &Envelope<T>) -> i64 {
    // errCd arrives as a number or a numeric string
    lenient_f64(&envelope.err_cd).map(|c| c as i64).unwrap_or(0)
}

fn token_rejected(text: &str) -> bool {
    serde_json::from_str::<Envelope<Value>>(text)
        .map(|envelope| err_cd(&envelope) == ERR_AUTH)
        .unwrap_or(false)
}

fn check_err_cd<T>(envelope: &Envelope<T>, what: &str) -> Result<(), ProviderError> {
    match err_cd(envelope) {
        0 => Ok(()),
        ERR_NO_RESULT => Err(ProviderError::NoMatchingRecord {
            provider: PROVIDER,
            query: what.to_string(),
        }),
        other => Err(ProviderError::Unavailable {
            provider: PROVIDER,
            message: format!("{} failed: {} (errCd {})", what, envelope.err_msg, other),
        }),
    }
}

/// Find the district code whose `addr_name` contains the query
fn parse_district_code(text: &str, query: &str) -> Result<String, ProviderError> {
    let envelope: Envelope<Vec<StageRow>> = http::parse_json(PROVIDER, text)?;
    check_err_cd(&envelope, query)?;

    let rows = envelope.result.unwrap_or_default();
    rows.into_iter()
        .find(|row| row.addr_name.contains(query))
        .map(|row| row.cd)
        .ok_or_else(|| ProviderError::NoMatchingRecord {
            provider: PROVIDER,
            query: query.to_string(),
        })
}

/// Pick the row for `code` (or the first row) and read the 70+ figures
fn parse_population(
    text: &str,
    code: &str,
    fallback_name: &str,
) -> Result<ElderlyStats, ProviderError> {
    let envelope: Envelope<Vec<Value>> = http::parse_json(PROVIDER, text)?;
    check_err_cd(&envelope, code)?;

    let rows = envelope.result.unwrap_or_default();
    let row = rows
        .iter()
        .find(|r| lenient_string(&r["adm_cd"]).as_deref() == Some(code))
        .or_else(|| rows.first())
        .ok_or_else(|| ProviderError::NoMatchingRecord {
            provider: PROVIDER,
            query: code.to_string(),
        })?;

    Ok(ElderlyStats {
        district_name: lenient_string(&row["adm_nm"]).unwrap_or_else(|| fallback_name.to_string()),
        district_code: lenient_string(&row["adm_cd"]).unwrap_or_else(|| code.to_string()),
        elderly_count: lenient_f64(&row["seventy_more_than_cnt"]).unwrap_or(0.0) as u64,
        elderly_ratio: lenient_f64(&row["seventy_more_than_per"]).unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_district_code_matches_substring() {
        let text = r#"{
            "errCd": 0, "errMsg": "Success",
            "result": [
                {"cd": "31011", "addr_name": "수원시 장안구"},
                {"cd": "31010", "addr_name": "수원시"},
                {"cd": "31020", "addr_name": "성남시"}
            ]
        }"#;
        assert_eq!(parse_district_code(text, "성남시").unwrap(), "31020");
        assert_eq!(parse_district_code(text, "장안구").unwrap(), "31011");

        let err = parse_district_code(text, "부산").unwrap_err();
        assert!(matches!(err, ProviderError::NoMatchingRecord { .. }));
    }

    #[test]
    fn test_parse_population_prefers_matching_row() {
        let text = r#"{
            "errCd": "0", "errMsg": "Success",
            "result": [
                {"adm_cd": "31000", "adm_nm": "경기도", "seventy_more_than_cnt": "1", "seventy_more_than_per": "1"},
                {"adm_cd": "31010", "adm_nm": "수원시", "seventy_more_than_cnt": "98765", "seventy_more_than_per": "8.04"}
            ]
        }"#;
        let stats = parse_population(text, "31010", "수원시").unwrap();
        assert_eq!(stats.district_name, "수원시");
        assert_eq!(stats.elderly_count, 98765);
        assert!((stats.elderly_ratio - 8.04).abs() < 1e-9);
    }

    #[test]
    fn test_parse_population_falls_back_to_first_row() {
        let text = r#"{"errCd": 0, "result": [
            {"adm_cd": "31999", "adm_nm": "어딘가", "seventy_more_than_cnt": 10, "seventy_more_than_per": 1.5}
        ]}"#;
        let stats = parse_population(text, "31010", "수원시").unwrap();
        assert_eq!(stats.district_code, "31999");
        assert_eq!(stats.elderly_count, 10);
    }

    #[test]
    fn test_err_cd_mapping() {
        let no_result = r#"{"errCd": -100, "errMsg": "검색결과가 존재하지 않습니다", "result": null}"#;
        assert!(matches!(
            parse_population(no_result, "31010", "수원시").unwrap_err(),
            ProviderError::NoMatchingRecord { .. }
        ));

        let expired = r#"{"errCd": -401, "errMsg": "인증 정보가 존재하지 않습니다"}"#;
        assert!(matches!(
            parse_population(expired, "31010", "수원시").unwrap_err(),
            ProviderError::Unavailable { .. }
        ));

        assert!(matches!(
            parse_population("<html/>", "31010", "수원시").unwrap_err(),
            ProviderError::MalformedResponse { .. }
        ));
    }

    #[test]
    fn test_token_rejection_detected() {
        assert!(token_rejected(r#"{"errCd": -401, "errMsg": "인증 정보가 존재하지 않습니다"}"#));
        assert!(token_rejected(r#"{"errCd": "-401", "errMsg": ""}"#));
        assert!(!token_rejected(r#"{"errCd": -100, "errMsg": "검색결과가 존재하지 않습니다"}"#));
        assert!(!token_rejected(r#"{"errCd": 0, "result": []}"#));
        assert!(!token_rejected("<html/>"));
    }

    #[tokio::test]
    async fn test_fetch_without_credentials() {
        let adapter = SgisAdapter::new(reqwest::Client::new(), "http://127.0.0.1:9", None, None);
        assert!(!adapter.has_credentials());
        let loc = crate::places::resolve("수원시").unwrap();
        let err = adapter.fetch(&loc).await.unwrap_err();
        assert!(matches!(err, ProviderError::CredentialsMissing { .. }));
    }
}
