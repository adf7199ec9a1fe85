use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{
    AssociationBatchRequest, AssociationBatchResponse, CrmObject, ObjectRef, SearchRequest,
    SearchResponse, TokenResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

#[derive(Debug, Clone)]
pub struct HubSpotClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
}

impl HubSpotClientConfig {
    /// Load HubSpot app credentials from environment.
    ///
    /// Returns `None` if `HUBSPOT_CID` or `HUBSPOT_CS` is missing.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("HUBSPOT_CID").ok()?;
        let client_secret = std::env::var("HUBSPOT_CS").ok()?;
        let base_url = std::env::var("HUBSPOT_BASE_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("HUBSPOT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Some(Self {
            base_url,
            client_id,
            client_secret,
            timeout_secs,
        })
    }
}

/// Thin HubSpot API client. Every call is a single attempt; retry and token
/// refresh policy live in the sync engine. One instance is shared by
/// reference across accounts, the access token is passed per call.
#[derive(Clone)]
pub struct HubSpotClient {
    client: Client,
    config: HubSpotClientConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum HubSpotClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

impl HubSpotClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, HubSpotClientError::HttpError { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl HubSpotClient {
    pub fn new(config: HubSpotClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Run one search page against an object collection.
    pub async fn search(
        &self,
        access_token: &str,
        object: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, HubSpotClientError> {
        let url = format!("{}/crm/v3/objects/{}/search", self.config.base_url, object);
        let req = self.client.post(url).bearer_auth(access_token).json(request);
        send_json(req).await
    }

    /// Batch-read associations `from -> to` for the given source ids.
    pub async fn read_associations(
        &self,
        access_token: &str,
        from: &str,
        to: &str,
        ids: &[String],
    ) -> Result<AssociationBatchResponse, HubSpotClientError> {
        let url = format!(
            "{}/crm/v3/associations/{}/{}/batch/read",
            self.config.base_url, from, to
        );
        let body = AssociationBatchRequest {
            inputs: ids.iter().map(|id| ObjectRef { id: id.clone() }).collect(),
        };
        let req = self.client.post(url).bearer_auth(access_token).json(&body);
        send_json(req).await
    }

    /// Read a single object with the requested properties.
    pub async fn get_object(
        &self,
        access_token: &str,
        object: &str,
        id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, HubSpotClientError> {
        let url = format!("{}/crm/v3/objects/{}/{}", self.config.base_url, object, id);
        let req = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("properties", properties.join(","))]);
        send_json(req).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, HubSpotClientError> {
        let url = format!("{}/oauth/v1/token", self.config.base_url);
        let req = self.client.post(url).form(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ]);
        send_json(req).await
    }
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, HubSpotClientError> {
    let response = req.send().await?;
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(HubSpotClientError::RequestError);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HubSpotClientError::HttpError { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hubspot::objects::ObjectType;
    use crate::hubspot::query::build_search_request;
    use chrono::Utc;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> HubSpotClientConfig {
        HubSpotClientConfig {
            base_url: base_url.to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn search_posts_request_with_bearer_token() {
        let server = MockServer::start().await;
        let request = build_search_request(ObjectType::Contacts, None, Utc::now(), None, 100);

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts/search"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "results": [{
                    "id": "1",
                    "properties": { "email": "a@example.com" },
                    "createdAt": "2024-05-01T00:00:00Z",
                    "updatedAt": "2024-05-01T00:00:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let page = client.search("tok-1", "contacts", &request).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.next_after().is_none());
    }

    #[tokio::test]
    async fn search_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let request = build_search_request(ObjectType::Companies, None, Utc::now(), None, 100);
        let err = client.search("stale", "companies", &request).await.unwrap_err();

        assert!(err.is_unauthorized());
        match err {
            HubSpotClientError::HttpError { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "expired");
            }
            other => panic!("expected HttpError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_not_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/companies/search"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let request = build_search_request(ObjectType::Companies, None, Utc::now(), None, 100);
        let err = client.search("tok", "companies", &request).await.unwrap_err();
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn read_associations_posts_inputs() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm/v3/associations/contacts/companies/batch/read"))
            .and(body_json(serde_json::json!({ "inputs": [{ "id": "1" }, { "id": "2" }] })))
            .respond_with(ResponseTemplate::new(207).set_body_json(serde_json::json!({
                "status": "COMPLETE",
                "results": [{ "from": { "id": "1" }, "to": [{ "id": "50", "type": "contact_to_company" }] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let ids = vec!["1".to_string(), "2".to_string()];
        let response = client
            .read_associations("tok", "contacts", "companies", &ids)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].to[0].id, "50");
    }

    #[tokio::test]
    async fn get_object_requests_properties() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/crm/v3/objects/contacts/77"))
            .and(query_param("properties", "email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "77",
                "properties": { "email": "m@example.com" },
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let contact = client
            .get_object("tok", "contacts", "77", &["email"])
            .await
            .unwrap();
        assert_eq!(contact.property("email"), Some("m@example.com"));
    }

    #[tokio::test]
    async fn refresh_sends_form_with_app_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/v1/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=cid"))
            .and(body_string_contains("client_secret=secret"))
            .and(body_string_contains("refresh_token=r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "bearer",
                "access_token": "fresh",
                "refresh_token": "r-1",
                "expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HubSpotClient::new(test_config(&server.uri())).unwrap();
        let token = client.refresh_access_token("r-1").await.unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.expires_in, 1800);
    }

    // ── Config tests ─────────────────────────────────────────────

    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_returns_none_without_credentials() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::remove_var("HUBSPOT_CID");
        std::env::remove_var("HUBSPOT_CS");
        assert!(HubSpotClientConfig::from_env().is_none());
    }

    #[test]
    fn from_env_defaults_base_url() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("HUBSPOT_CID", "cid");
        std::env::set_var("HUBSPOT_CS", "cs");
        std::env::remove_var("HUBSPOT_BASE_URL");
        std::env::remove_var("HUBSPOT_TIMEOUT_SECS");

        let cfg = HubSpotClientConfig::from_env().unwrap();
        assert_eq!(cfg.base_url, "https://api.hubapi.com");
        assert_eq!(cfg.timeout_secs, 30);

        std::env::remove_var("HUBSPOT_CID");
        std::env::remove_var("HUBSPOT_CS");
    }

    #[test]
    fn from_env_strips_trailing_slash() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("HUBSPOT_CID", "cid");
        std::env::set_var("HUBSPOT_CS", "cs");
        std::env::set_var("HUBSPOT_BASE_URL", "http://localhost:9000/");

        let cfg = HubSpotClientConfig::from_env().unwrap();
        assert_eq!(cfg.base_url, "http://localhost:9000");

        std::env::remove_var("HUBSPOT_CID");
        std::env::remove_var("HUBSPOT_CS");
        std::env::remove_var("HUBSPOT_BASE_URL");
    }
}
