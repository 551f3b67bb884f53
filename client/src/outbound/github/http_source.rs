//! Reqwest-backed GitHub directory adapter.
//!
//! This adapter owns transport details only: request construction, credential
//! headers, timeout and HTTP error mapping, and JSON decoding into domain
//! records.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{ProfileDto, SearchResponseDto};
use crate::domain::ports::{
    DirectorySearchError, DirectorySearchSource, ProfileLookupError, ProfileSource,
    RateLimitHint,
};
use crate::domain::{DirectoryHit, Query, UserProfile};

const GITHUB_JSON: &str = "application/vnd.github+json";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Endpoint and identity settings for the GitHub adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubEndpoints {
    /// Directory search endpoint; the query is sent as `q`.
    pub search: Url,
    /// Profile endpoint; the login is appended as a path segment.
    pub profile: Url,
    /// HTTP user-agent; GitHub rejects requests without one.
    pub user_agent: String,
}

impl GithubEndpoints {
    /// Parse endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns an error when either URL is malformed.
    pub fn parse(
        search: &str,
        profile: &str,
        user_agent: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            search: Url::parse(search)?,
            profile: Url::parse(profile)?,
            user_agent: user_agent.into(),
        })
    }
}

/// GitHub adapter performing search and profile lookups over HTTP.
pub struct GithubHttpSource {
    client: Client,
    endpoints: GithubEndpoints,
    token: Option<Zeroizing<String>>,
}

impl GithubHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// A `None` or blank token issues unauthenticated calls.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoints: GithubEndpoints,
        timeout: Duration,
        token: Option<Zeroizing<String>>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, self.endpoints.user_agent.as_str())
            .header(ACCEPT, GITHUB_JSON);
        match self.token.as_deref() {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    fn profile_url(&self, login: &str) -> Result<Url, ProfileLookupError> {
        let mut url = self.endpoints.profile.clone();
        url.path_segments_mut()
            .map_err(|()| ProfileLookupError::transport("profile endpoint cannot take a path"))?
            .pop_if_empty()
            .push(login);
        Ok(url)
    }
}

#[async_trait]
impl DirectorySearchSource for GithubHttpSource {
    async fn search_users(&self, query: &Query) -> Result<Vec<DirectoryHit>, DirectorySearchError> {
        let response = self
            .get(self.endpoints.search.clone())
            .query(&[("q", query.as_str())])
            .send()
            .await
            .map_err(map_search_transport_error)?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(DirectorySearchError::rate_limited(rate_limit_hint(
                response.headers(),
            )));
        }
        let body = response.bytes().await.map_err(map_search_transport_error)?;
        if !status.is_success() {
            return Err(map_search_status_error(status, body.as_ref()));
        }
        parse_hits(body.as_ref())
    }
}

#[async_trait]
impl ProfileSource for GithubHttpSource {
    async fn fetch_profile(&self, login: &str) -> Result<UserProfile, ProfileLookupError> {
        let response = self
            .get(self.profile_url(login)?)
            .send()
            .await
            .map_err(map_profile_transport_error)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(map_profile_transport_error)?;
        if !status.is_success() {
            return Err(map_profile_status_error(status, login, body.as_ref()));
        }
        parse_profile(body.as_ref())
    }
}

fn parse_hits(body: &[u8]) -> Result<Vec<DirectoryHit>, DirectorySearchError> {
    let decoded: SearchResponseDto = serde_json::from_slice(body).map_err(|error| {
        DirectorySearchError::decode(format!("invalid search JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain_hits())
}

fn parse_profile(body: &[u8]) -> Result<UserProfile, ProfileLookupError> {
    let decoded: ProfileDto = serde_json::from_slice(body).map_err(|error| {
        ProfileLookupError::decode(format!("invalid profile JSON payload: {error}"))
    })?;
    Ok(decoded.into())
}

fn rate_limit_hint(headers: &HeaderMap) -> RateLimitHint {
    let header_number = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
    };

    if let Some(reset) =
        header_number(RATE_LIMIT_RESET).and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        return RateLimitHint::ResetAt(reset);
    }
    match header_number(RETRY_AFTER.as_str()).and_then(|secs| u64::try_from(secs).ok()) {
        Some(secs) => RateLimitHint::RetryAfter(Duration::from_secs(secs)),
        None => RateLimitHint::Unknown,
    }
}

fn map_search_transport_error(error: reqwest::Error) -> DirectorySearchError {
    if error.is_timeout() {
        DirectorySearchError::timeout(error.to_string())
    } else {
        DirectorySearchError::transport(error.to_string())
    }
}

fn map_profile_transport_error(error: reqwest::Error) -> ProfileLookupError {
    if error.is_timeout() {
        ProfileLookupError::transport(format!("timed out: {error}"))
    } else {
        ProfileLookupError::transport(error.to_string())
    }
}

fn map_search_status_error(status: StatusCode, body: &[u8]) -> DirectorySearchError {
    let message = status_message(status, body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            DirectorySearchError::timeout(message)
        }
        _ if status.is_client_error() => DirectorySearchError::rejected(status.as_u16(), message),
        _ => DirectorySearchError::transport(message),
    }
}

fn map_profile_status_error(status: StatusCode, login: &str, body: &[u8]) -> ProfileLookupError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProfileLookupError::auth(status_message(status, body))
        }
        StatusCode::NOT_FOUND => ProfileLookupError::not_found(login),
        _ => ProfileLookupError::transport(status_message(status, body)),
    }
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let body_preview = body_preview(body);
    if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network GitHub mapping helpers.

    use super::*;
    use chrono::{TimeZone, Utc};
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    fn endpoints() -> GithubEndpoints {
        GithubEndpoints::parse(
            "https://api.github.com/search/users",
            "https://api.github.com/users",
            "directory-search/0.1",
        )
        .expect("valid endpoints")
    }

    fn source(token: Option<&str>) -> GithubHttpSource {
        GithubHttpSource::new(
            endpoints(),
            Duration::from_secs(5),
            token.map(|token| Zeroizing::new(token.to_owned())),
        )
        .expect("client builds")
    }

    #[test]
    fn attaches_token_header_when_configured() {
        let request = source(Some("s3cret"))
            .get(endpoints().search)
            .build()
            .expect("request builds");

        assert_eq!(
            request.headers().get(AUTHORIZATION),
            Some(&HeaderValue::from_static("token s3cret"))
        );
        assert!(request.headers().contains_key(USER_AGENT));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::blank(Some(""))]
    fn omits_token_header_without_credential(#[case] token: Option<&str>) {
        let request = source(token)
            .get(endpoints().search)
            .build()
            .expect("request builds");

        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn search_query_is_url_encoded() {
        let source = source(None);
        let request = source
            .get(source.endpoints.search.clone())
            .query(&[("q", "ada lovelace&co")])
            .build()
            .expect("request builds");

        assert_eq!(
            request.url().as_str(),
            "https://api.github.com/search/users?q=ada+lovelace%26co"
        );
    }

    #[rstest]
    #[case::plain("https://api.github.com/users", "octocat", "https://api.github.com/users/octocat")]
    #[case::trailing_slash("https://api.github.com/users/", "octocat", "https://api.github.com/users/octocat")]
    #[case::escaped("https://api.github.com/users", "a/b", "https://api.github.com/users/a%2Fb")]
    fn profile_url_appends_login_segment(
        #[case] endpoint: &str,
        #[case] login: &str,
        #[case] expected: &str,
    ) {
        let mut source = source(None);
        source.endpoints.profile = Url::parse(endpoint).expect("valid endpoint");

        let url = source.profile_url(login).expect("url builds");

        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn reset_header_becomes_absolute_hint() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("1773480600"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

        let expected = Utc
            .timestamp_opt(1_773_480_600, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(rate_limit_hint(&headers), RateLimitHint::ResetAt(expected));
    }

    #[rstest]
    #[case::retry_after("retry-after", "45", RateLimitHint::RetryAfter(Duration::from_secs(45)))]
    #[case::garbage("retry-after", "soon", RateLimitHint::Unknown)]
    #[case::negative("retry-after", "-3", RateLimitHint::Unknown)]
    #[case::unrelated("x-other", "10", RateLimitHint::Unknown)]
    fn relative_or_missing_headers(
        #[case] name: &'static str,
        #[case] value: &'static str,
        #[case] expected: RateLimitHint,
    ) {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));

        assert_eq!(rate_limit_hint(&headers), expected);
    }

    #[rstest]
    #[case::unprocessable(StatusCode::UNPROCESSABLE_ENTITY, "Rejected")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "Timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::server_error(StatusCode::SERVICE_UNAVAILABLE, "Transport")]
    fn maps_search_statuses(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_search_status_error(status, b"{\"message\":\"Validation Failed\"}");
        let matched = match expected {
            "Rejected" => matches!(error, DirectorySearchError::Rejected { status: 422, .. }),
            "Timeout" => matches!(error, DirectorySearchError::Timeout { .. }),
            "Transport" => matches!(error, DirectorySearchError::Transport { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} should map to {expected}, got {error:?}");
    }

    #[rstest]
    #[case::unauthorized(StatusCode::UNAUTHORIZED, "Auth")]
    #[case::forbidden(StatusCode::FORBIDDEN, "Auth")]
    #[case::missing(StatusCode::NOT_FOUND, "NotFound")]
    #[case::server_error(StatusCode::BAD_GATEWAY, "Transport")]
    fn maps_profile_statuses(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_profile_status_error(status, "ghost", b"");
        let matched = match expected {
            "Auth" => matches!(error, ProfileLookupError::Auth { .. }),
            "NotFound" => error == ProfileLookupError::not_found("ghost"),
            "Transport" => matches!(error, ProfileLookupError::Transport { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} should map to {expected}, got {error:?}");
    }

    #[test]
    fn parses_search_items_in_upstream_order() {
        let body = r#"{
            "total_count": 2,
            "incomplete_results": false,
            "items": [
                {
                    "login": "adal",
                    "id": 11,
                    "avatar_url": "https://avatars.githubusercontent.com/u/11",
                    "html_url": "https://github.com/adal",
                    "type": "User",
                    "score": 1.0
                },
                {
                    "login": "ada2",
                    "id": 12,
                    "avatar_url": "https://avatars.githubusercontent.com/u/12",
                    "html_url": "https://github.com/ada2",
                    "type": "User",
                    "score": 1.0
                }
            ]
        }"#;

        let hits = parse_hits(body.as_bytes()).expect("JSON should decode");
        let logins: Vec<&str> = hits.iter().map(|hit| hit.login.as_str()).collect();
        assert_eq!(logins, ["adal", "ada2"]);
        assert_eq!(hits.first().map(|hit| hit.id), Some(11));
    }

    #[test]
    fn search_payload_without_items_is_malformed() {
        let error = parse_hits(br#"{"message":"oops"}"#).expect_err("decode should fail");
        assert!(matches!(error, DirectorySearchError::Decode { .. }));
    }

    #[test]
    fn profile_allows_null_display_name() {
        let profile =
            parse_profile(br#"{"login":"ghost","name":null,"followers":3}"#).expect("decodes");
        assert_eq!(
            profile,
            UserProfile {
                display_name: None,
                followers: 3,
            }
        );
    }

    #[test]
    fn profile_without_followers_is_malformed() {
        let error = parse_profile(br#"{"name":"Ada"}"#).expect_err("decode should fail");
        assert!(matches!(error, ProfileLookupError::Decode { .. }));
    }

    #[test]
    fn long_bodies_are_truncated_in_messages() {
        let body = "x".repeat(400);
        let message = status_message(StatusCode::BAD_GATEWAY, body.as_bytes());
        assert!(message.starts_with("status 502: "));
        assert!(message.ends_with("..."));
    }
}
