//! HTTP prober for configured sites.

use super::heuristics::classify;
use crate::types::{HttpConfig, HttpMethod, ProbeResult, Result, SiteDescriptor, Status};
use chrono::Local;
use governor::{Quota, RateLimiter};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Sends one check request per site, spaced by a fixed delay.
pub struct SiteProber {
    client: Client,
    rate_limiter: Option<Arc<DirectLimiter>>,
}

impl SiteProber {
    /// Create a new prober.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            // Signup forms answer with redirects that carry the verdict.
            .redirect(reqwest::redirect::Policy::none())
            .http1_only()
            .build()?;

        // One request per period: the first goes out immediately, each later one
        // waits for the delay to elapse.
        let rate_limiter = Quota::with_period(Duration::from_millis(config.delay_ms))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Probe a single site. Never fails: transport errors become `Status::Error`.
    pub async fn probe(&self, site: &SiteDescriptor, email: &str) -> ProbeResult {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.until_ready().await;
        }

        let (status, message) = match self.send(site, email).await {
            Ok((code, body)) => {
                trace!("{} answered HTTP {} ({} bytes)", site.name, code, body.len());
                classify(site, code, &body)
            }
            Err(e) => {
                warn!("Probe of {} failed: {}", site.name, e);
                (Status::Error, e.to_string())
            }
        };

        debug!("{}: {} ({})", site.name, status, message);

        ProbeResult {
            website: site.name.clone(),
            url: site.url.clone(),
            description: site.description.clone(),
            status,
            message,
            timestamp: Local::now(),
        }
    }

    /// Perform the actual HTTP request.
    async fn send(&self, site: &SiteDescriptor, email: &str) -> Result<(u16, String)> {
        let field = [(site.data_field.as_str(), email)];

        let request = match site.method {
            HttpMethod::Get => self.client.get(&site.check_url).query(&field),
            HttpMethod::Post => self.client.post(&site.check_url).form(&field),
        };

        let response = request
            .header(ACCEPT, "text/html,application/json;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.8")
            .send()
            .await?;

        let code = response.status().as_u16();
        let body = response.text().await?;
        Ok((code, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{closed_port_url, spawn_stub, test_site};
    use std::time::Instant;

    fn fast_config() -> HttpConfig {
        HttpConfig {
            timeout_secs: 5,
            delay_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_post_sends_form_field_and_classifies() {
        let (base, requests) = spawn_stub(vec![(200, "email is available".to_string())]).await;
        let prober = SiteProber::new(&fast_config()).unwrap();
        let site = test_site("Example", &base, HttpMethod::Post);

        let result = prober.probe(&site, "jane@example.com").await;
        assert_eq!(result.status, Status::Available);
        assert_eq!(result.website, "Example");

        let requests = requests.await.unwrap();
        assert!(requests[0].starts_with("POST /check"));
        assert!(requests[0].contains("email=jane%40example.com"));
    }

    #[tokio::test]
    async fn test_get_sends_query_parameter() {
        let (base, requests) = spawn_stub(vec![(200, r#"{"status":20}"#.to_string())]).await;
        let prober = SiteProber::new(&fast_config()).unwrap();
        let site = test_site("Example", &base, HttpMethod::Get);

        let result = prober.probe(&site, "jane@example.com").await;
        assert_eq!(result.status, Status::Unknown);

        let requests = requests.await.unwrap();
        assert!(requests[0].starts_with("GET /check?email=jane%40example.com"));
    }

    #[tokio::test]
    async fn test_redirect_and_bad_request_bodies_are_analysed() {
        let (base, requests) = spawn_stub(vec![
            (302, "An account exists for this email".to_string()),
            (400, r#"{"error":"Email already in use"}"#.to_string()),
        ])
        .await;
        let prober = SiteProber::new(&fast_config()).unwrap();
        let site = test_site("Example", &base, HttpMethod::Post);

        let redirected = prober.probe(&site, "jane@example.com").await;
        assert_eq!(redirected.status, Status::Taken);
        let rejected = prober.probe(&site, "jane@example.com").await;
        assert_eq!(rejected.status, Status::Taken);

        // Redirects are not followed: exactly the two check requests arrived.
        assert_eq!(requests.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_maps_to_error() {
        let prober = SiteProber::new(&fast_config()).unwrap();
        let site = test_site("Down", &closed_port_url().await, HttpMethod::Post);

        let result = prober.probe(&site, "jane@example.com").await;
        assert_eq!(result.status, Status::Error);
        assert!(!result.message.is_empty());
    }

    #[tokio::test]
    async fn test_delay_spaces_requests() {
        let (base, _requests) = spawn_stub(vec![
            (200, "available".to_string()),
            (200, "available".to_string()),
        ])
        .await;
        let config = HttpConfig {
            delay_ms: 200,
            ..fast_config()
        };
        let prober = SiteProber::new(&config).unwrap();
        let site = test_site("Example", &base, HttpMethod::Post);

        let start = Instant::now();
        prober.probe(&site, "jane@example.com").await;
        prober.probe(&site, "jane@example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(190));
    }
}
