use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// What a metadata-only request learned about a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub is_success: bool,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn image(content_type: &str) -> Self {
        Self {
            is_success: true,
            content_type: Some(content_type.to_string()),
        }
    }

    pub fn is_image(&self) -> bool {
        self.is_success
            && self
                .content_type
                .as_deref()
                .map(|content_type| {
                    content_type
                        .trim_start()
                        .to_ascii_lowercase()
                        .starts_with("image/")
                })
                .unwrap_or(false)
    }
}

#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

/// Checks candidates with `HEAD` requests.
pub struct HttpImageProbe {
    client: Client,
    base_url: Option<Url>,
}

impl HttpImageProbe {
    /// Relative candidates are joined onto `base_url`. Its host is the only
    /// non-public host a probe may reach.
    pub fn create(timeout: Duration, base_url: Option<Url>) -> Result<Self, ProbeError> {
        let trusted_host = base_url
            .as_ref()
            .and_then(|url| url.host_str())
            .map(ToString::to_string);

        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.stop()
                } else if check_target(attempt.url(), trusted_host.as_deref()).is_ok() {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub(crate) fn absolute_url(&self, url: &str) -> Result<Url, ProbeError> {
        let invalid = |reason: String| ProbeError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let absolute = match (Url::parse(url), &self.base_url) {
            (Ok(url), _) => url,
            (Err(_), Some(base_url)) => base_url.join(url).map_err(|e| invalid(e.to_string()))?,
            (Err(error), None) => return Err(invalid(error.to_string())),
        };

        let trusted_host = self.base_url.as_ref().and_then(|url| url.host_str());
        check_target(&absolute, trusted_host).map_err(invalid)?;

        Ok(absolute)
    }
}

/// Only plain HTTP(S) to public hosts, or to the configured site host.
fn check_target(url: &Url, trusted_host: Option<&str>) -> Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }

    let host = url.host_str().ok_or_else(|| "missing host".to_string())?;

    if trusted_host == Some(host) || is_public_host(host) {
        Ok(())
    } else {
        Err(format!("host {} is not public", host))
    }
}

fn is_public_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_public_ipv4(ip),
        Ok(IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
            Some(ip) => is_public_ipv4(ip),
            None => is_public_ipv6(ip),
        },
        Err(_) => {
            let host = host.trim_end_matches('.').to_ascii_lowercase();
            host != "localhost" && !host.ends_with(".localhost")
        }
    }
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [first, second, ..] = ip.octets();
    // 100.64.0.0/10, carrier-grade NAT
    let is_shared = first == 100 && (second & 0xc0) == 64;

    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || is_shared)
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let is_unique_local = (first & 0xfe00) == 0xfc00;
    let is_link_local = (first & 0xffc0) == 0xfe80;

    !(ip.is_loopback() || ip.is_unspecified() || is_unique_local || is_link_local)
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let url = self.absolute_url(url)?;
        let response = self.client.head(url).send().await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        Ok(ProbeResponse {
            is_success: response.status().is_success(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_with_base(base_url: Option<&str>) -> HttpImageProbe {
        HttpImageProbe::create(
            Duration::from_secs(1),
            base_url.map(|url| Url::parse(url).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn should_accept_only_successful_image_responses() {
        assert!(ProbeResponse::image("image/jpeg").is_image());
        assert!(ProbeResponse::image("Image/PNG; charset=binary").is_image());
        assert!(!ProbeResponse::image("text/html").is_image());
        assert!(!ProbeResponse {
            is_success: false,
            content_type: Some("image/jpeg".into()),
        }
        .is_image());
        assert!(!ProbeResponse {
            is_success: true,
            content_type: None,
        }
        .is_image());
    }

    #[test]
    fn should_resolve_relative_candidates_against_base_url() {
        let probe = probe_with_base(Some("https://calm.example/resources/"));

        assert_eq!(
            probe.absolute_url("i1.jpg").unwrap().as_str(),
            "https://calm.example/resources/i1.jpg"
        );
        assert_eq!(
            probe.absolute_url("https://cdn.example/a.png").unwrap().as_str(),
            "https://cdn.example/a.png"
        );
    }

    #[test]
    fn should_reject_relative_candidates_without_base_url() {
        let probe = probe_with_base(None);

        assert!(matches!(
            probe.absolute_url("i1.jpg"),
            Err(ProbeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn should_reject_internal_and_non_http_targets() {
        let probe = probe_with_base(None);

        for url in [
            "http://169.254.169.254/latest/meta-data/",
            "http://127.0.0.1:8080/admin",
            "http://localhost/a.jpg",
            "http://api.localhost/a.jpg",
            "http://10.0.0.5/a.jpg",
            "http://192.168.1.1/a.jpg",
            "http://100.64.0.1/a.jpg",
            "http://[::1]/a.jpg",
            "http://[fd00::1]/a.jpg",
            "http://[::ffff:127.0.0.1]/a.jpg",
            "ftp://cdn.example/a.jpg",
            "file:///etc/passwd",
        ] {
            assert!(
                matches!(probe.absolute_url(url), Err(ProbeError::InvalidUrl { .. })),
                "{} should be rejected",
                url
            );
        }

        assert!(probe.absolute_url("http://8.8.8.8/a.jpg").is_ok());
    }

    #[test]
    fn should_trust_configured_site_host() {
        let probe = probe_with_base(Some("http://localhost:3000/"));

        assert_eq!(
            probe.absolute_url("/images/a.jpg").unwrap().as_str(),
            "http://localhost:3000/images/a.jpg"
        );
        assert!(probe.absolute_url("http://127.0.0.1:3000/a.jpg").is_err());
    }

    #[tokio::test]
    async fn should_not_send_requests_to_internal_hosts() {
        let probe = probe_with_base(None);

        assert!(matches!(
            probe.probe("http://169.254.169.254/latest/meta-data/").await,
            Err(ProbeError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn should_fail_probe_of_relative_candidate_without_network() {
        let probe = probe_with_base(None);

        assert!(probe.probe("/images/a.jpg").await.is_err());
    }
}
