//! Feed fetcher with security measures.
//!
//! Fetches raw feed documents over HTTP with SSRF protection, timeouts and
//! a hard cap on the number of bytes read. With private hosts blocked the
//! URL, every redirect target and every resolved address are checked.

use std::error::Error as StdError;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::AggregatorConfig;
use crate::{GatorError, Result};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Source of raw feed documents, the seam between the poller and the network.
pub trait FetchFeed: Send + Sync {
    /// Fetch the document at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// HTTP feed fetcher.
pub struct FeedFetcher {
    client: Client,
    max_size: u64,
    block_private_hosts: bool,
}

impl FeedFetcher {
    /// Create a new fetcher from aggregator settings.
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(SystemResolver))
    }

    /// Create a fetcher that looks hosts up through `resolver`.
    ///
    /// The resolver's answers still pass through the private address filter
    /// when `block_private_hosts` is set.
    pub fn with_resolver(config: &AggregatorConfig, resolver: Arc<dyn Resolve>) -> Result<Self> {
        let guarded = GuardedResolver {
            inner: resolver,
            block_private: config.block_private_hosts,
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(redirect_policy(
                config.max_redirects,
                config.block_private_hosts,
            ))
            .dns_resolver(Arc::new(guarded))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
            block_private_hosts: config.block_private_hosts,
        })
    }

    /// Fetch the feed at `url`, returning the raw body.
    ///
    /// A single GET with no retry. The body is read chunk by chunk and the
    /// request is abandoned as soon as it grows past the size limit.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url, self.block_private_hosts)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatorError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(GatorError::FeedTooLarge {
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| {
                GatorError::Transport(format!("failed to read {url}: {}", error_chain(&e)))
            })?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_size {
                return Err(GatorError::FeedTooLarge {
                    size,
                    max: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "Fetched feed");
        Ok(body)
    }
}

impl FetchFeed for FeedFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        self.fetch_bytes(url)
    }
}

/// Host lookup through the system resolver.
struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            // Port is ignored; the connector uses the one from the URL.
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0))
                .await?
                .collect();
            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}

/// Drops private addresses from another resolver's answer.
///
/// A public hostname pointing at 127.0.0.1 passes `validate_url`, so the
/// check has to happen again on the addresses actually dialled.
struct GuardedResolver {
    inner: Arc<dyn Resolve>,
    block_private: bool,
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let lookup = self.inner.resolve(name);
        let block_private = self.block_private;

        Box::pin(async move {
            let addrs = lookup.await?;
            if !block_private {
                return Ok(addrs);
            }
            match public_addrs(&host, addrs) {
                Ok(public) => Ok(Box::new(public.into_iter()) as Addrs),
                Err(e) => {
                    warn!(host = %host, "Refusing to connect: {e}");
                    Err(BoxError::from(e))
                }
            }
        })
    }
}

fn public_addrs(host: &str, addrs: impl Iterator<Item = SocketAddr>) -> Result<Vec<SocketAddr>> {
    let public: Vec<SocketAddr> = addrs.filter(|addr| !is_private_ip(&addr.ip())).collect();
    if public.is_empty() {
        return Err(GatorError::Validation(format!("{host} has no public address")));
    }
    Ok(public)
}

fn redirect_policy(max_redirects: usize, block_private: bool) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(
            attempt.url(),
            attempt.previous().len(),
            max_redirects,
            block_private,
        ) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}

/// Decide whether a redirect to `target` after `hops` earlier requests may be followed.
fn check_redirect(
    target: &Url,
    hops: usize,
    max_redirects: usize,
    block_private: bool,
) -> Result<()> {
    if hops > max_redirects {
        return Err(GatorError::Transport(format!(
            "too many redirects (max {max_redirects})"
        )));
    }
    validate_url(target.as_str(), block_private)
}

/// Map a request failure, surfacing a refusal raised by the redirect policy
/// or the resolver as a validation error.
fn request_error(url: &str, err: &reqwest::Error) -> GatorError {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(GatorError::Validation(msg)) = cause.downcast_ref::<GatorError>() {
            return GatorError::Validation(msg.clone());
        }
        source = cause.source();
    }
    GatorError::Transport(format!("failed to fetch {url}: {}", error_chain(err)))
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Validate a feed URL.
///
/// Only http and https are accepted. With `block_private` set, loopback,
/// private and link-local addresses and local hostnames are refused.
pub fn validate_url(url: &str, block_private: bool) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| GatorError::Validation("URL has no host".to_string()))?;

    if !block_private {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(GatorError::Validation(format!("forbidden host: {domain}")));
            }
        }
        url::Host::Ipv4(ipv4) => check_ip(IpAddr::V4(ipv4))?,
        url::Host::Ipv6(ipv6) => check_ip(IpAddr::V6(ipv6))?,
    }

    Ok(())
}

fn check_ip(ip: IpAddr) -> Result<()> {
    if is_private_ip(&ip) {
        return Err(GatorError::Validation(format!(
            "private IP address not allowed: {ip}"
        )));
    }
    Ok(())
}

/// Check if a hostname is forbidden.
fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: &[&str] = &[
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.trim_end_matches('.').to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

/// Check if an IP address is private/reserved.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || matches!(octets, [192, 0, 2, _] | [198, 51, 100, _] | [203, 0, 113, _])
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (first & 0xffc0) == 0xfe80
                || ipv6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
