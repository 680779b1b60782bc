//! Access policies.
//!
//! Every object request passes through an [`AccessPipeline`]: an ordered list
//! of independent checks built from configuration. Each check either passes
//! or denies with a reason, and the first denial ends evaluation.

use reelgate_core::Clock;
use reelgate_core::config::AccessConfig;
use reelgate_signer::{SecretKey, SignatureFailure, SignerResult, UrlSigner};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Why a request was allowed or denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessReason {
    Ok,
    MissingParams,
    Expired,
    SignatureMismatch,
    RefererForbidden,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::MissingParams => "missing-params",
            Self::Expired => "expired",
            Self::SignatureMismatch => "signature-mismatch",
            Self::RefererForbidden => "referer-forbidden",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SignatureFailure> for AccessReason {
    fn from(failure: SignatureFailure) -> Self {
        match failure {
            SignatureFailure::MissingParams => Self::MissingParams,
            SignatureFailure::Expired => Self::Expired,
            SignatureFailure::Mismatch => Self::SignatureMismatch,
        }
    }
}

/// Result of evaluating the whole pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub authorized: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            authorized: true,
            reason: AccessReason::Ok,
        }
    }

    pub fn deny(reason: AccessReason) -> Self {
        Self {
            authorized: false,
            reason,
        }
    }
}

/// Outcome of a single policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyOutcome {
    Pass,
    Deny(AccessReason),
}

/// The parts of a request that policies may inspect.
#[derive(Clone, Copy, Debug)]
pub struct AccessRequest<'a> {
    /// Decoded object path, without the leading `/`.
    pub path: &'a str,
    /// Raw query string, if any.
    pub query: Option<&'a str>,
    /// `Referer` header. [`UNREADABLE_REFERER`] when present but not valid text.
    pub referer: Option<&'a str>,
}

/// Stand-in for a `Referer` header whose bytes are not visible ASCII.
/// It never parses as a URL, so the referer check denies it.
pub const UNREADABLE_REFERER: &str = "\u{fffd}";

/// A single access check.
pub trait AccessPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, request: &AccessRequest<'_>) -> PolicyOutcome;
}

/// First value of `name` in a query string.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Requires a valid, unexpired `expires`/`signature` pair for the path.
#[derive(Debug)]
pub struct SignaturePolicy {
    signer: UrlSigner,
}

impl SignaturePolicy {
    pub fn new(signer: UrlSigner) -> Self {
        Self { signer }
    }
}

impl AccessPolicy for SignaturePolicy {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn check(&self, request: &AccessRequest<'_>) -> PolicyOutcome {
        let expires = query_param(request.query, "expires");
        let signature = query_param(request.query, "signature");

        match self
            .signer
            .check(request.path, expires.as_deref(), signature.as_deref())
        {
            Ok(()) => PolicyOutcome::Pass,
            Err(failure) => PolicyOutcome::Deny(failure.into()),
        }
    }
}

/// Restricts which sites may embed objects.
///
/// Requests without a `Referer` pass: non-browser clients rarely send one, so
/// the allow-list only constrains browsers.
#[derive(Debug)]
pub struct RefererPolicy {
    allowed: Vec<String>,
}

impl RefererPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed }
    }

    /// Exact match or subdomain of an allowed entry.
    pub fn host_allowed(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.allowed.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

impl AccessPolicy for RefererPolicy {
    fn name(&self) -> &'static str {
        "referer"
    }

    fn check(&self, request: &AccessRequest<'_>) -> PolicyOutcome {
        // An empty header counts as absent.
        let referer = match request.referer.map(str::trim) {
            None | Some("") => return PolicyOutcome::Pass,
            Some(referer) => referer,
        };

        let allowed = Url::parse(referer)
            .ok()
            .and_then(|url| url.host_str().map(|h| self.host_allowed(h)))
            .unwrap_or(false);

        if allowed {
            PolicyOutcome::Pass
        } else {
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        }
    }
}

/// Ordered list of access policies.
#[derive(Default)]
pub struct AccessPipeline {
    policies: Vec<Box<dyn AccessPolicy>>,
}

impl fmt::Debug for AccessPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPipeline")
            .field("policies", &self.policy_names())
            .finish()
    }
}

impl AccessPipeline {
    /// Build the pipeline for a deployment.
    ///
    /// The signature check is present only when a secret is configured and the
    /// referer check only when the allow-list is non-empty.
    pub fn from_config(config: &AccessConfig, clock: Arc<dyn Clock>) -> SignerResult<Self> {
        let mut pipeline = Self::default();

        if let Some(secret) = config.secret() {
            let signer = UrlSigner::new(SecretKey::new(secret)?, clock);
            pipeline = pipeline.with_policy(SignaturePolicy::new(signer));
        }

        let allowed = config.referer_allow_list();
        if !allowed.is_empty() {
            pipeline = pipeline.with_policy(RefererPolicy::new(allowed));
        }

        Ok(pipeline)
    }

    /// Append a policy to the end of the pipeline.
    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// True when no policy is configured and every request is allowed.
    pub fn is_open(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn evaluate(&self, request: &AccessRequest<'_>) -> AccessDecision {
        for policy in &self.policies {
            if let PolicyOutcome::Deny(reason) = policy.check(request) {
                return AccessDecision::deny(reason);
            }
        }
        AccessDecision::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgate_core::FixedClock;
    use reelgate_signer::sign;

    const NOW: i64 = 1_700_000_000;
    const SECRET: &str = "test-secret";

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(NOW))
    }

    fn config(secret: Option<&str>, referers: &[&str]) -> AccessConfig {
        AccessConfig {
            secret_key: secret.map(String::from),
            allowed_referers: referers.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn signed_query(path: &str, expires: i64) -> String {
        let key = SecretKey::new(SECRET).unwrap();
        format!("expires={expires}&signature={}", sign(path, expires, &key))
    }

    fn request<'a>(path: &'a str, query: Option<&'a str>, referer: Option<&'a str>) -> AccessRequest<'a> {
        AccessRequest {
            path,
            query,
            referer,
        }
    }

    #[test]
    fn empty_config_builds_open_pipeline() {
        let pipeline = AccessPipeline::from_config(&config(None, &[]), clock()).unwrap();
        assert!(pipeline.is_open());
        assert!(pipeline.evaluate(&request("a.mp4", None, None)).authorized);
    }

    #[test]
    fn empty_secret_is_treated_as_unset() {
        let pipeline = AccessPipeline::from_config(&config(Some(""), &[]), clock()).unwrap();
        assert!(pipeline.is_open());
    }

    #[test]
    fn policies_follow_configuration_order() {
        let pipeline =
            AccessPipeline::from_config(&config(Some(SECRET), &["example.com"]), clock()).unwrap();
        assert_eq!(pipeline.policy_names(), vec!["signature", "referer"]);

        let only_referer =
            AccessPipeline::from_config(&config(None, &[" Example.com ", ""]), clock()).unwrap();
        assert_eq!(only_referer.policy_names(), vec!["referer"]);
    }

    #[test]
    fn valid_signature_passes() {
        let pipeline = AccessPipeline::from_config(&config(Some(SECRET), &[]), clock()).unwrap();
        let query = signed_query("video/a.mp4", NOW + 3600);
        let decision = pipeline.evaluate(&request("video/a.mp4", Some(&query), None));
        assert_eq!(decision, AccessDecision::allow());
    }

    #[test]
    fn signature_failures_carry_reasons() {
        let pipeline = AccessPipeline::from_config(&config(Some(SECRET), &[]), clock()).unwrap();

        let missing = pipeline.evaluate(&request("video/a.mp4", Some("expires=1"), None));
        assert_eq!(missing, AccessDecision::deny(AccessReason::MissingParams));

        let expired_query = signed_query("video/a.mp4", NOW - 1);
        let expired = pipeline.evaluate(&request("video/a.mp4", Some(&expired_query), None));
        assert_eq!(expired.reason, AccessReason::Expired);

        let other_path = signed_query("video/b.mp4", NOW + 60);
        let mismatch = pipeline.evaluate(&request("video/a.mp4", Some(&other_path), None));
        assert_eq!(mismatch.reason, AccessReason::SignatureMismatch);

        let garbage = pipeline.evaluate(&request(
            "video/a.mp4",
            Some("expires=soon&signature=abc"),
            None,
        ));
        assert_eq!(garbage.reason, AccessReason::Expired);
    }

    #[test]
    fn first_query_occurrence_wins() {
        let pipeline = AccessPipeline::from_config(&config(Some(SECRET), &[]), clock()).unwrap();
        let good = signed_query("a.mp4", NOW + 60);
        let query = format!("{good}&signature=deadbeef&expires=1");
        assert!(pipeline.evaluate(&request("a.mp4", Some(&query), None)).authorized);

        let query = format!("signature=deadbeef&{good}");
        assert_eq!(
            pipeline.evaluate(&request("a.mp4", Some(&query), None)).reason,
            AccessReason::SignatureMismatch
        );
    }

    #[test]
    fn referer_rules() {
        let policy = RefererPolicy::new(["example.com"]);
        let check = |referer: Option<&str>| policy.check(&request("a.mp4", None, referer));

        assert_eq!(check(None), PolicyOutcome::Pass);
        assert_eq!(check(Some("https://example.com/page")), PolicyOutcome::Pass);
        assert_eq!(check(Some("https://cdn.EXAMPLE.com/x")), PolicyOutcome::Pass);
        assert_eq!(
            check(Some("https://evil.example")),
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        );
        assert_eq!(
            check(Some("https://notexample.com/")),
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        );
        assert_eq!(
            check(Some("https://example.com.evil.net/")),
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        );
        assert_eq!(
            check(Some("not a url")),
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        );
        assert_eq!(
            check(Some(UNREADABLE_REFERER)),
            PolicyOutcome::Deny(AccessReason::RefererForbidden)
        );
    }

    #[test]
    fn empty_referer_counts_as_absent() {
        let policy = RefererPolicy::new(["example.com"]);
        let check = |referer: Option<&str>| policy.check(&request("a.mp4", None, referer));

        assert_eq!(check(Some("")), PolicyOutcome::Pass);
        assert_eq!(check(Some("   ")), PolicyOutcome::Pass);
        assert_eq!(check(Some(" https://example.com/ ")), PolicyOutcome::Pass);
    }

    #[test]
    fn signature_is_checked_before_referer() {
        let pipeline =
            AccessPipeline::from_config(&config(Some(SECRET), &["example.com"]), clock()).unwrap();
        let decision = pipeline.evaluate(&request("a.mp4", None, Some("https://evil.example")));
        assert_eq!(decision.reason, AccessReason::MissingParams);
    }

    #[test]
    fn reason_wire_names() {
        assert_eq!(AccessReason::Ok.to_string(), "ok");
        assert_eq!(AccessReason::MissingParams.to_string(), "missing-params");
        assert_eq!(AccessReason::Expired.to_string(), "expired");
        assert_eq!(AccessReason::SignatureMismatch.to_string(), "signature-mismatch");
        assert_eq!(AccessReason::RefererForbidden.to_string(), "referer-forbidden");
    }
}
