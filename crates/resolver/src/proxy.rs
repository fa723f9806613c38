//! Proxy routing policy.
//!
//! A [`ProxyPolicy`] maps URL patterns to routes. The builder seeds it from
//! the proxy environment variables, layers an explicit override on top and
//! pins loopback plus every locally served endpoint to a direct route, so
//! gateway-internal traffic never leaves the host through a proxy.

use crate::address::ResolvedAddress;
use anyhow::{Context, Result, bail};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
    sync::OnceLock,
    time::Duration,
};
use url::Url;

/// Hosts that always bypass proxies.
pub const LOOPBACK_HOSTS: [&str; 2] = ["127.0.0.1", "localhost"];

/// Which target schemes a pattern applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemeMatch {
    /// Any scheme.
    All,
    /// `http` only.
    Http,
    /// `https` only.
    Https,
}

impl SchemeMatch {
    /// Pattern prefix name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    fn parse(scheme: &str) -> Result<Self> {
        Ok(match scheme.to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "http" => Self::Http,
            "https" => Self::Https,
            other => bail!("unsupported proxy pattern scheme '{other}'"),
        })
    }

    fn matches(self, scheme: &str) -> bool {
        match self {
            Self::All => true,
            Self::Http => scheme == "http",
            Self::Https => scheme == "https",
        }
    }
}

/// Which target hosts a pattern applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostMatch {
    /// Every host.
    Any,
    /// Exactly this host.
    Exact(String),
    /// This domain and all of its subdomains.
    Domain(String),
    /// Subdomains of this domain only.
    Subdomain(String),
}

impl HostMatch {
    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(h) => host == h,
            Self::Domain(d) => host == d || is_subdomain(host, d),
            Self::Subdomain(d) => is_subdomain(host, d),
        }
    }

    /// Length of the host text, used to rank overlapping patterns.
    fn specificity(&self) -> (usize, bool) {
        match self {
            Self::Any => (0, false),
            Self::Exact(h) => (h.len(), true),
            Self::Domain(d) | Self::Subdomain(d) => (d.len(), false),
        }
    }
}

fn is_subdomain(host: &str, domain: &str) -> bool {
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// A URL pattern: scheme, host and optional port.
///
/// Parsed forms:
/// - `all://`, `http://`, `https://` match every host of the scheme.
/// - `scheme://host[:port]` matches that host exactly.
/// - `scheme://*.example.com` matches subdomains only.
/// - `scheme://.example.com` matches the domain and its subdomains.
/// - A bare `host[:port]`, as found in `no_proxy`, applies to all schemes;
///   bare names match the domain and its subdomains, bare IPs exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyPattern {
    /// Scheme filter.
    pub scheme: SchemeMatch,
    /// Host filter.
    pub host: HostMatch,
    /// Port filter; `None` matches any port.
    pub port: Option<u16>,
}

impl ProxyPattern {
    /// Every URL with the given scheme.
    pub fn scheme(scheme: SchemeMatch) -> Self {
        Self {
            scheme,
            host: HostMatch::Any,
            port: None,
        }
    }

    /// Exactly `host` on any port and scheme.
    pub fn host(host: &str) -> Self {
        Self {
            scheme: SchemeMatch::All,
            host: HostMatch::Exact(normalize_host(host)),
            port: None,
        }
    }

    /// The origin of a resolved endpoint.
    pub fn endpoint(address: &ResolvedAddress) -> Self {
        Self {
            scheme: SchemeMatch::parse(address.scheme).unwrap_or(SchemeMatch::All),
            host: HostMatch::Exact(normalize_host(&address.host)),
            port: Some(address.port),
        }
    }

    /// Whether this pattern matches `url`.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.scheme.matches(url.scheme())
            && self.host.matches(&host.to_ascii_lowercase())
            && self
                .port
                .is_none_or(|port| url.port_or_known_default() == Some(port))
    }

    /// Ranking among matching patterns: port-qualified first, then the
    /// longer host, then exact hosts, then a concrete scheme over `all`.
    fn rank(&self) -> (bool, usize, bool, bool) {
        let (len, exact) = self.host.specificity();
        (
            self.port.is_some(),
            len,
            exact,
            self.scheme != SchemeMatch::All,
        )
    }

    /// `no_proxy`-style rendering, without the scheme.
    ///
    /// `None` when `NO_PROXY` cannot express the pattern without widening
    /// it: a scheme-scoped any-host rule would bypass every scheme, and a
    /// subdomain-only rule would also bypass the apex.
    fn no_proxy_entry(&self) -> Option<String> {
        let host = match &self.host {
            HostMatch::Any if self.scheme != SchemeMatch::All => return None,
            HostMatch::Any => "*".to_owned(),
            HostMatch::Exact(h) | HostMatch::Domain(h) => h.clone(),
            HostMatch::Subdomain(_) => return None,
        };
        Some(match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host,
        })
    }
}

impl FromStr for ProxyPattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("empty proxy pattern");
        }
        let (scheme, rest, bare) = match s.split_once("://") {
            Some((scheme, rest)) => (SchemeMatch::parse(scheme)?, rest, false),
            None => (SchemeMatch::All, s, true),
        };
        let rest = rest.trim_end_matches('/');
        if rest.is_empty() {
            return Ok(Self::scheme(scheme));
        }

        let (host, port) = split_port(rest)
            .with_context(|| format!("invalid port in proxy pattern '{s}'"))?;
        let host = if host == "*" {
            HostMatch::Any
        } else if let Some(domain) = host.strip_prefix("*.") {
            HostMatch::Subdomain(normalize_host(domain))
        } else if let Some(domain) = host.strip_prefix('.') {
            HostMatch::Domain(normalize_host(domain))
        } else if bare && !is_ip(host) {
            HostMatch::Domain(normalize_host(host))
        } else {
            HostMatch::Exact(normalize_host(host))
        };
        Ok(Self { scheme, host, port })
    }
}

impl fmt::Display for ProxyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme.as_str())?;
        match &self.host {
            HostMatch::Any if self.port.is_some() => f.write_str("*")?,
            HostMatch::Any => {}
            HostMatch::Exact(h) => f.write_str(h)?,
            HostMatch::Domain(d) => write!(f, ".{d}")?,
            HostMatch::Subdomain(d) => write!(f, "*.{d}")?,
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Split `host[:port]`, keeping bracketed and bare IPv6 hosts intact.
fn split_port(s: &str) -> Result<(&str, Option<u16>)> {
    if s.starts_with('[') {
        let end = s.find(']').context("unterminated IPv6 host")?;
        let port = match &s[end + 1..] {
            "" => None,
            rest => Some(rest.strip_prefix(':').context("expected ':'")?.parse()?),
        };
        return Ok((&s[..=end], port));
    }
    match s.split_once(':') {
        // More than one colon is an unbracketed IPv6 literal.
        Some((_, rest)) if rest.contains(':') => Ok((s, None)),
        Some((host, port)) => Ok((host, Some(port.parse()?))),
        None => Ok((s, None)),
    }
}

fn is_ip(host: &str) -> bool {
    host.trim_matches(|c| c == '[' || c == ']')
        .parse::<std::net::IpAddr>()
        .is_ok()
}

/// Lowercase a host; bare IPv6 literals get the brackets URLs carry.
fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    if !host.starts_with('[') && host.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("[{host}]")
    } else {
        host
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Connect directly.
    Direct,
    /// Connect through this proxy.
    Via(Url),
}

impl Route {
    /// The proxy URL, if any.
    pub fn proxy_url(&self) -> Option<&Url> {
        match self {
            Self::Direct => None,
            Self::Via(url) => Some(url),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Via(url) => write!(f, "{url}"),
        }
    }
}

/// Parse a proxy URL, assuming `http://` when no scheme is given.
pub fn parse_proxy_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let parsed = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{raw}"))
    };
    let url = parsed.with_context(|| format!("invalid proxy url '{raw}'"))?;
    if url.host_str().is_none() {
        bail!("proxy url '{raw}' has no host");
    }
    Ok(url)
}

/// Allow/deny proxy map.
///
/// URLs no pattern matches connect directly. Pinned patterns stay direct
/// through every [`ProxyPolicy::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPolicy {
    rules: BTreeMap<ProxyPattern, Route>,
    pinned: BTreeSet<ProxyPattern>,
}

impl ProxyPolicy {
    /// An empty policy: everything direct.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the route for `pattern`, replacing any previous one.
    pub fn insert(&mut self, pattern: ProxyPattern, route: Route) {
        self.rules.insert(pattern, route);
    }

    /// Route `pattern` directly.
    pub fn bypass(&mut self, pattern: ProxyPattern) {
        self.insert(pattern, Route::Direct);
    }

    /// Route `pattern` directly, now and after any later merge.
    pub fn pin(&mut self, pattern: ProxyPattern) {
        self.bypass(pattern.clone());
        self.pinned.insert(pattern);
    }

    /// The route configured for exactly `pattern`.
    pub fn get(&self, pattern: &ProxyPattern) -> Option<&Route> {
        self.rules.get(pattern)
    }

    /// All rules, ordered by pattern.
    pub fn iter(&self) -> impl Iterator<Item = (&ProxyPattern, &Route)> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the policy has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule routes through a proxy.
    pub fn has_proxies(&self) -> bool {
        self.rules.values().any(|route| matches!(route, Route::Via(_)))
    }

    /// Route for `url` by its most specific matching pattern.
    ///
    /// URLs matching a pinned pattern are direct whatever else matches.
    pub fn route(&self, url: &Url) -> Route {
        if self.pinned.iter().any(|pattern| pattern.matches(url)) {
            return Route::Direct;
        }
        self.rules
            .iter()
            .filter(|(pattern, _)| pattern.matches(url))
            .max_by_key(|(pattern, _)| pattern.rank())
            .map(|(_, route)| route.clone())
            .unwrap_or(Route::Direct)
    }

    /// Route for a URL string.
    pub fn route_str(&self, url: &str) -> Result<Route> {
        let url = Url::parse(url).with_context(|| format!("invalid url '{url}'"))?;
        Ok(self.route(&url))
    }

    /// Apply `explicit` over the current rules, then restore pinned bypasses.
    pub fn merge(&mut self, explicit: &ProxyOverride) -> Result<()> {
        match explicit {
            ProxyOverride::All(proxy) => {
                let url = parse_proxy_url(proxy)?;
                for scheme in [SchemeMatch::All, SchemeMatch::Http, SchemeMatch::Https] {
                    self.insert(ProxyPattern::scheme(scheme), Route::Via(url.clone()));
                }
            }
            ProxyOverride::PerScheme(map) => {
                for (key, value) in map {
                    let pattern = override_key(key)?;
                    let route = match value.trim() {
                        "" => Route::Direct,
                        proxy => Route::Via(parse_proxy_url(proxy)?),
                    };
                    self.insert(pattern, route);
                }
            }
        }
        for pattern in &self.pinned {
            self.rules.insert(pattern.clone(), Route::Direct);
        }
        Ok(())
    }

    /// Proxy URL the policy applies to every host of `scheme`.
    pub fn scheme_proxy(&self, scheme: SchemeMatch) -> Option<&Url> {
        self.get(&ProxyPattern::scheme(scheme))
            .and_then(Route::proxy_url)
    }

    /// Direct patterns rendered as a `NO_PROXY` value. Patterns the
    /// format cannot express exactly are left out.
    pub fn no_proxy(&self) -> String {
        let mut seen = BTreeSet::new();
        self.rules
            .iter()
            .filter(|(_, route)| **route == Route::Direct)
            .filter_map(|(pattern, _)| pattern.no_proxy_entry())
            .filter(|entry| seen.insert(entry.clone()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ProxyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pattern, route) in &self.rules {
            writeln!(f, "{pattern} -> {route}")?;
        }
        Ok(())
    }
}

/// Turn an override key into a pattern. `http`, `http_proxy` and `http://`
/// all name every `http` URL; other keys are parsed as patterns.
fn override_key(key: &str) -> Result<ProxyPattern> {
    let key = key.trim();
    let name = key.strip_suffix("_proxy").unwrap_or(key);
    match name.to_ascii_lowercase().as_str() {
        "all" => Ok(ProxyPattern::scheme(SchemeMatch::All)),
        "http" => Ok(ProxyPattern::scheme(SchemeMatch::Http)),
        "https" => Ok(ProxyPattern::scheme(SchemeMatch::Https)),
        _ => key.parse(),
    }
}

/// Caller-supplied proxy settings that win over the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOverride {
    /// One proxy for every scheme.
    All(String),
    /// Proxies by scheme name or pattern; an empty value forces a direct
    /// route.
    PerScheme(BTreeMap<String, String>),
}

impl From<&str> for ProxyOverride {
    fn from(proxy: &str) -> Self {
        Self::All(proxy.to_owned())
    }
}

impl From<String> for ProxyOverride {
    fn from(proxy: String) -> Self {
        Self::All(proxy)
    }
}

impl From<BTreeMap<String, String>> for ProxyOverride {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::PerScheme(map)
    }
}

/// Proxy environment variables.
///
/// Each value is trimmed and empty values count as unset, so
/// `http_proxy=""` is indistinguishable from no `http_proxy` at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    /// `http_proxy`.
    pub http: Option<String>,
    /// `https_proxy`.
    pub https: Option<String>,
    /// `all_proxy`.
    pub all: Option<String>,
    /// `no_proxy`, comma-separated.
    pub no_proxy: Option<String>,
}

impl ProxyEnv {
    /// Read the process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup`, preferring lowercase names over uppercase.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            let value = |key: &str| {
                lookup(key)
                    .map(|v| v.trim().to_owned())
                    .filter(|v| !v.is_empty())
            };
            value(name).or_else(|| value(&name.to_ascii_uppercase()))
        };
        Self {
            http: read("http_proxy"),
            https: read("https_proxy"),
            all: read("all_proxy"),
            no_proxy: read("no_proxy"),
        }
    }
}

/// Builds the [`ProxyPolicy`] for a set of local endpoints.
#[derive(Debug, Clone)]
pub struct ProxyPolicyBuilder {
    endpoints: Vec<ResolvedAddress>,
    env: ProxyEnv,
    explicit: Option<ProxyOverride>,
}

impl ProxyPolicyBuilder {
    /// Start from the process proxy environment.
    pub fn new(endpoints: Vec<ResolvedAddress>) -> Self {
        Self {
            endpoints,
            env: ProxyEnv::from_process(),
            explicit: None,
        }
    }

    /// Use `env` instead of the process environment.
    pub fn env(mut self, env: ProxyEnv) -> Self {
        self.env = env;
        self
    }

    /// Layer `explicit` over the environment.
    pub fn explicit(mut self, explicit: Option<ProxyOverride>) -> Self {
        self.explicit = explicit;
        self
    }

    /// Build the policy.
    pub fn build(&self) -> Result<ProxyPolicy> {
        let mut policy = ProxyPolicy::new();
        for host in LOOPBACK_HOSTS {
            policy.pin(ProxyPattern::host(host));
        }
        for endpoint in &self.endpoints {
            policy.pin(ProxyPattern::endpoint(endpoint));
        }

        let schemes = [
            (SchemeMatch::Http, "http_proxy", &self.env.http),
            (SchemeMatch::Https, "https_proxy", &self.env.https),
            (SchemeMatch::All, "all_proxy", &self.env.all),
        ];
        for (scheme, var, value) in schemes {
            if let Some(value) = value {
                let url = parse_proxy_url(value).with_context(|| format!("in {var}"))?;
                policy.insert(ProxyPattern::scheme(scheme), Route::Via(url));
            }
        }

        let entries = self.env.no_proxy.as_deref().unwrap_or_default().split(',');
        for entry in entries.map(str::trim).filter(|e| !e.is_empty()) {
            match entry.parse::<ProxyPattern>() {
                Ok(pattern) => policy.bypass(pattern),
                Err(e) => tracing::warn!("ignoring no_proxy entry '{entry}': {e:#}"),
            }
        }

        if let Some(explicit) = &self.explicit {
            policy.merge(explicit)?;
        }
        tracing::debug!(
            "built proxy policy with {} rules ({} pinned direct)",
            policy.len(),
            policy.pinned.len()
        );
        Ok(policy)
    }
}

/// Process-wide network defaults: the proxy policy and request timeout
/// every constructed client starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDefaults {
    /// Proxy policy.
    pub policy: ProxyPolicy,
    /// Request timeout.
    pub timeout: Duration,
}

static INSTALLED: OnceLock<NetworkDefaults> = OnceLock::new();

impl NetworkDefaults {
    /// Pair a policy with a timeout.
    pub fn new(policy: ProxyPolicy, timeout: Duration) -> Self {
        Self { policy, timeout }
    }

    /// Pair a policy with a timeout in seconds.
    pub fn from_secs(policy: ProxyPolicy, secs: f64) -> Result<Self> {
        let timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid timeout {secs}"))?;
        Ok(Self::new(policy, timeout))
    }

    /// A copy with `explicit` merged into the policy.
    pub fn with_override(&self, explicit: &ProxyOverride) -> Result<Self> {
        let mut policy = self.policy.clone();
        policy.merge(explicit)?;
        Ok(Self::new(policy, self.timeout))
    }

    /// An HTTP client following these defaults.
    pub fn client(&self) -> Result<reqwest::Client> {
        crate::http::client(&self.policy, self.timeout)
    }
}

/// Install the process-wide defaults and export them to the environment.
///
/// Fails when defaults are already installed. Must run before other threads
/// read the environment, typically once at startup.
pub fn install(defaults: NetworkDefaults) -> Result<&'static NetworkDefaults> {
    if INSTALLED.set(defaults).is_err() {
        bail!("network defaults are already installed");
    }
    let Some(installed) = INSTALLED.get() else {
        bail!("network defaults were not installed");
    };
    export_env(&installed.policy);
    tracing::debug!(
        "installed network defaults (timeout {:?}, no_proxy {})",
        installed.timeout,
        installed.policy.no_proxy()
    );
    Ok(installed)
}

/// The installed defaults, if [`install`] has run.
pub fn installed() -> Option<&'static NetworkDefaults> {
    INSTALLED.get()
}

/// Make the scheme proxy variables and `NO_PROXY` agree with `policy`.
/// Variables of schemes the policy does not proxy are removed.
fn export_env(policy: &ProxyPolicy) {
    let no_proxy = policy.no_proxy();
    let mut vars = vec![
        ("NO_PROXY".to_owned(), Some(no_proxy.clone())),
        ("no_proxy".to_owned(), Some(no_proxy)),
    ];
    for (scheme, name) in [
        (SchemeMatch::Http, "http_proxy"),
        (SchemeMatch::Https, "https_proxy"),
        (SchemeMatch::All, "all_proxy"),
    ] {
        let value = policy.scheme_proxy(scheme).map(Url::to_string);
        vars.push((name.to_owned(), value.clone()));
        vars.push((name.to_ascii_uppercase(), value));
    }

    for (name, value) in vars {
        // SAFETY: install runs once at startup, before other threads read
        // the environment.
        match value {
            Some(value) => unsafe { std::env::set_var(name, value) },
            None => unsafe { std::env::remove_var(name) },
        }
    }
}
