use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::http::host::HostGate;
use crate::http::{HttpClient, until_cancelled};
use crate::util::url::origin_of;

pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers "may this agent fetch this URL?". Any failure to find out means yes.
#[async_trait]
pub trait RobotsGate: Send + Sync {
    async fn is_allowed(&self, url: &str, agent: &str, cancel: &CancellationToken) -> bool;
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
}

/// Parsed robots.txt: user-agent groups with Allow/Disallow path prefixes.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: Vec<Group>,
}

impl RobotsTxt {
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        let mut in_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else { continue };
            let value = value.trim();
            match directive.trim().to_ascii_lowercase().as_str() {
                "user-agent" => {
                    // a user-agent after rules starts a new group
                    if in_rules {
                        groups.push(std::mem::take(&mut current));
                        in_rules = false;
                    }
                    current.agents.push(value.to_ascii_lowercase());
                }
                "allow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        current.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    in_rules = true;
                    // empty Disallow means allow everything
                    if !value.is_empty() {
                        current.disallow.push(value.to_string());
                    }
                }
                _ => {}
            }
        }
        if !current.agents.is_empty() {
            groups.push(current);
        }
        Self { groups }
    }

    fn group_for(&self, agent: &str) -> Option<&Group> {
        let agent = agent.to_ascii_lowercase();
        self.groups
            .iter()
            .find(|g| g.agents.iter().any(|a| a != "*" && agent.contains(a.as_str())))
            .or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
    }

    /// Longest matching prefix wins; Allow wins a tie.
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        let Some(group) = self.group_for(agent) else { return true };
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max();
        match (longest(&group.allow), longest(&group.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(d)) => a >= d,
        }
    }
}

/// Fetches `/robots.txt` once per origin and caches the parsed rules for the run.
pub struct HttpRobotsGate {
    http: HttpClient,
    hosts: Arc<HostGate>,
    timeout: Duration,
    cache: Mutex<HashMap<String, Arc<OnceCell<Option<Arc<RobotsTxt>>>>>>,
}

impl HttpRobotsGate {
    pub fn new(http: HttpClient, hosts: Arc<HostGate>) -> Self {
        Self { http, hosts, timeout: ROBOTS_TIMEOUT, cache: Mutex::new(HashMap::new()) }
    }

    async fn load(&self, origin: &str, cancel: &CancellationToken) -> Option<Arc<RobotsTxt>> {
        let robots_url = format!("{origin}/robots.txt");
        let _permit = self.hosts.acquire(&robots_url).await;
        let req = self.http.client().get(&robots_url).timeout(self.timeout);
        let resp = match until_cancelled(cancel, self.http.send(req, true)).await? {
            Ok(resp) => resp,
            Err(e) => {
                debug!(origin, error = %e, "robots.txt unreachable, allowing");
                return None;
            }
        };
        if resp.status() != StatusCode::OK {
            debug!(origin, status = %resp.status(), "no robots.txt, allowing");
            return None;
        }
        match until_cancelled(cancel, resp.text()).await? {
            Ok(body) => Some(Arc::new(RobotsTxt::parse(&body))),
            Err(e) => {
                warn!(origin, error = %e, "robots.txt body unreadable, allowing");
                None
            }
        }
    }
}

#[async_trait]
impl RobotsGate for HttpRobotsGate {
    async fn is_allowed(&self, url: &str, agent: &str, cancel: &CancellationToken) -> bool {
        let Ok(parsed) = url::Url::parse(url) else { return true };
        let Some(origin) = origin_of(url) else { return true };

        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            cache.entry(origin.clone()).or_default().clone()
        };
        // concurrent callers for one origin wait on the same fetch
        let Some(rules) = cell.get_or_init(|| self.load(&origin, cancel)).await.clone() else {
            return true;
        };

        let mut path = parsed.path().to_string();
        if let Some(q) = parsed.query() {
            path.push('?');
            path.push_str(q);
        }
        let allowed = rules.is_allowed(agent, &path);
        if !allowed {
            debug!(url, agent, "disallowed by robots.txt");
        }
        allowed
    }
}

#[cfg(test)]
pub struct AllowAll;

#[cfg(test)]
#[async_trait]
impl RobotsGate for AllowAll {
    async fn is_allowed(&self, _url: &str, _agent: &str, _cancel: &CancellationToken) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use crate::testutil::{StubResponse, StubServer};

    const AGENT: &str = "AI-News-Agent";

    #[test]
    fn wildcard_group_applies_to_everyone() {
        let r = RobotsTxt::parse("User-agent: *\nDisallow: /private\n");
        assert!(!r.is_allowed(AGENT, "/private/page"));
        assert!(r.is_allowed(AGENT, "/public"));
    }

    #[test]
    fn specific_group_beats_wildcard() {
        let r = RobotsTxt::parse(
            "User-agent: *\nDisallow: /\n\nUser-agent: ai-news-agent\nDisallow: /drafts\n",
        );
        assert!(r.is_allowed("AI-News-Agent/0.1.0", "/posts/1"));
        assert!(!r.is_allowed("AI-News-Agent/0.1.0", "/drafts/x"));
        assert!(!r.is_allowed("OtherBot", "/posts/1"));
    }

    #[test]
    fn longer_allow_overrides_disallow() {
        let r = RobotsTxt::parse("User-agent: *\nDisallow: /news\nAllow: /news/public\n");
        assert!(r.is_allowed(AGENT, "/news/public/story"));
        assert!(!r.is_allowed(AGENT, "/news/private"));
    }

    #[test]
    fn grouped_agents_share_rules_and_empty_disallow_allows() {
        let r = RobotsTxt::parse(
            "User-agent: a-bot\nUser-agent: b-bot\nDisallow: /x # no\n\nUser-agent: *\nDisallow:\n",
        );
        assert!(!r.is_allowed("a-bot", "/x"));
        assert!(!r.is_allowed("b-bot", "/x/y"));
        assert!(r.is_allowed("c-bot", "/x"));
    }

    #[test]
    fn empty_file_allows() {
        assert!(RobotsTxt::parse("").is_allowed(AGENT, "/anything"));
    }

    fn gate() -> HttpRobotsGate {
        let http = HttpClient::new(RetryPolicy { max_attempts: 1, backoff_factor: Duration::from_millis(1) }).unwrap();
        HttpRobotsGate::new(http, Arc::new(HostGate::new(1000)))
    }

    #[tokio::test]
    async fn disallow_rule_denies_and_is_fetched_once() {
        let server = StubServer::start(vec![(
            "/robots.txt",
            vec![StubResponse::ok("User-agent: *\nDisallow: /blocked\n")],
        )])
        .await;
        let gate = gate();
        let cancel = CancellationToken::new();
        assert!(!gate.is_allowed(&server.url("/blocked/post"), AGENT, &cancel).await);
        assert!(gate.is_allowed(&server.url("/open/post"), AGENT, &cancel).await);
        assert_eq!(server.hits("/robots.txt"), 1);
    }

    #[tokio::test]
    async fn missing_robots_allows() {
        let server = StubServer::start(vec![]).await;
        assert!(gate().is_allowed(&server.url("/post"), AGENT, &CancellationToken::new()).await);
    }

    #[tokio::test]
    async fn unreachable_host_allows() {
        assert!(gate().is_allowed("http://127.0.0.1:9/post", AGENT, &CancellationToken::new()).await);
    }
}
