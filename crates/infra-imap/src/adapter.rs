use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use digest_domain::{Credentials, MailTransport, RawMessage};
use digest_error::DigestError;
use tracing::{debug, info, warn};

pub const IMAP_TLS_PORT: u16 = 993;

const INBOX: &str = "INBOX";

/// Providers whose IMAP host is not simply `imap.<domain>`.
const KNOWN_HOSTS: &[(&str, &str)] = &[
    ("gmail.com", "imap.gmail.com"),
    ("outlook.com", "imap-mail.outlook.com"),
    ("hotmail.com", "imap-mail.outlook.com"),
    ("yahoo.com", "imap.mail.yahoo.com"),
    ("icloud.com", "imap.mail.me.com"),
];

pub fn resolve_host(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    KNOWN_HOSTS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, host)| host.to_string())
        .unwrap_or_else(|| format!("imap.{domain}"))
}

#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// Skips domain-based resolution when set.
    pub host: Option<String>,
    pub port: u16,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: IMAP_TLS_PORT,
        }
    }
}

impl ImapConfig {
    fn host_for(&self, credentials: &Credentials) -> String {
        match &self.host {
            Some(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => resolve_host(&credentials.domain()),
        }
    }
}

pub struct ImapTransport {
    config: Arc<ImapConfig>,
}

impl ImapTransport {
    pub fn new(config: ImapConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for ImapTransport {
    fn default() -> Self {
        Self::new(ImapConfig::default())
    }
}

type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Logs out when dropped, whichever way the fetch exits.
struct SessionGuard(ImapSession);

impl Deref for SessionGuard {
    type Target = ImapSession;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        match self.0.logout() {
            Ok(()) => debug!("IMAP logout"),
            Err(e) => debug!(%e, "IMAP logout failed"),
        }
    }
}

fn imap_connect(
    host: &str,
    port: u16,
    credentials: &Credentials,
) -> Result<ImapSession, DigestError> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| DigestError::transport(format!("TLS init: {e}")))?;

    let client = imap::connect((host, port), host, &tls)
        .map_err(|e| DigestError::transport(format!("IMAP connect {host}:{port}: {e}")))?;

    client
        .login(&credentials.address, &credentials.secret)
        .map_err(|(e, _)| match e {
            imap::error::Error::No(_) | imap::error::Error::Bad(_) => {
                DigestError::auth(format!("IMAP login: {e}"))
            }
            other => DigestError::transport(format!("IMAP login: {other}")),
        })
}

fn search_criterion(unread_only: bool) -> &'static str {
    if unread_only {
        "UNSEEN"
    } else {
        "ALL"
    }
}

/// Sequence numbers sorted numerically, newest first, capped at `max_count`.
fn newest_first(found: HashSet<u32>, max_count: usize) -> Vec<u32> {
    let mut ids: Vec<u32> = found.into_iter().collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.truncate(max_count);
    ids
}

fn id_set(ids: &[u32]) -> String {
    ids.iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn fetch_blocking(
    config: &ImapConfig,
    credentials: &Credentials,
    max_count: usize,
    unread_only: bool,
) -> Result<Vec<RawMessage>, DigestError> {
    let host = config.host_for(credentials);
    info!(%host, port = config.port, "connecting to IMAP");
    let mut session = SessionGuard(imap_connect(&host, config.port, credentials)?);

    session
        .select(INBOX)
        .map_err(|e| DigestError::transport(format!("IMAP SELECT {INBOX}: {e}")))?;

    let criterion = search_criterion(unread_only);
    let found = session
        .search(criterion)
        .map_err(|e| DigestError::transport(format!("IMAP SEARCH {criterion}: {e}")))?;
    let matched = found.len();

    let ids = newest_first(found, max_count);
    info!(criterion, matched, selected = ids.len(), "searched mailbox");
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let fetches = session
        .fetch(id_set(&ids), "RFC822")
        .map_err(|e| DigestError::transport(format!("IMAP FETCH: {e}")))?;

    let mut bodies: HashMap<u32, Vec<u8>> = fetches
        .iter()
        .filter_map(|f| f.body().map(|b| (f.message, b.to_vec())))
        .collect();

    let messages = ids
        .iter()
        .filter_map(|id| match bodies.remove(id) {
            Some(bytes) => Some(RawMessage::new(*id, bytes)),
            None => {
                warn!(id, "fetch returned no body, skipping");
                None
            }
        })
        .collect();

    Ok(messages)
}

#[async_trait]
impl MailTransport for ImapTransport {
    async fn fetch(
        &self,
        credentials: &Credentials,
        max_count: usize,
        unread_only: bool,
    ) -> Result<Vec<RawMessage>, DigestError> {
        let config = self.config.clone();
        let credentials = credentials.clone();
        tokio::task::spawn_blocking(move || {
            fetch_blocking(&config, &credentials, max_count, unread_only)
        })
        .await
        .map_err(worker_failure)?
    }
}

fn worker_failure(e: tokio::task::JoinError) -> DigestError {
    DigestError::transport(format!("IMAP worker: {e}"))
}
