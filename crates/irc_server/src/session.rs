//! Client session (§3, §4.B): per-connection state, identifier/hostname
//! derivation, and the small set of atomics/locks the rest of the crate
//! mutates through. The read loop, line framing and command dispatch live in
//! `handlers::request`; this module only owns the state itself.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{Notify, RwLock, mpsc};

pub type ClientKey = String;

/// The registry's `clients` map key: the literal `"<ip>:<port>"` string, per
/// the original implementation's `Client.index`.
pub fn client_key(addr: &SocketAddr) -> ClientKey {
    format!("{}:{}", addr.ip(), addr.port())
}

/// Coarse view of the per-connection state machine (§4.B). Derived from the
/// session's fields rather than tracked independently, so there is exactly
/// one source of truth; used for WHOIS/debugging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    NickKnown,
    UserKnown,
    PongAwaited,
    Authorised,
    Terminated,
}

#[derive(Debug)]
pub struct PongState {
    /// How many PONGs this session has sent us, ever. Registration can't
    /// complete until at least one PING/PONG round-trip has happened.
    pub received_count: u64,
    /// Whether a PING is currently outstanding, awaiting that PONG.
    pub pending: bool,
    /// When the most recently sent PING went out, if any has ever been sent.
    /// `None` means no keepalive PING has been sent yet (the sweeper's
    /// first-tick trigger); once set, the sweeper re-pings every
    /// `PING_TIMEOUT_SECS` if the prior one was answered, or times the
    /// session out if it wasn't.
    pub sent_at: Option<u64>,
}

pub struct Session {
    pub addr: SocketAddr,
    pub key: ClientKey,
    pub outbound: mpsc::UnboundedSender<String>,

    pub nick: RwLock<Option<String>>,
    pub user: RwLock<Option<String>>,
    pub realname: RwLock<Option<String>>,
    pub modes: RwLock<HashSet<char>>,

    /// Lowercased channel name -> this client's power set in that channel.
    /// Channel *objects* are never stored here (§9 design notes: breaking
    /// the session/channel ownership cycle).
    pub channels: DashMap<String, HashSet<char>>,

    pub hostname: RwLock<String>,
    pub masked_hostname: String,

    pub authorised: AtomicBool,
    pub pong: RwLock<PongState>,

    pub connected_at: u64,
    pub last_cmd: AtomicU64,
    pub alive: AtomicBool,
    /// Woken by `mark_terminated` so the read loop, blocked in a socket
    /// read, notices a server-initiated close (ping timeout, shutdown,
    /// `ERROR` close) without waiting for the client to send or disconnect.
    pub close_notify: Notify,
}

impl Session {
    pub fn new(
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<String>,
        now: u64,
    ) -> Arc<Self> {
        let ip_string = addr.ip().to_string();
        let masked_hostname = mask_hostname(&ip_string);

        Arc::new(Session {
            key: client_key(&addr),
            addr,
            outbound,
            nick: RwLock::new(None),
            user: RwLock::new(None),
            realname: RwLock::new(None),
            modes: RwLock::new(HashSet::new()),
            channels: DashMap::new(),
            hostname: RwLock::new(ip_string),
            masked_hostname,
            authorised: AtomicBool::new(false),
            pong: RwLock::new(PongState {
                received_count: 0,
                pending: false,
                sent_at: None,
            }),
            connected_at: now,
            last_cmd: AtomicU64::new(now),
            alive: AtomicBool::new(true),
            close_notify: Notify::new(),
        })
    }

    pub fn is_authorised(&self) -> bool {
        self.authorised.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn mark_terminated(&self) {
        self.alive.store(false, Ordering::Release);
        self.close_notify.notify_waiters();
    }

    pub fn touch_last_cmd(&self, now: u64) {
        self.last_cmd.store(now, Ordering::Release);
    }

    /// Queues a line for the writer task. The outbound queue is unbounded so
    /// a stalled recipient never blocks the sender (which may be another
    /// client's handler task) — §5's "a blocked/slow client must not starve
    /// others" applies to writers as much as readers.
    pub fn send_line(&self, line: String) {
        let _ = self.outbound.send(line);
    }

    /// `<ip>:<port>` address-key form, used before authorisation.
    pub fn address_identifier(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }

    pub async fn nick_or_star(&self) -> String {
        self.nick.read().await.clone().unwrap_or_else(|| "*".to_string())
    }

    /// The hostname shown to others: masked if user mode `x` is set,
    /// otherwise the resolved (or IP-fallback) hostname.
    pub async fn display_hostname(&self) -> String {
        if self.modes.read().await.contains(&'x') {
            self.masked_hostname.clone()
        } else {
            self.hostname.read().await.clone()
        }
    }

    /// `ERROR :Closing Link: {nick}[{host}] ({reason})`, the wire format used
    /// by every session-fatal teardown (ping timeout, registration timeout,
    /// hostile username, QUIT).
    pub async fn closing_link_error(&self, reason: &str) -> String {
        let nick = self.nick_or_star().await;
        let host = self.display_hostname().await;
        format!("ERROR :Closing Link: {nick}[{host}] ({reason})")
    }

    /// `nick!user@host` once authorised, `ip:port` beforehand (§4.B).
    pub async fn identifier(&self) -> String {
        if self.is_authorised() {
            let nick = self.nick.read().await.clone().unwrap_or_default();
            let user = self.user.read().await.clone().unwrap_or_default();
            let host = self.display_hostname().await;
            format!("{nick}!{user}@{host}")
        } else {
            self.address_identifier()
        }
    }

    /// Registration readiness: nick ∧ user ∧ realname ∧ PING sent and its
    /// matching PONG received.
    pub async fn ready_to_authorise(&self) -> bool {
        if self.is_authorised() {
            return false;
        }
        let has_nick = self.nick.read().await.is_some();
        let has_user = self.user.read().await.is_some();
        let has_realname = self.realname.read().await.is_some();
        let pong = self.pong.read().await;
        has_nick && has_user && has_realname && pong.received_count > 0 && !pong.pending
    }

    pub async fn state(&self) -> SessionState {
        if !self.is_alive() {
            return SessionState::Terminated;
        }
        if self.is_authorised() {
            return SessionState::Authorised;
        }
        if self.pong.read().await.pending {
            return SessionState::PongAwaited;
        }
        if self.user.read().await.is_some() {
            return SessionState::UserKnown;
        }
        if self.nick.read().await.is_some() {
            return SessionState::NickKnown;
        }
        SessionState::Connected
    }
}

/// IPv4 `a.b.c.d` masks to `a.b.x.x`; any other address form is left as-is
/// (the resolved hostname is used unchanged, per spec.md §4.B).
pub fn mask_hostname(ip_or_hostname: &str) -> String {
    let octets: Vec<&str> = ip_or_hostname.split('.').collect();
    if octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok()) {
        format!("{}.{}.x.x", octets[0], octets[1])
    } else {
        ip_or_hostname.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_ipv4() {
        assert_eq!(mask_hostname("203.0.113.42"), "203.0.x.x");
    }

    #[test]
    fn leaves_non_ipv4_alone() {
        assert_eq!(mask_hostname("host.example.com"), "host.example.com");
        assert_eq!(mask_hostname("::1"), "::1");
    }

    #[tokio::test]
    async fn identifier_before_and_after_authorisation() {
        let addr: SocketAddr = "203.0.113.42:5555".parse().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(addr, tx, 0);
        assert_eq!(session.identifier().await, "203.0.113.42:5555");

        *session.nick.write().await = Some("alice".to_string());
        *session.user.write().await = Some("alice".to_string());
        session.authorised.store(true, Ordering::Release);
        assert_eq!(session.identifier().await, "alice!alice@203.0.113.42");
    }

    #[tokio::test]
    async fn masked_hostname_used_once_x_mode_set() {
        let addr: SocketAddr = "203.0.113.42:5555".parse().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(addr, tx, 0);
        session.modes.write().await.insert('x');
        assert_eq!(session.display_hostname().await, "203.0.x.x");
    }
}
