//! Server-wide state: the client/nick/channel indices, the accept loop and
//! the ping/registration-timeout sweeper (§5). Indices are `DashMap`s so
//! lookups never block behind a single global lock; cross-client broadcasts
//! still follow the snapshot-then-write discipline used inside a channel.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use log::{info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};

use crate::clock::Clock;
use crate::config::Config;
use crate::constants::{PING_TIMEOUT_SECS, REGISTRATION_TIMEOUT_SECS, SWEEP_INTERVAL_SECS};
use crate::channel::Channel;
use crate::errors::IrcError;
use crate::handlers::request;
use crate::logging::log_event;
use crate::resolver::HostnameResolver;
use crate::session::Session;

pub struct Registry {
    pub clients: DashMap<String, Arc<Session>>,
    /// lowercased nick -> client key
    pub nicks: DashMap<String, String>,
    /// lowercased nick -> original-case nick, for display purposes
    pub nicks_cased: DashMap<String, String>,
    pub channels: DashMap<String, Arc<Channel>>,
    pub channels_cased: DashMap<String, String>,

    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub resolver: Arc<dyn HostnameResolver>,

    pub started_at: u64,
    active: AtomicBool,
}

impl Registry {
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>, resolver: Arc<dyn HostnameResolver>) -> Arc<Self> {
        let started_at = clock.now_secs();
        Arc::new(Registry {
            clients: DashMap::new(),
            nicks: DashMap::new(),
            nicks_cased: DashMap::new(),
            channels: DashMap::new(),
            channels_cased: DashMap::new(),
            config,
            clock,
            resolver,
            started_at,
            active: AtomicBool::new(true),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // -- nick registry ------------------------------------------------

    pub fn nick_available(&self, nick: &str) -> bool {
        !self.nicks.contains_key(&nick.to_lowercase())
    }

    pub fn nick_registered(&self, nick: &str) -> bool {
        self.nicks.contains_key(&nick.to_lowercase())
    }

    pub fn register_nick(&self, nick: &str, key: &str) {
        let lower = nick.to_lowercase();
        self.nicks.insert(lower.clone(), key.to_string());
        self.nicks_cased.insert(lower, nick.to_string());
    }

    pub fn deregister_nick(&self, nick: &str) {
        let lower = nick.to_lowercase();
        self.nicks.remove(&lower);
        self.nicks_cased.remove(&lower);
    }

    pub fn resolve_nick_key(&self, nick: &str) -> Option<String> {
        self.nicks.get(&nick.to_lowercase()).map(|v| v.clone())
    }

    pub fn find_session_by_nick(&self, nick: &str) -> Option<Arc<Session>> {
        let key = self.resolve_nick_key(nick)?;
        self.clients.get(&key).map(|v| v.clone())
    }

    // -- channel registry ----------------------------------------------

    pub fn get_or_create_channel(&self, name: &str) -> Arc<Channel> {
        let lower = name.to_lowercase();
        if let Some(channel) = self.channels.get(&lower) {
            return channel.clone();
        }
        let channel = Channel::new(name.to_string(), self.clock.now_secs());
        self.channels.insert(lower.clone(), channel.clone());
        self.channels_cased.insert(lower, name.to_string());
        channel
    }

    pub fn find_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(&name.to_lowercase()).map(|v| v.clone())
    }

    pub async fn drop_channel_if_destroyed(&self, name: &str) {
        let lower = name.to_lowercase();
        let destroyed = match self.channels.get(&lower) {
            Some(channel) => channel.is_destroyed().await,
            None => return,
        };
        if destroyed {
            self.channels.remove(&lower);
            self.channels_cased.remove(&lower);
        }
    }

    // -- cross-channel broadcast (NICK/QUIT) ----------------------------

    /// Every other member across all channels the subject belongs to, with
    /// no duplicates — mirrors the original implementation's `completed`
    /// list in `broadcast_nick`/`broadcast_quit`.
    pub async fn co_members_of(&self, session: &Arc<Session>) -> Vec<Arc<Session>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for entry in session.channels.iter() {
            let channel_name = entry.key().clone();
            let Some(channel) = self.channels.get(&channel_name).map(|c| c.clone()) else {
                continue;
            };
            // channel.rs has no direct member-enumeration API beyond
            // membership checks, so route through a dedicated helper.
            for member in channel.snapshot_members().await {
                if Arc::ptr_eq(&member, session) {
                    continue;
                }
                if seen.insert(member.key.clone()) {
                    out.push(member);
                }
            }
        }
        out
    }

    pub async fn broadcast_nick_change(&self, session: &Arc<Session>, old_identifier: &str, new_nick: &str) {
        let line = format!(":{old_identifier} NICK :{new_nick}");
        for member in self.co_members_of(session).await {
            member.send_line(line.clone());
        }
        session.send_line(line);
    }

    pub async fn broadcast_quit(&self, session: &Arc<Session>, reason: &str) {
        let identifier = session.identifier().await;
        let line = format!(":{identifier} QUIT :{reason}");
        for member in self.co_members_of(session).await {
            member.send_line(line.clone());
        }
    }

    /// Removes `session` from every channel it belongs to (without the PART
    /// broadcast - QUIT already told everyone), dropping channels left
    /// empty behind it.
    pub async fn leave_all_channels(&self, session: &Arc<Session>) {
        let names: Vec<String> = session.channels.iter().map(|e| e.key().clone()).collect();
        for name in names {
            if let Some(channel) = self.channels.get(&name).map(|c| c.clone()) {
                channel.remove_silently(session).await;
                self.drop_channel_if_destroyed(&name).await;
            }
        }
    }

    // -- client lifecycle ------------------------------------------------

    pub fn register_client(&self, session: Arc<Session>) {
        self.clients.insert(session.key.clone(), session);
    }

    pub async fn deregister_client(&self, session: &Arc<Session>) {
        session.mark_terminated();
        self.leave_all_channels(session).await;
        if let Some(nick) = session.nick.read().await.clone() {
            self.deregister_nick(&nick);
        }
        self.clients.remove(&session.key);
    }

    pub fn terminate_all(&self) {
        self.active.store(false, Ordering::Release);
        for entry in self.clients.iter() {
            entry
                .value()
                .send_line("ERROR :Closing Link: (Server shutting down)".to_string());
            entry.value().mark_terminated();
        }
    }

    // -- accept loop -------------------------------------------------

    pub async fn run_accept_loop(self: Arc<Self>) -> Result<(), IrcError> {
        let bind_addr = format!("{}:{}", self.config.bind.address, self.config.bind.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("listening on {bind_addr}");

        while self.is_active() {
            let (socket, addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept() failed: {e}");
                    continue;
                }
            };

            if self.client_count() >= self.config.server.client_limit {
                let mut socket = socket;
                let _ = socket
                    .write_all(b"ERROR :Closing Link: (Max connections reached)\r\n")
                    .await;
                continue;
            }

            let registry = self.clone();
            tokio::spawn(async move {
                registry.handle_connection(socket, addr).await;
            });
        }
        Ok(())
    }

    /// Drives a single accepted connection to completion: splits the socket,
    /// spawns the hostname-resolve and writer tasks, then blocks on the read
    /// loop until the client or server ends the session. `run_accept_loop`
    /// spawns one of these per accepted socket; exposed directly so tests can
    /// drive connections against a listener they bound themselves (to learn
    /// the ephemeral port before any client connects).
    pub async fn handle_connection(self: Arc<Self>, socket: tokio::net::TcpStream, addr: SocketAddr) {
        let (read_half, mut write_half) = socket.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let now = self.clock.now_secs();
        let session = Session::new(addr, tx, now);
        self.register_client(session.clone());
        log_event("CONNECT", self.config.server.debug, &session.address_identifier());

        let resolver = self.resolver.clone();
        let session_for_resolve = session.clone();
        let debug_level = self.config.server.debug;
        tokio::spawn(async move {
            match resolver.resolve(addr.ip()).await {
                Some(hostname) => {
                    log_event(
                        "LOOKUP",
                        debug_level,
                        &format!("{} resolves to {hostname}", addr.ip()),
                    );
                    *session_for_resolve.hostname.write().await = hostname;
                }
                None => {
                    log_event(
                        "LOOKUP",
                        debug_level,
                        &format!("{} failed to resolve, continuing with IP address", addr.ip()),
                    );
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if write_half.write_all(b"\r\n").await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        request::read_loop(self.clone(), session.clone(), read_half).await;

        self.deregister_client(&session).await;
        writer_task.abort();
        log_event("DISCONNECT", self.config.server.debug, &session.address_identifier());
    }

    // -- sweeper -------------------------------------------------------

    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        while self.is_active() {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// One pass of the ping/registration-timeout logic, ported from the
    /// original implementation's `inactive_client_check`: a PING is sent on
    /// the first tick after connect; once one has been sent, every
    /// `PING_TIMEOUT_SECS` either times the session out (if the prior PING
    /// is still unanswered) or sends another one (keeping the round-trip
    /// going for as long as the client stays connected); independently, a
    /// client still unauthorised ≥`REGISTRATION_TIMEOUT_SECS` after connect
    /// is dropped with the same wire text.
    async fn sweep_once(&self) {
        let now = self.clock.now_secs();
        let keys: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();

        for key in keys {
            let Some(session) = self.clients.get(&key).map(|v| v.clone()) else {
                continue;
            };
            if !session.is_alive() {
                continue;
            }

            let mut pong = session.pong.write().await;
            let due = match pong.sent_at {
                None => true,
                Some(sent_at) => now.saturating_sub(sent_at) >= PING_TIMEOUT_SECS,
            };

            if due {
                if pong.pending {
                    let elapsed = pong.sent_at.map(|s| now.saturating_sub(s)).unwrap_or(0);
                    drop(pong);
                    let line = session
                        .closing_link_error(&format!("Ping timeout: {elapsed} seconds"))
                        .await;
                    session.send_line(line);
                    session.mark_terminated();
                    continue;
                }
                pong.pending = true;
                pong.sent_at = Some(now);
                let fqdn = &self.config.server.fqdn;
                let token = format!("PING :{fqdn}");
                drop(pong);
                session.send_line(token);
                continue;
            }
            drop(pong);

            if !session.is_authorised() {
                let age = now.saturating_sub(session.connected_at);
                if age >= REGISTRATION_TIMEOUT_SECS {
                    let line = session
                        .closing_link_error(&format!("Ping timeout: {age} seconds"))
                        .await;
                    session.send_line(line);
                    session.mark_terminated();
                }
            }
        }
    }
}
