//! End-to-end loopback-TCP scenarios (spec.md §8): a real `Registry` bound to
//! an ephemeral port, driven over actual sockets rather than through the
//! handler functions directly, so these exercise the accept loop, the
//! per-connection reader/writer split and the line framing together with
//! command dispatch.

use std::sync::Arc;
use std::time::Duration;

use irc_server::clock::SystemClock;
use irc_server::config::{BindConfig, Config, ServerConfig, TimestampedText};
use irc_server::registry::Registry;
use irc_server::resolver::NoopResolver;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        bind: BindConfig {
            address: "127.0.0.1".to_string(),
            port: 0,
        },
        server: ServerConfig {
            debug: 0,
            fqdn: "irc.test".to_string(),
            name: "TestNet".to_string(),
            client_limit: 10,
            recv_buffer: 512,
            motd: "motd.txt".to_string(),
            rules: "rules.txt".to_string(),
        },
        motd: TimestampedText {
            content: "welcome to testnet".to_string(),
            modified: 0,
        },
        rules: TimestampedText {
            content: "be nice".to_string(),
            modified: 0,
        },
    })
}

/// Spawns a registry's accept loop and sweeper on an ephemeral port, bound by
/// actually creating the listener here (so the caller learns the real port)
/// rather than through `run_accept_loop`'s own bind.
async fn spawn_server() -> (Arc<Registry>, std::net::SocketAddr) {
    let config = test_config();
    let clock = Arc::new(SystemClock);
    let resolver = Arc::new(NoopResolver);
    let registry = Registry::new(config, clock, resolver);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accept_registry = registry.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, peer)) = listener.accept().await else {
                break;
            };
            let registry = accept_registry.clone();
            tokio::spawn(async move {
                registry.handle_connection(socket, peer).await;
            });
        }
    });

    let sweep_registry = registry.clone();
    tokio::spawn(async move { sweep_registry.run_sweeper().await });

    (registry, addr)
}

struct Client {
    write: tokio::net::tcp::OwnedWriteHalf,
    read: BufReader<OwnedReadHalf>,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        Client {
            write,
            read: BufReader::new(read),
        }
    }

    async fn send(&mut self, line: &str) {
        self.write.write_all(line.as_bytes()).await.unwrap();
        self.write.write_all(b"\r\n").await.unwrap();
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), self.read.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    async fn read_until_numeric(&mut self, code: &str) -> String {
        loop {
            let line = self.read_line().await;
            if line.split_whitespace().nth(1) == Some(code) {
                return line;
            }
        }
    }

    async fn register(&mut self, nick: &str) {
        self.send(&format!("NICK {nick}")).await;
        self.send(&format!("USER {nick} 0 * :{nick} Realname")).await;
        let ping = self.read_until_command("PING").await;
        let token = ping.trim_start_matches("PING :").to_string();
        self.send(&format!("PONG :{token}")).await;
        self.read_until_numeric("001").await;
    }

    async fn read_until_command(&mut self, command: &str) -> String {
        loop {
            let line = self.read_line().await;
            if line.contains(command) {
                return line;
            }
        }
    }
}

#[tokio::test]
async fn registration_handshake_completes_with_welcome_burst() {
    let (_registry, addr) = spawn_server().await;
    let mut client = Client::connect(addr).await;
    client.register("alice").await;
}

#[tokio::test]
async fn nick_collision_is_rejected() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;

    let mut bob = Client::connect(addr).await;
    bob.send("NICK alice").await;
    // This implementation reuses 432 for both erroneous and in-use nicks,
    // matching the original server it's ported from.
    let reply = bob.read_until_numeric("432").await;
    assert!(reply.contains("already in use"));
}

#[tokio::test]
async fn join_and_privmsg_are_relayed_to_channel_members() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;
    let mut bob = Client::connect(addr).await;
    bob.register("bob").await;

    alice.send("JOIN #general").await;
    alice.read_until_command("JOIN").await;

    bob.send("JOIN #general").await;
    // bob sees his own JOIN and the NAMES burst.
    bob.read_until_command("JOIN").await;
    bob.read_until_numeric("366").await;
    // alice sees bob's JOIN too.
    alice.read_until_command("JOIN #general").await;

    alice.send("PRIVMSG #general :hello there").await;
    let heard = bob.read_until_command("PRIVMSG").await;
    assert!(heard.contains("hello there"));
}

#[tokio::test]
async fn privmsg_to_nick_is_delivered_directly() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;
    let mut bob = Client::connect(addr).await;
    bob.register("bob").await;

    alice.send("PRIVMSG bob :hi bob").await;
    let heard = bob.read_until_command("PRIVMSG").await;
    assert!(heard.contains("hi bob"));
}

#[tokio::test]
async fn first_joiner_can_grant_and_revoke_operator() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;
    let mut bob = Client::connect(addr).await;
    bob.register("bob").await;

    alice.send("JOIN #ops").await;
    alice.read_until_command("JOIN").await;
    bob.send("JOIN #ops").await;
    bob.read_until_command("JOIN").await;
    bob.read_until_numeric("366").await;
    alice.read_until_command("JOIN #ops").await;

    alice.send("MODE #ops +o bob").await;
    let mode_line = bob.read_until_command("MODE").await;
    assert!(mode_line.contains("+o bob"));
}

#[tokio::test]
async fn quit_notifies_channel_co_members() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;
    let mut bob = Client::connect(addr).await;
    bob.register("bob").await;

    alice.send("JOIN #gone").await;
    alice.read_until_command("JOIN").await;
    bob.send("JOIN #gone").await;
    bob.read_until_command("JOIN").await;
    bob.read_until_numeric("366").await;
    alice.read_until_command("JOIN #gone").await;

    bob.send("QUIT :bye").await;
    let quit_line = alice.read_until_command("QUIT").await;
    assert!(quit_line.contains("bye"));
}

#[tokio::test]
async fn rejoining_a_channel_is_a_silent_noop() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;

    alice.send("JOIN #again").await;
    alice.read_until_command("JOIN").await;

    // A second JOIN of the same channel must not reset alice's operator
    // power or resend a JOIN/NAMES burst that could be mistaken for a
    // second member arriving.
    alice.send("JOIN #again").await;
    alice.send("WHOIS alice").await;
    let channels_line = alice.read_until_numeric("319").await;
    assert!(channels_line.contains("@#again"));
}

#[tokio::test]
async fn whois_reports_channels_and_host() {
    let (_registry, addr) = spawn_server().await;
    let mut alice = Client::connect(addr).await;
    alice.register("alice").await;

    alice.send("JOIN #chat").await;
    alice.read_until_command("JOIN").await;

    alice.send("WHOIS alice").await;
    let whois_user = alice.read_until_numeric("311").await;
    assert!(whois_user.contains("alice"));
    alice.read_until_numeric("318").await;
}
