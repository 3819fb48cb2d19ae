//! The per-connection read loop: line framing off the raw socket, then
//! command dispatch gated by registration state (§5's pre/post-auth
//! allow-lists).

use std::sync::Arc;

use log::debug;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;

use crate::handlers::{channels, messages, miscellanneous, registration};
use crate::logging::log_event;
use crate::protocol::tokenize;
use crate::registry::Registry;
use crate::replies::IrcReply;
use crate::session::Session;

const PRE_AUTH_COMMANDS: &[&str] = &["NICK", "USER", "PONG", "QUIT", "CAP"];
const POST_AUTH_COMMANDS: &[&str] = &[
    "PRIVMSG", "NOTICE", "NICK", "USER", "PONG", "QUIT", "WHOIS", "ISON", "USERHOST", "JOIN",
    "PART", "MODE", "LUSERS", "MOTD", "RULES",
];

pub async fn read_loop(registry: Arc<Registry>, session: Arc<Session>, mut reader: OwnedReadHalf) {
    let buf_size = registry.config.server.recv_buffer.max(1);
    let mut buf = vec![0u8; buf_size];
    let mut pending = String::new();

    loop {
        let n = tokio::select! {
            result = reader.read(&mut buf) => match result {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            },
            _ = session.close_notify.notified() => break,
        };
        pending.push_str(&String::from_utf8_lossy(&buf[..n]));

        while let Some(pos) = pending.find('\n') {
            let line = pending[..pos].trim_end_matches('\r').to_string();
            pending.drain(..=pos);
            if line.is_empty() {
                continue;
            }

            debug!("{} >> {line}", session.address_identifier());
            session.touch_last_cmd(registry.clock.now_secs());
            dispatch(&registry, &session, &line).await;

            if !session.is_alive() {
                return;
            }
        }

        if !session.is_alive() {
            return;
        }
    }
}

async fn dispatch(registry: &Arc<Registry>, session: &Arc<Session>, line: &str) {
    let tokens = tokenize(line);
    let Some(command) = tokens.first() else {
        return;
    };
    let command = command.to_uppercase();
    let args = &tokens[1..];
    let fqdn = &registry.config.server.fqdn;

    if !session.is_authorised() {
        if !PRE_AUTH_COMMANDS.contains(&command.as_str()) {
            session.send_line(
                IrcReply::NotRegistered {
                    command: command.clone(),
                }
                .format(fqdn),
            );
            return;
        }
        let host = session.display_hostname().await;
        log_event(
            "COMMAND",
            registry.config.server.debug,
            &format!("{host}: {command}"),
        );
        match command.as_str() {
            "NICK" => registration::handle_nick(registry, session, args).await,
            "USER" => registration::handle_user(registry, session, args).await,
            "PONG" => registration::handle_pong(registry, session, args).await,
            "QUIT" => registration::handle_quit(registry, session, args).await,
            "CAP" => registration::handle_cap(registry, session, args).await,
            _ => unreachable!(),
        }
        return;
    }

    if !POST_AUTH_COMMANDS.contains(&command.as_str()) {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::UnknownCommand {
                nick,
                command: command.clone(),
            }
            .format(fqdn),
        );
        return;
    }

    let identifier = session.identifier().await;
    log_event(
        "COMMAND",
        registry.config.server.debug,
        &format!("{identifier}: {command}"),
    );
    match command.as_str() {
        "PRIVMSG" => messages::handle_privmsg(registry, session, args).await,
        "NOTICE" => messages::handle_notice(registry, session, args).await,
        "NICK" => registration::handle_nick(registry, session, args).await,
        "USER" => registration::handle_user(registry, session, args).await,
        "PONG" => registration::handle_pong(registry, session, args).await,
        "QUIT" => registration::handle_quit(registry, session, args).await,
        "WHOIS" => miscellanneous::handle_whois(registry, session, args).await,
        "ISON" => miscellanneous::handle_ison(registry, session, args).await,
        "USERHOST" => miscellanneous::handle_userhost(registry, session, args).await,
        "JOIN" => channels::handle_join(registry, session, args).await,
        "PART" => channels::handle_part(registry, session, args).await,
        "MODE" => handle_mode(registry, session, args).await,
        "LUSERS" => miscellanneous::handle_lusers(registry, session).await,
        "MOTD" => miscellanneous::handle_motd(registry, session).await,
        "RULES" => miscellanneous::handle_rules(registry, session).await,
        _ => unreachable!(),
    }
}

async fn handle_mode(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let Some(target) = args.first() else {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "MODE".to_string(),
            }
            .format(&registry.config.server.fqdn),
        );
        return;
    };
    if target.starts_with('#') {
        channels::handle_channel_mode(registry, session, target, &args[1..]).await;
    } else {
        miscellanneous::handle_user_mode(registry, session, args).await;
    }
}
