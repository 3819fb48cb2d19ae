//! Pre-registration commands (CAP/NICK/USER/PONG/QUIT) and the welcome
//! burst, grounded on the original implementation's `cmd_nick`/`cmd_user`/
//! `cmd_pong`/`check_authorisation`/`handle_authorised` in `client.py`.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::constants::{CLIENT_MODES, SERVER_VERSION};
use crate::logging::log_event;
use crate::protocol::{clamp_identifier, nick_valid};
use crate::registry::Registry;
use crate::replies::{IrcReply, cap_ls_reply};
use crate::session::Session;

pub async fn handle_cap(registry: &Registry, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    match args.first().map(|s| s.to_uppercase()) {
        None => session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "CAP".to_string(),
            }
            .format(fqdn),
        ),
        Some(sub) if sub == "LS" => session.send_line(cap_ls_reply(&nick)),
        Some(sub) => session.send_line(
            IrcReply::InvalidCapSubcommand {
                nick,
                subcommand: sub,
            }
            .format(fqdn),
        ),
    }
}

pub async fn handle_nick(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;

    let Some(raw) = args.first() else {
        session.send_line(
            IrcReply::NoNicknameGiven {
                command: "NICK".to_string(),
            }
            .format(fqdn),
        );
        return;
    };
    let candidate = clamp_identifier(raw);

    if !nick_valid(&candidate) {
        session.send_line(IrcReply::ErroneousNickname.format(fqdn));
        return;
    }

    if !registry.nick_available(&candidate) {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NicknameInUse {
                nick,
                target_nick: candidate,
            }
            .format(fqdn),
        );
        return;
    }

    let old_nick = session.nick.read().await.clone();
    let was_authorised = session.is_authorised();
    let old_identifier = if was_authorised {
        Some(session.identifier().await)
    } else {
        None
    };

    if let Some(old) = &old_nick {
        registry.deregister_nick(old);
    }
    *session.nick.write().await = Some(candidate.clone());
    registry.register_nick(&candidate, &session.key);

    if was_authorised {
        if let Some(old_identifier) = old_identifier {
            registry
                .broadcast_nick_change(session, &old_identifier, &candidate)
                .await;
        }
    } else {
        try_complete_registration(registry, session).await;
    }
}

pub async fn handle_user(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;

    if args.len() < 4 {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "USER".to_string(),
            }
            .format(fqdn),
        );
        return;
    }

    if session.user.read().await.is_some() {
        let nick = session.nick_or_star().await;
        session.send_line(IrcReply::AlreadyRegistered { nick }.format(fqdn));
        return;
    }

    let username = clamp_identifier(&args[0]);
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        let line = session
            .closing_link_error("Hostile username. Please only use 0-9 a-z A-Z in your username")
            .await;
        session.send_line(line);
        session.mark_terminated();
        return;
    }

    let realname = clamp_identifier(&args[3]);
    *session.user.write().await = Some(username);
    *session.realname.write().await = Some(realname);

    try_complete_registration(registry, session).await;
}

pub async fn handle_pong(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let Some(token) = args.first() else {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "PONG".to_string(),
            }
            .format(fqdn),
        );
        return;
    };

    let accepted = {
        let mut pong = session.pong.write().await;
        if pong.pending && token == fqdn {
            pong.pending = false;
            pong.received_count += 1;
            true
        } else {
            false
        }
    };

    if accepted {
        let nick = session.nick_or_star().await;
        log_event(
            "PONG",
            registry.config.server.debug,
            &format!("{nick}: {token}"),
        );
        try_complete_registration(registry, session).await;
    }
}

pub async fn handle_quit(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let reason = match args.first() {
        Some(reason) => reason.clone(),
        None => {
            if session.is_authorised() {
                session.nick_or_star().await
            } else {
                "*".to_string()
            }
        }
    };
    if session.is_authorised() {
        registry.broadcast_quit(session, &reason).await;
    }
    let line = session
        .closing_link_error(&format!("Quit: {reason}"))
        .await;
    session.send_line(line);
    session.mark_terminated();
}

/// Sends a PING if registration is otherwise ready but no PING/PONG
/// round-trip has happened yet, per `check_authorisation`'s
/// `pong.pending`/`pong.sent` gate. Shares `PongState` with the sweeper's own
/// keepalive ping so the two never double-send.
async fn ensure_registration_ping(registry: &Registry, session: &Arc<Session>) {
    let mut pong = session.pong.write().await;
    if pong.sent_at.is_none() {
        pong.pending = true;
        pong.sent_at = Some(registry.clock.now_secs());
        drop(pong);
        session.send_line(format!("PING :{}", registry.config.server.fqdn));
    }
}

pub async fn try_complete_registration(registry: &Registry, session: &Arc<Session>) {
    if session.is_authorised() {
        return;
    }
    let has_all = session.nick.read().await.is_some()
        && session.user.read().await.is_some()
        && session.realname.read().await.is_some();
    if !has_all {
        return;
    }
    if session.ready_to_authorise().await {
        complete_authorisation(registry, session).await;
    } else {
        ensure_registration_ping(registry, session).await;
    }
}

/// The welcome burst: 001/002/003, then the LUSERS block, then MOTD, then a
/// self MODE line if the session already carries any default user modes.
/// Order follows `handle_authorised` in the source this was distilled from.
async fn complete_authorisation(registry: &Registry, session: &Arc<Session>) {
    session.authorised.store(true, Ordering::Release);
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick.read().await.clone().unwrap_or_default();
    let identifier = session.identifier().await;

    session.send_line(
        IrcReply::Welcome {
            nick: nick.clone(),
            network: registry.config.server.name.clone(),
            identifier: identifier.clone(),
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::YourHost {
            nick: nick.clone(),
            fqdn: fqdn.clone(),
            revision: SERVER_VERSION.to_string(),
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::Created {
            nick: nick.clone(),
            date: registry.started_at.to_string(),
        }
        .format(fqdn),
    );

    let total = registry.client_count();
    let max = registry.config.server.client_limit;
    session.send_line(
        IrcReply::LusersTotal {
            nick: nick.clone(),
            count: total,
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::LusersLocalTotal {
            nick: nick.clone(),
            count: total,
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::LusersLocalUsers {
            nick: nick.clone(),
            count: total,
            max,
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::LusersGlobalUsers {
            nick: nick.clone(),
            count: total,
            max,
        }
        .format(fqdn),
    );

    crate::handlers::miscellanneous::send_motd(registry, session).await;

    // Base modes: each one is applied and broadcast to self as its own
    // `MODE <nick> +<char>` line, in `CLIENT_MODES` order.
    for mode in CLIENT_MODES {
        let newly_set = session.modes.write().await.insert(mode);
        if newly_set {
            session.send_line(format!(":{identifier} MODE {nick} +{mode}"));
        }
    }

    log_event(
        "AUTHORISED",
        registry.config.server.debug,
        &identifier,
    );
}
