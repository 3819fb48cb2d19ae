//! PRIVMSG/NOTICE — routes to a channel or a nick, grounded on
//! `server.py`'s `channel_message`/`channel_notice`/`private_message`/
//! `private_notice` routers.

use std::sync::Arc;

use crate::logging::log_event;
use crate::registry::Registry;
use crate::replies::IrcReply;
use crate::session::Session;

fn is_channel_name(name: &str) -> bool {
    name.starts_with('#')
}

pub async fn handle_privmsg(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;

    let Some(target) = args.first() else {
        session.send_line(
            IrcReply::NoRecipient {
                nick,
                command: "PRIVMSG".to_string(),
            }
            .format(fqdn),
        );
        return;
    };
    let Some(text) = args.get(1) else {
        session.send_line(IrcReply::NoTextToSend { nick }.format(fqdn));
        return;
    };

    if is_channel_name(target) {
        let Some(channel) = registry.find_channel(target) else {
            session.send_line(
                IrcReply::NoSuchChannel {
                    nick,
                    target: target.clone(),
                }
                .format(fqdn),
            );
            return;
        };
        if channel.handle_message(session, text).await {
            log_event(
                "PRIVMSG",
                registry.config.server.debug,
                &format!("[{target} to {nick}]: {text}"),
            );
        } else {
            session.send_line(
                IrcReply::NotOnChannel {
                    channel: target.clone(),
                }
                .format(fqdn),
            );
        }
        return;
    }

    let Some(target_session) = registry.find_session_by_nick(target) else {
        session.send_line(
            IrcReply::NoSuchNick {
                nick,
                target: target.clone(),
            }
            .format(fqdn),
        );
        return;
    };
    let identifier = session.identifier().await;
    target_session.send_line(format!(":{identifier} PRIVMSG {target} :{text}"));
    log_event(
        "PRIVMSG",
        registry.config.server.debug,
        &format!("[{nick} to {target}]: {text}"),
    );
}

pub async fn handle_notice(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let Some(target) = args.first() else {
        return;
    };
    let Some(text) = args.get(1) else {
        return;
    };
    let nick = session.nick_or_star().await;

    if is_channel_name(target) {
        if let Some(channel) = registry.find_channel(target) {
            if channel.handle_notice(session, text).await {
                log_event(
                    "NOTICE",
                    registry.config.server.debug,
                    &format!("[{target} to {nick}]: {text}"),
                );
            }
        }
        return;
    }

    if let Some(target_session) = registry.find_session_by_nick(target) {
        let identifier = session.identifier().await;
        target_session.send_line(format!(":{identifier} NOTICE {target} :{text}"));
        log_event(
            "NOTICE",
            registry.config.server.debug,
            &format!("[{nick} to {target}]: {text}"),
        );
    }
}
