//! JOIN/PART/channel-MODE — grounded on `channel.py`'s `join_client`/
//! `remove_client` for the membership side and spec.md §4.C's mode_o
//! precondition chain for the operator-grant side (not present upstream).

use std::sync::Arc;

use crate::channel::ModeOpOutcome;
use crate::logging::log_event;
use crate::protocol::mode_deconstruct;
use crate::registry::Registry;
use crate::replies::IrcReply;
use crate::session::Session;

fn is_channel_name(name: &str) -> bool {
    name.starts_with('#') && name.len() > 1
}

pub async fn handle_join(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let Some(names) = args.first() else {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "JOIN".to_string(),
            }
            .format(fqdn),
        );
        return;
    };

    for name in names.split(',') {
        if !is_channel_name(name) {
            let nick = session.nick_or_star().await;
            session.send_line(
                IrcReply::NoSuchChannel {
                    nick,
                    target: name.to_string(),
                }
                .format(fqdn),
            );
            continue;
        }
        let channel = registry.get_or_create_channel(name);
        if channel.is_member(&session.nick_or_star().await.to_lowercase()).await {
            continue;
        }
        channel.join(session, fqdn).await;
        let nick = session.nick_or_star().await;
        log_event(
            "JOIN",
            registry.config.server.debug,
            &format!("[{}]: {nick}", channel.name),
        );
    }
}

pub async fn handle_part(registry: &Arc<Registry>, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let Some(names) = args.first() else {
        let nick = session.nick_or_star().await;
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "PART".to_string(),
            }
            .format(fqdn),
        );
        return;
    };
    let reason = args.get(1).map(|s| s.as_str());

    for name in names.split(',') {
        let Some(channel) = registry.find_channel(name) else {
            let nick = session.nick_or_star().await;
            session.send_line(
                IrcReply::NoSuchChannel {
                    nick,
                    target: name.to_string(),
                }
                .format(fqdn),
            );
            continue;
        };
        if !channel.is_member(&session.nick_or_star().await.to_lowercase()).await {
            session.send_line(
                IrcReply::NotOnChannel {
                    channel: name.to_string(),
                }
                .format(fqdn),
            );
            continue;
        }
        let part_nick = session.nick_or_star().await;
        channel.part(session, reason).await;
        log_event(
            "PART",
            registry.config.server.debug,
            &format!("[{}]: {part_nick}", channel.name),
        );
        registry.drop_channel_if_destroyed(name).await;
    }
}

/// Dispatches a channel `MODE` line. Only the `o` (operator) power mode is
/// implemented end-to-end; other channel power modes (`q`/`a`/`h`/`v`) are
/// tracked in membership state but have no dedicated grant/revoke command
/// in this spec, matching channel.py's own scope.
pub async fn handle_channel_mode(
    registry: &Arc<Registry>,
    session: &Arc<Session>,
    channel_name: &str,
    args: &[String],
) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;

    let Some(channel) = registry.find_channel(channel_name) else {
        session.send_line(
            IrcReply::NoSuchChannel {
                nick,
                target: channel_name.to_string(),
            }
            .format(fqdn),
        );
        return;
    };

    let Some(mode_string) = args.first() else {
        session.send_line(
            IrcReply::ChannelModeIs {
                nick: nick.clone(),
                channel: channel_name.to_string(),
                mode_keys: "+".to_string(),
                mode_values: String::new(),
            }
            .format(fqdn),
        );
        session.send_line(
            IrcReply::CreationTime {
                nick,
                channel: channel_name.to_string(),
                created: channel.created_at,
            }
            .format(fqdn),
        );
        return;
    };
    let targets: Vec<String> = args[1..].to_vec();
    let Some(changes) = mode_deconstruct(&[('o', true)], mode_string, &targets) else {
        return;
    };

    for change in changes {
        let Some(target_nick) = change.argument else {
            continue;
        };
        let registered = registry.nick_registered(&target_nick);
        let outcome = channel
            .set_op(session, &target_nick, registered, change.sign)
            .await;

        match outcome {
            ModeOpOutcome::NotMember => {
                session.send_line(
                    IrcReply::ChanOpPrivsNeeded {
                        nick: nick.clone(),
                        channel: channel_name.to_string(),
                    }
                    .format(fqdn),
                );
            }
            ModeOpOutcome::HalfopsCannotOp => {
                session.send_line(
                    IrcReply::HalfopsCannotOp {
                        nick: nick.clone(),
                        channel: channel_name.to_string(),
                    }
                    .format(fqdn),
                );
            }
            ModeOpOutcome::ChanOpPrivsNeeded => {
                session.send_line(
                    IrcReply::ChanOpPrivsNeeded {
                        nick: nick.clone(),
                        channel: channel_name.to_string(),
                    }
                    .format(fqdn),
                );
            }
            ModeOpOutcome::NoSuchNick => {
                session.send_line(
                    IrcReply::NoSuchNick {
                        nick: nick.clone(),
                        target: target_nick,
                    }
                    .format(fqdn),
                );
            }
            ModeOpOutcome::UserNotInChannel => {
                session.send_line(
                    IrcReply::UserNotInChannel {
                        nick: nick.clone(),
                        target_nick,
                        channel: channel_name.to_string(),
                    }
                    .format(fqdn),
                );
            }
            ModeOpOutcome::Applied {
                sign,
                target_identifier,
            } => {
                log_event(
                    "MODE",
                    registry.config.server.debug,
                    &format!("{channel_name}: {sign}o {target_identifier}"),
                );
            }
            ModeOpOutcome::NoOp => {}
        }
    }
}
