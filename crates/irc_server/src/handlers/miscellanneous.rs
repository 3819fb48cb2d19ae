//! WHOIS/ISON/USERHOST/LUSERS/MOTD/RULES — the read-only commands that
//! don't mutate channel or nick state.

use std::sync::Arc;

use crate::constants::CLIENT_MODES;
use crate::protocol::{mode_construct, mode_deconstruct, power_symbol};
use crate::registry::Registry;
use crate::replies::IrcReply;
use crate::session::Session;

/// Queries or toggles a client's own user modes (`i`/`w`/`x`). A target
/// other than the caller's own nick is silently ignored — there is no
/// remote user-mode command in this protocol.
pub async fn handle_user_mode(registry: &Registry, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let Some(target_nick) = args.first() else {
        return;
    };
    let own_nick = session.nick_or_star().await;
    if target_nick.to_lowercase() != own_nick.to_lowercase() {
        return;
    }

    let Some(mode_string) = args.get(1) else {
        let modes = session.modes.read().await;
        let mode_str = mode_construct(modes.iter());
        session.send_line(
            IrcReply::UModeIs {
                nick: own_nick,
                modes: mode_str,
            }
            .format(fqdn),
        );
        return;
    };

    let valid: Vec<(char, bool)> = CLIENT_MODES.iter().map(|c| (*c, false)).collect();
    let Some(changes) = mode_deconstruct(&valid, mode_string, &[]) else {
        return;
    };

    let mut applied = Vec::new();
    {
        let mut modes = session.modes.write().await;
        for change in &changes {
            match change.sign {
                '+' => {
                    if modes.insert(change.mode) {
                        applied.push((change.sign, change.mode));
                    }
                }
                '-' => {
                    if modes.remove(&change.mode) {
                        applied.push((change.sign, change.mode));
                    }
                }
                _ => {}
            }
        }
    }

    if !applied.is_empty() {
        let identifier = session.identifier().await;
        let mode_str: String = applied.iter().map(|(s, m)| format!("{s}{m}")).collect();
        session.send_line(format!(":{identifier} MODE {own_nick} {mode_str}"));
    }
}

pub async fn send_motd(registry: &Registry, session: &Arc<Session>) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    session.send_line(
        IrcReply::MotdStart {
            nick: nick.clone(),
            server_name: registry.config.server.name.clone(),
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::Motd {
            nick: nick.clone(),
            line: registry.config.motd.modified_display(),
        }
        .format(fqdn),
    );
    for line in registry.config.motd.content.lines() {
        session.send_line(
            IrcReply::Motd {
                nick: nick.clone(),
                line: line.to_string(),
            }
            .format(fqdn),
        );
    }
    session.send_line(IrcReply::EndOfMotd { nick }.format(fqdn));
}

pub async fn handle_motd(registry: &Registry, session: &Arc<Session>) {
    send_motd(registry, session).await;
}

pub async fn handle_rules(registry: &Registry, session: &Arc<Session>) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    session.send_line(
        IrcReply::RulesStart {
            nick: nick.clone(),
            server_name: registry.config.server.name.clone(),
        }
        .format(fqdn),
    );
    for line in registry.config.rules.content.lines() {
        session.send_line(
            IrcReply::Rules {
                nick: nick.clone(),
                line: line.to_string(),
            }
            .format(fqdn),
        );
    }
    session.send_line(IrcReply::EndOfRules { nick }.format(fqdn));
}

pub async fn handle_lusers(registry: &Registry, session: &Arc<Session>) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
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
            nick,
            count: total,
            max,
        }
        .format(fqdn),
    );
}

pub async fn handle_userhost(registry: &Registry, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    if args.is_empty() {
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "USERHOST".to_string(),
            }
            .format(fqdn),
        );
        return;
    }
    let mut hosts = Vec::new();
    for target in args {
        if let Some(target_session) = registry.find_session_by_nick(target) {
            let identifier = target_session.identifier().await;
            hosts.push(format!("{target}={identifier}"));
        }
    }
    session.send_line(IrcReply::Userhost { nick, hosts }.format(fqdn));
}

pub async fn handle_ison(registry: &Registry, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    if args.is_empty() {
        session.send_line(
            IrcReply::NeedMoreParams {
                nick,
                command: "ISON".to_string(),
            }
            .format(fqdn),
        );
        return;
    }
    let mut present = Vec::new();
    for target in args {
        if !registry.nick_available(target) {
            present.push(target.clone());
        }
    }
    session.send_line(
        IrcReply::Ison {
            nick,
            nicks: present,
        }
        .format(fqdn),
    );
}

pub async fn handle_whois(registry: &Registry, session: &Arc<Session>, args: &[String]) {
    let fqdn = &registry.config.server.fqdn;
    let nick = session.nick_or_star().await;
    let Some(target) = args.first() else {
        session.send_line(
            IrcReply::NoNicknameGiven {
                command: "WHOIS".to_string(),
            }
            .format(fqdn),
        );
        return;
    };

    let Some(target_session) = registry.find_session_by_nick(target) else {
        session.send_line(
            IrcReply::NoSuchNick {
                nick: nick.clone(),
                target: target.clone(),
            }
            .format(fqdn),
        );
        session.send_line(
            IrcReply::EndOfWhois {
                nick,
                target: target.clone(),
            }
            .format(fqdn),
        );
        return;
    };

    let target_nick = target_session.nick.read().await.clone().unwrap_or_default();
    let target_user = target_session.user.read().await.clone().unwrap_or_default();
    let target_realname = target_session
        .realname
        .read()
        .await
        .clone()
        .unwrap_or_default();
    let target_host = target_session.display_hostname().await;

    session.send_line(
        IrcReply::WhoisUser {
            nick: nick.clone(),
            target_nick: target_nick.clone(),
            target_user,
            target_host: target_host.clone(),
            target_realname,
        }
        .format(fqdn),
    );
    session.send_line(
        IrcReply::WhoisHost {
            nick: nick.clone(),
            target_nick: target_nick.clone(),
            target_host,
        }
        .format(fqdn),
    );

    // Not much point sending this when the target hasn't joined a channel.
    let channels: Vec<String> = target_session
        .channels
        .iter()
        .filter_map(|entry| {
            let name = entry.key();
            registry
                .find_channel(name)
                .map(|_| {
                    let symbol = power_symbol(entry.value());
                    let display_name = registry
                        .channels_cased
                        .get(name)
                        .map(|v| v.clone())
                        .unwrap_or_else(|| name.clone());
                    match symbol {
                        Some(symbol) => format!("{symbol}{display_name}"),
                        None => display_name,
                    }
                })
        })
        .collect();
    if !channels.is_empty() {
        session.send_line(
            IrcReply::WhoisChannels {
                nick: nick.clone(),
                target_nick: target_nick.clone(),
                channels,
            }
            .format(fqdn),
        );
    }

    session.send_line(
        IrcReply::WhoisServer {
            nick: nick.clone(),
            target_nick: target_nick.clone(),
            fqdn: fqdn.clone(),
            server_name: registry.config.server.name.clone(),
        }
        .format(fqdn),
    );

    let now = registry.clock.now_secs();
    let idle = now.saturating_sub(target_session.last_cmd.load(std::sync::atomic::Ordering::Acquire));
    session.send_line(
        IrcReply::WhoisIdle {
            nick: nick.clone(),
            target_nick: target_nick.clone(),
            idle_secs: idle,
            signon_time: target_session.connected_at,
        }
        .format(fqdn),
    );

    session.send_line(
        IrcReply::EndOfWhois {
            nick,
            target: target_nick,
        }
        .format(fqdn),
    );
}
