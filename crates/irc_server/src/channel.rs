//! Channel state and the operations that mutate it (§4.C). Membership and
//! topic live behind a per-channel lock; broadcasts always snapshot the
//! member list under that lock, release it, then write — no operation holds
//! the lock across a socket write to another session.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{Mutex, RwLock};

use crate::protocol::power_symbol;
use crate::replies::IrcReply;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub content: Option<String>,
    pub author: Option<String>,
    pub set_time: u64,
}

struct ChannelInner {
    members: IndexMap<String, Arc<Session>>,
    powers: IndexMap<String, HashSet<char>>,
    destroyed: bool,
}

pub struct Channel {
    pub name: String,
    pub created_at: u64,
    pub topic: RwLock<Topic>,
    inner: Mutex<ChannelInner>,
}

/// Result of a channel-operator grant/revoke attempt (§4.C's mode_o
/// precondition chain). `NoSuchNick` is the one outcome a caller must check
/// globally (a channel only knows its own membership), everything else is
/// decidable from the channel's own state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOpOutcome {
    NotMember,
    HalfopsCannotOp,
    ChanOpPrivsNeeded,
    /// Caller must resolve this against the registry's global nick map
    /// before calling; returned only if the caller didn't check first.
    NoSuchNick,
    UserNotInChannel,
    NoOp,
    Applied { sign: char, target_identifier: String },
}

impl Channel {
    pub fn new(name: String, created_at: u64) -> Arc<Self> {
        Arc::new(Channel {
            name,
            created_at,
            topic: RwLock::new(Topic::default()),
            inner: Mutex::new(ChannelInner {
                members: IndexMap::new(),
                powers: IndexMap::new(),
                destroyed: false,
            }),
        })
    }

    pub async fn is_member(&self, nick_lower: &str) -> bool {
        self.inner.lock().await.members.contains_key(nick_lower)
    }

    pub async fn member_count(&self) -> usize {
        self.inner.lock().await.members.len()
    }

    pub async fn is_destroyed(&self) -> bool {
        self.inner.lock().await.destroyed
    }

    pub async fn snapshot_members(&self) -> Vec<Arc<Session>> {
        self.inner.lock().await.members.values().cloned().collect()
    }

    /// Removes `session` without broadcasting PART — used when the leaver
    /// is quitting entirely and QUIT already notified co-members.
    pub async fn remove_silently(&self, session: &Arc<Session>) {
        let nick_lower = session
            .nick
            .read()
            .await
            .clone()
            .unwrap_or_default()
            .to_lowercase();
        let mut inner = self.inner.lock().await;
        inner.members.shift_remove(&nick_lower);
        inner.powers.shift_remove(&nick_lower);
        session.channels.remove(&self.name.to_lowercase());
        if inner.members.is_empty() {
            inner.destroyed = true;
        }
    }

    /// Adds `session` as a member (the first member is granted channel
    /// operator, per the original implementation's `join_client`), sends the
    /// topic (if any) and the NAMES burst to the joiner, and broadcasts JOIN
    /// to every member including the joiner.
    pub async fn join(self: &Arc<Self>, session: &Arc<Session>, fqdn: &str) {
        let nick = session.nick.read().await.clone().unwrap_or_default();
        let lower = nick.to_lowercase();

        let snapshot = {
            let mut inner = self.inner.lock().await;
            let first = inner.members.is_empty();
            let mut powers = HashSet::new();
            if first {
                powers.insert('o');
            }
            inner.members.insert(lower.clone(), session.clone());
            inner.powers.insert(lower.clone(), powers.clone());
            session
                .channels
                .insert(self.name.to_lowercase(), powers.clone());

            let ChannelInner { members, powers, .. } = &*inner;
            members
                .iter()
                .map(|(nick_key, member)| {
                    let member_powers = powers.get(nick_key).cloned().unwrap_or_default();
                    (member.clone(), member_powers)
                })
                .collect::<Vec<_>>()
        };

        let identifier = session.identifier().await;
        let join_line = format!(":{identifier} JOIN {}", self.name);
        for (member, _) in &snapshot {
            member.send_line(join_line.clone());
        }

        let topic = self.topic.read().await.clone();
        if let Some(content) = &topic.content {
            session.send_line(
                IrcReply::Topic {
                    nick: nick.clone(),
                    channel: self.name.clone(),
                    topic: content.clone(),
                }
                .format(fqdn),
            );
            if let Some(author) = &topic.author {
                session.send_line(
                    IrcReply::TopicWhoTime {
                        nick: nick.clone(),
                        channel: self.name.clone(),
                        author: author.clone(),
                        set_time: topic.set_time,
                    }
                    .format(fqdn),
                );
            }
        }

        let mut names = Vec::with_capacity(snapshot.len());
        for (member, powers) in &snapshot {
            let member_nick = member.nick.read().await.clone().unwrap_or_default();
            let prefixed = match power_symbol(powers) {
                Some(symbol) => format!("{symbol}{member_nick}"),
                None => member_nick,
            };
            names.push(prefixed);
        }
        session.send_line(
            IrcReply::NamReply {
                nick: nick.clone(),
                channel: self.name.clone(),
                names,
            }
            .format(fqdn),
        );
        session.send_line(
            IrcReply::EndOfNames {
                nick,
                channel: self.name.clone(),
            }
            .format(fqdn),
        );
    }

    /// Removes `session`, broadcasting PART to every member (including the
    /// leaver) before the removal takes effect. Marks the channel destroyed
    /// once empty; the caller (registry) is responsible for deregistering a
    /// destroyed channel.
    pub async fn part(self: &Arc<Self>, session: &Arc<Session>, reason: Option<&str>) {
        let snapshot = self.snapshot_members().await;

        let identifier = session.identifier().await;
        let part_line = match reason {
            Some(reason) => format!(":{identifier} PART {} :{reason}", self.name),
            None => format!(":{identifier} PART {}", self.name),
        };
        for member in &snapshot {
            member.send_line(part_line.clone());
        }

        self.remove_silently(session).await;
    }

    /// PRIVMSG fan-out: the sender must be a member (returns `false` and
    /// sends nothing otherwise, so the caller can emit 442), and never
    /// receives their own message back.
    pub async fn handle_message(&self, session: &Arc<Session>, text: &str) -> bool {
        let nick_lower = session
            .nick
            .read()
            .await
            .clone()
            .unwrap_or_default()
            .to_lowercase();

        let snapshot = {
            let inner = self.inner.lock().await;
            if !inner.members.contains_key(&nick_lower) {
                return false;
            }
            inner
                .members
                .iter()
                .filter(|(k, _)| **k != nick_lower)
                .map(|(_, v)| v.clone())
                .collect::<Vec<_>>()
        };

        let identifier = session.identifier().await;
        let line = format!(":{identifier} PRIVMSG {} :{text}", self.name);
        for member in &snapshot {
            member.send_line(line.clone());
        }
        true
    }

    /// NOTICE fan-out: convention is never to reply with an error, so a
    /// non-member sender is simply a no-op. Returns whether the sender was a
    /// member (and the notice was actually relayed), so the caller can
    /// decide whether to log it.
    pub async fn handle_notice(&self, session: &Arc<Session>, text: &str) -> bool {
        let nick_lower = session
            .nick
            .read()
            .await
            .clone()
            .unwrap_or_default()
            .to_lowercase();

        let snapshot = {
            let inner = self.inner.lock().await;
            if !inner.members.contains_key(&nick_lower) {
                return false;
            }
            inner
                .members
                .iter()
                .filter(|(k, _)| **k != nick_lower)
                .map(|(_, v)| v.clone())
                .collect::<Vec<_>>()
        };

        let identifier = session.identifier().await;
        let line = format!(":{identifier} NOTICE {} :{text}", self.name);
        for member in &snapshot {
            member.send_line(line.clone());
        }
        true
    }

    /// The channel-local half of the mode_o precondition chain (§4.C).
    /// `target_registered_globally` must be resolved by the caller against
    /// the registry's nick map before calling, since a channel only knows
    /// its own members; pass `true` unconditionally to skip straight to the
    /// channel-membership checks once that's confirmed.
    pub async fn set_op(
        &self,
        sender_session: &Arc<Session>,
        target_nick: &str,
        target_registered_globally: bool,
        sign: char,
    ) -> ModeOpOutcome {
        let sender_nick = sender_session.nick.read().await.clone().unwrap_or_default();
        let sender_lower = sender_nick.to_lowercase();
        let target_lower = target_nick.to_lowercase();

        let sender_powers = {
            let inner = self.inner.lock().await;
            match inner.powers.get(&sender_lower) {
                Some(p) => p.clone(),
                None => return ModeOpOutcome::NotMember,
            }
        };

        if !sender_powers.contains(&'o') {
            if sender_powers.contains(&'h') {
                return ModeOpOutcome::HalfopsCannotOp;
            }
            return ModeOpOutcome::ChanOpPrivsNeeded;
        }

        if sender_lower == target_lower {
            return ModeOpOutcome::NoOp;
        }

        if !target_registered_globally {
            return ModeOpOutcome::NoSuchNick;
        }

        let (target_member, applied) = {
            let mut inner = self.inner.lock().await;
            let Some(powers) = inner.powers.get_mut(&target_lower) else {
                return ModeOpOutcome::UserNotInChannel;
            };
            let currently_op = powers.contains(&'o');
            let should_apply = match sign {
                '+' => !currently_op,
                '-' => currently_op,
                _ => false,
            };
            if should_apply {
                match sign {
                    '+' => {
                        powers.insert('o');
                    }
                    '-' => {
                        powers.remove(&'o');
                    }
                    _ => {}
                }
            }
            let target_session = inner.members.get(&target_lower).cloned();
            (target_session, should_apply)
        };

        if target_member.is_none() {
            return ModeOpOutcome::UserNotInChannel;
        }

        if !applied {
            return ModeOpOutcome::NoOp;
        }

        let snapshot = {
            let inner = self.inner.lock().await;
            inner.members.values().cloned().collect::<Vec<_>>()
        };
        let identifier = sender_session.identifier().await;
        let line = format!(":{identifier} MODE {} {sign}o {target_nick}", self.name);
        for member in &snapshot {
            member.send_line(line.clone());
        }

        ModeOpOutcome::Applied {
            sign,
            target_identifier: target_nick.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_session(nick: &str, port: u16) -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(addr, tx, 0);
        (session, rx)
    }

    #[tokio::test]
    async fn first_joiner_gets_operator() {
        let channel = Channel::new("#test".to_string(), 0);
        let (alice, _rx) = make_session("alice", 1);
        *alice.nick.write().await = Some("alice".to_string());
        channel.join(&alice, "irc.example.org").await;

        assert!(alice.channels.get("#test").unwrap().contains(&'o'));
    }

    #[tokio::test]
    async fn non_member_cannot_set_op() {
        let channel = Channel::new("#test".to_string(), 0);
        let (alice, _rx) = make_session("alice", 1);
        *alice.nick.write().await = Some("alice".to_string());

        let outcome = channel.set_op(&alice, "bob", true, '+').await;
        assert_eq!(outcome, ModeOpOutcome::NotMember);
    }

    #[tokio::test]
    async fn self_target_is_noop() {
        let channel = Channel::new("#test".to_string(), 0);
        let (alice, _rx) = make_session("alice", 1);
        *alice.nick.write().await = Some("alice".to_string());
        channel.join(&alice, "irc.example.org").await;

        let outcome = channel.set_op(&alice, "alice", true, '+').await;
        assert_eq!(outcome, ModeOpOutcome::NoOp);
    }

    #[tokio::test]
    async fn part_destroys_empty_channel() {
        let channel = Channel::new("#test".to_string(), 0);
        let (alice, _rx) = make_session("alice", 1);
        *alice.nick.write().await = Some("alice".to_string());
        channel.join(&alice, "irc.example.org").await;
        channel.part(&alice, None).await;

        assert!(channel.is_destroyed().await);
        assert_eq!(channel.member_count().await, 0);
    }
}
