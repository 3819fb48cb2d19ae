//! Numeric reply and CAP-line wire formats (§4.B). Every numeric an
//! implementation must emit is represented here with the exact template
//! found in the `pyrcd` source this spec was distilled from, including that
//! source's inconsistent handling of the recipient-nick slot on a handful of
//! numerics (431/442/451/432-illegal — these genuinely omit it upstream) —
//! the one documented exception is `no_text_to_send` (412), which always
//! includes the recipient nick per spec.md §9.

use crate::constants::*;

fn num(fqdn: &str, code: u16, rest: &str) -> String {
    format!(":{fqdn} {code:03} {rest}")
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum IrcReply {
    Welcome {
        nick: String,
        network: String,
        identifier: String,
    },
    YourHost {
        nick: String,
        fqdn: String,
        revision: String,
    },
    Created {
        nick: String,
        date: String,
    },
    UModeIs {
        nick: String,
        modes: String,
    },
    Rules {
        nick: String,
        line: String,
    },
    LusersTotal {
        nick: String,
        count: usize,
    },
    LusersLocalTotal {
        nick: String,
        count: usize,
    },
    LusersLocalUsers {
        nick: String,
        count: usize,
        max: usize,
    },
    LusersGlobalUsers {
        nick: String,
        count: usize,
        max: usize,
    },
    Userhost {
        nick: String,
        hosts: Vec<String>,
    },
    Ison {
        nick: String,
        nicks: Vec<String>,
    },
    RulesStart {
        nick: String,
        server_name: String,
    },
    EndOfRules {
        nick: String,
    },
    WhoisUser {
        nick: String,
        target_nick: String,
        target_user: String,
        target_host: String,
        target_realname: String,
    },
    WhoisServer {
        nick: String,
        target_nick: String,
        fqdn: String,
        server_name: String,
    },
    WhoisIdle {
        nick: String,
        target_nick: String,
        idle_secs: u64,
        signon_time: u64,
    },
    EndOfWhois {
        nick: String,
        target: String,
    },
    WhoisChannels {
        nick: String,
        target_nick: String,
        channels: Vec<String>,
    },
    ChannelModeIs {
        nick: String,
        channel: String,
        mode_keys: String,
        mode_values: String,
    },
    CreationTime {
        nick: String,
        channel: String,
        created: u64,
    },
    Topic {
        nick: String,
        channel: String,
        topic: String,
    },
    TopicWhoTime {
        nick: String,
        channel: String,
        author: String,
        set_time: u64,
    },
    NamReply {
        nick: String,
        channel: String,
        names: Vec<String>,
    },
    EndOfNames {
        nick: String,
        channel: String,
    },
    Motd {
        nick: String,
        line: String,
    },
    MotdStart {
        nick: String,
        server_name: String,
    },
    EndOfMotd {
        nick: String,
    },
    WhoisHost {
        nick: String,
        target_nick: String,
        target_host: String,
    },
    NoSuchNick {
        nick: String,
        target: String,
    },
    NoSuchChannel {
        nick: String,
        target: String,
    },
    InvalidCapSubcommand {
        nick: String,
        subcommand: String,
    },
    NoRecipient {
        nick: String,
        command: String,
    },
    NoTextToSend {
        nick: String,
    },
    UnknownCommand {
        nick: String,
        command: String,
    },
    NoNicknameGiven {
        command: String,
    },
    NicknameInUse {
        nick: String,
        target_nick: String,
    },
    ErroneousNickname,
    UserNotInChannel {
        nick: String,
        target_nick: String,
        channel: String,
    },
    NotOnChannel {
        channel: String,
    },
    NotRegistered {
        command: String,
    },
    HalfopsCannotOp {
        nick: String,
        channel: String,
    },
    NeedMoreParams {
        nick: String,
        command: String,
    },
    AlreadyRegistered {
        nick: String,
    },
    ChanOpPrivsNeeded {
        nick: String,
        channel: String,
    },
}

impl IrcReply {
    pub fn format(&self, fqdn: &str) -> String {
        match self {
            IrcReply::Welcome {
                nick,
                network,
                identifier,
            } => num(
                fqdn,
                RPL_WELCOME,
                &format!("{nick} :Welcome to the {network} Network {identifier}"),
            ),
            IrcReply::YourHost {
                nick,
                fqdn: server_fqdn,
                revision,
            } => num(
                fqdn,
                RPL_YOURHOST,
                &format!("{nick} :Your host is {server_fqdn}, running version pyrcd {revision}"),
            ),
            IrcReply::Created { nick, date } => num(
                fqdn,
                RPL_CREATED,
                &format!("{nick} :This server was created {date}"),
            ),
            IrcReply::UModeIs { nick, modes } => {
                num(fqdn, RPL_UMODEIS, &format!("{nick} {modes}"))
            }
            IrcReply::Rules { nick, line } => num(fqdn, RPL_RULES, &format!("{nick} :- {line}")),
            IrcReply::LusersTotal { nick, count } => num(
                fqdn,
                RPL_LUSERCLIENT,
                &format!("{nick} :There are {count} users on 1 server"),
            ),
            IrcReply::LusersLocalTotal { nick, count } => num(
                fqdn,
                RPL_LUSERME,
                &format!("{nick} :I have {count} users"),
            ),
            IrcReply::LusersLocalUsers { nick, count, max } => num(
                fqdn,
                RPL_LOCALUSERS,
                &format!("{nick} :Current local users {count}, max {max}"),
            ),
            IrcReply::LusersGlobalUsers { nick, count, max } => num(
                fqdn,
                RPL_GLOBALUSERS,
                &format!("{nick} :Current global users {count}, max {max}"),
            ),
            IrcReply::Userhost { nick, hosts } => {
                num(fqdn, RPL_USERHOST, &format!("{nick} :{}", hosts.join(" ")))
            }
            IrcReply::Ison { nick, nicks } => {
                num(fqdn, RPL_ISON, &format!("{nick} :{}", nicks.join(" ")))
            }
            IrcReply::RulesStart { nick, server_name } => num(
                fqdn,
                RPL_RULESSTART,
                &format!("{nick} :- {server_name} Server Rules"),
            ),
            IrcReply::EndOfRules { nick } => num(
                fqdn,
                RPL_ENDOFRULES,
                &format!("{nick} :End of /RULES command."),
            ),
            IrcReply::WhoisUser {
                nick,
                target_nick,
                target_user,
                target_host,
                target_realname,
            } => num(
                fqdn,
                RPL_WHOISUSER,
                &format!("{nick} {target_nick} {target_user} {target_host} * :{target_realname}"),
            ),
            IrcReply::WhoisServer {
                nick,
                target_nick,
                fqdn: server_fqdn,
                server_name,
            } => num(
                fqdn,
                RPL_WHOISSERVER,
                &format!("{nick} {target_nick} {server_fqdn} :{server_name}"),
            ),
            IrcReply::WhoisIdle {
                nick,
                target_nick,
                idle_secs,
                signon_time,
            } => num(
                fqdn,
                RPL_WHOISIDLE,
                &format!("{nick} {target_nick} {idle_secs} {signon_time} :seconds idle, signon time"),
            ),
            IrcReply::EndOfWhois { nick, target } => num(
                fqdn,
                RPL_ENDOFWHOIS,
                &format!("{nick} {target} :End of /WHOIS list."),
            ),
            IrcReply::WhoisChannels {
                nick,
                target_nick,
                channels,
            } => num(
                fqdn,
                RPL_WHOISCHANNELS,
                &format!("{nick} {target_nick} :{}", channels.join(" ")),
            ),
            IrcReply::ChannelModeIs {
                nick,
                channel,
                mode_keys,
                mode_values,
            } => num(
                fqdn,
                RPL_CHANNELMODEIS,
                &format!("{nick} {channel} {mode_keys} {mode_values}"),
            ),
            IrcReply::CreationTime {
                nick,
                channel,
                created,
            } => num(
                fqdn,
                RPL_CREATIONTIME,
                &format!("{nick} {channel} {created}"),
            ),
            IrcReply::Topic {
                nick,
                channel,
                topic,
            } => num(fqdn, RPL_TOPIC, &format!("{nick} {channel} :{topic}")),
            IrcReply::TopicWhoTime {
                nick,
                channel,
                author,
                set_time,
            } => num(
                fqdn,
                RPL_TOPICWHOTIME,
                &format!("{nick} {channel} {author} {set_time}"),
            ),
            IrcReply::NamReply {
                nick,
                channel,
                names,
            } => num(
                fqdn,
                RPL_NAMREPLY,
                &format!("{nick} = {channel} :{}", names.join(" ")),
            ),
            IrcReply::EndOfNames { nick, channel } => num(
                fqdn,
                RPL_ENDOFNAMES,
                &format!("{nick} {channel} :End of /NAMES list."),
            ),
            IrcReply::Motd { nick, line } => num(fqdn, RPL_MOTD, &format!("{nick} :- {line}")),
            IrcReply::MotdStart { nick, server_name } => num(
                fqdn,
                RPL_MOTDSTART,
                &format!("{nick} :- {server_name} Message of the Day -"),
            ),
            IrcReply::EndOfMotd { nick } => num(
                fqdn,
                RPL_ENDOFMOTD,
                &format!("{nick} :End of /MOTD command."),
            ),
            IrcReply::WhoisHost {
                nick,
                target_nick,
                target_host,
            } => num(
                fqdn,
                RPL_WHOISHOST,
                &format!("{nick} {target_nick} :is connecting from *@{target_host} {target_host}"),
            ),
            IrcReply::NoSuchNick { nick, target } => num(
                fqdn,
                ERR_NOSUCHNICK,
                &format!("{nick} {target} :No such nick/channel"),
            ),
            IrcReply::NoSuchChannel { nick, target } => num(
                fqdn,
                ERR_NOSUCHCHANNEL,
                &format!("{nick} {target} :No such channel"),
            ),
            IrcReply::InvalidCapSubcommand { nick, subcommand } => num(
                fqdn,
                ERR_INVALIDCAPSUBCOMMAND,
                &format!("{nick} {subcommand} :Invalid CAP subcommand"),
            ),
            IrcReply::NoRecipient { nick, command } => num(
                fqdn,
                ERR_NORECIPIENT,
                &format!("{nick} :No recipient given ({command})"),
            ),
            IrcReply::NoTextToSend { nick } => {
                num(fqdn, ERR_NOTEXTTOSEND, &format!("{nick} :No text to send"))
            }
            IrcReply::UnknownCommand { nick, command } => num(
                fqdn,
                ERR_UNKNOWNCOMMAND,
                &format!("{nick} {command} :Unknown command"),
            ),
            IrcReply::NoNicknameGiven { command } => num(
                fqdn,
                ERR_NONICKNAMEGIVEN,
                &format!("{command} :No nickname given"),
            ),
            IrcReply::NicknameInUse { nick, target_nick } => num(
                fqdn,
                ERR_ERRONEUSNICKNAME,
                &format!("{nick} {target_nick} :Nickname is already in use"),
            ),
            IrcReply::ErroneousNickname => num(
                fqdn,
                ERR_ERRONEUSNICKNAME,
                "NICK :Erroneous Nickname: Illegal Characters",
            ),
            IrcReply::UserNotInChannel {
                nick,
                target_nick,
                channel,
            } => num(
                fqdn,
                ERR_UNAVAILRESOURCE,
                &format!("{nick} {target_nick} {channel} :They aren't on that channel"),
            ),
            IrcReply::NotOnChannel { channel } => num(
                fqdn,
                ERR_NOTONCHANNEL,
                &format!("{channel} :You're not on that channel"),
            ),
            IrcReply::NotRegistered { command } => num(
                fqdn,
                ERR_NOTREGISTERED,
                &format!("{command} :You have not registered"),
            ),
            IrcReply::HalfopsCannotOp { nick, channel } => num(
                fqdn,
                ERR_HALFOPSCANTSETMODEO,
                &format!("{nick} {channel} :Halfops cannot set mode o"),
            ),
            IrcReply::NeedMoreParams { nick, command } => num(
                fqdn,
                ERR_NEEDMOREPARAMS,
                &format!("{nick} {command} :Not enough parameters"),
            ),
            IrcReply::AlreadyRegistered { nick } => num(
                fqdn,
                ERR_ALREADYREGISTRED,
                &format!("{nick} USER :You may not reregister"),
            ),
            IrcReply::ChanOpPrivsNeeded { nick, channel } => num(
                fqdn,
                ERR_CHANOPRIVSNEEDED,
                &format!("{nick} {channel} :You're not a channel operator"),
            ),
        }
    }
}

/// `CAP <nick> LS :account-notify multi-prefix userhost-in-names`
pub fn cap_ls_reply(nick: &str) -> String {
    format!("CAP {nick} LS :account-notify multi-prefix userhost-in-names")
}
