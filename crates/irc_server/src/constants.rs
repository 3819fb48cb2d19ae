//! Static protocol tables: numeric codes, mode grammar, server defaults.

/// Characters a nickname may contain, besides ASCII letters and digits.
pub const NICK_EXTRA_CHARS: &str = "-_\\[]{}^`";

/// Maximum nickname/username/realname length (clamp, not the one-element
/// slicing bug present in the source this spec was distilled from).
pub const MAX_IDENTIFIER_LEN: usize = 30;

/// Client (user) modes: each takes zero arguments.
pub const CLIENT_MODES: [char; 3] = ['i', 'w', 'x'];

/// Channel power modes, in display precedence order (highest first), with
/// their symbol. Each takes exactly one argument (a target nick).
pub const CHANNEL_POWER_MODES: [(char, char); 5] =
    [('q', '~'), ('a', '&'), ('o', '@'), ('h', '%'), ('v', '+')];

pub const PING_TIMEOUT_SECS: u64 = 60;
pub const REGISTRATION_TIMEOUT_SECS: u64 = 10;
pub const SWEEP_INTERVAL_SECS: u64 = 1;

pub const SERVER_VERSION: &str = "pyrcd-rs-1.0";

// --- Numeric reply codes, per spec.md §4.B --------------------------------

pub const RPL_WELCOME: u16 = 1;
pub const RPL_YOURHOST: u16 = 2;
pub const RPL_CREATED: u16 = 3;
pub const RPL_UMODEIS: u16 = 221;
pub const RPL_RULES: u16 = 232;
pub const RPL_LUSERCLIENT: u16 = 251;
pub const RPL_LUSERME: u16 = 255;
pub const RPL_LOCALUSERS: u16 = 265;
pub const RPL_GLOBALUSERS: u16 = 266;
pub const RPL_USERHOST: u16 = 302;
pub const RPL_ISON: u16 = 303;
pub const RPL_RULESSTART: u16 = 308;
pub const RPL_ENDOFRULES: u16 = 309;
pub const RPL_WHOISUSER: u16 = 311;
pub const RPL_WHOISSERVER: u16 = 312;
pub const RPL_WHOISIDLE: u16 = 317;
pub const RPL_ENDOFWHOIS: u16 = 318;
pub const RPL_WHOISCHANNELS: u16 = 319;
pub const RPL_CHANNELMODEIS: u16 = 324;
pub const RPL_CREATIONTIME: u16 = 329;
pub const RPL_TOPIC: u16 = 332;
pub const RPL_TOPICWHOTIME: u16 = 333;
pub const RPL_NAMREPLY: u16 = 353;
pub const RPL_ENDOFNAMES: u16 = 366;
pub const RPL_MOTD: u16 = 372;
pub const RPL_MOTDSTART: u16 = 375;
pub const RPL_ENDOFMOTD: u16 = 376;
pub const RPL_WHOISHOST: u16 = 378;
pub const ERR_NOSUCHNICK: u16 = 401;
pub const ERR_NOSUCHCHANNEL: u16 = 403;
pub const ERR_INVALIDCAPSUBCOMMAND: u16 = 410;
pub const ERR_NORECIPIENT: u16 = 411;
pub const ERR_NOTEXTTOSEND: u16 = 412;
pub const ERR_UNKNOWNCOMMAND: u16 = 421;
pub const ERR_NONICKNAMEGIVEN: u16 = 431;
pub const ERR_ERRONEUSNICKNAME: u16 = 432;
pub const ERR_UNAVAILRESOURCE: u16 = 441;
pub const ERR_NOTONCHANNEL: u16 = 442;
pub const ERR_NOTREGISTERED: u16 = 451;
pub const ERR_HALFOPSCANTSETMODEO: u16 = 460;
pub const ERR_NEEDMOREPARAMS: u16 = 461;
pub const ERR_ALREADYREGISTRED: u16 = 462;
pub const ERR_CHANOPRIVSNEEDED: u16 = 482;
