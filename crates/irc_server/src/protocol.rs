//! Protocol constants & mode grammar (§4.A): nick validity, mode-string
//! deconstruction/construction, channel power-symbol precedence.

use crate::constants::{CHANNEL_POWER_MODES, NICK_EXTRA_CHARS};
use nom::Parser;
use nom::character::complete::satisfy;
use nom::combinator::recognize;
use nom::multi::many1;

fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || NICK_EXTRA_CHARS.contains(c)
}

/// A nick must be non-empty and contain only ASCII letters/digits and
/// `NICK_EXTRA_CHARS`.
pub fn nick_valid(nick: &str) -> bool {
    if nick.is_empty() {
        return false;
    }
    let parsed = recognize(many1(satisfy(is_nick_char))).parse(nick);
    matches!(parsed, Ok((rest, matched)) if rest.is_empty() && matched.len() == nick.len())
}

/// One element of a deconstructed mode string: the sign in effect, the mode
/// character, and its argument if the mode takes one and one was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub sign: char,
    pub mode: char,
    pub argument: Option<String>,
}

/// Deconstructs a sign-prefixed mode string (e.g. `+oo-v`) against a table of
/// `(mode_char, takes_argument)` pairs, pulling positional tokens from
/// `arguments` for modes that take one.
///
/// Returns `None` if the string doesn't open with `+`/`-` (the whole parse is
/// rejected — spec.md §9's Open Question is resolved this way: a bare mode
/// letter never starts a valid mode string, even immediately after a
/// previously-parsed one). Unknown mode characters are silently skipped;
/// a mode that needs an argument but finds none available is silently
/// dropped rather than erroring.
pub fn mode_deconstruct(
    valid_modes: &[(char, bool)],
    mode_string: &str,
    arguments: &[String],
) -> Option<Vec<ModeChange>> {
    let mut sign: Option<char> = None;
    let mut output = Vec::new();
    let mut next_arg = 0usize;

    for c in mode_string.chars() {
        if c == '+' || c == '-' {
            sign = Some(c);
            continue;
        }

        let sign = match sign {
            Some(s) => s,
            None => return None,
        };

        let Some(&(_, takes_arg)) = valid_modes.iter().find(|(m, _)| *m == c) else {
            continue;
        };

        if takes_arg {
            if let Some(arg) = arguments.get(next_arg) {
                output.push(ModeChange {
                    sign,
                    mode: c,
                    argument: Some(arg.clone()),
                });
                next_arg += 1;
            }
        } else {
            output.push(ModeChange {
                sign,
                mode: c,
                argument: None,
            });
        }
    }

    Some(output)
}

/// Builds a `+`-prefixed mode string for a set of currently-set flags. Order
/// is stable but otherwise unspecified (no RFC or original-server guarantee
/// requires a particular ordering).
pub fn mode_construct<'a>(flags: impl IntoIterator<Item = &'a char>) -> String {
    let mut s = String::from("+");
    s.extend(flags);
    s
}

/// The display symbol for the highest-precedence power a member holds in a
/// channel, per the `q > a > o > h > v > none` ordering.
pub fn power_symbol(powers: &std::collections::HashSet<char>) -> Option<char> {
    CHANNEL_POWER_MODES
        .iter()
        .find(|(mode, _)| powers.contains(mode))
        .map(|(_, symbol)| *symbol)
}

/// Splits a wire line into whitespace-separated tokens, honouring the IRC
/// trailing-parameter convention: a token starting with `:` (after any
/// number of leading spaces) swallows the rest of the line verbatim, colon
/// stripped, as the final element.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = line.trim_start_matches(' ');
    loop {
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            parts.push(trailing.to_string());
            break;
        }
        match rest.find(' ') {
            Some(idx) => {
                parts.push(rest[..idx].to_string());
                rest = rest[idx + 1..].trim_start_matches(' ');
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

/// Clamps an identifier (nick/username/realname) to the maximum length,
/// by truncating the string itself rather than slicing bytes.
pub fn clamp_identifier(s: &str) -> String {
    s.chars().take(crate::constants::MAX_IDENTIFIER_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nick_valid_accepts_special_chars() {
        assert!(nick_valid("Alice-_\\[]{}^`1"));
        assert!(!nick_valid(""));
        assert!(!nick_valid("al ice"));
        assert!(!nick_valid("alice!"));
    }

    #[test]
    fn mode_deconstruct_rejects_missing_leading_sign() {
        assert_eq!(mode_deconstruct(&[('o', true)], "oo", &[]), None);
    }

    #[test]
    fn mode_deconstruct_tracks_sign_across_chars() {
        let valid = [('o', true), ('v', true)];
        let args = vec!["bob".to_string(), "carol".to_string()];
        let out = mode_deconstruct(&valid, "+o-v", &args).unwrap();
        assert_eq!(
            out,
            vec![
                ModeChange {
                    sign: '+',
                    mode: 'o',
                    argument: Some("bob".to_string())
                },
                ModeChange {
                    sign: '-',
                    mode: 'v',
                    argument: Some("carol".to_string())
                },
            ]
        );
    }

    #[test]
    fn mode_deconstruct_drops_unmatched_argument() {
        let valid = [('o', true)];
        let out = mode_deconstruct(&valid, "+oo", &["bob".to_string()]).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn mode_deconstruct_skips_unknown_chars() {
        let valid = [('i', false)];
        let out = mode_deconstruct(&valid, "+zi", &[]).unwrap();
        assert_eq!(out, vec![ModeChange { sign: '+', mode: 'i', argument: None }]);
    }

    #[test]
    fn power_symbol_precedence() {
        let mut powers = std::collections::HashSet::new();
        powers.insert('v');
        powers.insert('o');
        assert_eq!(power_symbol(&powers), Some('@'));
    }

    #[test]
    fn tokenize_splits_on_spaces_with_trailing_param() {
        let tokens = tokenize("PRIVMSG #chan :hello there world");
        assert_eq!(
            tokens,
            vec![
                "PRIVMSG".to_string(),
                "#chan".to_string(),
                "hello there world".to_string()
            ]
        );
    }

    #[test]
    fn tokenize_handles_no_trailing_param() {
        assert_eq!(tokenize("USER a 0 * :real name"), vec!["USER", "a", "0", "*", "real name"]);
        assert_eq!(tokenize("PING"), vec!["PING"]);
    }

    #[test]
    fn clamp_identifier_truncates_by_char() {
        let long = "a".repeat(50);
        assert_eq!(clamp_identifier(&long).len(), 30);
    }
}
