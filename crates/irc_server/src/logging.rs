//! Log sink: the six-tier verbosity/label system (§6), layered on top of
//! `log` + `flexi_logger`. A label is shown when
//! `floor <= configured_debug <= ceiling` (ceiling `None` means unbounded).

use log::Level;

pub struct LabelSpec {
    pub floor: u8,
    pub ceiling: Option<u8>,
    pub level: Level,
}

macro_rules! labels {
    ($($name:ident => ($floor:expr, $ceiling:expr, $level:expr)),+ $(,)?) => {
        pub const LABELS: &[(&str, LabelSpec)] = &[
            $((stringify!($name), LabelSpec { floor: $floor, ceiling: $ceiling, level: $level })),+
        ];
    };
}

labels! {
    INFO => (0, None, Level::Info),
    WARNING => (0, None, Level::Warn),
    ERROR => (0, None, Level::Error),
    CONNECT => (1, None, Level::Info),
    DISCONNECT => (1, None, Level::Info),
    LOOKUP => (1, None, Level::Info),
    AUTHORISED => (1, None, Level::Info),
    JOIN => (2, Some(4), Level::Debug),
    PART => (2, Some(4), Level::Debug),
    PRIVMSG => (3, Some(4), Level::Trace),
    MODE => (3, Some(4), Level::Debug),
    NOTICE => (3, Some(4), Level::Trace),
    COMMAND => (4, Some(4), Level::Trace),
    PONG => (4, Some(4), Level::Trace),
    RAW => (5, None, Level::Trace),
}

fn spec(label: &str) -> Option<&'static LabelSpec> {
    LABELS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, s)| s)
}

/// Gate `text` under `label` against the configured debug level and, if it
/// passes, forward it to `log::log!` with the label as the target. Unknown
/// labels are always emitted (the original's behaviour).
pub fn log_event(label: &str, debug_level: u8, text: &str) {
    let visible = match spec(label) {
        Some(s) => debug_level >= s.floor && s.ceiling.is_none_or(|c| debug_level <= c),
        None => true,
    };

    if visible {
        let level = spec(label).map(|s| s.level).unwrap_or(Level::Info);
        log::log!(target: label, level, "{text}");
    }
}
