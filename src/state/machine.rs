//! Call lifecycle state machine.
//!
//! Pure decision logic: given a call record and the attribute snapshot of
//! one exchange, merge the shared fields and pick the notification
//! transition. No sockets, no chat API, fully unit-testable.

use super::{CallRecord, ChannelAttributes, Direction};

/// Color for transitions that carry no outcome of their own.
pub const DEFAULT_COLOR: &str = "good";

/// Fallback color for unrecognized dial outcomes.
const UNKNOWN_OUTCOME_COLOR: &str = "#333333";

/// Whether the notification is a fresh post or an in-place update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Post,
    Update,
}

/// The state machine's decision for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub text: String,
    pub color: String,
}

/// Merge snapshot fields shared by every transition into the record.
///
/// Durations are parsed as non-negative integers; unparsable values are
/// ignored rather than clearing previously merged ones.
pub fn merge(record: &mut CallRecord, vars: &ChannelAttributes) {
    if let Some(text) = vars.get("info_text") {
        record.info_text = Some(text.to_string());
    }
    if let Some(color) = vars.get("color") {
        record.color = Some(color.to_string());
    }
    if let Some(tag) = vars.get("type") {
        record.type_tag = Some(tag.to_string());
    }
    if let Some(secs) = vars.get("dialedtime").and_then(|v| v.parse::<u64>().ok()) {
        record.dialed_secs = Some(secs);
    }
    if let Some(secs) = vars.get("answeredtime").and_then(|v| v.parse::<u64>().ok()) {
        record.answered_secs = Some(secs);
    }
}

/// Pick the transition for this exchange and clear the first-sighting flag.
///
/// Branches are mutually exclusive and evaluated in priority order:
/// first sighting, macro completion, dial outcome, hangup cause, unknown.
pub fn transition(record: &mut CallRecord, vars: &ChannelAttributes) -> Transition {
    let decided = if record.first_sighting {
        ringing(record)
    } else if vars.contains("arg1") {
        established(record, vars)
    } else if let Some(status) = vars.get("dialstatus") {
        outcome(record, status)
    } else if let Some(cause) = vars.get("hangupcause") {
        hangup(record, cause)
    } else {
        Transition {
            action: Action::Update,
            text: "Unknown call state".to_string(),
            color: resolve_color(record, DEFAULT_COLOR),
        }
    };
    record.first_sighting = false;
    decided
}

fn ringing(record: &CallRecord) -> Transition {
    let mut text = match record.direction {
        Direction::Inbound => "Incoming call (ringing)".to_string(),
        Direction::Outbound => format!(
            "Outgoing call (ringing) to {}",
            record.to_num.as_deref().unwrap_or("Unknown")
        ),
    };
    if let Some(info) = &record.info_text {
        text.push_str(&format!(" ({info})"));
    }
    Transition {
        action: Action::Post,
        text,
        color: resolve_color(record, DEFAULT_COLOR),
    }
}

fn established(record: &mut CallRecord, vars: &ChannelAttributes) -> Transition {
    // The dial step knows the answering endpoint better than the original
    // extension did, so the destination is recomputed here.
    if let Some(peer) = vars.get("dialedpeernumber") {
        record.to_num = Some(peer_number(peer));
        if let Some(name) = vars.get("dialedpeername") {
            record.to_name = Some(name.to_string());
        }
    } else {
        if let Some(num) = vars.get("callerid_num") {
            record.to_num = Some(num.to_string());
        }
        if let Some(name) = vars.get("callerid_name") {
            record.to_name = Some(name.to_string());
        }
    }
    Transition {
        action: Action::Update,
        text: format!("Call established with {}", record.destination()),
        color: resolve_color(record, DEFAULT_COLOR),
    }
}

fn outcome(record: &CallRecord, status: &str) -> Transition {
    let (text, color) = match status {
        "ANSWER" => ("Call ended", "good"),
        "BUSY" => ("Busy", "warning"),
        "NOANSWER" => ("Not answered", "warning"),
        "CANCEL" => ("Canceled", "warning"),
        "CONGESTION" => ("Congestion", "#9400D3"),
        "CHANUNAVAIL" => ("Channel unavailable", "#9400D3"),
        "DONTCALL" => ("Reject (don't call)", "#A9A9A9"),
        "TORTURE" => ("Reject (torture)", "#A9A9A9"),
        _ => ("Unknown", UNKNOWN_OUTCOME_COLOR),
    };
    let dest = record.destination();
    let text = match record.direction {
        Direction::Inbound => format!("{text} from {dest}"),
        Direction::Outbound => format!("{text} to {dest}"),
    };
    Transition {
        action: Action::Update,
        text,
        color: resolve_color(record, color),
    }
}

fn hangup(record: &CallRecord, cause: &str) -> Transition {
    let cause: i64 = cause.parse().unwrap_or(0);
    let text = if cause > 0 {
        format!("Call hung up by {}", record.destination())
    } else {
        format!("Unknown call state (hangupcause {cause})")
    };
    Transition {
        action: Action::Update,
        text,
        color: resolve_color(record, DEFAULT_COLOR),
    }
}

/// An explicit per-record color override always wins.
fn resolve_color(record: &CallRecord, fallback: &str) -> String {
    record
        .color
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

/// Normalize a dialed peer number like `SIP/200@pbx-1` to the bare number:
/// strip the technology prefix and the host suffix.
pub fn peer_number(peer: &str) -> String {
    let s = peer.rsplit('/').next().unwrap_or(peer);
    let s = s.split('@').next().unwrap_or(s);
    s.to_string()
}
