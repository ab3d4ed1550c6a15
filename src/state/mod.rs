//! Call state: attribute snapshots, call records and the shared registry.

pub mod machine;

use chrono::{DateTime, Local};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The attribute snapshot observed in one protocol exchange.
///
/// Absence of a key and an empty value are the same thing: empty values are
/// dropped on insert, so `get` returning `Some` always means "attribute set
/// to something non-empty". The state machine depends on this when testing
/// presence.
#[derive(Debug, Clone, Default)]
pub struct ChannelAttributes {
    vars: HashMap<String, String>,
}

impl ChannelAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, dropping empty values entirely.
    pub fn insert(&mut self, key: &str, value: String) {
        if !value.is_empty() {
            self.vars.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Call direction, decided once on first sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Inbound,
    Outbound,
}

impl Direction {
    /// Parse the switch's direction override; anything but "out" is inbound.
    pub fn parse(s: &str) -> Self {
        match s {
            "out" | "outbound" => Self::Outbound,
            _ => Self::Inbound,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "in",
            Self::Outbound => "out",
        }
    }
}

/// Binding to the chat message that mirrors a call.
///
/// Acquired at most once per call, from the result of the first successful
/// post; every later transition updates this message in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel id resolved by the chat API.
    pub channel: String,
    /// Message timestamp, the chat API's message id.
    pub ts: String,
}

/// One logical call, keyed by its correlation id.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Switch-assigned correlation id. Immutable once stored.
    pub id: String,
    pub from_num: Option<String>,
    pub from_name: Option<String>,
    pub to_num: Option<String>,
    pub to_name: Option<String>,
    pub direction: Direction,
    /// When the call was first sighted.
    pub started_at: DateTime<Local>,
    /// Seconds spent dialing, once reported.
    pub dialed_secs: Option<u64>,
    /// Seconds the call was answered, once reported.
    pub answered_secs: Option<u64>,
    /// Notification binding, set after the first successful post.
    pub message: Option<MessageRef>,
    /// Free-text annotation from the dialplan.
    pub info_text: Option<String>,
    /// Color override from the dialplan; always wins over computed colors.
    pub color: Option<String>,
    /// Free-text type tag, prefixed onto every message text.
    pub type_tag: Option<String>,
    /// Whether the current exchange is this call's first sighting.
    pub first_sighting: bool,
}

impl CallRecord {
    /// Create a record for a newly sighted call, populated from the snapshot.
    ///
    /// Direction defaults to inbound unless the switch asserts otherwise.
    /// The from-name defaults to "anonymous" when absent or merely echoing
    /// the caller number.
    pub fn open(id: &str, vars: &ChannelAttributes) -> Self {
        let from_num = vars.get("callerid_num").map(str::to_string);
        let from_name = match vars.get("callerid_name") {
            Some(name) if Some(name) != vars.get("callerid_num") => name.to_string(),
            _ => "anonymous".to_string(),
        };
        Self {
            id: id.to_string(),
            from_num,
            from_name: Some(from_name),
            to_num: vars.get("exten").map(str::to_string),
            to_name: None,
            direction: vars.get("direction").map(Direction::parse).unwrap_or_default(),
            started_at: Local::now(),
            dialed_secs: None,
            answered_secs: None,
            message: None,
            info_text: None,
            color: None,
            type_tag: None,
            first_sighting: true,
        }
    }

    /// Human-readable destination: number plus name when known.
    pub fn destination(&self) -> String {
        match (&self.to_num, &self.to_name) {
            (Some(num), Some(name)) => format!("{num} ({name})"),
            (Some(num), None) => num.clone(),
            (None, Some(name)) => format!("({name})"),
            (None, None) => "Unknown".to_string(),
        }
    }
}

/// Shared, concurrently accessed mapping from correlation id to call record.
///
/// Owns the map and all synchronization; the raw map is never exposed. Each
/// record sits behind its own async mutex so an exchange can hold one call's
/// critical section across a notifier round trip without stalling unrelated
/// calls.
///
/// Records are never evicted: a call must stay addressable for its entire
/// lifetime, and accumulation of calls that never reach a terminal event is
/// an accepted bound.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: DashMap<String, Arc<Mutex<CallRecord>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record, creating it from the snapshot if unseen.
    ///
    /// Returns the record and whether this call was just created.
    pub fn get_or_create(
        &self,
        id: &str,
        vars: &ChannelAttributes,
    ) -> (Arc<Mutex<CallRecord>>, bool) {
        match self.calls.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(e) => (Arc::clone(e.get()), false),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let record = Arc::new(Mutex::new(CallRecord::open(id, vars)));
                e.insert(Arc::clone(&record));
                (record, true)
            }
        }
    }

    /// Resolve a record through the macro-argument alias.
    ///
    /// The alias carries the correlation id written back into the switch on
    /// first sighting, so this is a plain lookup that never creates: absence
    /// is a protocol-ordering violation the caller must surface.
    pub fn get_by_alias(&self, alias: &str) -> Option<Arc<Mutex<CallRecord>>> {
        self.calls.get(alias).map(|r| Arc::clone(r.value()))
    }

    /// Number of tracked calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> ChannelAttributes {
        let mut vars = ChannelAttributes::new();
        for (k, v) in pairs {
            vars.insert(k, v.to_string());
        }
        vars
    }

    #[test]
    fn empty_values_are_dropped() {
        let vars = attrs(&[("dialstatus", ""), ("exten", "42")]);
        assert!(!vars.contains("dialstatus"));
        assert_eq!(vars.get("exten"), Some("42"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn open_defaults_direction_and_anonymous_name() {
        let record = CallRecord::open("1700.1", &attrs(&[("callerid_num", "+4912345")]));
        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.from_name.as_deref(), Some("anonymous"));
        assert_eq!(record.from_num.as_deref(), Some("+4912345"));
        assert!(record.first_sighting);
    }

    #[test]
    fn open_treats_name_echoing_number_as_anonymous() {
        let record = CallRecord::open(
            "1700.2",
            &attrs(&[("callerid_num", "+4912345"), ("callerid_name", "+4912345")]),
        );
        assert_eq!(record.from_name.as_deref(), Some("anonymous"));
    }

    #[test]
    fn open_keeps_real_caller_name_and_direction_override() {
        let record = CallRecord::open(
            "1700.3",
            &attrs(&[
                ("callerid_num", "+4912345"),
                ("callerid_name", "Alice"),
                ("direction", "out"),
                ("exten", "200"),
            ]),
        );
        assert_eq!(record.from_name.as_deref(), Some("Alice"));
        assert_eq!(record.direction, Direction::Outbound);
        assert_eq!(record.to_num.as_deref(), Some("200"));
    }

    #[test]
    fn registry_creates_once_and_resolves_alias() {
        let registry = CallRegistry::new();
        let vars = attrs(&[("callerid_num", "+4912345")]);

        let (_, created) = registry.get_or_create("1700.4", &vars);
        assert!(created);
        let (_, created) = registry.get_or_create("1700.4", &vars);
        assert!(!created);
        assert_eq!(registry.len(), 1);

        assert!(registry.get_by_alias("1700.4").is_some());
        assert!(registry.get_by_alias("never-seen").is_none());
    }

    #[test]
    fn destination_formats_number_and_name() {
        let mut record = CallRecord::open("1700.5", &ChannelAttributes::new());
        assert_eq!(record.destination(), "Unknown");
        record.to_num = Some("200".into());
        assert_eq!(record.destination(), "200");
        record.to_name = Some("Bob".into());
        assert_eq!(record.destination(), "200 (Bob)");
    }
}
