//! Session handler: glues one FastAGI exchange to the state machine and
//! the notifier.
//!
//! Every failure is contained and logged here; one bad exchange must never
//! take down the process or block other concurrent exchanges.

use std::net::SocketAddr;
use std::sync::Arc;

use agi_proto::AgiSession;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};
use crate::metrics;
use crate::notify::{self, Notifier};
use crate::state::{machine, CallRegistry, ChannelAttributes};

/// Channel variable the correlation id is written back into, so that a
/// later exchange can reference the same record through the macro argument.
pub const CORRELATION_VAR: &str = "CALLWATCH_CALL_ID";

/// Fixed, ordered list of channel variables collected per exchange, as
/// (snapshot key, Asterisk variable name).
const CHANNEL_VARS: &[(&str, &str)] = &[
    ("callerid_num", "CALLERID(num)"),
    ("callerid_name", "CALLERID(name)"),
    ("uniqueid", "UNIQUEID"),
    ("arg1", "ARG1"),
    ("dialstatus", "DIALSTATUS"),
    ("dialedpeername", "DIALEDPEERNAME"),
    ("dialedpeernumber", "DIALEDPEERNUMBER"),
    ("dialedtime", "DIALEDTIME"),
    ("answeredtime", "ANSWEREDTIME"),
    ("exten", "EXTEN"),
    ("hangupcause", "HANGUPCAUSE"),
    ("info_text", "INFO_TEXT"),
    ("color", "COLOR"),
    ("type", "TYPE"),
    ("direction", "DIRECTION"),
];

/// Shared handles every exchange needs.
pub struct Bridge {
    pub registry: CallRegistry,
    pub notifier: Arc<dyn Notifier>,
    /// Channel hint passed to the notifier for fresh posts.
    pub channel: String,
}

impl Bridge {
    pub fn new(notifier: Arc<dyn Notifier>, channel: String) -> Self {
        Self {
            registry: CallRegistry::new(),
            notifier,
            channel,
        }
    }
}

/// Process one exchange, containing every error at this boundary.
pub async fn run<S>(stream: S, addr: SocketAddr, bridge: Arc<Bridge>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    metrics::record_exchange();
    match handle(stream, &bridge).await {
        Ok(()) => debug!(%addr, "exchange completed"),
        Err(ExchangeError::SessionEnded) => debug!(%addr, "session ended by peer"),
        Err(e) => {
            metrics::record_exchange_error(e.error_code());
            error!(%addr, error = %e, "exchange failed");
        }
    }
    metrics::record_tracked_calls(bridge.registry.len());
}

async fn handle<S>(stream: S, bridge: &Bridge) -> ExchangeResult
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = AgiSession::new(stream);
    session.read_env().await?;
    let vars = collect_vars(&mut session).await?;
    debug!(vars = ?vars, "collected channel variables");

    // Resolve the call record. A macro-completion exchange must reference an
    // existing record; otherwise an unseen correlation id opens a new call
    // and the id is written back for later exchanges to find it.
    let record = if let Some(alias) = vars.get("arg1") {
        bridge
            .registry
            .get_by_alias(alias)
            .ok_or_else(|| ExchangeError::UnknownCall(alias.to_string()))?
    } else {
        let id = vars.get("uniqueid").ok_or(if session.hangup_received() {
            ExchangeError::SessionEnded
        } else {
            ExchangeError::MissingCorrelationId
        })?;
        let (record, created) = bridge.registry.get_or_create(id, &vars);
        if created {
            debug!(id, "new call detected");
            session.set_variable(CORRELATION_VAR, id).await?;
        }
        record
    };

    // Critical section for this correlation id: merge, transition, notify
    // and binding write-back happen under the record's lock. Other calls
    // are untouched by the notifier round trip.
    let mut record = record.lock().await;
    machine::merge(&mut record, &vars);
    let transition = machine::transition(&mut record, &vars);
    let attachment = notify::render(&record, &transition.text, &transition.color);
    match transition.action {
        machine::Action::Post => {
            let message = bridge.notifier.post(&bridge.channel, attachment).await?;
            metrics::record_notification("post");
            record.message = Some(message);
        }
        machine::Action::Update => {
            let message = record
                .message
                .clone()
                .ok_or_else(|| ExchangeError::NoBinding(record.id.clone()))?;
            bridge.notifier.update(&message, attachment).await?;
            metrics::record_notification("update");
        }
    }
    Ok(())
}

/// Collect the fixed attribute list into a snapshot.
///
/// Absent and empty values are dropped entirely; the state machine's
/// presence checks depend on that.
async fn collect_vars<S>(session: &mut AgiSession<S>) -> ExchangeResult<ChannelAttributes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut vars = ChannelAttributes::new();
    for (key, name) in CHANNEL_VARS {
        if let Some(value) = session.get_variable(name).await? {
            vars.insert(key, value);
        }
    }
    Ok(vars)
}
