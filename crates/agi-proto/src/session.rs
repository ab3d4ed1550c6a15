//! Async AGI session: one command/response exchange over a byte stream.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::command::AgiCommand;
use crate::env::AgiEnv;
use crate::error::AgiError;
use crate::line::LineCodec;
use crate::reply::{
    parse_line, parse_pairs, ReplyValues, CODE_INVALID_COMMAND, CODE_SUCCESS, CODE_USAGE,
    HANGUP_MARKER,
};

/// Line the peer sends asynchronously when the channel hangs up.
const HANGUP_LINE: &str = "HANGUP";

/// Outcome of one AGI command round trip.
///
/// Session termination is a distinct variant, not an error: callers must
/// branch explicitly on "ended" vs "failed" vs "succeeded".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A 200 reply with its parsed `key=value(data)` pairs.
    Success(ReplyValues),
    /// The session ended: peer hangup notification, in-band hangup marker,
    /// or a broken connection on write.
    Hangup,
}

impl Reply {
    /// Whether the session ended.
    pub fn is_hangup(&self) -> bool {
        matches!(self, Self::Hangup)
    }

    /// The parsed values of a successful reply, if any.
    pub fn values(self) -> Option<ReplyValues> {
        match self {
            Self::Success(values) => Some(values),
            Self::Hangup => None,
        }
    }
}

/// An AGI session over any async byte stream.
///
/// Reads the environment preamble, then drives a strict one-command,
/// one-reply exchange. Once a hangup has been observed, every subsequent
/// [`execute`](Self::execute) short-circuits to [`Reply::Hangup`] without
/// touching the stream.
pub struct AgiSession<S> {
    framed: Framed<S, LineCodec>,
    env: AgiEnv,
    hangup: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AgiSession<S> {
    /// Wrap a stream in a new session.
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::new()),
            env: AgiEnv::new(),
            hangup: false,
        }
    }

    /// The environment read by [`read_env`](Self::read_env).
    pub fn env(&self) -> &AgiEnv {
        &self.env
    }

    /// Whether a hangup has been observed on this session.
    pub fn hangup_received(&self) -> bool {
        self.hangup
    }

    async fn next_line(&mut self) -> Result<Option<String>, AgiError> {
        match self.framed.next().await {
            Some(line) => line.map(Some),
            None => Ok(None),
        }
    }

    /// Consume the `key: value` environment preamble up to the blank line.
    pub async fn read_env(&mut self) -> Result<&AgiEnv, AgiError> {
        loop {
            let line = self.next_line().await?.ok_or_else(|| {
                AgiError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream closed during environment preamble",
                ))
            })?;
            if line.is_empty() {
                break;
            }
            if line == HANGUP_LINE {
                self.hangup = true;
                continue;
            }
            self.env.insert_line(&line);
        }
        Ok(&self.env)
    }

    /// Send a command and read its reply.
    ///
    /// A write failure caused by a broken connection is remapped to
    /// [`Reply::Hangup`]; all other write failures propagate unchanged.
    pub async fn execute(&mut self, command: &AgiCommand) -> Result<Reply, AgiError> {
        if self.hangup {
            return Ok(Reply::Hangup);
        }
        tracing::trace!(command = %command, "sending AGI command");
        if let Err(e) = self.framed.send(command.encode()).await {
            return match &e {
                AgiError::Io(io) if is_broken_connection(io) => {
                    self.hangup = true;
                    Ok(Reply::Hangup)
                }
                _ => Err(e),
            };
        }
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply, AgiError> {
        let Some(line) = self.next_line().await? else {
            // The peer closed the stream instead of replying.
            self.hangup = true;
            return Ok(Reply::Hangup);
        };
        if line.trim() == HANGUP_LINE {
            self.hangup = true;
            return Ok(Reply::Hangup);
        }
        let reply = parse_line(&line)?;
        match reply.code {
            CODE_SUCCESS => {
                let pairs = parse_pairs(&reply.rest);
                for pair in &pairs {
                    if pair.data.as_deref() == Some(HANGUP_MARKER) {
                        self.hangup = true;
                        return Ok(Reply::Hangup);
                    }
                    if pair.key == "result" && pair.value == "-1" {
                        return Err(AgiError::App);
                    }
                }
                Ok(Reply::Success(ReplyValues::from_pairs(pairs)))
            }
            CODE_INVALID_COMMAND => Err(AgiError::InvalidCommand(line)),
            CODE_USAGE => {
                // The first 520 line is followed by free-form lines until a
                // line starting with 520 closes the block; the whole block
                // (both 520 lines included) is the usage message.
                let mut usage = vec![line];
                loop {
                    let cont = self.next_line().await?.ok_or_else(|| {
                        AgiError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "stream closed inside usage block",
                        ))
                    })?;
                    let done = cont.starts_with("520");
                    usage.push(cont);
                    if done {
                        break;
                    }
                }
                Err(AgiError::Usage(usage.join("\n")))
            }
            code => Err(AgiError::UnrecognizedResponse { code, line }),
        }
    }

    /// Read a channel variable.
    ///
    /// `result=0` means the variable is not set. `result=1` carries the value
    /// as parenthesized data; the literal `""` marker normalizes to the empty
    /// string. A hangup while fetching is not fatal and reads as "not set".
    pub async fn get_variable(&mut self, name: &str) -> Result<Option<String>, AgiError> {
        let reply = self
            .execute(&AgiCommand::GetVariable(name.to_string()))
            .await?;
        let Reply::Success(values) = reply else {
            return Ok(None);
        };
        let Some(result) = values.result() else {
            return Ok(None);
        };
        match result.value.as_str() {
            "1" => {
                let value = result.data.as_deref().unwrap_or("");
                Ok(Some(if value == "\"\"" {
                    String::new()
                } else {
                    value.to_string()
                }))
            }
            _ => Ok(None),
        }
    }

    /// Write a channel variable.
    ///
    /// A hangup reply is tolerated; nothing beyond protocol-level failures
    /// is checked.
    pub async fn set_variable(&mut self, name: &str, value: &str) -> Result<(), AgiError> {
        self.execute(&AgiCommand::SetVariable(
            name.to_string(),
            value.to_string(),
        ))
        .await?;
        Ok(())
    }
}

fn is_broken_connection(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    /// Session whose peer has already queued `script` and stays open.
    async fn scripted(script: &str) -> (AgiSession<DuplexStream>, DuplexStream) {
        let (local, mut remote) = tokio::io::duplex(16 * 1024);
        remote.write_all(script.as_bytes()).await.unwrap();
        (AgiSession::new(local), remote)
    }

    #[tokio::test]
    async fn reads_environment_preamble() {
        let (mut session, _remote) = scripted(
            "agi_network: yes\nagi_request: agi://10.0.0.1/callwatch\nagi_channel: SIP/100-0001\n\n",
        )
        .await;
        let env = session.read_env().await.unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(env.channel(), Some("SIP/100-0001"));
    }

    #[tokio::test]
    async fn get_variable_unset_returns_none() {
        let (mut session, _remote) = scripted("200 result=0\n").await;
        assert_eq!(session.get_variable("DIALSTATUS").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_variable_returns_value() {
        let (mut session, _remote) = scripted("200 result=1 (+4912345)\n").await;
        assert_eq!(
            session.get_variable("CALLERID(num)").await.unwrap(),
            Some("+4912345".to_string())
        );
    }

    #[tokio::test]
    async fn get_variable_empty_quote_marker_is_empty_string() {
        let (mut session, _remote) = scripted("200 result=1 (\"\")\n").await;
        assert_eq!(
            session.get_variable("INFO_TEXT").await.unwrap(),
            Some(String::new())
        );
    }

    #[tokio::test]
    async fn result_minus_one_is_app_error() {
        let (mut session, _remote) = scripted("200 result=-1\n").await;
        let err = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgiError::App));
    }

    #[tokio::test]
    async fn in_band_hangup_marker_is_hangup_not_value() {
        let (mut session, _remote) = scripted("200 result=1 (hangup)\n").await;
        let reply = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap();
        assert!(reply.is_hangup());
        assert!(session.hangup_received());

        // Every later send short-circuits without touching the stream.
        let reply = session
            .execute(&AgiCommand::GetVariable("Y".into()))
            .await
            .unwrap();
        assert!(reply.is_hangup());
    }

    #[tokio::test]
    async fn hangup_while_fetching_reads_as_unset() {
        let (mut session, _remote) = scripted("200 result=1 (hangup)\n").await;
        assert_eq!(session.get_variable("DIALSTATUS").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsolicited_hangup_line_ends_session() {
        let (mut session, _remote) = scripted("HANGUP\n").await;
        let reply = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap();
        assert!(reply.is_hangup());
    }

    #[tokio::test]
    async fn invalid_command_surfaces_raw_line() {
        let (mut session, _remote) = scripted("510 Invalid or unknown command\n").await;
        let err = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap_err();
        match err {
            AgiError::InvalidCommand(line) => {
                assert_eq!(line, "510 Invalid or unknown command")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn usage_error_collects_all_lines_in_order() {
        let script = "520 Invalid command syntax. Proper usage follows:\n\
                      Usage: GET VARIABLE <variablename>\n\
                      Returns 0 if variablename is not set.\n\
                      520 End of proper usage.\n";
        let (mut session, _remote) = scripted(script).await;
        let err = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap_err();
        match err {
            AgiError::Usage(usage) => {
                let lines: Vec<&str> = usage.lines().collect();
                assert_eq!(lines.len(), 4);
                assert!(lines[0].starts_with("520 Invalid"));
                assert_eq!(lines[1], "Usage: GET VARIABLE <variablename>");
                assert!(lines[3].starts_with("520 End"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unrecognized_code_is_an_error() {
        let (mut session, _remote) = scripted("404 not a thing\n").await;
        let err = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgiError::UnrecognizedResponse { code: 404, .. }
        ));
    }

    #[tokio::test]
    async fn peer_close_instead_of_reply_is_hangup() {
        let (local, remote) = tokio::io::duplex(4096);
        drop(remote);
        let mut session = AgiSession::new(local);
        let reply = session
            .execute(&AgiCommand::GetVariable("X".into()))
            .await
            .unwrap();
        assert!(reply.is_hangup());
    }

    /// A conforming peer: answers GET/SET VARIABLE from a variable store.
    async fn run_conforming_peer(remote: DuplexStream, mut vars: HashMap<String, String>) {
        let (read, mut write) = tokio::io::split(remote);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(rest) = line.strip_prefix("GET VARIABLE ") {
                let name = rest.trim().trim_matches('"');
                let reply = match vars.get(name) {
                    Some(value) => format!("200 result=1 ({value})\n"),
                    None => "200 result=0\n".to_string(),
                };
                write.write_all(reply.as_bytes()).await.unwrap();
            } else if let Some(rest) = line.strip_prefix("SET VARIABLE ") {
                let mut parts = rest.trim().splitn(2, "\" \"");
                let name = parts.next().unwrap_or("").trim_matches('"');
                let value = parts.next().unwrap_or("").trim_matches('"');
                vars.insert(name.to_string(), value.to_string());
                write.write_all(b"200 result=1\n").await.unwrap();
            } else {
                write
                    .write_all(b"510 Invalid or unknown command\n")
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_the_just_set_value() {
        let (local, remote) = tokio::io::duplex(4096);
        tokio::spawn(run_conforming_peer(remote, HashMap::new()));

        let mut session = AgiSession::new(local);
        session
            .set_variable("CALLWATCH_CALL_ID", "1700000000.42")
            .await
            .unwrap();
        assert_eq!(
            session.get_variable("CALLWATCH_CALL_ID").await.unwrap(),
            Some("1700000000.42".to_string())
        );
    }
}
