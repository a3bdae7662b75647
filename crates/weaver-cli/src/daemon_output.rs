//! Daemon response handling and output rendering.
//!
//! Owns reading the single framed [`RpcResponse`] the daemon sends back and
//! forwarding a rendered form of it to the CLI streams.

use std::io::{self, Write};
use std::process::ExitCode;

use weaver_daemon_types::{RpcResponse, read_frame_as};

use crate::{AppError, IoStreams, OutputContext, ResolvedOutputFormat, render_human_output};

/// Settings for rendering the daemon's response.
pub(crate) struct OutputSettings<'a> {
    pub(crate) format: ResolvedOutputFormat,
    pub(crate) context: &'a OutputContext,
    pub(crate) request_id: u64,
}

/// Reads the daemon's single response frame, renders it, and forwards it to
/// the CLI's output streams.
///
/// Returns [`ExitCode::SUCCESS`] for a successful result and
/// [`ExitCode::FAILURE`] for an error payload, mirroring a Unix-style
/// "did this succeed" exit status — the wire contract carries no numeric
/// process exit code of its own.
pub(crate) fn read_daemon_response<R, W, E, S>(
    connection: &mut R,
    io: &mut IoStreams<'_, S, W, E>,
    settings: OutputSettings<'_>,
) -> Result<ExitCode, AppError>
where
    R: io::Read,
    S: io::Read,
    W: Write,
    E: Write,
{
    let mut reader = io::BufReader::new(connection);
    let response: RpcResponse = read_frame_as(&mut reader).map_err(AppError::ReadResponse)?;

    if response.id != settings.request_id {
        return Err(AppError::MismatchedResponseId {
            expected: settings.request_id,
            actual: response.id,
        });
    }

    if let Some(error) = response.error {
        let rendered =
            serde_json::to_string_pretty(&error).unwrap_or_else(|_| error.message.clone());
        writeln!(io.stderr, "{rendered}").map_err(AppError::ForwardResponse)?;
        io.stderr.flush().map_err(AppError::ForwardResponse)?;
        return Ok(ExitCode::FAILURE);
    }

    let result = response.result.unwrap_or(serde_json::Value::Null);
    let payload = serde_json::to_string_pretty(&result).map_err(AppError::SerialiseRequest)?;
    let rendered = match settings.format {
        ResolvedOutputFormat::Human => render_human_output(settings.context, &payload),
        ResolvedOutputFormat::Json => None,
    };
    let body = rendered.unwrap_or(payload);
    writeln!(io.stdout, "{body}").map_err(AppError::ForwardResponse)?;
    io.stdout.flush().map_err(AppError::ForwardResponse)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use weaver_daemon_types::{PingResult, RpcErrorKind, RpcErrorPayload, write_frame};

    #[test]
    fn renders_a_successful_response_as_json() {
        let response = RpcResponse::ok(1, PingResult { pid: 42 }).expect("build response");
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &response).expect("write frame");

        let mut stdin = Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut io = IoStreams::new(&mut stdin, &mut stdout, &mut stderr, false);
        let context = OutputContext::new("ping", Vec::new());

        let exit = read_daemon_response(
            &mut Cursor::new(buffer),
            &mut io,
            OutputSettings {
                format: ResolvedOutputFormat::Json,
                context: &context,
                request_id: 1,
            },
        )
        .expect("reads response");

        assert_eq!(exit, ExitCode::SUCCESS);
        let rendered = String::from_utf8(stdout).expect("utf8 stdout");
        assert!(rendered.contains("\"pid\": 42"));
    }

    #[test]
    fn error_responses_exit_with_failure() {
        let error = RpcErrorPayload::new(RpcErrorKind::NotFound, "no such workspace");
        let response = RpcResponse::err(1, error);
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &response).expect("write frame");

        let mut stdin = Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut io = IoStreams::new(&mut stdin, &mut stdout, &mut stderr, false);
        let context = OutputContext::new("status", Vec::new());

        let exit = read_daemon_response(
            &mut Cursor::new(buffer),
            &mut io,
            OutputSettings {
                format: ResolvedOutputFormat::Json,
                context: &context,
                request_id: 1,
            },
        )
        .expect("reads response");

        assert_eq!(exit, ExitCode::FAILURE);
        let rendered = String::from_utf8(stderr).expect("utf8 stderr");
        assert!(rendered.contains("no such workspace"));
    }

    #[test]
    fn rejects_a_response_whose_id_does_not_match_the_request() {
        let response = RpcResponse::ok(7, PingResult { pid: 1 }).expect("build response");
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &response).expect("write frame");

        let mut stdin = Cursor::new(Vec::new());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut io = IoStreams::new(&mut stdin, &mut stdout, &mut stderr, false);
        let context = OutputContext::new("ping", Vec::new());

        let result = read_daemon_response(
            &mut Cursor::new(buffer),
            &mut io,
            OutputSettings {
                format: ResolvedOutputFormat::Json,
                context: &context,
                request_id: 1,
            },
        );

        assert!(matches!(
            result,
            Err(AppError::MismatchedResponseId {
                expected: 1,
                actual: 7
            })
        ));
    }
}
