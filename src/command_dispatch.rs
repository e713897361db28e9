//! Purpose: Hold top-level CLI command dispatch for `mailrpc`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command that talks to a service goes through `ServiceClient`.
//! Invariants: Helpers in `main.rs` remain the source of argument-to-request mapping.

use super::*;
use mailrpc::api::{
    CancelToken, ClientOptions, EventKind, EventStream, FixedVersion, HttpTransport,
    ReceiveOptions, ServiceClient, SessionState, SubscriptionMode, SubscriptionParams,
    SubscriptionSession, WireDocument, correlate,
};
use mailrpc::core::wire;
use result_json::{batch_json, event_batch_json, message_json, operation_json};
use std::time::Duration;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "mailrpc", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Ops => {
            let operations = catalog::ALL
                .iter()
                .map(|descriptor| operation_json(descriptor))
                .collect::<Vec<_>>();
            emit_json(json!({ "operations": operations }));
            Ok(RunOutcome::ok())
        }
        Command::Encode {
            operation,
            request,
            wire: wire_args,
        } => {
            let descriptor = find_operation(&operation)?;
            let version = parse_server_version(&wire_args.server_version)?;
            let request = build_request(descriptor, &request, wire_args.errors.into())?;
            request.validate()?;
            mailrpc::core::version::check(descriptor, version)?;
            let document = wire::encode(&request, wire_args.format.into())?;
            println!("{}", document.body);
            Ok(RunOutcome::ok())
        }
        Command::Decode {
            operation,
            input,
            expect,
            format,
            errors,
        } => {
            let descriptor = find_operation(&operation)?;
            let body = read_input(input.as_ref())?;
            let document = WireDocument::new(format.into(), body);
            let messages = wire::decode(&document, descriptor)?;
            let expected = expect.unwrap_or(messages.len());
            let result = correlate(descriptor, messages, expected, errors.into())?;
            emit_json(batch_json(&result));
            Ok(RunOutcome::ok())
        }
        Command::Call {
            operation,
            endpoint,
            request,
            wire: wire_args,
        } => {
            let descriptor = find_operation(&operation)?;
            let version = parse_server_version(&wire_args.server_version)?;
            let request = build_request(descriptor, &request, wire_args.errors.into())?;
            let client = ServiceClient::new(http_transport(&endpoint)?, FixedVersion(version))
                .with_options(ClientOptions::new().with_format(wire_args.format.into()));
            if descriptor.is_batch() {
                let result = client.execute_batch(&request)?;
                emit_json(batch_json(&result));
            } else {
                let message = client.execute(&request)?;
                emit_json(message_json(&message));
            }
            Ok(RunOutcome::ok())
        }
        Command::Stream {
            endpoint,
            folders,
            distinguished,
            events,
            server_version,
            heartbeat,
            connection_timeout,
            max_batches,
        } => {
            let version = parse_server_version(&server_version)?;
            let kinds = if events.is_empty() {
                vec![EventKind::NewMail]
            } else {
                events
                    .iter()
                    .map(|event| event.parse::<EventKind>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let targets = folders
                .iter()
                .map(TargetId::folder)
                .chain(distinguished.iter().map(TargetId::distinguished));
            let params = SubscriptionParams::new(targets).with_event_kinds(kinds);

            let client = ServiceClient::new(http_transport(&endpoint)?, FixedVersion(version))
                .with_options(ClientOptions::new().with_format(WireFormat::ObjectNotation));
            let mut session = SubscriptionSession::new(SubscriptionMode::Streaming, params);
            session.subscribe(&client)?;

            let cancel = CancelToken::new();
            signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.flag()).map_err(
                |err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to install Ctrl-C handler")
                        .with_source(err)
                },
            )?;
            let options = ReceiveOptions::new()
                .with_heartbeat(Duration::from_secs(heartbeat))
                .with_connection_timeout(connection_timeout)
                .with_cancel(cancel);

            let streamed = session
                .receive(&client, options)
                .and_then(|stream| emit_batches(stream, max_batches));
            release_subscription(&mut session, &client);
            streamed?;
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_batches(stream: EventStream<'_>, max_batches: Option<usize>) -> Result<(), Error> {
    let mut delivered = 0usize;
    for batch in stream {
        emit_json_line(&event_batch_json(&batch?));
        delivered += 1;
        if max_batches.is_some_and(|max| delivered >= max) {
            break;
        }
    }
    Ok(())
}

/// Ends the server-side subscription however the stream stopped; failures are only logged.
fn release_subscription(
    session: &mut SubscriptionSession,
    client: &ServiceClient<HttpTransport, FixedVersion>,
) {
    let released = match (session.state(), session.id()) {
        (SessionState::Active, _) => session.unsubscribe(client),
        (_, Some(id)) => {
            let request =
                ServiceRequest::new(&catalog::UNSUBSCRIBE, ErrorHandlingMode::ThrowOnFirstError)
                    .with_field("SubscriptionId", id);
            client.execute(&request).map(|_| ())
        }
        (_, None) => Ok(()),
    };
    if let Err(err) = released {
        tracing::warn!(
            subscription = session.id().unwrap_or_default(),
            kind = ?err.kind(),
            "unsubscribe failed"
        );
    }
}

fn http_transport(endpoint: &EndpointArgs) -> Result<HttpTransport, Error> {
    let transport = HttpTransport::new(endpoint.url.as_str())?;
    Ok(match &endpoint.token {
        Some(token) => transport.with_token(token.as_str()),
        None => transport,
    })
}
