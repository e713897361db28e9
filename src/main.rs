//! Purpose: `mailrpc` CLI entry point: argument parsing, output and error emission.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Diagnostics go through `tracing` to stderr; stdout stays machine-readable.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use mailrpc::api::{
    BaseShape, Error, ErrorHandlingMode, ErrorKind, ProtocolVersion, ResponseObjectKind,
    ServiceRequest, Shape, TargetId, WireFormat, to_exit_code,
};
use mailrpc::core::catalog;
use mailrpc::core::operation::OperationDescriptor;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod result_json;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(clap_error_hint(&err)));
            }
        },
    };

    init_tracing();
    command_dispatch::dispatch_command(cli.command).map_err(with_default_hint)
}

#[derive(Parser)]
#[command(
    name = "mailrpc",
    version,
    about = "Batch, encode and stream calls against a mailbox object service",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Requests are built from an operation name plus targets, attributes and fields.

Mental model:
  - `encode` shows the document a request would send
  - `decode` correlates a response document to its targets
  - `call` does both over HTTP
"#,
    after_help = r#"EXAMPLES
  $ mailrpc ops
  $ mailrpc encode DeleteItem --item AAMk1 --item AAMk2 --attr DeleteType=HardDelete
  $ mailrpc decode DeleteItem --input reply.xml --expect 2 --errors return
  $ mailrpc call GetFolder --url https://mail.example.com/EWS/Exchange.asmx \
      --distinguished inbox --shape id-only

LEARN MORE
  $ mailrpc <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatCli {
    Xml,
    Json,
}

impl From<FormatCli> for WireFormat {
    fn from(value: FormatCli) -> Self {
        match value {
            FormatCli::Xml => WireFormat::Markup,
            FormatCli::Json => WireFormat::ObjectNotation,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ErrorsCli {
    /// Abort on the first per-item error.
    Throw,
    /// Return every per-item outcome.
    Return,
}

impl From<ErrorsCli> for ErrorHandlingMode {
    fn from(value: ErrorsCli) -> Self {
        match value {
            ErrorsCli::Throw => ErrorHandlingMode::ThrowOnFirstError,
            ErrorsCli::Return => ErrorHandlingMode::ReturnAllResults,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShapeCli {
    IdOnly,
    Default,
    AllProperties,
}

impl From<ShapeCli> for BaseShape {
    fn from(value: ShapeCli) -> Self {
        match value {
            ShapeCli::IdOnly => BaseShape::IdOnly,
            ShapeCli::Default => BaseShape::Default,
            ShapeCli::AllProperties => BaseShape::AllProperties,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "List the operation catalog",
        after_help = r#"EXAMPLES
  $ mailrpc ops
  $ mailrpc ops | jq '.operations[] | select(.batch)'"#
    )]
    Ops,
    #[command(
        arg_required_else_help = true,
        about = "Print the request document for an operation",
        long_about = r#"Build, validate and version-gate a request, then print the document.

Nothing is sent. Targets, attributes and fields are checked against the operation."#,
        after_help = r#"EXAMPLES
  $ mailrpc encode MoveItem --item AAMk1 --distinguished-field ToFolderId=archive
  $ mailrpc encode GetItem --item AAMk1 --shape id-only --property item:Subject --format json
  $ mailrpc encode EmptyFolder --distinguished inbox --attr DeleteType=SoftDelete \
      --attr DeleteSubFolders=false --server-version Exchange2010"#
    )]
    Encode {
        #[arg(help = "Operation name (see `mailrpc ops`)")]
        operation: String,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        wire: WireArgs,
    },
    #[command(
        arg_required_else_help = true,
        about = "Correlate a response document to its targets",
        long_about = r#"Decode a response document and print one entry per target.

Reads from --input or stdin. The count check uses --expect (default: however many
messages the document carries)."#,
        after_help = r#"EXAMPLES
  $ mailrpc decode DeleteItem --input reply.xml --expect 3 --errors return
  $ cat reply.json | mailrpc decode GetFolder --format json"#
    )]
    Decode {
        #[arg(help = "Operation name (see `mailrpc ops`)")]
        operation: String,
        #[arg(long, help = "Response document path (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
        #[arg(long, help = "Number of response messages the request expects")]
        expect: Option<usize>,
        #[arg(long, value_enum, default_value = "xml", help = "Document format")]
        format: FormatCli,
        #[arg(long, value_enum, default_value = "return", help = "Per-item error handling")]
        errors: ErrorsCli,
    },
    #[command(
        arg_required_else_help = true,
        about = "Send one request to an endpoint",
        after_help = r#"EXAMPLES
  $ mailrpc call DeleteItem --url https://mail.example.com/EWS/Exchange.asmx \
      --item AAMk1 --item AAMk2 --attr DeleteType=MoveToDeletedItems --errors return
  $ mailrpc call GetDelegate --url https://mail.example.com/EWS/Exchange.asmx \
      --user alice@example.com --attr IncludePermissions=true --field Mailbox=boss@example.com"#
    )]
    Call {
        #[arg(help = "Operation name (see `mailrpc ops`)")]
        operation: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        wire: WireArgs,
    },
    #[command(
        arg_required_else_help = true,
        about = "Open a streaming subscription and print event batches",
        long_about = r#"Subscribe to folders and print each notification batch as one JSON line.

Ends on Ctrl-C, when the server closes the connection, after --heartbeat seconds
without any traffic, or after --max-batches batches."#,
        after_help = r#"EXAMPLES
  $ mailrpc stream --url https://mail.example.com/EWS/Exchange.asmx --distinguished inbox
  $ mailrpc stream --url https://mail.example.com/EWS/Exchange.asmx --folder AQMk1 \
      --event created --event deleted --max-batches 5"#
    )]
    Stream {
        #[command(flatten)]
        endpoint: EndpointArgs,
        #[arg(long = "folder", help = "Folder id to watch (repeatable)")]
        folders: Vec<String>,
        #[arg(long = "distinguished", help = "Well-known folder name to watch (repeatable)")]
        distinguished: Vec<String>,
        #[arg(long = "event", help = "Event type, e.g. newmail, created (repeatable; default: newmail)")]
        events: Vec<String>,
        #[arg(long, default_value = "Exchange2016", help = "Negotiated server version")]
        server_version: String,
        #[arg(long, default_value_t = 120, help = "Seconds without traffic before the stream ends")]
        heartbeat: u64,
        #[arg(long, default_value_t = 30, help = "Server connection timeout in minutes (1-30)")]
        connection_timeout: u32,
        #[arg(long, help = "Stop after this many batches")]
        max_batches: Option<usize>,
    },
    #[command(about = "Print version info")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ mailrpc completion bash > ~/.local/share/bash-completion/completions/mailrpc
  $ mailrpc completion zsh > ~/.zfunc/_mailrpc
  $ mailrpc completion fish > ~/.config/fish/completions/mailrpc.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct EndpointArgs {
    #[arg(long, help = "Service endpoint URL", value_hint = ValueHint::Url)]
    url: String,
    #[arg(long, help = "Bearer token sent with each request")]
    token: Option<String>,
}

#[derive(Args)]
struct RequestArgs {
    #[arg(long = "item", help = "Item id target (repeatable)")]
    items: Vec<String>,
    #[arg(long = "folder", help = "Folder id target (repeatable)")]
    folders: Vec<String>,
    #[arg(long = "distinguished", help = "Well-known folder target, e.g. inbox (repeatable)")]
    distinguished: Vec<String>,
    #[arg(long = "user", help = "Delegate user SMTP address target (repeatable)")]
    users: Vec<String>,
    #[arg(long = "respond", help = "Response object target KIND:ITEM_ID, e.g. accept:AAMk1")]
    respond: Vec<String>,
    #[arg(long = "attr", help = "Root attribute K=V (repeatable)")]
    attrs: Vec<String>,
    #[arg(long = "field", help = "Text field K=V (repeatable)")]
    fields: Vec<String>,
    #[arg(long = "folder-field", help = "Folder-valued field K=FOLDER_ID (repeatable)")]
    folder_fields: Vec<String>,
    #[arg(
        long = "distinguished-field",
        help = "Folder-valued field K=WELL_KNOWN_NAME (repeatable)"
    )]
    distinguished_fields: Vec<String>,
    #[arg(long, value_enum, help = "Base shape for Get operations")]
    shape: Option<ShapeCli>,
    #[arg(long = "property", help = "Additional shape property path (repeatable)")]
    properties: Vec<String>,
}

#[derive(Args)]
struct WireArgs {
    #[arg(long, value_enum, default_value = "xml", help = "Wire format")]
    format: FormatCli,
    #[arg(long, default_value = "Exchange2016", help = "Negotiated server version")]
    server_version: String,
    #[arg(long, value_enum, default_value = "throw", help = "Per-item error handling")]
    errors: ErrorsCli,
}

fn find_operation(name: &str) -> Result<&'static OperationDescriptor, Error> {
    catalog::find(name).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unknown operation: {name}"))
            .with_hint("Run `mailrpc ops` to list operations.")
    })
}

fn parse_pair(input: &str, flag: &str) -> Result<(String, String), Error> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{flag} expects K=V, got `{input}`"))
            .with_hint(format!("Use {flag} Name=value."))),
    }
}

fn parse_response_object(input: &str) -> Result<TargetId, Error> {
    let (kind, item) = input.split_once(':').ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("--respond expects KIND:ITEM_ID, got `{input}`"))
    })?;
    let kind = match kind.to_ascii_lowercase().as_str() {
        "accept" => ResponseObjectKind::Accept,
        "tentative" | "tentativelyaccept" => ResponseObjectKind::TentativelyAccept,
        "decline" => ResponseObjectKind::Decline,
        "reply" => ResponseObjectKind::Reply,
        "replyall" | "reply-all" => ResponseObjectKind::ReplyAll,
        "forward" => ResponseObjectKind::Forward,
        "cancel" => ResponseObjectKind::CancelCalendarItem,
        "remove" => ResponseObjectKind::Remove,
        "suppress-read-receipt" => ResponseObjectKind::SuppressReadReceipt,
        other => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown response object kind: {other}"))
                .with_hint("Use accept, tentative, decline, reply, replyall, forward, cancel, remove or suppress-read-receipt."));
        }
    };
    Ok(TargetId::response_object(kind, item))
}

fn parse_server_version(input: &str) -> Result<ProtocolVersion, Error> {
    input.parse::<ProtocolVersion>().map_err(|err| {
        let names = ProtocolVersion::ALL
            .iter()
            .map(|version| version.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        err.with_hint(format!("Known versions: {names}."))
    })
}

fn build_request(
    descriptor: &'static OperationDescriptor,
    args: &RequestArgs,
    mode: ErrorHandlingMode,
) -> Result<ServiceRequest, Error> {
    let mut request = ServiceRequest::new(descriptor, mode);
    for attr in &args.attrs {
        let (key, value) = parse_pair(attr, "--attr")?;
        request = request.with_attribute(key, value);
    }
    for field in &args.fields {
        let (key, value) = parse_pair(field, "--field")?;
        request = request.with_field(key, value);
    }
    for field in &args.folder_fields {
        let (key, value) = parse_pair(field, "--folder-field")?;
        request = request.with_folder_field(key, &TargetId::folder(value));
    }
    for field in &args.distinguished_fields {
        let (key, value) = parse_pair(field, "--distinguished-field")?;
        request = request.with_folder_field(key, &TargetId::distinguished(value));
    }
    if let Some(shape) = args.shape {
        let mut value = Shape::new(shape.into());
        for property in &args.properties {
            value = value.with_property(property.as_str());
        }
        request = request.with_shape(value);
    } else if !args.properties.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--property requires --shape")
            .with_hint("Add --shape id-only (or default, all-properties)."));
    }

    request = request
        .with_targets(args.items.iter().map(TargetId::item))
        .with_targets(args.folders.iter().map(TargetId::folder))
        .with_targets(args.distinguished.iter().map(TargetId::distinguished))
        .with_targets(args.users.iter().map(TargetId::user));
    for respond in &args.respond {
        request = request.with_target(parse_response_object(respond)?);
    }
    Ok(request)
}

fn read_input(path: Option<&PathBuf>) -> Result<String, Error> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        }),
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            Ok(body)
        }
    }
}

/// Fills in a CLI-level hint for kinds whose remedy is a flag or an environment knob.
fn with_default_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    let hint = match err.kind() {
        ErrorKind::Transport => {
            "Check --url and network reachability; set RUST_LOG=debug to trace requests."
        }
        ErrorKind::UnsupportedVersion => {
            "Pass the server's negotiated version with --server-version."
        }
        ErrorKind::MalformedResponse | ErrorKind::ProtocolMismatch => {
            "Run `mailrpc decode` on the saved reply to inspect it."
        }
        ErrorKind::Internal => "Unexpected internal failure. Retry with RUST_BACKTRACE=1.",
        _ => return err,
    };
    err.with_hint(hint)
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("mailrpc {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "mailrpc",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_json_line(value: &Value) {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// Everything an error carries, flattened for stderr.
struct ErrorReport {
    kind: &'static str,
    message: String,
    details: Vec<(&'static str, Value)>,
    causes: Vec<String>,
}

impl ErrorReport {
    fn new(err: &Error) -> Self {
        let mut details = Vec::new();
        if let Some(hint) = err.hint() {
            details.push(("hint", json!(hint)));
        }
        if let Some(operation) = err.operation() {
            details.push(("operation", json!(operation)));
        }
        if let Some(index) = err.index() {
            details.push(("index", json!(index)));
        }
        if let Some(code) = err.code() {
            details.push(("code", json!(code)));
        }
        let causes = std::iter::successors(err.source(), |source: &&(dyn StdError + 'static)| (*source).source())
            .map(ToString::to_string)
            .collect();
        Self {
            kind: err.kind().as_str(),
            message: error_message(err),
            details,
            causes,
        }
    }

    fn to_json(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("kind".to_string(), json!(self.kind));
        inner.insert("message".to_string(), json!(self.message));
        for (key, value) in &self.details {
            inner.insert((*key).to_string(), value.clone());
        }
        if !self.causes.is_empty() {
            inner.insert("causes".to_string(), json!(self.causes));
        }
        json!({ "error": inner })
    }

    fn to_text(&self) -> String {
        let mut text = format!("error: {} ({})", self.message, self.kind);
        for (key, value) in &self.details {
            let value = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            text.push_str(&format!("\n  {key}: {value}"));
        }
        for cause in &self.causes {
            text.push_str(&format!("\n  caused by: {cause}"));
        }
        text
    }
}

/// Text on an interactive stderr, one JSON object otherwise.
fn emit_error(err: &Error) {
    let report = ErrorReport::new(err);
    if io::stderr().is_terminal() {
        eprintln!("{}", report.to_text());
    } else {
        eprintln!("{}", report.to_json());
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    let Some(usage) = usage else {
        return "Try `mailrpc --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "mailrpc") else {
        return "Try `mailrpc --help`.".to_string();
    };
    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();
    if parts.is_empty() {
        return "Try `mailrpc --help`.".to_string();
    }
    format!("Try `mailrpc {} --help`.", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{
        ErrorReport, RequestArgs, build_request, parse_pair, parse_response_object,
        with_default_hint,
    };
    use mailrpc::api::{Error, ErrorHandlingMode, ErrorKind, TargetId};
    use mailrpc::core::catalog;

    fn empty_args() -> RequestArgs {
        RequestArgs {
            items: Vec::new(),
            folders: Vec::new(),
            distinguished: Vec::new(),
            users: Vec::new(),
            respond: Vec::new(),
            attrs: Vec::new(),
            fields: Vec::new(),
            folder_fields: Vec::new(),
            distinguished_fields: Vec::new(),
            shape: None,
            properties: Vec::new(),
        }
    }

    #[test]
    fn parse_pair_splits_on_first_equals() {
        let (key, value) = parse_pair("Mailbox=a=b@example.com", "--field").expect("pair");
        assert_eq!(key, "Mailbox");
        assert_eq!(value, "a=b@example.com");
        let err = parse_pair("=x", "--field").expect_err("empty key");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn respond_flag_builds_response_object_target() {
        let target = parse_response_object("decline:AAMk1").expect("target");
        assert_eq!(target.describe(), "AAMk1");
        let err = parse_response_object("shrug:AAMk1").expect_err("kind");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn build_request_keeps_target_order_by_flag_group() {
        let mut args = empty_args();
        args.items = vec!["a".to_string(), "b".to_string()];
        args.attrs = vec!["DeleteType=HardDelete".to_string()];
        let request = build_request(
            &catalog::DELETE_ITEM,
            &args,
            ErrorHandlingMode::ReturnAllResults,
        )
        .expect("request");
        assert_eq!(request.targets().len(), 2);
        assert_eq!(request.targets().get(0), Some(&TargetId::item("a")));
        request.validate().expect("valid");
    }

    #[test]
    fn property_without_shape_is_usage_error() {
        let mut args = empty_args();
        args.properties = vec!["item:Subject".to_string()];
        let err = build_request(&catalog::GET_ITEM, &args, ErrorHandlingMode::ThrowOnFirstError)
            .expect_err("shape");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn error_report_lists_details_and_every_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::new(ErrorKind::Service)
            .with_operation("MoveItem")
            .with_index(2)
            .with_code("ErrorItemNotFound")
            .with_message("not found")
            .with_source(io);
        let report = ErrorReport::new(&err);

        let value = report.to_json();
        assert_eq!(value["error"]["kind"], "Service");
        assert_eq!(value["error"]["index"], 2);
        assert_eq!(value["error"]["code"], "ErrorItemNotFound");
        assert_eq!(value["error"]["causes"][0], "refused");

        let text = report.to_text();
        assert!(text.starts_with("error: not found (Service)"));
        assert!(text.contains("\n  operation: MoveItem"));
        assert!(text.contains("\n  index: 2"));
        assert!(text.ends_with("caused by: refused"));
    }

    #[test]
    fn default_hint_never_replaces_an_existing_one() {
        let err = with_default_hint(Error::new(ErrorKind::Transport));
        assert!(err.hint().unwrap_or_default().contains("--url"));
        let err = with_default_hint(Error::new(ErrorKind::Transport).with_hint("keep me"));
        assert_eq!(err.hint(), Some("keep me"));
        assert_eq!(with_default_hint(Error::new(ErrorKind::Validation)).hint(), None);
    }
}
