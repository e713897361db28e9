// CLI integration tests for offline flows (ops, encode, decode, errors).
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_mailrpc");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stdout_json(output: &Output) -> Value {
    parse_json(std::str::from_utf8(&output.stdout).expect("utf8").trim())
}

fn stderr_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("json error line");
    parse_json(line)
}

const DELETE_REPLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:DeleteItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
      <m:ResponseMessages>
        <m:DeleteItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
        </m:DeleteItemResponseMessage>
        <m:DeleteItemResponseMessage ResponseClass="Error">
          <m:MessageText>The specified object was not found in the store.</m:MessageText>
          <m:ResponseCode>ErrorItemNotFound</m:ResponseCode>
        </m:DeleteItemResponseMessage>
      </m:ResponseMessages>
    </m:DeleteItemResponse>
  </s:Body>
</s:Envelope>"#;

#[test]
fn ops_lists_the_catalog() {
    let output = cmd().arg("ops").output().expect("ops");
    assert!(output.status.success());
    let value = stdout_json(&output);
    let operations = value["operations"].as_array().expect("operations");
    let delete = operations
        .iter()
        .find(|row| row["name"] == "DeleteItem")
        .expect("DeleteItem row");
    assert_eq!(delete["batch"], true);
    assert_eq!(delete["expected"], "per-target");
    assert_eq!(delete["targets"], "ItemIds");
    assert!(operations.iter().all(|row| row["id"] != "SendNotification"));
}

#[test]
fn encode_prints_the_request_document() {
    let output = cmd()
        .args([
            "encode",
            "DeleteItem",
            "--item",
            "a",
            "--item",
            "b",
            "--attr",
            "DeleteType=HardDelete",
            "--format",
            "json",
        ])
        .output()
        .expect("encode");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"DeleteItem":{"DeleteType":"HardDelete","ItemIds":[{"__type":"ItemId","Id":"a"},{"__type":"ItemId","Id":"b"}]}}"#
    );

    let output = cmd()
        .args([
            "encode",
            "GetFolder",
            "--distinguished",
            "inbox",
            "--shape",
            "id-only",
        ])
        .output()
        .expect("encode xml");
    assert!(output.status.success());
    let body = String::from_utf8_lossy(&output.stdout);
    assert!(body.contains("<m:FolderShape><t:BaseShape>IdOnly</t:BaseShape></m:FolderShape>"));
    assert!(body.contains(r#"<t:DistinguishedFolderId Id="inbox"/>"#));
}

#[test]
fn encode_applies_the_version_gate() {
    let output = cmd()
        .args([
            "encode",
            "MarkAsJunk",
            "--item",
            "a",
            "--attr",
            "IsJunk=true",
            "--attr",
            "MoveItem=true",
            "--server-version",
            "Exchange2010",
        ])
        .output()
        .expect("encode");
    assert_eq!(output.status.code(), Some(5));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "UnsupportedVersion");
    assert_eq!(err["error"]["operation"], "MarkAsJunk");
}

#[test]
fn encode_rejects_an_empty_batch() {
    let output = cmd()
        .args(["encode", "DeleteItem", "--attr", "DeleteType=HardDelete"])
        .output()
        .expect("encode");
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stderr_json(&output)["error"]["kind"], "EmptyBatch");
}

#[test]
fn encode_rejects_a_subscribe_without_a_subscription_kind() {
    let output = cmd()
        .args(["encode", "Subscribe", "--format", "json"])
        .output()
        .expect("encode");
    assert_eq!(output.status.code(), Some(3));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Validation");
    assert!(output.stdout.is_empty());
}

#[test]
fn decode_reads_a_file_and_keeps_every_outcome() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("reply.xml");
    std::fs::write(&path, DELETE_REPLY).expect("write reply");

    let output = cmd()
        .args([
            "decode",
            "DeleteItem",
            "--input",
            path.to_str().expect("path"),
            "--expect",
            "2",
        ])
        .output()
        .expect("decode");
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["operation"], "DeleteItem");
    assert_eq!(value["outcome"], "partial_failure");
    assert_eq!(value["messages"][0]["status"], "Success");
    assert_eq!(value["messages"][1]["index"], 1);
    assert_eq!(value["messages"][1]["code"], "ErrorItemNotFound");

    let output = cmd()
        .args([
            "decode",
            "DeleteItem",
            "--input",
            path.to_str().expect("path"),
            "--errors",
            "throw",
        ])
        .output()
        .expect("decode throw");
    assert_eq!(output.status.code(), Some(10));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Service");
    assert_eq!(err["error"]["index"], 1);
}

#[test]
fn decode_from_stdin_checks_the_expected_count() {
    let mut child = cmd()
        .args(["decode", "DeleteItem", "--expect", "3"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(DELETE_REPLY.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("decode");
    assert_eq!(output.status.code(), Some(8));
    assert_eq!(stderr_json(&output)["error"]["kind"], "ResponseCountMismatch");
}

#[test]
fn unknown_operation_is_a_usage_error() {
    let output = cmd()
        .args(["encode", "FrobnicateItem"])
        .output()
        .expect("encode");
    assert_eq!(output.status.code(), Some(2));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["hint"].as_str().expect("hint").contains("mailrpc ops"));
}

#[test]
fn bad_flag_reports_clap_usage_as_json() {
    let output = cmd()
        .args(["decode", "DeleteItem", "--bogus"])
        .output()
        .expect("decode");
    assert_eq!(output.status.code(), Some(2));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Usage");
    assert_eq!(err["error"]["hint"], "Try `mailrpc decode --help`.");
}

#[test]
fn version_reports_package_metadata() {
    let output = cmd().arg("version").output().expect("version");
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["name"], "mailrpc");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

/// Answers one connection per body, in order, and returns the request bodies.
fn serve_json(bodies: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/EWS/Exchange.asmx", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for body in bodies {
            let (mut stream, _) = listener.accept().expect("accept");
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .expect("timeout");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("head") == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut request = vec![0u8; content_length];
            reader.read_exact(&mut request).expect("body");
            requests.push(String::from_utf8_lossy(&request).to_string());
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .expect("reply");
        }
        requests
    });
    (url, handle)
}

#[test]
fn stream_unsubscribes_after_the_server_closes() {
    let (url, server) = serve_json(vec![
        r#"{"SubscribeResponse":{"ResponseMessages":[{"__type":"SubscribeResponseMessage","ResponseClass":"Success","ResponseCode":"NoError","SubscriptionId":"sub-3"}]}}"#,
        concat!(
            r#"{"GetStreamingEventsResponse":{"ResponseMessages":[{"__type":"GetStreamingEventsResponseMessage","ResponseClass":"Success","ResponseCode":"NoError","Notifications":[{"__type":"Notification","SubscriptionId":"sub-3","NewMailEvent":{"Watermark":"w1","ItemId":{"Id":"item-1"}}}]}]}}"#,
            "\n",
            r#"{"GetStreamingEventsResponse":{"ResponseMessages":[{"__type":"GetStreamingEventsResponseMessage","ResponseClass":"Success","ResponseCode":"NoError","ConnectionStatus":"Closed"}]}}"#,
            "\n"
        ),
        r#"{"UnsubscribeResponse":{"ResponseMessages":[{"__type":"UnsubscribeResponseMessage","ResponseClass":"Success","ResponseCode":"NoError"}]}}"#,
    ]);

    let output = cmd()
        .args(["stream", "--url", url.as_str(), "--distinguished", "inbox"])
        .output()
        .expect("stream");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let batches: Vec<Value> = stdout.lines().map(parse_json).collect();
    assert_eq!(batches.len(), 1);

    let requests = server.join().expect("server");
    assert_eq!(requests.len(), 3);
    assert!(requests[2].contains(r#""Unsubscribe":{"SubscriptionId":"sub-3"}"#));
}
