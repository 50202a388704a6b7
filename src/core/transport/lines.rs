//! Newline-delimited JSON-RPC loop shared by the stdio and tcp transports.
//!
//! One frame is read, handled to completion and its response written before
//! the next frame is read. Blank lines are skipped. End of input ends the
//! loop without error.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use super::TransportResult;
use crate::core::McpServer;

/// Serve frames from `reader` until end of input. Returns the number of
/// frames handled.
///
/// Frames are read as raw bytes so that a frame which is not valid UTF-8
/// gets a decode error response like any other malformed input.
pub async fn serve_lines<R, W>(
    server: &McpServer,
    mut reader: R,
    mut writer: W,
) -> TransportResult<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::new();
    let mut handled = 0;

    loop {
        frame.clear();
        if reader.read_until(b'\n', &mut frame).await? == 0 {
            break;
        }
        let bytes = frame.trim_ascii();
        if bytes.is_empty() {
            continue;
        }
        handled += 1;
        debug!("Received frame ({} bytes)", bytes.len());

        let Some(response) = server.handle_bytes(bytes).await else {
            continue;
        };
        let encoded = match response.to_line() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode response: {}", e);
                continue;
            }
        };

        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    debug!("End of input after {} frame(s)", handled);
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::config::Config;
    use crate::domains::jira::{JiraAuth, JiraClient};
    use crate::domains::tools::build_tool_registry;
    use serde_json::Value;
    use tokio::io::BufReader;

    fn test_server() -> McpServer {
        let client = JiraClient::new(
            "http://127.0.0.1:1",
            JiraAuth::Bearer("token".into()),
            Duration::from_secs(1),
        );
        McpServer::with_parts(Config::default(), client, build_tool_registry().unwrap())
    }

    fn responses(output: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_one_response_per_request_in_order() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
            "this is not json\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nonexistent_tool"}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#,
        );
        let server = test_server();
        let mut output = Vec::new();

        let handled = serve_lines(&server, BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        assert_eq!(handled, 6);

        let responses = responses(&output);
        assert_eq!(responses.len(), 5);
        let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&Value::from(1), &Value::from(2), &Value::Null, &Value::from(3), &Value::from(4)]);
        assert_eq!(responses[2]["error"]["kind"], "TransportDecodeError");
        assert_eq!(responses[3]["error"]["kind"], "ToolNotFound");
        for response in &responses {
            assert_eq!(response["jsonrpc"], "2.0");
            assert!(response.get("result").is_some() != response.get("error").is_some());
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_keeps_loop_running() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n{\"jsonrpc\":\"2.0\",\"method\":\"\xff\xfe\"}\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#);
        input.push(b'\n');

        let server = test_server();
        let mut output = Vec::new();
        let handled = serve_lines(&server, BufReader::new(&input[..]), &mut output)
            .await
            .unwrap();
        assert_eq!(handled, 3);

        let responses = responses(&output);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert!(responses[0]["result"].is_object());
        assert_eq!(responses[1]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["kind"], "TransportDecodeError");
        assert_eq!(responses[1]["error"]["code"], -32700);
        assert_eq!(responses[2]["id"], 3);
        assert!(responses[2]["result"].is_object());
    }

    #[tokio::test]
    async fn test_empty_input_ends_cleanly() {
        let server = test_server();
        let mut output = Vec::new();
        let handled = serve_lines(&server, BufReader::new(&b""[..]), &mut output).await;
        tokio_test::assert_ok!(&handled);
        assert_eq!(handled.unwrap(), 0);
        assert!(output.is_empty());
    }
}
