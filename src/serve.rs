//! Line-oriented stdio transport
//!
//! One JSON command envelope per stdin line in, one JSON response envelope
//! per stdout line out. Commands run concurrently, so responses are written
//! in completion order.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error};

use kubecmd_dispatch::{CommandDispatcher, Response};

pub async fn serve(dispatcher: CommandDispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut tasks: JoinSet<Response> = JoinSet::new();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let dispatcher = dispatcher.clone();
                        tasks.spawn(async move { dispatcher.dispatch_json(line.as_bytes()).await });
                    }
                    None => {
                        debug!(pending = tasks.len(), "stdin closed");
                        input_open = false;
                    }
                }
            }

            Some(joined) = tasks.join_next() => {
                match joined {
                    Ok(response) => write_response(&mut stdout, &response).await?,
                    Err(e) => error!(error = %e, "Command task failed"),
                }
            }

            else => break,
        }
    }

    Ok(())
}

/// Write one response as a single JSON line
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response).context("Failed to encode response")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubecmd_dispatch::Error;

    #[tokio::test]
    async fn test_write_response_is_one_line() {
        let mut out: Vec<u8> = Vec::new();
        let response = Response::failure(&Error::UnsupportedCommand("explode".to_string()));
        write_response(&mut out, &response).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"success\":false,\"error\":\"unsupported command type: explode\"}\n"
        );
    }
}
