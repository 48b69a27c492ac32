use crate::net::api::ApiClient;
use crate::net::Incoming;
use anyhow::Result;
use bytes::BytesMut;
use futures_util::StreamExt;
use pipegraph_core::{JobId, StreamEvent};
use std::io;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

#[derive(Debug, Default)]
pub struct SseCodec {
    data: Vec<String>,
    // bytes of `src` already known to hold no newline
    scanned: usize,
}

impl Decoder for SseCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let start = self.scanned.min(src.len());
            let Some(rel) = src[start..].iter().position(|b| *b == b'\n') else {
                self.scanned = src.len();
                return Ok(None);
            };
            let pos = start + rel;
            self.scanned = 0;
            let raw = src.split_to(pos + 1);
            let mut line = String::from_utf8_lossy(&raw[..pos]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                if self.data.is_empty() {
                    continue;
                }
                let payload = self.data.join("\n");
                self.data.clear();
                return Ok(Some(payload));
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // an event not terminated by a blank line is incomplete; drop it
        src.clear();
        self.data.clear();
        self.scanned = 0;
        Ok(None)
    }
}

pub fn spawn_stream(
    api: ApiClient,
    job: JobId,
    generation: u64,
    tx: UnboundedSender<Incoming>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(&api, &job, generation, &tx).await {
            tracing::info!(%job, generation, error = %e, "event stream failed");
            let _ = tx.send(Incoming::transport_error(generation, format!("{e:#}")));
        }
    })
}

async fn run(
    api: &ApiClient,
    job: &JobId,
    generation: u64,
    tx: &UnboundedSender<Incoming>,
) -> Result<()> {
    let resp = api.open_stream(job).await?;
    tracing::info!(%job, generation, "event stream connected");
    let _ = tx.send(Incoming::connected(generation));

    let body = resp
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
    let mut frames = FramedRead::new(StreamReader::new(body), SseCodec::default());

    while let Some(frame) = frames.next().await {
        let data = frame?;
        match serde_json::from_str::<StreamEvent>(&data) {
            Ok(ev) => {
                tracing::debug!(%job, kind = ev.kind_name(), "stream event");
                let last = matches!(ev, StreamEvent::Complete { .. } | StreamEvent::End);
                if tx.send(Incoming::event(generation, ev)).is_err() {
                    return Ok(());
                }
                if last {
                    return Ok(());
                }
            }
            Err(e) => {
                let _ = tx.send(Incoming::malformed(
                    generation,
                    format!("decode error: {e}"),
                ));
            }
        }
    }

    tracing::info!(%job, generation, "event stream closed by server");
    let _ = tx.send(Incoming::disconnected(generation));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&str]) -> Vec<String> {
        let mut codec = SseCodec::default();
        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk.as_bytes());
            while let Some(frame) = codec.decode(&mut buf).expect("decode") {
                out.push(frame);
            }
        }
        if let Some(frame) = codec.decode_eof(&mut buf).expect("eof") {
            out.push(frame);
        }
        out
    }

    #[test]
    fn splits_events_on_blank_lines() {
        let frames = decode_all(&["data: {\"type\":\"end\"}\n\ndata: {\"a\":1}\n\n"]);
        assert_eq!(frames, vec!["{\"type\":\"end\"}", "{\"a\":1}"]);
    }

    #[test]
    fn handles_events_split_across_chunks() {
        let frames = decode_all(&["da", "ta: {\"type\":", "\"end\"}\r\n", "\r\n"]);
        assert_eq!(frames, vec!["{\"type\":\"end\"}"]);
    }

    #[test]
    fn skips_comments_and_other_fields() {
        let frames = decode_all(&[
            ": keepalive 123\n\nretry: 3000\n\nid: 7\nevent: bm_event\ndata: x\n\n",
        ]);
        assert_eq!(frames, vec!["x"]);
    }

    #[test]
    fn joins_multiline_data() {
        let frames = decode_all(&["data: line one\ndata:line two\n\n"]);
        assert_eq!(frames, vec!["line one\nline two"]);
    }

    #[test]
    fn long_line_in_small_chunks_is_scanned_once() {
        let payload = format!("{{\"type\":\"progress\",\"pad\":\"{}\"}}", "x".repeat(4096));
        let body = format!("data: {payload}\n\n");
        let mut codec = SseCodec::default();
        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        for chunk in body.as_bytes().chunks(7) {
            buf.extend_from_slice(chunk);
            while let Some(frame) = codec.decode(&mut buf).expect("decode") {
                out.push(frame);
            }
            // everything still buffered has been looked at
            assert_eq!(codec.scanned, buf.len());
        }
        assert_eq!(out, vec![payload]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drops_unterminated_event_at_eof() {
        let frames = decode_all(&["data: complete\n\ndata: partial"]);
        assert_eq!(frames, vec!["complete"]);
    }
}
