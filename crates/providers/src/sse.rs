//! Server-sent-events plumbing shared by network adapters.
//!
//! Adapters hand a `reqwest::Response` plus a payload parser to
//! [`event_stream`]; the parser sees each complete `data:` payload and
//! returns zero or more stream events. A trailing `Done` is synthesized
//! if the wire never produced one.

use mc_domain::stream::StreamEvent;
use mc_domain::Result;

use crate::traits::EventStream;
use crate::util::from_reqwest;

/// Pull complete `data:` payloads out of an SSE buffer. Events are
/// delimited by `\n\n`; a trailing partial event stays buffered for the
/// next chunk.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);
        for line in block.lines() {
            if let Some(data) = line.trim().strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
    }
    payloads
}

/// Build an [`EventStream`] over an SSE response body.
pub(crate) fn event_stream<F>(response: reqwest::Response, mut parse: F) -> EventStream
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(e) => {
                    yield Err(from_reqwest(e));
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            for payload in drain_data_lines(&mut buffer) {
                for event in parse(&payload) {
                    done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }
        }

        // Body closed: flush whatever is left in the buffer.
        if !buffer.trim().is_empty() {
            buffer.push_str("\n\n");
            for payload in drain_data_lines(&mut buffer) {
                for event in parse(&payload) {
                    done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                text: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_events_are_drained() {
        let mut buf = String::from("event: m\ndata: one\n\ndata: two\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["one", "two"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_event_stays_buffered() {
        let mut buf = String::from("data: full\n\ndata: part");
        assert_eq!(drain_data_lines(&mut buf), vec!["full"]);
        assert_eq!(buf, "data: part");

        buf.push_str("ial\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["partial"]);
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut buf = String::from("id: 3\nretry: 100\ndata: keep\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["keep"]);
    }

    #[test]
    fn empty_payloads_are_dropped() {
        let mut buf = String::from("data:\n\ndata:   \n\n");
        assert!(drain_data_lines(&mut buf).is_empty());
    }
}
