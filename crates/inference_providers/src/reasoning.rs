//! Reasoning extraction
//!
//! Some models inline their chain of thought in the text channel, wrapped in
//! `<thinking>...</thinking>`. [`ReasoningExtractor`] rewrites a normalized
//! event stream so text between the tags comes out as `ReasoningDelta` and
//! the tags themselves disappear.
//!
//! Tags may be split across deltas in any way. The scanner holds back the
//! longest trailing piece of text that could still become the tag it is
//! looking for, so the lookback never exceeds the tag length minus one.

use crate::StreamEvent;
use futures_util::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pub const DEFAULT_REASONING_TAG: &str = "thinking";

/// Incremental splitter for tagged reasoning text
#[derive(Debug, Clone)]
pub struct TagScanner {
    open_tag: String,
    close_tag: String,
    in_reasoning: bool,
    pending: String,
}

impl TagScanner {
    pub fn new(tag_name: &str) -> Self {
        Self {
            open_tag: format!("<{tag_name}>"),
            close_tag: format!("</{tag_name}>"),
            in_reasoning: false,
            pending: String::new(),
        }
    }

    /// Whether text is currently being routed to the reasoning channel
    pub fn in_reasoning(&self) -> bool {
        self.in_reasoning
    }

    /// Bytes held back waiting to see if they complete a tag
    pub fn buffered_len(&self) -> usize {
        self.pending.len()
    }

    fn current_tag(&self) -> &str {
        if self.in_reasoning {
            &self.close_tag
        } else {
            &self.open_tag
        }
    }

    fn event(&self, text: String) -> StreamEvent {
        if self.in_reasoning {
            StreamEvent::ReasoningDelta(text)
        } else {
            StreamEvent::TextDelta(text)
        }
    }

    /// Feed one text delta; returns whatever can be emitted safely
    pub fn push(&mut self, delta: &str) -> Vec<StreamEvent> {
        self.pending.push_str(delta);
        let mut events = Vec::new();

        loop {
            let tag = self.current_tag();
            let found = self.pending.find(tag).map(|idx| (idx, tag.len()));

            if let Some((idx, tag_len)) = found {
                if idx > 0 {
                    let before = self.pending[..idx].to_string();
                    events.push(self.event(before));
                }
                self.pending.drain(..idx + tag_len);
                self.in_reasoning = !self.in_reasoning;
                continue;
            }

            let keep = partial_tag_len(&self.pending, tag);
            let emit_len = self.pending.len() - keep;
            if emit_len > 0 {
                let text: String = self.pending.drain(..emit_len).collect();
                events.push(self.event(text));
            }
            return events;
        }
    }

    /// Release held-back text at end of stream; an unfinished tag is plain content
    pub fn flush(&mut self) -> Option<StreamEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.pending);
        Some(self.event(text))
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`
fn partial_tag_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .filter(|&k| k <= text.len() && tag.is_char_boundary(k))
        .find(|&k| text.ends_with(&tag[..k]))
        .unwrap_or(0)
}

/// Stream adapter splitting tagged reasoning out of `TextDelta`s.
///
/// `ReasoningDelta`s from upstream pass through untouched. Held-back text is
/// flushed before the terminal event; if the inner stream ends without one
/// (cancellation), nothing is flushed.
pub struct ReasoningExtractor<S> {
    inner: S,
    scanner: TagScanner,
    queue: VecDeque<StreamEvent>,
    finished: bool,
}

impl<S> ReasoningExtractor<S> {
    pub fn new(inner: S, tag_name: &str) -> Self {
        Self {
            inner,
            scanner: TagScanner::new(tag_name),
            queue: VecDeque::new(),
            finished: false,
        }
    }

    pub fn with_default_tag(inner: S) -> Self {
        Self::new(inner, DEFAULT_REASONING_TAG)
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S> Stream for ReasoningExtractor<S>
where
    S: Stream<Item = StreamEvent> + Unpin,
{
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.queue.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(StreamEvent::TextDelta(text))) => {
                    this.queue.extend(this.scanner.push(&text));
                }
                Poll::Ready(Some(StreamEvent::ReasoningDelta(text))) => {
                    this.queue.extend(this.scanner.flush());
                    this.queue.push_back(StreamEvent::ReasoningDelta(text));
                }
                Poll::Ready(Some(terminal)) => {
                    this.queue.extend(this.scanner.flush());
                    this.queue.push_back(terminal);
                    this.finished = true;
                }
                Poll::Ready(None) => {
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamErrorKind;
    use futures_util::{stream, StreamExt};

    /// Merge adjacent deltas of the same kind so tests compare content, not chunking
    fn coalesce(events: Vec<StreamEvent>) -> Vec<StreamEvent> {
        let mut out: Vec<StreamEvent> = Vec::new();
        for event in events {
            let merged = match (out.last_mut(), &event) {
                (Some(StreamEvent::TextDelta(acc)), StreamEvent::TextDelta(next))
                | (Some(StreamEvent::ReasoningDelta(acc)), StreamEvent::ReasoningDelta(next)) => {
                    acc.push_str(next);
                    true
                }
                _ => false,
            };
            if !merged {
                out.push(event);
            }
        }
        out
    }

    async fn extract(chunks: Vec<&str>) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = chunks
            .into_iter()
            .map(|c| StreamEvent::TextDelta(c.to_string()))
            .collect();
        events.push(StreamEvent::Done);

        ReasoningExtractor::with_default_tag(stream::iter(events))
            .collect()
            .await
    }

    fn expected_split() -> Vec<StreamEvent> {
        vec![
            StreamEvent::ReasoningDelta("abcd".to_string()),
            StreamEvent::TextDelta("ef".to_string()),
            StreamEvent::Done,
        ]
    }

    #[tokio::test]
    async fn test_extracts_reasoning_across_two_deltas() {
        let events = extract(vec!["<thinking>ab", "cd</thinking>ef"]).await;
        assert_eq!(coalesce(events), expected_split());
    }

    #[tokio::test]
    async fn test_extracts_reasoning_at_every_split_point() {
        let full = "<thinking>abcd</thinking>ef";
        for i in 0..=full.len() {
            let events = extract(vec![&full[..i], &full[i..]]).await;
            assert_eq!(coalesce(events), expected_split(), "split at {i}");
        }
    }

    #[tokio::test]
    async fn test_extracts_reasoning_at_every_three_way_split() {
        let full = "<thinking>abcd</thinking>ef";
        for i in 0..=full.len() {
            for j in i..=full.len() {
                let events = extract(vec![&full[..i], &full[i..j], &full[j..]]).await;
                assert_eq!(coalesce(events), expected_split(), "split at {i},{j}");
            }
        }
    }

    #[tokio::test]
    async fn test_one_character_at_a_time() {
        let full = "intro <thinking>plan</thinking> answer";
        let chunks: Vec<String> = full.chars().map(|c| c.to_string()).collect();
        let events = extract(chunks.iter().map(String::as_str).collect()).await;

        assert_eq!(
            coalesce(events),
            vec![
                StreamEvent::TextDelta("intro ".to_string()),
                StreamEvent::ReasoningDelta("plan".to_string()),
                StreamEvent::TextDelta(" answer".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_text_without_tags_passes_through_unchanged() {
        let events = extract(vec!["a < b", " and c > d"]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("a < b".to_string()),
                StreamEvent::TextDelta(" and c > d".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_unfinished_tag_is_flushed_as_text() {
        let events = extract(vec!["answer <thi"]).await;
        assert_eq!(
            coalesce(events),
            vec![
                StreamEvent::TextDelta("answer <thi".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_unclosed_reasoning_is_flushed_before_error() {
        let events: Vec<_> = ReasoningExtractor::with_default_tag(stream::iter(vec![
            StreamEvent::TextDelta("<thinking>half a thought</thi".to_string()),
            StreamEvent::Error {
                kind: StreamErrorKind::Connection,
                message: "reset".to_string(),
            },
        ]))
        .collect()
        .await;

        let events = coalesce(events);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::ReasoningDelta("half a thought</thi".to_string())
        );
        assert!(matches!(events[1], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_upstream_reasoning_passes_through() {
        let events: Vec<_> = ReasoningExtractor::with_default_tag(stream::iter(vec![
            StreamEvent::ReasoningDelta("native".to_string()),
            StreamEvent::TextDelta("text".to_string()),
            StreamEvent::Done,
        ]))
        .collect()
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningDelta("native".to_string()),
                StreamEvent::TextDelta("text".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_inner_end_without_terminal_does_not_flush() {
        let events: Vec<_> = ReasoningExtractor::with_default_tag(stream::iter(vec![
            StreamEvent::TextDelta("done <thin".to_string()),
        ]))
        .collect()
        .await;

        assert_eq!(events, vec![StreamEvent::TextDelta("done ".to_string())]);
    }

    #[test]
    fn test_lookback_is_bounded_by_tag_length() {
        let mut scanner = TagScanner::new("thinking");
        scanner.push("xxxxxxxx<thinking");
        assert_eq!(scanner.buffered_len(), "<thinking".len());

        scanner.push(">");
        assert!(scanner.in_reasoning());
        assert_eq!(scanner.buffered_len(), 0);

        scanner.push("abc</thinking");
        assert!(scanner.buffered_len() < "</thinking>".len());
    }

    #[test]
    fn test_custom_tag_name() {
        let mut scanner = TagScanner::new("reason");
        let events = scanner.push("<reason>why</reason>so");
        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningDelta("why".to_string()),
                StreamEvent::TextDelta("so".to_string()),
            ]
        );
    }

    #[test]
    fn test_multibyte_text_near_tag_boundary() {
        let mut scanner = TagScanner::new("thinking");
        let mut events = scanner.push("héllo <");
        events.extend(scanner.push("thinking>ñ</thinking>"));
        events.extend(scanner.flush());

        assert_eq!(
            coalesce(events),
            vec![
                StreamEvent::TextDelta("héllo ".to_string()),
                StreamEvent::ReasoningDelta("ñ".to_string()),
            ]
        );
    }
}
