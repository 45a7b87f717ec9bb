//! Server-Sent Events support

use crate::runtime::OutboundEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a session's broadcast channel into an SSE stream
pub fn reply_stream(
    broadcast_rx: tokio::sync::broadcast::Receiver<OutboundEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(outbound_to_sse(&event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn outbound_to_sse(event: &OutboundEvent) -> Event {
    let name = match event {
        OutboundEvent::Reply { .. } => "reply",
        OutboundEvent::EditControl { .. } => "edit_control",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}
