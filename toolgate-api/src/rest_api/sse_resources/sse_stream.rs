/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Server-sent event stream plumbing.

use actix_web::HttpResponse;
use actix_web::web::Bytes;
use tokio::sync::broadcast;
use toolgate_core::gateway::BusEvent;
use toolgate_store::time;

/// Heartbeat interval of an idle stream.
const HEARTBEAT_INTERVAL_MICROS: u64 = 30_000_000;

/// Per-connection state of one subscriber.
struct SseConnection {
    receiver: broadcast::Receiver<BusEvent>,
    heartbeat: tokio::time::Interval,
    done: bool,
}

/// Build the `text/event-stream` response for one subscriber.
///
/// Events are framed as `event: <type>\ndata: <json>\n\n` with a heartbeat
/// every 30 seconds. A subscriber that lags behind the fan-out buffer is
/// disconnected; after the final `shutdown` event the stream ends.
pub fn sse_response(receiver: broadcast::Receiver<BusEvent>) -> HttpResponse {
    let first_heartbeat = tokio::time::Instant::now()
        + tokio::time::Duration::from_micros(HEARTBEAT_INTERVAL_MICROS);
    let connection = SseConnection {
        receiver,
        heartbeat: tokio::time::interval_at(
            first_heartbeat,
            tokio::time::Duration::from_micros(HEARTBEAT_INTERVAL_MICROS),
        ),
        done: false,
    };
    let stream = futures::stream::unfold(connection, |mut connection| async move {
        if connection.done {
            return None;
        }
        tokio::select! {
            _ = connection.heartbeat.tick() => {
                let frame = format!(
                    "event: heartbeat\ndata: {{\"ts\":\"{}\"}}\n\n",
                    time::as_rfc3339(time::get_timestamp_micros())
                );
                Some((Ok::<Bytes, std::convert::Infallible>(Bytes::from(frame)), connection))
            }
            received = connection.receiver.recv() => match received {
                Ok(event) => {
                    if event.event_type == "shutdown" {
                        connection.done = true;
                    }
                    let frame = format!("event: {}\ndata: {}\n\n", event.event_type, event.data);
                    Some((Ok(Bytes::from(frame)), connection))
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Lossy by design: a slow consumer is cut off and must
                    // re-fetch from the read model after reconnecting.
                    log::info!("Disconnecting event stream subscriber after lagging {skipped} events.");
                    None
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        }
    });
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}
