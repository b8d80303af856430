//! Processor Task - the engine's single serialized execution context
//!
//! One loop drives the whole engine: it waits on the transport's event
//! stream, the API request channel, and the earliest watchdog deadline,
//! and feeds whichever fires first into the host state machine. Each step
//! runs to completion before the next input is examined, so session state
//! is never mutated concurrently and the state machine needs no locks.
//!
//! # Usage
//!
//! Spawn `run` as a task (or select it against the rest of your
//! application) with the transport adapter and a caller-owned channel
//! bundle:
//!
//! ```rust,no_run
//! use wrenlink::api::EngineChannels;
//! use wrenlink::{processor, LinkHost};
//!
//! static CHANNELS: EngineChannels = EngineChannels::new();
//!
//! async fn engine_task(transport: impl wrenlink::transport::Transport) {
//!     let mut host = LinkHost::default();
//!     processor::run(&mut host, &transport, &CHANNELS).await;
//! }
//! ```
//!
//! `run` returns after a `Request::Shutdown` has been answered, leaving the
//! host reset; the caller decides whether to restart it.

use embassy_futures::select::{Either3, select3};
use embassy_time::{Instant, Timer};

use crate::api::EngineChannels;
use crate::host::{LinkHost, Outbox};
use crate::transport::Transport;
use crate::Request;

async fn deadline_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => Timer::at(at).await,
        None => core::future::pending().await,
    }
}

/// Drive the host until a shutdown request is processed
pub async fn run<T: Transport>(host: &mut LinkHost, transport: &T, channels: &EngineChannels) {
    let requests = channels.requests.receiver();
    let responses = channels.responses.sender();
    let notifications = channels.notifications.sender();

    info!("wrenlink processor running");
    loop {
        let mut outbox = Outbox::new();
        let mut shutdown = false;

        match select3(
            transport.next_event(),
            requests.receive(),
            deadline_sleep(host.next_deadline()),
        )
        .await
        {
            Either3::First(event) => {
                host.process_transport_event(event, Instant::now(), transport, &mut outbox)
                    .await;
            }
            Either3::Second(request) => {
                shutdown = matches!(request, Request::Shutdown);
                let response = host
                    .process_request(request, Instant::now(), transport, &mut outbox)
                    .await;
                responses.send(response).await;
            }
            Either3::Third(()) => {
                host.process_expirations(Instant::now(), transport, &mut outbox).await;
            }
        }

        for notification in outbox {
            notifications.send(notification).await;
        }

        if shutdown {
            info!("wrenlink processor stopping");
            break;
        }
    }
}
