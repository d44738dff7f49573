//! CLI entrypoint: parses options, installs the tracing subscriber, opens
//! the raw HCI socket, drives controller-scope bring-up, and runs the 10 ms
//! service tick until interrupted (SPEC_FULL.md §0).
mod service;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use padbridge_core::config::Config;
use padbridge_host::linkkey::LinkKeyStore;
use padbridge_host::orchestrator::{resolve_link_key, ControllerTask, DeviceTask};
use padbridge_shared::flags::{AtomicFlags, ControllerFlag, DeviceFlag};
use padbridge_shared::shutdown::Shutdown;
use padbridge_transport::h4::H4Reader;
use padbridge_transport::hci::{self, HciEvent, TxRing};
use padbridge_transport::sock::hci::{Datagram, Socket, SocketAddr};
use service::Service;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "padbridge-server", version, about = "Bluetooth-to-wired-controller bridge host")]
struct Cli {
    /// HCI adapter device id (`hciN`'s `N`), as accepted by `HCIGETDEVLIST`.
    #[arg(long, default_value_t = 0)]
    dev_id: u16,

    /// Local Bluetooth name advertised during inquiry scan (spec.md §4.6).
    #[arg(long, default_value = "padbridge")]
    local_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let socket = Socket::new().context("opening raw HCI socket")?;
    socket
        .bind(SocketAddr::new(cli.dev_id))
        .context("binding HCI socket to adapter")?;
    let datagram = Arc::new(socket.into_datagram());

    let controller_flags = Arc::new(AtomicFlags::<ControllerFlag>::new());
    let (ring, pump) = TxRing::new(32, controller_flags.clone());

    let write_datagram = datagram.clone();
    tokio::spawn(pump.run(move |frame: Bytes| {
        let datagram = write_datagram.clone();
        async move {
            if let Err(err) = datagram.send(&frame).await {
                tracing::warn!(%err, "failed writing HCI command frame");
            }
        }
    }));

    let mut controller = ControllerTask::new(controller_flags.clone(), cli.local_name.clone());
    tokio::spawn({
        let ring = ring.clone();
        async move {
            controller.run(&ring).await;
            tracing::info!("controller bring-up complete");
        }
    });

    let (notify_shutdown_tx, notify_shutdown_rx) = mpsc::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);
    let shutdown = Shutdown::new(notify_shutdown_tx, shutdown_complete_tx);

    let config = Config::new();
    let service = Service::new(config, padbridge_core::config::MAX_WIRED_PORTS);
    let link_keys = LinkKeyStore::new();

    let reader_datagram = datagram.clone();
    let reader_flags = controller_flags.clone();
    let reader_ring = ring.clone();
    tokio::spawn(async move {
        hci_event_loop(reader_datagram, reader_flags, reader_ring, link_keys).await;
    });

    let service_handle = tokio::spawn(service.run(shutdown));

    tokio::signal::ctrl_c().await.context("waiting for interrupt")?;
    tracing::info!("received interrupt, shutting down");
    drop(notify_shutdown_rx);
    let _ = service_handle.await;
    let _ = shutdown_complete_rx.recv().await;
    Ok(())
}

/// Reads raw H4 bytes off the socket, frames them, and dispatches each HCI
/// event against controller- and device-scope flags (spec.md §4.1, §4.6).
/// Per-device bring-up ([`DeviceTask`]) is driven implicitly: flags this
/// loop sets are what a device's `poll()` call advances past.
async fn hci_event_loop(
    datagram: Arc<Datagram>,
    controller_flags: Arc<AtomicFlags<ControllerFlag>>,
    ring: TxRing,
    mut link_keys: LinkKeyStore,
) {
    let mut reader = H4Reader::new();
    let mut buf = [0u8; 1024];
    let mut devices: Vec<DeviceTask> = Vec::new();
    loop {
        let n = match datagram.recv(&mut buf).await {
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(%err, "HCI socket read failed");
                return;
            }
        };
        reader.feed(&buf[..n]);
        while let Ok(Some(frame)) = reader.next_frame() {
            let padbridge_transport::h4::H4Frame::Event { code, params } = frame else {
                continue;
            };
            let event = hci::parse_event(code, params);
            handle_event(event, &controller_flags, &ring, &mut devices, &mut link_keys).await;
        }
    }
}

async fn handle_event(
    event: HciEvent,
    controller_flags: &Arc<AtomicFlags<ControllerFlag>>,
    ring: &TxRing,
    devices: &mut Vec<DeviceTask>,
    link_keys: &mut LinkKeyStore,
) {
    match event {
        HciEvent::CommandComplete { opcode, .. } | HciEvent::CommandStatus { opcode, .. } => {
            if let Some(flag) = controller_flag_for(opcode) {
                controller_flags.set(flag);
            }
        }
        HciEvent::ConnectionRequest { bdaddr, .. } => {
            devices.push(DeviceTask::new(bdaddr, Arc::new(AtomicFlags::<DeviceFlag>::new())));
        }
        HciEvent::LinkKeyNotify { bdaddr, key } => {
            link_keys.store(bdaddr, key);
        }
        HciEvent::LinkKeyRequest { bdaddr } => {
            let opcode = match resolve_link_key(link_keys, bdaddr) {
                Some(_key) => padbridge_transport::h4::Opcode::new(hci::OGF_LINK_CTL, hci::OCF_LINK_KEY_REQUEST_REPLY),
                None => padbridge_transport::h4::Opcode::new(hci::OGF_LINK_CTL, hci::OCF_LINK_KEY_REQUEST_NEG_REPLY),
            };
            let _ = ring.submit(opcode, Bytes::new()).await;
        }
        HciEvent::Unknown(code) => {
            tracing::trace!(code, "dropping unhandled HCI event");
        }
        _ => {}
    }
    devices.retain_mut(DeviceTask::poll);
}

/// Maps a completed command's opcode back to the controller bring-up flag
/// it satisfies (spec.md §4.6). Anything outside that closed set is a
/// command this loop didn't initiate and is ignored.
fn controller_flag_for(opcode: padbridge_transport::h4::Opcode) -> Option<ControllerFlag> {
    use hci::{
        OCF_INQUIRY, OCF_READ_LOCAL_VERSION, OCF_RESET, OCF_SET_EVENT_FILTER, OCF_WRITE_CLASS_OF_DEVICE,
        OCF_WRITE_LOCAL_NAME, OCF_WRITE_SCAN_ENABLE,
    };
    match opcode.ocf {
        OCF_RESET => Some(ControllerFlag::Enable),
        OCF_WRITE_LOCAL_NAME => Some(ControllerFlag::NameSet),
        OCF_WRITE_CLASS_OF_DEVICE => Some(ControllerFlag::ClassSet),
        OCF_READ_LOCAL_VERSION => Some(ControllerFlag::VerRead),
        OCF_SET_EVENT_FILTER => Some(ControllerFlag::InquiryFilter),
        OCF_WRITE_SCAN_ENABLE => Some(ControllerFlag::PageEnable),
        OCF_INQUIRY => Some(ControllerFlag::Inquiry),
        _ => None,
    }
}
