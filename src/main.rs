#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use base64::{Engine, prelude::BASE64_STANDARD};
use clap::Parser;
use rtp_sender::{
    RtpPacketMediaType, RtpPacketToSend, codec::extensions::VideoTiming, config::Config,
};

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    ///
    /// Specify the configuration file path
    ///
    /// Example: rtp-sender --config /etc/rtp-sender/config.json5
    ///
    #[arg(long, short)]
    config: Option<String>,
    #[arg(long, default_value_t = 96)]
    payload_type: u8,
    #[arg(long, default_value_t = 0)]
    sequence_number: u16,
    #[arg(long, default_value_t = 0)]
    timestamp: u32,
    #[arg(long, default_value_t = 0)]
    ssrc: u32,
    #[arg(long)]
    marker: bool,
    ///
    /// Capture time of the media in milliseconds, the pacing timestamps are
    /// written relative to it.
    ///
    #[arg(long, default_value_t = 0)]
    capture_time: i64,
    #[arg(long)]
    packetization_finish: Option<i64>,
    #[arg(long)]
    pacer_exit: Option<i64>,
    #[arg(long)]
    network: Option<i64>,
    #[arg(long)]
    network2: Option<i64>,
    ///
    /// Payload of the packet, base64 encoded
    ///
    #[arg(long)]
    payload: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    simple_logger::init_with_level(config.log.level.as_level())?;

    let extensions = Arc::new(config.extension_manager()?);
    if extensions.iter().next().is_none() {
        log::warn!("No header extensions are registered, pacing timestamps can not be written");
    }

    let mut packet = RtpPacketToSend::with_capacity(extensions, config.packet.capacity);
    packet.set_packet_type(Some(RtpPacketMediaType::Video));
    packet.set_payload_type(cli.payload_type);
    packet.set_sequence_number(cli.sequence_number);
    packet.set_timestamp(cli.timestamp);
    packet.set_ssrc(cli.ssrc);
    packet.set_marker(cli.marker);
    packet.set_capture_time_ms(cli.capture_time);

    // the timing extension has to be allocated before the payload, the
    // timestamps themselves may come later.
    if let Some(time) = cli.packetization_finish {
        packet.set_packetization_finish_time_ms(time)?;
    }

    if cli.pacer_exit.is_some() || cli.network.is_some() || cli.network2.is_some() {
        packet.reserve_extension::<VideoTiming>()?;
    }

    if let Some(payload) = &cli.payload {
        packet.set_payload(&BASE64_STANDARD.decode(payload)?)?;
    }

    if let Some(time) = cli.pacer_exit {
        packet.set_pacer_exit_time_ms(time)?;
    }

    if let Some(time) = cli.network {
        packet.set_network_time_ms(time)?;
    }

    if let Some(time) = cli.network2 {
        packet.set_network2_time_ms(time)?;
    }

    log::info!(
        "packet crafted: seq={}, ts={}, ssrc={}, size={}, headers={}, payload={}",
        packet.sequence_number(),
        packet.timestamp(),
        packet.ssrc(),
        packet.size(),
        packet.headers_size(),
        packet.payload_size()
    );

    println!("{}", BASE64_STANDARD.encode(packet.data()));
    Ok(())
}
