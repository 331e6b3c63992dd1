use clap::Parser;
use jsy_rs::{MeterClient, SerialWire, TelemetryPublisher};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsy-monitor")]
#[command(about = "Poll a JSY-MK-194T power meter and emit readings as JSON lines")]
struct Args {
    /// Serial port path
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short = 'r', long, default_value_t = jsy_rs::DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// Meter slave address
    #[arg(short, long, default_value_t = jsy_rs::DEFAULT_METER_ADDRESS, value_parser = parse_address)]
    address: u8,

    /// Readings of history to keep
    #[arg(long, default_value_t = 60)]
    history: usize,

    /// Poll loop interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval: u64,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse()
            .map_err(|e: std::num::ParseIntError| e.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let poll_interval = Duration::from_millis(args.poll_interval.clamp(10, 500));

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        cancel_signal.cancel();
    });

    tracing::info!("Opening {} at {} baud...", args.port, args.baud_rate);
    let wire = SerialWire::new(&args.port, args.baud_rate)?;
    let mut client = MeterClient::with_capacity(wire, args.address, args.history.max(1));
    client.init().await?;
    tracing::info!(
        "Monitoring meter 0x{:02X}, publishing JSON lines on stdout",
        args.address
    );

    let mut publisher = TelemetryPublisher::new();
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => {
                tracing::info!("Shutdown complete");
                return Ok(());
            }
        }

        if let Err(e) = client.poll().await {
            // Transient serial trouble: the next cycle re-polls.
            tracing::warn!("poll failed: {}", e);
            continue;
        }

        if let Some(record) = client.latest()
            && let Some(line) =
                publisher.publish(record, client.age_of(record), chrono::Utc::now())
        {
            println!("{line}");
        }
    }
}
