//! Print the status of an Expert amplifier.
//!
//! Opens a session, optionally switches the power state, reads the
//! frequency, power state and the requested levels, then closes the
//! session.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p amplib --example expert_status -- /dev/ttyUSB0 115200
//! cargo run -p amplib --example expert_status -- /dev/ttyUSB0 115200 swr,fwd,fault operate
//! ```
//!
//! The third argument is a comma-separated list of levels (default: every
//! level the opcode table supports). The fourth is a power state to switch
//! to first: `off`, `on`, `operate` or `standby`.

use amplib::expert::ExpertBuilder;
use amplib::expert::models::expert_15k_fa;
use amplib::{AmpEvent, AmpLevel, Amplifier, PowerState};
use amplib_transport::{SerialConfig, SerialTransport};

/// SWR above this is flagged.
const SWR_WARNING: f32 = 2.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud_rate: u32 = match args.next() {
        Some(b) => b.parse()?,
        None => 115_200,
    };
    let levels: Option<Vec<AmpLevel>> = match args.next() {
        Some(list) => Some(
            list.split(',')
                .map(str::parse::<AmpLevel>)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };
    let target_state = args
        .next()
        .map(|s| s.parse::<PowerState>())
        .transpose()?;

    println!("Opening {} at {} baud...", port, baud_rate);
    let config = SerialConfig {
        baud_rate,
        ..Default::default()
    };
    let transport = SerialTransport::open_with_config(&port, config).await?;

    let amp = ExpertBuilder::new(expert_15k_fa())
        .baud_rate(baud_rate)
        .build_with_transport(Box::new(transport))
        .await?;
    let mut events = amp.subscribe()?;

    amp.open().await?;
    let info = amp.info();
    println!("Connected: {} {}\n", info.manufacturer, info.model_name);

    if let Some(state) = target_state {
        amp.set_power_state(state).await?;
        println!("Switched to {state}");
    }

    match amp.get_frequency().await {
        Ok(freq) => println!("Frequency:   {:.3} MHz", freq as f64 / 1_000_000.0),
        Err(e) => println!("Frequency:   unavailable ({e})"),
    }
    match amp.get_power_state().await {
        Ok(state) => println!("Power state: {state}"),
        Err(e) => println!("Power state: unavailable ({e})"),
    }

    let levels = levels.unwrap_or_else(|| amp.capabilities().readable_levels.clone());
    for level in levels {
        match amp.get_level(level).await {
            Ok(value) => {
                println!("{:<13} {value}", format!("{level}:"));
                if level == AmpLevel::Swr && value.as_f32().is_some_and(|swr| swr > SWR_WARNING) {
                    println!("              warning: SWR above {SWR_WARNING:.1}");
                }
            }
            Err(e) => println!("{:<13} error: {e}", format!("{level}:")),
        }
    }

    amp.close().await?;

    while let Ok(event) = events.try_recv() {
        if let AmpEvent::FaultReported { code, message } = event {
            println!("\nFault 0x{code:02X}: {message}");
        }
    }
    Ok(())
}
