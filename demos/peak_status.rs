//! Basic example: Connect to a Peak Pro and print its status
//!
//! Run with: cargo run --example peak_status [ADDRESS]

use puffco_rust_ble::{ConnectTarget, PeakPro, Result, SessionConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("puffco_rust_ble=info".parse().unwrap()),
        )
        .init();

    let address = std::env::args().nth(1);
    let target = ConnectTarget::from_address(address.as_deref());

    println!("Looking for {}...", target);
    let peak = PeakPro::connect(target, SessionConfig::default()).await?;

    println!("\nConnected to {} ({} protocol)", peak.session().address(), peak.mode());
    if let Some(version) = peak.session().tunnel_version() {
        println!("  Lorax version: {}", version);
    }

    println!("  Name: {}", peak.device_name().await?);
    println!("  Model: {}", peak.model_name().await?);
    if let Some(revision) = peak.firmware_revision().await? {
        println!("  Firmware: {}", revision);
    }

    match peak.battery_percentage().await? {
        Some(battery) => println!("  Battery: {}%", battery),
        None => println!("  Battery: unknown"),
    }
    if let Some(eta) = peak.charge_eta().await? {
        println!("  Full in: {} min", eta.as_secs() / 60);
    }

    if let Some(state) = peak.operating_state().await? {
        println!("  State: {}", state);
    }
    match peak.bowl_temperature_fahrenheit().await? {
        Some(temp) => println!("  Bowl: {:.0}°F", temp),
        None => println!("  Bowl: no atomizer"),
    }

    if let Some(count) = peak.total_dab_count().await? {
        println!("  Total dabs: {}", count);
    }

    println!("\nHeat profiles:");
    let current = peak.current_profile().await?;
    for profile in peak.heat_profiles().await? {
        let marker = if Some(profile.index) == current { "*" } else { " " };
        let temp = profile
            .temperature_fahrenheit()
            .map(|t| format!("{:.0}°F", t))
            .unwrap_or_else(|| "?".to_string());
        let time = profile
            .duration
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "?".to_string());
        let color = profile
            .color
            .map(|c| c.to_hex())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {} {}: {:<12} {} {} {}",
            marker, profile.index, profile.name, temp, time, color
        );
    }

    peak.disconnect().await?;
    Ok(())
}
