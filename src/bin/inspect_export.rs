use anyhow::Result;
use sleep_stats::data_loading::export_reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        println!("Usage: {} <export_csv> [device_column]", args[0]);
        std::process::exit(1);
    }
    let device_column = args.get(2).map(String::as_str).unwrap_or("productType");

    let file = File::open(&args[1])?;
    let (mut reader, skipped) = export_reader(BufReader::new(file))?;
    if skipped > 0 {
        println!("Skipped {} separator line", skipped);
    }

    let header = reader.headers()?.clone();
    println!("\nColumns:");
    for (i, name) in header.iter().enumerate() {
        println!("  {:>3}: {}", i, name);
    }

    let Some(device_idx) = header.iter().position(|name| name == device_column) else {
        println!("\nNo '{}' column found", device_column);
        return Ok(());
    };

    let mut devices: BTreeMap<String, usize> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let device = record.get(device_idx).unwrap_or("").to_string();
        *devices.entry(device).or_insert(0) += 1;
    }

    println!("\nRows per {}:", device_column);
    for (device, count) in &devices {
        println!("  {:<24} {}", device, count);
    }

    Ok(())
}
