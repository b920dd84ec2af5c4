//! TCP relay for the LED sequencer
//!
//! Serves a sequencer backed by virtual output lines on `LEDC_ADDR`
//! (default `0.0.0.0:9000`). Environment:
//!
//! - `LEDC_LINES`: number of output lines (default 8)
//! - `LEDC_LINE_IDS`: comma separated hardware ids, one per line (default `0..LEDC_LINES`)
//! - `LEDC_TIME_UNIT_MS`: milliseconds per duration unit (default 1000)

use std::env;
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;

use myrtio_light_sequencer::{
    Duration, Error, Result, SequencerConfig, StreamDevice, VirtualLineBank, relay,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:9000";
const DEFAULT_LINES: u8 = 8;
const DEFAULT_TIME_UNIT_MS: u64 = 1000;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "relay stopped");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let addr = env::var("LEDC_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into());
    let line_count = env_number("LEDC_LINES", DEFAULT_LINES)?;
    let time_unit = env_number("LEDC_TIME_UNIT_MS", DEFAULT_TIME_UNIT_MS)?;

    let config = SequencerConfig::new()
        .with_line_count(line_count)
        .with_time_unit(Duration::from_millis(time_unit));
    let device = Arc::new(StreamDevice::new(VirtualLineBank::new(), &config)?);

    for (index, id) in line_ids(line_count)?.into_iter().enumerate() {
        device.set_line_id(index, Some(id))?;
    }

    let listener = TcpListener::bind(&addr)?;
    tracing::info!(%addr, line_count, "relay listening");
    relay::serve(&listener, &device)
}

fn env_number<T: core::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument("malformed numeric environment variable")),
        Err(_) => Ok(default),
    }
}

fn line_ids(line_count: u8) -> Result<Vec<u16>> {
    let Ok(ids) = env::var("LEDC_LINE_IDS") else {
        return Ok((0..u16::from(line_count)).collect());
    };
    let ids = ids
        .split(',')
        .map(|id| id.trim().parse::<u16>())
        .collect::<core::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidArgument("malformed LEDC_LINE_IDS"))?;
    if ids.len() != usize::from(line_count) {
        return Err(Error::InvalidArgument("LEDC_LINE_IDS must name every line"));
    }
    Ok(ids)
}
