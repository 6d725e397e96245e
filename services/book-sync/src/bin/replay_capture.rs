//! Replays a captured exchange feed through a `Market`.
//!
//! Usage: `replay-capture <MARKET> [CAPTURE_FILE] [--config CONFIG_JSON]`
//!
//! The capture is newline-delimited JSON, one frame per line:
//!
//! ```text
//! {"kind":"snapshot","payload":{"Nounce":10,"Buys":[...],"Sells":[...],"Fills":[...]}}
//! {"kind":"delta","payload":{"Nounce":11,"Buys":[...],"Sells":[...],"Fills":[...]}}
//! ```
//!
//! Reads stdin when no capture file is given. Log verbosity follows
//! `RUST_LOG` (default `info`).

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{bail, Context};
use book_sync::{
    DeliveryError, DeltaMessage, Market, MarketConfig, MarketEvent, MarketSnapshot,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use types::ids::MarketId;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
enum Frame {
    Snapshot(MarketSnapshot),
    Delta(DeltaMessage),
}

struct Args {
    market: MarketId,
    capture: Option<String>,
    config: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut market = None;
    let mut capture = None;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(args.next().context("--config needs a path")?);
            }
            _ if market.is_none() => {
                market = Some(MarketId::try_new(&arg).context("invalid market")?);
            }
            _ if capture.is_none() => capture = Some(arg),
            _ => bail!("unexpected argument: {arg}"),
        }
    }

    Ok(Args {
        market: market
            .context("usage: replay-capture <MARKET> [CAPTURE_FILE] [--config CONFIG_JSON]")?,
        capture,
        config,
    })
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            MarketConfig::from_json(&json)?
        }
        None => MarketConfig::default(),
    };

    let reader: Box<dyn BufRead> = match &args.capture {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening capture {path}"))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    tracing::info!(market = %args.market, "Starting capture replay");

    let mut market = Market::new(args.market.clone(), config);
    market.subscribe(Box::new(
        |id: &MarketId, event: &MarketEvent| -> Result<(), DeliveryError> {
            match event {
                MarketEvent::Fills(fills) => {
                    for fill in fills {
                        tracing::info!(
                            market = %id,
                            side = ?fill.order_type,
                            rate = %fill.rate,
                            quantity = %fill.quantity,
                            at = %fill.date_time,
                            "Fill"
                        );
                    }
                }
                other => tracing::debug!(market = %id, event = other.label(), "Event"),
            }
            Ok(())
        },
    ));

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("reading capture")?;
        if line.trim().is_empty() {
            continue;
        }

        let frame: Frame = serde_json::from_str(&line)
            .with_context(|| format!("decoding frame on line {}", index + 1))?;

        match frame {
            Frame::Snapshot(snapshot) => {
                let outcome = market.on_snapshot(snapshot)?;
                tracing::info!(
                    replayed = outcome.replayed_deltas,
                    stale = outcome.stale_deltas,
                    missed_fills = outcome.missed_fills,
                    "Snapshot applied"
                );
            }
            Frame::Delta(delta) => {
                market.on_delta(delta)?;
            }
        }
    }

    market.check_invariants()?;

    let view = market.depth_view();
    let stats = market.stats();
    println!("market:      {}", market.market_id());
    println!("ready:       {}", market.is_ready());
    println!("sequence:    {}", view.last_sequence);
    match (market.best_bid(), market.best_ask()) {
        (Some(bid), Some(ask)) => {
            println!("best bid:    {} @ {}", bid.quantity, bid.rate);
            println!("best ask:    {} @ {}", ask.quantity, ask.rate);
        }
        _ => println!("top of book: incomplete"),
    }
    if let Some(spread) = market.spread() {
        println!("spread:      {spread}");
    }
    println!("levels:      {} bids / {} asks", market.bids().len(), market.asks().len());
    println!("fills:       {}", stats.fills_published);
    println!("checksum:    {}", view.checksum);

    Ok(())
}
