//! Terminal rendering helpers for the `simchain` binary

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::mempool::MempoolSelector;
use crate::verifier::TransactionVerdict;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simchain=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn format_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() > 20 {
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        hash.to_string()
    }
}

pub fn format_timestamp(block: &Block) -> String {
    match block.timestamp_utc() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Invalid".to_string(),
    }
}

/// Parses `"0,2,3"` into mempool indices.
pub fn parse_selection(input: &str) -> Result<Vec<usize>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| ChainError::Validation(format!("invalid mempool index '{}'", s)))
        })
        .collect()
}

/// Parses `IDX=PUBKEY` as given to `verify --key`.
pub fn parse_key_assignment(input: &str) -> Result<(usize, String)> {
    let (index, key) = input.split_once('=').ok_or_else(|| {
        ChainError::Validation(format!("expected IDX=PUBLIC_KEY, got '{}'", input))
    })?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| ChainError::Validation(format!("invalid transaction index '{}'", index)))?;
    Ok((index, key.trim().to_string()))
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| {
            Cell::new(t)
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold)
        })
        .collect()
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(titles));
    table
}

pub fn chain_table(chain: &[Block]) -> Table {
    let mut table = new_table(&["Block", "Nonce", "Time", "Previous", "Hash", "Txs"]);
    for block in chain {
        table.add_row(vec![
            Cell::new(format!("#{}", block.index)).fg(TableColor::White),
            Cell::new(block.nonce),
            Cell::new(format_timestamp(block)).fg(TableColor::Grey),
            Cell::new(format_hash(&block.previous_hash)),
            Cell::new(format_hash(&block.hash)).fg(TableColor::Green),
            Cell::new(block.transactions.len()),
        ]);
    }
    table
}

pub fn mempool_table(selector: &MempoolSelector) -> Table {
    let selection = selector.selection();
    let reward = selector.base_reward();
    let mut table = new_table(&["#", "", "From", "To", "Amount", "Fee", "Potential gain"]);
    for (index, entry) in selector.entries().iter().enumerate() {
        let (marker, color) = match selection.iter().position(|&i| i == index) {
            Some(pos) => (format!("✔ {}", pos + 1), TableColor::Green),
            None => (String::new(), TableColor::White),
        };
        table.add_row(vec![
            Cell::new(index),
            Cell::new(marker).fg(color),
            Cell::new(format_hash(&entry.transaction.sender)),
            Cell::new(format_hash(&entry.transaction.recipient)),
            Cell::new(entry.transaction.amount),
            Cell::new(entry.fee),
            Cell::new(entry.fee + reward).fg(TableColor::Yellow),
        ]);
    }
    table
}

pub fn verdict_table(block: &Block, verdicts: &[TransactionVerdict]) -> Table {
    let mut table = new_table(&["Tx", "From", "To", "Amount", "Result"]);
    for verdict in verdicts {
        let Some(tx) = block.transactions.get(verdict.index) else {
            continue;
        };
        let color = if verdict.outcome.valid {
            TableColor::Green
        } else {
            TableColor::Red
        };
        table.add_row(vec![
            Cell::new(verdict.index),
            Cell::new(format_hash(&tx.sender)),
            Cell::new(format_hash(&tx.recipient)),
            Cell::new(tx.amount),
            Cell::new(verdict.outcome.reason.to_string()).fg(color),
        ]);
    }
    table
}
