//! Parser for the raw, line-oriented VM trace text returned by the oracle.
//!
//! A trace is a sequence of blocks, each starting with a `stack: [...]` marker and
//! carrying an `execute <mnemonic>` line and a `code cell hash: <hex>:<offset>:<bits>`
//! marker. Gas counters are not present in the raw text and are reported as zero.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref BLOCK_START: Regex = Regex::new(r"stack:\s*\[").expect("valid block regex");
    static ref STACK: Regex = Regex::new(r"(?s)stack:\s*\[(.*?)\]").expect("valid stack regex");
    static ref EXECUTE: Regex = Regex::new(r"(?i)execute\s+(.*)").expect("valid execute regex");
    static ref CODE_CELL: Regex =
        Regex::new(r"(?i)code cell hash:\s*([a-f0-9]+):(\d+):\d+").expect("valid code cell regex");
}

/// One executed VM instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// 1-based step index.
    pub step: u32,
    /// Instruction mnemonic with its arguments, e.g. `PUSHINT 1`.
    pub cmd_str: String,
    /// Stack snapshot before the instruction, top last.
    pub stack: Vec<String>,
    pub cmd_code_cell_hash: Option<String>,
    pub cmd_code_offset: Option<u32>,
    pub gas_used: u64,
    pub gas_cmd: u64,
}

/// Parses raw trace text into steps. Empty input yields no steps.
pub fn parse_trace(raw: &str) -> Vec<TraceStep> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    split_blocks(raw)
        .into_iter()
        .filter_map(parse_block)
        .enumerate()
        .map(|(idx, mut step)| {
            step.step = idx as u32 + 1;
            step
        })
        .collect()
}

/// Splits before every stack marker. Text preceding the first marker is its own block.
fn split_blocks(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    for marker in BLOCK_START.find_iter(raw) {
        if marker.start() > start {
            blocks.push(&raw[start..marker.start()]);
        }
        start = marker.start();
    }
    blocks.push(&raw[start..]);
    blocks
}

/// Returns `None` for blocks carrying none of the three markers (e.g. a log preamble).
fn parse_block(block: &str) -> Option<TraceStep> {
    let stack = parse_stack(block);
    let cmd_str = parse_execute(block);
    let code = parse_code_cell(block);

    if stack.is_none() && cmd_str.is_none() && code.is_none() {
        return None;
    }

    let (cmd_code_cell_hash, cmd_code_offset) = match code {
        Some((hash, offset)) => (Some(hash), Some(offset)),
        None => (None, None),
    };

    Some(TraceStep {
        step: 0,
        cmd_str: cmd_str.unwrap_or_default(),
        stack: stack.unwrap_or_default(),
        cmd_code_cell_hash,
        cmd_code_offset,
        gas_used: 0,
        gas_cmd: 0,
    })
}

fn parse_stack(block: &str) -> Option<Vec<String>> {
    let caps = STACK.captures(block)?;
    Some(caps[1].split_whitespace().map(str::to_string).collect())
}

fn parse_execute(block: &str) -> Option<String> {
    let caps = EXECUTE.captures(block)?;
    Some(caps[1].trim().to_string())
}

fn parse_code_cell(block: &str) -> Option<(String, u32)> {
    let caps = CODE_CELL.captures(block)?;
    let offset = caps[2].parse().ok()?;
    Some((caps[1].to_ascii_lowercase(), offset))
}
