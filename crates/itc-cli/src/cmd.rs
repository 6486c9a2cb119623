//! Subcommand handlers. Each takes parsed arguments, the codec limits and
//! the output mode, and renders exactly one result.

use anyhow::{Context, Result};
use clap::Args;
use itc_core::bits::BitWriter;
use itc_core::clock::stamp_from_text_with;
use itc_core::{CodecConfig, Stamp};
use serde::Serialize;
use std::fmt;
use std::io::{self, BufRead};
use tracing::debug;

use crate::output::{OutputMode, StampView, pretty_kv, render};

#[derive(Args, Debug)]
pub struct StampArg {
    /// Stamp in text form (`itc:v1:<hex>`), or `-` to read one line from stdin.
    pub stamp: String,
}

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Stamp in text form, or `-` for stdin.
    pub stamp: String,

    /// Number of events to record.
    #[arg(short = 'n', long = "count", default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Debug)]
pub struct PairArgs {
    /// First stamp in text form, or `-` for stdin.
    pub a: String,
    /// Second stamp in text form.
    pub b: String,
}

/// Parse a stamp argument, reading stdin for `-`.
pub fn read_stamp(raw: &str, codec: &CodecConfig) -> Result<Stamp> {
    let text = if raw == "-" {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read stamp from stdin")?;
        line
    } else {
        raw.to_string()
    };
    let stamp = stamp_from_text_with(&text, codec)
        .with_context(|| format!("Invalid stamp `{}`", text.trim()))?;
    debug!(%stamp, "parsed stamp");
    Ok(stamp)
}

fn render_stamp(mode: OutputMode, stamp: &Stamp) -> Result<()> {
    render(mode, &StampView::from(stamp), |view, w| writeln!(w, "{}", view.text))
}

pub fn run_seed(mode: OutputMode) -> Result<()> {
    render_stamp(mode, &Stamp::seed())
}

#[derive(Debug, Serialize)]
struct ForkOutput {
    kept: StampView,
    forked: StampView,
}

pub fn run_fork(args: &StampArg, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let mut stamp = read_stamp(&args.stamp, codec)?;
    let forked = stamp.fork()?;
    let output = ForkOutput {
        kept: StampView::from(&stamp),
        forked: StampView::from(&forked),
    };
    render(mode, &output, |out, w| {
        writeln!(w, "{}", out.kept.text)?;
        writeln!(w, "{}", out.forked.text)
    })
}

pub fn run_event(args: &EventArgs, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let mut stamp = read_stamp(&args.stamp, codec)?;
    if stamp.is_anonymous() {
        tracing::warn!("stamp owns no identity; events will not change its history");
    }
    for _ in 0..args.count {
        stamp.event()?;
    }
    render_stamp(mode, &stamp)
}

pub fn run_join(args: &PairArgs, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let mut a = read_stamp(&args.a, codec)?;
    let b = read_stamp(&args.b, codec)?;
    if a.id().intersects(b.id()) {
        tracing::warn!(a = %a, b = %b, "joining stamps with overlapping identities");
    }
    a.join(b);
    render_stamp(mode, &a)
}

pub fn run_peek(args: &StampArg, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let stamp = read_stamp(&args.stamp, codec)?;
    render_stamp(mode, &stamp.peek())
}

/// Causal relation of `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Equal,
    Before,
    After,
    Concurrent,
}

impl Relation {
    pub fn between(a: &Stamp, b: &Stamp) -> Self {
        match (a.leq(b), b.leq(a)) {
            (true, true) => Self::Equal,
            (true, false) => Self::Before,
            (false, true) => Self::After,
            (false, false) => Self::Concurrent,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal",
            Self::Before => "before",
            Self::After => "after",
            Self::Concurrent => "concurrent",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize)]
struct CompareOutput {
    relation: Relation,
}

pub fn run_compare(args: &PairArgs, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let a = read_stamp(&args.a, codec)?;
    let b = read_stamp(&args.b, codec)?;
    let output = CompareOutput {
        relation: Relation::between(&a, &b),
    };
    render(mode, &output, |out, w| writeln!(w, "{}", out.relation))
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    #[serde(flatten)]
    stamp: StampView,
    anonymous: bool,
    id_depth: usize,
    event_depth: usize,
    event_nodes: usize,
    event_max: u32,
    bytes: usize,
    bits: usize,
    fields: String,
    bit_string: String,
}

pub fn run_inspect(args: &StampArg, codec: &CodecConfig, mode: OutputMode) -> Result<()> {
    let stamp = read_stamp(&args.stamp, codec)?;
    let mut encoded = BitWriter::new();
    stamp.encode_into(&mut encoded);

    let output = InspectOutput {
        stamp: StampView::from(&stamp),
        anonymous: stamp.is_anonymous(),
        id_depth: stamp.id().depth(),
        event_depth: stamp.history().depth(),
        event_nodes: stamp.history().node_count(),
        event_max: stamp.history().max(),
        bytes: encoded.bit_len().div_ceil(8),
        bits: encoded.bit_len(),
        fields: encoded.to_string(),
        bit_string: encoded.bit_string(),
    };

    render(mode, &output, |out, w| {
        pretty_kv(w, "text", &out.stamp.text)?;
        pretty_kv(w, "structure", &out.stamp.structure)?;
        pretty_kv(w, "anonymous", out.anonymous.to_string())?;
        pretty_kv(
            w,
            "depth",
            format!("id {} / event {}", out.id_depth, out.event_depth),
        )?;
        pretty_kv(w, "event max", out.event_max.to_string())?;
        pretty_kv(w, "size", format!("{} bytes ({} bits)", out.bytes, out.bits))?;
        pretty_kv(w, "fields", &out.fields)?;
        pretty_kv(w, "bits", &out.bit_string)
    })
}
