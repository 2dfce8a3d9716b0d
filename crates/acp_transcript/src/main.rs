//! CLI entry point: reads newline-delimited session-update records from
//! stdin and renders them as a live transcript on stdout.

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use acp_transcript::{PatchSink, RenderOptions, Renderer, RepaintSink, StatusSink};

#[derive(Parser)]
#[command(
    name = "acp-transcript",
    about = "Render streamed agent session updates as a live terminal transcript"
)]
struct Args {
    /// Show the agent's reasoning in a panel at the end of each turn
    #[arg(long)]
    show_reasoning: bool,

    /// Terminal update strategy
    #[arg(long, value_enum, default_value_t = RendererKind::Repaint)]
    renderer: RendererKind,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RendererKind {
    /// Erase and redraw the live region on every update
    Repaint,
    /// Patch individual lines with relative cursor movement
    Patch,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = RenderOptions {
        show_reasoning: args.show_reasoning,
        color: !args.no_color && std::io::stdout().is_terminal(),
    };
    let sink: Box<dyn StatusSink> = match args.renderer {
        RendererKind::Repaint => Box::new(RepaintSink::new(std::io::stdout())),
        RendererKind::Patch => Box::new(PatchSink::new(std::io::stdout())),
    };
    let mut renderer = Renderer::new(sink, options);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&mut renderer, &line)?,
                None => break,
            },
            _ = ticker.tick() => renderer.tick()?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    renderer.finalize()?;
    Ok(())
}

/// Process one input line. Blank lines and malformed JSON are skipped;
/// everything else — session updates and the `reset`/`stopReason` control
/// records — goes to the renderer.
fn handle_line(renderer: &mut Renderer<Box<dyn StatusSink>>, line: &str) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let record: Value = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(err) => {
            warn!(%err, "skipping malformed record");
            return Ok(());
        }
    };
    renderer.handle_record(&record)?;
    Ok(())
}
