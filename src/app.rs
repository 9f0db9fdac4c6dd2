//! Command implementations behind the `houndify` binary.
//!
//! Orchestrates the two query flows:
//! WAV input → streaming voice query → printed result, and text → result.

use crate::audio::codec::SampleRate;
use crate::audio::wav::WavAudioSource;
use crate::client::{StreamingClient, TextClient};
use crate::config::Config;
use crate::error::Result;
use crate::listener::HoundListener;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::io::{IsTerminal, Write};
use std::path::Path;

/// Prints partial transcripts to stderr as they arrive.
///
/// On a terminal the current transcript is redrawn in place; otherwise each
/// one gets its own line.
pub struct PrintListener {
    quiet: bool,
    redraw: bool,
    last_len: usize,
}

impl PrintListener {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            redraw: std::io::stderr().is_terminal(),
            last_len: 0,
        }
    }

    fn end_line(&mut self) {
        if self.redraw && self.last_len > 0 {
            eprintln!();
        }
        self.last_len = 0;
    }
}

impl HoundListener for PrintListener {
    fn on_partial_transcript(&mut self, transcript: &str) {
        if self.quiet {
            return;
        }
        if self.redraw {
            let pad = self.last_len.saturating_sub(transcript.len());
            eprint!("\r{}{}", transcript.dimmed(), " ".repeat(pad));
            if let Err(e) = std::io::stderr().flush() {
                tracing::debug!("stderr flush failed: {}", e);
            }
            self.last_len = transcript.len();
        } else {
            eprintln!("{}", transcript.dimmed());
        }
    }

    fn on_final_response(&mut self, _response: &Value) {
        self.end_line();
    }

    fn on_error(&mut self, error: &Value) {
        self.end_line();
        if !self.quiet {
            eprintln!("{} {}", "Error:".red(), error);
        }
    }
}

/// Stream a WAV file (or stdin for `-`) as one voice query and print the
/// server's response.
pub async fn run_stream_command(
    config: Config,
    input: &Path,
    sample_rate: Option<u32>,
    no_vad: bool,
    quiet: bool,
) -> Result<Value> {
    let mut client = StreamingClient::from_config(&config)?;
    if let Some(hz) = sample_rate {
        client.set_sample_rate(hz)?;
    }
    if no_vad {
        client = client.with_vad(false);
    }
    let rate: SampleRate = client.sample_rate();

    let mut source = if input == Path::new("-") {
        WavAudioSource::from_stdin(rate)?
    } else {
        WavAudioSource::from_path(input, rate)?
    };
    if !quiet {
        eprintln!(
            "{} {} ({} ms at {} Hz)",
            "Streaming".green(),
            input.display(),
            source.duration_ms(rate),
            rate.hz()
        );
    }

    client.start(PrintListener::new(quiet)).await?;
    while let Some(pcm) = source.next_pcm_bytes() {
        if client.fill(&pcm).await? {
            tracing::debug!("Server stopped listening, ending upload early");
            break;
        }
    }
    let result = client.finish().await?;

    let response = result.unwrap_or(Value::Null);
    print_response(&response)?;
    Ok(response)
}

/// Run a text query and print the server's response.
pub async fn run_text_command(config: Config, query: &str) -> Result<Value> {
    let client = TextClient::from_config(&config)?;
    let response = client.query(query).await?;
    print_response(&response)?;
    Ok(response)
}

fn print_response(response: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(response)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    Ok(())
}
