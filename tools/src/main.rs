//! sim-runner: headless runner for the runway simulation.
//!
//! Usage:
//!   sim-runner --config data/scenarios/default.json            one-shot JSON report
//!   sim-runner --config scenario.json --seed 7 --summary       human summary
//!   sim-runner --config scenario.json --stream                 JSON lines on stdout
//!   sim-runner --ipc-mode                                      config on stdin, stream on stdout
//!   sim-runner --listen 127.0.0.1:9000                         one streaming session per connection
//!
//! Streaming sessions read exactly one configuration line, then emit one
//! `{"type":"tick",...}` line per simulated minute and one `{"type":"done",...}`.
//! Failures end the session with `{"type":"error","code":..,"message":..}`.
//! A TCP connection is closed after that last line, and a client hang-up
//! cancels its run. In IPC mode stdin may be closed after the configuration
//! line (`echo '{..}' | sim-runner --ipc-mode`); only a failed stdout write
//! cancels.

use anyhow::{Context, Result};
use runway_sim_core::{
    config::SimConfig,
    engine::{self, SimEngine},
    error::SimError,
    metrics::SimReport,
    store::SimStore,
    stream::{self, RunOutcome, StreamOptions, ABNORMAL_CLOSURE_CODE, INVALID_CONFIG_CODE},
};
use std::env;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

#[derive(serde::Serialize)]
struct ErrorFrame {
    #[serde(rename = "type")]
    kind:       &'static str,
    code:       u16,
    message:    String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

impl ErrorFrame {
    fn from_error(error: &SimError) -> Self {
        match error {
            SimError::Configuration { violations } => Self {
                kind:       "error",
                code:       INVALID_CONFIG_CODE,
                message:    "invalid configuration".into(),
                violations: violations.clone(),
            },
            other => Self {
                kind:       "error",
                code:       ABNORMAL_CLOSURE_CODE,
                message:    other.to_string(),
                violations: Vec::new(),
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let tick_delay = Duration::from_millis(parse_arg(&args, "--tick-delay-ms", 0u64));
    let options = StreamOptions {
        buffer: parse_arg(&args, "--buffer", StreamOptions::default().buffer),
        tick_delay,
    };

    if let Some(addr) = arg_value(&args, "--listen") {
        return listen(addr, options);
    }
    if has_flag(&args, "--ipc-mode") {
        return serve_session(BufReader::new(io::stdin()), io::stdout(), options, InputEnd::KeepRunning);
    }

    let mut config = match arg_value(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = arg_value(&args, "--seed") {
        config.seed = Some(seed.parse().with_context(|| format!("--seed {seed} is not an unsigned integer"))?);
    }

    if has_flag(&args, "--stream") {
        return stream_to_stdout(config, options);
    }

    let store = match arg_value(&args, "--db") {
        Some(path) => SimStore::open(path)?,
        None => SimStore::in_memory()?,
    };
    let run_id = engine::new_run_id();
    let mut engine = SimEngine::build_with_store(run_id, config, store)?;
    let report = engine.run()?;

    if has_flag(&args, "--summary") {
        print_summary(&engine, &report);
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Stream a configured run to stdout, one JSON line per message.
fn stream_to_stdout(config: SimConfig, options: StreamOptions) -> Result<()> {
    let handle = stream::spawn_run(config, options)?;
    let mut stdout = io::stdout().lock();
    let mut closed = false;
    for message in &handle.messages {
        if writeln!(stdout, "{}", serde_json::to_string(&message)?).is_err() {
            closed = true;
            break;
        }
    }
    if closed {
        handle.close()?;
    } else {
        stdout.flush()?;
        handle.join()?;
    }
    Ok(())
}

/// What end of input means once the configuration has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputEnd {
    /// The client hung up: cancel the run.
    Cancel,
    /// The client has nothing more to say: keep streaming.
    KeepRunning,
}

/// One streaming session: a configuration line in, snapshots out.
fn serve_session<R, W>(mut input: R, mut output: W, options: StreamOptions, on_eof: InputEnd) -> Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        log::info!("session closed before sending a configuration");
        return Ok(());
    }

    let handle = match SimConfig::from_json(line.trim()).and_then(|c| stream::spawn_run(c, options)) {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("session rejected: {e}");
            write_frame(&mut output, &ErrorFrame::from_error(&e))?;
            return Ok(());
        }
    };
    log::info!("session started run {}", handle.run_id);

    // Watch the client: extra lines are ignored.
    let cancel = handle.cancel.clone();
    let run_id = handle.run_id.clone();
    thread::spawn(move || {
        let mut extra = String::new();
        loop {
            extra.clear();
            match input.read_line(&mut extra) {
                Ok(0) | Err(_) => break,
                Ok(_) => log::warn!("run {run_id}: ignoring client message after configuration"),
            }
        }
        if on_eof == InputEnd::Cancel {
            cancel.cancel();
        } else {
            log::debug!("run {run_id}: client input closed");
        }
    });

    let mut client_gone = false;
    for message in &handle.messages {
        let json = serde_json::to_string(&message)?;
        if writeln!(output, "{json}").and_then(|_| output.flush()).is_err() {
            client_gone = true;
            break;
        }
    }
    if client_gone {
        log::info!("run {}: client gone, cancelling", handle.run_id);
        handle.close()?;
        return Ok(());
    }

    match handle.join() {
        Ok(RunOutcome::Completed(_)) => {}
        Ok(RunOutcome::Cancelled { minute }) => log::info!("session cancelled at minute {minute}"),
        Err(e) => {
            log::error!("session failed: {e}");
            write_frame(&mut output, &ErrorFrame::from_error(&e))?;
        }
    }
    Ok(())
}

/// Accept connections forever, one session thread per connection.
fn listen(addr: &str, options: StreamOptions) -> Result<()> {
    let listener = TcpListener::bind(addr).with_context(|| format!("cannot listen on {addr}"))?;
    log::info!("listening on {addr}");
    for connection in listener.incoming() {
        let socket = match connection {
            Ok(socket) => socket,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };
        let options = options.clone();
        thread::spawn(move || {
            let peer = socket.peer_addr().map(|p| p.to_string()).unwrap_or_default();
            if let Err(e) = serve_connection(socket, options) {
                log::warn!("session with {peer} ended with error: {e}");
            }
        });
    }
    Ok(())
}

fn serve_connection(socket: TcpStream, options: StreamOptions) -> Result<()> {
    let reader = BufReader::new(socket.try_clone()?);
    let writer = socket.try_clone()?;
    let result = serve_session(reader, writer, options, InputEnd::Cancel);
    // Also wakes the watcher blocked on its clone.
    if let Err(e) = socket.shutdown(Shutdown::Both) {
        log::debug!("session shutdown: {e}");
    }
    result
}

fn write_frame<W: Write>(output: &mut W, frame: &ErrorFrame) -> Result<()> {
    writeln!(output, "{}", serde_json::to_string(frame)?)?;
    output.flush()?;
    Ok(())
}

fn print_summary(engine: &SimEngine, report: &SimReport) {
    let config = engine.config();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", engine.run_id);
    println!("  finished:        {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  seed:            {}", engine.seed());
    println!("  runways:         {}", config.runways.len());
    println!("  duration:        {} min", engine.clock.duration);
    println!();
    println!("=== ARRIVALS ===");
    println!("  generated:       {}", report.total_inbound);
    println!("  landed:          {}", report.total_arrivals);
    println!("  diverted:        {}", report.total_diversions);
    println!("  max holding:     {}", report.max_holding_size);
    println!("  avg holding:     {:.1} min (max {:.1})", report.avg_holding_time, report.max_holding_time);
    println!("  avg delay:       {:.1} min (max {:.1})", report.avg_arrival_delay, report.max_arrival_delay);
    println!();
    println!("=== DEPARTURES ===");
    println!("  generated:       {}", report.total_outbound);
    println!("  departed:        {}", report.total_departures);
    println!("  cancelled:       {}", report.total_cancellations);
    println!("  max queue:       {}", report.max_takeoff_queue_size);
    println!("  avg wait:        {:.1} min (max {:.1})", report.avg_takeoff_wait, report.max_takeoff_wait);
    println!("  avg delay:       {:.1} min (max {:.1})", report.avg_takeoff_delay, report.max_takeoff_delay);
    println!();
    println!("  still waiting at end: {}", report.total_unresolved_at_end);
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
