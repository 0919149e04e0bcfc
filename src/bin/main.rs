use std::{
    error::Error,
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossterm::{
    cursor, execute,
    terminal::{self, ClearType},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use hoststat::{
    cli::{Cli, Commands, parse_args},
    config::{Config, load_config, to_yaml},
    format::parse_interval,
    report::{
        HostReport, Renderer, ReportOptions, Section, SectionData, SectionReport,
        build_report, collect_services,
    },
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Report {
            sections,
            json,
            no_color,
            raw_bytes,
            interface,
            all_services,
            load_percent,
            stream,
        } => {
            let options = ReportOptions {
                sections,
                color: !no_color,
                human_bytes: !raw_bytes,
                interface,
                all_services,
                load_percent,
            };

            match stream {
                Some(window) => {
                    let interval = parse_interval(&window)?;
                    stream_reports(&config, &options, json, Duration::from_secs(interval))?;
                }
                None => print_report(&build_report(&config, &options), &options, json)?,
            }
        }
        Commands::Services {
            json,
            no_color,
            all_services,
        } => {
            let options = ReportOptions {
                sections: vec![Section::Services],
                color: !no_color,
                all_services,
                ..ReportOptions::default()
            };
            let records = collect_services(&config, &options)?;
            info!("Correlated {} services", records.len());

            let report = HostReport {
                captured_at: chrono::Utc::now(),
                sections: vec![SectionReport {
                    section: Section::Services,
                    data: Some(SectionData::Services(records)),
                    error: None,
                }],
            };
            print_report(&report, &options, json)?;
        }
        Commands::Config => {
            print!("{}", to_yaml(&config)?);
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_report(
    report: &HostReport,
    options: &ReportOptions,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(report)?)?;
    } else {
        write!(stdout, "{}", Renderer::new(options).render(report))?;
    }
    stdout.flush()?;
    Ok(())
}

/// Redraws the report every `interval` until interrupted.
fn stream_reports(
    config: &Config,
    options: &ReportOptions,
    json: bool,
    interval: Duration,
) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let interval = interval.max(Duration::from_secs(1));
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let report = build_report(config, options);

        if !json {
            execute!(
                io::stdout(),
                terminal::Clear(ClearType::All),
                cursor::MoveTo(0, 0)
            )?;
        }
        print_report(&report, options, json)?;

        let deadline = started + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(100));
        }
    }

    debug!("Stream interrupted; exiting");
    Ok(())
}
