//! netdiag - ping, traceroute, DNS and WHOIS from one command line.
//!
//! This is the command-line interface for the netdiag library.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netdiag::dns::{format_sections, query_all, reverse_name, DnsResolver, RecordLookup};
use netdiag::ping::{ping, EchoResult, PingStats};
use netdiag::traceroute::{trace, Hop, TracerouteConfigBuilder, TracerouteResult};
use netdiag::whois::WhoisClient;
use netdiag::RecordType;
use std::net::IpAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Get the version string for netdiag
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the diagnostics tool.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Ping, traceroute, DNS and WHOIS diagnostics", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Output results in JSON format
    #[clap(long, global = true)]
    json: bool,

    /// Enable verbose logging to stderr (-v debug, -vv trace)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send ICMP echo requests
    Ping {
        /// Target hostname or IP address
        host: String,

        /// Number of echo requests
        #[clap(short, long, default_value_t = 4)]
        count: u32,

        /// Interval between requests in milliseconds
        #[clap(short, long, default_value_t = 1000)]
        interval_ms: u64,

        /// Reply timeout in milliseconds
        #[clap(short = 'W', long, default_value_t = netdiag::config::timing::DEFAULT_PING_TIMEOUT_MS)]
        timeout_ms: u64,
    },

    /// Trace the path to a host
    Trace {
        /// Target hostname or IP address
        host: String,

        /// Maximum number of hops
        #[clap(short = 'm', long, default_value_t = 30)]
        max_hops: u8,

        /// Number of probes per hop
        #[clap(short = 'q', long, default_value_t = 2)]
        queries: u8,

        /// Timeout for individual probes in milliseconds
        #[clap(long, default_value_t = netdiag::config::timing::DEFAULT_TRACE_PROBE_TIMEOUT_MS)]
        probe_timeout_ms: u64,

        /// Disable reverse DNS lookups
        #[clap(long)]
        no_rdns: bool,

        /// Disable geolocation
        #[clap(long)]
        no_geo: bool,
    },

    /// Query DNS records
    Dns {
        /// Domain to query, or an IP address with --reverse
        name: String,

        /// Record type (A, AAAA, MX, NS, TXT, CNAME, SOA, PTR, TYPEnnn) or ALL
        #[clap(short = 't', long = "type", default_value = "A")]
        record_type: String,

        /// Query this server over UDP instead of the system resolver
        #[clap(short, long)]
        server: Option<String>,

        /// Look up the PTR record for an IP address
        #[clap(short = 'x', long)]
        reverse: bool,
    },

    /// Look up WHOIS registration data
    Whois {
        /// Domain name or IP address
        target: String,

        /// Start at this server instead of choosing one
        #[clap(long)]
        server: Option<String>,

        /// Maximum number of referrals to follow
        #[clap(long, default_value_t = netdiag::whois::DEFAULT_MAX_REFERRALS)]
        max_referrals: usize,
    },
}

/// JSON output structure for a ping run
#[derive(Debug, serde::Serialize)]
struct JsonPing<'a> {
    version: &'static str,
    target: &'a str,
    results: &'a [EchoResult],
    stats: PingStats,
}

/// JSON output structure for a DNS query
#[derive(Debug, serde::Serialize)]
struct JsonDns<'a, T: serde::Serialize> {
    version: &'static str,
    name: &'a str,
    server: Option<&'a str>,
    answer: T,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let json = args.json;
    match args.command {
        Command::Ping {
            host,
            count,
            interval_ms,
            timeout_ms,
        } => run_ping(&host, count, interval_ms, timeout_ms, json),
        Command::Trace {
            host,
            max_hops,
            queries,
            probe_timeout_ms,
            no_rdns,
            no_geo,
        } => {
            let config = TracerouteConfigBuilder::new()
                .max_hops(max_hops)
                .probes_per_hop(queries)
                .probe_timeout(Duration::from_millis(probe_timeout_ms))
                .enable_rdns(!no_rdns)
                .enable_geolocation(!no_geo)
                .build()
                .map_err(|e| anyhow::anyhow!("Invalid configuration - {}", e))?;
            run_trace(&host, &config, json)
        }
        Command::Dns {
            name,
            record_type,
            server,
            reverse,
        } => run_dns(&name, &record_type, server.as_deref(), reverse, json),
        Command::Whois {
            target,
            server,
            max_referrals,
        } => {
            let client = WhoisClient::new().max_referrals(max_referrals);
            let response = match server {
                Some(server) => client.query_server(&server, &target),
                None => client.query(&target),
            }
            .with_context(|| format!("WHOIS lookup for {} failed", target))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("% {} ({} lines)", response.server, response.line_count);
                if response.chain.len() > 1 {
                    println!("% referral chain: {}", response.chain.join(" -> "));
                }
                println!("{}", response.text.trim_end());
            }
            Ok(())
        }
    }
}

fn run_ping(host: &str, count: u32, interval_ms: u64, timeout_ms: u64, json: bool) -> Result<()> {
    let timeout = Duration::from_millis(timeout_ms);
    let mut results = Vec::with_capacity(count as usize);

    for seq in 0..count {
        if seq > 0 {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }
        let result = ping(host, timeout);
        if !json {
            match (result.target, result.rtt_ms) {
                (Some(ip), Some(ms)) => println!("reply from {}: seq={} time={:.3} ms", ip, seq, ms),
                (Some(ip), None) => println!("no reply from {}: seq={}", ip, seq),
                (None, _) => println!("{}: cannot resolve or probe", host),
            }
        }
        results.push(result);
    }

    let stats = PingStats::from_results(&results);
    if json {
        let output = JsonPing {
            version: get_version(),
            target: host,
            results: &results,
            stats: stats.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "\n--- {} ping statistics ---\n{} sent, {} received, {:.1}% loss",
            host, stats.sent, stats.received, stats.loss_percent
        );
        if let (Some(min), Some(avg), Some(max)) = (stats.min_ms, stats.avg_ms, stats.max_ms) {
            println!("rtt min/avg/max = {:.3}/{:.3}/{:.3} ms", min, avg, max);
        }
    }

    if stats.received == 0 {
        anyhow::bail!("no replies from {}", host);
    }
    Ok(())
}

fn run_trace(host: &str, config: &netdiag::TracerouteConfig, json: bool) -> Result<()> {
    if !json {
        println!(
            "netdiag trace to {}, {} max hops, {} probes per hop, {}ms probe timeout",
            host,
            config.max_hops,
            config.probes_per_hop,
            config.probe_timeout.as_millis()
        );
    }

    let result = trace(
        host,
        config,
        |hop| {
            if !json {
                println!("{}", format_hop(hop));
            }
        },
        |hop| {
            if !json {
                if let Some(detail) = format_enrichment(hop) {
                    println!("    {}", detail);
                }
            }
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display_trace_summary(&result);
    }
    Ok(())
}

fn format_hop(hop: &Hop) -> String {
    match hop.rtt_ms() {
        Some(ms) => format!(
            "{:>2} {} {:.3} ms ({}/{})",
            hop.index(),
            hop.address_string(),
            ms,
            hop.replies,
            hop.probes
        ),
        None => format!("{:>2} *", hop.index()),
    }
}

fn format_enrichment(hop: &Hop) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(name) = &hop.hostname {
        parts.push(name.clone());
    }
    if let Some(location) = &hop.location {
        parts.push(location.clone());
    }
    if let Some(geo) = &hop.geo {
        match (geo.asn, &geo.isp) {
            (Some(asn), Some(isp)) => parts.push(format!("AS{} {}", asn, isp)),
            (Some(asn), None) => parts.push(format!("AS{}", asn)),
            (None, Some(isp)) => parts.push(isp.clone()),
            (None, None) => {}
        }
    }
    (!parts.is_empty()).then(|| parts.join(" | "))
}

fn display_trace_summary(result: &TracerouteResult) {
    println!();
    if result.destination_reached {
        println!(
            "Reached {} ({}) in {} hops, {:.1}s",
            result.target,
            result.target_ip,
            result.hop_count(),
            result.total_duration.as_secs_f64()
        );
    } else {
        println!(
            "Did not reach {} ({}) within {} hops",
            result.target,
            result.target_ip,
            result.hop_count()
        );
    }
    if let Some(origin) = &result.origin {
        println!("Traced from {}", origin.location_string());
    }
}

fn run_dns(name: &str, record_type: &str, server: Option<&str>, reverse: bool, json: bool) -> Result<()> {
    let resolver = DnsResolver::new();

    let (domain, record_type) = if reverse {
        let ip: IpAddr = name
            .parse()
            .with_context(|| format!("--reverse needs an IP address, got '{}'", name))?;
        (reverse_name(ip), "PTR".to_string())
    } else {
        (name.to_string(), record_type.to_string())
    };

    if record_type.eq_ignore_ascii_case("ALL") {
        let sections = query_all(&resolver, &domain, server);
        if json {
            let output = JsonDns {
                version: get_version(),
                name: &domain,
                server,
                answer: &sections,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print!("{}", format_sections(&sections));
        }
        return Ok(());
    }

    let rtype: RecordType = record_type.parse().map_err(anyhow::Error::msg)?;
    let records = resolver
        .query(&domain, rtype, server)
        .with_context(|| format!("{} lookup for {} failed", rtype, domain))?;

    if json {
        let output = JsonDns {
            version: get_version(),
            name: &domain,
            server,
            answer: &records,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if records.is_empty() {
        println!(";; no {} records for {}", rtype, domain);
    } else {
        for record in &records {
            println!("{}", record);
        }
    }
    Ok(())
}
