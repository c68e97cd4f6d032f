//! WHOIS server selection and query formatting

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::net::IpAddr;

/// Root server, used for unknown TLDs
pub const IANA_SERVER: &str = "whois.iana.org";
/// Regional registry used for IP address targets
pub const IP_REGISTRY_SERVER: &str = "whois.arin.net";

const VERISIGN: &str = "whois.verisign-grs.com";
const DENIC: &str = "whois.denic.de";
const JPRS: &str = "whois.jprs.jp";

static TLD_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("com", VERISIGN),
        ("net", VERISIGN),
        ("org", "whois.pir.org"),
        ("info", "whois.nic.info"),
        ("io", "whois.nic.io"),
        ("dev", "whois.nic.google"),
        ("app", "whois.nic.google"),
        ("ai", "whois.nic.ai"),
        ("co", "whois.nic.co"),
        ("me", "whois.nic.me"),
        ("us", "whois.nic.us"),
        ("uk", "whois.nic.uk"),
        ("de", DENIC),
        ("fr", "whois.nic.fr"),
        ("nl", "whois.domain-registry.nl"),
        ("eu", "whois.eu"),
        ("ca", "whois.cira.ca"),
        ("au", "whois.auda.org.au"),
        ("jp", JPRS),
        ("cn", "whois.cnnic.cn"),
        ("ru", "whois.tcinet.ru"),
        ("br", "whois.registro.br"),
        ("in", "whois.registry.in"),
        ("edu", "whois.educause.edu"),
        ("gov", "whois.dotgov.gov"),
    ])
});

/// First server to ask about `target`
pub fn initial_server(target: &str) -> &'static str {
    let target = target.trim().trim_end_matches('.');
    if target
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
    {
        return IP_REGISTRY_SERVER;
    }

    target
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .and_then(|tld| TLD_SERVERS.get(tld.as_str()).copied())
        .unwrap_or(IANA_SERVER)
}

/// Query line for `target` in the dialect `server` expects
pub fn format_query(server: &str, target: &str) -> String {
    let target = target.trim();
    match server.to_ascii_lowercase().as_str() {
        VERISIGN => format!("={target}\r\n"),
        DENIC => format!("-T dn,ace {target}\r\n"),
        JPRS => format!("{target}/e\r\n"),
        _ => format!("{target}\r\n"),
    }
}
