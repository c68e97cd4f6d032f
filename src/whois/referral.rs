//! Referral extraction from WHOIS responses

/// Line prefixes that announce a more specific server, lowercase
const REFERRAL_MARKERS: [&str; 3] = ["referralserver:", "refer:", "registrar whois server:"];

/// First referral hostname in `text`, scheme and port removed
pub fn find_referral(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        REFERRAL_MARKERS
            .iter()
            .find(|marker| lower.starts_with(*marker))
            .and_then(|marker| bare_host(&line[marker.len()..]))
    })
}

/// `whois://host:4321/` -> `host`
fn bare_host(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value
        .split_once("://")
        .map_or(value, |(_, rest)| rest);
    let host = value
        .split(['/', ' ', '\t'])
        .next()
        .unwrap_or_default();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}
