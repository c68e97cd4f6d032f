//! High-level traceroute API

use crate::enrichment::{Geolocator, HopEnricher, NetworkEnricher};
use crate::resolve::resolve_target;
use crate::socket::factory::create_probe_socket;
use crate::traceroute::types::Hop;
use crate::traceroute::{TracerouteConfig, TracerouteEngine, TracerouteError, TracerouteResult};
use std::time::Instant;

/// Resolve `target`, trace the path to it and collect the result.
///
/// `progress` and `geo` are forwarded to [`TracerouteEngine::run`]. When
/// geolocation is enabled the tracing host's own location is looked up
/// after the last hop.
///
/// # Errors
///
/// * `TracerouteError::ResolutionError` - the target has no address
/// * `TracerouteError::SocketError` - the ICMP socket could not be created
/// * `TracerouteError::ConfigError` - the configuration is invalid
pub fn trace<P, G>(
    target: &str,
    config: &TracerouteConfig,
    progress: P,
    geo: G,
) -> Result<TracerouteResult, TracerouteError>
where
    P: FnMut(&Hop),
    G: FnMut(&Hop),
{
    let enricher = NetworkEnricher::new(config.enable_rdns, config.enable_geolocation);
    trace_with_enricher(target, config, Box::new(enricher), progress, geo)
}

/// [`trace`] with a caller-supplied enricher
pub fn trace_with_enricher<P, G>(
    target: &str,
    config: &TracerouteConfig,
    enricher: Box<dyn HopEnricher>,
    progress: P,
    geo: G,
) -> Result<TracerouteResult, TracerouteError>
where
    P: FnMut(&Hop),
    G: FnMut(&Hop),
{
    let start = Instant::now();
    let target_ip = resolve_target(target)?;
    let socket = create_probe_socket(target_ip)?;
    let engine = TracerouteEngine::new(config.clone(), socket, enricher)?;

    tracing::debug!(target, %target_ip, max_hops = config.max_hops, "starting trace");
    let hops = engine.run(target_ip, progress, geo)?;
    let destination_reached = hops.iter().any(|hop| hop.is_destination(target_ip));

    let origin = if config.enable_geolocation {
        Geolocator::new()
            .and_then(|g| g.locate_origin())
            .inspect_err(|e| tracing::debug!(error = %e, "could not locate origin"))
            .ok()
    } else {
        None
    };

    Ok(TracerouteResult {
        target: target.to_string(),
        target_ip,
        hops,
        destination_reached,
        origin,
        total_duration: start.elapsed(),
    })
}

/// Trace `target`, degrading every failure to an empty hop list
pub fn trace_hops<P, G>(target: &str, config: &TracerouteConfig, progress: P, geo: G) -> Vec<Hop>
where
    P: FnMut(&Hop),
    G: FnMut(&Hop),
{
    match trace(target, config, progress, geo) {
        Ok(result) => result.hops,
        Err(e) => {
            tracing::debug!(target, error = %e, "trace failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::NoEnrichment;

    #[test]
    fn test_unresolvable_target() {
        let config = TracerouteConfig::default();
        let result = trace_with_enricher(
            "no-such-host.invalid",
            &config,
            Box::new(NoEnrichment),
            |_| {},
            |_| {},
        );
        assert!(matches!(result, Err(TracerouteError::ResolutionError(_))));

        let hops = trace_hops("no-such-host.invalid", &config, |_| {}, |_| {});
        assert!(hops.is_empty());
    }
}
