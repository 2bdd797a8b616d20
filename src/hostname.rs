// src/hostname.rs
//! Log selection by host name.
//!
//! The first DNS label names the logs, separated by hyphens:
//! `rocketeer-nimbus.example.com` selects the logs matching `rocketeer` and
//! `nimbus`, in that order.

/// Log tokens encoded in `hostname`, in order. Empty segments are dropped.
pub fn log_tokens(hostname: &str) -> Vec<&str> {
    let label = hostname.split_once('.').map_or(hostname, |(label, _)| label);
    label.split('-').filter(|token| !token.is_empty()).collect()
}

/// Strip a `:port` suffix from an HTTP host, leaving IPv6 literals intact
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}
