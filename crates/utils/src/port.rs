use strip_ansi_escapes::strip;

/// Parse a port number out of an environment value.
///
/// Launchers occasionally hand over values wrapped in ANSI color codes, so
/// those are stripped before parsing.
pub fn parse_port(raw: &str) -> Option<u16> {
    let cleaned = String::from_utf8(strip(raw.as_bytes())).ok()?;
    cleaned.trim().parse::<u16>().ok()
}
