//! Port allocation for per-credential inbounds.

/// Lowest port handed out to a per-credential inbound.
pub const PORT_RANGE_BASE: u16 = 10000;

/// Smallest port `>= PORT_RANGE_BASE` not present in `occupied`.
///
/// Ports below the base are ignored. Returns `None` once the range up to
/// 65535 is fully taken.
pub fn next_free_port<I>(occupied: I) -> Option<u16>
where
    I: IntoIterator<Item = u16>,
{
    let mut ports: Vec<u16> = occupied
        .into_iter()
        .filter(|p| *p >= PORT_RANGE_BASE)
        .collect();
    ports.sort_unstable();
    ports.dedup();

    let mut candidate = u32::from(PORT_RANGE_BASE);
    for port in ports {
        let port = u32::from(port);
        if port > candidate {
            break;
        }
        if port == candidate {
            candidate += 1;
        }
    }
    u16::try_from(candidate).ok()
}
