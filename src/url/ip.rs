use std::net::Ipv4Addr;

/// Parses a host literal the way `inet_aton` does
///
/// Accepts one to four dot-separated parts, each written in decimal, octal
/// (leading `0`) or hexadecimal (leading `0x`). The last part fills all
/// remaining bytes of the address, so `127.1` and `2130706433` both denote
/// `127.0.0.1`.
///
/// # Returns
///
/// * `Some(Ipv4Addr)` - The host is a numeric IPv4 literal
/// * `None` - The host is a name (or an out of range number)
pub fn parse_ipv4_literal(host: &str) -> Option<Ipv4Addr> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        return None;
    }

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 4 {
        return None;
    }

    let mut numbers = Vec::with_capacity(parts.len());
    for part in &parts {
        numbers.push(parse_part(part)?);
    }

    let (last, leading) = numbers.split_last()?;
    let mut address: u64 = 0;
    for (i, n) in leading.iter().enumerate() {
        if *n > 255 {
            return None;
        }
        address |= n << (8 * (3 - i));
    }

    let remaining_bits = 8 * (4 - leading.len());
    if remaining_bits < 64 && *last >= (1u64 << remaining_bits) {
        return None;
    }
    address |= last;

    u32::try_from(address).ok().map(Ipv4Addr::from)
}

/// Returns the canonical address when `host` is an IPv4 literal written in
/// any form other than plain dotted decimal
pub fn obfuscated_ip(host: &str) -> Option<Ipv4Addr> {
    let ip = parse_ipv4_literal(host)?;
    if ip.to_string() == host {
        None
    } else {
        Some(ip)
    }
}

fn parse_part(part: &str) -> Option<u64> {
    if part.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return Some(0);
        }
        (hex, 16)
    } else if part.len() > 1 && part.starts_with('0') {
        (&part[1..], 8)
    } else {
        (part, 10)
    };
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
