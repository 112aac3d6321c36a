use std::cmp;
use std::fmt::Write;

/// Renders `data` in the canonical hex+ASCII layout, sixteen bytes per line.
///
/// `offset` is added to every printed address, so a payload can be shown at its position in
/// the stream. At most `limit` bytes are rendered when a limit is given.
pub fn hexdump(data: &[u8], offset: usize, limit: Option<usize>) -> String {
    let shown = &data[..cmp::min(data.len(), limit.unwrap_or(data.len()))];
    let mut out = String::new();

    let mut address = 0;
    while address < shown.len() {
        let end = cmp::min(address + 16, shown.len());
        format_line(&mut out, &shown[address..end], address + offset);
        address += 16;
    }

    if shown.len() < data.len() {
        let _ = writeln!(out, "... ({} more bytes)", data.len() - shown.len());
    }

    out
}

fn format_line(out: &mut String, line: &[u8], address: usize) {
    let _ = write!(out, "{:08x}:", address);

    for b in line {
        let _ = write!(out, " {:02x}", b);
    }

    // align the ASCII column of a short last line
    for _ in line.len()..16 {
        out.push_str("   ");
    }

    out.push_str("  ");
    for &c in line {
        match (c as char).is_ascii_graphic() || c == b' ' {
            true => out.push(c as char),
            false => out.push('.'),
        }
    }
    out.push('\n');
}
