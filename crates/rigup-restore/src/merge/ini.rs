//! Key-value section merge for INI-style files.
//!
//! Per-section, source keys overwrite or add; keys and sections present
//! only in the target are preserved verbatim, including comments and
//! blank lines. Overridden keys keep their original line formatting
//! around the separator; missing keys are appended at the end of their
//! section; sections absent from the target are appended at the end of
//! the file in source order.

/// One section of parsed source content. The empty name is the global
/// (pre-header) section.
struct SourceSection {
    name: String,
    pairs: Vec<(String, String)>,
}

/// Merge source INI content into existing target content.
///
/// With no existing content, the result is the source rendered in
/// canonical `key=value` form. Output always ends with a newline.
pub fn merge_ini(source: &str, existing: Option<&str>) -> anyhow::Result<String> {
    let sections = parse_sections(source);

    let Some(content) = existing else {
        return Ok(render(&sections));
    };

    let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();

    for section in &sections {
        merge_section(&mut lines, section);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Parse INI content into ordered sections with ordered key/value pairs.
/// Comment lines (`;` or `#`) and blanks are dropped; later duplicates of
/// a key within a section win.
fn parse_sections(content: &str) -> Vec<SourceSection> {
    let mut sections: Vec<SourceSection> = Vec::new();
    let mut current = SourceSection {
        name: String::new(),
        pairs: Vec::new(),
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        if let Some(name) = section_header(trimmed) {
            if !current.pairs.is_empty() || !current.name.is_empty() {
                sections.push(current);
            }
            current = SourceSection {
                name: name.to_string(),
                pairs: Vec::new(),
            };
            continue;
        }
        if let Some((key, value)) = split_pair(trimmed) {
            current.pairs.retain(|(k, _)| k != key);
            current.pairs.push((key.to_string(), value.to_string()));
        }
    }
    if !current.pairs.is_empty() || !current.name.is_empty() {
        sections.push(current);
    }

    sections
}

fn section_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim())
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let idx = line.find('=')?;
    Some((line[..idx].trim_end(), line[idx + 1..].trim_start()))
}

/// Merge one source section into target lines in place.
fn merge_section(lines: &mut Vec<String>, section: &SourceSection) {
    let bounds = find_section(lines, &section.name);

    let Some((start, end)) = bounds else {
        // Section absent from target: append header and pairs at the end.
        if !lines.is_empty() && !lines.last().map(|l| l.trim().is_empty()).unwrap_or(true) {
            lines.push(String::new());
        }
        if !section.name.is_empty() {
            lines.push(format!("[{}]", section.name));
        }
        for (key, value) in &section.pairs {
            lines.push(format!("{}={}", key, value));
        }
        return;
    };

    let mut insert_at = match last_content_line(lines, start, end) {
        Some(idx) => idx + 1,
        None => start,
    };

    for (key, value) in &section.pairs {
        match find_key(lines, start, end.min(lines.len()), key) {
            Some(idx) => {
                lines[idx] = replace_value(&lines[idx], value);
            }
            None => {
                lines.insert(insert_at, format!("{}={}", key, value));
                insert_at += 1;
            }
        }
    }
}

/// Line range `[start, end)` of a section's body in the target, where
/// `start` is the first line after the header (or 0 for the global
/// section) and `end` is the next header or end of file.
fn find_section(lines: &[String], name: &str) -> Option<(usize, usize)> {
    let mut start = None;

    if name.is_empty() {
        start = Some(0);
    }

    for (i, line) in lines.iter().enumerate() {
        if let Some(header) = section_header(line.trim()) {
            match start {
                Some(s) => return Some((s, i)),
                None if header.eq_ignore_ascii_case(name) => start = Some(i + 1),
                None => {}
            }
        }
    }

    start.map(|s| (s, lines.len()))
}

/// Index of the last non-blank, non-comment line in the range, the
/// header line when the body is empty, or `None` for an empty global
/// section.
fn last_content_line(lines: &[String], start: usize, end: usize) -> Option<usize> {
    let mut last = if start > 0 { Some(start - 1) } else { None };
    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with(';') && !trimmed.starts_with('#') {
            last = Some(i);
        }
    }
    last
}

fn find_key(lines: &[String], start: usize, end: usize, key: &str) -> Option<usize> {
    for (i, line) in lines.iter().enumerate().take(end).skip(start) {
        let trimmed = line.trim();
        if trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        if let Some((k, _)) = split_pair(trimmed) {
            if k.eq_ignore_ascii_case(key) {
                return Some(i);
            }
        }
    }
    None
}

/// Replace the value portion of a `key=value` line, keeping the key text
/// and separator spacing intact.
fn replace_value(line: &str, value: &str) -> String {
    match line.find('=') {
        Some(idx) => {
            let right = &line[idx + 1..];
            let pad = if right.starts_with(' ') { " " } else { "" };
            format!("{}={}{}", &line[..=idx], pad, value)
        }
        None => format!("{}={}", line, value),
    }
}

fn render(sections: &[SourceSection]) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !section.name.is_empty() {
            out.push_str(&format!("[{}]\n", section.name));
        }
        for (key, value) in &section.pairs {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }
    out
}
