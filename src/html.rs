// Minimal tag scanning for the handful of pages we read. Not a general HTML parser.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Byte ranges of every `<tag ...>...</tag>` block, outermost first match, no nesting.
pub fn tag_blocks<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let open = format!("<{}", to_lower(tag));
    let close = format!("</{}", to_lower(tag));
    let mut out = Vec::new();
    let mut from = 0usize;
    while let Some(rel) = lc[from..].find(&open) {
        let start = from + rel;
        let after_name = start + open.len();
        // `<tr` must not match `<track`.
        let boundary = lc[after_name..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c.is_whitespace() || c == '/') {
            from = after_name;
            continue;
        }
        let Some(end_rel) = lc[after_name..].find(&close) else {
            break;
        };
        let close_start = after_name + end_rel;
        let end = lc[close_start..]
            .find('>')
            .map(|i| close_start + i + 1)
            .unwrap_or(lc.len());
        out.push(&s[start..end]);
        from = end;
    }
    out
}

/// The opening tag of a block, e.g. `<a class="x" href="/y">`.
pub fn open_tag(block: &str) -> &str {
    match block.find('>') {
        Some(i) => &block[..=i],
        None => block,
    }
}

pub fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let lc = to_lower(tag);
    let needle = format!("{}=", to_lower(name));
    let mut from = 0usize;
    while let Some(rel) = lc[from..].find(&needle) {
        let at = from + rel;
        let preceded_ok = at == 0
            || lc[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
        let value_start = at + needle.len();
        if !preceded_ok {
            from = value_start;
            continue;
        }
        let rest = &tag[value_start..];
        let quote = rest.chars().next()?;
        if quote == '"' || quote == '\'' {
            let inner = &rest[1..];
            let end = inner.find(quote)?;
            return Some(&inner[..end]);
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(rest.len());
        return Some(&rest[..end]);
    }
    None
}

pub fn has_class(tag: &str, class: &str) -> bool {
    attr(tag, "class").is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&normalize_entities(&out))
}

pub fn normalize_entities(s: &str) -> String {
    s.replace("&nbsp;", " ").replace("&amp;", "&")
}

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Text of every `<td>`/`<th>` cell in a row, in document order.
pub fn row_cells(row: &str) -> Vec<String> {
    let lc = to_lower(row);
    let mut out = Vec::new();
    let mut from = 0usize;
    loop {
        let next_td = lc[from..].find("<td");
        let next_th = lc[from..].find("<th");
        let (rel, tag) = match (next_td, next_th) {
            (Some(a), Some(b)) if a <= b => (a, "td"),
            (Some(_), Some(b)) => (b, "th"),
            (Some(a), None) => (a, "td"),
            (None, Some(b)) => (b, "th"),
            (None, None) => break,
        };
        let start = from + rel;
        let Some(open_end) = lc[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        let close = format!("</{tag}");
        let end = lc[open_end..]
            .find(&close)
            .map(|i| open_end + i)
            .unwrap_or(lc.len());
        out.push(strip_tags(&row[open_end..end]));
        from = end;
    }
    out
}
