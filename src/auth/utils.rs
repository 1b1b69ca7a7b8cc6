use crate::auth::session::Session;

/// Decodes HTML character references in display names, which the issuing
/// WordPress site escapes before signing (`Jo&amp;Ann` -> `Jo&Ann`).
///
/// Unknown or malformed references are left untouched.
pub fn decode_html_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];

        match candidate[1..].find(';').filter(|end| *end <= 10) {
            Some(end) => {
                let entity = &candidate[1..end + 1];
                match resolve_entity(entity) {
                    Some(ch) => {
                        out.push(ch);
                        rest = &candidate[end + 2..];
                    }
                    None => {
                        out.push('&');
                        rest = &candidate[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201c}'),
        "rdquo" => Some('\u{201d}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    }
}

/// Whether the session may see a SKU's content: a purchase or any active
/// subscription grants it.
pub fn has_exam_access(session: &Session, product_sku: &str) -> bool {
    session.is_subscribed || session.paid_exam_ids.iter().any(|sku| sku == product_sku)
}
