//! Client import from pasted or file CSV: `name,email,phone,address`.

use super::api_client::ClientRequest;

/// Parse CSV text into client rows ready for `POST /api/clients/bulk`.
///
/// Blank lines are skipped and a leading `name,email` header is ignored.
/// Quoted fields may contain commas; `""` inside quotes is a literal quote.
/// Rows without both a name and an email are dropped.
pub fn parse_csv_clients(text: &str) -> Vec<ClientRequest> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
    let Some(first) = lines.first() else {
        return Vec::new();
    };

    let skip = usize::from(looks_like_header(first));
    lines[skip..]
        .iter()
        .filter_map(|line| {
            let mut cols = split_csv_line(line).into_iter().map(|col| col.trim().to_string());
            let name = cols.next().unwrap_or_default();
            let email = cols.next().unwrap_or_default();
            let phone = cols.next().filter(|s| !s.is_empty());
            let address = cols.next().filter(|s| !s.is_empty());

            (!name.is_empty() && !email.is_empty()).then(|| ClientRequest {
                name,
                email,
                phone,
                address,
                company: None,
            })
        })
        .collect()
}

/// `name`, optional spaces, a comma, optional spaces, `email`; any case.
fn looks_like_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.match_indices("name").any(|(at, _)| {
        let rest = lower[at + "name".len()..].trim_start();
        rest.strip_prefix(',')
            .map(|rest| rest.trim_start().starts_with("email"))
            .unwrap_or(false)
    })
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => result.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    result.push(current);
    result
}
