// query.rs - Argument Parsing
// Turns the command arguments (and an optional replied-to message) into a
// search title and a requested image count.

/// Count used when no numeric token is given
pub const DEFAULT_COUNT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub title: String,
    /// Requested count, not yet clamped
    pub count: i64,
}

impl ParsedQuery {
    /// Clamp the requested count into `1..=max_num`
    pub fn clamped_count(&self, max_num: u32) -> u32 {
        self.count.clamp(1, i64::from(max_num.max(1))) as u32
    }
}

/// Parse `args`, using `reply_text` as the title when the command replies to a message.
///
/// Numeric tokens (`n=<int>` or bare digits) set the count, last one wins.
/// Outside reply mode the remaining tokens form the title; in reply mode they are dropped.
pub fn parse_arguments(reply_text: Option<&str>, args: &str) -> ParsedQuery {
    let mut title = reply_text.map(|t| t.trim().to_string()).unwrap_or_default();
    let mut count = DEFAULT_COUNT;

    let parts: Vec<&str> = args.split_whitespace().collect();
    let mut numeric_parts: Vec<&str> = Vec::new();

    for &part in &parts {
        if let Some(value) = strip_count_prefix(part) {
            // `n=3=4` reads as 3; unparseable values stay in the title
            let value = value.split('=').next().unwrap_or_default();
            if let Some(n) = parse_integer(value) {
                count = n;
                numeric_parts.push(part);
            }
        } else if is_digit_token(part) {
            if let Some(n) = parse_integer(part) {
                count = n;
                numeric_parts.push(part);
            }
        }
    }

    if reply_text.is_none() {
        title = parts
            .iter()
            .filter(|p| !numeric_parts.contains(*p))
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
    }

    ParsedQuery {
        title: title.trim().to_string(),
        count,
    }
}

fn strip_count_prefix(token: &str) -> Option<&str> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some('n' | 'N'), Some('=')) => Some(&token[2..]),
        _ => None,
    }
}

fn digit_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        // full-width digits from CJK input methods
        '０'..='９' => Some(c as u32 - '０' as u32),
        _ => None,
    }
}

fn is_digit_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| digit_value(c).is_some())
}

/// Signed integer parse that saturates instead of overflowing
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.chars().next()? {
        '-' => (true, &text[1..]),
        '+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }

    let mut value: i64 = 0;
    for c in digits.chars() {
        let d = i64::from(digit_value(c)?);
        value = value.saturating_mul(10).saturating_add(d);
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(title: &str, count: i64) -> ParsedQuery {
        ParsedQuery {
            title: title.to_string(),
            count,
        }
    }

    #[test]
    fn n_equals_sets_count() {
        assert_eq!(parse_arguments(None, "泡芙 n=3"), parsed("泡芙", 3));
        assert_eq!(parse_arguments(None, "N=8 泡芙"), parsed("泡芙", 8));
    }

    #[test]
    fn bare_number_sets_count() {
        assert_eq!(parse_arguments(None, "泡芙 7"), parsed("泡芙", 7));
    }

    #[test]
    fn default_count_and_whitespace_collapsing() {
        assert_eq!(
            parse_arguments(None, "  我  是 维维  "),
            parsed("我 是 维维", DEFAULT_COUNT)
        );
    }

    #[test]
    fn last_numeric_token_wins() {
        assert_eq!(parse_arguments(None, "泡芙 2 n=9"), parsed("泡芙", 9));
        assert_eq!(parse_arguments(None, "n=9 泡芙 4"), parsed("泡芙", 4));
    }

    #[test]
    fn malformed_n_value_is_ignored_and_kept_in_title() {
        assert_eq!(parse_arguments(None, "泡芙 n=abc"), parsed("泡芙 n=abc", 5));
        assert_eq!(parse_arguments(None, "n= 泡芙 n=4"), parsed("n= 泡芙", 4));
    }

    #[test]
    fn signed_and_chained_n_values() {
        assert_eq!(parse_arguments(None, "泡芙 n=-3"), parsed("泡芙", -3));
        assert_eq!(parse_arguments(None, "泡芙 n=+6"), parsed("泡芙", 6));
        assert_eq!(parse_arguments(None, "泡芙 n=3=4"), parsed("泡芙", 3));
    }

    #[test]
    fn full_width_digits_count() {
        assert_eq!(parse_arguments(None, "泡芙 ３"), parsed("泡芙", 3));
    }

    #[test]
    fn oversized_numbers_saturate() {
        let q = parse_arguments(None, "泡芙 99999999999999999999999");
        assert_eq!(q.title, "泡芙");
        assert_eq!(q.count, i64::MAX);
        assert_eq!(q.clamped_count(10), 10);
    }

    #[test]
    fn reply_text_becomes_title() {
        assert_eq!(
            parse_arguments(Some("  这是被引用的话  "), "3"),
            parsed("这是被引用的话", 3)
        );
    }

    #[test]
    fn reply_mode_drops_non_numeric_arguments() {
        assert_eq!(
            parse_arguments(Some("引用"), "额外 内容 n=2"),
            parsed("引用", 2)
        );
    }

    #[test]
    fn numeric_only_arguments_give_empty_title() {
        assert_eq!(parse_arguments(None, "5"), parsed("", 5));
        assert_eq!(parse_arguments(None, ""), parsed("", 5));
    }

    #[test]
    fn clamped_count_stays_in_range() {
        for requested in [-100, -1, 0, 1, 5, 10, 11, 1000] {
            let q = parsed("x", requested);
            let count = q.clamped_count(10);
            assert!((1..=10).contains(&count), "{requested} -> {count}");
        }
        assert_eq!(parsed("x", 0).clamped_count(10), 1);
        assert_eq!(parsed("x", 7).clamped_count(10), 7);
    }
}
