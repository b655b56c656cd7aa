//! Small natural-language helpers for assembled replies

/// Join items as `a`, `a and b`, `a, b and c`.
///
/// `wrap` decorates each item (e.g. wrapping prefixes in backticks);
/// `conjunction` links the last two items.
pub fn pretty_list<S, F>(items: &[S], wrap: F, conjunction: &str) -> String
where
    S: AsRef<str>,
    F: Fn(&str) -> String,
{
    let formatted: Vec<String> = items.iter().map(|i| wrap(i.as_ref())).collect();
    match formatted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} {} {}", head.join(", "), conjunction, last),
    }
}

/// `pretty_list` with no decoration and "and"
pub fn pretty_and<S: AsRef<str>>(items: &[S]) -> String {
    pretty_list(items, str::to_string, "and")
}

const UNITS: [(&str, u64); 7] = [
    ("second", 1),
    ("minute", 60),
    ("hour", 3_600),
    ("day", 86_400),
    ("week", 604_800),
    ("month", 2_635_200),
    ("year", 31_536_000),
];

/// Coarse human duration using the largest fitting unit, e.g. `4 minutes`
pub fn human_duration(seconds: f64) -> String {
    let seconds = if seconds < 1.0 { 1.0 } else { seconds };
    let (unit, size) = UNITS
        .iter()
        .rev()
        .find(|(_, size)| seconds >= *size as f64)
        .copied()
        .unwrap_or(UNITS[0]);

    let count = (seconds / size as f64).floor() as u64;
    let plural = if count >= 2 { "s" } else { "" };
    format!("{} {}{}", count, unit, plural)
}
