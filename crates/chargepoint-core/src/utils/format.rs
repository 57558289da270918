/// Turn a vendor status like `IN_USE` into `In Use`.
pub fn humanize_status(status: &str) -> String {
    status
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_status() {
        assert_eq!(humanize_status("IN_USE"), "In Use");
        assert_eq!(humanize_status("fully_charged"), "Fully Charged");
        assert_eq!(humanize_status("AVAILABLE"), "Available");
        assert_eq!(humanize_status(""), "");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(7.2, 2), 7.2);
        assert_eq!(round_to(3.456, 2), 3.46);
        assert_eq!(round_to(15.123, 2), 15.12);
        assert_eq!(round_to(2.0, 0), 2.0);
    }
}
