use crate::error::NetworkError;
use crate::transit::{Cost, Seconds, Timestamp};

// A fast way to check a buffer is all zeros (https://stackoverflow.com/questions/65367552/how-to-efficiently-check-a-vecu8-to-see-if-its-all-zeros).
pub fn is_zero(buf: &[bool]) -> bool {
    let (prefix, aligned, suffix) = unsafe { buf.align_to::<u128>() };

    prefix.iter().all(|&x| !x)
        && aligned.iter().all(|&x| x == 0)
        && suffix.iter().all(|&x| !x)
}

fn parse_time_impl(h: &str, m: &str, s: &str) -> Result<Timestamp, std::num::ParseIntError> {
    let hours: i32 = h.parse()?;
    let minutes: i32 = m.parse()?;
    let seconds: i32 = s.parse()?;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parses "H:MM" or "H:MM:SS" (hours may exceed 24).
pub fn parse_time(s: &str) -> Result<Timestamp, NetworkError> {
    let invalid = || NetworkError::InvalidTime(s.to_owned());
    let parts: Vec<&str> = s.trim().split(':').collect();
    let (hour, min, sec) = match parts.as_slice() {
        [h, m] => (*h, *m, "00"),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };
    if hour.is_empty() || min.len() != 2 || sec.len() != 2 {
        return Err(invalid());
    }
    parse_time_impl(hour, min, sec).map_err(|_| invalid())
}

/// Parses durations such as "45s", "3m", "3m45s" or "1h2m".
pub fn parse_duration(s: &str) -> Result<Seconds, NetworkError> {
    let invalid = || NetworkError::InvalidDuration(s.to_owned());
    let mut total = 0;
    let mut number = String::new();
    for c in s.trim().chars() {
        match c {
            '0'..='9' => number.push(c),
            'h' | 'm' | 's' => {
                let value: Seconds = number.parse().map_err(|_| invalid())?;
                number.clear();
                total += match c {
                    'h' => value * 3600,
                    'm' => value * 60,
                    _ => value,
                };
            }
            _ => return Err(invalid()),
        }
    }
    if !number.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

/// Formats a time as "H:MM", or "H:MM:SS" when the seconds are not zero.
pub fn get_time_str(time: Timestamp) -> String {
    let sign = if time < 0 { "-" } else { "" };
    let time = time.abs();
    let hours = time / 3600;
    let minutes = (time % 3600) / 60;
    let seconds = time % 60;
    if seconds == 0 {
        format!("{sign}{hours}:{minutes:02}")
    } else {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Formats a duration as "1h2m3s", leaving out zero parts.
pub fn get_duration_str(duration: Seconds) -> String {
    if duration == 0 {
        return "0s".to_owned();
    }
    let mut text = String::new();
    if duration < 0 {
        text.push('-');
    }
    let duration = duration.abs();
    let (hours, minutes, seconds) = (duration / 3600, (duration % 3600) / 60, duration % 60);
    if hours > 0 {
        text.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        text.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        text.push_str(&format!("{seconds}s"));
    }
    text
}

/// Formats a cost in seconds with '_' as thousands separator, e.g. 815400 -> "8_154".
pub fn get_cost_str(cost: Cost) -> String {
    let sign = if cost < 0 { "-" } else { "" };
    let cost = cost.unsigned_abs();
    let digits = (cost / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('_');
        }
        grouped.push(c);
    }
    match cost % 100 {
        0 => format!("{sign}{grouped}"),
        cents if cents % 10 == 0 => format!("{sign}{grouped}.{}", cents / 10),
        cents => format!("{sign}{grouped}.{cents:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trip() {
        assert_eq!(parse_time("10:00:15").unwrap(), 36_015);
        assert_eq!(parse_time("0:02").unwrap(), 120);
        assert_eq!(parse_time("25:10").unwrap(), 25 * 3600 + 600);
        assert!(parse_time("10").is_err());
        assert!(parse_time("10:0").is_err());
        assert!(parse_time("ab:00").is_err());

        assert_eq!(get_time_str(36_015), "10:00:15");
        assert_eq!(get_time_str(120), "0:02");
        assert_eq!(get_time_str(-60), "-0:01");
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("3m45s").unwrap(), 225);
        assert_eq!(parse_duration("1h").unwrap(), 3600);
        assert!(parse_duration("3x").is_err());
        assert!(parse_duration("30").is_err());

        assert_eq!(get_duration_str(0), "0s");
        assert_eq!(get_duration_str(45), "45s");
        assert_eq!(get_duration_str(180), "3m");
        assert_eq!(get_duration_str(7185), "1h59m45s");
        assert_eq!(get_duration_str(3600), "1h");
    }

    #[test]
    fn costs() {
        assert_eq!(get_cost_str(815_400), "8_154");
        assert_eq!(get_cost_str(36_000), "360");
        assert_eq!(get_cost_str(150), "1.5");
        assert_eq!(get_cost_str(101), "1.01");
        assert_eq!(get_cost_str(0), "0");
        assert_eq!(get_cost_str(100_000_000), "1_000_000");
    }

    #[test]
    fn zero_buffer() {
        let mut buf = vec![false; 300];
        assert!(is_zero(&buf));
        buf[257] = true;
        assert!(!is_zero(&buf));
    }
}
