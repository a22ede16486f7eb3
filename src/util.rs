// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Formats a position in seconds as MM:SS. Negative or non-finite values
/// render as 00:00 rather than propagating garbage into the display.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Capitalizes the first character of a display name. Taal and instrument
/// names are stored lowercase in the catalog.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::{capitalize, format_time};

    #[test]
    fn test_format_time() {
        assert_eq!("00:00", format_time(0.0));
        assert_eq!("00:05", format_time(5.2));
        assert_eq!("00:55", format_time(55.0));
        assert_eq!("01:00", format_time(60.0));
        assert_eq!("02:05", format_time(125.7));
        assert_eq!("60:06", format_time(3606.0));
        assert_eq!("00:00", format_time(-3.0));
        assert_eq!("00:00", format_time(f64::NAN));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!("Teental", capitalize("teental"));
        assert_eq!("Santoor", capitalize("santoor"));
        assert_eq!("", capitalize(""));
        assert_eq!("All", capitalize("all"));
    }
}
