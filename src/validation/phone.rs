//! Phone number normalization
//!
//! Numbers are normalized to E.164 (`+<calling code><national number>`).
//! Only numbering plans in the region table are accepted. International
//! input (`+` or `00` prefix) is matched to a region by calling code;
//! national input is interpreted in a given region. The region decides the
//! trunk prefix to drop, the accepted length and the leading digits.

use std::fmt;

/// Regions with national numbering rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhoneRegion {
    #[default]
    Us,
    Ca,
    Gb,
    Ie,
    Fr,
    De,
    At,
    Es,
    Pt,
    It,
    Be,
    Lu,
    Ch,
    Nl,
    Dk,
    No,
    Se,
    Pl,
    Au,
    Jp,
}

impl PhoneRegion {
    pub const ALL: [PhoneRegion; 20] = [
        PhoneRegion::Us,
        PhoneRegion::Ca,
        PhoneRegion::Gb,
        PhoneRegion::Ie,
        PhoneRegion::Fr,
        PhoneRegion::De,
        PhoneRegion::At,
        PhoneRegion::Es,
        PhoneRegion::Pt,
        PhoneRegion::It,
        PhoneRegion::Be,
        PhoneRegion::Lu,
        PhoneRegion::Ch,
        PhoneRegion::Nl,
        PhoneRegion::Dk,
        PhoneRegion::No,
        PhoneRegion::Se,
        PhoneRegion::Pl,
        PhoneRegion::Au,
        PhoneRegion::Jp,
    ];

    /// Parses an ISO 3166 alpha-2 code, case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|region| region.code().eq_ignore_ascii_case(code.trim()))
    }

    /// ISO 3166 alpha-2 code
    pub fn code(&self) -> &'static str {
        match self {
            PhoneRegion::Us => "US",
            PhoneRegion::Ca => "CA",
            PhoneRegion::Gb => "GB",
            PhoneRegion::Ie => "IE",
            PhoneRegion::Fr => "FR",
            PhoneRegion::De => "DE",
            PhoneRegion::At => "AT",
            PhoneRegion::Es => "ES",
            PhoneRegion::Pt => "PT",
            PhoneRegion::It => "IT",
            PhoneRegion::Be => "BE",
            PhoneRegion::Lu => "LU",
            PhoneRegion::Ch => "CH",
            PhoneRegion::Nl => "NL",
            PhoneRegion::Dk => "DK",
            PhoneRegion::No => "NO",
            PhoneRegion::Se => "SE",
            PhoneRegion::Pl => "PL",
            PhoneRegion::Au => "AU",
            PhoneRegion::Jp => "JP",
        }
    }

    /// International calling code, without `+`
    pub fn calling_code(&self) -> &'static str {
        match self {
            PhoneRegion::Us | PhoneRegion::Ca => "1",
            PhoneRegion::Gb => "44",
            PhoneRegion::Ie => "353",
            PhoneRegion::Fr => "33",
            PhoneRegion::De => "49",
            PhoneRegion::At => "43",
            PhoneRegion::Es => "34",
            PhoneRegion::Pt => "351",
            PhoneRegion::It => "39",
            PhoneRegion::Be => "32",
            PhoneRegion::Lu => "352",
            PhoneRegion::Ch => "41",
            PhoneRegion::Nl => "31",
            PhoneRegion::Dk => "45",
            PhoneRegion::No => "47",
            PhoneRegion::Se => "46",
            PhoneRegion::Pl => "48",
            PhoneRegion::Au => "61",
            PhoneRegion::Jp => "81",
        }
    }

    /// Prefix dialled before national numbers, dropped in E.164
    fn trunk_prefix(&self) -> Option<char> {
        match self {
            PhoneRegion::Us | PhoneRegion::Ca => Some('1'),
            PhoneRegion::Es
            | PhoneRegion::Pt
            | PhoneRegion::It
            | PhoneRegion::Lu
            | PhoneRegion::Dk
            | PhoneRegion::No
            | PhoneRegion::Pl => None,
            _ => Some('0'),
        }
    }

    /// Inclusive length range of the national significant number
    fn national_length(&self) -> (usize, usize) {
        match self {
            PhoneRegion::Us | PhoneRegion::Ca => (10, 10),
            PhoneRegion::Gb => (9, 10),
            PhoneRegion::Ie | PhoneRegion::Se => (7, 9),
            PhoneRegion::Fr
            | PhoneRegion::Es
            | PhoneRegion::Pt
            | PhoneRegion::Ch
            | PhoneRegion::Nl
            | PhoneRegion::Pl
            | PhoneRegion::Au => (9, 9),
            PhoneRegion::De => (7, 11),
            PhoneRegion::At => (7, 13),
            PhoneRegion::It => (6, 11),
            PhoneRegion::Be => (8, 9),
            PhoneRegion::Lu => (4, 11),
            PhoneRegion::Dk | PhoneRegion::No => (8, 8),
            PhoneRegion::Jp => (9, 10),
        }
    }

    /// Checks length and leading digits of a national significant number
    fn accepts(&self, national: &str) -> bool {
        let (min, max) = self.national_length();
        if !(min..=max).contains(&national.len()) {
            return false;
        }
        let bytes = national.as_bytes();
        match self {
            // NANP: area code and exchange both start with 2-9
            PhoneRegion::Us | PhoneRegion::Ca => bytes[0] >= b'2' && bytes[3] >= b'2',
            // Italian numbers keep their leading zero
            PhoneRegion::It => true,
            _ => bytes[0] != b'0',
        }
    }

    /// Region owning an international number, by calling-code prefix.
    /// Calling codes are prefix-free so at most one code matches.
    fn for_international(digits: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|region| digits.starts_with(region.calling_code()))
    }
}

impl fmt::Display for PhoneRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Normalizes `raw` to E.164, interpreting national numbers in `region`.
///
/// Returns `None` when no parseable number exists.
pub fn normalize_phone(raw: &str, region: PhoneRegion) -> Option<String> {
    let trimmed = raw.trim();
    let (international, body) = if let Some(rest) = trimmed.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix("00") {
        (true, rest)
    } else {
        (false, trimmed)
    };

    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' | '/' => {}
            _ => return None,
        }
    }

    if international {
        normalize_international(&digits)
    } else {
        normalize_national(&digits, region)
    }
}

fn normalize_international(digits: &str) -> Option<String> {
    if !(8..=15).contains(&digits.len()) {
        return None;
    }

    let region = PhoneRegion::for_international(digits)?;
    let mut national = &digits[region.calling_code().len()..];
    // "+33 (0)6..." style numbers keep the trunk zero after the code
    if region.trunk_prefix() == Some('0') {
        if let Some(stripped) = national.strip_prefix('0') {
            national = stripped;
        }
    }

    region
        .accepts(national)
        .then(|| format!("+{}{}", region.calling_code(), national))
}

fn normalize_national(digits: &str, region: PhoneRegion) -> Option<String> {
    let mut national = digits;
    if let Some(trunk) = region.trunk_prefix() {
        let (_, max) = region.national_length();
        // A NANP leading '1' is only a trunk prefix on over-long input
        if national.starts_with(trunk) && (trunk == '0' || national.len() > max) {
            national = &national[1..];
        }
    }

    region
        .accepts(national)
        .then(|| format!("+{}{}", region.calling_code(), national))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_codes() {
        assert_eq!(PhoneRegion::from_code("fr"), Some(PhoneRegion::Fr));
        assert_eq!(PhoneRegion::from_code(" GB "), Some(PhoneRegion::Gb));
        assert_eq!(PhoneRegion::from_code("ZZ"), None);
        assert_eq!(PhoneRegion::default().code(), "US");
    }

    #[test]
    fn test_french_national_number() {
        assert_eq!(
            normalize_phone("06 12 34 56 78", PhoneRegion::Fr).as_deref(),
            Some("+33612345678")
        );
        assert_eq!(
            normalize_phone("06.12.34.56.78", PhoneRegion::Fr).as_deref(),
            Some("+33612345678")
        );
    }

    #[test]
    fn test_us_national_number() {
        assert_eq!(
            normalize_phone("(415) 555-2671", PhoneRegion::Us).as_deref(),
            Some("+14155552671")
        );
        assert_eq!(
            normalize_phone("1-415-555-2671", PhoneRegion::Us).as_deref(),
            Some("+14155552671")
        );
    }

    #[test]
    fn test_international_numbers() {
        assert_eq!(
            normalize_phone("+33 6 12 34 56 78", PhoneRegion::Us).as_deref(),
            Some("+33612345678")
        );
        assert_eq!(
            normalize_phone("0033 (0)6 12 34 56 78", PhoneRegion::Us).as_deref(),
            Some("+33612345678")
        );
        assert_eq!(
            normalize_phone("+81 3 1234 5678", PhoneRegion::Fr).as_deref(),
            Some("+81312345678")
        );
    }

    #[test]
    fn test_italian_numbers_keep_leading_zero() {
        assert_eq!(
            normalize_phone("06 1234 5678", PhoneRegion::It).as_deref(),
            Some("+390612345678")
        );
    }

    #[test]
    fn test_rejects_unparseable() {
        assert_eq!(normalize_phone("", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("call me", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("06 12", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("+12", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("+33 6 12", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("06 12 34 56 78 90 12", PhoneRegion::Fr), None);
    }

    #[test]
    fn test_portuguese_national_number() {
        assert_eq!(
            normalize_phone("912 345 678", PhoneRegion::Pt).as_deref(),
            Some("+351912345678")
        );
        assert_eq!(
            normalize_phone("+351 912 345 678", PhoneRegion::Us).as_deref(),
            Some("+351912345678")
        );
    }

    #[test]
    fn test_rejects_unassigned_calling_code() {
        assert_eq!(normalize_phone("+999 1234 5678", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("00 999 1234 5678", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("+0 33 6 12 34 56", PhoneRegion::Fr), None);
    }

    #[test]
    fn test_rejects_impossible_nanp_numbers() {
        assert_eq!(normalize_phone("+1 000 000 0000", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("+1 415 055 2671", PhoneRegion::Fr), None);
        assert_eq!(normalize_phone("(115) 555-2671", PhoneRegion::Us), None);
        assert_eq!(
            normalize_phone("+1 415 555 2671", PhoneRegion::Fr).as_deref(),
            Some("+14155552671")
        );
    }

    #[test]
    fn test_rejects_zero_led_national_number() {
        assert_eq!(normalize_phone("+33 00 12 34 56 78", PhoneRegion::Us), None);
        assert_eq!(normalize_phone("0 012 34 56 78", PhoneRegion::Fr), None);
    }
}
