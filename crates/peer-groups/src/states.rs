/// State codes used as the first two characters of a provider identifier.
const STATE_CODES: &[(&str, &str)] = &[
    ("01", "AL"),
    ("02", "AK"),
    ("03", "AZ"),
    ("04", "AR"),
    ("05", "CA"),
    ("06", "CO"),
    ("07", "CT"),
    ("08", "DE"),
    ("09", "DC"),
    ("10", "FL"),
    ("11", "GA"),
    ("12", "HI"),
    ("13", "ID"),
    ("14", "IL"),
    ("15", "IN"),
    ("16", "IA"),
    ("17", "KS"),
    ("18", "KY"),
    ("19", "LA"),
    ("20", "ME"),
    ("21", "MD"),
    ("22", "MA"),
    ("23", "MI"),
    ("24", "MN"),
    ("25", "MS"),
    ("26", "MO"),
    ("27", "MT"),
    ("28", "NE"),
    ("29", "NV"),
    ("30", "NH"),
    ("31", "NJ"),
    ("32", "NM"),
    ("33", "NY"),
    ("34", "NC"),
    ("35", "ND"),
    ("36", "OH"),
    ("37", "OK"),
    ("38", "OR"),
    ("39", "PA"),
    ("40", "PR"),
    ("41", "RI"),
    ("42", "SC"),
    ("43", "SD"),
    ("44", "TN"),
    ("45", "TX"),
    ("46", "UT"),
    ("47", "VT"),
    ("48", "VI"),
    ("49", "VA"),
    ("50", "WA"),
    ("51", "WV"),
    ("52", "WI"),
    ("53", "WY"),
    ("55", "CA"),
    ("65", "GU"),
    ("67", "TX"),
];

/// Postal abbreviation for a two-character state code, if the code is assigned.
pub fn state_abbreviation(code: &str) -> Option<&'static str> {
    STATE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, abbreviation)| *abbreviation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(state_abbreviation("01"), Some("AL"));
        assert_eq!(state_abbreviation("45"), Some("TX"));
        assert_eq!(state_abbreviation("00"), None);
        assert_eq!(state_abbreviation("99"), None);
        assert_eq!(state_abbreviation("1"), None);
    }
}
