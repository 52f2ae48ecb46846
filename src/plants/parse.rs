/// The six fields the identification prompt asks the model to emit, one per
/// line. The reply is free text, so extraction is a case-insensitive
/// line-prefix match with per-field fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlant {
    pub name: String,
    pub scientific_name: String,
    pub family: String,
    pub plant_type: String,
    pub care_level: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
#[error("model reply contained none of the expected fields")]
pub struct UnparseableReply;

const UNKNOWN: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description available";

/// Strips surrounding whitespace and emphasis markup the model tends to
/// wrap values in (`**Easy**`, `*Araceae*`).
fn clean(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '_')
}

fn field<'a>(lines: &[&'a str], prefix: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let normalized = clean(line);
        let lower = normalized.to_lowercase();
        if lower.starts_with(prefix) {
            // everything after the first colon; later colons belong to the value
            normalized.splitn(2, ':').nth(1).map(clean)
        } else {
            None
        }
    })
}

/// Parse the model's free-text reply. Individual missing lines default to
/// a sentinel; a reply with no recognizable line at all is rejected so the
/// caller can surface a retryable failure instead of a record of Unknowns.
pub fn parse_plant_reply(content: &str) -> Result<ParsedPlant, UnparseableReply> {
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let name = field(&lines, "name:");
    let scientific_name = field(&lines, "scientific name:");
    let family = field(&lines, "family:");
    let plant_type = field(&lines, "type:");
    let care_level = field(&lines, "care level:");
    let description = field(&lines, "description:");

    if [
        name,
        scientific_name,
        family,
        plant_type,
        care_level,
        description,
    ]
    .iter()
    .all(Option::is_none)
    {
        return Err(UnparseableReply);
    }

    Ok(ParsedPlant {
        name: name.unwrap_or(UNKNOWN).to_string(),
        scientific_name: scientific_name.unwrap_or(UNKNOWN).to_string(),
        family: family.unwrap_or(UNKNOWN).to_string(),
        plant_type: plant_type.unwrap_or(UNKNOWN).to_string(),
        care_level: care_level.unwrap_or(UNKNOWN).to_string(),
        description: description.unwrap_or(NO_DESCRIPTION).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let reply = "Name: Monstera\nScientific Name: Monstera deliciosa\nFamily: Araceae\n\
Type: Houseplant\nCare Level: Easy\nDescription: A popular vine";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.name, "Monstera");
        assert_eq!(plant.scientific_name, "Monstera deliciosa");
        assert_eq!(plant.family, "Araceae");
        assert_eq!(plant.plant_type, "Houseplant");
        assert_eq!(plant.care_level, "Easy");
        assert_eq!(plant.description, "A popular vine");
    }

    #[test]
    fn missing_family_defaults_to_unknown() {
        let reply = "Name: Monstera\nScientific Name: Monstera deliciosa\n\
Type: Houseplant\nCare Level: Easy\nDescription: A popular vine";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.family, "Unknown");
        assert_eq!(plant.name, "Monstera");
        assert_eq!(plant.care_level, "Easy");
    }

    #[test]
    fn missing_description_gets_its_own_sentinel() {
        let reply = "Name: Monstera";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.description, "No description available");
    }

    #[test]
    fn prefix_match_is_case_insensitive_and_strips_markup() {
        let reply = "**NAME:** *Monstera*\nSCIENTIFIC NAME: **Monstera deliciosa**";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.name, "Monstera");
        assert_eq!(plant.scientific_name, "Monstera deliciosa");
    }

    #[test]
    fn name_prefix_does_not_swallow_scientific_name() {
        // "Scientific Name:" appears before "Name:"; the plain name must
        // still come from its own line
        let reply = "Scientific Name: Monstera deliciosa\nName: Monstera";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.name, "Monstera");
        assert_eq!(plant.scientific_name, "Monstera deliciosa");
    }

    #[test]
    fn description_keeps_later_colons() {
        let reply = "Name: Ivy\nDescription: Hardy vine: tolerates shade, frost";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.description, "Hardy vine: tolerates shade, frost");
    }

    #[test]
    fn unrecognizable_reply_is_rejected() {
        assert!(parse_plant_reply("I cannot tell what this plant is.").is_err());
        assert!(parse_plant_reply("").is_err());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let reply = "\n\nName: Monstera\n\n\nCare Level: Easy\n";
        let plant = parse_plant_reply(reply).expect("parse");
        assert_eq!(plant.name, "Monstera");
        assert_eq!(plant.care_level, "Easy");
    }
}
