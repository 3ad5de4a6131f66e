//! Plain-text commands understood by the Slack bot.

pub const HELP_TEXT: &str = "👋 I can look up Inflection.io journeys and email reports.\n\
\n\
• `journeys [keyword]` list journeys, optionally filtered by name\n\
• `report <journey_id> [start_date] [end_date]` email performance report (dates as YYYY-MM-DD)\n\
• `help` show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCommand {
    Journeys {
        keyword: Option<String>,
    },
    Report {
        journey_id: String,
        start_date: Option<String>,
        end_date: Option<String>,
    },
    Help,
    Unknown(String),
}

impl SlackCommand {
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let Some(verb) = words.next() else {
            return SlackCommand::Help;
        };

        match verb.to_lowercase().as_str() {
            "journeys" | "journey" | "list" => {
                let keyword = words.collect::<Vec<_>>().join(" ");
                SlackCommand::Journeys {
                    keyword: (!keyword.is_empty()).then_some(keyword),
                }
            }
            "report" | "reports" => match words.next() {
                Some(journey_id) => SlackCommand::Report {
                    journey_id: journey_id.to_string(),
                    start_date: words.next().map(str::to_string),
                    end_date: words.next().map(str::to_string),
                },
                None => SlackCommand::Unknown(text.trim().to_string()),
            },
            "help" | "?" => SlackCommand::Help,
            _ => SlackCommand::Unknown(text.trim().to_string()),
        }
    }
}

/// Remove a leading `<@U123>` mention. Returns `None` if the text had no
/// leading mention.
pub fn strip_mention(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix("<@")?;
    let end = rest.find('>')?;
    Some(rest[end + 1..].trim())
}

/// Slack mrkdwn uses single asterisks for bold.
pub fn to_mrkdwn(text: &str) -> String {
    text.replace("**", "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            SlackCommand::parse("journeys"),
            SlackCommand::Journeys { keyword: None }
        );
        assert_eq!(
            SlackCommand::parse("Journeys spring  sale"),
            SlackCommand::Journeys {
                keyword: Some("spring sale".to_string())
            }
        );
        assert_eq!(
            SlackCommand::parse("report j-42 2025-01-01"),
            SlackCommand::Report {
                journey_id: "j-42".to_string(),
                start_date: Some("2025-01-01".to_string()),
                end_date: None,
            }
        );
        assert_eq!(SlackCommand::parse("  "), SlackCommand::Help);
        assert_eq!(SlackCommand::parse("HELP"), SlackCommand::Help);
        assert_eq!(
            SlackCommand::parse("report"),
            SlackCommand::Unknown("report".to_string())
        );
        assert_eq!(
            SlackCommand::parse("what's up"),
            SlackCommand::Unknown("what's up".to_string())
        );
    }

    #[test]
    fn test_strip_mention() {
        assert_eq!(strip_mention("<@U0BOT> journeys"), Some("journeys"));
        assert_eq!(strip_mention("  <@U0BOT|bot>   help "), Some("help"));
        assert_eq!(strip_mention("<@U0BOT>"), Some(""));
        assert_eq!(strip_mention("journeys"), None);
        assert_eq!(strip_mention("<@broken"), None);
    }

    #[test]
    fn test_to_mrkdwn() {
        assert_eq!(to_mrkdwn("1. **Welcome** (ID: `j`)"), "1. *Welcome* (ID: `j`)");
    }
}
