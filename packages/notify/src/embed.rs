//! Discord embed rendering.

use nestwatch_output::AreaSummary;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Discord's limit on embed description length, in characters.
const DESCRIPTION_LIMIT: usize = 4096;

/// Embed decoration read from `[discord.template]`.
///
/// `footer` accepts the `{area}` and `{nests}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedStyle {
    /// Sidebar color as `0xRRGGBB`.
    pub color: u32,
    /// Footer text.
    pub footer: Option<String>,
}

impl Default for EmbedStyle {
    fn default() -> Self {
        Self {
            color: 0x2E_CC_71,
            footer: Some("{nests} nests".to_string()),
        }
    }
}

/// Joins lines up to the description limit. Lines that do not fit are
/// replaced by a count of what was left out.
fn description(lines: &[String]) -> String {
    let mut out = String::new();
    let mut used = 0;

    for (i, line) in lines.iter().enumerate() {
        let separator = usize::from(i > 0);
        let len = line.chars().count();
        let after = lines.len() - i - 1;
        let reserve = if after > 0 {
            format!("\n... and {after} more").chars().count()
        } else {
            0
        };

        if used + separator + len + reserve > DESCRIPTION_LIMIT {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("... and {} more", lines.len() - i));
            break;
        }

        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
        used += separator + len;
    }

    out
}

/// Builds the embed object for `summary`.
#[must_use]
pub fn render_embed(summary: &AreaSummary, style: &EmbedStyle) -> serde_json::Value {
    let mut embed = json!({
        "title": summary.title,
        "description": description(&summary.lines),
        "color": style.color,
    });

    if let Some(footer) = &style.footer {
        let text = footer
            .replace("{area}", &summary.area)
            .replace("{nests}", &summary.nests.to_string());
        embed["footer"] = json!({ "text": text });
    }

    embed
}

/// Builds the message body carrying one embed.
#[must_use]
pub fn message_payload(summary: &AreaSummary, style: &EmbedStyle) -> serde_json::Value {
    json!({
        "content": "",
        "embeds": [render_embed(summary, style)],
    })
}

#[cfg(test)]
mod tests {
    use nestwatch_area_models::NotificationTarget;

    use super::*;

    fn summary(lines: Vec<String>) -> AreaSummary {
        AreaSummary {
            area: "Park".to_string(),
            target: NotificationTarget::Channel(1),
            title: "Nests in Park".to_string(),
            nests: lines.len(),
            lines,
        }
    }

    #[test]
    fn renders_title_lines_and_footer() {
        let embed = render_embed(
            &summary(vec!["Eevee".to_string(), "Rattata".to_string()]),
            &EmbedStyle::default(),
        );

        assert_eq!(embed["title"], "Nests in Park");
        assert_eq!(embed["description"], "Eevee\nRattata");
        assert_eq!(embed["color"], 0x2E_CC_71);
        assert_eq!(embed["footer"]["text"], "2 nests");
    }

    #[test]
    fn no_footer_when_unset() {
        let style = EmbedStyle {
            footer: None,
            ..EmbedStyle::default()
        };
        let embed = render_embed(&summary(vec![]), &style);
        assert!(embed.get("footer").is_none());
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let lines: Vec<String> = (0..500).map(|i| format!("line number {i:04}")).collect();
        let text = description(&lines);

        assert!(text.chars().count() <= DESCRIPTION_LIMIT);
        assert!(text.starts_with("line number 0000\n"));
        assert!(text.contains("more"));
    }

    #[test]
    fn payload_wraps_single_embed() {
        let payload = message_payload(&summary(vec![]), &EmbedStyle::default());
        assert_eq!(payload["embeds"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn style_parses_from_toml() {
        let style: EmbedStyle = toml::from_str("color = 255").unwrap();
        assert_eq!(style.color, 255);
        assert_eq!(style.footer, EmbedStyle::default().footer);
    }
}
