//! Lead dispatch - capability layer
//!
//! `Ok(())` is the only acknowledgment; anything else leaves the lead
//! undispatched so the next cycle picks it up again.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::models::LeadPayload;
use crate::utils::logging::truncate_text;
use crate::services::phone::digit_count;

const EMBED_COLOR: u32 = 0x5865f2;
/// Shortest number still worth a call / WhatsApp button
const MIN_BUTTON_DIGITS: usize = 7;

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, lead: &LeadPayload) -> Result<(), DispatchError>;
}

/// Posts leads to a Discord webhook as an embed with contact buttons
pub struct DiscordDispatcher {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordDispatcher {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Dispatcher for DiscordDispatcher {
    async fn dispatch(&self, lead: &LeadPayload) -> Result<(), DispatchError> {
        info!("Dispatching lead to Discord: {}", lead.name);
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&webhook_body(lead))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("⚠️ Discord rejected lead {}: {} {}", lead.name, status, body);
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Logs leads instead of sending them, for dry runs
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn dispatch(&self, lead: &LeadPayload) -> Result<(), DispatchError> {
        info!(
            "📨 [dry run] {} ({} / {}) phone={} email={} website={}",
            lead.name,
            lead.location,
            lead.country,
            lead.phone.as_deref().unwrap_or("N/A"),
            lead.email.as_deref().unwrap_or("N/A"),
            lead.website.as_deref().unwrap_or("N/A"),
        );
        info!("📨 [dry run] {}", truncate_text(&lead.message, 160));
        Ok(())
    }
}

/// Webhook JSON: one embed plus an action row of link buttons
pub fn webhook_body(lead: &LeadPayload) -> JsonValue {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    let embed = json!({
        "title": format!("🚀 New Lead Found in {}!", lead.location),
        "color": EMBED_COLOR,
        "fields": [
            { "name": "Business", "value": lead.name, "inline": true },
            { "name": "Industry", "value": lead.industry, "inline": true },
            { "name": "Country", "value": lead.country.name(), "inline": true },
            { "name": "Pain Point", "value": lead.pain_point },
            { "name": "Website", "value": or_na(&lead.website), "inline": true },
            { "name": "Phone", "value": or_na(&lead.phone), "inline": true },
            { "name": "Email", "value": or_na(&lead.email), "inline": true },
            { "name": "Suggested Message", "value": format!("```{}```", lead.message) },
        ],
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let buttons = contact_buttons(lead);
    let components = if buttons.is_empty() {
        json!([])
    } else {
        json!([{ "type": 1, "components": buttons }])
    };

    json!({ "embeds": [embed], "components": components })
}

fn contact_buttons(lead: &LeadPayload) -> Vec<JsonValue> {
    let mut buttons = Vec::new();

    if let Some(phone) = &lead.phone {
        let dialable: String = phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        if digit_count(&dialable) >= MIN_BUTTON_DIGITS {
            buttons.push(link_button("📞 Call", format!("tel:{}", dialable)));
            buttons.push(link_button(
                "💬 WhatsApp",
                format!(
                    "https://api.whatsapp.com/send?phone={}&text={}",
                    dialable.trim_start_matches('+'),
                    encode_component(&lead.message)
                ),
            ));
        }
    }

    if let Some(email) = &lead.email {
        buttons.push(link_button(
            "✉️ Email",
            format!(
                "mailto:{}?subject={}&body={}",
                email,
                encode_component(&format!("Growth Opportunity for {}", lead.name)),
                encode_component(&lead.message)
            ),
        ));
    }

    buttons
}

fn link_button(label: &str, url: String) -> JsonValue {
    // type 2 = button, style 5 = link
    json!({ "type": 2, "style": 5, "label": label, "url": url })
}

/// Percent-encode a URI component, spaces as `%20`
fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Country;

    fn payload() -> LeadPayload {
        LeadPayload {
            name: "Acme Realty".into(),
            industry: "Real Estate".into(),
            pain_point: "Slow follow-ups".into(),
            message: "Hi Acme, a+b?".into(),
            website: Some("https://acmerealty.co.za/".into()),
            phone: Some("+27821234567".into()),
            email: Some("info@acmerealty.co.za".into()),
            location: "Sandton".into(),
            country: Country::SouthAfrica,
        }
    }

    #[test]
    fn test_body_contains_embed_fields() {
        let body = webhook_body(&payload());
        let fields = body["embeds"][0]["fields"].as_array().unwrap();
        assert_eq!(fields[0]["value"], "Acme Realty");
        assert!(fields.iter().any(|f| f["name"] == "Phone" && f["value"] == "+27821234567"));
    }

    #[test]
    fn test_buttons_for_every_channel() {
        let body = webhook_body(&payload());
        let buttons = body["components"][0]["components"].as_array().unwrap();
        let urls: Vec<&str> = buttons.iter().map(|b| b["url"].as_str().unwrap()).collect();
        assert_eq!(urls[0], "tel:+27821234567");
        assert_eq!(
            urls[1],
            "https://api.whatsapp.com/send?phone=27821234567&text=Hi%20Acme%2C%20a%2Bb%3F"
        );
        assert!(urls[2].starts_with("mailto:info@acmerealty.co.za?subject=Growth%20Opportunity%20for%20Acme%20Realty"));
    }

    #[test]
    fn test_no_buttons_without_contacts() {
        let mut lead = payload();
        lead.phone = Some("12345".into());
        lead.email = None;
        let body = webhook_body(&lead);
        assert!(body["components"].as_array().unwrap().is_empty());
        let fields = body["embeds"][0]["fields"].as_array().unwrap();
        assert!(fields.iter().any(|f| f["name"] == "Email" && f["value"] == "N/A"));
    }

    #[tokio::test]
    async fn test_log_dispatcher_always_acknowledges() {
        assert!(LogDispatcher.dispatch(&payload()).await.is_ok());
    }
}
