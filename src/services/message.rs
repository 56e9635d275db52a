//! Outreach message drafting

use rand::Rng;
use tracing::debug;

/// Fills one of a few fixed outreach templates
#[derive(Debug, Clone, Default)]
pub struct MessageGenerator;

impl MessageGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        business_name: &str,
        industry: &str,
        pain_point: &str,
        rng: &mut R,
    ) -> String {
        let message = match rng.gen_range(0..2) {
            0 => format!(
                "Hi {business_name}, we noticed that many businesses in {industry} struggle with {}. \
                 We specialize in solving this. Would you be open to a quick chat?",
                pain_point.to_lowercase()
            ),
            _ => format!(
                "Hello! I saw {business_name} online and realized that {pain_point} might be holding you back. \
                 Our team helps {industry} firms overcome exactly this."
            ),
        };
        debug!("Generated message for {}", business_name);
        message
    }
}
