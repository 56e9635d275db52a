//! Lead enrichment - capability layer
//!
//! Classifies a business into industry / pain point / recommended solution.
//! Callers never fail a lead on enrichment errors; they fall back to
//! [`fallback_enrichment`].
//!
//! ## Stack
//! - `async-openai` against any OpenAI-compatible endpoint (Gemini by default)

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::EnrichmentError;
use crate::models::Enrichment;
use crate::services::retry::RetryPolicy;

pub const DEFAULT_INDUSTRY: &str = "Real Estate";
pub const DEFAULT_PAIN_POINT: &str = "Manual processes limiting growth";
pub const DEFAULT_SOLUTION: &str = "Property CRM System";

const PAIN_POINTS: &[&str] = &[
    "Manual viewing coordination and high no-show rates for property tours.",
    "Extended time-on-market and high vacancy rates due to poor listing visibility.",
    "Weak digital brand presence and outdated website compared to tech-forward competitors.",
    "Overwhelming manual WhatsApp/Social Media inquiries leading to slow response times.",
    "Fragmented lead data and lack of a centralized CRM for buyer/tenant tracking.",
    "Difficulty in verifying tenant reliability and creditworthiness in the local market.",
    "Slow, paper-based lease management and manual rent collection processes.",
    "Inaccurate property valuations resulting in overpriced listings and lost interest.",
    "High volume of unqualified leads wasting agent time on non-serious inquiries.",
    "Lack of data-driven insights",
];

const SOLUTIONS: &[&str] = &[
    "Property CRM System (lead & deal tracking)",
    "WhatsApp Automation (instant inquiry response)",
    "Professional Property Portal/Website",
    "Virtual Tour Platform (3D/360 tours)",
    "Agent Performance Dashboard",
    "AI-Powered Property Valuation (AVM)",
    "Automated Tenant Screening & Credit Scoring",
    "Digital Lease Management & E-signatures",
    "Smart Property Management (Rent collection & Maintenance)",
    "Predictive Market Analytics",
    "Blockchain-based Title Deed Verification",
    "IoT-enabled Smart Building Management",
];

const FALLBACK_PAIN_POINTS: &[&str] = &[
    "Manual viewing coordination and high no-show rates",
    "Weak digital brand presence compared to competitors",
    "Overwhelming manual WhatsApp inquiries",
    "Fragmented lead data and lack of CRM",
    "Slow paper-based lease management",
];

const FALLBACK_SOLUTIONS: &[&str] = &[
    "Property CRM System",
    "WhatsApp Automation",
    "Professional Property Portal",
    "Virtual Tour Platform",
    "Agent Performance Dashboard",
];

/// Black-box classification capability
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(
        &self,
        business_name: &str,
        category: Option<&str>,
    ) -> Result<Enrichment, EnrichmentError>;
}

/// Randomized stand-in used whenever enrichment fails
pub fn fallback_enrichment<R: Rng + ?Sized>(rng: &mut R) -> Enrichment {
    Enrichment {
        industry: DEFAULT_INDUSTRY.to_string(),
        pain_point: FALLBACK_PAIN_POINTS
            .choose(rng)
            .copied()
            .unwrap_or(DEFAULT_PAIN_POINT)
            .to_string(),
        recommended_solution: FALLBACK_SOLUTIONS
            .choose(rng)
            .copied()
            .unwrap_or(DEFAULT_SOLUTION)
            .to_string(),
    }
}

/// Enricher that never calls out, for dry runs without an API key
pub struct FallbackEnricher;

#[async_trait]
impl Enricher for FallbackEnricher {
    async fn enrich(&self, _: &str, _: Option<&str>) -> Result<Enrichment, EnrichmentError> {
        Ok(fallback_enrichment(&mut rand::thread_rng()))
    }
}

/// LLM-backed enricher
pub struct LlmEnricher {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl LlmEnricher {
    pub fn new(settings: &LlmSettings) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: settings.model_name.clone(),
            temperature: settings.temperature,
            retry: RetryPolicy::fixed(2, Duration::from_secs(1)),
        }
    }

    async fn send_to_llm(&self, user_message: &str, system_message: &str) -> Result<String, EnrichmentError> {
        debug!("Calling LLM API, model: {}", self.model_name);
        let api_error = |source| EnrichmentError::ApiCallFailed {
            model: self.model_name.clone(),
            source,
        };

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_message)
                    .build()
                    .map_err(api_error)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()
                    .map_err(api_error)?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(512u32)
            .build()
            .map_err(api_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API call failed: {}", e);
            api_error(e)
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| EnrichmentError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(
        &self,
        business_name: &str,
        category: Option<&str>,
    ) -> Result<Enrichment, EnrichmentError> {
        info!("Requesting enrichment for: {}", business_name);
        let prompt = build_prompt(business_name, category, &mut rand::thread_rng());

        let reply = self
            .retry
            .run("LLM enrichment", |_| self.send_to_llm(&prompt, SYSTEM_MESSAGE))
            .await
            .map_err(|exhausted| exhausted.last)?;

        parse_enrichment(&reply)
    }
}

const SYSTEM_MESSAGE: &str =
    "You are a PropTech strategist analyzing real estate businesses in Zimbabwe and South Africa.";

/// Prompt with a random focus hint so consecutive leads get varied answers
fn build_prompt<R: Rng + ?Sized>(business_name: &str, category: Option<&str>, rng: &mut R) -> String {
    let pain_hint = rng.gen_range(1..=PAIN_POINTS.len());
    let solution_hint = rng.gen_range(1..=SOLUTIONS.len());

    let numbered = |items: &[&str]| {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "IMPORTANT: Vary your responses. For this business, focus on pain point area #{pain_hint} and solution type #{solution_hint}.\n\n\
         Pain Points (choose ONE based on what fits this specific business):\n{pains}\n\n\
         Solutions (choose ONE that solves the pain point):\n{solutions}\n\n\
         Respond ONLY with a JSON object:\n\
         {{\"industry\": \"{industry}\", \"painPoint\": \"Your chosen pain point\", \"recommendedSolution\": \"Your chosen solution\"}}\n\n\
         Business: {business_name}\n\
         Category: {category}\n",
        pains = numbered(PAIN_POINTS),
        solutions = numbered(SOLUTIONS),
        industry = DEFAULT_INDUSTRY,
        category = category.unwrap_or(DEFAULT_INDUSTRY),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnrichment {
    industry: Option<String>,
    pain_point: Option<String>,
    #[serde(alias = "suggestedSolution")]
    recommended_solution: Option<String>,
}

/// Pull the outermost JSON object out of a free-form reply
pub fn parse_enrichment(reply: &str) -> Result<Enrichment, EnrichmentError> {
    let json = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(EnrichmentError::NoJson {
                reply: reply.to_string(),
            })
        }
    };
    let raw: RawEnrichment = serde_json::from_str(json)?;

    let or_default = |value: Option<String>, default: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    Ok(Enrichment {
        industry: or_default(raw.industry, DEFAULT_INDUSTRY),
        pain_point: or_default(raw.pain_point, DEFAULT_PAIN_POINT),
        recommended_solution: or_default(raw.recommended_solution, DEFAULT_SOLUTION),
    })
}
