//! Field extraction - capability layer
//!
//! Maps result nodes of a local-results page to [`ScrapedCandidate`]s.
//! The target markup is unversioned, so every field is resolved through an
//! ordered chain of `(scope, capture)` rules evaluated first-match-wins.
//! Markup drift is fixed by editing the chains, not the control flow.
//!
//! Nothing here returns an error for a malformed node: a field that cannot
//! be resolved is simply absent, and a node without a name is dropped.

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, SearchSettings};
use crate::models::{Country, ScrapedCandidate};

/// Placeholder produced when no name could be resolved
pub const UNKNOWN_NAME: &str = "Unknown";

/// Digit-ish run of at least eight characters, optionally `+`-prefixed.
/// Length beyond that is the normalizer's call.
const PHONE_PATTERN: &str = r"\+?\d[\d\s-]{7,}";
const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

/// UI chrome the engine mixes into business names
const NAME_CHROME_PATTERNS: &[&str] = &[r"(?i)My Ad Centre", r"(?i)Ad\s*·", r"(?i)Sponsored"];

const NAME_SELECTORS: &[&str] = &[r#"div[role="heading"]"#, ".OSrXXb", ".V_P8d"];
const PHONE_SELECTORS: &[&str] = &["span", "div", ".LrzPdb"];
const CATEGORY_SELECTORS: &[&str] = &[".YhemCb", "[data-category]"];

/// Where a rule looks, relative to the result node
pub enum Scope {
    /// The node's own full text
    Node,
    /// Every descendant matching the selector, in document order
    Descendants(Selector),
}

/// What a rule pulls out of the scoped element
pub enum Capture {
    /// Whole text content
    Text,
    /// The `href` attribute
    Href,
    /// First match of a pattern in the text content
    Pattern(Regex),
}

pub struct FieldRule {
    pub scope: Scope,
    pub capture: Capture,
}

impl FieldRule {
    pub fn new(scope: Scope, capture: Capture) -> Self {
        Self { scope, capture }
    }

    fn capture(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.capture {
            Capture::Text => Some(text_content(element)),
            Capture::Href => element.value().attr("href").map(str::to_string),
            Capture::Pattern(re) => re
                .find(&text_content(element))
                .map(|m| m.as_str().to_string()),
        }
    }
}

/// Ordered fallback chain for one field
#[derive(Default)]
pub struct FieldChain {
    rules: Vec<FieldRule>,
}

impl FieldChain {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Chain of `Descendants(selector)` rules sharing one capture
    fn descendants(selectors: &[&str], capture: impl Fn() -> Capture) -> Self {
        let rules = selectors
            .iter()
            .filter_map(|s| css(s))
            .map(|selector| FieldRule::new(Scope::Descendants(selector), capture()))
            .collect();
        Self { rules }
    }

    fn then(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// First captured value that `accept` keeps
    pub fn resolve(
        &self,
        node: ElementRef<'_>,
        accept: impl Fn(String) -> Option<String>,
    ) -> Option<String> {
        for rule in &self.rules {
            match &rule.scope {
                Scope::Node => {
                    if let Some(value) = rule.capture(node).and_then(&accept) {
                        return Some(value);
                    }
                }
                Scope::Descendants(selector) => {
                    for element in node.select(selector) {
                        if let Some(value) = rule.capture(element).and_then(&accept) {
                            return Some(value);
                        }
                    }
                }
            }
        }
        None
    }
}

/// Result-page field extractor
pub struct FieldExtractor {
    containers: Option<Selector>,
    name: FieldChain,
    website: FieldChain,
    phone: FieldChain,
    email: FieldChain,
    category: FieldChain,
    name_chrome: Vec<Regex>,
    whitespace: Regex,
    engine_domains: Vec<String>,
    calling_codes: Vec<(Country, String)>,
}

impl FieldExtractor {
    /// Build the default chains for the configured engine markup
    ///
    /// Container selectors that fail to parse are skipped with a warning.
    pub fn new(
        search: &SearchSettings,
        calling_codes: Vec<(Country, String)>,
    ) -> Result<Self, regex::Error> {
        let phone_re = Regex::new(PHONE_PATTERN)?;
        let email_re = Regex::new(EMAIL_PATTERN)?;

        let name_chrome = NAME_CHROME_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            containers: container_selector(&search.result_selectors),
            name: FieldChain::descendants(NAME_SELECTORS, || Capture::Text),
            website: FieldChain::descendants(&["a"], || Capture::Href),
            phone: FieldChain::descendants(PHONE_SELECTORS, || Capture::Pattern(phone_re.clone()))
                .then(FieldRule::new(Scope::Node, Capture::Pattern(phone_re.clone()))),
            email: FieldChain::new(vec![FieldRule::new(Scope::Node, Capture::Pattern(email_re))]),
            category: FieldChain::descendants(CATEGORY_SELECTORS, || Capture::Text),
            name_chrome,
            whitespace: Regex::new(r"\s{2,}")?,
            engine_domains: search.engine_domains.clone(),
            calling_codes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, regex::Error> {
        let calling_codes = Country::ALL
            .into_iter()
            .map(|c| (c, config.calling_code(c)))
            .collect();
        Self::new(&config.search, calling_codes)
    }

    /// Extract every usable candidate from a page targeted at `country`
    pub fn extract(&self, html: &str, country: Country) -> Vec<ScrapedCandidate> {
        let Some(containers) = &self.containers else {
            warn!("⚠️ No valid result container selector configured");
            return Vec::new();
        };

        let document = Html::parse_document(html);
        let matched: Vec<ElementRef<'_>> = document.select(containers).collect();
        let matched_ids: HashSet<_> = matched.iter().map(|el| el.id()).collect();

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for node in matched {
            // nested containers describe the same result as their outermost match
            if node.ancestors().any(|a| matched_ids.contains(&a.id())) {
                continue;
            }
            let Some(candidate) = self.extract_node(node) else {
                continue;
            };
            if self.is_cross_country(&candidate, country) {
                debug!(
                    "Dropping {} ({:?}): phone belongs to another tracked country",
                    candidate.name, candidate.phone
                );
                continue;
            }
            if seen.insert((candidate.name.clone(), candidate.phone.clone())) {
                candidates.push(candidate);
            }
        }

        debug!(
            "Extracted {} candidates from {} result nodes",
            candidates.len(),
            matched_ids.len()
        );
        candidates
    }

    /// Map one result node; `None` when no name resolves
    pub fn extract_node(&self, node: ElementRef<'_>) -> Option<ScrapedCandidate> {
        let name = self.name.resolve(node, |raw| self.clean_name(&raw))?;
        if name == UNKNOWN_NAME {
            return None;
        }

        Some(ScrapedCandidate {
            name,
            website: self.website.resolve(node, |href| self.external_link(href)),
            phone: self.phone.resolve(node, |run| compact_phone(&run)),
            email: self.email.resolve(node, Some),
            category: self.category.resolve(node, |text| non_empty(text.trim())),
        })
    }

    /// Strip UI chrome and collapse whitespace; empty names are unresolvable
    pub fn clean_name(&self, raw: &str) -> Option<String> {
        let mut name = raw.to_string();
        for re in &self.name_chrome {
            name = re.replace_all(&name, "").into_owned();
        }
        let name = self.whitespace.replace_all(&name, " ");
        non_empty(name.trim())
    }

    /// Absolute HTTP(S) link that does not point back at the engine
    fn external_link(&self, href: String) -> Option<String> {
        let url = Url::parse(&href).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?;
        if self.engine_domains.iter().any(|d| host.contains(d.as_str())) {
            return None;
        }
        Some(href)
    }

    /// Phone visibly belongs to a tracked country other than `country`
    fn is_cross_country(&self, candidate: &ScrapedCandidate, country: Country) -> bool {
        let Some(phone) = &candidate.phone else {
            return false;
        };
        let bare = phone.strip_prefix('+').unwrap_or(phone);
        self.calling_codes
            .iter()
            .filter(|(c, _)| *c != country)
            .any(|(_, code)| !code.is_empty() && bare.starts_with(code.as_str()))
    }
}

fn container_selector(selectors: &[String]) -> Option<Selector> {
    let valid: Vec<&str> = selectors
        .iter()
        .map(String::as_str)
        .filter(|s| {
            let ok = Selector::parse(s).is_ok();
            if !ok {
                warn!("⚠️ Ignoring invalid result selector: {}", s);
            }
            ok
        })
        .collect();
    if valid.is_empty() {
        return None;
    }
    css(&valid.join(", "))
}

fn css(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

/// `textContent`-like concatenation of all descendant text
fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Drop spaces and hyphens from a matched phone run, keeping a leading `+`
fn compact_phone(run: &str) -> Option<String> {
    let compact: String = run
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    non_empty(&compact)
}
