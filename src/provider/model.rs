use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::identity::ProviderIdentity;

/// A model id as reported by a provider's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModel {
    pub id: String,
    /// Unix seconds, when the provider reports a creation time.
    pub created: Option<i64>,
}

impl RawModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created: None,
        }
    }

    pub fn created_at(mut self, created: i64) -> Self {
        self.created = Some(created);
        self
    }
}

/// One selectable model: a human-facing label bound to the exact API id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub display_name: String,
    pub model_id: String,
    pub provider: ProviderIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// Whether a catalog came from the provider or from the built-in table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogOrigin {
    Live,
    Fallback,
}

/// Display-name keyed model catalog for one provider, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    provider: ProviderIdentity,
    origin: CatalogOrigin,
    entries: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// Builds a catalog from raw ids.
    ///
    /// Gateway catalogs keep only ids inside the provider's namespace. Entries
    /// are ordered newest first (undated entries keep their relative order
    /// after dated ones), de-duplicated by id and cut to `limit`.
    pub fn from_raw(
        provider: ProviderIdentity,
        raw: Vec<RawModel>,
        origin: CatalogOrigin,
        limit: Option<usize>,
    ) -> Self {
        let prefix = format!("{}/", provider.vendor.namespace());
        let mut seen = HashSet::new();
        let mut models: Vec<RawModel> = raw
            .into_iter()
            .filter(|m| !provider.is_gateway() || m.id.starts_with(&prefix))
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        models.sort_by(|a, b| b.created.unwrap_or(i64::MIN).cmp(&a.created.unwrap_or(i64::MIN)));
        if let Some(limit) = limit {
            models.truncate(limit);
        }

        let mut used_names = HashSet::new();
        let entries = models
            .into_iter()
            .map(|m| {
                let mut display_name = format_display_name(&m.id);
                if !used_names.insert(display_name.clone()) {
                    display_name = format!("{display_name} ({})", m.id);
                    used_names.insert(display_name.clone());
                }
                ModelDescriptor {
                    display_name,
                    model_id: m.id,
                    provider,
                    created: m.created,
                }
            })
            .collect();

        Self {
            provider,
            origin,
            entries,
        }
    }

    /// Builds a fallback catalog from a static id list, already newest first.
    pub fn fallback(provider: ProviderIdentity, ids: &[&str]) -> Self {
        let raw = ids.iter().map(|id| RawModel::new(*id)).collect();
        Self::from_raw(provider, raw, CatalogOrigin::Fallback, None)
    }

    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    pub fn is_live(&self) -> bool {
        self.origin == CatalogOrigin::Live
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.entries.iter()
    }

    /// The display-name → descriptor mapping.
    pub fn as_map(&self) -> BTreeMap<&str, &ModelDescriptor> {
        self.entries
            .iter()
            .map(|m| (m.display_name.as_str(), m))
            .collect()
    }

    pub fn get(&self, display_name: &str) -> Option<&ModelDescriptor> {
        self.entries.iter().find(|m| m.display_name == display_name)
    }

    pub fn by_id(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.entries.iter().find(|m| m.model_id == model_id)
    }

    /// Looks a model up by display name, then exact id, then case-insensitive name.
    pub fn find(&self, name_or_id: &str) -> Option<&ModelDescriptor> {
        let needle = name_or_id.trim();
        self.get(needle)
            .or_else(|| self.by_id(needle))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|m| m.display_name.eq_ignore_ascii_case(needle))
            })
    }

    pub fn newest(&self) -> Option<&ModelDescriptor> {
        self.entries.first()
    }

    /// Ranks models matching `term`: id prefix, then namespace, then id, then name.
    /// A gateway id counts as prefixed when its model part starts with `term`.
    pub fn search(&self, term: &str) -> Vec<&ModelDescriptor> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.entries.iter().collect();
        }
        let mut matches: Vec<(u8, &ModelDescriptor)> = self
            .entries
            .iter()
            .filter_map(|m| {
                let id = m.model_id.to_lowercase();
                let name = m.display_name.to_lowercase();
                let (namespace, model) = id.split_once('/').unwrap_or(("", id.as_str()));
                let rank = if id.starts_with(&term) || model.starts_with(&term) {
                    0
                } else if namespace.contains(&term) {
                    1
                } else if id.contains(&term) {
                    2
                } else if name.contains(&term) {
                    3
                } else {
                    return None;
                };
                Some((rank, m))
            })
            .collect();
        matches.sort_by_key(|(rank, _)| *rank);
        matches.into_iter().map(|(_, m)| m).collect()
    }
}

const UPPERCASE_TOKENS: &[&str] = &["gpt", "ai", "llm", "it"];

/// Formats a raw model id into a display name.
///
/// Pure and deterministic: `gpt-4o-mini` → `GPT 4o Mini`,
/// `anthropic/claude-3.5-sonnet` → `Anthropic: Claude 3.5 Sonnet`,
/// `meta-llama/llama-3.1-8b-instruct:free` → `Meta: Llama 3.1 8b Instruct (free)`.
pub fn format_display_name(raw_id: &str) -> String {
    let (namespace, rest) = match raw_id.split_once('/') {
        Some((ns, rest)) => (Some(ns), rest),
        None => (None, raw_id),
    };
    let (model, variant) = match rest.split_once(':') {
        Some((model, variant)) => (model, Some(variant)),
        None => (rest, None),
    };

    let mut name = model
        .split(['-', '_', ' '])
        .filter(|t| !t.is_empty())
        .map(format_token)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        name = rest.to_string();
    }
    if let Some(variant) = variant.filter(|v| !v.is_empty()) {
        name = format!("{name} ({variant})");
    }
    match namespace {
        Some(ns) => {
            let label = super::identity::Vendor::from_namespace(ns)
                .map(|v| v.label().to_string())
                .unwrap_or_else(|| format_token(ns));
            format!("{label}: {name}")
        }
        None => name,
    }
}

fn format_token(token: &str) -> String {
    let lower = token.to_lowercase();
    if UPPERCASE_TOKENS.contains(&lower.as_str()) {
        return lower.to_uppercase();
    }
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Vendor;
    use rstest::rstest;

    #[rstest]
    #[case("gpt-4o-mini", "GPT 4o Mini")]
    #[case("o3-mini", "O3 Mini")]
    #[case("claude-sonnet-4-20250514", "Claude Sonnet 4 20250514")]
    #[case("gemini-2.5-flash", "Gemini 2.5 Flash")]
    #[case("anthropic/claude-3.5-sonnet", "Anthropic: Claude 3.5 Sonnet")]
    #[case(
        "meta-llama/llama-3.1-8b-instruct:free",
        "Meta: Llama 3.1 8b Instruct (free)"
    )]
    #[case("baidu/ernie-4.5", "Baidu: Ernie 4.5")]
    fn formats_display_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_display_name(raw), expected);
    }

    #[test]
    fn display_name_is_never_the_raw_id_for_dashed_ids() {
        let name = format_display_name("gpt-4-turbo");
        assert_ne!(name, "gpt-4-turbo");
    }

    #[test]
    fn from_raw_orders_newest_first_and_limits() {
        let provider = ProviderIdentity::direct(Vendor::OpenAI);
        let raw = vec![
            RawModel::new("gpt-3.5-turbo").created_at(10),
            RawModel::new("gpt-4o").created_at(30),
            RawModel::new("gpt-4-turbo").created_at(20),
        ];
        let catalog = ModelCatalog::from_raw(provider, raw, CatalogOrigin::Live, Some(2));
        let ids: Vec<_> = catalog.iter().map(|m| m.model_id.as_str()).collect();
        assert_eq!(ids, ["gpt-4o", "gpt-4-turbo"]);
        assert_eq!(catalog.newest().unwrap().model_id, "gpt-4o");
        assert!(catalog.is_live());
    }

    #[test]
    fn gateway_catalog_keeps_only_its_namespace() {
        let provider = ProviderIdentity::gateway(Vendor::Anthropic);
        let raw = vec![
            RawModel::new("anthropic/claude-3.5-sonnet"),
            RawModel::new("openai/gpt-4o"),
            RawModel::new("anthropic/claude-3-haiku"),
        ];
        let catalog = ModelCatalog::from_raw(provider, raw, CatalogOrigin::Live, None);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().all(|m| m.model_id.starts_with("anthropic/")));
    }

    #[test]
    fn colliding_display_names_stay_unique() {
        let provider = ProviderIdentity::direct(Vendor::OpenAI);
        let catalog = ModelCatalog::fallback(provider, &["gpt-4o", "gpt_4o"]);
        let map = catalog.as_map();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("GPT 4o"));
        assert!(map.contains_key("GPT 4o (gpt_4o)"));
    }

    #[test]
    fn find_accepts_display_name_or_id() {
        let provider = ProviderIdentity::direct(Vendor::Anthropic);
        let catalog = ModelCatalog::fallback(provider, &["claude-3-5-haiku-20241022"]);
        let by_name = catalog.find("Claude 3 5 Haiku 20241022").unwrap();
        let by_id = catalog.find("claude-3-5-haiku-20241022").unwrap();
        assert_eq!(by_name, by_id);
        assert!(catalog.find("claude-2").is_none());
    }

    #[test]
    fn search_ranks_prefix_matches_first() {
        let provider = ProviderIdentity::gateway(Vendor::OpenAI);
        let catalog = ModelCatalog::fallback(
            provider,
            &["openai/o3-mini", "openai/gpt-4o", "openai/chatgpt-4o-latest"],
        );
        let hits: Vec<_> = catalog
            .search("gpt")
            .into_iter()
            .map(|m| m.model_id.as_str())
            .collect();
        assert_eq!(hits, ["openai/gpt-4o", "openai/chatgpt-4o-latest"]);
    }
}
