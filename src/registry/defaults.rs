use crate::provider::{ModelCatalog, ProviderIdentity, RoutingMode, Vendor};

/// Named default model per provider. Deterministic, independent of catalog order.
pub fn builtin_default_model(identity: ProviderIdentity) -> Option<&'static str> {
    fallback_model_ids(identity).first().copied()
}

/// Small static catalog used when the live listing cannot be fetched.
/// The first entry is the provider's named default.
pub fn fallback_model_ids(identity: ProviderIdentity) -> &'static [&'static str] {
    match (identity.routing, identity.vendor) {
        (RoutingMode::Direct, Vendor::Anthropic) => &[
            "claude-sonnet-4-20250514",
            "claude-3-7-sonnet-20250219",
            "claude-3-5-haiku-20241022",
        ],
        (RoutingMode::Direct, Vendor::Google) => {
            &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"]
        }
        (RoutingMode::Direct, Vendor::OpenAI) => &["gpt-4o", "gpt-4o-mini", "o3-mini"],
        (RoutingMode::Direct, _) => &[],
        (RoutingMode::Gateway, Vendor::Anthropic) => {
            &["anthropic/claude-sonnet-4", "anthropic/claude-3.5-sonnet"]
        }
        (RoutingMode::Gateway, Vendor::Google) => {
            &["google/gemini-2.5-flash", "google/gemini-2.5-pro"]
        }
        (RoutingMode::Gateway, Vendor::OpenAI) => &["openai/gpt-4o", "openai/gpt-4o-mini"],
        (RoutingMode::Gateway, Vendor::Meta) => &[
            "meta-llama/llama-3.1-70b-instruct",
            "meta-llama/llama-3.2-90b-vision-instruct",
        ],
        (RoutingMode::Gateway, Vendor::Mistral) => {
            &["mistralai/mistral-large", "mistralai/mixtral-8x7b-instruct"]
        }
        (RoutingMode::Gateway, Vendor::DeepSeek) => &["deepseek/deepseek-chat", "deepseek/deepseek-r1"],
    }
}

pub fn fallback_catalog(identity: ProviderIdentity) -> ModelCatalog {
    ModelCatalog::fallback(identity, fallback_model_ids(identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_identity_has_a_default_in_its_fallback() {
        for vendor in Vendor::ALL {
            let gateway = ProviderIdentity::gateway(vendor);
            let default = builtin_default_model(gateway).unwrap();
            assert!(default.starts_with(&format!("{}/", vendor.namespace())));
            assert!(fallback_catalog(gateway).by_id(default).is_some());
        }
        for vendor in Vendor::DIRECT {
            let direct = ProviderIdentity::direct(vendor);
            let default = builtin_default_model(direct).unwrap();
            assert!(fallback_catalog(direct).by_id(default).is_some());
        }
    }

    #[test]
    fn fallback_catalogs_report_their_origin() {
        let catalog = fallback_catalog(ProviderIdentity::direct(Vendor::OpenAI));
        assert!(!catalog.is_live());
        assert_eq!(catalog.len(), 3);
    }
}
