use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dialogue::AgentConfig;
use crate::error::ConfigurationError;
use crate::provider::{ModelCatalog, ModelDescriptor, ProviderIdentity, RoutingMode, Vendor};

/// The judge chosen for one session, with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeSelection {
    pub judge_provider: ProviderIdentity,
    pub judge_model: ModelDescriptor,
    pub rationale: String,
}

/// Which providers could act as judge in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeUniverse {
    /// Direct vendors with a credential, in priority order.
    pub direct: Vec<Vendor>,
    /// Whether the gateway has a credential.
    pub gateway: bool,
    /// Whether an exhausted direct universe may fall back to the gateway.
    pub gateway_fallback: bool,
}

/// Provider half of a [`JudgeSelection`], before a model is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeCandidate {
    pub identity: ProviderIdentity,
    pub rationale: String,
}

/// Vendors an agent occupies: its provider's vendor plus, for namespaced
/// ids, the vendor its model id points at.
fn occupied_vendors(agents: [&AgentConfig; 2]) -> BTreeSet<Vendor> {
    agents
        .iter()
        .flat_map(|agent| {
            [
                Some(agent.provider.vendor),
                Vendor::from_model_id(&agent.model.model_id),
            ]
        })
        .flatten()
        .collect()
}

fn names(vendors: &BTreeSet<Vendor>) -> String {
    vendors
        .iter()
        .map(|v| v.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the judge provider. Pure and deterministic.
///
/// Both agents direct: the first credentialed direct vendor neither agent
/// uses. When that set is empty the gateway is used instead, if allowed.
/// Any agent on the gateway: the first gateway namespace neither agent uses.
pub fn choose_judge_provider(
    agents: [&AgentConfig; 2],
    universe: &JudgeUniverse,
) -> Result<JudgeCandidate, ConfigurationError> {
    let used = occupied_vendors(agents);
    let all_direct = agents
        .iter()
        .all(|a| a.provider.routing == RoutingMode::Direct);

    if all_direct {
        let direct = Vendor::ALL
            .into_iter()
            .filter(|v| universe.direct.contains(v))
            .find(|v| !used.contains(v));
        if let Some(vendor) = direct {
            return Ok(JudgeCandidate {
                identity: ProviderIdentity::direct(vendor),
                rationale: format!(
                    "{vendor} is the highest-priority direct provider not used by the agents ({})",
                    names(&used)
                ),
            });
        }
        if !(universe.gateway && universe.gateway_fallback) {
            return Err(ConfigurationError::NoJudgeAvailable);
        }
        return first_free_namespace(&used).map(|vendor| JudgeCandidate {
            identity: ProviderIdentity::gateway(vendor),
            rationale: format!(
                "every available direct provider is used by the agents ({}); \
                 falling back to the gateway namespace {}",
                names(&used),
                vendor.namespace()
            ),
        });
    }

    if !universe.gateway {
        return Err(ConfigurationError::NoJudgeAvailable);
    }
    first_free_namespace(&used).map(|vendor| JudgeCandidate {
        identity: ProviderIdentity::gateway(vendor),
        rationale: format!(
            "{} is the highest-priority gateway namespace not used by the agents ({})",
            vendor.namespace(),
            names(&used)
        ),
    })
}

fn first_free_namespace(used: &BTreeSet<Vendor>) -> Result<Vendor, ConfigurationError> {
    Vendor::ALL
        .into_iter()
        .find(|v| !used.contains(v))
        .ok_or(ConfigurationError::NoJudgeAvailable)
}

/// Picks the judge's model from its catalog.
///
/// A direct judge prefers its named default when the catalog has it, then the
/// newest entry; a gateway judge takes the newest entry. Models an agent is
/// already using are skipped while another one exists.
pub fn choose_judge_model(
    catalog: &ModelCatalog,
    named_default: Option<&str>,
    avoid: &[&str],
) -> Option<ModelDescriptor> {
    let preferred = match catalog.provider().routing {
        RoutingMode::Direct => named_default.and_then(|id| catalog.by_id(id)),
        RoutingMode::Gateway => None,
    };
    let mut candidates = preferred.into_iter().chain(catalog.iter());
    let first = preferred.or(catalog.newest());
    candidates
        .find(|m| !avoid.contains(&m.model_id.as_str()))
        .or(first)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CatalogOrigin, RawModel};

    #[test]
    fn direct_judge_prefers_named_default() {
        let catalog = ModelCatalog::fallback(
            ProviderIdentity::direct(Vendor::Google),
            &["gemini-2.0-flash", "gemini-2.5-flash"],
        );
        let model = choose_judge_model(&catalog, Some("gemini-2.5-flash"), &[]).unwrap();
        assert_eq!(model.model_id, "gemini-2.5-flash");
    }

    #[test]
    fn missing_default_falls_back_to_newest() {
        let catalog = ModelCatalog::fallback(
            ProviderIdentity::direct(Vendor::Google),
            &["gemini-2.0-flash"],
        );
        let model = choose_judge_model(&catalog, Some("gemini-9"), &[]).unwrap();
        assert_eq!(model.model_id, "gemini-2.0-flash");
    }

    #[test]
    fn gateway_judge_takes_newest_unused_model() {
        let identity = ProviderIdentity::gateway(Vendor::OpenAI);
        let catalog = ModelCatalog::from_raw(
            identity,
            vec![
                RawModel::new("openai/gpt-4o").created_at(10),
                RawModel::new("openai/gpt-5").created_at(30),
                RawModel::new("anthropic/claude-sonnet-4").created_at(40),
            ],
            CatalogOrigin::Live,
            None,
        );
        let model = choose_judge_model(&catalog, Some("openai/gpt-4o"), &[]).unwrap();
        assert_eq!(model.model_id, "openai/gpt-5");

        let model = choose_judge_model(&catalog, None, &["openai/gpt-5"]).unwrap();
        assert_eq!(model.model_id, "openai/gpt-4o");
    }

    #[test]
    fn avoided_models_are_used_when_nothing_else_exists() {
        let catalog =
            ModelCatalog::fallback(ProviderIdentity::direct(Vendor::OpenAI), &["gpt-4o"]);
        let model = choose_judge_model(&catalog, Some("gpt-4o"), &["gpt-4o"]).unwrap();
        assert_eq!(model.model_id, "gpt-4o");
    }
}
