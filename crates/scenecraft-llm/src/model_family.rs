//! Named model dependencies (spec §2): each pipeline stage that talks to
//! a generative model picks one family, and the client tries each model
//! in the family's fallback chain in order until one succeeds.

/// Which generative capability a stage needs. Concrete model names are
/// resolved per family so operators can retarget providers/versions
/// without touching stage executor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Used by the Planner stage to produce a scene breakdown.
    Planner,
    /// Used by the ScenarioBuilder stage to expand a plan into per-scene
    /// narrative/visual descriptions.
    Scene,
    /// Used by the CodeGenerator stage, and any other stage that needs a
    /// one-off generative call outside its primary responsibility.
    Helper,
}

impl ModelFamily {
    /// Ordered list of model names to try. Index 0 is the preferred
    /// model; later entries are progressively cheaper/more available
    /// fallbacks, tried only after an earlier one fails.
    pub fn fallback_chain(self) -> &'static [&'static str] {
        match self {
            ModelFamily::Planner => &["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"],
            ModelFamily::Scene => &["gemini-2.5-flash", "gemini-2.0-flash"],
            ModelFamily::Helper => &["gemini-2.0-flash", "gemini-2.0-flash-lite"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_family_has_a_non_empty_chain() {
        for family in [ModelFamily::Planner, ModelFamily::Scene, ModelFamily::Helper] {
            assert!(!family.fallback_chain().is_empty());
        }
    }
}
