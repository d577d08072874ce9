use std::collections::BTreeMap;

use super::Action;

/// Builds a fresh action instance. Called once per run.
pub type ActionFactory = fn() -> Box<dyn Action>;

/// Statically compiled list of actions per stage name.
///
/// Actions are registered by factory so every run gets new instances; an
/// action that has run can never be handed out again.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    stages: BTreeMap<String, Vec<ActionFactory>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, stage: &str, factory: ActionFactory) -> &mut Self {
        self.stages.entry(stage.to_string()).or_default().push(factory);
        self
    }

    /// New instances of every action registered for `stage`, in registration order.
    #[must_use]
    pub fn instantiate(&self, stage: &str) -> Vec<Box<dyn Action>> {
        self.stages
            .get(stage)
            .map(|fs| fs.iter().map(|f| f()).collect())
            .unwrap_or_default()
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionContext, ActionFault};

    struct Probe;
    impl Action for Probe {
        fn id(&self) -> &'static str {
            "PROBE"
        }
        fn run(&mut self, _ctx: &mut ActionContext<'_>) -> Result<(), ActionFault> {
            Ok(())
        }
    }

    #[test]
    fn instantiate_returns_fresh_actions() {
        let mut reg = Registry::new();
        reg.register("system_checks", || Box::new(Probe))
            .register("system_checks", || Box::new(Probe));
        assert_eq!(reg.instantiate("system_checks").len(), 2);
        assert!(reg.instantiate("unknown").is_empty());
        assert_eq!(reg.stage_names().collect::<Vec<_>>(), vec!["system_checks"]);
    }
}
