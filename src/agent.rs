use std::{fmt::Debug, hash::Hash, sync::Arc};

use anyhow::bail;

use crate::mailbox::AgentLink;

/// What an agent implementation must provide.
///
/// `run` is called on a dedicated thread for each match. It must read the match header,
/// answer with a setup response, then for each round read the round header, answer with a
/// move and read the round result. Every answer must arrive before the referee's deadline,
/// and `run` must return shortly after the last round result.
pub trait Agent: Send {
    fn run(&mut self, link: AgentLink) -> anyhow::Result<()>;
}

type AgentFactory = dyn Fn() -> Box<dyn Agent> + Send + Sync;

/// A roster entry. Creates a fresh agent for every match it plays.
pub struct Contender {
    pub name: String,
    pub id: u32,
    factory: Box<AgentFactory>,
}

impl PartialEq for Contender {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Contender {}

impl Hash for Contender {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Debug for Contender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contender")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Contender {
    pub fn new(
        name: String,
        id: u32,
        factory: impl Fn() -> Box<dyn Agent> + Send + Sync + 'static,
    ) -> Contender {
        Contender {
            name,
            id,
            factory: Box::new(factory),
        }
    }

    pub fn spawn_agent(&self) -> Box<dyn Agent> {
        (self.factory)()
    }
}

/// The agents taking part in a tournament, in registration order.
#[derive(Debug, Default)]
pub struct Roster {
    contenders: Vec<Arc<Contender>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent under `name`.
    ///
    /// # Errors
    /// When the name is already taken, or is not made of lowercase letters, digits and
    /// underscores (at least two characters, not starting with an underscore).
    pub fn add(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn Agent> + Send + Sync + 'static,
    ) -> anyhow::Result<()> {
        if !is_valid_name(name) {
            bail!("invalid agent name '{name}'");
        }
        if self.contenders.iter().any(|c| c.name == name) {
            bail!("agent '{name}' is already registered");
        }
        let id = self.contenders.len() as u32 + 1;
        self.contenders
            .push(Arc::new(Contender::new(name.to_owned(), id, factory)));
        Ok(())
    }

    /// Builder-style [`Roster::add`].
    pub fn with(
        mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn Agent> + Send + Sync + 'static,
    ) -> anyhow::Result<Self> {
        self.add(name, factory)?;
        Ok(self)
    }

    pub fn contenders(&self) -> &[Arc<Contender>] {
        &self.contenders
    }

    pub fn names(&self) -> Vec<String> {
        self.contenders.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.contenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contenders.is_empty()
    }
}

fn is_valid_name(name: &str) -> bool {
    name.len() >= 2
        && !name.starts_with('_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Agent for Idle {
        fn run(&mut self, _link: AgentLink) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn idle() -> Box<dyn Agent> {
        Box::new(Idle)
    }

    #[test]
    fn names_are_unique() {
        let mut roster = Roster::new();
        roster.add("alpha", idle).unwrap();
        assert!(roster.add("alpha", idle).is_err());
        roster.add("beta_2", idle).unwrap();
        assert_eq!(roster.names(), vec!["alpha", "beta_2"]);
        assert_eq!(roster.contenders()[1].id, 2);
    }

    #[test]
    fn bad_names() {
        let mut roster = Roster::new();
        for name in ["", "a", "Alpha", "_x", "with space", "dash-bot"] {
            assert!(roster.add(name, idle).is_err(), "{name}");
        }
        assert!(roster.is_empty());
    }
}
