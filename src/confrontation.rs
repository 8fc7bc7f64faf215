use std::{fmt::Display, sync::Arc};

use crate::agent::Contender;

/// Two contenders about to meet, in seat order.
#[derive(Debug, Clone)]
pub struct Confrontation {
    pub ordered_player: [Arc<Contender>; 2],
}

impl Confrontation {
    pub fn new(first: Arc<Contender>, second: Arc<Contender>) -> Self {
        Self {
            ordered_player: [first, second],
        }
    }

    pub fn names(&self) -> [String; 2] {
        self.ordered_player.each_ref().map(|c| c.name.clone())
    }
}

impl Display for Confrontation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self
            .ordered_player
            .iter()
            .fold(String::new(), |acu, contender| {
                if acu.is_empty() {
                    acu + &contender.name
                } else {
                    acu + " VS " + &contender.name
                }
            });
        write!(f, "[{s}]")
    }
}
