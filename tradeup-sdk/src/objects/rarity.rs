use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Skin rarity tiers, lowest first.
pub enum Rarity {
    Consumer,
    Industrial,
    #[serde(rename = "Mil-Spec")]
    MilSpec,
    Restricted,
    Classified,
    Covert,
    Contraband,
}

impl Rarity {
    /// Tiers that have tradeups. A pool of one of these tiers rewards an
    /// item of the next tier up.
    pub const TRADEUP_TIERS: [Rarity; 5] = [
        Rarity::Consumer,
        Rarity::Industrial,
        Rarity::MilSpec,
        Rarity::Restricted,
        Rarity::Classified,
    ];

    /// The reward tier for a tradeup of this rarity.
    ///
    /// Progression is forward-only. `Covert` and `Contraband` are terminal
    /// and return `None`.
    pub fn next(self) -> Option<Rarity> {
        match self {
            Rarity::Consumer => Some(Rarity::Industrial),
            Rarity::Industrial => Some(Rarity::MilSpec),
            Rarity::MilSpec => Some(Rarity::Restricted),
            Rarity::Restricted => Some(Rarity::Classified),
            Rarity::Classified => Some(Rarity::Covert),
            Rarity::Covert | Rarity::Contraband => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Consumer => "Consumer",
            Rarity::Industrial => "Industrial",
            Rarity::MilSpec => "Mil-Spec",
            Rarity::Restricted => "Restricted",
            Rarity::Classified => "Classified",
            Rarity::Covert => "Covert",
            Rarity::Contraband => "Contraband",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progression_is_forward_only() {
        let mut tier = Rarity::Consumer;
        let mut steps = 0;
        while let Some(next) = tier.next() {
            assert!(next > tier);
            tier = next;
            steps += 1;
        }
        assert_eq!(tier, Rarity::Covert);
        assert_eq!(steps, 5);
        assert_eq!(Rarity::Contraband.next(), None);
    }

    #[test]
    fn test_mil_spec_wire_name() {
        let json = serde_json::to_string(&Rarity::MilSpec).unwrap();
        assert_eq!(json, "\"Mil-Spec\"");
        let parsed: Rarity = serde_json::from_str("\"Mil-Spec\"").unwrap();
        assert_eq!(parsed, Rarity::MilSpec);
    }
}
