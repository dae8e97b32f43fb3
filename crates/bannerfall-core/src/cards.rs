//! Card definitions, the standard deck and drawing.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum cards in a hand
pub const HAND_SIZE: usize = 6;

/// Buffs help your own units, nerfs hinder the enemy's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Buff,
    Nerf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardRarity {
    Common,
    Rare,
    SuperRare,
}

/// Errors from malformed deck data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("unknown card type {0:?}")]
    UnknownCardType(String),

    #[error("unknown card rarity {0:?}")]
    UnknownRarity(String),

    #[error("invalid quantity {quantity:?} for card {title:?}")]
    InvalidQuantity { title: String, quantity: String },
}

impl FromStr for CardType {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Buff" => Ok(CardType::Buff),
            "Nerf" => Ok(CardType::Nerf),
            other => Err(DeckError::UnknownCardType(other.to_string())),
        }
    }
}

impl FromStr for CardRarity {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Common" => Ok(CardRarity::Common),
            "Rare" => Ok(CardRarity::Rare),
            // Deck sheets spell this several ways
            "Super Rare" | "Super rare" | "SuperRare" => Ok(CardRarity::SuperRare),
            other => Err(DeckError::UnknownRarity(other.to_string())),
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Buff => write!(f, "Buff"),
            CardType::Nerf => write!(f, "Nerf"),
        }
    }
}

impl fmt::Display for CardRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardRarity::Common => write!(f, "Common"),
            CardRarity::Rare => write!(f, "Rare"),
            CardRarity::SuperRare => write!(f, "Super Rare"),
        }
    }
}

/// An immutable card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub card_type: CardType,
    pub rarity: CardRarity,
    pub description: String,
}

impl Card {
    pub fn new(
        title: impl Into<String>,
        card_type: CardType,
        rarity: CardRarity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            card_type,
            rarity,
            description: description.into(),
        }
    }

    /// Lowercased, trimmed title used to look up card rules
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    /// Identity used when dealing unique hands
    fn identity(&self) -> (&str, CardType, CardRarity) {
        (&self.title, self.card_type, self.rarity)
    }
}

/// Lowercase and trim a card title
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// One row of a deck table: a card and how many copies it has
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRow {
    pub card: Card,
    pub quantity: u32,
}

impl CardRow {
    /// Build a row from raw text fields
    pub fn parse(
        title: &str,
        card_type: &str,
        rarity: &str,
        description: &str,
        quantity: &str,
    ) -> Result<Self, DeckError> {
        let quantity = quantity
            .trim()
            .parse()
            .map_err(|_| DeckError::InvalidQuantity {
                title: title.trim().to_string(),
                quantity: quantity.to_string(),
            })?;

        Ok(Self {
            card: Card::new(
                title.trim(),
                card_type.parse()?,
                rarity.parse()?,
                description.trim(),
            ),
            quantity,
        })
    }
}

/// The shared multiset of cards hands are drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

/// Both opening hands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningHands {
    pub player1: Vec<Card>,
    pub player2: Vec<Card>,
}

impl Deck {
    /// Expand rows into a flat multiset
    pub fn from_rows(rows: impl IntoIterator<Item = CardRow>) -> Self {
        let cards = rows
            .into_iter()
            .flat_map(|row| std::iter::repeat(row.card).take(row.quantity as usize))
            .collect();
        Self { cards }
    }

    /// The built-in card frequency table
    pub fn standard() -> Self {
        Self::from_rows(standard_rows())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Deal the opening hands: 12 cards unique by title, type and rarity,
    /// six to each player.
    pub fn draw_unique_for_both_players<R: Rng + ?Sized>(&self, rng: &mut R) -> OpeningHands {
        let mut shuffled: Vec<&Card> = self.cards.iter().collect();
        shuffled.shuffle(rng);

        let mut seen = HashSet::new();
        let mut unique: Vec<Card> = Vec::with_capacity(HAND_SIZE * 2);
        for card in shuffled {
            if seen.insert(card.identity()) {
                unique.push(card.clone());
                if unique.len() == HAND_SIZE * 2 {
                    break;
                }
            }
        }

        let player2 = unique.split_off(unique.len().min(HAND_SIZE));
        OpeningHands {
            player1: unique,
            player2,
        }
    }

    /// Draw `count` cards from the full multiset. Repeats across hands are
    /// allowed.
    pub fn draw_random<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Card> {
        let mut shuffled = self.cards.clone();
        shuffled.shuffle(rng);
        shuffled.truncate(count);
        shuffled
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::standard()
    }
}

/// The standard Bannerfall deck
pub fn standard_rows() -> Vec<CardRow> {
    use CardRarity::{Common, Rare, SuperRare};
    use CardType::{Buff, Nerf};

    let table: [(&str, CardType, CardRarity, &str, u32); 32] = [
        ("Transfusion", Buff, Common, "Heal target unit plus 2 HP", 8),
        ("Phantasmic Shield", Buff, Common, "Target unit takes 2 less damage next turn", 5),
        ("Axehound", Buff, Common, "Target Brute deals +1 Damage on its next attack", 4),
        ("Poison Arrow", Buff, Common, "Target Archer deals +1 Damage on its next attack", 4),
        ("Shadow's Edge", Buff, Common, "Target Assassin deals +1 Damage on its next attack", 4),
        ("King of the Hill", Buff, Rare, "Archer on a Plateau deals +2 Damage on its next attack", 2),
        ("Farsight", Buff, Rare, "Archer gains +1 Range for this turn", 2),
        ("Swift Foot", Buff, Rare, "Target unit gains +1 Movement for this turn", 3),
        ("Spectral Shift", Buff, Rare, "Selected mage can move up to 5 hexes next turn", 2),
        (
            "In & Out Murder",
            Buff,
            Rare,
            "If target Assassin attack results in a kill this turn, they gain +1 Movement for this turn",
            2,
        ),
        ("Shield Bash", Buff, Rare, "The next unit to attack target unit is knocked back one hex", 2),
        (
            "Gravity's Lash",
            Buff,
            Rare,
            "Hurl a unit off its Plateau to the nearest open hex. It takes 1 fall damage",
            1,
        ),
        (
            "Martyr Protocol",
            Buff,
            SuperRare,
            "All units within 2 hexes of your Banner gain +2 Atk next turn. Casting Mage loses 1HP",
            1,
        ),
        (
            "Shroud of Turino",
            Buff,
            SuperRare,
            "Assassin is invisible to enemies for one turn (cannot be attacked or nerfed)",
            1,
        ),
        ("Raging Pulse", Buff, SuperRare, "Brute receives +3 damage on next attack", 1),
        ("Echo Strike", Buff, SuperRare, "Selected brute gains one extra attack this turn", 1),
        (
            "Spinal Ripcord",
            Buff,
            SuperRare,
            "Warlord deals +2 Damage. Attack ignores all enemy Shields or Damage-reduction buffs",
            1,
        ),
        (
            "Soul Siphon",
            Buff,
            SuperRare,
            "Warlord deals +2 Damage. If the target dies, your Warlord heals 1 HP",
            1,
        ),
        (
            "Rampage",
            Buff,
            SuperRare,
            "Warlord gains one extra attack action this turn (must be used in same turn)",
            1,
        ),
        (
            "Super Smash",
            Buff,
            SuperRare,
            "Warlord does +1 damage to all enemy units within two tiles of the attacked unit",
            1,
        ),
        ("Overwound Strings", Nerf, Common, "Target Archer deals -1 Damage on its next attack", 7),
        ("Toe Rot", Nerf, Common, "Target enemy cannot perform a Move action on their next turn", 8),
        ("Blinding Dust", Nerf, Common, "Target enemy's Range is reduced by 1 for their next turn", 4),
        ("Brittle blade", Nerf, Common, "Target Brute deals -2 Damage on its next attack", 4),
        (
            "Coward's Mark",
            Nerf,
            Rare,
            "Target opponent unit cannot make an attack on their next turn",
            2,
        ),
        ("Grave Debt", Nerf, Rare, "When target unit dies, the nearest enemy Mage loses 2 HP", 2),
        ("Vertigo", Nerf, Rare, "Target unit on a Plateau loses its Plateau bonuses next turn", 2),
        ("Tarnished Crown", Nerf, Rare, "Enemy Warlord cannot receive buffs next turn", 1),
        (
            "Claws of crabs",
            Nerf,
            SuperRare,
            "If targeted enemy unit has two of your units adjacent to it, +1 attack for each adjacent friendly unit",
            4,
        ),
        (
            "Weight of Command",
            Nerf,
            SuperRare,
            "Enemy Warlord loses 1 Atk for every ally currently adjacent to him",
            1,
        ),
        (
            "Traitor's Toll",
            Nerf,
            SuperRare,
            "Force an enemy unit to deal 2 Damage to their own adjacent Warlord",
            1,
        ),
        (
            "Shatter Terra",
            Nerf,
            SuperRare,
            "Selected mage can destroy an enemy plateau and kill any player on it",
            1,
        ),
    ];

    table
        .into_iter()
        .map(|(title, card_type, rarity, description, quantity)| CardRow {
            card: Card::new(title, card_type, rarity, description),
            quantity,
        })
        .collect()
}
