//! Card-game API models and endpoint constructors.

use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, HttpMethod};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "manaCost")]
    pub mana_cost: Option<String>,
    #[serde(default, rename = "type")]
    pub type_line: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardList {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardEnvelope {
    pub card: Card,
}

/// `GET /v1/cards?name=<name>`
pub fn cards_named(name: &str) -> Endpoint<CardList> {
    Endpoint::typed(HttpMethod::Get, "/v1/cards").query("name", name)
}

/// `GET /v1/cards/<id>`
pub fn card_by_id(id: &str) -> Endpoint<CardEnvelope> {
    Endpoint::typed(HttpMethod::Get, format!("/v1/cards/{id}"))
}
