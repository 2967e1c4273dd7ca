//! Card service - manage the cards transactions are booked against

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_currency, Card};
use crate::ports::Repository;

/// Fields for a new card
#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub name: String,
    pub bank: Option<String>,
    pub last_four: Option<String>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

/// Card management
pub struct CardService {
    repository: Arc<dyn Repository>,
}

impl CardService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Validate and store a new card
    pub fn add(&self, new: NewCard) -> Result<Card> {
        let mut card = Card::new(new.name.trim());
        card.bank = new.bank.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
        card.last_four = new.last_four.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        if let Some(balance) = new.balance {
            card.balance = balance;
        }
        if let Some(currency) = new.currency {
            card.currency = normalize_currency(&currency);
        }

        card.validate()?;
        self.repository.upsert_card(&card)?;
        Ok(card)
    }

    pub fn list(&self) -> Result<Vec<Card>> {
        self.repository.get_cards()
    }

    pub fn get(&self, id: Uuid) -> Result<Card> {
        self.repository
            .get_card(id)?
            .ok_or_else(|| Error::not_found(format!("Card {}", id)))
    }

    pub fn rename(&self, id: Uuid, name: &str) -> Result<Card> {
        let mut card = self.get(id)?;
        card.name = name.trim().to_string();
        card.updated_at = Utc::now();
        card.validate()?;
        self.repository.upsert_card(&card)?;
        Ok(card)
    }

    /// Overwrite the stored balance, e.g. after reconciling with the bank
    pub fn set_balance(&self, id: Uuid, balance: Decimal) -> Result<Card> {
        let mut card = self.get(id)?;
        card.balance = balance;
        card.updated_at = Utc::now();
        self.repository.upsert_card(&card)?;
        Ok(card)
    }

    /// Remove a card; its transactions are kept without a card
    pub fn remove(&self, id: Uuid) -> Result<()> {
        if !self.repository.delete_card(id)? {
            return Err(Error::not_found(format!("Card {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> CardService {
        let repo = DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        CardService::new(Arc::new(repo))
    }

    #[test]
    fn test_add_normalizes_fields() {
        let dir = TempDir::new().unwrap();
        let cards = service(&dir);

        let card = cards
            .add(NewCard {
                name: "  Kaspi Gold ".to_string(),
                last_four: Some("4821".to_string()),
                currency: Some("usd".to_string()),
                bank: Some("   ".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(card.name, "Kaspi Gold");
        assert_eq!(card.currency, "USD");
        assert!(card.bank.is_none());
        assert_eq!(cards.list().unwrap().len(), 1);
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let cards = service(&dir);

        let blank = cards.add(NewCard::default());
        assert!(matches!(blank, Err(Error::Validation(_))));

        let digits = cards.add(NewCard {
            name: "Visa".to_string(),
            last_four: Some("48a1".to_string()),
            ..Default::default()
        });
        assert!(matches!(digits, Err(Error::Validation(_))));
        assert!(cards.list().unwrap().is_empty());
    }

    #[test]
    fn test_rename_and_set_balance() {
        let dir = TempDir::new().unwrap();
        let cards = service(&dir);
        let card = cards
            .add(NewCard {
                name: "Visa".to_string(),
                ..Default::default()
            })
            .unwrap();

        cards.rename(card.id, "Visa Platinum").unwrap();
        cards.set_balance(card.id, Decimal::new(4250, 2)).unwrap();

        let stored = cards.get(card.id).unwrap();
        assert_eq!(stored.name, "Visa Platinum");
        assert_eq!(stored.balance, Decimal::new(4250, 2));

        assert!(matches!(cards.rename(card.id, " "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_remove_unknown_card() {
        let dir = TempDir::new().unwrap();
        let cards = service(&dir);
        assert!(matches!(cards.remove(Uuid::new_v4()), Err(Error::NotFound(_))));
    }
}
