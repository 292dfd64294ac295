//! Shop state shared by every connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use packetforge::prelude::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::packets::{InventoryType, ShopEntry, ShopItem};

/// Economy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Gold a connection starts with.
    pub starting_gold: i64,
    /// Nobody may hold more than this.
    pub max_gold: i64,
    /// Gold paid per unit sold to an NPC.
    pub sell_price: i64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            starting_gold: 10_000,
            max_gold: 1_000_000_000,
            sell_price: 50,
        }
    }
}

/// Why a trade was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    #[error("nothing is sold in slot {slot}")]
    NotListed { slot: i16 },

    #[error("only {available} left in slot {slot}")]
    NotEnoughStock { slot: i16, available: u8 },

    #[error("not enough gold: {price} needed, {gold} available")]
    NotEnoughGold { price: i64, gold: i64 },

    #[error("gold limit reached")]
    MaxGold,
}

/// One item offered for sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub inventory_type: InventoryType,
    pub amount: u8,
    pub price: i64,
    /// The player paid for each sale. `None` for NPC stock.
    pub seller: Option<ConnectionId>,
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub amount: u8,
    pub cost: i64,
    pub gold_left: i64,
}

#[derive(Debug, Default)]
struct State {
    listings: BTreeMap<(i64, i16), Listing>,
    wallets: HashMap<ConnectionId, i64>,
}

/// Listings of NPC and player shops plus every connection's gold.
///
/// Listings are keyed by owner: an NPC id, or the connection id of the
/// player that opened the shop.
#[derive(Debug)]
pub struct Shop {
    config: ShopConfig,
    state: Mutex<State>,
}

impl Shop {
    pub fn new(config: ShopConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts `listing` up for sale in `owner`'s shop.
    pub fn stock(&self, owner: i64, slot: i16, listing: Listing) {
        self.state().listings.insert((owner, slot), listing);
    }

    /// Opens a player shop, replacing any earlier one. Returns the number
    /// of listings.
    pub fn open(&self, player: ConnectionId, items: &[ShopItem]) -> usize {
        let owner = owner_key(player);
        let mut state = self.state();
        state.listings.retain(|(id, _), _| *id != owner);
        for item in items.iter().filter(|item| item.amount > 0 && item.price >= 0) {
            state.listings.insert(
                (owner, item.slot),
                Listing {
                    inventory_type: item.inventory_type,
                    amount: item.amount,
                    price: item.price,
                    seller: Some(player),
                },
            );
        }
        state.listings.range((owner, i16::MIN)..=(owner, i16::MAX)).count()
    }

    /// Everything `owner` has for sale, in slot order.
    pub fn entries(&self, owner: i64) -> Vec<ShopEntry> {
        self.state()
            .listings
            .range((owner, i16::MIN)..=(owner, i16::MAX))
            .map(|(&(_, slot), listing)| ShopEntry {
                slot,
                amount: listing.amount,
                price: listing.price,
            })
            .collect()
    }

    /// Current gold of a connection.
    pub fn gold(&self, who: ConnectionId) -> i64 {
        let mut state = self.state();
        *state.wallets.entry(who).or_insert(self.config.starting_gold)
    }

    /// Moves `amount` units from `owner`'s slot to `buyer`.
    ///
    /// The seller of a player listing is paid; NPC stock is not.
    pub fn buy(
        &self,
        buyer: ConnectionId,
        owner: i64,
        slot: i16,
        amount: u8,
    ) -> Result<Purchase, ShopError> {
        let starting_gold = self.config.starting_gold;
        let mut state = self.state();

        let listing = state
            .listings
            .get(&(owner, slot))
            .ok_or(ShopError::NotListed { slot })?
            .clone();
        if listing.amount < amount {
            return Err(ShopError::NotEnoughStock {
                slot,
                available: listing.amount,
            });
        }

        let cost = listing.price.saturating_mul(i64::from(amount));
        let gold = *state.wallets.entry(buyer).or_insert(starting_gold);
        if gold < cost {
            return Err(ShopError::NotEnoughGold { price: cost, gold });
        }

        if let Some(seller) = listing.seller.filter(|seller| *seller != buyer) {
            let seller_gold = state.wallets.entry(seller).or_insert(starting_gold);
            *seller_gold = seller_gold.saturating_add(cost).min(self.config.max_gold);
        }

        let gold_left = gold - cost;
        state.wallets.insert(buyer, gold_left);
        let remaining = listing.amount - amount;
        if remaining == 0 {
            state.listings.remove(&(owner, slot));
        } else if let Some(stock) = state.listings.get_mut(&(owner, slot)) {
            stock.amount = remaining;
        }

        tracing::debug!(%buyer, owner, slot, amount, cost, "purchase");
        Ok(Purchase {
            amount,
            cost,
            gold_left,
        })
    }

    /// Pays `seller` for `amount` units sold to an NPC. Returns the new
    /// gold total.
    pub fn sell(&self, seller: ConnectionId, amount: u8) -> Result<i64, ShopError> {
        let earned = self.config.sell_price.saturating_mul(i64::from(amount));
        let mut state = self.state();
        let gold = state
            .wallets
            .entry(seller)
            .or_insert(self.config.starting_gold);
        if gold.saturating_add(earned) > self.config.max_gold {
            return Err(ShopError::MaxGold);
        }
        *gold += earned;
        Ok(*gold)
    }
}

/// Player shops are keyed by connection id.
pub fn owner_key(owner: ConnectionId) -> i64 {
    i64::try_from(owner.into_inner()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NPC: i64 = 9001;

    fn shop() -> Shop {
        let shop = Shop::new(ShopConfig {
            starting_gold: 1_000,
            max_gold: 2_000,
            sell_price: 50,
        });
        shop.stock(
            NPC,
            0,
            Listing {
                inventory_type: InventoryType::Main,
                amount: 10,
                price: 100,
                seller: None,
            },
        );
        shop.stock(
            NPC,
            1,
            Listing {
                inventory_type: InventoryType::Equipment,
                amount: 1,
                price: 5_000,
                seller: None,
            },
        );
        shop
    }

    #[test]
    fn test_buy_from_npc() {
        let shop = shop();
        let buyer = ConnectionId::new(1);
        let purchase = shop.buy(buyer, NPC, 0, 3).unwrap();
        assert_eq!(purchase.cost, 300);
        assert_eq!(purchase.gold_left, 700);
        assert_eq!(shop.entries(NPC)[0].amount, 7);
    }

    #[test]
    fn test_buy_refusals() {
        let shop = shop();
        let buyer = ConnectionId::new(1);
        assert_eq!(shop.buy(buyer, NPC, 4, 1), Err(ShopError::NotListed { slot: 4 }));
        assert_eq!(
            shop.buy(buyer, NPC, 0, 11),
            Err(ShopError::NotEnoughStock {
                slot: 0,
                available: 10
            })
        );
        assert_eq!(
            shop.buy(buyer, NPC, 1, 1),
            Err(ShopError::NotEnoughGold {
                price: 5_000,
                gold: 1_000
            })
        );
        assert_eq!(shop.gold(buyer), 1_000);
    }

    #[test]
    fn test_sold_out_listing_disappears() {
        let shop = shop();
        let rich = ConnectionId::new(2);
        shop.buy(rich, NPC, 0, 5).unwrap();
        shop.buy(ConnectionId::new(3), NPC, 0, 5).unwrap();
        assert_eq!(shop.entries(NPC).len(), 1);
        assert_eq!(shop.entries(NPC)[0].slot, 1);
    }

    #[test]
    fn test_player_shop_pays_owner() {
        let shop = shop();
        let owner = ConnectionId::new(7);
        let buyer = ConnectionId::new(8);
        let items = [ShopItem {
            inventory_type: InventoryType::Etc,
            slot: 3,
            amount: 2,
            price: 150,
        }];
        assert_eq!(shop.open(owner, &items), 1);

        shop.buy(buyer, 7, 3, 2).unwrap();
        assert_eq!(shop.gold(owner), 1_300);
        assert_eq!(shop.gold(buyer), 700);
    }

    #[test]
    fn test_sell_respects_max_gold() {
        let shop = shop();
        let seller = ConnectionId::new(1);
        assert_eq!(shop.sell(seller, 4), Ok(1_200));
        assert_eq!(shop.sell(seller, 20), Err(ShopError::MaxGold));
        assert_eq!(shop.gold(seller), 1_200);
    }
}
