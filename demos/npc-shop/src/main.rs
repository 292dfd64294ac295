//! A small NPC shop server speaking the token packet format.
//!
//! Clients send `<counter> <header> <fields...>` frames terminated by
//! `0xFF`. Try it with `printf '1 npc_req 2 9001\xff' | nc 127.0.0.1 4000`.

mod packets;
mod shop;

use std::sync::Arc;

use packetforge::prelude::*;
use serde::{Deserialize, Serialize};

use crate::packets::{
    BuyPacket, CreateShop, Gold, InventoryType, MemoKind, NpcRequest, SellPacket, ShopInventory,
    ShopMemo, ShopPackets,
};
use crate::shop::{owner_key, Listing, Shop, ShopConfig, ShopError};

/// NPC whose stock is listed at startup.
const MERCHANT: i64 = 9001;

/// Environment variable naming a JSON configuration file.
const CONFIG_ENV: &str = "NPC_SHOP_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    server: ServerConfig,
    shop: ShopConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                includes_leading_counter: true,
                ..ServerConfig::default()
            },
            shop: ShopConfig::default(),
        }
    }
}

impl Config {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)?;
                tracing::info!(%path, "configuration loaded");
                Ok(serde_json::from_str(&text)?)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn stock_merchant(shop: &Shop) {
    let stock = [
        (0, InventoryType::Main, 50, 25),
        (1, InventoryType::Main, 20, 400),
        (2, InventoryType::Equipment, 1, 7_500),
    ];
    for (slot, inventory_type, amount, price) in stock {
        shop.stock(
            MERCHANT,
            slot,
            Listing {
                inventory_type,
                amount,
                price,
                seller: None,
            },
        );
    }
}

fn refusal(err: &ShopError) -> ShopMemo {
    let kind = match err {
        ShopError::NotEnoughGold { .. } | ShopError::MaxGold => MemoKind::Failure,
        ShopError::NotListed { .. } | ShopError::NotEnoughStock { .. } => MemoKind::Warning,
    };
    ShopMemo::new(kind, err.to_string())
}

fn router(shop: Arc<Shop>, registry: Arc<SchemaRegistry>) -> Result<Router, ProtocolError> {
    registry.initialize::<ShopPackets>()?;

    let buy_shop = Arc::clone(&shop);
    let sell_shop = Arc::clone(&shop);
    let open_shop = Arc::clone(&shop);
    let list_shop = shop;

    Router::with_registry(registry)
        .route(move |buy: BuyPacket, outbox: &mut Outbox<'_>| {
            match buy_shop.buy(outbox.connection(), buy.owner_id, buy.slot, buy.amount) {
                Ok(purchase) => {
                    outbox.push(&ShopMemo::new(
                        MemoKind::Success,
                        format!("Bought {} for {} gold", purchase.amount, purchase.cost),
                    ));
                    outbox.push(&Gold {
                        amount: purchase.gold_left,
                        max_display: 0,
                    });
                }
                Err(err) => outbox.push(&refusal(&err)),
            }
        })?
        .route(move |sell: SellPacket, outbox: &mut Outbox<'_>| {
            match sell_shop.sell(outbox.connection(), sell.amount) {
                Ok(gold) => {
                    outbox.push(&ShopMemo::new(
                        MemoKind::Success,
                        format!("Sold {} from slot {}", sell.amount, sell.slot),
                    ));
                    outbox.push(&Gold {
                        amount: gold,
                        max_display: 0,
                    });
                }
                Err(err) => outbox.push(&refusal(&err)),
            }
        })?
        .route(move |create: CreateShop, outbox: &mut Outbox<'_>| {
            let listed = open_shop.open(outbox.connection(), &create.items);
            if listed == 0 {
                outbox.push_text("shop_end 0");
                outbox.push(&ShopMemo::new(MemoKind::Warning, "Your shop is empty"));
                return;
            }
            outbox.push_text("ishop");
            outbox.push(&ShopMemo::new(
                MemoKind::Info,
                format!(
                    "Shop {} open with {listed} items",
                    owner_key(outbox.connection())
                ),
            ));
        })?
        .route_raw(CreateShop::HEADER, |text: &str, outbox: &mut Outbox<'_>| {
            tracing::debug!(packet = text, "unreadable shop declaration");
            outbox.push_text("shop_end 0");
            outbox.push(&ShopMemo::new(MemoKind::Failure, "Invalid shop declaration"));
        })
        .route(move |request: NpcRequest, outbox: &mut Outbox<'_>| {
            outbox.push(&ShopInventory {
                kind: request.kind,
                owner_id: request.owner_id,
                entries: list_shop.entries(request.owner_id),
            });
        })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    packetforge::init_logging("info,npc_shop=debug");

    let config = Config::load()?;
    let shop = Arc::new(Shop::new(config.shop.clone()));
    stock_merchant(&shop);

    let router = router(shop, SchemaRegistry::global())?;
    let server = PacketServer::builder()
        .config(config.server)
        .build(router)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "npc shop listening");
    server.run().await?;
    Ok(())
}
