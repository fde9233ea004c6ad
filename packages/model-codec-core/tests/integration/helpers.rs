//! Shared fixtures: a small shop schema and sample records.

use model_codec_core::record::{NativeValue, Record, Timestamp};
use model_codec_core::schema::SchemaRegistry;

pub const SHOP_SCHEMA: &str = r#"
[enums.Tier]
values = [
    { name = "FREE", number = 0 },
    { name = "PRO", number = 1 },
    { name = "ENTERPRISE", number = 2 },
]

[enums.Badge]
values = [
    { name = "NONE", number = 0 },
    { name = "EARLY", number = 1 },
    { name = "STAFF", number = 2 },
]

[records.Account]
path = "accounts"
fields = [
    { name = "id", type = "string", role = "id" },
    { name = "email", type = "string", required = true },
    { name = "tier", type = "Tier" },
    { name = "badges", type = "Badge", repeated = true },
    { name = "avatar", type = "bytes" },
    { name = "credits", type = "uint64" },
    { name = "rating", type = "double" },
    { name = "created_at", type = "timestamp" },
    { name = "password", type = "string", ephemeral = true },
]

[records.Order]
fields = [
    { name = "id", type = "string", role = "id" },
    { name = "buyer", type = "Account", role = "reference" },
    { name = "note", type = "string" },
    { name = "items", type = "LineItem", repeated = true, collection = { mode = "collection", path = "lines" } },
    { name = "shipping", type = "Address" },
]

[records.LineItem]
fields = [
    { name = "id", type = "string", role = "id" },
    { name = "sku", type = "string", required = true },
    { name = "quantity", type = "int32" },
]

[records.Address]
fields = [
    { name = "city", type = "string" },
    { name = "zip", type = "string" },
]
"#;

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::from_toml(SHOP_SCHEMA).unwrap()
}

/// Account with every persisted field set.
pub fn account(registry: &SchemaRegistry) -> Record {
    Record::builder(&registry.require("Account").unwrap())
        .set("id", "a1")
        .set("email", "ada@example.com")
        .set("tier", NativeValue::Enum(1))
        .push("badges", NativeValue::Enum(1))
        .push("badges", NativeValue::Enum(2))
        .set("avatar", vec![0xde_u8, 0xad, 0xbe, 0xef])
        .set("credits", u64::MAX)
        .set("rating", 4.25)
        .set("created_at", Timestamp::new(1_700_000_000, 500))
        .build()
        .unwrap()
}

pub fn line_item(registry: &SchemaRegistry, id: &str, sku: &str, quantity: i32) -> Record {
    Record::builder(&registry.require("LineItem").unwrap())
        .set("id", id)
        .set("sku", sku)
        .set("quantity", quantity)
        .build()
        .unwrap()
}

/// Order for `a1` with two line items and a shipping address.
pub fn order(registry: &SchemaRegistry) -> Record {
    let buyer = Record::builder(&registry.require("Account").unwrap())
        .set("id", "a1")
        .build()
        .unwrap();
    let shipping = Record::builder(&registry.require("Address").unwrap())
        .set("city", "Lisbon")
        .set("zip", "1100")
        .build()
        .unwrap();
    Record::builder(&registry.require("Order").unwrap())
        .set("id", "o1")
        .set("buyer", buyer)
        .set("note", "leave at door")
        .push("items", line_item(registry, "l1", "SKU-1", 2))
        .push("items", line_item(registry, "l2", "SKU-2", 1))
        .set("shipping", shipping)
        .build()
        .unwrap()
}
