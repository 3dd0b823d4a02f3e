//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ItemId, ProductId};

/// A single line in the cart.
///
/// `id` identifies the line within one cart (server-assigned for
/// authenticated carts, caller-supplied for anonymous ones); `product_id`
/// identifies the catalog product the line was created from. Two lines in
/// one cart never share an `id`, and adding the same product twice
/// accumulates quantity on the existing line instead of creating a second
/// one.
///
/// Serialized camelCase to match both the wire payload and the persisted
/// snapshot format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Unique within a cart.
    pub id: ItemId,
    /// Catalog product this line refers to.
    pub product_id: ProductId,
    /// Display name captured when the item was added.
    pub name: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    /// Product image reference for rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Number of units. Never persisted as zero; a zero target quantity is
    /// an instruction to delete the line.
    pub quantity: u32,
    /// Whether the product can currently be purchased. Out-of-stock lines
    /// stay visible but are excluded from bulk selection.
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl CartItem {
    /// Create an in-stock line with no image.
    #[must_use]
    pub fn new(
        id: impl Into<ItemId>,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            name: name.into(),
            price,
            image_ref: None,
            quantity,
            in_stock: true,
        }
    }

    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
