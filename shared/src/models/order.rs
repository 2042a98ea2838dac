//! Online Order Model

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

/// Upper bound on distinct lines per order
pub const MAX_ORDER_LINES: usize = 30;
/// Upper bound on quantity per line
pub const MAX_LINE_QUANTITY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Expired,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Expired => "expired",
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            _ => Err(UnknownStatus(s)),
        }
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Requested pickup time, Unix millis
    pub pickup_at: Option<i64>,
    pub notes: Option<String>,
    pub total_cents: i64,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    pub stripe_session_id: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
}

/// Order line, priced from the menu at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

impl OrderLine {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Requested line in a create-order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: i64,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub pickup_at: Option<i64>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCheckoutResponse {
    pub order_id: i64,
    pub checkout_url: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            id: 1,
            order_id: 1,
            menu_item_id: 7,
            name: "Tiramisu".into(),
            unit_price_cents: 650,
            quantity: 3,
            notes: None,
        };
        assert_eq!(line.line_total_cents(), 1950);
    }

    #[test]
    fn test_status_serde_matches_db() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, format!("\"{}\"", OrderStatus::PendingPayment.as_db()));
        assert_eq!(OrderStatus::try_from("paid".to_string()), Ok(OrderStatus::Paid));
    }
}
