//! Event and Ticket Models

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

/// Ticketed or informational event (wine tasting, live music, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_key: Option<String>,
    /// Unix millis
    pub starts_at: i64,
    /// Unix millis
    pub ends_at: i64,
    /// Ticket price in cents, 0 = free entry (no ticket sales)
    pub price_cents: i64,
    pub capacity: i32,
    pub tickets_sold: i32,
    /// Private-hire style events close the dining room to reservations
    pub blocks_reservations: bool,
    pub is_published: bool,
}

impl Event {
    pub fn tickets_remaining(&self) -> i32 {
        (self.capacity - self.tickets_sold).max(0)
    }

    /// Tickets can be bought for published, paid events that have not started.
    pub fn is_on_sale(&self, now: i64) -> bool {
        self.is_published && self.price_cents > 0 && self.starts_at > now
    }
}

/// Public event listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_key: Option<String>,
    pub starts_at: i64,
    pub ends_at: i64,
    pub price_cents: i64,
    pub tickets_remaining: i32,
}

impl From<&Event> for EventSummary {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id,
            title: e.title.clone(),
            description: e.description.clone(),
            image_key: e.image_key.clone(),
            starts_at: e.starts_at,
            ends_at: e.ends_at,
            price_cents: e.price_cents,
            tickets_remaining: e.tickets_remaining(),
        }
    }
}

/// Ticket order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketOrderStatus {
    /// Checkout session created, awaiting payment
    Pending,
    /// Paid, tickets issued
    Paid,
    /// Checkout session expired unpaid
    Expired,
}

impl TicketOrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Expired => "expired",
        }
    }
}

impl TryFrom<String> for TicketOrderStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            _ => Err(UnknownStatus(s)),
        }
    }
}

/// Ticket order row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TicketOrder {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub email: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: TicketOrderStatus,
    pub stripe_session_id: Option<String>,
    /// `pending` | `sent` | `failed`
    pub email_status: String,
    pub created_at: i64,
    pub paid_at: Option<i64>,
}

/// Issued ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    pub ticket_order_id: i64,
    pub code: String,
    pub created_at: i64,
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCheckoutRequest {
    pub name: String,
    pub email: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCheckoutResponse {
    pub ticket_order_id: i64,
    pub checkout_url: String,
}

/// Success-page confirmation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfirmRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfirmResponse {
    pub order: TicketOrder,
    pub event: EventSummary,
    pub tickets: Vec<Ticket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
