//! The common data types that are shared across the storage backend and the APIs.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use kasir_common::Rupiah;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

//--------------------------------------        Role          ---------------------------------------------------------

/// The role an authenticated actor holds within a tenant. Authentication itself happens upstream; the engine only
/// uses the role for authorisation decisions such as destructive deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Cashier,
}

impl Role {
    /// Admins and owners may perform destructive operations, such as hard-deleting transactions.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Owner => write!(f, "owner"),
            Role::Manager => write!(f, "manager"),
            Role::Cashier => write!(f, "cashier"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid role: {0}")]
pub struct RoleParseError(String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

//--------------------------------------    TenantContext     ---------------------------------------------------------

/// Identifies who is performing an operation and on behalf of which café. Every tenant-scoped database operation
/// takes a context, and rows belonging to other tenants are invisible to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: i64,
    pub actor_id: i64,
    pub role: Role,
}

impl TenantContext {
    pub fn new(tenant_id: i64, actor_id: i64, role: Role) -> Self {
        Self { tenant_id, actor_id, role }
    }
}

//--------------------------------------      OrderType       ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    TakeAway,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::DineIn => write!(f, "dine_in"),
            OrderType::TakeAway => write!(f, "take_away"),
        }
    }
}

//--------------------------------------  TransactionStatus   ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Expired,
    Cancelled,
}

impl PaymentStatus {
    /// Once a payment has left `Pending`, the gateway can no longer change its mind about it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

//--------------------------------------       Product        ---------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub tenant_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Rupiah,
    pub cost: Rupiah,
    pub stock: i64,
    pub sku: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Rupiah,
    #[serde(default)]
    pub cost: Rupiah,
    #[serde(default)]
    pub stock: i64,
    pub sku: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

//--------------------------------------     Transaction      ---------------------------------------------------------

/// A sales transaction header. Monetary totals are derived from the line items at write time and stored
/// denormalised, so a fetched header is always internally consistent without a join.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub tenant_id: i64,
    pub transaction_number: String,
    pub cashier_id: i64,
    pub customer_name: Option<String>,
    pub order_type: OrderType,
    pub subtotal: Rupiah,
    pub tax: Rupiah,
    pub discount: Rupiah,
    pub total: Rupiah,
    pub payment_method: String,
    pub paid_amount: Rupiah,
    pub change_amount: Rupiah,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item belonging to a transaction. The product name and unit price are snapshotted at sale time so that
/// later product edits do not rewrite history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: i64,
    pub transaction_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Rupiah,
    pub subtotal: Rupiah,
    pub notes: Option<String>,
}

/// A transaction header together with its line items, as returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionAggregate {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

pub const DEFAULT_TAX_RATE: f64 = 0.11;

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub order_type: OrderType,
    pub customer_name: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub paid_amount: Rupiah,
    #[serde(default)]
    pub discount: Rupiah,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    pub notes: Option<String>,
    pub items: Vec<NewTransactionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionItem {
    pub product_id: i64,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// A partial update to a transaction header. `None` fields are left untouched. When `items` is present, the old
/// line items are released back to stock and replaced wholesale, and the monetary totals are recomputed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransaction {
    pub customer_name: Option<String>,
    pub order_type: Option<OrderType>,
    pub payment_method: Option<String>,
    pub paid_amount: Option<Rupiah>,
    pub discount: Option<Rupiah>,
    pub notes: Option<String>,
    pub items: Option<Vec<NewTransactionItem>>,
}

impl UpdateTransaction {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none() &&
            self.order_type.is_none() &&
            self.payment_method.is_none() &&
            self.paid_amount.is_none() &&
            self.discount.is_none() &&
            self.notes.is_none() &&
            self.items.is_none()
    }

    /// True when only header metadata changes, i.e. no line item replacement is requested.
    pub fn is_header_only(&self) -> bool {
        self.items.is_none()
    }

    pub fn has_header_fields(&self) -> bool {
        self.customer_name.is_some() ||
            self.order_type.is_some() ||
            self.payment_method.is_some() ||
            self.paid_amount.is_some() ||
            self.discount.is_some() ||
            self.notes.is_some()
    }
}

//--------------------------------------       Payment        ---------------------------------------------------------

/// A payment attempt against a transaction, tracking the gateway round-trip. A transaction may accumulate several
/// payment rows (e.g. an expired attempt followed by a successful retry), but at most one may be `success`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub transaction_id: i64,
    pub merchant_order_id: String,
    pub reference: Option<String>,
    pub payment_url: Option<String>,
    pub va_number: Option<String>,
    pub qr_string: Option<String>,
    pub payment_method: String,
    pub amount: Rupiah,
    pub status: PaymentStatus,
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub callback_data: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to record a freshly created gateway payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: i64,
    pub merchant_order_id: String,
    pub reference: Option<String>,
    pub payment_url: Option<String>,
    pub va_number: Option<String>,
    pub qr_string: Option<String>,
    pub payment_method: String,
    pub amount: Rupiah,
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// A state change reported by the gateway, either via the server-to-server callback or a status poll.
#[derive(Debug, Clone)]
pub struct GatewayUpdate {
    pub result_code: String,
    pub reference: Option<String>,
    /// The raw callback body, stored verbatim for audit purposes. Status polls leave this empty.
    pub raw_payload: Option<String>,
}

impl GatewayUpdate {
    /// Maps the result code the way the callback path does. The gateway only ever posts `00`, `01` or a failure
    /// code to the callback URL, so anything else means the attempt failed.
    pub fn status(&self) -> PaymentStatus {
        match self.result_code.as_str() {
            "00" => PaymentStatus::Success,
            "01" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }

    /// Maps the result code the way the status-poll path does. `02` (cancelled) only appears here, and the
    /// catch-all differs too: when we went asking and the gateway no longer recognises the payment, it has
    /// lapsed rather than failed.
    pub fn poll_status(&self) -> PaymentStatus {
        match self.result_code.as_str() {
            "00" => PaymentStatus::Success,
            "01" => PaymentStatus::Pending,
            "02" => PaymentStatus::Cancelled,
            _ => PaymentStatus::Expired,
        }
    }
}

//--------------------------------------   Query structures   ---------------------------------------------------------

/// Filters for the transaction search endpoint. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQueryFilter {
    pub status: Option<TransactionStatus>,
    pub order_type: Option<OrderType>,
    /// Substring match against the transaction number, customer name or notes.
    pub search: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

impl TransactionQueryFilter {
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, term: S) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// One page of transaction search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub transactions: Vec<TransactionAggregate>,
}
