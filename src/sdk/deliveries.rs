// Shipment rows as the e-POD API returns them
use super::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRecord {
    pub tracking_no: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, with = "timestamp::optional")]
    pub shipped_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub epod_status: Option<String>,
    /// Number or label, whatever the dispatcher entered.
    #[serde(default)]
    pub priority: Option<Value>,
    /// Every other column, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeliveryRecord {
    pub fn new(tracking_no: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            tracking_no: tracking_no.into(),
            address: address.into(),
            shipped_date: None,
            customer_name: None,
            epod_status: None,
            priority: None,
            extra: Map::new(),
        }
    }

    pub fn shipped_on(mut self, shipped_date: DateTime<Utc>) -> Self {
        self.shipped_date = Some(shipped_date);
        self
    }

    pub fn status(&self) -> Option<DeliveryStatus> {
        self.epod_status.as_deref().map(DeliveryStatus::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    InTransit,
    InReceiving,
    Delivered,
    Other(String),
}

impl From<&str> for DeliveryStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in transit" => DeliveryStatus::InTransit,
            "in receiving" => DeliveryStatus::InReceiving,
            "delivered" => DeliveryStatus::Delivered,
            _ => DeliveryStatus::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::InTransit => f.write_str("In Transit"),
            DeliveryStatus::InReceiving => f.write_str("In Receiving"),
            DeliveryStatus::Delivered => f.write_str("Delivered"),
            DeliveryStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Receipt confirmation a driver records when scanning items at drop-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreDeliveryRecord {
    pub pre_delivery_tracking_no: String,
    #[serde(default)]
    pub pre_delivery_received_by: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Who signed for `tracking_no`, from the first matching pre-delivery row.
pub fn received_by<'a>(pre_deliveries: &'a [PreDeliveryRecord], tracking_no: &str) -> Option<&'a str> {
    pre_deliveries
        .iter()
        .find(|pre| pre.pre_delivery_tracking_no == tracking_no)
        .and_then(|pre| pre.pre_delivery_received_by.as_deref())
}
