//! Payment intent, proof and deposit reporting objects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SettlementToken;

/// Server-issued identifier of a single payment attempt (`depositID`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepositId(pub String);

impl DepositId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DepositId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DepositId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Request body of `pay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(rename = "eventID")]
    pub event_id: String,
    /// Sent as a JSON number; the server parses it as a float of TON.
    #[serde(with = "rust_decimal::serde::float")]
    pub collateral: Decimal,
    pub token: SettlementToken,
}

/// Transfer instructions the wallet has to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMessage {
    /// Destination (bank) address.
    pub address: String,
    /// Amount in nanotons, as a decimal string.
    pub amount: String,
    /// Base64 BOC carrying the deposit comment.
    pub payload: String,
}

/// Response body of `pay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub message: PaymentMessage,
    #[serde(rename = "depositID")]
    pub deposit_id: DepositId,
}

/// Response body of `generate-payload`: a challenge the wallet must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofChallenge {
    pub payload: String,
}

/// A wallet-signed proof. Carried opaquely; only the server validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedProof(pub serde_json::Value);

/// Response body of `check-proof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAck {
    /// Bearer token for authenticated endpoints.
    #[serde(default)]
    pub token: Option<String>,
}

/// Deposit verdict, used both when reporting a transfer and in push
/// notifications.
///
/// The server encodes it either as `"APPROVED"` / `"REJECTED"` or with the
/// legacy numeric codes `0` (ok) and `1` (error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepositStatus {
    Approved,
    Rejected,
}

impl DepositStatus {
    /// Numeric code accepted by the `deposit` endpoint.
    pub fn code(self) -> u8 {
        match self {
            DepositStatus::Approved => 0,
            DepositStatus::Rejected => 1,
        }
    }
}

fn serialize_status_code<S: serde::Serializer>(
    status: &DepositStatus,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(status.code())
}

impl Serialize for DepositStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            DepositStatus::Approved => "APPROVED",
            DepositStatus::Rejected => "REJECTED",
        })
    }
}

impl<'de> Deserialize<'de> for DepositStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u8),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(0) => Ok(DepositStatus::Approved),
            Raw::Code(1) => Ok(DepositStatus::Rejected),
            Raw::Code(other) => Err(serde::de::Error::custom(format!(
                "unknown deposit status code {other}"
            ))),
            Raw::Name(name) => match name.to_ascii_uppercase().as_str() {
                "APPROVED" | "OK" => Ok(DepositStatus::Approved),
                "REJECTED" | "ERROR" => Ok(DepositStatus::Rejected),
                _ => Err(serde::de::Error::custom(format!(
                    "unknown deposit status {name:?}"
                ))),
            },
        }
    }
}

/// Request body of `deposit`: the client's report on the wallet transfer.
///
/// The status goes out as its numeric code; the server rejects the names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReport {
    #[serde(rename = "depositStatus", serialize_with = "serialize_status_code")]
    pub deposit_status: DepositStatus,
    #[serde(rename = "depositID")]
    pub deposit_id: DepositId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_payment_request_sends_numeric_collateral() {
        let request = PaymentIntentRequest {
            event_id: "e-1".to_string(),
            collateral: Decimal::from_str("1.5").unwrap(),
            token: "TokenA".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["eventID"], "e-1");
        assert_eq!(json["collateral"], 1.5);
        assert_eq!(json["token"], "TokenA");
    }

    #[test]
    fn test_payment_intent_parsing() {
        let json = r#"{
            "message": {"address": "EQB...", "amount": "1500000000", "payload": "te6cck..."},
            "depositID": "3a1d"
        }"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.deposit_id, DepositId::from("3a1d"));
        assert_eq!(intent.message.amount, "1500000000");
    }

    #[test]
    fn test_deposit_status_accepts_names_and_codes() {
        let parse = |s: &str| serde_json::from_str::<DepositStatus>(s).unwrap();
        assert_eq!(parse(r#""APPROVED""#), DepositStatus::Approved);
        assert_eq!(parse(r#""rejected""#), DepositStatus::Rejected);
        assert_eq!(parse("0"), DepositStatus::Approved);
        assert_eq!(parse("1"), DepositStatus::Rejected);
        assert!(serde_json::from_str::<DepositStatus>("7").is_err());
        assert!(serde_json::from_str::<DepositStatus>(r#""maybe""#).is_err());
    }

    #[test]
    fn test_deposit_report_sends_status_code() {
        let report = DepositReport {
            deposit_status: DepositStatus::Rejected,
            deposit_id: "3a1d".into(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["depositStatus"], 1);
        assert_eq!(json["depositID"], "3a1d");

        let approved = DepositReport {
            deposit_status: DepositStatus::Approved,
            ..report
        };
        let json = serde_json::to_value(&approved).unwrap();
        assert_eq!(json["depositStatus"], 0);
        let parsed: DepositReport = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, approved);
    }
}
