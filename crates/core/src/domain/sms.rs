use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An intercepted text message holding (possibly) a two-factor code.
///
/// Created on ingestion, flipped to `used = true` at most once when its
/// embedded code is consumed, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub id: i64,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub used: bool,
}
