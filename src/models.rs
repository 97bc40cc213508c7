use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// Identifier of a cart line. Callers may send any JSON value; equality is
/// always decided on the text form returned by [`ProductId::key`].
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProductId {
    Number(Number),
    Text(String),
    Other(Value),
}

impl ProductId {
    pub fn key(&self) -> String {
        match self {
            ProductId::Text(text) => text.clone(),
            ProductId::Number(number) => number_text(number),
            ProductId::Other(value) => value.to_string(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.key() == key
    }
}

impl From<Value> for ProductId {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(number) => ProductId::Number(number),
            Value::String(text) => ProductId::Text(text),
            other => ProductId::Other(other),
        }
    }
}

impl From<u64> for ProductId {
    fn from(seq: u64) -> Self {
        ProductId::Number(seq.into())
    }
}

// 1.0 and 1 must collide with "1"
fn number_text(number: &Number) -> String {
    if number.is_f64() {
        if let Some(value) = number.as_f64() {
            if value.fract() == 0.0 && value.abs() < 1e21 {
                return format!("{:.0}", value + 0.0);
            }
        }
    }
    number.to_string()
}

/// Raw product fields as posted by the detector or the UI. Every field is
/// optional and loosely typed. A key sent as `null` is kept as `Some(Null)` so
/// a patch can reset a field; normalization treats it like a missing key.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct ProductPayload {
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    #[serde(rename = "_id", default, deserialize_with = "present")]
    pub alt_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub unit: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub units: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub taken: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub payable: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

// null and a missing key mean the same thing to the defaulting rules
fn given(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|value| !value.is_null())
}

impl ProductPayload {
    /// Decodes a request body. An empty body is the empty object.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub unit: String,
    pub taken: f64,
    pub payable: f64,
    /// Whether `payable` came from a caller rather than `price * taken`.
    #[serde(skip)]
    pub payable_explicit: bool,
}

impl Product {
    pub const DEFAULT_NAME: &'static str = "Unknown";

    /// Applies the defaulting rules to a raw payload. `next_id` is only
    /// invoked when the payload carries neither `id` nor `_id`.
    pub fn normalize(payload: ProductPayload, next_id: impl FnOnce() -> u64) -> Product {
        let id = match given(&payload.id).or(given(&payload.alt_id)) {
            Some(value) => ProductId::from(value.clone()),
            None => ProductId::from(next_id()),
        };
        let price = given(&payload.price).map_or(0.0, to_number);
        let taken = given(&payload.taken).map_or(1.0, to_number);
        let (payable, payable_explicit) = match given(&payload.payable) {
            Some(value) => (to_number(value), true),
            None => (price * taken, false),
        };

        Product {
            id,
            name: given(&payload.name).map_or_else(|| Self::DEFAULT_NAME.to_string(), to_text),
            price,
            unit: given(&payload.unit)
                .or(given(&payload.units))
                .map_or_else(String::new, to_text),
            taken,
            payable,
            payable_explicit,
        }
    }

    /// Overlays a patch on this product and normalizes the result. Keys the
    /// patch carries replace the stored ones, `null` included, so a nulled
    /// field falls back to its default. The id is pinned. A `payable` that was
    /// derived is derived again from the merged price and quantity; one a
    /// caller set survives until a patch names `payable` itself.
    pub fn merge(&self, patch: ProductPayload) -> Product {
        let price = match &patch.price {
            Some(_) => given(&patch.price).map_or(0.0, to_number),
            None => self.price,
        };
        let taken = match &patch.taken {
            Some(_) => given(&patch.taken).map_or(1.0, to_number),
            None => self.taken,
        };
        let (payable, payable_explicit) = match given(&patch.payable) {
            Some(value) => (to_number(value), true),
            None if patch.payable.is_none() && self.payable_explicit => (self.payable, true),
            None => (price * taken, false),
        };
        let name = match &patch.name {
            Some(_) => given(&patch.name).map_or_else(|| Self::DEFAULT_NAME.to_string(), to_text),
            None => self.name.clone(),
        };
        // the stored unit is always a key of the merged object, so `units`
        // only counts once the patch nulls `unit` out
        let unit = match &patch.unit {
            Some(_) => given(&patch.unit)
                .or(given(&patch.units))
                .map_or_else(String::new, to_text),
            None => self.unit.clone(),
        };

        Product {
            id: self.id.clone(),
            name,
            price,
            unit,
            taken,
            payable,
            payable_explicit,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    #[serde(serialize_with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub products: Vec<Product>,
    pub total: f64,
}

impl Order {
    pub fn new(id: u64, created_at: DateTime<Utc>, products: Vec<Product>) -> Self {
        let total = products
            .iter()
            .map(|p| if p.payable.is_nan() { 0.0 } else { p.payable })
            .sum();
        Order {
            id,
            created_at,
            products,
            total,
        }
    }
}

fn iso_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Serialize, Debug)]
pub struct ClearedCart {
    pub success: bool,
    pub message: &'static str,
    pub cart: Vec<Product>,
}

/// Numeric coercion with the same outcomes as a JavaScript `Number(x)` call.
/// Non-numeric input yields NaN, which serializes as `null`.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_numeric_text(text),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [Value::Bool(_)] => f64::NAN,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits.chars().fold(0.0, |acc, c| {
            acc * f64::from(radix) + c.to_digit(radix).map_or(0.0, f64::from)
        });
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // f64::from_str also takes "inf" and "nan", which are not numbers here
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
