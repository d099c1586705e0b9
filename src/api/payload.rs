//! Request/response bodies and boundary validation for `POST /predict`.
//!
//! [`PredictBody`] is the wire schema. Every field deserializes leniently into
//! a [`Scalar`] so one pass can report all bad fields at once, in the
//! `{"loc": [...], "msg": ..., "type": ...}` shape HTTP clients of this API
//! already parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::PropertyRecord;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn new(loc: &[&str], msg: &str, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.to_string(),
            kind: kind.to_string(),
        }
    }

    fn field(name: &str, msg: &str, kind: &str) -> Self {
        Self::new(&["body", name], msg, kind)
    }

    pub fn invalid_json(detail: &str) -> Self {
        Self::new(&["body"], &format!("JSON decode error: {detail}"), "json_invalid")
    }
}

/// A JSON value as sent for one field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    Other(Value),
    /// Key absent. `Other` accepts any value, so input never yields this.
    #[default]
    Missing,
}

impl Scalar {
    /// Labels accept strings as-is and numbers keyed like numeric table cells.
    fn label(self, name: &str, errors: &mut Vec<FieldError>) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Number(v) => Some(v.to_string()),
            Scalar::Missing => {
                errors.push(FieldError::field(name, "Field required", "missing"));
                None
            }
            Scalar::Other(_) => {
                errors.push(FieldError::field(name, "Input should be a valid string", "string_type"));
                None
            }
        }
    }

    /// Numbers accept JSON numbers and numeric strings; the result must be finite.
    fn number(self, name: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
        let value = match self {
            Scalar::Number(v) => v,
            Scalar::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    errors.push(FieldError::field(
                        name,
                        "Input should be a valid number, unable to parse string as a number",
                        "float_parsing",
                    ));
                    return None;
                }
            },
            Scalar::Missing => {
                errors.push(FieldError::field(name, "Field required", "missing"));
                return None;
            }
            Scalar::Other(_) => {
                errors.push(FieldError::field(name, "Input should be a valid number", "float_type"));
                return None;
            }
        };
        if !value.is_finite() {
            errors.push(FieldError::field(name, "Input should be a finite number", "finite_number"));
            return None;
        }
        Some(value)
    }
}

/// Wire schema of the `POST /predict` body. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PredictBody {
    #[serde(rename = "type")]
    property_type: Scalar,
    sector: Scalar,
    net_usable_area: Scalar,
    net_area: Scalar,
    n_rooms: Scalar,
    n_bathroom: Scalar,
    latitude: Scalar,
    longitude: Scalar,
}

/// A validated prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub property_type: String,
    pub sector: String,
    pub net_usable_area: f64,
    pub net_area: f64,
    pub n_rooms: f64,
    pub n_bathroom: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictResponse {
    pub prediction: f64,
}

impl PredictRequest {
    /// Validate a JSON body.
    ///
    /// Numbers may arrive as numeric strings and labels as numbers.
    pub fn from_json(body: &Value) -> Result<Self, Vec<FieldError>> {
        let not_an_object = || {
            vec![FieldError::new(
                &["body"],
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            )]
        };
        if !body.is_object() {
            return Err(not_an_object());
        }
        let raw = PredictBody::deserialize(body).map_err(|_| not_an_object())?;

        let mut errors = Vec::new();
        let property_type = raw.property_type.label("type", &mut errors);
        let sector = raw.sector.label("sector", &mut errors);
        let net_usable_area = raw.net_usable_area.number("net_usable_area", &mut errors);
        let net_area = raw.net_area.number("net_area", &mut errors);
        let n_rooms = raw.n_rooms.number("n_rooms", &mut errors);
        let n_bathroom = raw.n_bathroom.number("n_bathroom", &mut errors);
        let latitude = raw.latitude.number("latitude", &mut errors);
        let longitude = raw.longitude.number("longitude", &mut errors);

        match (
            property_type,
            sector,
            net_usable_area,
            net_area,
            n_rooms,
            n_bathroom,
            latitude,
            longitude,
        ) {
            (
                Some(property_type),
                Some(sector),
                Some(net_usable_area),
                Some(net_area),
                Some(n_rooms),
                Some(n_bathroom),
                Some(latitude),
                Some(longitude),
            ) if errors.is_empty() => Ok(Self {
                property_type,
                sector,
                net_usable_area,
                net_area,
                n_rooms,
                n_bathroom,
                latitude,
                longitude,
            }),
            _ => Err(errors),
        }
    }
}

impl From<PredictRequest> for PropertyRecord {
    fn from(r: PredictRequest) -> Self {
        PropertyRecord {
            property_type: r.property_type,
            sector: r.sector,
            net_usable_area: r.net_usable_area,
            net_area: r.net_area,
            n_rooms: r.n_rooms,
            n_bathroom: r.n_bathroom,
            latitude: r.latitude,
            longitude: r.longitude,
            price: None,
        }
    }
}
