use facet::Facet;

/// String form of a field that does not exist on a record.
pub const UNDEFINED: &str = "undefined";

/// One observed variable snapshot, produced by script instrumentation.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Record {
    /// Variable name as written in the instrumented source.
    pub name: String,

    /// Observed value.
    pub value: RecordValue,

    /// Declared type reported by the instrumentation (`"string"`, `"number"`, ...).
    pub r#type: String,

    /// Stack-frame formatted location, e.g. `at add (http://host/a.js:10:2)`.
    pub code_location: String,

    /// Monotonic observation index assigned when the record was captured.
    pub exec_order: u64,
}

impl Record {
    /// String coercion of the named field, the way a script engine would
    /// stringify it. Unknown field names coerce to `"undefined"`.
    pub fn field_string(&self, field_name: &str) -> String {
        match RecordField::parse(field_name) {
            Some(field) => self.field(field),
            None => UNDEFINED.to_string(),
        }
    }

    pub fn field(&self, field: RecordField) -> String {
        match field {
            RecordField::Name => self.name.clone(),
            RecordField::Value => self.value.coerce_to_string(),
            RecordField::Type => self.r#type.clone(),
            RecordField::CodeLocation => self.code_location.clone(),
            RecordField::ExecOrder => self.exec_order.to_string(),
        }
    }
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum RecordField {
    Name,
    Value,
    Type,
    CodeLocation,
    ExecOrder,
}

impl RecordField {
    /// Accepts both camelCase (`codeLocation`) and snake_case (`code_location`)
    /// spellings of the field names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "value" => Some(Self::Value),
            "type" => Some(Self::Type),
            "codeLocation" | "code_location" => Some(Self::CodeLocation),
            "execOrder" | "exec_order" => Some(Self::ExecOrder),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Value => "value",
            Self::Type => "type",
            Self::CodeLocation => "code_location",
            Self::ExecOrder => "exec_order",
        }
    }
}

/// Scalar captured by instrumentation.
#[derive(Facet, Debug, Clone, PartialEq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum RecordValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RecordValue {
    pub fn coerce_to_string(&self) -> String {
        match self {
            Self::Undefined => UNDEFINED.to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => number_to_string(*value),
            Self::Text(value) => value.clone(),
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// Shortest round-trip digits, exponent form outside [1e-6, 1e21).
fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let formatted = format!("{value:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}
