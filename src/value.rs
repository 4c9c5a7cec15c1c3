use std::cmp::Ordering;

use ecow::EcoString;
use ordered_float::NotNan;
use strum_macros::AsRefStr;

use crate::expr::Deparse;

/// Logical type tag carried by every [`Value`], including NULLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogicalType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    HugeInt,
    Float,
    Double,
    Varchar,
    Date,
}

impl LogicalType {
    /// Integer types, the only ones eligible for the consecutive-IN rewrite.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            LogicalType::TinyInt
                | LogicalType::SmallInt
                | LogicalType::Integer
                | LogicalType::BigInt
                | LogicalType::HugeInt
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, LogicalType::Float | LogicalType::Double)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueData {
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    HugeInt(i128),
    Float(NotNan<f32>),
    Double(NotNan<f64>),
    Varchar(EcoString),
    Date(i32),
}

/// A tagged scalar. A missing payload is a SQL NULL that still remembers
/// its logical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    ty: LogicalType,
    data: Option<ValueData>,
}

impl Value {
    pub fn null(ty: LogicalType) -> Value {
        Value { ty, data: None }
    }

    pub fn boolean(v: bool) -> Value {
        Value {
            ty: LogicalType::Boolean,
            data: Some(ValueData::Boolean(v)),
        }
    }

    pub fn tinyint(v: i8) -> Value {
        Value {
            ty: LogicalType::TinyInt,
            data: Some(ValueData::TinyInt(v)),
        }
    }

    pub fn smallint(v: i16) -> Value {
        Value {
            ty: LogicalType::SmallInt,
            data: Some(ValueData::SmallInt(v)),
        }
    }

    pub fn integer(v: i32) -> Value {
        Value {
            ty: LogicalType::Integer,
            data: Some(ValueData::Integer(v)),
        }
    }

    pub fn bigint(v: i64) -> Value {
        Value {
            ty: LogicalType::BigInt,
            data: Some(ValueData::BigInt(v)),
        }
    }

    pub fn hugeint(v: i128) -> Value {
        Value {
            ty: LogicalType::HugeInt,
            data: Some(ValueData::HugeInt(v)),
        }
    }

    pub fn float(v: NotNan<f32>) -> Value {
        Value {
            ty: LogicalType::Float,
            data: Some(ValueData::Float(v)),
        }
    }

    pub fn double(v: NotNan<f64>) -> Value {
        Value {
            ty: LogicalType::Double,
            data: Some(ValueData::Double(v)),
        }
    }

    pub fn varchar(v: impl Into<EcoString>) -> Value {
        Value {
            ty: LogicalType::Varchar,
            data: Some(ValueData::Varchar(v.into())),
        }
    }

    /// Days since the epoch, matching the planner's date representation.
    pub fn date(days: i32) -> Value {
        Value {
            ty: LogicalType::Date,
            data: Some(ValueData::Date(days)),
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        self.ty
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Widened integer payload. None for NULLs and non-integral types.
    pub fn as_integral(&self) -> Option<i128> {
        match self.data.as_ref()? {
            ValueData::TinyInt(v) => Some(i128::from(*v)),
            ValueData::SmallInt(v) => Some(i128::from(*v)),
            ValueData::Integer(v) => Some(i128::from(*v)),
            ValueData::BigInt(v) => Some(i128::from(*v)),
            ValueData::HugeInt(v) => Some(*v),
            ValueData::Boolean(_)
            | ValueData::Float(_)
            | ValueData::Double(_)
            | ValueData::Varchar(_)
            | ValueData::Date(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data.as_ref()? {
            ValueData::Varchar(s) => Some(s.as_str()),
            ValueData::Boolean(_)
            | ValueData::TinyInt(_)
            | ValueData::SmallInt(_)
            | ValueData::Integer(_)
            | ValueData::BigInt(_)
            | ValueData::HugeInt(_)
            | ValueData::Float(_)
            | ValueData::Double(_)
            | ValueData::Date(_) => None,
        }
    }

    fn as_double(&self) -> Option<f64> {
        match self.data.as_ref()? {
            ValueData::TinyInt(v) => Some(f64::from(*v)),
            ValueData::SmallInt(v) => Some(f64::from(*v)),
            ValueData::Integer(v) => Some(f64::from(*v)),
            ValueData::BigInt(v) => Some(*v as f64),
            ValueData::HugeInt(v) => Some(*v as f64),
            ValueData::Float(v) => Some(f64::from(v.into_inner())),
            ValueData::Double(v) => Some(v.into_inner()),
            ValueData::Boolean(_) | ValueData::Varchar(_) | ValueData::Date(_) => None,
        }
    }

    /// Order two values within the same comparable family. NULL sorts
    /// below every non-NULL value; values of incomparable families
    /// return None.
    #[allow(clippy::wildcard_enum_match_arm)]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let (left, right) = match (self.data.as_ref(), other.data.as_ref()) {
            (None, None) => return Some(Ordering::Equal),
            (None, Some(_)) => return Some(Ordering::Less),
            (Some(_), None) => return Some(Ordering::Greater),
            (Some(left), Some(right)) => (left, right),
        };

        if self.ty.is_numeric() && other.ty.is_numeric() {
            if let (Some(l), Some(r)) = (self.as_integral(), other.as_integral()) {
                return Some(l.cmp(&r));
            }
            return Some(self.as_double()?.total_cmp(&other.as_double()?));
        }

        match (left, right) {
            (ValueData::Boolean(l), ValueData::Boolean(r)) => Some(l.cmp(r)),
            (ValueData::Varchar(l), ValueData::Varchar(r)) => {
                Some(l.as_bytes().cmp(r.as_bytes()))
            }
            (ValueData::Date(l), ValueData::Date(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }

    /// Cast to boolean for filter folding. NULL yields None.
    pub fn cast_boolean(&self) -> Option<bool> {
        match self.data.as_ref()? {
            ValueData::Boolean(v) => Some(*v),
            ValueData::TinyInt(v) => Some(*v != 0),
            ValueData::SmallInt(v) => Some(*v != 0),
            ValueData::Integer(v) => Some(*v != 0),
            ValueData::BigInt(v) => Some(*v != 0),
            ValueData::HugeInt(v) => Some(*v != 0),
            ValueData::Float(v) => Some(v.into_inner() != 0.0),
            ValueData::Double(v) => Some(v.into_inner() != 0.0),
            ValueData::Varchar(s) => match s.as_str() {
                "t" | "true" => Some(true),
                "f" | "false" => Some(false),
                _ => None,
            },
            ValueData::Date(_) => None,
        }
    }
}

impl Deparse for Value {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        let Some(data) = self.data.as_ref() else {
            buf.push_str("NULL");
            return buf;
        };
        match data {
            ValueData::Boolean(v) => buf.push_str(if *v { "true" } else { "false" }),
            ValueData::TinyInt(v) => buf.push_str(v.to_string().as_str()),
            ValueData::SmallInt(v) => buf.push_str(v.to_string().as_str()),
            ValueData::Integer(v) => buf.push_str(v.to_string().as_str()),
            ValueData::BigInt(v) => buf.push_str(v.to_string().as_str()),
            ValueData::HugeInt(v) => buf.push_str(v.to_string().as_str()),
            ValueData::Float(v) => buf.push_str(v.into_inner().to_string().as_str()),
            ValueData::Double(v) => buf.push_str(v.into_inner().to_string().as_str()),
            ValueData::Varchar(s) => {
                buf.push('\'');
                for c in s.chars() {
                    if c == '\'' {
                        buf.push('\'');
                    }
                    buf.push(c);
                }
                buf.push('\'');
            }
            ValueData::Date(v) => {
                buf.push_str("date ");
                buf.push_str(v.to_string().as_str());
            }
        };

        buf
    }
}
