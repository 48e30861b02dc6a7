use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Comparison operator of a [`Condition`](crate::Condition).
///
/// Serialized and displayed in its symbolic form (`=`, `>=`, `NOT_LIKE`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Operator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Eq,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    NotEq,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Gte,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Lte,

    #[serde(rename = "LIKE")]
    #[strum(serialize = "LIKE")]
    Like,
    #[serde(rename = "NOT_LIKE")]
    #[strum(serialize = "NOT_LIKE")]
    NotLike,
    #[serde(rename = "ILIKE")]
    #[strum(serialize = "ILIKE")]
    ILike,
    #[serde(rename = "STARTS_WITH")]
    #[strum(serialize = "STARTS_WITH")]
    StartsWith,
    #[serde(rename = "ENDS_WITH")]
    #[strum(serialize = "ENDS_WITH")]
    EndsWith,
    #[serde(rename = "CONTAINS")]
    #[strum(serialize = "CONTAINS")]
    Contains,

    #[serde(rename = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[serde(rename = "NOT_IN")]
    #[strum(serialize = "NOT_IN")]
    NotIn,

    #[serde(rename = "IS_NULL")]
    #[strum(serialize = "IS_NULL")]
    IsNull,
    #[serde(rename = "IS_NOT_NULL")]
    #[strum(serialize = "IS_NOT_NULL")]
    IsNotNull,

    #[serde(rename = "BETWEEN")]
    #[strum(serialize = "BETWEEN")]
    Between,
    #[serde(rename = "NOT_BETWEEN")]
    #[strum(serialize = "NOT_BETWEEN")]
    NotBetween,
}

/// Logical inverse of each operator that has one. Both directions are listed.
static INVERSIONS: [(Operator, Operator); 14] = [
    (Operator::Eq, Operator::NotEq),
    (Operator::NotEq, Operator::Eq),
    (Operator::Gt, Operator::Lte),
    (Operator::Lte, Operator::Gt),
    (Operator::Gte, Operator::Lt),
    (Operator::Lt, Operator::Gte),
    (Operator::Like, Operator::NotLike),
    (Operator::NotLike, Operator::Like),
    (Operator::In, Operator::NotIn),
    (Operator::NotIn, Operator::In),
    (Operator::IsNull, Operator::IsNotNull),
    (Operator::IsNotNull, Operator::IsNull),
    (Operator::Between, Operator::NotBetween),
    (Operator::NotBetween, Operator::Between),
];

impl Operator {
    /// The operator that negates this one, if the inversion table has it.
    ///
    /// `ILIKE`, `STARTS_WITH`, `ENDS_WITH` and `CONTAINS` have no negated
    /// counterpart and return `None`.
    pub fn inverse(self) -> Option<Operator> {
        INVERSIONS
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, inv)| *inv)
    }

    /// Null checks are the only operators that take no value.
    pub fn requires_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn is_range(self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }

    pub fn is_array(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_string_match(self) -> bool {
        matches!(
            self,
            Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::StartsWith
                | Operator::EndsWith
                | Operator::Contains
        )
    }
}
