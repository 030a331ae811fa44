//! Standardized mutation operator kinds and their static relationships.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Error;

/// Mutation operator kinds, normalized across frameworks.
///
/// The serialized names double as the keys of the persisted history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MutationOperator {
    #[serde(rename = "ARITHMETIC")]
    ArithmeticReplacement,
    #[serde(rename = "BOUNDARY")]
    BoundaryCondition,
    #[serde(rename = "CONDITIONAL")]
    ConditionalReplacement,
    #[serde(rename = "NEGATE")]
    NegateConditional,
    #[serde(rename = "RETURN")]
    ReturnValueReplacement,
    #[serde(rename = "REMOVE_COND")]
    RemoveConditional,
    #[serde(rename = "VOID_CALL")]
    VoidMethodCall,
    #[serde(rename = "INCREMENT")]
    IncrementDecrement,
    #[serde(rename = "LOGICAL")]
    LogicalOperator,
    #[serde(rename = "OTHER")]
    FrameworkSpecific,
}

/// Operator families used to pre-filter coverage comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    Arithmetic,
    Conditional,
}

/// Killing a mutant of the left operator statistically implies the
/// mutants of the right operators nearby are killed too.
const SUBSUMPTIONS: &[(MutationOperator, &[MutationOperator])] = &[
    (
        MutationOperator::ArithmeticReplacement,
        &[MutationOperator::IncrementDecrement],
    ),
    (
        MutationOperator::BoundaryCondition,
        &[MutationOperator::NegateConditional],
    ),
    (
        MutationOperator::ReturnValueReplacement,
        &[MutationOperator::VoidMethodCall],
    ),
];

const FAMILIES: &[(OperatorFamily, &[MutationOperator])] = &[
    (
        OperatorFamily::Arithmetic,
        &[
            MutationOperator::ArithmeticReplacement,
            MutationOperator::IncrementDecrement,
        ],
    ),
    (
        OperatorFamily::Conditional,
        &[
            MutationOperator::ConditionalReplacement,
            MutationOperator::NegateConditional,
            MutationOperator::RemoveConditional,
            MutationOperator::BoundaryCondition,
        ],
    ),
];

impl MutationOperator {
    /// All operator kinds in declaration order.
    pub const ALL: [MutationOperator; 10] = [
        Self::ArithmeticReplacement,
        Self::BoundaryCondition,
        Self::ConditionalReplacement,
        Self::NegateConditional,
        Self::ReturnValueReplacement,
        Self::RemoveConditional,
        Self::VoidMethodCall,
        Self::IncrementDecrement,
        Self::LogicalOperator,
        Self::FrameworkSpecific,
    ];

    /// Persisted key for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArithmeticReplacement => "ARITHMETIC",
            Self::BoundaryCondition => "BOUNDARY",
            Self::ConditionalReplacement => "CONDITIONAL",
            Self::NegateConditional => "NEGATE",
            Self::ReturnValueReplacement => "RETURN",
            Self::RemoveConditional => "REMOVE_COND",
            Self::VoidMethodCall => "VOID_CALL",
            Self::IncrementDecrement => "INCREMENT",
            Self::LogicalOperator => "LOGICAL",
            Self::FrameworkSpecific => "OTHER",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ArithmeticReplacement => "arithmetic replacement",
            Self::BoundaryCondition => "boundary condition",
            Self::ConditionalReplacement => "conditional replacement",
            Self::NegateConditional => "negate conditional",
            Self::ReturnValueReplacement => "return value replacement",
            Self::RemoveConditional => "remove conditional",
            Self::VoidMethodCall => "void method call",
            Self::IncrementDecrement => "increment/decrement",
            Self::LogicalOperator => "logical operator",
            Self::FrameworkSpecific => "framework specific",
        }
    }

    /// Operators whose nearby mutants this operator subsumes.
    pub fn subsumes(&self) -> &'static [MutationOperator] {
        SUBSUMPTIONS
            .iter()
            .find(|(op, _)| op == self)
            .map(|(_, subsumed)| *subsumed)
            .unwrap_or(&[])
    }

    /// Check whether this operator subsumes `other`.
    pub fn subsumes_operator(&self, other: MutationOperator) -> bool {
        self.subsumes().contains(&other)
    }

    /// Family this operator belongs to, if any.
    pub fn family(&self) -> Option<OperatorFamily> {
        FAMILIES
            .iter()
            .find(|(_, members)| members.contains(self))
            .map(|(family, _)| *family)
    }

    /// Whether mutants of the two operators are worth comparing by coverage.
    ///
    /// Related means identical, linked by a subsumption entry in either
    /// direction, or members of the same family.
    pub fn is_related_to(&self, other: MutationOperator) -> bool {
        if *self == other {
            return true;
        }
        if self.subsumes_operator(other) || other.subsumes_operator(*self) {
            return true;
        }
        matches!((self.family(), other.family()), (Some(a), Some(b)) if a == b)
    }
}

impl std::fmt::Display for MutationOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::UnknownOperator(s.to_string()))
    }
}
