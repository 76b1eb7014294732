// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Write};

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use super::{BlockId, Type, ValueId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constant {
    Int(i64),
    Real(f64),
    Bool(bool),
    String(String),
}

impl Constant {
    #[must_use]
    pub const fn ty(&self) -> Type {
        match self {
            Self::Int(..) => Type::Int,
            Self::Real(..) => Type::Real,
            Self::Bool(..) => Type::Bool,
            Self::String(..) => Type::String,
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => value.fmt(f),
            Self::Real(value) => write!(f, "{value:?}"),
            Self::Bool(value) => value.fmt(f),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MathOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Xor,
    LeftShift,
    RightShift,
}

impl MathOperation {
    /// Whether `a op b == b op a`.
    #[must_use]
    pub const fn is_commutative(&self) -> bool {
        matches!(self, Self::Add | Self::Multiply | Self::And | Self::Or | Self::Xor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// One incoming value of a [`Instruction::Phi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhiEdge {
    pub block: BlockId,
    pub value: ValueId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Instruction {
    //
    // Values
    //

    Const {
        dst: ValueId,
        value: Constant,
    },

    Math {
        dst: ValueId,
        operation: MathOperation,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Produces a [`Type::Bool`].
    Compare {
        dst: ValueId,
        comparison: Comparison,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Must appear before any other instruction of its block.
    Phi {
        dst: ValueId,
        ty: Type,
        incoming: Vec<PhiEdge>,
    },

    //
    // Memory
    //

    LoadGlobal {
        dst: ValueId,
        global: String,
    },

    StoreGlobal {
        global: String,
        value: ValueId,
    },

    /// Allocates a heap object with one word per field.
    New {
        dst: ValueId,
        fields: Vec<Type>,
    },

    LoadField {
        dst: ValueId,
        ty: Type,
        object: ValueId,
        field: usize,
    },

    StoreField {
        object: ValueId,
        field: usize,
        value: ValueId,
    },

    //
    // Calls
    //

    Call {
        #[serde(default)]
        dst: Option<ValueId>,
        callee: String,
        #[serde(default)]
        arguments: Vec<ValueId>,
    },

    /// Calls a function of the built-in `Sys` module.
    CallNative {
        #[serde(default)]
        dst: Option<ValueId>,
        function: String,
        #[serde(default)]
        arguments: Vec<ValueId>,
    },

    //
    // Terminators
    //

    Jump {
        target: BlockId,
    },

    Branch {
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },

    Return {
        #[serde(default)]
        value: Option<ValueId>,
    },
}

impl Instruction {
    #[must_use]
    pub fn destination(&self) -> Option<ValueId> {
        match self {
            Self::Const { dst, .. } => Some(*dst),
            Self::Math { dst, .. } => Some(*dst),
            Self::Compare { dst, .. } => Some(*dst),
            Self::Phi { dst, .. } => Some(*dst),
            Self::LoadGlobal { dst, .. } => Some(*dst),
            Self::New { dst, .. } => Some(*dst),
            Self::LoadField { dst, .. } => Some(*dst),
            Self::Call { dst, .. } => *dst,
            Self::CallNative { dst, .. } => *dst,

            Self::StoreGlobal { .. } | Self::StoreField { .. } => None,
            Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. })
    }

    /// The blocks control can transfer to from this instruction.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch { then_block, else_block, .. } => vec![*then_block, *else_block],
            _ => Vec::new(),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(dst) = self.destination() {
            write!(f, "{dst} = ")?;
        }

        match self {
            Self::Const { value, .. } => write!(f, "const {value}"),

            Self::Math { operation, lhs, rhs, .. } => write!(f, "{} {lhs}, {rhs}", operation.as_ref()),

            Self::Compare { comparison, lhs, rhs, .. } => write!(f, "compare {} {lhs}, {rhs}", comparison.as_ref()),

            Self::Phi { ty, incoming, .. } => {
                write!(f, "phi {ty}")?;
                for (index, edge) in incoming.iter().enumerate() {
                    f.write_str(if index == 0 { " " } else { ", " })?;
                    write!(f, "[{}: {}]", edge.block, edge.value)?;
                }
                Ok(())
            }

            Self::LoadGlobal { global, .. } => write!(f, "load-global {global}"),

            Self::StoreGlobal { global, value } => write!(f, "store-global {global}, {value}"),

            Self::New { fields, .. } => {
                f.write_str("new {")?;
                for (index, field) in fields.iter().enumerate() {
                    if index != 0 {
                        f.write_str(", ")?;
                    }
                    field.fmt(f)?;
                }
                f.write_char('}')
            }

            Self::LoadField { ty, object, field, .. } => write!(f, "load-field {ty} {object}.{field}"),

            Self::StoreField { object, field, value } => write!(f, "store-field {object}.{field}, {value}"),

            Self::Call { callee, arguments, .. } => {
                write!(f, "call {callee}")?;
                write_arguments(f, arguments)
            }

            Self::CallNative { function, arguments, .. } => {
                write!(f, "call-native {function}")?;
                write_arguments(f, arguments)
            }

            Self::Jump { target } => write!(f, "jump {target}"),

            Self::Branch { condition, then_block, else_block } => write!(f, "branch {condition}, {then_block}, {else_block}"),

            Self::Return { value: Some(value) } => write!(f, "return {value}"),

            Self::Return { value: None } => f.write_str("return"),
        }
    }
}

fn write_arguments(f: &mut std::fmt::Formatter<'_>, arguments: &[ValueId]) -> std::fmt::Result {
    f.write_char('(')?;
    for (index, argument) in arguments.iter().enumerate() {
        if index != 0 {
            f.write_str(", ")?;
        }
        argument.fmt(f)?;
    }
    f.write_char(')')
}
