//! JSON wire format (§6). This is the only surface syntax the toolchain
//! understands — no textual lexer/parser is in scope, so this module is the
//! entire "front end".
//!
//! Control instructions (`br`, `jmp`) carry their value operands in `args`
//! and their jump targets in a separate `labels` array, following the
//! original IL's own convention; everything else keeps operands in `args`.

use super::function::{Function, Item};
use super::instruction::{BinOp, Instruction, UnOp};
use super::program::Program;
use super::types::Type;
use super::value::Literal;
use crate::error::ir_error::IrError;
use crate::error::ToolError;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize)]
struct RawProgram {
    functions: Vec<RawFunction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFunction {
    name: String,
    instrs: Vec<RawItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawType {
    Name(String),
    Ptr { ptr: Box<RawType> },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    ty: Option<RawType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

fn convert_type(raw: &RawType) -> Result<Type, IrError> {
    match raw {
        RawType::Name(name) => match name.as_str() {
            "int" => Ok(Type::Int),
            "bool" => Ok(Type::Bool),
            "ptr" => Err(IrError::InvalidType("bare 'ptr' requires a pointee via {\"ptr\": T}".into())),
            other => Err(IrError::InvalidType(format!("unknown type name '{other}'"))),
        },
        RawType::Ptr { ptr } => Ok(Type::Ptr(Box::new(convert_type(ptr)?))),
    }
}

fn type_to_raw(ty: &Type) -> RawType {
    match ty {
        Type::Int => RawType::Name("int".to_string()),
        Type::Bool => RawType::Name("bool".to_string()),
        Type::Ptr(inner) => RawType::Ptr { ptr: Box::new(type_to_raw(inner)) },
    }
}

fn require_dest(op: &str, dest: Option<String>) -> Result<String, IrError> {
    dest.ok_or(IrError::MissingField { op: op.to_string(), field: "dest" })
}

fn require_type(op: &str, ty: Option<&RawType>) -> Result<Type, IrError> {
    let raw = ty.ok_or_else(|| IrError::MissingField { op: op.to_string(), field: "type" })?;
    convert_type(raw)
}

fn require_args(op: &str, args: &[String], expected: usize) -> Result<(), IrError> {
    if args.len() != expected {
        return Err(IrError::WrongArgCount { op: op.to_string(), expected, got: args.len() });
    }
    Ok(())
}

fn require_labels(op: &str, labels: &[String], expected: usize) -> Result<(), IrError> {
    if labels.len() != expected {
        return Err(IrError::WrongArgCount { op: format!("{op} (labels)"), expected, got: labels.len() });
    }
    Ok(())
}

fn convert_literal(op: &str, value: Option<serde_json::Value>, ty: &Type) -> Result<Literal, IrError> {
    let value = value.ok_or(IrError::MissingField { op: op.to_string(), field: "value" })?;
    match (ty, value) {
        (Type::Bool, serde_json::Value::Bool(b)) => Ok(Literal::Bool(b)),
        (Type::Int, serde_json::Value::Number(n)) => {
            BigInt::from_str(&n.to_string()).map(Literal::Int).map_err(|e| IrError::InvalidLiteral(e.to_string()))
        }
        (ty, other) => Err(IrError::InvalidLiteral(format!("value {other} is not a valid literal of type {ty}"))),
    }
}

fn convert_item(raw: RawItem, func_name: &str) -> Result<Item, IrError> {
    if let Some(label) = raw.label {
        return Ok(Item::Label(label));
    }
    let op = raw.op.ok_or_else(|| IrError::UnknownOpcode(format!("(missing 'op' in function '{func_name}')")))?;

    let instr = match op.as_str() {
        "const" => {
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            let value = convert_literal(&op, raw.value, &ty)?;
            Instruction::Const { dest, ty, value }
        }
        "add" | "sub" | "mul" | "div" | "eq" | "lt" | "le" | "gt" | "ge" | "and" | "or" | "ptreq" | "ptrlt"
        | "ptrle" | "ptrgt" | "ptrge" => {
            require_args(&op, &raw.args, 2)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            let binop = match op.as_str() {
                "add" => BinOp::Add,
                "sub" => BinOp::Sub,
                "mul" => BinOp::Mul,
                "div" => BinOp::Div,
                "eq" => BinOp::Eq,
                "lt" => BinOp::Lt,
                "le" => BinOp::Le,
                "gt" => BinOp::Gt,
                "ge" => BinOp::Ge,
                "and" => BinOp::And,
                "or" => BinOp::Or,
                "ptreq" => BinOp::PtrEq,
                "ptrlt" => BinOp::PtrLt,
                "ptrle" => BinOp::PtrLe,
                "ptrgt" => BinOp::PtrGt,
                "ptrge" => BinOp::PtrGe,
                _ => unreachable!(),
            };
            Instruction::Binary { dest, ty, op: binop, lhs: raw.args[0].clone(), rhs: raw.args[1].clone() }
        }
        "not" => {
            require_args(&op, &raw.args, 1)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            Instruction::Unary { dest, ty, op: UnOp::Not, arg: raw.args[0].clone() }
        }
        "id" => {
            require_args(&op, &raw.args, 1)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            Instruction::Id { dest, ty, src: raw.args[0].clone() }
        }
        "nop" => {
            require_args(&op, &raw.args, 0)?;
            Instruction::Nop
        }
        "load" => {
            require_args(&op, &raw.args, 1)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            Instruction::Load { dest, ty, ptr: raw.args[0].clone() }
        }
        "alloc" => {
            require_args(&op, &raw.args, 1)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            if !ty.is_ptr() {
                return Err(IrError::InvalidType(format!("'alloc' destination type must be a pointer, got {ty}")));
            }
            Instruction::Alloc { dest, ty, size: raw.args[0].clone() }
        }
        "ptradd" => {
            require_args(&op, &raw.args, 2)?;
            let dest = require_dest(&op, raw.dest)?;
            let ty = require_type(&op, raw.ty.as_ref())?;
            Instruction::PtrAdd { dest, ty, ptr: raw.args[0].clone(), offset: raw.args[1].clone() }
        }
        "br" => {
            require_args(&op, &raw.args, 1)?;
            require_labels(&op, &raw.labels, 2)?;
            Instruction::Br {
                cond: raw.args[0].clone(),
                then_label: raw.labels[0].clone(),
                else_label: raw.labels[1].clone(),
            }
        }
        "jmp" => {
            require_args(&op, &raw.args, 0)?;
            require_labels(&op, &raw.labels, 1)?;
            Instruction::Jmp { label: raw.labels[0].clone() }
        }
        "ret" => {
            require_args(&op, &raw.args, 0)?;
            Instruction::Ret
        }
        "print" => Instruction::Print { args: raw.args },
        "store" => {
            require_args(&op, &raw.args, 2)?;
            Instruction::Store { ptr: raw.args[0].clone(), value: raw.args[1].clone() }
        }
        "free" => {
            require_args(&op, &raw.args, 1)?;
            Instruction::Free { ptr: raw.args[0].clone() }
        }
        other => return Err(IrError::UnknownOpcode(other.to_string())),
    };
    Ok(Item::Instr(instr))
}

fn item_to_raw(item: &Item) -> RawItem {
    match item {
        Item::Label(label) => RawItem { label: Some(label.clone()), ..RawItem::default() },
        Item::Instr(instr) => instr_to_raw(instr),
    }
}

fn instr_to_raw(instr: &Instruction) -> RawItem {
    let mut raw = RawItem::default();
    match instr {
        Instruction::Const { dest, ty, value } => {
            raw.op = Some("const".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.value = Some(match value {
                Literal::Int(i) => serde_json::Value::from(serde_json::Number::from_str(&i.to_string()).unwrap()),
                Literal::Bool(b) => serde_json::Value::Bool(*b),
            });
        }
        Instruction::Binary { dest, ty, op, lhs, rhs } => {
            raw.op = Some(op.mnemonic().to_string());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![lhs.clone(), rhs.clone()];
        }
        Instruction::Unary { dest, ty, op: UnOp::Not, arg } => {
            raw.op = Some("not".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![arg.clone()];
        }
        Instruction::Id { dest, ty, src } => {
            raw.op = Some("id".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![src.clone()];
        }
        Instruction::Nop => raw.op = Some("nop".into()),
        Instruction::Load { dest, ty, ptr } => {
            raw.op = Some("load".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![ptr.clone()];
        }
        Instruction::Alloc { dest, ty, size } => {
            raw.op = Some("alloc".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![size.clone()];
        }
        Instruction::PtrAdd { dest, ty, ptr, offset } => {
            raw.op = Some("ptradd".into());
            raw.dest = Some(dest.clone());
            raw.ty = Some(type_to_raw(ty));
            raw.args = vec![ptr.clone(), offset.clone()];
        }
        Instruction::Br { cond, then_label, else_label } => {
            raw.op = Some("br".into());
            raw.args = vec![cond.clone()];
            raw.labels = vec![then_label.clone(), else_label.clone()];
        }
        Instruction::Jmp { label } => {
            raw.op = Some("jmp".into());
            raw.labels = vec![label.clone()];
        }
        Instruction::Ret => raw.op = Some("ret".into()),
        Instruction::Print { args } => {
            raw.op = Some("print".into());
            raw.args = args.clone();
        }
        Instruction::Store { ptr, value } => {
            raw.op = Some("store".into());
            raw.args = vec![ptr.clone(), value.clone()];
        }
        Instruction::Free { ptr } => {
            raw.op = Some("free".into());
            raw.args = vec![ptr.clone()];
        }
    }
    raw
}

pub fn parse_program(text: &str) -> Result<Program, ToolError> {
    let raw: RawProgram = serde_json::from_str(text)?;
    let functions = raw
        .functions
        .into_iter()
        .map(|rf| {
            let items =
                rf.instrs.into_iter().map(|item| convert_item(item, &rf.name)).collect::<Result<Vec<_>, IrError>>()?;
            Ok(Function::new(rf.name, items))
        })
        .collect::<Result<Vec<_>, IrError>>()?;
    Ok(Program::new(functions))
}

pub fn program_to_json(program: &Program, pretty: bool) -> Result<String, ToolError> {
    let raw = RawProgram {
        functions: program
            .functions
            .iter()
            .map(|f| RawFunction { name: f.name.clone(), instrs: f.items.iter().map(item_to_raw).collect() })
            .collect(),
    };
    let text = if pretty { serde_json::to_string_pretty(&raw) } else { serde_json::to_string(&raw) }?;
    Ok(text)
}
