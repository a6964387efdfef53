use crate::error::runtime_error::RuntimeError;
use crate::heap::{Heap, Value};
use crate::ir::{BinOp, Function, Instruction, Item, Literal, Program, Type, UnOp};
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::HashMap;

/// What a completed `interp` run produced, for the CLI to render.
#[derive(Debug, Default)]
pub struct InterpOutcome {
    pub instructions_executed: u64,
}

/// Owns the environment and heap for one execution of `main`.
pub struct Interpreter<'p> {
    program: &'p Program,
    heap: Heap,
    env: HashMap<String, Value>,
    instructions_executed: u64,
}

impl<'p> Interpreter<'p> {
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        Self { program, heap: Heap::new(), env: HashMap::new(), instructions_executed: 0 }
    }

    /// Runs `main` to completion, returning every line the program printed
    /// plus the instruction count, or the first fatal [`RuntimeError`].
    pub fn run(&mut self) -> Result<(Vec<String>, InterpOutcome), RuntimeError> {
        let main = self.program.get("main").ok_or_else(|| RuntimeError::UnknownFunction("main".to_string()))?;
        let mut output = Vec::new();
        self.run_function(main, &mut output)?;
        if !self.heap.is_empty() {
            return Err(RuntimeError::Heap(crate::error::runtime_error::HeapError::UnfreedMemory(
                self.heap.live_count(),
            )));
        }
        Ok((output, InterpOutcome { instructions_executed: self.instructions_executed }))
    }

    fn run_function(&mut self, func: &Function, output: &mut Vec<String>) -> Result<(), RuntimeError> {
        let (instrs, labels) = flatten(func);
        let mut pc = 0usize;
        while pc < instrs.len() {
            let instr = instrs[pc];
            self.instructions_executed += 1;
            match instr {
                Instruction::Ret => return Ok(()),
                Instruction::Jmp { label } => {
                    pc = *labels.get(label.as_str()).ok_or_else(|| RuntimeError::UnknownLabel(label.clone()))?;
                    continue;
                }
                Instruction::Br { cond, then_label, else_label } => {
                    let cond = self.bool_of(cond)?;
                    let target = if cond { then_label } else { else_label };
                    pc = *labels.get(target.as_str()).ok_or_else(|| RuntimeError::UnknownLabel(target.clone()))?;
                    continue;
                }
                other => {
                    self.exec(other, output)?;
                }
            }
            pc += 1;
        }
        Ok(())
    }

    fn exec(&mut self, instr: &Instruction, output: &mut Vec<String>) -> Result<(), RuntimeError> {
        match instr {
            Instruction::Const { dest, ty, value } => {
                let v = literal_to_value(value);
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Binary { dest, ty, op, lhs, rhs } => {
                let lhs = self.get(lhs)?;
                let rhs = self.get(rhs)?;
                let v = self.eval_binary(*op, lhs, rhs)?;
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Unary { dest, ty, op: UnOp::Not, arg } => {
                let v = match self.get(arg)? {
                    Value::Bool(b) => Value::Bool(!b),
                    other => return Err(RuntimeError::TypeMismatch(format!("'not' expects bool, got {other}"))),
                };
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Id { dest, ty, src } => {
                let v = self.get(src)?;
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Nop => {}
            Instruction::Load { dest, ty, ptr } => {
                let key = self.ptr_of(ptr)?;
                let v = self.heap.read(key)?;
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Alloc { dest, ty, size } => {
                let n = self.int_of(size)?;
                let len = i64::try_from(n).map_err(|_| RuntimeError::TypeMismatch("alloc size out of range".into()))?;
                let key = self.heap.alloc(len)?;
                self.env.insert(dest.clone(), Value::Ptr(key));
                let _ = ty;
            }
            Instruction::PtrAdd { dest, ty, ptr, offset } => {
                let key = self.ptr_of(ptr)?;
                let delta = self.int_of(offset)?;
                let delta =
                    i64::try_from(delta).map_err(|_| RuntimeError::TypeMismatch("ptradd offset out of range".into()))?;
                let v = Value::Ptr(key.ptradd(delta));
                check_ty(&v, ty)?;
                self.env.insert(dest.clone(), v);
            }
            Instruction::Print { args } => {
                let mut parts = Vec::with_capacity(args.len());
                for a in args {
                    parts.push(self.get(a)?.to_string());
                }
                output.push(parts.join(" "));
            }
            Instruction::Store { ptr, value } => {
                let key = self.ptr_of(ptr)?;
                let v = self.get(value)?;
                self.heap.write(key, v)?;
            }
            Instruction::Free { ptr } => {
                let key = self.ptr_of(ptr)?;
                self.heap.free(key)?;
            }
            Instruction::Br { .. } | Instruction::Jmp { .. } | Instruction::Ret => unreachable!("handled in run_function"),
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.env.get(name).cloned().ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    fn bool_of(&self, name: &str) -> Result<bool, RuntimeError> {
        match self.get(name)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::TypeMismatch(format!("expected bool, got {other}"))),
        }
    }

    fn int_of(&self, name: &str) -> Result<BigInt, RuntimeError> {
        match self.get(name)? {
            Value::Int(i) => Ok(i),
            other => Err(RuntimeError::TypeMismatch(format!("expected int, got {other}"))),
        }
    }

    fn ptr_of(&self, name: &str) -> Result<crate::heap::Key, RuntimeError> {
        match self.get(name)? {
            Value::Ptr(k) => Ok(k),
            other => Err(RuntimeError::TypeMismatch(format!("expected pointer, got {other}"))),
        }
    }

    fn eval_binary(&self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        use BinOp::{Add, And, Div, Eq, Ge, Gt, Le, Lt, Mul, Or, PtrEq, PtrGe, PtrGt, PtrLe, PtrLt, Sub};
        match (op, lhs, rhs) {
            (Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (Div, Value::Int(a), Value::Int(b)) => {
                if b.is_zero() {
                    return Err(RuntimeError::TypeMismatch("division by zero".into()));
                }
                Ok(Value::Int(a / b))
            }
            (Eq, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a == b)),
            (Eq, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a == b)),
            (Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
            (Le, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
            (Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
            (Ge, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
            (And, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
            (Or, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
            (PtrEq, Value::Ptr(a), Value::Ptr(b)) => Ok(Value::Bool(a.cmp_within(b)?.is_eq())),
            (PtrLt, Value::Ptr(a), Value::Ptr(b)) => Ok(Value::Bool(a.cmp_within(b)?.is_lt())),
            (BinOp::PtrLe, Value::Ptr(a), Value::Ptr(b)) => Ok(Value::Bool(a.cmp_within(b)?.is_le())),
            (PtrGt, Value::Ptr(a), Value::Ptr(b)) => Ok(Value::Bool(a.cmp_within(b)?.is_gt())),
            (PtrGe, Value::Ptr(a), Value::Ptr(b)) => Ok(Value::Bool(a.cmp_within(b)?.is_ge())),
            (op, a, b) => Err(RuntimeError::TypeMismatch(format!("'{op}' cannot apply to ({a}, {b})"))),
        }
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(i.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

fn check_ty(value: &Value, ty: &Type) -> Result<(), RuntimeError> {
    let ok = match (value, ty) {
        (Value::Int(_), Type::Int) | (Value::Bool(_), Type::Bool) | (Value::Ptr(_), Type::Ptr(_)) => true,
        _ => false,
    };
    if ok { Ok(()) } else { Err(RuntimeError::TypeMismatch(format!("value {value} does not match declared type {ty}"))) }
}

/// Flattens a function's item list into a straight-line instruction vector
/// plus a label -> index map, so the interpreter can jump without rescanning
/// on every branch.
fn flatten(func: &Function) -> (Vec<&Instruction>, HashMap<&str, usize>) {
    let mut instrs = Vec::with_capacity(func.items.len());
    let mut labels = HashMap::new();
    for item in &func.items {
        match item {
            Item::Label(name) => {
                labels.insert(name.as_str(), instrs.len());
            }
            Item::Instr(instr) => instrs.push(instr),
        }
    }
    (instrs, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinOp;

    fn konst(dest: &str, ty: Type, value: Literal) -> Instruction {
        Instruction::Const { dest: dest.to_string(), ty, value }
    }

    fn int(dest: &str, n: i64) -> Instruction {
        konst(dest, Type::Int, Literal::Int(BigInt::from(n)))
    }

    #[test]
    fn arithmetic_prints_sum() {
        let program = Program::new(vec![Function::new(
            "main",
            vec![
                Item::Instr(int("a", 3)),
                Item::Instr(int("b", 4)),
                Item::Instr(Instruction::Binary { dest: "c".into(), ty: Type::Int, op: BinOp::Add, lhs: "a".into(), rhs: "b".into() }),
                Item::Instr(Instruction::Print { args: vec!["c".into()] }),
            ],
        )]);
        let (output, outcome) = Interpreter::new(&program).run().unwrap();
        assert_eq!(output, vec!["7".to_string()]);
        assert_eq!(outcome.instructions_executed, 4);
    }

    #[test]
    fn pointer_arithmetic_round_trips_through_the_heap() {
        let program = Program::new(vec![Function::new(
            "main",
            vec![
                Item::Instr(int("n", 3)),
                Item::Instr(Instruction::Alloc { dest: "p".into(), ty: Type::Ptr(Box::new(Type::Int)), size: "n".into() }),
                Item::Instr(int("one", 1)),
                Item::Instr(Instruction::PtrAdd { dest: "p1".into(), ty: Type::Ptr(Box::new(Type::Int)), ptr: "p".into(), offset: "one".into() }),
                Item::Instr(int("v", 42)),
                Item::Instr(Instruction::Store { ptr: "p1".into(), value: "v".into() }),
                Item::Instr(Instruction::Load { dest: "q".into(), ty: Type::Int, ptr: "p1".into() }),
                Item::Instr(Instruction::Print { args: vec!["q".into()] }),
                Item::Instr(Instruction::Free { ptr: "p".into() }),
            ],
        )]);
        let (output, _) = Interpreter::new(&program).run().unwrap();
        assert_eq!(output, vec!["42".to_string()]);
    }

    #[test]
    fn unfreed_allocation_is_a_fatal_error() {
        let program = Program::new(vec![Function::new(
            "main",
            vec![
                Item::Instr(int("n", 1)),
                Item::Instr(Instruction::Alloc { dest: "p".into(), ty: Type::Ptr(Box::new(Type::Int)), size: "n".into() }),
            ],
        )]);
        let err = Interpreter::new(&program).run().unwrap_err();
        assert!(matches!(err, RuntimeError::Heap(crate::error::runtime_error::HeapError::UnfreedMemory(1))));
    }

    #[test]
    fn division_by_zero_is_a_type_error() {
        let program = Program::new(vec![Function::new(
            "main",
            vec![
                Item::Instr(int("a", 1)),
                Item::Instr(int("zero", 0)),
                Item::Instr(Instruction::Binary { dest: "c".into(), ty: Type::Int, op: BinOp::Div, lhs: "a".into(), rhs: "zero".into() }),
            ],
        )]);
        assert!(matches!(Interpreter::new(&program).run(), Err(RuntimeError::TypeMismatch(_))));
    }
}
