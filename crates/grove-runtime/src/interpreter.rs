//! Bytecode interpreter
//!
//! A straightforward stack machine. Each compiled method runs in its own
//! frame with a local slot array and an operand stack; calls to script
//! methods recurse through [`Interpreter::invoke`].

use std::cmp::Ordering;
use std::sync::Arc;

use grove_bytecode::{BytecodeReader, ConstantPool, DecodeError, Method, Opcode};

use crate::builtins;
use crate::class::{Class, MethodRef};
use crate::script::{Binding, OutputSink, ScriptContext};
use crate::value::Value;
use crate::{VmError, VmResult};

/// Maximum depth of nested script method calls
pub const MAX_CALL_DEPTH: usize = 256;

/// Executes methods of one script instance
pub struct Interpreter<'a> {
    class: &'a Arc<Class>,
    binding: &'a mut Binding,
    out: &'a OutputSink,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(class: &'a Arc<Class>, binding: &'a mut Binding, out: &'a OutputSink) -> Self {
        Self {
            class,
            binding,
            out,
            depth: 0,
        }
    }

    /// Call a method of the script class by name.
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> VmResult<Value> {
        match self.class.find_method(name) {
            Some(MethodRef::Compiled { owner, index }) => {
                let param_count = owner.compiled_method(index).map(|m| m.param_count as usize);
                if param_count != Some(args.len()) {
                    return Err(self.missing_method(name, args.len()));
                }
                self.call_compiled(&owner, index, args)
            }
            Some(MethodRef::Native(native)) => {
                let mut ctx = ScriptContext {
                    binding: &mut *self.binding,
                    out: self.out,
                    class: self.class,
                };
                native(&mut ctx, &args)
            }
            None => Err(self.missing_method(name, args.len())),
        }
    }

    fn missing_method(&self, name: &str, arg_count: usize) -> VmError {
        VmError::MissingMethod {
            receiver: self.class.name().to_string(),
            method: name.to_string(),
            arg_count,
        }
    }

    fn call_compiled(&mut self, owner: &Arc<Class>, index: usize, args: Vec<Value>) -> VmResult<Value> {
        let (method, constants) = match (owner.compiled_method(index), owner.class_file()) {
            (Some(method), Some(file)) => (method, &file.constants),
            _ => {
                return Err(VmError::RuntimeError(format!(
                    "{} has no compiled method #{}",
                    owner.name(),
                    index
                )))
            }
        };

        if self.depth >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow);
        }
        self.depth += 1;
        let result = self.execute(method, constants, args);
        self.depth -= 1;
        result
    }

    fn execute(&mut self, method: &Method, constants: &ConstantPool, args: Vec<Value>) -> VmResult<Value> {
        let mut locals = vec![Value::Null; method.local_count as usize];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = arg;
        }
        let mut stack: Vec<Value> = Vec::with_capacity(16);
        let mut reader = BytecodeReader::new(&method.code);

        while reader.has_more() {
            let opcode = reader.read_opcode().map_err(decode_error)?;
            match opcode {
                Opcode::Nop => {}
                Opcode::Pop => {
                    pop(&mut stack)?;
                }
                Opcode::Dup => {
                    let top = stack.last().cloned().ok_or(VmError::StackUnderflow)?;
                    stack.push(top);
                }

                Opcode::ConstNull => stack.push(Value::Null),
                Opcode::ConstTrue => stack.push(Value::Bool(true)),
                Opcode::ConstFalse => stack.push(Value::Bool(false)),
                Opcode::ConstInt => {
                    let index = reader.read_u32().map_err(decode_error)?;
                    let value = constants.get_integer(index).ok_or_else(|| bad_constant(index))?;
                    stack.push(Value::Int(value));
                }
                Opcode::ConstFloat => {
                    let index = reader.read_u32().map_err(decode_error)?;
                    let value = constants.get_float(index).ok_or_else(|| bad_constant(index))?;
                    stack.push(Value::Float(value));
                }
                Opcode::ConstStr => {
                    let s = read_string(&mut reader, constants)?;
                    stack.push(Value::str(s));
                }
                Opcode::ConstClass => {
                    let name = read_string(&mut reader, constants)?;
                    stack.push(Value::Class(Arc::from(name)));
                }

                Opcode::LoadLocal => {
                    let index = reader.read_u16().map_err(decode_error)? as usize;
                    let value = locals.get(index).cloned().ok_or(VmError::StackUnderflow)?;
                    stack.push(value);
                }
                Opcode::StoreLocal => {
                    let index = reader.read_u16().map_err(decode_error)? as usize;
                    let value = pop(&mut stack)?;
                    let slot = locals.get_mut(index).ok_or(VmError::StackUnderflow)?;
                    *slot = value;
                }
                Opcode::LoadVar => {
                    let name = read_string(&mut reader, constants)?;
                    let value = self
                        .binding
                        .get(name)
                        .cloned()
                        .ok_or_else(|| VmError::MissingProperty(format!("{} for {}", name, self.class.name())))?;
                    stack.push(value);
                }
                Opcode::StoreVar => {
                    let name = read_string(&mut reader, constants)?;
                    let value = pop(&mut stack)?;
                    self.binding.set(name, value);
                }
                Opcode::GetProperty => {
                    let name = read_string(&mut reader, constants)?;
                    let object = pop(&mut stack)?;
                    stack.push(builtins::get_property(&object, name)?);
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    stack.push(arithmetic(opcode, left, right)?);
                }
                Opcode::Neg => {
                    let value = match pop(&mut stack)? {
                        Value::Int(i) => Value::Int(
                            i.checked_neg()
                                .ok_or_else(|| VmError::Arithmetic("integer overflow".to_string()))?,
                        ),
                        Value::Float(f) => Value::Float(-f),
                        other => {
                            return Err(VmError::TypeError(format!(
                                "cannot negate {}",
                                other.type_name()
                            )))
                        }
                    };
                    stack.push(value);
                }

                Opcode::Eq | Opcode::Ne => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    let equal = left == right;
                    stack.push(Value::Bool(if opcode == Opcode::Eq { equal } else { !equal }));
                }
                Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    let ordering = compare(&left, &right)?;
                    let result = match opcode {
                        Opcode::Lt => ordering == Ordering::Less,
                        Opcode::Le => ordering != Ordering::Greater,
                        Opcode::Gt => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    };
                    stack.push(Value::Bool(result));
                }
                Opcode::Not => {
                    let value = pop(&mut stack)?;
                    stack.push(Value::Bool(!value.is_truthy()));
                }

                Opcode::Jmp | Opcode::JmpIfFalse | Opcode::JmpIfTrue => {
                    let delta = reader.read_i32().map_err(decode_error)?;
                    let taken = match opcode {
                        Opcode::Jmp => true,
                        Opcode::JmpIfFalse => !pop(&mut stack)?.is_truthy(),
                        _ => pop(&mut stack)?.is_truthy(),
                    };
                    if taken {
                        let target = reader.position() as i64 + delta as i64;
                        if target < 0 || target as usize > method.code.len() {
                            return Err(VmError::RuntimeError(format!(
                                "jump to {} outside of {}",
                                target, method.name
                            )));
                        }
                        reader.seek(target as usize);
                    }
                }

                Opcode::InvokeMethod => {
                    let name = read_string(&mut reader, constants)?;
                    let argc = reader.read_u16().map_err(decode_error)? as usize;
                    let args = pop_n(&mut stack, argc)?;
                    let result = self.invoke(name, args)?;
                    stack.push(result);
                }
                Opcode::InvokeVirtual => {
                    let name = read_string(&mut reader, constants)?;
                    let argc = reader.read_u16().map_err(decode_error)? as usize;
                    let args = pop_n(&mut stack, argc)?;
                    let receiver = pop(&mut stack)?;
                    stack.push(builtins::invoke_value_method(&receiver, name, &args)?);
                }

                Opcode::NewList => {
                    let count = reader.read_u16().map_err(decode_error)? as usize;
                    let items = pop_n(&mut stack, count)?;
                    stack.push(Value::list(items));
                }

                Opcode::Return => return pop(&mut stack),
                Opcode::ReturnNull => return Ok(Value::Null),
            }
        }

        Ok(Value::Null)
    }
}

fn pop(stack: &mut Vec<Value>) -> VmResult<Value> {
    stack.pop().ok_or(VmError::StackUnderflow)
}

/// Pop `count` values, returned in push order
fn pop_n(stack: &mut Vec<Value>, count: usize) -> VmResult<Vec<Value>> {
    if stack.len() < count {
        return Err(VmError::StackUnderflow);
    }
    Ok(stack.split_off(stack.len() - count))
}

fn read_string<'c>(reader: &mut BytecodeReader<'_>, constants: &'c ConstantPool) -> VmResult<&'c str> {
    let index = reader.read_u32().map_err(decode_error)?;
    constants.get_string(index).ok_or_else(|| bad_constant(index))
}

fn decode_error(err: DecodeError) -> VmError {
    match err {
        DecodeError::InvalidOpcode(byte, _) => VmError::InvalidOpcode(byte),
        other => VmError::RuntimeError(other.to_string()),
    }
}

fn bad_constant(index: u32) -> VmError {
    VmError::RuntimeError(format!("invalid constant index {}", index))
}

fn arithmetic(opcode: Opcode, left: Value, right: Value) -> VmResult<Value> {
    let overflow = || VmError::Arithmetic("integer overflow".to_string());

    match (opcode, left, right) {
        (Opcode::Add, Value::Str(a), b) => Ok(Value::str(&format!("{}{}", a, b))),
        (Opcode::Add, a, Value::Str(b)) if !matches!(a, Value::List(_)) => {
            Ok(Value::str(&format!("{}{}", a, b)))
        }
        (Opcode::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            Ok(Value::list(items))
        }
        (Opcode::Add, Value::List(a), b) => {
            let mut items = a.as_ref().clone();
            items.push(b);
            Ok(Value::list(items))
        }

        (op, Value::Int(a), Value::Int(b)) => match op {
            Opcode::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            Opcode::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            Opcode::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            Opcode::Div => {
                if b == 0 {
                    Err(VmError::Arithmetic("Division by zero".to_string()))
                } else if a % b == 0 {
                    a.checked_div(b).map(Value::Int).ok_or_else(overflow)
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            _ => {
                if b == 0 {
                    Err(VmError::Arithmetic("Division by zero".to_string()))
                } else {
                    a.checked_rem(b).map(Value::Int).ok_or_else(overflow)
                }
            }
        },

        (op, a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => match op {
                Opcode::Add => Ok(Value::Float(x + y)),
                Opcode::Sub => Ok(Value::Float(x - y)),
                Opcode::Mul => Ok(Value::Float(x * y)),
                _ if y == 0.0 => Err(VmError::Arithmetic("Division by zero".to_string())),
                Opcode::Div => Ok(Value::Float(x / y)),
                _ => Ok(Value::Float(x % y)),
            },
            _ => Err(VmError::TypeError(format!(
                "{} not supported between {} and {}",
                op.name(),
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn compare(left: &Value, right: &Value) -> VmResult<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x
                .partial_cmp(&y)
                .ok_or_else(|| VmError::Arithmetic("comparison with NaN".to_string())),
            _ => Err(VmError::TypeError(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SystemClassLoader;
    use crate::script::ScriptInstance;
    use grove_bytecode::{BytecodeWriter, ClassFile};

    /// Build a script class with the given methods, extending `groovy.lang.Script`
    fn script_class(file: ClassFile) -> Arc<Class> {
        let system = SystemClassLoader::new();
        Arc::new(Class::compiled(file, Some(system.script_class())))
    }

    fn method(name: &str, params: u16, locals: u16, code: Vec<u8>) -> Method {
        Method {
            name: name.to_string(),
            param_count: params,
            local_count: locals,
            line: 1,
            code,
        }
    }

    #[test]
    fn test_println_arithmetic() {
        let mut file = ClassFile::new("Calc", None);
        let two = file.constants.add_integer(2);
        let three = file.constants.add_integer(3);
        let println = file.constants.add_string("println");

        let mut w = BytecodeWriter::new();
        w.emit_indexed(Opcode::ConstInt, two);
        w.emit_indexed(Opcode::ConstInt, three);
        w.emit_opcode(Opcode::Mul);
        w.emit_invoke(Opcode::InvokeMethod, println, 1);
        w.emit_opcode(Opcode::Pop);
        w.emit_opcode(Opcode::ReturnNull);
        file.methods.push(method("run", 0, 0, w.into_bytes()));

        let out = OutputSink::buffer();
        let mut script = ScriptInstance::new(script_class(file))
            .unwrap()
            .with_output(out.clone());
        script.run().unwrap();
        assert_eq!(out.contents(), "6\n");
    }

    #[test]
    fn test_loop_with_binding_variable() {
        // i = 0; while (i < 3) { i = i + 1 }; return i
        let mut file = ClassFile::new("Loop", None);
        let zero = file.constants.add_integer(0);
        let one = file.constants.add_integer(1);
        let three = file.constants.add_integer(3);
        let i = file.constants.add_string("i");

        let mut w = BytecodeWriter::new();
        w.emit_indexed(Opcode::ConstInt, zero);
        w.emit_indexed(Opcode::StoreVar, i);
        let top = w.offset();
        w.emit_indexed(Opcode::LoadVar, i);
        w.emit_indexed(Opcode::ConstInt, three);
        w.emit_opcode(Opcode::Lt);
        let exit = w.emit_jump(Opcode::JmpIfFalse);
        w.emit_indexed(Opcode::LoadVar, i);
        w.emit_indexed(Opcode::ConstInt, one);
        w.emit_opcode(Opcode::Add);
        w.emit_indexed(Opcode::StoreVar, i);
        w.emit_jump_to(Opcode::Jmp, top);
        w.patch_jump(exit);
        w.emit_indexed(Opcode::LoadVar, i);
        w.emit_opcode(Opcode::Return);
        file.methods.push(method("run", 0, 0, w.into_bytes()));

        let mut script = ScriptInstance::new(script_class(file)).unwrap();
        assert_eq!(script.run().unwrap(), Value::Int(3));
        assert_eq!(script.binding().get("i"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_script_method_call_and_arity() {
        let mut file = ClassFile::new("Calls", None);
        let double = file.constants.add_string("double");
        let ten = file.constants.add_integer(10);

        let mut body = BytecodeWriter::new();
        body.emit_load_local(0);
        body.emit_load_local(0);
        body.emit_opcode(Opcode::Add);
        body.emit_opcode(Opcode::Return);
        file.methods.push(method("double", 1, 1, body.into_bytes()));

        let mut run = BytecodeWriter::new();
        run.emit_indexed(Opcode::ConstInt, ten);
        run.emit_invoke(Opcode::InvokeMethod, double, 1);
        run.emit_opcode(Opcode::Return);
        file.methods.push(method("run", 0, 0, run.into_bytes()));

        let mut script = ScriptInstance::new(script_class(file)).unwrap();
        assert_eq!(script.run().unwrap(), Value::Int(20));
        assert!(matches!(
            script.invoke_method("double", vec![]),
            Err(VmError::MissingMethod { arg_count: 0, .. })
        ));
    }

    #[test]
    fn test_unbounded_recursion_overflows() {
        let mut file = ClassFile::new("Recurse", None);
        let run_name = file.constants.add_string("run");
        let mut w = BytecodeWriter::new();
        w.emit_invoke(Opcode::InvokeMethod, run_name, 0);
        w.emit_opcode(Opcode::Return);
        file.methods.push(method("run", 0, 0, w.into_bytes()));

        let mut script = ScriptInstance::new(script_class(file)).unwrap();
        assert!(matches!(script.run(), Err(VmError::StackOverflow)));
    }

    #[test]
    fn test_arithmetic_rules() {
        assert_eq!(arithmetic(Opcode::Div, Value::Int(6), Value::Int(3)).unwrap(), Value::Int(2));
        assert_eq!(
            arithmetic(Opcode::Div, Value::Int(7), Value::Int(2)).unwrap(),
            Value::Float(3.5)
        );
        assert!(matches!(
            arithmetic(Opcode::Div, Value::Int(1), Value::Int(0)),
            Err(VmError::Arithmetic(_))
        ));
        assert_eq!(
            arithmetic(Opcode::Add, Value::Int(1), Value::str("a")).unwrap(),
            Value::str("1a")
        );
        assert_eq!(
            arithmetic(Opcode::Add, Value::list(vec![Value::Int(1)]), Value::Int(2)).unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(matches!(
            arithmetic(Opcode::Sub, Value::str("a"), Value::Int(1)),
            Err(VmError::TypeError(_))
        ));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&Value::Int(1), &Value::Float(1.5)).unwrap(), Ordering::Less);
        assert_eq!(compare(&Value::str("b"), &Value::str("a")).unwrap(), Ordering::Greater);
        assert!(compare(&Value::Null, &Value::Int(1)).is_err());
    }
}
