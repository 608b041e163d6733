//! Native methods of platform classes and built-in value methods

use crate::script::ScriptContext;
use crate::value::Value;
use crate::{VmError, VmResult, SCRIPT_CLASS};

fn no_signature(receiver: &str, method: &str, args: &[Value]) -> VmError {
    VmError::MissingMethod {
        receiver: receiver.to_string(),
        method: method.to_string(),
        arg_count: args.len(),
    }
}

/// `Script.println()` and `Script.println(value)`
pub fn println(ctx: &mut ScriptContext<'_>, args: &[Value]) -> VmResult<Value> {
    match args {
        [] => ctx.out.write_str("\n")?,
        [value] => ctx.out.write_str(&format!("{}\n", value))?,
        _ => return Err(no_signature(SCRIPT_CLASS, "println", args)),
    }
    Ok(Value::Null)
}

/// `Script.print(value)`
pub fn print(ctx: &mut ScriptContext<'_>, args: &[Value]) -> VmResult<Value> {
    match args {
        [value] => ctx.out.write_str(&value.to_string())?,
        _ => return Err(no_signature(SCRIPT_CLASS, "print", args)),
    }
    Ok(Value::Null)
}

/// Call a built-in method on a value.
pub fn invoke_value_method(receiver: &Value, name: &str, args: &[Value]) -> VmResult<Value> {
    let result = match (receiver, name, args) {
        (Value::Null, _, _) => {
            return Err(VmError::RuntimeError(format!(
                "Cannot invoke method {}() on null object",
                name
            )))
        }
        (value, "toString", []) => Value::str(&value.to_string()),
        (Value::Str(s), "toUpperCase", []) => Value::str(&s.to_uppercase()),
        (Value::Str(s), "toLowerCase", []) => Value::str(&s.to_lowercase()),
        (Value::Str(s), "trim", []) => Value::str(s.trim()),
        (Value::Str(s), "length", []) | (Value::Str(s), "size", []) => {
            Value::Int(s.chars().count() as i64)
        }
        (Value::Str(s), "isEmpty", []) => Value::Bool(s.is_empty()),
        (Value::Str(s), "contains", [Value::Str(part)]) => Value::Bool(s.contains(&**part)),
        (Value::Str(s), "startsWith", [Value::Str(prefix)]) => {
            Value::Bool(s.starts_with(&**prefix))
        }
        (Value::Str(s), "endsWith", [Value::Str(suffix)]) => Value::Bool(s.ends_with(&**suffix)),
        (Value::List(items), "size", []) => Value::Int(items.len() as i64),
        (Value::List(items), "isEmpty", []) => Value::Bool(items.is_empty()),
        (Value::List(items), "contains", [item]) => Value::Bool(items.contains(item)),
        (Value::List(items), "get", [Value::Int(index)]) => usize::try_from(*index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| {
                VmError::RuntimeError(format!(
                    "Index {} out of bounds for length {}",
                    index,
                    items.len()
                ))
            })?,
        (Value::Class(class), "getName", []) => Value::Str(class.clone()),
        (Value::Class(class), "getSimpleName", []) => Value::str(simple_name(class)),
        _ => return Err(no_signature(receiver.type_name(), name, args)),
    };
    Ok(result)
}

/// Read a built-in property of a value.
pub fn get_property(value: &Value, name: &str) -> VmResult<Value> {
    match (value, name) {
        (Value::Class(class), "name") => Ok(Value::Str(class.clone())),
        (Value::Class(class), "simpleName") => Ok(Value::str(simple_name(class))),
        (Value::List(items), "empty") => Ok(Value::Bool(items.is_empty())),
        (Value::Str(s), "empty") => Ok(Value::Bool(s.is_empty())),
        _ => Err(VmError::MissingProperty(format!("{} for {}", name, value.type_name()))),
    }
}

/// `java.util.Map$Entry` → `Entry`
fn simple_name(binary_name: &str) -> &str {
    binary_name
        .rsplit(|c: char| c == '.' || c == '$')
        .next()
        .unwrap_or(binary_name)
}
