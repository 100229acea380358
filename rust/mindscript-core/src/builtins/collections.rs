//! Collection natives: iterators, array and object manipulation.

use super::{arg, define_native, make_native};
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use crate::values::{MObject, MValue, NativeCallable, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type NativeResult = Result<MObject, Interrupt>;

/// Iterates a live array; pushes performed mid-iteration are observed.
struct ArrayIterator {
    items: Rc<RefCell<Vec<MObject>>>,
    index: Cell<usize>,
}

impl NativeCallable for ArrayIterator {
    fn call(&self, _ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
        let items = self.items.borrow();
        let index = self.index.get();
        if index < items.len() {
            self.index.set(index + 1);
            return Ok(items[index].clone());
        }
        Ok(MObject::null())
    }
}

/// Iterates a snapshot taken at construction time (object pairs, keys,
/// values).
struct SnapshotIterator {
    items: Vec<MObject>,
    index: Cell<usize>,
}

impl NativeCallable for SnapshotIterator {
    fn call(&self, _ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
        let index = self.index.get();
        if index < self.items.len() {
            self.index.set(index + 1);
            return Ok(self.items[index].clone());
        }
        Ok(MObject::null())
    }
}

fn iter(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(container) = arg(&args, 0) else {
        return Ok(MObject::null());
    };
    match &container.value {
        Value::Array(items) => {
            let callable = Box::new(ArrayIterator {
                items: Rc::clone(items),
                index: Cell::new(0),
            });
            let func = make_native(ip, "fun(_: Null) -> Any?", "An array iterator.", callable)?;
            Ok(MObject::Function(func))
        }
        Value::Map(entries) => {
            let pairs: Vec<MObject> = entries
                .borrow()
                .iter()
                .map(|(key, value)| MObject::array(vec![MObject::str(key), value.clone()]))
                .collect();
            let callable = Box::new(SnapshotIterator {
                items: pairs,
                index: Cell::new(0),
            });
            let func = make_native(ip, "fun(_: Null) -> Any?", "An object iterator.", callable)?;
            Ok(MObject::Function(func))
        }
        _ => Ok(MObject::null()),
    }
}

fn keys(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Map(entries),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    let items: Vec<MObject> = entries.borrow().keys().map(|k| MObject::str(k)).collect();
    let callable = Box::new(SnapshotIterator {
        items,
        index: Cell::new(0),
    });
    let func = make_native(ip, "fun(_: Null) -> Str?", "An object key iterator.", callable)?;
    Ok(MObject::Function(func))
}

fn values(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Map(entries),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    let items: Vec<MObject> = entries.borrow().values().cloned().collect();
    let callable = Box::new(SnapshotIterator {
        items,
        index: Cell::new(0),
    });
    let func = make_native(
        ip,
        "fun(_: Null) -> Any?",
        "An object value iterator.",
        callable,
    )?;
    Ok(MObject::Function(func))
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    resolved.clamp(0, len) as usize
}

fn slice(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (array, start, end) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = &array
    else {
        return Ok(MObject::null());
    };
    let (MObject::Value(MValue { value: Value::Int(s), .. }),
         MObject::Value(MValue { value: Value::Int(e), .. })) = (&start, &end)
    else {
        return Ok(MObject::null());
    };
    let items = items.borrow();
    let s = clamp_index(*s, items.len());
    let e = clamp_index(*e, items.len());
    if s >= e {
        return Ok(MObject::array(Vec::new()));
    }
    Ok(MObject::array(items[s..e].to_vec()))
}

fn push(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let array = arg(&args, 0);
    let value = arg(&args, 1);
    if let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = &array
    {
        items.borrow_mut().push(value);
    }
    Ok(array)
}

fn pop(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    let popped = items.borrow_mut().pop();
    match popped {
        Some(value) => Ok(value),
        None => Ok(MObject::annotated_null("Can't pop value from empty array.")),
    }
}

fn shift(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let array = arg(&args, 0);
    let value = arg(&args, 1);
    if let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = &array
    {
        items.borrow_mut().insert(0, value);
    }
    Ok(array)
}

fn unshift(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    let mut items = items.borrow_mut();
    if items.is_empty() {
        return Ok(MObject::annotated_null(
            "Can't unshift value from an empty array.",
        ));
    }
    Ok(items.remove(0))
}

fn delete(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let object = arg(&args, 0);
    let key = arg(&args, 1);
    let (MObject::Value(MValue { value: Value::Map(entries), .. }),
         MObject::Value(MValue { value: Value::Str(key), .. })) = (&object, &key)
    else {
        return Ok(MObject::null());
    };
    if entries.borrow_mut().shift_remove(key.as_ref()).is_none() {
        return Ok(MObject::annotated_null(&format!(
            "The property '{}' does not exist.",
            key
        )));
    }
    Ok(object)
}

fn exists(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (object, key) = (arg(&args, 0), arg(&args, 1));
    let (MObject::Value(MValue { value: Value::Map(entries), .. }),
         MObject::Value(MValue { value: Value::Str(key), .. })) = (&object, &key)
    else {
        return Ok(MObject::bool(false));
    };
    let result = entries.borrow().contains_key(key.as_ref());
    Ok(MObject::bool(result))
}

fn get(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (object, key) = (arg(&args, 0), arg(&args, 1));
    let (MObject::Value(MValue { value: Value::Map(entries), .. }),
         MObject::Value(MValue { value: Value::Str(key), .. })) = (&object, &key)
    else {
        return Ok(MObject::null());
    };
    let result = match entries.borrow().get(key.as_ref()) {
        Some(value) => Ok(value.clone()),
        None => Ok(MObject::annotated_null(&format!(
            "The property '{}' does not exist.",
            key
        ))),
    };
    result
}

fn set(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (object, key, value) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let (MObject::Value(MValue { value: Value::Map(entries), .. }),
         MObject::Value(MValue { value: Value::Str(key), .. })) = (&object, &key)
    else {
        return Ok(MObject::null());
    };
    entries.borrow_mut().insert(key.to_string(), value.clone());
    Ok(value)
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    define_native(
        ip,
        "iter",
        "fun(value: Any) -> Any",
        "Creates an iterator function from the value.",
        Box::new(iter),
    )?;
    define_native(
        ip,
        "slice",
        "fun(array: [Any], s: Int, e: Int) -> [Any]",
        "Slices an array between two indexes.",
        Box::new(slice),
    )?;
    define_native(
        ip,
        "push",
        "fun(array: [Any], value: Any) -> [Any]",
        "Adds a value to the end of an array.",
        Box::new(push),
    )?;
    define_native(
        ip,
        "pop",
        "fun(array: [Any]) -> Any?",
        "Pops the last value from the array.",
        Box::new(pop),
    )?;
    define_native(
        ip,
        "shift",
        "fun(array: [Any], value: Any) -> [Any]",
        "Inserts a value at the front of an array.",
        Box::new(shift),
    )?;
    define_native(
        ip,
        "unshift",
        "fun(array: [Any]) -> Any?",
        "Pops the first value from the array.",
        Box::new(unshift),
    )?;
    define_native(
        ip,
        "delete",
        "fun(obj: {}, prop: Str) -> {}?",
        "Deletes a property from an object.",
        Box::new(delete),
    )?;
    define_native(
        ip,
        "keys",
        "fun(obj: {}) -> (Null -> Str?)",
        "Returns an iterator over an object's keys.",
        Box::new(keys),
    )?;
    define_native(
        ip,
        "values",
        "fun(obj: {}) -> (Null -> Any?)",
        "Returns an iterator over an object's values.",
        Box::new(values),
    )?;
    define_native(
        ip,
        "exists",
        "fun(obj: {}, key: Str) -> Bool",
        "Checks whether a key exists.",
        Box::new(exists),
    )?;
    define_native(
        ip,
        "get",
        "fun(obj: {}, key: Str) -> Any?",
        "Returns a property.",
        Box::new(get),
    )?;
    define_native(
        ip,
        "set",
        "fun(obj: {}, key: Str, value: Any) -> Any",
        "Set a property to a given value.",
        Box::new(set),
    )?;
    Ok(())
}
