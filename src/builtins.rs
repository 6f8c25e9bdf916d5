use log::debug;

use crate::object::{Builtin, HashObject, Object};

/// Where `print` writes.  The interpreter routes this to its output sink
/// and its observer.
pub trait Console {
    fn print_line(&mut self, line: &str);
}

/// Native implementation of a builtin.  An `Err` message becomes a runtime
/// error at the call site.
pub type BuiltinFn = fn(&mut dyn Console, &[Object]) -> Result<Object, String>;

/// Largest array `range` will build.
pub const MAX_RANGE_LEN: usize = 1_000_000;

pub const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("len", len),
    ("type", type_of),
    ("str", stringify),
    ("int", int),
    ("float", float),
    ("print", print),
    ("first", first),
    ("last", last),
    ("rest", rest),
    ("push", push),
    ("keys", keys),
    ("values", values),
    ("range", range),
    ("abs", abs),
];

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|&(name, func)| Builtin { name, func })
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

fn check_arity(name: &str, args: &[Object], expected: usize) -> Result<(), String> {
    if args.len() != expected {
        let msg = format!(
            "wrong number of arguments to `{}`: expected {}, got {}",
            name,
            expected,
            args.len()
        );
        debug!("Error: {}", msg);
        return Err(msg);
    }

    Ok(())
}

fn unsupported(name: &str, arg: &Object) -> String {
    format!("argument to `{}` not supported, got {}", name, arg.type_tag())
}

fn len(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("len", args, 1)?;

    let n = match &args[0] {
        Object::Str(s) => s.chars().count(),
        Object::Array(items) => items.borrow().len(),
        Object::Hash(hash) => hash.borrow().len(),
        other => return Err(unsupported("len", other)),
    };

    i64::try_from(n)
        .map(Object::Integer)
        .map_err(|_| "length does not fit in an integer".to_string())
}

fn type_of(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("type", args, 1)?;

    Ok(Object::string(args[0].type_tag()))
}

fn stringify(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("str", args, 1)?;

    match &args[0] {
        Object::Str(_) => Ok(args[0].clone()),
        other => Ok(Object::string(other.inspect())),
    }
}

fn int(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("int", args, 1)?;

    match &args[0] {
        Object::Integer(n) => Ok(Object::Integer(*n)),
        Object::Float(n) => float_to_int(*n),
        Object::Boolean(b) => Ok(Object::Integer(i64::from(*b))),
        Object::Str(s) => {
            let text = s.trim();
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Object::Integer(n));
            }
            match text.parse::<f64>() {
                Ok(n) => float_to_int(n),
                Err(_) => Err(format!("cannot convert {:?} to INTEGER", &**s)),
            }
        }
        other => Err(unsupported("int", other)),
    }
}

fn float_to_int(n: f64) -> Result<Object, String> {
    let truncated = n.trunc();

    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(format!("cannot convert {} to INTEGER", Object::Float(n)));
    }

    Ok(Object::Integer(truncated as i64))
}

fn float(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("float", args, 1)?;

    match &args[0] {
        Object::Integer(n) => Ok(Object::Float(*n as f64)),
        Object::Float(n) => Ok(Object::Float(*n)),
        Object::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Object::Float)
            .map_err(|_| format!("cannot convert {:?} to FLOAT", &**s)),
        other => Err(unsupported("float", other)),
    }
}

fn print(console: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    let line = args
        .iter()
        .map(Object::inspect)
        .collect::<Vec<_>>()
        .join(" ");

    console.print_line(&line);

    Ok(Object::Null)
}

fn array_arg<'a>(name: &str, args: &'a [Object]) -> Result<&'a std::cell::RefCell<Vec<Object>>, String> {
    match &args[0] {
        Object::Array(items) => Ok(items),
        other => Err(format!("argument to `{}` must be ARRAY, got {}", name, other.type_tag())),
    }
}

fn first(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("first", args, 1)?;

    let items = array_arg("first", args)?.borrow();
    Ok(items.first().cloned().unwrap_or(Object::Null))
}

fn last(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("last", args, 1)?;

    let items = array_arg("last", args)?.borrow();
    Ok(items.last().cloned().unwrap_or(Object::Null))
}

/// Everything but the first element, as a new array; `null` when empty.
fn rest(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("rest", args, 1)?;

    let items = array_arg("rest", args)?.borrow();

    if items.is_empty() {
        return Ok(Object::Null);
    }

    Ok(Object::array(items[1..].to_vec()))
}

/// A new array with `value` appended; the argument is left untouched.
fn push(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("push", args, 2)?;

    let items = array_arg("push", args)?.borrow();

    let mut copy = items.clone();
    copy.push(args[1].clone());

    Ok(Object::array(copy))
}

fn hash_arg<'a>(name: &str, args: &'a [Object]) -> Result<&'a std::cell::RefCell<HashObject>, String> {
    match &args[0] {
        Object::Hash(hash) => Ok(hash),
        other => Err(format!("argument to `{}` must be HASH, got {}", name, other.type_tag())),
    }
}

fn keys(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("keys", args, 1)?;

    let hash = hash_arg("keys", args)?.borrow();
    Ok(Object::array(hash.keys().map(Object::string).collect()))
}

fn values(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("values", args, 1)?;

    let hash = hash_arg("values", args)?.borrow();
    Ok(Object::array(hash.values().cloned().collect()))
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`.
fn range(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    let mut bounds = Vec::with_capacity(args.len());

    for arg in args {
        match arg {
            Object::Integer(n) => bounds.push(*n),
            other => {
                return Err(format!(
                    "arguments to `range` must be INTEGER, got {}",
                    other.type_tag()
                ))
            }
        }
    }

    let (start, end, step) = match bounds.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, *step),
        _ => {
            return Err(format!(
                "wrong number of arguments to `range`: expected 1 to 3, got {}",
                args.len()
            ))
        }
    };

    if step == 0 {
        return Err("`range` step must not be zero".into());
    }

    let len = range_len(start, end, step);
    if len > MAX_RANGE_LEN as i128 {
        return Err(format!(
            "`range` would produce {} elements, more than the limit of {}",
            len, MAX_RANGE_LEN
        ));
    }

    let mut items = Vec::with_capacity(len as usize);
    let mut i = start;

    while (step > 0 && i < end) || (step < 0 && i > end) {
        items.push(Object::Integer(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(Object::array(items))
}

/// Element count of `start..end` by `step`, widened so it cannot overflow.
fn range_len(start: i64, end: i64, step: i64) -> i128 {
    let (start, end, step) = (start as i128, end as i128, step as i128);

    if step > 0 && end > start {
        (end - start + step - 1) / step
    } else if step < 0 && end < start {
        (start - end - step - 1) / -step
    } else {
        0
    }
}

fn abs(_: &mut dyn Console, args: &[Object]) -> Result<Object, String> {
    check_arity("abs", args, 1)?;

    match &args[0] {
        Object::Integer(n) => n
            .checked_abs()
            .map(Object::Integer)
            .ok_or_else(|| "integer overflow in `abs`".to_string()),
        Object::Float(n) => Ok(Object::Float(n.abs())),
        other => Err(unsupported("abs", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Captured(Vec<String>);

    impl Console for Captured {
        fn print_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }
    }

    fn call(name: &str, args: Vec<Object>) -> Result<Object, String> {
        let builtin = lookup(name).unwrap();
        (builtin.func)(&mut Captured::default(), &args)
    }

    #[test]
    fn push_copies_the_array() {
        let original = Object::array(vec![Object::Integer(1)]);
        let pushed = call("push", vec![original.clone(), Object::Integer(2)]).unwrap();

        assert_eq!(original.inspect(), "[1]");
        assert_eq!(pushed.inspect(), "[1, 2]");
    }

    #[test]
    fn print_joins_arguments() {
        let mut console = Captured::default();
        let print = lookup("print").unwrap();

        (print.func)(&mut console, &[Object::string("a"), Object::Integer(1)]).unwrap();

        assert_eq!(console.0, vec!["a 1".to_string()]);
    }

    #[test]
    fn range_forms() {
        assert_eq!(call("range", vec![Object::Integer(3)]).unwrap().inspect(), "[0, 1, 2]");
        assert_eq!(
            call("range", vec![Object::Integer(5), Object::Integer(0), Object::Integer(-2)])
                .unwrap()
                .inspect(),
            "[5, 3, 1]"
        );
        assert!(call("range", vec![Object::Integer(1), Object::Integer(2), Object::Integer(0)]).is_err());
    }

    #[test]
    fn range_length_is_bounded() {
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(5, 0, -2), 3);
        assert_eq!(range_len(3, 3, 1), 0);
        assert_eq!(range_len(i64::MIN, i64::MAX, 1), u64::MAX as i128);

        let limit = MAX_RANGE_LEN as i64;
        let items = call("range", vec![Object::Integer(limit)]).unwrap();
        assert!(matches!(items, Object::Array(ref a) if a.borrow().len() == MAX_RANGE_LEN));

        assert_eq!(
            call("range", vec![Object::Integer(0), Object::Integer(i64::MAX)]).unwrap_err(),
            format!(
                "`range` would produce {} elements, more than the limit of {}",
                i64::MAX,
                MAX_RANGE_LEN
            )
        );
    }

    #[test]
    fn int_conversions() {
        assert_eq!(call("int", vec![Object::string(" 42 ")]).unwrap(), Object::Integer(42));
        assert_eq!(call("int", vec![Object::Float(-2.7)]).unwrap(), Object::Integer(-2));
        assert!(call("int", vec![Object::string("abc")]).is_err());
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            call("len", vec![]).unwrap_err(),
            "wrong number of arguments to `len`: expected 1, got 0"
        );
    }
}
