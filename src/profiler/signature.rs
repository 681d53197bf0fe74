//! Counter signatures.
//!
//! A signature is the structural string identifying a counter bucket in
//! the CSV dump: two comma-separated quoted parts, calling context and
//! callee context. A context is `name(argstr)`, where `argstr` lists one
//! token per argument slot — the possible types of the slot joined with
//! `|`, each rendered as the object type's short name plus the `S`
//! (scalar), `I` (integer) and `2` (two-dimensional) flags.

use std::fmt;

use crate::analysis::lattice::{TypeInfo, TypeSet, TypeSetString};

/// Structural key of one counter bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a call: a function name with its argument types.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub name: &'a str,
    pub arg_types: &'a TypeSetString,
}

impl CallSite<'_> {
    fn token(&self) -> String {
        format!("{}{}", self.name, format_arg_string(self.arg_types))
    }
}

/// Signature of a caller/callee pair.
pub fn function_signature(caller: CallSite<'_>, callee: CallSite<'_>) -> Signature {
    Signature(format!("\"{}\",\"{}\"", caller.token(), callee.token()))
}

/// Signature of a loop owned by a function.
pub fn loop_signature(owner: CallSite<'_>, loop_id: u64) -> Signature {
    Signature(format!("\"{}\",\"_loop{}\"", owner.token(), loop_id))
}

/// Signature of an interpreted-call context.
pub fn interp_signature(owner: CallSite<'_>, context_id: u64) -> Signature {
    Signature(format!("\"{}\",\"_interpreted{}\"", owner.token(), context_id))
}

/// Renders an argument type string: `(t1, t2, ...)`.
pub fn format_arg_string(args: &TypeSetString) -> String {
    let tokens: Vec<String> = args.iter().map(format_type_set).collect();
    format!("({})", tokens.join(", "))
}

fn format_type_set(set: &TypeSet) -> String {
    if set.is_empty() {
        return "?".to_string();
    }
    set.iter()
        .map(format_type_info)
        .collect::<Vec<_>>()
        .join("|")
}

fn format_type_info(info: &TypeInfo) -> String {
    let mut out = info.obj_type.short_name().to_string();
    if info.is_scalar {
        out.push('S');
    }
    if info.is_integer {
        out.push('I');
    }
    if info.is_2d {
        out.push('2');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lattice::ObjType;

    #[test]
    fn test_function_signature_format() {
        let mut set = TypeSet::new();
        set.insert(TypeInfo::scalar(ObjType::MatrixF64, true));
        let args = vec![set];
        let empty = TypeSetString::new();

        let sig = function_signature(
            CallSite { name: "main", arg_types: &empty },
            CallSite { name: "fib", arg_types: &args },
        );
        assert_eq!(sig.as_str(), "\"main()\",\"fib(f64SI2)\"");
    }

    #[test]
    fn test_set_tokens_joined_with_pipe() {
        let mut set = TypeSet::new();
        set.insert(TypeInfo::scalar(ObjType::MatrixF64, true));
        set.insert(TypeInfo::scalar(ObjType::Logical, true));
        let rendered = format_arg_string(&vec![set]);
        assert_eq!(rendered, "(f64SI2|logSI2)");
    }

    #[test]
    fn test_loop_and_interp_signatures() {
        let empty = TypeSetString::new();
        let owner = CallSite { name: "f", arg_types: &empty };
        assert_eq!(loop_signature(owner, 3).as_str(), "\"f()\",\"_loop3\"");
        assert_eq!(
            interp_signature(owner, 7).as_str(),
            "\"f()\",\"_interpreted7\""
        );
    }

    #[test]
    fn test_unknown_slot_renders_placeholder() {
        let rendered = format_arg_string(&vec![TypeSet::new()]);
        assert_eq!(rendered, "(?)");
    }
}
