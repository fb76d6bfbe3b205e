// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Types annotated with the rounding context of every real number, as
//! produced by context inference.

use crate::context::Context;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A name made unique by an optional counter, like `c` or `c_3`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NamedId {
    pub base: String,
    pub count: Option<u64>,
}

impl NamedId {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            count: None,
        }
    }
    pub fn with_count(base: impl Into<String>, count: u64) -> Self {
        Self {
            base: base.into(),
            count: Some(count),
        }
    }
}

impl fmt::Display for NamedId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.count {
            Some(count) => write!(f, "{}_{}", self.base, count),
            None => f.write_str(&self.base),
        }
    }
}

/// A known context or a variable standing for one.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ContextParam {
    Context(Arc<Context>),
    Var(NamedId),
}

impl ContextParam {
    pub fn var(&self) -> Option<&NamedId> {
        match self {
            ContextParam::Var(var) => Some(var),
            ContextParam::Context(_) => None,
        }
    }
    fn subst(&self, map: &HashMap<NamedId, ContextParam>) -> ContextParam {
        match self {
            ContextParam::Var(var) => map.get(var).cloned().unwrap_or_else(|| self.clone()),
            ContextParam::Context(_) => self.clone(),
        }
    }
}

impl From<Context> for ContextParam {
    fn from(ctx: Context) -> Self {
        ContextParam::Context(Arc::new(ctx))
    }
}

impl From<NamedId> for ContextParam {
    fn from(var: NamedId) -> Self {
        ContextParam::Var(var)
    }
}

impl fmt::Display for ContextParam {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContextParam::Context(ctx) => fmt::Display::fmt(ctx, f),
            ContextParam::Var(var) => write!(f, "?{}", var),
        }
    }
}

/// An ordinary value type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Bool,
    Real,
    Var(NamedId),
    Tuple(Vec<Type>),
    List(Box<Type>),
    Function { args: Vec<Type>, ret: Box<Type> },
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Real => f.write_str("real"),
            Type::Var(var) => write!(f, "'{}", var),
            Type::Tuple(elts) => {
                f.write_str("tuple(")?;
                write_list(f, elts)?;
                f.write_str(")")
            }
            Type::List(elt) => write!(f, "list[{}]", elt),
            Type::Function { args, ret } => {
                f.write_str("fn(")?;
                write_list(f, args)?;
                write!(f, ") -> {}", ret)
            }
        }
    }
}

/// A type with a context on every real, and on every function for the
/// context it is called under.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeContext {
    Bool,
    Real(ContextParam),
    Var(NamedId),
    Tuple(Vec<TypeContext>),
    List(Box<TypeContext>),
    Function {
        args: Vec<TypeContext>,
        ret: Box<TypeContext>,
        ctx: ContextParam,
    },
}

impl TypeContext {
    fn collect_vars(&self, vars: &mut BTreeSet<NamedId>) {
        match self {
            TypeContext::Bool | TypeContext::Var(_) => {}
            TypeContext::Real(param) => vars.extend(param.var().cloned()),
            TypeContext::Tuple(elts) => {
                for elt in elts {
                    elt.collect_vars(vars);
                }
            }
            TypeContext::List(elt) => elt.collect_vars(vars),
            TypeContext::Function { args, ret, ctx } => {
                vars.extend(ctx.var().cloned());
                for arg in args {
                    arg.collect_vars(vars);
                }
                ret.collect_vars(vars);
            }
        }
    }
    /// the context variables in this type
    pub fn free_vars(&self) -> BTreeSet<NamedId> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }
    /// Replaces context variables by what `map` assigns them, including
    /// the calling context of function types. Unmapped variables are left
    /// in place.
    pub fn subst(&self, map: &HashMap<NamedId, ContextParam>) -> TypeContext {
        match self {
            TypeContext::Bool => TypeContext::Bool,
            TypeContext::Real(param) => TypeContext::Real(param.subst(map)),
            TypeContext::Var(var) => TypeContext::Var(var.clone()),
            TypeContext::Tuple(elts) => {
                TypeContext::Tuple(elts.iter().map(|elt| elt.subst(map)).collect())
            }
            TypeContext::List(elt) => TypeContext::List(Box::new(elt.subst(map))),
            TypeContext::Function { args, ret, ctx } => TypeContext::Function {
                args: args.iter().map(|arg| arg.subst(map)).collect(),
                ret: Box::new(ret.subst(map)),
                ctx: ctx.subst(map),
            },
        }
    }
    /// the type with contexts dropped
    pub fn as_type(&self) -> Type {
        match self {
            TypeContext::Bool => Type::Bool,
            TypeContext::Real(_) => Type::Real,
            TypeContext::Var(var) => Type::Var(var.clone()),
            TypeContext::Tuple(elts) => Type::Tuple(elts.iter().map(Self::as_type).collect()),
            TypeContext::List(elt) => Type::List(Box::new(elt.as_type())),
            TypeContext::Function { args, ret, .. } => Type::Function {
                args: args.iter().map(Self::as_type).collect(),
                ret: Box::new(ret.as_type()),
            },
        }
    }
    pub fn is_monomorphic(&self) -> bool {
        self.free_vars().is_empty()
    }
}

impl fmt::Display for TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeContext::Bool => f.write_str("bool"),
            TypeContext::Real(ctx) => write!(f, "real[{}]", ctx),
            TypeContext::Var(var) => write!(f, "'{}", var),
            TypeContext::Tuple(elts) => {
                f.write_str("tuple(")?;
                write_list(f, elts)?;
                f.write_str(")")
            }
            TypeContext::List(elt) => write!(f, "list[{}]", elt),
            TypeContext::Function { args, ret, ctx } => {
                write!(f, "fn[{}](", ctx)?;
                write_list(f, args)?;
                write!(f, ") -> {}", ret)
            }
        }
    }
}
