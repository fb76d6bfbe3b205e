// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Exhaustive lookup tables of a function over the encodings of its
//! argument contexts.

use crate::context::Context;
use crate::context::EncodableContext;
use crate::context::RoundingContext;
use crate::error::Error;
use crate::error::Result;
use crate::float::Float;
use crate::ops::Primitive;
use num_bigint::BigUint;
use num_traits::One;
use num_traits::ToPrimitive;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub mod codegen;

/// largest number of entries a table may materialize
pub const MAX_ENTRIES: usize = 1 << 24;

/// the function a table evaluates, given its arguments and the return context
pub type LutFunction = Arc<dyn Fn(&[Float], &Context) -> Result<Float> + Send + Sync>;

/// A function evaluated at every combination of encodings of its argument
/// contexts, with results rounded under the return context.
///
/// The table is computed on first access. Entries are ordered by the
/// encodings of the arguments, the first argument being the most
/// significant.
pub struct Lut {
    name: String,
    function: LutFunction,
    arg_ctxs: Vec<Context>,
    ret_ctx: Context,
    table: OnceCell<Vec<Float>>,
}

impl fmt::Debug for Lut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Lut")
            .field("name", &self.name)
            .field("arg_ctxs", &self.arg_ctxs)
            .field("ret_ctx", &self.ret_ctx)
            .field("materialized", &self.table.get().is_some())
            .finish()
    }
}

pub(crate) fn encodable<'a>(ctx: &'a Context, what: &str) -> Result<&'a dyn EncodableContext> {
    ctx.as_encodable()
        .ok_or_else(|| Error::config(format!("{} context {} has no encoding", what, ctx)))
}

impl Lut {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    pub fn arg_ctxs(&self) -> &[Context] {
        &self.arg_ctxs
    }
    pub fn ret_ctx(&self) -> &Context {
        &self.ret_ctx
    }
    fn arg_encodables(&self) -> impl Iterator<Item = &dyn EncodableContext> + '_ {
        self.arg_ctxs.iter().map(|ctx| {
            ctx.as_encodable()
                .expect("argument contexts are checked at construction")
        })
    }
    /// number of entries: the product of the argument contexts' encoding
    /// counts
    pub fn size(&self) -> BigUint {
        self.arg_encodables()
            .fold(BigUint::one(), |size, ctx| size * ctx.num_encodings())
    }
    /// the arguments of the entry at `index`
    pub fn args_at(&self, index: usize) -> Result<Vec<Float>> {
        let mut remaining = BigUint::from(index);
        let mut args = Vec::with_capacity(self.arg_ctxs.len());
        for ctx in self.arg_encodables().collect::<Vec<_>>().into_iter().rev() {
            let count = ctx.num_encodings();
            args.push(ctx.decode(&(&remaining % &count))?);
            remaining /= count;
        }
        args.reverse();
        Ok(args)
    }
    /// the position of the entry for `args`, which must be representable
    /// under the argument contexts
    pub fn index_of(&self, args: &[Float]) -> Result<usize> {
        if args.len() != self.arg_ctxs.len() {
            return Err(Error::TypeMismatch(format!(
                "{} takes {} arguments, got {}",
                self.name,
                self.arg_ctxs.len(),
                args.len()
            )));
        }
        let mut index = BigUint::from(0u32);
        for (ctx, arg) in self.arg_encodables().zip(args) {
            index = index * ctx.num_encodings() + ctx.encode(arg)?;
        }
        index
            .to_usize()
            .ok_or_else(|| Error::domain("table index out of range", index))
    }
    /// Computes every entry, if not already done.
    pub fn force(&self) -> Result<&[Float]> {
        let table = self.table.get_or_try_init(|| {
            let size = self.size();
            let entries = match size.to_usize() {
                Some(entries) if entries <= MAX_ENTRIES => entries,
                _ => {
                    return Err(Error::config(format!(
                        "{} has {} entries, more than {}",
                        self.name, size, MAX_ENTRIES
                    )))
                }
            };
            log::debug!(
                "materializing {} with {} entries over {:?}",
                self.name,
                entries,
                self.arg_ctxs.iter().map(|ctx| ctx.to_string()).collect::<Vec<_>>()
            );
            (0..entries)
                .map(|index| {
                    let args = self.args_at(index)?;
                    let value = (self.function)(&args, &self.ret_ctx)?;
                    self.ret_ctx.round(&value)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(table)
    }
    pub fn get(&self, args: &[Float]) -> Result<&Float> {
        let index = self.index_of(args)?;
        Ok(&self.force()?[index])
    }
    /// `(arguments, result)` pairs in encoding order
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<(Vec<Float>, &Float)>> + '_> {
        let table = self.force()?;
        Ok(table
            .iter()
            .enumerate()
            .map(move |(index, value)| Ok((self.args_at(index)?, value))))
    }
    /// the encoding of the entry at `index` under the return context
    pub fn encoded_at(&self, index: usize) -> Result<BigUint> {
        let ret = encodable(&self.ret_ctx, "return")?;
        let value = self
            .force()?
            .get(index)
            .ok_or_else(|| Error::domain("table index out of range", index))?;
        ret.encode(value)
    }
}

/// Builds [`Lut`]s.
#[derive(Copy, Clone, Default, Debug)]
pub struct LutGenerator;

impl LutGenerator {
    /// Creates a table of `function` over `arg_ctxs`, which must all be
    /// encodable. Nothing is evaluated until the table is first accessed.
    pub fn generate(
        &self,
        name: impl Into<String>,
        function: impl Fn(&[Float], &Context) -> Result<Float> + Send + Sync + 'static,
        arg_ctxs: Vec<Context>,
        ret_ctx: Context,
    ) -> Result<Lut> {
        for ctx in &arg_ctxs {
            encodable(ctx, "argument")?;
        }
        Ok(Lut {
            name: name.into(),
            function: Arc::new(function),
            arg_ctxs,
            ret_ctx,
            table: OnceCell::new(),
        })
    }
    /// a table of one of the built-in operators
    pub fn generate_primitive(
        &self,
        primitive: Primitive,
        arg_ctxs: Vec<Context>,
        ret_ctx: Context,
    ) -> Result<Lut> {
        if arg_ctxs.len() != primitive.arity() {
            return Err(Error::TypeMismatch(format!(
                "{} takes {} arguments, got {} contexts",
                primitive,
                primitive.arity(),
                arg_ctxs.len()
            )));
        }
        self.generate(
            primitive.name(),
            move |args, ctx| primitive.call(args, ctx),
            arg_ctxs,
            ret_ctx,
        )
    }
}
