// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Renders a [`Lut`] as a C++ function over encoded values.

use super::Lut;
use crate::context::Context;
use crate::context::EncodableContext;
use crate::error::Error;
use crate::error::Result;
use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;

const ENTRIES_PER_LINE: usize = 8;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CodegenMode {
    /// a dense `static const` array indexed by the concatenated encodings
    Array,
    /// nested `switch` statements, one level per argument
    Switch,
}

impl Default for CodegenMode {
    fn default() -> Self {
        CodegenMode::Array
    }
}

impl fmt::Display for CodegenMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CodegenMode::Array => "array",
            CodegenMode::Switch => "switch",
        })
    }
}

impl FromStr for CodegenMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "array" => Ok(CodegenMode::Array),
            "switch" => Ok(CodegenMode::Switch),
            _ => Err(Error::parse(format!("unknown codegen mode: {:?}", s))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CodegenOptions {
    pub mode: CodegenMode,
    /// one level of indentation
    pub indent: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            mode: CodegenMode::default(),
            indent: "    ".into(),
        }
    }
}

/// the narrowest fixed-width unsigned C++ type holding `nbits` bits
fn integer_type(nbits: u64) -> Result<&'static str> {
    match nbits {
        0..=8 => Ok("uint8_t"),
        9..=16 => Ok("uint16_t"),
        17..=32 => Ok("uint32_t"),
        33..=64 => Ok("uint64_t"),
        _ => Err(Error::config(format!(
            "no native integer type holds {} bits",
            nbits
        ))),
    }
}

fn hex_literal(value: &BigUint, nbits: u64) -> String {
    let digits = ((nbits + 3) / 4).max(1) as usize;
    format!("{:#0width$x}", value, width = digits + 2)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

struct Emitter<'a> {
    lut: &'a Lut,
    options: &'a CodegenOptions,
    arg_ctxs: Vec<&'a dyn EncodableContext>,
    ret_ctx: &'a dyn EncodableContext,
    out: String,
}

impl<'a> Emitter<'a> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
    fn ret_literal(&self, index: usize) -> Result<String> {
        Ok(hex_literal(&self.lut.encoded_at(index)?, self.ret_ctx.nbits()))
    }
    fn signature(&self) -> Result<String> {
        let ret_type = integer_type(self.ret_ctx.nbits())?;
        let params = self
            .arg_ctxs
            .iter()
            .enumerate()
            .map(|(i, ctx)| Ok(format!("{} x{}", integer_type(ctx.nbits())?, i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{} {}({})", ret_type, self.lut.name(), params.join(", ")))
    }
    fn array(&mut self) -> Result<()> {
        let entries = self.lut.force()?.len();
        let ret_type = integer_type(self.ret_ctx.nbits())?;
        self.line(1, &format!("static const {} table[{}] = {{", ret_type, entries));
        for start in (0..entries).step_by(ENTRIES_PER_LINE) {
            let end = (start + ENTRIES_PER_LINE).min(entries);
            let row = (start..end)
                .map(|index| self.ret_literal(index))
                .collect::<Result<Vec<_>>>()?;
            self.line(2, &format!("{},", row.join(", ")));
        }
        self.line(1, "};");
        let mut index = String::new();
        let mut shift = 0;
        for (i, ctx) in self.arg_ctxs.iter().enumerate().rev() {
            if !index.is_empty() {
                index.insert_str(0, " | ");
            }
            let term = if shift == 0 {
                format!("(std::size_t)x{}", i)
            } else {
                format!("((std::size_t)x{} << {})", i, shift)
            };
            index.insert_str(0, &term);
            shift += ctx.nbits();
        }
        if index.is_empty() {
            index.push('0');
        }
        self.line(1, &format!("return table[{}];", index));
        Ok(())
    }
    fn switch(&mut self, depth: usize, arg: usize, base: usize) -> Result<()> {
        if arg == self.arg_ctxs.len() {
            let literal = self.ret_literal(base)?;
            self.line(depth, &format!("return {};", literal));
            return Ok(());
        }
        let ctx = self.arg_ctxs[arg];
        let count = 1usize << ctx.nbits();
        let stride: usize = self.arg_ctxs[arg + 1..]
            .iter()
            .map(|ctx| 1usize << ctx.nbits())
            .product();
        self.line(depth, &format!("switch (x{}) {{", arg));
        for code in 0..count {
            let label = hex_literal(&BigUint::from(code), ctx.nbits());
            self.line(depth, &format!("case {}:", label));
            self.switch(depth + 1, arg + 1, base + code * stride)?;
        }
        self.line(depth, "}");
        Ok(())
    }
}

/// Renders `lut` as a C++ function named after the table, taking and
/// returning encodings.
pub fn emit_cpp(lut: &Lut, options: &CodegenOptions) -> Result<String> {
    if !is_identifier(lut.name()) {
        return Err(Error::config(format!(
            "{:?} is not a valid C++ identifier",
            lut.name()
        )));
    }
    let ret_ctx = super::encodable(lut.ret_ctx(), "return")?;
    let arg_ctxs = lut
        .arg_ctxs()
        .iter()
        .map(|ctx| super::encodable(ctx, "argument"))
        .collect::<Result<Vec<_>>>()?;
    let mut emitter = Emitter {
        lut,
        options,
        arg_ctxs,
        ret_ctx,
        out: String::new(),
    };
    let describe = |ctx: &Context| ctx.to_string();
    emitter.line(0, "#include <cstddef>");
    emitter.line(0, "#include <cstdint>");
    emitter.line(0, "");
    let header = format!(
        "// {}: ({}) -> {}",
        lut.name(),
        lut.arg_ctxs().iter().map(describe).collect::<Vec<_>>().join(", "),
        describe(lut.ret_ctx())
    );
    emitter.line(0, &header);
    let signature = emitter.signature()?;
    emitter.line(0, &format!("{} {{", signature));
    match options.mode {
        CodegenMode::Array => emitter.array()?,
        CodegenMode::Switch => {
            emitter.switch(1, 0, 0)?;
            emitter.line(1, "return 0;");
        }
    }
    emitter.line(0, "}");
    log::debug!(
        "emitted {} lines of C++ for {} ({} mode)",
        emitter.out.lines().count(),
        lut.name(),
        options.mode
    );
    Ok(emitter.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::LutGenerator;
    use crate::ops;
    use crate::ErrorKind;

    fn ctx(text: &str) -> Context {
        text.parse().unwrap()
    }

    fn neg_lut(name: &str) -> Lut {
        let int2 = ctx("fixed(true, 0, 2, RTZ, wrap)");
        LutGenerator
            .generate(
                name,
                |args, ctx| ops::neg(&args[0], ctx),
                vec![int2.clone()],
                int2,
            )
            .unwrap()
    }

    #[test]
    fn test_array() {
        let code = emit_cpp(&neg_lut("neg2"), &CodegenOptions::default()).unwrap();
        println!("{}", code);
        // codes 0..4 are 0, 1, -2, -1; negating -2 wraps back to -2
        assert!(code.contains("uint8_t neg2(uint8_t x0) {"));
        assert!(code.contains("static const uint8_t table[4] = {"));
        assert!(code.contains("0x0, 0x3, 0x2, 0x1,"));
        assert!(code.contains("return table[(std::size_t)x0];"));
    }

    #[test]
    fn test_switch() {
        let options = CodegenOptions {
            mode: CodegenMode::Switch,
            indent: "\t".into(),
        };
        let code = emit_cpp(&neg_lut("neg2"), &options).unwrap();
        println!("{}", code);
        assert!(code.contains("\tswitch (x0) {\n\tcase 0x1:\n\t\treturn 0x3;\n"));
        assert!(code.contains("\treturn 0;\n}\n"));
    }

    #[test]
    fn test_binary_index() {
        let uint2 = ctx("fixed(false, 0, 2, RTZ, wrap)");
        let lut = LutGenerator
            .generate(
                "add2",
                |args, ctx| ops::add(&args[0], &args[1], ctx),
                vec![uint2.clone(), uint2.clone()],
                uint2,
            )
            .unwrap();
        let code = emit_cpp(&lut, &CodegenOptions::default()).unwrap();
        println!("{}", code);
        assert!(code.contains("uint8_t add2(uint8_t x0, uint8_t x1)"));
        assert!(code.contains("return table[((std::size_t)x0 << 2) | (std::size_t)x1];"));
        // row x0 = 1: 1, 2, 3, 0
        assert!(code.contains("0x1, 0x2, 0x3, 0x0,"));
    }

    #[test]
    fn test_errors() {
        let error = emit_cpp(&neg_lut("not an identifier"), &CodegenOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContextConfig);
        assert_eq!("SWITCH".parse::<CodegenMode>().unwrap(), CodegenMode::Switch);
        assert!("tree".parse::<CodegenMode>().is_err());
        assert_eq!(integer_type(12).unwrap(), "uint16_t");
        assert!(integer_type(65).is_err());
    }

    #[test]
    fn test_unencodable_contexts() {
        let mut lut = neg_lut("neg2");
        lut.arg_ctxs[0] = Context::default();
        let error = emit_cpp(&lut, &CodegenOptions::default()).unwrap_err();
        println!("{}", error);
        assert_eq!(error.kind(), ErrorKind::ContextConfig);
        assert!(error.to_string().contains("argument context"));
        let mut lut = neg_lut("neg2");
        lut.ret_ctx = Context::default();
        let error = emit_cpp(&lut, &CodegenOptions::default()).unwrap_err();
        println!("{}", error);
        assert!(error.to_string().contains("return context"));
    }
}
