//! Hover text, all of it markdown.

use lsp_types as lsp;
use crate::lang::TextData;
use super::super::ordinary::{Symbol,SymbolValue};
use super::super::context::HlasmContext;
use super::super::macros::MacroDefinition;
use super::super::statement;
use super::super::variables::SetType;
use super::super::DataAttrKind;
use super::{LspContext,OccurrenceKind,VariableSymbolDefinition};

fn symbol_hover(ctx: &HlasmContext,sym: &Symbol) -> String {
    let mut ans = match sym.value {
        SymbolValue::Abs(v) => format!("{}\n\n---\n\nAbsolute Symbol\n\n---\n\n",v),
        SymbolValue::Reloc(r) => format!("{}\n\n---\n\nRelocatable Symbol\n\n---\n\n",ctx.ord_ctx.reloc_text(&r)),
        SymbolValue::Undef => return String::new()
    };
    let attrs = &sym.attributes;
    if attrs.is_defined(DataAttrKind::L) {
        ans += &format!("L: {}  \n",attrs.get_attribute_value(DataAttrKind::L));
    }
    if attrs.is_defined(DataAttrKind::I) {
        ans += &format!("I: {}  \n",attrs.get_attribute_value(DataAttrKind::I));
    }
    if attrs.is_defined(DataAttrKind::S) {
        ans += &format!("S: {}  \n",attrs.get_attribute_value(DataAttrKind::S));
    }
    if attrs.is_defined(DataAttrKind::T) {
        ans += &format!("T: {}  \n",super::super::ebcdic::type_attr_string(attrs.type_attr));
    }
    ans
}

pub fn var_hover(def: &VariableSymbolDefinition) -> String {
    if def.macro_param {
        return "MACRO parameter".to_string();
    }
    let ans = match def.ty {
        SetType::A => "SETA variable",
        SetType::B => "SETB variable",
        SetType::C => "SETC variable"
    };
    ans.to_string()
}

/// Comment block before the `MACRO` line, the prototype with its continuations,
/// and the comment block that follows.  `def_line` is the line of the prototype.
pub fn macro_documentation(data: &TextData,def_line: usize) -> String {
    let mut ans = String::new();
    if def_line >= 1 {
        let macro_line = def_line - 1;
        let mut beg = macro_line;
        while beg > 0 && statement::is_comment(data.get_line(beg-1)) {
            beg -= 1;
        }
        for l in beg..macro_line {
            ans += data.get_line(l);
            ans += "\n";
        }
    }
    let mut end = def_line;
    while statement::is_continued(data.get_line(end)) && end+1 < data.number_of_lines() {
        end += 1;
    }
    for l in def_line..=end {
        ans += data.get_line(l);
        ans += "\n";
    }
    let mut l = end + 1;
    while l < data.number_of_lines() && statement::is_comment(data.get_line(l)) {
        ans += data.get_line(l);
        ans += "\n";
        l += 1;
    }
    ans
}

/// Documentation of a macro, fenced as a code block, empty if its file is not indexed
pub fn macro_hover(lsp: &LspContext,def: &MacroDefinition) -> String {
    let loc = &def.definition_location;
    match lsp.file(&loc.file) {
        Some(f) => format!("```\n{}```\n",macro_documentation(&f.data,loc.pos.line as usize)),
        None => String::new()
    }
}

pub fn hover(lsp: &LspContext,uri: &str,pos: lsp::Position) -> String {
    let file = match lsp.file(uri) {
        Some(f) => f,
        None => return String::new()
    };
    let opencode = match lsp.opencode() {
        Some(o) => o,
        None => return String::new()
    };
    let (occ,macro_scope) = file.find_occurrence_with_scope(&pos);
    let occ = match occ {
        Some(o) => o,
        None => return String::new()
    };
    let ctx = &opencode.hlasm_ctx;
    match occ.kind {
        OccurrenceKind::Ord => match ctx.ord_ctx.get_symbol(&occ.name) {
            Some(sym) => symbol_hover(ctx,sym),
            None => String::new()
        },
        OccurrenceKind::Seq => "Sequence symbol".to_string(),
        OccurrenceKind::Var => {
            let defs = match &macro_scope {
                Some(m) => &m.var_definitions,
                None => &opencode.variable_definitions
            };
            match defs.iter().find(|d| d.name==occ.name) {
                Some(d) => var_hover(d),
                None => String::new()
            }
        },
        OccurrenceKind::Instr => match &occ.opcode {
            Some(m) => macro_hover(lsp,m),
            None => {
                if !lsp.settings().hovers.instructions {
                    return String::new();
                }
                match ctx.handbook().get(&occ.name) {
                    Some(ins) => format!("`{}`  \n{}  \n{}",ins.detail(),ins.brief,ins.desc),
                    None => String::new()
                }
            }
        },
        OccurrenceKind::CopyOp => String::new()
    }
}
