//! Find the symbol occurrences in a statement as written, before any substitution.

use std::rc::Rc;
use lsp_types as lsp;
use super::super::ids::IdStorage;
use super::super::macros::MacroDefinition;
use super::super::statement::{Field,Statement,is_attribute_quote,CONTINUATION_COLUMN};
use super::super::lsp::{OccurrenceKind,SymbolOccurrence};
use super::expressions::{is_name_char,is_name_start};

const OPERATORS: [&str;10] = ["EQ","NE","LT","LE","GT","GE","AND","OR","NOT","XOR"];

#[derive(Clone,Copy,PartialEq)]
enum OperandStyle {
    /// variables and sequence symbols only
    ConditionalAssembly,
    /// symbols only inside parentheses, as in `A(LABEL)`
    Data,
    Ordinary
}

/// Range of characters `beg..end` of a field.  A field that was continued only
/// gets ranges on its first line.
fn char_range(field: &Field,beg: usize,end: usize) -> Option<lsp::Range> {
    let start = field.range.start;
    let b = start.character as usize + beg;
    let e = start.character as usize + end;
    if field.range.start.line != field.range.end.line && e > CONTINUATION_COLUMN {
        return None;
    }
    Some(lsp::Range::new(lsp::Position::new(start.line,b as u32),lsp::Position::new(start.line,e as u32)))
}

struct Collector<'a> {
    ids: &'a mut IdStorage,
    ans: Vec<SymbolOccurrence>
}

impl<'a> Collector<'a> {
    fn push(&mut self,kind: OccurrenceKind,name: &str,range: Option<lsp::Range>) {
        if let Some(range) = range {
            let id = self.ids.add(&name.to_uppercase());
            self.ans.push(SymbolOccurrence::new(kind,id,range));
        }
    }
    /// Scan a field for variable symbols, and optionally ordinary and sequence symbols
    fn scan(&mut self,field: &Field,style: Option<OperandStyle>) {
        let chars: Vec<char> = field.text.chars().collect();
        let n = chars.len();
        let end_of_name = |mut j: usize| {
            while j < n && is_name_char(chars[j]) {
                j += 1;
            }
            j
        };
        let mut i = 0;
        let mut quoted = false;
        let mut depth = 0;
        while i < n {
            let c = chars[i];
            let prev = if i > 0 { Some(chars[i-1]) } else { None };
            let next = chars.get(i+1).copied();
            if c=='\'' && !is_attribute_quote(&chars,i) {
                quoted = !quoted;
                i += 1;
                continue;
            }
            if c=='&' {
                if next==Some('&') {
                    i += 2;
                    continue;
                }
                if next.map_or(false,is_name_start) {
                    let j = end_of_name(i+1);
                    let name: String = chars[i+1..j].iter().collect();
                    self.push(OccurrenceKind::Var,&name,char_range(field,i,j));
                    i = j;
                    continue;
                }
            }
            let style = match (quoted,style) {
                (false,Some(s)) => s,
                _ => {
                    i += 1;
                    continue;
                }
            };
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if c=='.' && next.map_or(false,is_name_start) && prev.map_or(true,|p| p==')' || p==',') {
                let j = end_of_name(i+1);
                let name: String = chars[i+1..j].iter().collect();
                self.push(OccurrenceKind::Seq,&name,char_range(field,i,j));
                i = j;
                continue;
            }
            if is_name_start(c) && !prev.map_or(false,|p| is_name_char(p) || p=='&' || p=='.') {
                let j = end_of_name(i);
                let word: String = chars[i..j].iter().collect::<String>().to_uppercase();
                let follow = chars.get(j).copied();
                let skip = follow==Some('\'') || follow==Some('=') ||
                    style==OperandStyle::ConditionalAssembly ||
                    (style==OperandStyle::Data && depth==0) ||
                    OPERATORS.contains(&word.as_str());
                if !skip {
                    self.push(OccurrenceKind::Ord,&word,char_range(field,i,j));
                }
                i = j;
                continue;
            }
            if c.is_ascii_digit() {
                i = end_of_name(i);
                continue;
            }
            i += 1;
        }
    }
}

/// Occurrences in one statement.  `opcode_macro` is the macro the statement calls, if any.
pub fn collect(ids: &mut IdStorage,stmt: &Statement,opcode_macro: Option<Rc<MacroDefinition>>) -> Vec<SymbolOccurrence> {
    let mut col = Collector { ids, ans: Vec::new() };
    if let Some(label) = &stmt.label {
        if label.text.contains('&') {
            col.scan(label,None);
        } else if let Some(seq) = label.text.strip_prefix('.') {
            col.push(OccurrenceKind::Seq,seq,Some(label.range));
        } else {
            col.push(OccurrenceKind::Ord,&label.text,Some(label.range));
        }
    }
    let opcode = stmt.opcode();
    if let Some(instr) = &stmt.instruction {
        if instr.text.contains('&') {
            col.scan(instr,None);
        } else {
            let id = col.ids.add(&opcode);
            col.ans.push(SymbolOccurrence::new_instr(id,instr.range,opcode_macro));
        }
    }
    let style = match opcode.as_str() {
        "AIF" | "AGO" | "SETA" | "SETB" | "SETC" | "LCLA" | "LCLB" | "LCLC" |
        "GBLA" | "GBLB" | "GBLC" | "ACTR" | "MNOTE" | "AREAD" => OperandStyle::ConditionalAssembly,
        "DC" | "DS" | "DXD" => OperandStyle::Data,
        _ => OperandStyle::Ordinary
    };
    if opcode=="COPY" {
        if let Some(op) = stmt.operands.first() {
            if !op.text.is_empty() && !op.text.contains('&') {
                col.push(OccurrenceKind::CopyOp,&op.text,Some(op.range));
                return col.ans;
            }
        }
    }
    for op in &stmt.operands {
        col.scan(op,Some(style));
    }
    col.ans
}
